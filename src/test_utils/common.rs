use std::sync::Arc;

use parking_lot::Mutex;

use crate::ClickConfig;
use crate::Context;
use crate::Request;
use crate::SessionStore;

/// Ordered record of life-cycle invocations, shared between a test and the
/// pages and controls it builds.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &self,
        event: impl Into<String>,
    ) {
        self.0.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn count(
        &self,
        event: &str,
    ) -> usize {
        self.0.lock().iter().filter(|e| *e == event).count()
    }

    pub fn contains(
        &self,
        event: &str,
    ) -> bool {
        self.count(event) > 0
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

pub fn test_config() -> ClickConfig {
    let mut config = ClickConfig::default();
    config.app.template_dir = "/nonexistent-templates".into();
    config
}

/// A context over a bare application, for exercising controls and pages
/// outside of the dispatcher.
pub fn test_context(request: Request) -> Context {
    let app = crate::ClickApp::builder(test_config())
        .build()
        .expect("test application builds");
    Context::new(
        Arc::new(app),
        Arc::new(SessionStore::new(std::time::Duration::from_secs(60))),
        request,
    )
}

pub fn ajax(request: Request) -> Request {
    request.with_header(crate::constants::AJAX_REQUEST_HEADER, crate::constants::AJAX_REQUEST_VALUE)
}
