use std::sync::Arc;

use click::ActionListener;
use click::ClickApp;
use click::ClickAppBuilder;
use click::ClickConfig;
use click::ClickServlet;
use click::Control;
use click::ControlBase;
use click::ControlCx;
use click::Error;
use click::RenderCx;
use click::Response;
use click::Result;
use click::ServletConfig;
use click::SimpleTemplateEngine;
use click::TemplateEngine;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

static TEMPLATES: Lazy<Arc<SimpleTemplateEngine>> = Lazy::new(|| {
    Arc::new(
        SimpleTemplateEngine::new("/nonexistent-templates")
            .with_template("/page.htm", "page:$!x")
            .with_template("/target.htm", "target:$!greeting")
            .with_template("/panel.htm", "$panel")
            .with_template("/notice.htm", "notice:$!notice"),
    )
});

/// Hook invocations shared between a test and the pages it registers
#[derive(Debug, Clone, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
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
}

/// Initialized servlet over the shared in-memory templates
pub fn servlet<F>(configure: F) -> ClickServlet
where
    F: Fn(ClickAppBuilder) -> ClickAppBuilder + Send + Sync + 'static,
{
    let servlet = ClickServlet::new(
        ServletConfig::default(),
        Arc::new(move || {
            let mut config = ClickConfig::default();
            config.app.template_dir = "/nonexistent-templates".into();
            let templates: Arc<dyn TemplateEngine> = TEMPLATES.clone();
            configure(ClickApp::builder(config).template_engine(templates)).build()
        }),
    );
    servlet.init().expect("application initializes");
    servlet
}

/// Session id handed out through the `Set-Cookie` header, if any
pub fn session_id(response: &Response) -> Option<String> {
    let cookie = response.header("set-cookie")?;
    let pair = cookie.split(';').next()?;
    pair.split_once('=').map(|(_, id)| id.to_string())
}

/// Control recording `<name>.<hook>` into a [`Log`]
pub struct Tracker {
    base: ControlBase,
    log: Log,
    container: bool,
    proceed: bool,
    fail_destroy: bool,
}

impl Tracker {
    pub fn new(
        name: &str,
        log: &Log,
    ) -> Self {
        Self {
            base: ControlBase::new(name),
            log: log.clone(),
            container: false,
            proceed: true,
            fail_destroy: false,
        }
    }

    pub fn container(mut self) -> Self {
        self.container = true;
        self
    }

    pub fn stopping(mut self) -> Self {
        self.proceed = false;
        self
    }

    pub fn failing_destroy(mut self) -> Self {
        self.fail_destroy = true;
        self
    }

    /// Queues `listener` every time the tracker is processed
    pub fn with_listener(
        mut self,
        listener: ActionListener,
    ) -> Self {
        self.base.set_listener(listener);
        self
    }

    fn record(
        &self,
        hook: &str,
    ) {
        self.log
            .record(format!("{}.{}", self.base.name().unwrap_or_default(), hook));
    }
}

impl Control for Tracker {
    fn name(&self) -> Option<&str> {
        self.base.name()
    }

    fn is_container(&self) -> bool {
        self.container
    }

    fn on_init(
        &mut self,
        _cx: &mut ControlCx<'_>,
    ) -> Result<()> {
        self.record("on_init");
        Ok(())
    }

    fn on_process(
        &mut self,
        cx: &mut ControlCx<'_>,
    ) -> Result<bool> {
        self.record("on_process");
        self.base.dispatch_action_event(cx);
        Ok(self.proceed)
    }

    fn on_render(
        &mut self,
        _cx: &mut ControlCx<'_>,
    ) -> Result<()> {
        self.record("on_render");
        Ok(())
    }

    fn on_destroy(
        &mut self,
        _cx: &mut ControlCx<'_>,
    ) -> Result<()> {
        self.record("on_destroy");
        if self.fail_destroy {
            return Err(Error::handler("cleanup failed"));
        }
        Ok(())
    }

    fn render(
        &self,
        cx: &RenderCx<'_>,
        out: &mut String,
    ) {
        out.push('<');
        out.push_str(self.base.name().unwrap_or_default());
        cx.render_children(out);
        out.push('>');
    }
}
