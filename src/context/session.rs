use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use dashmap::DashMap;
use nanoid::nanoid;
use parking_lot::Mutex;
use serde_json::Map;
use serde_json::Value;
use tracing::debug;
use tracing::trace;

/// Marker wrapping a value that must be read exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct FlashAttribute(pub Value);

/// A value stored in a [`Session`]
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAttribute {
    Value(Value),
    Flash(FlashAttribute),
}

impl SessionAttribute {
    pub fn value(&self) -> &Value {
        match self {
            SessionAttribute::Value(v) => v,
            SessionAttribute::Flash(FlashAttribute(v)) => v,
        }
    }

    pub fn is_flash(&self) -> bool {
        matches!(self, SessionAttribute::Flash(_))
    }
}

/// Server side user session
#[derive(Debug)]
pub struct Session {
    id: String,
    created: Instant,
    last_accessed: Mutex<Instant>,
    attributes: Mutex<HashMap<String, SessionAttribute>>,
}

impl Session {
    fn new(id: String) -> Self {
        let now = Instant::now();
        Self {
            id,
            created: now,
            last_accessed: Mutex::new(now),
            attributes: Mutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created(&self) -> Instant {
        self.created
    }

    /// Returns the named value.
    ///
    /// A flash attribute is unwrapped and removed from the session, so it is
    /// observed by exactly one read.
    pub fn get(
        &self,
        name: &str,
    ) -> Option<Value> {
        let mut attributes = self.attributes.lock();
        match attributes.get(name)? {
            SessionAttribute::Value(v) => Some(v.clone()),
            SessionAttribute::Flash(_) => match attributes.remove(name) {
                Some(SessionAttribute::Flash(FlashAttribute(v))) => {
                    trace!(session = %self.id, name, "flash attribute consumed");
                    Some(v)
                }
                _ => None,
            },
        }
    }

    /// Raw access to the stored attribute.
    ///
    /// Does not consume flash attributes: a flash value read here stays in the
    /// session until [`Session::get`] is called for it.
    pub fn attribute_raw(
        &self,
        name: &str,
    ) -> Option<SessionAttribute> {
        self.attributes.lock().get(name).cloned()
    }

    pub fn set(
        &self,
        name: impl Into<String>,
        value: Value,
    ) {
        self.attributes.lock().insert(name.into(), SessionAttribute::Value(value));
    }

    pub fn set_flash(
        &self,
        name: impl Into<String>,
        value: Value,
    ) {
        self.attributes
            .lock()
            .insert(name.into(), SessionAttribute::Flash(FlashAttribute(value)));
    }

    pub fn remove(
        &self,
        name: &str,
    ) -> Option<SessionAttribute> {
        self.attributes.lock().remove(name)
    }

    pub fn contains(
        &self,
        name: &str,
    ) -> bool {
        self.attributes.lock().contains_key(name)
    }

    /// Sorted attribute names
    pub fn attribute_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.attributes.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Plain (non flash) attributes, as exposed to templates
    pub fn values(&self) -> Map<String, Value> {
        self.attributes
            .lock()
            .iter()
            .filter_map(|(k, v)| match v {
                SessionAttribute::Value(v) => Some((k.clone(), v.clone())),
                SessionAttribute::Flash(_) => None,
            })
            .collect()
    }

    fn touch(&self) {
        *self.last_accessed.lock() = Instant::now();
    }

    fn is_expired(
        &self,
        timeout: Duration,
    ) -> bool {
        self.last_accessed.lock().elapsed() > timeout
    }
}

/// In-memory session registry keyed by session id
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, Arc<Session>>,
    timeout: Duration,
}

impl SessionStore {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            timeout,
        }
    }

    /// Looks up a live session and refreshes its access time.
    /// Expired sessions are dropped on lookup.
    pub fn get(
        &self,
        id: &str,
    ) -> Option<Arc<Session>> {
        let session = self.sessions.get(id).map(|entry| entry.value().clone())?;
        if session.is_expired(self.timeout) {
            debug!(session = %id, "session expired");
            self.sessions.remove(id);
            return None;
        }
        session.touch();
        Some(session)
    }

    pub fn create(&self) -> Arc<Session> {
        let session = Arc::new(Session::new(nanoid!()));
        debug!(session = %session.id(), "session created");
        self.sessions.insert(session.id().to_string(), session.clone());
        session
    }

    pub fn invalidate(
        &self,
        id: &str,
    ) -> bool {
        self.sessions.remove(id).is_some()
    }

    /// Removes every expired session, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let before = self.sessions.len();
        let timeout = self.timeout;
        self.sessions.retain(|_, session| !session.is_expired(timeout));
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
