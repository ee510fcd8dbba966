use std::cell::Ref;
use std::cell::RefCell;
use std::cell::RefMut;
use std::rc::Rc;
use std::sync::Arc;

use http::header::SET_COOKIE;
use http::HeaderValue;
use http::Method;
use serde_json::Value;
use tracing::trace;
use tracing::warn;
use unic_langid::LanguageIdentifier;

use super::Request;
use super::Response;
use super::Session;
use super::SessionStore;
use crate::constants::AJAX_REQUEST_HEADER;
use crate::constants::AJAX_REQUEST_VALUE;
use crate::constants::CLICK_FORWARD;
use crate::constants::DEFAULT_CHARSET;
use crate::constants::DEFAULT_LOCALE;
use crate::constants::LOCALE_SESSION_KEY;
use crate::constants::SESSION_COOKIE;
use crate::ClickApp;
use crate::ControlRegistry;
use crate::Page;
use crate::RequestError;
use crate::Result;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Context>> = const { RefCell::new(Vec::new()) };
}

struct ContextInner {
    app: Arc<ClickApp>,
    sessions: Arc<SessionStore>,
    request: Rc<RefCell<Request>>,
    response: Rc<RefCell<Response>>,
    is_post: bool,
    session: RefCell<Option<Arc<Session>>>,
    registry: RefCell<Option<ControlRegistry>>,
}

/// Request scoped facade over the request, response, session and
/// application services.
///
/// Cloning is cheap and yields a handle to the same context. A context never
/// leaves the thread serving its request.
#[derive(Clone)]
pub struct Context {
    inner: Rc<ContextInner>,
}

impl std::fmt::Debug for Context {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let request = self.inner.request.borrow();
        f.debug_struct("Context")
            .field("method", request.method())
            .field("path", &request.path())
            .field("is_post", &self.inner.is_post)
            .finish()
    }
}

impl Context {
    pub fn new(
        app: Arc<ClickApp>,
        sessions: Arc<SessionStore>,
        request: Request,
    ) -> Self {
        Self::from_parts(
            app,
            sessions,
            Rc::new(RefCell::new(request)),
            Rc::new(RefCell::new(Response::new())),
        )
    }

    fn from_parts(
        app: Arc<ClickApp>,
        sessions: Arc<SessionStore>,
        request: Rc<RefCell<Request>>,
        response: Rc<RefCell<Response>>,
    ) -> Self {
        let is_post = request.borrow().method() == Method::POST;
        Self {
            inner: Rc::new(ContextInner {
                app,
                sessions,
                request,
                response,
                is_post,
                session: RefCell::new(None),
                registry: RefCell::new(None),
            }),
        }
    }

    /// Context for a server side forward to `path`.
    ///
    /// The target sees a copy of the request marked as forwarded and writes to
    /// the same response. It gets its own control registry.
    pub(crate) fn forward_to(
        &self,
        path: &str,
    ) -> Context {
        let mut request = self.inner.request.borrow().clone();
        request.set_path(path);
        request.set_attribute(CLICK_FORWARD, Value::Bool(true));
        let context = Self::from_parts(
            self.inner.app.clone(),
            self.inner.sessions.clone(),
            Rc::new(RefCell::new(request)),
            self.inner.response.clone(),
        );
        *context.inner.session.borrow_mut() = self.inner.session.borrow().clone();
        context
    }

    /// Context handed to the error page: same request and response, fresh registry.
    pub(crate) fn for_error_page(&self) -> Context {
        let context = Self::from_parts(
            self.inner.app.clone(),
            self.inner.sessions.clone(),
            self.inner.request.clone(),
            self.inner.response.clone(),
        );
        *context.inner.session.borrow_mut() = self.inner.session.borrow().clone();
        context
    }

    // -
    // Thread-local stack

    /// Returns the context on top of this thread's stack.
    ///
    /// Calling this outside of request processing is a programming error and
    /// yields [`RequestError::NoActiveContext`].
    pub fn current() -> Result<Context> {
        Self::try_current().ok_or_else(|| RequestError::NoActiveContext.into())
    }

    pub fn try_current() -> Option<Context> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().cloned())
    }

    pub fn stack_depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }

    /// Pushes this context onto the thread-local stack until the returned
    /// scope is dropped.
    pub fn push_thread_local(&self) -> ContextScope {
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(self.clone()));
        trace!(depth = Self::stack_depth(), "context pushed");
        ContextScope {
            context: self.clone(),
        }
    }

    // -
    // Request and response

    pub fn app(&self) -> &Arc<ClickApp> {
        &self.inner.app
    }

    pub fn request(&self) -> Ref<'_, Request> {
        self.inner.request.borrow()
    }

    pub fn request_mut(&self) -> RefMut<'_, Request> {
        self.inner.request.borrow_mut()
    }

    pub fn response(&self) -> Ref<'_, Response> {
        self.inner.response.borrow()
    }

    pub fn response_mut(&self) -> RefMut<'_, Response> {
        self.inner.response.borrow_mut()
    }

    /// Clones out the response accumulated so far.
    pub fn take_response(&self) -> Response {
        self.inner.response.borrow().clone()
    }

    pub fn is_post(&self) -> bool {
        self.inner.is_post
    }

    pub fn is_get(&self) -> bool {
        !self.inner.is_post
    }

    pub fn is_forward(&self) -> bool {
        self.request().attribute(CLICK_FORWARD).is_some()
    }

    /// `X-Requested-With: XMLHttpRequest` given as header or as parameter
    pub fn is_ajax_request(&self) -> bool {
        let request = self.request();
        request.header(AJAX_REQUEST_HEADER) == Some(AJAX_REQUEST_VALUE)
            || request.parameter(AJAX_REQUEST_HEADER) == Some(AJAX_REQUEST_VALUE)
    }

    /// Path of the requested resource, relative to the context path
    pub fn resource_path(&self) -> String {
        self.request().path().to_string()
    }

    pub fn context_path(&self) -> String {
        self.request().context_path().to_string()
    }

    pub fn request_parameter(
        &self,
        name: &str,
    ) -> Option<String> {
        self.request().parameter(name).map(str::to_string)
    }

    pub fn has_request_parameter(
        &self,
        name: &str,
    ) -> bool {
        self.request().has_parameter(name)
    }

    pub fn request_attribute(
        &self,
        name: &str,
    ) -> Option<Value> {
        self.request().attribute(name).cloned()
    }

    pub fn set_request_attribute(
        &self,
        name: impl Into<String>,
        value: Value,
    ) {
        self.request_mut().set_attribute(name, value);
    }

    // -
    // Session and flash attributes

    /// The session bound to this request, without creating one.
    pub fn existing_session(&self) -> Option<Arc<Session>> {
        if let Some(session) = self.inner.session.borrow().as_ref() {
            return Some(session.clone());
        }
        let id = self.request().session_id().map(str::to_string)?;
        let session = self.inner.sessions.get(&id)?;
        *self.inner.session.borrow_mut() = Some(session.clone());
        Some(session)
    }

    pub fn has_session(&self) -> bool {
        self.existing_session().is_some()
    }

    /// Returns the session, creating it (and its cookie) on first use.
    pub fn session(&self) -> Arc<Session> {
        if let Some(session) = self.existing_session() {
            return session;
        }
        let session = self.inner.sessions.create();
        self.request_mut().set_session_id(session.id().to_string());

        let path = match self.request().context_path() {
            "" => "/".to_string(),
            p => p.to_string(),
        };
        let cookie = format!("{}={}; Path={}; HttpOnly", SESSION_COOKIE, session.id(), path);
        match HeaderValue::from_str(&cookie) {
            Ok(value) => self.response_mut().append_header(SET_COOKIE, value),
            Err(e) => warn!("could not encode session cookie: {}", e),
        }

        *self.inner.session.borrow_mut() = Some(session.clone());
        session
    }

    /// Reads a session attribute without creating a session.
    ///
    /// Flash attributes are removed by this read.
    pub fn session_attribute(
        &self,
        name: &str,
    ) -> Option<Value> {
        self.existing_session()?.get(name)
    }

    pub fn has_session_attribute(
        &self,
        name: &str,
    ) -> bool {
        self.existing_session().is_some_and(|s| s.contains(name))
    }

    pub fn set_session_attribute(
        &self,
        name: impl Into<String>,
        value: Value,
    ) {
        self.session().set(name, value);
    }

    pub fn remove_session_attribute(
        &self,
        name: &str,
    ) {
        if let Some(session) = self.existing_session() {
            session.remove(name);
        }
    }

    /// Stores a value visible to exactly one later read.
    pub fn set_flash_attribute(
        &self,
        name: impl Into<String>,
        value: Value,
    ) {
        self.session().set_flash(name, value);
    }

    // -
    // Locale and charset

    /// Resolves the user locale.
    ///
    /// First match wins: session locale, application default locale, the
    /// request's Accept-Language, then `en`.
    pub fn locale(&self) -> LanguageIdentifier {
        let from_session = self
            .existing_session()
            .and_then(|s| s.attribute_raw(LOCALE_SESSION_KEY))
            .and_then(|attr| attr.value().as_str().and_then(|s| s.parse().ok()));
        if let Some(locale) = from_session {
            return locale;
        }

        if let Some(locale) = self.inner.app.default_locale() {
            return locale.clone();
        }

        let from_request = self
            .request()
            .accept_languages()
            .into_iter()
            .find_map(|tag| tag.parse::<LanguageIdentifier>().ok());
        if let Some(locale) = from_request {
            return locale;
        }

        DEFAULT_LOCALE.parse().unwrap_or_default()
    }

    /// Stores the user locale in the session. `None` removes it.
    pub fn set_locale(
        &self,
        locale: Option<&LanguageIdentifier>,
    ) {
        match locale {
            Some(locale) => self.set_session_attribute(LOCALE_SESSION_KEY, Value::String(locale.to_string())),
            None => self.remove_session_attribute(LOCALE_SESSION_KEY),
        }
    }

    /// Request charset, else the application charset, else UTF-8
    pub fn charset(&self) -> String {
        if let Some(charset) = self.request().character_encoding() {
            return charset.to_string();
        }
        let charset = self.inner.app.charset();
        if charset.is_empty() {
            DEFAULT_CHARSET.to_string()
        } else {
            charset.to_string()
        }
    }

    // -
    // Pages

    /// Path the page type `P` is configured under
    pub fn page_path<P: Page>(&self) -> Result<String> {
        self.inner.app.page_path::<P>().map(str::to_string)
    }

    /// Creates a new instance of the page configured for `path`.
    pub fn create_page(
        &self,
        path: &str,
    ) -> Result<Box<dyn Page>> {
        self.inner.app.create_page(path)
    }

    // -
    // Control registry

    /// The control registry of this request, created on first use.
    pub fn registry(&self) -> RefMut<'_, ControlRegistry> {
        RefMut::map(self.inner.registry.borrow_mut(), |slot| slot.get_or_insert_with(ControlRegistry::new))
    }

    pub fn has_registry(&self) -> bool {
        self.inner.registry.borrow().is_some()
    }

    /// Drops the registry and everything registered in it.
    pub fn clear_registry(&self) {
        if let Some(mut registry) = self.inner.registry.borrow_mut().take() {
            registry.clear();
        }
    }
}

/// Keeps a [`Context`] on the thread-local stack for its lifetime.
///
/// Dropping the scope pops the context and clears its control registry, so
/// nothing outlives the request on a pooled thread.
#[must_use = "the context is popped as soon as the scope is dropped"]
pub struct ContextScope {
    context: Context,
}

impl ContextScope {
    pub fn context(&self) -> &Context {
        &self.context
    }
}

impl Drop for ContextScope {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            match stack.iter().rposition(|c| Rc::ptr_eq(&c.inner, &self.context.inner)) {
                Some(index) => {
                    stack.truncate(index);
                }
                None => warn!("context scope dropped but its context is not on the stack"),
            }
        });
        self.context.clear_registry();
        trace!(depth = Context::stack_depth(), "context popped");
    }
}
