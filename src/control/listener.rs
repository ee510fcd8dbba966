use std::rc::Rc;

use http::StatusCode;
use serde_json::Value;
use tracing::debug;
use tracing::trace;

use super::Control;
use super::ControlId;
use crate::Context;
use crate::Error;
use crate::Page;
use crate::PageCx;
use crate::PageState;
use crate::Response;
use crate::Result;

type ActionFn = dyn Fn(&mut ActionEvent<'_>) -> Result<bool>;
type AjaxFn = dyn Fn(&mut ActionEvent<'_>) -> Result<Option<Partial>>;

/// Typed callback fired for a control's action.
///
/// The plain callback returns whether page processing should continue. The
/// optional Ajax callback is used instead for Ajax requests and may answer
/// with a [`Partial`] response.
#[derive(Clone)]
pub struct ActionListener {
    label: String,
    on_action: Rc<ActionFn>,
    on_ajax: Option<Rc<AjaxFn>>,
}

impl ActionListener {
    pub fn new<F>(
        label: impl Into<String>,
        on_action: F,
    ) -> Self
    where
        F: Fn(&mut ActionEvent<'_>) -> Result<bool> + 'static,
    {
        Self {
            label: label.into(),
            on_action: Rc::new(on_action),
            on_ajax: None,
        }
    }

    /// Listener with only an Ajax callback; for non Ajax requests it lets
    /// processing continue.
    pub fn ajax<F>(
        label: impl Into<String>,
        on_ajax: F,
    ) -> Self
    where
        F: Fn(&mut ActionEvent<'_>) -> Result<Option<Partial>> + 'static,
    {
        Self {
            label: label.into(),
            on_action: Rc::new(|_| Ok(true)),
            on_ajax: Some(Rc::new(on_ajax)),
        }
    }

    pub fn with_ajax<F>(
        mut self,
        on_ajax: F,
    ) -> Self
    where
        F: Fn(&mut ActionEvent<'_>) -> Result<Option<Partial>> + 'static,
    {
        self.on_ajax = Some(Rc::new(on_ajax));
        self
    }

    /// Listener calling back into the page of type `P`
    pub fn for_page<P, F>(
        label: impl Into<String>,
        handler: F,
    ) -> Self
    where
        P: Page,
        F: Fn(&mut P, &mut PageCx<'_>) -> Result<bool> + 'static,
    {
        let label = label.into();
        let expected = label.clone();
        Self::new(label, move |event| {
            let page: &mut dyn Page = &mut *event.page;
            let page = page.as_any_mut().downcast_mut::<P>().ok_or_else(|| {
                Error::handler(format!(
                    "listener {} expects page type {}",
                    expected,
                    std::any::type_name::<P>()
                ))
            })?;
            let mut cx = PageCx::new(&mut *event.state, event.context);
            handler(page, &mut cx)
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn has_ajax(&self) -> bool {
        self.on_ajax.is_some()
    }

    pub fn on_action(
        &self,
        event: &mut ActionEvent<'_>,
    ) -> Result<bool> {
        (self.on_action)(event)
    }

    /// Runs the Ajax callback, falling back to none for listeners without one.
    pub fn on_ajax_action(
        &self,
        event: &mut ActionEvent<'_>,
    ) -> Result<Option<Partial>> {
        match &self.on_ajax {
            Some(on_ajax) => on_ajax(event),
            None => Ok(None),
        }
    }
}

/// What a listener sees when it fires
pub struct ActionEvent<'a> {
    source: ControlId,
    page: &'a mut dyn Page,
    state: &'a mut PageState,
    context: &'a Context,
}

impl<'a> ActionEvent<'a> {
    pub(crate) fn new(
        source: ControlId,
        page: &'a mut dyn Page,
        state: &'a mut PageState,
        context: &'a Context,
    ) -> Self {
        Self {
            source,
            page,
            state,
            context,
        }
    }

    pub fn source(&self) -> ControlId {
        self.source
    }

    pub fn source_control<C: Control>(&self) -> Option<&C> {
        self.state.controls().downcast_ref::<C>(self.source)
    }

    pub fn context(&self) -> &Context {
        self.context
    }

    pub fn page<P: Page>(&self) -> Option<&P> {
        let page: &dyn Page = &*self.page;
        page.as_any().downcast_ref::<P>()
    }

    pub fn page_mut<P: Page>(&mut self) -> Option<&mut P> {
        let page: &mut dyn Page = &mut *self.page;
        page.as_any_mut().downcast_mut::<P>()
    }

    pub fn state(&self) -> &PageState {
        self.state
    }

    pub fn state_mut(&mut self) -> &mut PageState {
        self.state
    }
}

/// A response fragment returned by an Ajax listener in place of a page render
#[derive(Debug, Clone, PartialEq)]
pub struct Partial {
    content: String,
    content_type: String,
    status: StatusCode,
    headers: Vec<(String, String)>,
}

impl Partial {
    pub fn new(
        content: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            content_type: content_type.into(),
            status: StatusCode::OK,
            headers: Vec::new(),
        }
    }

    pub fn html(content: impl Into<String>) -> Self {
        Self::new(content, "text/html")
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::new(content, "text/plain")
    }

    pub fn json(value: &Value) -> Self {
        Self::new(value.to_string(), "application/json")
    }

    pub fn with_status(
        mut self,
        status: StatusCode,
    ) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Writes the fragment as the whole response body and commits.
    pub fn write_to(
        &self,
        response: &mut Response,
        charset: &str,
    ) -> Result<()> {
        let content_type = if self.content_type.contains("charset") {
            self.content_type.clone()
        } else {
            format!("{}; charset={}", self.content_type, charset)
        };
        response.reset_buffer();
        response.set_status(self.status);
        response.set_content_type(&content_type)?;
        for (name, value) in &self.headers {
            response.set_header(name, value)?;
        }
        response.write_str(&self.content);
        response.commit();
        Ok(())
    }
}

/// Result of firing the queued action events
#[derive(Debug, Clone, PartialEq)]
pub struct FireOutcome {
    /// `false` once any plain listener returned `false` or an Ajax callback ran
    pub continue_processing: bool,
    /// First non-empty partial produced by an Ajax callback
    pub partial: Option<Partial>,
}

impl Default for FireOutcome {
    fn default() -> Self {
        Self {
            continue_processing: true,
            partial: None,
        }
    }
}

/// Fires every queued (source, listener) pair once, in registration order.
///
/// All pairs fire even after one asks to stop: a `false` from a plain
/// listener, or any Ajax callback, only stops further page processing. When
/// several Ajax callbacks return a partial the first one wins.
pub fn fire_action_events(
    context: &Context,
    page: &mut dyn Page,
    state: &mut PageState,
) -> Result<FireOutcome> {
    let events = context.registry().take_action_events();
    let mut outcome = FireOutcome::default();
    if events.is_empty() {
        return Ok(outcome);
    }
    let is_ajax = context.is_ajax_request();

    for (source, listener) in events {
        let control = state.controls().display_name(source);
        let mut event = ActionEvent::new(source, &mut *page, &mut *state, context);

        if is_ajax && listener.has_ajax() {
            let partial = listener
                .on_ajax_action(&mut event)
                .map_err(|e| wrap_listener_error(&listener, &control, e))?;
            trace!("invoked: {} ajax listener {} : {}", control, listener.label(), partial.is_some());
            outcome.continue_processing = false;
            if outcome.partial.is_none() {
                outcome.partial = partial;
            } else if partial.is_some() {
                debug!("ignoring partial from {}, an earlier listener answered", listener.label());
            }
        } else {
            let proceed = listener
                .on_action(&mut event)
                .map_err(|e| wrap_listener_error(&listener, &control, e))?;
            trace!("invoked: {} listener {} : {}", control, listener.label(), proceed);
            if !proceed {
                outcome.continue_processing = false;
            }
        }
    }

    Ok(outcome)
}

fn wrap_listener_error(
    listener: &ActionListener,
    control: &str,
    error: Error,
) -> Error {
    Error::Listener {
        listener: listener.label().to_string(),
        control: control.to_string(),
        source: Box::new(error),
    }
}
