//! Click Framework Error Hierarchy
//!
//! Defines the error types raised while assembling an application and while
//! driving a request through the page/control life-cycle, categorized by the
//! layer that produced them.

use std::time::Duration;

use config::ConfigError;
use tokio::task::JoinError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Infrastructure-level failures (io, server, availability)
    #[error(transparent)]
    System(#[from] SystemError),

    /// Configuration loading and application assembly failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Request dispatch failures
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Page model misuse
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Control tree misuse
    #[error(transparent)]
    Control(#[from] ControlError),

    /// Template lookup and merge failures
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// An action listener failed while firing
    #[error("Action listener '{listener}' failed for control {control}: {source}")]
    Listener {
        listener: String,
        control: String,
        #[source]
        source: Box<Error>,
    },

    /// Errors raised by application pages and controls
    #[error("Handler error: {0}")]
    Handler(Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The application is not initialized. `retry_after` is set when the
    /// application may come back through a reload.
    #[error("Service unavailable: {reason}")]
    Unavailable {
        reason: String,
        retry_after: Option<Duration>,
    },

    #[error("Server failed to start: {0}")]
    ServerStartFailed(String),

    #[error("Background task failed: {0}")]
    TaskFailed(#[from] JoinError),

    #[error("{0}")]
    SignalSendFailed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// `Context::current` was called outside of request processing
    #[error("No Context available on ThreadLocal Context Stack")]
    NoActiveContext,

    #[error("No Page configured for path: {0}")]
    PageNotConfigured(String),

    #[error("No path configured for Page type: {0}")]
    PagePathNotConfigured(&'static str),

    #[error("Forward to {path} exceeds the forward depth limit of {limit}")]
    ForwardDepthExceeded { path: String, limit: usize },

    #[error("HTTP method {0} is not supported")]
    MethodNotAllowed(String),

    #[error("Request body exceeds the limit of {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("Failed to read request body: {0}")]
    BodyRead(String),

    /// A panic unwound out of page processing
    #[error("Request processing panicked: {0}")]
    Panicked(String),

    /// The error page itself failed while handling `original`
    #[error("Error page failed while handling '{original}': {source}")]
    DoubleFault {
        original: String,
        #[source]
        source: Box<Error>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Null name parameter")]
    EmptyName,

    #[error("Null value parameter for model entry: {0}")]
    NullValue(String),

    #[error("Page model already contains element named: {0}")]
    DuplicateName(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("Control name must be defined to add it to a Page")]
    MissingName,

    #[error("Control {0} is not part of this control tree")]
    UnknownControl(String),

    #[error("Control {0} is not a container")]
    NotAContainer(String),

    #[error("Index: {index}, Size: {size}")]
    IndexOutOfBounds { index: usize, size: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Template {template} could not be parsed at line {line}: {message}")]
    Parse {
        template: String,
        line: usize,
        message: String,
    },

    #[error("Template {template} failed to render: {message}")]
    Render { template: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wraps an application error raised from a page or control hook.
    pub fn handler<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::Handler(error.into())
    }

    /// Whether the failure comes from a template that could not be parsed.
    pub fn is_template_parse_error(&self) -> bool {
        matches!(self, Error::Template(TemplateError::Parse { .. }))
    }

    /// Returns the retry hint when this error signals a temporarily unavailable application.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::System(SystemError::Unavailable { retry_after, .. }) => *retry_after,
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::System(SystemError::Io(e))
    }
}

impl From<JoinError> for Error {
    fn from(e: JoinError) -> Self {
        Error::System(SystemError::TaskFailed(e))
    }
}
