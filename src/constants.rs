// -
// Reserved request paths

/// Page path rendered when no page is configured for the requested path
pub const NOT_FOUND_PATH: &str = "/click/not-found.htm";
/// Page path of the error page
pub const ERROR_PATH: &str = "/click/error.htm";
/// Path that triggers an application reload for administrators
pub const RELOAD_APP_PATH: &str = "/click/reload-app.htm";
/// Role a caller needs to reload the application
pub const CLICK_ADMIN_ROLE: &str = "click-admin";

// -
// Request attributes and parameters

/// Request attribute marking a forwarded request
pub const CLICK_FORWARD: &str = "click-forward";
/// Header and parameter used to flag Ajax requests
pub const AJAX_REQUEST_HEADER: &str = "X-Requested-With";
pub const AJAX_REQUEST_VALUE: &str = "XMLHttpRequest";
/// Request parameter naming the clicked `ActionLink`
pub const ACTION_LINK: &str = "actionLink";

// -
// Session

pub const SESSION_COOKIE: &str = "CLICKSESSIONID";
/// Session attribute holding the user selected locale
pub const LOCALE_SESSION_KEY: &str = "locale";
/// How often the server drops expired sessions
pub const SESSION_PURGE_INTERVAL_SECS: u64 = 60;

// -
// Rendering

pub const DEFAULT_CHARSET: &str = "UTF-8";
pub const DEFAULT_CONTENT_TYPE: &str = "text/html";
pub const DEFAULT_LOCALE: &str = "en";
pub const WRITER_BUFFER_SIZE: usize = 4 * 1024;
pub const DEFAULT_MAX_BODY_BYTES: u64 = 2 * 1024 * 1024;
pub(crate) const RETRY_AFTER_SECS: u64 = 60;

/// Template model names the dispatcher always sets
pub(crate) const RESERVED_MODEL_NAMES: [&str; 5] = ["context", "path", "request", "session", "imports"];
