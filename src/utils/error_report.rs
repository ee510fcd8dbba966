use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt::Write;

use super::escape_html;
use crate::Error;

const PRODUCTION_MESSAGE: &str = "The application encountered an unexpected error.";

/// Diagnostic summary of a request failure
///
/// Rendered as an HTML fragment by the error page and appended to partially
/// rendered output when a template merge fails.
#[derive(Debug, Clone, Default)]
pub struct ErrorReport {
    /// Display text of the top level error
    pub message: String,
    /// Messages of the `source()` chain, outermost first
    pub causes: Vec<String>,
    /// The failure came from a template that could not be parsed
    pub parse_error: bool,
    /// Type name of the page that was processing, if any
    pub page_type: Option<String>,
    pub path: String,
    pub parameters: BTreeMap<String, Vec<String>>,
    /// Hide details behind a generic message
    pub production: bool,
}

impl ErrorReport {
    pub fn new(
        error: &Error,
        path: impl Into<String>,
        page_type: Option<&str>,
        parameters: BTreeMap<String, Vec<String>>,
        production: bool,
    ) -> Self {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        Self {
            message: error.to_string(),
            causes,
            parse_error: error.is_template_parse_error(),
            page_type: page_type.map(str::to_string),
            path: path.into(),
            parameters,
            production,
        }
    }

    /// Short message fit for end users in any mode
    pub fn summary(&self) -> &str {
        if self.production {
            PRODUCTION_MESSAGE
        } else {
            &self.message
        }
    }

    pub fn to_html(&self) -> String {
        let mut html = String::new();
        if self.production {
            let _ = write!(html, "<div id='errorReport' class='errorReport'>{}</div>", PRODUCTION_MESSAGE);
            return html;
        }

        let title = if self.parse_error { "Template Error" } else { "Exception" };
        html.push_str("<div id='errorReport' class='errorReport'>\n<table border='1' cellspacing='1' cellpadding='4' width='100%'>\n");
        let _ = writeln!(html, "<tr><td colspan='2'><b>{}</b></td></tr>", title);
        let _ = writeln!(html, "<tr><td><b>Message</b></td><td>{}</td></tr>", escape_html(&self.message));
        for (depth, cause) in self.causes.iter().enumerate() {
            let _ = writeln!(
                html,
                "<tr><td><b>Caused by [{}]</b></td><td>{}</td></tr>",
                depth + 1,
                escape_html(cause)
            );
        }
        if let Some(page_type) = &self.page_type {
            let _ = writeln!(html, "<tr><td><b>Page</b></td><td>{}</td></tr>", escape_html(page_type));
        }
        let _ = writeln!(html, "<tr><td><b>Path</b></td><td>{}</td></tr>", escape_html(&self.path));
        if !self.parameters.is_empty() {
            html.push_str("<tr><td valign='top'><b>Request Parameters</b></td><td>");
            for (name, values) in &self.parameters {
                let _ = write!(
                    html,
                    "{}={}<br/>",
                    escape_html(name),
                    escape_html(&values.join(", "))
                );
            }
            html.push_str("</td></tr>\n");
        }
        html.push_str("</table>\n</div>");
        html
    }
}
