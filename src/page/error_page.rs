use http::StatusCode;
use tracing::debug;

use super::Page;
use super::PageCx;
use crate::ErrorReport;
use crate::Result;

/// Default error page, rendered with `/click/error.htm`.
///
/// Exposes `errorReport` (HTML diagnostic, or a generic message in production
/// mode), `message` and `production` to its template and answers with 500.
#[derive(Debug, Clone)]
pub struct ErrorPage {
    report: ErrorReport,
}

impl ErrorPage {
    pub fn new(report: ErrorReport) -> Self {
        Self { report }
    }

    pub fn report(&self) -> &ErrorReport {
        &self.report
    }
}

impl Page for ErrorPage {
    fn on_init(
        &mut self,
        cx: &mut PageCx<'_>,
    ) -> Result<()> {
        cx.set_status(StatusCode::INTERNAL_SERVER_ERROR);
        Ok(())
    }

    fn on_render(
        &mut self,
        cx: &mut PageCx<'_>,
    ) -> Result<()> {
        cx.add_model("errorReport", self.report.to_html())?;
        cx.add_model("message", self.report.summary())?;
        cx.add_model("production", self.report.production)?;
        Ok(())
    }
}

/// Page answering requests for paths with no configured page, rendered with
/// `/click/not-found.htm` and status 404.
#[derive(Debug, Default, Clone)]
pub struct NotFoundPage;

impl Page for NotFoundPage {
    fn on_init(
        &mut self,
        cx: &mut PageCx<'_>,
    ) -> Result<()> {
        cx.set_status(StatusCode::NOT_FOUND);
        Ok(())
    }

    fn on_render(
        &mut self,
        cx: &mut PageCx<'_>,
    ) -> Result<()> {
        let requested = cx.context().resource_path();
        debug!(path = %requested, "no page configured");
        cx.add_model("requestPath", requested)?;
        Ok(())
    }
}
