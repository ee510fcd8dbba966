//! Template contract: a page resolves to a template path which is merged
//! with the page model into the response.
mod simple;

pub use simple::*;


#[cfg(test)]
use mockall::automock;
use serde_json::Map;
use serde_json::Value;

use crate::Result;

/// Model handed to a template: page model entries plus the reserved names
pub type TemplateModel = Map<String, Value>;

#[cfg_attr(test, automock)]
pub trait TemplateEngine: Send + Sync + 'static {
    /// Whether a template exists at `path`
    fn has_template(
        &self,
        path: &str,
    ) -> bool;

    /// Merges `model` into the template at `path`, appending to `out`.
    ///
    /// On failure `out` keeps whatever was produced before the error.
    fn merge(
        &self,
        path: &str,
        model: &TemplateModel,
        out: &mut String,
    ) -> Result<()>;

    /// Drops cached templates, used when the application reloads
    fn clear_cache(&self);
}
