//! Click: a page and component oriented web framework.
//!
//! A request is served by a [`Page`] resolved from its path. The page owns a
//! tree of [`Control`]s, and the [`ClickServlet`] drives both through a fixed
//! life-cycle before the page is rendered with its template, redirected or
//! forwarded.
//!
//! ```ignore
//! let config = ClickConfig::new()?.validate()?;
//! let app_config = config.clone();
//! let servlet = ClickServlet::new(
//!     config.servlet.clone(),
//!     Arc::new(move || ClickApp::builder(app_config.clone()).page::<HomePage>("/home.htm").build()),
//! );
//! servlet.init()?;
//! let response = servlet.service(Request::get("/home.htm"))?;
//! ```
pub mod constants;
mod config;
mod context;
mod control;
mod errors;
pub mod metrics;
mod page;
pub mod server;
mod servlet;
mod template;
pub mod utils;

pub use config::*;
pub use context::*;
pub use control::*;
pub use errors::*;
pub use page::*;
pub use servlet::*;
pub use template::*;
pub use utils::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
