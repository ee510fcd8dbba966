//! Dispatch orchestration: the shared [`ClickApp`] and the [`ClickServlet`]
//! driving each request through the page life-cycle.
mod app;
mod click_servlet;
mod render;
mod writer_pool;

pub use app::*;
pub use click_servlet::*;
pub use writer_pool::*;
