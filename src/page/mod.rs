//! Pages: the per-request root coordinating model data, the control tree and
//! the navigation outcome.
mod error_page;
mod headers;
mod state;

pub use error_page::*;
pub use headers::*;
pub use state::*;

#[cfg(test)]
mod state_test;

use std::ops::Deref;
use std::ops::DerefMut;

use crate::control::AsAny;
use crate::Context;
use crate::Result;

/// User overridable life-cycle of a page.
///
/// For every request the dispatcher calls, in order: `on_init`,
/// `on_security_check`, control processing, `on_get` or `on_post`,
/// `on_render`, and finally `on_destroy`, which runs no matter what happened
/// before. A `false` security check skips everything up to `on_destroy`.
pub trait Page: AsAny {
    fn on_init(
        &mut self,
        _cx: &mut PageCx<'_>,
    ) -> Result<()> {
        Ok(())
    }

    /// Returning `false` skips control processing, `on_get`/`on_post` and
    /// `on_render`. Set a redirect here to send the user elsewhere.
    fn on_security_check(
        &mut self,
        _cx: &mut PageCx<'_>,
    ) -> Result<bool> {
        Ok(true)
    }

    fn on_get(
        &mut self,
        _cx: &mut PageCx<'_>,
    ) -> Result<()> {
        Ok(())
    }

    fn on_post(
        &mut self,
        _cx: &mut PageCx<'_>,
    ) -> Result<()> {
        Ok(())
    }

    fn on_render(
        &mut self,
        _cx: &mut PageCx<'_>,
    ) -> Result<()> {
        Ok(())
    }

    fn on_destroy(
        &mut self,
        _cx: &mut PageCx<'_>,
    ) -> Result<()> {
        Ok(())
    }
}

/// Hook context of a page: its [`PageState`] plus the request [`Context`].
///
/// Dereferences to the state, so `cx.add_model(..)` and `cx.set_redirect(..)`
/// read naturally inside hooks.
pub struct PageCx<'a> {
    state: &'a mut PageState,
    context: &'a Context,
}

impl<'a> PageCx<'a> {
    pub fn new(
        state: &'a mut PageState,
        context: &'a Context,
    ) -> Self {
        Self { state, context }
    }

    pub fn context(&self) -> &Context {
        self.context
    }

    pub fn state(&self) -> &PageState {
        self.state
    }

    pub fn state_mut(&mut self) -> &mut PageState {
        self.state
    }

    /// Redirects to the path page type `P` is configured under.
    pub fn set_redirect_to<P: Page>(&mut self) -> Result<()> {
        let path = self.context.page_path::<P>()?;
        self.state.set_redirect(path);
        Ok(())
    }

    /// Forwards to the path page type `P` is configured under.
    pub fn set_forward_to<P: Page>(&mut self) -> Result<()> {
        let path = self.context.page_path::<P>()?;
        self.state.set_forward(path);
        Ok(())
    }

    /// Forwards to a new instance of the page configured for `path`, after
    /// letting `prepare` set it up.
    pub fn forward_to_page<P, F>(
        &mut self,
        path: &str,
        prepare: F,
    ) -> Result<()>
    where
        P: Page,
        F: FnOnce(&mut P),
    {
        let mut page = self.context.create_page(path)?;
        let target: &mut dyn Page = &mut *page;
        let actual = (*target).type_name();
        match target.as_any_mut().downcast_mut::<P>() {
            Some(typed) => prepare(typed),
            None => {
                return Err(crate::Error::handler(format!(
                    "page configured for {} is a {}, not a {}",
                    path,
                    actual,
                    std::any::type_name::<P>()
                )))
            }
        }
        self.state.set_forward_page(path, page);
        Ok(())
    }
}

impl Deref for PageCx<'_> {
    type Target = PageState;

    fn deref(&self) -> &PageState {
        self.state
    }
}

impl DerefMut for PageCx<'_> {
    fn deref_mut(&mut self) -> &mut PageState {
        self.state
    }
}
