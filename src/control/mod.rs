//! Controls: the composable units of request processing and HTML rendering.
//!
//! Controls live in a [`ControlTree`] arena owned by their page. Parent links
//! are arena ids, so ownership only ever flows from the tree to its nodes.
//! The tree drives the life-cycle hooks:
//!
//! - `on_init`, `on_render`: every control is notified, parents first
//! - `on_process`: parents first, stops at the first control returning `false`
//! - `on_destroy`: children first, failures are logged and never propagated
mod action_link;
mod base;
mod listener;
mod panel;
mod registry;
mod tree;

pub use action_link::*;
pub use base::*;
pub use listener::*;
pub use panel::*;
pub use registry::*;
pub use tree::*;

#[cfg(test)]
mod registry_test;

use std::any::Any;

use crate::Context;
use crate::Result;

/// Type erasure helpers implemented for every `'static` type
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// The event contract every control implements.
///
/// Hooks receive a [`ControlCx`] giving access to the request [`Context`] and
/// to the rest of the tree. All hooks default to no-ops.
pub trait Control: AsAny {
    /// Name used for model lookups and request parameter binding.
    /// Unnamed controls are legal but cannot be found by name.
    fn name(&self) -> Option<&str>;

    /// HTML id attribute, matched against request parameters by Ajax dispatch
    fn html_id(&self) -> Option<String> {
        self.name().map(str::to_string)
    }

    /// Containers may hold child controls
    fn is_container(&self) -> bool {
        false
    }

    fn on_init(
        &mut self,
        _cx: &mut ControlCx<'_>,
    ) -> Result<()> {
        Ok(())
    }

    /// Processes the request. Returning `false` stops further processing of
    /// the page.
    fn on_process(
        &mut self,
        _cx: &mut ControlCx<'_>,
    ) -> Result<bool> {
        Ok(true)
    }

    fn on_render(
        &mut self,
        _cx: &mut ControlCx<'_>,
    ) -> Result<()> {
        Ok(())
    }

    fn on_destroy(
        &mut self,
        _cx: &mut ControlCx<'_>,
    ) -> Result<()> {
        Ok(())
    }

    /// HTML head elements (scripts, styles) this control needs
    fn html_imports(&self) -> Option<String> {
        None
    }

    /// Writes the control's HTML
    fn render(
        &self,
        cx: &RenderCx<'_>,
        out: &mut String,
    );
}

/// Hook context: the control's id, the rest of the tree and the request.
///
/// While a hook runs its own control is detached from the tree, so
/// `tree().get(cx.id())` yields `None`.
pub struct ControlCx<'a> {
    id: ControlId,
    tree: &'a mut ControlTree,
    context: &'a Context,
}

impl<'a> ControlCx<'a> {
    pub(crate) fn new(
        id: ControlId,
        tree: &'a mut ControlTree,
        context: &'a Context,
    ) -> Self {
        Self { id, tree, context }
    }

    pub fn id(&self) -> ControlId {
        self.id
    }

    pub fn context(&self) -> &Context {
        self.context
    }

    pub fn tree(&self) -> &ControlTree {
        self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ControlTree {
        self.tree
    }

    pub fn parent(&self) -> Option<ControlId> {
        self.tree.parent(self.id)
    }

    /// Nearest enclosing control of type `C`
    pub fn ancestor<C: Control>(&self) -> Option<&C> {
        let mut current = self.tree.parent(self.id);
        while let Some(id) = current {
            if let Some(control) = self.tree.downcast_ref::<C>(id) {
                return Some(control);
            }
            current = self.tree.parent(id);
        }
        None
    }

    /// Adds a child to this control, which must be a container.
    pub fn add_child(
        &mut self,
        control: Box<dyn Control>,
    ) -> Result<ControlId> {
        self.tree.add(self.id, control)
    }

    /// Queues `listener` to fire once every control has been processed.
    pub fn register_action_event(
        &self,
        listener: ActionListener,
    ) {
        self.context.registry().register_action_event(self.id, listener);
    }

    /// Marks this control as eligible for targeted Ajax processing.
    pub fn register_ajax_target(&self) {
        self.context.registry().register_ajax_target(self.id);
    }
}

/// Rendering context handed to [`Control::render`]
pub struct RenderCx<'a> {
    id: ControlId,
    tree: &'a ControlTree,
    context: &'a Context,
}

impl<'a> RenderCx<'a> {
    pub(crate) fn new(
        id: ControlId,
        tree: &'a ControlTree,
        context: &'a Context,
    ) -> Self {
        Self { id, tree, context }
    }

    pub fn id(&self) -> ControlId {
        self.id
    }

    pub fn context(&self) -> &Context {
        self.context
    }

    pub fn tree(&self) -> &ControlTree {
        self.tree
    }

    /// Renders every child of this control, in order
    pub fn render_children(
        &self,
        out: &mut String,
    ) {
        for child in self.tree.children(self.id) {
            self.tree.render_into(*child, self.context, out);
        }
    }
}
