use std::collections::HashMap;
use std::panic::catch_unwind;
use std::panic::resume_unwind;
use std::panic::AssertUnwindSafe;

use slotmap::new_key_type;
use slotmap::SecondaryMap;
use slotmap::SlotMap;
use tracing::error;
use tracing::trace;

use super::Control;
use super::ControlCx;
use super::RenderCx;
use crate::ControlError;
use crate::Context;
use crate::Result;

new_key_type! {
    /// Arena handle of a control in a [`ControlTree`]
    pub struct ControlId;
}

/// Arena holding a page's controls.
///
/// Root controls are the ones attached directly to the page. Containers keep
/// an ordered child list plus a name index; adding a named child whose name
/// is already taken replaces the old child in place.
#[derive(Default)]
pub struct ControlTree {
    ids: SlotMap<ControlId, ()>,
    controls: SecondaryMap<ControlId, Box<dyn Control>>,
    parent: SecondaryMap<ControlId, ControlId>,
    children: SecondaryMap<ControlId, Vec<ControlId>>,
    // present for containers only
    names: SecondaryMap<ControlId, HashMap<String, ControlId>>,
    roots: Vec<ControlId>,
}

impl std::fmt::Debug for ControlTree {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ControlTree")
            .field("len", &self.ids.len())
            .field("roots", &self.roots)
            .finish()
    }
}

impl ControlTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(
        &mut self,
        control: Box<dyn Control>,
    ) -> ControlId {
        let id = self.ids.insert(());
        if control.is_container() {
            self.names.insert(id, HashMap::new());
        }
        self.children.insert(id, Vec::new());
        self.controls.insert(id, control);
        id
    }

    /// Attaches `control` at the top level
    pub fn insert_root(
        &mut self,
        control: Box<dyn Control>,
    ) -> ControlId {
        let id = self.allocate(control);
        self.roots.push(id);
        id
    }

    /// Appends `control` to the container `parent`.
    ///
    /// A named control replaces an existing child of the same name, keeping
    /// that child's position.
    pub fn add(
        &mut self,
        parent: ControlId,
        control: Box<dyn Control>,
    ) -> Result<ControlId> {
        let size = self.children.get(parent).map(Vec::len).unwrap_or(0);
        self.insert(parent, control, size)
    }

    /// Inserts `control` into the container `parent` at `index`.
    pub fn insert(
        &mut self,
        parent: ControlId,
        control: Box<dyn Control>,
        index: usize,
    ) -> Result<ControlId> {
        if !self.ids.contains_key(parent) {
            return Err(ControlError::UnknownControl(format!("{:?}", parent)).into());
        }
        if !self.names.contains_key(parent) {
            let name = self.display_name(parent);
            return Err(ControlError::NotAContainer(name).into());
        }

        let name = control.name().map(str::to_string);
        let existing = name
            .as_ref()
            .and_then(|n| self.names.get(parent).and_then(|names| names.get(n)).copied());

        let index = match existing {
            Some(old) => {
                let position = self.position_in_parent(parent, old);
                trace!(name = ?name, "replacing control with duplicate name");
                self.remove(old);
                position.unwrap_or(index)
            }
            None => index,
        };

        let size = self.children.get(parent).map(Vec::len).unwrap_or(0);
        if index > size {
            return Err(ControlError::IndexOutOfBounds { index, size }.into());
        }

        let id = self.allocate(control);
        self.parent.insert(id, parent);
        if let Some(children) = self.children.get_mut(parent) {
            children.insert(index, id);
        }
        if let (Some(name), Some(names)) = (name, self.names.get_mut(parent)) {
            names.insert(name, id);
        }
        Ok(id)
    }

    /// Detaches and frees `id` and its descendants, returning the control.
    pub fn remove(
        &mut self,
        id: ControlId,
    ) -> Option<Box<dyn Control>> {
        if !self.ids.contains_key(id) {
            return None;
        }

        match self.parent.get(id).copied() {
            Some(parent) => {
                if let Some(children) = self.children.get_mut(parent) {
                    children.retain(|c| *c != id);
                }
                if let Some(names) = self.names.get_mut(parent) {
                    names.retain(|_, c| *c != id);
                }
            }
            None => self.roots.retain(|r| *r != id),
        }

        for child in self.children.get(id).cloned().unwrap_or_default() {
            self.remove(child);
        }

        self.ids.remove(id);
        self.parent.remove(id);
        self.children.remove(id);
        self.names.remove(id);
        self.controls.remove(id)
    }

    pub fn contains(
        &self,
        id: ControlId,
    ) -> bool {
        self.ids.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(
        &self,
        id: ControlId,
    ) -> Option<&dyn Control> {
        self.controls.get(id).map(|c| &**c)
    }

    pub fn get_mut(
        &mut self,
        id: ControlId,
    ) -> Option<&mut (dyn Control + 'static)> {
        self.controls.get_mut(id).map(|c| &mut **c)
    }

    pub fn downcast_ref<C: Control>(
        &self,
        id: ControlId,
    ) -> Option<&C> {
        self.get(id)?.as_any().downcast_ref::<C>()
    }

    pub fn downcast_mut<C: Control>(
        &mut self,
        id: ControlId,
    ) -> Option<&mut C> {
        self.get_mut(id)?.as_any_mut().downcast_mut::<C>()
    }

    pub fn roots(&self) -> &[ControlId] {
        &self.roots
    }

    pub fn parent(
        &self,
        id: ControlId,
    ) -> Option<ControlId> {
        self.parent.get(id).copied()
    }

    pub fn children(
        &self,
        id: ControlId,
    ) -> &[ControlId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn child_by_name(
        &self,
        parent: ControlId,
        name: &str,
    ) -> Option<ControlId> {
        self.names.get(parent)?.get(name).copied()
    }

    pub fn is_container(
        &self,
        id: ControlId,
    ) -> bool {
        self.names.contains_key(id)
    }

    /// Every control, parents before children, roots in insertion order
    pub fn walk(&self) -> Vec<ControlId> {
        let mut order = Vec::with_capacity(self.ids.len());
        for root in &self.roots {
            self.walk_from(*root, &mut order);
        }
        order
    }

    fn walk_from(
        &self,
        id: ControlId,
        order: &mut Vec<ControlId>,
    ) {
        order.push(id);
        for child in self.children(id) {
            self.walk_from(*child, order);
        }
    }

    /// Control whose HTML id equals `html_id`
    pub fn find_by_html_id(
        &self,
        html_id: &str,
    ) -> Option<ControlId> {
        self.walk()
            .into_iter()
            .find(|id| self.get(*id).and_then(|c| c.html_id()).as_deref() == Some(html_id))
    }

    fn position_in_parent(
        &self,
        parent: ControlId,
        id: ControlId,
    ) -> Option<usize> {
        self.children(parent).iter().position(|c| *c == id)
    }

    pub(crate) fn display_name(
        &self,
        id: ControlId,
    ) -> String {
        match self.get(id) {
            Some(control) => match control.name() {
                Some(name) => format!("'{}' {}", name, control.type_name()),
                None => control.type_name().to_string(),
            },
            None => format!("{:?}", id),
        }
    }

    // -
    // Life-cycle propagation

    /// Runs `hook` on the control `id`, detached from the tree for the call.
    fn with_control<R>(
        &mut self,
        id: ControlId,
        context: &Context,
        hook: impl FnOnce(&mut dyn Control, &mut ControlCx<'_>) -> Result<R>,
    ) -> Result<Option<R>> {
        let Some(mut control) = self.controls.remove(id) else {
            return Ok(None);
        };
        let result = catch_unwind(AssertUnwindSafe(|| {
            let mut cx = ControlCx::new(id, self, context);
            hook(&mut *control, &mut cx)
        }));
        // the hook may have removed the control from its parent
        if self.ids.contains_key(id) {
            self.controls.insert(id, control);
        }
        match result {
            Ok(result) => result.map(Some),
            Err(panic) => resume_unwind(panic),
        }
    }

    /// Initializes `id` and then each of its descendants.
    pub fn init(
        &mut self,
        id: ControlId,
        context: &Context,
    ) -> Result<()> {
        trace!("invoked: {}.on_init()", self.display_name(id));
        self.with_control(id, context, |c, cx| c.on_init(cx))?;
        for child in self.children(id).to_vec() {
            self.init(child, context)?;
        }
        Ok(())
    }

    /// Processes `id` and then its children, stopping at the first `false`.
    pub fn process(
        &mut self,
        id: ControlId,
        context: &Context,
    ) -> Result<bool> {
        let name = self.display_name(id);
        let proceed = self.with_control(id, context, |c, cx| c.on_process(cx))?.unwrap_or(true);
        trace!("invoked: {}.on_process() : {}", name, proceed);
        if !proceed {
            return Ok(false);
        }
        for child in self.children(id).to_vec() {
            if !self.process(child, context)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn render(
        &mut self,
        id: ControlId,
        context: &Context,
    ) -> Result<()> {
        trace!("invoked: {}.on_render()", self.display_name(id));
        self.with_control(id, context, |c, cx| c.on_render(cx))?;
        for child in self.children(id).to_vec() {
            self.render(child, context)?;
        }
        Ok(())
    }

    /// Destroys the children of `id` and then `id` itself. Errors and panics
    /// are logged per control and never returned.
    pub fn destroy(
        &mut self,
        id: ControlId,
        context: &Context,
    ) {
        for child in self.children(id).to_vec() {
            self.destroy(child, context);
        }

        let name = self.display_name(id);
        trace!("invoked: {}.on_destroy()", name);
        let outcome = catch_unwind(AssertUnwindSafe(|| self.with_control(id, context, |c, cx| c.on_destroy(cx))));
        match outcome {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => error!("error destroying control {}: {}", name, e),
            Err(panic) => error!("panic destroying control {}: {}", name, panic_message(&*panic)),
        }
    }

    pub fn init_all(
        &mut self,
        context: &Context,
    ) -> Result<()> {
        for root in self.roots.clone() {
            self.init(root, context)?;
        }
        Ok(())
    }

    /// Processes every root in order, stopping at the first `false`.
    pub fn process_all(
        &mut self,
        context: &Context,
    ) -> Result<bool> {
        for root in self.roots.clone() {
            if !self.process(root, context)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn render_all(
        &mut self,
        context: &Context,
    ) -> Result<()> {
        for root in self.roots.clone() {
            self.render(root, context)?;
        }
        Ok(())
    }

    pub fn destroy_all(
        &mut self,
        context: &Context,
    ) {
        for root in self.roots.clone() {
            self.destroy(root, context);
        }
    }

    // -
    // HTML output

    pub(crate) fn render_into(
        &self,
        id: ControlId,
        context: &Context,
        out: &mut String,
    ) {
        if let Some(control) = self.get(id) {
            control.render(&RenderCx::new(id, self, context), out);
        }
    }

    /// HTML of the control `id` and its children
    pub fn render_html(
        &self,
        id: ControlId,
        context: &Context,
    ) -> String {
        let mut out = String::new();
        self.render_into(id, context, &mut out);
        out
    }

    /// Distinct HTML imports of every control, in tree order
    pub fn html_imports(&self) -> String {
        let mut seen = std::collections::HashSet::new();
        let mut imports = String::new();
        for id in self.walk() {
            if let Some(import) = self.get(id).and_then(|c| c.html_imports()) {
                if seen.insert(import.clone()) {
                    imports.push_str(&import);
                    imports.push('\n');
                }
            }
        }
        imports
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
