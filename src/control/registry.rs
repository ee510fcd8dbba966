use indexmap::IndexSet;
use tracing::trace;

use super::ActionListener;
use super::ControlId;
use crate::Context;
use crate::Result;

/// Request scoped registry of Ajax targets and queued action events.
///
/// Lets a deeply nested control queue its action without any ancestor
/// knowing. Events are kept as parallel source/listener lists in registration
/// order and are not deduplicated: registering a pair twice fires it twice.
/// Ajax targets form a set.
#[derive(Default)]
pub struct ControlRegistry {
    ajax_targets: IndexSet<ControlId>,
    event_sources: Vec<ControlId>,
    event_listeners: Vec<ActionListener>,
}

impl ControlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_action_event(
        &mut self,
        source: ControlId,
        listener: ActionListener,
    ) {
        trace!(?source, listener = listener.label(), "action event registered");
        self.event_sources.push(source);
        self.event_listeners.push(listener);
    }

    pub fn register_ajax_target(
        &mut self,
        control: ControlId,
    ) {
        if self.ajax_targets.insert(control) {
            trace!(?control, "ajax target registered");
        }
    }

    pub fn has_ajax_targets(&self) -> bool {
        !self.ajax_targets.is_empty()
    }

    /// Ajax targets in registration order
    pub fn ajax_targets(&self) -> Vec<ControlId> {
        self.ajax_targets.iter().copied().collect()
    }

    pub fn is_ajax_target(
        &self,
        control: ControlId,
    ) -> bool {
        self.ajax_targets.contains(&control)
    }

    pub fn has_action_events(&self) -> bool {
        !self.event_sources.is_empty()
    }

    pub fn action_event_count(&self) -> usize {
        self.event_sources.len()
    }

    /// Removes and returns the queued pairs, so each fires at most once.
    pub fn take_action_events(&mut self) -> Vec<(ControlId, ActionListener)> {
        let sources = std::mem::take(&mut self.event_sources);
        let listeners = std::mem::take(&mut self.event_listeners);
        sources.into_iter().zip(listeners).collect()
    }

    /// Forgets queued events, keeping Ajax targets
    pub fn clear_action_events(&mut self) {
        self.event_sources.clear();
        self.event_listeners.clear();
    }

    pub fn clear(&mut self) {
        self.ajax_targets.clear();
        self.clear_action_events();
    }
}

/// Queues `listener` for `source` on the registry of the current request.
///
/// For code without a [`Context`] handle; fails outside of request processing.
pub fn register_action_event(
    source: ControlId,
    listener: ActionListener,
) -> Result<()> {
    Context::current()?.registry().register_action_event(source, listener);
    Ok(())
}

/// Marks `control` as an Ajax target on the registry of the current request.
pub fn register_ajax_target(control: ControlId) -> Result<()> {
    Context::current()?.registry().register_ajax_target(control);
    Ok(())
}
