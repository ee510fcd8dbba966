use super::*;
use crate::test_utils::test_context;
use crate::test_utils::EventLog;
use crate::test_utils::RecordingControl;
use crate::Context;
use crate::Error;
use crate::Request;
use crate::RequestError;

fn ids(count: usize) -> Vec<ControlId> {
    let log = EventLog::new();
    let mut tree = ControlTree::new();
    (0..count)
        .map(|i| tree.insert_root(Box::new(RecordingControl::new(&format!("c{}", i), &log))))
        .collect()
}

fn listener(label: &str) -> ActionListener {
    ActionListener::new(label, |_| Ok(true))
}

#[test]
fn test_action_events_keep_registration_order_and_duplicates() {
    let ids = ids(2);
    let mut registry = ControlRegistry::new();
    registry.register_action_event(ids[1], listener("second"));
    registry.register_action_event(ids[0], listener("first"));
    registry.register_action_event(ids[1], listener("second"));

    assert!(registry.has_action_events());
    assert_eq!(registry.action_event_count(), 3);

    let events: Vec<_> = registry
        .take_action_events()
        .into_iter()
        .map(|(source, listener)| (source, listener.label().to_string()))
        .collect();
    assert_eq!(
        events,
        vec![
            (ids[1], "second".to_string()),
            (ids[0], "first".to_string()),
            (ids[1], "second".to_string()),
        ]
    );
    assert!(!registry.has_action_events());
}

#[test]
fn test_ajax_targets_form_a_set() {
    let ids = ids(2);
    let mut registry = ControlRegistry::new();
    assert!(!registry.has_ajax_targets());

    registry.register_ajax_target(ids[1]);
    registry.register_ajax_target(ids[0]);
    registry.register_ajax_target(ids[1]);

    assert_eq!(registry.ajax_targets(), vec![ids[1], ids[0]]);
    assert!(registry.is_ajax_target(ids[0]));
}

#[test]
fn test_clear_action_events_keeps_targets() {
    let ids = ids(1);
    let mut registry = ControlRegistry::new();
    registry.register_ajax_target(ids[0]);
    registry.register_action_event(ids[0], listener("l"));

    registry.clear_action_events();
    assert!(!registry.has_action_events());
    assert!(registry.has_ajax_targets());

    registry.clear();
    assert!(!registry.has_ajax_targets());
}

#[test]
fn test_free_functions_need_an_active_context() {
    let ids = ids(1);
    assert!(matches!(
        register_ajax_target(ids[0]),
        Err(Error::Request(RequestError::NoActiveContext))
    ));
    assert!(register_action_event(ids[0], listener("l")).is_err());
}

#[test]
fn test_free_functions_use_the_current_context() {
    let ids = ids(1);
    let context = test_context(Request::get("/"));
    {
        let _scope = context.push_thread_local();
        register_ajax_target(ids[0]).unwrap();
        register_action_event(ids[0], listener("l")).unwrap();
        assert!(Context::current().unwrap().registry().is_ajax_target(ids[0]));
    }
    assert_eq!(Context::stack_depth(), 0);
    assert!(!context.registry().has_action_events());
}
