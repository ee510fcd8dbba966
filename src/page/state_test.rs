use serde_json::json;

use super::*;
use crate::test_utils::EventLog;
use crate::test_utils::RecordingControl;
use crate::ControlError;
use crate::Error;
use crate::ModelError;

#[derive(Default)]
struct TargetPage;
impl Page for TargetPage {}

#[test]
fn test_template_defaults_to_the_path() {
    let mut state = PageState::new("home.htm");
    assert_eq!(state.path(), "/home.htm");
    assert_eq!(state.template(), "/home.htm");

    state.set_template("layouts//home.htm");
    assert_eq!(state.template(), "/layouts/home.htm");
}

#[test]
fn test_add_model_rejects_bad_entries() {
    let mut state = PageState::new("/home.htm");
    state.add_model("title", "Home").unwrap();

    assert!(matches!(
        state.add_model("", "x"),
        Err(Error::Model(ModelError::EmptyName))
    ));
    assert!(matches!(
        state.add_model("missing", json!(null)),
        Err(Error::Model(ModelError::NullValue(_)))
    ));
    assert!(matches!(
        state.add_model("title", "Other"),
        Err(Error::Model(ModelError::DuplicateName(name))) if name == "title"
    ));
    assert_eq!(state.model_value("title"), Some(&json!("Home")));
}

#[test]
fn test_controls_are_exposed_in_the_model() {
    let log = EventLog::new();
    let mut state = PageState::new("/home.htm");

    let id = state.add_control(Box::new(RecordingControl::new("form", &log))).unwrap();
    assert_eq!(state.model().get("form"), Some(&ModelEntry::Control(id)));
    assert!(state.model_value("form").is_none());
    assert!(state.has_controls());

    assert!(matches!(
        state.add_control(Box::new(RecordingControl::new("form", &log))),
        Err(Error::Model(ModelError::DuplicateName(_)))
    ));
    assert!(matches!(
        state.add_control(Box::new(RecordingControl::unnamed(&log))),
        Err(Error::Control(ControlError::MissingName))
    ));

    assert!(state.remove_control(id).is_some());
    assert!(state.model().is_empty());
    assert!(!state.has_controls());
}

#[test]
fn test_redirect_wins_over_forward() {
    let mut state = PageState::new("/home.htm");
    state.set_forward("/other.htm");
    state.set_redirect("/login.htm");

    assert!(matches!(state.take_navigation(), Navigation::Redirect(l) if l == "/login.htm"));
    // the forward is left in place once the redirect is taken
    assert!(matches!(
        state.take_navigation(),
        Navigation::Forward(Forward::Path(p)) if p == "/other.htm"
    ));
    assert!(matches!(state.take_navigation(), Navigation::Render(t) if t == "/home.htm"));
}

#[test]
fn test_forward_page_keeps_the_instance() {
    let mut state = PageState::new("/home.htm");
    state.set_forward_page("target.htm", Box::new(TargetPage));

    assert_eq!(state.forward().map(Forward::path), Some("/target.htm"));
    match state.take_navigation() {
        Navigation::Forward(Forward::Page { path, page }) => {
            assert_eq!(path, "/target.htm");
            let page: &dyn Page = &*page;
            assert!(page.as_any().downcast_ref::<TargetPage>().is_some());
        }
        other => panic!("unexpected navigation {:?}", other),
    }
}

#[test]
fn test_response_settings() {
    let mut state = PageState::new("/home.htm");
    assert_eq!(state.status(), http::StatusCode::OK);
    assert!(state.content_type().is_none());

    state.set_status(http::StatusCode::CREATED);
    state.set_content_type("application/xml");
    state.set_headers(PageHeaders::no_cache());
    state.set_header("Pragma", "public");

    assert_eq!(state.status(), http::StatusCode::CREATED);
    assert_eq!(state.content_type(), Some("application/xml"));
    assert_eq!(state.headers().get("Pragma"), Some(&PageHeaderValue::Text("public".to_string())));
}
