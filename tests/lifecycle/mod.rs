//! Page and control life-cycle guarantees of a full dispatch.
use std::sync::Arc;

use click::Error;
use click::Page;
use click::PageCx;
use click::Panel;
use click::Request;
use click::Result;
use http::StatusCode;
use serde_json::json;

use crate::common::servlet;
use crate::common::Log;
use crate::common::Tracker;

type Setup = Arc<dyn Fn(&Log, &mut PageCx<'_>) -> Result<()> + Send + Sync>;

/// Page recording its hooks, failing in `fail_in` and denying access when
/// `deny` is set. `setup` runs in `on_init`.
struct ScriptedPage {
    log: Log,
    fail_in: Option<&'static str>,
    deny: bool,
    setup: Option<Setup>,
}

impl ScriptedPage {
    fn hook(
        &self,
        name: &'static str,
    ) -> Result<()> {
        self.log.record(format!("page.{}", name));
        if self.fail_in == Some(name) {
            return Err(Error::handler(format!("{} failed", name)));
        }
        Ok(())
    }
}

impl Page for ScriptedPage {
    fn on_init(
        &mut self,
        cx: &mut PageCx<'_>,
    ) -> Result<()> {
        self.hook("on_init")?;
        if let Some(setup) = &self.setup {
            setup(&self.log, cx)?;
        }
        Ok(())
    }

    fn on_security_check(
        &mut self,
        _cx: &mut PageCx<'_>,
    ) -> Result<bool> {
        self.hook("on_security_check")?;
        Ok(!self.deny)
    }

    fn on_get(
        &mut self,
        _cx: &mut PageCx<'_>,
    ) -> Result<()> {
        self.hook("on_get")
    }

    fn on_post(
        &mut self,
        _cx: &mut PageCx<'_>,
    ) -> Result<()> {
        self.hook("on_post")
    }

    fn on_render(
        &mut self,
        _cx: &mut PageCx<'_>,
    ) -> Result<()> {
        self.hook("on_render")
    }

    fn on_destroy(
        &mut self,
        _cx: &mut PageCx<'_>,
    ) -> Result<()> {
        self.hook("on_destroy")
    }
}

fn scripted(
    log: &Log,
    fail_in: Option<&'static str>,
    deny: bool,
    setup: Option<Setup>,
) -> click::ClickServlet {
    let log = log.clone();
    servlet(move |builder| {
        let log = log.clone();
        let setup = setup.clone();
        builder.page_with("/page.htm", move || ScriptedPage {
            log: log.clone(),
            fail_in,
            deny,
            setup: setup.clone(),
        })
    })
}

#[test]
fn test_on_destroy_runs_once_whatever_fails() {
    for hook in ["on_init", "on_security_check", "on_get", "on_render"] {
        let log = Log::default();
        let servlet = scripted(&log, Some(hook), false, None);

        let response = servlet.service(Request::get("/page.htm")).unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "{}", hook);
        assert_eq!(log.count("page.on_destroy"), 1, "{}", hook);
    }

    let log = Log::default();
    let servlet = scripted(&log, None, false, None);
    servlet.service(Request::post("/page.htm")).unwrap();
    assert_eq!(log.count("page.on_destroy"), 1);
}

#[test]
fn test_denied_security_check_skips_processing() {
    let log = Log::default();
    let setup: Setup = Arc::new(|log: &Log, cx: &mut PageCx<'_>| -> Result<()> {
        cx.add_control(Box::new(Tracker::new("field", log)))?;
        Ok(())
    });
    let servlet = scripted(&log, None, true, Some(setup));

    servlet.service(Request::get("/page.htm")).unwrap();

    assert!(!log.contains("page.on_get"));
    assert!(!log.contains("page.on_render"));
    assert!(!log.contains("field.on_process"));
    assert!(log.contains("field.on_destroy"));
    assert!(log.contains("page.on_destroy"));
}

#[test]
fn test_container_processing_fails_fast() {
    let log = Log::default();
    let setup: Setup = Arc::new(|log: &Log, cx: &mut PageCx<'_>| -> Result<()> {
        let form = cx.add_control(Box::new(Tracker::new("form", log).container()))?;
        let tree = cx.controls_mut();
        tree.add(form, Box::new(Tracker::new("a", log).stopping()))?;
        tree.add(form, Box::new(Tracker::new("b", log).failing_destroy()))?;
        tree.add(form, Box::new(Tracker::new("c", log)))?;
        Ok(())
    });
    let servlet = scripted(&log, None, false, Some(setup));

    servlet.service(Request::get("/page.htm")).unwrap();

    let events = log.events();
    assert!(events.contains(&"a.on_process".to_string()));
    assert!(!log.contains("b.on_process"));
    assert!(!log.contains("c.on_process"));
    assert!(!log.contains("page.on_get"));
    assert!(!log.contains("page.on_render"));

    // init and destroy reach every child, even past a failing destroy
    for name in ["form", "a", "b", "c"] {
        assert!(log.contains(&format!("{}.on_init", name)), "{}", name);
        assert!(log.contains(&format!("{}.on_destroy", name)), "{}", name);
    }
    let destroyed: Vec<_> = events.iter().filter(|e| e.ends_with("on_destroy")).collect();
    assert_eq!(
        destroyed,
        vec!["a.on_destroy", "b.on_destroy", "c.on_destroy", "form.on_destroy", "page.on_destroy"]
    );
}

/// Adds `x` twice to its model
#[derive(Default)]
struct DuplicateModelPage;

impl Page for DuplicateModelPage {
    fn on_render(
        &mut self,
        cx: &mut PageCx<'_>,
    ) -> Result<()> {
        cx.add_model("x", json!(1))?;
        assert!(cx.add_model("x", json!(2)).is_err());
        Ok(())
    }
}

#[test]
fn test_duplicate_model_name_keeps_the_first_value() {
    let servlet = servlet(|builder| builder.page::<DuplicateModelPage>("/page.htm"));

    let response = servlet.service(Request::get("/page.htm")).unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body_text(), "page:1");
}

/// Puts two children named `a` into one panel
#[derive(Default)]
struct ReplacingPage;

impl Page for ReplacingPage {
    fn on_init(
        &mut self,
        cx: &mut PageCx<'_>,
    ) -> Result<()> {
        let log = Log::default();
        let panel = cx.add_control(Box::new(Panel::new("panel")))?;
        let tree = cx.controls_mut();
        tree.add(panel, Box::new(Tracker::new("a", &log).container()))?;
        tree.add(panel, Box::new(Tracker::new("b", &log)))?;
        tree.add(panel, Box::new(Tracker::new("a", &log)))?;
        Ok(())
    }
}

#[test]
fn test_container_duplicate_name_replaces() {
    let servlet = servlet(|builder| builder.page_with("/panel.htm", || ReplacingPage));

    let response = servlet.service(Request::get("/panel.htm")).unwrap();

    assert_eq!(response.body_text(), "<div id=\"panel\"><a><b></div>");
}

/// Stores a flash notice and shows whatever notice is pending
#[derive(Default)]
struct NoticePage;

impl Page for NoticePage {
    fn on_get(
        &mut self,
        cx: &mut PageCx<'_>,
    ) -> Result<()> {
        let context = cx.context().clone();
        if context.has_request_parameter("save") {
            context.set_flash_attribute("notice", json!("Saved"));
            cx.set_redirect("/notice.htm");
        }
        Ok(())
    }

    fn on_render(
        &mut self,
        cx: &mut PageCx<'_>,
    ) -> Result<()> {
        if cx.redirect().is_some() {
            return Ok(());
        }
        if let Some(notice) = cx.context().session_attribute("notice") {
            cx.add_model("notice", notice)?;
        }
        Ok(())
    }
}

#[test]
fn test_flash_attribute_survives_exactly_one_read() {
    let servlet = servlet(|builder| builder.page::<NoticePage>("/notice.htm"));

    let saved = servlet
        .service(Request::get("/notice.htm").with_param("save", "1"))
        .unwrap();
    assert_eq!(saved.status(), StatusCode::FOUND);
    let session = crate::common::session_id(&saved).expect("session cookie");

    let shown = servlet
        .service(Request::get("/notice.htm").with_session_id(session.clone()))
        .unwrap();
    assert_eq!(shown.body_text(), "notice:Saved");

    let again = servlet
        .service(Request::get("/notice.htm").with_session_id(session))
        .unwrap();
    assert_eq!(again.body_text(), "notice:");
}
