//! Ajax requests: listener firing and targeted control processing.
use click::ActionLink;
use click::ActionListener;
use click::Page;
use click::PageCx;
use click::Partial;
use click::Request;
use click::Result;
use http::StatusCode;

use crate::common::servlet;
use crate::common::Log;
use crate::common::Tracker;

fn ajax(request: Request) -> Request {
    request.with_header("X-Requested-With", "XMLHttpRequest")
}

/// Two trackers: the first listener stops processing, the second answers
/// Ajax requests with a partial.
struct ListenersPage {
    log: Log,
}

impl Page for ListenersPage {
    fn on_init(
        &mut self,
        cx: &mut PageCx<'_>,
    ) -> Result<()> {
        let log = self.log.clone();
        let stop = ActionListener::new("stop", move |_| {
            log.record("stop.fired");
            Ok(false)
        });
        let log = self.log.clone();
        let answer = ActionListener::ajax("answer", move |_| {
            log.record("answer.fired");
            Ok(Some(Partial::text("partial")))
        });
        cx.add_control(Box::new(Tracker::new("first", &self.log).with_listener(stop)))?;
        cx.add_control(Box::new(Tracker::new("second", &self.log).with_listener(answer)))?;
        Ok(())
    }

    fn on_get(
        &mut self,
        _cx: &mut PageCx<'_>,
    ) -> Result<()> {
        self.log.record("page.on_get");
        Ok(())
    }
}

#[test]
fn test_stopping_listener_does_not_prevent_later_listeners() {
    let log = Log::default();
    let page_log = log.clone();
    let servlet = servlet(move |builder| {
        let log = page_log.clone();
        builder.page_with("/page.htm", move || ListenersPage { log: log.clone() })
    });

    let response = servlet.service(ajax(Request::get("/page.htm"))).unwrap();

    assert!(log.contains("stop.fired"));
    assert!(log.contains("answer.fired"));
    assert!(!log.contains("page.on_get"));
    assert_eq!(response.body_text(), "partial");
    assert_eq!(response.content_type(), Some("text/plain; charset=UTF-8"));
}

#[test]
fn test_plain_request_ignores_ajax_callbacks() {
    let log = Log::default();
    let page_log = log.clone();
    let servlet = servlet(move |builder| {
        let log = page_log.clone();
        builder.page_with("/page.htm", move || ListenersPage { log: log.clone() })
    });

    let response = servlet.service(Request::get("/page.htm")).unwrap();

    assert!(log.contains("stop.fired"));
    assert!(!log.contains("answer.fired"));
    assert!(!log.contains("page.on_get"));
    assert_eq!(response.body_text(), "page:");
}

/// Two Ajax listeners that both answer with a partial
struct CompetingPage {
    log: Log,
}

impl Page for CompetingPage {
    fn on_init(
        &mut self,
        cx: &mut PageCx<'_>,
    ) -> Result<()> {
        for name in ["early", "late"] {
            let log = self.log.clone();
            let answer = ActionListener::ajax(name, move |_| {
                log.record(format!("{}.fired", name));
                Ok(Some(Partial::text(name)))
            });
            cx.add_control(Box::new(Tracker::new(name, &self.log).with_listener(answer)))?;
        }
        Ok(())
    }
}

#[test]
fn test_first_partial_answers_the_request() {
    let log = Log::default();
    let page_log = log.clone();
    let servlet = servlet(move |builder| {
        let log = page_log.clone();
        builder.page_with("/page.htm", move || CompetingPage { log: log.clone() })
    });

    let response = servlet.service(ajax(Request::get("/page.htm"))).unwrap();

    assert!(log.contains("early.fired"));
    assert!(log.contains("late.fired"));
    assert_eq!(response.body_text(), "early");
}

/// An Ajax link next to an ordinary control
struct TargetedPage {
    log: Log,
}

impl Page for TargetedPage {
    fn on_init(
        &mut self,
        cx: &mut PageCx<'_>,
    ) -> Result<()> {
        let log = self.log.clone();
        let refresh = ActionListener::ajax("refresh", move |event| {
            log.record("refresh.fired");
            let clicked = event
                .source_control::<ActionLink>()
                .is_some_and(ActionLink::is_clicked);
            Ok(Some(Partial::html(format!("<p>clicked: {}</p>", clicked))))
        });
        cx.add_control(Box::new(ActionLink::new("refresh").with_listener(refresh)))?;
        cx.add_control(Box::new(Tracker::new("other", &self.log)))?;
        Ok(())
    }

    fn on_render(
        &mut self,
        _cx: &mut PageCx<'_>,
    ) -> Result<()> {
        self.log.record("page.on_render");
        Ok(())
    }
}

fn targeted(log: &Log) -> click::ClickServlet {
    let log = log.clone();
    servlet(move |builder| {
        let log = log.clone();
        builder.page_with("/page.htm", move || TargetedPage { log: log.clone() })
    })
}

#[test]
fn test_only_named_targets_are_processed() {
    let log = Log::default();
    let servlet = targeted(&log);

    let response = servlet
        .service(ajax(
            Request::get("/page.htm")
                .with_param("refresh", "")
                .with_param("actionLink", "refresh"),
        ))
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body_text(), "<p>clicked: true</p>");
    assert!(log.contains("refresh.fired"));
    assert!(!log.contains("other.on_process"));
    assert!(!log.contains("page.on_render"));
    assert!(log.contains("other.on_destroy"));
}

#[test]
fn test_unmatched_targeted_request_commits_empty() {
    let log = Log::default();
    let servlet = targeted(&log);

    let response = servlet.service(ajax(Request::get("/page.htm"))).unwrap();

    assert!(response.is_committed());
    assert!(response.body_text().is_empty());
    assert!(!log.contains("refresh.fired"));
    assert!(!log.contains("page.on_render"));
}
