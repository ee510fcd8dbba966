//! Redirects, forwards and path resolution.
use click::Page;
use click::PageCx;
use click::Request;
use click::Result;
use http::StatusCode;
use serde_json::json;

use crate::common::servlet;

#[derive(Default)]
struct TargetPage {
    greeting: Option<String>,
}

impl Page for TargetPage {
    fn on_render(
        &mut self,
        cx: &mut PageCx<'_>,
    ) -> Result<()> {
        if let Some(greeting) = &self.greeting {
            cx.add_model("greeting", json!(greeting))?;
        }
        Ok(())
    }
}

/// Navigates according to the `to` request parameter
#[derive(Default)]
struct RouterPage;

impl Page for RouterPage {
    fn on_get(
        &mut self,
        cx: &mut PageCx<'_>,
    ) -> Result<()> {
        let to = cx.context().request_parameter("to").unwrap_or_default();
        match to.as_str() {
            "redirect" => cx.set_redirect_to::<TargetPage>()?,
            "external" => cx.set_redirect("https://example.com/docs"),
            "forward" => cx.set_forward_to::<TargetPage>()?,
            "instance" => cx.forward_to_page::<TargetPage, _>("/target.htm", |page| {
                page.greeting = Some("hi".to_string());
            })?,
            "both" => {
                cx.set_forward("/target.htm");
                cx.set_redirect("/target.htm");
            }
            "self" => cx.set_forward("/router.htm"),
            _ => {}
        }
        Ok(())
    }
}

fn router() -> click::ClickServlet {
    servlet(|builder| {
        builder
            .page::<RouterPage>("/router.htm")
            .page::<TargetPage>("/target.htm")
    })
}

#[test]
fn test_redirect_by_page_type_is_context_relative() {
    let servlet = router();

    let response = servlet
        .service(
            Request::get("/router.htm")
                .with_param("to", "redirect")
                .with_context_path("/shop"),
        )
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.header("location"), Some("/shop/target.htm"));
    assert!(response.body_text().is_empty());
}

#[test]
fn test_absolute_redirect_is_kept() {
    let response = router()
        .service(Request::get("/router.htm").with_param("to", "external"))
        .unwrap();
    assert_eq!(response.header("location"), Some("https://example.com/docs"));
}

#[test]
fn test_redirect_wins_over_forward() {
    let response = router()
        .service(Request::get("/router.htm").with_param("to", "both"))
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
}

#[test]
fn test_forward_renders_the_target() {
    let response = router()
        .service(Request::get("/router.htm").with_param("to", "forward"))
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body_text(), "target:");
}

#[test]
fn test_forward_reuses_a_prepared_instance() {
    let servlet = servlet(|builder| {
        builder
            .page::<RouterPage>("/router.htm")
            .page::<TargetPage>("/greeting.htm")
    });

    let response = servlet
        .service(Request::get("/router.htm").with_param("to", "instance"))
        .unwrap();

    // the instance was created for /target.htm, which is not configured here
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let response = router()
        .service(Request::get("/router.htm").with_param("to", "instance"))
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body_text(), "target:hi");
}

#[test]
fn test_forward_loop_is_bounded() {
    let response = router()
        .service(Request::get("/router.htm").with_param("to", "self"))
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.body_text().contains("forward depth limit"));
}

#[test]
fn test_unconfigured_path_renders_not_found() {
    let response = router().service(Request::get("/missing.htm")).unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.body_text().contains("Page Not Found"));
    assert!(response.body_text().contains("/missing.htm"));
}
