use std::fmt::Write;

use super::ActionListener;
use super::Control;
use super::ControlBase;
use super::ControlCx;
use super::RenderCx;
use crate::constants::ACTION_LINK;
use crate::utils::escape_html;
use crate::Result;

/// Link that fires its listener when clicked.
///
/// The link targets the current page with `actionLink=<name>`; when a request
/// carries that parameter the link counts as clicked and queues its listener.
/// A link whose listener has an Ajax callback registers itself as an Ajax
/// target.
#[derive(Debug)]
pub struct ActionLink {
    base: ControlBase,
    label: String,
    value: Option<String>,
    clicked: bool,
}

impl ActionLink {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            base: ControlBase::new(name),
            value: None,
            clicked: false,
        }
    }

    pub fn with_label(
        mut self,
        label: impl Into<String>,
    ) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_listener(
        mut self,
        listener: ActionListener,
    ) -> Self {
        self.base.set_listener(listener);
        self
    }

    pub fn with_html_id(
        mut self,
        id: impl Into<String>,
    ) -> Self {
        self.base.set_html_id(id);
        self
    }

    pub fn is_clicked(&self) -> bool {
        self.clicked
    }

    /// Value of the `value` request parameter bound when clicked
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn is_ajax(&self) -> bool {
        self.base.listener().is_some_and(ActionListener::has_ajax)
    }

    /// `href` of the link, relative to the context path
    pub fn href(
        &self,
        context_path: &str,
        page_path: &str,
    ) -> String {
        format!(
            "{}{}?{}={}",
            context_path,
            page_path,
            ACTION_LINK,
            self.base.name().unwrap_or_default()
        )
    }
}

impl Control for ActionLink {
    fn name(&self) -> Option<&str> {
        self.base.name()
    }

    fn html_id(&self) -> Option<String> {
        self.base.html_id()
    }

    fn on_init(
        &mut self,
        cx: &mut ControlCx<'_>,
    ) -> Result<()> {
        if self.is_ajax() {
            cx.register_ajax_target();
        }
        Ok(())
    }

    fn on_process(
        &mut self,
        cx: &mut ControlCx<'_>,
    ) -> Result<bool> {
        let context = cx.context();
        let clicked = match (context.request_parameter(ACTION_LINK), self.base.name()) {
            (Some(param), Some(name)) => param == name,
            _ => false,
        };
        self.clicked = clicked;
        if clicked {
            self.value = context.request_parameter("value");
            self.base.dispatch_action_event(cx);
        }
        Ok(true)
    }

    fn render(
        &self,
        cx: &RenderCx<'_>,
        out: &mut String,
    ) {
        let context = cx.context();
        let href = self.href(&context.context_path(), &context.resource_path());
        let _ = write!(out, "<a href=\"{}\"", escape_html(&href));
        self.base.render_attributes(out);
        let _ = write!(out, ">{}</a>", escape_html(&self.label));
    }
}
