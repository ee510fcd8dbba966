use std::collections::BTreeMap;
use std::fmt::Write;

use super::ActionListener;
use super::ControlCx;
use crate::utils::escape_html;

/// State shared by the stock controls: name, HTML id and attributes, and an
/// optional action listener.
#[derive(Clone, Default)]
pub struct ControlBase {
    name: Option<String>,
    html_id: Option<String>,
    attributes: BTreeMap<String, String>,
    listener: Option<ActionListener>,
}

impl std::fmt::Debug for ControlBase {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ControlBase")
            .field("name", &self.name)
            .field("html_id", &self.html_id)
            .field("listener", &self.listener.as_ref().map(ActionListener::label))
            .finish()
    }
}

impl ControlBase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn unnamed() -> Self {
        Self::default()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(
        &mut self,
        name: impl Into<String>,
    ) {
        self.name = Some(name.into());
    }

    /// Explicit id, else the name
    pub fn html_id(&self) -> Option<String> {
        self.html_id.clone().or_else(|| self.name.clone())
    }

    pub fn set_html_id(
        &mut self,
        id: impl Into<String>,
    ) {
        self.html_id = Some(id.into());
    }

    pub fn attribute(
        &self,
        name: &str,
    ) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn set_attribute(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn listener(&self) -> Option<&ActionListener> {
        self.listener.as_ref()
    }

    pub fn set_listener(
        &mut self,
        listener: ActionListener,
    ) {
        self.listener = Some(listener);
    }

    /// Registers the listener, if any, to fire after control processing.
    pub fn dispatch_action_event(
        &self,
        cx: &ControlCx<'_>,
    ) {
        if let Some(listener) = &self.listener {
            cx.register_action_event(listener.clone());
        }
    }

    /// Writes ` id="..."` followed by the other attributes, sorted by name
    pub fn render_attributes(
        &self,
        out: &mut String,
    ) {
        if let Some(id) = self.html_id() {
            let _ = write!(out, " id=\"{}\"", escape_html(&id));
        }
        for (name, value) in &self.attributes {
            if name == "id" {
                continue;
            }
            let _ = write!(out, " {}=\"{}\"", name, escape_html(value));
        }
    }
}
