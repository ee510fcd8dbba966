use std::collections::HashMap;

use http::StatusCode;
use serde_json::Value;
use tracing::debug;

use super::Page;
use super::PageHeaderValue;
use super::PageHeaders;
use crate::utils::normalize_path;
use crate::Control;
use crate::ControlError;
use crate::ControlId;
use crate::ControlTree;
use crate::ModelError;
use crate::Result;

/// Entry of the page model
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEntry {
    Value(Value),
    /// A control attached to the page, rendered to HTML in the template
    Control(ControlId),
}

/// Server side forward target
pub enum Forward {
    Path(String),
    /// An already constructed page, processed in place of a new instance
    Page { path: String, page: Box<dyn Page> },
}

impl Forward {
    pub fn path(&self) -> &str {
        match self {
            Forward::Path(path) => path,
            Forward::Page { path, .. } => path,
        }
    }
}

impl std::fmt::Debug for Forward {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Forward::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Forward::Page { path, page } => f
                .debug_struct("Page")
                .field("path", path)
                .field("page", &(**page).type_name())
                .finish(),
        }
    }
}

/// What the dispatcher does once the page events have run
#[derive(Debug)]
pub enum Navigation {
    Redirect(String),
    Forward(Forward),
    /// Render the template at this path
    Render(String),
}

/// Framework owned state of a page for one request.
pub struct PageState {
    path: String,
    template: Option<String>,
    forward: Option<Forward>,
    redirect: Option<String>,
    model: HashMap<String, ModelEntry>,
    controls: ControlTree,
    headers: PageHeaders,
    content_type: Option<String>,
    status: StatusCode,
}

impl std::fmt::Debug for PageState {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("PageState")
            .field("path", &self.path)
            .field("forward", &self.forward)
            .field("redirect", &self.redirect)
            .field("model", &self.model.keys().collect::<Vec<_>>())
            .field("controls", &self.controls)
            .finish()
    }
}

impl PageState {
    pub fn new(path: impl AsRef<str>) -> Self {
        Self {
            path: normalize_path(path.as_ref()),
            template: None,
            forward: None,
            redirect: None,
            model: HashMap::new(),
            controls: ControlTree::new(),
            headers: PageHeaders::new(),
            content_type: None,
            status: StatusCode::OK,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Template to render: the explicit template, else the page path
    pub fn template(&self) -> &str {
        self.template.as_deref().unwrap_or(&self.path)
    }

    pub fn set_template(
        &mut self,
        template: impl AsRef<str>,
    ) {
        self.template = Some(normalize_path(template.as_ref()));
    }

    // -
    // Model

    /// Adds a named value to the model.
    ///
    /// Fails on an empty name, a `null` value, or a name already present; the
    /// existing entry is left unchanged.
    pub fn add_model(
        &mut self,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<()> {
        if name.is_empty() {
            return Err(ModelError::EmptyName.into());
        }
        let value = value.into();
        if value.is_null() {
            return Err(ModelError::NullValue(name.to_string()).into());
        }
        if self.model.contains_key(name) {
            return Err(ModelError::DuplicateName(name.to_string()).into());
        }
        self.model.insert(name.to_string(), ModelEntry::Value(value));
        Ok(())
    }

    pub fn model(&self) -> &HashMap<String, ModelEntry> {
        &self.model
    }

    pub fn model_value(
        &self,
        name: &str,
    ) -> Option<&Value> {
        match self.model.get(name)? {
            ModelEntry::Value(v) => Some(v),
            ModelEntry::Control(_) => None,
        }
    }

    pub fn remove_model(
        &mut self,
        name: &str,
    ) -> Option<ModelEntry> {
        self.model.remove(name)
    }

    // -
    // Controls

    /// Attaches a named control to the page and exposes it in the model
    /// under its name.
    pub fn add_control(
        &mut self,
        control: Box<dyn Control>,
    ) -> Result<ControlId> {
        let name = match control.name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(ControlError::MissingName.into()),
        };
        if self.model.contains_key(&name) {
            return Err(ModelError::DuplicateName(name).into());
        }
        let id = self.controls.insert_root(control);
        self.model.insert(name, ModelEntry::Control(id));
        Ok(id)
    }

    /// Detaches a page level control and its model entry.
    pub fn remove_control(
        &mut self,
        id: ControlId,
    ) -> Option<Box<dyn Control>> {
        self.model.retain(|_, entry| *entry != ModelEntry::Control(id));
        self.controls.remove(id)
    }

    pub fn controls(&self) -> &ControlTree {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut ControlTree {
        &mut self.controls
    }

    pub fn has_controls(&self) -> bool {
        !self.controls.is_empty()
    }

    // -
    // Navigation

    pub fn set_forward(
        &mut self,
        path: impl AsRef<str>,
    ) {
        self.forward = Some(Forward::Path(normalize_path(path.as_ref())));
    }

    pub fn set_forward_page(
        &mut self,
        path: impl AsRef<str>,
        page: Box<dyn Page>,
    ) {
        self.forward = Some(Forward::Page {
            path: normalize_path(path.as_ref()),
            page,
        });
    }

    pub fn forward(&self) -> Option<&Forward> {
        self.forward.as_ref()
    }

    /// Sets the redirect location. Paths starting with `/` are relative to
    /// the context path.
    pub fn set_redirect(
        &mut self,
        location: impl Into<String>,
    ) {
        self.redirect = Some(location.into());
    }

    pub fn redirect(&self) -> Option<&str> {
        self.redirect.as_deref()
    }

    /// Resolves the navigation outcome: redirect, else forward, else render.
    pub fn take_navigation(&mut self) -> Navigation {
        if let Some(location) = self.redirect.take() {
            if self.forward.is_some() {
                debug!(path = %self.path, "both redirect and forward set, redirect wins");
            }
            return Navigation::Redirect(location);
        }
        if let Some(forward) = self.forward.take() {
            return Navigation::Forward(forward);
        }
        Navigation::Render(self.template().to_string())
    }

    // -
    // Response

    pub fn headers(&self) -> &PageHeaders {
        &self.headers
    }

    pub fn set_headers(
        &mut self,
        headers: PageHeaders,
    ) {
        self.headers = headers;
    }

    pub fn set_header(
        &mut self,
        name: impl Into<String>,
        value: impl Into<PageHeaderValue>,
    ) {
        self.headers = self.headers.with(name, value);
    }

    /// Content type of the rendered page, `text/html` unless set
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn set_content_type(
        &mut self,
        content_type: impl Into<String>,
    ) {
        self.content_type = Some(content_type.into());
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(
        &mut self,
        status: StatusCode,
    ) {
        self.status = status;
    }
}
