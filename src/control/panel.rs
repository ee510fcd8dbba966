use super::Control;
use super::ControlBase;
use super::RenderCx;

/// Generic container rendering its children inside a `<div>`
#[derive(Debug, Default)]
pub struct Panel {
    base: ControlBase,
}

impl Panel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: ControlBase::new(name),
        }
    }

    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.base.set_attribute(name, value);
        self
    }

    pub fn base(&self) -> &ControlBase {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut ControlBase {
        &mut self.base
    }
}

impl Control for Panel {
    fn name(&self) -> Option<&str> {
        self.base.name()
    }

    fn html_id(&self) -> Option<String> {
        self.base.html_id()
    }

    fn is_container(&self) -> bool {
        true
    }

    fn render(
        &self,
        cx: &RenderCx<'_>,
        out: &mut String,
    ) {
        out.push_str("<div");
        self.base.render_attributes(out);
        out.push('>');
        cx.render_children(out);
        out.push_str("</div>");
    }
}
