use super::EventLog;
use crate::ActionListener;
use crate::Control;
use crate::ControlBase;
use crate::ControlCx;
use crate::Error;
use crate::RenderCx;
use crate::Result;

/// What a [`RecordingControl`] does in its hooks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fault {
    #[default]
    None,
    Error,
    Panic,
}

/// Control recording `<name>.<hook>` for every hook it runs
pub struct RecordingControl {
    base: ControlBase,
    log: EventLog,
    container: bool,
    process_result: bool,
    queue_on_process: bool,
    ajax_target: bool,
    imports: Option<String>,
    process_fault: Fault,
    destroy_fault: Fault,
}

impl RecordingControl {
    pub fn new(
        name: &str,
        log: &EventLog,
    ) -> Self {
        Self {
            base: ControlBase::new(name),
            log: log.clone(),
            container: false,
            process_result: true,
            queue_on_process: false,
            ajax_target: false,
            imports: None,
            process_fault: Fault::None,
            destroy_fault: Fault::None,
        }
    }

    pub fn unnamed(log: &EventLog) -> Self {
        let mut control = Self::new("", log);
        control.base = ControlBase::unnamed();
        control
    }

    pub fn container(mut self) -> Self {
        self.container = true;
        self
    }

    pub fn returning(
        mut self,
        proceed: bool,
    ) -> Self {
        self.process_result = proceed;
        self
    }

    /// Queues `listener` whenever the control is processed
    pub fn with_listener(
        mut self,
        listener: ActionListener,
    ) -> Self {
        self.base.set_listener(listener);
        self.queue_on_process = true;
        self
    }

    pub fn ajax_target(mut self) -> Self {
        self.ajax_target = true;
        self
    }

    pub fn with_html_id(
        mut self,
        id: &str,
    ) -> Self {
        self.base.set_html_id(id);
        self
    }

    pub fn with_imports(
        mut self,
        imports: &str,
    ) -> Self {
        self.imports = Some(imports.to_string());
        self
    }

    pub fn failing_process(
        mut self,
        fault: Fault,
    ) -> Self {
        self.process_fault = fault;
        self
    }

    pub fn failing_destroy(
        mut self,
        fault: Fault,
    ) -> Self {
        self.destroy_fault = fault;
        self
    }

    fn label(&self) -> &str {
        self.base.name().unwrap_or("unnamed")
    }

    fn record(
        &self,
        hook: &str,
    ) {
        self.log.record(format!("{}.{}", self.label(), hook));
    }

    fn fault(
        &self,
        fault: Fault,
        hook: &str,
    ) -> Result<()> {
        match fault {
            Fault::None => Ok(()),
            Fault::Error => Err(Error::handler(format!("{} {} failed", self.label(), hook))),
            Fault::Panic => panic!("{} {} panicked", self.label(), hook),
        }
    }
}

impl Control for RecordingControl {
    fn name(&self) -> Option<&str> {
        self.base.name()
    }

    fn html_id(&self) -> Option<String> {
        self.base.html_id()
    }

    fn is_container(&self) -> bool {
        self.container
    }

    fn on_init(
        &mut self,
        cx: &mut ControlCx<'_>,
    ) -> Result<()> {
        self.record("on_init");
        if self.ajax_target {
            cx.register_ajax_target();
        }
        Ok(())
    }

    fn on_process(
        &mut self,
        cx: &mut ControlCx<'_>,
    ) -> Result<bool> {
        self.record("on_process");
        self.fault(self.process_fault, "on_process")?;
        if self.queue_on_process {
            self.base.dispatch_action_event(cx);
        }
        Ok(self.process_result)
    }

    fn on_render(
        &mut self,
        _cx: &mut ControlCx<'_>,
    ) -> Result<()> {
        self.record("on_render");
        Ok(())
    }

    fn on_destroy(
        &mut self,
        _cx: &mut ControlCx<'_>,
    ) -> Result<()> {
        self.record("on_destroy");
        self.fault(self.destroy_fault, "on_destroy")
    }

    fn html_imports(&self) -> Option<String> {
        self.imports.clone()
    }

    fn render(
        &self,
        cx: &RenderCx<'_>,
        out: &mut String,
    ) {
        out.push('[');
        out.push_str(self.label());
        cx.render_children(out);
        out.push(']');
    }
}
