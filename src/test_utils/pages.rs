use std::sync::Arc;

use serde_json::Value;

use super::EventLog;
use super::Fault;
use crate::Control;
use crate::Error;
use crate::Page;
use crate::PageCx;
use crate::Result;

pub type ControlFactory = Arc<dyn Fn(&EventLog) -> Box<dyn Control> + Send + Sync>;

/// Behaviour of a [`RecordingPage`], fixed when the page type is registered
#[derive(Clone, Default)]
pub struct Script {
    pub deny_security: bool,
    /// Hook returning an error, e.g. `"on_get"`
    pub fail_on: Option<&'static str>,
    pub panic_on: Option<&'static str>,
    pub destroy_fault: Fault,
    pub redirect: Option<String>,
    pub forward: Option<String>,
    pub template: Option<String>,
    pub model: Vec<(String, Value)>,
    pub controls: Vec<ControlFactory>,
}

impl Script {
    pub fn with_control<F>(
        mut self,
        factory: F,
    ) -> Self
    where
        F: Fn(&EventLog) -> Box<dyn Control> + Send + Sync + 'static,
    {
        self.controls.push(Arc::new(factory));
        self
    }
}

/// Page recording `<label>.<hook>` for each hook the dispatcher runs
pub struct RecordingPage {
    label: &'static str,
    log: EventLog,
    script: Script,
}

impl RecordingPage {
    pub fn new(
        label: &'static str,
        log: &EventLog,
        script: Script,
    ) -> Self {
        Self {
            label,
            log: log.clone(),
            script,
        }
    }

    fn hook(
        &self,
        hook: &'static str,
    ) -> Result<()> {
        self.log.record(format!("{}.{}", self.label, hook));
        if self.script.panic_on == Some(hook) {
            panic!("{} panicked in {}", self.label, hook);
        }
        if self.script.fail_on == Some(hook) {
            return Err(Error::handler(format!("{} failed in {}", self.label, hook)));
        }
        Ok(())
    }
}

impl Page for RecordingPage {
    fn on_init(
        &mut self,
        cx: &mut PageCx<'_>,
    ) -> Result<()> {
        self.hook("on_init")?;
        if let Some(template) = &self.script.template {
            cx.set_template(template);
        }
        for factory in &self.script.controls {
            cx.add_control(factory(&self.log))?;
        }
        Ok(())
    }

    fn on_security_check(
        &mut self,
        _cx: &mut PageCx<'_>,
    ) -> Result<bool> {
        self.hook("on_security_check")?;
        Ok(!self.script.deny_security)
    }

    fn on_get(
        &mut self,
        cx: &mut PageCx<'_>,
    ) -> Result<()> {
        self.hook("on_get")?;
        if let Some(location) = &self.script.redirect {
            cx.set_redirect(location.clone());
        }
        if let Some(path) = &self.script.forward {
            cx.set_forward(path);
        }
        Ok(())
    }

    fn on_post(
        &mut self,
        _cx: &mut PageCx<'_>,
    ) -> Result<()> {
        self.hook("on_post")
    }

    fn on_render(
        &mut self,
        cx: &mut PageCx<'_>,
    ) -> Result<()> {
        self.hook("on_render")?;
        for (name, value) in &self.script.model {
            cx.add_model(name, value.clone())?;
        }
        Ok(())
    }

    fn on_destroy(
        &mut self,
        _cx: &mut PageCx<'_>,
    ) -> Result<()> {
        self.hook("on_destroy")?;
        match self.script.destroy_fault {
            Fault::None => Ok(()),
            Fault::Error => Err(Error::handler("destroy failed")),
            Fault::Panic => panic!("destroy panicked"),
        }
    }
}
