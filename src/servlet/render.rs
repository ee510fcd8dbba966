use std::time::Instant;

use serde_json::Map;
use serde_json::Value;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::ClickServlet;
use crate::constants::DEFAULT_CONTENT_TYPE;
use crate::constants::RESERVED_MODEL_NAMES;
use crate::metrics::RENDER_DURATION_METRIC;
use crate::Context;
use crate::ErrorReport;
use crate::ModelEntry;
use crate::PageState;
use crate::Result;
use crate::TemplateModel;

impl ClickServlet {
    /// Merges the page model into `template` and writes the result.
    ///
    /// Skipped once the response is committed. When the merge fails the
    /// partial output is kept, an error report is appended, the response is
    /// committed and the error returned.
    pub(super) fn render_template(
        &self,
        context: &Context,
        state: &PageState,
        template: &str,
    ) -> Result<()> {
        if context.response().is_committed() {
            debug!("response already committed, not rendering {}", template);
            return Ok(());
        }
        let start = Instant::now();
        let app = context.app().clone();
        let model = create_template_model(context, state);

        let content_type = format!(
            "{}; charset={}",
            state.content_type().unwrap_or(DEFAULT_CONTENT_TYPE),
            context.charset()
        );
        {
            let mut response = context.response_mut();
            response.set_status(state.status());
            response.set_content_type(&content_type)?;
            state.headers().apply_to(&mut response);
        }

        let mut writer = self.writers.get();
        let result = app.templates().merge(template, &model, &mut writer);
        if let Err(e) = &result {
            error!("error merging template {}: {}", template, e);
            let report = ErrorReport::new(
                e,
                state.path(),
                None,
                context.request().parameters().clone(),
                app.is_production(),
            );
            writer.push_str(&report.to_html());
        }
        {
            let mut response = context.response_mut();
            response.write_str(&writer);
            if result.is_err() {
                response.commit();
            }
        }
        self.writers.put(writer);

        let elapsed = start.elapsed();
        RENDER_DURATION_METRIC
            .with_label_values(&[template])
            .observe(elapsed.as_secs_f64() * 1000.0);
        if !app.is_production() {
            info!("renderTemplate: {} - {} ms", template, elapsed.as_millis());
        }
        result
    }
}

/// Page model entries, controls rendered to HTML, plus the reserved names.
///
/// A page entry using a reserved name is replaced.
pub(crate) fn create_template_model(
    context: &Context,
    state: &PageState,
) -> TemplateModel {
    let mut model = TemplateModel::new();
    for (name, entry) in state.model() {
        let value = match entry {
            ModelEntry::Value(value) => value.clone(),
            ModelEntry::Control(id) => Value::String(state.controls().render_html(*id, context)),
        };
        model.insert(name.clone(), value);
    }

    for name in RESERVED_MODEL_NAMES {
        let value = reserved_value(name, context, state);
        if model.insert(name.to_string(), value).is_some() {
            warn!(
                "page model contains an object keyed with reserved name \"{}\", the entry is replaced",
                name
            );
        }
    }
    model
}

fn reserved_value(
    name: &str,
    context: &Context,
    state: &PageState,
) -> Value {
    match name {
        "context" => Value::String(context.context_path()),
        "path" => Value::String(state.path().to_string()),
        "request" => {
            let request = context.request();
            let params: Map<String, Value> = request
                .parameters()
                .iter()
                .map(|(name, values)| {
                    let value = match values.as_slice() {
                        [single] => Value::String(single.clone()),
                        many => Value::from(many.to_vec()),
                    };
                    (name.clone(), value)
                })
                .collect();
            Value::Object(params)
        }
        "session" => Value::Object(context.existing_session().map(|s| s.values()).unwrap_or_default()),
        "imports" => Value::String(state.controls().html_imports()),
        _ => Value::Null,
    }
}
