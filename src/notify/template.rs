//! Notification templates and variable rendering
//!
//! Templates are flat `{{variable}}` strings over a fixed variable set. A
//! variable the render options leave unpopulated substitutes as the empty
//! string, never as a literal placeholder.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::model::{ActionType, Alert, RenderOptions};

/// The three classes of outbound notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationClass {
    /// The alert's condition held and its action fired
    Trigger,
    /// Cycle summary for subscribed users, sent whether or not action was
    /// taken
    Status,
    /// The query cycle failed
    Error,
}

impl std::fmt::Display for NotificationClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NotificationClass::Trigger => "trigger",
            NotificationClass::Status => "status",
            NotificationClass::Error => "error",
        };
        f.write_str(s)
    }
}

/// The recognized template variables
pub const TEMPLATE_VARS: [&str; 7] = [
    "alert_name",
    "result",
    "results",
    "result_count",
    "current_time",
    "link_to_alert",
    "link_to_results",
];

/// Variable values for one render
pub type TemplateVars = HashMap<&'static str, String>;

/// Template lookup keyed by `(channel, class)`, falling back to a per-class
/// default when no channel-specific template is registered
pub struct TemplateRegistry {
    templates: HashMap<(ActionType, NotificationClass), String>,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        let mut templates = HashMap::new();
        // Email bodies carry the full result block; chat channels stay short
        templates.insert(
            (ActionType::Email, NotificationClass::Trigger),
            "Alert {{alert_name}} triggered at {{current_time}}.\n\n\
             Matched {{result_count}} result(s).\n{{results}}\n\
             {{link_to_results}}"
                .to_string(),
        );
        templates.insert(
            (ActionType::Email, NotificationClass::Error),
            "Alert {{alert_name}} failed to run.\n\n{{result}}\n{{link_to_alert}}".to_string(),
        );
        Self { templates }
    }
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the template for a `(channel, class)` pair
    pub fn register(&mut self, channel: ActionType, class: NotificationClass, template: &str) {
        self.templates.insert((channel, class), template.to_string());
    }

    /// The template to render for a channel and class
    pub fn lookup(&self, channel: ActionType, class: NotificationClass) -> &str {
        self.templates
            .get(&(channel, class))
            .map(String::as_str)
            .unwrap_or_else(|| default_template(class))
    }
}

fn default_template(class: NotificationClass) -> &'static str {
    match class {
        NotificationClass::Trigger => {
            "{{alert_name}}: condition met ({{result_count}} results) {{link_to_results}}"
        }
        NotificationClass::Status => "{{alert_name}}: {{result}} {{link_to_alert}}",
        NotificationClass::Error => "{{alert_name}}: query failed: {{result}} {{link_to_alert}}",
    }
}

/// Substitute every recognized `{{variable}}`; unset variables become empty
pub fn render(template: &str, vars: &TemplateVars) -> String {
    let mut out = template.to_string();
    for var in TEMPLATE_VARS {
        let placeholder = format!("{{{{{}}}}}", var);
        if out.contains(&placeholder) {
            let value = vars.get(var).map(String::as_str).unwrap_or("");
            out = out.replace(&placeholder, value);
        }
    }
    out
}

/// Build the variable set for one dispatch, honoring the alert's render
/// options. `note` feeds the `result` variable (cycle summary or error
/// detail).
pub fn build_vars(
    alert: &Alert,
    rows: &[serde_json::Value],
    note: Option<&str>,
    link_base: &str,
    now: DateTime<Utc>,
) -> TemplateVars {
    let options = &alert.action.options;
    let mut vars = TemplateVars::new();
    vars.insert("alert_name", alert.name.clone());

    if let Some(note) = note {
        vars.insert("result", note.to_string());
    }
    if options.include_results {
        vars.insert("results", format_rows(rows));
    }
    if options.include_result_count {
        vars.insert("result_count", rows.len().to_string());
    }
    if options.include_trigger_time {
        vars.insert("current_time", now.to_rfc3339());
    }
    if options.link_to_alert {
        vars.insert("link_to_alert", format!("{}/alerts/{}", link_base, alert.id));
    }
    if options.link_to_results {
        vars.insert(
            "link_to_results",
            format!("{}/alerts/{}/results", link_base, alert.id),
        );
    }
    vars
}

/// Render options that populate everything; used for error notifications so
/// the failure detail always comes through
pub fn full_render_options() -> RenderOptions {
    RenderOptions {
        link_to_alert: true,
        link_to_results: true,
        include_results: true,
        include_result_count: true,
        include_trigger_time: true,
    }
}

/// Human-readable block for result rows
fn format_rows(rows: &[serde_json::Value]) -> String {
    let mut out = String::new();
    for (i, row) in rows.iter().enumerate() {
        out.push_str(&format!("Result {}:\n", i + 1));
        match row.as_object() {
            Some(map) => {
                for (key, value) in map {
                    out.push_str(&format!("  {}: {}\n", key, value));
                }
            }
            None => out.push_str(&format!("  {}\n", row)),
        }
    }
    out
}
