use std::collections::HashMap;

use fmtools_mcp_runtime::{ParamSlot, SynthesizedTool, ToolRegistry};

use crate::form::{self, Widget};

/// Text shown in a tab's result area after a run.
#[derive(Debug, Clone)]
pub struct ResultView {
    pub text: String,
    pub is_error: bool,
}

impl ResultView {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn tool_href(name: &str) -> String {
    format!("/tools/{}", urlencoding::encode(name))
}

const STYLE: &str = r#"<style>
body { font-family: system-ui, sans-serif; max-width: 820px; margin: 40px auto; padding: 0 20px; }
h1 { font-size: 1.4em; }
nav.tabs { display: flex; flex-wrap: wrap; gap: 4px; border-bottom: 1px solid #ccc; margin-bottom: 16px; }
nav.tabs a { padding: 6px 12px; text-decoration: none; color: #333; border: 1px solid transparent; border-bottom: none; }
nav.tabs a.active { border-color: #ccc; background: #fff; font-weight: 600; margin-bottom: -1px; }
label { display: block; margin-top: 12px; font-weight: 500; }
input[type="text"], input[type="number"], textarea { width: 100%; padding: 8px; margin-top: 4px; box-sizing: border-box; }
textarea { min-height: 4em; font-family: ui-monospace, monospace; }
button { margin-top: 20px; padding: 10px 24px; background: #111; color: #fff; border: none; cursor: pointer; font-size: 1em; }
.info { color: #666; font-size: 0.9em; margin-top: 8px; }
.hint { color: #888; font-weight: normal; }
pre.result { background: #f6f6f6; padding: 12px; white-space: pre-wrap; min-height: 2em; }
pre.result.error { background: #fdecec; color: #8a1f1f; }
</style>"#;

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
{STYLE}
</head>
<body>
{body}
</body>
</html>"#,
        title = html_escape(title),
    )
}

fn tab_strip(registry: &ToolRegistry, selected: &str) -> String {
    let tabs: String = registry
        .tools()
        .iter()
        .map(|tool| {
            let class = if tool.name() == selected {
                "tab active"
            } else {
                "tab"
            };
            format!(
                r#"<a class="{class}" href="{href}">{name}</a>"#,
                href = html_escape(&tool_href(tool.name())),
                name = html_escape(tool.name()),
            )
        })
        .collect();
    format!(r#"<nav class="tabs">{tabs}</nav>"#)
}

fn render_field(slot: &ParamSlot, value: Option<&str>) -> String {
    let name = html_escape(&slot.name);
    let label = html_escape(&form::label(slot));
    let value_attr = html_escape(value.unwrap_or_default());
    let control = match form::Widget::for_type(slot.param_type()) {
        Widget::Text => {
            format!(r#"<input type="text" name="{name}" value="{value_attr}">"#)
        }
        Widget::Number => {
            format!(r#"<input type="number" step="any" name="{name}" value="{value_attr}">"#)
        }
        Widget::Integer => {
            format!(r#"<input type="number" step="1" name="{name}" value="{value_attr}">"#)
        }
        Widget::Checkbox => {
            let checked = if value.is_some_and(|v| matches!(v, "true" | "on" | "1")) {
                " checked"
            } else {
                ""
            };
            format!(r#"<input type="checkbox" name="{name}" value="true"{checked}>"#)
        }
        Widget::Json => format!(r#"<textarea name="{name}">{value_attr}</textarea>"#),
    };
    let marker = if slot.required { " *" } else { "" };
    let hint = slot.param_type().host_type();
    format!(r#"<label>{label}{marker} <small class="hint">{hint}</small>{control}</label>"#)
}

/// Full page with `tool`'s tab selected. `values` refills the inputs after
/// a submit; `result` fills the result area.
pub fn tool_page(
    registry: &ToolRegistry,
    tool: &SynthesizedTool,
    values: &HashMap<String, String>,
    result: Option<&ResultView>,
) -> String {
    let fields: String = tool
        .slots()
        .iter()
        .map(|slot| render_field(slot, values.get(&slot.name).map(String::as_str)))
        .collect();
    let description = if tool.description().is_empty() {
        String::new()
    } else {
        format!(r#"<p class="info">{}</p>"#, html_escape(tool.description()))
    };
    let (result_class, result_text) = match result {
        Some(view) if view.is_error => ("result error", html_escape(&view.text)),
        Some(view) => ("result", html_escape(&view.text)),
        None => ("result", String::new()),
    };

    let body = format!(
        r#"<h1>FileMaker Tools</h1>
{tabs}
<section class="tool">
<h2>{name}</h2>
{description}
<form method="POST" action="{action}">
{fields}
<button type="submit">Run {name}</button>
</form>
<h3>Result</h3>
<pre class="{result_class}">{result_text}</pre>
</section>"#,
        tabs = tab_strip(registry, tool.name()),
        name = html_escape(tool.name()),
        action = html_escape(&tool_href(tool.name())),
    );
    layout(&format!("{} | FileMaker Tools", tool.name()), &body)
}

/// Shown when discovery returned no usable tools.
pub fn empty_page() -> String {
    layout(
        "FileMaker Tools",
        r#"<h1>FileMaker Tools</h1>
<p class="info">No tools are registered. Check that the discovery script returns a non-empty "tools" list.</p>"#,
    )
}

pub fn not_found_page(name: &str) -> String {
    layout(
        "Unknown tool | FileMaker Tools",
        &format!(
            r#"<h1>Unknown tool</h1>
<p class="info">No tool named <code>{}</code> is registered. <a href="/">Back to all tools</a></p>"#,
            html_escape(name)
        ),
    )
}
