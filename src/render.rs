//! Form control rendering
//!
//! Pure functions from field state to HTML strings. Nothing here touches
//! the database or the registry; the caller supplies a classified
//! [`FieldInfo`] and the current form state, and gets back markup with
//! every dynamic value escaped.

use serde_json::Value;

use crate::db::value_to_string;
use crate::introspect::{FieldInfo, FieldKind};

/// Escape a string for safe interpolation into HTML text or attribute
/// context.
///
/// # Examples
///
/// ```
/// use live_admin::render::escape_html;
///
/// assert_eq!(escape_html("<script>"), "&lt;script&gt;");
/// assert_eq!(escape_html("a \"b\" & 'c'"), "a &quot;b&quot; &amp; &#x27;c&#x27;");
/// ```
pub fn escape_html(input: &str) -> String {
	let mut escaped = String::with_capacity(input.len());
	for ch in input.chars() {
		match ch {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' => escaped.push_str("&quot;"),
			'\'' => escaped.push_str("&#x27;"),
			_ => escaped.push(ch),
		}
	}
	escaped
}

/// Everything needed to render one form control
pub struct FieldRender<'a> {
	pub name: &'a str,
	pub label: &'a str,
	pub value: &'a Value,
	pub info: &'a FieldInfo,
	pub errors: &'a [String],
	pub help_text: Option<&'a str>,
	pub required: bool,
}

/// Render one labelled form row: label, control, help text, errors.
pub fn render_field(field: &FieldRender<'_>) -> String {
	let mut html = String::new();
	let name = escape_html(field.name);
	let error_class = if field.errors.is_empty() { "" } else { " has-error" };

	html.push_str(&format!("<div class=\"form-row{}\">", error_class));
	html.push_str(&format!(
		"<label for=\"id_{}\">{}{}</label>",
		name,
		escape_html(field.label),
		if field.required { "<span class=\"required\">*</span>" } else { "" }
	));
	html.push_str(&render_control(field));
	if let Some(help) = field.help_text {
		html.push_str(&format!("<p class=\"help\">{}</p>", escape_html(help)));
	}
	for error in field.errors {
		html.push_str(&format!("<p class=\"error\">{}</p>", escape_html(error)));
	}
	html.push_str("</div>");
	html
}

fn render_control(field: &FieldRender<'_>) -> String {
	let name = escape_html(field.name);
	let value = value_to_string(field.value);

	match field.info.kind {
		FieldKind::Readonly => {
			let shown = if value.is_empty() { "-".to_string() } else { escape_html(&value) };
			format!("<div class=\"readonly\" id=\"id_{}\">{}</div>", name, shown)
		}
		FieldKind::ForeignRef => {
			let mut html = format!("<select name=\"{0}\" id=\"id_{0}\">", name);
			html.push_str(&format!(
				"<option value=\"\"{}>---------</option>",
				selected(value.is_empty())
			));
			for option in &field.info.options {
				html.push_str(&format!(
					"<option value=\"{}\"{}>{}</option>",
					escape_html(&option.value),
					selected(option.value == value),
					escape_html(&option.label)
				));
			}
			html.push_str("</select>");
			html
		}
		FieldKind::MultiRef => {
			let chosen: Vec<String> = match field.value {
				Value::Array(items) => items.iter().map(value_to_string).collect(),
				_ => Vec::new(),
			};
			let mut html = format!(
				"<select name=\"{0}\" id=\"id_{0}\" multiple size=\"6\">",
				name
			);
			for option in &field.info.options {
				html.push_str(&format!(
					"<option value=\"{}\"{}>{}</option>",
					escape_html(&option.value),
					selected(chosen.contains(&option.value)),
					escape_html(&option.label)
				));
			}
			html.push_str("</select>");
			html
		}
		FieldKind::Date | FieldKind::DateTime | FieldKind::Time => format!(
			"<input type=\"{}\" name=\"{ptr}\" id=\"id_{ptr}\" value=\"{}\">",
			field.info.input_type,
			escape_html(&value),
			ptr = name
		),
		FieldKind::Scalar => render_scalar(field, &name, &value),
	}
}

fn render_scalar(field: &FieldRender<'_>, name: &str, value: &str) -> String {
	// Declared choices render as a select regardless of the storage type
	if !field.info.options.is_empty() {
		let mut html = format!("<select name=\"{0}\" id=\"id_{0}\">", name);
		if !field.required {
			html.push_str(&format!(
				"<option value=\"\"{}>---------</option>",
				selected(value.is_empty())
			));
		}
		for option in &field.info.options {
			html.push_str(&format!(
				"<option value=\"{}\"{}>{}</option>",
				escape_html(&option.value),
				selected(option.value == value),
				escape_html(&option.label)
			));
		}
		html.push_str("</select>");
		return html;
	}

	match field.info.input_type {
		"checkbox" => format!(
			"<input type=\"checkbox\" name=\"{0}\" id=\"id_{0}\"{1}>",
			name,
			if field.value.as_bool().unwrap_or(false) { " checked" } else { "" }
		),
		"textarea" => format!(
			"<textarea name=\"{0}\" id=\"id_{0}\" rows=\"10\">{1}</textarea>",
			name,
			escape_html(value)
		),
		input_type => format!(
			"<input type=\"{}\" name=\"{ptr}\" id=\"id_{ptr}\" value=\"{}\">",
			input_type,
			escape_html(value),
			ptr = name
		),
	}
}

fn selected(is: bool) -> &'static str {
	if is { " selected" } else { "" }
}
