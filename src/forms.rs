//! Live model forms
//!
//! [`AdminForm`] is the server-held state behind an edit screen: the
//! current raw values, the per-field errors, and the form-wide errors.
//! The UI streams single-field edits into [`AdminForm::validate_field`]
//! as the user types, and failures surface next to the field that caused
//! them without touching any other field's state. Submission runs
//! [`AdminForm::validate_all`], which re-checks everything and yields the
//! cleaned, typed record only when the whole form passes.
//!
//! Values are held in wire form (strings, string arrays, booleans) until
//! cleaning, matching what HTML inputs produce.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{json, Value};

use crate::db::{value_to_string, AdminDatabase, Record};
use crate::error::AdminResult;
use crate::metadata::{FieldMeta, FieldType, ModelMeta};

/// Wire format for date values
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Wire format for time values
pub const TIME_FORMAT: &str = "%H:%M";
/// Wire format for `datetime-local` inputs
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Lifecycle of a form instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormPhase {
	/// Mounted, nothing validated yet
	Clean,
	/// At least one field edited since mount
	Dirty,
	/// Last full validation passed
	Valid,
	/// Last validation (field or full) found errors
	Invalid,
}

/// Server-side state of one model form.
///
/// # Examples
///
/// ```
/// # use live_admin::forms::AdminForm;
/// # use live_admin::metadata::{FieldMeta, FieldType, ModelMeta};
/// let meta = ModelMeta::new("blog", "article")
///     .with_field(FieldMeta::new("title", FieldType::Char { max_length: Some(100) }).required());
/// let form = AdminForm::blank(&meta, &["title".to_string()]);
/// assert_eq!(form.value("title"), serde_json::json!(""));
/// assert!(form.field_errors("title").is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct AdminForm {
	meta: ModelMeta,
	/// Field names included in the form, in render order
	field_names: Vec<String>,
	pub phase: FormPhase,
	data: HashMap<String, Value>,
	errors: HashMap<String, Vec<String>>,
	pub form_errors: Vec<String>,
}

impl AdminForm {
	/// Add form: every included field starts at its empty value
	/// (`""`, `[]` for multi-refs, `false` for booleans).
	pub fn blank(meta: &ModelMeta, field_names: &[String]) -> Self {
		let data = field_names
			.iter()
			.filter_map(|name| {
				let field = meta.field(name)?;
				Some((name.clone(), empty_value(field)))
			})
			.collect();
		Self {
			meta: meta.clone(),
			field_names: field_names.to_vec(),
			phase: FormPhase::Clean,
			data,
			errors: HashMap::new(),
			form_errors: Vec::new(),
		}
	}

	/// Change form: initial values extracted from an existing record.
	/// Single references become the referenced id as a string,
	/// multi-references become the list of related ids, and temporal
	/// values are normalized to their wire formats.
	pub async fn from_record(
		meta: &ModelMeta,
		field_names: &[String],
		record: &Record,
		pk: &str,
		db: &Arc<dyn AdminDatabase>,
	) -> AdminResult<Self> {
		let mut data = HashMap::new();
		for name in field_names {
			let Some(field) = meta.field(name) else { continue };
			let value = match &field.field_type {
				FieldType::ManyToMany { .. } => {
					let ids = db.related_ids(&meta.key(), pk, name).await?;
					json!(ids)
				}
				FieldType::ForeignKey { .. } => match record.get(name) {
					Some(Value::Null) | None => json!(""),
					Some(v) => json!(value_to_string(v)),
				},
				FieldType::Boolean => {
					json!(record.get(name).and_then(Value::as_bool).unwrap_or(false))
				}
				FieldType::Date => json!(normalize_temporal(record.get(name), DATE_FORMAT)),
				FieldType::Time => json!(normalize_temporal(record.get(name), TIME_FORMAT)),
				FieldType::DateTime => {
					json!(normalize_temporal(record.get(name), DATETIME_FORMAT))
				}
				_ => match record.get(name) {
					Some(Value::Null) | None => json!(""),
					Some(v) => json!(value_to_string(v)),
				},
			};
			data.insert(name.clone(), value);
		}
		Ok(Self {
			meta: meta.clone(),
			field_names: field_names.to_vec(),
			phase: FormPhase::Clean,
			data,
			errors: HashMap::new(),
			form_errors: Vec::new(),
		})
	}

	pub fn field_names(&self) -> &[String] {
		&self.field_names
	}

	/// Current raw value; `Null` for unknown fields
	pub fn value(&self, field: &str) -> Value {
		self.data.get(field).cloned().unwrap_or(Value::Null)
	}

	pub fn field_errors(&self, field: &str) -> &[String] {
		self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
	}

	pub fn is_valid(&self) -> bool {
		self.errors.values().all(Vec::is_empty) && self.form_errors.is_empty()
	}

	/// Accept an edit to one field and re-validate that field only.
	/// Other fields' errors are left exactly as they were.
	pub async fn validate_field(
		&mut self,
		field: &str,
		value: Value,
		db: &Arc<dyn AdminDatabase>,
	) -> AdminResult<()> {
		self.data.insert(field.to_string(), value);
		let messages = match self.meta.field(field) {
			Some(meta) => check_field(meta, &self.data[field], db).await?,
			None => Vec::new(),
		};
		if messages.is_empty() {
			self.errors.remove(field);
		} else {
			self.errors.insert(field.to_string(), messages);
		}
		self.phase = if self.is_valid() { FormPhase::Dirty } else { FormPhase::Invalid };
		Ok(())
	}

	/// Validate every field and rebuild the error set from scratch.
	/// Returns the cleaned, typed record when everything passes, `None`
	/// otherwise.
	pub async fn validate_all(
		&mut self,
		db: &Arc<dyn AdminDatabase>,
	) -> AdminResult<Option<Record>> {
		self.errors.clear();
		self.form_errors.clear();
		for name in &self.field_names {
			let Some(field) = self.meta.field(name) else { continue };
			let value = self.data.get(name).cloned().unwrap_or(Value::Null);
			let messages = check_field(field, &value, db).await?;
			if !messages.is_empty() {
				self.errors.insert(name.clone(), messages);
			}
		}
		if !self.is_valid() {
			self.phase = FormPhase::Invalid;
			return Ok(None);
		}
		self.phase = FormPhase::Valid;
		Ok(Some(self.cleaned()))
	}

	/// Typed record built from the current raw values. Only meaningful
	/// after a successful [`validate_all`](Self::validate_all).
	fn cleaned(&self) -> Record {
		let mut record = Record::new();
		for name in &self.field_names {
			let Some(field) = self.meta.field(name) else { continue };
			let raw = self.data.get(name).cloned().unwrap_or(Value::Null);
			record.insert(name.clone(), clean_value(field, &raw));
		}
		record
	}
}

fn empty_value(field: &FieldMeta) -> Value {
	match field.field_type {
		FieldType::ManyToMany { .. } => json!([]),
		FieldType::Boolean => json!(false),
		_ => json!(""),
	}
}

/// Pull a wire-format temporal string out of a stored value, truncating
/// longer representations (e.g. a full timestamp shown in a date input).
fn normalize_temporal(value: Option<&Value>, format: &str) -> String {
	let Some(raw) = value else { return String::new() };
	let s = value_to_string(raw);
	if s.is_empty() {
		return s;
	}
	// Stored values may carry seconds or timezone suffixes the inputs
	// do not; parse leniently, emit canonically.
	match format {
		DATE_FORMAT => NaiveDate::parse_from_str(s.get(..10).unwrap_or(&s), DATE_FORMAT)
			.map(|d| d.format(DATE_FORMAT).to_string())
			.unwrap_or(s),
		TIME_FORMAT => NaiveTime::parse_from_str(s.get(..5).unwrap_or(&s), TIME_FORMAT)
			.map(|t| t.format(TIME_FORMAT).to_string())
			.unwrap_or(s),
		_ => NaiveDateTime::parse_from_str(s.get(..16).unwrap_or(&s), DATETIME_FORMAT)
			.map(|dt| dt.format(DATETIME_FORMAT).to_string())
			.unwrap_or(s),
	}
}

fn is_empty_raw(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::String(s) => s.trim().is_empty(),
		Value::Array(items) => items.is_empty(),
		_ => false,
	}
}

/// Validation messages for one field's raw value. Empty means valid.
/// Reference checks hit the database; a database failure propagates.
async fn check_field(
	field: &FieldMeta,
	value: &Value,
	db: &Arc<dyn AdminDatabase>,
) -> AdminResult<Vec<String>> {
	let mut messages = Vec::new();

	if is_empty_raw(value) {
		if field.required {
			messages.push("This field is required.".to_string());
		}
		return Ok(messages);
	}

	match &field.field_type {
		FieldType::Char { max_length } => {
			let text = value_to_string(value);
			if let Some(max) = max_length {
				if text.chars().count() > *max {
					messages.push(format!(
						"Ensure this value has at most {} characters (it has {}).",
						max,
						text.chars().count()
					));
				}
			}
			check_choices(field, &text, &mut messages);
		}
		FieldType::Text | FieldType::Slug => {
			check_choices(field, &value_to_string(value), &mut messages);
		}
		FieldType::Email => {
			let text = value_to_string(value);
			let at = text.find('@');
			let valid = matches!(at, Some(pos) if pos > 0 && pos < text.len() - 1)
				&& !text.contains(char::is_whitespace);
			if !valid {
				messages.push("Enter a valid email address.".to_string());
			}
		}
		FieldType::Integer => {
			let text = value_to_string(value);
			if text.parse::<i64>().is_err() {
				messages.push("Enter a whole number.".to_string());
			} else {
				check_choices(field, &text, &mut messages);
			}
		}
		FieldType::Float => {
			if value_to_string(value).parse::<f64>().is_err() {
				messages.push("Enter a number.".to_string());
			}
		}
		FieldType::Boolean => {
			if !matches!(value, Value::Bool(_)) {
				let text = value_to_string(value);
				if text != "true" && text != "false" {
					messages.push("Enter true or false.".to_string());
				}
			}
		}
		FieldType::Date => {
			if NaiveDate::parse_from_str(&value_to_string(value), DATE_FORMAT).is_err() {
				messages.push("Enter a valid date (YYYY-MM-DD).".to_string());
			}
		}
		FieldType::Time => {
			if NaiveTime::parse_from_str(&value_to_string(value), TIME_FORMAT).is_err() {
				messages.push("Enter a valid time (HH:MM).".to_string());
			}
		}
		FieldType::DateTime => {
			let text = value_to_string(value);
			if NaiveDateTime::parse_from_str(&text, DATETIME_FORMAT).is_err() {
				messages.push("Enter a valid date and time.".to_string());
			}
		}
		FieldType::ForeignKey { to } => {
			let id = value_to_string(value);
			if !db.exists(to, &id).await? {
				messages.push(format!(
					"Select a valid choice. {} is not one of the available choices.",
					id
				));
			}
		}
		FieldType::ManyToMany { to } => {
			let ids: Vec<String> = match value {
				Value::Array(items) => items.iter().map(value_to_string).collect(),
				other => vec![value_to_string(other)],
			};
			for id in ids {
				if !db.exists(to, &id).await? {
					messages.push(format!(
						"Select a valid choice. {} is not one of the available choices.",
						id
					));
				}
			}
		}
	}

	Ok(messages)
}

fn check_choices(field: &FieldMeta, text: &str, messages: &mut Vec<String>) {
	if !field.choices.is_empty() && !field.choices.iter().any(|(value, _)| value == text) {
		messages.push(format!(
			"Select a valid choice. {} is not one of the available choices.",
			text
		));
	}
}

/// Coerce a validated raw value to its typed form for persistence.
fn clean_value(field: &FieldMeta, raw: &Value) -> Value {
	if is_empty_raw(raw) {
		return match field.field_type {
			FieldType::ManyToMany { .. } => json!([]),
			FieldType::Boolean => json!(false),
			FieldType::ForeignKey { .. } => Value::Null,
			_ => json!(""),
		};
	}
	match &field.field_type {
		FieldType::Integer => value_to_string(raw)
			.parse::<i64>()
			.map(|n| json!(n))
			.unwrap_or_else(|_| raw.clone()),
		FieldType::Float => value_to_string(raw)
			.parse::<f64>()
			.map(|n| json!(n))
			.unwrap_or_else(|_| raw.clone()),
		FieldType::Boolean => match raw {
			Value::Bool(b) => json!(b),
			other => json!(value_to_string(other) == "true"),
		},
		FieldType::ManyToMany { .. } => match raw {
			Value::Array(items) => json!(items.iter().map(value_to_string).collect::<Vec<_>>()),
			other => json!(vec![value_to_string(other)]),
		},
		_ => json!(value_to_string(raw)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::metadata::{FieldMeta, FieldType, ModelMeta};
	use crate::testing::MemoryDatabase;
	use serde_json::json;

	fn article_meta() -> ModelMeta {
		ModelMeta::new("blog", "article")
			.with_field(FieldMeta::new("id", FieldType::Integer).auto_created())
			.with_field(FieldMeta::new("title", FieldType::Char { max_length: Some(100) }).required())
			.with_field(FieldMeta::new("status", FieldType::Char { max_length: Some(20) }).with_choices(
				vec![("draft", "Draft"), ("published", "Published")],
			))
			.with_field(FieldMeta::new("is_featured", FieldType::Boolean))
			.with_field(FieldMeta::new(
				"category",
				FieldType::ForeignKey { to: "blog.category".to_string() },
			))
			.with_field(FieldMeta::new(
				"tags",
				FieldType::ManyToMany { to: "blog.tag".to_string() },
			))
			.with_field(FieldMeta::new("publish_date", FieldType::Date))
	}

	fn form_fields() -> Vec<String> {
		vec![
			"title".to_string(),
			"status".to_string(),
			"is_featured".to_string(),
			"category".to_string(),
			"tags".to_string(),
			"publish_date".to_string(),
		]
	}

	fn db_with_category() -> Arc<dyn AdminDatabase> {
		let db = MemoryDatabase::new();
		db.seed(
			"blog.category",
			vec![Record::from([
				("id".to_string(), json!(1)),
				("name".to_string(), json!("Tech")),
			])],
		);
		db.seed(
			"blog.tag",
			vec![
				Record::from([("id".to_string(), json!(1)), ("name".to_string(), json!("rust"))]),
				Record::from([("id".to_string(), json!(2)), ("name".to_string(), json!("web"))]),
			],
		);
		Arc::new(db)
	}

	#[test]
	fn test_blank_form_has_empty_values_and_no_errors() {
		let form = AdminForm::blank(&article_meta(), &form_fields());
		assert_eq!(form.phase, FormPhase::Clean);
		assert_eq!(form.value("title"), json!(""));
		assert_eq!(form.value("tags"), json!([]));
		assert_eq!(form.value("is_featured"), json!(false));
		assert!(form.is_valid());
		assert!(form.field_errors("title").is_empty());
	}

	#[tokio::test]
	async fn test_from_record_renders_fk_as_id_string() {
		let db = db_with_category();
		let record = Record::from([
			("id".to_string(), json!(5)),
			("title".to_string(), json!("Hello")),
			("category".to_string(), json!(1)),
			("publish_date".to_string(), json!("2026-03-01T00:00:00")),
		]);
		let form = AdminForm::from_record(&article_meta(), &form_fields(), &record, "5", &db)
			.await
			.unwrap();
		assert_eq!(form.value("category"), json!("1"));
		assert_eq!(form.value("publish_date"), json!("2026-03-01"));
	}

	#[tokio::test]
	async fn test_validate_field_touches_only_that_field() {
		let db = db_with_category();
		let mut form = AdminForm::blank(&article_meta(), &form_fields());

		form.validate_field("category", json!("999"), &db).await.unwrap();
		assert_eq!(form.field_errors("category").len(), 1);
		assert!(form.field_errors("title").is_empty());
		assert_eq!(form.phase, FormPhase::Invalid);

		// Fixing the field clears its error without re-validating others
		form.validate_field("category", json!("1"), &db).await.unwrap();
		assert!(form.field_errors("category").is_empty());
		assert_eq!(form.phase, FormPhase::Dirty);
	}

	#[tokio::test]
	async fn test_required_and_max_length() {
		let db = db_with_category();
		let mut form = AdminForm::blank(&article_meta(), &form_fields());

		form.validate_field("title", json!(""), &db).await.unwrap();
		assert_eq!(form.field_errors("title"), ["This field is required."]);

		let long = "x".repeat(101);
		form.validate_field("title", json!(long), &db).await.unwrap();
		assert!(form.field_errors("title")[0].contains("at most 100"));
	}

	#[tokio::test]
	async fn test_choice_membership() {
		let db = db_with_category();
		let mut form = AdminForm::blank(&article_meta(), &form_fields());
		form.validate_field("status", json!("bogus"), &db).await.unwrap();
		assert!(form.field_errors("status")[0].contains("bogus"));
		form.validate_field("status", json!("draft"), &db).await.unwrap();
		assert!(form.field_errors("status").is_empty());
	}

	#[tokio::test]
	async fn test_date_format_enforced() {
		let db = db_with_category();
		let mut form = AdminForm::blank(&article_meta(), &form_fields());
		form.validate_field("publish_date", json!("03/01/2026"), &db).await.unwrap();
		assert_eq!(form.field_errors("publish_date").len(), 1);
		form.validate_field("publish_date", json!("2026-03-01"), &db).await.unwrap();
		assert!(form.field_errors("publish_date").is_empty());
	}

	#[tokio::test]
	async fn test_validate_all_produces_typed_record() {
		let db = db_with_category();
		let mut form = AdminForm::blank(&article_meta(), &form_fields());
		form.validate_field("title", json!("Hello"), &db).await.unwrap();
		form.validate_field("status", json!("draft"), &db).await.unwrap();
		form.validate_field("category", json!("1"), &db).await.unwrap();
		form.validate_field("tags", json!(["1", "2"]), &db).await.unwrap();

		let cleaned = form.validate_all(&db).await.unwrap().unwrap();
		assert_eq!(form.phase, FormPhase::Valid);
		assert_eq!(cleaned["title"], json!("Hello"));
		assert_eq!(cleaned["is_featured"], json!(false));
		assert_eq!(cleaned["tags"], json!(["1", "2"]));
	}

	#[tokio::test]
	async fn test_validate_all_with_missing_required_yields_none() {
		let db = db_with_category();
		let mut form = AdminForm::blank(&article_meta(), &form_fields());
		let cleaned = form.validate_all(&db).await.unwrap();
		assert!(cleaned.is_none());
		assert_eq!(form.phase, FormPhase::Invalid);
		assert_eq!(form.field_errors("title"), ["This field is required."]);
	}

	#[tokio::test]
	async fn test_unknown_m2m_id_rejected() {
		let db = db_with_category();
		let mut form = AdminForm::blank(&article_meta(), &form_fields());
		form.validate_field("tags", json!(["1", "42"]), &db).await.unwrap();
		assert_eq!(form.field_errors("tags").len(), 1);
		assert!(form.field_errors("tags")[0].contains("42"));
	}
}
