//! Field introspection
//!
//! Turns a [`FieldMeta`](crate::metadata::FieldMeta) plus the live database
//! into everything a form needs to render the right control: the broad
//! category of widget, the HTML input type, and the select options for
//! relation and choice fields.
//!
//! Introspection is fail-open by construction: a classification that needs
//! the database (loading reference options) and cannot get an answer logs a
//! warning and degrades to a plain text field, so a broken related table
//! never takes the whole form down with it.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::db::{record_pk, value_to_string, AdminDatabase, ListQuery, STR_KEY};
use crate::metadata::{FieldMeta, FieldType};
use crate::site::AdminSite;

/// Reference dropdowns stop loading options past this many rows.
pub const OPTION_LIMIT: u64 = 100;

/// Broad widget category for one field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldKind {
	/// Text, numbers, booleans, explicit choices
	Scalar,
	/// Single reference to another model
	ForeignRef,
	/// Multi-valued reference to another model
	MultiRef,
	Date,
	DateTime,
	Time,
	/// Shown but never bound to an input
	Readonly,
}

/// One entry of a select dropdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOption {
	pub value: String,
	pub label: String,
}

/// Classification result for one field
#[derive(Debug, Clone, Serialize)]
pub struct FieldInfo {
	pub kind: FieldKind,
	/// Populated for relation fields and explicit choices, empty otherwise
	pub options: Vec<SelectOption>,
	/// HTML `type` attribute for scalar inputs
	pub input_type: &'static str,
}

impl FieldInfo {
	fn scalar(input_type: &'static str) -> Self {
		Self { kind: FieldKind::Scalar, options: Vec::new(), input_type }
	}
}

/// Classify a field, loading relation options from the database.
///
/// Relation fields get up to [`OPTION_LIMIT`] `(pk, display)` pairs drawn
/// from the related table; the related model's primary-key field comes
/// from its registration on `site`, falling back to `"id"`. Non-editable
/// fields classify as [`FieldKind::Readonly`] regardless of their type.
pub async fn classify(
	field: &FieldMeta,
	site: &AdminSite,
	db: &Arc<dyn AdminDatabase>,
) -> FieldInfo {
	if !field.editable || field.auto_created {
		return FieldInfo {
			kind: FieldKind::Readonly,
			options: Vec::new(),
			input_type: "text",
		};
	}

	match &field.field_type {
		FieldType::ForeignKey { to } => FieldInfo {
			kind: FieldKind::ForeignRef,
			options: load_reference_options(db, to, site.pk_field(to), &field.name).await,
			input_type: "select",
		},
		FieldType::ManyToMany { to } => FieldInfo {
			kind: FieldKind::MultiRef,
			options: load_reference_options(db, to, site.pk_field(to), &field.name).await,
			input_type: "select",
		},
		FieldType::Date => FieldInfo {
			kind: FieldKind::Date,
			options: Vec::new(),
			input_type: "date",
		},
		FieldType::DateTime => FieldInfo {
			kind: FieldKind::DateTime,
			options: Vec::new(),
			input_type: "datetime-local",
		},
		FieldType::Time => FieldInfo {
			kind: FieldKind::Time,
			options: Vec::new(),
			input_type: "time",
		},
		_ if !field.choices.is_empty() => FieldInfo {
			kind: FieldKind::Scalar,
			options: field
				.choices
				.iter()
				.map(|(value, label)| SelectOption {
					value: value.clone(),
					label: label.clone(),
				})
				.collect(),
			input_type: "select",
		},
		FieldType::Boolean => FieldInfo::scalar("checkbox"),
		FieldType::Integer | FieldType::Float => FieldInfo::scalar("number"),
		FieldType::Email => FieldInfo::scalar("email"),
		FieldType::Text => FieldInfo::scalar("textarea"),
		_ => FieldInfo::scalar("text"),
	}
}

/// `(pk, display)` pairs from the related table, capped at
/// [`OPTION_LIMIT`]. Errors degrade to an empty option list.
async fn load_reference_options(
	db: &Arc<dyn AdminDatabase>,
	related_model: &str,
	related_pk: &str,
	field_name: &str,
) -> Vec<SelectOption> {
	let query = ListQuery::new().with_page(0, OPTION_LIMIT);
	match db.list(related_model, &query).await {
		Ok(records) => records
			.iter()
			.filter_map(|record| {
				let value = record_pk(record, related_pk)?;
				let label = record
					.get(STR_KEY)
					.map(value_to_string)
					.filter(|s| !s.is_empty())
					.unwrap_or_else(|| value.clone());
				Some(SelectOption { value, label })
			})
			.collect(),
		Err(err) => {
			warn!(
				related_model = %related_model,
				field = %field_name,
				error = %err,
				"failed to load reference options, rendering field without choices"
			);
			Vec::new()
		}
	}
}
