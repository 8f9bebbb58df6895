//! Model metadata contract
//!
//! The host framework's object-relational layer describes each model to the
//! admin through [`ModelMeta`]: an ordered list of typed fields plus naming
//! and ordering information. The admin never inspects live model types; it
//! works entirely from this declarative description.

use serde::{Deserialize, Serialize};

/// The closed set of field types the admin understands.
///
/// Reference fields name the related model by its registry key
/// (`"app_label.model_name"` by convention, but any key the database
/// collaborator recognizes works).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldType {
	/// Single-line text with an optional maximum length
	Char { max_length: Option<usize> },
	/// Multi-line text
	Text,
	/// URL-safe short identifier
	Slug,
	/// Email address
	Email,
	Boolean,
	Integer,
	Float,
	Date,
	DateTime,
	Time,
	/// Single reference to another record
	ForeignKey { to: String },
	/// Multiple references to another record set
	ManyToMany { to: String },
}

impl FieldType {
	/// Whether values of this type identify records of another model
	pub fn is_relation(&self) -> bool {
		matches!(self, FieldType::ForeignKey { .. } | FieldType::ManyToMany { .. })
	}

	/// Related model key for reference types
	pub fn related_model(&self) -> Option<&str> {
		match self {
			FieldType::ForeignKey { to } | FieldType::ManyToMany { to } => Some(to),
			_ => None,
		}
	}
}

/// A single model field as declared by the host ORM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMeta {
	pub name: String,
	/// Human-readable name; defaults to the humanized field name
	pub verbose_name: Option<String>,
	pub field_type: FieldType,
	/// Whether a non-empty value is required on save
	pub required: bool,
	/// Editable fields appear in auto-generated forms
	pub editable: bool,
	/// Auto-created fields (auto PKs, auto timestamps) are skipped in forms
	pub auto_created: bool,
	pub help_text: Option<String>,
	/// Declared (value, label) choices; renders as a select when non-empty
	pub choices: Vec<(String, String)>,
}

impl FieldMeta {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			verbose_name: None,
			field_type,
			required: false,
			editable: true,
			auto_created: false,
			help_text: None,
			choices: Vec::new(),
		}
	}

	pub fn required(mut self) -> Self {
		self.required = true;
		self
	}

	pub fn readonly(mut self) -> Self {
		self.editable = false;
		self
	}

	pub fn auto_created(mut self) -> Self {
		self.auto_created = true;
		self.editable = false;
		self
	}

	pub fn with_verbose_name(mut self, name: impl Into<String>) -> Self {
		self.verbose_name = Some(name.into());
		self
	}

	pub fn with_help_text(mut self, text: impl Into<String>) -> Self {
		self.help_text = Some(text.into());
		self
	}

	pub fn with_choices(mut self, choices: Vec<(impl Into<String>, impl Into<String>)>) -> Self {
		self.choices = choices
			.into_iter()
			.map(|(v, l)| (v.into(), l.into()))
			.collect();
		self
	}

	/// Display name for this field: verbose name title-cased, else the
	/// humanized field name.
	pub fn display_name(&self) -> String {
		match &self.verbose_name {
			Some(v) => title_case(v),
			None => humanize_field_name(&self.name),
		}
	}
}

/// Declarative model description
///
/// # Examples
///
/// ```
/// use live_admin::metadata::{FieldMeta, FieldType, ModelMeta};
///
/// let meta = ModelMeta::new("blog", "article")
///     .with_field(FieldMeta::new("id", FieldType::Integer).auto_created())
///     .with_field(FieldMeta::new("title", FieldType::Char { max_length: Some(200) }).required());
///
/// assert_eq!(meta.key(), "blog.article");
/// assert_eq!(meta.verbose_name, "article");
/// assert!(meta.field("title").is_some());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMeta {
	pub app_label: String,
	/// Lowercase model name used in URLs and registry keys
	pub model_name: String,
	/// CamelCase object name (e.g. "Article")
	pub object_name: String,
	pub verbose_name: String,
	pub verbose_name_plural: String,
	/// Default ordering; leading '-' means descending
	pub ordering: Vec<String>,
	pub fields: Vec<FieldMeta>,
	pub pk_field: String,
}

impl ModelMeta {
	pub fn new(app_label: impl Into<String>, model_name: impl Into<String>) -> Self {
		let app_label = app_label.into();
		let model_name: String = model_name.into();
		let object_name = title_case(&model_name).replace(' ', "");
		let verbose_name = model_name.replace('_', " ");
		let verbose_name_plural = format!("{}s", verbose_name);
		Self {
			app_label,
			model_name,
			object_name,
			verbose_name,
			verbose_name_plural,
			ordering: Vec::new(),
			fields: Vec::new(),
			pk_field: "id".into(),
		}
	}

	pub fn with_field(mut self, field: FieldMeta) -> Self {
		self.fields.push(field);
		self
	}

	pub fn with_verbose_name_plural(mut self, plural: impl Into<String>) -> Self {
		self.verbose_name_plural = plural.into();
		self
	}

	pub fn with_ordering(mut self, ordering: Vec<impl Into<String>>) -> Self {
		self.ordering = ordering.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_pk_field(mut self, pk: impl Into<String>) -> Self {
		self.pk_field = pk.into();
		self
	}

	/// Registry key, `"{app_label}.{model_name}"`
	pub fn key(&self) -> String {
		format!("{}.{}", self.app_label, self.model_name)
	}

	pub fn field(&self, name: &str) -> Option<&FieldMeta> {
		self.fields.iter().find(|f| f.name == name)
	}

	/// Editable, non-auto-created fields in declaration order — the default
	/// form field set.
	pub fn editable_fields(&self) -> Vec<&FieldMeta> {
		self.fields
			.iter()
			.filter(|f| f.editable && !f.auto_created)
			.collect()
	}
}

/// Convert a field name to a human label: `"publish_date"` -> `"Publish Date"`
pub fn humanize_field_name(name: &str) -> String {
	title_case(&name.replace('_', " "))
}

/// Uppercase the first letter of each whitespace-separated word
pub fn title_case(s: &str) -> String {
	s.split(' ')
		.map(|word| {
			let mut chars = word.chars();
			match chars.next() {
				Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
				None => String::new(),
			}
		})
		.collect::<Vec<_>>()
		.join(" ")
}
