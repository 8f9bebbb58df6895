//! Model admin configuration
//!
//! [`ModelAdmin`] decides how one model looks and behaves in the admin:
//! which columns the list view shows, what is searchable and filterable,
//! how the detail form is grouped, which bulk actions exist, and who may
//! do what. [`ModelAdminConfig`] is the declarative implementation most
//! registrations use; implement the trait directly for computed columns
//! or custom actions.

use async_trait::async_trait;
use std::sync::Arc;

use crate::auth::RequestContext;
use crate::db::{AdminDatabase, ListQuery, Record, STR_KEY, value_to_string};
use crate::error::{AdminError, AdminResult};
use crate::metadata::{FieldType, ModelMeta, humanize_field_name, title_case};

/// Sentinel list-display entry meaning "the record's string representation"
pub const STR_FIELD: &str = "__str__";

/// Name of the always-available bulk delete action
pub const DELETE_SELECTED: &str = "delete_selected";

/// A named group of fields in the detail form
#[derive(Debug, Clone)]
pub struct Fieldset {
	pub label: Option<String>,
	pub fields: Vec<String>,
}

impl Fieldset {
	pub fn new(label: Option<&str>, fields: Vec<impl Into<String>>) -> Self {
		Self {
			label: label.map(String::from),
			fields: fields.into_iter().map(Into::into).collect(),
		}
	}
}

/// A bulk action offered on the list view
#[derive(Debug, Clone)]
pub struct AdminAction {
	pub name: String,
	pub label: String,
}

impl AdminAction {
	/// Action with an explicit label
	pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
		Self { name: name.into(), label: label.into() }
	}

	/// Action labeled by title-casing its name
	pub fn from_name(name: impl Into<String>) -> Self {
		let name = name.into();
		let label = humanize_field_name(&name);
		Self { name, label }
	}
}

/// Per-model admin configuration and derived-query helpers.
///
/// Every method has a default so implementations only state what differs
/// from the stock behavior.
#[async_trait]
pub trait ModelAdmin: Send + Sync {
	/// The model this configuration governs
	fn meta(&self) -> &ModelMeta;

	/// Columns of the list view; `"__str__"` shows the record's string form
	fn list_display(&self) -> Vec<String> {
		vec![STR_FIELD.to_string()]
	}

	/// Fields offered as structured filters
	fn list_filter(&self) -> Vec<String> {
		Vec::new()
	}

	/// Fields the search box matches against (contains, OR-ed)
	fn search_fields(&self) -> Vec<String> {
		Vec::new()
	}

	/// Rows per list page
	fn list_per_page(&self) -> u64 {
		25
	}

	/// Explicit eager-load list; `None` auto-joins reference fields that
	/// appear in `list_display` to avoid per-row fetches of their labels
	fn list_select_related(&self) -> Option<Vec<String>> {
		None
	}

	/// List ordering override; falls back to the model's declared ordering
	fn ordering(&self) -> Vec<String> {
		Vec::new()
	}

	/// Explicit form fields; `None` means every editable, non-auto field
	/// in declaration order
	fn fields(&self) -> Option<Vec<String>> {
		None
	}

	/// Fields excluded from auto-generated forms
	fn exclude(&self) -> Vec<String> {
		Vec::new()
	}

	fn readonly_fields(&self) -> Vec<String> {
		Vec::new()
	}

	/// Explicit fieldsets; `None` means one unlabeled group of `get_fields`
	fn fieldsets(&self) -> Option<Vec<Fieldset>> {
		None
	}

	/// Extra bulk actions beyond the built-in delete
	fn extra_actions(&self) -> Vec<AdminAction> {
		Vec::new()
	}

	// Permission predicates default to allow-all; override for real checks.

	fn has_add_permission(&self, _ctx: &RequestContext) -> bool {
		true
	}

	fn has_change_permission(&self, _ctx: &RequestContext, _record: Option<&Record>) -> bool {
		true
	}

	fn has_delete_permission(&self, _ctx: &RequestContext, _record: Option<&Record>) -> bool {
		true
	}

	fn has_view_permission(&self, _ctx: &RequestContext, _record: Option<&Record>) -> bool {
		true
	}

	/// Base query for the list view: model ordering plus eager-load hints
	fn get_queryset(&self, _ctx: &RequestContext) -> ListQuery {
		let meta = self.meta();
		let ordering = if self.ordering().is_empty() {
			meta.ordering.clone()
		} else {
			self.ordering()
		};

		let select_related = match self.list_select_related() {
			Some(explicit) => explicit,
			None => self
				.list_display()
				.into_iter()
				.filter(|name| {
					meta.field(name)
						.is_some_and(|f| matches!(f.field_type, FieldType::ForeignKey { .. }))
				})
				.collect(),
		};

		let mut query = ListQuery::new();
		query.ordering = ordering;
		query.select_related = select_related;
		query
	}

	/// Form fields for this request: explicit `fields()` minus `exclude()`,
	/// else every editable non-auto field in declaration order
	fn get_fields(&self, _ctx: &RequestContext, _record: Option<&Record>) -> Vec<String> {
		let exclude = self.exclude();
		let names: Vec<String> = match self.fields() {
			Some(explicit) => explicit,
			None => self
				.meta()
				.editable_fields()
				.iter()
				.map(|f| f.name.clone())
				.collect(),
		};
		names.into_iter().filter(|n| !exclude.contains(n)).collect()
	}

	/// Fieldsets for the detail form, defaulting to a single unlabeled group
	fn get_fieldsets(&self, ctx: &RequestContext, record: Option<&Record>) -> Vec<Fieldset> {
		match self.fieldsets() {
			Some(sets) => sets,
			None => vec![Fieldset { label: None, fields: self.get_fields(ctx, record) }],
		}
	}

	/// Available bulk actions; always includes the built-in delete
	fn get_actions(&self, _ctx: &RequestContext) -> Vec<AdminAction> {
		let mut actions = vec![AdminAction::new(DELETE_SELECTED, "Delete selected items")];
		actions.extend(self.extra_actions());
		actions
	}

	/// Execute a bulk action over the selected primary keys and return its
	/// summary message. Override together with `extra_actions` for custom
	/// actions, delegating unknown names to this default.
	async fn run_action(
		&self,
		name: &str,
		_ctx: &RequestContext,
		db: &Arc<dyn AdminDatabase>,
		pks: &[String],
	) -> AdminResult<String> {
		match name {
			DELETE_SELECTED => {
				let count = db.bulk_delete(&self.meta().key(), pks).await?;
				Ok(format!("Successfully deleted {} items.", count))
			}
			other => Err(AdminError::ValidationError(format!("Unknown action '{}'", other))),
		}
	}

	/// Computed column value, checked before the record's own fields.
	/// The explicit counterpart of attribute probing: return `Some` for
	/// columns this admin computes itself.
	fn display_override(&self, _field: &str, _record: &Record) -> Option<String> {
		None
	}

	/// Label override for a computed column
	fn display_override_label(&self, _field: &str) -> Option<String> {
		None
	}

	/// Display value for one list cell.
	///
	/// Resolution order: the `__str__` sentinel; a `display_override`;
	/// the record field (eager-loaded reference labels, Yes/No booleans,
	/// "-" for null); "-" when nothing matches.
	fn field_value(&self, record: &Record, field: &str) -> String {
		if field == STR_FIELD {
			return record
				.get(STR_KEY)
				.map(value_to_string)
				.unwrap_or_else(|| "-".to_string());
		}

		if let Some(computed) = self.display_override(field, record) {
			return computed;
		}

		let meta_field = self.meta().field(field);
		if let Some(f) = meta_field {
			if matches!(f.field_type, FieldType::ForeignKey { .. }) {
				if let Some(label) = record.get(&format!("{}__str", field)) {
					if !label.is_null() {
						return value_to_string(label);
					}
				}
			}
		}

		match record.get(field) {
			Some(serde_json::Value::Bool(true)) => "Yes".to_string(),
			Some(serde_json::Value::Bool(false)) => "No".to_string(),
			Some(serde_json::Value::Null) | None => "-".to_string(),
			Some(value) => value_to_string(value),
		}
	}

	/// Column header for one list-display entry.
	///
	/// Resolution order: the `__str__` sentinel (model verbose name);
	/// an override label; the field's verbose name; the humanized name.
	fn field_display_name(&self, field: &str) -> String {
		if field == STR_FIELD {
			return title_case(&self.meta().verbose_name);
		}
		if let Some(label) = self.display_override_label(field) {
			return label;
		}
		match self.meta().field(field) {
			Some(f) => f.display_name(),
			None => humanize_field_name(field),
		}
	}
}

/// Declarative [`ModelAdmin`] implementation
///
/// # Examples
///
/// ```
/// use live_admin::metadata::{FieldMeta, FieldType, ModelMeta};
/// use live_admin::options::{ModelAdmin, ModelAdminConfig};
///
/// let meta = ModelMeta::new("blog", "article")
///     .with_field(FieldMeta::new("title", FieldType::Text).required())
///     .with_field(FieldMeta::new("status", FieldType::Text));
///
/// let admin = ModelAdminConfig::new(meta)
///     .with_list_display(vec!["title", "status"])
///     .with_search_fields(vec!["title"])
///     .with_list_per_page(50);
///
/// assert_eq!(admin.list_display(), vec!["title", "status"]);
/// assert_eq!(admin.list_per_page(), 50);
/// ```
#[derive(Debug, Clone)]
pub struct ModelAdminConfig {
	meta: ModelMeta,
	list_display: Vec<String>,
	list_filter: Vec<String>,
	search_fields: Vec<String>,
	list_per_page: u64,
	list_select_related: Option<Vec<String>>,
	ordering: Vec<String>,
	fields: Option<Vec<String>>,
	exclude: Vec<String>,
	readonly_fields: Vec<String>,
	fieldsets: Option<Vec<Fieldset>>,
	extra_actions: Vec<AdminAction>,
}

impl ModelAdminConfig {
	pub fn new(meta: ModelMeta) -> Self {
		Self {
			meta,
			list_display: vec![STR_FIELD.to_string()],
			list_filter: Vec::new(),
			search_fields: Vec::new(),
			list_per_page: 25,
			list_select_related: None,
			ordering: Vec::new(),
			fields: None,
			exclude: Vec::new(),
			readonly_fields: Vec::new(),
			fieldsets: None,
			extra_actions: Vec::new(),
		}
	}

	pub fn with_list_display(mut self, fields: Vec<impl Into<String>>) -> Self {
		self.list_display = fields.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_list_filter(mut self, fields: Vec<impl Into<String>>) -> Self {
		self.list_filter = fields.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_search_fields(mut self, fields: Vec<impl Into<String>>) -> Self {
		self.search_fields = fields.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_list_per_page(mut self, per_page: u64) -> Self {
		self.list_per_page = per_page;
		self
	}

	pub fn with_list_select_related(mut self, fields: Vec<impl Into<String>>) -> Self {
		self.list_select_related = Some(fields.into_iter().map(Into::into).collect());
		self
	}

	pub fn with_ordering(mut self, fields: Vec<impl Into<String>>) -> Self {
		self.ordering = fields.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_fields(mut self, fields: Vec<impl Into<String>>) -> Self {
		self.fields = Some(fields.into_iter().map(Into::into).collect());
		self
	}

	pub fn with_exclude(mut self, fields: Vec<impl Into<String>>) -> Self {
		self.exclude = fields.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_readonly_fields(mut self, fields: Vec<impl Into<String>>) -> Self {
		self.readonly_fields = fields.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_fieldsets(mut self, fieldsets: Vec<Fieldset>) -> Self {
		self.fieldsets = Some(fieldsets);
		self
	}

	pub fn with_action(mut self, action: AdminAction) -> Self {
		self.extra_actions.push(action);
		self
	}
}

#[async_trait]
impl ModelAdmin for ModelAdminConfig {
	fn meta(&self) -> &ModelMeta {
		&self.meta
	}

	fn list_display(&self) -> Vec<String> {
		self.list_display.clone()
	}

	fn list_filter(&self) -> Vec<String> {
		self.list_filter.clone()
	}

	fn search_fields(&self) -> Vec<String> {
		self.search_fields.clone()
	}

	fn list_per_page(&self) -> u64 {
		self.list_per_page
	}

	fn list_select_related(&self) -> Option<Vec<String>> {
		self.list_select_related.clone()
	}

	fn ordering(&self) -> Vec<String> {
		self.ordering.clone()
	}

	fn fields(&self) -> Option<Vec<String>> {
		self.fields.clone()
	}

	fn exclude(&self) -> Vec<String> {
		self.exclude.clone()
	}

	fn readonly_fields(&self) -> Vec<String> {
		self.readonly_fields.clone()
	}

	fn fieldsets(&self) -> Option<Vec<Fieldset>> {
		self.fieldsets.clone()
	}

	fn extra_actions(&self) -> Vec<AdminAction> {
		self.extra_actions.clone()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::metadata::FieldMeta;
	use serde_json::json;

	fn article_meta() -> ModelMeta {
		ModelMeta::new("tests", "article")
			.with_field(FieldMeta::new("id", FieldType::Integer).auto_created())
			.with_field(FieldMeta::new("title", FieldType::Char { max_length: Some(200) }).required())
			.with_field(FieldMeta::new("content", FieldType::Text))
			.with_field(FieldMeta::new("is_featured", FieldType::Boolean))
			.with_field(FieldMeta::new(
				"category",
				FieldType::ForeignKey { to: "tests.category".into() },
			))
			.with_ordering(vec!["-id"])
	}

	#[test]
	fn test_default_fields_are_editable_non_auto() {
		let admin = ModelAdminConfig::new(article_meta());
		let ctx = RequestContext::default();
		assert_eq!(
			admin.get_fields(&ctx, None),
			vec!["title", "content", "is_featured", "category"]
		);
	}

	#[test]
	fn test_exclude_removes_fields() {
		let admin = ModelAdminConfig::new(article_meta()).with_exclude(vec!["content"]);
		let ctx = RequestContext::default();
		assert_eq!(admin.get_fields(&ctx, None), vec!["title", "is_featured", "category"]);
	}

	#[test]
	fn test_default_fieldsets_single_group() {
		let admin = ModelAdminConfig::new(article_meta());
		let ctx = RequestContext::default();
		let sets = admin.get_fieldsets(&ctx, None);
		assert_eq!(sets.len(), 1);
		assert!(sets[0].label.is_none());
		assert_eq!(sets[0].fields.len(), 4);
	}

	#[test]
	fn test_queryset_auto_select_related() {
		let admin = ModelAdminConfig::new(article_meta())
			.with_list_display(vec!["title", "category", "is_featured"]);
		let ctx = RequestContext::default();
		let query = admin.get_queryset(&ctx);
		assert_eq!(query.select_related, vec!["category"]);
		assert_eq!(query.ordering, vec!["-id"]);
	}

	#[test]
	fn test_queryset_explicit_select_related_wins() {
		let admin = ModelAdminConfig::new(article_meta())
			.with_list_display(vec!["title", "category"])
			.with_list_select_related(vec!["category", "author"]);
		let ctx = RequestContext::default();
		let query = admin.get_queryset(&ctx);
		assert_eq!(query.select_related, vec!["category", "author"]);
	}

	#[test]
	fn test_field_value_resolution() {
		let admin = ModelAdminConfig::new(article_meta());
		let mut record = Record::new();
		record.insert(STR_KEY.to_string(), json!("Hello World"));
		record.insert("title".to_string(), json!("Hello World"));
		record.insert("is_featured".to_string(), json!(true));
		record.insert("content".to_string(), json!(null));
		record.insert("category".to_string(), json!(3));
		record.insert("category__str".to_string(), json!("Rust"));

		assert_eq!(admin.field_value(&record, STR_FIELD), "Hello World");
		assert_eq!(admin.field_value(&record, "title"), "Hello World");
		assert_eq!(admin.field_value(&record, "is_featured"), "Yes");
		assert_eq!(admin.field_value(&record, "content"), "-");
		assert_eq!(admin.field_value(&record, "category"), "Rust");
		assert_eq!(admin.field_value(&record, "missing"), "-");
	}

	#[test]
	fn test_field_value_fk_without_join_falls_back_to_id() {
		let admin = ModelAdminConfig::new(article_meta());
		let mut record = Record::new();
		record.insert("category".to_string(), json!(3));
		assert_eq!(admin.field_value(&record, "category"), "3");
	}

	#[test]
	fn test_field_display_name_resolution() {
		let admin = ModelAdminConfig::new(article_meta());
		assert_eq!(admin.field_display_name(STR_FIELD), "Article");
		assert_eq!(admin.field_display_name("is_featured"), "Is Featured");
		assert_eq!(admin.field_display_name("not_a_field"), "Not A Field");
	}

	#[test]
	fn test_actions_always_include_delete() {
		let admin = ModelAdminConfig::new(article_meta())
			.with_action(AdminAction::from_name("publish_selected"));
		let ctx = RequestContext::default();
		let actions = admin.get_actions(&ctx);
		assert_eq!(actions[0].name, DELETE_SELECTED);
		assert_eq!(actions[1].name, "publish_selected");
		assert_eq!(actions[1].label, "Publish Selected");
	}
}
