//! Change list view
//!
//! [`ModelListView`] drives the table screen: debounced live search,
//! column sorting, pagination, per-row selection, bulk actions, and
//! sidebar filters. Event handlers mutate state; [`ModelListView::context`]
//! rebuilds the render context from the database on demand.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::auth::RequestContext;
use crate::db::{record_pk, value_to_string, AdminDatabase, ListQuery, STR_KEY};
use crate::error::AdminResult;
use crate::introspect::SelectOption;
use crate::metadata::FieldType;
use crate::options::{ModelAdmin, STR_FIELD};
use crate::site::AdminSite;
use crate::views::SEARCH_DEBOUNCE;

/// Row cap when building reference filter dropdowns
const FILTER_REFERENCE_LIMIT: u64 = 50;
/// Value cap when building distinct-value filter dropdowns
const FILTER_DISTINCT_LIMIT: u64 = 20;

/// One table column header
#[derive(Debug, Clone, Serialize)]
pub struct Column {
	pub name: String,
	pub label: String,
	pub sortable: bool,
}

/// One table row, cells pre-stringified in column order
#[derive(Debug, Clone, Serialize)]
pub struct Row {
	pub pk: String,
	pub selected: bool,
	pub cells: Vec<String>,
	pub change_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
	pub number: u64,
	pub num_pages: u64,
	pub count: u64,
	pub has_previous: bool,
	pub has_next: bool,
	pub previous_page_number: Option<u64>,
	pub next_page_number: Option<u64>,
	pub page_range: Vec<u64>,
}

/// One sidebar filter with its dropdown choices
#[derive(Debug, Clone, Serialize)]
pub struct FilterSpec {
	pub name: String,
	pub label: String,
	pub choices: Vec<SelectOption>,
	pub current_value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionSpec {
	pub name: String,
	pub label: String,
}

/// Fully built render context for the change list template
#[derive(Debug, Clone, Serialize)]
pub struct ListContext {
	pub title: String,
	pub columns: Vec<Column>,
	pub rows: Vec<Row>,
	pub pagination: Pagination,
	pub search_query: String,
	pub ordering: Option<String>,
	pub select_all: bool,
	pub filters: Vec<FilterSpec>,
	pub has_filters: bool,
	pub actions: Vec<ActionSpec>,
	pub add_url: String,
	pub has_add_permission: bool,
	pub message: Option<String>,
}

/// Server-side state of one change list screen.
pub struct ModelListView {
	site: Arc<AdminSite>,
	admin: Arc<dyn ModelAdmin>,
	db: Arc<dyn AdminDatabase>,
	ctx: RequestContext,
	pub search_query: String,
	pending_search: String,
	search_generation: u64,
	pub current_page: u64,
	/// Single-field sort override, `-` prefixed when descending
	pub ordering: Option<String>,
	pub selected_ids: Vec<String>,
	pub select_all: bool,
	pub active_filters: HashMap<String, Value>,
	pub message: Option<String>,
}

impl ModelListView {
	pub fn mount(
		site: Arc<AdminSite>,
		model: &str,
		db: Arc<dyn AdminDatabase>,
		ctx: RequestContext,
	) -> AdminResult<Self> {
		let admin = site.get_model_admin(model)?;
		Ok(Self {
			site,
			admin,
			db,
			ctx,
			search_query: String::new(),
			pending_search: String::new(),
			search_generation: 0,
			current_page: 1,
			ordering: None,
			selected_ids: Vec::new(),
			select_all: false,
			active_filters: HashMap::new(),
			message: None,
		})
	}

	/// Current query including search, filters, and sort override,
	/// without pagination.
	fn query(&self) -> ListQuery {
		let mut query = self.admin.get_queryset(&self.ctx);

		if !self.search_query.is_empty() {
			let fields = self.admin.search_fields();
			if !fields.is_empty() {
				query.search = Some(self.search_query.clone());
				query.search_fields = fields;
			}
		}

		for (field, value) in &self.active_filters {
			query.filters.insert(field.clone(), value.clone());
		}

		if let Some(order) = &self.ordering {
			query.ordering = vec![order.clone()];
		}

		query
	}

	async fn current_rows(&self) -> AdminResult<(Vec<crate::db::Record>, u64)> {
		let base = self.query();
		let total = self.db.count(&self.admin.meta().key(), &base).await?;
		let per_page = self.admin.list_per_page().max(1);
		let offset = (self.current_page.saturating_sub(1)) * per_page;
		let mut query = base;
		query.offset = offset;
		query.limit = Some(per_page);
		let records = self.db.list(&self.admin.meta().key(), &query).await?;
		Ok((records, total))
	}

	// ---- Event handlers ----

	/// Record a search keystroke and hand back a debounce ticket.
	/// Nothing is queried until [`flush_search`](Self::flush_search)
	/// confirms the ticket survived the quiet period.
	pub fn update_search(&mut self, term: impl Into<String>) -> u64 {
		self.pending_search = term.into();
		self.search_generation += 1;
		self.search_generation
	}

	/// Wait out the debounce window, then apply the pending search if no
	/// later keystroke superseded this ticket. Returns whether the search
	/// was applied (and a re-render is due).
	pub async fn flush_search(&mut self, ticket: u64) -> bool {
		tokio::time::sleep(SEARCH_DEBOUNCE).await;
		if ticket != self.search_generation {
			return false;
		}
		self.search_query = self.pending_search.clone();
		self.current_page = 1;
		self.selected_ids.clear();
		self.select_all = false;
		debug!(model = %self.admin.meta().key(), query = %self.search_query, "search applied");
		true
	}

	/// Cycle a column's sort state: ascending, descending, back to the
	/// model default.
	pub fn sort_by(&mut self, field: &str) {
		let descending = format!("-{}", field);
		self.ordering = match self.ordering.as_deref() {
			Some(current) if current == field => Some(descending),
			Some(current) if current == descending => None,
			_ => Some(field.to_string()),
		};
		self.current_page = 1;
	}

	pub fn go_to_page(&mut self, page: u64) {
		self.current_page = page.max(1);
		self.selected_ids.clear();
		self.select_all = false;
	}

	pub fn toggle_select(&mut self, pk: &str) {
		if let Some(pos) = self.selected_ids.iter().position(|id| id == pk) {
			self.selected_ids.remove(pos);
		} else {
			self.selected_ids.push(pk.to_string());
		}
		self.select_all = false;
	}

	/// Select or deselect every row on the current page.
	pub async fn toggle_select_all(&mut self) -> AdminResult<()> {
		if self.select_all {
			self.selected_ids.clear();
			self.select_all = false;
			return Ok(());
		}
		let (records, _) = self.current_rows().await?;
		let pk_field = &self.admin.meta().pk_field;
		self.selected_ids = records
			.iter()
			.filter_map(|r| record_pk(r, pk_field))
			.collect();
		self.select_all = true;
		Ok(())
	}

	/// Execute a bulk action over the selection. Empty selections and
	/// unknown action names are silent no-ops; a completed action leaves
	/// its summary message and clears the selection.
	pub async fn run_action(&mut self, name: &str) -> AdminResult<()> {
		if self.selected_ids.is_empty() {
			return Ok(());
		}
		if !self.admin.get_actions(&self.ctx).iter().any(|a| a.name == name) {
			return Ok(());
		}
		let result = self
			.admin
			.run_action(name, &self.ctx, &self.db, &self.selected_ids)
			.await?;
		self.message = Some(result);
		self.selected_ids.clear();
		self.select_all = false;
		Ok(())
	}

	/// Set or clear one filter. An empty value removes the filter;
	/// `"true"`/`"false"` on boolean fields become typed booleans.
	pub fn apply_filter(&mut self, field: &str, value: &str) {
		if value.is_empty() {
			self.active_filters.remove(field);
		} else {
			let is_boolean = self
				.admin
				.meta()
				.field(field)
				.is_some_and(|f| matches!(f.field_type, FieldType::Boolean));
			let typed = match (is_boolean, value) {
				(true, "true") => json!(true),
				(true, "false") => json!(false),
				_ => json!(value),
			};
			self.active_filters.insert(field.to_string(), typed);
		}
		self.current_page = 1;
		self.selected_ids.clear();
		self.select_all = false;
	}

	pub fn clear_filters(&mut self) {
		self.active_filters.clear();
		self.current_page = 1;
		self.selected_ids.clear();
		self.select_all = false;
	}

	// ---- Rendering ----

	/// Build the complete render context for the current state.
	pub async fn context(&self) -> AdminResult<ListContext> {
		let meta = self.admin.meta();
		let (records, count) = self.current_rows().await?;
		let per_page = self.admin.list_per_page().max(1);
		let num_pages = (count.max(1) + per_page - 1) / per_page;
		let number = self.current_page.min(num_pages);

		let list_display = self.admin.list_display();
		let columns: Vec<Column> = list_display
			.iter()
			.map(|name| Column {
				name: name.clone(),
				label: self.admin.field_display_name(name),
				sortable: name != STR_FIELD,
			})
			.collect();

		let info = format!("{}_{}", meta.app_label, meta.model_name);
		let rows: Vec<Row> = records
			.iter()
			.filter_map(|record| {
				let pk = record_pk(record, &meta.pk_field)?;
				Some(Row {
					selected: self.selected_ids.contains(&pk),
					cells: list_display
						.iter()
						.map(|field| self.admin.field_value(record, field))
						.collect(),
					change_url: self
						.site
						.reverse_with_id(&format!("{}_change", info), &pk)
						.unwrap_or_else(|_| "#".to_string()),
					pk,
				})
			})
			.collect();

		let pagination = Pagination {
			number,
			num_pages,
			count,
			has_previous: number > 1,
			has_next: number < num_pages,
			previous_page_number: (number > 1).then(|| number - 1),
			next_page_number: (number < num_pages).then(|| number + 1),
			page_range: (1..=num_pages).collect(),
		};

		let filters = self.build_filters().await?;

		let actions = self
			.admin
			.get_actions(&self.ctx)
			.into_iter()
			.map(|a| ActionSpec { name: a.name, label: a.label })
			.collect();

		Ok(ListContext {
			title: format!("Select {} to change", meta.verbose_name),
			columns,
			rows,
			pagination,
			search_query: self.search_query.clone(),
			ordering: self.ordering.clone(),
			select_all: self.select_all,
			has_filters: !filters.is_empty(),
			filters,
			actions,
			add_url: self
				.site
				.reverse(&format!("{}_add", info))
				.unwrap_or_else(|_| "#".to_string()),
			has_add_permission: self.admin.has_add_permission(&self.ctx),
			message: self.message.clone(),
		})
	}

	/// Dropdown choices per declared filter field: Yes/No for booleans,
	/// declared choices, referenced rows (capped), else distinct stored
	/// values (capped).
	async fn build_filters(&self) -> AdminResult<Vec<FilterSpec>> {
		let meta = self.admin.meta();
		let mut filters = Vec::new();

		for name in self.admin.list_filter() {
			let Some(field) = meta.field(&name) else { continue };
			let current_value = self
				.active_filters
				.get(&name)
				.map(value_to_string)
				.unwrap_or_default();

			let choices = match &field.field_type {
				FieldType::Boolean => vec![
					SelectOption { value: "true".to_string(), label: "Yes".to_string() },
					SelectOption { value: "false".to_string(), label: "No".to_string() },
				],
				_ if !field.choices.is_empty() => field
					.choices
					.iter()
					.map(|(value, label)| SelectOption {
						value: value.clone(),
						label: label.clone(),
					})
					.collect(),
				FieldType::ForeignKey { to } => {
					let query = ListQuery::new().with_page(0, FILTER_REFERENCE_LIMIT);
					let related_pk = self.site.pk_field(to);
					self.db
						.list(to, &query)
						.await?
						.iter()
						.filter_map(|r| {
							let value = record_pk(r, related_pk)?;
							let label = r
								.get(STR_KEY)
								.map(value_to_string)
								.filter(|s| !s.is_empty())
								.unwrap_or_else(|| value.clone());
							Some(SelectOption { value, label })
						})
						.collect()
				}
				_ => self
					.db
					.distinct_values(&meta.key(), &name, FILTER_DISTINCT_LIMIT)
					.await?
					.iter()
					.map(|v| {
						let s = value_to_string(v);
						SelectOption { value: s.clone(), label: s }
					})
					.collect(),
			};

			filters.push(FilterSpec {
				label: field.display_name(),
				name,
				choices,
				current_value,
			});
		}

		Ok(filters)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::options::{ModelAdminConfig, DELETE_SELECTED};
	use crate::testing::{article_meta, seed_blog, MemoryDatabase};

	fn setup() -> (Arc<AdminSite>, Arc<dyn AdminDatabase>) {
		let mut site = AdminSite::new("test");
		site.register(
			ModelAdminConfig::new(article_meta())
				.with_list_display(vec!["title", "status", "is_featured", "category"])
				.with_list_filter(vec!["status", "is_featured", "category"])
				.with_search_fields(vec!["title"])
				.with_list_per_page(2),
		)
		.unwrap();
		let db = MemoryDatabase::new();
		seed_blog(&db);
		(Arc::new(site), Arc::new(db))
	}

	fn view(site: &Arc<AdminSite>, db: &Arc<dyn AdminDatabase>) -> ModelListView {
		ModelListView::mount(
			Arc::clone(site),
			"blog.article",
			Arc::clone(db),
			RequestContext::default(),
		)
		.unwrap()
	}

	#[tokio::test]
	async fn test_context_pages_and_orders() {
		let (site, db) = setup();
		let v = view(&site, &db);
		let ctx = v.context().await.unwrap();
		// Default ordering -created_at puts the newest article first
		assert_eq!(ctx.rows[0].cells[0], "Lab results");
		assert_eq!(ctx.pagination.count, 3);
		assert_eq!(ctx.pagination.num_pages, 2);
		assert!(ctx.pagination.has_next);
		assert_eq!(ctx.rows.len(), 2);
	}

	#[tokio::test]
	async fn test_sort_cycle() {
		let (site, db) = setup();
		let mut v = view(&site, &db);
		v.sort_by("title");
		assert_eq!(v.ordering.as_deref(), Some("title"));
		v.sort_by("title");
		assert_eq!(v.ordering.as_deref(), Some("-title"));
		v.sort_by("title");
		assert_eq!(v.ordering, None);

		v.sort_by("title");
		let ctx = v.context().await.unwrap();
		assert_eq!(ctx.rows[0].cells[0], "Async patterns");
	}

	#[tokio::test(start_paused = true)]
	async fn test_search_debounce_applies_last_value_only() {
		let (site, db) = setup();
		let mut v = view(&site, &db);

		let t1 = v.update_search("h");
		let t2 = v.update_search("he");
		let t3 = v.update_search("hello");
		assert!(!v.flush_search(t1).await);
		assert!(!v.flush_search(t2).await);
		assert!(v.flush_search(t3).await);

		let ctx = v.context().await.unwrap();
		assert_eq!(ctx.search_query, "hello");
		assert_eq!(ctx.pagination.count, 1);
		assert_eq!(ctx.rows[0].cells[0], "Hello Rust");
	}

	#[tokio::test]
	async fn test_boolean_filter_typed() {
		let (site, db) = setup();
		let mut v = view(&site, &db);
		v.apply_filter("is_featured", "true");
		assert_eq!(v.active_filters["is_featured"], json!(true));
		let ctx = v.context().await.unwrap();
		assert_eq!(ctx.pagination.count, 1);

		v.apply_filter("is_featured", "");
		assert!(v.active_filters.is_empty());
	}

	#[tokio::test]
	async fn test_filter_choices_built_per_kind() {
		let (site, db) = setup();
		let v = view(&site, &db);
		let ctx = v.context().await.unwrap();

		let by_name: HashMap<&str, &FilterSpec> =
			ctx.filters.iter().map(|f| (f.name.as_str(), f)).collect();
		assert_eq!(by_name["is_featured"].choices[0].label, "Yes");
		assert_eq!(by_name["status"].choices.len(), 3);
		let category_labels: Vec<&str> = by_name["category"]
			.choices
			.iter()
			.map(|c| c.label.as_str())
			.collect();
		assert!(category_labels.contains(&"Tech"));
		assert!(category_labels.contains(&"Science"));
	}

	#[tokio::test]
	async fn test_selection_and_bulk_delete() {
		let (site, db) = setup();
		let mut v = view(&site, &db);

		// No-op without a selection
		v.run_action(DELETE_SELECTED).await.unwrap();
		assert_eq!(v.message, None);

		v.toggle_select("1");
		v.toggle_select("2");
		v.run_action(DELETE_SELECTED).await.unwrap();
		assert_eq!(v.message.as_deref(), Some("Successfully deleted 2 items."));
		assert!(v.selected_ids.is_empty());

		let ctx = v.context().await.unwrap();
		assert_eq!(ctx.pagination.count, 1);
	}

	#[tokio::test]
	async fn test_toggle_select_all_covers_current_page() {
		let (site, db) = setup();
		let mut v = view(&site, &db);
		v.toggle_select_all().await.unwrap();
		assert!(v.select_all);
		assert_eq!(v.selected_ids.len(), 2);
		v.toggle_select_all().await.unwrap();
		assert!(v.selected_ids.is_empty());
	}

	#[tokio::test]
	async fn test_unknown_action_is_noop() {
		let (site, db) = setup();
		let mut v = view(&site, &db);
		v.toggle_select("1");
		v.run_action("publish_everything").await.unwrap();
		assert_eq!(v.message, None);
		// Selection survives an unknown action
		assert_eq!(v.selected_ids, vec!["1"]);
	}

	#[tokio::test]
	async fn test_fk_cells_show_display_label() {
		let (site, db) = setup();
		let v = view(&site, &db);
		let ctx = v.context().await.unwrap();
		let hello = ctx
			.rows
			.iter()
			.find(|r| r.cells[0] == "Lab results")
			.unwrap();
		assert_eq!(hello.cells[3], "Science");
	}

	#[tokio::test]
	async fn test_zero_per_page_does_not_divide_by_zero() {
		let mut site = AdminSite::new("test");
		site.register(
			ModelAdminConfig::new(article_meta()).with_list_per_page(0),
		)
		.unwrap();
		let db = MemoryDatabase::new();
		seed_blog(&db);
		let site: Arc<AdminSite> = Arc::new(site);
		let db: Arc<dyn AdminDatabase> = Arc::new(db);

		let ctx = view(&site, &db).context().await.unwrap();
		assert_eq!(ctx.pagination.count, 3);
		assert_eq!(ctx.pagination.num_pages, 3);
		assert_eq!(ctx.rows.len(), 1);
	}

	#[tokio::test]
	async fn test_fk_filter_choices_follow_related_pk() {
		use crate::db::Record;
		use crate::metadata::{FieldMeta, ModelMeta};

		let author = ModelMeta::new("shop", "author")
			.with_pk_field("slug")
			.with_field(FieldMeta::new("name", FieldType::Char { max_length: Some(100) }));
		let book = ModelMeta::new("shop", "book")
			.with_field(FieldMeta::new("title", FieldType::Char { max_length: Some(200) }))
			.with_field(FieldMeta::new(
				"author",
				FieldType::ForeignKey { to: "shop.author".to_string() },
			));

		let mut site = AdminSite::new("test");
		site.register(ModelAdminConfig::new(author)).unwrap();
		site.register(
			ModelAdminConfig::new(book).with_list_filter(vec!["author"]),
		)
		.unwrap();

		let db = MemoryDatabase::new();
		db.seed(
			"shop.author",
			vec![Record::from([
				("slug".to_string(), json!("j-doe")),
				("name".to_string(), json!("J. Doe")),
			])],
		);
		db.seed("shop.book", vec![Record::from([("id".to_string(), json!(1))])]);
		let site: Arc<AdminSite> = Arc::new(site);
		let db: Arc<dyn AdminDatabase> = Arc::new(db);

		let v = ModelListView::mount(
			Arc::clone(&site),
			"shop.book",
			Arc::clone(&db),
			RequestContext::default(),
		)
		.unwrap();
		let ctx = v.context().await.unwrap();
		let author_filter = ctx
			.filters
			.iter()
			.find(|f| f.name == "author")
			.unwrap();
		assert_eq!(author_filter.choices[0].value, "j-doe");
		assert_eq!(author_filter.choices[0].label, "J. Doe");
	}
}
