//! Test support
//!
//! [`MemoryDatabase`] is a complete in-memory [`AdminDatabase`] with the
//! semantics the admin relies on: case-insensitive substring search,
//! exact-match filters, multi-key ordering with `-` prefixes, offset/limit
//! pagination, eager display labels for single references, and distinct
//! value enumeration. It backs the crate's own test suites and works as a
//! fixture store for downstream integration tests. The module also ships
//! a small set of ready-made model metadata fixtures.

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::db::{value_to_string, AdminDatabase, ListQuery, Record, STR_KEY};
use crate::error::{AdminError, AdminResult};
use crate::metadata::{FieldMeta, FieldType, ModelMeta};

/// In-memory table store keyed by model key (`"app.model"`).
#[derive(Default)]
pub struct MemoryDatabase {
	tables: RwLock<HashMap<String, Vec<Record>>>,
	next_ids: RwLock<HashMap<String, i64>>,
	metas: RwLock<HashMap<String, ModelMeta>>,
}

impl MemoryDatabase {
	pub fn new() -> Self {
		Self::default()
	}

	/// Teach the store a model's shape so reference joins know which
	/// table a field points at.
	pub fn register_meta(&self, meta: ModelMeta) {
		self.metas.write().insert(meta.key(), meta);
	}

	/// Replace a model's rows wholesale.
	pub fn seed(&self, model: &str, rows: Vec<Record>) {
		let max_id = rows
			.iter()
			.filter_map(|r| r.get("id").and_then(Value::as_i64))
			.max()
			.unwrap_or(0);
		self.next_ids.write().insert(model.to_string(), max_id + 1);
		self.tables.write().insert(model.to_string(), rows);
	}

	pub fn row_count(&self, model: &str) -> usize {
		self.tables.read().get(model).map(Vec::len).unwrap_or(0)
	}

	fn rows(&self, model: &str) -> Vec<Record> {
		self.tables.read().get(model).cloned().unwrap_or_default()
	}

	/// Display label for a row: explicit `__str__`, else `name`, else
	/// `title`, else `Object (pk)`.
	fn label_of(record: &Record) -> String {
		for key in [STR_KEY, "name", "title"] {
			if let Some(value) = record.get(key) {
				let s = value_to_string(value);
				if !s.is_empty() {
					return s;
				}
			}
		}
		format!(
			"Object ({})",
			record.get("id").map(value_to_string).unwrap_or_default()
		)
	}

	fn matches(record: &Record, query: &ListQuery) -> bool {
		if let Some(term) = &query.search {
			let needle = term.to_lowercase();
			let hit = query.search_fields.iter().any(|field| {
				record
					.get(field)
					.map(|v| value_to_string(v).to_lowercase().contains(&needle))
					.unwrap_or(false)
			});
			if !hit {
				return false;
			}
		}
		query.filters.iter().all(|(field, expected)| {
			let actual = record.get(field).cloned().unwrap_or(Value::Null);
			// Loose equality: "1" matches 1, true matches true
			actual == *expected || value_to_string(&actual) == value_to_string(expected)
		})
	}

	fn compare_values(a: &Value, b: &Value) -> Ordering {
		match (a, b) {
			(Value::Number(x), Value::Number(y)) => x
				.as_f64()
				.partial_cmp(&y.as_f64())
				.unwrap_or(Ordering::Equal),
			(Value::Bool(x), Value::Bool(y)) => x.cmp(y),
			(Value::Null, Value::Null) => Ordering::Equal,
			(Value::Null, _) => Ordering::Less,
			(_, Value::Null) => Ordering::Greater,
			_ => value_to_string(a).cmp(&value_to_string(b)),
		}
	}

	fn sort(records: &mut [Record], ordering: &[String]) {
		records.sort_by(|a, b| {
			for key in ordering {
				let (field, desc) = match key.strip_prefix('-') {
					Some(rest) => (rest, true),
					None => (key.as_str(), false),
				};
				let left = a.get(field).cloned().unwrap_or(Value::Null);
				let right = b.get(field).cloned().unwrap_or(Value::Null);
				let mut ord = Self::compare_values(&left, &right);
				if desc {
					ord = ord.reverse();
				}
				if ord != Ordering::Equal {
					return ord;
				}
			}
			Ordering::Equal
		});
	}

	/// Attach `{field}__str` display labels for eagerly joined references.
	/// Requires the owning model's meta to be registered; unknown fields
	/// are skipped.
	fn join_related(&self, model: &str, records: &mut [Record], fields: &[String]) {
		let metas = self.metas.read();
		let Some(meta) = metas.get(model) else { return };
		let tables = self.tables.read();
		for field in fields {
			let Some(target) = meta.field(field).and_then(|f| f.field_type.related_model())
			else {
				continue;
			};
			let Some(target_rows) = tables.get(target) else { continue };
			for record in records.iter_mut() {
				let Some(fk) = record.get(field) else { continue };
				if fk.is_null() {
					continue;
				}
				let fk_str = value_to_string(fk);
				let label = target_rows
					.iter()
					.find(|r| r.get("id").map(value_to_string).as_deref() == Some(&fk_str))
					.map(Self::label_of);
				if let Some(label) = label {
					record.insert(format!("{}__str", field), json!(label));
				}
			}
		}
	}

	fn filtered(&self, model: &str, query: &ListQuery) -> Vec<Record> {
		let mut rows: Vec<Record> = self
			.rows(model)
			.into_iter()
			.filter(|r| Self::matches(r, query))
			.collect();
		Self::sort(&mut rows, &query.ordering);
		rows
	}
}

#[async_trait]
impl AdminDatabase for MemoryDatabase {
	async fn list(&self, model: &str, query: &ListQuery) -> AdminResult<Vec<Record>> {
		let mut rows = self.filtered(model, query);
		self.join_related(model, &mut rows, &query.select_related);

		let offset = query.offset as usize;
		let mut rows: Vec<Record> = rows.into_iter().skip(offset).collect();
		if let Some(limit) = query.limit {
			rows.truncate(limit as usize);
		}
		for row in &mut rows {
			let label = Self::label_of(row);
			row.entry(STR_KEY.to_string()).or_insert(json!(label));
		}
		Ok(rows)
	}

	async fn count(&self, model: &str, query: &ListQuery) -> AdminResult<u64> {
		Ok(self.filtered(model, query).len() as u64)
	}

	async fn get(&self, model: &str, pk: &str) -> AdminResult<Option<Record>> {
		let found = self.rows(model).into_iter().find(|r| {
			r.get("id").map(value_to_string).as_deref() == Some(pk)
		});
		Ok(found.map(|mut r| {
			let label = Self::label_of(&r);
			r.entry(STR_KEY.to_string()).or_insert(json!(label));
			r
		}))
	}

	async fn insert(&self, model: &str, data: &Record) -> AdminResult<Record> {
		let mut record = data.clone();
		if !record.contains_key("id") {
			let mut ids = self.next_ids.write();
			let next = ids.entry(model.to_string()).or_insert(1);
			record.insert("id".to_string(), json!(*next));
			*next += 1;
		}
		self.tables
			.write()
			.entry(model.to_string())
			.or_default()
			.push(record.clone());
		Ok(record)
	}

	async fn update(&self, model: &str, pk: &str, data: &Record) -> AdminResult<Record> {
		let mut tables = self.tables.write();
		let rows = tables
			.get_mut(model)
			.ok_or_else(|| AdminError::NotFound(format!("{} #{}", model, pk)))?;
		let row = rows
			.iter_mut()
			.find(|r| r.get("id").map(value_to_string).as_deref() == Some(pk))
			.ok_or_else(|| AdminError::NotFound(format!("{} #{}", model, pk)))?;
		for (key, value) in data {
			if key != "id" {
				row.insert(key.clone(), value.clone());
			}
		}
		Ok(row.clone())
	}

	async fn delete(&self, model: &str, pk: &str) -> AdminResult<()> {
		let mut tables = self.tables.write();
		let rows = tables
			.get_mut(model)
			.ok_or_else(|| AdminError::NotFound(format!("{} #{}", model, pk)))?;
		let before = rows.len();
		rows.retain(|r| r.get("id").map(value_to_string).as_deref() != Some(pk));
		if rows.len() == before {
			return Err(AdminError::NotFound(format!("{} #{}", model, pk)));
		}
		Ok(())
	}

	async fn bulk_delete(&self, model: &str, pks: &[String]) -> AdminResult<u64> {
		let mut tables = self.tables.write();
		let Some(rows) = tables.get_mut(model) else { return Ok(0) };
		let targets: HashSet<&str> = pks.iter().map(String::as_str).collect();
		let before = rows.len();
		rows.retain(|r| {
			r.get("id")
				.map(value_to_string)
				.map(|id| !targets.contains(id.as_str()))
				.unwrap_or(true)
		});
		Ok((before - rows.len()) as u64)
	}

	async fn related_ids(&self, model: &str, pk: &str, field: &str) -> AdminResult<Vec<String>> {
		let row = self.get(model, pk).await?;
		Ok(row
			.and_then(|r| r.get(field).cloned())
			.and_then(|v| match v {
				Value::Array(items) => Some(items.iter().map(value_to_string).collect()),
				_ => None,
			})
			.unwrap_or_default())
	}

	async fn distinct_values(
		&self,
		model: &str,
		field: &str,
		limit: u64,
	) -> AdminResult<Vec<Value>> {
		let mut seen = HashSet::new();
		let mut values = Vec::new();
		for row in self.rows(model) {
			let Some(value) = row.get(field) else { continue };
			if value.is_null() {
				continue;
			}
			if seen.insert(value_to_string(value)) {
				values.push(value.clone());
			}
			if values.len() as u64 >= limit {
				break;
			}
		}
		values.sort_by(Self::compare_values);
		Ok(values)
	}
}

// ---- Fixture metadata ----

/// blog.category: `id`, `name`
pub fn category_meta() -> ModelMeta {
	ModelMeta::new("blog", "category")
		.with_field(FieldMeta::new("id", FieldType::Integer).auto_created())
		.with_field(FieldMeta::new("name", FieldType::Char { max_length: Some(100) }).required())
		.with_verbose_name_plural("categories")
}

/// blog.tag: `id`, `name`, `color`
pub fn tag_meta() -> ModelMeta {
	ModelMeta::new("blog", "tag")
		.with_field(FieldMeta::new("id", FieldType::Integer).auto_created())
		.with_field(FieldMeta::new("name", FieldType::Char { max_length: Some(50) }).required())
		.with_field(FieldMeta::new("color", FieldType::Char { max_length: Some(7) }))
}

/// blog.article: the kitchen-sink fixture exercising every field kind
pub fn article_meta() -> ModelMeta {
	ModelMeta::new("blog", "article")
		.with_field(FieldMeta::new("id", FieldType::Integer).auto_created())
		.with_field(FieldMeta::new("title", FieldType::Char { max_length: Some(200) }).required())
		.with_field(FieldMeta::new("slug", FieldType::Slug))
		.with_field(FieldMeta::new("content", FieldType::Text))
		.with_field(
			FieldMeta::new("status", FieldType::Char { max_length: Some(20) }).with_choices(vec![
				("draft", "Draft"),
				("published", "Published"),
				("archived", "Archived"),
			]),
		)
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
		.with_field(FieldMeta::new("publish_time", FieldType::Time))
		.with_field(FieldMeta::new("created_at", FieldType::DateTime).auto_created())
		.with_field(FieldMeta::new("updated_at", FieldType::DateTime).auto_created())
		.with_ordering(vec!["-created_at"])
}

/// library.author: `id`, `name`, `email`, `bio`
pub fn author_meta() -> ModelMeta {
	ModelMeta::new("library", "author")
		.with_field(FieldMeta::new("id", FieldType::Integer).auto_created())
		.with_field(FieldMeta::new("name", FieldType::Char { max_length: Some(100) }).required())
		.with_field(FieldMeta::new("email", FieldType::Email))
		.with_field(FieldMeta::new("bio", FieldType::Text))
}

/// library.book: title plus a required author reference
pub fn book_meta() -> ModelMeta {
	ModelMeta::new("library", "book")
		.with_field(FieldMeta::new("id", FieldType::Integer).auto_created())
		.with_field(FieldMeta::new("title", FieldType::Char { max_length: Some(200) }).required())
		.with_field(
			FieldMeta::new(
				"author",
				FieldType::ForeignKey { to: "library.author".to_string() },
			)
			.required(),
		)
		.with_field(FieldMeta::new("publication_date", FieldType::Date))
		.with_field(FieldMeta::new("pages", FieldType::Integer))
}

/// Seed a database with a small, deterministic blog dataset and register
/// the matching metadata.
pub fn seed_blog(db: &MemoryDatabase) {
	db.register_meta(category_meta());
	db.register_meta(tag_meta());
	db.register_meta(article_meta());
	db.seed(
		"blog.category",
		vec![
			Record::from([("id".to_string(), json!(1)), ("name".to_string(), json!("Tech"))]),
			Record::from([("id".to_string(), json!(2)), ("name".to_string(), json!("Science"))]),
		],
	);
	db.seed(
		"blog.tag",
		vec![
			Record::from([
				("id".to_string(), json!(1)),
				("name".to_string(), json!("rust")),
				("color".to_string(), json!("#f74c00")),
			]),
			Record::from([
				("id".to_string(), json!(2)),
				("name".to_string(), json!("web")),
				("color".to_string(), json!("#0077cc")),
			]),
		],
	);
	db.seed(
		"blog.article",
		vec![
			Record::from([
				("id".to_string(), json!(1)),
				("title".to_string(), json!("Hello Rust")),
				("status".to_string(), json!("published")),
				("is_featured".to_string(), json!(true)),
				("category".to_string(), json!(1)),
				("tags".to_string(), json!([1, 2])),
				("publish_date".to_string(), json!("2026-01-15")),
				("created_at".to_string(), json!("2026-01-10T09:00")),
			]),
			Record::from([
				("id".to_string(), json!(2)),
				("title".to_string(), json!("Async patterns")),
				("status".to_string(), json!("draft")),
				("is_featured".to_string(), json!(false)),
				("category".to_string(), json!(1)),
				("tags".to_string(), json!([1])),
				("publish_date".to_string(), json!("2026-02-01")),
				("created_at".to_string(), json!("2026-01-20T14:30")),
			]),
			Record::from([
				("id".to_string(), json!(3)),
				("title".to_string(), json!("Lab results")),
				("status".to_string(), json!("published")),
				("is_featured".to_string(), json!(false)),
				("category".to_string(), json!(2)),
				("tags".to_string(), json!([])),
				("publish_date".to_string(), json!("2026-02-10")),
				("created_at".to_string(), json!("2026-02-05T11:15")),
			]),
		],
	);
}

#[cfg(test)]
mod tests {
	use super::*;

	fn seeded() -> MemoryDatabase {
		let db = MemoryDatabase::new();
		seed_blog(&db);
		db
	}

	#[tokio::test]
	async fn test_search_is_case_insensitive_contains() {
		let db = seeded();
		let query = ListQuery::new().with_search("hello", vec!["title"]);
		let rows = db.list("blog.article", &query).await.unwrap();
		assert_eq!(rows.len(), 1);
		assert_eq!(rows[0]["title"], json!("Hello Rust"));
	}

	#[tokio::test]
	async fn test_filter_matches_loosely_across_types() {
		let db = seeded();
		let query = ListQuery::new().with_filter("category", json!("1"));
		assert_eq!(db.count("blog.article", &query).await.unwrap(), 2);

		let query = ListQuery::new().with_filter("is_featured", json!(true));
		assert_eq!(db.count("blog.article", &query).await.unwrap(), 1);
	}

	#[tokio::test]
	async fn test_ordering_desc_and_pagination() {
		let db = seeded();
		let query = ListQuery::new()
			.with_ordering(vec!["-created_at"])
			.with_page(1, 1);
		let rows = db.list("blog.article", &query).await.unwrap();
		assert_eq!(rows.len(), 1);
		assert_eq!(rows[0]["id"], json!(2));
	}

	#[tokio::test]
	async fn test_select_related_adds_display_label() {
		let db = seeded();
		let query = ListQuery::new().with_select_related(vec!["category"]);
		let rows = db.list("blog.article", &query).await.unwrap();
		let first = rows.iter().find(|r| r["id"] == json!(1)).unwrap();
		assert_eq!(first["category__str"], json!("Tech"));
	}

	#[tokio::test]
	async fn test_insert_assigns_sequential_ids() {
		let db = seeded();
		let record = Record::from([("title".to_string(), json!("Fourth"))]);
		let saved = db.insert("blog.article", &record).await.unwrap();
		assert_eq!(saved["id"], json!(4));
		assert_eq!(db.row_count("blog.article"), 4);
	}

	#[tokio::test]
	async fn test_update_missing_row_errors() {
		let db = seeded();
		let err = db
			.update("blog.article", "99", &Record::new())
			.await
			.unwrap_err();
		assert!(matches!(err, AdminError::NotFound(_)));
	}

	#[tokio::test]
	async fn test_bulk_delete_counts_only_existing() {
		let db = seeded();
		let deleted = db
			.bulk_delete(
				"blog.article",
				&["1".to_string(), "99".to_string(), "3".to_string()],
			)
			.await
			.unwrap();
		assert_eq!(deleted, 2);
		assert_eq!(db.row_count("blog.article"), 1);
	}

	#[tokio::test]
	async fn test_related_ids_reads_array_field() {
		let db = seeded();
		let ids = db.related_ids("blog.article", "1", "tags").await.unwrap();
		assert_eq!(ids, vec!["1", "2"]);
	}

	#[tokio::test]
	async fn test_distinct_values_deduplicates() {
		let db = seeded();
		let values = db
			.distinct_values("blog.article", "status", 20)
			.await
			.unwrap();
		assert_eq!(values, vec![json!("draft"), json!("published")]);
	}
}
