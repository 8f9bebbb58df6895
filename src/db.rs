//! Persistence collaborator contract
//!
//! The admin delegates all record storage to the host framework's
//! object-relational layer through [`AdminDatabase`]. Record sets support
//! contains-search, exact filters, ordering, offset/limit pagination,
//! eager-load hints, and bulk delete with count — nothing more; everything
//! the admin renders is derived from these operations.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::AdminResult;

/// One persisted record, keyed by field name.
///
/// The record's display string travels under the [`STR_KEY`] entry so list
/// rows and select options can show it without a second fetch.
pub type Record = HashMap<String, serde_json::Value>;

/// Record key carrying the record's string representation
pub const STR_KEY: &str = "__str__";

/// Query description for list/count operations
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
	/// Substring to match (case-insensitive) against `search_fields`, OR-ed
	pub search: Option<String>,
	/// Fields the search term applies to
	pub search_fields: Vec<String>,
	/// Exact-match filters, AND-ed together
	pub filters: HashMap<String, serde_json::Value>,
	/// Ordering fields; leading '-' for descending
	pub ordering: Vec<String>,
	pub offset: u64,
	/// `None` means no limit
	pub limit: Option<u64>,
	/// Reference fields to eager-load so their display strings come back
	/// as `"{field}__str"` entries on each record
	pub select_related: Vec<String>,
}

impl ListQuery {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_search(mut self, term: impl Into<String>, fields: Vec<impl Into<String>>) -> Self {
		self.search = Some(term.into());
		self.search_fields = fields.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_filter(mut self, field: impl Into<String>, value: serde_json::Value) -> Self {
		self.filters.insert(field.into(), value);
		self
	}

	pub fn with_ordering(mut self, ordering: Vec<impl Into<String>>) -> Self {
		self.ordering = ordering.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_page(mut self, offset: u64, limit: u64) -> Self {
		self.offset = offset;
		self.limit = Some(limit);
		self
	}

	pub fn with_select_related(mut self, fields: Vec<impl Into<String>>) -> Self {
		self.select_related = fields.into_iter().map(Into::into).collect();
		self
	}
}

/// Object-relational collaborator the admin queries and mutates through.
///
/// `model` arguments are registry keys (`"app_label.model_name"`). All
/// calls are awaited to completion inside one request; the admin issues no
/// concurrent mutations against shared state.
#[async_trait]
pub trait AdminDatabase: Send + Sync {
	/// Fetch records matching the query, in query order
	async fn list(&self, model: &str, query: &ListQuery) -> AdminResult<Vec<Record>>;

	/// Count records matching the query (ignoring offset/limit)
	async fn count(&self, model: &str, query: &ListQuery) -> AdminResult<u64>;

	/// Fetch one record by primary key
	async fn get(&self, model: &str, pk: &str) -> AdminResult<Option<Record>>;

	/// Whether a record with this primary key exists
	async fn exists(&self, model: &str, pk: &str) -> AdminResult<bool> {
		Ok(self.get(model, pk).await?.is_some())
	}

	/// Insert a record; returns the stored record including its primary key
	async fn insert(&self, model: &str, data: &Record) -> AdminResult<Record>;

	/// Update a record by primary key; returns the stored record
	async fn update(&self, model: &str, pk: &str, data: &Record) -> AdminResult<Record>;

	/// Delete one record by primary key
	async fn delete(&self, model: &str, pk: &str) -> AdminResult<()>;

	/// Delete many records; returns the number deleted
	async fn bulk_delete(&self, model: &str, pks: &[String]) -> AdminResult<u64>;

	/// Primary keys of records related to `pk` through a multi-reference field
	async fn related_ids(&self, model: &str, pk: &str, field: &str) -> AdminResult<Vec<String>>;

	/// Distinct values of a field, up to `limit`, for filter choice lists
	async fn distinct_values(
		&self,
		model: &str,
		field: &str,
		limit: u64,
	) -> AdminResult<Vec<serde_json::Value>>;
}

/// Pull a record's primary key as a string
pub fn record_pk(record: &Record, pk_field: &str) -> Option<String> {
	record.get(pk_field).map(value_to_string)
}

/// Render a JSON value the way it appears in an input or option attribute:
/// strings stay bare (no quotes), everything else serializes.
pub fn value_to_string(value: &serde_json::Value) -> String {
	match value {
		serde_json::Value::String(s) => s.clone(),
		serde_json::Value::Null => String::new(),
		other => other.to_string(),
	}
}
