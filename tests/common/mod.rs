//! Shared fixtures for the integration suites.
#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use live_admin::db::{AdminDatabase, ListQuery, Record};
use live_admin::error::AdminResult;
use live_admin::testing::{seed_blog, MemoryDatabase};

/// Delegating wrapper that counts calls so tests can assert how many
/// queries or writes an interaction actually caused.
pub struct CountingDb {
	inner: MemoryDatabase,
	pub lists: AtomicU64,
	pub inserts: AtomicU64,
	pub updates: AtomicU64,
	/// Search terms seen by `list`, in call order
	pub search_terms: Mutex<Vec<Option<String>>>,
}

impl CountingDb {
	pub fn seeded() -> Arc<Self> {
		let inner = MemoryDatabase::new();
		seed_blog(&inner);
		Arc::new(Self {
			inner,
			lists: AtomicU64::new(0),
			inserts: AtomicU64::new(0),
			updates: AtomicU64::new(0),
			search_terms: Mutex::new(Vec::new()),
		})
	}

	pub fn list_calls(&self) -> u64 {
		self.lists.load(Ordering::SeqCst)
	}

	pub fn write_calls(&self) -> u64 {
		self.inserts.load(Ordering::SeqCst) + self.updates.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl AdminDatabase for CountingDb {
	async fn list(&self, model: &str, query: &ListQuery) -> AdminResult<Vec<Record>> {
		self.lists.fetch_add(1, Ordering::SeqCst);
		self.search_terms.lock().push(query.search.clone());
		self.inner.list(model, query).await
	}

	async fn count(&self, model: &str, query: &ListQuery) -> AdminResult<u64> {
		self.inner.count(model, query).await
	}

	async fn get(&self, model: &str, pk: &str) -> AdminResult<Option<Record>> {
		self.inner.get(model, pk).await
	}

	async fn insert(&self, model: &str, data: &Record) -> AdminResult<Record> {
		self.inserts.fetch_add(1, Ordering::SeqCst);
		self.inner.insert(model, data).await
	}

	async fn update(&self, model: &str, pk: &str, data: &Record) -> AdminResult<Record> {
		self.updates.fetch_add(1, Ordering::SeqCst);
		self.inner.update(model, pk, data).await
	}

	async fn delete(&self, model: &str, pk: &str) -> AdminResult<()> {
		self.inner.delete(model, pk).await
	}

	async fn bulk_delete(&self, model: &str, pks: &[String]) -> AdminResult<u64> {
		self.inner.bulk_delete(model, pks).await
	}

	async fn related_ids(&self, model: &str, pk: &str, field: &str) -> AdminResult<Vec<String>> {
		self.inner.related_ids(model, pk, field).await
	}

	async fn distinct_values(
		&self,
		model: &str,
		field: &str,
		limit: u64,
	) -> AdminResult<Vec<serde_json::Value>> {
		self.inner.distinct_values(model, field, limit).await
	}
}
