//! Admin site
//!
//! [`AdminSite`] owns the two registries that define one admin instance:
//! model registrations (CRUD) and plugin registrations (extensions). It is
//! an explicit constructed object — build it at startup, register
//! everything, then share it behind `Arc`; nothing here is a process-wide
//! singleton, so independent sites (multi-tenant admins, tests) are just
//! independent values. After startup the registries are treated as
//! immutable and read concurrently without locking.

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::RequestContext;
use crate::error::{AdminError, AdminResult};
use crate::metadata::title_case;
use crate::options::ModelAdmin;
use crate::plugins::AdminPlugin;

/// What a synthesized route serves
#[derive(Debug, Clone, PartialEq)]
pub enum RouteKind {
	Login,
	Logout,
	Index,
	Changelist { model: String },
	Add { model: String },
	Change { model: String },
	Delete { model: String },
	PluginPage { plugin: String },
}

/// One entry of the synthesized route table
#[derive(Debug, Clone)]
pub struct Route {
	/// Path relative to the admin mount point; `{id}` marks the object id
	pub path: String,
	/// Unique route name, e.g. `"blog_article_changelist"`
	pub name: String,
	pub kind: RouteKind,
}

/// One sidebar link after aggregation
#[derive(Debug, Clone, Serialize)]
pub struct NavLink {
	pub label: String,
	pub url: String,
	pub icon: Option<String>,
	pub order: i32,
}

/// A named sidebar group of plugin links
#[derive(Debug, Clone, Serialize)]
pub struct NavSection {
	pub section: String,
	pub items: Vec<NavLink>,
}

/// A dashboard widget rendered to markup at aggregation time
#[derive(Debug, Clone, Serialize)]
pub struct WidgetEntry {
	pub widget_id: Option<String>,
	pub label: String,
	pub html: String,
	pub size: &'static str,
	pub order: i32,
	/// True when rendering failed and `html` holds the error sentinel
	pub failed: bool,
}

/// One registered model in the app list
#[derive(Debug, Clone, Serialize)]
pub struct ModelEntry {
	/// Plural verbose name
	pub name: String,
	pub object_name: String,
	pub admin_url: String,
	pub add_url: String,
}

/// One application grouping in the app list
#[derive(Debug, Clone, Serialize)]
pub struct AppEntry {
	pub name: String,
	pub app_label: String,
	pub models: Vec<ModelEntry>,
}

/// A reactive admin site: model registry, plugin registry, route table.
///
/// # Examples
///
/// ```
/// use live_admin::metadata::{FieldMeta, FieldType, ModelMeta};
/// use live_admin::options::ModelAdminConfig;
/// use live_admin::site::AdminSite;
///
/// let mut site = AdminSite::new("admin");
/// let meta = ModelMeta::new("blog", "article")
///     .with_field(FieldMeta::new("title", FieldType::Text).required());
/// site.register(ModelAdminConfig::new(meta)).unwrap();
///
/// assert!(site.is_registered("blog.article"));
/// let urls = site.urls().unwrap();
/// assert!(urls.iter().any(|r| r.name == "blog_article_changelist"));
/// ```
pub struct AdminSite {
	name: String,
	pub site_header: String,
	pub site_title: String,
	pub index_title: String,
	registry: IndexMap<String, Arc<dyn ModelAdmin>>,
	plugins: IndexMap<String, Arc<dyn AdminPlugin>>,
}

impl AdminSite {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			site_header: "Administration".to_string(),
			site_title: "Admin".to_string(),
			index_title: "Dashboard".to_string(),
			registry: IndexMap::new(),
			plugins: IndexMap::new(),
		}
	}

	pub fn with_header(mut self, header: impl Into<String>) -> Self {
		self.site_header = header.into();
		self
	}

	pub fn with_title(mut self, title: impl Into<String>) -> Self {
		self.site_title = title.into();
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	// ---- Model registration ----

	/// Register a model admin. At most one configuration per model.
	pub fn register(&mut self, admin: impl ModelAdmin + 'static) -> AdminResult<()> {
		self.register_arc(Arc::new(admin))
	}

	pub fn register_arc(&mut self, admin: Arc<dyn ModelAdmin>) -> AdminResult<()> {
		let key = admin.meta().key();
		if self.registry.contains_key(&key) {
			return Err(AdminError::DuplicateRegistration(key));
		}
		debug!(model = %key, site = %self.name, "registered model admin");
		self.registry.insert(key, admin);
		Ok(())
	}

	pub fn unregister(&mut self, model: &str) -> AdminResult<()> {
		self.registry
			.shift_remove(model)
			.map(|_| ())
			.ok_or_else(|| AdminError::NotRegistered(model.to_string()))
	}

	pub fn is_registered(&self, model: &str) -> bool {
		self.registry.contains_key(model)
	}

	pub fn get_model_admin(&self, model: &str) -> AdminResult<Arc<dyn ModelAdmin>> {
		self.registry
			.get(model)
			.cloned()
			.ok_or_else(|| AdminError::NotRegistered(model.to_string()))
	}

	/// Registered model admins in registration order
	pub fn model_admins(&self) -> impl Iterator<Item = (&str, &Arc<dyn ModelAdmin>)> {
		self.registry.iter().map(|(k, v)| (k.as_str(), v))
	}

	/// Primary-key field of a registered model; `"id"` for unknown keys,
	/// so reference lookups keep working against unregistered tables.
	pub fn pk_field(&self, model: &str) -> &str {
		self.registry
			.get(model)
			.map(|admin| admin.meta().pk_field.as_str())
			.unwrap_or("id")
	}

	// ---- Plugin registration ----

	/// Register a plugin, running its one-time `ready()` hook before
	/// returning. Fails on an empty or already-taken name.
	pub fn register_plugin(&mut self, plugin: impl AdminPlugin + 'static) -> AdminResult<()> {
		self.register_plugin_arc(Arc::new(plugin))
	}

	pub fn register_plugin_arc(&mut self, plugin: Arc<dyn AdminPlugin>) -> AdminResult<()> {
		let name = plugin.name().to_string();
		if name.is_empty() {
			return Err(AdminError::InvalidPlugin(
				"plugin must have a non-empty name".to_string(),
			));
		}
		if self.plugins.contains_key(&name) {
			return Err(AdminError::DuplicatePlugin(name));
		}
		debug!(plugin = %name, site = %self.name, "registered plugin");
		self.plugins.insert(name, Arc::clone(&plugin));
		plugin.ready();
		Ok(())
	}

	pub fn unregister_plugin(&mut self, name: &str) -> AdminResult<()> {
		self.plugins
			.shift_remove(name)
			.map(|_| ())
			.ok_or_else(|| AdminError::NotRegistered(name.to_string()))
	}

	pub fn get_plugin(&self, name: &str) -> Option<Arc<dyn AdminPlugin>> {
		self.plugins.get(name).cloned()
	}

	// ---- Route table ----

	/// Synthesize the route table: login/logout/index, four CRUD routes per
	/// model, one route per plugin page. Any duplicate path or name across
	/// the whole table is a hard [`AdminError::RouteCollision`] — plugin
	/// pages cannot silently shadow model routes.
	pub fn urls(&self) -> AdminResult<Vec<Route>> {
		let mut routes = vec![
			Route { path: "login/".into(), name: "login".into(), kind: RouteKind::Login },
			Route { path: "logout/".into(), name: "logout".into(), kind: RouteKind::Logout },
			Route { path: String::new(), name: "index".into(), kind: RouteKind::Index },
		];

		for (key, admin) in &self.registry {
			let meta = admin.meta();
			let base = format!("{}/{}", meta.app_label, meta.model_name);
			let info = format!("{}_{}", meta.app_label, meta.model_name);
			routes.push(Route {
				path: format!("{}/", base),
				name: format!("{}_changelist", info),
				kind: RouteKind::Changelist { model: key.clone() },
			});
			routes.push(Route {
				path: format!("{}/add/", base),
				name: format!("{}_add", info),
				kind: RouteKind::Add { model: key.clone() },
			});
			routes.push(Route {
				path: format!("{}/{{id}}/change/", base),
				name: format!("{}_change", info),
				kind: RouteKind::Change { model: key.clone() },
			});
			routes.push(Route {
				path: format!("{}/{{id}}/delete/", base),
				name: format!("{}_delete", info),
				kind: RouteKind::Delete { model: key.clone() },
			});
		}

		for (plugin_name, plugin) in &self.plugins {
			for page in plugin.pages() {
				routes.push(Route {
					path: format!("{}/", page.path),
					name: page.route_name.clone(),
					kind: RouteKind::PluginPage { plugin: plugin_name.clone() },
				});
			}
		}

		let mut paths = HashSet::new();
		let mut names = HashSet::new();
		for route in &routes {
			if !paths.insert(route.path.as_str()) {
				return Err(AdminError::RouteCollision(format!(
					"path '{}' is declared more than once",
					route.path
				)));
			}
			if !names.insert(route.name.as_str()) {
				return Err(AdminError::RouteCollision(format!(
					"route name '{}' is declared more than once",
					route.name
				)));
			}
		}

		Ok(routes)
	}

	/// Resolve a route name to a site-relative URL
	pub fn reverse(&self, name: &str) -> AdminResult<String> {
		let routes = self.urls()?;
		routes
			.iter()
			.find(|r| r.name == name)
			.map(|r| format!("/{}", r.path))
			.ok_or_else(|| AdminError::NotFound(format!("route '{}'", name)))
	}

	/// Resolve a route name, substituting the object id placeholder
	pub fn reverse_with_id(&self, name: &str, id: &str) -> AdminResult<String> {
		Ok(self.reverse(name)?.replace("{id}", id))
	}

	// ---- Aggregated presentation data ----

	/// Apps and their registered models, both sorted by display name,
	/// with resolved changelist/add URLs
	pub fn app_list(&self, _ctx: &RequestContext) -> Vec<AppEntry> {
		let mut apps: BTreeMap<String, AppEntry> = BTreeMap::new();

		for admin in self.registry.values() {
			let meta = admin.meta();
			let entry = apps.entry(meta.app_label.clone()).or_insert_with(|| AppEntry {
				name: title_case(&meta.app_label),
				app_label: meta.app_label.clone(),
				models: Vec::new(),
			});
			let info = format!("{}_{}", meta.app_label, meta.model_name);
			entry.models.push(ModelEntry {
				name: meta.verbose_name_plural.clone(),
				object_name: meta.object_name.clone(),
				admin_url: self
					.reverse(&format!("{}_changelist", info))
					.unwrap_or_else(|_| "#".to_string()),
				add_url: self
					.reverse(&format!("{}_add", info))
					.unwrap_or_else(|_| "#".to_string()),
			});
		}

		let mut list: Vec<AppEntry> = apps.into_values().collect();
		for app in &mut list {
			app.models.sort_by(|a, b| a.name.cmp(&b.name));
		}
		list.sort_by(|a, b| a.name.cmp(&b.name));
		list
	}

	/// Plugin nav entries the requesting identity may see, grouped by
	/// section (explicit section, else plugin display name, else plugin
	/// name). Groups sort by name; entries sort by order, ties keeping
	/// registration order. Unresolvable routes degrade to `"#"` rather
	/// than failing the page.
	pub fn plugin_nav(&self, ctx: &RequestContext) -> Vec<NavSection> {
		let mut sections: BTreeMap<String, Vec<NavLink>> = BTreeMap::new();

		for plugin in self.plugins.values() {
			let fallback = plugin.verbose_name().unwrap_or_else(|| plugin.name());
			for item in plugin.nav_items() {
				if !item.visible_to(ctx) {
					continue;
				}
				let section = item.section.clone().unwrap_or_else(|| fallback.to_string());
				let url = self
					.reverse(&item.route_name)
					.unwrap_or_else(|_| "#".to_string());
				sections.entry(section).or_default().push(NavLink {
					label: item.label,
					url,
					icon: item.icon,
					order: item.order,
				});
			}
		}

		sections
			.into_iter()
			.map(|(section, mut items)| {
				items.sort_by_key(|i| i.order); // stable: ties keep insertion order
				NavSection { section, items }
			})
			.collect()
	}

	/// Permission-filtered dashboard widgets, each rendered to markup
	/// eagerly, sorted by order (stable). A widget whose render fails
	/// contributes an error sentinel instead of failing the dashboard.
	pub fn widgets(&self, ctx: &RequestContext) -> Vec<WidgetEntry> {
		let mut entries = Vec::new();

		for plugin in self.plugins.values() {
			for widget in plugin.widgets() {
				if !widget.visible_to(ctx) {
					continue;
				}
				let (html, failed) = match widget.render(ctx) {
					Ok(html) => (html, false),
					Err(err) => {
						warn!(
							plugin = %plugin.name(),
							widget = ?widget.widget_id(),
							error = %err,
							"widget render failed"
						);
						(
							"<div class=\"widget-error\">Widget failed to render</div>"
								.to_string(),
							true,
						)
					}
				};
				entries.push(WidgetEntry {
					widget_id: widget.widget_id().map(String::from),
					label: widget.label().to_string(),
					html,
					size: widget.size().as_str(),
					order: widget.order(),
					failed,
				});
			}
		}

		entries.sort_by_key(|w| w.order);
		entries
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::metadata::{FieldMeta, FieldType, ModelMeta};
	use crate::options::ModelAdminConfig;
	use crate::plugins::AdminPage;

	fn article_admin() -> ModelAdminConfig {
		let meta = ModelMeta::new("blog", "article")
			.with_field(FieldMeta::new("title", FieldType::Text).required());
		ModelAdminConfig::new(meta)
	}

	#[test]
	fn test_pk_field_from_registration_or_id() {
		let mut site = AdminSite::new("test");
		let book = ModelMeta::new("shop", "book")
			.with_pk_field("isbn")
			.with_field(FieldMeta::new("title", FieldType::Text).required());
		site.register(ModelAdminConfig::new(book)).unwrap();

		assert_eq!(site.pk_field("shop.book"), "isbn");
		assert_eq!(site.pk_field("shop.publisher"), "id");
	}

	#[test]
	fn test_register_twice_fails() {
		let mut site = AdminSite::new("test");
		site.register(article_admin()).unwrap();
		let err = site.register(article_admin()).unwrap_err();
		assert!(matches!(err, AdminError::DuplicateRegistration(_)));
	}

	#[test]
	fn test_unregister_unknown_fails() {
		let mut site = AdminSite::new("test");
		let err = site.unregister("blog.article").unwrap_err();
		assert!(matches!(err, AdminError::NotRegistered(_)));
	}

	#[test]
	fn test_model_routes_are_distinct() {
		let mut site = AdminSite::new("test");
		site.register(article_admin()).unwrap();
		let meta = ModelMeta::new("blog", "comment")
			.with_field(FieldMeta::new("body", FieldType::Text));
		site.register(ModelAdminConfig::new(meta)).unwrap();

		let urls = site.urls().unwrap();
		let names: HashSet<&str> = urls.iter().map(|r| r.name.as_str()).collect();
		assert_eq!(names.len(), urls.len());
		assert!(names.contains("blog_article_changelist"));
		assert!(names.contains("blog_comment_delete"));
	}

	#[test]
	fn test_plugin_route_collision_fails_loudly() {
		struct ShadowPlugin;
		impl AdminPlugin for ShadowPlugin {
			fn name(&self) -> &str {
				"shadow"
			}

			fn pages(&self) -> Vec<AdminPage> {
				// Same path as the article changelist
				vec![AdminPage::new("blog/article/", "shadow_page")]
			}
		}

		let mut site = AdminSite::new("test");
		site.register(article_admin()).unwrap();
		site.register_plugin(ShadowPlugin).unwrap();

		let err = site.urls().unwrap_err();
		assert!(matches!(err, AdminError::RouteCollision(_)));
	}

	#[test]
	fn test_reverse_with_id() {
		let mut site = AdminSite::new("test");
		site.register(article_admin()).unwrap();
		let url = site.reverse_with_id("blog_article_change", "7").unwrap();
		assert_eq!(url, "/blog/article/7/change/");
	}

	#[test]
	fn test_app_list_sorted_with_urls() {
		let mut site = AdminSite::new("test");
		site.register(article_admin()).unwrap();
		let apps = site.app_list(&RequestContext::default());
		assert_eq!(apps.len(), 1);
		assert_eq!(apps[0].name, "Blog");
		assert_eq!(apps[0].models[0].admin_url, "/blog/article/");
		assert_eq!(apps[0].models[0].add_url, "/blog/article/add/");
	}
}
