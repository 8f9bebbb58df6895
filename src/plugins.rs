//! Plugin system
//!
//! Extension points for other packages to hook into the admin interface:
//! an [`AdminPlugin`] groups custom [`AdminPage`]s, dashboard
//! [`AdminWidget`]s, and sidebar [`NavItem`]s under one name. Plugins are
//! registered once at startup via [`AdminSite::register_plugin`]
//! (`crate::site::AdminSite::register_plugin`) and treated as immutable
//! afterwards.

use serde_json::json;

use crate::auth::RequestContext;
use crate::error::{AdminError, AdminResult};
use crate::metadata::humanize_field_name;

/// Sidebar navigation entry
#[derive(Debug, Clone)]
pub struct NavItem {
	pub label: String,
	/// Route name resolved through the site's route table
	pub route_name: String,
	pub icon: Option<String>,
	pub order: i32,
	/// Explicit nav section; falls back to the owning plugin's display name
	pub section: Option<String>,
	/// Permission codename gating visibility
	pub permission: Option<String>,
}

impl NavItem {
	pub fn new(label: impl Into<String>, route_name: impl Into<String>) -> Self {
		Self {
			label: label.into(),
			route_name: route_name.into(),
			icon: None,
			order: 0,
			section: None,
			permission: None,
		}
	}

	pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
		self.icon = Some(icon.into());
		self
	}

	pub fn with_order(mut self, order: i32) -> Self {
		self.order = order;
		self
	}

	pub fn with_section(mut self, section: impl Into<String>) -> Self {
		self.section = Some(section.into());
		self
	}

	pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
		self.permission = Some(permission.into());
		self
	}

	/// Entries without a permission are visible to everyone
	pub fn visible_to(&self, ctx: &RequestContext) -> bool {
		match &self.permission {
			None => true,
			Some(perm) => ctx.has_perm(perm),
		}
	}
}

/// Custom page mounted inside the admin chrome.
///
/// Auto-generates a [`NavItem`] unless `show_in_nav` is disabled.
///
/// # Examples
///
/// ```
/// use live_admin::plugins::AdminPage;
///
/// let page = AdminPage::new("auth/providers/", "auth_providers");
/// assert_eq!(page.path, "auth/providers"); // surrounding slashes stripped
/// assert_eq!(page.label, "Auth Providers"); // auto-humanized
/// ```
#[derive(Debug, Clone)]
pub struct AdminPage {
	/// Path segment relative to the admin mount point, no surrounding slashes
	pub path: String,
	/// Unique route name within the site
	pub route_name: String,
	pub label: String,
	pub icon: Option<String>,
	pub nav_section: Option<String>,
	pub nav_order: i32,
	pub permission: Option<String>,
	pub show_in_nav: bool,
}

impl AdminPage {
	pub fn new(path: impl Into<String>, route_name: impl Into<String>) -> Self {
		let path = path.into();
		let route_name = route_name.into();
		let label = humanize_field_name(&route_name);
		Self {
			path: path.trim_matches('/').to_string(),
			route_name,
			label,
			icon: None,
			nav_section: None,
			nav_order: 0,
			permission: None,
			show_in_nav: true,
		}
	}

	pub fn with_label(mut self, label: impl Into<String>) -> Self {
		self.label = label.into();
		self
	}

	pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
		self.icon = Some(icon.into());
		self
	}

	pub fn with_nav_section(mut self, section: impl Into<String>) -> Self {
		self.nav_section = Some(section.into());
		self
	}

	pub fn with_nav_order(mut self, order: i32) -> Self {
		self.nav_order = order;
		self
	}

	pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
		self.permission = Some(permission.into());
		self
	}

	pub fn hidden_from_nav(mut self) -> Self {
		self.show_in_nav = false;
		self
	}

	/// Derived nav entry; `None` when the page is hidden from the sidebar
	pub fn nav_item(&self) -> Option<NavItem> {
		if !self.show_in_nav {
			return None;
		}
		Some(NavItem {
			label: self.label.clone(),
			route_name: self.route_name.clone(),
			icon: self.icon.clone(),
			order: self.nav_order,
			section: self.nav_section.clone(),
			permission: self.permission.clone(),
		})
	}
}

/// Dashboard card size class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WidgetSize {
	Sm,
	#[default]
	Md,
	Lg,
}

impl WidgetSize {
	pub fn as_str(&self) -> &'static str {
		match self {
			WidgetSize::Sm => "sm",
			WidgetSize::Md => "md",
			WidgetSize::Lg => "lg",
		}
	}
}

/// Dashboard widget on the admin index.
///
/// Widgets are instantiated fresh each time their owning plugin's widget
/// list is requested; they carry no persistent identity. The body is a
/// template rendered eagerly at aggregation time.
pub trait AdminWidget: Send + Sync {
	/// Stable identifier; `None` for anonymous widgets
	fn widget_id(&self) -> Option<&str> {
		None
	}

	fn label(&self) -> &str {
		""
	}

	/// Template source for the widget body; empty renders to an empty string
	fn template(&self) -> &str {
		""
	}

	/// Context for the template. Must be a JSON object.
	fn context(&self, _ctx: &RequestContext) -> serde_json::Value {
		json!({})
	}

	fn order(&self) -> i32 {
		0
	}

	fn size(&self) -> WidgetSize {
		WidgetSize::Md
	}

	fn permission(&self) -> Option<&str> {
		None
	}

	fn visible_to(&self, ctx: &RequestContext) -> bool {
		match self.permission() {
			None => true,
			Some(perm) => ctx.has_perm(perm),
		}
	}

	/// Render the widget body to markup. The widget's own metadata is
	/// injected into the template context under `widget`.
	fn render(&self, ctx: &RequestContext) -> AdminResult<String> {
		let template = self.template();
		if template.is_empty() {
			return Ok(String::new());
		}

		let mut context = tera::Context::new();
		if let serde_json::Value::Object(entries) = self.context(ctx) {
			for (key, value) in entries {
				context.insert(key, &value);
			}
		}
		context.insert(
			"widget",
			&json!({
				"widget_id": self.widget_id(),
				"label": self.label(),
				"size": self.size().as_str(),
				"order": self.order(),
			}),
		);

		tera::Tera::one_off(template, &context, true)
			.map_err(|e| AdminError::TemplateError(e.to_string()))
	}
}

/// An admin extension contributed by another package.
///
/// One plugin per package: it names itself, contributes pages and widgets,
/// and derives its sidebar entries from its pages unless overridden.
pub trait AdminPlugin: Send + Sync {
	/// Unique identifier; registration fails when empty
	fn name(&self) -> &str;

	/// Human-readable name used as the default nav section
	fn verbose_name(&self) -> Option<&str> {
		None
	}

	fn pages(&self) -> Vec<AdminPage> {
		Vec::new()
	}

	/// Fresh widget instances; called anew on each dashboard aggregation
	fn widgets(&self) -> Vec<Box<dyn AdminWidget>> {
		Vec::new()
	}

	/// Sidebar entries, auto-derived from pages honoring `show_in_nav`
	fn nav_items(&self) -> Vec<NavItem> {
		self.pages().iter().filter_map(|p| p.nav_item()).collect()
	}

	/// One-time setup hook, invoked synchronously at registration
	fn ready(&self) {}
}
