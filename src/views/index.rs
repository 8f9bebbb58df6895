//! Dashboard view

use serde::Serialize;

use crate::auth::RequestContext;
use crate::site::{AdminSite, AppEntry, NavSection, WidgetEntry};

/// Render context for the dashboard template
#[derive(Debug, Clone, Serialize)]
pub struct IndexContext {
	pub site_header: String,
	pub title: String,
	pub apps: Vec<AppEntry>,
	pub widgets: Vec<WidgetEntry>,
	pub has_widgets: bool,
	pub plugin_nav: Vec<NavSection>,
}

/// Aggregate the dashboard: registered apps, plugin widgets, and the
/// plugin sidebar, all filtered to what this identity may see.
pub fn dashboard(site: &AdminSite, ctx: &RequestContext) -> IndexContext {
	let widgets = site.widgets(ctx);
	IndexContext {
		site_header: site.site_header.clone(),
		title: site.index_title.clone(),
		apps: site.app_list(ctx),
		has_widgets: !widgets.is_empty(),
		widgets,
		plugin_nav: site.plugin_nav(ctx),
	}
}
