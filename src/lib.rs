//! Reactive admin interface generator.
//!
//! Point the admin at declarative model metadata and a database
//! collaborator and it generates the full management UI server-side:
//! change lists with live search, filtering, sorting, pagination, and
//! bulk actions; add/change forms with per-field validation as the user
//! types; delete confirmation; and a plugin system that contributes
//! pages, dashboard widgets, and navigation entries.
//!
//! The crate has no opinion about the web layer. Views are plain state
//! machines: the host routes events into them and renders templates from
//! the contexts they build.
//!
//! # Quick start
//!
//! ```
//! use live_admin::options::ModelAdminConfig;
//! use live_admin::site::AdminSite;
//! use live_admin::testing::article_meta;
//!
//! let mut site = AdminSite::new("admin").with_header("My blog admin");
//! site.register(
//!     ModelAdminConfig::new(article_meta())
//!         .with_list_display(vec!["title", "status", "is_featured"])
//!         .with_search_fields(vec!["title", "content"]),
//! )
//! .unwrap();
//!
//! let urls = site.urls().unwrap();
//! assert!(urls.iter().any(|r| r.name == "blog_article_changelist"));
//! ```

pub mod auth;
pub mod db;
pub mod error;
pub mod forms;
pub mod introspect;
pub mod metadata;
pub mod options;
pub mod plugins;
pub mod render;
pub mod site;
pub mod testing;
pub mod views;

pub use auth::{AdminUser, AuthBackend, RequestContext};
pub use db::{AdminDatabase, ListQuery, Record};
pub use error::{AdminError, AdminResult};
pub use forms::AdminForm;
pub use metadata::{FieldMeta, FieldType, ModelMeta};
pub use options::{AdminAction, Fieldset, ModelAdmin, ModelAdminConfig};
pub use plugins::{AdminPage, AdminPlugin, AdminWidget, NavItem, WidgetSize};
pub use site::AdminSite;
