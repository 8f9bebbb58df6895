//! Delete confirmation view

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::auth::RequestContext;
use crate::db::{value_to_string, AdminDatabase, STR_KEY};
use crate::error::{AdminError, AdminResult};
use crate::options::ModelAdmin;
use crate::site::AdminSite;

/// Render context for the confirmation template
#[derive(Debug, Clone, Serialize)]
pub struct DeleteContext {
	pub title: String,
	pub object_str: String,
	pub list_url: String,
	pub redirect_url: Option<String>,
}

/// Two-step delete: mount shows the confirmation, `confirm_delete`
/// executes it.
pub struct ModelDeleteView {
	site: Arc<AdminSite>,
	admin: Arc<dyn ModelAdmin>,
	db: Arc<dyn AdminDatabase>,
	ctx: RequestContext,
	object_id: String,
	object_str: String,
	pub redirect_url: Option<String>,
}

impl ModelDeleteView {
	pub async fn mount(
		site: Arc<AdminSite>,
		model: &str,
		object_id: &str,
		db: Arc<dyn AdminDatabase>,
		ctx: RequestContext,
	) -> AdminResult<Self> {
		let admin = site.get_model_admin(model)?;
		let record = db
			.get(model, object_id)
			.await?
			.ok_or_else(|| AdminError::NotFound(format!("{} #{}", model, object_id)))?;
		if !admin.has_delete_permission(&ctx, Some(&record)) {
			return Err(AdminError::PermissionDenied(format!("delete {}", model)));
		}
		let object_str = record
			.get(STR_KEY)
			.map(value_to_string)
			.unwrap_or_else(|| object_id.to_string());
		Ok(Self {
			site,
			admin,
			db,
			ctx,
			object_id: object_id.to_string(),
			object_str,
			redirect_url: None,
		})
	}

	/// Execute the deletion and redirect back to the change list.
	pub async fn confirm_delete(&mut self) -> AdminResult<()> {
		let model = self.admin.meta().key();
		self.db.delete(&model, &self.object_id).await?;
		info!(model = %model, pk = %self.object_id, user = ?self.ctx.username(), "record deleted");
		self.redirect_url = Some(self.list_url());
		Ok(())
	}

	fn list_url(&self) -> String {
		let meta = self.admin.meta();
		self.site
			.reverse(&format!("{}_{}_changelist", meta.app_label, meta.model_name))
			.unwrap_or_else(|_| "#".to_string())
	}

	pub fn context(&self) -> DeleteContext {
		DeleteContext {
			title: format!("Delete {}", self.object_str),
			object_str: self.object_str.clone(),
			list_url: self.list_url(),
			redirect_url: self.redirect_url.clone(),
		}
	}
}
