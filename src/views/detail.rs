//! Detail view
//!
//! [`ModelDetailView`] runs both the add screen and the change screen:
//! the only difference is whether it mounted over an existing record.
//! Field edits stream through [`ModelDetailView::update_field`] for live
//! validation; the save handlers run full validation and persist only
//! when the whole form passes.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::auth::RequestContext;
use crate::db::{value_to_string, AdminDatabase, Record, STR_KEY};
use crate::error::{AdminError, AdminResult};
use crate::forms::AdminForm;
use crate::introspect::{classify, FieldInfo, FieldKind};
use crate::options::ModelAdmin;
use crate::render::{render_field, FieldRender};
use crate::site::AdminSite;

/// One rendered form field
#[derive(Debug, Clone, Serialize)]
pub struct FieldContext {
	pub name: String,
	pub html: String,
}

/// One rendered fieldset group
#[derive(Debug, Clone, Serialize)]
pub struct FieldsetContext {
	pub label: Option<String>,
	pub fields: Vec<FieldContext>,
}

/// Render context for the detail template
#[derive(Debug, Clone, Serialize)]
pub struct DetailContext {
	pub title: String,
	pub object: Option<String>,
	pub object_pk: Option<String>,
	pub save_success: bool,
	pub fieldsets: Vec<FieldsetContext>,
	pub has_delete_permission: bool,
	pub delete_url: Option<String>,
	pub redirect_url: Option<String>,
}

/// Server-side state of one add or change screen.
pub struct ModelDetailView {
	site: Arc<AdminSite>,
	admin: Arc<dyn ModelAdmin>,
	db: Arc<dyn AdminDatabase>,
	ctx: RequestContext,
	object_id: Option<String>,
	object_str: Option<String>,
	form: AdminForm,
	infos: HashMap<String, FieldInfo>,
	readonly: Vec<String>,
	pub save_success: bool,
	pub redirect_url: Option<String>,
}

impl ModelDetailView {
	/// Mount an empty add form.
	pub async fn mount_add(
		site: Arc<AdminSite>,
		model: &str,
		db: Arc<dyn AdminDatabase>,
		ctx: RequestContext,
	) -> AdminResult<Self> {
		let admin = site.get_model_admin(model)?;
		if !admin.has_add_permission(&ctx) {
			return Err(AdminError::PermissionDenied(format!("add {}", model)));
		}
		let field_names = admin.get_fields(&ctx, None);
		let form = AdminForm::blank(admin.meta(), &field_names);
		let infos = Self::classify_all(&admin, &site, &field_names, &db).await;
		let readonly = admin.readonly_fields();
		Ok(Self {
			site,
			admin,
			db,
			ctx,
			object_id: None,
			object_str: None,
			form,
			infos,
			readonly,
			save_success: false,
			redirect_url: None,
		})
	}

	/// Mount a change form over an existing record.
	pub async fn mount_change(
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
		if !admin.has_change_permission(&ctx, Some(&record)) {
			return Err(AdminError::PermissionDenied(format!("change {}", model)));
		}
		let field_names = admin.get_fields(&ctx, Some(&record));
		let form =
			AdminForm::from_record(admin.meta(), &field_names, &record, object_id, &db).await?;
		let infos = Self::classify_all(&admin, &site, &field_names, &db).await;
		let readonly = admin.readonly_fields();
		let object_str = record.get(STR_KEY).map(value_to_string);
		Ok(Self {
			site,
			admin,
			db,
			ctx,
			object_id: Some(object_id.to_string()),
			object_str,
			form,
			infos,
			readonly,
			save_success: false,
			redirect_url: None,
		})
	}

	async fn classify_all(
		admin: &Arc<dyn ModelAdmin>,
		site: &AdminSite,
		field_names: &[String],
		db: &Arc<dyn AdminDatabase>,
	) -> HashMap<String, FieldInfo> {
		let mut infos = HashMap::new();
		for name in field_names {
			if let Some(field) = admin.meta().field(name) {
				infos.insert(name.clone(), classify(field, site, db).await);
			}
		}
		infos
	}

	pub fn form(&self) -> &AdminForm {
		&self.form
	}

	// ---- Event handlers ----

	/// Accept one field edit and validate just that field.
	pub async fn update_field(&mut self, field: &str, value: Value) -> AdminResult<()> {
		self.save_success = false;
		self.form.validate_field(field, value, &self.db).await
	}

	/// Validate everything and persist. On success, redirect to the
	/// change list.
	pub async fn save(&mut self) -> AdminResult<()> {
		self.save_internal(true).await
	}

	/// Save and stay on this screen.
	pub async fn save_and_continue(&mut self) -> AdminResult<()> {
		self.save_internal(false).await
	}

	/// Save, then reset to an empty add form for the next record.
	pub async fn save_and_add_another(&mut self) -> AdminResult<()> {
		self.save_internal(false).await?;
		if self.save_success {
			self.redirect_url = Some(
				self.site
					.reverse(&format!("{}_add", self.route_info()))
					.unwrap_or_else(|_| "#".to_string()),
			);
		}
		Ok(())
	}

	async fn save_internal(&mut self, redirect: bool) -> AdminResult<()> {
		self.save_success = false;
		self.redirect_url = None;

		let Some(cleaned) = self.form.validate_all(&self.db).await? else {
			return Ok(());
		};

		let model = self.admin.meta().key();
		let saved = match &self.object_id {
			Some(pk) => self.db.update(&model, pk, &cleaned).await?,
			None => self.db.insert(&model, &cleaned).await?,
		};
		let pk_field = &self.admin.meta().pk_field;
		self.object_id = crate::db::record_pk(&saved, pk_field);
		self.object_str = saved.get(STR_KEY).map(value_to_string);
		self.save_success = true;
		debug!(model = %model, pk = ?self.object_id, "record saved");

		if redirect {
			self.redirect_url = Some(
				self.site
					.reverse(&format!("{}_changelist", self.route_info()))
					.unwrap_or_else(|_| "#".to_string()),
			);
		}
		Ok(())
	}

	fn route_info(&self) -> String {
		let meta = self.admin.meta();
		format!("{}_{}", meta.app_label, meta.model_name)
	}

	// ---- Rendering ----

	/// Build the render context with every field pre-rendered to markup,
	/// grouped by fieldset.
	pub fn context(&self) -> DetailContext {
		let meta = self.admin.meta();
		let record_hint: Option<Record> = None;
		let fieldsets = self
			.admin
			.get_fieldsets(&self.ctx, record_hint.as_ref())
			.into_iter()
			.map(|set| FieldsetContext {
				label: set.label.clone(),
				fields: set
					.fields
					.iter()
					.filter(|name| self.form.field_names().contains(name))
					.map(|name| FieldContext {
						name: name.clone(),
						html: self.render_one(name),
					})
					.collect(),
			})
			.collect();

		let delete_url = self.object_id.as_ref().and_then(|pk| {
			self.site
				.reverse_with_id(&format!("{}_delete", self.route_info()), pk)
				.ok()
		});

		DetailContext {
			title: match &self.object_str {
				Some(s) => format!("Change {}", s),
				None => match &self.object_id {
					Some(pk) => format!("Change {} #{}", meta.verbose_name, pk),
					None => format!("Add {}", meta.verbose_name),
				},
			},
			object: self.object_str.clone(),
			object_pk: self.object_id.clone(),
			save_success: self.save_success,
			fieldsets,
			has_delete_permission: self
				.admin
				.has_delete_permission(&self.ctx, None),
			delete_url,
			redirect_url: self.redirect_url.clone(),
		}
	}

	fn render_one(&self, name: &str) -> String {
		let Some(field) = self.admin.meta().field(name) else {
			return String::new();
		};
		let readonly_info;
		let info = match self.infos.get(name) {
			Some(info) if !self.readonly.contains(&name.to_string()) => info,
			_ => {
				readonly_info = FieldInfo {
					kind: FieldKind::Readonly,
					options: Vec::new(),
					input_type: "text",
				};
				&readonly_info
			}
		};
		let value = self.form.value(name);
		render_field(&FieldRender {
			name,
			label: &field.display_name(),
			value: &value,
			info,
			errors: self.form.field_errors(name),
			help_text: field.help_text.as_deref(),
			required: field.required,
		})
	}
}
