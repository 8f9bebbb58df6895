//! Identity collaborator
//!
//! Authentication and session storage belong to the host framework; the
//! admin only needs to know who is asking and what they may do. Views
//! receive a [`RequestContext`] and the login view checks credentials
//! through an [`AuthBackend`].

use async_trait::async_trait;
use std::collections::HashSet;

/// The requesting identity as the host auth system resolved it
#[derive(Debug, Clone, PartialEq)]
pub struct AdminUser {
	pub username: String,
	pub is_active: bool,
	/// Only staff users may enter the admin
	pub is_staff: bool,
	/// Permission codenames, e.g. `"blog.view_article"`
	pub permissions: HashSet<String>,
}

impl AdminUser {
	pub fn new(username: impl Into<String>) -> Self {
		Self {
			username: username.into(),
			is_active: true,
			is_staff: false,
			permissions: HashSet::new(),
		}
	}

	pub fn staff(mut self) -> Self {
		self.is_staff = true;
		self
	}

	pub fn inactive(mut self) -> Self {
		self.is_active = false;
		self
	}

	pub fn with_permissions(mut self, perms: Vec<impl Into<String>>) -> Self {
		self.permissions = perms.into_iter().map(Into::into).collect();
		self
	}

	pub fn has_perm(&self, perm: &str) -> bool {
		self.permissions.contains(perm)
	}
}

/// Per-request context passed to every view and permission predicate
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
	pub user: Option<AdminUser>,
	/// Request path, used to build the `?next=` login redirect
	pub path: String,
}

impl RequestContext {
	pub fn anonymous(path: impl Into<String>) -> Self {
		Self { user: None, path: path.into() }
	}

	pub fn with_user(user: AdminUser, path: impl Into<String>) -> Self {
		Self { user: Some(user), path: path.into() }
	}

	pub fn is_authenticated(&self) -> bool {
		self.user.is_some()
	}

	pub fn is_staff(&self) -> bool {
		self.user.as_ref().is_some_and(|u| u.is_staff)
	}

	/// Anonymous users hold no permissions
	pub fn has_perm(&self, perm: &str) -> bool {
		self.user.as_ref().is_some_and(|u| u.has_perm(perm))
	}

	pub fn username(&self) -> Option<&str> {
		self.user.as_ref().map(|u| u.username.as_str())
	}
}

/// Credential check against the host auth system
#[async_trait]
pub trait AuthBackend: Send + Sync {
	/// Returns the user on valid credentials, `None` otherwise.
	/// Active/staff gating is the caller's concern.
	async fn authenticate(&self, username: &str, password: &str) -> Option<AdminUser>;
}
