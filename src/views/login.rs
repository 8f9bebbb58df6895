//! Login and logout views
//!
//! Authentication itself is the host application's business; the view
//! only drives the form and gates on the active-staff requirement.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::auth::{AdminUser, AuthBackend};
use crate::site::AdminSite;

/// Render context for the login template
#[derive(Debug, Clone, Serialize)]
pub struct LoginContext {
	pub site_header: String,
	pub site_title: String,
	pub username: String,
	pub error: String,
}

/// Outcome of a login attempt
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
	/// Authenticated; send the visitor to this URL
	Success { user: AdminUser, redirect_url: String },
	/// Stay on the form; the error is in view state
	Failed,
}

/// Server-side state of the login screen.
pub struct LoginView {
	site: Arc<AdminSite>,
	pub username: String,
	pub password: String,
	pub error: String,
	next_url: Option<String>,
}

impl LoginView {
	pub fn mount(site: Arc<AdminSite>, next_url: Option<String>) -> Self {
		Self {
			site,
			username: String::new(),
			password: String::new(),
			error: String::new(),
			next_url,
		}
	}

	pub fn update_username(&mut self, value: impl Into<String>) {
		self.username = value.into();
		self.error.clear();
	}

	pub fn update_password(&mut self, value: impl Into<String>) {
		self.password = value.into();
		self.error.clear();
	}

	/// Attempt authentication. The password is cleared after every
	/// attempt, successful or not.
	pub async fn do_login(&mut self, backend: &dyn AuthBackend) -> LoginOutcome {
		if self.username.is_empty() || self.password.is_empty() {
			self.error = "Please enter both username and password.".to_string();
			return LoginOutcome::Failed;
		}

		let attempt = backend.authenticate(&self.username, &self.password).await;
		self.password.clear();

		match attempt {
			Some(user) if user.is_active && user.is_staff => {
				let redirect_url = self
					.next_url
					.clone()
					.unwrap_or_else(|| self.site.reverse("index").unwrap_or_else(|_| "/".into()));
				info!(username = %user.username, "admin login");
				LoginOutcome::Success { user, redirect_url }
			}
			Some(user) => {
				warn!(username = %user.username, "login rejected, not active staff");
				self.error = "Your account is not authorized to access the admin.".to_string();
				LoginOutcome::Failed
			}
			None => {
				self.error = "Invalid username or password.".to_string();
				LoginOutcome::Failed
			}
		}
	}

	pub fn context(&self) -> LoginContext {
		LoginContext {
			site_header: self.site.site_header.clone(),
			site_title: self.site.site_title.clone(),
			username: self.username.clone(),
			error: self.error.clone(),
		}
	}
}

/// Render context for the logged-out screen
#[derive(Debug, Clone, Serialize)]
pub struct LogoutContext {
	pub site_header: String,
	pub site_title: String,
	pub login_url: String,
}

/// Context for the screen shown after the host app tears down the
/// session.
pub fn logout_context(site: &AdminSite) -> LogoutContext {
	LogoutContext {
		site_header: site.site_header.clone(),
		site_title: site.site_title.clone(),
		login_url: site.reverse("login").unwrap_or_else(|_| "/login/".to_string()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;

	struct FixedBackend;

	#[async_trait]
	impl AuthBackend for FixedBackend {
		async fn authenticate(&self, username: &str, password: &str) -> Option<AdminUser> {
			match (username, password) {
				("admin", "secret") => Some(AdminUser::new("admin").staff()),
				("intern", "secret") => Some(AdminUser::new("intern")),
				("ghost", "secret") => Some(AdminUser::new("ghost").staff().inactive()),
				_ => None,
			}
		}
	}

	fn view() -> LoginView {
		LoginView::mount(Arc::new(AdminSite::new("test")), None)
	}

	#[tokio::test]
	async fn test_empty_credentials_rejected_without_backend_call() {
		let mut v = view();
		let outcome = v.do_login(&FixedBackend).await;
		assert_eq!(outcome, LoginOutcome::Failed);
		assert_eq!(v.error, "Please enter both username and password.");
	}

	#[tokio::test]
	async fn test_successful_login_redirects_to_index() {
		let mut v = view();
		v.update_username("admin");
		v.update_password("secret");
		match v.do_login(&FixedBackend).await {
			LoginOutcome::Success { user, redirect_url } => {
				assert_eq!(user.username, "admin");
				assert_eq!(redirect_url, "/");
			}
			LoginOutcome::Failed => panic!("expected success"),
		}
		assert!(v.password.is_empty());
	}

	#[tokio::test]
	async fn test_next_url_wins_over_index() {
		let mut v = LoginView::mount(
			Arc::new(AdminSite::new("test")),
			Some("/blog/article/".to_string()),
		);
		v.update_username("admin");
		v.update_password("secret");
		match v.do_login(&FixedBackend).await {
			LoginOutcome::Success { redirect_url, .. } => {
				assert_eq!(redirect_url, "/blog/article/");
			}
			LoginOutcome::Failed => panic!("expected success"),
		}
	}

	#[tokio::test]
	async fn test_non_staff_rejected() {
		let mut v = view();
		v.update_username("intern");
		v.update_password("secret");
		assert_eq!(v.do_login(&FixedBackend).await, LoginOutcome::Failed);
		assert_eq!(v.error, "Your account is not authorized to access the admin.");
		assert!(v.password.is_empty());
	}

	#[tokio::test]
	async fn test_inactive_rejected() {
		let mut v = view();
		v.update_username("ghost");
		v.update_password("secret");
		assert_eq!(v.do_login(&FixedBackend).await, LoginOutcome::Failed);
	}

	#[tokio::test]
	async fn test_bad_credentials_message() {
		let mut v = view();
		v.update_username("admin");
		v.update_password("wrong");
		assert_eq!(v.do_login(&FixedBackend).await, LoginOutcome::Failed);
		assert_eq!(v.error, "Invalid username or password.");
	}

	#[tokio::test]
	async fn test_typing_clears_error() {
		let mut v = view();
		v.update_username("admin");
		v.update_password("wrong");
		v.do_login(&FixedBackend).await;
		assert!(!v.error.is_empty());
		v.update_password("s");
		assert!(v.error.is_empty());
	}
}
