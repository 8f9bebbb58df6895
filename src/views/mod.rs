//! View state machines
//!
//! Each admin screen is a server-held state machine: the UI sends events
//! (a keystroke in the search box, a click on a column header), the view
//! mutates its state, and the caller re-renders from a freshly built
//! context. Views hold the site and database behind `Arc` and never own a
//! connection of their own.

pub mod delete;
pub mod detail;
pub mod index;
pub mod list;
pub mod login;

use std::time::Duration;

use crate::auth::RequestContext;

/// Quiet period before a search keystroke actually queries.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Outcome of the staff gate every admin screen sits behind
#[derive(Debug, Clone, PartialEq)]
pub enum Access {
	Granted,
	/// Send the visitor to the login screen, returning here afterwards
	Redirect(String),
}

/// Admin screens require an authenticated, active staff identity.
/// Anyone else is redirected to `login/` with the original path in
/// `next`.
///
/// # Examples
///
/// ```
/// use live_admin::auth::RequestContext;
/// use live_admin::views::{require_staff, Access};
///
/// let anon = RequestContext::anonymous("/blog/article/");
/// assert_eq!(
///     require_staff(&anon),
///     Access::Redirect("/login/?next=/blog/article/".to_string())
/// );
/// ```
pub fn require_staff(ctx: &RequestContext) -> Access {
	if ctx.is_staff() {
		Access::Granted
	} else {
		Access::Redirect(format!("/login/?next={}", ctx.path))
	}
}
