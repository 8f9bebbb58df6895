//! Error types for the admin layer

use thiserror::Error;

/// Admin error type
///
/// Configuration errors (`DuplicateRegistration`, `NotRegistered`,
/// `InvalidPlugin`, `DuplicatePlugin`, `RouteCollision`) are raised at
/// startup/registration time and are fatal to that call. Validation
/// errors are recovered into form state and never escape the form layer.
/// `DatabaseError` wraps unexpected persistence failures and propagates
/// to the view boundary.
#[derive(Debug, Error)]
pub enum AdminError {
	/// Model is already registered with this site
	#[error("Model '{0}' is already registered")]
	DuplicateRegistration(String),

	/// Model is not registered with this site
	#[error("Model '{0}' is not registered")]
	NotRegistered(String),

	/// Plugin configuration is invalid (e.g. empty name)
	#[error("Invalid plugin: {0}")]
	InvalidPlugin(String),

	/// Plugin name is already taken
	#[error("Plugin '{0}' is already registered")]
	DuplicatePlugin(String),

	/// Two routes resolve to the same path or name
	#[error("Route collision: {0}")]
	RouteCollision(String),

	/// Record or route not found
	#[error("Not found: {0}")]
	NotFound(String),

	/// Requesting identity lacks the required permission
	#[error("Permission denied: {0}")]
	PermissionDenied(String),

	/// Form or field validation failed
	#[error("Validation error: {0}")]
	ValidationError(String),

	/// Unexpected persistence-layer failure
	#[error("Database error: {0}")]
	DatabaseError(String),

	/// Widget template rendering failed
	#[error("Template rendering error: {0}")]
	TemplateError(String),
}

/// Result type for admin operations
pub type AdminResult<T> = Result<T, AdminError>;
