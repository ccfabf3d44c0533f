/// Router Module Index
///
/// Routes are grouped by who may call them. The request gate runs in front of
/// all three groups (see `create_router`); these modules only add the
/// per-group authentication layer.

/// Routes open to anonymous visitors: the blog, auth pages and the health check.
pub mod public;

/// Routes that need a signed-in user (`AuthUser`).
pub mod authenticated;

/// The back office, nested under `/admin`. Handlers re-check the admin role.
pub mod admin;
