use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
    extract::{Query, Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth, error::RepoError, role::Role};

// --- Paths ---

pub const MAINTENANCE_PATH: &str = "/maintenance";
pub const HOME_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const ADMIN_DASHBOARD_PATH: &str = "/admin/dashboard";
const ADMIN_PREFIX: &str = "/admin";

/// Extensions served as static files. Matched case-sensitively against the end of the path.
const STATIC_ASSET_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "ico", "css", "js"];

/// Paths the gate never sees (health check and API documentation).
const UNGATED_PREFIXES: &[&str] = &["/health", "/swagger-ui", "/api-docs"];

/// PathClass
///
/// The coarse classification every gate rule is written against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    MaintenancePage,
    AdminRoute,
    AuthRoute,
    StaticAsset,
    Other,
}

impl PathClass {
    pub fn of(path: &str) -> Self {
        if path == MAINTENANCE_PATH {
            PathClass::MaintenancePage
        } else if path == ADMIN_PREFIX || path.starts_with("/admin/") {
            PathClass::AdminRoute
        } else if path == LOGIN_PATH || path == REGISTER_PATH {
            PathClass::AuthRoute
        } else if is_static_asset(path) {
            PathClass::StaticAsset
        } else {
            PathClass::Other
        }
    }

    /// Reachable while the site is in maintenance mode.
    fn open_during_maintenance(&self) -> bool {
        !matches!(self, PathClass::Other)
    }
}

/// Whole-segment match: `/health` and `/health/...`, never `/healthy-recipes`.
fn is_ungated(path: &str) -> bool {
    UNGATED_PREFIXES.iter().any(|prefix| {
        path.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

fn is_static_asset(path: &str) -> bool {
    path.rsplit_once('.')
        .map(|(_, ext)| !ext.contains('/') && STATIC_ASSET_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// ReasonCode
///
/// Machine-readable reasons passed to the login page in the `error` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonCode {
    AuthenticationRequired,
    AdminAccessRequired,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::AuthenticationRequired => "authentication_required",
            ReasonCode::AdminAccessRequired => "admin_access_required",
        }
    }
}

/// GateDecision
///
/// The outcome of a single evaluation. The HTTP adapter below turns
/// `RedirectTo` into a 307 response; nothing else depends on axum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    RedirectTo {
        path: &'static str,
        reason: Option<ReasonCode>,
    },
}

impl GateDecision {
    fn redirect(path: &'static str) -> Self {
        GateDecision::RedirectTo { path, reason: None }
    }

    fn to_login(reason: ReasonCode) -> Self {
        GateDecision::RedirectTo {
            path: LOGIN_PATH,
            reason: Some(reason),
        }
    }

    /// The `Location` value for a redirect, `None` for `Allow`.
    pub fn location(&self) -> Option<String> {
        match self {
            GateDecision::Allow => None,
            GateDecision::RedirectTo { path, reason: None } => Some((*path).to_string()),
            GateDecision::RedirectTo {
                path,
                reason: Some(reason),
            } => Some(format!("{}?error={}", path, reason.as_str())),
        }
    }
}

/// GateRequest
///
/// Everything a decision depends on. `login_marker` is the raw `error` query
/// parameter of the request, used only by the login/register rule.
#[derive(Debug, Clone)]
pub struct GateRequest<'a> {
    pub path: &'a str,
    pub login_marker: Option<&'a str>,
    pub identity: Option<Uuid>,
    pub role: Option<Role>,
    pub maintenance_mode: bool,
}

impl GateRequest<'_> {
    fn is_admin(&self) -> bool {
        self.role.is_some_and(|role| role.is_admin())
    }
}

/// evaluate
///
/// The gate's decision procedure. Rules are checked in a fixed order and the
/// first match wins. Pure: the same request always yields the same decision.
pub fn evaluate(request: &GateRequest<'_>) -> GateDecision {
    let class = PathClass::of(request.path);

    if request.maintenance_mode {
        if !class.open_during_maintenance() {
            return GateDecision::redirect(MAINTENANCE_PATH);
        }
    } else if class == PathClass::MaintenancePage {
        return GateDecision::redirect(HOME_PATH);
    }

    if class == PathClass::AdminRoute {
        if request.identity.is_none() {
            return GateDecision::to_login(ReasonCode::AuthenticationRequired);
        }
        if !request.is_admin() {
            return GateDecision::to_login(ReasonCode::AdminAccessRequired);
        }
        return GateDecision::Allow;
    }

    if class == PathClass::AuthRoute && request.identity.is_some() {
        // A session that was just bounced off /admin may still sign in as someone else.
        if request.login_marker == Some(ReasonCode::AdminAccessRequired.as_str()) {
            return GateDecision::Allow;
        }
        if request.is_admin() {
            return GateDecision::redirect(ADMIN_DASHBOARD_PATH);
        }
        return GateDecision::redirect(HOME_PATH);
    }

    GateDecision::Allow
}

// --- Injected read dependencies ---

/// ProfileStore
///
/// Read-only role lookup. `Ok(None)` means the user has no profile (or no role).
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn role_of(&self, user_id: Uuid) -> Result<Option<String>, RepoError>;
}

/// SettingsStore
///
/// Read-only access to the site-wide maintenance flag. `Ok(None)` means no settings row exists.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn maintenance_mode(&self) -> Result<Option<bool>, RepoError>;
}

pub type ProfileStoreState = Arc<dyn ProfileStore>;
pub type SettingsStoreState = Arc<dyn SettingsStore>;

/// GateState
///
/// The gate's collaborators, held in `AppState` next to the repository.
#[derive(Clone)]
pub struct GateState {
    pub profiles: ProfileStoreState,
    pub settings: SettingsStoreState,
}

impl GateState {
    pub fn new(profiles: ProfileStoreState, settings: SettingsStoreState) -> Self {
        Self { profiles, settings }
    }
}

// --- HTTP adapter ---

#[derive(Deserialize)]
struct LoginMarker {
    error: Option<String>,
}

/// lookup_or_default
///
/// Awaits a store lookup under `timeout`. Errors and timeouts are logged and
/// collapse to `None`, which every caller treats as the safe default.
async fn lookup_or_default<T, F>(what: &'static str, timeout: Duration, lookup: F) -> Option<T>
where
    F: Future<Output = Result<Option<T>, RepoError>>,
{
    match tokio::time::timeout(timeout, lookup).await {
        Ok(Ok(value)) => value,
        Ok(Err(e)) => {
            tracing::warn!(lookup = what, error = %e, "gate lookup failed, using safe default");
            None
        }
        Err(_) => {
            tracing::warn!(lookup = what, timeout_ms = timeout.as_millis() as u64, "gate lookup timed out, using safe default");
            None
        }
    }
}

/// gate_middleware
///
/// Runs the gate in front of every routed request. Resolves the caller,
/// fetches the maintenance flag and (only when a rule needs it) the caller's
/// role, then either forwards the request or answers with a temporary redirect.
pub async fn gate_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    if is_ungated(&path) {
        return next.run(request).await;
    }

    let class = PathClass::of(&path);
    let timeout = state.config.gate_lookup_timeout;
    let identity = auth::resolve_identity(request.headers(), &state.config);

    let maintenance_mode = lookup_or_default(
        "maintenance_mode",
        timeout,
        state.gate.settings.maintenance_mode(),
    )
    .await
    .unwrap_or(false);

    let role = match identity {
        Some(user_id) if matches!(class, PathClass::AdminRoute | PathClass::AuthRoute) => {
            lookup_or_default("role", timeout, state.gate.profiles.role_of(user_id))
                .await
                .map(|raw| Role::parse(&raw))
        }
        _ => None,
    };

    let marker = Query::<LoginMarker>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(m)| m.error);

    let decision = evaluate(&GateRequest {
        path: &path,
        login_marker: marker.as_deref(),
        identity,
        role,
        maintenance_mode,
    });

    match decision.location() {
        None => next.run(request).await,
        Some(location) => {
            tracing::debug!(
                path = %path,
                user_id = ?identity,
                role = ?role,
                maintenance_mode,
                location = %location,
                "gate redirect"
            );
            Redirect::temporary(&location).into_response()
        }
    }
}
