use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

/// Role
///
/// The classification attached to a profile. Profiles store the role as a
/// free-form string; it is normalised here once, at the boundary, so the rest
/// of the crate never compares role strings directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[serde(rename = "super admin")]
    SuperAdmin,
    Admin,
    Editor,
    Author,
    /// Assigned to self-registered accounts.
    #[default]
    Subscriber,
    Unknown,
}

impl Role {
    /// parse
    ///
    /// Case-insensitive parse of a stored role. Nothing else is normalised:
    /// surrounding whitespace or other spellings (`super_admin`) map to
    /// `Role::Unknown`, a role without privileges.
    pub fn parse(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "super admin" => Role::SuperAdmin,
            "admin" => Role::Admin,
            "editor" => Role::Editor,
            "author" => Role::Author,
            "subscriber" => Role::Subscriber,
            _ => Role::Unknown,
        }
    }

    /// The canonical stored spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super admin",
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Author => "author",
            Role::Subscriber => "subscriber",
            Role::Unknown => "unknown",
        }
    }

    /// Only admins and super admins may enter the back office.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
