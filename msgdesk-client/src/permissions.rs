//! Permission model
//!
//! Maps the current user's role to what the interface should offer. Purely
//! presentational: the server decides what is actually allowed and answers
//! with 403 otherwise.

use msgdesk_core::{CurrentUser, Role};
use serde::{Deserialize, Serialize};

/// Things a user may be offered to do with messages
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Capability {
    Create,
    Edit,
    Delete,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Create => write!(f, "create"),
            Capability::Edit => write!(f, "edit"),
            Capability::Delete => write!(f, "delete"),
        }
    }
}

impl std::str::FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "create" => Ok(Capability::Create),
            "edit" => Ok(Capability::Edit),
            "delete" => Ok(Capability::Delete),
            _ => Err(format!("Unknown capability: {}", s)),
        }
    }
}

/// Capability set for one user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    /// Always the negation of having any other capability
    pub is_read_only: bool,
}

impl Permissions {
    /// Nothing but reading
    pub const READ_ONLY: Self = Self {
        can_create: false,
        can_edit: false,
        can_delete: false,
        is_read_only: true,
    };

    /// Everything
    pub const FULL: Self = Self {
        can_create: true,
        can_edit: true,
        can_delete: true,
        is_read_only: false,
    };

    /// Permissions for a user as returned by `/api/users/me`
    ///
    /// An unrecognised role string grants nothing.
    pub fn for_user(user: Option<&CurrentUser>) -> Self {
        permissions(user.and_then(CurrentUser::role))
    }

    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::Create => self.can_create,
            Capability::Edit => self.can_edit,
            Capability::Delete => self.can_delete,
        }
    }

    /// Granted capabilities, in a fixed order
    pub fn capabilities(&self) -> Vec<Capability> {
        [Capability::Create, Capability::Edit, Capability::Delete]
            .into_iter()
            .filter(|c| self.allows(*c))
            .collect()
    }
}

/// Capability set for a role; `None` means nobody is logged in
pub fn permissions(role: Option<Role>) -> Permissions {
    match role {
        Some(Role::Admin) => Permissions::FULL,
        Some(Role::Viewer) | None => Permissions::READ_ONLY,
    }
}
