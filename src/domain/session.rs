//! Authenticated session and role, resolved once and passed down explicitly.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Manager,
    BranchStaff,
    Viewer,
}

impl Role {
    /// Parse a role name as issued at login. Unknown names resolve to
    /// [`Role::Viewer`] so an unrecognised role can never edit.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "admin" | "administrator" | "superadmin" => Role::Admin,
            "manager" | "branch_manager" => Role::Manager,
            "staff" | "branch_staff" | "operator" => Role::BranchStaff,
            _ => Role::Viewer,
        }
    }

    pub fn can_edit_grid(self) -> bool {
        !matches!(self, Role::Viewer)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::BranchStaff => "branch_staff",
            Role::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub role: Role,
    /// Branch the user is bound to, if any.
    pub branch_id: Option<String>,
}

impl Session {
    pub fn new(role: Role, branch_id: Option<String>) -> Self {
        Self { role, branch_id }
    }
}
