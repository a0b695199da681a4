// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Client roles recognised by the role gates.
///
/// Roles are read from `resource_access[<client_id>].roles` in the access
/// token.
///
/// ## Role Hierarchy
///
/// - `Admin` (`fastapi_admin`) - user management plus everything `User` can do
/// - `User` (`fastapi_user`) - own profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Role {
    #[serde(rename = "fastapi_admin")]
    Admin,
    #[serde(rename = "fastapi_user")]
    User,
}

impl Role {
    /// Role name as defined on the provider client.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "fastapi_admin",
            Role::User => "fastapi_user",
        }
    }

    /// Human readable label used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::User => "User",
        }
    }

    /// Check if this role has at least the privileges of the required role.
    pub fn has_privilege(&self, required: Role) -> bool {
        match (self, required) {
            (Role::Admin, _) => true,
            (Role::User, Role::User) => true,
            _ => false,
        }
    }

    /// Parse a provider role name. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Role> {
        match name {
            "fastapi_admin" => Some(Role::Admin),
            "fastapi_user" => Some(Role::User),
            _ => None,
        }
    }

    /// True if any of `role_names` grants the privileges of `required`.
    pub fn granted_by<S: AsRef<str>>(required: Role, role_names: &[S]) -> bool {
        role_names
            .iter()
            .filter_map(|name| Role::from_name(name.as_ref()))
            .any(|role| role.has_privilege(required))
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_has_all_privileges() {
        assert!(Role::Admin.has_privilege(Role::Admin));
        assert!(Role::Admin.has_privilege(Role::User));
    }

    #[test]
    fn user_lacks_admin_privilege() {
        assert!(Role::User.has_privilege(Role::User));
        assert!(!Role::User.has_privilege(Role::Admin));
    }

    #[test]
    fn from_name_is_exact() {
        assert_eq!(Role::from_name("fastapi_admin"), Some(Role::Admin));
        assert_eq!(Role::from_name("fastapi_user"), Some(Role::User));
        assert_eq!(Role::from_name("FASTAPI_ADMIN"), None);
        assert_eq!(Role::from_name("offline_access"), None);
    }

    #[test]
    fn granted_by_checks_role_list() {
        let user = ["offline_access", "fastapi_user"];
        assert!(Role::granted_by(Role::User, &user));
        assert!(!Role::granted_by(Role::Admin, &user));

        let admin = ["fastapi_admin"];
        assert!(Role::granted_by(Role::User, &admin));
        assert!(Role::granted_by(Role::Admin, &admin));

        let none: [&str; 0] = [];
        assert!(!Role::granted_by(Role::User, &none));
    }
}
