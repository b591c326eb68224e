use std::collections::HashSet;

use uuid::Uuid;

use super::roles;

/// A recognized role. Unknown role strings deliberately do not parse: a
/// malformed or unexpected role must never grant the elevated bypass, so it
/// falls through to the restricted (staff-like) path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Owner,
    Admin,
    Staff,
}

impl Role {
    pub fn parse(value: &str) -> Option<Role> {
        match value {
            roles::OWNER => Some(Role::Owner),
            roles::ADMIN => Some(Role::Admin),
            roles::STAFF => Some(Role::Staff),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => roles::OWNER,
            Role::Admin => roles::ADMIN,
            Role::Staff => roles::STAFF,
        }
    }

    /// Elevated roles are never filtered.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }
}

/// A permission requirement attached to a gated item: either a single slug
/// or an "any of" list. The shared gating table maps node keys to these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Single(&'static str),
    AnyOf(&'static [&'static str]),
}

/// The acting session: user identity, raw role strings, and the set of
/// granted permissions. Immutable once assembled; handlers build a fresh one
/// per request so a changed grant takes effect on the next request.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub roles: Vec<String>,
    permissions: HashSet<String>,
    elevated: bool,
}

impl Session {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            roles: Vec::new(),
            permissions: HashSet::new(),
            elevated: false,
        }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = String>) -> Self {
        self.roles = roles.into_iter().collect();
        self.elevated = self
            .roles
            .iter()
            .any(|r| Role::parse(r).is_some_and(|role| role.is_elevated()));
        self
    }

    pub fn with_permissions(mut self, perms: impl IntoIterator<Item = String>) -> Self {
        self.permissions = perms.into_iter().collect();
        self
    }

    /// True when every gate short-circuits to allow. Evaluated before any
    /// set-membership check.
    pub fn bypasses_filtering(&self) -> bool {
        self.elevated
    }

    pub fn has_permission(&self, required: &str) -> bool {
        if self.elevated {
            return true;
        }
        let granted = self.permissions.contains(required);
        tracing::debug!(user_id = %self.user_id, permission = %required, granted, "permission check");
        granted
    }

    pub fn has_any_permission(&self, required: &[&str]) -> bool {
        if self.elevated {
            return true;
        }
        required.iter().any(|perm| self.permissions.contains(*perm))
    }

    pub fn allows(&self, requirement: &Requirement) -> bool {
        match requirement {
            Requirement::Single(slug) => self.has_permission(slug),
            Requirement::AnyOf(slugs) => self.has_any_permission(slugs),
        }
    }

    /// Granted slugs in unspecified order. Elevated sessions have an empty
    /// set here; callers that need "everything" consult the catalogue.
    pub fn granted(&self) -> impl Iterator<Item = &str> {
        self.permissions.iter().map(String::as_str)
    }
}
