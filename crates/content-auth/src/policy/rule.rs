//! A single allow rule of the policy table.

use std::fmt;

use super::pattern::{ActionPattern, ResourcePattern};
use crate::Result;

/// Grants `role` the right to perform `action` on resources matching
/// `resource`.
///
/// Rules only ever allow. A request that matches no rule is denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRule {
    role: String,
    resource: ResourcePattern,
    action: ActionPattern,
}

impl PolicyRule {
    /// Creates a rule from already compiled patterns.
    pub fn new(role: impl Into<String>, resource: ResourcePattern, action: ActionPattern) -> Self {
        Self {
            role: role.into(),
            resource,
            action,
        }
    }

    /// Compiles a rule from its textual triple.
    pub fn parse(role: &str, resource: &str, action: &str) -> Result<Self> {
        Ok(Self::new(
            role.trim(),
            ResourcePattern::parse(resource)?,
            ActionPattern::parse(action)?,
        ))
    }

    /// Returns `true` if this rule grants `role` the `action` on `path`.
    #[inline]
    pub fn allows(&self, role: &str, path: &str, action: &str) -> bool {
        self.role == role && self.resource.matches(path) && self.action.matches(action)
    }

    /// Role or group this rule applies to.
    #[inline]
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Resource pattern of this rule.
    #[inline]
    pub fn resource(&self) -> &ResourcePattern {
        &self.resource
    }

    /// Action pattern of this rule.
    #[inline]
    pub fn action(&self) -> &ActionPattern {
        &self.action
    }
}

impl fmt::Display for PolicyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.role, self.resource, self.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_requires_all_three_components() {
        let rule = PolicyRule::parse("content-admins", "/admin/*", "GET|POST").unwrap();
        assert!(rule.allows("content-admins", "/admin/student_guides", "POST"));
        assert!(!rule.allows("content-editors", "/admin/student_guides", "POST"));
        assert!(!rule.allows("content-admins", "/student_guides", "POST"));
        assert!(!rule.allows("content-admins", "/admin/student_guides", "DELETE"));
    }

    #[test]
    fn display_round_trips_source() {
        let rule = PolicyRule::parse(" all ", "/admin/image", "post").unwrap();
        assert_eq!(rule.to_string(), "all, /admin/image, POST");
    }
}
