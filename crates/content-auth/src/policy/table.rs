//! Ordered, immutable rule table.

use std::path::Path;
use std::sync::Arc;

use super::rule::PolicyRule;
use crate::utility::tracing_targets::TRACING_TARGET_POLICY as TRACING_TARGET;
use crate::{Error, Result};

/// Static policy table consulted by the permission and admin-group
/// strategies.
///
/// The table is loaded once at startup and never mutated afterwards, so it
/// is cheap to clone and safe to share between concurrent requests.
/// Evaluation walks the rules in source order and stops at the first rule
/// that allows the request. An empty table denies everything.
///
/// # Source format
///
/// One rule per line, either Casbin style or as a bare triple:
///
/// ```text
/// # role,            resource,                action
/// p, content-admins, /admin/*,                (GET)|(POST)|(PUT)|(DELETE)
/// all_student_guides, /admin/student_guides,  GET
/// ```
///
/// Blank lines and lines starting with `#` are ignored.
#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
    rules: Arc<[PolicyRule]>,
}

impl PolicyTable {
    /// Creates a table from rules in evaluation order.
    pub fn from_rules(rules: impl IntoIterator<Item = PolicyRule>) -> Self {
        Self {
            rules: rules.into_iter().collect(),
        }
    }

    /// Parses a table from its textual source.
    ///
    /// Errors name the 1-based line number of the offending rule.
    pub fn parse(source: &str) -> Result<Self> {
        let mut rules = Vec::new();

        for (index, line) in source.lines().enumerate() {
            let line_no = index + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let (role, resource, action) = match fields.as_slice() {
                ["p", role, resource, action] => (*role, *resource, *action),
                [role, resource, action] => (*role, *resource, *action),
                _ => {
                    return Err(Error::config(format!(
                        "policy line {line_no}: expected 'role, resource, action'"
                    )));
                }
            };

            if role.is_empty() {
                return Err(Error::config(format!("policy line {line_no}: empty role")));
            }

            let rule = PolicyRule::parse(role, resource, action).map_err(|e| {
                Error::config(format!("policy line {line_no}: {}", e.message()))
            })?;
            rules.push(rule);
        }

        Ok(Self::from_rules(rules))
    }

    /// Reads and parses a table from a file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        tracing::debug!(
            target: TRACING_TARGET,
            path = %path.display(),
            "loading policy table",
        );

        let source = tokio::fs::read_to_string(path).await.map_err(|e| {
            tracing::error!(
                target: TRACING_TARGET,
                path = %path.display(),
                error = %e,
                "failed to read policy file",
            );
            Error::file_system(format!("failed to read policy file {}", path.display()))
                .with_source(e)
        })?;

        let table = Self::parse(&source).inspect_err(|e| {
            tracing::error!(
                target: TRACING_TARGET,
                path = %path.display(),
                error = %e,
                "failed to parse policy file",
            );
        })?;

        tracing::info!(
            target: TRACING_TARGET,
            path = %path.display(),
            rules = table.len(),
            "policy table loaded",
        );

        Ok(table)
    }

    /// Returns the first rule granting `role` the `action` on `path`.
    pub fn enforce(&self, role: &str, path: &str, action: &str) -> Option<&PolicyRule> {
        self.rules.iter().find(|rule| rule.allows(role, path, action))
    }

    /// Tries each candidate role in order and stops at the first one the
    /// table grants.
    ///
    /// Returns the granting role together with the matching rule.
    pub fn authorize_any<'r, I>(
        &self,
        roles: I,
        path: &str,
        action: &str,
    ) -> Option<(&'r str, &PolicyRule)>
    where
        I: IntoIterator<Item = &'r str>,
    {
        roles
            .into_iter()
            .find_map(|role| self.enforce(role, path, action).map(|rule| (role, rule)))
    }

    /// Rules in evaluation order.
    #[inline]
    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    /// Number of rules.
    #[inline]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if the table has no rules.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::ErrorKind;

    const POLICY: &str = r#"
# admin console
p, content-admins, /admin/*, (GET)|(POST)|(PUT)|(DELETE)
p, content-viewers, /admin/student_guides, GET

content.guides.write, /student_guides/*, POST|PUT
content.guides.read, /student_guides/*, GET
"#;

    #[test]
    fn parses_both_line_forms() {
        let table = PolicyTable::parse(POLICY).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.rules()[0].role(), "content-admins");
        assert_eq!(table.rules()[2].role(), "content.guides.write");
    }

    #[test]
    fn empty_table_denies_everything() {
        let table = PolicyTable::parse("# nothing here\n\n").unwrap();
        assert!(table.is_empty());
        assert!(table.enforce("content-admins", "/admin/image", "POST").is_none());
        assert!(table.authorize_any(["a", "b"], "/", "GET").is_none());
    }

    #[test]
    fn enforce_matches_role_path_and_action() {
        let table = PolicyTable::parse(POLICY).unwrap();
        assert!(table.enforce("content-admins", "/admin/student_guides", "POST").is_some());
        assert!(table.enforce("content-viewers", "/admin/student_guides", "GET").is_some());
        assert!(table.enforce("content-viewers", "/admin/student_guides", "POST").is_none());
        assert!(table.enforce("content.guides.read", "/student_guides/1", "POST").is_none());
    }

    #[test]
    fn first_match_wins_for_overlapping_rules() {
        let table = PolicyTable::parse(
            "p, editors, /admin/*, *\np, editors, /admin/student_guides, GET\n",
        )
        .unwrap();

        for _ in 0..3 {
            let rule = table.enforce("editors", "/admin/student_guides", "GET").unwrap();
            assert_eq!(rule.resource().as_str(), "/admin/*");
        }
    }

    #[test]
    fn non_overlapping_rules_are_order_independent() {
        let forward = PolicyTable::parse("a, /x, GET\nb, /y, POST\n").unwrap();
        let reverse = PolicyTable::parse("b, /y, POST\na, /x, GET\n").unwrap();

        let probes = [("a", "/x", "GET"), ("b", "/y", "POST"), ("a", "/y", "POST")];
        for (role, path, action) in probes {
            assert_eq!(
                forward.enforce(role, path, action).is_some(),
                reverse.enforce(role, path, action).is_some(),
            );
        }
    }

    #[test]
    fn authorize_any_stops_at_first_granting_role() {
        let table = PolicyTable::parse(POLICY).unwrap();
        let roles = ["unknown", "content-viewers", "content-admins"];
        let (role, _) = table
            .authorize_any(roles, "/admin/student_guides", "GET")
            .unwrap();
        assert_eq!(role, "content-viewers");
    }

    #[test]
    fn malformed_lines_report_line_number() {
        let error = PolicyTable::parse("a, /x, GET\n\nonly, two\n").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Config);
        assert!(error.message().contains("line 3"), "{}", error.message());

        let error = PolicyTable::parse("a, no-slash, GET\n").unwrap_err();
        assert!(error.message().contains("line 1"), "{}", error.message());
    }

    #[tokio::test]
    async fn loads_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("policy.csv");
        fs::write(&path, POLICY).unwrap();

        let table = PolicyTable::from_file(&path).await.unwrap();
        assert_eq!(table.len(), 4);
    }

    #[tokio::test]
    async fn missing_file_is_file_system_error() {
        let temp_dir = TempDir::new().unwrap();
        let error = PolicyTable::from_file(temp_dir.path().join("absent.csv"))
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::FileSystem);
    }
}
