// src/models/scope.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::models::role::ADMIN_ROLE;

/// OAuth2 permission scopes recognised by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Scope {
    #[serde(rename = "questions:read")]
    QuestionsRead,
    #[serde(rename = "questions:write")]
    QuestionsWrite,
    #[serde(rename = "questions:delete")]
    QuestionsDelete,
    #[serde(rename = "process:config")]
    ProcessConfig,
}

impl Scope {
    pub const ALL: [Scope; 4] = [
        Scope::QuestionsRead,
        Scope::QuestionsWrite,
        Scope::QuestionsDelete,
        Scope::ProcessConfig,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::QuestionsRead => "questions:read",
            Scope::QuestionsWrite => "questions:write",
            Scope::QuestionsDelete => "questions:delete",
            Scope::ProcessConfig => "process:config",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Scope::QuestionsRead => "View questions",
            Scope::QuestionsWrite => "Create or modify questions",
            Scope::QuestionsDelete => "Delete questions",
            Scope::ProcessConfig => "Configure the test flow",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scope with its human-readable description, as listed to admin clients
/// when they assemble a role.
#[derive(Debug, Clone, Serialize)]
pub struct ScopeInfo {
    pub scope: Scope,
    pub description: &'static str,
}

/// Every known scope with its description, in `Scope::ALL` order.
pub fn catalog() -> Vec<ScopeInfo> {
    Scope::ALL
        .into_iter()
        .map(|scope| ScopeInfo {
            scope,
            description: scope.description(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownScope(pub String);

impl fmt::Display for UnknownScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown scope '{}'", self.0)
    }
}

impl std::error::Error for UnknownScope {}

impl FromStr for Scope {
    type Err = UnknownScope;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scope::ALL
            .into_iter()
            .find(|scope| scope.as_str() == s)
            .ok_or_else(|| UnknownScope(s.to_string()))
    }
}

/// Parses the comma-separated storage format used by `roles.permissions`
/// and `user_sessions.scopes`. Unknown entries are dropped.
pub fn parse_list(raw: &str) -> Vec<Scope> {
    let mut scopes = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match item.parse::<Scope>() {
            Ok(scope) if !scopes.contains(&scope) => scopes.push(scope),
            Ok(_) => {}
            Err(e) => tracing::warn!("Ignoring stored permission: {}", e),
        }
    }
    scopes
}

/// Inverse of [`parse_list`].
pub fn join(scopes: &[Scope]) -> String {
    scopes
        .iter()
        .map(Scope::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// Parses the space-separated OAuth2 `scope` form parameter.
pub fn parse_requested(raw: &str) -> Result<Vec<Scope>, UnknownScope> {
    let mut scopes = Vec::new();
    for item in raw.split_whitespace() {
        let scope = item.parse::<Scope>()?;
        if !scopes.contains(&scope) {
            scopes.push(scope);
        }
    }
    Ok(scopes)
}

/// Returns the required scopes that are not in `granted`.
pub fn missing(granted: &[Scope], required: &[Scope]) -> Vec<Scope> {
    required
        .iter()
        .filter(|scope| !granted.contains(scope))
        .copied()
        .collect()
}

/// Scopes for users whose role has no row in `roles`.
pub fn legacy_role_scopes(role: &str) -> Vec<Scope> {
    match role {
        ADMIN_ROLE => Scope::ALL.to_vec(),
        "user" => vec![Scope::QuestionsRead],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_format_round_trips() {
        let scopes = vec![Scope::QuestionsRead, Scope::ProcessConfig];
        let stored = join(&scopes);

        assert_eq!(stored, "questions:read,process:config");
        assert_eq!(parse_list(&stored), scopes);
    }

    #[test]
    fn parse_list_skips_blanks_unknowns_and_duplicates() {
        let scopes = parse_list(" questions:read,,bogus, questions:read ,questions:delete");
        assert_eq!(scopes, vec![Scope::QuestionsRead, Scope::QuestionsDelete]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn requested_scopes_must_be_known() {
        assert_eq!(
            parse_requested("questions:read  process:config").unwrap(),
            vec![Scope::QuestionsRead, Scope::ProcessConfig]
        );
        assert_eq!(
            parse_requested("questions:read admin").unwrap_err(),
            UnknownScope("admin".to_string())
        );
    }

    #[test]
    fn missing_reports_only_absent_scopes() {
        let granted = [Scope::QuestionsRead];
        assert!(missing(&granted, &[Scope::QuestionsRead]).is_empty());
        assert_eq!(
            missing(&granted, &[Scope::QuestionsRead, Scope::QuestionsWrite]),
            vec![Scope::QuestionsWrite]
        );
    }

    #[test]
    fn legacy_roles_fall_back_to_fixed_grants() {
        assert_eq!(legacy_role_scopes(ADMIN_ROLE), Scope::ALL.to_vec());
        assert_eq!(legacy_role_scopes("user"), vec![Scope::QuestionsRead]);
        assert!(legacy_role_scopes("guest").is_empty());
    }

    #[test]
    fn catalog_lists_every_scope_with_a_description() {
        let json = serde_json::to_value(catalog()).unwrap();
        let entries = json.as_array().unwrap();

        assert_eq!(entries.len(), Scope::ALL.len());
        assert_eq!(entries[3]["scope"], "process:config");
        assert_eq!(entries[3]["description"], "Configure the test flow");
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&Scope::ProcessConfig).unwrap();
        assert_eq!(json, "\"process:config\"");
    }
}
