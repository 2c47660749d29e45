use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;
use policyweave_core::error::{PolicyError, Result};

use crate::policy::allowlist::compile_rules;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    pub version: u32,

    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub policies: Vec<PolicyBinding>,
}

impl PolicyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(PolicyError::UnsupportedVersion);
        }

        let mut seen = HashSet::new();
        for p in &self.policies {
            if p.id.trim().is_empty() {
                return Err(PolicyError::BadRequest("policies[].id must not be empty".into()));
            }
            if !seen.insert(p.id.as_str()) {
                return Err(PolicyError::BadRequest(format!("duplicate policy id: {}", p.id)));
            }
            p.validate()?;
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSection {
    /// `false` disables every policy without removing the bindings.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// Which invocation kinds a binding applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppliesTo {
    Source,
    Operation,
    #[default]
    Both,
}

impl AppliesTo {
    pub fn source(self) -> bool {
        matches!(self, AppliesTo::Source | AppliesTo::Both)
    }

    pub fn operation(self) -> bool {
        matches!(self, AppliesTo::Operation | AppliesTo::Both)
    }
}

/// One policy, where it applies, and its settings. List order is wrapping order.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyBinding {
    pub id: String,

    #[serde(default)]
    pub applies_to: AppliesTo,

    #[serde(default, rename = "match")]
    pub matcher: MatchRule,

    pub kind: PolicyKind,
}

impl PolicyBinding {
    pub fn validate(&self) -> Result<()> {
        compile_rules(&self.matcher.components).map_err(|e| {
            PolicyError::BadRequest(format!("policy {}: match.components: {e}", self.id))
        })?;

        match &self.kind {
            PolicyKind::Audit => {}
            PolicyKind::RateLimit { rps, burst } => {
                if !(1..=1_000_000).contains(rps) {
                    return Err(PolicyError::BadRequest(format!(
                        "policy {}: rps must be between 1 and 1000000",
                        self.id
                    )));
                }
                if *burst == 0 {
                    return Err(PolicyError::BadRequest(format!(
                        "policy {}: burst must be at least 1",
                        self.id
                    )));
                }
            }
            PolicyKind::Allowlist { allow } => {
                if allow.is_empty() {
                    return Err(PolicyError::BadRequest(format!(
                        "policy {}: allowlist must not be empty",
                        self.id
                    )));
                }
                compile_rules(allow)
                    .map_err(|e| PolicyError::BadRequest(format!("policy {}: {e}", self.id)))?;
            }
        }
        Ok(())
    }
}

/// Selection predicate: every listed condition must hold. Empty matches everything.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchRule {
    /// `namespace:name` or `namespace:*`.
    #[serde(default)]
    pub components: Vec<String>,

    /// Attribute equality, checked on the invocation and then its source.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum PolicyKind {
    Audit,
    RateLimit { rps: u32, burst: u32 },
    Allowlist { allow: Vec<String> },
}
