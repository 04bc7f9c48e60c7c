//! Rule-set document emission.
//!
//! The downstream compiler (`sing-box rule-set compile`) consumes a JSON
//! source document of the shape
//! `{"version": 3, "rules": [{"domain_suffix": [...], "ip_cidr": [...]}]}`.
//! Building that document is the last in-scope step; compiling it to the
//! binary `.srs` format stays external.

use serde::Serialize;

use crate::error::Result;

/// Source-format version understood by the external compiler.
pub const RULESET_VERSION: u32 = 3;

#[derive(Debug, Serialize)]
pub struct RuleSetDocument {
    pub version: u32,
    pub rules: Vec<RuleEntry>,
}

#[derive(Debug, Serialize)]
pub struct RuleEntry {
    pub domain_suffix: Vec<String>,
    pub ip_cidr: Vec<String>,
}

impl RuleSetDocument {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Build the combined document from final domain and CIDR lists.
///
/// Entries without a dot can only come from manually curated files and
/// denote whole zones; they are emitted with a leading dot so the suffix
/// match covers the zone (`ua` -> `.ua`).
pub fn build_ruleset(domains: &[String], cidrs: &[String]) -> RuleSetDocument {
    let domain_suffix = domains
        .iter()
        .filter(|d| !d.is_empty())
        .map(|d| {
            if d.contains('.') {
                d.clone()
            } else {
                format!(".{d}")
            }
        })
        .collect();

    RuleSetDocument {
        version: RULESET_VERSION,
        rules: vec![RuleEntry {
            domain_suffix,
            ip_cidr: cidrs.to_vec(),
        }],
    }
}
