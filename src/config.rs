//! Declarative run configuration.
//!
//! The configuration is a YAML document (the legacy JSON configs parse as
//! YAML) with `services:` and `groups:` entity tables, a `subnets:` table
//! of CIDR feeds, and a few top-level knobs. Scalars that historically
//! appeared both as a string and as a list are accepted in both forms.

use ahash::AHashMap;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Error, Result};

/// String-or-list configuration scalar.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s.clone()],
            OneOrMany::Many(v) => v.clone(),
        }
    }
}

/// Boolean flag that also accepts the strings `"true"`/`"false"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Flag {
    Bool(bool),
    Text(String),
}

impl Flag {
    pub fn as_bool(&self) -> bool {
        match self {
            Flag::Bool(b) => *b,
            Flag::Text(s) => !matches!(
                s.to_ascii_lowercase().as_str(),
                "false" | "0" | "f" | "no"
            ),
        }
    }
}

impl Default for Flag {
    fn default() -> Self {
        Flag::Bool(true)
    }
}

/// One source of raw domain lines.
#[derive(Debug, Clone)]
pub enum SourceSpec {
    /// Literal lines declared inline in the configuration
    Literal(Vec<String>),
    /// Remote plain-text lists
    Url(Vec<String>),
    /// References into the categorized dataset
    Category(Vec<String>),
}

/// A named service or group.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityConfig {
    /// Remote list URL(s)
    pub url: Option<OneOrMany>,
    /// Literal domain/pattern lines
    pub domains: Option<OneOrMany>,
    /// Categorized-dataset reference(s)
    pub category: Option<OneOrMany>,
    /// Contributes to the global aggregate when true (default); when false
    /// the entity is still resolved and persisted but acts as an exclusion
    /// source.
    #[serde(default)]
    pub general: Flag,
    /// Referenced service names (groups only, case-insensitive)
    #[serde(default)]
    pub include: Vec<String>,
}

impl EntityConfig {
    pub fn is_general(&self) -> bool {
        self.general.as_bool()
    }

    /// The entity's declared sources in literal, URL, category order.
    pub fn sources(&self) -> Vec<SourceSpec> {
        let mut specs = Vec::new();
        if let Some(domains) = &self.domains {
            specs.push(SourceSpec::Literal(domains.to_vec()));
        }
        if let Some(urls) = &self.url {
            specs.push(SourceSpec::Url(urls.to_vec()));
        }
        if let Some(categories) = &self.category {
            specs.push(SourceSpec::Category(categories.to_vec()));
        }
        specs
    }
}

/// Number-or-list configuration scalar (ASN references).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AsnList {
    One(u32),
    Many(Vec<u32>),
}

impl AsnList {
    pub fn to_vec(&self) -> Vec<u32> {
        match self {
            AsnList::One(n) => vec![*n],
            AsnList::Many(v) => v.clone(),
        }
    }
}

/// A named CIDR feed. The key present in the entry picks the feed kind.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SubnetConfig {
    Url(UrlFeed),
    Template(TemplateFeed),
    Asn(AsnFeed),
}

/// Plain URL feed; one URL may carry mixed-family text.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UrlFeed {
    pub url: OneOrMany,
}

/// Templated feed: `{cidr}` in the URL is substituted with `cidr4` and
/// `cidr6`, fetching one list per family.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateFeed {
    pub url_template: String,
}

/// ASN feed: blocks are taken from the BGP table dump (`bgp_url`) for the
/// listed origin AS numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AsnFeed {
    pub asn: AsnList,
}

/// Fully parsed run configuration.
///
/// Entity tables are `BTreeMap`s so iteration order, and with it every
/// artifact, is deterministic.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub services: BTreeMap<String, EntityConfig>,
    #[serde(default)]
    pub groups: BTreeMap<String, EntityConfig>,
    #[serde(default)]
    pub subnets: BTreeMap<String, SubnetConfig>,
    /// Subnet services contributing to the summary artifacts
    #[serde(default)]
    pub summary: Vec<String>,
    /// User-Agent for remote fetches
    #[serde(default)]
    pub user_agent: Option<String>,
    /// BGP table dump (`<cidr> ... <origin-asn>` lines) backing ASN feeds
    #[serde(default)]
    pub bgp_url: Option<String>,
    /// Category whose domains are additionally removed for the secondary
    /// global artifact
    #[serde(default)]
    pub exception_category: Option<String>,

    /// lowercase name -> canonical services key, built once at load
    #[serde(skip)]
    service_index: AHashMap<String, String>,
}

impl Config {
    /// Load and validate a configuration file. Fatal on missing or
    /// unparseable input.
    pub fn load(path: &Path) -> Result<Config> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Config::parse_str(&text)
    }

    /// Parse a configuration document from a string.
    pub fn parse_str(text: &str) -> Result<Config> {
        let mut config: Config = serde_yaml::from_str(text)
            .map_err(|e| Error::Config(format!("unparseable configuration: {e}")))?;

        if config.services.is_empty() && config.groups.is_empty() && config.subnets.is_empty() {
            return Err(Error::Config(
                "no services, groups or subnets defined".to_string(),
            ));
        }

        if config.bgp_url.is_none()
            && config
                .subnets
                .values()
                .any(|feed| matches!(feed, SubnetConfig::Asn(_)))
        {
            return Err(Error::Config(
                "asn subnet feeds require a top-level bgp_url".to_string(),
            ));
        }

        // entity names map onto lowercase artifact paths, so names that
        // differ only in case would silently share one file
        let mut index = AHashMap::new();
        for name in config.services.keys() {
            if let Some(clash) = index.insert(name.to_ascii_lowercase(), name.clone()) {
                return Err(Error::Config(format!(
                    "service names {clash:?} and {name:?} collide case-insensitively"
                )));
            }
        }
        for (kind, names) in [
            ("group", config.groups.keys().collect::<Vec<_>>()),
            ("subnet", config.subnets.keys().collect::<Vec<_>>()),
        ] {
            let mut seen: AHashMap<String, &String> = AHashMap::new();
            for name in names {
                if let Some(clash) = seen.insert(name.to_ascii_lowercase(), name) {
                    return Err(Error::Config(format!(
                        "{kind} names {clash:?} and {name:?} collide case-insensitively"
                    )));
                }
            }
        }

        config.service_index = index;
        Ok(config)
    }

    /// Case-insensitive service lookup; returns the canonical name and the
    /// service definition.
    pub fn service(&self, name: &str) -> Option<(&str, &EntityConfig)> {
        let canonical = self.service_index.get(&name.to_ascii_lowercase())?;
        self.services
            .get(canonical)
            .map(|entity| (canonical.as_str(), entity))
    }
}
