//! Listforge - curated domain and IP/CIDR list aggregation.
//!
//! This crate builds and maintains allow/block lists that drive downstream
//! routing-rule artifacts. It takes a declarative configuration of named
//! *services* and *groups*, resolves their sources (inline literals,
//! remote plain-text lists, references into a categorized community
//! dataset, CIDR feeds), and produces a deterministic, minimal artifact
//! set plus a rule-set JSON document for the external compiler.
//!
//! # Pipeline
//!
//! - **Normalization**: every raw line is cleaned into canonical
//!   lowercase domains; `regexp:` lines run through a bounded expander
//!   that turns a restricted regex dialect into literal variants.
//! - **Aggregation**: services and groups are resolved concurrently;
//!   entities flagged `general: false` become exclusion sources and are
//!   subtracted (with subdomain/superdomain dominance) from the global
//!   output.
//! - **Minimization**: domains covered by a shorter kept suffix are
//!   dropped; CIDR feeds are collapsed into the minimal covering block
//!   set per address family.
//!
//! # Quick Start
//!
//! ```ignore
//! use listforge::{Config, Engine};
//! use listforge::dataset::FileCategoryProvider;
//! use listforge::fetch::HttpFetcher;
//! use listforge::store::FsStore;
//!
//! let config = Config::load(Path::new("config.yaml"))?;
//! let fetcher = HttpFetcher::new(config.user_agent.as_deref())?;
//! let categories = FileCategoryProvider::new("tmp/domain-list-community/data");
//! let store = FsStore::new("lists");
//!
//! let engine = Engine::new(&config, &fetcher, &categories, &store);
//! let report = engine.run().await?;
//! println!("{} domains", report.total_domains);
//! ```
//!
//! # Failure model
//!
//! Only configuration load failures are fatal. A dead remote source, a
//! malformed line, or a missing dataset checkout degrades to an empty
//! contribution with a warning; partial artifacts are still written.

mod error;

pub mod cidr;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod fetch;
pub mod filter;
pub mod normalize;
pub mod resolver;
pub mod ruleset;
pub mod store;
pub mod subnets;

// Re-export core types
pub use error::{Error, PatternError, Result};

pub use config::{
    AsnFeed, AsnList, Config, EntityConfig, Flag, OneOrMany, SourceSpec, SubnetConfig,
    TemplateFeed, UrlFeed,
};
pub use engine::{Engine, RunReport};
pub use ruleset::{build_ruleset, RuleEntry, RuleSetDocument};
pub use subnets::SubnetEngine;
