//! Categorized third-party dataset resolution.
//!
//! Category references point into a local checkout of a line-oriented
//! community dataset (the v2fly `domain-list-community` layout: one file
//! per category, `include:<other>` directives pulling in further
//! categories). Obtaining the checkout is an external concern; a missing
//! checkout degrades every category to an empty set for the run.

use ahash::AHashSet;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::normalize::normalize;

/// Abstract category-to-domain-set resolver.
pub trait CategoryProvider: Send + Sync {
    /// Resolve one category name to its full domain set, following
    /// includes recursively.
    fn category_domains(&self, name: &str) -> Result<AHashSet<String>>;
}

/// Category provider over a local dataset checkout.
pub struct FileCategoryProvider {
    data_dir: PathBuf,
}

impl FileCategoryProvider {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn parse_category(
        &self,
        name: &str,
        visited: &mut AHashSet<String>,
        domains: &mut AHashSet<String>,
    ) {
        // visited set keyed by file name makes include cycles terminate
        if !visited.insert(name.to_string()) {
            return;
        }

        let path = self.data_dir.join(name);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) => {
                log::warn!("category file {} not readable: {}", path.display(), err);
                return;
            }
        };

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(included) = line.strip_prefix("include:") {
                self.parse_category(included.trim(), visited, domains);
                continue;
            }
            domains.extend(normalize(line));
        }
    }
}

impl CategoryProvider for FileCategoryProvider {
    fn category_domains(&self, name: &str) -> Result<AHashSet<String>> {
        if !self.data_dir.is_dir() {
            return Err(Error::DatasetUnavailable(
                self.data_dir.display().to_string(),
            ));
        }
        let mut domains = AHashSet::new();
        let mut visited = AHashSet::new();
        self.parse_category(name, &mut visited, &mut domains);
        Ok(domains)
    }
}
