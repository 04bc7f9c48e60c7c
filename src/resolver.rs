//! Source resolution: an entity's declared sources to a raw domain set.

use ahash::AHashSet;
use futures::future::join_all;

use crate::config::SourceSpec;
use crate::dataset::CategoryProvider;
use crate::fetch::{fetch_or_empty, SourceFetcher};
use crate::normalize::normalize;

/// Resolves source specs against the fetch and dataset collaborators.
pub struct SourceResolver<'a> {
    fetcher: &'a dyn SourceFetcher,
    categories: &'a dyn CategoryProvider,
}

impl<'a> SourceResolver<'a> {
    pub fn new(fetcher: &'a dyn SourceFetcher, categories: &'a dyn CategoryProvider) -> Self {
        Self {
            fetcher,
            categories,
        }
    }

    /// Resolve all sources of one entity into a union set.
    ///
    /// URL fetches are issued concurrently and awaited jointly; any single
    /// failure is logged and contributes an empty set.
    pub async fn resolve(&self, specs: &[SourceSpec]) -> AHashSet<String> {
        let mut domains = AHashSet::new();
        let mut urls: Vec<&str> = Vec::new();

        for spec in specs {
            match spec {
                SourceSpec::Literal(lines) => {
                    for line in lines {
                        domains.extend(normalize(line));
                    }
                }
                SourceSpec::Url(list) => urls.extend(list.iter().map(String::as_str)),
                SourceSpec::Category(names) => {
                    for name in names {
                        match self.categories.category_domains(name) {
                            Ok(set) => domains.extend(set),
                            Err(err) => {
                                log::warn!("category {} unresolved: {}", name, err);
                            }
                        }
                    }
                }
            }
        }

        let bodies = join_all(urls.iter().map(|url| fetch_or_empty(self.fetcher, url))).await;
        for text in bodies.into_iter().flatten() {
            for line in text.lines() {
                domains.extend(normalize(line));
            }
        }

        domains
    }
}
