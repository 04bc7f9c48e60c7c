//! The aggregation engine: configuration in, artifact set out.
//!
//! One run resolves every configured service and group, maintains the
//! per-entity artifacts (union with prior on-disk content), subtracts the
//! exclusion entities from the aggregate, and rewrites the canonical
//! global domain list from scratch. Only configuration problems are fatal;
//! failed sources contribute empty sets.

use ahash::{AHashMap, AHashSet};
use futures::future::join_all;

use crate::config::Config;
use crate::dataset::CategoryProvider;
use crate::error::Result;
use crate::fetch::SourceFetcher;
use crate::filter::{filter_redundant, RelatedSet};
use crate::resolver::SourceResolver;
use crate::store::{paths, ArtifactStore};

/// Counters reported after a run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Services resolved
    pub services: usize,
    /// Groups resolved
    pub groups: usize,
    /// Entries in the global exclusion set
    pub exclusions: usize,
    /// Entries in the final canonical domain list
    pub total_domains: usize,
}

/// Orchestrates one aggregation run against the injected collaborators.
pub struct Engine<'a> {
    config: &'a Config,
    fetcher: &'a dyn SourceFetcher,
    categories: &'a dyn CategoryProvider,
    store: &'a dyn ArtifactStore,
}

impl<'a> Engine<'a> {
    pub fn new(
        config: &'a Config,
        fetcher: &'a dyn SourceFetcher,
        categories: &'a dyn CategoryProvider,
        store: &'a dyn ArtifactStore,
    ) -> Self {
        Self {
            config,
            fetcher,
            categories,
            store,
        }
    }

    pub async fn run(&self) -> Result<RunReport> {
        let resolver = SourceResolver::new(self.fetcher, self.categories);

        // Resolve every service regardless of flag; the per-service
        // artifact always grows, it never depends on inclusion.
        let service_sets = join_all(self.config.services.values().map(|svc| {
            let resolver = &resolver;
            async move { resolver.resolve(&svc.sources()).await }
        }))
        .await;

        let mut resolved: AHashMap<String, AHashSet<String>> = AHashMap::new();
        for ((name, _), set) in self.config.services.iter().zip(service_sets) {
            self.persist_union(&paths::service(name), &set)?;
            resolved.insert(name.clone(), set);
        }

        // Exclusion set: every entity with general=false.
        let mut exclusions: AHashSet<String> = AHashSet::new();
        for (name, svc) in &self.config.services {
            if !svc.is_general() {
                if let Some(set) = resolved.get(name) {
                    exclusions.extend(set.iter().cloned());
                }
            }
        }

        // Groups: direct sources first (concurrently), then referenced
        // services, gated by the tri-state precedence: an explicit false on
        // either side excludes.
        let direct_sets = join_all(self.config.groups.values().map(|grp| {
            let resolver = &resolver;
            async move { resolver.resolve(&grp.sources()).await }
        }))
        .await;

        let mut auto_resolved: AHashSet<String> =
            resolved.values().flatten().cloned().collect();
        let mut general_groups: AHashSet<String> = AHashSet::new();

        for ((name, grp), mut set) in self.config.groups.iter().zip(direct_sets) {
            auto_resolved.extend(set.iter().cloned());
            for target in &grp.include {
                match self.config.service(target) {
                    Some((canonical, svc)) => {
                        if svc.is_general() && grp.is_general() {
                            if let Some(service_set) = resolved.get(canonical) {
                                set.extend(service_set.iter().cloned());
                            }
                        }
                    }
                    None => {
                        log::warn!("group {}: unknown service {:?} in include", name, target);
                    }
                }
            }
            self.persist_union(&paths::group(name), &set)?;
            if grp.is_general() {
                general_groups.extend(set);
            } else {
                exclusions.extend(set);
            }
        }

        // Manually curated prior entries: whatever was in the global list
        // but is not attributable to any source resolved this run.
        let prior: AHashSet<String> = self
            .store
            .read_lines(paths::DOMAINS)?
            .into_iter()
            .collect();
        let manual: Vec<String> = prior.difference(&auto_resolved).cloned().collect();
        if !manual.is_empty() {
            log::info!("keeping {} manually curated domains", manual.len());
        }

        let mut global: AHashSet<String> = AHashSet::new();
        for (name, svc) in &self.config.services {
            if svc.is_general() {
                if let Some(set) = resolved.get(name) {
                    global.extend(set.iter().cloned());
                }
            }
        }
        global.extend(manual);
        global.extend(general_groups);

        // Exclusion dominance: equal, subdomain or superdomain of any
        // exclusion member is removed.
        let exclusion_index = RelatedSet::new(exclusions);
        let survivors: Vec<String> = global
            .into_iter()
            .filter(|domain| !exclusion_index.covers(domain))
            .collect();

        let final_domains = filter_redundant(survivors);
        self.store.write_lines(paths::DOMAINS, &final_domains)?;

        if let Some(category) = &self.config.exception_category {
            self.write_exception_view(category, &final_domains)?;
        }

        let report = RunReport {
            services: self.config.services.len(),
            groups: self.config.groups.len(),
            exclusions: exclusion_index.len(),
            total_domains: final_domains.len(),
        };
        log::info!(
            "aggregated {} domains from {} services and {} groups ({} exclusion entries)",
            report.total_domains,
            report.services,
            report.groups,
            report.exclusions
        );
        Ok(report)
    }

    /// Per-entity artifact: union with prior on-disk content, redundancy-
    /// filtered. The file only ever grows.
    fn persist_union(&self, name: &str, set: &AHashSet<String>) -> Result<()> {
        let mut union: AHashSet<String> = self.store.read_lines(name)?.into_iter().collect();
        union.extend(set.iter().cloned());
        let lines = filter_redundant(union);
        self.store.write_lines(name, &lines)
    }

    /// Secondary global artifact with the named exception category removed
    /// under the same dominance rule.
    fn write_exception_view(&self, category: &str, final_domains: &[String]) -> Result<()> {
        match self.categories.category_domains(category) {
            Ok(set) => {
                let index = RelatedSet::new(set);
                let trimmed: Vec<String> = final_domains
                    .iter()
                    .filter(|domain| !index.covers(domain))
                    .cloned()
                    .collect();
                self.store
                    .write_lines(&paths::domains_without(category), &trimmed)
            }
            Err(err) => {
                log::warn!("exception category {} unresolved: {}", category, err);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::MemStore;
    use async_trait::async_trait;

    struct StaticFetcher {
        responses: AHashMap<String, String>,
    }

    impl StaticFetcher {
        fn new(pairs: &[(&str, &str)]) -> Self {
            Self {
                responses: pairs
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.to_string()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl SourceFetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            self.responses.get(url).cloned().ok_or(Error::HttpStatus {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    struct NoDataset;

    impl CategoryProvider for NoDataset {
        fn category_domains(&self, _name: &str) -> Result<AHashSet<String>> {
            Err(Error::DatasetUnavailable("not checked out".to_string()))
        }
    }

    struct StaticDataset {
        categories: AHashMap<String, Vec<String>>,
    }

    impl StaticDataset {
        fn new(pairs: &[(&str, &[&str])]) -> Self {
            Self {
                categories: pairs
                    .iter()
                    .map(|(name, domains)| {
                        (
                            name.to_string(),
                            domains.iter().map(|d| d.to_string()).collect(),
                        )
                    })
                    .collect(),
            }
        }
    }

    impl CategoryProvider for StaticDataset {
        fn category_domains(&self, name: &str) -> Result<AHashSet<String>> {
            Ok(self
                .categories
                .get(name)
                .map(|v| v.iter().cloned().collect())
                .unwrap_or_default())
        }
    }

    fn run_engine(config: &Config, fetcher: &StaticFetcher, store: &MemStore) -> RunReport {
        run_engine_with(config, fetcher, &NoDataset, store)
    }

    fn run_engine_with(
        config: &Config,
        fetcher: &StaticFetcher,
        categories: &dyn CategoryProvider,
        store: &MemStore,
    ) -> RunReport {
        let engine = Engine::new(config, fetcher, categories, store);
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(engine.run())
            .unwrap()
    }

    #[test]
    fn test_excluded_service_dominates() {
        // foo (general=false) -> tracker.example.com
        // bar (general=true)  -> tracker.example.com, ok.example.com
        let config = Config::parse_str(
            r#"
services:
  foo: { domains: tracker.example.com, general: false }
  bar:
    domains:
      - tracker.example.com
      - ok.example.com
"#,
        )
        .unwrap();
        let fetcher = StaticFetcher::new(&[]);
        let store = MemStore::new();

        run_engine(&config, &fetcher, &store);

        let global = store.read_lines(paths::DOMAINS).unwrap();
        assert_eq!(global, vec!["ok.example.com"]);
        // the excluded service's own artifact is still persisted
        assert_eq!(
            store.read_lines(&paths::service("foo")).unwrap(),
            vec!["tracker.example.com"]
        );
    }

    #[test]
    fn test_exclusion_covers_sub_and_superdomains() {
        let config = Config::parse_str(
            r#"
services:
  blocked: { domains: ads.example.com, general: false }
  content:
    domains:
      - sub.ads.example.com
      - example.com
      - fine.example.org
"#,
        )
        .unwrap();
        let fetcher = StaticFetcher::new(&[]);
        let store = MemStore::new();

        run_engine(&config, &fetcher, &store);

        // sub.ads.example.com (subdomain) and example.com (superdomain)
        // both fall to the exclusion
        let global = store.read_lines(paths::DOMAINS).unwrap();
        assert_eq!(global, vec!["fine.example.org"]);
    }

    #[test]
    fn test_manual_domains_preserved() {
        let config = Config::parse_str(
            r#"
services:
  auto: { domains: auto.example.com }
"#,
        )
        .unwrap();
        let fetcher = StaticFetcher::new(&[]);
        let store = MemStore::new();
        store.seed(paths::DOMAINS, &["manual.example.net", "auto.example.com"]);

        run_engine(&config, &fetcher, &store);

        let global = store.read_lines(paths::DOMAINS).unwrap();
        assert_eq!(global, vec!["auto.example.com", "manual.example.net"]);
    }

    #[test]
    fn test_service_artifact_unions_with_prior() {
        let config = Config::parse_str(
            r#"
services:
  svc: { domains: new.example.com }
"#,
        )
        .unwrap();
        let fetcher = StaticFetcher::new(&[]);
        let store = MemStore::new();
        store.seed(&paths::service("svc"), &["old.example.com"]);

        run_engine(&config, &fetcher, &store);

        assert_eq!(
            store.read_lines(&paths::service("svc")).unwrap(),
            vec!["new.example.com", "old.example.com"]
        );
    }

    #[test]
    fn test_group_pulls_included_services() {
        let config = Config::parse_str(
            r#"
services:
  Discord: { domains: discord.example.com }
groups:
  gaming:
    domains: game.example.com
    include: [discord]
"#,
        )
        .unwrap();
        let fetcher = StaticFetcher::new(&[]);
        let store = MemStore::new();

        run_engine(&config, &fetcher, &store);

        let group = store.read_lines(&paths::group("gaming")).unwrap();
        assert_eq!(group, vec!["discord.example.com", "game.example.com"]);
        let global = store.read_lines(paths::DOMAINS).unwrap();
        assert!(global.contains(&"game.example.com".to_string()));
    }

    #[test]
    fn test_explicit_false_on_either_side_excludes_pull() {
        let config = Config::parse_str(
            r#"
services:
  quiet: { domains: quiet.example.com, general: false }
  loud: { domains: loud.example.com }
groups:
  mixed:
    domains: direct.example.com
    include: [quiet, loud]
  muted:
    general: false
    domains: muted.example.com
    include: [loud]
"#,
        )
        .unwrap();
        let fetcher = StaticFetcher::new(&[]);
        let store = MemStore::new();

        run_engine(&config, &fetcher, &store);

        // service-side false: quiet not pulled into mixed
        let mixed = store.read_lines(&paths::group("mixed")).unwrap();
        assert_eq!(mixed, vec!["direct.example.com", "loud.example.com"]);

        // group-side false: loud not pulled into muted, muted persisted
        // but excluded from the global set
        let muted = store.read_lines(&paths::group("muted")).unwrap();
        assert_eq!(muted, vec!["muted.example.com"]);
        let global = store.read_lines(paths::DOMAINS).unwrap();
        assert!(!global.contains(&"muted.example.com".to_string()));
        assert!(global.contains(&"loud.example.com".to_string()));
    }

    #[test]
    fn test_unknown_include_is_skipped() {
        let config = Config::parse_str(
            r#"
groups:
  g:
    domains: g.example.com
    include: [ghost]
"#,
        )
        .unwrap();
        let fetcher = StaticFetcher::new(&[]);
        let store = MemStore::new();

        let report = run_engine(&config, &fetcher, &store);
        assert_eq!(report.total_domains, 1);
    }

    #[test]
    fn test_failed_fetch_degrades() {
        let config = Config::parse_str(
            r#"
services:
  flaky:
    url: https://down.example/feed.lst
    domains: stable.example.com
"#,
        )
        .unwrap();
        let fetcher = StaticFetcher::new(&[]);
        let store = MemStore::new();

        run_engine(&config, &fetcher, &store);

        assert_eq!(
            store.read_lines(paths::DOMAINS).unwrap(),
            vec!["stable.example.com"]
        );
    }

    #[test]
    fn test_global_is_redundancy_filtered() {
        let config = Config::parse_str(
            r#"
services:
  a: { domains: [example.com, deep.sub.example.com] }
"#,
        )
        .unwrap();
        let fetcher = StaticFetcher::new(&[]);
        let store = MemStore::new();

        run_engine(&config, &fetcher, &store);

        assert_eq!(
            store.read_lines(paths::DOMAINS).unwrap(),
            vec!["example.com"]
        );
    }

    #[test]
    fn test_exception_category_view() {
        let config = Config::parse_str(
            r#"
exception_category: regional
services:
  a: { domains: [keep.example.com, drop.example.org] }
"#,
        )
        .unwrap();
        let fetcher = StaticFetcher::new(&[]);
        let dataset = StaticDataset::new(&[("regional", &["drop.example.org"])]);
        let store = MemStore::new();

        run_engine_with(&config, &fetcher, &dataset, &store);

        // canonical file keeps everything
        let global = store.read_lines(paths::DOMAINS).unwrap();
        assert_eq!(global, vec!["drop.example.org", "keep.example.com"]);
        // the exception view drops the category
        let view = store
            .read_lines(&paths::domains_without("regional"))
            .unwrap();
        assert_eq!(view, vec!["keep.example.com"]);
    }

    #[test]
    fn test_remote_lines_are_normalized() {
        let config = Config::parse_str(
            r#"
services:
  remote:
    url: https://lists.example/raw.lst
"#,
        )
        .unwrap();
        let fetcher = StaticFetcher::new(&[(
            "https://lists.example/raw.lst",
            "# header\nfull:WWW.Example.COM\nregexp:^(a|b)\\.cdn\\.net$\n*.broken\n",
        )]);
        let store = MemStore::new();

        run_engine(&config, &fetcher, &store);

        let global = store.read_lines(paths::DOMAINS).unwrap();
        assert_eq!(global, vec!["a.cdn.net", "b.cdn.net", "example.com"]);
    }
}
