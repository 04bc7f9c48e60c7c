//! CIDR feed processing: per-service collapse plus summary artifacts.
//!
//! Every configured subnet feed is resolved (all sources of all feeds
//! concurrently), collapsed per address family, and written to its own
//! pair of artifacts. Three feed kinds exist: plain URLs, `{cidr}`
//! templated URLs fetched once per family, and ASN feeds filtered out of
//! a shared BGP table dump. The summary artifacts are then rebuilt from
//! the configured member list, re-merged so adjacent blocks from
//! different feeds still collapse.

use ahash::AHashMap;
use futures::future::join_all;

use crate::cidr;
use crate::config::{Config, SubnetConfig};
use crate::error::Result;
use crate::fetch::{fetch_or_empty, SourceFetcher};
use crate::store::{paths, ArtifactStore};

/// Origin ASN to announced prefixes, parsed from the BGP table dump.
type BgpTable = AHashMap<u32, Vec<String>>;

/// Raw lines a feed yielded, plus whether any of its sources failed.
struct FeedOutcome {
    lines: Vec<String>,
    partial: bool,
}

pub struct SubnetEngine<'a> {
    config: &'a Config,
    fetcher: &'a dyn SourceFetcher,
    store: &'a dyn ArtifactStore,
}

impl<'a> SubnetEngine<'a> {
    pub fn new(
        config: &'a Config,
        fetcher: &'a dyn SourceFetcher,
        store: &'a dyn ArtifactStore,
    ) -> Self {
        Self {
            config,
            fetcher,
            store,
        }
    }

    pub async fn run(&self) -> Result<()> {
        let bgp_table = self.fetch_bgp_table().await;

        let outcomes = join_all(
            self.config
                .subnets
                .values()
                .map(|feed| self.resolve_feed(feed, bgp_table.as_ref())),
        )
        .await;

        for ((name, _), outcome) in self.config.subnets.iter().zip(outcomes) {
            if outcome.lines.is_empty() {
                // dead feed: keep whatever the previous run wrote
                log::warn!("subnet feed {} yielded nothing, keeping prior artifacts", name);
                continue;
            }
            let (v4, v6) = cidr::merge(&outcome.lines);
            let (v4_lines, v6_lines) = cidr::to_strings(&v4, &v6);

            // a feed that lost one of its sources must not erase the
            // family that source used to provide
            if v4_lines.is_empty() && outcome.partial {
                log::warn!("subnet feed {}: no IPv4 data this run, keeping prior artifact", name);
            } else {
                self.store.write_lines(&paths::cidr4(name), &v4_lines)?;
            }
            if v6_lines.is_empty() && outcome.partial {
                log::warn!("subnet feed {}: no IPv6 data this run, keeping prior artifact", name);
            } else {
                self.store.write_lines(&paths::cidr6(name), &v6_lines)?;
            }
        }

        self.write_summaries()
    }

    /// Download and parse the BGP table dump if any ASN feed needs it.
    async fn fetch_bgp_table(&self) -> Option<BgpTable> {
        let needed = self
            .config
            .subnets
            .values()
            .any(|feed| matches!(feed, SubnetConfig::Asn(_)));
        if !needed {
            return None;
        }
        // presence of bgp_url is validated at config load
        let url = self.config.bgp_url.as_deref()?;
        let text = fetch_or_empty(self.fetcher, url).await?;
        Some(parse_bgp_table(&text))
    }

    async fn resolve_feed(
        &self,
        feed: &SubnetConfig,
        bgp_table: Option<&BgpTable>,
    ) -> FeedOutcome {
        match feed {
            SubnetConfig::Url(plain) => self.fetch_all(&plain.url.to_vec()).await,
            SubnetConfig::Template(templated) => {
                let urls: Vec<String> = ["cidr4", "cidr6"]
                    .iter()
                    .map(|family| templated.url_template.replace("{cidr}", family))
                    .collect();
                self.fetch_all(&urls).await
            }
            SubnetConfig::Asn(asn_feed) => match bgp_table {
                Some(table) => FeedOutcome {
                    lines: asn_feed
                        .asn
                        .to_vec()
                        .iter()
                        .flat_map(|asn| table.get(asn).cloned().unwrap_or_default())
                        .collect(),
                    partial: false,
                },
                // dump unavailable: treat like a feed whose sources all died
                None => FeedOutcome {
                    lines: Vec::new(),
                    partial: true,
                },
            },
        }
    }

    async fn fetch_all(&self, urls: &[String]) -> FeedOutcome {
        let bodies = join_all(urls.iter().map(|url| fetch_or_empty(self.fetcher, url))).await;
        let partial = bodies.iter().any(Option::is_none);
        let lines = bodies
            .into_iter()
            .flatten()
            .flat_map(|text| text.lines().map(str::to_string).collect::<Vec<_>>())
            .collect();
        FeedOutcome { lines, partial }
    }

    /// Rebuild the three summary artifacts from the configured members.
    fn write_summaries(&self) -> Result<()> {
        let mut all: Vec<String> = Vec::new();
        for name in &self.config.summary {
            all.extend(self.store.read_lines(&paths::cidr4(name))?);
            all.extend(self.store.read_lines(&paths::cidr6(name))?);
        }

        let (v4, v6) = cidr::merge(&all);
        let (v4_lines, v6_lines) = cidr::to_strings(&v4, &v6);
        self.store.write_lines(paths::SUMMARY_V4, &v4_lines)?;
        self.store.write_lines(paths::SUMMARY_V6, &v6_lines)?;

        let mut combined: Vec<String> = v4_lines.into_iter().chain(v6_lines).collect();
        combined.sort();
        self.store.write_lines(paths::SUMMARY_ALL, &combined)?;

        log::info!(
            "subnet summary: {} IPv4 and {} IPv6 blocks from {} feeds",
            v4.len(),
            v6.len(),
            self.config.summary.len()
        );
        Ok(())
    }
}

/// Parse a `<prefix> ... <origin-asn>` table dump into a per-ASN index.
fn parse_bgp_table(text: &str) -> BgpTable {
    let mut table = BgpTable::default();
    for line in text.lines() {
        let mut parts = line.split_whitespace();
        let Some(prefix) = parts.next() else { continue };
        let Some(asn) = parts.last() else { continue };
        if let Ok(asn) = asn.parse::<u32>() {
            table.entry(asn).or_default().push(prefix.to_string());
        }
    }
    table
}
