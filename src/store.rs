//! Artifact sinks: flat list files, one entry per line.
//!
//! All artifacts are UTF-8 text, sorted, `\n`-terminated. The engines only
//! talk to the [`ArtifactStore`] trait; the filesystem implementation is
//! used by the CLI and an in-memory one backs the tests.

use ahash::AHashMap;
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;

use crate::error::Result;

/// Well-known artifact names, relative to the store root.
pub mod paths {
    /// Canonical global domain list, rewritten from scratch each run.
    pub const DOMAINS: &str = "domains.lst";
    /// Collapsed IPv4 summary.
    pub const SUMMARY_V4: &str = "summary-cidr4.lst";
    /// Collapsed IPv6 summary.
    pub const SUMMARY_V6: &str = "summary-cidr6.lst";
    /// Combined CIDR summary, both families.
    pub const SUMMARY_ALL: &str = "summary-cidrs.lst";

    pub fn service(name: &str) -> String {
        format!("services/{}.lst", name.to_ascii_lowercase())
    }

    pub fn group(name: &str) -> String {
        format!("groups/{}.lst", name.to_ascii_lowercase())
    }

    pub fn cidr4(name: &str) -> String {
        format!("cidr4/{}.lst", name.to_ascii_lowercase())
    }

    pub fn cidr6(name: &str) -> String {
        format!("cidr6/{}.lst", name.to_ascii_lowercase())
    }

    /// Global list with the named exception category additionally removed.
    pub fn domains_without(category: &str) -> String {
        format!("domains-no-{}.lst", category.to_ascii_lowercase())
    }
}

/// Abstract artifact sink.
pub trait ArtifactStore {
    /// Read an artifact's lines; an absent artifact reads as empty.
    fn read_lines(&self, name: &str) -> Result<Vec<String>>;

    /// Write an artifact, replacing any previous content.
    fn write_lines(&self, name: &str, lines: &[String]) -> Result<()>;
}

/// Filesystem-backed store rooted at an output directory.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl ArtifactStore for FsStore {
    fn read_lines(&self, name: &str) -> Result<Vec<String>> {
        let path = self.path(name);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(path)?;
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn write_lines(&self, name: &str, lines: &[String]) -> Result<()> {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut text = lines.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        fs::write(path, text)?;
        Ok(())
    }
}

/// In-memory store for tests and dry runs. Single-threaded, like the run
/// itself.
#[derive(Default)]
pub struct MemStore {
    entries: RefCell<AHashMap<String, Vec<String>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed an artifact, as if left over from a previous run.
    pub fn seed(&self, name: &str, lines: &[&str]) {
        self.entries.borrow_mut().insert(
            name.to_string(),
            lines.iter().map(|l| l.to_string()).collect(),
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.borrow().contains_key(name)
    }
}

impl ArtifactStore for MemStore {
    fn read_lines(&self, name: &str) -> Result<Vec<String>> {
        Ok(self
            .entries
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or_default())
    }

    fn write_lines(&self, name: &str, lines: &[String]) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(name.to_string(), lines.to_vec());
        Ok(())
    }
}
