//! Pattern normalization: one raw list line to canonical domains.
//!
//! Input lines come from heterogeneous sources (hosts files, adblock-ish
//! lists, v2fly data files, hand-maintained YAML) and carry comment noise,
//! scheme prefixes and list markers. `normalize` strips all of that and
//! emits zero, one, or many lowercase dot-separated domains. Lines carrying
//! a `regexp:` prefix are routed through the bounded expander instead.

mod expand;

pub use expand::expand;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::PatternError;

static KNOWN_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(full:|domain:|keyword:)").unwrap());
static SCHEME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(https?:)?//").unwrap());
static WWW: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^www\d?\.").unwrap());
static PATH_OR_PORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[/:].*$").unwrap());
static METACHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\\^$*+?()\[\]{}|]").unwrap());

/// Turn one raw input line into canonical domain strings.
///
/// Returns an empty vec for blank lines, comments, and anything that does
/// not clean up into a valid host. Never fails: malformed lines are dropped
/// individually, not the whole source.
pub fn normalize(line: &str) -> Vec<String> {
    let line = strip_comment(line).trim();
    if line.is_empty() {
        return Vec::new();
    }
    let line = line.strip_prefix("- ").unwrap_or(line).trim();

    if let Some(pattern) = line.strip_prefix("regexp:") {
        return expand(pattern.trim());
    }

    match clean_literal(line) {
        Ok(domain) => vec![domain],
        Err(err) => {
            log::debug!("dropped line {:?}: {}", line, err);
            Vec::new()
        }
    }
}

/// Strip an inline comment.
///
/// `#` and `;` introduce a comment anywhere; `//` and `--` only after
/// whitespace (or, for `--`, at the start of the line), so URL schemes and
/// hyphenated labels survive.
fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut cut = line.len();

    if let Some(idx) = line.find(['#', ';']) {
        cut = idx;
    }

    for marker in ["//", "--"] {
        let mut from = 0;
        while let Some(off) = line[from..].find(marker) {
            let idx = from + off;
            let after_ws = idx > 0 && bytes[idx - 1].is_ascii_whitespace();
            let applies = match marker {
                "--" => idx == 0 || after_ws,
                _ => after_ws,
            };
            if applies {
                cut = cut.min(idx);
                break;
            }
            from = idx + 1;
        }
    }

    &line[..cut]
}

fn clean_literal(line: &str) -> Result<String, PatternError> {
    let line = KNOWN_PREFIX.replace(line, "");
    let line = line.split('@').next().unwrap_or_default().trim();
    let line = SCHEME.replace(line, "");
    let line = WWW.replace(&line, "");
    let line = PATH_OR_PORT.replace(&line, "");
    let line = line.trim();

    if line.is_empty() {
        return Err(PatternError::Empty);
    }
    if METACHARS.is_match(line) {
        return Err(PatternError::UnsupportedSyntax(line.to_string()));
    }

    let host = line.split(':').next().unwrap_or("");
    if host.is_empty() || !host.contains('.') {
        return Err(PatternError::NotADomain(line.to_string()));
    }

    Ok(host.to_ascii_lowercase())
}
