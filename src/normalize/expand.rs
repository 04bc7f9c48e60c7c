//! Bounded expansion of a restricted regex dialect into literal domains.
//!
//! Supports single-level alternation groups `(a|b)`, the quantifiers `?`,
//! `*`, `+` and `{n}` on the preceding character or group, and the anchors
//! `^`/`$` (stripped). Unbounded repetition is capped: `*` expands to 0, 1
//! or 2 repetitions and `+` to 1 or 2. This is a deliberate over-
//! approximation inherited from the list format, not a regex engine; any
//! construct outside the dialect makes the expansion fail closed and the
//! line contributes nothing.

use ahash::AHashSet;

/// Hard cap on the number of in-flight variants.
const VARIANT_CAP: usize = 512;

/// Hard cap on `{n}` repetition counts.
const REPEAT_CAP: usize = 16;

/// Expand a restricted regex pattern into literal domain variants.
///
/// Output is deduplicated and sorted; every entry contains a dot and
/// matches `[a-z0-9.-]+`. Returns an empty vec when the pattern falls
/// outside the dialect.
pub fn expand(pattern: &str) -> Vec<String> {
    let variants = match try_expand(&pattern.to_ascii_lowercase()) {
        Some(v) => v,
        None => return Vec::new(),
    };

    let mut out: Vec<String> = variants
        .into_iter()
        .map(|v| {
            v.chars()
                .filter(|c| !matches!(c, '(' | ')' | '|'))
                .collect::<String>()
        })
        .filter(|v| is_domain_shaped(v))
        .collect::<AHashSet<_>>()
        .into_iter()
        .collect();
    out.sort();
    out
}

fn is_domain_shaped(s: &str) -> bool {
    !s.is_empty()
        && s.contains('.')
        && s.bytes()
            .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'.' | b'-'))
}

#[derive(Debug, Clone, Copy)]
enum Quant {
    /// `?`: with and without
    Opt,
    /// `*`: 0, 1 or 2 repetitions
    Star,
    /// `+`: 1 or 2 repetitions
    Plus,
    /// `{n}`: exactly n repetitions
    Exact(usize),
}

fn try_expand(pattern: &str) -> Option<Vec<String>> {
    let pattern = pattern.trim();
    let pattern = pattern.strip_prefix('^').unwrap_or(pattern);
    let pattern = pattern.strip_suffix('$').unwrap_or(pattern);

    let chars = unescape(pattern);
    let mut variants = vec![String::new()];

    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '(' => {
                let close = find_group_end(&chars, i)?;
                let inner: String = chars[i + 1..close].iter().collect();
                let alts: Vec<&str> = inner.split('|').collect();
                let (quant, consumed) = read_quant(&chars, close + 1)?;
                variants = apply_alternation(variants, &alts, quant)?;
                i = close + 1 + consumed;
            }
            // a close paren or top-level pipe outside a group: treat the
            // remainder of the run as a fresh alternative, like the list
            // format's flattened groups
            '|' => {
                let run: String = chars[i + 1..]
                    .iter()
                    .take_while(|c| !matches!(c, '(' | ')' | '|' | '?' | '*' | '+' | '{'))
                    .collect();
                i += 1 + run.chars().count();
                variants.push(run);
                if variants.len() > VARIANT_CAP {
                    return None;
                }
            }
            ')' => return None,
            c => {
                let (quant, consumed) = read_quant(&chars, i + 1)?;
                let mut unit = String::new();
                unit.push(c);
                variants = apply_unit(variants, &unit, quant)?;
                i += 1 + consumed;
            }
        }
    }

    Some(variants)
}

/// Drop escape backslashes before punctuation; keep them before
/// alphanumerics (character classes like `\d` are outside the dialect and
/// must survive to be rejected by the final filter).
fn unescape(pattern: &str) -> Vec<char> {
    let mut out = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(next) if next.is_ascii_alphanumeric() => {
                out.push('\\');
                out.push(next);
            }
            Some(next) => out.push(next),
            None => out.push('\\'),
        }
    }
    out
}

/// Index of the `)` closing the group opened at `open`. Nested groups are
/// outside the dialect.
fn find_group_end(chars: &[char], open: usize) -> Option<usize> {
    for (off, c) in chars[open + 1..].iter().enumerate() {
        match c {
            '(' => return None,
            ')' => return Some(open + 1 + off),
            _ => {}
        }
    }
    None
}

/// Read an optional quantifier at `i`. Returns the quantifier and the
/// number of characters consumed.
fn read_quant(chars: &[char], i: usize) -> Option<(Option<Quant>, usize)> {
    match chars.get(i) {
        Some('?') => Some((Some(Quant::Opt), 1)),
        Some('*') => Some((Some(Quant::Star), 1)),
        Some('+') => Some((Some(Quant::Plus), 1)),
        Some('{') => {
            let close = chars[i..].iter().position(|c| *c == '}')? + i;
            let digits: String = chars[i + 1..close].iter().collect();
            let n: usize = digits.parse().ok()?;
            if n > REPEAT_CAP {
                return None;
            }
            Some((Some(Quant::Exact(n)), close - i + 1))
        }
        _ => Some((None, 0)),
    }
}

fn apply_unit(variants: Vec<String>, unit: &str, quant: Option<Quant>) -> Option<Vec<String>> {
    let mut next = Vec::with_capacity(variants.len() * 3);
    match quant {
        None => {
            for mut v in variants {
                v.push_str(unit);
                next.push(v);
            }
        }
        Some(Quant::Opt) => {
            for v in variants {
                next.push(format!("{v}{unit}"));
                next.push(v);
            }
        }
        Some(Quant::Star) => {
            for v in variants {
                next.push(format!("{v}{unit}{unit}"));
                next.push(format!("{v}{unit}"));
                next.push(v);
            }
        }
        Some(Quant::Plus) => {
            for v in variants {
                next.push(format!("{v}{unit}"));
                next.push(format!("{v}{unit}{unit}"));
            }
        }
        Some(Quant::Exact(n)) => {
            for v in variants {
                next.push(format!("{v}{}", unit.repeat(n)));
            }
        }
    }
    if next.len() > VARIANT_CAP {
        return None;
    }
    Some(next)
}

fn apply_alternation(
    variants: Vec<String>,
    alts: &[&str],
    quant: Option<Quant>,
) -> Option<Vec<String>> {
    let mut next = Vec::with_capacity(variants.len() * (alts.len() + 1));
    match quant {
        None => {
            for v in &variants {
                for alt in alts {
                    next.push(format!("{v}{alt}"));
                }
            }
        }
        Some(Quant::Opt) => {
            for v in &variants {
                for alt in alts {
                    next.push(format!("{v}{alt}"));
                }
                next.push(v.clone());
            }
        }
        Some(Quant::Star) => {
            for v in &variants {
                for alt in alts {
                    next.push(format!("{v}{alt}{alt}"));
                    next.push(format!("{v}{alt}"));
                }
                next.push(v.clone());
            }
        }
        Some(Quant::Plus) => {
            for v in &variants {
                for alt in alts {
                    next.push(format!("{v}{alt}"));
                    next.push(format!("{v}{alt}{alt}"));
                }
            }
        }
        Some(Quant::Exact(n)) => {
            for v in &variants {
                for alt in alts {
                    next.push(format!("{v}{}", alt.repeat(n)));
                }
            }
        }
    }
    if next.len() > VARIANT_CAP {
        return None;
    }
    Some(next)
}
