//! Redundant-domain removal and domain coverage checks.

use ahash::AHashSet;

/// Remove every domain already covered by a shorter kept parent suffix and
/// return the survivors sorted ascending.
///
/// Domains are considered in ascending label-count order so the most
/// general entry always wins; the result is deterministic and idempotent.
pub fn filter_redundant<I>(domains: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut input: Vec<String> = domains
        .into_iter()
        .collect::<AHashSet<_>>()
        .into_iter()
        .collect();
    input.sort_by(|a, b| {
        let depth_a = a.matches('.').count();
        let depth_b = b.matches('.').count();
        depth_a.cmp(&depth_b).then_with(|| a.cmp(b))
    });

    let mut kept: AHashSet<String> = AHashSet::with_capacity(input.len());
    let mut out = Vec::with_capacity(input.len());
    'candidates: for domain in input {
        for suffix in label_suffixes(&domain) {
            if kept.contains(suffix) {
                continue 'candidates;
            }
        }
        kept.insert(domain.clone());
        out.push(domain);
    }

    out.sort();
    out
}

/// Proper label-boundary suffixes of a domain: `a.b.c` -> `b.c`, `c`.
pub fn label_suffixes(domain: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = domain;
    while let Some(pos) = rest.find('.') {
        rest = &rest[pos + 1..];
        out.push(rest);
    }
    out
}

/// Domain set with membership extended to subdomain and superdomain
/// relations.
///
/// `covers(d)` is true when `d` equals a member, is a subdomain of a
/// member, or is a superdomain of a member.
pub struct RelatedSet {
    members: AHashSet<String>,
    /// every proper label suffix of every member
    member_suffixes: AHashSet<String>,
}

impl RelatedSet {
    pub fn new<I>(members: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let members: AHashSet<String> = members.into_iter().collect();
        let member_suffixes = members
            .iter()
            .flat_map(|m| label_suffixes(m).into_iter().map(str::to_string))
            .collect();
        Self {
            members,
            member_suffixes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn covers(&self, domain: &str) -> bool {
        if self.members.contains(domain) || self.member_suffixes.contains(domain) {
            return true;
        }
        label_suffixes(domain)
            .iter()
            .any(|suffix| self.members.contains(*suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parent_wins() {
        let out = filter_redundant(strings(&[
            "example.com",
            "a.example.com",
            "b.a.example.com",
        ]));
        assert_eq!(out, vec!["example.com"]);
    }

    #[test]
    fn test_unrelated_kept() {
        let out = filter_redundant(strings(&["a.com", "b.com", "sub.c.org"]));
        assert_eq!(out, vec!["a.com", "b.com", "sub.c.org"]);
    }

    #[test]
    fn test_not_a_label_boundary() {
        // notexample.com is not a subdomain of example.com
        let out = filter_redundant(strings(&["example.com", "notexample.com"]));
        assert_eq!(out, vec!["example.com", "notexample.com"]);
    }

    #[test]
    fn test_idempotent() {
        let input = strings(&[
            "example.com",
            "a.example.com",
            "x.y.z.org",
            "y.z.org",
            "other.net",
        ]);
        let once = filter_redundant(input);
        let twice = filter_redundant(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_suffix_invariant() {
        let out = filter_redundant(strings(&[
            "a.b.c.example.com",
            "b.c.example.com",
            "c.example.com",
            "foo.org",
            "bar.foo.org",
            "unrelated.net",
        ]));
        for a in &out {
            for b in &out {
                if a != b {
                    assert!(
                        !a.ends_with(&format!(".{b}")),
                        "{a} is redundant under {b}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_sorted_output() {
        let out = filter_redundant(strings(&["z.example", "a.example", "m.example"]));
        let mut sorted = out.clone();
        sorted.sort();
        assert_eq!(out, sorted);
    }

    #[test]
    fn test_duplicates_collapse() {
        let out = filter_redundant(strings(&["dup.com", "dup.com"]));
        assert_eq!(out, vec!["dup.com"]);
    }

    #[test]
    fn test_label_suffixes() {
        assert_eq!(label_suffixes("a.b.c"), vec!["b.c", "c"]);
        assert_eq!(label_suffixes("c"), Vec::<&str>::new());
    }

    #[test]
    fn test_related_set_covers() {
        let related = RelatedSet::new(strings(&["tracker.example.com"]));
        // equal
        assert!(related.covers("tracker.example.com"));
        // subdomain of a member
        assert!(related.covers("a.tracker.example.com"));
        // superdomain of a member
        assert!(related.covers("example.com"));
        assert!(related.covers("com"));
        // unrelated
        assert!(!related.covers("ok.example.net"));
        assert!(!related.covers("other.example.com"));
    }
}
