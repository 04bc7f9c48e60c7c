//! CIDR parsing and collapsing.
//!
//! Feed lines are parsed per address family (sniffed by `.` vs `:`) and
//! collapsed into the minimal covering set of non-overlapping blocks via
//! [`ipnet`]'s aggregation. Invalid entries are dropped with a warning,
//! never fatally.

use ipnet::{Ipv4Net, Ipv6Net};
use std::net::{Ipv4Addr, Ipv6Addr};

/// Parse and collapse a list of network strings, family-segregated.
///
/// Bare addresses are treated as host routes (`/32`, `/128`); entries with
/// host bits set are truncated to their canonical network address. The
/// result is sorted per family, order-independent and idempotent.
pub fn merge<I, S>(networks: I) -> (Vec<Ipv4Net>, Vec<Ipv6Net>)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut v4 = Vec::new();
    let mut v6 = Vec::new();

    for raw in networks {
        let entry = raw.as_ref().trim();
        if entry.is_empty() {
            continue;
        }
        if entry.contains('.') {
            match parse_v4(entry) {
                Some(net) => v4.push(canonical_v4(entry, net)),
                None => log::warn!("invalid network skipped: {}", entry),
            }
        } else if entry.contains(':') {
            match parse_v6(entry) {
                Some(net) => v6.push(canonical_v6(entry, net)),
                None => log::warn!("invalid network skipped: {}", entry),
            }
        } else {
            log::warn!("invalid network skipped: {}", entry);
        }
    }

    let mut v4 = Ipv4Net::aggregate(&v4);
    v4.sort();
    let mut v6 = Ipv6Net::aggregate(&v6);
    v6.sort();
    (v4, v6)
}

/// Render merged blocks as sorted CIDR strings.
pub fn to_strings(v4: &[Ipv4Net], v6: &[Ipv6Net]) -> (Vec<String>, Vec<String>) {
    (
        v4.iter().map(|n| n.to_string()).collect(),
        v6.iter().map(|n| n.to_string()).collect(),
    )
}

fn parse_v4(entry: &str) -> Option<Ipv4Net> {
    if let Ok(net) = entry.parse::<Ipv4Net>() {
        return Some(net);
    }
    let addr = entry.parse::<Ipv4Addr>().ok()?;
    Ipv4Net::new(addr, 32).ok()
}

fn parse_v6(entry: &str) -> Option<Ipv6Net> {
    if let Ok(net) = entry.parse::<Ipv6Net>() {
        return Some(net);
    }
    let addr = entry.parse::<Ipv6Addr>().ok()?;
    Ipv6Net::new(addr, 128).ok()
}

fn canonical_v4(entry: &str, net: Ipv4Net) -> Ipv4Net {
    let trunc = net.trunc();
    if trunc != net {
        log::debug!("truncated host bits: {} -> {}", entry, trunc);
    }
    trunc
}

fn canonical_v6(entry: &str, net: Ipv6Net) -> Ipv6Net {
    let trunc = net.trunc();
    if trunc != net {
        log::debug!("truncated host bits: {} -> {}", entry, trunc);
    }
    trunc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v4_strings(input: &[&str]) -> Vec<String> {
        let (v4, _) = merge(input);
        v4.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_adjacent_blocks_collapse() {
        assert_eq!(
            v4_strings(&["10.0.0.0/24", "10.0.1.0/24"]),
            vec!["10.0.0.0/23"]
        );
    }

    #[test]
    fn test_contained_block_absorbed() {
        assert_eq!(
            v4_strings(&["10.0.0.0/8", "10.1.2.0/24"]),
            vec!["10.0.0.0/8"]
        );
    }

    #[test]
    fn test_disjoint_blocks_kept() {
        assert_eq!(
            v4_strings(&["10.0.0.0/24", "192.168.0.0/24"]),
            vec!["10.0.0.0/24", "192.168.0.0/24"]
        );
    }

    #[test]
    fn test_order_independent() {
        let a = merge(["10.0.1.0/24", "10.0.0.0/24", "172.16.0.0/16"]);
        let b = merge(["172.16.0.0/16", "10.0.0.0/24", "10.0.1.0/24"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_idempotent() {
        let (v4, v6) = merge(["10.0.0.0/24", "10.0.1.0/24", "fd00::/9", "fd80::/9"]);
        let (s4, s6) = to_strings(&v4, &v6);
        let again = merge(s4.iter().chain(s6.iter()));
        assert_eq!(again, (v4, v6));
    }

    #[test]
    fn test_bare_address_is_host_route() {
        assert_eq!(v4_strings(&["203.0.113.7"]), vec!["203.0.113.7/32"]);
        let (_, v6) = merge(["2001:db8::1"]);
        assert_eq!(v6[0].to_string(), "2001:db8::1/128");
    }

    #[test]
    fn test_host_bits_truncated() {
        assert_eq!(v4_strings(&["10.0.0.1/24"]), vec!["10.0.0.0/24"]);
    }

    #[test]
    fn test_invalid_entries_dropped() {
        let (v4, v6) = merge(["not-a-net", "10.0.0.0/33", "300.1.1.1/8", "", "  "]);
        assert!(v4.is_empty());
        assert!(v6.is_empty());
    }

    #[test]
    fn test_families_segregated() {
        let (v4, v6) = merge(["10.0.0.0/24", "fd00::/8"]);
        assert_eq!(v4.len(), 1);
        assert_eq!(v6.len(), 1);
    }

    #[test]
    fn test_v6_collapse() {
        let (_, v6) = merge(["2001:db8::/33", "2001:db8:8000::/33"]);
        assert_eq!(v6[0].to_string(), "2001:db8::/32");
        assert_eq!(v6.len(), 1);
    }

    #[test]
    fn test_address_space_equivalence() {
        // every input address must still be covered after the merge
        let inputs = ["10.0.0.0/24", "10.0.1.0/24", "10.0.3.0/24"];
        let (v4, _) = merge(inputs);
        for net_str in inputs {
            let net: Ipv4Net = net_str.parse().unwrap();
            for host in [net.network(), net.broadcast()] {
                assert!(v4.iter().any(|m| m.contains(&host)));
            }
        }
        // and nothing outside the inputs leaks in
        let outside: std::net::Ipv4Addr = "10.0.2.0".parse().unwrap();
        assert!(!v4.iter().any(|m| m.contains(&outside)));
    }
}
