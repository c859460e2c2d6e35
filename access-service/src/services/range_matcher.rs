//! Address and CIDR range matching for allow-list entries.
//!
//! Patterns are either a literal address or `network/prefix`. Malformed
//! patterns never match; they never fail the caller either.

use ipnet::IpNet;
use std::net::IpAddr;

/// True when `candidate` equals `pattern` or falls inside the CIDR range it names.
///
/// A pattern without `/` only ever matches the identical string. Addresses and
/// networks of different families never match; IPv4-mapped IPv6 candidates
/// are expected to be normalized by the caller.
pub fn matches(candidate: &str, pattern: &str) -> bool {
    let candidate = candidate.trim();
    let pattern = pattern.trim();
    if candidate == pattern {
        return true;
    }
    if !pattern.contains('/') {
        return false;
    }

    let Ok(address) = candidate.parse::<IpAddr>() else {
        return false;
    };
    pattern
        .parse::<IpNet>()
        .is_ok_and(|network| network.contains(&address))
}

/// True when `address` matches any of `patterns`.
pub fn matches_any<'a, I>(address: &str, patterns: I) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    patterns.into_iter().any(|pattern| matches(address, pattern))
}
