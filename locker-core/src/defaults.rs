//! Retailer return/warranty policies used to prefill new purchases.
//!
//! Matching is deterministic: exact (case-insensitive) name first, then a
//! partial match in either direction ("Amazon Fresh" -> amazon).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorePolicy {
    pub return_days: u32,
    pub warranty_months: u32,
}

const fn policy(return_days: u32, warranty_months: u32) -> StorePolicy {
    StorePolicy {
        return_days,
        warranty_months,
    }
}

/// Used when the store is unknown.
pub const UNIVERSAL_DEFAULTS: StorePolicy = policy(30, 12);

/// Known US retailer policies. Order matters for partial matches.
pub const STORE_DEFAULTS: &[(&str, StorePolicy)] = &[
    // Extended returns
    ("costco", policy(90, 24)),
    ("rei", policy(90, 12)),
    ("nordstrom", policy(90, 12)),
    ("ll bean", policy(90, 12)),
    ("zappos", policy(90, 12)),
    // Standard
    ("amazon", policy(30, 12)),
    ("target", policy(30, 12)),
    ("walmart", policy(30, 12)),
    ("home depot", policy(30, 12)),
    ("lowes", policy(30, 12)),
    ("ikea", policy(30, 12)),
    // Short
    ("best buy", policy(15, 12)),
    ("apple", policy(14, 12)),
    ("microcenter", policy(15, 12)),
    // Electronics
    ("b&h", policy(30, 12)),
    ("newegg", policy(30, 12)),
];

/// Look up a store's policy. Blank names never match.
pub fn store_defaults(store_name: &str) -> Option<StorePolicy> {
    let normalized = store_name.trim().to_lowercase();
    if normalized.is_empty() {
        return None;
    }

    if let Some((_, p)) = STORE_DEFAULTS.iter().find(|(k, _)| *k == normalized) {
        return Some(*p);
    }

    STORE_DEFAULTS
        .iter()
        .find(|(k, _)| normalized.contains(k) || k.contains(normalized.as_str()))
        .map(|(_, p)| *p)
}

/// Store policy if known, otherwise the universal defaults.
pub fn policy_for(store_name: Option<&str>) -> StorePolicy {
    store_name
        .and_then(store_defaults)
        .unwrap_or(UNIVERSAL_DEFAULTS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert_eq!(store_defaults("Costco"), Some(policy(90, 24)));
        assert_eq!(store_defaults("  best buy "), Some(policy(15, 12)));
    }

    #[test]
    fn test_partial_match() {
        assert_eq!(store_defaults("Amazon Fresh"), Some(policy(30, 12)));
        assert_eq!(store_defaults("Apple Store Fifth Ave"), Some(policy(14, 12)));
    }

    #[test]
    fn test_unknown_and_blank() {
        assert_eq!(store_defaults("Corner Hardware"), None);
        assert_eq!(store_defaults("   "), None);
        assert_eq!(policy_for(None), UNIVERSAL_DEFAULTS);
        assert_eq!(policy_for(Some("Corner Hardware")), UNIVERSAL_DEFAULTS);
    }
}
