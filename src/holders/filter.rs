//! Exclusion rules for holders that must not receive a share.

/// Label/address fragments that mark pools, routers and burn addresses.
pub const DEFAULT_SKIP_PATTERNS: &[&str] = &["pancake", "router", "lp", "liquidity", "burn", "dead"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolderFilter {
    token_address: String,
    skip_addresses: Vec<String>,
    skip_patterns: Vec<String>,
}

impl HolderFilter {
    pub fn new(token_address: &str, skip_addresses: &[String], skip_patterns: &[String]) -> Self {
        Self {
            token_address: token_address.trim().to_lowercase(),
            skip_addresses: skip_addresses
                .iter()
                .map(|a| a.trim().to_lowercase())
                .filter(|a| !a.is_empty())
                .collect(),
            skip_patterns: skip_patterns
                .iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Contracts, the token itself, configured addresses and pattern matches are skipped.
    pub fn should_skip(&self, address: &str, label: Option<&str>, is_contract: bool) -> bool {
        if is_contract {
            return true;
        }
        let address = address.to_lowercase();
        let label = label.unwrap_or_default().to_lowercase();

        if address == self.token_address {
            return true;
        }
        if self.skip_addresses.iter().any(|a| *a == address) {
            return true;
        }
        self.skip_patterns
            .iter()
            .any(|p| label.contains(p.as_str()) || address.contains(p.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "0x1111111111111111111111111111111111111111";

    fn filter() -> HolderFilter {
        let patterns: Vec<String> = DEFAULT_SKIP_PATTERNS.iter().map(|s| s.to_string()).collect();
        HolderFilter::new(
            TOKEN,
            &["0x2222222222222222222222222222222222222222".to_string(), " ".to_string()],
            &patterns,
        )
    }

    #[test]
    fn test_regular_holder_kept() {
        assert!(!filter().should_skip("0x3333333333333333333333333333333333333333", None, false));
        assert!(!filter().should_skip(
            "0x3333333333333333333333333333333333333333",
            Some("Binance Hot Wallet"),
            false
        ));
    }

    #[test]
    fn test_contracts_and_token_skipped() {
        let f = filter();
        assert!(f.should_skip("0x3333333333333333333333333333333333333333", None, true));
        assert!(f.should_skip(&TOKEN.to_uppercase().replace("0X", "0x"), None, false));
        assert!(f.should_skip("0x2222222222222222222222222222222222222222", None, false));
    }

    #[test]
    fn test_patterns_match_label_and_address() {
        let f = filter();
        assert!(f.should_skip(
            "0x4444444444444444444444444444444444444444",
            Some("PancakeSwap V2: Pair"),
            false
        ));
        assert!(f.should_skip("0x000000000000000000000000000000000000dEaD", None, false));
        assert!(f.should_skip(
            "0x4444444444444444444444444444444444444444",
            Some("Liquidity Locker"),
            false
        ));
    }
}
