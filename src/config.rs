//! TOML application config (`distributor.toml`).
//!
//! Every field has a default, so an absent file or a partial file is valid.
//! Secrets are normally supplied through the environment (`BNB_PRIVATE_KEY`,
//! `MORALIS_API_KEY`) and only fall back to the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{
    consts::{
        BSC_CHAIN_ID, BSC_RPC_URL, DEFAULT_BACKOFF_BASE_MS, DEFAULT_MAX_ATTEMPTS,
        DLN_FALLBACK_HOST, DLN_PRIMARY_HOST, ETH_CHAIN_ID, MORALIS_API_URL, NATIVE_DECIMALS,
        NATIVE_TOKEN, PAXG_ETH,
    },
    cycle::CycleConfig,
    gateway::{OrderParams, RetryPolicy},
    helpers::parse_amount,
    holders::{HolderFilter, MoralisConfig, DEFAULT_SKIP_PATTERNS},
    logging::LogConfig,
    prelude::*,
    scheduler::BatchConfig,
    Error,
};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub dln: DlnConfig,
    #[serde(default)]
    pub cycle: CycleSettings,
    #[serde(default)]
    pub holders: HoldersConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LogConfig,
}

// ============================================================================
// [chain]
// ============================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Private key (prefer the BNB_PRIVATE_KEY env var)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,
}

fn default_rpc_url() -> String {
    BSC_RPC_URL.to_string()
}

fn default_receipt_timeout_secs() -> u64 {
    120
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            private_key: None,
            receipt_timeout_secs: default_receipt_timeout_secs(),
        }
    }
}

// ============================================================================
// [dln]
// ============================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DlnConfig {
    /// Tried in order; the first is the primary
    #[serde(default = "default_hosts")]
    pub hosts: Vec<String>,
    #[serde(default = "default_src_chain_id")]
    pub src_chain_id: u64,
    #[serde(default = "default_dst_chain_id")]
    pub dst_chain_id: u64,
    #[serde(default = "default_src_token")]
    pub src_token: String,
    #[serde(default = "default_dst_token")]
    pub dst_token: String,
    /// Attempts per host before falling back
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Linear backoff unit: attempt n waits n × base
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_priority_level")]
    pub priority_level: String,
    #[serde(default = "default_status_poll_secs")]
    pub status_poll_secs: u64,
    #[serde(default = "default_status_timeout_secs")]
    pub status_timeout_secs: u64,
}

fn default_hosts() -> Vec<String> {
    vec![DLN_PRIMARY_HOST.to_string(), DLN_FALLBACK_HOST.to_string()]
}
fn default_src_chain_id() -> u64 {
    BSC_CHAIN_ID
}
fn default_dst_chain_id() -> u64 {
    ETH_CHAIN_ID
}
fn default_src_token() -> String {
    NATIVE_TOKEN.to_string()
}
fn default_dst_token() -> String {
    PAXG_ETH.to_string()
}
fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}
fn default_backoff_base_ms() -> u64 {
    DEFAULT_BACKOFF_BASE_MS
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_priority_level() -> String {
    "normal".to_string()
}
fn default_status_poll_secs() -> u64 {
    10
}
fn default_status_timeout_secs() -> u64 {
    300
}

impl Default for DlnConfig {
    fn default() -> Self {
        Self {
            hosts: default_hosts(),
            src_chain_id: default_src_chain_id(),
            dst_chain_id: default_dst_chain_id(),
            src_token: default_src_token(),
            dst_token: default_dst_token(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            priority_level: default_priority_level(),
            status_poll_secs: default_status_poll_secs(),
            status_timeout_secs: default_status_timeout_secs(),
        }
    }
}

impl DlnConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.backoff_base_ms))
    }

    pub fn order_params(&self, sender: Address) -> OrderParams {
        OrderParams {
            src_chain_id: self.src_chain_id,
            dst_chain_id: self.dst_chain_id,
            src_token: self.src_token.clone(),
            dst_token: self.dst_token.clone(),
            sender,
            priority_level: self.priority_level.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_secs(self.status_poll_secs)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_secs)
    }
}

// ============================================================================
// [cycle]
// ============================================================================

/// Cycle thresholds in human units, converted with [`CycleSettings::to_cycle_config`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CycleSettings {
    /// Minimum native balance (BNB) for a cycle to run
    #[serde(default = "default_min_total")]
    pub min_total: String,
    /// Minimum order size (BNB)
    #[serde(default = "default_min_per_order")]
    pub min_per_order: String,
    /// Share of the balance bridged, in basis points
    #[serde(default = "default_transferable_bps")]
    pub transferable_bps: u16,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
}

fn default_min_total() -> String {
    "1.0".to_string()
}
fn default_min_per_order() -> String {
    "0.006".to_string()
}
fn default_transferable_bps() -> u16 {
    9500
}
fn default_concurrency() -> usize {
    3
}
fn default_batch_delay_ms() -> u64 {
    2000
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            min_total: default_min_total(),
            min_per_order: default_min_per_order(),
            transferable_bps: default_transferable_bps(),
            concurrency: default_concurrency(),
            batch_delay_ms: default_batch_delay_ms(),
        }
    }
}

impl CycleSettings {
    pub fn to_cycle_config(&self) -> Result<CycleConfig> {
        let min_total = parse_amount(&self.min_total, NATIVE_DECIMALS)
            .map_err(|e| Error::config(format!("cycle.min_total: {e}")))?;
        let min_per_order = parse_amount(&self.min_per_order, NATIVE_DECIMALS)
            .map_err(|e| Error::config(format!("cycle.min_per_order: {e}")))?;

        Ok(CycleConfig {
            min_total,
            min_per_order,
            transferable_bps: self.transferable_bps,
            batch: BatchConfig {
                concurrency: self.concurrency,
                inter_batch_delay: Duration::from_millis(self.batch_delay_ms),
            },
        })
    }
}

// ============================================================================
// [holders]
// ============================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HoldersConfig {
    #[serde(default = "default_moralis_url")]
    pub api_url: String,
    /// Moralis API key (prefer the MORALIS_API_KEY env var)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Token whose holders receive the distribution
    #[serde(default)]
    pub token_address: String,
    #[serde(default = "default_moralis_chain")]
    pub chain: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_fetch_target")]
    pub fetch_target: usize,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
    /// Per-request timeout for the Moralis API
    #[serde(default = "default_holders_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub skip_addresses: Vec<String>,
    #[serde(default = "default_skip_patterns")]
    pub skip_patterns: Vec<String>,
}

fn default_moralis_url() -> String {
    MORALIS_API_URL.to_string()
}
fn default_moralis_chain() -> String {
    "0x38".to_string()
}
fn default_page_size() -> usize {
    100
}
fn default_fetch_target() -> usize {
    150
}
fn default_top_n() -> usize {
    100
}
fn default_page_delay_ms() -> u64 {
    1000
}
fn default_holders_timeout_secs() -> u64 {
    60
}
fn default_skip_patterns() -> Vec<String> {
    DEFAULT_SKIP_PATTERNS.iter().map(|p| p.to_string()).collect()
}

impl Default for HoldersConfig {
    fn default() -> Self {
        Self {
            api_url: default_moralis_url(),
            api_key: None,
            token_address: String::new(),
            chain: default_moralis_chain(),
            page_size: default_page_size(),
            fetch_target: default_fetch_target(),
            top_n: default_top_n(),
            page_delay_ms: default_page_delay_ms(),
            request_timeout_secs: default_holders_timeout_secs(),
            skip_addresses: Vec::new(),
            skip_patterns: default_skip_patterns(),
        }
    }
}

impl HoldersConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn filter(&self) -> HolderFilter {
        HolderFilter::new(&self.token_address, &self.skip_addresses, &self.skip_patterns)
    }

    /// Requires the token address and an API key (from here or `api_key`).
    pub fn moralis_config(&self, api_key: Option<String>) -> Result<MoralisConfig> {
        let api_key = api_key
            .or_else(|| self.api_key.clone())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::config("Moralis API key required. Set MORALIS_API_KEY or holders.api_key.")
            })?;
        if self.token_address.trim().is_empty() {
            return Err(Error::config("holders.token_address is required"));
        }

        Ok(MoralisConfig {
            api_url: self.api_url.clone(),
            api_key,
            token_address: self.token_address.trim().to_string(),
            chain: self.chain.clone(),
            page_size: self.page_size,
            fetch_target: self.fetch_target,
            top_n: self.top_n,
            page_delay: Duration::from_millis(self.page_delay_ms),
        })
    }
}

// ============================================================================
// [server]
// ============================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Seconds between timer-driven cycles (0 disables the timer)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Where cycle results are written; disabled when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_dir: Option<PathBuf>,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_interval_secs() -> u64 {
    3600
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            interval_secs: default_interval_secs(),
            history_dir: None,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

// ============================================================================
// Loading
// ============================================================================

impl AppConfig {
    /// Parse `path`, or return the defaults when it does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("invalid config: {e}")))
    }

    /// Check everything that can be checked without secrets or network.
    pub fn validate(&self) -> Result<()> {
        self.cycle.to_cycle_config()?;
        if self.cycle.transferable_bps as u64 > crate::consts::BPS_DENOMINATOR {
            return Err(Error::config("cycle.transferable_bps must be at most 10000"));
        }
        if self.dln.hosts.is_empty() {
            return Err(Error::config("dln.hosts must list at least one host"));
        }
        if self.dln.max_attempts == 0 {
            return Err(Error::config("dln.max_attempts must be at least 1"));
        }
        if self.holders.top_n == 0 {
            return Err(Error::config("holders.top_n must be at least 1"));
        }
        Ok(())
    }

    /// Sample file contents: the defaults plus commented secrets.
    pub fn sample() -> Result<String> {
        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| Error::config(format!("failed to render config: {e}")))?;

        Ok(format!(
            r#"# DLN Distributor Configuration
# See: distributor --help

{content}
# Secrets are read from the environment (or a .env file):
#   BNB_PRIVATE_KEY, MORALIS_API_KEY
# or uncomment below (not recommended for security):
# [chain]
# private_key = "your_private_key_here"
"#
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.dln.hosts.len(), 2);
        assert_eq!(config.dln.max_attempts, 3);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.holders.chain, "0x38");

        let cycle = config.cycle.to_cycle_config().unwrap();
        assert_eq!(cycle, CycleConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [cycle]
            min_per_order = "0.01"
            concurrency = 5

            [holders]
            token_address = "0xabc"
            "#,
        )
        .unwrap();

        let cycle = config.cycle.to_cycle_config().unwrap();
        assert_eq!(cycle.min_per_order, U256::from(10_000_000_000_000_000u64));
        assert_eq!(cycle.batch.concurrency, 5);
        assert_eq!(cycle.batch.inter_batch_delay, Duration::from_millis(2000));
        assert_eq!(config.holders.token_address, "0xabc");
        assert_eq!(config.holders.top_n, 100);
    }

    #[test]
    fn test_holders_timeout_independent_of_dln() {
        let config = AppConfig::default();
        assert_eq!(config.holders.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.dln.request_timeout(), Duration::from_secs(30));

        let config = AppConfig::from_toml("[holders]\nrequest_timeout_secs = 90\n").unwrap();
        assert_eq!(config.holders.request_timeout(), Duration::from_secs(90));
        assert_eq!(config.dln.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_amount_is_config_error() {
        let config = AppConfig::from_toml("[cycle]\nmin_total = \"lots\"\n").unwrap();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_hosts() {
        let mut config = AppConfig::default();
        config.dln.hosts.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_moralis_config_prefers_explicit_key() {
        let holders = HoldersConfig {
            api_key: Some("from-file".to_string()),
            token_address: "0xabc".to_string(),
            ..Default::default()
        };
        let moralis = holders.moralis_config(Some("from-env".to_string())).unwrap();
        assert_eq!(moralis.api_key, "from-env");
        assert_eq!(moralis.page_delay, Duration::from_millis(1000));

        let missing = HoldersConfig::default().moralis_config(None);
        assert!(missing.is_err());
    }

    #[test]
    fn test_sample_parses_back() {
        let sample = AppConfig::sample().unwrap();
        let parsed = AppConfig::from_toml(&sample).unwrap();
        assert_eq!(parsed.dln.hosts, default_hosts());
        assert!(parsed.chain.private_key.is_none());
    }

    #[test]
    fn test_order_params_from_config() {
        let sender = Address::repeat_byte(9);
        let params = DlnConfig::default().order_params(sender);
        assert_eq!(params, OrderParams::bnb_to_paxg(sender));
    }
}
