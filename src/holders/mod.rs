//! Moralis-backed holder source.
//!
//! Pages through the token's owners (largest first), drops contracts,
//! pools and excluded addresses, and returns the top N with 1-based ranks.

mod filter;

use std::time::Duration;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

pub use filter::{HolderFilter, DEFAULT_SKIP_PATTERNS};

use crate::{
    consts::WEIGHT_DECIMALS, cycle::HolderSource, helpers::format_amount, logging::targets,
    prelude::*, req::HttpClient, serde_utils::u256_dec, Error, HolderRecord,
};

/// One row of `GET /erc20/{token}/owners`.
#[derive(Deserialize, Debug, Clone)]
pub struct MoralisOwner {
    #[serde(alias = "address")]
    pub owner_address: String,
    #[serde(default)]
    pub owner_address_label: Option<String>,
    /// Raw balance in token base units
    #[serde(with = "u256_dec")]
    pub balance: U256,
    #[serde(default)]
    pub balance_formatted: Option<String>,
    #[serde(default)]
    pub is_contract: bool,
    #[serde(default)]
    pub percentage_relative_to_total_supply: Option<f64>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MoralisOwnersPage {
    #[serde(default)]
    pub result: Vec<MoralisOwner>,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MoralisConfig {
    pub api_url: String,
    pub api_key: String,
    pub token_address: String,
    /// Moralis chain id ("0x38" for BSC)
    pub chain: String,
    pub page_size: usize,
    /// Stop paging once this many owners were fetched
    pub fetch_target: usize,
    /// Holders returned after filtering
    pub top_n: usize,
    pub page_delay: Duration,
}

pub struct MoralisHolderSource {
    http_client: HttpClient,
    config: MoralisConfig,
    filter: HolderFilter,
}

// Security: keep the API key out of logs
impl std::fmt::Debug for MoralisHolderSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MoralisHolderSource")
            .field("api_url", &self.config.api_url)
            .field("api_key", &"<redacted>")
            .field("token_address", &self.config.token_address)
            .field("top_n", &self.config.top_n)
            .finish()
    }
}

impl MoralisHolderSource {
    pub fn new(http_client: HttpClient, config: MoralisConfig, filter: HolderFilter) -> Self {
        Self {
            http_client,
            config,
            filter,
        }
    }

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<MoralisOwnersPage> {
        let url = format!(
            "{}/erc20/{}/owners",
            self.config.api_url.trim_end_matches('/'),
            self.config.token_address
        );
        let limit = self.config.page_size.to_string();
        let mut query: Vec<(&str, &str)> = vec![
            ("chain", self.config.chain.as_str()),
            ("limit", limit.as_str()),
            ("order", "DESC"),
        ];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor));
        }

        let body = self
            .http_client
            .get(
                &url,
                &query,
                &[
                    ("X-API-Key", self.config.api_key.as_str()),
                    ("User-Agent", "BSC-Token-Holders/1.0"),
                ],
            )
            .await
            .map_err(|e| Error::Holders(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| Error::Holders(format!("bad owners page: {e}")))
    }

    async fn fetch_owners(&self) -> Result<Vec<MoralisOwner>> {
        let mut owners: Vec<MoralisOwner> = Vec::new();
        let mut cursor: Option<String> = None;
        let mut page = 1usize;

        while owners.len() < self.config.fetch_target {
            debug!(target: targets::HOLDERS, page, fetched = owners.len(), "Fetching owners page");
            let data = self.fetch_page(cursor.as_deref()).await?;

            if data.result.is_empty() {
                debug!(target: targets::HOLDERS, page, "No more results");
                break;
            }
            owners.extend(data.result);

            match data.cursor.filter(|c| !c.is_empty()) {
                Some(next) => {
                    cursor = Some(next);
                    page += 1;
                    tokio::time::sleep(self.config.page_delay).await;
                }
                None => break,
            }
        }

        Ok(owners)
    }
}

/// Sort descending by balance, drop excluded owners, keep `top_n`, rank from 1.
pub fn rank_holders(
    mut owners: Vec<MoralisOwner>,
    filter: &HolderFilter,
    top_n: usize,
) -> Vec<HolderRecord> {
    owners.sort_by(|a, b| b.balance.cmp(&a.balance));

    owners
        .into_iter()
        .filter(|o| {
            !filter.should_skip(&o.owner_address, o.owner_address_label.as_deref(), o.is_contract)
        })
        .filter_map(|o| match o.owner_address.parse::<Address>() {
            Ok(address) => Some((address, o)),
            Err(e) => {
                warn!(target: targets::HOLDERS, address = %o.owner_address, error = %e, "Skipping unparsable owner address");
                None
            }
        })
        .take(top_n)
        .enumerate()
        .map(|(index, (address, o))| HolderRecord {
            address,
            balance: o
                .balance_formatted
                .unwrap_or_else(|| format_amount(o.balance, WEIGHT_DECIMALS)),
            rank: index as u32 + 1,
            percentage: o.percentage_relative_to_total_supply,
            label: o.owner_address_label,
        })
        .collect()
}

#[async_trait]
impl HolderSource for MoralisHolderSource {
    async fn get_holders(&self) -> Result<Vec<HolderRecord>> {
        info!(target: targets::HOLDERS, token = %self.config.token_address, "Fetching holders");
        let owners = self.fetch_owners().await?;
        let fetched = owners.len();

        let holders = rank_holders(owners, &self.filter, self.config.top_n);
        info!(
            target: targets::HOLDERS,
            fetched,
            returned = holders.len(),
            "Holders ranked"
        );
        Ok(holders)
    }
}
