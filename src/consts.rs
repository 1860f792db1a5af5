//! deBridge DLN and chain constants.

/// Primary DLN API host
pub const DLN_PRIMARY_HOST: &str = "https://dln.debridge.finance";
/// Fallback DLN API host
pub const DLN_FALLBACK_HOST: &str = "https://api.dln.trade";

pub const CREATE_TX_PATH: &str = "/v1.0/dln/order/create-tx";
pub const ORDER_STATUS_PATH: &str = "/v1.0/dln/order";

/// BNB Smart Chain
pub const BSC_CHAIN_ID: u64 = 56;
/// Ethereum mainnet
pub const ETH_CHAIN_ID: u64 = 1;

/// DLN uses the zero address for the chain's native asset
pub const NATIVE_TOKEN: &str = "0x0000000000000000000000000000000000000000";
/// PAXG on Ethereum
pub const PAXG_ETH: &str = "0x45804880De22913dAFE09f4980848ECE6EcbAf78";

pub const BSC_RPC_URL: &str = "https://bsc-dataseed.binance.org";
pub const MORALIS_API_URL: &str = "https://deep-index.moralis.io/api/v2.2";

/// Attempts per host before falling back
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Linear backoff base: attempt n waits n × base
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 1000;

/// Fixed-point precision of a holder's share of the total weight
pub const SHARE_PRECISION: u64 = 1_000_000_000;
/// Decimals used when turning a holder's token balance into a weight
pub const WEIGHT_DECIMALS: u8 = 18;
/// Native asset decimals (BNB)
pub const NATIVE_DECIMALS: u8 = 18;

pub const BPS_DENOMINATOR: u64 = 10_000;
