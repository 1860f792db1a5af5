//! BNB → PAXG distributor.
//!
//! Usage:
//! ```bash
//! # Generate a sample config
//! distributor generate-config
//!
//! # Run the service (HTTP endpoints + hourly cycles)
//! BNB_PRIVATE_KEY=... MORALIS_API_KEY=... distributor serve
//!
//! # One cycle, result printed as JSON
//! distributor run
//!
//! # One order
//! distributor bridge 0.01 0xRecipient --wait
//! ```

use std::sync::Arc;

use alloy::primitives::Address;
use clap::{Parser, Subcommand};
use tracing::info;

use dln_distributor::{
    consts::NATIVE_DECIMALS,
    gateway::{HttpOrderTransport, OrderCompletion},
    helpers::parse_amount,
    holders::MoralisHolderSource,
    logging::{init_logging, LogConfig, LogFormat},
    server::{self, DistributorService, HistoryStore},
    AppConfig, BalanceOracle, ChainClient, CycleController, Error, HolderSource, HttpClient,
    OrderGateway, OrderSubmitter,
};

type Gateway = OrderGateway<HttpOrderTransport, ChainClient>;
type Controller = CycleController<ChainClient, MoralisHolderSource, Gateway>;

#[derive(Parser)]
#[command(name = "distributor")]
#[command(version, about = "Bridge BNB to PAXG via deBridge DLN and distribute to top holders", long_about = None)]
struct Cli {
    /// Path to TOML config file
    #[arg(short, long, default_value = "distributor.toml")]
    config: String,

    /// Source-chain private key
    #[arg(long, env = "BNB_PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    /// Moralis API key
    #[arg(long, env = "MORALIS_API_KEY", hide_env_values = true)]
    moralis_api_key: Option<String>,

    /// Override the source-chain RPC URL
    #[arg(long)]
    rpc_url: Option<String>,

    /// Override the HTTP port (serve)
    #[arg(long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log format (pretty, json, compact)
    #[arg(long)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a sample config file
    GenerateConfig {
        /// Output file path
        #[arg(short, long, default_value = "distributor.toml")]
        output: String,
    },
    /// Validate config without running
    ValidateConfig,
    /// Show the operating account's native balance
    Balance,
    /// List the holders the next cycle would pay
    Holders,
    /// Run a single distribution cycle and print the result
    Run,
    /// Submit one order
    Bridge {
        /// Amount in BNB
        amount: String,
        /// Destination-chain recipient
        recipient: Address,
        /// Wait for the order to be fulfilled
        #[arg(long)]
        wait: bool,
    },
    /// Query (or wait for) an order's status
    OrderStatus {
        order_id: String,
        #[arg(long)]
        wait: bool,
    },
    /// Serve HTTP endpoints and run timed cycles (default)
    Serve,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if it exists (before parsing CLI args)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::GenerateConfig { output }) => {
            std::fs::write(output, AppConfig::sample()?)?;
            println!("Sample config written to: {output}");
            return Ok(());
        }
        Some(Commands::ValidateConfig) => {
            let config = AppConfig::load(&cli.config)?;
            config.validate()?;
            println!("Configuration is valid:\n{config:#?}");
            return Ok(());
        }
        _ => {}
    }

    let mut config = AppConfig::load(&cli.config)?;
    config.validate()?;
    if let Some(rpc_url) = &cli.rpc_url {
        config.chain.rpc_url = rpc_url.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let _log_guard = setup_logging(&config, &cli)?;

    match &cli.command {
        Some(Commands::Balance) => {
            let chain = build_chain(&cli, &config)?;
            let balance = chain.get_balance().await?;
            println!("{} BNB ({})", balance, chain.address());
        }
        Some(Commands::Holders) => {
            let holders = build_holder_source(&cli, &config)?.get_holders().await?;
            println!("{}", serde_json::to_string_pretty(&holders)?);
        }
        Some(Commands::Run) => {
            let controller = build_controller(&cli, &config)?;
            let result = controller.run_cycle().await?;
            if let Some(dir) = &config.server.history_dir {
                let path = HistoryStore::open(dir)?.record(&result)?;
                info!(path = %path.display(), "Cycle result saved");
            }
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Some(Commands::Bridge {
            amount,
            recipient,
            wait,
        }) => {
            let amount = parse_amount(amount, NATIVE_DECIMALS)?;
            let gateway = build_gateway(&config, build_chain(&cli, &config)?)?;
            let receipt = gateway
                .submit_order(amount, *recipient)
                .await
                .map_err(Error::from)?;
            println!(
                "{}",
                serde_json::json!({
                    "hash": receipt.transaction_hash,
                    "status": u8::from(receipt.receipt_status),
                    "orderId": receipt.order_id,
                })
            );
            if *wait {
                report_completion(&gateway, &config, &receipt.order_id).await;
            }
        }
        Some(Commands::OrderStatus { order_id, wait }) => {
            let gateway = build_gateway(&config, build_chain(&cli, &config)?)?;
            if *wait {
                report_completion(&gateway, &config, order_id).await;
            } else {
                match gateway.order_state(order_id).await {
                    Some(state) => println!("{order_id}: {state:?}"),
                    None => println!("{order_id}: status unavailable"),
                }
            }
        }
        Some(Commands::Serve) | None => {
            let controller = build_controller(&cli, &config)?;
            let history = config
                .server
                .history_dir
                .as_ref()
                .map(HistoryStore::open)
                .transpose()?;
            let service = Arc::new(DistributorService::new(
                controller,
                std::time::Duration::from_secs(config.server.interval_secs),
                history,
            ));
            print_startup_banner(&config);
            server::serve(service, &config.server.address()).await?;
        }
        Some(Commands::GenerateConfig { .. }) | Some(Commands::ValidateConfig) => {}
    }

    Ok(())
}

// ============================================================================
// Wiring
// ============================================================================

fn build_chain(cli: &Cli, config: &AppConfig) -> Result<ChainClient, Box<dyn std::error::Error>> {
    let private_key = cli
        .private_key
        .clone()
        .or(config.chain.private_key.clone())
        .ok_or("Private key required. Set via --private-key, BNB_PRIVATE_KEY env var, or config file.")?;

    let chain = ChainClient::new(&config.chain.rpc_url, &private_key)?.with_receipt_timeout(
        std::time::Duration::from_secs(config.chain.receipt_timeout_secs),
    );
    Ok(chain)
}

fn build_gateway(config: &AppConfig, chain: ChainClient) -> Result<Gateway, Box<dyn std::error::Error>> {
    let http = HttpClient::new(config.dln.request_timeout())?;
    let params = config.dln.order_params(chain.address());
    Ok(OrderGateway::new(HttpOrderTransport::new(http), chain, params)
        .with_hosts(config.dln.hosts.clone())
        .with_policy(config.dln.retry_policy()))
}

fn build_holder_source(
    cli: &Cli,
    config: &AppConfig,
) -> Result<MoralisHolderSource, Box<dyn std::error::Error>> {
    let moralis = config.holders.moralis_config(cli.moralis_api_key.clone())?;
    let http = HttpClient::new(config.holders.request_timeout())?;
    Ok(MoralisHolderSource::new(http, moralis, config.holders.filter()))
}

fn build_controller(cli: &Cli, config: &AppConfig) -> Result<Controller, Box<dyn std::error::Error>> {
    let chain = build_chain(cli, config)?;
    let holders = build_holder_source(cli, config)?;
    let gateway = build_gateway(config, chain.clone())?;
    Ok(CycleController::new(
        chain,
        holders,
        gateway,
        config.cycle.to_cycle_config()?,
    ))
}

async fn report_completion(gateway: &Gateway, config: &AppConfig, order_id: &str) {
    info!(order_id, "Waiting for order fulfillment");
    let completion = gateway
        .wait_for_fulfillment(
            order_id,
            config.dln.status_poll_interval(),
            config.dln.status_timeout(),
        )
        .await;
    match completion {
        OrderCompletion::Fulfilled(state) => println!("{order_id}: fulfilled ({state:?})"),
        OrderCompletion::Failed(state) => println!("{order_id}: failed ({state:?})"),
        OrderCompletion::TimedOut => println!("{order_id}: timed out waiting for fulfillment"),
    }
}

fn setup_logging(
    config: &AppConfig,
    cli: &Cli,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, Box<dyn std::error::Error>> {
    let log_config = LogConfig {
        level: cli.log_level.clone().unwrap_or(config.logging.level.clone()),
        format: cli.log_format.unwrap_or(config.logging.format),
        ..config.logging.clone()
    };
    init_logging(&log_config)
}

fn print_startup_banner(config: &AppConfig) {
    let version = env!("CARGO_PKG_VERSION");
    info!("DLN distributor v{version}");
    info!(
        hosts = ?config.dln.hosts,
        token = %config.holders.token_address,
        top_n = config.holders.top_n,
        interval_secs = config.server.interval_secs,
        min_total = %config.cycle.min_total,
        transferable_bps = config.cycle.transferable_bps,
        "Configuration"
    );
}
