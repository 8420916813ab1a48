// src/main.rs
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info};
use serde_json::json;
use solana_sdk::pubkey::Pubkey;
use solana_swap_router::{
    config::load_config,
    dex::{
        clients::JupiterClient,
        math::weighted::join_estimate,
        pool::{MintMetadataProvider, PoolStateProvider, SnapshotFile},
        AggregatorClient,
    },
    engine::{EngineConfig, QuoteEngine, QuoteInput},
    utils::{setup_logging, TokenAmount},
};
use std::str::FromStr;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "swap-router")]
#[command(about = "Weighted-pool swap routing and LP estimates over a pool snapshot")]
struct Cli {
    /// Pool snapshot JSON; defaults to POOL_SNAPSHOT_PATH
    #[arg(long, global = true)]
    snapshot: Option<String>,

    /// Skip the Jupiter comparison
    #[arg(long, global = true)]
    no_external: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Best execution for a swap
    Quote {
        /// Input mint (base58 or SOL/USDC/RAY)
        #[arg(long)]
        bid: String,
        /// Output mint (base58 or SOL/USDC/RAY)
        #[arg(long)]
        ask: String,
        /// Input amount in UI units, e.g. 1.5
        #[arg(long)]
        amount: String,
    },
    /// LP tokens and price impact for a basket deposit
    Join {
        /// Pool address
        #[arg(long)]
        pool: String,
        /// Comma-separated UI amounts, one per pool mint in pool order
        #[arg(long, value_delimiter = ',')]
        amounts: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let app_config = load_config()?;
    setup_logging(app_config.log_level_filter()).context("Failed to initialize logging")?;
    app_config.validate_and_log();

    let snapshot_path = cli
        .snapshot
        .clone()
        .unwrap_or_else(|| app_config.pool_snapshot_path.clone());
    info!("Loading pool snapshot from {}", snapshot_path);
    let (store, registry) = SnapshotFile::load(&snapshot_path)?.into_providers();
    let store = Arc::new(store);
    let registry = Arc::new(registry);

    match cli.command {
        Commands::Quote { bid, ask, amount } => {
            let aggregator: Option<Arc<dyn AggregatorClient>> =
                if app_config.jupiter_enabled && !cli.no_external {
                    Some(Arc::new(JupiterClient::new(&app_config)?))
                } else {
                    info!("External quotes disabled");
                    None
                };
            let engine = QuoteEngine::new(
                store,
                registry,
                aggregator,
                EngineConfig::from(app_config.as_ref()),
            );
            let outcome = engine.quote(&QuoteInput::new(bid, ask, amount)).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Join { pool, amounts } => {
            let address = Pubkey::from_str(&pool).map_err(|e| anyhow!("Invalid pool address {}: {}", pool, e))?;
            let snapshot = store.get_all_pools();
            let pool = snapshot
                .get(&address)
                .ok_or_else(|| anyhow!("Pool {} not in snapshot", address))?;

            let decimals = pool
                .mints
                .iter()
                .map(|m| {
                    registry
                        .decimals_of(m)
                        .ok_or_else(|| anyhow!("No decimals for mint {}", m))
                })
                .collect::<Result<Vec<u8>>>()?;
            if amounts.len() != decimals.len() {
                return Err(anyhow!(
                    "Pool {} has {} mints, got {} amounts",
                    address,
                    decimals.len(),
                    amounts.len()
                ));
            }
            let base_units = amounts
                .iter()
                .zip(&decimals)
                .map(|(a, d)| TokenAmount::from_ui_str(a, *d).map(|t| t.amount))
                .collect::<std::result::Result<Vec<u64>, _>>()?;

            match join_estimate(pool, &base_units, &decimals) {
                Ok(estimate) => println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "pool": address.to_string(),
                        "amounts_in": base_units,
                        "lp_out": estimate.lp_out,
                        "lp_supply": pool.lp_supply,
                        "price_impact": estimate.price_impact,
                    }))?
                ),
                Err(e) => {
                    error!("Join estimate failed: {}", e);
                    return Err(e.into());
                }
            }
        }
    }

    Ok(())
}
