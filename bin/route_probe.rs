//! # Route Probe
//!
//! One-shot CLI that runs a full quote cycle and prints the ranked routes.
//!
//! ```bash
//! cargo run --bin route_probe -- \
//!     --token-in 0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2 \
//!     --token-out 0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48 \
//!     --amount 1.5
//! ```

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use colored::Colorize;
use ethers::providers::{Http, Provider};
use ethers::types::Address;
use ethers::utils::parse_units;
use std::sync::Arc;
use std::time::Duration;

use swap_router_sdk::adapters::UniswapV3Adapter;
use swap_router_sdk::engine::{route_is_well_formed, RouteEngine};
use swap_router_sdk::metrics;
use swap_router_sdk::settings::Settings;
use swap_router_sdk::token_resolver::TokenResolver;
use swap_router_sdk::types::SwapRequest;

#[derive(Parser, Debug)]
#[command(name = "route_probe", about = "Quote a swap across all discoverable routes")]
struct Args {
    /// Input token address
    #[arg(long)]
    token_in: Address,

    /// Output token address
    #[arg(long)]
    token_out: Address,

    /// Input amount in human units (scaled by the input token's decimals)
    #[arg(long)]
    amount: String,

    /// Slippage tolerance in basis points
    #[arg(long)]
    slippage_bps: Option<u32>,

    /// RPC endpoint; falls back to the first configured http_url
    #[arg(long)]
    rpc_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    let settings = Settings::new().context("failed to load settings")?;

    env_logger::Builder::new()
        .parse_filters(&settings.log.level)
        .init();
    metrics::describe_metrics();
    #[cfg(feature = "observability")]
    if settings.metrics.enabled {
        metrics::install_prometheus_exporter(settings.metrics.port)?;
    }

    let rpc_url = args
        .rpc_url
        .or_else(|| settings.rpc.http_urls.first().cloned())
        .ok_or_else(|| anyhow!("no RPC endpoint: pass --rpc-url or configure rpc.http_urls"))?;
    let provider = Provider::<Http>::try_from(rpc_url.as_str())
        .context("invalid RPC url")?
        .interval(Duration::from_millis(200));
    let client = Arc::new(provider);

    let adapter = Arc::new(UniswapV3Adapter::new(client, &settings.contracts));
    let ttl = match settings.token_cache.ttl_seconds {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };
    let resolver = Arc::new(TokenResolver::with_mainnet_seeds(adapter.clone(), ttl));
    let engine = RouteEngine::new(
        adapter.clone(),
        adapter.clone(),
        adapter.clone(),
        adapter.clone(),
        resolver.clone(),
        &settings,
    );

    let token_in = resolver.resolve(args.token_in).await?;
    let amount_in = parse_units(&args.amount, token_in.decimals as u32)
        .map_err(|e| anyhow!("bad amount: {e}"))?
        .into();

    let request = SwapRequest {
        token_in: args.token_in,
        token_out: args.token_out,
        amount_in,
        slippage_bps: args.slippage_bps.unwrap_or(settings.session.slippage_bps),
        deadline_minutes: settings.session.deadline_minutes,
        recipient: Address::zero(),
    };

    let routes = engine.find_routes(&request).await?;

    println!(
        "\n{} {} {} -> {}",
        "Routes for".bold(),
        args.amount.bold(),
        token_in.symbol.bold(),
        format!("{:?}", args.token_out).bold()
    );
    for (rank, route) in routes.iter().enumerate() {
        debug_assert!(route_is_well_formed(route));
        let hops = route
            .path
            .iter()
            .map(|t| t.symbol.as_str())
            .collect::<Vec<_>>()
            .join(" -> ");
        let fees = route
            .fees
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join("/");
        let line = format!(
            "#{:<2} {:<40} fees {:<16} out {:<24} impact {:>7.3}% gas {}",
            rank + 1,
            hops,
            fees,
            route.formatted_out,
            route.price_impact_pct,
            route.gas_estimate
        );
        if rank == 0 {
            println!("{}", line.green());
        } else {
            println!("{line}");
        }
    }

    Ok(())
}
