use clap::Parser;
use tokio::sync::watch;

use volbot::api::{CoinbaseFeed, SolanaRpcClient, SwapExecutionClient, SyntheticFeed};
use volbot::engine::EngineParams;
use volbot::execution::{ExecutionGateway, RetryPolicy};
use volbot::{Config, TradingEngine};

#[derive(Parser)]
#[command(name = "volbot", about = "SOL/USDC volatility-band spot trading bot")]
struct Cli {
    /// Trade against a synthetic random-walk feed instead of the live
    /// Coinbase ticker (swaps still go to the configured service).
    #[arg(long)]
    simulate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();

    // Missing credentials/endpoints are fatal; everything else degrades.
    let config = Config::from_env()?;
    config.log_unused_knobs();

    tracing::info!(
        rpc = %config.rpc_endpoint,
        pool = %config.pool_address,
        notional = config.trade_notional_usdc,
        timeframe_secs = config.timeframe.as_secs_f64(),
        simulate = cli.simulate,
        "starting SOL/USDC bot"
    );

    let rpc = SolanaRpcClient::new(&config.rpc_endpoint, &config.wallet_address);
    let swap = SwapExecutionClient::new(
        &config.rpc_endpoint,
        &config.private_key,
        &config.pool_address,
    );
    let retry = RetryPolicy {
        max_attempts: config.max_retries,
        base_delay: config.retry_base_delay,
    };
    let gateway = ExecutionGateway::new(swap, rpc.clone(), retry, config.settlement_delay);
    let params = EngineParams::from(&config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl+C received, requesting shutdown");
            let _ = shutdown_tx.send(true);
        }
    });

    if cli.simulate {
        let feed = SyntheticFeed::new(100.0);
        let mut engine = TradingEngine::new(feed, gateway, rpc, params);
        engine.run(shutdown_rx).await;
    } else {
        let feed = CoinbaseFeed::new();
        let mut engine = TradingEngine::new(feed, gateway, rpc, params);
        engine.run(shutdown_rx).await;
    }

    tracing::info!("volbot stopped");
    Ok(())
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "volbot=info".into()),
        )
        .init();
}
