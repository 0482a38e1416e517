use clap::Parser;
use rmcp::transport::stdio;
use rmcp::ServiceExt;
use tab_actions::WaitConfig;

/// tab-actions: wait for page elements and act on them, over MCP
#[derive(Parser)]
#[command(name = "tab-actions", version, about)]
struct Cli {
    /// Run Chrome with a visible window (default: headless)
    #[arg(long)]
    headed: bool,

    /// Default seconds to keep polling for an element (0 = check once)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    poll_timeout: i64,

    /// Default lower bound of the random pre-action delay, in ms
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    delay_min: i64,

    /// Default upper bound of the random pre-action delay, in ms
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    delay_max: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Log to stderr only; stdout carries the MCP transport
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();
    let headless = !cli.headed;
    let defaults = WaitConfig::new(cli.delay_min, cli.delay_max, cli.poll_timeout).clamped();
    if defaults.pre_delay_min_ms > defaults.pre_delay_max_ms {
        anyhow::bail!(
            "--delay-min ({}) must not exceed --delay-max ({})",
            defaults.pre_delay_min_ms,
            defaults.pre_delay_max_ms
        );
    }

    tracing::info!(
        "Starting tab-actions MCP server (headless: {}, defaults: {:?})",
        headless,
        defaults
    );

    let server = tab_actions::server::TabActionsServer::new(headless, defaults);
    let service = server.clone().serve(stdio()).await?;

    tokio::select! {
        result = service.waiting() => { result?; }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received interrupt signal, shutting down");
        }
    }

    server.shutdown().await;

    tracing::info!("tab-actions MCP server shut down");
    Ok(())
}
