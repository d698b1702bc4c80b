use clap::Parser;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(version)]
struct Args {
    /// Set config file path
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let cfg = livecast::config::Config::parse(args.config)?;

    utils::set_log(utils::log_directives(&cfg.log.level));
    warn!("set log level : {}", cfg.log.level);
    debug!("config : {:?}", cfg);

    let listener = tokio::net::TcpListener::bind(cfg.http.listen).await?;
    let ingest_listener = tokio::net::TcpListener::bind(cfg.ingest.listen).await?;

    livecast::metrics_register();
    livecast::serve(
        cfg,
        listener,
        ingest_listener,
        utils::signal::shutdown_signal(),
    )
    .await?;
    info!("Server shutdown");
    Ok(())
}
