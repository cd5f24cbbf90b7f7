use anyhow::Context;
use std::path::Path;
use stratus::domain::config::StratusConfig;
use stratus::kernel::bootstrap::Host;
use stratus::kernel::config::{ConfigLoader, DEFAULT_CONFIG_PATH};
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_owned());
    let cfg: StratusConfig = ConfigLoader::new(Path::new(&path))
        .optional()
        .load()
        .context("Critical: Configuration is malformed")?;

    let host = Host::new(cfg)?.with_logging(env!("CARGO_PKG_NAME"))?;
    info!(config = %path, "Arena host started");

    let arena = stratus_arena::from_config(host.config().arena.clone(), host.bus().clone())?;
    let report = arena.run().await;
    info!(?report, "Arena report");
    Ok(())
}
