use anyhow::Result;
use cesso_uci::UciEngine;
use tracing::info;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    info!("cesso starting");
    UciEngine::new().run()?;
    Ok(())
}
