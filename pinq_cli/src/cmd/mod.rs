use anyhow::Result;
use pinq_store::FsPendingStore;
use std::path::PathBuf;

use crate::config::PinqConfig;

mod notify;
mod pending;
mod pin;

pub use notify::run_notify;
pub use pending::run_pending;
pub use pin::run_pin;

pub async fn run_command(
    config: &PinqConfig,
    pending_dir_override: Option<PathBuf>,
    cmd: crate::Commands,
) -> Result<()> {
    let pending_dir = pending_dir_override.unwrap_or_else(|| config.pending_dir());
    let store = FsPendingStore::new(pending_dir);

    match cmd {
        crate::Commands::Pending { cmd } => run_pending(cmd, &store, &config.api_url()).await,
        crate::Commands::Pin { cmd } => run_pin(cmd, store, &config.api_url()).await,
        crate::Commands::Notify => run_notify(&store).await,
    }
}
