use anyhow::{Context, Result};
use pinq_core::{Cid, PinClient};
use pinq_store::FsPendingStore;
use serde_json::Value;

use crate::PinCmd;
use crate::config::credential;

pub async fn run_pin(cmd: PinCmd, store: FsPendingStore, api_url: &str) -> Result<()> {
    let key = credential().context("PINQ_API_KEY is not set")?;

    match cmd {
        PinCmd::Json { file } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let payload: Value = serde_json::from_str(&text)
                .with_context(|| format!("{} is not valid JSON", file.display()))?;

            let client = PinClient::new(api_url, key);
            let cid = client.pin_json(&payload).await?;
            print_cid(cid);
        }
        PinCmd::File { path } => {
            // Exhausted uploads land in the pending queue for later retry.
            let client = PinClient::new(api_url, key).with_pending_store(Box::new(store));
            let cid = client.pin_file(&path).await?;
            print_cid(cid);
        }
    }
    Ok(())
}

fn print_cid(cid: Option<Cid>) {
    match cid {
        Some(cid) => println!("pinned: cid={cid}"),
        None => println!("pinned, but the service response carried no CID"),
    }
}
