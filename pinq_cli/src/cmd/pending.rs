use anyhow::{Context, Result};
use pinq_core::{Cid, PinClient, RetryPolicy};
use pinq_store::{FsPendingStore, PendingPin, PendingStore};
use std::path::Path;

use crate::PendingCmd;
use crate::config::credential;

pub async fn run_pending(cmd: PendingCmd, store: &FsPendingStore, api_url: &str) -> Result<()> {
    match cmd {
        PendingCmd::List => {
            let records = store.list().await?;
            if records.is_empty() {
                println!("No pending pins found");
                return Ok(());
            }
            for (name, record) in records {
                println!("{}", store.record_path(&name).display());
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
        }
        PendingCmd::Retry { name } => {
            let Some(key) = credential() else {
                println!("PINQ_API_KEY not set; cannot retry pins");
                return Ok(());
            };
            let record = load_record(store, &name).await?;
            retry_record(store, api_url, &key, &name, &record).await?;
        }
        PendingCmd::RetryAll => {
            let Some(key) = credential() else {
                println!("PINQ_API_KEY not set; cannot retry pins");
                return Ok(());
            };
            retry_all(store, api_url, &key).await?;
        }
    }
    Ok(())
}

async fn load_record(store: &FsPendingStore, name: &str) -> Result<PendingPin> {
    let record_path = store.record_path(name);
    let bytes = tokio::fs::read(&record_path)
        .await
        .with_context(|| format!("no pending record at {}", record_path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("corrupt pending record at {}", record_path.display()))
}

/// Retries every record in a snapshot of the queue taken at invocation
/// time, sequentially. The queue is shared with other processes that may
/// remove records mid-run, so one record's failure is reported and never
/// aborts the rest of the run.
async fn retry_all(store: &FsPendingStore, api_url: &str, key: &str) -> Result<()> {
    let snapshot = store.list().await?;
    if snapshot.is_empty() {
        println!("No pending pins found");
        return Ok(());
    }
    for (name, record) in snapshot {
        if let Err(e) = retry_record(store, api_url, key, &name, &record).await {
            eprintln!("Retry failed for {}: {e:#}", record.file);
        }
    }
    Ok(())
}

/// Re-runs a single pending upload. Success removes the record; failure
/// reports the error and leaves the record untouched.
async fn retry_record(
    store: &FsPendingStore,
    api_url: &str,
    key: &str,
    name: &str,
    record: &PendingPin,
) -> Result<()> {
    println!("Retrying pin for {}", record.file);

    // Single shot, and no pending store attached: a failed manual retry
    // must leave the existing record untouched rather than overwrite it.
    let client = PinClient::new(api_url, key).with_policy(RetryPolicy::single_shot());
    match client.pin_file(Path::new(&record.file)).await {
        Ok(cid) => {
            store.delete(name).await?;
            println!(
                "Pinned {} -> {}",
                record.file,
                cid.as_ref().map(Cid::as_str).unwrap_or("<no cid>")
            );
        }
        Err(e) => {
            eprintln!("Retry failed for {}: {e}", record.file);
        }
    }
    Ok(())
}
