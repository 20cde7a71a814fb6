use anyhow::Result;
use pinq_notify::{NotifyConfig, NotifyStatus};
use pinq_store::FsPendingStore;

pub async fn run_notify(store: &FsPendingStore) -> Result<()> {
    let config = NotifyConfig::from_env();
    let report = pinq_notify::run(store, &config).await;

    match report.status {
        NotifyStatus::NothingPending => println!("No pending pins found"),
        NotifyStatus::IssueCreated => println!("Created issue for pending pins"),
        NotifyStatus::Posted => println!("Posted pending-pin summary to webhook"),
        NotifyStatus::SummaryOnly => {
            println!("Could not create issue automatically. Summary:\n");
            print!("{}", report.summary);
        }
    }
    println!("status: {}", report.status);
    Ok(())
}
