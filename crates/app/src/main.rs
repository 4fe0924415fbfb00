//! `tims` command-line entry point.

use tims_app::{AppState, Command, Notifier, run};
use tims_client::ClientConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tims_observability::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = Command::parse(&args)?;

    let config = ClientConfig::from_env();
    tracing::debug!(base_url = %config.base_url, "starting");
    let state = AppState::from_config(config)?;
    let notifier = Notifier::subscribe(&state.signals);
    state.restore();

    let result = run(&state, command).await;

    for notification in notifier.drain() {
        eprintln!("[{}] {}", notification.level, notification.message);
    }

    let value = result?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
