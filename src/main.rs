// src/main.rs
use anyhow::anyhow;
use tokio_util::sync::CancellationToken;
use tracing::info;

use p2b_probe::probe::Probe;
use p2b_probe::sign::Credentials;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_env_filter("info").init();

    let host = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow!("usage: p2b-probe <host>"))?;
    let credentials = Credentials::from_env()?;

    let cancel = CancellationToken::new();
    let signal = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        signal.cancel();
    });

    info!("probing {host}");
    let mut probe = Probe::new(host, credentials);
    let report = probe.run(cancel).await?;

    if report.error {
        std::process::exit(1);
    }
    Ok(())
}
