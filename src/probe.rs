// src/probe.rs
use std::time::Duration;

use anyhow::anyhow;
use chrono::Utc;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::sign::Credentials;
use crate::types::{BALANCES_PATH, HEADER_APIKEY, HEADER_PAYLOAD, HEADER_SIGNATURE};

pub struct Probe {
    client: reqwest::Client,
    host: String,
    credentials: Credentials,
    interval: Duration,
    timeout: Duration,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ProbeReport {
    pub cycles: u64,
    pub error: bool,
}

// Some transports hand the JSON document back twice, back-to-back with no
// separator. Nobody has confirmed whether that is the server or the client,
// so keep collapsing it: even length and two byte-identical halves means we
// parse only the first half. Odd lengths and mismatched halves pass through.
pub fn collapse_duplicate(body: &str) -> &str {
    let bytes = body.as_bytes();
    if bytes.len() % 2 == 0 {
        let half = bytes.len() / 2;
        if bytes[..half] == bytes[half..] {
            return &body[..half];
        }
    }
    body
}

pub fn message_flags_error(doc: &Value) -> anyhow::Result<bool> {
    let message = doc
        .get("message")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("response has no message field: {doc}"))?;
    Ok(!message.is_empty())
}

impl Probe {
    pub fn new(host: String, credentials: Credentials) -> Self {
        let interval_ms: u64 = std::env::var("PROBE_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(200);
        let timeout_ms: u64 = std::env::var("PROBE_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);
        Self::with_timing(
            host,
            credentials,
            Duration::from_millis(interval_ms),
            Duration::from_millis(timeout_ms),
        )
    }

    pub fn with_timing(
        host: String,
        credentials: Credentials,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            host,
            credentials,
            interval,
            timeout,
        }
    }

    // One cycle: sign, POST, collapse, parse, inspect `message`.
    // Returns true when the API reported an error (non-empty message).
    // Transport and parse failures propagate; the loop does not retry.
    pub async fn check(&mut self) -> anyhow::Result<bool> {
        let signed = self.credentials.sign(BALANCES_PATH)?;

        let raw = self
            .client
            .post(format!("{}{}", self.host, BALANCES_PATH))
            .header("Content-Type", "application/json")
            .header(HEADER_APIKEY, self.credentials.api_key())
            .header(HEADER_PAYLOAD, &signed.payload)
            .header(HEADER_SIGNATURE, &signed.signature)
            .body(signed.body)
            .timeout(self.timeout)
            .send()
            .await?
            .text()
            .await?;

        let body = collapse_duplicate(&raw);
        let doc: Value = serde_json::from_str(body)
            .map_err(|e| anyhow!("unparsable response body {body:?}: {e}"))?;

        println!("{doc}");
        let error = message_flags_error(&doc)?;
        println!("{error}");

        Ok(error)
    }

    // Polls until the API reports an error or the token is cancelled.
    // The cycle counter lives here and comes back in the report, so tests
    // can terminate the loop deterministically.
    pub async fn run(&mut self, cancel: CancellationToken) -> anyhow::Result<ProbeReport> {
        let mut cycles: u64 = 0;
        loop {
            if cancel.is_cancelled() {
                info!("probe cancelled after {cycles} cycles");
                return Ok(ProbeReport { cycles, error: false });
            }
            cycles += 1;
            println!("{}  {}", Utc::now().timestamp_millis() as f64 / 1000.0, cycles);

            if self.check().await? {
                error!("api reported an error on cycle {cycles}");
                return Ok(ProbeReport { cycles, error: true });
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("probe cancelled after {cycles} cycles");
                    return Ok(ProbeReport { cycles, error: false });
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}
