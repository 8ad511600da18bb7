//! Batch client: replay a CSV of unseen full-feature examples against the
//! running API and print each response envelope.

use anyhow::{Context, Result};
use serde_json::Value;

use price_predictor::types::FullInputFeatures;

const EXAMPLES_PATH: &str = "data/future_unseen_examples.csv";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    dotenv::dotenv().ok();

    let url = std::env::var("API_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:8000/predict_full".to_string());
    let username = std::env::var("API_USERNAME").context("API_USERNAME not set")?;
    let password = std::env::var("API_PASSWORD").context("API_PASSWORD not set")?;

    let mut rdr = csv::Reader::from_path(EXAMPLES_PATH)
        .with_context(|| format!("failed to open examples CSV at {EXAMPLES_PATH}"))?;
    let client = reqwest::Client::new();

    let mut sent = 0usize;
    let mut failed = 0usize;
    for record in rdr.deserialize::<FullInputFeatures>() {
        let input = record.context("bad example record")?;
        let response = client
            .post(&url)
            .basic_auth(&username, Some(&password))
            .json(&input)
            .send()
            .await
            .context("request failed")?;

        let status = response.status();
        let body: Value = response.json().await.context("non-JSON response body")?;
        if status.is_success() {
            println!("Prediction: {body}");
        } else {
            println!("Error: {status} {body}");
            failed += 1;
        }
        sent += 1;
    }
    tracing::info!("sent {sent} requests, {failed} failed");

    Ok(())
}
