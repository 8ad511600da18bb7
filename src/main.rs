use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use price_predictor::config::Settings;
use price_predictor::features::ZipcodeTable;
use price_predictor::logger::PredictionLog;
use price_predictor::model::Model;
use price_predictor::routes::{self, AppState};

// Property fields sent by clients, in model input order. The demographic
// columns follow these in the assembled vector.
const PROPERTY_FIELDS: usize = 7;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::load()?;

    let (model, feature_names) = Model::load(
        Path::new(&settings.model_path),
        Path::new(&settings.features_path),
    )?;
    let zipcodes = ZipcodeTable::load(&settings.demographics_path)?;

    if PROPERTY_FIELDS + zipcodes.columns().len() != feature_names.len() {
        tracing::warn!(
            "assembled input width ({} property + {} demographic) != feature list length ({})",
            PROPERTY_FIELDS,
            zipcodes.columns().len(),
            feature_names.len()
        );
    }

    // Warmup forward so the first request does not pay for cold paths.
    let _ = model.predict(&vec![0.0; feature_names.len()])?;
    tracing::info!(
        "loaded model; {} features, {} zipcodes",
        feature_names.len(),
        zipcodes.len()
    );

    let log = PredictionLog::new(&settings.log_path, &settings.full_log_path);
    let port = settings.port;
    let state = AppState {
        model: Arc::new(model),
        feature_names: Arc::new(feature_names),
        zipcodes: Arc::new(zipcodes),
        log: Arc::new(log),
        settings: Arc::new(settings),
    };

    let app = routes::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
