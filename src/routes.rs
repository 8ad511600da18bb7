use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::headers::authorization::Basic;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::auth;
use crate::config::Settings;
use crate::error::ApiError;
use crate::features::ZipcodeTable;
use crate::logger::{FullLogRecord, PredictionLog, ShortLogRecord};
use crate::model::Model;
use crate::types::{FullInputFeatures, InputFeatures, ModelInfo, PredictionResponse};
use crate::ui;

#[derive(Clone)]
pub struct AppState {
    pub model: Arc<Model>,
    /// Authoritative input order, from the feature-list artifact.
    pub feature_names: Arc<Vec<String>>,
    pub zipcodes: Arc<ZipcodeTable>,
    pub log: Arc<PredictionLog>,
    pub settings: Arc<Settings>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/predict_full", post(predict_full))
        .route("/api/logs", get(logs))
        .route("/model", get(model_info))
        .route("/health", get(health))
        .merge(ui::router())
        .with_state(state)
}

type BasicAuth = Option<TypedHeader<Authorization<Basic>>>;

fn check_auth(state: &AppState, credentials: BasicAuth) -> Result<(), ApiError> {
    let TypedHeader(Authorization(credentials)) = credentials.ok_or(ApiError::Unauthorized)?;
    auth::verify(&state.settings, &credentials)
}

/// Concatenate the property fields with the zipcode demographics in the
/// fixed, order-significant layout the model was trained on.
fn assemble_input(state: &AppState, zipcode: u32, property: Vec<f64>) -> Result<Vec<f64>, ApiError> {
    let row = state
        .zipcodes
        .get(zipcode)
        .ok_or(ApiError::ZipcodeNotFound(zipcode))?;
    let mut input = property;
    input.extend_from_slice(row);
    Ok(input)
}

fn envelope<F>(state: &AppState, prediction: Vec<f64>, features: F) -> PredictionResponse<F> {
    PredictionResponse {
        id: Uuid::new_v4().to_string(),
        timestamp: Utc::now().to_rfc3339(),
        prediction,
        model: ModelInfo {
            experiment_id: state.settings.experiment_id.clone(),
            run_id: state.settings.run_id.clone(),
        },
        features,
    }
}

async fn predict(
    State(state): State<AppState>,
    credentials: BasicAuth,
    Json(payload): Json<InputFeatures>,
) -> Result<Json<PredictionResponse<InputFeatures>>, ApiError> {
    check_auth(&state, credentials)?;

    let input = assemble_input(&state, payload.zipcode, payload.property_vector())?;
    let prediction = state.model.predict(&input)?;
    let response = envelope(&state, prediction, payload);

    // Fire and forget; a logging failure never fails the request.
    let record = ShortLogRecord::new(
        &response.id,
        &response.timestamp,
        response.prediction[0],
        &response.model,
        &response.features,
    );
    let log = state.log.clone();
    tokio::task::spawn_blocking(move || {
        if let Err(err) = log.append_short(&record) {
            tracing::warn!("failed to log prediction: {err:#}");
        }
    });

    Ok(Json(response))
}

async fn predict_full(
    State(state): State<AppState>,
    credentials: BasicAuth,
    Json(payload): Json<FullInputFeatures>,
) -> Result<Json<PredictionResponse<FullInputFeatures>>, ApiError> {
    check_auth(&state, credentials)?;

    let input = assemble_input(&state, payload.zipcode, payload.property_vector())?;
    let prediction = state.model.predict(&input)?;
    let response = envelope(&state, prediction, payload);

    let record = FullLogRecord::new(
        &response.id,
        &response.timestamp,
        response.prediction[0],
        &response.model,
        &response.features,
    );
    let log = state.log.clone();
    tokio::task::spawn_blocking(move || {
        if let Err(err) = log.append_full(&record) {
            tracing::warn!("failed to log prediction: {err:#}");
        }
    });

    Ok(Json(response))
}

/// Logged full-input predictions for the dashboard charts.
async fn logs(State(state): State<AppState>) -> Result<Json<Vec<Value>>, ApiError> {
    let log = state.log.clone();
    let rows = tokio::task::spawn_blocking(move || log.read_full())
        .await
        .map_err(|err| ApiError::Prediction(err.to_string()))??;
    Ok(Json(rows))
}

/// Model identifiers and the authoritative feature order.
async fn model_info(State(state): State<AppState>) -> Json<Value> {
    Json(serde_json::json!({
        "experiment_id": state.settings.experiment_id,
        "run_id": state.settings.run_id,
        "n_features": state.feature_names.len(),
        "features": &*state.feature_names,
    }))
}

async fn health() -> &'static str {
    "OK"
}
