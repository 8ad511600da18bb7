use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::types::{FullInputFeatures, InputFeatures, ModelInfo};

/// Flattened log row for the short request shape.
#[derive(Debug, Serialize)]
pub struct ShortLogRecord {
    pub id: String,
    pub timestamp: String,
    pub prediction: f64,
    pub experiment_id: String,
    pub run_id: String,
    pub zipcode: u32,
    pub bedrooms: f64,
    pub bathrooms: f64,
    pub sqft_living: f64,
    pub sqft_lot: f64,
    pub floors: f64,
    pub sqft_above: f64,
    pub sqft_basement: f64,
}

impl ShortLogRecord {
    pub fn new(id: &str, timestamp: &str, prediction: f64, model: &ModelInfo, f: &InputFeatures) -> Self {
        Self {
            id: id.to_string(),
            timestamp: timestamp.to_string(),
            prediction,
            experiment_id: model.experiment_id.clone(),
            run_id: model.run_id.clone(),
            zipcode: f.zipcode,
            bedrooms: f.bedrooms,
            bathrooms: f.bathrooms,
            sqft_living: f.sqft_living,
            sqft_lot: f.sqft_lot,
            floors: f.floors,
            sqft_above: f.sqft_above,
            sqft_basement: f.sqft_basement,
        }
    }
}

/// Flattened log row for the full request shape.
#[derive(Debug, Serialize)]
pub struct FullLogRecord {
    pub id: String,
    pub timestamp: String,
    pub prediction: f64,
    pub experiment_id: String,
    pub run_id: String,
    pub bedrooms: f64,
    pub bathrooms: f64,
    pub sqft_living: f64,
    pub sqft_lot: f64,
    pub floors: f64,
    pub waterfront: f64,
    pub view: f64,
    pub condition: f64,
    pub grade: f64,
    pub sqft_above: f64,
    pub sqft_basement: f64,
    pub yr_built: f64,
    pub yr_renovated: f64,
    pub zipcode: u32,
    pub lat: f64,
    pub long: f64,
    pub sqft_living15: f64,
    pub sqft_lot15: f64,
}

impl FullLogRecord {
    pub fn new(
        id: &str,
        timestamp: &str,
        prediction: f64,
        model: &ModelInfo,
        f: &FullInputFeatures,
    ) -> Self {
        Self {
            id: id.to_string(),
            timestamp: timestamp.to_string(),
            prediction,
            experiment_id: model.experiment_id.clone(),
            run_id: model.run_id.clone(),
            bedrooms: f.bedrooms,
            bathrooms: f.bathrooms,
            sqft_living: f.sqft_living,
            sqft_lot: f.sqft_lot,
            floors: f.floors,
            waterfront: f.waterfront,
            view: f.view,
            condition: f.condition,
            grade: f.grade,
            sqft_above: f.sqft_above,
            sqft_basement: f.sqft_basement,
            yr_built: f.yr_built,
            yr_renovated: f.yr_renovated,
            zipcode: f.zipcode,
            lat: f.lat,
            long: f.long,
            sqft_living15: f.sqft_living15,
            sqft_lot15: f.sqft_lot15,
        }
    }
}

/// Append-only CSV prediction log. Appends are serialized with a mutex so
/// the header-on-create decision and row writes cannot interleave.
pub struct PredictionLog {
    short_path: PathBuf,
    full_path: PathBuf,
    lock: Mutex<()>,
}

impl PredictionLog {
    pub fn new(short_path: impl Into<PathBuf>, full_path: impl Into<PathBuf>) -> Self {
        Self {
            short_path: short_path.into(),
            full_path: full_path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn append_short(&self, record: &ShortLogRecord) -> Result<()> {
        self.append(&self.short_path, record)
    }

    pub fn append_full(&self, record: &FullLogRecord) -> Result<()> {
        self.append(&self.full_path, record)
    }

    fn append<T: Serialize>(&self, path: &Path, record: &T) -> Result<()> {
        let _guard = self.lock.lock();

        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            }
        }

        // Header only when the file is created.
        let write_header = !path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);
        writer
            .serialize(record)
            .with_context(|| format!("failed to append to log file {}", path.display()))?;
        writer.flush().context("failed to flush log file")?;
        Ok(())
    }

    /// The full-input log as JSON objects, numbers parsed where possible.
    /// An absent file is an empty log, not an error.
    pub fn read_full(&self) -> Result<Vec<Value>> {
        let _guard = self.lock.lock();

        if !self.full_path.exists() {
            return Ok(Vec::new());
        }
        let mut rdr = csv::Reader::from_path(&self.full_path)
            .with_context(|| format!("failed to open log file {}", self.full_path.display()))?;
        let headers = rdr.headers().context("failed to read log header")?.clone();

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record.context("bad log record")?;
            let mut obj = Map::new();
            for (header, field) in headers.iter().zip(record.iter()) {
                let value = match field.parse::<f64>() {
                    Ok(n) => serde_json::Number::from_f64(n)
                        .map(Value::Number)
                        .unwrap_or_else(|| Value::String(field.to_string())),
                    Err(_) => Value::String(field.to_string()),
                };
                obj.insert(header.to_string(), value);
            }
            rows.push(Value::Object(obj));
        }
        Ok(rows)
    }
}
