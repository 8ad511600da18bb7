//! Offline training: fit the robust-scaler + KNN pipeline on the King
//! County sales data merged with zipcode demographics, then export the
//! model artifact and feature list consumed by the server.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use price_predictor::features::ZipcodeTable;
use price_predictor::model::{Model, ModelArtifact};

const SALES_PATH: &str = "data/kc_house_data.csv";
const DEMOGRAPHICS_PATH: &str = "data/zipcode_demographics.csv";
const OUTPUT_DIR: &str = "model";

// Columns taken from the sales data; price is the target, zipcode the
// join key, the rest are model inputs in this order.
const TARGET_COLUMN: &str = "price";
const ZIPCODE_COLUMN: &str = "zipcode";
const PROPERTY_COLUMNS: &[&str] = &[
    "bedrooms",
    "bathrooms",
    "sqft_living",
    "sqft_lot",
    "floors",
    "sqft_above",
    "sqft_basement",
];

const N_NEIGHBORS: usize = 5;
const TEST_FRACTION: f64 = 0.25;
const SPLIT_SEED: u64 = 42;

struct Dataset {
    feature_names: Vec<String>,
    rows: Vec<Vec<f64>>,
    targets: Vec<f64>,
}

/// Merge sales and demographics on zipcode. Sales rows whose zipcode has
/// no demographics are dropped.
fn load_data(sales_path: &str, demographics: &ZipcodeTable) -> Result<Dataset> {
    let mut rdr = csv::Reader::from_path(sales_path)
        .with_context(|| format!("failed to open sales CSV at {sales_path}"))?;
    let headers = rdr.headers().context("failed to read sales header")?.clone();

    let index_of = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("sales CSV has no {name} column"))
    };
    let target_idx = index_of(TARGET_COLUMN)?;
    let zipcode_idx = index_of(ZIPCODE_COLUMN)?;
    let property_idx: Vec<usize> = PROPERTY_COLUMNS
        .iter()
        .map(|name| index_of(name))
        .collect::<Result<_>>()?;

    let mut rows = Vec::new();
    let mut targets = Vec::new();
    let mut dropped = 0usize;
    for (line, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("bad sales record on row {}", line + 2))?;
        let field = |idx: usize| -> Result<f64> {
            record
                .get(idx)
                .unwrap_or_default()
                .trim()
                .parse()
                .with_context(|| format!("non-numeric sales value on row {}", line + 2))
        };

        let zipcode: u32 = record
            .get(zipcode_idx)
            .unwrap_or_default()
            .trim()
            .parse()
            .with_context(|| format!("bad zipcode on row {}", line + 2))?;
        let Some(demo_row) = demographics.get(zipcode) else {
            dropped += 1;
            continue;
        };

        let mut row = Vec::with_capacity(property_idx.len() + demo_row.len());
        for &idx in &property_idx {
            row.push(field(idx)?);
        }
        row.extend_from_slice(demo_row);
        rows.push(row);
        targets.push(field(target_idx)?);
    }
    if dropped > 0 {
        tracing::warn!("dropped {dropped} sales rows with no matching demographics");
    }
    if rows.is_empty() {
        bail!("no usable sales rows after the demographics merge");
    }

    let mut feature_names: Vec<String> =
        PROPERTY_COLUMNS.iter().map(|s| s.to_string()).collect();
    feature_names.extend(demographics.columns().iter().cloned());

    Ok(Dataset {
        feature_names,
        rows,
        targets,
    })
}

/// Linear-interpolated quantile of a sorted slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = (sorted.len() - 1) as f64 * q;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
    }
}

/// Per-column median and interquartile range. Zero ranges become 1.0 so
/// constant columns pass through unscaled.
fn fit_robust_scaler(rows: &[Vec<f64>]) -> (Vec<f64>, Vec<f64>) {
    let width = rows[0].len();
    let mut center = Vec::with_capacity(width);
    let mut scale = Vec::with_capacity(width);
    for col in 0..width {
        let mut values: Vec<f64> = rows.iter().map(|row| row[col]).collect();
        values.sort_by(f64::total_cmp);
        center.push(quantile(&values, 0.5));
        let iqr = quantile(&values, 0.75) - quantile(&values, 0.25);
        scale.push(if iqr == 0.0 { 1.0 } else { iqr });
    }
    (center, scale)
}

fn scale_rows(rows: &[Vec<f64>], center: &[f64], scale: &[f64]) -> Vec<Vec<f64>> {
    rows.iter()
        .map(|row| {
            row.iter()
                .zip(center.iter().zip(scale.iter()))
                .map(|(x, (c, s))| (x - c) / s)
                .collect()
        })
        .collect()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let demographics = ZipcodeTable::load(DEMOGRAPHICS_PATH)?;
    let data = load_data(SALES_PATH, &demographics)?;
    tracing::info!(
        "loaded {} rows with {} features",
        data.rows.len(),
        data.feature_names.len()
    );

    // Seeded split so reruns produce the same artifact.
    let mut indices: Vec<usize> = (0..data.rows.len()).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(SPLIT_SEED));
    let test_len = ((data.rows.len() as f64) * TEST_FRACTION).round() as usize;
    let (test_idx, train_idx) = indices.split_at(test_len);

    let train_rows: Vec<Vec<f64>> = train_idx.iter().map(|&i| data.rows[i].clone()).collect();
    let train_targets: Vec<f64> = train_idx.iter().map(|&i| data.targets[i]).collect();

    let (center, scale) = fit_robust_scaler(&train_rows);
    let artifact = ModelArtifact {
        n_neighbors: N_NEIGHBORS,
        train: scale_rows(&train_rows, &center, &scale),
        targets: train_targets,
        center,
        scale,
    };

    // Evaluate on the held-out split before writing anything.
    let artifact_json = serde_json::to_string(&artifact)?;
    let model = Model::from_artifact(artifact)?;
    let mut squared = 0.0;
    let mut absolute = 0.0;
    for &i in test_idx {
        let y_hat = model.predict(&data.rows[i])?[0];
        let err = y_hat - data.targets[i];
        squared += err * err;
        absolute += err.abs();
    }
    let n = test_idx.len() as f64;
    let rmse = (squared / n).sqrt();
    let mae = absolute / n;
    let mean_y = test_idx.iter().map(|&i| data.targets[i]).sum::<f64>() / n;
    let ss_tot: f64 = test_idx
        .iter()
        .map(|&i| (data.targets[i] - mean_y).powi(2))
        .sum();
    let r2 = 1.0 - squared / ss_tot;
    tracing::info!("test metrics: rmse={rmse:.2} mae={mae:.2} r2={r2:.4}");

    let output_dir = PathBuf::from(OUTPUT_DIR);
    fs::create_dir_all(&output_dir).context("failed to create output directory")?;
    fs::write(output_dir.join("model.json"), artifact_json)
        .context("failed to write model artifact")?;
    fs::write(
        output_dir.join("model_features.json"),
        serde_json::to_string(&data.feature_names)?,
    )
    .context("failed to write feature list")?;
    tracing::info!("wrote artifacts to {}", output_dir.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&values, 0.0), 1.0);
        assert_eq!(quantile(&values, 1.0), 4.0);
        assert_eq!(quantile(&values, 0.5), 2.5);
    }

    #[test]
    fn robust_scaler_handles_constant_columns() {
        let rows = vec![
            vec![1.0, 5.0],
            vec![2.0, 5.0],
            vec![3.0, 5.0],
            vec![4.0, 5.0],
        ];
        let (center, scale) = fit_robust_scaler(&rows);
        assert_eq!(center, vec![2.5, 5.0]);
        assert_eq!(scale[0], 1.5);
        assert_eq!(scale[1], 1.0);

        let scaled = scale_rows(&rows, &center, &scale);
        assert_eq!(scaled[0][1], 0.0);
        assert!((scaled[0][0] - (-1.0)).abs() < 1e-9);
    }
}
