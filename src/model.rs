use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// On-disk form of the trained pipeline: robust-scaler parameters plus the
/// scaled training matrix and targets of the k-nearest-neighbors regressor.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub n_neighbors: usize,
    /// Per-column median, applied before scaling.
    pub center: Vec<f64>,
    /// Per-column interquartile range; zero ranges are stored as 1.0.
    pub scale: Vec<f64>,
    /// Training matrix, already robust-scaled, row-major.
    pub train: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
}

pub struct Model {
    n_neighbors: usize,
    center: Array1<f64>,
    scale: Array1<f64>,
    train: Array2<f64>,
    targets: Array1<f64>,
}

impl Model {
    /// Load the artifact and the feature-name list that fixes input order.
    pub fn load(model_path: &Path, features_path: &Path) -> Result<(Self, Vec<String>)> {
        let artifact_txt = fs::read_to_string(model_path)
            .with_context(|| format!("failed to read model artifact at {}", model_path.display()))?;
        let artifact: ModelArtifact =
            serde_json::from_str(&artifact_txt).context("failed to parse model artifact")?;

        let features_txt = fs::read_to_string(features_path).with_context(|| {
            format!("failed to read feature list at {}", features_path.display())
        })?;
        let feature_names: Vec<String> =
            serde_json::from_str(&features_txt).context("failed to parse feature list")?;

        let model = Self::from_artifact(artifact)?;
        if model.in_dim() != feature_names.len() {
            bail!(
                "model width ({}) != feature list length ({})",
                model.in_dim(),
                feature_names.len()
            );
        }

        Ok((model, feature_names))
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self> {
        if artifact.n_neighbors == 0 {
            bail!("n_neighbors must be at least 1");
        }
        if artifact.train.is_empty() {
            bail!("model artifact has an empty training matrix");
        }
        let width = artifact.center.len();
        if artifact.scale.len() != width {
            bail!(
                "scale length ({}) != center length ({})",
                artifact.scale.len(),
                width
            );
        }
        if artifact.scale.iter().any(|s| *s == 0.0) {
            bail!("scale contains zero entries");
        }
        if artifact.train.len() != artifact.targets.len() {
            bail!(
                "training matrix has {} rows but {} targets",
                artifact.train.len(),
                artifact.targets.len()
            );
        }

        let rows = artifact.train.len();
        let mut flat = Vec::with_capacity(rows * width);
        for (i, row) in artifact.train.iter().enumerate() {
            if row.len() != width {
                bail!("training row {} has width {}, expected {}", i, row.len(), width);
            }
            flat.extend_from_slice(row);
        }
        let train = Array2::from_shape_vec((rows, width), flat)
            .context("failed to shape training matrix")?;

        Ok(Self {
            n_neighbors: artifact.n_neighbors,
            center: Array1::from(artifact.center),
            scale: Array1::from(artifact.scale),
            train,
            targets: Array1::from(artifact.targets),
        })
    }

    pub fn in_dim(&self) -> usize {
        self.center.len()
    }

    /// Predict a price for one assembled feature vector. Returned as a
    /// one-element vector, the shape the response envelope carries.
    pub fn predict(&self, x: &[f64]) -> Result<Vec<f64>> {
        if x.len() != self.in_dim() {
            bail!(
                "feature length mismatch: got {}, expected {}",
                x.len(),
                self.in_dim()
            );
        }

        let query = (Array1::from(x.to_vec()) - &self.center) / &self.scale;

        // Squared distance is enough for ranking neighbors.
        let mut scored: Vec<(f64, f64)> = self
            .train
            .rows()
            .into_iter()
            .zip(self.targets.iter())
            .map(|(row, target)| {
                let d2 = row
                    .iter()
                    .zip(query.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f64>();
                (d2, *target)
            })
            .collect();

        let k = self.n_neighbors.min(scored.len());
        scored.select_nth_unstable_by(k - 1, |a, b| a.0.total_cmp(&b.0));
        let mean = scored[..k].iter().map(|(_, y)| y).sum::<f64>() / k as f64;

        Ok(vec![mean])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact() -> ModelArtifact {
        ModelArtifact {
            n_neighbors: 2,
            center: vec![0.0, 0.0],
            scale: vec![1.0, 1.0],
            train: vec![
                vec![0.0, 0.0],
                vec![1.0, 0.0],
                vec![10.0, 10.0],
            ],
            targets: vec![100.0, 200.0, 900.0],
        }
    }

    #[test]
    fn predicts_mean_of_k_nearest_targets() {
        let model = Model::from_artifact(artifact()).unwrap();
        let out = model.predict(&[0.1, 0.0]).unwrap();
        assert_eq!(out.len(), 1);
        // Two nearest rows are the first two; their targets average to 150.
        assert!((out[0] - 150.0).abs() < 1e-9);
    }

    #[test]
    fn input_length_mismatch_is_an_error() {
        let model = Model::from_artifact(artifact()).unwrap();
        let err = model.predict(&[1.0]).unwrap_err();
        assert!(err.to_string().contains("feature length mismatch"));
    }

    #[test]
    fn zero_scale_is_rejected() {
        let mut bad = artifact();
        bad.scale[1] = 0.0;
        assert!(Model::from_artifact(bad).is_err());
    }

    #[test]
    fn ragged_training_matrix_is_rejected() {
        let mut bad = artifact();
        bad.train[1] = vec![1.0];
        assert!(Model::from_artifact(bad).is_err());
    }

    #[test]
    fn k_larger_than_training_set_uses_all_rows() {
        let mut a = artifact();
        a.n_neighbors = 10;
        let model = Model::from_artifact(a).unwrap();
        let out = model.predict(&[0.0, 0.0]).unwrap();
        assert!((out[0] - 400.0).abs() < 1e-9);
    }
}
