use serde::{Deserialize, Serialize};

/// Short request shape: the property fields the model was trained on.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputFeatures {
    pub zipcode: u32,
    pub bedrooms: f64,
    pub bathrooms: f64,
    pub sqft_living: f64,
    pub sqft_lot: f64,
    pub floors: f64,
    pub sqft_above: f64,
    pub sqft_basement: f64,
}

/// Full sale-record shape. Only the selected property fields feed the
/// model; the rest are echoed back and logged.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FullInputFeatures {
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

impl InputFeatures {
    /// Model input order for the property half of the feature vector.
    pub fn property_vector(&self) -> Vec<f64> {
        vec![
            self.bedrooms,
            self.bathrooms,
            self.sqft_living,
            self.sqft_lot,
            self.floors,
            self.sqft_above,
            self.sqft_basement,
        ]
    }
}

impl FullInputFeatures {
    /// Same selection and order as the short shape.
    pub fn property_vector(&self) -> Vec<f64> {
        vec![
            self.bedrooms,
            self.bathrooms,
            self.sqft_living,
            self.sqft_lot,
            self.floors,
            self.sqft_above,
            self.sqft_basement,
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub experiment_id: String,
    pub run_id: String,
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse<F> {
    pub id: String,
    pub timestamp: String,
    pub prediction: Vec<f64>,
    pub model: ModelInfo,
    pub features: F,
}
