use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};

/// Static per-zipcode demographic features, loaded once per process and
/// shared read-only. Column order follows the source CSV and is
/// order-significant when assembling model input.
#[derive(Debug)]
pub struct ZipcodeTable {
    columns: Vec<String>,
    rows: HashMap<u32, Vec<f64>>,
}

impl ZipcodeTable {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open demographics CSV at {}", path.display()))?;
        Self::from_reader(file)
            .with_context(|| format!("failed to parse demographics CSV at {}", path.display()))
    }

    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers = rdr.headers().context("failed to read CSV header")?.clone();
        let zip_idx = headers
            .iter()
            .position(|h| h == "zipcode")
            .context("demographics CSV has no zipcode column")?;
        let columns: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != zip_idx)
            .map(|(_, h)| h.to_string())
            .collect();

        let mut rows = HashMap::new();
        for (line, record) in rdr.records().enumerate() {
            let record = record.with_context(|| format!("bad CSV record on row {}", line + 2))?;
            let zipcode: u32 = record
                .get(zip_idx)
                .unwrap_or_default()
                .trim()
                .parse()
                .with_context(|| format!("bad zipcode on row {}", line + 2))?;
            let mut values = Vec::with_capacity(columns.len());
            for (i, field) in record.iter().enumerate() {
                if i == zip_idx {
                    continue;
                }
                let value: f64 = field.trim().parse().with_context(|| {
                    format!("non-numeric value {field:?} for zipcode {zipcode}")
                })?;
                values.push(value);
            }
            rows.insert(zipcode, values);
        }
        if rows.is_empty() {
            bail!("demographics CSV contains no rows");
        }

        Ok(Self { columns, rows })
    }

    /// `None` when the zipcode is absent, the only modeled runtime failure.
    pub fn get(&self, zipcode: u32) -> Option<&[f64]> {
        self.rows.get(&zipcode).map(|v| v.as_slice())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
