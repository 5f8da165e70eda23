use super::predictor::Regressor;
use crate::domain::errors::PipelineError;
use ort::session::Session;
use ort::value::ValueType;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Regression model exported to ONNX (e.g. via onnxmltools from XGBoost).
///
/// Input: one `[batch, num_features]` f32 tensor. Output: first output tensor,
/// one f32 per row.
pub struct OnnxRegressor {
    session: Mutex<Session>,
    num_features: usize,
}

impl OnnxRegressor {
    /// `num_features` must come from the other artifacts since the graph input
    /// may declare a dynamic width.
    pub fn load(path: &Path, num_features: usize) -> Result<Self, PipelineError> {
        if !path.exists() {
            return Err(PipelineError::artifact(
                "regression model",
                format!("ONNX model file not found at {:?}", path),
            ));
        }

        let session = Session::builder()
            .map_err(|e| {
                PipelineError::artifact(
                    "regression model",
                    format!("failed to create ONNX session builder: {}", e),
                )
            })?
            .commit_from_file(path)
            .map_err(|e| PipelineError::artifact("regression model", e))?;

        let input = session.inputs().first().ok_or_else(|| {
            PipelineError::artifact("regression model", "ONNX graph declares no inputs")
        })?;
        if let ValueType::Tensor { shape, .. } = input.dtype() {
            check_declared_width(shape, num_features)?;
        }

        info!("Successfully loaded ONNX model from {:?}", path);
        Ok(Self {
            session: Mutex::new(session),
            num_features,
        })
    }

    fn run(&self, flat_data: Vec<f32>, batch: usize) -> Result<Vec<f64>, PipelineError> {
        let mut session = self
            .session
            .lock()
            .map_err(|e| PipelineError::inference(format!("Mutex lock failed: {}", e)))?;

        let shape = vec![batch, self.num_features];
        let input_value = ort::value::Value::from_array((shape.as_slice(), flat_data))
            .map_err(|e| PipelineError::inference(format!("Input value creation failed: {}", e)))?;

        let inputs = ort::inputs![input_value];

        let outputs = session.run(inputs).map_err(PipelineError::inference)?;
        let output_value = outputs
            .iter()
            .next()
            .map(|(_, v)| v)
            .ok_or_else(|| PipelineError::inference("No output found"))?;
        let data = output_value
            .try_extract_tensor::<f32>()
            .map_err(PipelineError::inference)?;

        let predictions: Vec<f64> = data.1.iter().map(|v| *v as f64).collect();
        if predictions.len() != batch {
            return Err(PipelineError::inference(format!(
                "expected {} outputs, got {}",
                batch,
                predictions.len()
            )));
        }
        Ok(predictions)
    }

    fn check_width(&self, row: &[f32]) -> Result<(), PipelineError> {
        if row.len() != self.num_features {
            return Err(PipelineError::FeatureDimension {
                expected: self.num_features,
                actual: row.len(),
            });
        }
        Ok(())
    }
}

/// Reject a graph whose fixed feature dimension differs from `expected`.
/// Dynamic dimensions (negative) are accepted.
fn check_declared_width(dimensions: &[i64], expected: usize) -> Result<(), PipelineError> {
    match dimensions.last() {
        Some(&width) if width >= 0 && width as usize != expected => {
            Err(PipelineError::artifact(
                "regression model",
                format!(
                    "ONNX input shape {:?} takes {} features, expected {}",
                    dimensions, width, expected
                ),
            ))
        }
        _ => Ok(()),
    }
}

impl Regressor for OnnxRegressor {
    fn predict(&self, features: &[f32]) -> Result<f64, PipelineError> {
        self.check_width(features)?;
        let out = self.run(features.to_vec(), 1)?;
        Ok(out[0])
    }

    fn predict_batch(&self, rows: &[Vec<f32>]) -> Result<Vec<f64>, PipelineError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        for row in rows {
            self.check_width(row)?;
        }
        let flat_data: Vec<f32> = rows.iter().flatten().copied().collect();
        self.run(flat_data, rows.len())
    }

    fn num_features(&self) -> usize {
        self.num_features
    }

    fn name(&self) -> &str {
        "ONNX Runtime"
    }
}
