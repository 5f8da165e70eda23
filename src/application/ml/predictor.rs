use crate::domain::errors::PipelineError;

/// Interface for the frozen regression model.
pub trait Regressor: Send + Sync {
    /// Predict the fractional price change for one feature row.
    fn predict(&self, features: &[f32]) -> Result<f64, PipelineError>;

    /// Predict a batch of rows. Output order matches input order.
    fn predict_batch(&self, rows: &[Vec<f32>]) -> Result<Vec<f64>, PipelineError> {
        rows.iter().map(|row| self.predict(row)).collect()
    }

    /// Input width the model was fit on.
    fn num_features(&self) -> usize;

    /// Get model name/type
    fn name(&self) -> &str;
}
