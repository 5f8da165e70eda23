// Word-level explanations
pub mod explain;

// Volatility and price history
pub mod market_data;

// Model artifacts and inference
pub mod ml;

// Entry points
pub mod pipeline;
pub mod session;

pub use pipeline::ReactionPredictor;
pub use session::{AnalysisReport, AnalysisSession};
