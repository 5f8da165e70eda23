#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use newsreact::application::ml::ModelPaths;
use newsreact::domain::types::PricePoint;
use std::path::PathBuf;
use uuid::Uuid;

pub const SCALER_JSON: &str = r#"{
    "kind": "standard",
    "mean": [5000.0, 0.0, 0.0, 0.0],
    "scale": [2500.0, 0.05, 0.1, 0.02],
    "feature_names": ["price_before", "last_close_gap", "pre_event_return", "pre_event_volatility"]
}"#;

/// Two-dimensional sentiment embedding: coordinate 0 is +1 for good news
/// words and -1 for bad news words.
pub const EMBEDDING_JSON: &str = r#"{
    "dim": 2,
    "normalize": true,
    "lowercase": true,
    "vocab": ["record", "profit", "surge", "laba", "naik", "loss", "rugi", "turun"],
    "vectors": [[1.0, 0.2], [1.0, 0.0], [1.0, 0.1], [1.0, 0.0], [1.0, 0.0],
                [-1.0, 0.0], [-1.0, 0.1], [-1.0, 0.0]]
}"#;

/// Input = [emb_0, emb_1, price_before, last_close_gap, pre_event_return, pre_event_volatility].
pub const MODEL_JSON: &str = r#"{
    "base_score": 0.001,
    "num_features": 6,
    "trees": [
        {"nodeid": 0, "split": "f0", "split_condition": 0.3, "yes": 1, "no": 2, "missing": 1,
         "children": [{"nodeid": 1, "leaf": 0.0}, {"nodeid": 2, "leaf": 0.02}]},
        {"nodeid": 0, "split": "f0", "split_condition": -0.3, "yes": 1, "no": 2, "missing": 2,
         "children": [{"nodeid": 1, "leaf": -0.02}, {"nodeid": 2, "leaf": 0.0}]},
        {"nodeid": 0, "split": "f3", "split_condition": 0.0, "yes": 1, "no": 2, "missing": 2,
         "children": [{"nodeid": 1, "leaf": -0.001}, {"nodeid": 2, "leaf": 0.001}]}
    ]
}"#;

/// Directory under the system temp dir, removed on drop.
pub struct TempModelDir {
    pub path: PathBuf,
}

impl TempModelDir {
    pub fn new() -> Self {
        let path = std::env::temp_dir().join(format!("newsreact-test-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&path).unwrap();
        Self { path }
    }

    pub fn with_default_artifacts() -> Self {
        let dir = Self::new();
        dir.write("scaler.json", SCALER_JSON);
        dir.write("embedding.json", EMBEDDING_JSON);
        dir.write("xgb_model.json", MODEL_JSON);
        dir
    }

    pub fn write(&self, name: &str, contents: &str) {
        std::fs::write(self.path.join(name), contents).unwrap();
    }

    pub fn paths(&self) -> ModelPaths {
        ModelPaths::in_dir(&self.path, "scaler.json", "xgb_model.json", "embedding.json")
    }
}

impl Drop for TempModelDir {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.path).ok();
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// One close per calendar day starting at `from`.
pub fn series(from: &str, closes: &[f64]) -> Vec<PricePoint> {
    let start = date(from);
    closes
        .iter()
        .enumerate()
        .map(|(i, close)| PricePoint {
            date: start + Duration::days(i as i64),
            close: *close,
        })
        .collect()
}
