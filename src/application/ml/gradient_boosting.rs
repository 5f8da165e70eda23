//! Gradient-boosted regression trees read from an XGBoost JSON tree dump.
//!
//! The artifact wraps the output of `Booster.dump_model(..., dump_format="json")`:
//!
//! ```json
//! {
//!   "base_score": 0.0,
//!   "num_features": 388,
//!   "feature_names": null,
//!   "trees": [
//!     {"nodeid": 0, "split": "f384", "split_condition": 0.5, "yes": 1, "no": 2, "missing": 1,
//!      "children": [{"nodeid": 1, "leaf": 0.004}, {"nodeid": 2, "leaf": -0.002}]}
//!   ]
//! }
//! ```
//!
//! Routing follows XGBoost: `x < split_condition` goes to `yes`, NaN goes to `missing`.

use super::predictor::Regressor;
use crate::domain::errors::PipelineError;
use rayon::prelude::*;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

const ARTIFACT: &str = "regression model";

#[derive(Debug, Deserialize)]
struct BoosterDump {
    #[serde(default)]
    base_score: f64,
    num_features: usize,
    #[serde(default)]
    feature_names: Option<Vec<String>>,
    trees: Vec<DumpNode>,
}

#[derive(Debug, Deserialize)]
struct DumpNode {
    nodeid: usize,
    #[serde(default)]
    leaf: Option<f64>,
    #[serde(default)]
    split: Option<String>,
    #[serde(default)]
    split_condition: Option<f64>,
    #[serde(default)]
    yes: Option<usize>,
    #[serde(default)]
    no: Option<usize>,
    #[serde(default)]
    missing: Option<usize>,
    #[serde(default)]
    children: Vec<DumpNode>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Node {
    Split {
        feature: usize,
        threshold: f32,
        yes: usize,
        no: usize,
        missing: usize,
    },
    Leaf(f64),
}

#[derive(Debug, Clone)]
struct RegressionTree {
    /// Indexed by XGBoost node id.
    nodes: Vec<Node>,
}

impl RegressionTree {
    fn from_dump(
        root: &DumpNode,
        num_features: usize,
        feature_names: Option<&[String]>,
    ) -> Result<Self, PipelineError> {
        if root.nodeid != 0 {
            return Err(PipelineError::artifact(
                ARTIFACT,
                format!("tree root has node id {}, expected 0", root.nodeid),
            ));
        }

        let mut slots: Vec<Option<Node>> = Vec::new();
        let mut stack = vec![root];

        while let Some(node) = stack.pop() {
            let parsed = match node.leaf {
                Some(value) => Node::Leaf(value),
                None => {
                    let split = node.split.as_deref().ok_or_else(|| {
                        PipelineError::artifact(
                            ARTIFACT,
                            format!("node {} has neither leaf nor split", node.nodeid),
                        )
                    })?;
                    let feature = resolve_feature(split, feature_names)?;
                    if feature >= num_features {
                        return Err(PipelineError::artifact(
                            ARTIFACT,
                            format!(
                                "node {} splits on feature {} but model declares {} features",
                                node.nodeid, feature, num_features
                            ),
                        ));
                    }
                    let (Some(threshold), Some(yes), Some(no)) =
                        (node.split_condition, node.yes, node.no)
                    else {
                        return Err(PipelineError::artifact(
                            ARTIFACT,
                            format!("split node {} is incomplete", node.nodeid),
                        ));
                    };
                    let missing = node.missing.unwrap_or(yes);

                    // Routing may only descend into the node's own children, so
                    // with unique ids the tree cannot contain a cycle.
                    if let Some(target) = [yes, no, missing]
                        .into_iter()
                        .find(|id| !node.children.iter().any(|c| c.nodeid == *id))
                    {
                        return Err(PipelineError::artifact(
                            ARTIFACT,
                            format!(
                                "split node {} routes to {}, which is not one of its children",
                                node.nodeid, target
                            ),
                        ));
                    }

                    Node::Split {
                        feature,
                        threshold: threshold as f32,
                        yes,
                        no,
                        missing,
                    }
                }
            };

            if slots.len() <= node.nodeid {
                slots.resize(node.nodeid + 1, None);
            }
            if slots[node.nodeid].replace(parsed).is_some() {
                return Err(PipelineError::artifact(
                    ARTIFACT,
                    format!("duplicate node id {}", node.nodeid),
                ));
            }
            stack.extend(node.children.iter());
        }

        let nodes = slots
            .into_iter()
            .enumerate()
            .map(|(id, slot)| {
                slot.ok_or_else(|| {
                    PipelineError::artifact(ARTIFACT, format!("tree is missing node id {}", id))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { nodes })
    }

    fn predict(&self, features: &[f32]) -> Result<f64, PipelineError> {
        let mut idx = 0usize;
        // An acyclic tree reaches a leaf in fewer steps than it has nodes.
        for _ in 0..self.nodes.len() {
            match self.nodes[idx] {
                Node::Leaf(value) => return Ok(value),
                Node::Split {
                    feature,
                    threshold,
                    yes,
                    no,
                    missing,
                } => {
                    let value = features[feature];
                    idx = if value.is_nan() {
                        missing
                    } else if value < threshold {
                        yes
                    } else {
                        no
                    };
                }
            }
        }
        Err(PipelineError::inference(format!(
            "tree of {} nodes did not reach a leaf",
            self.nodes.len()
        )))
    }
}

fn resolve_feature(split: &str, feature_names: Option<&[String]>) -> Result<usize, PipelineError> {
    if let Some(names) = feature_names
        && let Some(pos) = names.iter().position(|n| n == split)
    {
        return Ok(pos);
    }

    split
        .strip_prefix('f')
        .unwrap_or(split)
        .parse::<usize>()
        .map_err(|_| PipelineError::artifact(ARTIFACT, format!("unknown split feature '{}'", split)))
}

/// Additive tree ensemble: `base_score + Σ leaf`.
#[derive(Debug, Clone)]
pub struct GradientBoostedRegressor {
    trees: Vec<RegressionTree>,
    base_score: f64,
    num_features: usize,
}

impl GradientBoostedRegressor {
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::artifact(ARTIFACT, format!("{}: {}", path.display(), e)))?;
        let model = Self::from_json_str(&text)?;
        info!(
            "Loaded gradient-boosted model from {:?} ({} trees, {} features)",
            path,
            model.trees.len(),
            model.num_features
        );
        Ok(model)
    }

    pub fn from_json_str(text: &str) -> Result<Self, PipelineError> {
        let dump: BoosterDump =
            serde_json::from_str(text).map_err(|e| PipelineError::artifact(ARTIFACT, e))?;

        if dump.num_features == 0 {
            return Err(PipelineError::artifact(ARTIFACT, "num_features must be positive"));
        }
        if dump.trees.is_empty() {
            return Err(PipelineError::artifact(ARTIFACT, "model contained no trees"));
        }
        if let Some(names) = &dump.feature_names
            && names.len() != dump.num_features
        {
            return Err(PipelineError::artifact(
                ARTIFACT,
                format!(
                    "{} feature names for {} features",
                    names.len(),
                    dump.num_features
                ),
            ));
        }

        let trees = dump
            .trees
            .iter()
            .map(|root| {
                RegressionTree::from_dump(root, dump.num_features, dump.feature_names.as_deref())
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            trees,
            base_score: dump.base_score,
            num_features: dump.num_features,
        })
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for GradientBoostedRegressor {
    fn predict(&self, features: &[f32]) -> Result<f64, PipelineError> {
        if features.len() != self.num_features {
            return Err(PipelineError::FeatureDimension {
                expected: self.num_features,
                actual: features.len(),
            });
        }

        let margin = self
            .trees
            .iter()
            .map(|tree| tree.predict(features))
            .sum::<Result<f64, _>>()?;
        Ok(self.base_score + margin)
    }

    fn predict_batch(&self, rows: &[Vec<f32>]) -> Result<Vec<f64>, PipelineError> {
        rows.par_iter().map(|row| self.predict(row)).collect()
    }

    fn num_features(&self) -> usize {
        self.num_features
    }

    fn name(&self) -> &str {
        "Gradient Boosted Trees (XGBoost dump)"
    }
}
