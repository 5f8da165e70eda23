//! Sentence embedding of headline text.
//!
//! The frozen model is a static token-embedding table (model2vec / averaged
//! word vectors): the sentence vector is the mean of the known token vectors,
//! optionally L2-normalised. Two on-disk layouts are read:
//!
//! - JSON: `{"dim": 4, "normalize": true, "lowercase": true, "vocab": [...], "vectors": [[...], ...]}`
//! - word2vec / GloVe text: one `token v1 .. vd` per line, optional `count dim` header.

use crate::domain::errors::PipelineError;
use ndarray::Array2;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

const ARTIFACT: &str = "embedding model";

/// Interface for text embedding models.
pub trait TextEmbedder: Send + Sync {
    /// Width of every vector returned by `embed`.
    fn dim(&self) -> usize;

    /// Embed one text. Never fails: text with no known token maps to zeros.
    fn embed(&self, text: &str) -> Vec<f32>;

    fn name(&self) -> &str;
}

#[derive(Debug, Deserialize)]
struct EmbeddingFile {
    dim: usize,
    #[serde(default = "default_true")]
    normalize: bool,
    #[serde(default = "default_true")]
    lowercase: bool,
    vocab: Vec<String>,
    vectors: Vec<Vec<f32>>,
}

fn default_true() -> bool {
    true
}

/// Mean-pooled static token embeddings.
#[derive(Debug, Clone)]
pub struct StaticEmbedder {
    vocab: HashMap<String, usize>,
    vectors: Array2<f32>,
    normalize: bool,
    lowercase: bool,
}

impl StaticEmbedder {
    pub fn new(
        vocab: Vec<String>,
        vectors: Vec<Vec<f32>>,
        dim: usize,
        normalize: bool,
        lowercase: bool,
    ) -> Result<Self, PipelineError> {
        if dim == 0 {
            return Err(PipelineError::artifact(ARTIFACT, "dim must be positive"));
        }
        if vocab.len() != vectors.len() {
            return Err(PipelineError::artifact(
                ARTIFACT,
                format!("{} tokens but {} vectors", vocab.len(), vectors.len()),
            ));
        }
        if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dim) {
            return Err(PipelineError::artifact(
                ARTIFACT,
                format!("vector {} has width {}, expected {}", i, v.len(), dim),
            ));
        }

        let rows = vectors.len();
        let flat: Vec<f32> = vectors.into_iter().flatten().collect();
        let vectors = Array2::from_shape_vec((rows, dim), flat)
            .map_err(|e| PipelineError::artifact(ARTIFACT, e))?;

        let mut index = HashMap::with_capacity(vocab.len());
        for (i, token) in vocab.into_iter().enumerate() {
            let key = if lowercase { token.to_lowercase() } else { token };
            // First occurrence wins, as in word2vec loaders.
            index.entry(key).or_insert(i);
        }

        Ok(Self {
            vocab: index,
            vectors,
            normalize,
            lowercase,
        })
    }

    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::artifact(ARTIFACT, format!("{}: {}", path.display(), e)))?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let embedder = if is_json {
            Self::from_json_str(&text)?
        } else {
            Self::from_word2vec_text(&text)?
        };

        info!(
            "Loaded static embedding model from {:?} ({} tokens, dim {})",
            path,
            embedder.vocab_size(),
            embedder.dim()
        );
        Ok(embedder)
    }

    pub fn from_json_str(text: &str) -> Result<Self, PipelineError> {
        let file: EmbeddingFile =
            serde_json::from_str(text).map_err(|e| PipelineError::artifact(ARTIFACT, e))?;
        Self::new(file.vocab, file.vectors, file.dim, file.normalize, file.lowercase)
    }

    pub fn from_word2vec_text(text: &str) -> Result<Self, PipelineError> {
        let mut vocab = Vec::new();
        let mut vectors: Vec<Vec<f32>> = Vec::new();

        for (line_no, line) in text.lines().enumerate() {
            let mut parts = line.split_whitespace();
            let Some(token) = parts.next() else {
                continue;
            };
            let values: Vec<f32> = parts
                .map(|v| v.parse::<f32>())
                .collect::<Result<_, _>>()
                .map_err(|e| {
                    PipelineError::artifact(ARTIFACT, format!("line {}: {}", line_no + 1, e))
                })?;

            // "count dim" header
            if line_no == 0 && values.len() == 1 && token.parse::<usize>().is_ok() {
                continue;
            }
            vocab.push(token.to_string());
            vectors.push(values);
        }

        let dim = vectors
            .first()
            .map(|v| v.len())
            .ok_or_else(|| PipelineError::artifact(ARTIFACT, "no vectors found"))?;
        Self::new(vocab, vectors, dim, true, true)
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab.len()
    }
}

impl TextEmbedder for StaticEmbedder {
    fn dim(&self) -> usize {
        self.vectors.ncols()
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let dim = self.dim();
        let mut sum = vec![0.0f32; dim];
        let mut hits = 0usize;

        for word in words(text) {
            let key = if self.lowercase {
                word.to_lowercase()
            } else {
                word.to_string()
            };
            if let Some(&row) = self.vocab.get(&key) {
                for (acc, v) in sum.iter_mut().zip(self.vectors.row(row).iter()) {
                    *acc += v;
                }
                hits += 1;
            }
        }

        if hits == 0 {
            debug!("No known tokens in text of {} chars", text.len());
            return sum;
        }

        let n = hits as f32;
        sum.iter_mut().for_each(|v| *v /= n);

        if self.normalize {
            let norm = sum.iter().map(|v| v * v).sum::<f32>().sqrt();
            if norm > 0.0 {
                sum.iter_mut().for_each(|v| *v /= norm);
            }
        }
        sum
    }

    fn name(&self) -> &str {
        "Static token embeddings (mean pooled)"
    }
}

/// Characters that belong to a word; every other character separates words.
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !is_word_char(c))
        .filter(|w| !w.is_empty())
}
