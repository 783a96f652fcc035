//! ALBERT argument extraction and triple scoring on ONNX Runtime
//!
//! Expects a model directory containing:
//!
//! | File                   | Contents                                         |
//! |------------------------|--------------------------------------------------|
//! | `argument_model.onnx`  | outputs `subjects`, `predicates`, `objects` logits, each `[1, seq, classes]` |
//! | `scoring_model.onnx`   | outputs `logits` `[batch, 3]` (neutral, positive, negative) |
//! | `tokenizer.json`       | HuggingFace tokenizer of the base model          |

use std::path::Path;
use std::sync::{Arc, Mutex};

use ndarray::{Array2, ArrayView2};
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::{DynValue, Tensor},
};
use tokenizers::{Encoding, Tokenizer};

use dtx_core::{
    ArgumentModel, ArgumentPrediction, Candidate, Distribution, DtxError, Result, ScoringModel,
    TagMatrix,
};

use crate::registry::{ModelBackend, ModelSpec};

pub const ARGUMENT_MODEL_FILE: &str = "argument_model.onnx";
pub const SCORING_MODEL_FILE: &str = "scoring_model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Load both ALBERT models from `spec.path`
pub fn load(spec: &ModelSpec) -> Result<ModelBackend> {
    let tokenizer = Tokenizer::from_file(spec.path.join(TOKENIZER_FILE))
        .map_err(|e| DtxError::Model(format!("Failed to load tokenizer: {e}")))?;
    let tokenizer = Arc::new(tokenizer);

    let argument = AlbertArgumentModel {
        session: Mutex::new(open_session(&spec.path.join(ARGUMENT_MODEL_FILE))?),
        tokenizer: Arc::clone(&tokenizer),
    };
    let scoring = AlbertScoringModel {
        session: Mutex::new(open_session(&spec.path.join(SCORING_MODEL_FILE))?),
        tokenizer,
    };

    tracing::info!(
        base_model = %spec.base_model,
        path = %spec.path.display(),
        "Loaded ALBERT ONNX models"
    );
    Ok(ModelBackend::new(Box::new(argument), Box::new(scoring)))
}

fn open_session(path: &Path) -> Result<Session> {
    if !path.exists() {
        return Err(DtxError::Model(format!(
            "Model file not found: {}",
            path.display()
        )));
    }

    Session::builder()
        .map_err(|e| DtxError::Model(format!("Failed to create session builder: {e}")))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| DtxError::Model(format!("Failed to set optimization level: {e}")))?
        .commit_from_file(path)
        .map_err(|e| DtxError::Model(format!("Failed to load {}: {e}", path.display())))
}

/// Row-wise softmax in place
fn softmax_rows(mut logits: Array2<f32>) -> Array2<f32> {
    for mut row in logits.rows_mut() {
        let max = row.fold(f32::NEG_INFINITY, |a, &b| a.max(b));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        if sum > 0.0 {
            row.mapv_inplace(|v| v / sum);
        }
    }
    logits
}

/// `[batch, seq]` id, mask and type tensors, right-padded with zeros
fn input_tensors(encodings: &[Encoding]) -> Result<(Tensor<i64>, Tensor<i64>, Tensor<i64>)> {
    let batch = encodings.len();
    let seq_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);

    let mut ids = Array2::<i64>::zeros((batch, seq_len));
    let mut mask = Array2::<i64>::zeros((batch, seq_len));
    let mut types = Array2::<i64>::zeros((batch, seq_len));

    for (row, encoding) in encodings.iter().enumerate() {
        let columns = encoding
            .get_ids()
            .iter()
            .zip(encoding.get_attention_mask())
            .zip(encoding.get_type_ids());
        for (col, ((&id, &attention), &type_id)) in columns.enumerate() {
            ids[[row, col]] = id as i64;
            mask[[row, col]] = attention as i64;
            types[[row, col]] = type_id as i64;
        }
    }

    let tensor = |array: Array2<i64>, name: &str| {
        Tensor::from_array(array)
            .map_err(|e| DtxError::Model(format!("Failed to create {name} tensor: {e}")))
    };
    Ok((
        tensor(ids, "input_ids")?,
        tensor(mask, "attention_mask")?,
        tensor(types, "token_type_ids")?,
    ))
}

fn missing_output(name: &str) -> DtxError {
    DtxError::Model(format!("ONNX output '{name}' missing"))
}

/// Copy a model output into a 2D array, dropping a leading batch axis of 1
fn output_matrix(value: &DynValue, name: &str) -> Result<Array2<f32>> {
    let (shape, data) = value
        .try_extract_tensor::<f32>()
        .map_err(|e| DtxError::Model(format!("Failed to extract '{name}': {e}")))?;

    let (rows, cols) = match shape.len() {
        2 => (shape[0] as usize, shape[1] as usize),
        3 if shape[0] == 1 => (shape[1] as usize, shape[2] as usize),
        _ => {
            return Err(DtxError::Model(format!(
                "Unexpected shape for '{name}': {shape:?}"
            )))
        }
    };

    ArrayView2::from_shape((rows, cols), data)
        .map(|view| view.to_owned())
        .map_err(|e| DtxError::Model(format!("Failed to reshape '{name}': {e}")))
}

// ============================================================================
// Argument Extraction
// ============================================================================

/// ALBERT token classifier with one BIO head per argument role
pub struct AlbertArgumentModel {
    session: Mutex<Session>,
    tokenizer: Arc<Tokenizer>,
}

impl ArgumentModel for AlbertArgumentModel {
    fn predict(&self, tokens: &[String]) -> Result<ArgumentPrediction> {
        let encoding = self
            .tokenizer
            .encode(tokens.join(" "), true)
            .map_err(|e| DtxError::Model(format!("Failed to tokenize input: {e}")))?;
        let subwords = encoding.get_tokens().to_vec();
        let (ids, mask, types) = input_tensors(std::slice::from_ref(&encoding))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| DtxError::Model(format!("Failed to lock session: {e}")))?;
        let outputs = session
            .run(ort::inputs![
                "input_ids" => ids.into_dyn(),
                "attention_mask" => mask.into_dyn(),
                "token_type_ids" => types.into_dyn(),
            ])
            .map_err(|e| DtxError::Model(format!("ONNX inference failed: {e}")))?;

        // Heads emit [seq, classes]; decoding expects classes x seq
        let head = |name: &str| -> Result<TagMatrix> {
            let value = outputs.get(name).ok_or_else(|| missing_output(name))?;
            Ok(softmax_rows(output_matrix(value, name)?).reversed_axes())
        };

        Ok(ArgumentPrediction {
            subjects: head("subjects")?,
            predicates: head("predicates")?,
            objects: head("objects")?,
            subwords,
        })
    }

    fn name(&self) -> &str {
        "albert"
    }
}

// ============================================================================
// Triple Scoring
// ============================================================================

/// ALBERT sequence-pair classifier over (dialogue, candidate triple)
pub struct AlbertScoringModel {
    session: Mutex<Session>,
    tokenizer: Arc<Tokenizer>,
}

impl ScoringModel for AlbertScoringModel {
    fn score(&self, tokens: &[String], batch: &[Candidate]) -> Result<Vec<Distribution>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let context = tokens.join(" ");
        let pairs: Vec<(String, String)> = batch
            .iter()
            .map(|c| {
                (
                    context.clone(),
                    format!("{} {} {}", c.subject, c.predicate, c.object),
                )
            })
            .collect();
        let encodings = self
            .tokenizer
            .encode_batch(pairs, true)
            .map_err(|e| DtxError::Model(format!("Failed to tokenize batch: {e}")))?;
        let (ids, mask, types) = input_tensors(&encodings)?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| DtxError::Model(format!("Failed to lock session: {e}")))?;
        let outputs = session
            .run(ort::inputs![
                "input_ids" => ids.into_dyn(),
                "attention_mask" => mask.into_dyn(),
                "token_type_ids" => types.into_dyn(),
            ])
            .map_err(|e| DtxError::Model(format!("ONNX inference failed: {e}")))?;

        let logits = outputs.get("logits").ok_or_else(|| missing_output("logits"))?;
        let probs = softmax_rows(output_matrix(logits, "logits")?);
        if probs.ncols() != 3 {
            return Err(DtxError::Model(format!(
                "Scoring model returned {} classes, expected 3",
                probs.ncols()
            )));
        }

        Ok(probs
            .rows()
            .into_iter()
            .map(|row| Distribution::new(row[0], row[1], row[2]))
            .collect())
    }

    fn name(&self) -> &str {
        "albert"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let probs = softmax_rows(array![[1.0, 2.0, 3.0], [0.0, 0.0, 0.0]]);
        for row in probs.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-6);
        }
        assert!(probs[[0, 2]] > probs[[0, 1]]);
        assert!((probs[[1, 0]] - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_model_file() {
        let spec = ModelSpec::new("/nonexistent/model/dir", "albert-base-v2");
        assert!(load(&spec).is_err());
    }
}
