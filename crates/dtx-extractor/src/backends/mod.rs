//! Model backends
//!
//! The ALBERT backend runs exported ONNX graphs and is compiled only with
//! the `onnx` feature. Without it the registered factory reports the
//! missing feature instead of failing at link time.

#[cfg(feature = "onnx")]
pub mod onnx;

use dtx_core::Result;
#[cfg(not(feature = "onnx"))]
use dtx_core::DtxError;

use crate::registry::{ModelBackend, ModelSpec};

/// Factory registered under `albert`
pub fn load_albert(spec: &ModelSpec) -> Result<ModelBackend> {
    #[cfg(feature = "onnx")]
    {
        onnx::load(spec)
    }
    #[cfg(not(feature = "onnx"))]
    {
        tracing::warn!(path = %spec.path.display(), "ALBERT backend requested without onnx support");
        Err(DtxError::FeatureNotAvailable(
            "ALBERT backend requires the 'onnx' feature".to_string(),
        ))
    }
}
