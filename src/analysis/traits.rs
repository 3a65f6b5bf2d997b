//! Analysis trait abstractions
//!
//! The extraction seam is a trait so the numeric backend can be swapped
//! without touching pipeline code.

use crate::error::Result;
use crate::types::{AudioBuffer, FeatureSet};

/// Audio feature extraction backend
///
/// A successful extraction always carries a non-empty `mfcc` vector; the
/// remaining features are best-effort and omitted when the signal cannot
/// support them.
pub trait FeatureExtractor: Send + Sync {
    /// Compute the feature vector set for decoded audio
    fn extract(&self, buffer: &AudioBuffer) -> Result<FeatureSet>;

    /// Get the name of this extractor (for logging)
    fn name(&self) -> &'static str;
}
