//! Loss criteria consumed by the cores.
//!
//! A criterion is an opaque callable as far as a core is concerned: the core
//! hands it tensors and gets scalar loss tensors back, still attached to the
//! autodiff graph. This module defines the two criterion capabilities plus
//! thin candle-backed implementations.

use candle_core::Tensor;
use candle_nn::loss;
use candle_nn::ops::sigmoid;

use crate::error::Result;
use crate::Model;

/// Scalar loss for supervised single-model training.
pub trait ClassificationCriterion {
    /// Computes the loss of `logits` against `targets`.
    ///
    /// Must return a rank-0 tensor attached to the autodiff graph.
    ///
    /// # Errors
    ///
    /// Propagates tensor failures unchanged.
    fn loss(&self, logits: &Tensor, targets: &Tensor) -> Result<Tensor>;
}

/// Cross-entropy over raw logits `(batch, classes)` against `u32` class
/// indices `(batch,)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropy;

impl ClassificationCriterion for CrossEntropy {
    fn loss(&self, logits: &Tensor, targets: &Tensor) -> Result<Tensor> {
        Ok(loss::cross_entropy(logits, targets)?)
    }
}

/// Mean squared error for regression targets of the same shape as the output.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mse;

impl ClassificationCriterion for Mse {
    fn loss(&self, logits: &Tensor, targets: &Tensor) -> Result<Tensor> {
        Ok(loss::mse(logits, targets)?)
    }
}

/// The four scalar terms of a composite generator loss.
///
/// All four are rank-0 tensors; the terms that carry gradients stay attached
/// to the autodiff graph so [`total`](GeneratorLossTerms::total) can be
/// backpropagated in one pass.
#[derive(Debug, Clone)]
pub struct GeneratorLossTerms {
    /// Reconstruction term.
    pub mse: Tensor,
    /// Adversarial term from the discriminator's judgment of synthetic
    /// output.
    pub adversarial: Tensor,
    /// Perceptual (feature-space) term.
    pub vgg: Tensor,
    /// Total-variation smoothness term.
    pub tv: Tensor,
}

impl GeneratorLossTerms {
    /// Sums the four terms into the total generator loss.
    ///
    /// # Errors
    ///
    /// Propagates tensor failures unchanged.
    pub fn total(&self) -> Result<Tensor> {
        let sum = ((&self.mse + &self.adversarial)? + &self.vgg)?;
        Ok((sum + &self.tv)?)
    }
}

/// Composite generator loss for adversarial training.
///
/// Evaluated once per training batch with the discriminator's pre-update
/// judgment of the synthetic output.
pub trait GeneratorCriterion {
    /// Computes the four loss terms.
    ///
    /// `eps` is a small stabilizer for log-based terms; `d_sr_out` is the
    /// discriminator's raw score of the synthetic images, computed before the
    /// discriminator's own update.
    ///
    /// # Errors
    ///
    /// Propagates tensor failures unchanged.
    fn evaluate(
        &self,
        eps: f64,
        d_sr_out: &Tensor,
        sr_images: &Tensor,
        hr_images: &Tensor,
    ) -> Result<GeneratorLossTerms>;
}

/// Super-resolution generator loss: weighted reconstruction, non-saturating
/// adversarial, perceptual, and total-variation terms.
///
/// The perceptual term compares feature maps from a frozen extractor network
/// when one is supplied; without an extractor the term is a constant zero.
/// The extractor must already live on the same device as the images, and its
/// variables must not be bound to any optimizer.
pub struct SrganGeneratorCriterion {
    /// Weight of the reconstruction term.
    pub mse_weight: f64,
    /// Weight of the adversarial term.
    pub adversarial_weight: f64,
    /// Weight of the perceptual term.
    pub vgg_weight: f64,
    /// Weight of the total-variation term.
    pub tv_weight: f64,
    extractor: Option<Box<dyn Model>>,
}

impl SrganGeneratorCriterion {
    /// Creates the criterion with the standard SRGAN weights and no feature
    /// extractor.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mse_weight: 1.0,
            adversarial_weight: 1e-3,
            vgg_weight: 6e-3,
            tv_weight: 2e-8,
            extractor: None,
        }
    }

    /// Attaches a frozen feature extractor for the perceptual term.
    #[must_use]
    pub fn with_extractor(mut self, extractor: Box<dyn Model>) -> Self {
        self.extractor = Some(extractor);
        self
    }
}

impl Default for SrganGeneratorCriterion {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneratorCriterion for SrganGeneratorCriterion {
    fn evaluate(
        &self,
        eps: f64,
        d_sr_out: &Tensor,
        sr_images: &Tensor,
        hr_images: &Tensor,
    ) -> Result<GeneratorLossTerms> {
        let mse = (loss::mse(sr_images, hr_images)? * self.mse_weight)?;

        // Non-saturating generator objective: -log D(G(z)), eps guards log(0).
        let d_sr_prob = sigmoid(d_sr_out)?;
        let adversarial =
            (((d_sr_prob + eps)?.log()?.mean_all()?.neg()?) * self.adversarial_weight)?;

        let vgg = match &self.extractor {
            Some(extractor) => {
                let sr_features = extractor.forward(sr_images)?;
                let hr_features = extractor.forward(hr_images)?;
                (loss::mse(&sr_features, &hr_features)? * self.vgg_weight)?
            }
            None => Tensor::zeros((), sr_images.dtype(), sr_images.device())?,
        };

        let tv = (total_variation(sr_images)? * self.tv_weight)?;

        Ok(GeneratorLossTerms {
            mse,
            adversarial,
            vgg,
            tv,
        })
    }
}

/// Mean squared difference between neighboring pixels along the last two
/// dimensions.
fn total_variation(images: &Tensor) -> Result<Tensor> {
    let rank = images.rank();
    if rank < 2 {
        return Err(candle_core::Error::Msg(format!(
            "total variation needs at least 2 dims, got rank {rank}"
        ))
        .into());
    }
    let h_axis = rank - 2;
    let w_axis = rank - 1;
    let h = images.dim(h_axis)?;
    let w = images.dim(w_axis)?;

    let mut tv = Tensor::zeros((), images.dtype(), images.device())?;
    if h > 1 {
        let diff = (images.narrow(h_axis, 1, h - 1)? - images.narrow(h_axis, 0, h - 1)?)?;
        tv = (tv + diff.sqr()?.mean_all()?)?;
    }
    if w > 1 {
        let diff = (images.narrow(w_axis, 1, w - 1)? - images.narrow(w_axis, 0, w - 1)?)?;
        tv = (tv + diff.sqr()?.mean_all()?)?;
    }
    Ok(tv)
}
