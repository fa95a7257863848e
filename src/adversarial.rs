//! Generator/discriminator adversarial training core.
//!
//! One training batch runs the standard adversarial minimax protocol in two
//! phases over a single shared forward computation:
//!
//! 1. **Discriminator phase**: synthesize output from the generator, score
//!    both the real batch and the synthetic batch, train the discriminator
//!    toward "real is one, synthetic is zero", and step its optimizer.
//! 2. **Generator phase**: evaluate the composite generator criterion against
//!    the discriminator's *pre-update* judgment of the synthetic batch, and
//!    step the generator's optimizer.
//!
//! The synthetic forward pass (`generator(lr)` then `discriminator(sr)`)
//! feeds both phases. candle tensor graphs are immutable DAGs, so the second
//! backward pass over the shared computation needs no graph-retention flag
//! and nothing is recomputed. Using the stale pre-update judgment for the
//! generator's signal within the same step is deliberate and must not be
//! "fixed" by re-scoring after the discriminator update.

use std::collections::BTreeMap;

use candle_core::Tensor;
use candle_nn::loss;

use crate::config::AdversarialConfig;
use crate::error::{CoreError, Result};
use crate::logs::{AdversarialBatchLogs, AdversarialEpochLogs, AdversarialLogs, LogSnapshot};
use crate::meter::AverageMeter;
use crate::{device, tensor_scalar, GeneratorCriterion, Model, ModelOptimizer, Step, TrainingCore};

/// One meter per loss stream tracked across an epoch.
struct LossMeters {
    generator: AverageMeter,
    discriminator: AverageMeter,
    mse: AverageMeter,
    adversarial: AverageMeter,
    vgg: AverageMeter,
    tv: AverageMeter,
}

impl LossMeters {
    fn new(decay: f64) -> Self {
        Self {
            generator: AverageMeter::with_decay(decay),
            discriminator: AverageMeter::with_decay(decay),
            mse: AverageMeter::with_decay(decay),
            adversarial: AverageMeter::with_decay(decay),
            vgg: AverageMeter::with_decay(decay),
            tv: AverageMeter::with_decay(decay),
        }
    }
}

/// The extracted scalar values of one training batch.
struct BatchLosses {
    g_loss: f64,
    d_loss: f64,
    mse: f64,
    adversarial: f64,
    vgg: f64,
    tv: f64,
}

/// Adversarial training core owning a generator and a discriminator.
///
/// The two models are optimized independently: each optimizer must be bound
/// to exactly its own model's variables. Gradients of the discriminator loss
/// do flow back through the generator's output (the synthetic branch is not
/// detached), but only variables bound to the stepped optimizer are updated.
///
/// Per [`Step`]:
/// - `Training` runs the full two-phase protocol and returns the synthetic
///   output.
/// - `Validation` runs the generator forward pass only; the target argument
///   is accepted and ignored, no loss is computed, and logs stay empty for
///   that call.
/// - `Eval` runs the generator forward pass on its inputs.
pub struct AdversarialCore<G, D, Og, Od, C> {
    generator: G,
    discriminator: D,
    g_optim: Og,
    d_optim: Od,
    g_criterion: C,
    config: AdversarialConfig,
    meters: LossMeters,
    logs: AdversarialLogs,
}

impl<G, D, Og, Od, C> AdversarialCore<G, D, Og, Od, C>
where
    G: Model,
    D: Model,
    Og: ModelOptimizer,
    Od: ModelOptimizer,
    C: GeneratorCriterion,
{
    /// Creates a core with the default configuration.
    pub fn new(
        generator: G,
        discriminator: D,
        g_optimizer: Og,
        d_optimizer: Od,
        g_criterion: C,
    ) -> Self {
        let config = AdversarialConfig::default();
        let meters = LossMeters::new(config.meter_decay);
        Self {
            generator,
            discriminator,
            g_optim: g_optimizer,
            d_optim: d_optimizer,
            g_criterion,
            config,
            meters,
            logs: AdversarialLogs::default(),
        }
    }

    /// Creates a core with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] if the configuration is invalid.
    pub fn with_config(
        generator: G,
        discriminator: D,
        g_optimizer: Og,
        d_optimizer: Od,
        g_criterion: C,
        config: AdversarialConfig,
    ) -> Result<Self> {
        config.validate()?;
        let meters = LossMeters::new(config.meter_decay);
        Ok(Self {
            generator,
            discriminator,
            g_optim: g_optimizer,
            d_optim: d_optimizer,
            g_criterion,
            config,
            meters,
            logs: AdversarialLogs::default(),
        })
    }

    /// Returns the typed log record.
    #[must_use]
    pub fn log_record(&self) -> &AdversarialLogs {
        &self.logs
    }

    /// Discriminator phase followed by generator phase, then bookkeeping.
    fn train_batch(&mut self, lr_images: &Tensor, hr_images: &Tensor) -> Result<Tensor> {
        // Shared forward computation: both loss paths consume d_sr_out.
        let sr_images = self.generator.forward(lr_images)?;
        let d_hr_out = self.discriminator.forward(hr_images)?;
        let d_sr_out = self.discriminator.forward(&sr_images)?;

        let d_hr_loss = loss::binary_cross_entropy_with_logit(&d_hr_out, &d_hr_out.ones_like()?)?;
        let d_sr_loss = loss::binary_cross_entropy_with_logit(&d_sr_out, &d_sr_out.zeros_like()?)?;
        let d_loss = (&d_hr_loss + &d_sr_loss)?;

        let d_grads = d_loss.backward()?;
        self.d_optim.step(&d_grads)?;

        // Generator feedback uses the pre-update d_sr_out, never re-scored.
        let terms = self
            .g_criterion
            .evaluate(self.config.eps, &d_sr_out, &sr_images, hr_images)?;
        let g_loss = terms.total()?;

        let g_grads = g_loss.backward()?;
        self.g_optim.step(&g_grads)?;

        let losses = BatchLosses {
            g_loss: tensor_scalar(&g_loss)?,
            d_loss: tensor_scalar(&d_loss)?,
            mse: tensor_scalar(&terms.mse)?,
            adversarial: tensor_scalar(&terms.adversarial)?,
            vgg: tensor_scalar(&terms.vgg)?,
            tv: tensor_scalar(&terms.tv)?,
        };
        self.update_loss_logs(&losses);

        Ok(sr_images)
    }

    fn update_loss_logs(&mut self, losses: &BatchLosses) {
        self.meters.generator.update(losses.g_loss);
        self.meters.discriminator.update(losses.d_loss);
        self.meters.mse.update(losses.mse);
        self.meters.adversarial.update(losses.adversarial);
        self.meters.vgg.update(losses.vgg);
        self.meters.tv.update(losses.tv);

        self.logs.batch = Some(AdversarialBatchLogs {
            g_loss: losses.g_loss,
            d_loss: losses.d_loss,
        });
        self.logs.epoch = Some(AdversarialEpochLogs {
            generator: self.meters.generator.avg(),
            discriminator: self.meters.discriminator.avg(),
            mse: self.meters.mse.avg(),
            adversarial: self.meters.adversarial.avg(),
            vgg: self.meters.vgg.avg(),
            tv: self.meters.tv.avg(),
        });
    }
}

impl<G, D, Og, Od, C> TrainingCore for AdversarialCore<G, D, Og, Od, C>
where
    G: Model,
    D: Model,
    Og: ModelOptimizer,
    Od: ModelOptimizer,
    C: GeneratorCriterion,
{
    fn on_train_mode(&mut self) {
        // Both models toggle together; partial toggling is a defect.
        self.generator.set_training(true);
        self.discriminator.set_training(true);
    }

    fn on_eval_mode(&mut self) {
        self.generator.set_training(false);
        self.discriminator.set_training(false);
    }

    fn on_new_epoch(&mut self) {
        tracing::debug!("resetting adversarial epoch statistics");
        self.logs = AdversarialLogs::default();
        self.meters = LossMeters::new(self.config.meter_decay);
    }

    fn to_gpu(&mut self) -> Result<()> {
        let device = device::accelerator();
        self.generator.to_device(&device)?;
        self.discriminator.to_device(&device)
    }

    fn models(&self) -> BTreeMap<&'static str, &dyn Model> {
        BTreeMap::from([
            ("generator", &self.generator as &dyn Model),
            ("discriminator", &self.discriminator as &dyn Model),
        ])
    }

    fn logs(&self) -> LogSnapshot {
        self.logs.snapshot()
    }

    fn on_forward_batch(
        &mut self,
        step: Step,
        inputs: &Tensor,
        targets: Option<&Tensor>,
    ) -> Result<Tensor> {
        // The bundle reflects only the batch just processed.
        self.logs = AdversarialLogs::default();
        match step {
            Step::Training => {
                let hr_images = targets.ok_or(CoreError::MissingTargets { step })?;
                self.train_batch(inputs, hr_images)
            }
            // The ground-truth argument is accepted and ignored: validation
            // produces qualitative output only, no loss is reported.
            Step::Validation | Step::Eval => self.generator.forward(inputs),
        }
    }
}
