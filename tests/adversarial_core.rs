//! Batch protocol tests for the adversarial core.

mod common;

use candle_core::{Device, Tensor};
use candle_nn::{Optimizer as _, SGD};
use common::{read_parameters, TestGanCriterion, TinyNet};
use learner_cores_rs::{AdversarialConfig, AdversarialCore, CoreError, Model, Step, TrainingCore};

type GanCore = AdversarialCore<TinyNet, TinyNet, SGD, SGD, TestGanCriterion>;

fn fresh_core() -> GanCore {
    let generator = TinyNet::new(4, 4, 0.3).unwrap();
    let discriminator = TinyNet::new(4, 1, 0.2).unwrap();
    let g_optimizer = SGD::new(generator.variables(), 0.05).unwrap();
    let d_optimizer = SGD::new(discriminator.variables(), 0.05).unwrap();
    let mut core = AdversarialCore::new(
        generator,
        discriminator,
        g_optimizer,
        d_optimizer,
        TestGanCriterion,
    );
    core.on_new_epoch();
    core
}

fn image_batch(rows: usize, offset: f32) -> Tensor {
    let data: Vec<f32> = (0..rows * 4).map(|i| offset + i as f32 * 0.1).collect();
    Tensor::from_vec(data, (rows, 4), &Device::Cpu).unwrap()
}

#[test]
fn logs_are_empty_before_the_first_batch() {
    let core = fresh_core();
    assert!(core.logs().is_empty());
    assert!(core.log_record().is_empty());
}

#[test]
fn training_batch_produces_the_exact_log_key_sets() {
    let mut core = fresh_core();
    let lr = image_batch(2, 0.0);
    let hr = image_batch(2, 0.5);

    core.on_forward_batch(Step::Training, &lr, Some(&hr))
        .unwrap();

    let logs = core.logs();
    let batch_keys: Vec<_> = logs.batch_logs.keys().copied().collect();
    assert_eq!(batch_keys, vec!["d_loss", "g_loss"]);
    let epoch_keys: Vec<_> = logs.epoch_logs.keys().copied().collect();
    assert_eq!(
        epoch_keys,
        vec!["adversarial", "discriminator", "generator", "mse", "tv", "vgg"]
    );
}

#[test]
fn training_updates_both_models() {
    let mut core = fresh_core();
    let lr = image_batch(2, 0.0);
    let hr = image_batch(2, 0.5);

    let g_before = read_parameters(*core.models().get("generator").unwrap());
    let d_before = read_parameters(*core.models().get("discriminator").unwrap());

    let sr = core
        .on_forward_batch(Step::Training, &lr, Some(&hr))
        .unwrap();
    assert_eq!(sr.dims(), &[2, 4]);

    let g_after = read_parameters(*core.models().get("generator").unwrap());
    let d_after = read_parameters(*core.models().get("discriminator").unwrap());
    assert_ne!(g_before, g_after, "generator must be optimized");
    assert_ne!(d_before, d_after, "discriminator must be optimized");
}

#[test]
fn training_requires_targets() {
    let mut core = fresh_core();
    let lr = image_batch(2, 0.0);
    let err = core.on_forward_batch(Step::Training, &lr, None).unwrap_err();
    assert!(matches!(err, CoreError::MissingTargets { .. }));
}

#[test]
fn eval_returns_matching_batch_dimension_without_any_mutation() {
    let mut core = fresh_core();
    let images = image_batch(3, 0.2);

    let g_before = read_parameters(*core.models().get("generator").unwrap());
    let d_before = read_parameters(*core.models().get("discriminator").unwrap());

    let out = core.on_forward_batch(Step::Eval, &images, None).unwrap();
    assert_eq!(out.dims()[0], images.dims()[0]);

    assert!(core.logs().is_empty());
    assert_eq!(
        g_before,
        read_parameters(*core.models().get("generator").unwrap())
    );
    assert_eq!(
        d_before,
        read_parameters(*core.models().get("discriminator").unwrap())
    );
}

#[test]
fn validation_ignores_the_ground_truth_argument() {
    let mut core = fresh_core();
    let lr = image_batch(2, 0.0);
    let hr = image_batch(2, 0.5);

    let with_targets = core
        .on_forward_batch(Step::Validation, &lr, Some(&hr))
        .unwrap();
    assert!(core.logs().is_empty(), "validation computes no loss");

    let without_targets = core.on_forward_batch(Step::Validation, &lr, None).unwrap();
    assert_eq!(
        with_targets.flatten_all().unwrap().to_vec1::<f32>().unwrap(),
        without_targets
            .flatten_all()
            .unwrap()
            .to_vec1::<f32>()
            .unwrap()
    );
}

#[test]
fn the_bundle_reflects_only_the_latest_batch() {
    let mut core = fresh_core();
    let lr = image_batch(2, 0.0);
    let hr = image_batch(2, 0.5);

    core.on_forward_batch(Step::Training, &lr, Some(&hr))
        .unwrap();
    assert!(!core.logs().is_empty());

    // A validation batch overwrites the whole bundle with nothing.
    core.on_forward_batch(Step::Validation, &lr, Some(&hr))
        .unwrap();
    assert!(core.logs().is_empty());
}

#[test]
fn epoch_averages_accumulate_across_training_batches() {
    let mut core = fresh_core();
    let lr = image_batch(2, 0.0);
    let hr = image_batch(2, 0.5);

    core.on_forward_batch(Step::Training, &lr, Some(&hr))
        .unwrap();
    let first = core.logs();
    let g1 = first.batch_logs["g_loss"];
    assert!(
        (first.epoch_logs["generator"] - g1).abs() < 1e-9,
        "single-batch average equals the batch value"
    );

    core.on_forward_batch(Step::Training, &lr, Some(&hr))
        .unwrap();
    let second = core.logs();
    let g2 = second.batch_logs["g_loss"];
    assert!((second.epoch_logs["generator"] - (g1 + g2) / 2.0).abs() < 1e-9);
}

#[test]
fn new_epoch_resets_exactly_the_running_statistics() {
    let mut core = fresh_core();
    let lr = image_batch(2, 0.0);
    let hr = image_batch(2, 0.5);

    core.on_forward_batch(Step::Training, &lr, Some(&hr))
        .unwrap();
    let params_before_reset = read_parameters(*core.models().get("generator").unwrap());

    core.on_new_epoch();
    assert!(core.logs().is_empty());
    assert_eq!(
        params_before_reset,
        read_parameters(*core.models().get("generator").unwrap()),
        "the reset must not touch model parameters"
    );

    core.on_forward_batch(Step::Training, &lr, Some(&hr))
        .unwrap();
    let logs = core.logs();
    assert!(
        (logs.epoch_logs["generator"] - logs.batch_logs["g_loss"]).abs() < 1e-9,
        "statistics restart from the post-reset batch"
    );
}

#[test]
fn get_models_exposes_both_networks() {
    let core = fresh_core();
    let models = core.models();
    let keys: Vec<_> = models.keys().copied().collect();
    assert_eq!(keys, vec!["discriminator", "generator"]);
}

#[test]
fn to_gpu_is_idempotent() {
    let mut core = fresh_core();
    core.to_gpu().unwrap();
    let once = read_parameters(*core.models().get("generator").unwrap());
    core.to_gpu().unwrap();
    let twice = read_parameters(*core.models().get("generator").unwrap());
    assert_eq!(once, twice);
}

#[test]
fn invalid_config_is_rejected_at_construction() {
    let generator = TinyNet::new(4, 4, 0.3).unwrap();
    let discriminator = TinyNet::new(4, 1, 0.2).unwrap();
    let g_optimizer = SGD::new(generator.variables(), 0.05).unwrap();
    let d_optimizer = SGD::new(discriminator.variables(), 0.05).unwrap();
    let config = AdversarialConfig {
        meter_decay: 0.0,
        ..AdversarialConfig::default()
    };
    let result = AdversarialCore::with_config(
        generator,
        discriminator,
        g_optimizer,
        d_optimizer,
        TestGanCriterion,
        config,
    );
    assert!(result.is_err());
}
