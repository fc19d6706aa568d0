//! End-to-end generation through the orchestrator.

use phenex::prelude::*;
use phenex::{CycleOutcome, ResolutionTier as Tier};

/// Deterministic stand-in for a host image backend: a checkerboard whose
/// side length follows the requested scale.
fn checkerboard(_prompt: &str, scale: f32) -> phenex::CoreResult<Frame> {
    let side = ((16.0 * scale) as usize).max(2);
    let data = (0..side * side)
        .map(|i| if i % 2 == 0 { 0.15 } else { 0.85 })
        .collect();
    Frame::new(side, side, data)
}

fn ready_pipeline() -> Orchestrator {
    let mut pipeline = Orchestrator::new(PipelineConfig::default()).unwrap();
    pipeline.initialize().unwrap();
    pipeline
}

#[test]
fn generate_returns_image_and_metadata() {
    let mut pipeline = ready_pipeline();

    let request = GenerationRequest::new("a harbor city at dusk").tier(Tier::High);
    let result = pipeline.generate(&request, checkerboard).unwrap();

    assert!(!result.image.is_empty());
    assert!(result.quality >= 0.0 && result.quality <= 1.0);
    assert!(result.stages_used > 0);
    assert!(result.memory_used_mb > 0.0);
}

#[test]
fn generate_before_initialize_is_rejected() {
    let mut pipeline = Orchestrator::new(PipelineConfig::default()).unwrap();
    let request = GenerationRequest::new("too early");
    assert!(matches!(
        pipeline.generate(&request, checkerboard),
        Err(Error::Uninitialized)
    ));
}

#[test]
fn progress_is_non_decreasing_within_one_call() {
    let mut pipeline = ready_pipeline();
    let mut reported: Vec<f32> = Vec::new();

    let request = GenerationRequest::new("a lighthouse in fog").tier(Tier::Ultra);
    pipeline
        .generate_with_progress(&request, |fraction, _label| reported.push(fraction), checkerboard)
        .unwrap();

    assert!(!reported.is_empty());
    assert!(reported.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn repeated_high_tier_requests_grow_the_architecture() {
    let mut pipeline = ready_pipeline();
    let before = pipeline.status().architecture.active_count;

    // Ultra-tier prompts with many words push complexity toward 1.0.
    let prompt = vec!["detail"; 40].join(" ");
    for _ in 0..10 {
        let request = GenerationRequest::new(prompt.clone()).tier(Tier::Ultra);
        pipeline.generate(&request, checkerboard).unwrap();
    }

    let after = pipeline.status().architecture.active_count;
    assert!(after > before);
    assert!(after <= pipeline.config().adapt.max_stages);
}

#[test]
fn cancellation_aborts_and_surfaces() {
    let mut pipeline = ready_pipeline();
    let token = CancelToken::new();
    let trigger = token.clone();

    let request = GenerationRequest::new("slow scene")
        .tier(Tier::Ultra)
        .cancel_token(token);

    let result = pipeline.generate(&request, move |prompt, scale| {
        // Cancel after the preview pass has been produced.
        trigger.cancel();
        checkerboard(prompt, scale)
    });

    match result {
        Err(err) => assert!(err.is_cancelled()),
        Ok(_) => panic!("cancelled generation should not complete"),
    }
}

#[test]
fn base_generator_failure_propagates() {
    let mut pipeline = ready_pipeline();
    let request = GenerationRequest::new("doomed");

    let result = pipeline.generate(&request, |_, _| {
        Err(phenex::CoreError::generation("backend offline"))
    });
    assert!(matches!(result, Err(Error::Core(_))));
}

#[test]
fn optimize_runs_cycles_and_advances_generation() {
    let mut pipeline = ready_pipeline();

    let outcome = pipeline.optimize(checkerboard).unwrap();
    // The very first cycle beats the zeroed best benchmark.
    assert_eq!(outcome, CycleOutcome::Improved);

    pipeline.optimize(checkerboard).unwrap();
    let status = pipeline.status();
    assert_eq!(status.optimization_generation, 2);
}

#[test]
fn export_state_round_trips_through_json() {
    let pipeline = ready_pipeline();
    let json = pipeline.export_state_json().unwrap();

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(value.get("version").is_some());
    assert!(value["architecture"]["active_count"].as_u64().unwrap() > 0);
    assert!(value["config"]["refine"]["scales"].is_array());
}

#[test]
fn attention_module_fuses_and_sparsifies() {
    let pipeline = ready_pipeline();
    let attention = pipeline.attention();

    let query = vec![0.5f32; 32];
    let mut fused = attention.fuse(&query, &query, &query).unwrap();
    assert_eq!(fused.len(), 32);

    attention.apply_sparse_with(&mut fused, 10.0);
    assert!(fused.iter().all(|v| *v == 0.0));
}

#[test]
fn engine_settings_can_be_tuned_after_generations() {
    let mut pipeline = ready_pipeline();
    for _ in 0..3 {
        let request = GenerationRequest::new("warmup").tier(Tier::Preview);
        pipeline.generate(&request, checkerboard).unwrap();
    }

    // Under the default 100ms target every pass hits; no flag flips.
    let settings = pipeline.engine_mut().optimize_settings();
    assert!(!settings.quantization);
}

#[test]
fn seeded_style_request_reaches_the_backend() {
    let mut pipeline = ready_pipeline();
    let mut seen_prompt = String::new();

    let request = GenerationRequest::new("a quiet forest")
        .style("ink wash")
        .seed(42)
        .tier(Tier::Preview);
    pipeline
        .generate(&request, |prompt, scale| {
            seen_prompt = prompt.to_string();
            checkerboard(prompt, scale)
        })
        .unwrap();

    assert_eq!(seen_prompt, "a quiet forest, ink wash style");
    assert_eq!(request.seed, Some(42));
}
