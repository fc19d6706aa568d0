//! Health monitoring and plugin dispatch through the orchestrator.

use std::sync::{Arc, Mutex};

use phenex::prelude::*;
use phenex::{HealthConfig, PluginError, PluginKind, ResolutionTier as Tier, Severity};

fn gradient(_prompt: &str, scale: f32) -> phenex::CoreResult<Frame> {
    let side = ((16.0 * scale) as usize).max(2);
    let data = (0..side * side).map(|i| i as f32 / (side * side) as f32).collect();
    Frame::new(side, side, data)
}

fn ready_pipeline() -> Orchestrator {
    let mut pipeline = Orchestrator::new(PipelineConfig::default()).unwrap();
    pipeline.initialize().unwrap();
    pipeline
}

#[test]
fn every_generation_is_recorded_by_the_monitor() {
    let mut pipeline = ready_pipeline();

    for i in 0..5 {
        let request = GenerationRequest::new(format!("scene {i}")).tier(Tier::Preview);
        pipeline.generate(&request, gradient).unwrap();
    }
    assert_eq!(pipeline.status().health_window, 5);
}

#[test]
fn alert_sinks_receive_threshold_violations() {
    let mut pipeline = Orchestrator::new(PipelineConfig {
        health: HealthConfig {
            // Impossible bar: every output alerts on confidence.
            min_confidence: 2.0,
            ..Default::default()
        },
        ..Default::default()
    })
    .unwrap();
    pipeline.initialize().unwrap();

    let alerts: Arc<Mutex<Vec<(String, Severity)>>> = Arc::default();
    let alerts_sink = alerts.clone();
    pipeline.health_mut().register_alert_sink(move |message, severity| {
        alerts_sink.lock().unwrap().push((message.to_string(), severity));
    });

    let request = GenerationRequest::new("anything").tier(Tier::Preview);
    pipeline.generate(&request, gradient).unwrap();

    let alerts = alerts.lock().unwrap();
    assert!(alerts.iter().any(|(_, s)| *s == Severity::Low));
}

#[test]
fn executing_an_unactivated_plugin_is_an_error() {
    let mut pipeline = ready_pipeline();

    pipeline.plugins_mut().register(phenex::Plugin::new(
        "p1",
        "P1",
        PluginKind::Postprocessor,
        "1.0.0",
        |input, _| Ok(input.to_vec()),
    ));

    let result = pipeline.plugins_mut().execute("p1", &[1.0], None);
    assert!(matches!(result, Err(PluginError::NotActive { .. })));
}

#[test]
fn active_postprocessor_transforms_the_generated_image() {
    let mut pipeline = ready_pipeline();

    pipeline.plugins_mut().register(phenex::Plugin::new(
        "invert",
        "Invert",
        PluginKind::Postprocessor,
        "1.0.0",
        |input, _| Ok(input.iter().map(|v| 1.0 - v).collect()),
    ));
    pipeline.plugins_mut().activate("invert").unwrap();

    let request = GenerationRequest::new("flat").tier(Tier::Preview);
    let result = pipeline
        .generate(&request, |_, scale| {
            let side = ((16.0 * scale) as usize).max(2);
            Ok(Frame::filled(side, side, 0.2))
        })
        .unwrap();

    for v in result.image.data() {
        assert!((v - 0.8).abs() < 1e-6);
    }
}

#[test]
fn failing_postprocessor_fails_the_generation() {
    let mut pipeline = ready_pipeline();

    pipeline.plugins_mut().register(phenex::Plugin::new(
        "broken",
        "Broken",
        PluginKind::Postprocessor,
        "1.0.0",
        |_, _| Err("postprocessing fault".to_string()),
    ));
    pipeline.plugins_mut().activate("broken").unwrap();

    let request = GenerationRequest::new("x").tier(Tier::Preview);
    let result = pipeline.generate(&request, gradient);
    assert!(matches!(result, Err(Error::Plugin(_))));
}

#[test]
fn default_plugins_ship_registered_but_inactive() {
    let pipeline = ready_pipeline();
    let registered = pipeline.plugins().list_registered();

    assert!(registered.contains(&"builtin.denoise"));
    assert!(registered.contains(&"builtin.sharpen"));
    assert!(pipeline.plugins().list_active().is_empty());
}

#[test]
fn health_report_stays_advisory() {
    // A degrading health trend must never fail generation.
    let mut pipeline = Orchestrator::new(PipelineConfig {
        health: HealthConfig {
            min_stability: 0.99,
            ..Default::default()
        },
        ..Default::default()
    })
    .unwrap();
    pipeline.initialize().unwrap();

    for i in 0..12 {
        // Wildly different outputs per call keep stability near zero.
        let request = GenerationRequest::new(format!("scene {i}")).tier(Tier::Preview);
        let offset = i as f32;
        pipeline
            .generate(&request, move |_, scale| {
                let side = ((16.0 * scale) as usize).max(2);
                let data = (0..side * side)
                    .map(|p| if (p as f32 + offset) as usize % 2 == 0 { 1.0 } else { 0.0 })
                    .collect();
                Frame::new(side, side, data)
            })
            .unwrap();
    }

    let report = pipeline.health().report();
    assert!(report.metrics.output_stability < 0.99);
}
