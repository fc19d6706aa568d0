//! Health monitoring and self-optimization walkthrough.
//!
//! Runs a batch of generations with an alert sink attached, then a couple of
//! optimization cycles, and prints the resulting status, trend, and tuning
//! suggestions.
//!
//! Run with:
//!   cargo run --example monitor_and_optimize

use phenex::prelude::*;
use phenex::Severity;

fn synthetic_backend(_prompt: &str, scale: f32) -> phenex::CoreResult<Frame> {
    let side = ((48.0 * scale) as usize).max(2);
    let data = (0..side * side)
        .map(|i| if i % 3 == 0 { 0.2 } else { 0.7 })
        .collect();
    Frame::new(side, side, data)
}

fn main() -> phenex::Result<()> {
    let mut pipeline = Orchestrator::new(PipelineConfig::default())?;
    pipeline.initialize()?;

    pipeline.health_mut().register_alert_sink(|message, severity| {
        let tag = match severity {
            Severity::High => "HIGH",
            Severity::Medium => "MED ",
            Severity::Low => "LOW ",
        };
        println!("  alert [{tag}] {message}");
    });

    for i in 0..8 {
        let request = GenerationRequest::new(format!("study {i} of a windmill"));
        pipeline.generate(&request, synthetic_backend)?;
    }

    for _ in 0..2 {
        let outcome = pipeline.optimize(synthetic_backend)?;
        println!("optimization cycle: {outcome:?}");
    }

    let status = pipeline.status();
    println!();
    println!("active stages:       {}", status.architecture.active_count);
    println!("rolling complexity:  {:.3}", status.architecture.rolling_complexity);
    println!("engine avg latency:  {:.2} ms", status.engine.avg_latency_ms);
    println!("health window:       {} samples", status.health_window);
    println!("health trend:        {:?}", status.health_trend);
    println!("optimization gen:    {}", status.optimization_generation);

    let report = pipeline.health().report();
    for recommendation in &report.recommendations {
        println!("recommend: {recommendation}");
    }
    for suggestion in pipeline.optimization().suggestions() {
        println!("tune: {suggestion}");
    }

    println!();
    println!("exported state:\n{}", pipeline.export_state_json()?);

    Ok(())
}
