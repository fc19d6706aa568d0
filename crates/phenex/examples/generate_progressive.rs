//! Progressive generation walkthrough.
//!
//! Drives one standard-tier request through the full pipeline with a
//! synthetic base generator standing in for a host image backend, printing
//! progress as the scale ladder runs.
//!
//! Run with:
//!   cargo run --example generate_progressive

use phenex::prelude::*;

/// Stand-in backend: a diagonal gradient whose side length follows the
/// requested scale.
fn synthetic_backend(_prompt: &str, scale: f32) -> phenex::CoreResult<Frame> {
    let side = ((64.0 * scale) as usize).max(2);
    let data = (0..side * side)
        .map(|i| {
            let x = i % side;
            let y = i / side;
            ((x + y) as f32 / (2 * side) as f32).min(1.0)
        })
        .collect();
    Frame::new(side, side, data)
}

fn main() -> phenex::Result<()> {
    let mut pipeline = Orchestrator::new(PipelineConfig::default())?;
    pipeline.initialize()?;

    let request = GenerationRequest::new("a mountain lake at first light")
        .style("watercolor")
        .tier(ResolutionTier::High);

    println!("generating: {}", request.effective_prompt());

    let result = pipeline.generate_with_progress(
        &request,
        |fraction, label| println!("  {:>5.1}%  {label}", fraction * 100.0),
        synthetic_backend,
    )?;

    println!();
    println!("image:        {}x{}", result.image.width(), result.image.height());
    println!("quality:      {:.3}", result.quality);
    println!("elapsed:      {:.2} ms", result.generation_time_ms);
    println!("memory est.:  {:.1} MB", result.memory_used_mb);
    println!("stages used:  {}", result.stages_used);

    Ok(())
}
