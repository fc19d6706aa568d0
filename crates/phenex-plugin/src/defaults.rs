//! The five default plugins.

use serde_json::{json, Value};

use crate::registry::{Plugin, PluginKind};

/// Half-width of the noise-reduction moving average.
const SMOOTHING_RADIUS: usize = 3;

/// Builds the default plugin set, registered (inactive) at registry
/// construction.
#[must_use]
pub fn default_plugins() -> Vec<Plugin> {
    vec![
        loss_estimator(),
        guidance_stage(),
        noise_reduction(),
        sharpening(),
        adaptive_learning_rate(),
    ]
}

/// Mean-squared-magnitude loss estimate; returns a single-element buffer.
fn loss_estimator() -> Plugin {
    Plugin::new(
        "builtin.loss",
        "Loss Estimator",
        PluginKind::Loss,
        "1.0.0",
        |input, _| {
            if input.is_empty() {
                return Ok(vec![0.0]);
            }
            let mse = input.iter().map(|v| v * v).sum::<f32>() / input.len() as f32;
            Ok(vec![mse])
        },
    )
}

/// Scales the buffer by the configured guidance strength.
fn guidance_stage() -> Plugin {
    Plugin::new(
        "builtin.guidance",
        "Guidance Stage",
        PluginKind::Guidance,
        "1.0.0",
        |input, cfg| {
            let strength = cfg.get("strength").and_then(Value::as_f64).unwrap_or(1.5) as f32;
            Ok(input.iter().map(|v| v * strength).collect())
        },
    )
    .with_config(json!({ "strength": 1.5 }))
}

/// Moving-average smoothing over a ±3 window.
fn noise_reduction() -> Plugin {
    Plugin::new(
        "builtin.denoise",
        "Noise Reduction",
        PluginKind::Preprocessor,
        "1.0.0",
        |input, _| {
            let n = input.len();
            let mut out = Vec::with_capacity(n);
            for i in 0..n {
                let lo = i.saturating_sub(SMOOTHING_RADIUS);
                let hi = (i + SMOOTHING_RADIUS + 1).min(n);
                let sum: f32 = input[lo..hi].iter().sum();
                out.push(sum / (hi - lo) as f32);
            }
            Ok(out)
        },
    )
}

/// Unsharp-mask sharpening against a ±1 local mean.
fn sharpening() -> Plugin {
    Plugin::new(
        "builtin.sharpen",
        "Sharpening",
        PluginKind::Postprocessor,
        "1.0.0",
        |input, cfg| {
            let strength = cfg.get("strength").and_then(Value::as_f64).unwrap_or(0.5) as f32;
            let n = input.len();
            let mut out = Vec::with_capacity(n);
            for i in 0..n {
                let lo = i.saturating_sub(1);
                let hi = (i + 2).min(n);
                let local_mean = input[lo..hi].iter().sum::<f32>() / (hi - lo) as f32;
                out.push(input[i] + strength * (input[i] - local_mean));
            }
            Ok(out)
        },
    )
    .with_config(json!({ "strength": 0.5 }))
}

/// Adjusts a learning rate from `[rate, loss]`: −10% when loss exceeds 1.0,
/// +5% when loss falls below 0.1.
fn adaptive_learning_rate() -> Plugin {
    Plugin::new(
        "builtin.adaptive-lr",
        "Adaptive Learning Rate",
        PluginKind::Optimizer,
        "1.0.0",
        |input, _| {
            let rate = input[0];
            let loss = input[1];
            let adjusted = if loss > 1.0 {
                rate * 0.9
            } else if loss < 0.1 {
                rate * 1.05
            } else {
                rate
            };
            Ok(vec![adjusted])
        },
    )
    .with_validate(|input| input.len() == 2)
}
