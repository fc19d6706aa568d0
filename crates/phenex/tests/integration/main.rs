//! Integration tests for the full pipeline.

mod full_pipeline;
mod monitoring_and_plugins;
