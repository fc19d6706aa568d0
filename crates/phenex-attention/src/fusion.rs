//! Multi-scale attention fusion.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use phenex_core::{Error, Result};

/// Attention fusion configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttentionConfig {
    /// Maximum recursion depth before the base pass runs.
    pub max_depth: u32,
    /// Head segments used by the base pass.
    pub num_heads: usize,
    /// Contiguous partitions per recursion level.
    pub partitions: usize,
    /// Magnitude cutoff for [`AttentionFusion::apply_sparse`].
    pub sparsity_threshold: f32,
    /// Pad short key/value buffers with zeros instead of failing.
    ///
    /// Zero-padding masks length-mismatch bugs upstream, so this is an
    /// explicit choice rather than a silent default.
    pub pad_missing: bool,
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            num_heads: 4,
            partitions: 4,
            sparsity_threshold: 0.01,
            pad_missing: true,
        }
    }
}

impl AttentionConfig {
    /// Set the maximum recursion depth.
    pub fn max_depth(mut self, depth: u32) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the number of head segments.
    pub fn heads(mut self, heads: usize) -> Self {
        self.num_heads = heads;
        self
    }

    /// Set the partition count per recursion level.
    pub fn partitions(mut self, partitions: usize) -> Self {
        self.partitions = partitions;
        self
    }

    /// Set the sparsity threshold.
    pub fn sparsity_threshold(mut self, threshold: f32) -> Self {
        self.sparsity_threshold = threshold;
        self
    }

    /// Require key/value to be at least query-length.
    pub fn strict_lengths(mut self) -> Self {
        self.pad_missing = false;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.num_heads == 0 {
            return Err(Error::configuration("num_heads must be > 0"));
        }
        if self.partitions < 2 {
            return Err(Error::configuration("partitions must be >= 2"));
        }
        Ok(())
    }
}

/// Computes a fused weighted combination over a query/key/value triple.
#[derive(Debug, Clone)]
pub struct AttentionFusion {
    config: AttentionConfig,
}

impl AttentionFusion {
    /// Creates a fusion module, validating the configuration.
    pub fn new(config: AttentionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &AttentionConfig {
        &self.config
    }

    /// Fuses query/key/value into a single buffer of query length.
    ///
    /// Key/value buffers shorter than the query are zero-padded when
    /// `pad_missing` is set, and rejected with
    /// [`Error::LengthMismatch`] otherwise. Longer buffers are truncated to
    /// query length.
    pub fn fuse(&self, query: &[f32], key: &[f32], value: &[f32]) -> Result<Vec<f32>> {
        let key = self.align(query.len(), key)?;
        let value = self.align(query.len(), value)?;
        Ok(self.fuse_at(query, key.as_ref(), value.as_ref(), self.config.max_depth))
    }

    /// Zeroes every element whose magnitude falls below the configured
    /// sparsity threshold. Pure, stateless post-filter.
    pub fn apply_sparse(&self, buffer: &mut [f32]) {
        self.apply_sparse_with(buffer, self.config.sparsity_threshold);
    }

    /// [`apply_sparse`](Self::apply_sparse) with an explicit threshold.
    pub fn apply_sparse_with(&self, buffer: &mut [f32], threshold: f32) {
        for v in buffer.iter_mut() {
            if v.abs() < threshold {
                *v = 0.0;
            }
        }
    }

    fn align<'a>(&self, expected: usize, buffer: &'a [f32]) -> Result<Cow<'a, [f32]>> {
        if buffer.len() >= expected {
            return Ok(Cow::Borrowed(&buffer[..expected]));
        }
        if !self.config.pad_missing {
            return Err(Error::LengthMismatch {
                expected,
                actual: buffer.len(),
            });
        }
        let mut padded = buffer.to_vec();
        padded.resize(expected, 0.0);
        Ok(Cow::Owned(padded))
    }

    fn fuse_at(&self, query: &[f32], key: &[f32], value: &[f32], depth: u32) -> Vec<f32> {
        if depth == 0 || query.len() < self.config.partitions {
            return self.base_pass(query, key, value);
        }

        let mut fused = Vec::with_capacity(query.len());
        for (q, (k, v)) in partition(query, self.config.partitions)
            .zip(partition(key, self.config.partitions).zip(partition(value, self.config.partitions)))
        {
            fused.extend(self.fuse_at(q, k, v, depth - 1));
        }
        fused
    }

    /// Base attention pass: per-head elementwise scores, numerically stable
    /// softmax, elementwise application to the value buffer.
    fn base_pass(&self, query: &[f32], key: &[f32], value: &[f32]) -> Vec<f32> {
        let mut out = Vec::with_capacity(query.len());
        let head_len = query.len().div_ceil(self.config.num_heads).max(1);

        for start in (0..query.len()).step_by(head_len) {
            let end = (start + head_len).min(query.len());
            let scores: Vec<f32> = query[start..end]
                .iter()
                .zip(key[start..end].iter())
                .map(|(q, k)| q * k)
                .collect();

            let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
            let sum: f32 = exps.iter().sum();

            for (weight, v) in exps.iter().zip(value[start..end].iter()) {
                if sum > 0.0 {
                    out.push(weight / sum * v);
                } else {
                    out.push(0.0);
                }
            }
        }
        out
    }
}

/// Splits a slice into `count` contiguous near-equal partitions; the last
/// partition absorbs any remainder.
fn partition(buffer: &[f32], count: usize) -> impl Iterator<Item = &[f32]> {
    let base = buffer.len() / count;
    (0..count).map(move |i| {
        let start = i * base;
        let end = if i + 1 == count {
            buffer.len()
        } else {
            start + base
        };
        &buffer[start..end]
    })
}
