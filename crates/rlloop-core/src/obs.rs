//! Structured observability hooks for the self-play loop.
//!
//! This module provides:
//! - An iteration-scoped tracing span via the `LoopSpan` RAII guard
//! - Emission functions for lifecycle events: registry scan, computed flags,
//!   self-play start/finish, and timers left open at shutdown

use std::path::Path;

use tracing::info;

/// RAII guard that enters an iteration-scoped tracing span.
///
/// # Example
///
/// ```ignore
/// let _span = LoopSpan::enter(17, 3);
/// // all tracing calls now carry seed = 17 and iteration = 3
/// ```
pub struct LoopSpan {
    _span: tracing::span::EnteredSpan,
}

impl LoopSpan {
    pub fn enter(seed: i64, iteration: i64) -> Self {
        let span = tracing::info_span!("rlloop.iteration", seed = seed, iteration = iteration);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: the models directory was scanned.
pub fn emit_registry_scanned(models_dir: &Path, model_count: usize) {
    tracing::debug!(
        event = "registry.scanned",
        models_dir = %models_dir.display(),
        model_count = model_count,
    );
}

/// Emit event: one computed directory.
pub fn emit_flag_computed(flag: &str, value: &Path) {
    info!(event = "flags.computed", flag = %flag, value = %value.display());
}

/// Emit event: self-play process about to run.
pub fn emit_selfplay_started(model_name: &str, command_line: &str) {
    info!(event = "selfplay.started", model = %model_name, command = %command_line);
}

/// Emit event: self-play process ended.
pub fn emit_selfplay_finished(model_name: &str, duration_ms: u64, success: bool) {
    info!(
        event = "selfplay.finished",
        model = %model_name,
        duration_ms = duration_ms,
        success = success,
    );
}

/// Emit event: a timer was still open when the stats sink closed (warning level).
pub fn emit_timer_unclosed(label: &str) {
    tracing::warn!(event = "timer.unclosed", label = %label);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_span_create() {
        let _span = LoopSpan::enter(42, 0);
    }
}
