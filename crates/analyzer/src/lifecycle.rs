//! State tracking and fan-out shared by the built-in analyzers.

use std::sync::Arc;

use lumen_core::error::{CollectorError, PipelineError};
use lumen_core::event::MetricGroup;
use lumen_core::pipeline::{ComponentState, Consumer};
use parking_lot::Mutex;

/// Lifecycle state guarded for `&self` access.
#[derive(Debug)]
pub(crate) struct StateCell(Mutex<ComponentState>);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(Mutex::new(ComponentState::Created))
    }

    pub(crate) fn get(&self) -> ComponentState {
        *self.0.lock()
    }

    /// Runs `check` and moves to `Running`.
    ///
    /// A second start while running fails and leaves the analyzer running. A
    /// failing `check` moves the analyzer to `Failed`; a later start may retry.
    pub(crate) fn start_with<F>(&self, check: F) -> Result<(), CollectorError>
    where
        F: FnOnce() -> Result<(), CollectorError>,
    {
        let mut state = self.0.lock();
        if *state == ComponentState::Running {
            return Err(PipelineError::AlreadyRunning.into());
        }
        if let Err(e) = check() {
            *state = ComponentState::Failed;
            return Err(e);
        }
        *state = ComponentState::Running;
        Ok(())
    }

    /// Moves to `Stopped`. Returns `false` if it was not running.
    pub(crate) fn stop(&self) -> bool {
        let mut state = self.0.lock();
        if *state != ComponentState::Running {
            return false;
        }
        *state = ComponentState::Stopped;
        true
    }

    /// Rejects work unless running.
    pub(crate) fn ensure_running(&self, stage: &str) -> Result<(), CollectorError> {
        if self.get() != ComponentState::Running {
            return Err(PipelineError::ConsumeFailed {
                stage: stage.to_owned(),
                reason: "analyzer not running".to_owned(),
            }
            .into());
        }
        Ok(())
    }
}

/// Start check shared by every analyzer: something must be routed to it.
pub(crate) fn require_events(stage: &str, events: &[String]) -> Result<(), CollectorError> {
    if events.is_empty() {
        return Err(PipelineError::InitFailed(format!("{stage}: no consumable events")).into());
    }
    Ok(())
}

/// Hands `group` to every consumer; each gets its own copy.
///
/// Every consumer is attempted. Failures are joined into one
/// [`PipelineError::ConsumeFailed`].
pub(crate) fn fan_out(
    stage: &str,
    consumers: &[Arc<dyn Consumer>],
    group: MetricGroup,
) -> Result<(), CollectorError> {
    let mut errors = Vec::new();
    if let Some((last, rest)) = consumers.split_last() {
        for consumer in rest {
            if let Err(e) = consumer.consume(group.clone()) {
                errors.push(e.to_string());
            }
        }
        if let Err(e) = last.consume(group) {
            errors.push(e.to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::ConsumeFailed {
            stage: stage.to_owned(),
            reason: errors.join("; "),
        }
        .into())
    }
}
