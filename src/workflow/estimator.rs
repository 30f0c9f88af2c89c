use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::models::emission::{EmissionEstimate, EmissionInput};
use crate::outbound::{bounded, EmissionCalculator};

#[derive(Debug, Clone, PartialEq)]
pub enum EstimateOutcome {
    Ready {
        input: EmissionInput,
        estimate: EmissionEstimate,
    },
    Failed {
        input: EmissionInput,
        message: String,
    },
}

/// Debounced manual emission calculation.
///
/// Inputs only go out once they have been left alone for the quiet period;
/// every settled input triggers exactly one calculation. Dropping the
/// estimator stops its task.
pub struct EmissionEstimator {
    input_tx: watch::Sender<Option<EmissionInput>>,
    outcome_rx: watch::Receiver<Option<EstimateOutcome>>,
}

impl EmissionEstimator {
    pub fn spawn(
        calculator: Arc<dyn EmissionCalculator>,
        quiet_period: Duration,
        call_timeout: Duration,
    ) -> Self {
        let (input_tx, input_rx) = watch::channel(None);
        let (outcome_tx, outcome_rx) = watch::channel(None);

        tokio::spawn(run_estimator(
            calculator,
            quiet_period,
            call_timeout,
            input_rx,
            outcome_tx,
        ));

        Self {
            input_tx,
            outcome_rx,
        }
    }

    /// Called on every change to distance, weight or mode.
    pub fn update(&self, input: EmissionInput) {
        self.input_tx.send_replace(Some(input));
    }

    pub fn latest(&self) -> Option<EstimateOutcome> {
        self.outcome_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<EstimateOutcome>> {
        self.outcome_rx.clone()
    }
}

async fn run_estimator(
    calculator: Arc<dyn EmissionCalculator>,
    quiet_period: Duration,
    call_timeout: Duration,
    mut input_rx: watch::Receiver<Option<EmissionInput>>,
    outcome_tx: watch::Sender<Option<EstimateOutcome>>,
) {
    while input_rx.changed().await.is_ok() {
        // Restart the quiet period on every further change.
        loop {
            tokio::select! {
                changed = input_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                _ = sleep(quiet_period) => break,
            }
        }

        let Some(input) = *input_rx.borrow_and_update() else {
            continue;
        };

        debug!(?input, "calculating emissions");
        let outcome = match bounded(call_timeout, calculator.calculate(&input)).await {
            Ok(estimate) => EstimateOutcome::Ready { input, estimate },
            Err(err) => {
                warn!(error = %err, "emission calculation failed");
                EstimateOutcome::Failed {
                    input,
                    message: err.to_string(),
                }
            }
        };
        outcome_tx.send_replace(Some(outcome));
    }
}
