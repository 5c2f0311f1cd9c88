use crate::error::{FailureClass, ItemError};

use super::item::{AttemptOutcome, ItemRun, ItemState};

/// The result of evaluating a state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Artifacts already exist; nothing to do.
    Skip,
    /// Begin the first attempt.
    Start,
    /// Wait, then try again. `backoff_attempt` is the 0-based index of the
    /// attempt that just failed.
    Retry {
        backoff_attempt: u32,
        class: FailureClass,
    },
    /// The item reached a terminal state.
    Complete(ItemState),
}

/// Drives an [`ItemRun`] through its lifecycle.
pub struct StateMachine;

impl StateMachine {
    /// Leave `Pending`: skip when both artifacts exist, otherwise start running.
    pub fn begin(run: &mut ItemRun, artifacts_complete: bool) -> Transition {
        if run.state != ItemState::Pending {
            return Transition::Complete(run.state);
        }
        let (next, transition) = if artifacts_complete {
            (ItemState::Skipped, Transition::Skip)
        } else {
            (ItemState::Running, Transition::Start)
        };
        run.state_history.push(run.state);
        run.state = next;
        transition
    }

    /// Apply the outcome of one attempt to a running item.
    ///
    /// - Success ends in `Succeeded` and clears the attempt state.
    /// - A fatal failure ends in `Failed` at once.
    /// - Any other failure retries while `attempt <= max_retries`, so an item
    ///   gets at most `max_retries + 1` attempts, then ends in `Failed`.
    ///
    /// Outside `Running` this is a no-op returning the current state.
    pub fn next(run: &mut ItemRun, outcome: AttemptOutcome) -> Transition {
        if run.state != ItemState::Running {
            return Transition::Complete(run.state);
        }

        let transition = match outcome {
            AttemptOutcome::Success => Transition::Complete(ItemState::Succeeded),
            AttemptOutcome::Failure { class, message } => Self::handle_failure(run, class, message),
        };

        match &transition {
            Transition::Complete(state) => {
                run.state_history.push(run.state);
                run.state = *state;
                if *state == ItemState::Succeeded {
                    run.attempts = Default::default();
                }
            }
            Transition::Retry { .. } => {
                // State stays Running; the attempt counter was bumped in handle_failure.
                run.state_history.push(run.state);
            }
            Transition::Skip | Transition::Start => {}
        }

        transition
    }

    fn handle_failure(run: &mut ItemRun, class: FailureClass, message: String) -> Transition {
        run.attempts.attempt += 1;
        if class.is_rate_limited() {
            run.attempts.consecutive_penalty += 1;
        }
        run.attempts.last_error = message;

        if class == FailureClass::Fatal {
            run.error = Some(ItemError::Fatal {
                last_error: run.attempts.last_error.clone(),
            });
            return Transition::Complete(ItemState::Failed);
        }

        if run.attempts.attempt <= run.retry_config.max_retries {
            Transition::Retry {
                backoff_attempt: run.attempts.attempt - 1,
                class,
            }
        } else {
            run.error = Some(ItemError::RetriesExhausted {
                attempts: run.attempts.attempt,
                last_error: run.attempts.last_error.clone(),
            });
            Transition::Complete(ItemState::Failed)
        }
    }
}
