//! Per-order lifecycle state machine.
//!
//! ```text
//! Created -> AwaitingConfirmation -> Confirmed -> AwaitingDecryption
//!         -> Decrypted -> Queued -> { Settled | Failed }
//! ```
//!
//! Transitions are total: every `(stage, event)` pair yields a
//! [`Transition`], and events that do not apply are reported as ignored
//! rather than rejected, so duplicate or out-of-order delivery is harmless.

use cipherbook_sdk::objects::{OrderProgress, OrderStatus, StepState, TerminalStatus};

/// Declaration order is lifecycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Created,
    AwaitingConfirmation,
    Confirmed,
    AwaitingDecryption,
    Decrypted,
    Queued,
    Settled,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// The placement transaction was submitted.
    Submitted,
    /// A placement event for the local wallet was decoded from the
    /// submission receipt.
    Placed,
    /// Decryption polling started for the order's handle.
    DecryptionStarted,
    /// The poller reported the handle as decrypted.
    Decrypted,
    /// Hand-off to asynchronous settlement tracking.
    Queued,
    Settled,
    Failed,
}

impl From<TerminalStatus> for LifecycleEvent {
    fn from(value: TerminalStatus) -> Self {
        match value {
            TerminalStatus::Completed => LifecycleEvent::Settled,
            TerminalStatus::Failed => LifecycleEvent::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IgnoreReason {
    /// The order already reached `Settled` or `Failed`.
    Terminal,
    /// The order is already at or past the event's target stage.
    Duplicate,
    /// The event's preconditions are not met yet.
    OutOfOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Advanced { from: Stage, to: Stage },
    Ignored { stage: Stage, reason: IgnoreReason },
}

impl Transition {
    pub fn is_advanced(&self) -> bool {
        matches!(self, Transition::Advanced { .. })
    }

    /// The stage after applying the event.
    pub fn stage(&self) -> Stage {
        match *self {
            Transition::Advanced { to, .. } => to,
            Transition::Ignored { stage, .. } => stage,
        }
    }
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Settled | Stage::Failed)
    }

    pub fn status(self) -> OrderStatus {
        match self {
            Stage::Settled => OrderStatus::Completed,
            Stage::Failed => OrderStatus::Failed,
            _ => OrderStatus::Executing,
        }
    }

    pub fn apply(self, event: LifecycleEvent) -> Transition {
        if self.is_terminal() {
            return Transition::Ignored {
                stage: self,
                reason: IgnoreReason::Terminal,
            };
        }

        let (target, accepted_from): (Stage, &[Stage]) = match event {
            LifecycleEvent::Submitted => (Stage::AwaitingConfirmation, &[Stage::Created]),
            LifecycleEvent::Placed => (Stage::Confirmed, &[Stage::AwaitingConfirmation]),
            LifecycleEvent::DecryptionStarted => (Stage::AwaitingDecryption, &[Stage::Confirmed]),
            LifecycleEvent::Decrypted => (
                Stage::Decrypted,
                &[Stage::Confirmed, Stage::AwaitingDecryption],
            ),
            LifecycleEvent::Queued => (Stage::Queued, &[Stage::Decrypted]),
            LifecycleEvent::Settled => {
                return Transition::Advanced {
                    from: self,
                    to: Stage::Settled,
                };
            }
            LifecycleEvent::Failed => {
                return Transition::Advanced {
                    from: self,
                    to: Stage::Failed,
                };
            }
        };

        if accepted_from.contains(&self) {
            Transition::Advanced {
                from: self,
                to: target,
            }
        } else if self >= target {
            Transition::Ignored {
                stage: self,
                reason: IgnoreReason::Duplicate,
            }
        } else {
            Transition::Ignored {
                stage: self,
                reason: IgnoreReason::OutOfOrder,
            }
        }
    }

    /// Step states for the confirmation / decryption / settlement guide.
    ///
    /// A failure is attributed to settlement once a handle is known, and
    /// to confirmation before that.
    pub fn progress(self, handle_known: bool) -> OrderProgress {
        use StepState::*;

        let (confirmation, decryption, settlement) = match self {
            Stage::Created => (Idle, Idle, Idle),
            Stage::AwaitingConfirmation => (Loading, Idle, Idle),
            Stage::Confirmed | Stage::AwaitingDecryption => (Success, Loading, Idle),
            Stage::Decrypted | Stage::Queued => (Success, Success, Loading),
            Stage::Settled => (Success, Success, Success),
            Stage::Failed if handle_known => (Success, Success, Error),
            Stage::Failed => (Error, Idle, Idle),
        };

        OrderProgress {
            confirmation,
            decryption,
            settlement,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STAGES: [Stage; 8] = [
        Stage::Created,
        Stage::AwaitingConfirmation,
        Stage::Confirmed,
        Stage::AwaitingDecryption,
        Stage::Decrypted,
        Stage::Queued,
        Stage::Settled,
        Stage::Failed,
    ];

    const ALL_EVENTS: [LifecycleEvent; 7] = [
        LifecycleEvent::Submitted,
        LifecycleEvent::Placed,
        LifecycleEvent::DecryptionStarted,
        LifecycleEvent::Decrypted,
        LifecycleEvent::Queued,
        LifecycleEvent::Settled,
        LifecycleEvent::Failed,
    ];

    #[test]
    fn test_happy_path() {
        let mut stage = Stage::Created;
        for event in [
            LifecycleEvent::Submitted,
            LifecycleEvent::Placed,
            LifecycleEvent::DecryptionStarted,
            LifecycleEvent::Decrypted,
            LifecycleEvent::Queued,
            LifecycleEvent::Settled,
        ] {
            let transition = stage.apply(event);
            assert!(transition.is_advanced(), "{event:?} from {stage:?}");
            stage = transition.stage();
        }
        assert_eq!(stage, Stage::Settled);
        assert_eq!(stage.status(), OrderStatus::Completed);
    }

    #[test]
    fn test_terminal_stages_are_never_left() {
        for stage in [Stage::Settled, Stage::Failed] {
            for event in ALL_EVENTS {
                assert_eq!(
                    stage.apply(event),
                    Transition::Ignored {
                        stage,
                        reason: IgnoreReason::Terminal
                    }
                );
            }
        }
    }

    #[test]
    fn test_duplicate_placement_is_ignored() {
        assert_eq!(
            Stage::Confirmed.apply(LifecycleEvent::Placed),
            Transition::Ignored {
                stage: Stage::Confirmed,
                reason: IgnoreReason::Duplicate
            }
        );
        assert_eq!(
            Stage::Queued.apply(LifecycleEvent::Decrypted).stage(),
            Stage::Queued
        );
    }

    #[test]
    fn test_out_of_order_events() {
        assert_eq!(
            Stage::Created.apply(LifecycleEvent::Placed),
            Transition::Ignored {
                stage: Stage::Created,
                reason: IgnoreReason::OutOfOrder
            }
        );
        assert!(!Stage::AwaitingConfirmation
            .apply(LifecycleEvent::Queued)
            .is_advanced());
    }

    #[test]
    fn test_outcome_accepted_from_any_live_stage() {
        for stage in ALL_STAGES.into_iter().filter(|s| !s.is_terminal()) {
            assert_eq!(stage.apply(LifecycleEvent::Settled).stage(), Stage::Settled);
            assert_eq!(stage.apply(LifecycleEvent::Failed).stage(), Stage::Failed);
        }
    }

    #[test]
    fn test_transitions_never_move_backwards() {
        for stage in ALL_STAGES {
            for event in ALL_EVENTS {
                if let Transition::Advanced { from, to } = stage.apply(event) {
                    assert!(to > from, "{from:?} -> {to:?}");
                }
            }
        }
    }

    #[test]
    fn test_progress_mapping() {
        use StepState::*;
        let p = |c, d, s| OrderProgress {
            confirmation: c,
            decryption: d,
            settlement: s,
        };

        assert_eq!(Stage::Created.progress(false), p(Idle, Idle, Idle));
        assert_eq!(
            Stage::AwaitingConfirmation.progress(false),
            p(Loading, Idle, Idle)
        );
        assert_eq!(
            Stage::AwaitingDecryption.progress(true),
            p(Success, Loading, Idle)
        );
        assert_eq!(Stage::Queued.progress(true), p(Success, Success, Loading));
        assert_eq!(Stage::Settled.progress(true), p(Success, Success, Success));
        assert_eq!(Stage::Failed.progress(true), p(Success, Success, Error));
        assert_eq!(Stage::Failed.progress(false), p(Error, Idle, Idle));
    }
}
