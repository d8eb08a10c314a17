use crate::errors::AppError;
use crate::models::{SessionStatus, QUESTION_COUNT};

/// Inputs that move a session between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Start,
    Submit,
    /// Countdown reached zero. Same effect as `Submit`.
    TimerExpired,
    Abort,
    EvaluationFinished,
}

/// Pure transition function for the interview state machine.
///
/// ```text
/// Idle ──Start──▶ Active(0) ──Submit──▶ Active(1) … Active(N-1) ──Submit──▶ AwaitingEvaluation
/// Active(i) ──Abort──▶ AwaitingEvaluation{early_stop}
/// AwaitingEvaluation ──EvaluationFinished──▶ Completed | Aborted
/// ```
pub fn transition(status: SessionStatus, event: SessionEvent) -> Result<SessionStatus, AppError> {
    use SessionEvent::*;
    use SessionStatus::*;

    match (status, event) {
        (Idle, Start) => Ok(Active { index: 0 }),
        (Active { index }, Submit | TimerExpired) if index + 1 >= QUESTION_COUNT => {
            Ok(AwaitingEvaluation { early_stop: false })
        }
        (Active { index }, Submit | TimerExpired) => Ok(Active { index: index + 1 }),
        (Active { .. }, Abort) => Ok(AwaitingEvaluation { early_stop: true }),
        (AwaitingEvaluation { early_stop: false }, EvaluationFinished) => Ok(Completed),
        (AwaitingEvaluation { early_stop: true }, EvaluationFinished) => Ok(Aborted),
        (status, event) => Err(AppError::InvalidTransition(format!(
            "{event:?} not allowed while {}",
            status.label()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_run_reaches_completed() {
        let mut status = transition(SessionStatus::Idle, SessionEvent::Start).unwrap();
        for expected in 1..QUESTION_COUNT {
            status = transition(status, SessionEvent::Submit).unwrap();
            assert_eq!(status, SessionStatus::Active { index: expected });
        }
        status = transition(status, SessionEvent::TimerExpired).unwrap();
        assert_eq!(status, SessionStatus::AwaitingEvaluation { early_stop: false });
        status = transition(status, SessionEvent::EvaluationFinished).unwrap();
        assert_eq!(status, SessionStatus::Completed);
    }

    #[test]
    fn test_abort_ends_in_aborted() {
        let status = transition(
            SessionStatus::Active { index: 4 },
            SessionEvent::Abort,
        )
        .unwrap();
        assert_eq!(status, SessionStatus::AwaitingEvaluation { early_stop: true });
        assert_eq!(
            transition(status, SessionEvent::EvaluationFinished).unwrap(),
            SessionStatus::Aborted
        );
    }

    #[test]
    fn test_submit_while_idle_is_rejected() {
        let err = transition(SessionStatus::Idle, SessionEvent::Submit).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
        assert!(err.to_string().contains("idle"));
    }

    #[test]
    fn test_terminal_states_accept_nothing() {
        for status in [SessionStatus::Completed, SessionStatus::Aborted] {
            for event in [
                SessionEvent::Start,
                SessionEvent::Submit,
                SessionEvent::Abort,
                SessionEvent::EvaluationFinished,
            ] {
                assert!(transition(status, event).is_err());
            }
        }
    }

    #[test]
    fn test_abort_while_awaiting_evaluation_is_rejected() {
        let status = SessionStatus::AwaitingEvaluation { early_stop: false };
        assert!(transition(status, SessionEvent::Abort).is_err());
        assert!(transition(status, SessionEvent::Submit).is_err());
    }
}
