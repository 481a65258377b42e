//! Research lifecycle state machine
//!
//! `inactive -> active -> closed`. A single toggle drives both transitions and
//! stamps the start or end time. `closed` is terminal.

use crate::error::TransitionError;
use crate::types::{Research, ResearchId, ResearchState};
use chrono::{DateTime, Duration, Utc};

/// Outcome of a successful toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub research_id: ResearchId,
    pub from: ResearchState,
    pub to: ResearchState,
    pub at: DateTime<Utc>,
}

pub fn allowed_transitions(from: ResearchState) -> Vec<ResearchState> {
    use ResearchState::*;
    match from {
        Inactive => vec![Active],
        Active => vec![Closed],
        Closed => vec![],
    }
}

pub fn validate_transition(from: ResearchState, to: ResearchState) -> Result<(), TransitionError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else if from == ResearchState::Closed {
        Err(TransitionError::AlreadyClosed)
    } else {
        Err(TransitionError::NotEditable(from))
    }
}

/// State the toggle operation moves `from` into.
pub fn next_state(from: ResearchState) -> Result<ResearchState, TransitionError> {
    allowed_transitions(from)
        .first()
        .copied()
        .ok_or(TransitionError::AlreadyClosed)
}

/// Apply the toggle to `research`, stamping the timestamp of the new state.
///
/// The end time is kept strictly after the start time even when the clock
/// reports the same instant for both.
pub fn toggle(research: &mut Research, now: DateTime<Utc>) -> Result<StatusChange, TransitionError> {
    let from = research.state;
    let to = next_state(from)?;
    validate_transition(from, to)?;

    let at = match to {
        ResearchState::Active => {
            research.start_time = Some(now);
            now
        }
        ResearchState::Closed => {
            let at = match research.start_time {
                Some(start) if now <= start => start + Duration::microseconds(1),
                _ => now,
            };
            research.end_time = Some(at);
            at
        }
        ResearchState::Inactive => now,
    };
    research.state = to;

    Ok(StatusChange {
        research_id: research.id,
        from,
        to,
        at,
    })
}

/// Content (title, description, visibility, criteria) may change only while inactive.
pub fn ensure_editable(state: ResearchState) -> Result<(), TransitionError> {
    match state {
        ResearchState::Inactive => Ok(()),
        other => Err(TransitionError::NotEditable(other)),
    }
}

/// Questionnaires, questions and alternatives may be added until the research closes.
pub fn ensure_open(state: ResearchState) -> Result<(), TransitionError> {
    match state {
        ResearchState::Closed => Err(TransitionError::ResearchClosed),
        _ => Ok(()),
    }
}

pub fn ensure_collecting(state: ResearchState) -> Result<(), TransitionError> {
    match state {
        ResearchState::Active => Ok(()),
        other => Err(TransitionError::NotCollecting(other)),
    }
}
