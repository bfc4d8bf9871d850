//! Annotation processing tracks and their status state machine.
//!
//! Every annotation carries two tracks, processed strictly in order:
//! transcription, then enrichment. Each track moves through
//! `pending -> processing -> completed | failed`. The only backward edge is
//! `failed -> pending`, taken when a client explicitly re-triggers a track.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One processing stage of an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    Transcription,
    Enrichment,
}

impl Track {
    /// Tracks in execution order.
    pub const ORDER: [Track; 2] = [Track::Transcription, Track::Enrichment];

    pub fn as_str(self) -> &'static str {
        match self {
            Track::Transcription => "transcription",
            Track::Enrichment => "enrichment",
        }
    }

    /// The track that starts once this one completes.
    pub fn next(self) -> Option<Track> {
        match self {
            Track::Transcription => Some(Track::Enrichment),
            Track::Enrichment => None,
        }
    }
}

/// Status of a single track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TrackStatus {
    pub const ALL: [TrackStatus; 4] = [
        TrackStatus::Pending,
        TrackStatus::Processing,
        TrackStatus::Completed,
        TrackStatus::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TrackStatus::Pending => "pending",
            TrackStatus::Processing => "processing",
            TrackStatus::Completed => "completed",
            TrackStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid status '{s}'. Must be one of: pending, processing, completed, failed"
                ))
            })
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TrackStatus::Completed | TrackStatus::Failed)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    ///
    /// Staying in the same status is allowed so that repeated partial updates
    /// carrying an unchanged status are no-ops.
    pub fn can_transition_to(self, next: TrackStatus) -> bool {
        use TrackStatus::*;
        self == next
            || matches!(
                (self, next),
                (Pending, Processing)
                    | (Processing, Completed)
                    | (Processing, Failed)
                    | (Failed, Pending)
            )
    }

    /// Validate a transition, naming the track in the error.
    pub fn transition(self, track: Track, next: TrackStatus) -> Result<TrackStatus, CoreError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::Validation(format!(
                "{} status cannot move from '{}' to '{}'",
                track.as_str(),
                self.as_str(),
                next.as_str()
            )))
        }
    }
}

impl std::fmt::Display for TrackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `track` may enter `processing` given the current transcription status.
///
/// Enrichment only starts after transcription has completed.
pub fn may_start(track: Track, transcription: TrackStatus) -> bool {
    match track {
        Track::Transcription => true,
        Track::Enrichment => transcription == TrackStatus::Completed,
    }
}

/// Check a client-requested status edit against both current statuses.
///
/// Returns the resulting `(transcription, enrichment)` pair. Only the
/// pipeline moves a track into `processing`, and the enrichment status can
/// only change while transcription is (or ends up) `completed`.
pub fn check_manual_edit(
    current: (TrackStatus, TrackStatus),
    transcription: Option<TrackStatus>,
    enrichment: Option<TrackStatus>,
) -> Result<(TrackStatus, TrackStatus), CoreError> {
    let edit = |track: Track, from: TrackStatus, to: Option<TrackStatus>| match to {
        None => Ok(from),
        Some(to) if to == from => Ok(from),
        Some(TrackStatus::Processing) => Err(CoreError::Validation(format!(
            "{} status 'processing' is set by the pipeline only",
            track.as_str()
        ))),
        Some(to) => from.transition(track, to),
    };
    let transcription = edit(Track::Transcription, current.0, transcription)?;
    let enrichment = edit(Track::Enrichment, current.1, enrichment)?;
    if enrichment != current.1 && !may_start(Track::Enrichment, transcription) {
        return Err(CoreError::Validation(format!(
            "enrichment status cannot change while transcription is '{transcription}'"
        )));
    }
    Ok((transcription, enrichment))
}

/// The first track that still needs to run, given both statuses.
///
/// Returns `None` when both tracks are completed or when one is in flight.
pub fn resume_point(transcription: TrackStatus, enrichment: TrackStatus) -> Option<Track> {
    match (transcription, enrichment) {
        (TrackStatus::Pending, _) => Some(Track::Transcription),
        (TrackStatus::Completed, TrackStatus::Pending) => Some(Track::Enrichment),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn tracks_run_in_order() {
        assert_eq!(Track::Transcription.next(), Some(Track::Enrichment));
        assert_eq!(Track::Enrichment.next(), None);
        assert_eq!(Track::ORDER[0], Track::Transcription);
    }

    #[test]
    fn forward_transitions_are_allowed() {
        use TrackStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
        assert!(Failed.can_transition_to(Pending));
    }

    #[test]
    fn skipping_and_backward_transitions_are_rejected() {
        use TrackStatus::*;
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Failed));
        assert!(!Completed.can_transition_to(Processing));
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Failed.can_transition_to(Completed));
        assert!(!Processing.can_transition_to(Pending));
    }

    #[test]
    fn unchanged_status_is_a_noop_transition() {
        for status in TrackStatus::ALL {
            assert!(status.can_transition_to(status));
        }
    }

    #[test]
    fn transition_error_names_the_track() {
        let err = TrackStatus::Completed
            .transition(Track::Enrichment, TrackStatus::Processing)
            .unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg.starts_with("enrichment"));
    }

    #[test]
    fn parse_round_trips_every_status() {
        for status in TrackStatus::ALL {
            assert_eq!(TrackStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(TrackStatus::parse("done").is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(TrackStatus::Completed.is_terminal());
        assert!(TrackStatus::Failed.is_terminal());
        assert!(!TrackStatus::Pending.is_terminal());
        assert!(!TrackStatus::Processing.is_terminal());
    }

    #[test]
    fn enrichment_waits_for_transcription() {
        assert!(may_start(Track::Transcription, TrackStatus::Pending));
        assert!(!may_start(Track::Enrichment, TrackStatus::Processing));
        assert!(!may_start(Track::Enrichment, TrackStatus::Failed));
        assert!(may_start(Track::Enrichment, TrackStatus::Completed));
    }

    #[test]
    fn manual_edit_cannot_start_a_track() {
        use TrackStatus::*;
        let err = check_manual_edit((Pending, Pending), Some(Processing), None).unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg.contains("pipeline"));
        let err = check_manual_edit((Completed, Pending), None, Some(Processing)).unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg.starts_with("enrichment"));
    }

    #[test]
    fn manual_enrichment_edit_needs_completed_transcription() {
        use TrackStatus::*;
        assert!(check_manual_edit((Failed, Failed), None, Some(Pending)).is_err());
        assert!(check_manual_edit((Pending, Processing), None, Some(Failed)).is_err());
        assert_eq!(
            check_manual_edit((Completed, Failed), None, Some(Pending)).unwrap(),
            (Completed, Pending)
        );
        assert_eq!(
            check_manual_edit((Processing, Pending), Some(Completed), None).unwrap(),
            (Completed, Pending)
        );
    }

    #[test]
    fn manual_edit_keeps_unchanged_statuses() {
        use TrackStatus::*;
        assert_eq!(
            check_manual_edit((Processing, Pending), Some(Processing), Some(Pending)).unwrap(),
            (Processing, Pending)
        );
        assert_eq!(
            check_manual_edit((Failed, Pending), None, None).unwrap(),
            (Failed, Pending)
        );
    }

    #[test]
    fn resume_point_picks_first_unfinished_track() {
        use TrackStatus::*;
        assert_eq!(resume_point(Pending, Pending), Some(Track::Transcription));
        assert_eq!(resume_point(Completed, Pending), Some(Track::Enrichment));
        assert_eq!(resume_point(Completed, Completed), None);
        assert_eq!(resume_point(Processing, Pending), None);
        assert_eq!(resume_point(Failed, Pending), None);
    }
}
