//! Annotation field validation: segment bounds and feedback.

use crate::error::CoreError;

/// Feedback value for a thumbs-down.
pub const FEEDBACK_NEGATIVE: i16 = 0;

/// Feedback value for a thumbs-up.
pub const FEEDBACK_POSITIVE: i16 = 1;

/// Minimum number of entries in a feedback choice vector.
pub const MIN_FEEDBACK_CHOICES: usize = 5;

/// Maximum number of entries in a feedback choice vector.
pub const MAX_FEEDBACK_CHOICES: usize = 6;

/// Prefix of stored annotation audio file names.
pub const AUDIO_FILENAME_PREFIX: &str = "annotation_";

/// Extension of stored annotation audio files.
pub const AUDIO_EXTENSION: &str = "wav";

/// Validate a segment's offsets in seconds: `0 <= start < end`, both finite.
pub fn validate_segment(start_time: f64, end_time: f64) -> Result<(), CoreError> {
    if !start_time.is_finite() || !end_time.is_finite() {
        return Err(CoreError::Validation(
            "start_time and end_time must be finite numbers".into(),
        ));
    }
    if start_time < 0.0 {
        return Err(CoreError::Validation(
            "start_time must be greater than or equal to 0".into(),
        ));
    }
    if start_time >= end_time {
        return Err(CoreError::Validation(
            "start_time must be less than end_time".into(),
        ));
    }
    Ok(())
}

/// Validate a binary feedback value.
pub fn validate_feedback(feedback: i16) -> Result<(), CoreError> {
    if feedback == FEEDBACK_NEGATIVE || feedback == FEEDBACK_POSITIVE {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "feedback must be 0 or 1, got {feedback}"
        )))
    }
}

/// Validate a feedback choice vector: 5 or 6 entries, each 0 or 1.
pub fn validate_feedback_choices(choices: &[i16]) -> Result<(), CoreError> {
    if !(MIN_FEEDBACK_CHOICES..=MAX_FEEDBACK_CHOICES).contains(&choices.len()) {
        return Err(CoreError::Validation(format!(
            "feedback_choices must have between {MIN_FEEDBACK_CHOICES} and \
             {MAX_FEEDBACK_CHOICES} entries, got {}",
            choices.len()
        )));
    }
    if let Some(bad) = choices.iter().find(|c| **c != 0 && **c != 1) {
        return Err(CoreError::Validation(format!(
            "feedback_choices entries must be 0 or 1, got {bad}"
        )));
    }
    Ok(())
}

/// Build the stored file name for an annotation recording from a unique token.
pub fn audio_filename(token: &str) -> String {
    format!("{AUDIO_FILENAME_PREFIX}{token}.{AUDIO_EXTENSION}")
}
