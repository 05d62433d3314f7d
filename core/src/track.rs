use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::TrackId;

/// Musical source material an encounter is played against.
///
/// A track has a fixed tempo, an offset to its first beat, and an effective
/// duration. The effective duration prefers an explicit custom value and
/// falls back to the nominal length of the audio asset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    id: TrackId,
    bpm: f64,
    #[serde(default)]
    beat_offset_secs: f64,
    #[serde(default)]
    audio_duration_secs: Option<f64>,
    #[serde(default)]
    custom_duration_secs: Option<f64>,
}

impl Track {
    /// Creates a track backed by audio of the provided nominal length.
    #[must_use]
    pub fn new(id: TrackId, bpm: f64, audio_duration_secs: f64) -> Self {
        Self {
            id,
            bpm,
            beat_offset_secs: 0.0,
            audio_duration_secs: Some(audio_duration_secs),
            custom_duration_secs: None,
        }
    }

    /// Creates a track whose audio asset is unknown or has not been assigned.
    #[must_use]
    pub fn without_audio(id: TrackId, bpm: f64) -> Self {
        Self {
            id,
            bpm,
            beat_offset_secs: 0.0,
            audio_duration_secs: None,
            custom_duration_secs: None,
        }
    }

    /// Shifts the first beat of the track by the provided number of seconds.
    #[must_use]
    pub fn with_beat_offset(mut self, beat_offset_secs: f64) -> Self {
        self.beat_offset_secs = beat_offset_secs.max(0.0);
        self
    }

    /// Overrides the effective duration regardless of the audio length.
    #[must_use]
    pub fn with_custom_duration(mut self, duration_secs: f64) -> Self {
        self.custom_duration_secs = Some(duration_secs);
        self
    }

    /// Identifier of the track.
    #[must_use]
    pub fn id(&self) -> &TrackId {
        &self.id
    }

    /// Tempo in beats per minute.
    #[must_use]
    pub const fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Seconds between the start of the track and its first beat.
    #[must_use]
    pub const fn beat_offset_secs(&self) -> f64 {
        self.beat_offset_secs
    }

    /// Length of a single beat in seconds.
    ///
    /// Only meaningful for tracks that pass [`Track::validate`].
    #[must_use]
    pub fn beat_secs(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Resolves the playable duration of the track.
    ///
    /// A positive custom duration wins; otherwise the nominal audio length is
    /// used. Returns `None` when neither source yields a positive duration.
    #[must_use]
    pub fn effective_duration_secs(&self) -> Option<f64> {
        self.custom_duration_secs
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .or_else(|| {
                self.audio_duration_secs
                    .filter(|secs| secs.is_finite() && *secs > 0.0)
            })
    }

    /// Checks that the track can drive chart generation.
    pub fn validate(&self) -> Result<f64, TrackError> {
        if !self.bpm.is_finite() || self.bpm <= 0.0 {
            return Err(TrackError::InvalidTempo {
                track: self.id.clone(),
                bpm: self.bpm,
            });
        }

        self.effective_duration_secs()
            .ok_or_else(|| TrackError::MissingAudio {
                track: self.id.clone(),
            })
    }
}

/// Reasons a track cannot be turned into a generated chart.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TrackError {
    /// The tempo is zero, negative, or not a finite number.
    #[error("track {track} has an unusable tempo of {bpm} bpm")]
    InvalidTempo {
        /// Track carrying the invalid tempo.
        track: TrackId,
        /// Tempo that was rejected.
        bpm: f64,
    },
    /// Neither a custom duration nor an audio length is available.
    #[error("track {track} has no audio and no custom duration")]
    MissingAudio {
        /// Track lacking a usable duration.
        track: TrackId,
    },
}

#[cfg(test)]
mod tests {
    use super::{Track, TrackError};
    use crate::TrackId;

    fn id() -> TrackId {
        TrackId::new("test-track")
    }

    #[test]
    fn custom_duration_overrides_audio_length() {
        let track = Track::new(id(), 120.0, 90.0).with_custom_duration(30.0);
        assert_eq!(track.effective_duration_secs(), Some(30.0));
    }

    #[test]
    fn non_positive_custom_duration_falls_back_to_audio() {
        let track = Track::new(id(), 120.0, 90.0).with_custom_duration(0.0);
        assert_eq!(track.effective_duration_secs(), Some(90.0));
    }

    #[test]
    fn zero_tempo_is_rejected() {
        let track = Track::new(id(), 0.0, 10.0);
        assert!(matches!(
            track.validate(),
            Err(TrackError::InvalidTempo { .. })
        ));
    }

    #[test]
    fn missing_audio_is_rejected() {
        let track = Track::without_audio(id(), 120.0);
        assert_eq!(
            track.validate(),
            Err(TrackError::MissingAudio { track: id() })
        );
    }

    #[test]
    fn custom_duration_rescues_missing_audio() {
        let track = Track::without_audio(id(), 120.0).with_custom_duration(12.0);
        assert_eq!(track.validate(), Ok(12.0));
    }

    #[test]
    fn beat_length_follows_tempo() {
        let track = Track::new(id(), 120.0, 10.0);
        assert!((track.beat_secs() - 0.5).abs() < f64::EPSILON);
    }
}
