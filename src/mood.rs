use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single captured mood is acted on only above this confidence.
pub const SINGLE_SHOT_THRESHOLD: f64 = 0.5;

/// Continuous mode re-queries only above this confidence.
pub const CONTINUOUS_THRESHOLD: f64 = 0.6;

/// Samples kept for stability tracking.
pub const HISTORY_LEN: usize = 10;

/// Stability is not computed until this many samples exist.
const MIN_SAMPLES_FOR_STABILITY: usize = 3;

/// Fraction of the history the current mood must hold before it may trigger.
const STABILITY_THRESHOLD: f64 = 0.5;

/// Minimum gap between two triggered re-recommendations.
pub const CHANGE_COOLDOWN: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodLabel {
    Neutral,
    Happy,
    Sad,
    Angry,
    Fearful,
    Disgusted,
    Surprised,
}

impl MoodLabel {
    pub const ALL: [MoodLabel; 7] = [
        Self::Neutral,
        Self::Happy,
        Self::Sad,
        Self::Angry,
        Self::Fearful,
        Self::Disgusted,
        Self::Surprised,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Angry => "angry",
            Self::Fearful => "fearful",
            Self::Disgusted => "disgusted",
            Self::Surprised => "surprised",
        }
    }

    /// Canned preference sentence fed to the text pipeline for this mood.
    pub fn preference_text(&self) -> &'static str {
        match self {
            Self::Neutral => "balanced and moderate music",
            Self::Happy => "happy, upbeat, and energetic music",
            Self::Sad => "uplifting, positive, and encouraging music",
            Self::Angry => "calming, soothing music with positive vibes",
            Self::Fearful => "comforting, peaceful music with positive messages",
            Self::Disgusted => "pleasant, beautiful melodies with positive themes",
            Self::Surprised => "interesting and exciting music with good energy",
        }
    }
}

impl fmt::Display for MoodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MoodError {
    #[error("unknown mood label: {0}")]
    UnknownLabel(String),
    #[error("confidence must be within [0, 1], got {0}")]
    InvalidConfidence(f64),
    #[error("malformed mood sample: {0}")]
    Malformed(String),
}

impl FromStr for MoodLabel {
    type Err = MoodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == lower)
            .ok_or_else(|| MoodError::UnknownLabel(s.to_string()))
    }
}

/// One detection from the mood collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoodSample {
    pub label: MoodLabel,
    pub confidence: f64,
}

impl MoodSample {
    pub fn new(label: MoodLabel, confidence: f64) -> Result<Self, MoodError> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(MoodError::InvalidConfidence(confidence));
        }
        Ok(Self { label, confidence })
    }

    /// Parse a `label confidence` line, e.g. `happy 0.82`.
    pub fn parse_line(line: &str) -> Result<Self, MoodError> {
        let mut parts = line.split_whitespace();
        let (Some(label), Some(confidence), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(MoodError::Malformed(line.to_string()));
        };
        let confidence: f64 = confidence
            .parse()
            .map_err(|_| MoodError::Malformed(line.to_string()))?;
        Self::new(label.parse()?, confidence)
    }

    /// Confident enough for a one-off capture.
    pub fn passes_single_shot(&self) -> bool {
        self.confidence > SINGLE_SHOT_THRESHOLD
    }

    /// Confident enough to re-query in continuous mode.
    pub fn passes_continuous(&self) -> bool {
        self.confidence > CONTINUOUS_THRESHOLD
    }
}

/// Tracks a stream of mood samples and decides when continuous mode should
/// fetch new recommendations.
#[derive(Debug)]
pub struct MoodTracker {
    history: VecDeque<MoodLabel>,
    stability: f64,
    captured: Option<MoodSample>,
    last_trigger: Option<Instant>,
    last_recommended: Option<MoodLabel>,
    cooldown: Duration,
}

impl Default for MoodTracker {
    fn default() -> Self {
        Self::new(CHANGE_COOLDOWN)
    }
}

impl MoodTracker {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            history: VecDeque::with_capacity(HISTORY_LEN),
            stability: 0.0,
            captured: None,
            last_trigger: None,
            last_recommended: None,
            cooldown,
        }
    }

    /// Most recent sample that passed the single-shot threshold.
    pub fn captured(&self) -> Option<MoodSample> {
        self.captured
    }

    /// Share of the history held by the trailing run of the newest mood.
    pub fn stability(&self) -> f64 {
        self.stability
    }

    /// Feed one sample observed at `now`. Returns the mood to recommend for
    /// when this sample should trigger a re-recommendation.
    pub fn observe(&mut self, sample: MoodSample, now: Instant) -> Option<MoodLabel> {
        self.record(sample.label);

        if !sample.passes_single_shot() {
            return None;
        }
        let changed = self.captured.map(|c| c.label) != Some(sample.label);
        self.captured = Some(sample);
        if !changed {
            return None;
        }

        if self.stability <= STABILITY_THRESHOLD {
            log::debug!(
                "Mood {} not stable yet ({:.0}%)",
                sample.label,
                self.stability * 100.0
            );
            return None;
        }
        if self
            .last_trigger
            .is_some_and(|t| now.duration_since(t) <= self.cooldown)
        {
            log::debug!("Mood change to {} within cooldown", sample.label);
            return None;
        }
        self.last_trigger = Some(now);

        if !sample.passes_continuous() {
            log::debug!(
                "Mood {} at {:.2} below continuous threshold",
                sample.label,
                sample.confidence
            );
            return None;
        }
        if self.last_recommended == Some(sample.label) {
            return None;
        }
        self.last_recommended = Some(sample.label);
        log::info!(
            "Mood changed to {} ({:.0}% confidence)",
            sample.label,
            sample.confidence * 100.0
        );
        Some(sample.label)
    }

    fn record(&mut self, label: MoodLabel) {
        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(label);

        if self.history.len() >= MIN_SAMPLES_FOR_STABILITY {
            let run = self
                .history
                .iter()
                .rev()
                .take_while(|m| **m == label)
                .count();
            self.stability = run as f64 / HISTORY_LEN as f64;
        }
    }
}
