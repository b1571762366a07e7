use serde::{Deserialize, Serialize};

use crate::analyzer::FeatureVector;

/// Display-oriented audio attributes, shaped the same for provider and
/// catalog results.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioFeatures {
    pub energy: f64,
    /// Beats per minute.
    pub tempo: f64,
    pub danceability: f64,
    pub valence: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
}

impl AudioFeatures {
    /// Project onto the positional taste vector. Tempo is scaled back from
    /// bpm to [0,1] against 160 bpm; popularity comes from the track.
    pub fn to_vector(&self, popularity: Option<u32>) -> FeatureVector {
        FeatureVector([
            self.energy,
            (self.tempo / crate::similarity::DISPLAY_TEMPO_BPM).min(1.0),
            self.danceability,
            self.valence,
            popularity.map(|p| f64::from(p) / 100.0).unwrap_or(0.5),
        ])
    }

    /// HSL color: energy runs blue → red, danceability sets saturation,
    /// valence sets lightness.
    pub fn color(&self) -> String {
        let h = ((1.0 - self.energy) * 240.0).floor() as i64;
        let s = (self.danceability * 100.0).floor() as i64;
        let l = (30.0 + self.valence * 40.0).floor() as i64;
        format!("hsl({h}, {s}%, {l}%)")
    }
}

/// A recommended track as returned to callers. Built per request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRecord {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub genres: Vec<String>,
    pub album: Option<String>,
    /// Release year (catalog entries only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    pub album_art: Option<String>,
    pub preview_url: Option<String>,
    pub external_url: Option<String>,
    /// Provider popularity, 0–100.
    pub popularity: Option<u32>,
    /// Baked taste vector (catalog entries only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<FeatureVector>,
    pub audio_features: Option<AudioFeatures>,
    pub similarity: f64,
    pub color: Option<String>,
}
