use serde::{Deserialize, Serialize};

use super::tokenize;
use Dimension::{Danceability, Energy, Mood, Popularity, Tempo};

/// Number of dimensions in a [`FeatureVector`].
pub const DIMENSIONS: usize = 5;

/// Starting point before any keyword matches.
pub const NEUTRAL: FeatureVector = FeatureVector([0.5; DIMENSIONS]);

/// Positional feature dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Energy = 0,
    Tempo = 1,
    Danceability = 2,
    Mood = 3,
    Popularity = 4,
}

/// Fixed-length taste vector: `[energy, tempo, danceability, mood, popularity]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(pub [f64; DIMENSIONS]);

impl FeatureVector {
    pub fn get(&self, dim: Dimension) -> f64 {
        self.0[dim as usize]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Pull one dimension halfway toward `weight`.
    fn blend_dimension(&mut self, dim: Dimension, weight: f64) {
        let v = &mut self.0[dim as usize];
        *v = (*v + weight) / 2.0;
    }

    /// Pull every dimension halfway toward `other`.
    fn blend_all(&mut self, other: &[f64; DIMENSIONS]) {
        for (v, o) in self.0.iter_mut().zip(other) {
            *v = (*v + o) / 2.0;
        }
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        NEUTRAL
    }
}

/// One keyword rule: a token containing `keyword` blends `dimension` toward `weight`.
#[derive(Debug, Clone, Copy)]
pub struct KeywordRule {
    pub keyword: &'static str,
    pub dimension: Dimension,
    pub weight: f64,
}

const fn rule(keyword: &'static str, dimension: Dimension, weight: f64) -> KeywordRule {
    KeywordRule { keyword, dimension, weight }
}

/// Keyword table, evaluated in order for every token. Keywords are stems.
pub const KEYWORD_RULES: &[KeywordRule] = &[
    rule("energet", Energy, 0.9),
    rule("energiz", Energy, 0.9),
    rule("power", Energy, 0.8),
    rule("strong", Energy, 0.8),
    rule("intense", Energy, 0.9),
    rule("calm", Energy, 0.1),
    rule("relax", Energy, 0.1),
    rule("gentle", Energy, 0.2),
    rule("soft", Energy, 0.2),
    rule("smooth", Energy, 0.3),
    rule("fast", Tempo, 0.9),
    rule("quick", Tempo, 0.8),
    rule("rapid", Tempo, 0.9),
    rule("upbeat", Tempo, 0.8),
    rule("slow", Tempo, 0.1),
    rule("deliber", Tempo, 0.3),
    rule("steady", Tempo, 0.4),
    rule("laidback", Tempo, 0.2),
    rule("danc", Danceability, 0.9),
    rule("groove", Danceability, 0.8),
    rule("rhythm", Danceability, 0.7),
    rule("beat", Danceability, 0.7),
    rule("melod", Danceability, 0.3),
    rule("harmon", Danceability, 0.2),
    rule("lyric", Danceability, 0.3),
    rule("happy", Mood, 0.9),
    rule("excit", Mood, 0.8),
    rule("joy", Mood, 0.9),
    rule("uplift", Mood, 0.8),
    rule("positiv", Mood, 0.7),
    rule("sad", Mood, 0.1),
    rule("melanchol", Mood, 0.2),
    rule("depress", Mood, 0.1),
    rule("somber", Mood, 0.2),
    rule("dark", Mood, 0.3),
    rule("popular", Popularity, 0.9),
    rule("mainstream", Popularity, 0.8),
    rule("hit", Popularity, 0.9),
    rule("chart", Popularity, 0.8),
    rule("obscur", Popularity, 0.1),
    rule("underground", Popularity, 0.2),
    rule("indie", Popularity, 0.3),
    rule("unknown", Popularity, 0.1),
];

/// Genre fingerprints blended into the whole vector on a match.
pub const GENRE_VECTORS: &[(&str, [f64; DIMENSIONS])] = &[
    ("rock", [0.7, 0.5, 0.4, 0.6, 0.7]),
    ("pop", [0.5, 0.7, 0.8, 0.6, 0.9]),
    ("jazz", [0.4, 0.3, 0.2, 0.7, 0.3]),
    ("hiphop", [0.6, 0.8, 0.7, 0.5, 0.8]),
    ("rap", [0.7, 0.7, 0.6, 0.4, 0.7]),
    ("classic", [0.3, 0.2, 0.1, 0.8, 0.5]),
    ("electron", [0.8, 0.9, 0.9, 0.4, 0.7]),
    ("country", [0.4, 0.4, 0.5, 0.6, 0.6]),
    ("metal", [0.9, 0.7, 0.3, 0.3, 0.5]),
    ("folk", [0.2, 0.3, 0.3, 0.7, 0.4]),
    ("indie", [0.5, 0.5, 0.4, 0.6, 0.3]),
];

/// Map free text to a feature vector. Text without any recognizable keyword
/// yields [`NEUTRAL`].
pub fn analyze(text: &str) -> FeatureVector {
    let mut vector = NEUTRAL;
    let mut matches = 0usize;

    for token in tokenize(text) {
        for rule in KEYWORD_RULES {
            if token.contains(rule.keyword) {
                vector.blend_dimension(rule.dimension, rule.weight);
                matches += 1;
            }
        }

        for (genre, fingerprint) in GENRE_VECTORS {
            if token.contains(genre) {
                vector.blend_all(fingerprint);
                matches += 1;
            }
        }
    }

    log::debug!("Feature vector {:?} from {matches} keyword matches", vector.0);
    vector
}
