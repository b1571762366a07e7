use crate::analyzer::intent::{EnergyBucket, MoodTag, PopularityBucket, SearchIntent, TempoBucket};

/// Genre seeds the provider accepts.
pub const VALID_GENRE_SEEDS: &[&str] = &[
    "acoustic", "afrobeat", "alt-rock", "alternative", "ambient", "anime", "blues",
    "classical", "club", "country", "dance", "disco", "drum-and-bass", "dubstep",
    "edm", "electronic", "folk", "funk", "hip-hop", "house", "indie", "indie-pop",
    "jazz", "k-pop", "latin", "metal", "piano", "pop", "r-n-b", "rap", "reggae",
    "reggaeton", "rock", "soul", "techno", "trance",
];

/// Seeds used when nothing in the text maps to a valid genre.
pub const DEFAULT_GENRE_SEEDS: &[&str] = &["pop", "rock", "electronic", "dance", "hip-hop"];

/// The provider accepts at most this many seeds.
pub const MAX_GENRE_SEEDS: usize = 5;

pub const DEFAULT_LIMIT: u32 = 10;

/// Query sent to the recommendation endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
    pub seed_genres: Vec<String>,
    pub target_tempo: Option<u32>,
    pub target_energy: Option<f64>,
    pub target_popularity: Option<u32>,
    pub target_valence: Option<f64>,
    pub limit: u32,
}

impl QueryParams {
    /// Build provider parameters from the extracted intent.
    ///
    /// Buckets map to fixed targets. Mood tags only fill targets the buckets
    /// left unset.
    pub fn from_intent(intent: &SearchIntent, limit: u32) -> Self {
        let mut seed_genres: Vec<String> = intent
            .genres
            .iter()
            .filter(|g| VALID_GENRE_SEEDS.contains(g))
            .take(MAX_GENRE_SEEDS)
            .map(|g| g.to_string())
            .collect();
        if seed_genres.is_empty() {
            seed_genres = DEFAULT_GENRE_SEEDS.iter().map(|g| g.to_string()).collect();
        }

        let target_tempo = intent.tempo.map(|t| match t {
            TempoBucket::Slow => 80,
            TempoBucket::Medium => 120,
            TempoBucket::Fast => 160,
        });

        let mut target_energy = intent.energy.map(|e| match e {
            EnergyBucket::Low => 0.2,
            EnergyBucket::Medium => 0.5,
            EnergyBucket::High => 0.8,
        });

        let target_popularity = intent.popularity.map(|p| match p {
            PopularityBucket::Underground => 30,
            PopularityBucket::Moderate => 60,
            PopularityBucket::Popular => 90,
        });

        let target_valence = if intent.has_mood(MoodTag::Happy) {
            Some(0.8)
        } else if intent.has_mood(MoodTag::Sad) {
            Some(0.2)
        } else {
            None
        };

        if target_energy.is_none() {
            if intent.has_mood(MoodTag::Energetic) {
                target_energy = Some(0.8);
            } else if intent.has_mood(MoodTag::Chill) {
                target_energy = Some(0.2);
            }
        }

        Self {
            seed_genres,
            target_tempo,
            target_energy,
            target_popularity,
            target_valence,
            limit,
        }
    }

    /// Flatten into query-string pairs; unset targets are omitted.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("seed_genres", self.seed_genres.join(","))];
        if let Some(t) = self.target_tempo {
            pairs.push(("target_tempo", t.to_string()));
        }
        if let Some(e) = self.target_energy {
            pairs.push(("target_energy", e.to_string()));
        }
        if let Some(p) = self.target_popularity {
            pairs.push(("target_popularity", p.to_string()));
        }
        if let Some(v) = self.target_valence {
            pairs.push(("target_valence", v.to_string()));
        }
        pairs.push(("limit", self.limit.to_string()));
        pairs
    }
}
