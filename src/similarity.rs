use std::cmp::Ordering;

use crate::analyzer::FeatureVector;
use crate::catalog::CatalogEntry;
use crate::track::{AudioFeatures, TrackRecord};

/// The tempo dimension is scaled to this many bpm for display.
pub const DISPLAY_TEMPO_BPM: f64 = 160.0;

/// Placeholder for attributes the catalog doesn't carry.
const DEFAULT_ACOUSTIC: f64 = 0.5;

/// Rank catalog entries by cosine similarity to `query`, best first.
///
/// Each result is decorated with a display audio-feature bundle so fallback
/// results have the same shape as provider results. Ties keep catalog order.
pub fn rank(query: &FeatureVector, catalog: &[CatalogEntry]) -> Vec<TrackRecord> {
    let mut ranked: Vec<TrackRecord> = catalog
        .iter()
        .map(|entry| TrackRecord {
            id: entry.id.to_string(),
            title: entry.title.to_string(),
            artist: entry.artist.to_string(),
            genres: entry.genres.iter().map(|g| g.to_string()).collect(),
            album: Some(entry.album.to_string()),
            year: Some(entry.year),
            album_art: None,
            preview_url: None,
            external_url: None,
            popularity: None,
            features: Some(entry.features),
            audio_features: Some(display_features(&entry.features)),
            similarity: cosine_similarity(query.as_slice(), entry.features.as_slice()),
            color: Some(entry.color.to_string()),
        })
        .collect();

    sort_by_similarity(&mut ranked);
    ranked
}

/// Stable sort, highest similarity first.
pub fn sort_by_similarity(tracks: &mut [TrackRecord]) {
    tracks.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
    });
}

/// Synthesize display attributes from a baked taste vector.
fn display_features(v: &FeatureVector) -> AudioFeatures {
    let [energy, tempo, danceability, valence, _popularity] = v.0;
    AudioFeatures {
        energy,
        tempo: tempo * DISPLAY_TEMPO_BPM,
        danceability,
        valence,
        acousticness: DEFAULT_ACOUSTIC,
        instrumentalness: DEFAULT_ACOUSTIC,
    }
}

/// Cosine similarity between two vectors. A zero-norm side scores 0.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;

    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        0.0
    } else {
        dot / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::features::NEUTRAL;
    use crate::catalog::CATALOG;

    fn entry(id: &'static str, features: [f64; 5]) -> CatalogEntry {
        CatalogEntry {
            id,
            title: id,
            artist: "test",
            genres: &[],
            album: "test",
            year: 2000,
            features: FeatureVector(features),
            color: "#000000",
        }
    }

    #[test]
    fn test_cosine_identical() {
        let a = vec![0.8, 0.9, 0.5, 0.2, 0.7];
        let sim = cosine_similarity(&a, &a);
        assert!((sim - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        let sim = cosine_similarity(&a, &b);
        assert!(sim.abs() < 1e-10);
    }

    #[test]
    fn test_cosine_opposite() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![-1.0, -2.0, -3.0];
        let sim = cosine_similarity(&a, &b);
        assert!((sim + 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_cosine_zero_vector_is_zero() {
        let zero = vec![0.0; 5];
        let a = vec![0.5; 5];
        assert_eq!(cosine_similarity(&zero, &a), 0.0);
        assert_eq!(cosine_similarity(&a, &zero), 0.0);
        assert!(!cosine_similarity(&zero, &zero).is_nan());
    }

    #[test]
    fn test_rank_is_sorted_descending() {
        let queries = [
            NEUTRAL,
            FeatureVector([0.9, 0.1, 0.2, 0.8, 0.3]),
            FeatureVector([0.1, 0.9, 0.9, 0.1, 0.9]),
        ];
        for q in &queries {
            let ranked = rank(q, CATALOG);
            assert_eq!(ranked.len(), CATALOG.len());
            for pair in ranked.windows(2) {
                assert!(pair[0].similarity >= pair[1].similarity);
            }
        }
    }

    #[test]
    fn test_identical_entry_ranks_first_with_similarity_one() {
        let target = CATALOG[4].features;
        let ranked = rank(&target, CATALOG);
        assert_eq!(ranked[0].id, CATALOG[4].id);
        assert!((ranked[0].similarity - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_ties_keep_catalog_order() {
        let catalog = [
            entry("a", [0.2, 0.2, 0.2, 0.2, 0.2]),
            entry("b", [0.9, 0.1, 0.1, 0.1, 0.1]),
            entry("c", [0.2, 0.2, 0.2, 0.2, 0.2]),
        ];
        let ranked = rank(&NEUTRAL, &catalog);
        let ids: Vec<&str> = ranked.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_zero_entry_ranks_last() {
        let catalog = [
            entry("zero", [0.0; 5]),
            entry("some", [0.3, 0.6, 0.1, 0.2, 0.9]),
        ];
        let ranked = rank(&NEUTRAL, &catalog);
        assert_eq!(ranked[1].id, "zero");
        assert_eq!(ranked[1].similarity, 0.0);
    }

    #[test]
    fn test_results_carry_display_features() {
        let ranked = rank(&NEUTRAL, &CATALOG[..1]);
        let f = ranked[0].audio_features.unwrap();
        assert!((f.tempo - 0.9 * DISPLAY_TEMPO_BPM).abs() < 1e-9);
        assert_eq!(f.acousticness, 0.5);
        assert_eq!(f.instrumentalness, 0.5);
        assert_eq!(ranked[0].color.as_deref(), Some("#E53935"));
        assert!(ranked[0].preview_url.is_none());
        assert_eq!(ranked[0].year, Some(1975));

        let json = serde_json::to_value(&ranked[0]).unwrap();
        assert_eq!(json["year"], 1975);
    }
}
