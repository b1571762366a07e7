use crate::analyzer::FeatureVector;

/// A catalog track with its baked taste vector.
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub id: &'static str,
    pub title: &'static str,
    pub artist: &'static str,
    pub genres: &'static [&'static str],
    pub album: &'static str,
    pub year: u16,
    pub features: FeatureVector,
    pub color: &'static str,
}

const fn entry(
    id: &'static str,
    title: &'static str,
    artist: &'static str,
    genres: &'static [&'static str],
    album: &'static str,
    year: u16,
    features: [f64; 5],
    color: &'static str,
) -> CatalogEntry {
    CatalogEntry {
        id,
        title,
        artist,
        genres,
        album,
        year,
        features: FeatureVector(features),
        color,
    }
}

/// The built-in catalog, in display order (ties in ranking keep this order).
pub static CATALOG: &[CatalogEntry] = &[
    entry(
        "fallback-01", "Bohemian Rhapsody", "Queen",
        &["rock", "progressive rock"], "A Night at the Opera", 1975,
        [0.8, 0.9, 0.5, 0.2, 0.7], "#E53935",
    ),
    entry(
        "fallback-02", "Billie Jean", "Michael Jackson",
        &["pop", "dance"], "Thriller", 1982,
        [0.7, 0.4, 0.9, 0.6, 0.3], "#3949AB",
    ),
    entry(
        "fallback-03", "Smells Like Teen Spirit", "Nirvana",
        &["rock", "grunge"], "Nevermind", 1991,
        [0.9, 0.2, 0.4, 0.8, 0.6], "#43A047",
    ),
    entry(
        "fallback-04", "Superstition", "Stevie Wonder",
        &["funk", "soul"], "Talking Book", 1972,
        [0.6, 0.8, 0.7, 0.5, 0.9], "#FB8C00",
    ),
    entry(
        "fallback-05", "Lose Yourself", "Eminem",
        &["hip hop", "rap"], "8 Mile Soundtrack", 2002,
        [0.5, 0.3, 0.8, 0.9, 0.2], "#8E24AA",
    ),
    entry(
        "fallback-06", "Sweet Child O' Mine", "Guns N' Roses",
        &["rock", "hard rock"], "Appetite for Destruction", 1987,
        [0.9, 0.7, 0.3, 0.4, 0.6], "#D81B60",
    ),
    entry(
        "fallback-07", "Despacito", "Luis Fonsi ft. Daddy Yankee",
        &["latin", "pop", "reggaeton"], "Vida", 2017,
        [0.4, 0.9, 0.7, 0.3, 0.8], "#FFB300",
    ),
    entry(
        "fallback-08", "Stairway to Heaven", "Led Zeppelin",
        &["rock", "classic rock"], "Led Zeppelin IV", 1971,
        [0.7, 0.6, 0.4, 0.5, 0.8], "#00897B",
    ),
    entry(
        "fallback-09", "Thriller", "Michael Jackson",
        &["pop", "funk"], "Thriller", 1982,
        [0.8, 0.5, 0.9, 0.4, 0.6], "#C62828",
    ),
    entry(
        "fallback-10", "Like a Rolling Stone", "Bob Dylan",
        &["rock", "folk rock"], "Highway 61 Revisited", 1965,
        [0.6, 0.7, 0.3, 0.8, 0.4], "#1565C0",
    ),
    entry(
        "fallback-11", "Hotel California", "Eagles",
        &["rock", "soft rock"], "Hotel California", 1976,
        [0.5, 0.8, 0.6, 0.7, 0.3], "#6A1B9A",
    ),
    entry(
        "fallback-12", "Shape of You", "Ed Sheeran",
        &["pop", "dancehall"], "÷", 2017,
        [0.3, 0.9, 0.8, 0.5, 0.7], "#2E7D32",
    ),
];
