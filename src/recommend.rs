use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::analyzer::{self, FeatureVector};
use crate::catalog::CATALOG;
use crate::config::AppConfig;
use crate::mood::{MoodError, MoodLabel, MoodSample};
use crate::provider::query::VALID_GENRE_SEEDS;
use crate::provider::{
    AuthError, CredentialCache, MusicProvider, ProviderError, ProviderTrack, QueryParams,
};
use crate::similarity::{cosine_similarity, rank, sort_by_similarity};
use crate::track::{AudioFeatures, TrackRecord};

/// Weight applied to provider popularity when a track has no audio features.
const POPULARITY_ONLY_WEIGHT: f64 = 0.8;

/// Provider tracks are tagged with this many of the requested genres.
const GUESSED_GENRES: usize = 2;

/// Errors that reach the caller. Everything upstream is recovered by fallback.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecommendError {
    #[error("invalid input: {0}")]
    Input(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Why the provider path was abandoned.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("provider unhealthy: {0}")]
    Unhealthy(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("provider returned no tracks")]
    EmptyResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    External,
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub query: String,
    pub feature_vector: FeatureVector,
    pub recommendations: Vec<TrackRecord>,
    pub source: Source,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenState {
    Valid,
    Missing,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderHealth {
    pub status: HealthStatus,
    pub token: TokenState,
    pub message: String,
    pub last_error: Option<String>,
}

/// Ties the text analyzers, the provider, and the fallback ranker together.
///
/// Owns its credential cache; share one `Recommender` across requests so the
/// token is shared too.
pub struct Recommender<P: MusicProvider> {
    provider: P,
    credentials: CredentialCache,
    configured: bool,
    limit: u32,
    fallback_limit: usize,
}

impl<P: MusicProvider> Recommender<P> {
    pub fn new(provider: P, config: &AppConfig) -> Self {
        if !config.provider.has_credentials() {
            log::warn!("No provider credentials configured; serving catalog recommendations only");
        }
        Self {
            provider,
            credentials: CredentialCache::new(),
            configured: config.provider.has_credentials(),
            limit: config.provider.limit,
            fallback_limit: config.fallback_limit.max(1),
        }
    }

    /// Recommend tracks for a free-text preference.
    ///
    /// Only input errors are returned; provider failures degrade to the
    /// static catalog with `source = fallback`.
    pub fn recommend(&self, preference: &str) -> Result<Recommendation, RecommendError> {
        let preference = preference.trim();
        if preference.is_empty() {
            return Err(RecommendError::Input("preference must not be empty".into()));
        }
        let query = analyzer::clamp_input(preference);
        let vector = analyzer::analyze(query);
        log::debug!("Feature vector for {query:?}: {:?}", vector.0);

        match self.external(query, &vector) {
            Ok(tracks) => Ok(Recommendation {
                query: query.to_string(),
                feature_vector: vector,
                recommendations: tracks,
                source: Source::External,
            }),
            Err(e) => {
                log::info!("Using catalog fallback: {e}");
                let mut tracks = rank(&vector, CATALOG);
                tracks.truncate(self.fallback_limit);
                Ok(Recommendation {
                    query: query.to_string(),
                    feature_vector: vector,
                    recommendations: tracks,
                    source: Source::Fallback,
                })
            }
        }
    }

    /// Recommend for a detected mood via its canned preference sentence.
    ///
    /// A supplied confidence must clear the single-shot threshold.
    pub fn recommend_mood(
        &self,
        label: &str,
        confidence: Option<f64>,
    ) -> Result<Recommendation, RecommendError> {
        let mood: MoodLabel = label
            .parse()
            .map_err(|e: MoodError| RecommendError::Input(e.to_string()))?;
        if let Some(confidence) = confidence {
            let sample = MoodSample::new(mood, confidence)
                .map_err(|e| RecommendError::Input(e.to_string()))?;
            if !sample.passes_single_shot() {
                return Err(RecommendError::Input(format!(
                    "mood confidence {confidence:.2} too low"
                )));
            }
        }
        self.recommend(mood.preference_text())
    }

    /// Probe the provider by obtaining (not forcing) a token.
    pub fn health(&self) -> ProviderHealth {
        if !self.configured {
            return ProviderHealth {
                status: HealthStatus::Error,
                token: TokenState::Missing,
                message: "provider credentials not configured".into(),
                last_error: None,
            };
        }
        let outcome = self.token();
        let token = if self.credentials.has_valid_token() {
            TokenState::Valid
        } else {
            TokenState::Missing
        };
        let last_error = self.credentials.last_error().map(|e| e.to_string());
        match outcome {
            Ok(_) => ProviderHealth {
                status: HealthStatus::Ok,
                token,
                message: "provider reachable".into(),
                last_error,
            },
            Err(e) => ProviderHealth {
                status: HealthStatus::Error,
                token,
                message: e.to_string(),
                last_error,
            },
        }
    }

    /// Genre seeds the provider accepts, or the built-in list when it can't
    /// be reached.
    pub fn genre_seeds(&self) -> Vec<String> {
        let fetched = if self.configured {
            self.call_with_auth(|token| self.provider.genre_seeds(token))
        } else {
            Err(UpstreamError::Unhealthy("provider credentials not configured".into()))
        };
        match fetched {
            Ok(genres) if !genres.is_empty() => genres,
            Ok(_) => {
                log::warn!("Provider returned no genre seeds, using built-in list");
                builtin_seeds()
            }
            Err(e) => {
                log::warn!("Genre seed lookup failed ({e}), using built-in list");
                builtin_seeds()
            }
        }
    }

    fn external(
        &self,
        query: &str,
        vector: &FeatureVector,
    ) -> Result<Vec<TrackRecord>, UpstreamError> {
        let health = self.health();
        if health.status != HealthStatus::Ok {
            return Err(UpstreamError::Unhealthy(health.message));
        }

        let intent = analyzer::extract_intent(query);
        let params = QueryParams::from_intent(&intent, self.limit);
        log::debug!("Provider query: {:?}", params.to_pairs());

        let tracks = self.call_with_auth(|token| self.provider.recommendations(token, &params))?;
        if tracks.is_empty() {
            return Err(UpstreamError::EmptyResult);
        }
        log::info!("Provider returned {} tracks", tracks.len());

        let mut records: Vec<TrackRecord> = tracks
            .par_iter()
            .map(|track| {
                let features = match self
                    .call_with_auth(|token| self.provider.audio_features(token, &track.id))
                {
                    Ok(f) => Some(f),
                    Err(e) => {
                        log::warn!("No audio features for {}: {e}", track.id);
                        None
                    }
                };
                external_record(track, features, vector, &intent.genres)
            })
            .collect();

        sort_by_similarity(&mut records);
        Ok(records)
    }

    fn token(&self) -> Result<String, AuthError> {
        self.credentials
            .get_token(false, || self.provider.request_token())
    }

    /// Run `op` with a bearer token. A 401 replaces the token once and
    /// retries once; any further failure is returned.
    fn call_with_auth<T, F>(&self, op: F) -> Result<T, UpstreamError>
    where
        F: Fn(&str) -> Result<T, ProviderError>,
    {
        let token = self.token()?;
        match op(&token) {
            Err(e) if e.is_unauthorized() => {
                log::warn!("Provider rejected access token, refreshing once");
                let token = self
                    .credentials
                    .replace_token(&token, || self.provider.request_token())?;
                Ok(op(&token)?)
            }
            other => Ok(other?),
        }
    }
}

fn builtin_seeds() -> Vec<String> {
    VALID_GENRE_SEEDS.iter().map(|g| g.to_string()).collect()
}

/// Decorate a provider track and score it against the query vector.
fn external_record(
    track: &ProviderTrack,
    features: Option<AudioFeatures>,
    query: &FeatureVector,
    genres: &[&str],
) -> TrackRecord {
    let similarity = match &features {
        Some(f) => cosine_similarity(
            query.as_slice(),
            f.to_vector(track.popularity).as_slice(),
        ),
        None => {
            POPULARITY_ONLY_WEIGHT * f64::from(track.popularity.unwrap_or(0)) / 100.0
        }
    };

    TrackRecord {
        id: track.id.clone(),
        title: track.name.clone(),
        artist: track.artist_line(),
        genres: genres.iter().take(GUESSED_GENRES).map(|g| g.to_string()).collect(),
        album: track.album.as_ref().map(|a| a.name.clone()),
        year: None,
        album_art: track.album_art().map(str::to_string),
        preview_url: track.preview_url.clone(),
        external_url: track.external_urls.spotify.clone(),
        popularity: track.popularity,
        features: None,
        audio_features: features,
        similarity,
        color: features.map(|f| f.color()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::TokenGrant;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeProvider {
        tracks: Vec<ProviderTrack>,
        token_error: Option<ProviderError>,
        /// Errors returned by successive recommendation calls before succeeding.
        query_errors: Mutex<VecDeque<ProviderError>>,
        /// Track ids whose audio-feature lookup fails.
        missing_features: Vec<&'static str>,
        /// Token that audio-feature lookups reject with 401.
        revoked_token: Option<&'static str>,
        token_calls: AtomicUsize,
        query_calls: AtomicUsize,
        feature_calls: AtomicUsize,
        last_query: Mutex<Option<QueryParams>>,
    }

    impl FakeProvider {
        fn with_tracks(ids: &[&str]) -> Self {
            Self {
                tracks: ids.iter().map(|id| provider_track(id, 50)).collect(),
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.token_calls.load(Ordering::SeqCst)
                + self.query_calls.load(Ordering::SeqCst)
                + self.feature_calls.load(Ordering::SeqCst)
        }
    }

    impl MusicProvider for FakeProvider {
        fn request_token(&self) -> Result<TokenGrant, ProviderError> {
            let n = self.token_calls.fetch_add(1, Ordering::SeqCst);
            match &self.token_error {
                Some(e) => Err(e.clone()),
                None => Ok(TokenGrant {
                    access_token: format!("token-{n}"),
                    expires_in: 3600,
                }),
            }
        }

        fn recommendations(
            &self,
            _token: &str,
            query: &QueryParams,
        ) -> Result<Vec<ProviderTrack>, ProviderError> {
            self.query_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_query.lock().unwrap() = Some(query.clone());
            match self.query_errors.lock().unwrap().pop_front() {
                Some(e) => Err(e),
                None => Ok(self.tracks.clone()),
            }
        }

        fn audio_features(
            &self,
            token: &str,
            track_id: &str,
        ) -> Result<AudioFeatures, ProviderError> {
            self.feature_calls.fetch_add(1, Ordering::SeqCst);
            if self.revoked_token == Some(token) {
                return Err(ProviderError::Status(401));
            }
            if self.missing_features.contains(&track_id) {
                return Err(ProviderError::Status(404));
            }
            let energy = if track_id == "loud" { 0.95 } else { 0.3 };
            Ok(AudioFeatures {
                energy,
                tempo: 150.0,
                danceability: 0.7,
                valence: 0.8,
                acousticness: 0.1,
                instrumentalness: 0.0,
            })
        }

        fn genre_seeds(&self, _token: &str) -> Result<Vec<String>, ProviderError> {
            Ok(vec!["jazz".into(), "rock".into()])
        }
    }

    fn provider_track(id: &str, popularity: u32) -> ProviderTrack {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": format!("Track {id}"),
            "artists": [{"name": "Artist"}],
            "popularity": popularity,
            "external_urls": {"spotify": format!("https://open.spotify.com/track/{id}")}
        }))
        .unwrap()
    }

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.provider.client_id = "id".into();
        config.provider.client_secret = "secret".into();
        config
    }

    #[test]
    fn test_empty_preference_is_rejected_before_network() {
        let recommender = Recommender::new(FakeProvider::with_tracks(&["a"]), &config());
        for input in ["", "   ", "\n\t"] {
            assert!(matches!(
                recommender.recommend(input),
                Err(RecommendError::Input(_))
            ));
        }
        assert_eq!(recommender.provider.calls(), 0);
    }

    #[test]
    fn test_timeout_falls_back_to_catalog() {
        let provider = FakeProvider::with_tracks(&["a"]);
        provider
            .query_errors
            .lock()
            .unwrap()
            .push_back(ProviderError::Timeout);
        let recommender = Recommender::new(provider, &config());

        let rec = recommender.recommend("chill jazz for studying").unwrap();
        assert_eq!(rec.source, Source::Fallback);
        assert!(!rec.recommendations.is_empty());
        assert!(rec.recommendations.len() <= 6);
        assert!(rec.recommendations.iter().all(|t| t.id.starts_with("fallback-")));
        assert!(
            rec.recommendations
                .windows(2)
                .all(|w| w[0].similarity >= w[1].similarity)
        );
    }

    #[test]
    fn test_auth_failure_falls_back_without_query() {
        let provider = FakeProvider {
            token_error: Some(ProviderError::Status(400)),
            ..FakeProvider::with_tracks(&["a"])
        };
        let recommender = Recommender::new(provider, &config());

        let rec = recommender.recommend("upbeat pop").unwrap();
        assert_eq!(rec.source, Source::Fallback);
        assert_eq!(recommender.provider.query_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unconfigured_provider_is_never_called() {
        let recommender =
            Recommender::new(FakeProvider::with_tracks(&["a"]), &AppConfig::default());
        let rec = recommender.recommend("upbeat pop").unwrap();
        assert_eq!(rec.source, Source::Fallback);
        assert_eq!(recommender.provider.calls(), 0);
        assert_eq!(recommender.health().status, HealthStatus::Error);
    }

    #[test]
    fn test_empty_result_falls_back() {
        let recommender = Recommender::new(FakeProvider::default(), &config());
        let rec = recommender.recommend("rock").unwrap();
        assert_eq!(rec.source, Source::Fallback);
    }

    #[test]
    fn test_fallback_limit_is_configurable() {
        let provider = FakeProvider {
            token_error: Some(ProviderError::Timeout),
            ..Default::default()
        };
        let mut config = config();
        config.fallback_limit = 3;
        let recommender = Recommender::new(provider, &config);
        let rec = recommender.recommend("jazz").unwrap();
        assert_eq!(rec.recommendations.len(), 3);
    }

    #[test]
    fn test_unauthorized_query_retries_once_with_fresh_token() {
        let provider = FakeProvider::with_tracks(&["a", "b"]);
        provider
            .query_errors
            .lock()
            .unwrap()
            .push_back(ProviderError::Status(401));
        let recommender = Recommender::new(provider, &config());

        let rec = recommender.recommend("upbeat pop").unwrap();
        assert_eq!(rec.source, Source::External);
        assert_eq!(recommender.provider.query_calls.load(Ordering::SeqCst), 2);
        assert_eq!(recommender.provider.token_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_second_unauthorized_falls_back() {
        let provider = FakeProvider::with_tracks(&["a"]);
        {
            let mut errors = provider.query_errors.lock().unwrap();
            errors.push_back(ProviderError::Status(401));
            errors.push_back(ProviderError::Status(401));
        }
        let recommender = Recommender::new(provider, &config());

        let rec = recommender.recommend("upbeat pop").unwrap();
        assert_eq!(rec.source, Source::Fallback);
        assert_eq!(recommender.provider.query_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failed_enrichment_keeps_track() {
        let provider = FakeProvider {
            missing_features: vec!["b"],
            ..FakeProvider::with_tracks(&["a", "b", "loud"])
        };
        let recommender = Recommender::new(provider, &config());

        let rec = recommender.recommend("happy energetic dance").unwrap();
        assert_eq!(rec.source, Source::External);
        assert_eq!(rec.recommendations.len(), 3);

        let b = rec.recommendations.iter().find(|t| t.id == "b").unwrap();
        assert!(b.audio_features.is_none());
        assert!(b.color.is_none());
        assert!((b.similarity - 0.4).abs() < 1e-12);

        let a = rec.recommendations.iter().find(|t| t.id == "a").unwrap();
        assert!(a.audio_features.is_some());
        assert!(a.color.as_deref().is_some_and(|c| c.starts_with("hsl(")));
    }

    #[test]
    fn test_external_results_sorted_by_similarity() {
        let provider = FakeProvider::with_tracks(&["a", "loud"]);
        let recommender = Recommender::new(provider, &config());

        let rec = recommender.recommend("intense powerful energetic music").unwrap();
        assert_eq!(rec.source, Source::External);
        assert!(
            rec.recommendations
                .windows(2)
                .all(|w| w[0].similarity >= w[1].similarity)
        );
        assert_eq!(rec.recommendations[0].id, "loud");
    }

    #[test]
    fn test_feature_lookups_share_one_token_replacement() {
        let provider = FakeProvider {
            revoked_token: Some("token-0"),
            missing_features: vec!["b"],
            ..FakeProvider::with_tracks(&["a", "b", "loud", "c"])
        };
        let recommender = Recommender::new(provider, &config());

        let rec = recommender.recommend("upbeat pop").unwrap();
        assert_eq!(rec.source, Source::External);
        assert_eq!(rec.recommendations.len(), 4);
        // one token for the query, one replacement for the whole batch
        assert_eq!(recommender.provider.token_calls.load(Ordering::SeqCst), 2);
        // every lookup was retried once after its 401
        assert_eq!(recommender.provider.feature_calls.load(Ordering::SeqCst), 8);

        for t in &rec.recommendations {
            assert_eq!(t.audio_features.is_some(), t.id != "b", "track {}", t.id);
        }
    }

    #[test]
    fn test_external_tracks_tagged_with_requested_genres() {
        let recommender = Recommender::new(FakeProvider::with_tracks(&["a"]), &config());
        // "upbeat" also hits the house cue via "beat"
        let rec = recommender.recommend("upbeat pop").unwrap();
        assert_eq!(rec.source, Source::External);
        assert_eq!(rec.recommendations[0].genres, vec!["pop", "house"]);

        let rec = recommender.recommend("rock pop hip hop dance").unwrap();
        assert_eq!(rec.recommendations[0].genres.len(), 2);
    }

    #[test]
    fn test_token_is_reused_across_requests() {
        let recommender = Recommender::new(FakeProvider::with_tracks(&["a"]), &config());
        recommender.recommend("rock").unwrap();
        recommender.recommend("jazz").unwrap();
        assert_eq!(recommender.provider.token_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_happy_mood_targets_high_valence() {
        let recommender = Recommender::new(FakeProvider::with_tracks(&["a"]), &config());
        let rec = recommender.recommend_mood("happy", Some(0.9)).unwrap();
        assert_eq!(rec.query, "happy, upbeat, and energetic music");

        let query = recommender.provider.last_query.lock().unwrap().clone().unwrap();
        assert_eq!(query.target_valence, Some(0.8));
    }

    #[test]
    fn test_mood_input_validation() {
        let recommender = Recommender::new(FakeProvider::with_tracks(&["a"]), &config());
        assert!(matches!(
            recommender.recommend_mood("bored", None),
            Err(RecommendError::Input(_))
        ));
        assert!(matches!(
            recommender.recommend_mood("happy", Some(0.5)),
            Err(RecommendError::Input(_))
        ));
        assert!(matches!(
            recommender.recommend_mood("happy", Some(2.0)),
            Err(RecommendError::Input(_))
        ));
        assert_eq!(recommender.provider.calls(), 0);
    }

    #[test]
    fn test_health_reports_token_state() {
        let recommender = Recommender::new(FakeProvider::default(), &config());
        let health = recommender.health();
        assert_eq!(health.status, HealthStatus::Ok);
        assert_eq!(health.token, TokenState::Valid);
        assert!(health.last_error.is_none());

        let failing = Recommender::new(
            FakeProvider {
                token_error: Some(ProviderError::Status(401)),
                ..Default::default()
            },
            &config(),
        );
        let health = failing.health();
        assert_eq!(health.status, HealthStatus::Error);
        assert_eq!(health.token, TokenState::Missing);
        assert!(health.last_error.is_some());
    }

    #[test]
    fn test_genre_seeds_from_provider_or_builtin() {
        let recommender = Recommender::new(FakeProvider::default(), &config());
        assert_eq!(recommender.genre_seeds(), vec!["jazz", "rock"]);

        let offline = Recommender::new(
            FakeProvider {
                token_error: Some(ProviderError::Timeout),
                ..Default::default()
            },
            &config(),
        );
        assert_eq!(offline.genre_seeds().len(), VALID_GENRE_SEEDS.len());
    }

    #[test]
    fn test_serializes_response_shape() {
        let recommender = Recommender::new(FakeProvider::default(), &AppConfig::default());
        let rec = recommender.recommend("jazz").unwrap();
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["source"], "fallback");
        assert_eq!(json["featureVector"].as_array().unwrap().len(), 5);
        assert!(json["recommendations"].is_array());
    }
}
