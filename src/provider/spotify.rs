use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use ureq::Agent;

use super::{MusicProvider, ProviderError, ProviderTrack, QueryParams, TokenGrant};
use crate::config::ProviderConfig;
use crate::track::AudioFeatures;

#[derive(Debug, Deserialize)]
struct RecommendationsResponse {
    #[serde(default)]
    tracks: Vec<ProviderTrack>,
}

#[derive(Debug, Deserialize)]
struct GenreSeedsResponse {
    #[serde(default)]
    genres: Vec<String>,
}

/// Audio-features payload; the provider may omit fields for some tracks.
#[derive(Debug, Deserialize)]
struct AudioFeaturesResponse {
    energy: Option<f64>,
    tempo: Option<f64>,
    danceability: Option<f64>,
    valence: Option<f64>,
    acousticness: Option<f64>,
    instrumentalness: Option<f64>,
}

impl AudioFeaturesResponse {
    fn into_features(self) -> Result<AudioFeatures, ProviderError> {
        match (self.energy, self.tempo, self.danceability, self.valence) {
            (Some(energy), Some(tempo), Some(danceability), Some(valence)) => Ok(AudioFeatures {
                energy,
                tempo,
                danceability,
                valence,
                acousticness: self.acousticness.unwrap_or(0.5),
                instrumentalness: self.instrumentalness.unwrap_or(0.5),
            }),
            _ => Err(ProviderError::Decode("audio features incomplete".into())),
        }
    }
}

/// Blocking client for the Spotify Web API. Every call is bounded by the
/// configured timeout.
pub struct SpotifyClient {
    agent: Agent,
    client_id: String,
    client_secret: String,
    token_url: String,
    api_url: String,
}

impl SpotifyClient {
    pub fn new(config: &ProviderConfig) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(config.timeout()))
            .build()
            .into();
        Self {
            agent,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token_url: config.token_url.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
        }
    }

    fn basic_auth(&self) -> String {
        let raw = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", STANDARD.encode(raw))
    }

    /// Authorized GET returning JSON.
    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.api_url, path);
        log::debug!("GET {url} {query:?}");

        let mut request = self
            .agent
            .get(&url)
            .header("Authorization", format!("Bearer {token}"));
        for (key, value) in query {
            request = request.query(*key, value);
        }

        request
            .call()
            .map_err(map_ureq_error)?
            .body_mut()
            .read_json()
            .map_err(map_ureq_error)
    }
}

fn map_ureq_error(e: ureq::Error) -> ProviderError {
    match e {
        ureq::Error::StatusCode(code) => ProviderError::Status(code),
        ureq::Error::Timeout(_) => ProviderError::Timeout,
        ureq::Error::Json(e) => ProviderError::Decode(e.to_string()),
        other => ProviderError::Transport(other.to_string()),
    }
}

impl MusicProvider for SpotifyClient {
    fn request_token(&self) -> Result<TokenGrant, ProviderError> {
        log::debug!("POST {}", self.token_url);
        self.agent
            .post(&self.token_url)
            .header("Authorization", self.basic_auth())
            .send_form([("grant_type", "client_credentials")])
            .map_err(map_ureq_error)?
            .body_mut()
            .read_json()
            .map_err(map_ureq_error)
    }

    fn recommendations(
        &self,
        token: &str,
        query: &QueryParams,
    ) -> Result<Vec<ProviderTrack>, ProviderError> {
        let response: RecommendationsResponse =
            self.get_json("/recommendations", token, &query.to_pairs())?;
        Ok(response.tracks)
    }

    fn audio_features(&self, token: &str, track_id: &str) -> Result<AudioFeatures, ProviderError> {
        let response: AudioFeaturesResponse =
            self.get_json(&format!("/audio-features/{track_id}"), token, &[])?;
        response.into_features()
    }

    fn genre_seeds(&self, token: &str) -> Result<Vec<String>, ProviderError> {
        let response: GenreSeedsResponse =
            self.get_json("/recommendations/available-genre-seeds", token, &[])?;
        Ok(response.genres)
    }
}
