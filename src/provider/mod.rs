pub mod credentials;
pub mod query;
pub mod spotify;

use serde::Deserialize;
use thiserror::Error;

use crate::track::AudioFeatures;

pub use credentials::{AuthError, CredentialCache};
pub use query::QueryParams;
pub use spotify::SpotifyClient;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("request timed out")]
    Timeout,
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// The access token was rejected; worth one forced refresh.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status(401))
    }
}

/// Client-credentials grant returned by the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
}

/// A recommended track as the provider describes it.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderTrack {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ProviderArtist>,
    pub album: Option<ProviderAlbum>,
    pub popularity: Option<u32>,
    pub preview_url: Option<String>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

impl ProviderTrack {
    /// Artist names joined for display.
    pub fn artist_line(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The first (largest) album image, if any.
    pub fn album_art(&self) -> Option<&str> {
        self.album
            .as_ref()
            .and_then(|a| a.images.first())
            .map(|img| img.url.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderArtist {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderAlbum {
    pub name: String,
    #[serde(default)]
    pub images: Vec<ProviderImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderImage {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}

/// Remote music service the recommender talks to.
///
/// Implementations perform one outbound call per method and never retry;
/// retry and token policy live in the caller.
pub trait MusicProvider: Send + Sync {
    /// Exchange client credentials for a bearer token.
    fn request_token(&self) -> Result<TokenGrant, ProviderError>;

    /// Recommended tracks for the given query.
    fn recommendations(
        &self,
        token: &str,
        query: &QueryParams,
    ) -> Result<Vec<ProviderTrack>, ProviderError>;

    /// Detailed audio attributes for one track.
    fn audio_features(&self, token: &str, track_id: &str) -> Result<AudioFeatures, ProviderError>;

    /// Genre seeds the provider accepts.
    fn genre_seeds(&self, token: &str) -> Result<Vec<String>, ProviderError>;
}
