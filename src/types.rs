//! Core domain types

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A textual entity record stored in the graph
///
/// The embedding is either absent or exactly the configured dimension;
/// only the embedding pass ever sets it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Unique identity key (`full_name`)
    pub name: String,
    /// Free-text field the embedding is derived from
    pub bio: String,
    /// Stored embedding, if one has been written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// Ranked result of a semantic search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub name: String,
    pub bio: String,
    pub score: f64,
}

/// Bearer credential for the embedding provider
///
/// Owned by the credential provider; callers use the secret for a single
/// request and never persist it.
#[derive(Clone)]
pub struct AccessToken {
    secret: String,
    expires_at: Instant,
}

impl AccessToken {
    pub fn new(secret: String, expires_at: Instant) -> Self {
        Self { secret, expires_at }
    }

    /// The bearer secret
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Whether the token expires within the given margin from now
    pub fn expires_within(&self, margin: Duration) -> bool {
        Instant::now() + margin >= self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Similarity function used by the vector index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityFunction {
    #[default]
    Cosine,
    Euclidean,
}

/// Ranking direction for search scores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreOrder {
    /// Higher score means more similar
    Descending,
    /// Lower score means more similar (raw distance)
    Ascending,
}

impl SimilarityFunction {
    /// Default ranking direction for scores produced under this function
    ///
    /// Cosine similarity ranks higher-is-better; raw euclidean distance
    /// ranks lower-is-better.
    pub fn score_order(self) -> ScoreOrder {
        match self {
            Self::Cosine => ScoreOrder::Descending,
            Self::Euclidean => ScoreOrder::Ascending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
        }
    }
}

impl fmt::Display for SimilarityFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimilarityFunction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "euclidean" => Ok(Self::Euclidean),
            other => Err(Error::Config(format!(
                "Unknown similarity function '{}' (expected 'cosine' or 'euclidean')",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_similarity_function() {
        assert_eq!(
            "cosine".parse::<SimilarityFunction>().unwrap(),
            SimilarityFunction::Cosine
        );
        assert_eq!(
            "Euclidean".parse::<SimilarityFunction>().unwrap(),
            SimilarityFunction::Euclidean
        );
        assert!("dot".parse::<SimilarityFunction>().is_err());
    }

    #[test]
    fn score_order_follows_similarity_function() {
        assert_eq!(
            SimilarityFunction::Cosine.score_order(),
            ScoreOrder::Descending
        );
        assert_eq!(
            SimilarityFunction::Euclidean.score_order(),
            ScoreOrder::Ascending
        );
    }

    #[test]
    fn access_token_debug_redacts_secret() {
        let token = AccessToken::new(
            "s3cret".to_string(),
            Instant::now() + Duration::from_secs(3600),
        );
        let rendered = format!("{:?}", token);
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn fresh_token_is_not_near_expiry() {
        let token = AccessToken::new(
            "t".to_string(),
            Instant::now() + Duration::from_secs(3600),
        );
        assert!(!token.expires_within(Duration::from_secs(60)));
        assert!(token.expires_within(Duration::from_secs(7200)));
    }
}
