//! Error types for Mailgun operations.

use thiserror::Error;

/// Errors produced by the client and the message model.
#[derive(Debug, Error)]
pub enum Error {
    /// Network failure, connection error, or a request that could not be built
    /// (including malformed multipart parts). Non-2xx statuses on the
    /// mailing-list endpoints also land here.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was a JSON object but carried no string `id`.
    #[error("response JSON did not contain a message id")]
    InvalidJson,

    /// The response body could not be parsed as a JSON object.
    #[error("response body is not a JSON object")]
    InvalidResponse,

    /// The requested capability is not available in this build.
    #[error("{0} is not supported")]
    Unsupported(&'static str),

    /// Encoding an image attachment failed.
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    /// The API key is empty or cannot be carried in an `Authorization` header.
    #[error("invalid API key")]
    InvalidApiKey,

    /// The API root is not an absolute URL that can carry a path.
    #[error("invalid API URL: {0}")]
    InvalidApiUrl(String),

    /// A required environment variable was not set.
    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),
}
