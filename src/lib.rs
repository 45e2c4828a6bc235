//! # Mailgun Client
//! Asynchronous wrapper around the Mailgun HTTP API for sending transactional email and managing mailing-list subscriptions, using [`Client`], [`ClientBuilder`] and [`Message`].
//!
//! ## Audience and uses
//! For Rust applications that want a typed surface over Mailgun's multipart `messages` endpoint instead of hand-building form requests: build a [`Message`], attach files or images, then [`Client::send`] it and keep the returned message id.
//!
//! ## Runtime requirements
//! Async-only; run inside a Tokio (v1) runtime. HTTP calls use `reqwest`. Diagnostics are emitted through `tracing`; install a subscriber in your application to see them.
//!
//! ## Out of scope
//! No retries, rate limiting, pagination, webhooks or statistics. Each send issues exactly one request and the caller owns any retry policy.
//!
//! ## Errors
//! Network failures and unencodable requests surface as [`Error::Transport`]. A send response that is not a JSON object becomes [`Error::InvalidResponse`]; a JSON object without an `id` becomes [`Error::InvalidJson`]. The crate-wide [`Result`] alias wraps these errors.
//!
//! ## Example
//! ```no_run
//! use mailgun_client::{Client, Message};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mailgun_client::Error> {
//!     let client = Client::new("key-3ax6xnjp29jd6fds4gc373sgvjxteol0", "samples.mailgun.org")?;
//!
//!     let mut message = Message::new(
//!         "Excited User <someone@sample.org>",
//!         "Jay Baird <jay.baird@rackspace.com>",
//!         "Mailgun is awesome!",
//!         "A unicode snowman for you! ☃",
//!     );
//!     message.headers.insert("Reply-To".into(), "support@sample.org".into());
//!     message.add_attachment(b"hello".to_vec(), "hello.txt", "text/plain");
//!
//!     let id = client.send(&message).await?;
//!     println!("Queued: {id}");
//!     Ok(())
//! }
//! ```

mod client;
mod encoder;
mod error;
mod message;
mod models;

pub use client::{Client, ClientBuilder};
pub use encoder::{ImageEncoder, ImageFormat};
pub use error::Error;
pub use message::{Attachment, AttachmentPart, ClickTracking, Message, Parameters};
pub use models::ListMember;

/// Result type alias for Mailgun operations.
///
/// This is equivalent to `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
