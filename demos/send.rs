//! Send a test-mode message using credentials from the environment.
//!
//! ```text
//! MAILGUN_API_KEY=key-... MAILGUN_DOMAIN=samples.mailgun.org \
//!     cargo run --example send -- "Jay <jay@example.com>"
//! ```

use mailgun_client::{ClientBuilder, ImageFormat, Message};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "mailgun_client=debug".into()),
        )
        .init();

    let client = ClientBuilder::from_env()?.build()?;
    let to = std::env::args()
        .nth(1)
        .unwrap_or_else(|| format!("postmaster@{}", client.domain()));

    let mut message = Message::new(
        format!("Demo <demo@{}>", client.domain()),
        &to,
        "Mailgun is awesome!",
        "A unicode snowman for you! ☃",
    );
    message.html = Some(r#"<p>A unicode snowman for you! ☃</p><img src="cid:dot.png">"#.into());
    message.testing = true;
    message.tags.push("demo".into());

    let dot = image::DynamicImage::new_rgba8(1, 1);
    message.add_image(&dot, "dot", &ImageFormat::Png, true)?;

    let id = client.send(&message).await?;
    println!("Queued: {id}");
    Ok(())
}
