//! Metadata preview tool built on the herald library.
#![allow(unreachable_pub, dead_code, clippy::missing_const_for_fn)]
//!
//! Builds a draft from CLI arguments, validates it the way the publisher
//! does, prints the resulting metadata document and optionally uploads it.
//!
//! ## Usage
//!
//! ```bash
//! # Preview a text post
//! herald --handle alice --text "gm #lens"
//!
//! # Preview an audio comment
//! herald --comment --attachment ar://track=audio/mpeg \
//!     --audio-title Track --audio-author bob --audio-cover ar://cover=image/png
//!
//! # Upload with settings from a config file
//! herald --config herald.toml --text "gm" --upload-url http://localhost:1984/upload
//! ```

mod config;
mod store;

use chrono::Utc;
use clap::Parser;
use herald::{Hashtags, MetadataBuilder, MetadataContext, MetadataStore, TagExtractor};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    config::{Cli, Config},
    store::HttpStore,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli)?;
    info!(?config, "loaded configuration");

    let kind = cli.kind();
    let draft = cli.draft();
    let focus = draft.validate(kind)?;

    let mut ctx = MetadataContext::new(config.handle.clone(), kind, Utc::now());
    ctx.tags = Hashtags.tags(&draft.text);
    if MetadataBuilder::needs_text_image(&draft) {
        warn!("no text image renderer configured, metadata has no preview image");
    }
    let metadata = MetadataBuilder::new(&config.publisher).build(&draft, focus, ctx);
    println!("{}", serde_json::to_string_pretty(&metadata)?);

    if let Some(url) = &config.upload_url {
        let locator = HttpStore::new(url.clone()).upload(&metadata).await?;
        let content_uri = config.publisher.content_uri(&locator);
        info!(%content_uri, "uploaded metadata");
        println!("{content_uri}");
    }

    Ok(())
}
