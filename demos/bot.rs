//! Echo bot.
//!
//! ```text
//! cargo run --example bot -- slirc.toml
//! RUST_LOG=slirc_client=debug cargo run --example bot -- slirc.toml
//! ```
//!
//! Answers `!ping` in any channel it sits in and logs every message.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use parking_lot::RwLock;
use slirc_client::{Client, Event, EventBus, EventKind, NetworkHandle};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "slirc.toml".to_owned());

    // Callbacks are registered before any network starts, so the handles
    // they reply through are filled in afterwards.
    let handles: Arc<RwLock<HashMap<String, NetworkHandle>>> = Arc::default();
    let bus = EventBus::new();

    bus.on(EventKind::ConnectionReady, |event| {
        if let Some(network) = event.network() {
            info!(%network, "ready");
        }
        Ok(())
    });

    let replies = Arc::clone(&handles);
    bus.on(EventKind::Message, move |event| {
        let Event::Message { network, user, channel, text, .. } = event else {
            return Ok(());
        };
        info!("{} <{}> {}", channel.name, user.nick, text);
        if text.trim() == "!ping" {
            let handles = replies.read();
            let handle = handles
                .get(network)
                .with_context(|| format!("no handle for network {}", network))?;
            handle.say(&channel.name, &format!("{}: pong", user.nick));
        }
        Ok(())
    });

    bus.on(EventKind::ConfigLoad, |_| {
        info!("configuration loaded");
        Ok(())
    });

    let client = Client::from_config_file(&path, bus)
        .with_context(|| format!("failed to start from {}", path))?;
    handles.write().extend(
        client
            .networks()
            .iter()
            .map(|n| (n.id().to_owned(), n.clone())),
    );

    tokio::signal::ctrl_c().await?;
    info!("interrupted, quitting");
    client.quit(Some("bye"));
    client.wait().await;
    Ok(())
}
