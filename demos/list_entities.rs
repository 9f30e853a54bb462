//! Entity inventory by domain.
//!
//! Demonstrates:
//! - Building a client from `HASS_URL` and `HASS_TOKEN`
//! - Fetching the state snapshot over the socket
//! - Listing automations, scripts and helpers
//! - Watching lifecycle events while connected
//!
//! Usage:
//!   HASS_URL=http://homeassistant.local:8123 HASS_TOKEN=... cargo run --example list_entities
//!   RUST_LOG=hass_bridge=debug cargo run --example list_entities

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;

use hass_bridge::{ClientBuilder, HomeAssistant, Result};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hass_bridge=info")),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    println!("=== Entity Inventory ===\n");

    // ========================================================================
    // Connect
    // ========================================================================

    println!("[1] Connecting...");
    let client = ClientBuilder::from_env().connect().await?;
    let mut events = client.ws().subscribe();

    println!("    Endpoint: {}", client.ws().endpoint());
    if let Some(version) = client.ws().ha_version() {
        println!("    Hub version: {version}");
    }
    println!("    ✓ Connected\n");

    // ========================================================================
    // Count by domain
    // ========================================================================

    println!("[2] Fetching states...");
    let states = client.get_states().await?;

    let mut per_domain: BTreeMap<&str, usize> = BTreeMap::new();
    for entity in &states {
        *per_domain.entry(entity.domain()).or_default() += 1;
    }

    println!("    {} entities in {} domains", states.len(), per_domain.len());
    for (domain, count) in &per_domain {
        println!("    {domain:<24} {count:>5}");
    }
    println!();

    // ========================================================================
    // Configurable entities
    // ========================================================================

    println!("[3] Automations, scripts and helpers...");
    let automations = client.list_automations().await?;
    let scripts = client.list_scripts().await?;
    let helpers = client.list_helpers().await?;

    println!("    Automations: {}", automations.len());
    println!("    Scripts:     {}", scripts.len());
    println!("    Helpers:     {}", helpers.len());

    for script in scripts.iter().take(5) {
        let name = script.friendly_name().unwrap_or(&script.entity_id);
        println!("      - {name} ({})", script.state);
    }
    println!();

    // ========================================================================
    // Cleanup
    // ========================================================================

    println!("[4] Closing...");
    client.close().await?;

    while let Ok(event) = events.try_recv() {
        println!("    event: {event}");
    }
    println!("    ✓ Done");

    Ok(())
}
