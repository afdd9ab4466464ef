// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Keep-fresh sandbox
// Runs two trackers against an in-memory host and prints what they deliver.

use std::sync::Arc;

use anyhow::Result;
use keepfresh_agents::{
    DeliveryContext, FreshnessEngine, FreshnessOptions, TrackerSettings, UserSelection,
};
use keepfresh_core::{EventBus, ReceiveEvent, UserRecord};
use keepfresh_data::{InMemoryHost, InMemoryUserStore};
use serde_json::json;

const TRACKERS: &str = r#"[
    { "id": "models", "proactive": true },
    { "id": "colors" }
]"#;

async fn announce(ctx: DeliveryContext) -> Result<()> {
    log::info!(
        "-> {}: {} @ {} ({})",
        ctx.user.id,
        ctx.tracker,
        ctx.digest,
        ctx.asset.as_value()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let store = InMemoryUserStore::with_users(
        ["ted", "alice", "bob"]
            .into_iter()
            .map(|id| UserRecord::new(id).with_field("name", json!(id))),
    );
    let host = Arc::new(InMemoryHost::with_store(Arc::new(store)));

    let settings: Vec<TrackerSettings> = serde_json::from_str(TRACKERS)?;
    let mut settings = settings.into_iter();
    let (models, colors) = match (settings.next(), settings.next()) {
        (Some(models), Some(colors)) => (models, colors),
        _ => anyhow::bail!("expected two tracker settings"),
    };

    let models = FreshnessEngine::new(
        FreshnessOptions::from_settings(models, json!([{ "id": "a" }, { "id": "b" }])),
        announce,
    )?
    .install(host.clone())?;
    let colors = FreshnessEngine::new(
        FreshnessOptions::from_settings(colors, json!({ "primary": "#112233" })),
        announce,
    )?
    .install(host.clone())?;

    let report = models.ready().await?;
    log::info!("models ready: {} users synced", report.delivered.len());
    colors.ready().await?;

    // Inbound traffic: colors is lazy, so only senders get it.
    let mut bus = EventBus::new();
    for id in ["ted", "ted", "alice"] {
        bus.publish(ReceiveEvent::new(UserRecord::new(id)).with_message(json!({ "text": "hi" })));
    }
    let events = bus.receiver();
    bus.close();
    let stats = Arc::clone(&host).dispatch(events).await;
    log::info!("dispatched {} events ({} failed)", stats.received, stats.failed);

    let outcome = models
        .update(&json!([{ "id": "a" }, { "id": "b" }, { "id": "c" }]), false)
        .await?;
    log::info!(
        "models {} -> {} (changed: {})",
        outcome.previous,
        outcome.current,
        outcome.changed()
    );

    let sweep = colors.ensure_fresh(UserSelection::All).await?;
    log::info!(
        "colors sweep: {} delivered, {} already fresh",
        sweep.delivered.len(),
        sweep.already_fresh.len()
    );

    models.uninstall();
    colors.uninstall();
    log::info!("{} handlers left on host", host.handler_count());
    Ok(())
}
