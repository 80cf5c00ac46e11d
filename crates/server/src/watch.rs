use std::time::Duration;

use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

use crate::state::AppState;

/// Watches the background directories so edits made outside the mutation
/// API (deployments dropping system assets, manual cleanup) still reach
/// the catalog.
pub fn configure_watcher(state: &AppState) {
    let config = state.config.read().clone();
    if !config.watch_backgrounds {
        info!("Watcher disabled (watch_backgrounds=false)");
        *state.watcher.write() = None;
        return;
    }

    let debounce_secs = if config.watch_debounce_secs == 0 {
        2
    } else {
        config.watch_debounce_secs
    };
    let debounce = Duration::from_secs(debounce_secs);

    match setup_watcher(state.clone(), debounce) {
        Ok(watcher) => {
            info!("Watching background directories (debounce {}s)", debounce.as_secs());
            *state.watcher.write() = Some(watcher);
        }
        Err(err) => {
            warn!("Failed to start watcher: {}", err);
            *state.watcher.write() = None;
        }
    }
}

fn setup_watcher(
    state: AppState,
    debounce: Duration,
) -> Result<RecommendedWatcher, Box<dyn std::error::Error>> {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Event>();
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            if let Ok(event) = res {
                let _ = tx.send(event);
            }
        },
        NotifyConfig::default(),
    )?;

    let registry_config = state.registry.config().clone();
    watcher.watch(&registry_config.backgrounds_root, RecursiveMode::Recursive)?;
    watcher.watch(&registry_config.system_assets_root, RecursiveMode::Recursive)?;
    watcher.watch(&registry_config.custom_assets_root, RecursiveMode::Recursive)?;

    tokio::spawn(async move {
        watch_loop(state, rx, debounce).await;
    });

    Ok(watcher)
}

async fn watch_loop(state: AppState, mut rx: UnboundedReceiver<Event>, debounce: Duration) {
    loop {
        let event = match rx.recv().await {
            Some(event) => event,
            None => break,
        };
        if !is_relevant_event(&event) {
            continue;
        }

        state.registry.invalidate();
        loop {
            tokio::select! {
                _ = tokio::time::sleep(debounce) => {
                    match state.registry.refresh().await {
                        Ok(catalog) => info!(
                            "Auto-refresh complete: {} backgrounds",
                            catalog.records.len()
                        ),
                        Err(err) => warn!("Auto-refresh failed: {}", err),
                    }
                    break;
                }
                maybe_event = rx.recv() => {
                    if maybe_event.is_none() {
                        return;
                    }
                }
            }
        }
    }
}

fn is_relevant_event(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}
