//! Watch command handler
//!
//! A viewer on the terminal: one shared poll loop writes every accepted
//! snapshot through to the cache and publishes each changed field, and this
//! command prints what it receives until interrupted.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use folio_core::{ChangeNotification, ContentApi, ContentKey, SyncClient};

use crate::output::{json_value, Output, OutputFormat};

/// Print changes until Ctrl-C
pub async fn watch<A: ContentApi>(
    client: &SyncClient<A>,
    interval: Duration,
    keys: Vec<ContentKey>,
    output: &Output,
) -> Result<()> {
    if output.format == OutputFormat::Human {
        let watching = if keys.is_empty() {
            "all content".to_string()
        } else {
            keys.iter()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        eprintln!(
            "Watching {} every {} ms (Ctrl-C to stop)",
            watching,
            interval.as_millis()
        );
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Could not listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let seen = watch_until(client, interval, keys, output.format, shutdown).await;
    info!("Watch stopped after {} change(s)", seen);
    Ok(())
}

/// Run the viewer until `shutdown` resolves, returning how many changes were
/// printed
pub async fn watch_until<A, S>(
    client: &SyncClient<A>,
    interval: Duration,
    keys: Vec<ContentKey>,
    format: OutputFormat,
    shutdown: S,
) -> usize
where
    A: ContentApi,
    S: Future<Output = ()>,
{
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);

    let subscription = client.bus().subscribe_all(move |change| {
        if !keys.is_empty() && !keys.contains(&change.field) {
            return Ok(());
        }
        counter.fetch_add(1, Ordering::SeqCst);
        if let Some(line) = render_change(format, change) {
            println!("{}", line);
        }
        Ok(())
    });

    let poll = client.start_sync(interval);
    shutdown.await;

    poll.stop().await;
    subscription.unsubscribe();
    seen.load(Ordering::SeqCst)
}

/// One output line for a change
fn render_change(format: OutputFormat, change: &ChangeNotification) -> Option<String> {
    let time = chrono::Local::now().format("%H:%M:%S");
    match format {
        OutputFormat::Human => {
            let preview: String = change.payload.as_str().chars().take(60).collect();
            let ellipsis = if change.payload.as_str().chars().count() > 60 {
                "..."
            } else {
                ""
            };
            Some(format!(
                "[{}] {} changed: {}{}",
                time, change.field, preview, ellipsis
            ))
        }
        OutputFormat::Json => Some(
            serde_json::json!({
                "field": change.field.as_str(),
                "value": json_value(&change.payload),
            })
            .to_string(),
        ),
        OutputFormat::Quiet => Some(change.field.as_str().to_string()),
    }
}
