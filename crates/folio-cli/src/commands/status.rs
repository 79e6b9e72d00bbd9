//! Status command handler

use anyhow::Result;
use chrono::{Local, TimeZone};

use folio_core::{Config, ContentApi, SyncClient};

use crate::output::{human_size, Output, OutputFormat};

/// Show server reachability and local cache state
pub async fn show<A: ContentApi>(
    client: &SyncClient<A>,
    config: &Config,
    output: &Output,
) -> Result<()> {
    let fetched = client.fetch_all().await;
    let cache_bytes = client.cache().used_bytes().ok();

    match output.format {
        OutputFormat::Json => {
            let (reachable, last_updated, error) = match &fetched {
                Ok(snapshot) => (true, Some(snapshot.last_updated()), None),
                Err(e) => (false, None, Some(e.to_string())),
            };
            println!(
                "{}",
                serde_json::json!({
                    "server": {
                        "url": client.api().endpoint(),
                        "reachable": reachable,
                        "lastUpdated": last_updated,
                        "error": error,
                    },
                    "cache": {
                        "path": config.cache_path(),
                        "used_bytes": cache_bytes,
                        "quota_bytes": config.cache_quota_bytes,
                    },
                    "poll_interval_ms": config.poll_interval_ms,
                })
            );
        }
        OutputFormat::Quiet => {
            println!(
                "{}",
                if fetched.is_ok() {
                    "online"
                } else {
                    "offline"
                }
            );
        }
        OutputFormat::Human => {
            println!("folio Status");
            println!("============");
            println!();
            println!("Server:");
            println!("  URL:          {}", client.api().endpoint());
            match &fetched {
                Ok(snapshot) => {
                    println!("  Status:       reachable");
                    println!(
                        "  Last updated: {}",
                        format_timestamp(snapshot.last_updated())
                    );
                    println!("  Fields set:   {}", snapshot.iter().count());
                }
                Err(e) => {
                    println!("  Status:       unreachable ({})", e);
                    println!("  Edits are kept in the local cache until the server is back.");
                }
            }
            println!();
            println!("Local cache:");
            println!("  Location: {}", config.cache_path().display());
            println!(
                "  Size:     {} of {}",
                cache_bytes
                    .map(human_size)
                    .unwrap_or_else(|| "unknown".to_string()),
                human_size(config.cache_quota_bytes)
            );
            println!();
            println!("Polling every {} ms", config.poll_interval_ms);
        }
    }

    Ok(())
}

fn format_timestamp(millis: i64) -> String {
    match Local.timestamp_millis_opt(millis).single() {
        Some(time) => format!("{} ({})", time.format("%Y-%m-%d %H:%M:%S"), millis),
        None => millis.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert!(format_timestamp(1_700_000_000_000).ends_with("(1700000000000)"));
        assert!(format_timestamp(1_700_000_000_000).starts_with("2023-11-1"));
    }
}
