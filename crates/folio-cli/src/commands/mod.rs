//! Command handlers
//!
//! Handlers are generic over the content transport so they run the same
//! against the HTTP API and an in-process store.

pub mod config;
pub mod content;
pub mod header;
pub mod project;
pub mod skill;
pub mod status;
pub mod tagline;
pub mod upload;
pub mod verified;
pub mod watch;

use std::sync::Arc;

use anyhow::{bail, Context, Result};

use folio_core::{Config, ContentKey, HttpContentApi, SaveOutcome, SnapshotCache, SyncClient};

use crate::output::{print_json, Output, OutputFormat};

/// Sync client against the configured server with the on-disk cache
pub fn open_client(config: &Config) -> Result<SyncClient<HttpContentApi>> {
    let api = HttpContentApi::new(&config.server_url)
        .with_context(|| format!("Invalid server URL '{}'", config.server_url))?;
    let cache = SnapshotCache::open(config).with_context(|| {
        format!(
            "Failed to open snapshot cache at {}",
            config.cache_path().display()
        )
    })?;
    Ok(SyncClient::new(api, Arc::new(cache)))
}

/// clap value parser for content keys
pub fn parse_key(s: &str) -> Result<ContentKey, String> {
    s.parse::<ContentKey>().map_err(|_| {
        let valid: Vec<&str> = ContentKey::ALL.iter().map(|k| k.as_str()).collect();
        format!("unknown content key '{}' (valid: {})", s, valid.join(", "))
    })
}

/// Print the outcome of a save
///
/// A value kept only locally is a warning, a rejection is an error.
pub fn report_save(outcome: SaveOutcome, what: &str, output: &Output) -> Result<()> {
    match outcome {
        SaveOutcome::Synced { last_updated } => {
            match output.format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "status": "synced",
                    "message": what,
                    "lastUpdated": last_updated,
                })),
                _ => output.success(what),
            }
            Ok(())
        }
        outcome @ SaveOutcome::SavedLocally { .. } => {
            output.warning(&format!("{}: {}", what, outcome));
            Ok(())
        }
        SaveOutcome::Rejected { message } => bail!("{} rejected by the server: {}", what, message),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key() {
        assert_eq!(parse_key("tagline"), Ok(ContentKey::Tagline));
        assert_eq!(parse_key("projects-list"), Ok(ContentKey::Projects));

        let err = parse_key("footer").unwrap_err();
        assert!(err.contains("unknown content key 'footer'"));
        assert!(err.contains("header-lines"));
    }

    #[test]
    fn test_report_save() {
        let output = testing::quiet();

        assert!(report_save(SaveOutcome::Synced { last_updated: 1 }, "Saved", &output).is_ok());
        assert!(report_save(
            SaveOutcome::SavedLocally {
                reason: "offline".into()
            },
            "Saved",
            &output
        )
        .is_ok());

        let err = report_save(
            SaveOutcome::Rejected {
                message: "Invalid projects data format".into(),
            },
            "Saved projects",
            &output,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Invalid projects data format"));
    }
}
