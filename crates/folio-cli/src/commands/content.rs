//! Raw content command handlers (`show`, `set`)

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use folio_core::{ContentApi, ContentEditor, ContentKey, ContentValue};

use crate::commands::report_save;
use crate::output::{json_value, print_json, Output, OutputFormat};

/// Show one field, or every field, with the tier it was resolved from
pub async fn show<A: ContentApi>(
    editor: &ContentEditor<A>,
    key: Option<ContentKey>,
    output: &Output,
) -> Result<()> {
    let keys = match key {
        Some(key) => vec![key],
        None => ContentKey::ALL.to_vec(),
    };

    if keys.len() > 1 && output.format == OutputFormat::Json {
        let mut fields = serde_json::Map::new();
        for key in keys {
            let resolved = editor
                .client()
                .resolve(key)
                .await
                .with_context(|| format!("Failed to resolve '{}'", key))?;
            fields.insert(
                key.as_str().to_string(),
                serde_json::json!({
                    "source": resolved.source.to_string(),
                    "value": json_value(&resolved.value),
                }),
            );
        }
        print_json(&fields);
        return Ok(());
    }

    for (index, key) in keys.iter().enumerate() {
        if index > 0 && output.format == OutputFormat::Human {
            println!();
        }
        let resolved = editor
            .client()
            .resolve(*key)
            .await
            .with_context(|| format!("Failed to resolve '{}'", key))?;
        output.print_resolved(*key, &resolved);
    }
    Ok(())
}

/// Replace a whole field with a raw value
pub async fn set<A: ContentApi>(
    editor: &ContentEditor<A>,
    key: ContentKey,
    value: Option<String>,
    file: Option<PathBuf>,
    output: &Output,
) -> Result<()> {
    let raw = match (value, file) {
        (Some(value), None) => value,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (Some(_), Some(_)) => bail!("Give either a value or --file, not both"),
        (None, None) => bail!("Nothing to write: give a value or --file PATH"),
    };

    let outcome = editor.save_value(key, ContentValue::new(raw)).await;
    report_save(outcome, &format!("Updated {}", key), output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{editor, quiet};
    use folio_core::Source;
    use std::io::Write;

    #[tokio::test]
    async fn test_set_then_show() {
        let (editor, store) = editor();

        set(
            &editor,
            ContentKey::Tagline,
            Some("Hello there".to_string()),
            None,
            &quiet(),
        )
        .await
        .unwrap();

        assert_eq!(
            store.get(ContentKey::Tagline).unwrap(),
            Some(ContentValue::new("Hello there"))
        );
        let resolved = editor.client().resolve(ContentKey::Tagline).await.unwrap();
        assert_eq!(resolved.source, Source::Server);

        show(&editor, None, &quiet()).await.unwrap();
    }

    #[tokio::test]
    async fn test_set_from_file() {
        let (editor, store) = editor();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"id":"p1","title":"folio"}}]"#).unwrap();

        set(
            &editor,
            ContentKey::Projects,
            None,
            Some(file.path().to_path_buf()),
            &quiet(),
        )
        .await
        .unwrap();

        let stored = store.get(ContentKey::Projects).unwrap().unwrap();
        assert!(stored.as_str().contains("folio"));
    }

    #[tokio::test]
    async fn test_set_rejected_value_is_an_error() {
        let (editor, store) = editor();

        let result = set(
            &editor,
            ContentKey::Projects,
            Some("{not json".to_string()),
            None,
            &quiet(),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(store.get(ContentKey::Projects).unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_requires_exactly_one_source() {
        let (editor, _store) = editor();

        assert!(set(&editor, ContentKey::Tagline, None, None, &quiet())
            .await
            .is_err());
        assert!(set(
            &editor,
            ContentKey::Tagline,
            Some("x".into()),
            Some(PathBuf::from("/dev/null")),
            &quiet()
        )
        .await
        .is_err());
    }
}
