//! Tagline command handlers

use anyhow::{bail, Result};

use folio_core::{ContentApi, ContentEditor, Tagline};

use crate::commands::report_save;
use crate::output::{print_json, Output, OutputFormat};

pub async fn show<A: ContentApi>(editor: &ContentEditor<A>, output: &Output) -> Result<()> {
    let loaded = editor.current::<Tagline>().await;
    match output.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "source": loaded.source.to_string(),
            "value": loaded.doc.0,
        })),
        OutputFormat::Quiet => println!("{}", loaded.doc.0),
        OutputFormat::Human => {
            println!("{}", loaded.doc.0);
            println!("\n(from {})", loaded.source);
        }
    }
    Ok(())
}

pub async fn set<A: ContentApi>(
    editor: &ContentEditor<A>,
    text: String,
    output: &Output,
) -> Result<()> {
    if text.trim().is_empty() {
        bail!("Tagline cannot be empty");
    }
    let outcome = editor.save(&Tagline(text)).await;
    report_save(outcome, "Updated tagline", output)
}
