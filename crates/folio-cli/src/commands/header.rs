//! Header line command handlers

use anyhow::{bail, Result};

use folio_core::documents::HEADER_LINE_COUNT;
use folio_core::{ContentApi, ContentEditor, HeaderLines};

use crate::commands::report_save;
use crate::output::Output;

pub async fn show<A: ContentApi>(editor: &ContentEditor<A>, output: &Output) -> Result<()> {
    let loaded = editor.current::<HeaderLines>().await;
    output.print_header(&loaded);
    Ok(())
}

/// Replace the header lines in order; positions not given keep their value
pub async fn set<A: ContentApi>(
    editor: &ContentEditor<A>,
    lines: Vec<String>,
    output: &Output,
) -> Result<()> {
    if lines.is_empty() || lines.len() > HEADER_LINE_COUNT {
        bail!("Give between 1 and {} header lines", HEADER_LINE_COUNT);
    }

    let outcome = editor
        .update::<HeaderLines, _>(|header| {
            for (index, line) in lines.into_iter().enumerate() {
                header.set(index, line);
            }
        })
        .await;
    report_save(outcome, "Updated header lines", output)
}
