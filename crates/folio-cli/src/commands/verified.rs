//! Verified section command handlers

use anyhow::{bail, Result};

use folio_core::documents::AcademicResult;
use folio_core::{ContentApi, ContentEditor, VerifiedContent};

use crate::commands::report_save;
use crate::output::Output;

pub async fn show<A: ContentApi>(editor: &ContentEditor<A>, output: &Output) -> Result<()> {
    let loaded = editor.current::<VerifiedContent>().await;
    output.print_verified(&loaded);
    Ok(())
}

pub async fn set_about<A: ContentApi>(
    editor: &ContentEditor<A>,
    text: String,
    output: &Output,
) -> Result<()> {
    let outcome = editor
        .update::<VerifiedContent, _>(|verified| verified.about_text = text)
        .await;
    report_save(outcome, "Updated about text", output)
}

pub async fn set_photo<A: ContentApi>(
    editor: &ContentEditor<A>,
    url: String,
    output: &Output,
) -> Result<()> {
    let outcome = editor
        .update::<VerifiedContent, _>(|verified| verified.photo_url = url)
        .await;
    report_save(outcome, "Updated photo", output)
}

pub async fn add_result<A: ContentApi>(
    editor: &ContentEditor<A>,
    title: String,
    description: String,
    image_url: String,
    output: &Output,
) -> Result<()> {
    let result = AcademicResult::new(title, description, image_url);
    let message = format!("Added result '{}' ({})", result.title, result.id);

    let outcome = editor
        .update::<VerifiedContent, _>(move |verified| verified.results.push(result))
        .await;
    report_save(outcome, &message, output)
}

pub async fn remove_result<A: ContentApi>(
    editor: &ContentEditor<A>,
    id: String,
    output: &Output,
) -> Result<()> {
    let mut verified = editor.current::<VerifiedContent>().await.doc;
    if !verified.remove_result(&id) {
        bail!("Result not found: {}", id);
    }

    let outcome = editor.save(&verified).await;
    report_save(outcome, &format!("Removed result {}", id), output)
}
