//! Image upload command handlers

use std::path::Path;

use anyhow::{bail, Context, Result};

use folio_core::{ContentApi, ContentEditor, UploadedImage, UploadedImageList};

use crate::commands::report_save;
use crate::output::Output;

/// Upload a file and register it in the uploaded images list
///
/// With `inline` the file is not sent to the upload endpoint; its bytes are
/// embedded in the list as a `data:` URL instead.
pub async fn upload<A: ContentApi>(
    editor: &ContentEditor<A>,
    path: &Path,
    inline: bool,
    output: &Output,
) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let mime_type = mime_type_for(path);

    let image = if inline {
        UploadedImage::inline(&name, mime_type, &bytes)
    } else {
        let size = bytes.len() as u64;
        let reply = editor
            .client()
            .upload(&name, mime_type, bytes)
            .await
            .with_context(|| format!("Failed to upload {}", name))?;
        let Some(url) = reply.file_url.filter(|_| reply.success) else {
            bail!(
                "Upload of {} failed: {}",
                name,
                reply.message.unwrap_or_else(|| "no file URL returned".to_string())
            );
        };
        output.message(&format!("Uploaded {} to {}", name, url));
        UploadedImage::from_url(&name, url, mime_type, size)
    };

    let outcome = editor
        .update::<UploadedImageList, _>(move |images| images.0.push(image))
        .await;
    report_save(outcome, &format!("Registered {}", name), output)
}

pub async fn list<A: ContentApi>(editor: &ContentEditor<A>, output: &Output) -> Result<()> {
    let loaded = editor.current::<UploadedImageList>().await;
    output.print_images(&loaded);
    Ok(())
}

/// MIME type from the file extension
fn mime_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{editor, quiet};
    use folio_core::{ContentDocument, ContentKey};
    use std::path::PathBuf;

    #[test]
    fn test_mime_type_for() {
        assert_eq!(mime_type_for(Path::new("a/photo.PNG")), "image/png");
        assert_eq!(mime_type_for(Path::new("cv.jpeg")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("notes")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_inline_upload_registers_data_url() {
        let (editor, store) = editor();
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("logo.png");
        std::fs::write(&path, b"png bytes").unwrap();

        upload(&editor, &path, true, &quiet()).await.unwrap();

        let value = store.get(ContentKey::UploadedImages).unwrap().unwrap();
        let images = UploadedImageList::from_value(&value).unwrap();
        assert_eq!(images.0.len(), 1);
        assert_eq!(images.0[0].name, "logo.png");
        assert_eq!(images.0[0].size, 9);
        assert!(images.0[0].data.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_failed_upload_registers_nothing() {
        // The in-process transport has no upload endpoint
        let (editor, store) = editor();
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("logo.png");
        std::fs::write(&path, b"png bytes").unwrap();

        assert!(upload(&editor, &path, false, &quiet()).await.is_err());
        assert_eq!(store.get(ContentKey::UploadedImages).unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let (editor, _store) = editor();

        let result = upload(&editor, &PathBuf::from("/no/such/file.png"), true, &quiet()).await;
        assert!(result.is_err());
    }
}
