use std::path::Path;

use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Upper bound for product images, matching the storefront's 5MB upload cap.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_EXTENSIONS: [&str; 4] = ["jpeg", "jpg", "png", "gif"];

pub fn validate_image(filename: &str, data: &[u8]) -> AppResult<String> {
    if data.is_empty() {
        return Err(AppError::BadRequest("Empty image file".to_string()));
    }
    if data.len() > MAX_IMAGE_BYTES {
        return Err(AppError::BadRequest(
            "Image exceeds the 5MB size limit".to_string(),
        ));
    }

    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(AppError::BadRequest(
            "Only image files are allowed".to_string(),
        ));
    }

    Ok(ext)
}

/// Persist an uploaded image under the upload directory and return the
/// relative URL stored on the product row.
pub async fn save_image(upload_dir: &str, filename: &str, data: &[u8]) -> AppResult<String> {
    let ext = validate_image(filename, data)?;

    let stored_name = format!("image-{}.{}", Uuid::new_v4(), ext);
    let path = Path::new(upload_dir).join(&stored_name);
    tokio::fs::write(&path, data)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to store image: {e}")))?;

    Ok(format!("/uploads/{stored_name}"))
}

/// Best-effort removal of a previously stored image. Missing files are not an
/// error; anything else is logged and swallowed so product mutations never
/// fail on file cleanup.
pub async fn remove_image(upload_dir: &str, image_url: &str) {
    let Some(file_name) = Path::new(image_url).file_name() else {
        return;
    };
    let path = Path::new(upload_dir).join(file_name);
    if let Err(err) = tokio::fs::remove_file(&path).await {
        if err.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %err, "failed to remove image");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_allowed_extensions() {
        for name in ["shoe.jpg", "shoe.JPEG", "shoe.png", "shoe.gif"] {
            assert!(validate_image(name, b"binary").is_ok(), "{name}");
        }
    }

    #[test]
    fn rejects_other_extensions_and_empty_files() {
        assert!(validate_image("shoe.svg", b"binary").is_err());
        assert!(validate_image("noext", b"binary").is_err());
        assert!(validate_image("shoe.png", b"").is_err());
    }

    #[test]
    fn rejects_oversized_files() {
        let data = vec![0u8; MAX_IMAGE_BYTES + 1];
        assert!(validate_image("shoe.png", &data).is_err());
    }
}
