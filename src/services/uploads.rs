use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::config::UploadConfig;
use crate::error::ApiError;

pub const VIDEO_SUBDIR: &str = "videos";

#[derive(Debug, Serialize)]
pub struct StoredUpload {
    pub url: String,
}

/// File extension for an accepted video content type, `None` otherwise
pub fn video_extension(content_type: &str, file_name: Option<&str>) -> Option<String> {
    let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    let sub = essence.strip_prefix("video/")?;
    let known = match sub {
        "mp4" => Some("mp4"),
        "webm" => Some("webm"),
        "quicktime" => Some("mov"),
        "x-matroska" => Some("mkv"),
        "ogg" => Some("ogv"),
        _ => None,
    };
    if let Some(ext) = known {
        return Some(ext.to_string());
    }

    let from_name = file_name
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase);
    Some(from_name.unwrap_or_else(|| "bin".to_string()))
}

/// Content-addressed name, so re-uploads of the same recording share a file
pub fn content_file_name(bytes: &[u8], extension: &str) -> String {
    let digest = Sha256::digest(bytes);
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    format!("{}.{}", hex, extension)
}

pub async fn store_video(
    uploads: &UploadConfig,
    public_base_url: &str,
    content_type: Option<&str>,
    file_name: Option<&str>,
    bytes: &[u8],
) -> Result<StoredUpload, ApiError> {
    if bytes.is_empty() {
        return Err(ApiError::bad_request("No file uploaded"));
    }
    if bytes.len() > uploads.max_video_bytes {
        return Err(ApiError::payload_too_large(format!(
            "Video exceeds the {} MB limit",
            uploads.max_video_bytes / (1024 * 1024)
        )));
    }
    let extension = content_type
        .and_then(|ct| video_extension(ct, file_name))
        .ok_or_else(|| ApiError::bad_request("Only video files are allowed"))?;

    let name = content_file_name(bytes, &extension);
    let dir = PathBuf::from(&uploads.dir).join(VIDEO_SUBDIR);
    let write = async {
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&name), bytes).await
    };
    if let Err(e) = write.await {
        tracing::error!("Failed to store upload {}: {}", name, e);
        return Err(ApiError::internal_server_error("Failed to store upload"));
    }

    tracing::info!("Stored video upload {} ({} bytes)", name, bytes.len());
    Ok(StoredUpload {
        url: format!("{}/uploads/{}/{}", public_base_url.trim_end_matches('/'), VIDEO_SUBDIR, name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_video_types() {
        assert_eq!(video_extension("video/webm;codecs=vp9", None).as_deref(), Some("webm"));
        assert_eq!(video_extension("video/quicktime", Some("clip.MOV")).as_deref(), Some("mov"));
        assert_eq!(video_extension("video/x-flv", Some("clip.flv")).as_deref(), Some("flv"));
        assert_eq!(video_extension("video/x-flv", Some("../../etc")).as_deref(), Some("bin"));
        assert_eq!(video_extension("image/png", Some("a.png")), None);
    }

    #[test]
    fn names_are_content_addressed() {
        let a = content_file_name(b"frame", "mp4");
        assert_eq!(a, content_file_name(b"frame", "mp4"));
        assert_ne!(a, content_file_name(b"other", "mp4"));
        assert!(a.ends_with(".mp4"));
        assert_eq!(a.len(), 64 + 4);
    }

    #[tokio::test]
    async fn rejects_oversized_and_non_video() {
        let dir = std::env::temp_dir().join(format!("smartrecruit-upload-{}", uuid::Uuid::new_v4()));
        let config = UploadConfig { dir: dir.to_string_lossy().into_owned(), max_video_bytes: 4 };

        let err = store_video(&config, "http://x", Some("video/mp4"), None, b"12345").await.unwrap_err();
        assert_eq!(err.status_code(), 413);

        let err = store_video(&config, "http://x", Some("text/plain"), None, b"12").await.unwrap_err();
        assert_eq!(err.message(), "Only video files are allowed");

        let stored = store_video(&config, "http://x/", Some("video/mp4"), None, b"1234").await.unwrap();
        assert!(stored.url.starts_with("http://x/uploads/videos/"));
        let _ = std::fs::remove_dir_all(dir);
    }
}
