use std::path::PathBuf;

use anyhow::Result;
use tokio::fs;
use tracing::info;

/// Disk-backed object store for uploaded media.
///
/// Each object is a flat file at `{dir}/{object_name}`; `put` returns the
/// public URL the object is retrievable from. Callers of the message API
/// treat those URLs as opaque strings.
pub struct BlobStore {
    dir: PathBuf,
    public_base: String,
}

impl BlobStore {
    pub async fn new(dir: PathBuf, public_base: &str) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Media storage directory: {}", dir.display());
        Ok(Self {
            dir,
            public_base: public_base.trim_end_matches('/').to_string(),
        })
    }

    /// Store an object and return its retrievable URL.
    pub async fn put(&self, object_name: &str, data: &[u8]) -> Result<String> {
        let path = self.dir.join(object_name);
        fs::write(&path, data).await?;
        Ok(format!("{}/media/{}", self.public_base, object_name))
    }

    pub async fn get(&self, object_name: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.dir.join(object_name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// MIME type from the object's file extension.
pub fn content_type(object_name: &str) -> &'static str {
    let ext = std::path::Path::new(object_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::content_type;

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type("a.jpg"), "image/jpeg");
        assert_eq!(content_type("a.jpeg"), "image/jpeg");
        assert_eq!(content_type("a.png"), "image/png");
        assert_eq!(content_type("a.mp4"), "video/mp4");
        assert_eq!(content_type("noext"), "application/octet-stream");
        assert_eq!(content_type("weird.xyz"), "application/octet-stream");
    }
}
