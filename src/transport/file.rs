use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::anyhow;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::fs::File;
use tracing::{debug, warn};
use url::Url;

use crate::transport::copy::copy;
use crate::transport::progress::CopyProgressListener;
use crate::transport::url_info::{charset_of, UrlInfo};
use crate::transport::TransportError;

fn to_path(url: &Url) -> anyhow::Result<PathBuf> {
    url.to_file_path()
        .map_err(|_| anyhow!(TransportError::InvalidUrl { url: url.to_string(), reason: "not a local file".to_string() }))
}

/// Metadata of a local file. Like any non-HTTP resource, an empty file counts as unavailable.
pub async fn url_info(url: &Url) -> UrlInfo {
    let path = match to_path(url) {
        Ok(path) => path,
        Err(e) => {
            debug!("{}", e);
            return UrlInfo::UNAVAILABLE;
        }
    };

    match tokio::fs::metadata(&path).await {
        Ok(metadata) if metadata.is_file() && metadata.len() > 0 => {
            let last_modified = metadata.modified().ok().map(DateTime::<Utc>::from);
            UrlInfo::available(metadata.len() as i64, last_modified, charset_of(None))
        }
        Ok(_) => UrlInfo::UNAVAILABLE,
        Err(e) => {
            debug!("no file at {}: {}", path.display(), e);
            UrlInfo::UNAVAILABLE
        }
    }
}

pub async fn read(url: &Url) -> anyhow::Result<Bytes> {
    let data = tokio::fs::read(to_path(url)?).await?;
    Ok(Bytes::from(data))
}

/// Copies a local file to `dest`, carrying over its modification time.
pub async fn download(url: &Url, dest: &Path, listener: Arc<dyn CopyProgressListener>) -> anyhow::Result<()> {
    let source_path = to_path(url)?;
    let mut source = File::open(&source_path).await?;
    let metadata = source.metadata().await?;

    let mut target = File::create(dest).await?;
    if let Err(e) = copy(&mut source, &mut target, None, listener.as_ref(), Some(metadata.len())).await {
        drop(target);
        remove_incomplete(dest).await;
        return Err(anyhow::Error::new(e).context(format!("copying {}", source_path.display())));
    }

    if let Ok(modified) = metadata.modified() {
        set_modified(target, modified).await?;
    }
    Ok(())
}

/// removes a partially written download, logging if that is not possible
pub(crate) async fn remove_incomplete(dest: &Path) {
    if let Err(e) = tokio::fs::remove_file(dest).await {
        warn!("could not remove incomplete download {}: {}", dest.display(), e);
    }
}

/// sets a file's modification time without blocking the runtime
pub(crate) async fn set_modified(file: File, modified: SystemTime) -> anyhow::Result<()> {
    let file = file.into_std().await;
    tokio::task::spawn_blocking(move || file.set_modified(modified))
        .await??;
    Ok(())
}

#[cfg(test)]
mod test {
    use crate::transport::progress::NopProgressListener;
    use super::*;

    #[tokio::test]
    async fn test_url_info() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.txt");
        std::fs::write(&file, "content").unwrap();
        let empty = dir.path().join("empty.txt");
        std::fs::write(&empty, "").unwrap();

        let info = url_info(&Url::from_file_path(&file).unwrap()).await;
        assert!(info.is_available());
        assert_eq!(info.content_length(), 7);
        assert_eq!(info.body_charset(), Some("ISO-8859-1"));
        assert!(info.last_modified().is_some());

        assert_eq!(url_info(&Url::from_file_path(&empty).unwrap()).await, UrlInfo::UNAVAILABLE);
        assert_eq!(url_info(&Url::from_file_path(dir.path().join("missing")).unwrap()).await, UrlInfo::UNAVAILABLE);
        assert_eq!(url_info(&Url::from_file_path(dir.path()).unwrap()).await, UrlInfo::UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_download_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.jar");
        std::fs::write(&source, "jar bytes").unwrap();
        let url = Url::from_file_path(&source).unwrap();

        let dest = dir.path().join("dest.jar");
        download(&url, &dest, Arc::new(NopProgressListener)).await.unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"jar bytes");
        assert_eq!(
            std::fs::metadata(&dest).unwrap().modified().unwrap(),
            std::fs::metadata(&source).unwrap().modified().unwrap(),
        );
        assert_eq!(read(&url).await.unwrap(), Bytes::from_static(b"jar bytes"));
    }

    #[tokio::test]
    async fn test_failed_download_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("not-a-file");
        std::fs::create_dir(&source).unwrap();
        let dest = dir.path().join("dest.jar");

        let result = download(&Url::from_file_path(&source).unwrap(), &dest, Arc::new(NopProgressListener)).await;
        assert!(result.is_err());
        assert!(!dest.exists());
    }
}
