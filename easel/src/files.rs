//! Images from the local filesystem.

use easel_core::pipeline::{ImageLoader, LoadError, LoadedImage};

/// Resolves image sources as paths relative to a base directory. `file://` prefixes are
/// accepted, remote URLs are not.
pub struct FileImageLoader {
    base: std::path::PathBuf,
}
impl FileImageLoader {
    #[must_use]
    pub fn new(base: impl Into<std::path::PathBuf>) -> Self {
        Self { base: base.into() }
    }
    fn resolve(&self, src: &str) -> Option<std::path::PathBuf> {
        let path = src.strip_prefix("file://").unwrap_or(src);
        if path.contains("://") || path.starts_with("//") {
            return None;
        }
        Some(self.base.join(path))
    }
}
#[async_trait::async_trait]
impl ImageLoader for FileImageLoader {
    async fn load(&self, src: &str) -> Result<LoadedImage, LoadError> {
        let path = self
            .resolve(src)
            .ok_or_else(|| LoadError::NotFound(src.to_owned()))?;
        let io_error = |source| LoadError::Io {
            src: src.to_owned(),
            source,
        };
        let bytes = tokio::task::spawn_blocking(move || std::fs::read(path))
            .await
            .map_err(|e| io_error(std::io::Error::other(e)))?
            .map_err(io_error)?;
        LoadedImage::decode(&bytes).map_err(|source| LoadError::Decode {
            src: src.to_owned(),
            source,
        })
    }
}

#[cfg(test)]
mod test {
    use super::FileImageLoader;
    use easel_core::pipeline::{ImageLoader, LoadError};

    #[test]
    fn remote_sources_are_not_resolved() {
        let loader = FileImageLoader::new("/tmp/assets");
        assert_eq!(
            loader.resolve("file://logo.png"),
            Some("/tmp/assets/logo.png".into())
        );
        assert_eq!(loader.resolve("https://example.com/logo.png"), None);
        assert_eq!(loader.resolve("//s3.amazonaws.com/logo.png"), None);
    }
    #[tokio::test]
    async fn missing_files_are_io_errors() {
        let loader = FileImageLoader::new(std::env::temp_dir());
        let result = loader.load("easel-definitely-missing.png").await;
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }
}
