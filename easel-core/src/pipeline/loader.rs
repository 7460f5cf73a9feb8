//! # Image loading
//!
//! Template stages that swap pictures in need the natural size of the new image, and the logo
//! backdrop needs its pixels. Where those come from (network, disk, a cache) is up to the host.

use crate::color::Color;

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("no image at {0}")]
    NotFound(String),
    #[error("failed to read {src}: {source}")]
    Io {
        src: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {src}: {source}")]
    Decode {
        src: String,
        #[source]
        source: image::ImageError,
    },
}

/// A loaded picture. Loaders that can only report dimensions leave `pixels` empty.
#[derive(Clone, Debug)]
pub struct LoadedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Option<image::RgbaImage>,
}
impl LoadedImage {
    #[must_use]
    pub fn sized(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: None,
        }
    }
    #[must_use]
    pub fn from_pixels(pixels: image::RgbaImage) -> Self {
        let (width, height) = pixels.dimensions();
        Self {
            width,
            height,
            pixels: Some(pixels),
        }
    }
    /// Decode any format the `image` crate was built with.
    pub fn decode(bytes: &[u8]) -> Result<Self, image::ImageError> {
        Ok(Self::from_pixels(image::load_from_memory(bytes)?.to_rgba8()))
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
    /// The top-left pixel, if pixels are available.
    #[must_use]
    pub fn top_left(&self) -> Option<Color> {
        let pixels = self.pixels.as_ref()?;
        if pixels.width() == 0 || pixels.height() == 0 {
            return None;
        }
        Some((*pixels.get_pixel(0, 0)).into())
    }
}

#[async_trait::async_trait]
pub trait ImageLoader: Send + Sync {
    async fn load(&self, src: &str) -> Result<LoadedImage, LoadError>;
}

/// Serves images registered up front, keyed by source.
#[derive(Default)]
pub struct MemoryImageLoader {
    images: hashbrown::HashMap<String, LoadedImage>,
}
impl MemoryImageLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    #[must_use]
    pub fn with(mut self, src: impl Into<String>, image: LoadedImage) -> Self {
        self.insert(src, image);
        self
    }
    pub fn insert(&mut self, src: impl Into<String>, image: LoadedImage) {
        self.images.insert(src.into(), image);
    }
}
#[async_trait::async_trait]
impl ImageLoader for MemoryImageLoader {
    async fn load(&self, src: &str) -> Result<LoadedImage, LoadError> {
        self.images
            .get(src)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(src.to_owned()))
    }
}

#[cfg(test)]
mod test {
    use super::{ImageLoader, LoadedImage, MemoryImageLoader};
    use crate::color::Color;

    #[tokio::test]
    async fn serves_registered_images() {
        let pixels = image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]));
        let loader = MemoryImageLoader::new().with("a.png", LoadedImage::from_pixels(pixels));
        let image = loader.load("a.png").await.unwrap();
        assert_eq!((image.width, image.height), (3, 2));
        assert_eq!(image.top_left(), Some(Color::rgb(10, 20, 30)));
        assert!(loader.load("b.png").await.is_err());
        assert_eq!(LoadedImage::sized(4, 4).top_left(), None);
    }
}
