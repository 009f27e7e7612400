use std::fmt;
use std::sync::Arc;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Shared handle to a decoded image.
///
/// Cloning a handle never copies pixels: history snapshots, style transfers
/// and migrated screenshots all point at the same decoded buffer. Two handles
/// compare equal only when they refer to the same allocation.
#[derive(Clone)]
pub struct ImageHandle(Arc<DynamicImage>);

impl ImageHandle {
    pub fn new(image: DynamicImage) -> Self {
        Self(Arc::new(image))
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    /// Width divided by height, 0.0 for degenerate images.
    pub fn aspect_ratio(&self) -> f32 {
        if self.height() == 0 {
            return 0.0;
        }
        self.width() as f32 / self.height() as f32
    }

    pub fn image(&self) -> &DynamicImage {
        &self.0
    }

    pub fn same_image(&self, other: &ImageHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for ImageHandle {
    fn eq(&self, other: &Self) -> bool {
        self.same_image(other)
    }
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageHandle({}x{})", self.width(), self.height())
    }
}

/// Persisted source of an image, usually a `data:` URI holding the whole
/// encoded file. Clones share one allocation.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageSource(Arc<str>);

impl ImageSource {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn shares_allocation(&self, other: &ImageSource) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<String> for ImageSource {
    fn from(src: String) -> Self {
        Self(Arc::from(src))
    }
}

impl From<&str> for ImageSource {
    fn from(src: &str) -> Self {
        Self(Arc::from(src))
    }
}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head: String = self.0.chars().take(32).collect();
        if head.len() < self.0.len() {
            write!(f, "ImageSource({:?}... {} bytes)", head, self.0.len())
        } else {
            write!(f, "ImageSource({:?})", head)
        }
    }
}

/// One language variant of a screenshot image.
///
/// `src` is the persisted source reference (a `data:` URI of the uploaded
/// bytes); `image` is the decoded handle and is never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalizedImage {
    #[serde(skip)]
    pub image: Option<ImageHandle>,
    #[serde(default)]
    pub src: ImageSource,
    #[serde(default)]
    pub name: String,
}

impl LocalizedImage {
    pub fn new(image: ImageHandle, src: ImageSource, name: String) -> Self {
        Self {
            image: Some(image),
            src,
            name,
        }
    }

    /// An entry restored from disk whose image has not been decoded yet.
    pub fn pending(src: ImageSource, name: String) -> Self {
        Self {
            image: None,
            src,
            name,
        }
    }

    pub fn is_decoded(&self) -> bool {
        self.image.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn handle(w: u32, h: u32) -> ImageHandle {
        ImageHandle::new(DynamicImage::ImageRgba8(RgbaImage::new(w, h)))
    }

    #[test]
    fn test_clone_shares_pixels() {
        let a = handle(4, 8);
        let b = a.clone();
        assert!(a.same_image(&b));
        assert_eq!(a, b);
    }

    #[test]
    fn test_equal_pixels_are_not_same_handle() {
        let a = handle(4, 8);
        let b = handle(4, 8);
        assert_ne!(a, b);
    }

    #[test]
    fn test_aspect_ratio() {
        assert_eq!(handle(100, 200).aspect_ratio(), 0.5);
        assert_eq!(handle(0, 0).aspect_ratio(), 0.0);
    }

    #[test]
    fn test_localized_image_skips_handle_when_serialized() {
        let entry = LocalizedImage::new(handle(2, 2), "data:image/png;base64,AA==".into(), "a_en.png".into());
        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("image\""));
        let loaded: LocalizedImage = serde_json::from_str(&json).unwrap();
        assert!(!loaded.is_decoded());
        assert_eq!(loaded.name, "a_en.png");
        assert_eq!(loaded.src, entry.src);
    }

    #[test]
    fn test_cloned_entry_shares_source() {
        let entry = LocalizedImage::pending("data:image/png;base64,AAAA".into(), "a.png".into());
        let copy = entry.clone();
        assert!(copy.src.shares_allocation(&entry.src));
        let reparsed: LocalizedImage = serde_json::from_str(&serde_json::to_string(&entry).unwrap()).unwrap();
        assert_eq!(reparsed.src, entry.src);
        assert!(!reparsed.src.shares_allocation(&entry.src));
    }
}
