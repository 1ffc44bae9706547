//! Message - payload broadcast to every target

use std::sync::Arc;

use image::DynamicImage;

/// Immutable broadcast payload
///
/// The meaning of each field is decided by the target: a log target prints the
/// body, a file target stores everything, a remote service may use the title
/// as a subject line. Images are decoded; encoding is the target's concern.
///
/// Images are shared, so cloning a message never copies pixel data.
#[derive(Debug, Clone, Default)]
pub struct Message {
    title: String,
    body: String,
    images: Arc<[DynamicImage]>,
}

impl Message {
    /// Create a message without images
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            images: Arc::default(),
        }
    }

    /// Attach images, replacing any already attached
    pub fn with_images(mut self, images: Vec<DynamicImage>) -> Self {
        self.images = images.into();
        self
    }

    /// Append one image
    pub fn with_image(mut self, image: DynamicImage) -> Self {
        let mut images = self.images.to_vec();
        images.push(image);
        self.images = images.into();
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn images(&self) -> &[DynamicImage] {
        &self.images
    }
}
