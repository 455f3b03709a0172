//! Artwork commissioning: the boundary to the external image generator.
//!
//! Only the contract lives here: the request and result types, the
//! generator trait, and the in-memory gallery the shell appends to.
//! Nothing is persisted.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::GenerationError;

/// What to paint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRequest {
    pub subject: String,
    pub palette_description: String,
}

/// A finished image, inline as a data URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    pub image_data_url: String,
    pub mime_type: String,
}

impl GeneratedImage {
    /// Wrap raw image bytes as a `data:<mime>;base64,...` URL.
    pub fn from_inline_data(mime_type: &str, bytes: &[u8]) -> Result<Self, GenerationError> {
        if bytes.is_empty() {
            return Err(GenerationError::NoImageInResponse);
        }
        Ok(GeneratedImage {
            image_data_url: format!("data:{mime_type};base64,{}", STANDARD.encode(bytes)),
            mime_type: mime_type.to_string(),
        })
    }
}

/// An external service that turns a request into an image.
pub trait ImageGenerator {
    fn generate(&self, request: &ImageRequest) -> Result<GeneratedImage, GenerationError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artwork {
    pub id: u64,
    pub request: ImageRequest,
    pub image: GeneratedImage,
}

/// The session's collection, newest last.
#[derive(Debug, Default, Serialize)]
pub struct Gallery {
    artworks: Vec<Artwork>,
    #[serde(skip)]
    next_id: u64,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask `generator` for a piece and hang it on success. On failure the
    /// collection is left untouched and the error is handed back.
    pub fn commission<G: ImageGenerator + ?Sized>(
        &mut self,
        generator: &G,
        request: ImageRequest,
    ) -> Result<&Artwork, GenerationError> {
        let image = generator
            .generate(&request)
            .inspect_err(|e| warn!(subject = %request.subject, "commission failed: {e}"))?;

        let id = self.next_id;
        self.next_id += 1;
        info!(id, subject = %request.subject, "artwork commissioned");
        self.artworks.push(Artwork { id, request, image });
        Ok(&self.artworks[self.artworks.len() - 1])
    }

    pub fn artworks(&self) -> &[Artwork] {
        &self.artworks
    }

    pub fn len(&self) -> usize {
        self.artworks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artworks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Easel;

    impl ImageGenerator for Easel {
        fn generate(&self, request: &ImageRequest) -> Result<GeneratedImage, GenerationError> {
            GeneratedImage::from_inline_data("image/png", request.subject.as_bytes())
        }
    }

    struct NoKey;

    impl ImageGenerator for NoKey {
        fn generate(&self, _: &ImageRequest) -> Result<GeneratedImage, GenerationError> {
            Err(GenerationError::MissingCredential)
        }
    }

    fn request(subject: &str) -> ImageRequest {
        ImageRequest {
            subject: subject.to_string(),
            palette_description: "muted ochre and teal".to_string(),
        }
    }

    #[test]
    fn data_url_is_base64() {
        let img = GeneratedImage::from_inline_data("image/png", b"hi").unwrap();
        assert_eq!(img.image_data_url, "data:image/png;base64,aGk=");
        assert_eq!(img.mime_type, "image/png");
    }

    #[test]
    fn empty_payload_is_no_image() {
        assert_eq!(
            GeneratedImage::from_inline_data("image/png", b""),
            Err(GenerationError::NoImageInResponse)
        );
    }

    #[test]
    fn commission_appends_in_order() {
        let mut gallery = Gallery::new();
        gallery.commission(&Easel, request("harbour at dusk")).unwrap();
        let second = gallery.commission(&Easel, request("orchard")).unwrap();
        assert_eq!(second.id, 1);
        assert_eq!(gallery.len(), 2);
        assert_eq!(gallery.artworks()[0].request.subject, "harbour at dusk");
    }

    #[test]
    fn failed_commission_leaves_gallery_unchanged() {
        let mut gallery = Gallery::new();
        let err = gallery.commission(&NoKey, request("still life")).unwrap_err();
        assert_eq!(err, GenerationError::MissingCredential);
        assert!(gallery.is_empty());
    }

    #[test]
    fn request_uses_camel_case() {
        let json = serde_json::to_value(request("x")).unwrap();
        assert_eq!(json["paletteDescription"], "muted ochre and teal");
    }
}
