//! Image reference resolution and thumbnail decoding.

use tracing::warn;

use crate::core::texture::{ImageFormat, Thumbnail};
pub use crate::io::glb::container::decode_data_uri;
use crate::io::glb::Container;

#[derive(Debug, thiserror::Error)]
pub enum Err {
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error("Decode Error: {0}")]
    DecodeError(String),
}

/// Where the bytes of a glTF image live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// A self-contained `data:` URI.
    Inline(String),
    /// An index into the container's buffer views.
    BufferView(usize),
    /// A URI pointing outside the container. Never resolved.
    External(String),
}

/// Reads the image reference declared by `images[image_index]`.
/// Returns `None` for a dangling index or an image entry without a source.
pub fn image_ref(container: &Container, image_index: usize) -> Option<ImageRef> {
    let image = container.document().images.get(image_index)?;

    if let Some(uri) = image.uri.as_deref() {
        if uri.starts_with("data:") {
            return Some(ImageRef::Inline(uri.to_string()));
        }
        return Some(ImageRef::External(uri.to_string()));
    }

    image.buffer_view.map(|view| ImageRef::BufferView(view.value()))
}

/// Resolves an image reference into encoded image bytes.
///
/// External files are unsupported and yield `None`, as does any reference
/// that cannot be resolved. None of these cases abort the caller.
pub fn resolve_image_ref(container: &Container, image: &ImageRef) -> Option<Vec<u8>> {
    match image {
        ImageRef::Inline(uri) => {
            let bytes = decode_data_uri(uri);
            if bytes.is_none() {
                warn!("inline image is not a base64 data URI");
            }
            bytes
        }
        ImageRef::BufferView(view) => match container.view_bytes(*view) {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(e) => {
                warn!(view, error = %e, "image buffer view cannot be resolved");
                None
            }
        },
        ImageRef::External(uri) => {
            warn!(uri = %uri, "external image files are not supported");
            None
        }
    }
}

/// Decodes encoded image bytes into an RGBA8 thumbnail.
pub fn decode_thumbnail(bytes: Vec<u8>) -> Result<Thumbnail, Err> {
    if bytes.is_empty() {
        return Err(Err::InvalidFormat("image data is empty".to_string()));
    }
    let format = image_format_from_buffer(&bytes);
    let decoded = image::load_from_memory(&bytes)
        .map_err(|e| Err::DecodeError(format!("failed to decode {:?} image: {}", format, e)))?;
    Ok(Thumbnail::new(format, bytes, decoded.to_rgba8()))
}

/// Returns the image format of an encoded texture stored in buffer.
/// ImageFormat::None is returned for formats the thumbnail decoder does not read.
pub fn image_format_from_buffer(buffer: &[u8]) -> ImageFormat {
    match image::guess_format(buffer) {
        Ok(image::ImageFormat::Png) => ImageFormat::Png,
        Ok(image::ImageFormat::Jpeg) => ImageFormat::Jpeg,
        Ok(image::ImageFormat::WebP) => ImageFormat::Webp,
        _ => ImageFormat::None,
    }
}
