//! Display metadata of a resolved container: a title and an optional thumbnail.

use tracing::{debug, warn};

use crate::core::texture::Thumbnail;
use crate::io::glb::Container;
use crate::io::texture_io::{decode_thumbnail, image_ref, resolve_image_ref, ImageRef};
use crate::io::vrm::{ResolvedSchema, SchemaVersion};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelMetadata {
    pub title: Option<String>,
    pub thumbnail: Option<Thumbnail>,
    pub schema: Option<SchemaVersion>,
}

impl ModelMetadata {
    pub fn get_title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn get_thumbnail(&self) -> Option<&Thumbnail> {
        self.thumbnail.as_ref()
    }

    pub fn has_thumbnail(&self) -> bool {
        self.thumbnail.is_some()
    }
}

/// Resolves the title and thumbnail of `container`.
///
/// Buffers are only touched when a thumbnail reference points into one.
/// Every thumbnail problem, from a dangling index to undecodable bytes,
/// degrades to `thumbnail: None`.
pub fn extract_metadata(container: &Container, schema: &ResolvedSchema) -> ModelMetadata {
    let title = resolve_title(schema);
    let thumbnail = thumbnail_image_index(container, schema)
        .and_then(|index| {
            let image = image_ref(container, index);
            if image.is_none() {
                warn!(image = index, "thumbnail image index does not resolve to an image");
            }
            image
        })
        .and_then(|image| load_thumbnail(container, &image));

    debug!(
        title = ?title,
        thumbnail = thumbnail.is_some(),
        "extracted model metadata"
    );

    ModelMetadata {
        title,
        thumbnail,
        schema: schema.version(),
    }
}

fn resolve_title(schema: &ResolvedSchema) -> Option<String> {
    let current = schema.normalized()
        .map(|vrm| vrm.meta.name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string);
    current.or_else(|| schema.legacy_original().and_then(|snapshot| snapshot.title.clone()))
}

/// Index into `images` of the declared thumbnail, if any.
fn thumbnail_image_index(container: &Container, schema: &ResolvedSchema) -> Option<usize> {
    match schema.version()? {
        SchemaVersion::Current => schema.normalized()?.meta.thumbnail_image,
        SchemaVersion::Legacy => {
            let texture = schema.legacy_original()?.thumbnail_texture?;
            legacy_thumbnail_image(container, texture)
        }
    }
}

/// Legacy exporters wrote either a texture index or an image index into
/// `meta.texture`. A texture whose source resolves wins, otherwise the index
/// is tried against `images` directly.
fn legacy_thumbnail_image(container: &Container, texture: usize) -> Option<usize> {
    let images = &container.document().images;
    let source = container.document().textures.get(texture)
        .map(|texture| texture.source.value())
        .filter(|source| *source < images.len());
    if source.is_some() {
        return source;
    }
    if texture < images.len() {
        debug!(texture, "legacy thumbnail texture does not resolve, using it as an image index");
        return Some(texture);
    }
    warn!(texture, "legacy thumbnail texture has no image source");
    None
}

fn load_thumbnail(container: &Container, image: &ImageRef) -> Option<Thumbnail> {
    let bytes = resolve_image_ref(container, image)?;
    match decode_thumbnail(bytes) {
        Ok(thumbnail) => Some(thumbnail),
        Err(e) => {
            warn!(error = %e, "thumbnail could not be decoded, continuing without it");
            None
        }
    }
}
