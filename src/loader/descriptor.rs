use std::path::PathBuf;

use crate::core::scene::SceneNode;
use crate::core::texture::Thumbnail;
use crate::io::format::ModelFormat;
use crate::io::metadata::ModelMetadata;
use crate::io::vrm::SchemaVersion;

use super::Err;

/// A loaded model, owned by the caller once returned.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDescriptor {
    scene_root: SceneNode,
    display_name: Option<String>,
    thumbnail: Option<Thumbnail>,
    format: ModelFormat,
    schema: Option<SchemaVersion>,
}

impl ModelDescriptor {
    pub(crate) fn new(scene_root: SceneNode, format: ModelFormat, metadata: ModelMetadata) -> Self {
        Self {
            scene_root,
            display_name: metadata.title,
            thumbnail: metadata.thumbnail,
            format,
            schema: metadata.schema,
        }
    }

    pub fn get_scene_root(&self) -> &SceneNode {
        &self.scene_root
    }

    pub fn into_scene_root(self) -> SceneNode {
        self.scene_root
    }

    pub fn get_display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn get_thumbnail(&self) -> Option<&Thumbnail> {
        self.thumbnail.as_ref()
    }

    pub fn get_format(&self) -> ModelFormat {
        self.format
    }

    pub fn get_schema(&self) -> Option<SchemaVersion> {
        self.schema
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelOrigin {
    /// The model the caller asked for.
    Requested(PathBuf),
    /// The fallback model.
    Default,
}

#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub descriptor: ModelDescriptor,
    pub origin: ModelOrigin,
    /// Why the requested model was replaced by the fallback model.
    pub fallback_reason: Option<Err>,
}

impl LoadedModel {
    pub fn is_default(&self) -> bool {
        self.origin == ModelOrigin::Default
    }
}

/// One entry of a directory scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelListing {
    pub path: PathBuf,
    pub metadata: ModelMetadata,
}
