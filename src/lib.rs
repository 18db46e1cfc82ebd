// lib.rs

/// Contains the parsers for model containers, VRM schemas, thumbnails, and
/// BVH skeletons.
pub mod io;

/// Contains the owned scene graph, thumbnails, and cancellation.
pub mod core;

/// Orchestrates format resolution, parsing, and scene building with a
/// fallback to the bundled default model.
pub mod loader;


/// Contains the most commonly used traits, types, and objects.
pub mod prelude {
    pub use crate::core::cancel::CancelToken;
    pub use crate::core::scene::{SceneNode, TrsMatrix};
    pub use crate::core::texture::{ImageFormat, Thumbnail};
    pub use crate::io::format::{resolve_format, ContainerKind, ModelFormat};
    pub use crate::io::glb::{write_glb, Container};
    pub use crate::io::metadata::{extract_metadata, ModelMetadata};
    pub use crate::io::vrm::{resolve_schema, ResolvedSchema, SchemaVersion};
    pub use crate::loader::{
        LoadStage,
        LoadedModel,
        LoaderConfig,
        ModelDescriptor,
        ModelListing,
        ModelLoader,
        ModelOrigin,
    };
}
