/// Maps file extensions to the supported model formats.
pub mod format;

/// GLB and glTF container parsing and writing.
pub mod glb;

/// VRM schema resolution and legacy migration.
pub mod vrm;

pub mod texture_io;

/// Title and thumbnail extraction.
pub mod metadata;

/// Plain-text BVH skeleton/motion parser.
pub mod bvh;
