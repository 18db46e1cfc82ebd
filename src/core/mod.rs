pub mod cancel;

/// Owned scene graph and its builders.
pub mod scene;

pub mod texture;
