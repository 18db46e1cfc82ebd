//! GLB / glTF container parsing.

pub mod container;
pub mod writer;

pub use container::{BufferView, Container, Err};
pub use writer::write_glb;
