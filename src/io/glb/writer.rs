use std::borrow::Cow;

use gltf::binary::{Glb, Header};
use serde_json::Value;

use super::container::Err;

/// Writes a GLB container holding `json` and, if given, a BIN chunk.
///
/// Chunks are padded to 4-byte boundaries: the JSON chunk with spaces and
/// the BIN chunk with zeros. The caller is responsible for making
/// `buffers[0].byteLength` agree with `bin`.
pub fn write_glb(json: &Value, bin: Option<&[u8]>) -> Result<Vec<u8>, Err> {
    let json = serde_json::to_vec(json)
        .map_err(|e| Err::Malformed(format!("failed to serialize JSON chunk: {}", e)))?;
    let glb = Glb {
        // `to_writer` computes the total length itself.
        header: Header { magic: *b"glTF", version: 2, length: 0 },
        json: Cow::Owned(json),
        bin: bin.map(Cow::Borrowed),
    };

    let mut out = Vec::new();
    glb.to_writer(&mut out)
        .map_err(|e| Err::IoError(format!("failed to write GLB: {}", e)))?;
    Ok(out)
}
