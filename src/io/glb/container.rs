use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use base64::Engine;
use gltf::json;

pub const GLB_HEADER_LENGTH: usize = 12;

#[derive(Debug, Clone, thiserror::Error)]
pub enum Err {
    #[error("Malformed container: {0}")]
    Malformed(String),
    #[error("Buffer view {view} (offset {offset}, length {length}) exceeds buffer {buffer} of {buffer_length} bytes")]
    TruncatedView {
        view: usize,
        buffer: usize,
        offset: usize,
        length: usize,
        buffer_length: usize,
    },
    #[error("Buffer {buffer} holds {actual} bytes but declares {declared}")]
    TruncatedBuffer {
        buffer: usize,
        declared: usize,
        actual: usize,
    },
    #[error("Buffer index out of range: the index {0} is greater than the number of buffers {1}")]
    BufferIndexOutOfRange(usize, usize),
    #[error("Buffer view index out of range: the index {0} is greater than the number of buffer views {1}")]
    ViewIndexOutOfRange(usize, usize),
    #[error("IO Error: {0}")]
    IoError(String),
}

/// A declared (buffer index, offset, length) reference into one of the
/// container's binary buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferView {
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_length: usize,
    pub byte_stride: Option<usize>,
}

impl BufferView {
    pub fn end(&self) -> usize {
        self.byte_offset + self.byte_length
    }
}

#[derive(Debug)]
enum BufferSource {
    // Range of the GLB BIN chunk inside `Container::bin`.
    Bin,
    DataUri(String),
    External(PathBuf),
}

#[derive(Debug)]
struct BufferSlot {
    declared_length: usize,
    source: BufferSource,
    // Filled on first access for sources that are not already in memory.
    resolved: OnceLock<Vec<u8>>,
}

/// Parsed glTF document plus delimited binary buffers of one container.
///
/// Parsing only delimits byte ranges: images and meshes stay encoded. Buffers
/// that live outside the GLB stream (data URIs, sidecar files) are resolved
/// lazily the first time they are requested, so metadata-only loads never
/// touch them unless a thumbnail actually refers into them.
#[derive(Debug)]
pub struct Container {
    document: json::Root,
    bin: Option<Vec<u8>>,
    buffers: Vec<BufferSlot>,
    views: Vec<BufferView>,
}

impl Container {
    /// Parses a binary GLB stream.
    ///
    /// `base_dir` is used to resolve buffers declared with a relative URI.
    pub fn from_glb_bytes(bytes: &[u8], base_dir: Option<&Path>) -> Result<Self, Err> {
        // Only the declared length is considered; trailing bytes are ignored.
        let stream = match declared_glb_length(bytes) {
            Some(length) if length < GLB_HEADER_LENGTH => {
                return Err(Err::Malformed(format!("declared length {} is shorter than the GLB header", length)));
            }
            Some(length) if length <= bytes.len() => &bytes[..length],
            _ => bytes,
        };

        let glb = gltf::Glb::from_slice(stream)
            .map_err(|e| Err::Malformed(format!("invalid GLB stream: {}", e)))?;
        let document = json::Root::from_slice(&glb.json)
            .map_err(|e| Err::Malformed(format!("failed to parse JSON chunk: {}", e)))?;

        Self::from_parts(document, glb.bin.map(|bin| bin.into_owned()), base_dir)
    }

    /// Parses a JSON text glTF file. The whole payload is the structured metadata.
    pub fn from_gltf_text(bytes: &[u8], base_dir: Option<&Path>) -> Result<Self, Err> {
        let document = json::Root::from_slice(bytes)
            .map_err(|e| Err::Malformed(format!("failed to parse glTF JSON: {}", e)))?;
        Self::from_parts(document, None, base_dir)
    }

    fn from_parts(document: json::Root, bin: Option<Vec<u8>>, base_dir: Option<&Path>) -> Result<Self, Err> {
        let buffers = Self::delimit_buffers(&document, bin.as_deref(), base_dir)?;
        let views = Self::delimit_views(&document, &buffers)?;

        Ok(Self { document, bin, buffers, views })
    }

    fn delimit_buffers(document: &json::Root, bin: Option<&[u8]>, base_dir: Option<&Path>) -> Result<Vec<BufferSlot>, Err> {
        let mut slots = Vec::with_capacity(document.buffers.len());
        for (index, buffer) in document.buffers.iter().enumerate() {
            let declared_length = buffer.byte_length.0 as usize;

            let source = match buffer.uri.as_deref() {
                Some(uri) if uri.starts_with("data:") => BufferSource::DataUri(uri.to_string()),
                Some(uri) => {
                    let base = base_dir.unwrap_or_else(|| Path::new("."));
                    BufferSource::External(base.join(uri))
                }
                None => {
                    // Only the first buffer may refer to the GLB BIN chunk.
                    let bin = match (index, bin) {
                        (0, Some(bin)) => bin,
                        _ => return Err(Err::Malformed(format!(
                            "buffer {} has no uri and no BIN chunk backs it", index
                        ))),
                    };
                    // The BIN chunk may carry up to 3 bytes of padding beyond byteLength.
                    if bin.len() < declared_length {
                        return Err(Err::TruncatedBuffer {
                            buffer: index,
                            declared: declared_length,
                            actual: bin.len(),
                        });
                    }
                    BufferSource::Bin
                }
            };

            slots.push(BufferSlot {
                declared_length,
                source,
                resolved: OnceLock::new(),
            });
        }
        Ok(slots)
    }

    fn delimit_views(document: &json::Root, buffers: &[BufferSlot]) -> Result<Vec<BufferView>, Err> {
        let mut views = Vec::with_capacity(document.buffer_views.len());
        for (index, view) in document.buffer_views.iter().enumerate() {
            let buffer = view.buffer.value();
            let byte_offset = view.byte_offset.map_or(0, |offset| offset.0 as usize);
            let byte_length = view.byte_length.0 as usize;
            let byte_stride = view.byte_stride.map(|stride| stride.0);

            let slot = buffers.get(buffer).ok_or_else(|| Err::Malformed(format!(
                "buffer view {} references buffer {} but only {} buffers are declared",
                index, buffer, buffers.len()
            )))?;

            let fits = byte_offset.checked_add(byte_length)
                .is_some_and(|end| end <= slot.declared_length);
            if !fits {
                return Err(Err::TruncatedView {
                    view: index,
                    buffer,
                    offset: byte_offset,
                    length: byte_length,
                    buffer_length: slot.declared_length,
                });
            }

            views.push(BufferView { buffer, byte_offset, byte_length, byte_stride });
        }
        Ok(views)
    }

    pub fn document(&self) -> &json::Root {
        &self.document
    }

    /// Returns the root-level extension block named `name`.
    pub fn root_extension(&self, name: &str) -> Option<&json::Value> {
        self.document.extensions.as_ref()?.others.get(name)
    }

    pub fn num_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn num_views(&self) -> usize {
        self.views.len()
    }

    /// Returns the buffer view declared at `index`.
    pub fn view(&self, index: usize) -> Option<&BufferView> {
        self.views.get(index)
    }

    /// Returns true if the buffer has already been brought into memory.
    pub fn is_buffer_resolved(&self, index: usize) -> bool {
        self.buffers.get(index).is_some_and(|slot| {
            matches!(slot.source, BufferSource::Bin) || slot.resolved.get().is_some()
        })
    }

    /// Returns the bytes of buffer `index`, trimmed to its declared length.
    pub fn buffer(&self, index: usize) -> Result<&[u8], Err> {
        let slot = self.buffers.get(index)
            .ok_or(Err::BufferIndexOutOfRange(index, self.buffers.len()))?;

        let data: &[u8] = match &slot.source {
            BufferSource::Bin => self.bin.as_deref().unwrap_or_default(),
            BufferSource::DataUri(uri) => {
                if slot.resolved.get().is_none() {
                    let decoded = decode_data_uri(uri).ok_or_else(|| Err::Malformed(format!(
                        "buffer {} has an undecodable data URI", index
                    )))?;
                    let _ = slot.resolved.set(decoded);
                }
                slot.resolved.get().map(Vec::as_slice).unwrap_or_default()
            }
            BufferSource::External(path) => {
                if slot.resolved.get().is_none() {
                    let loaded = std::fs::read(path).map_err(|e| Err::IoError(format!(
                        "failed to read buffer {} from {}: {}", index, path.display(), e
                    )))?;
                    let _ = slot.resolved.set(loaded);
                }
                slot.resolved.get().map(Vec::as_slice).unwrap_or_default()
            }
        };

        if data.len() < slot.declared_length {
            return Err(Err::TruncatedBuffer {
                buffer: index,
                declared: slot.declared_length,
                actual: data.len(),
            });
        }
        Ok(&data[..slot.declared_length])
    }

    /// Returns the bytes covered by buffer view `index`.
    pub fn view_bytes(&self, index: usize) -> Result<&[u8], Err> {
        let view = self.views.get(index)
            .ok_or(Err::ViewIndexOutOfRange(index, self.views.len()))?;
        let buffer = self.buffer(view.buffer)?;
        // The range was validated against the declared length at parse time and
        // `buffer` is exactly that long.
        Ok(&buffer[view.byte_offset..view.end()])
    }
}

/// Total length field of the GLB header, if the stream is long enough to hold one.
fn declared_glb_length(bytes: &[u8]) -> Option<usize> {
    let field = bytes.get(8..GLB_HEADER_LENGTH)?;
    Some(u32::from_le_bytes([field[0], field[1], field[2], field[3]]) as usize)
}

/// Decodes a base64 `data:` URI. Returns `None` for URIs that are not
/// base64-encoded data URIs or whose payload fails to decode.
pub fn decode_data_uri(uri: &str) -> Option<Vec<u8>> {
    let rest = uri.strip_prefix("data:")?;
    let comma_pos = rest.find(',')?;
    let (header, payload) = (&rest[..comma_pos], &rest[comma_pos + 1..]);
    if !header.ends_with(";base64") {
        return None;
    }
    base64::engine::general_purpose::STANDARD.decode(payload.trim()).ok()
}
