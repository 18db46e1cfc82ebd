#![allow(dead_code)]

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use base64::Engine;
use mascot_loader::prelude::*;
use serde_json::{json, Value};

/// 2x2 opaque red PNG.
pub const RED_2X2_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAIAAAACCAYAAABytg0kAAAAEUlEQVR4nGP4z8DwH4QZYAwAR8oH+WdZbrcAAAAASUVORK5CYII=";

pub fn red_png() -> Vec<u8> {
    base64::engine::general_purpose::STANDARD
        .decode(RED_2X2_PNG_BASE64)
        .unwrap()
}

fn skeleton() -> Value {
    json!([
        { "name": "Hips", "children": [1] },
        { "name": "Head", "translation": [0.0, 0.5, 0.0] },
    ])
}

/// VRM 1.0 container whose thumbnail lives in a buffer view.
pub fn current_vrm(name: &str) -> Vec<u8> {
    let png = red_png();
    write_glb(
        &json!({
            "asset": { "version": "2.0" },
            "scenes": [{ "nodes": [0] }],
            "nodes": skeleton(),
            "buffers": [{ "byteLength": png.len() }],
            "bufferViews": [{ "buffer": 0, "byteLength": png.len() }],
            "images": [{ "bufferView": 0, "mimeType": "image/png" }],
            "extensions": {
                "VRMC_vrm": { "specVersion": "1.0", "meta": { "name": name, "thumbnailImage": 0 } }
            },
        }),
        Some(&png),
    ).unwrap()
}

/// VRM 0.x container whose thumbnail texture points at `image`.
pub fn legacy_vrm(title: &str, image: Value) -> Vec<u8> {
    write_glb(
        &json!({
            "asset": { "version": "2.0" },
            "scenes": [{ "nodes": [0] }],
            "nodes": skeleton(),
            "images": [image],
            "textures": [{ "source": 0 }],
            "extensions": {
                "VRM": {
                    "exporterVersion": "UniVRM-0.99",
                    "meta": { "title": title, "author": "someone", "texture": 0 },
                    "humanoid": { "humanBones": [{ "bone": "hips", "node": 0 }, { "bone": "head", "node": 1 }] }
                }
            },
        }),
        None,
    ).unwrap()
}

pub fn inline_png_image() -> Value {
    json!({ "uri": format!("data:image/png;base64,{}", RED_2X2_PNG_BASE64) })
}

/// Container whose only buffer view runs past the end of its buffer.
pub fn truncated_glb() -> Vec<u8> {
    write_glb(
        &json!({
            "asset": { "version": "2.0" },
            "buffers": [{ "byteLength": 8 }],
            "bufferViews": [{ "buffer": 0, "byteOffset": 4, "byteLength": 8 }],
            "extensions": {
                "VRMC_vrm": { "specVersion": "1.0", "meta": { "name": "Broken" } }
            },
        }),
        Some(&[0u8; 8]),
    ).unwrap()
}

pub fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, bytes).unwrap();
    path
}

/// In-memory log sink for a `tracing_subscriber::fmt` subscriber.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
