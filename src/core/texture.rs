use image::RgbaImage;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ImageFormat {
    None,
    Png,
    Jpeg,
    Webp,
}

/// A decoded model thumbnail.
///
/// Keeps the encoded source bytes alongside the RGBA8 bitmap so that callers
/// can cache or compare thumbnails without re-encoding.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Thumbnail {
    format: ImageFormat,
    encoded_data: Vec<u8>,
    bitmap: RgbaImage,
}

impl Thumbnail {
    pub(crate) fn new(format: ImageFormat, encoded_data: Vec<u8>, bitmap: RgbaImage) -> Self {
        Self { format, encoded_data, bitmap }
    }

    pub fn width(&self) -> u32 { self.bitmap.width() }
    pub fn height(&self) -> u32 { self.bitmap.height() }

    pub fn format(&self) -> ImageFormat { self.format }

    pub fn get_encoded_data(&self) -> &[u8] { &self.encoded_data }

    pub fn bitmap(&self) -> &RgbaImage { &self.bitmap }
}
