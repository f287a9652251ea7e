//! Byte-level helpers for extractor output and image files.

use std::borrow::Cow;

/// Decode extractor output to a string.
///
/// UTF-8 is tried first (a byte order mark is honoured and stripped by
/// encoding_rs). Output that is not valid UTF-8 is decoded as Windows-1252,
/// which is what older PDF tool chains emit and which accepts every byte.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let (text, _, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return text;
    }
    let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    text
}

/// Image formats that can be embedded in the generated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
    Svg,
}

impl ImageFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Svg => "image/svg+xml",
        }
    }

    fn from_extension(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "gif" => Some(ImageFormat::Gif),
            "webp" => Some(ImageFormat::WebP),
            "svg" => Some(ImageFormat::Svg),
            _ => None,
        }
    }

    fn from_magic(data: &[u8]) -> Option<Self> {
        match data {
            [0xFF, 0xD8, ..] => Some(ImageFormat::Jpeg),
            [0x89, b'P', b'N', b'G', ..] => Some(ImageFormat::Png),
            [b'G', b'I', b'F', ..] => Some(ImageFormat::Gif),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(ImageFormat::WebP),
            _ => None,
        }
    }
}

/// Detect an image format from the file name, falling back to magic bytes.
pub fn detect_image_format(name: &str, data: &[u8]) -> Option<ImageFormat> {
    ImageFormat::from_extension(name).or_else(|| ImageFormat::from_magic(data))
}

/// MIME type of an image file, `None` for anything that is not an image.
pub fn detect_mime_type(name: &str, data: &[u8]) -> Option<&'static str> {
    detect_image_format(name, data).map(ImageFormat::mime_type)
}

/// Pixel dimensions read from PNG, GIF or JPEG headers.
pub fn extract_image_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    match ImageFormat::from_magic(data)? {
        ImageFormat::Png if data.len() >= 24 => {
            // IHDR is always the first chunk.
            let width = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
            let height = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
            Some((width, height))
        }
        ImageFormat::Gif if data.len() >= 10 => {
            let width = u16::from_le_bytes([data[6], data[7]]) as u32;
            let height = u16::from_le_bytes([data[8], data[9]]) as u32;
            Some((width, height))
        }
        ImageFormat::Jpeg => jpeg_dimensions(data),
        _ => None,
    }
}

/// Walk JPEG segments to the first start-of-frame marker.
fn jpeg_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    let mut i = 2;
    while i + 8 < data.len() {
        if data[i] != 0xFF {
            i += 1;
            continue;
        }
        let marker = data[i + 1];
        let is_frame = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_frame {
            let height = u16::from_be_bytes([data[i + 5], data[i + 6]]) as u32;
            let width = u16::from_be_bytes([data[i + 7], data[i + 8]]) as u32;
            return Some((width, height));
        }
        let length = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        i += 2 + length;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        data.extend_from_slice(&13u32.to_be_bytes());
        data.extend_from_slice(b"IHDR");
        data.extend_from_slice(&width.to_be_bytes());
        data.extend_from_slice(&height.to_be_bytes());
        data.extend_from_slice(&[8, 6, 0, 0, 0]);
        data
    }

    #[test]
    fn decodes_utf8_and_windows_1252() {
        assert_eq!(decode_text("Résumé".as_bytes()), "Résumé");
        assert_eq!(decode_text(b"\xEF\xBB\xBFText"), "Text");
        // 0x93/0x94 are curly quotes in Windows-1252.
        assert_eq!(decode_text(b"\x93quoted\x94"), "\u{201C}quoted\u{201D}");
    }

    #[test]
    fn format_detection() {
        assert_eq!(detect_mime_type("fig.JPG", &[]), Some("image/jpeg"));
        assert_eq!(detect_mime_type("plot.svg", &[]), Some("image/svg+xml"));
        assert_eq!(detect_mime_type("blob", &png(1, 1)), Some("image/png"));
        assert_eq!(detect_mime_type("notes.txt", b"hello"), None);
        assert_eq!(detect_image_format("x", b"GIF89a"), Some(ImageFormat::Gif));
    }

    #[test]
    fn png_dimensions() {
        assert_eq!(extract_image_dimensions(&png(640, 480)), Some((640, 480)));
    }

    #[test]
    fn gif_dimensions() {
        let gif = [b'G', b'I', b'F', b'8', b'9', b'a', 0x20, 0x01, 0x10, 0x00];
        assert_eq!(extract_image_dimensions(&gif), Some((288, 16)));
    }

    #[test]
    fn jpeg_dimensions_skip_app_segments() {
        let mut jpeg = vec![0xFF, 0xD8];
        // APP0 segment of length 4 (2 length bytes + 2 payload bytes).
        jpeg.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00]);
        // SOF0: length, precision, height 100, width 200.
        jpeg.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08, 0x00, 0x64, 0x00, 0xC8, 0x03]);
        assert_eq!(extract_image_dimensions(&jpeg), Some((200, 100)));
    }

    #[test]
    fn truncated_headers() {
        assert_eq!(extract_image_dimensions(&[0x89, b'P', b'N', b'G']), None);
        assert_eq!(extract_image_dimensions(b"plain"), None);
    }
}
