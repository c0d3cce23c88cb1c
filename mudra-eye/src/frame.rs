//! Frame sources and still-frame extraction

use crate::error::GestureError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::DynamicImage;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

const DATA_URL_IMAGE_PREFIX: &str = "data:image";

/// A device or widget that can hand out the current frame as an encoded data URL
pub trait FrameCapture: Send + Sync {
    fn capture(&self) -> Option<String>;
}

/// A live video feed whose current frame can be read directly
pub trait VideoHandle: Send + Sync {
    fn current_frame(&self) -> Option<DynamicImage>;
}

/// Where a recognition call gets its frame from
#[derive(Clone)]
pub enum FrameSource {
    /// An inline `data:image/...;base64,` URL
    DataUrl(String),
    /// A live video feed
    Video(Arc<dyn VideoHandle>),
    /// A capture wrapper producing data URLs on demand
    Capturable(Arc<dyn FrameCapture>),
}

impl fmt::Debug for FrameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameSource::DataUrl(url) => f
                .debug_tuple("DataUrl")
                .field(&format_args!("{} bytes", url.len()))
                .finish(),
            FrameSource::Video(_) => f.write_str("Video"),
            FrameSource::Capturable(_) => f.write_str("Capturable"),
        }
    }
}

/// One still frame ready for tensor conversion
#[derive(Debug, Clone)]
pub enum StillImage {
    /// Encoded data URL, decoded when the tensor is built
    Encoded(String),
    /// Frame already in memory
    Decoded(DynamicImage),
}

/// Resolve `source` to exactly one still image, or `None` when it has nothing to offer
pub fn extract_frame(source: &FrameSource) -> Option<StillImage> {
    match source {
        FrameSource::DataUrl(url) if is_image_data_url(url) => Some(StillImage::Encoded(url.clone())),
        FrameSource::DataUrl(_) => {
            debug!("Frame source is not an image data URL");
            None
        }
        FrameSource::Capturable(capture) => match capture.capture() {
            Some(url) if is_image_data_url(&url) => Some(StillImage::Encoded(url)),
            Some(_) => {
                debug!("Capture returned something other than an image data URL");
                None
            }
            None => {
                debug!("Capture returned no frame");
                None
            }
        },
        FrameSource::Video(video) => video.current_frame().map(StillImage::Decoded),
    }
}

fn is_image_data_url(url: &str) -> bool {
    url.starts_with(DATA_URL_IMAGE_PREFIX)
}

/// Encode raw image bytes as a base64 data URL
pub fn encode_data_url(bytes: &[u8], mime: &str) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Decode a base64 image data URL into pixels
pub fn decode_data_url(url: &str) -> Result<DynamicImage, GestureError> {
    let (header, payload) = url
        .split_once(',')
        .ok_or_else(|| GestureError::TensorBuild("Data URL has no payload".to_string()))?;

    if !header.starts_with(DATA_URL_IMAGE_PREFIX) {
        return Err(GestureError::TensorBuild(format!("Not an image data URL: {}", header)));
    }
    if !header.ends_with(";base64") {
        return Err(GestureError::TensorBuild("Only base64 data URLs are supported".to_string()));
    }

    // Browsers accept payloads wrapped across lines
    let payload: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| GestureError::TensorBuild(format!("Invalid base64 payload: {}", e)))?;

    image::load_from_memory(&bytes)
        .map_err(|e| GestureError::TensorBuild(format!("Failed to decode image: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    struct StaticCapture(Option<String>);

    impl FrameCapture for StaticCapture {
        fn capture(&self) -> Option<String> {
            self.0.clone()
        }
    }

    struct StaticVideo(Option<DynamicImage>);

    impl VideoHandle for StaticVideo {
        fn current_frame(&self) -> Option<DynamicImage> {
            self.0.clone()
        }
    }

    fn png_bytes() -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 2, Rgb([10, 20, 30])));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_extract_data_url() {
        let url = encode_data_url(&png_bytes(), "image/png");
        let still = extract_frame(&FrameSource::DataUrl(url.clone()));
        assert!(matches!(still, Some(StillImage::Encoded(ref s)) if *s == url));
    }

    #[test]
    fn test_extract_rejects_non_image_string() {
        assert!(extract_frame(&FrameSource::DataUrl("hello".to_string())).is_none());
        assert!(extract_frame(&FrameSource::DataUrl("data:text/plain;base64,aGk=".to_string())).is_none());
    }

    #[test]
    fn test_extract_capturable() {
        let url = encode_data_url(&png_bytes(), "image/jpeg");
        let source = FrameSource::Capturable(Arc::new(StaticCapture(Some(url))));
        assert!(matches!(extract_frame(&source), Some(StillImage::Encoded(_))));

        let empty = FrameSource::Capturable(Arc::new(StaticCapture(None)));
        assert!(extract_frame(&empty).is_none());
    }

    #[test]
    fn test_extract_video() {
        let frame = DynamicImage::ImageRgb8(RgbImage::new(2, 2));
        let source = FrameSource::Video(Arc::new(StaticVideo(Some(frame))));
        assert!(matches!(extract_frame(&source), Some(StillImage::Decoded(_))));

        let idle = FrameSource::Video(Arc::new(StaticVideo(None)));
        assert!(extract_frame(&idle).is_none());
    }

    #[test]
    fn test_decode_data_url_roundtrip_pixels() {
        let url = encode_data_url(&png_bytes(), "image/png");
        let image = decode_data_url(&url).unwrap();
        assert_eq!((image.width(), image.height()), (3, 2));
        assert_eq!(image.to_rgb8().get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn test_decode_data_url_ignores_whitespace() {
        let url = encode_data_url(&png_bytes(), "image/png");
        let (header, payload) = url.split_once(',').unwrap();
        let wrapped: Vec<String> = payload
            .as_bytes()
            .chunks(8)
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect();
        let url = format!("{},{}\r\n", header, wrapped.join("\n "));

        let image = decode_data_url(&url).unwrap();
        assert_eq!((image.width(), image.height()), (3, 2));
    }

    #[test]
    fn test_decode_data_url_errors() {
        assert!(decode_data_url("data:image/png;base64").is_err());
        assert!(decode_data_url("data:image/png,rawbytes").is_err());
        assert!(decode_data_url("data:image/png;base64,@@@").is_err());
        assert!(decode_data_url("data:text/plain;base64,aGk=").is_err());
    }

    #[test]
    fn test_frame_source_debug_hides_payload() {
        let source = FrameSource::DataUrl("data:image/png;base64,AAAA".to_string());
        let rendered = format!("{:?}", source);
        assert!(rendered.contains("bytes"));
        assert!(!rendered.contains("AAAA"));
    }
}
