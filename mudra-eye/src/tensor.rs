//! Input tensors and their lifetime accounting

use crate::config::ResizePolicy;
use crate::error::GestureError;
use crate::frame::{decode_data_url, StillImage};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use ndarray::{Array4, ArrayD, ArrayViewD};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Channels per pixel in the model input
pub const INPUT_CHANNELS: usize = 3;

/// Counts tensors created by a pipeline and how many are still resident.
///
/// Clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct TensorRegistry {
    live: Arc<AtomicUsize>,
    allocated: Arc<AtomicUsize>,
}

impl TensorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `data` and register it as a live tensor
    pub fn track(&self, data: ArrayD<f32>) -> Tensor {
        self.live.fetch_add(1, Ordering::SeqCst);
        self.allocated.fetch_add(1, Ordering::SeqCst);
        Tensor {
            data,
            _lease: Lease {
                live: self.live.clone(),
            },
        }
    }

    /// Tensors currently resident
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Tensors created over the registry's lifetime
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct Lease {
    live: Arc<AtomicUsize>,
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A registered `f32` tensor. Dropping it releases the registration.
#[derive(Debug)]
pub struct Tensor {
    data: ArrayD<f32>,
    _lease: Lease,
}

impl Tensor {
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn view(&self) -> ArrayViewD<'_, f32> {
        self.data.view()
    }

    pub fn array(&self) -> &ArrayD<f32> {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Values in logical (row-major) order
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }
}

/// Build a `[1, size, size, 3]` tensor with channel values scaled to `[0, 1]`.
///
/// Decoding and resizing run on the blocking pool.
pub async fn build_input_tensor(
    image: StillImage,
    size: u32,
    policy: ResizePolicy,
    registry: &TensorRegistry,
) -> Result<Tensor, GestureError> {
    if size == 0 {
        return Err(GestureError::TensorBuild("Input size cannot be zero".to_string()));
    }

    let data = tokio::task::spawn_blocking(move || match image {
        StillImage::Encoded(data_url) => image_to_array(&decode_data_url(&data_url)?, size, policy),
        StillImage::Decoded(frame) => image_to_array(&frame, size, policy),
    })
    .await
    .map_err(|e| GestureError::TensorBuild(format!("Tensor build task failed: {}", e)))??;

    debug!("Built input tensor {:?}", data.shape());
    Ok(registry.track(data))
}

fn image_to_array(image: &DynamicImage, size: u32, policy: ResizePolicy) -> Result<ArrayD<f32>, GestureError> {
    if image.width() == 0 || image.height() == 0 {
        warn!("Rejecting empty frame");
        return Err(GestureError::TensorBuild("Frame has zero width or height".to_string()));
    }

    let canvas = fit_to_square(image, size, policy);
    let side = size as usize;
    let values: Vec<f32> = canvas.as_raw().iter().map(|&v| v as f32 / 255.0).collect();

    let array = Array4::from_shape_vec((1, side, side, INPUT_CHANNELS), values)
        .map_err(|e| GestureError::TensorBuild(format!("Failed to shape input tensor: {}", e)))?;
    Ok(array.into_dyn())
}

/// Render `image` onto a `size` x `size` RGB canvas
pub fn fit_to_square(image: &DynamicImage, size: u32, policy: ResizePolicy) -> RgbImage {
    let rgb = image.to_rgb8();
    match policy {
        ResizePolicy::Stretch => imageops::resize(&rgb, size, size, FilterType::Triangle),
        ResizePolicy::Pad { fill } => {
            let (width, height) = rgb.dimensions();
            let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
            let fit_width = ((width as f32 * scale).round() as u32).clamp(1, size);
            let fit_height = ((height as f32 * scale).round() as u32).clamp(1, size);

            let resized = imageops::resize(&rgb, fit_width, fit_height, FilterType::Triangle);
            let mut canvas = RgbImage::from_pixel(size, size, Rgb(fill));
            let x = ((size - fit_width) / 2) as i64;
            let y = ((size - fit_height) / 2) as i64;
            imageops::overlay(&mut canvas, &resized, x, y);
            canvas
        }
    }
}
