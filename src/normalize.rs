use ndarray::prelude::*;

pub const PIXEL_MAX: f32 = 255.0;

/// Rescales 8-bit intensities into [0.0, 1.0].
pub fn normalize_images<D: Dimension>(images: &Array<u8, D>) -> Array<f32, D> {
    images.mapv(|p| p as f32 / PIXEL_MAX)
}

/// Casts digit classes to f32, keeping their value.
pub fn labels_to_f32<D: Dimension>(labels: &Array<u8, D>) -> Array<f32, D> {
    labels.mapv(f32::from)
}
