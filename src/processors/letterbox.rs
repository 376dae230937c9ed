//! Letterbox resizing and tensor conversion for detector inputs.

use image::imageops::{FilterType, overlay, resize};
use image::{Rgb, RgbImage};
use ndarray::{Array4, ShapeError};

/// Maps boxes from letterboxed input space back to the original image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxTransform {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub original_width: u32,
    pub original_height: u32,
}

impl LetterboxTransform {
    /// Undoes padding and scaling, then clamps to the original image bounds.
    pub fn to_original(&self, bbox: [f32; 4]) -> [f32; 4] {
        let max_x = self.original_width as f32;
        let max_y = self.original_height as f32;
        let unmap = |v: f32, pad: f32, max: f32| ((v - pad) / self.scale).clamp(0.0, max);
        [
            unmap(bbox[0], self.pad_x, max_x),
            unmap(bbox[1], self.pad_y, max_y),
            unmap(bbox[2], self.pad_x, max_x),
            unmap(bbox[3], self.pad_y, max_y),
        ]
    }
}

/// Aspect-preserving resize onto a fixed canvas with centered padding.
#[derive(Debug, Clone, Copy)]
pub struct Letterbox {
    target_width: u32,
    target_height: u32,
    pad_value: u8,
}

impl Letterbox {
    pub fn new(target_width: u32, target_height: u32, pad_value: u8) -> Self {
        Self {
            target_width,
            target_height,
            pad_value,
        }
    }

    pub fn target_size(&self) -> (u32, u32) {
        (self.target_width, self.target_height)
    }

    /// Resizes `img` to fit the target and pads the remainder.
    pub fn apply(&self, img: &RgbImage) -> (RgbImage, LetterboxTransform) {
        let (width, height) = img.dimensions();
        let mut canvas = RgbImage::from_pixel(
            self.target_width,
            self.target_height,
            Rgb([self.pad_value; 3]),
        );

        if width == 0 || height == 0 {
            let transform = LetterboxTransform {
                scale: 1.0,
                pad_x: 0.0,
                pad_y: 0.0,
                original_width: width,
                original_height: height,
            };
            return (canvas, transform);
        }

        let scale = (self.target_width as f32 / width as f32)
            .min(self.target_height as f32 / height as f32);
        let new_width = ((width as f32 * scale).round() as u32).clamp(1, self.target_width);
        let new_height = ((height as f32 * scale).round() as u32).clamp(1, self.target_height);

        let pad_left = (self.target_width - new_width) / 2;
        let pad_top = (self.target_height - new_height) / 2;

        if new_width == width && new_height == height {
            overlay(&mut canvas, img, pad_left as i64, pad_top as i64);
        } else {
            let resized = resize(img, new_width, new_height, FilterType::Triangle);
            overlay(&mut canvas, &resized, pad_left as i64, pad_top as i64);
        }

        let transform = LetterboxTransform {
            scale,
            pad_x: pad_left as f32,
            pad_y: pad_top as f32,
            original_width: width,
            original_height: height,
        };
        (canvas, transform)
    }
}

/// Converts an RGB image into a `[1, 3, H, W]` tensor scaled to `[0, 1]`.
pub fn to_chw_tensor(img: &RgbImage) -> Result<Array4<f32>, ShapeError> {
    let (width, height) = img.dimensions();
    let plane = (width * height) as usize;
    let mut data = vec![0.0f32; 3 * plane];

    for (x, y, pixel) in img.enumerate_pixels() {
        let offset = (y * width + x) as usize;
        for c in 0..3 {
            data[c * plane + offset] = pixel[c] as f32 / 255.0;
        }
    }

    Array4::from_shape_vec((1, 3, height as usize, width as usize), data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wide_image_is_padded_vertically() {
        let img = RgbImage::from_pixel(200, 100, Rgb([255, 0, 0]));
        let (canvas, transform) = Letterbox::new(100, 100, 114).apply(&img);

        assert_eq!(canvas.dimensions(), (100, 100));
        assert!((transform.scale - 0.5).abs() < 1e-6);
        assert_eq!(transform.pad_x, 0.0);
        assert_eq!(transform.pad_y, 25.0);
        assert_eq!(canvas.get_pixel(50, 5), &Rgb([114, 114, 114]));
        assert_eq!(canvas.get_pixel(50, 50), &Rgb([255, 0, 0]));
    }

    #[test]
    fn test_to_original_inverts_mapping() {
        let transform = LetterboxTransform {
            scale: 0.5,
            pad_x: 0.0,
            pad_y: 25.0,
            original_width: 200,
            original_height: 100,
        };
        let mapped = transform.to_original([10.0, 35.0, 60.0, 75.0]);
        assert_eq!(mapped, [20.0, 20.0, 120.0, 100.0]);

        let clamped = transform.to_original([-10.0, 0.0, 500.0, 500.0]);
        assert_eq!(clamped, [0.0, 0.0, 200.0, 100.0]);
    }

    #[test]
    fn test_chw_tensor_layout() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 51]));
        img.put_pixel(1, 0, Rgb([0, 255, 0]));

        let tensor = to_chw_tensor(&img).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 1, 2]);
        assert_eq!(tensor[[0, 0, 0, 0]], 1.0);
        assert_eq!(tensor[[0, 1, 0, 1]], 1.0);
        assert!((tensor[[0, 2, 0, 0]] - 0.2).abs() < 1e-6);
    }
}
