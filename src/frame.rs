use crate::error::RenderError;
use fast_image_resize as fir;
use image::DynamicImage;

/// Interpolation choice produced by the sizer and consumed by `resize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeFilter {
    /// Box convolution, the downscale filter for stills.
    Area,
    /// Catmull-Rom convolution for video frames when quality is affordable.
    Cubic,
    /// Nearest neighbour for fast video pre-scaling.
    Nearest,
}

/// An owned 8-bit BGR pixel matrix, row-major, three bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BgrFrame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl BgrFrame {
    pub fn from_bgr(width: u32, height: u32, data: Vec<u8>) -> Result<Self, RenderError> {
        let expected = width as usize * height as usize * 3;
        if width == 0 || height == 0 || data.len() != expected {
            return Err(RenderError::DecodeFailed(format!(
                "BGR buffer of {} bytes does not describe a {width}x{height} frame",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Any decoded image (grayscale and alpha channels included) widened
    /// or narrowed to BGR.
    pub fn from_dynamic_image(img: &DynamicImage) -> Result<Self, RenderError> {
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        let mut data = rgb.into_raw();
        for pixel in data.chunks_exact_mut(3) {
            pixel.swap(0, 2);
        }
        Self::from_bgr(width, height, data)
    }

    /// Test constructor for uniform frames.
    #[cfg(test)]
    #[must_use]
    pub fn solid(width: u32, height: u32, bgr: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize * 3);
        for _ in 0..width as usize * height as usize {
            data.extend_from_slice(&bgr);
        }
        Self {
            width,
            height,
            data,
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    /// Channel-swapped copy, RGB byte order.
    #[must_use]
    pub fn to_rgb(&self) -> Vec<u8> {
        let mut rgb = self.data.clone();
        for pixel in rgb.chunks_exact_mut(3) {
            pixel.swap(0, 2);
        }
        rgb
    }

    /// BT.601 luma in 14-bit fixed point, one byte per pixel.
    #[must_use]
    pub fn to_gray(&self) -> Vec<u8> {
        self.data
            .chunks_exact(3)
            .map(|p| {
                let b = u32::from(p[0]);
                let g = u32::from(p[1]);
                let r = u32::from(p[2]);
                ((r * 4899 + g * 9617 + b * 1868 + 8192) >> 14) as u8
            })
            .collect()
    }

    /// Per-channel `out = contrast * 1.2 * in + brightness`, saturating.
    #[must_use]
    pub fn adjusted(&self, contrast: f64, brightness: f64) -> Self {
        let gain = contrast * 1.2;
        let data = self
            .data
            .iter()
            .map(|&v| (gain * f64::from(v) + brightness).round().clamp(0.0, 255.0) as u8)
            .collect();
        Self {
            width: self.width,
            height: self.height,
            data,
        }
    }

    pub fn resize(&self, width: u32, height: u32, filter: ResizeFilter) -> Result<Self, RenderError> {
        if width == 0 || height == 0 || self.is_empty() {
            return Err(RenderError::ResizeFailed);
        }
        if width == self.width && height == self.height {
            return Ok(self.clone());
        }

        let mut src = self.data.clone();
        let src_image =
            fir::images::Image::from_slice_u8(self.width, self.height, &mut src, fir::PixelType::U8x3)
                .map_err(|_| RenderError::ResizeFailed)?;
        let mut dst = vec![0_u8; width as usize * height as usize * 3];
        let mut dst_image =
            fir::images::Image::from_slice_u8(width, height, &mut dst, fir::PixelType::U8x3)
                .map_err(|_| RenderError::ResizeFailed)?;

        let alg = match filter {
            ResizeFilter::Area => fir::ResizeAlg::Convolution(fir::FilterType::Box),
            ResizeFilter::Cubic => fir::ResizeAlg::Convolution(fir::FilterType::CatmullRom),
            ResizeFilter::Nearest => fir::ResizeAlg::Nearest,
        };
        let options = fir::ResizeOptions::new().resize_alg(alg);

        let mut resizer = fir::Resizer::new();
        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|_| RenderError::ResizeFailed)?;

        Self::from_bgr(width, height, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::{BgrFrame, ResizeFilter};

    #[test]
    fn gray_conversion_uses_bt601_weights() {
        // BGR: red, green, blue, white.
        let frame = BgrFrame::from_bgr(
            2,
            2,
            vec![0, 0, 255, 0, 255, 0, 255, 0, 0, 255, 255, 255],
        )
        .unwrap();
        assert_eq!(frame.to_gray(), vec![76, 150, 29, 255]);
    }

    #[test]
    fn rgb_conversion_swaps_channels() {
        let frame = BgrFrame::from_bgr(1, 1, vec![10, 20, 30]).unwrap();
        assert_eq!(frame.to_rgb(), vec![30, 20, 10]);
    }

    #[test]
    fn adjustment_saturates_at_both_ends() {
        let frame = BgrFrame::from_bgr(1, 1, vec![250, 10, 128]).unwrap();
        let adjusted = frame.adjusted(2.0, 0.0);
        assert_eq!(adjusted.pixel(0, 0), [255, 24, 255]);

        let darkened = frame.adjusted(1.0, -300.0);
        assert_eq!(darkened.pixel(0, 0), [0, 0, 0]);
    }

    #[test]
    fn resize_to_same_dims_is_identity() {
        let frame = BgrFrame::solid(4, 4, [1, 2, 3]);
        let resized = frame.resize(4, 4, ResizeFilter::Area).unwrap();
        assert_eq!(resized, frame);
    }

    #[test]
    fn resize_changes_dimensions_and_keeps_solid_color() {
        let frame = BgrFrame::solid(8, 8, [9, 90, 200]);
        let resized = frame.resize(4, 2, ResizeFilter::Nearest).unwrap();
        assert_eq!((resized.width(), resized.height()), (4, 2));
        for y in 0..2 {
            for x in 0..4 {
                assert_eq!(resized.pixel(x, y), [9, 90, 200]);
            }
        }
    }

    #[test]
    fn resize_to_zero_is_rejected() {
        let frame = BgrFrame::solid(4, 4, [0, 0, 0]);
        assert!(frame.resize(0, 2, ResizeFilter::Area).is_err());
    }

    #[test]
    fn mismatched_buffer_is_rejected() {
        assert!(BgrFrame::from_bgr(2, 2, vec![0; 11]).is_err());
    }
}
