//! Pixel sources consumed once at texture creation or upload time.

/// Anything that can describe its size and produce straight-alpha RGBA8 pixels.
pub trait ImageSource {
    /// `(width, height)` in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Color at `(x, y)`, with `y = 0` being the first row.
    fn pixel(&self, x: u32, y: u32) -> [u8; 4];

    /// Tightly packed RGBA8 rows, first row first.
    fn to_rgba8(&self) -> Vec<u8> {
        let (w, h) = self.dimensions();
        let mut out = Vec::with_capacity(w as usize * h as usize * 4);
        for y in 0..h {
            for x in 0..w {
                out.extend_from_slice(&self.pixel(x, y));
            }
        }
        out
    }

    /// Same rows as [`to_rgba8`](Self::to_rgba8) with color scaled by alpha,
    /// the layout textures store.
    fn to_premultiplied_rgba8(&self) -> Vec<u8> {
        let mut pixels = self.to_rgba8();
        premultiply(&mut pixels);
        pixels
    }
}

/// Scales the color channels of packed RGBA8 pixels by their alpha, rounding.
pub fn premultiply(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(4) {
        let a = px[3] as u32;
        if a == u8::MAX as u32 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((*c as u32 * a + 127) / 255) as u8;
        }
    }
}

impl ImageSource for image::RgbaImage {
    fn dimensions(&self) -> (u32, u32) {
        image::RgbaImage::dimensions(self)
    }

    fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.get_pixel(x, y).0
    }

    fn to_rgba8(&self) -> Vec<u8> {
        self.as_raw().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Checker;

    impl ImageSource for Checker {
        fn dimensions(&self) -> (u32, u32) {
            (2, 2)
        }

        fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
            if (x + y) % 2 == 0 { [255, 255, 255, 255] } else { [0, 0, 0, 255] }
        }
    }

    #[test]
    fn default_packing_is_row_major() {
        let bytes = Checker.to_rgba8();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[0..4], &[255, 255, 255, 255]);
        assert_eq!(&bytes[4..8], &[0, 0, 0, 255]);
        assert_eq!(&bytes[8..12], &[0, 0, 0, 255]);
    }

    #[test]
    fn rgba_image_matches_per_pixel_path() {
        let img = image::RgbaImage::from_fn(3, 2, |x, y| image::Rgba([x as u8, y as u8, 7, 255]));
        let fast = ImageSource::to_rgba8(&img);
        let slow: Vec<u8> = (0..2)
            .flat_map(|y| (0..3).flat_map(move |x| [x as u8, y as u8, 7, 255]))
            .collect();
        assert_eq!(fast, slow);
    }

    #[test]
    fn premultiply_scales_color_by_alpha() {
        let mut px = [255, 128, 0, 128, 10, 20, 30, 255, 200, 200, 200, 0];
        premultiply(&mut px);
        assert_eq!(px, [128, 64, 0, 128, 10, 20, 30, 255, 0, 0, 0, 0]);
    }

    #[test]
    fn premultiplied_rows_keep_opaque_pixels() {
        let img = image::RgbaImage::from_fn(2, 1, |x, _| image::Rgba([200, 100, 50, if x == 0 { 255 } else { 51 }]));
        assert_eq!(img.to_premultiplied_rgba8(), vec![200, 100, 50, 255, 40, 20, 10, 51]);
    }
}
