// THEORY:
// The `Frame` module represents one decoded raster handed to the engine by an
// external decoder. Like the other data containers in `core_modules` it is "dumb":
// it holds the raw RGBA bytes and the dimensions that give them meaning, and it can
// hand out per-pixel views. It does not know what a target color is.
//
// Layout is fixed: 4 bytes per pixel (R, G, B, A), row-major, origin top-left.
// A frame coming from outside may lie about its size, so `validate` checks the
// buffer length against the dimensions before any stage reads a pixel.

pub mod frame {
    use crate::error::AnalysisError;

    pub const CHANNELS: usize = 4;

    /// A rectangular RGBA raster owned by the caller.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Frame {
        /// The width of the frame in pixels.
        pub width: u32,
        /// The height of the frame in pixels.
        pub height: u32,
        /// Row-major RGBA bytes, `width * height * 4` long when well formed.
        pub pixels: Vec<u8>,
    }

    impl Frame {
        /// Wraps a buffer without checking it. Stages call `validate` before reading.
        pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
            Self {
                width,
                height,
                pixels,
            }
        }

        /// A frame where every pixel has the same opaque color.
        pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
            let pixel = [rgb[0], rgb[1], rgb[2], 255];
            let pixels = pixel.repeat(width as usize * height as usize);
            Self::new(width, height, pixels)
        }

        pub fn pixel_count(&self) -> usize {
            self.width as usize * self.height as usize
        }

        pub fn expected_len(&self) -> usize {
            self.pixel_count() * CHANNELS
        }

        pub fn validate(&self) -> Result<(), AnalysisError> {
            if self.pixels.len() != self.expected_len() {
                return Err(AnalysisError::MalformedFrame {
                    width: self.width,
                    height: self.height,
                    expected_len: self.expected_len(),
                    actual_len: self.pixels.len(),
                });
            }
            Ok(())
        }

        /// The RGB channels of every pixel in row-major order. Alpha is dropped.
        pub fn rgb_pixels(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
            self.pixels
                .chunks_exact(CHANNELS)
                .map(|p| [p[0], p[1], p[2]])
        }

        pub fn set_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
            let offset = (y as usize * self.width as usize + x as usize) * CHANNELS;
            self.pixels[offset..offset + 3].copy_from_slice(&rgb);
        }
    }
}
