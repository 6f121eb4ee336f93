pub mod image_helper {
    use crate::core_modules::color::color::Color;
    use crate::core_modules::component::Centroid;
    use crate::core_modules::frame::frame::{CHANNELS, Frame};
    use crate::core_modules::frame_analyzer::FramePreview;
    use crate::error::FrameDecodeError;
    use image::ImageEncoder;
    use std::path::Path;

    /// Half the length of each arm of the centroid cross-hair, in pixels.
    const MARKER_RADIUS: i64 = 4;

    /// Decodes any still image `image` understands into an RGBA frame.
    pub fn load_frame(path: &Path) -> Result<Frame, FrameDecodeError> {
        let rgba = image::open(path)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Frame::new(width, height, rgba.into_raw()))
    }

    pub fn save_rgba(
        path: &Path,
        width: u32,
        height: u32,
        buffer: &[u8],
    ) -> Result<(), image::error::ImageError> {
        let output = std::io::BufWriter::new(std::fs::File::create(path)?);
        let encoder = image::codecs::png::PngEncoder::new(output);

        encoder.write_image(buffer, width, height, image::ExtendedColorType::Rgba8)?;

        Ok(())
    }

    /// Paints a cross-hair centred on the rounded centroid. Arms are clipped at the edges.
    pub fn draw_marker(
        buffer: &mut [u8],
        width: u32,
        height: u32,
        centroid: Centroid,
        color: Color,
    ) {
        let cx = centroid.x.round() as i64;
        let cy = centroid.y.round() as i64;
        let (w, h) = (width as i64, height as i64);

        let arms = (-MARKER_RADIUS..=MARKER_RADIUS)
            .map(|d| (cx + d, cy))
            .chain((-MARKER_RADIUS..=MARKER_RADIUS).map(|d| (cx, cy + d)));

        for (x, y) in arms {
            if x < 0 || y < 0 || x >= w || y >= h {
                continue;
            }
            let offset = (y * w + x) as usize * CHANNELS;
            buffer[offset..offset + CHANNELS]
                .copy_from_slice(&[color.red, color.green, color.blue, 255]);
        }
    }

    /// The black and white mask with the centroid marked, ready to display or save.
    pub fn render_preview(preview: &FramePreview, marker: Color) -> Vec<u8> {
        let mut buffer = preview.mask.to_rgba();
        if let Some(centroid) = preview.centroid {
            draw_marker(
                &mut buffer,
                preview.mask.width,
                preview.mask.height,
                centroid,
                marker,
            );
        }
        buffer
    }

    pub fn save_preview(
        path: &Path,
        preview: &FramePreview,
        marker: Color,
    ) -> Result<(), image::error::ImageError> {
        let buffer = render_preview(preview, marker);
        save_rgba(path, preview.mask.width, preview.mask.height, &buffer)
    }
}
