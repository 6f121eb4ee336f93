// THEORY:
// A `FrameSource` is the seam between the engine and whatever decodes video. The
// engine does not decode anything itself; it pulls frames one at a time from a
// source and forgets each one once it has been analyzed.
//
// A source is lazy, finite and not restartable. It may block while it decodes the
// next frame. When a frame cannot be produced it yields an error in that frame's
// place, and the pipeline stops there.
//
// Two sources ship with the crate:
// - `IterFrameSource` adapts any iterator, which is how tests and embedding
//   applications feed frames they already hold.
// - `ImageSequenceSource` reads a directory of still images (an extracted video) in
//   file name order and decodes each with the `image` crate only when it is pulled.
//   Digit runs in names compare by value, so `frame_2.png` comes before `frame_10.png`
//   whether or not the numbers are zero padded.

use crate::core_modules::frame::frame::Frame;
use crate::error::FrameDecodeError;
use crate::utils::image_helper::image_helper;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::debug;

pub type FrameItem = Result<Frame, FrameDecodeError>;

/// A sequential supplier of frames in presentation order.
pub trait FrameSource {
    /// Produces the next frame, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> Option<FrameItem>;

    /// The total number of frames, when the source knows it up front.
    fn total_frames(&self) -> Option<u64> {
        None
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Option<FrameItem> {
        (**self).next_frame()
    }

    fn total_frames(&self) -> Option<u64> {
        (**self).total_frames()
    }
}

/// Wraps an iterator of frames (or frame results) as a source.
pub struct IterFrameSource<I> {
    items: I,
    total: Option<u64>,
}

impl<I> IterFrameSource<I>
where
    I: Iterator<Item = FrameItem>,
{
    pub fn new(items: I) -> Self {
        Self { items, total: None }
    }

    pub fn with_total(items: I, total: u64) -> Self {
        Self {
            items,
            total: Some(total),
        }
    }
}

impl IterFrameSource<std::iter::Map<std::vec::IntoIter<Frame>, fn(Frame) -> FrameItem>> {
    /// A source over frames already in memory. The total is known.
    pub fn from_frames(frames: Vec<Frame>) -> Self {
        let total = frames.len() as u64;
        let wrap: fn(Frame) -> FrameItem = Ok;
        Self::with_total(frames.into_iter().map(wrap), total)
    }
}

impl<I> FrameSource for IterFrameSource<I>
where
    I: Iterator<Item = FrameItem>,
{
    fn next_frame(&mut self) -> Option<FrameItem> {
        self.items.next()
    }

    fn total_frames(&self) -> Option<u64> {
        self.total
    }
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "tif", "tiff", "webp"];

/// A directory of still images treated as consecutive frames.
pub struct ImageSequenceSource {
    paths: std::vec::IntoIter<PathBuf>,
    total: u64,
}

impl ImageSequenceSource {
    /// Lists the image files in `dir` in natural file name order. Nothing is decoded yet.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, FrameDecodeError> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && is_image_file(&path) {
                paths.push(path);
            }
        }
        paths.sort_by(|a, b| natural_cmp(&file_name(a), &file_name(b)).then_with(|| a.cmp(b)));

        debug!(dir = %dir.display(), frames = paths.len(), "opened image sequence");
        Ok(Self {
            total: paths.len() as u64,
            paths: paths.into_iter(),
        })
    }
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Compares names chunk by chunk, with runs of ASCII digits compared as numbers.
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.as_bytes();
    let mut right = b.as_bytes();
    loop {
        match (left.first(), right.first()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let (l_digits, l_rest) = split_digits(left);
                let (r_digits, r_rest) = split_digits(right);
                let ord = compare_numeric(l_digits, r_digits);
                if ord != Ordering::Equal {
                    return ord;
                }
                left = l_rest;
                right = r_rest;
            }
            (Some(l), Some(r)) => {
                if l != r {
                    return l.cmp(r);
                }
                left = &left[1..];
                right = &right[1..];
            }
        }
    }
}

fn split_digits(bytes: &[u8]) -> (&[u8], &[u8]) {
    let end = bytes.iter().position(|b| !b.is_ascii_digit()).unwrap_or(bytes.len());
    bytes.split_at(end)
}

// Works on the digit strings directly so arbitrarily long runs cannot overflow.
fn compare_numeric(a: &[u8], b: &[u8]) -> Ordering {
    let trim = |digits: &[u8]| -> usize { digits.iter().take_while(|&&d| d == b'0').count() };
    let a_value = &a[trim(a)..];
    let b_value = &b[trim(b)..];
    a_value
        .len()
        .cmp(&b_value.len())
        .then_with(|| a_value.cmp(b_value))
        // Equal values: fewer leading zeros first, to keep the order total.
        .then_with(|| a.len().cmp(&b.len()))
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Option<FrameItem> {
        let path = self.paths.next()?;
        Some(image_helper::load_frame(&path).map_err(|err| {
            FrameDecodeError::new(format!("{}: {}", path.display(), err.message))
        }))
    }

    fn total_frames(&self) -> Option<u64> {
        Some(self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iter_source_yields_in_order_then_ends() {
        let frames = vec![
            Frame::filled(1, 1, [1, 1, 1]),
            Frame::filled(1, 1, [2, 2, 2]),
        ];
        let mut source = IterFrameSource::from_frames(frames);
        assert_eq!(source.total_frames(), Some(2));
        assert_eq!(source.next_frame().unwrap().unwrap().pixels[0], 1);
        assert_eq!(source.next_frame().unwrap().unwrap().pixels[0], 2);
        assert!(source.next_frame().is_none());
    }

    #[test]
    fn iter_source_passes_errors_through() {
        let items = vec![Err(FrameDecodeError::new("corrupt"))];
        let mut source = IterFrameSource::new(items.into_iter());
        assert_eq!(source.total_frames(), None);
        assert_eq!(
            source.next_frame().unwrap().unwrap_err(),
            FrameDecodeError::new("corrupt")
        );
    }

    fn save_gray(dir: &Path, name: &str, value: u8) {
        let frame = Frame::filled(2, 1, [value, value, value]);
        image_helper::save_rgba(&dir.join(name), frame.width, frame.height, &frame.pixels)
            .unwrap();
    }

    #[test]
    fn image_sequence_reads_sorted_images_only() {
        let dir = tempfile::tempdir().unwrap();
        save_gray(dir.path(), "frame_002.png", 9);
        save_gray(dir.path(), "frame_001.png", 4);
        std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        assert_eq!(source.total_frames(), Some(2));
        let first = source.next_frame().unwrap().unwrap();
        assert_eq!((first.width, first.height), (2, 1));
        assert_eq!(&first.pixels[..4], &[4, 4, 4, 255]);
        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(&second.pixels[..4], &[9, 9, 9, 255]);
        assert!(source.next_frame().is_none());
    }

    #[test]
    fn unpadded_frame_numbers_keep_presentation_order() {
        let dir = tempfile::tempdir().unwrap();
        for i in 1..=10u8 {
            save_gray(dir.path(), &format!("frame_{i}.png"), i);
        }

        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        let mut order = Vec::new();
        while let Some(frame) = source.next_frame() {
            order.push(frame.unwrap().pixels[0]);
        }
        assert_eq!(order, (1..=10).collect::<Vec<u8>>());
    }

    #[test]
    fn natural_order_compares_digit_runs_by_value() {
        let mut names = vec!["b2.png", "a10.png", "a9.png", "a09.png", "a1x.png", "a1.png"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(
            names,
            vec!["a1.png", "a1x.png", "a9.png", "a09.png", "a10.png", "b2.png"]
        );
        assert_eq!(
            natural_cmp("f99999999999999999999999", "f100000000000000000000000"),
            Ordering::Less
        );
    }

    #[test]
    fn undecodable_image_is_a_frame_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.png"), b"definitely not png").unwrap();
        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        let err = source.next_frame().unwrap().unwrap_err();
        assert!(err.message.contains("broken.png"));
    }

    #[test]
    fn missing_directory_fails_to_open() {
        assert!(ImageSequenceSource::open("/definitely/not/here").is_err());
    }
}
