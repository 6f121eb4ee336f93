// THEORY:
// The `Color` module is the smallest unit of the tracking engine. It holds the
// color the user is looking for and knows exactly one thing: how far another
// color is from it.
//
// Key architectural principles:
// 1.  **Value Type**: A `Color` is three bytes and is `Copy`. It never carries alpha;
//     any alpha channel in a frame is ignored before it reaches this module.
// 2.  **One Lens Only**: Distance is plain Euclidean distance in RGB space. No gamma
//     correction, no perceptual color space, no clamping. Keeping a single lens makes
//     the threshold a user sets in the preview mean the same thing in the pipeline.
// 3.  **Strict Parsing**: Colors arrive as text from configuration, the command line and
//     the job surface. Text is accepted only as `#rrggbb` or `rrggbb`; anything else is
//     rejected before any pixel work starts.

pub mod color {
    use crate::error::AnalysisError;
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use std::str::FromStr;

    pub type Channel = u8;
    pub type Distance = f64;

    const HEX_DIGITS: usize = 6;

    /// An opaque RGB color.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(try_from = "String", into = "String")]
    pub struct Color {
        pub red: Channel,
        pub green: Channel,
        pub blue: Channel,
    }

    impl Color {
        pub const BLACK: Color = Color::new(0, 0, 0);
        pub const WHITE: Color = Color::new(255, 255, 255);

        pub const fn new(red: Channel, green: Channel, blue: Channel) -> Self {
            Self { red, green, blue }
        }

        /// Parses `#rrggbb` or `rrggbb` (either case, surrounding whitespace ignored).
        pub fn from_hex(input: &str) -> Result<Self, AnalysisError> {
            let invalid = || AnalysisError::InvalidColor {
                input: input.to_string(),
            };

            let trimmed = input.trim();
            let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
            if digits.len() != HEX_DIGITS || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(invalid());
            }

            let packed = u32::from_str_radix(digits, 16).map_err(|_| invalid())?;
            Ok(Self::new(
                ((packed >> 16) & 0xff) as Channel,
                ((packed >> 8) & 0xff) as Channel,
                (packed & 0xff) as Channel,
            ))
        }

        /// Euclidean distance to an `[r, g, b]` triplet.
        pub fn distance_to(&self, rgb: [Channel; 3]) -> Distance {
            let dr = self.red as f64 - rgb[0] as f64;
            let dg = self.green as f64 - rgb[1] as f64;
            let db = self.blue as f64 - rgb[2] as f64;
            (dr * dr + dg * dg + db * db).sqrt()
        }

        pub fn distance_to_color(&self, other: &Color) -> Distance {
            self.distance_to(other.channels())
        }

        pub fn channels(&self) -> [Channel; 3] {
            [self.red, self.green, self.blue]
        }
    }

    impl From<[Channel; 3]> for Color {
        fn from(rgb: [Channel; 3]) -> Self {
            Self::new(rgb[0], rgb[1], rgb[2])
        }
    }

    impl FromStr for Color {
        type Err = AnalysisError;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            Self::from_hex(s)
        }
    }

    impl TryFrom<String> for Color {
        type Error = AnalysisError;

        fn try_from(value: String) -> Result<Self, Self::Error> {
            Self::from_hex(&value)
        }
    }

    impl From<Color> for String {
        fn from(color: Color) -> Self {
            color.to_string()
        }
    }

    impl fmt::Display for Color {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::color::*;
    use crate::error::AnalysisError;

    #[test]
    fn parses_with_and_without_hash() {
        assert_eq!(Color::from_hex("#FF8000").unwrap(), Color::new(255, 128, 0));
        assert_eq!(Color::from_hex("ff8000").unwrap(), Color::new(255, 128, 0));
        assert_eq!(" #00ff7f ".parse::<Color>().unwrap(), Color::new(0, 255, 127));
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in ["", "#", "#fff", "#ff80001", "#gg0000", "12345", "#+12345", "red"] {
            assert!(
                matches!(Color::from_hex(bad), Err(AnalysisError::InvalidColor { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn display_round_trips_through_text() {
        let color = Color::new(1, 171, 255);
        assert_eq!(color.to_string(), "#01abff");
        assert_eq!(color.to_string().parse::<Color>().unwrap(), color);
    }

    #[test]
    fn distance_is_euclidean_in_rgb() {
        let black = Color::BLACK;
        assert_eq!(black.distance_to([0, 0, 0]), 0.0);
        assert_eq!(black.distance_to([3, 4, 0]), 5.0);
        let expected = (3.0f64 * 255.0 * 255.0).sqrt();
        assert!((black.distance_to_color(&Color::WHITE) - expected).abs() < 1e-9);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Color::new(10, 200, 30);
        let b = Color::new(250, 0, 90);
        assert_eq!(a.distance_to_color(&b), b.distance_to_color(&a));
    }
}
