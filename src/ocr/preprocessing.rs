/// Frame preprocessing for combat log OCR
///
/// The combat log draws each kind of text in its own color over a busy game
/// background. Upscaling and keeping only pixels in the known text colors
/// gives the OCR engine clean glyphs on black.
use super::Recognizer;
use crate::error::OcrError;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use rayon::prelude::*;

/// Inclusive RGB range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl ColorRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    #[inline]
    pub fn contains(&self, rgb: &[u8]) -> bool {
        (0..3).all(|c| rgb[c] >= self.lower[c] && rgb[c] <= self.upper[c])
    }
}

/// Text colors of the combat log
pub const DEFAULT_TEXT_COLORS: [ColorRange; 6] = [
    // White text (normal text)
    ColorRange::new([182, 144, 100], [255, 200, 140]),
    // Orange text (values and names)
    ColorRange::new([170, 105, 32], [255, 160, 51]),
    // Red text (damage)
    ColorRange::new([100, 26, 10], [195, 31, 31]),
    // Blue text (skills)
    ColorRange::new([14, 85, 134], [16, 152, 248]),
    // Green text (regeneration)
    ColorRange::new([59, 93, 0], [129, 202, 1]),
    // Warning text
    ColorRange::new([135, 37, 37], [253, 87, 87]),
];

/// Upscale then mask everything outside the text colors
#[derive(Debug, Clone)]
pub struct TextColorFilter {
    ranges: Vec<ColorRange>,
    scale: u32,
}

impl TextColorFilter {
    /// # Arguments
    /// * `ranges` - Colors to keep
    /// * `scale` - Integer upscale factor (nearest neighbour), 1 disables resizing
    pub fn new(ranges: Vec<ColorRange>, scale: u32) -> Self {
        Self {
            ranges,
            scale: scale.max(1),
        }
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn apply(&self, image: &RgbaImage) -> RgbaImage {
        let mut out = if self.scale > 1 {
            imageops::resize(
                image,
                image.width() * self.scale,
                image.height() * self.scale,
                FilterType::Nearest,
            )
        } else {
            image.clone()
        };

        let ranges = &self.ranges;
        out.par_chunks_mut(4).for_each(|pixel| {
            if !ranges.iter().any(|range| range.contains(&pixel[..3])) {
                pixel[0] = 0;
                pixel[1] = 0;
                pixel[2] = 0;
            }
        });

        out
    }
}

impl Default for TextColorFilter {
    fn default() -> Self {
        Self::new(DEFAULT_TEXT_COLORS.to_vec(), 2)
    }
}

/// Applies a [`TextColorFilter`] before delegating to another recognizer
pub struct FilteredRecognizer<R> {
    filter: TextColorFilter,
    inner: R,
}

impl<R> FilteredRecognizer<R> {
    pub fn new(filter: TextColorFilter, inner: R) -> Self {
        Self { filter, inner }
    }
}

impl<R: Recognizer<RgbaImage>> Recognizer<RgbaImage> for FilteredRecognizer<R> {
    fn recognize(&self, image: &RgbaImage) -> Result<String, OcrError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(OcrError::PreprocessFailed("empty frame".to_string()));
        }
        self.inner.recognize(&self.filter.apply(image))
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use parking_lot::Mutex;

    const BLUE_SKILL: Rgba<u8> = Rgba([15, 120, 200, 255]);
    const BACKGROUND: Rgba<u8> = Rgba([60, 60, 60, 255]);

    #[test]
    fn test_color_range_contains() {
        let blue = DEFAULT_TEXT_COLORS[3];
        assert!(blue.contains(&[15, 120, 200]));
        assert!(blue.contains(&[14, 85, 134]));
        assert!(!blue.contains(&[17, 120, 200]));
    }

    #[test]
    fn test_filter_keeps_text_colors_only() {
        let mut img = RgbaImage::from_pixel(4, 2, BACKGROUND);
        img.put_pixel(1, 0, BLUE_SKILL);

        let filtered = TextColorFilter::new(DEFAULT_TEXT_COLORS.to_vec(), 1).apply(&img);

        assert_eq!(filtered.dimensions(), (4, 2));
        assert_eq!(filtered.get_pixel(1, 0), &BLUE_SKILL);
        assert_eq!(filtered.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_filter_upscales() {
        let mut img = RgbaImage::from_pixel(3, 2, BACKGROUND);
        img.put_pixel(2, 1, BLUE_SKILL);

        let filtered = TextColorFilter::default().apply(&img);

        assert_eq!(filtered.dimensions(), (6, 4));
        assert_eq!(filtered.get_pixel(5, 3), &BLUE_SKILL);
        assert_eq!(filtered.get_pixel(4, 2), &BLUE_SKILL);
        assert_eq!(filtered.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
    }

    struct RecordingRecognizer {
        seen: Mutex<Vec<(u32, u32)>>,
    }

    impl Recognizer<RgbaImage> for RecordingRecognizer {
        fn recognize(&self, image: &RgbaImage) -> Result<String, OcrError> {
            self.seen.lock().push(image.dimensions());
            Ok("text".to_string())
        }
    }

    #[test]
    fn test_filtered_recognizer_delegates() {
        let recognizer = FilteredRecognizer::new(
            TextColorFilter::default(),
            RecordingRecognizer {
                seen: Mutex::new(Vec::new()),
            },
        );

        let img = RgbaImage::from_pixel(5, 5, BACKGROUND);
        assert_eq!(recognizer.recognize(&img).unwrap(), "text");
        assert_eq!(*recognizer.inner.seen.lock(), vec![(10, 10)]);

        let empty = RgbaImage::new(0, 0);
        assert!(matches!(
            recognizer.recognize(&empty),
            Err(OcrError::PreprocessFailed(_))
        ));
    }
}
