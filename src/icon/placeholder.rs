//! Placeholder icons: a colored tile bearing the application's initials.

use super::glyphs::{self, GLYPH_HEIGHT, GLYPH_WIDTH};
use image::{Rgba, RgbaImage};

/// Edge length of every placeholder icon.
pub const PLACEHOLDER_SIZE: u32 = 64;

/// Default tile color.
pub const DEFAULT_ACCENT: [u8; 4] = [50, 150, 250, 255];

const BORDER_WIDTH: u32 = 2;
const BORDER_COLOR: Rgba<u8> = Rgba([255, 255, 255, 200]);
const GLYPH_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const GLYPH_SCALE: u32 = 4;
const GLYPH_SPACING: u32 = 4;

/// Draws deterministic placeholder icons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconSynthesizer {
    background: Rgba<u8>,
}

impl IconSynthesizer {
    pub fn new(background: [u8; 4]) -> Self {
        Self {
            background: Rgba(background),
        }
    }

    /// Render the placeholder for `app_name`.
    ///
    /// Never fails: an empty name yields a tile with a single blank glyph.
    pub fn synthesize(&self, app_name: &str) -> RgbaImage {
        let mut canvas = RgbaImage::from_pixel(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, self.background);
        draw_border(&mut canvas);
        draw_centered(&mut canvas, &initials(app_name));
        canvas
    }
}

impl Default for IconSynthesizer {
    fn default() -> Self {
        Self::new(DEFAULT_ACCENT)
    }
}

/// Strip directories (either separator) and the extension from `app_name`.
///
/// Leading dots do not start an extension, so `.bashrc` is kept whole.
pub fn display_name(app_name: &str) -> &str {
    let base = app_name.rsplit(['/', '\\']).next().unwrap_or(app_name);
    let leading_dots = base.len() - base.trim_start_matches('.').len();
    match base[leading_dots..].rfind('.') {
        Some(idx) => &base[..leading_dots + idx],
        None => base,
    }
}

/// Up to two uppercase initials for `app_name`.
///
/// The first character is always used. The second is the first character
/// after a word boundary: a space, underscore or hyphen, or a lowercase to
/// uppercase transition. An empty name gives a single space.
pub fn initials(app_name: &str) -> String {
    let chars: Vec<char> = display_name(app_name).chars().collect();
    let Some(&first) = chars.first() else {
        return " ".to_string();
    };

    let mut initials = String::new();
    initials.push(uppercase(first));

    for pair in chars.windows(2) {
        let (prev, cur) = (pair[0], pair[1]);
        let boundary = is_separator(prev) || (prev.is_lowercase() && cur.is_uppercase());
        if boundary && !is_separator(cur) {
            initials.push(uppercase(cur));
            break;
        }
    }

    initials
}

fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '_' | '-')
}

fn uppercase(c: char) -> char {
    c.to_uppercase().next().unwrap_or(c)
}

fn draw_border(canvas: &mut RgbaImage) {
    let (width, height) = canvas.dimensions();
    for (x, y, pixel) in canvas.enumerate_pixels_mut() {
        let on_edge = x < BORDER_WIDTH
            || y < BORDER_WIDTH
            || x >= width - BORDER_WIDTH
            || y >= height - BORDER_WIDTH;
        if on_edge {
            *pixel = BORDER_COLOR;
        }
    }
}

fn draw_centered(canvas: &mut RgbaImage, text: &str) {
    let count = u32::try_from(text.chars().count()).unwrap_or(1).max(1);
    let glyph_width = GLYPH_WIDTH * GLYPH_SCALE;
    let text_width = count * glyph_width + (count - 1) * GLYPH_SPACING;

    let origin_x = canvas.width().saturating_sub(text_width) / 2;
    let origin_y = canvas.height().saturating_sub(GLYPH_HEIGHT * GLYPH_SCALE) / 2;

    for (index, c) in (0u32..).zip(text.chars()) {
        let left = origin_x + index * (glyph_width + GLYPH_SPACING);
        draw_glyph(canvas, glyphs::glyph(c), left, origin_y);
    }
}

fn draw_glyph(canvas: &mut RgbaImage, glyph: glyphs::Glyph, left: u32, top: u32) {
    for (row, bits) in (0u32..).zip(glyph) {
        for col in 0..GLYPH_WIDTH {
            if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                continue;
            }
            for dy in 0..GLYPH_SCALE {
                for dx in 0..GLYPH_SCALE {
                    let x = left + col * GLYPH_SCALE + dx;
                    let y = top + row * GLYPH_SCALE + dy;
                    if x < canvas.width() && y < canvas.height() {
                        canvas.put_pixel(x, y, GLYPH_COLOR);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("nonexistent.exe"), "nonexistent");
        assert_eq!(display_name("C:\\Program Files\\Mozilla\\firefox.exe"), "firefox");
        assert_eq!(display_name("/usr/bin/gnome-terminal"), "gnome-terminal");
        assert_eq!(display_name("archive.tar.gz"), "archive.tar");
        assert_eq!(display_name(".bashrc"), ".bashrc");
        assert_eq!(display_name(""), "");
        assert_eq!(display_name("dir/"), "");
    }

    #[test]
    fn test_initials() {
        assert_eq!(initials("nonexistent.exe"), "N");
        assert_eq!(initials("Visual Studio Code"), "VS");
        assert_eq!(initials("gnome-terminal"), "GT");
        assert_eq!(initials("my_app"), "MA");
        assert_eq!(initials("camelCaseApp"), "CC");
        assert_eq!(initials("IntelliJ"), "IJ");
        assert_eq!(initials("firefox"), "F");
        assert_eq!(initials("x"), "X");
        assert_eq!(initials(""), " ");
    }

    #[test]
    fn test_initials_skip_repeated_separators() {
        assert_eq!(initials("a  b"), "AB");
        assert_eq!(initials("trailing-"), "T");
    }

    #[test]
    fn test_canvas_is_fixed_size_for_any_name() {
        let synthesizer = IconSynthesizer::default();
        for name in ["", " ", "x", "Visual Studio Code", "日本語", "a/b/c.d.e", "---"] {
            let image = synthesizer.synthesize(name);
            assert_eq!(image.dimensions(), (PLACEHOLDER_SIZE, PLACEHOLDER_SIZE), "{name:?}");
        }
    }

    #[test]
    fn test_border_and_background() {
        let image = IconSynthesizer::default().synthesize("");
        assert_eq!(*image.get_pixel(0, 0), BORDER_COLOR);
        assert_eq!(*image.get_pixel(1, 40), BORDER_COLOR);
        assert_eq!(*image.get_pixel(63, 63), BORDER_COLOR);
        assert_eq!(*image.get_pixel(2, 2), Rgba(DEFAULT_ACCENT));
        // Blank glyph: the center stays background.
        assert_eq!(*image.get_pixel(32, 32), Rgba(DEFAULT_ACCENT));
    }

    #[test]
    fn test_single_n_glyph_is_drawn() {
        let image = IconSynthesizer::default().synthesize("nonexistent.exe");
        // One 20x28 glyph centered at (22, 18).
        assert_eq!(*image.get_pixel(23, 19), GLYPH_COLOR); // left stem
        assert_eq!(*image.get_pixel(39, 19), GLYPH_COLOR); // right stem
        assert_eq!(*image.get_pixel(31, 31), GLYPH_COLOR); // diagonal
        assert_eq!(*image.get_pixel(31, 19), Rgba(DEFAULT_ACCENT)); // top gap
    }

    #[test]
    fn test_two_glyphs_use_both_halves() {
        let image = IconSynthesizer::default().synthesize("gnome-terminal");
        let lit = |range: std::ops::Range<u32>| {
            range
                .flat_map(|x| (0..PLACEHOLDER_SIZE).map(move |y| (x, y)))
                .filter(|&(x, y)| *image.get_pixel(x, y) == GLYPH_COLOR)
                .count()
        };
        assert!(lit(BORDER_WIDTH..32) > 0);
        assert!(lit(32..PLACEHOLDER_SIZE - BORDER_WIDTH) > 0);
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let synthesizer = IconSynthesizer::new([1, 2, 3, 255]);
        assert_eq!(synthesizer.synthesize("Slack"), synthesizer.synthesize("Slack"));
        assert_eq!(*synthesizer.synthesize("Slack").get_pixel(5, 5), Rgba([1, 2, 3, 255]));
    }
}
