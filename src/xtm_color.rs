// Cross-platform color matching utilities
// Adjusts the ANSI palette this app draws with toward the Windows Terminal look

use ratatui::style::Color;
use term_color_support::ColorSupport;

// Windows Terminal "Campbell" sampled values for the ANSI colors the UI uses.
// Format: (ansi, (R, G, B), 256-color index)
const CAMPBELL: &[(Color, (u8, u8, u8), u8)] = &[
    (Color::Black, (12, 12, 12), 232),
    (Color::Red, (197, 15, 31), 160),
    (Color::Green, (19, 161, 14), 28),
    (Color::Yellow, (193, 156, 0), 178),
    (Color::Blue, (0, 55, 218), 20),
    (Color::Gray, (204, 204, 204), 250),
    (Color::DarkGray, (118, 118, 118), 243),
    (Color::LightRed, (231, 72, 86), 203),
    (Color::LightBlue, (59, 120, 255), 63),
    (Color::LightYellow, (249, 241, 165), 229),
    (Color::White, (242, 242, 242), 255),
];

/// A trait to extend Ratatui's Color with cross-platform consistency methods.
pub trait WTMatch {
    /// Adjusts the color to match the Windows Terminal (Campbell) visual style
    /// based on the current terminal's color capabilities.
    fn wtmatch(self) -> Color;
}

impl WTMatch for Color {
    fn wtmatch(self) -> Color {
        let Some(&(_, rgb, index256)) = CAMPBELL.iter().find(|(ansi, _, _)| *ansi == self) else {
            // Custom RGB or Indexed colors are returned as-is
            return self;
        };

        // Detect terminal color support (TrueColor, 256, or Basic)
        let support = ColorSupport::stdout();
        if support.has_16m {
            // TrueColor support: return the exact sampled RGB value
            Color::Rgb(rgb.0, rgb.1, rgb.2)
        } else if support.has_256 {
            // 256-color support (e.g., macOS Terminal): return a stable 16-255 index
            Color::Indexed(index256)
        } else {
            // Basic 16-color support: return the original ANSI variant
            self
        }
    }
}
