// Entry point for the Mine Field TUI application
// Initializes configuration, language settings, and launches the main UI

use std::error::Error;

// Module declarations
mod xtm_color; // Cross-platform color matching utilities
mod xtm_game; // Core game model, save/load, and configuration
mod xtm_lang; // Multi-language string resources
mod xtm_ui; // Terminal UI rendering and event handling

use xtm_game::load_or_create_config;
use xtm_lang::Lang;
use xtm_ui::run as run_ui;

fn main() -> Result<(), Box<dyn Error>> {
    // Load or create user configuration (board size, preferences, tallies)
    let mut cfg = load_or_create_config();

    // Initialize language resources based on saved or system language
    let mut lang = Lang::new(&cfg.language);

    // Launch the main UI loop
    run_ui(&mut cfg, &mut lang)
}
