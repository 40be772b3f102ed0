// Core game model and configuration management
// Handles grid state, move validation, save/load, change listeners, and config persistence

use chrono::Local;
use directories::ProjectDirs;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Percentage chance that any given cell contains a mine in a fresh field
pub const PERCENT_MINED: u32 = 5;

/// One of the eight compass directions the player can step in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Heading {
    /// All headings in clockwise order starting from north
    pub const ALL: [Heading; 8] = [
        Heading::N,
        Heading::NE,
        Heading::E,
        Heading::SE,
        Heading::S,
        Heading::SW,
        Heading::W,
        Heading::NW,
    ];

    /// (row, col) offset applied by a step in this heading
    /// Row axis grows downward, so N is -1 and S is +1
    pub fn delta(self) -> (isize, isize) {
        match self {
            Heading::N => (-1, 0),
            Heading::NE => (-1, 1),
            Heading::E => (0, 1),
            Heading::SE => (1, 1),
            Heading::S => (1, 0),
            Heading::SW => (1, -1),
            Heading::W => (0, -1),
            Heading::NW => (-1, -1),
        }
    }
}

/// What a committed move did to the game
/// `MineHit` and `Victory` end the game; the step itself is never rolled back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Step,
    MineHit,
    Victory,
}

impl MoveOutcome {
    pub fn is_terminal(self) -> bool {
        matches!(self, MoveOutcome::MineHit | MoveOutcome::Victory)
    }
}

/// Errors raised by the model; all are recoverable by the caller.
/// `GameOver` and `OffGrid` reject a move without touching any state.
#[derive(Error, Debug)]
pub enum GameError {
    #[error("game has ended, no more moves allowed")]
    GameOver,
    #[error("cannot move off the grid")]
    OffGrid,
    #[error("bad save file: {0}")]
    Format(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type GameResult<T> = Result<T, GameError>;

/// Handle returned by `subscribe`, used to drop a listener again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

/// The minefield model: grid dimensions, mine and visited masks (row-major),
/// player position, and the game-over / unsaved-changes flags.
/// Registered listeners are called synchronously after every state change.
pub struct MineField {
    rows: usize,
    cols: usize,
    mines: Vec<bool>,   // fixed after construction
    visited: Vec<bool>, // cells are never unvisited again
    player: (usize, usize),
    game_over: bool,
    dirty: bool,
    listeners: Vec<(u64, Box<dyn FnMut()>)>,
    next_listener: u64,
}

impl std::fmt::Debug for MineField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MineField")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("mines", &self.mines)
            .field("visited", &self.visited)
            .field("player", &self.player)
            .field("game_over", &self.game_over)
            .field("dirty", &self.dirty)
            .field("listeners", &self.listeners.len())
            .field("next_listener", &self.next_listener)
            .finish()
    }
}

impl MineField {
    /// Create a fresh field with randomly placed mines (5% per cell).
    /// The player starts in the top-left corner, which counts as visited.
    /// No attempt is made to keep the start or goal cell clear, and a
    /// generated field may have no safe path at all.
    pub fn new(rows: usize, cols: usize) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        let mut rng = thread_rng();
        let mines = (0..rows * cols)
            .map(|_| rng.gen_range(0..100) < PERCENT_MINED)
            .collect();
        Self::from_parts(rows, cols, mines)
    }

    /// Create a field with an explicit mine layout; cells not listed are clear
    pub fn with_mines(rows: usize, cols: usize, mined: &[(usize, usize)]) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        let mut mines = vec![false; rows * cols];
        for &(r, c) in mined {
            if r < rows && c < cols {
                mines[r * cols + c] = true;
            }
        }
        Self::from_parts(rows, cols, mines)
    }

    fn from_parts(rows: usize, cols: usize, mines: Vec<bool>) -> Self {
        let mut visited = vec![false; rows * cols];
        visited[0] = true; // starting cell
        MineField {
            rows,
            cols,
            mines,
            visited,
            player: (0, 0),
            game_over: false,
            dirty: false,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    /// Convert (row, col) coordinates to a flat array index
    fn index(&self, r: usize, c: usize) -> usize {
        r * self.cols + c
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Player's current (row, col) position
    pub fn player(&self) -> (usize, usize) {
        self.player
    }

    pub fn is_visited(&self, r: usize, c: usize) -> bool {
        self.visited[self.index(r, c)]
    }

    pub fn is_mined(&self, r: usize, c: usize) -> bool {
        self.mines[self.index(r, c)]
    }

    /// True once the player has stepped on a mine or reached the goal
    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// True while the model holds changes not yet written to disk
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The goal cell: bottom-right corner of the grid
    pub fn goal(&self) -> (usize, usize) {
        (self.rows - 1, self.cols - 1)
    }

    /// Count mines among the up-to-8 in-bounds neighbors of (r, c).
    /// Display only; a 1x1 grid has no neighbors so the count is 0.
    pub fn neighbor_mine_count(&self, r: usize, c: usize) -> u8 {
        let mut count = 0u8;
        for nr in r.saturating_sub(1)..=(r + 1).min(self.rows - 1) {
            for nc in c.saturating_sub(1)..=(c + 1).min(self.cols - 1) {
                if nr == r && nc == c {
                    continue;
                }
                if self.mines[self.index(nr, nc)] {
                    count += 1;
                }
            }
        }
        count
    }

    /// Step the player one cell in the given heading.
    ///
    /// Rejected without any state change when the game is already over
    /// (`GameError::GameOver`) or the destination lies outside the grid
    /// (`GameError::OffGrid`). Otherwise the move commits: the player
    /// position updates, the destination is marked visited, the model
    /// becomes dirty, and listeners are notified. A committed move onto a
    /// mine or onto the goal cell additionally ends the game and reports
    /// `MineHit` / `Victory`; a plain step reports `Step`.
    pub fn advance(&mut self, heading: Heading) -> GameResult<MoveOutcome> {
        if self.game_over {
            return Err(GameError::GameOver);
        }

        let (dr, dc) = heading.delta();
        let new_r = self.player.0 as isize + dr;
        let new_c = self.player.1 as isize + dc;
        if new_r < 0 || new_r >= self.rows as isize || new_c < 0 || new_c >= self.cols as isize {
            return Err(GameError::OffGrid);
        }
        let (new_r, new_c) = (new_r as usize, new_c as usize);

        // the move is legal; commit it before checking what it landed on
        self.player = (new_r, new_c);
        let idx = self.index(new_r, new_c);
        self.visited[idx] = true;
        self.dirty = true;

        let outcome = if self.mines[idx] {
            self.game_over = true;
            MoveOutcome::MineHit
        } else if (new_r, new_c) == self.goal() {
            self.game_over = true;
            MoveOutcome::Victory
        } else {
            MoveOutcome::Step
        };

        self.notify();
        Ok(outcome)
    }

    /// Register a callback invoked after every state change.
    /// Listeners run synchronously in registration order.
    pub fn subscribe(&mut self, callback: Box<dyn FnMut()>) -> ListenerId {
        let id = self.next_listener;
        self.next_listener += 1;
        self.listeners.push((id, callback));
        ListenerId(id)
    }

    /// Drop a previously registered listener; unknown ids are ignored
    pub fn unsubscribe(&mut self, id: ListenerId) {
        self.listeners.retain(|(lid, _)| *lid != id.0);
    }

    fn notify(&mut self) {
        for (_, callback) in &mut self.listeners {
            callback();
        }
    }

    /// Serialize the field to the line-oriented save format:
    /// rows, cols, player row, player col, game-over flag, then the mine
    /// grid and the visited grid as rows of '0'/'1' characters.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\n", self.rows));
        out.push_str(&format!("{}\n", self.cols));
        out.push_str(&format!("{}\n", self.player.0));
        out.push_str(&format!("{}\n", self.player.1));
        out.push_str(&format!("{}\n", self.game_over));
        for grid in [&self.mines, &self.visited] {
            for r in 0..self.rows {
                for c in 0..self.cols {
                    out.push(if grid[r * self.cols + c] { '1' } else { '0' });
                }
                out.push('\n');
            }
        }
        out
    }

    /// Parse a field from the save format. Any missing line, malformed
    /// number, short grid row, or unknown cell character fails with
    /// `GameError::Format` and produces no model. A parsed model is clean
    /// (not dirty) and carries no listeners.
    pub fn from_text(text: &str) -> GameResult<MineField> {
        let mut lines = text.lines();

        let rows = parse_count(&mut lines, "row count")?;
        let cols = parse_count(&mut lines, "column count")?;
        if rows == 0 || cols == 0 {
            return Err(GameError::Format("grid dimensions must be positive".into()));
        }
        let player_r = parse_count(&mut lines, "player row")?;
        let player_c = parse_count(&mut lines, "player column")?;
        if player_r >= rows || player_c >= cols {
            return Err(GameError::Format(format!(
                "player position ({}, {}) outside {}x{} grid",
                player_r, player_c, rows, cols
            )));
        }
        let game_over = match next_line(&mut lines, "game-over flag")?.trim() {
            "true" => true,
            "false" => false,
            other => {
                return Err(GameError::Format(format!("bad game-over flag: {:?}", other)));
            }
        };

        let mines = parse_grid(&mut lines, rows, cols, "mine grid")?;
        let mut visited = parse_grid(&mut lines, rows, cols, "visited grid")?;
        // keep the invariant even for hand-edited files
        visited[player_r * cols + player_c] = true;

        Ok(MineField {
            rows,
            cols,
            mines,
            visited,
            player: (player_r, player_c),
            game_over,
            dirty: false,
            listeners: Vec::new(),
            next_listener: 0,
        })
    }

    /// Write the field to a file; clears the dirty flag on success
    pub fn save(&mut self, path: &Path) -> GameResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_text())?;
        self.dirty = false;
        Ok(())
    }

    /// Read a field from a file; a loaded field is clean (not dirty)
    pub fn load(path: &Path) -> GameResult<MineField> {
        let text = fs::read_to_string(path)?;
        Self::from_text(&text)
    }
}

fn next_line<'t>(lines: &mut std::str::Lines<'t>, what: &str) -> GameResult<&'t str> {
    lines
        .next()
        .ok_or_else(|| GameError::Format(format!("file ends before {}", what)))
}

fn parse_count(lines: &mut std::str::Lines<'_>, what: &str) -> GameResult<usize> {
    let s = next_line(lines, what)?;
    s.trim()
        .parse::<usize>()
        .map_err(|_| GameError::Format(format!("bad {}: {:?}", what, s)))
}

// Reads `rows` lines of exactly `cols` occurrences of '0'/'1' into a flat mask
fn parse_grid(
    lines: &mut std::str::Lines<'_>,
    rows: usize,
    cols: usize,
    what: &str,
) -> GameResult<Vec<bool>> {
    let mut grid = Vec::with_capacity(rows * cols);
    for r in 0..rows {
        let line = next_line(lines, what)?;
        let mut cells = 0;
        for ch in line.chars().take(cols) {
            match ch {
                '1' => grid.push(true),
                '0' => grid.push(false),
                other => {
                    return Err(GameError::Format(format!(
                        "bad cell {:?} in {} row {}",
                        other, what, r
                    )));
                }
            }
            cells += 1;
        }
        if cells < cols {
            return Err(GameError::Format(format!(
                "{} row {} has {} cells, expected {}",
                what, r, cells, cols
            )));
        }
    }
    Ok(grid)
}

/// User configuration and running win/loss tally
/// Persisted to disk as TOML
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Default board dimensions for new games
    pub rows: usize,
    pub cols: usize,

    // Game preferences
    pub ascii_icons: bool, // Use ASCII fallback icons
    pub language: String,  // Language code ("en" or "zh")

    // Lifetime results
    pub wins: u32,
    pub losses: u32,
    pub last_win: Option<String>, // Date of most recent win (YYYY-MM-DD)
}

impl Default for Config {
    fn default() -> Self {
        // Auto-detect system language on first run
        let system_lang = sys_locale::get_locale().unwrap_or_else(|| "en".to_string());
        let lang = if system_lang.to_lowercase().starts_with("zh") {
            "zh".to_string()
        } else {
            "en".to_string()
        };

        Config {
            rows: 10,
            cols: 10,
            ascii_icons: false,
            language: lang,
            wins: 0,
            losses: 0,
            last_win: None,
        }
    }
}

impl Config {
    pub fn record_win(&mut self) {
        self.wins += 1;
        self.last_win = Some(Local::now().format("%Y-%m-%d").to_string());
    }

    pub fn record_loss(&mut self) {
        self.losses += 1;
    }
}

/// Get the configuration file path
/// Uses the platform config directory (e.g. ~/.config/xtmnfld/xtmnfld.toml on Linux)
/// Falls back to the current directory if ProjectDirs is unavailable
pub fn config_path() -> Option<PathBuf> {
    let exe = env::current_exe().ok()?;
    let name = exe.file_stem()?.to_str()?.to_string();
    if let Some(proj) = ProjectDirs::from("com", "xhbl", name.as_str()) {
        let mut path = proj.config_dir().to_path_buf();
        path.push(format!("{}.toml", name));
        Some(path)
    } else {
        let mut path = env::current_dir().ok()?;
        path.push(format!("{}.toml", name));
        Some(path)
    }
}

/// Load configuration from disk, or create the default one if not found
pub fn load_or_create_config() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };
    if let Ok(s) = fs::read_to_string(&path) {
        if let Ok(cfg) = toml::from_str::<Config>(&s) {
            return cfg;
        }
    }
    let cfg = Config::default();
    save_config(&cfg);
    cfg
}

/// Save configuration to disk as TOML; config errors are not fatal
pub fn save_config(cfg: &Config) {
    if let Some(path) = config_path() {
        if let Ok(s) = toml::to_string(cfg) {
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            let _ = fs::write(&path, s);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn fresh_field_starts_at_origin_visited_and_clean() {
        let field = MineField::with_mines(5, 7, &[]);
        assert_eq!(field.player(), (0, 0));
        assert!(field.is_visited(0, 0));
        assert!(!field.is_game_over());
        assert!(!field.is_dirty());
        assert_eq!(field.goal(), (4, 6));
    }

    #[test]
    fn step_onto_goal_corner_is_victory() {
        let mut field = MineField::with_mines(2, 2, &[]);
        let outcome = field.advance(Heading::SE).unwrap();
        assert_eq!(outcome, MoveOutcome::Victory);
        assert_eq!(field.player(), (1, 1));
        assert!(field.is_game_over());
        assert!(field.is_visited(1, 1));
    }

    #[test]
    fn step_onto_mine_commits_before_ending_the_game() {
        let mut field = MineField::with_mines(3, 3, &[(0, 1)]);
        let outcome = field.advance(Heading::E).unwrap();
        assert_eq!(outcome, MoveOutcome::MineHit);
        assert!(field.is_game_over());
        // the fatal step itself is not rolled back
        assert_eq!(field.player(), (0, 1));
        assert!(field.is_visited(0, 1));
        assert!(field.is_dirty());
    }

    #[test]
    fn off_grid_step_changes_nothing() {
        let mut field = MineField::with_mines(3, 3, &[(1, 1)]);
        let err = field.advance(Heading::N).unwrap_err();
        assert!(matches!(err, GameError::OffGrid));
        assert_eq!(field.player(), (0, 0));
        assert!(!field.is_dirty());
        let visited: usize = (0..3)
            .flat_map(|r| (0..3).map(move |c| (r, c)))
            .filter(|&(r, c)| field.is_visited(r, c))
            .count();
        assert_eq!(visited, 1);
    }

    #[test]
    fn no_moves_accepted_after_game_over() {
        let mut field = MineField::with_mines(2, 2, &[]);
        field.advance(Heading::SE).unwrap();
        let before = field.to_text();
        for heading in Heading::ALL {
            let err = field.advance(heading).unwrap_err();
            assert!(matches!(err, GameError::GameOver));
        }
        assert_eq!(field.to_text(), before);
    }

    #[test]
    fn quiet_step_marks_dirty_and_visits_destination() {
        let mut field = MineField::with_mines(3, 3, &[]);
        let outcome = field.advance(Heading::E).unwrap();
        assert_eq!(outcome, MoveOutcome::Step);
        assert!(!field.is_game_over());
        assert!(field.is_dirty());
        assert!(field.is_visited(0, 1));
    }

    #[test]
    fn every_in_bounds_move_yields_one_outcome_and_visits() {
        // from the center of a mine-free 3x3, every heading is in bounds
        for heading in Heading::ALL {
            let mut field = MineField::with_mines(3, 3, &[]);
            field.advance(Heading::E).unwrap();
            field.advance(Heading::SW).unwrap();
            assert_eq!(field.player(), (1, 0));
            field.advance(Heading::E).unwrap();
            assert_eq!(field.player(), (1, 1));

            let (dr, dc) = heading.delta();
            let dest = ((1 + dr) as usize, (1 + dc) as usize);
            let outcome = field.advance(heading).unwrap();
            match outcome {
                MoveOutcome::Victory => assert_eq!(dest, (2, 2)),
                MoveOutcome::Step => assert_ne!(dest, (2, 2)),
                MoveOutcome::MineHit => panic!("no mines were placed"),
            }
            assert!(field.is_visited(dest.0, dest.1));
        }
    }

    #[test]
    fn neighbor_count_on_single_cell_grid_is_zero() {
        let field = MineField::with_mines(1, 1, &[]);
        assert_eq!(field.neighbor_mine_count(0, 0), 0);
    }

    #[test]
    fn neighbor_count_scans_only_in_bounds_neighbors() {
        let field = MineField::with_mines(3, 3, &[(0, 0), (0, 1), (2, 2), (1, 1)]);
        // interior cell sees all of its mined neighbors but not itself
        assert_eq!(field.neighbor_mine_count(1, 1), 3);
        // corner cell has only three neighbors
        assert_eq!(field.neighbor_mine_count(0, 0), 2);
        // edge cell next to the mined corner
        assert_eq!(field.neighbor_mine_count(2, 1), 2);
    }

    #[test]
    fn text_round_trip_reproduces_the_field() {
        let mut field = MineField::with_mines(3, 4, &[(0, 2), (2, 0)]);
        field.advance(Heading::SE).unwrap();
        field.advance(Heading::E).unwrap();
        assert!(field.is_dirty());

        let text = field.to_text();
        let loaded = MineField::from_text(&text).unwrap();
        assert_eq!(loaded.rows(), 3);
        assert_eq!(loaded.cols(), 4);
        assert_eq!(loaded.player(), field.player());
        assert_eq!(loaded.is_game_over(), field.is_game_over());
        for r in 0..3 {
            for c in 0..4 {
                assert_eq!(loaded.is_mined(r, c), field.is_mined(r, c));
                assert_eq!(loaded.is_visited(r, c), field.is_visited(r, c));
            }
        }
        assert!(!loaded.is_dirty());
        assert_eq!(loaded.to_text(), text);
    }

    #[test]
    fn save_clears_the_dirty_flag() {
        let mut field = MineField::with_mines(2, 3, &[(1, 0)]);
        field.advance(Heading::E).unwrap();
        assert!(field.is_dirty());

        let mut path = env::temp_dir();
        path.push(format!("xtmnfld-test-{}.mf", std::process::id()));
        field.save(&path).unwrap();
        assert!(!field.is_dirty());

        let loaded = MineField::load(&path).unwrap();
        assert_eq!(loaded.player(), (0, 1));
        assert!(!loaded.is_dirty());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn truncated_text_is_a_format_error() {
        let err = MineField::from_text("3\n3\n0\n0\n").unwrap_err();
        assert!(matches!(err, GameError::Format(_)));
    }

    #[test]
    fn short_grid_row_is_a_format_error() {
        let text = "2\n2\n0\n0\nfalse\n00\n0\n00\n00\n";
        let err = MineField::from_text(text).unwrap_err();
        assert!(matches!(err, GameError::Format(_)));
    }

    #[test]
    fn unknown_cell_character_is_a_format_error() {
        let text = "2\n2\n0\n0\nfalse\n0x\n00\n10\n00\n";
        let err = MineField::from_text(text).unwrap_err();
        assert!(matches!(err, GameError::Format(_)));
    }

    #[test]
    fn player_outside_grid_is_a_format_error() {
        let text = "2\n2\n5\n0\nfalse\n00\n00\n10\n00\n";
        let err = MineField::from_text(text).unwrap_err();
        assert!(matches!(err, GameError::Format(_)));
    }

    #[test]
    fn bad_game_over_flag_is_a_format_error() {
        let text = "2\n2\n0\n0\nmaybe\n00\n00\n10\n00\n";
        let err = MineField::from_text(text).unwrap_err();
        assert!(matches!(err, GameError::Format(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = MineField::load(Path::new("/nonexistent/xtmnfld.mf")).unwrap_err();
        assert!(matches!(err, GameError::Io(_)));
    }

    #[test]
    fn parsed_player_cell_counts_as_visited() {
        // visited grid claims the player cell was never entered
        let text = "2\n2\n0\n1\nfalse\n00\n00\n10\n00\n";
        let loaded = MineField::from_text(text).unwrap();
        assert!(loaded.is_visited(0, 1));
    }

    #[test]
    fn listeners_fire_in_registration_order_until_unsubscribed() {
        let mut field = MineField::with_mines(3, 3, &[]);
        let calls = Rc::new(RefCell::new(Vec::new()));

        let log = Rc::clone(&calls);
        let first = field.subscribe(Box::new(move || log.borrow_mut().push(1)));
        let log = Rc::clone(&calls);
        field.subscribe(Box::new(move || log.borrow_mut().push(2)));

        field.advance(Heading::E).unwrap();
        assert_eq!(*calls.borrow(), vec![1, 2]);

        field.unsubscribe(first);
        field.advance(Heading::S).unwrap();
        assert_eq!(*calls.borrow(), vec![1, 2, 2]);
    }

    #[test]
    fn rejected_moves_do_not_notify() {
        let mut field = MineField::with_mines(2, 2, &[]);
        let calls = Rc::new(RefCell::new(0));
        let count = Rc::clone(&calls);
        field.subscribe(Box::new(move || *count.borrow_mut() += 1));

        assert!(field.advance(Heading::N).is_err());
        assert_eq!(*calls.borrow(), 0);

        field.advance(Heading::SE).unwrap();
        assert_eq!(*calls.borrow(), 1);

        assert!(field.advance(Heading::S).is_err());
        assert_eq!(*calls.borrow(), 1);
    }
}
