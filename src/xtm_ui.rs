use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Span, Spans, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use std::cell::Cell;
use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::xtm_color::WTMatch;
use crate::xtm_game::{Config, GameError, Heading, MineField, MoveOutcome, save_config};
use crate::xtm_lang::Lang;
use unicode_width::UnicodeWidthStr;

/// Fill a localized template, replacing one "{}" per argument in order
fn tfmt(template: &str, args: &[&str]) -> String {
    let mut s = template.to_string();
    for a in args {
        s = s.replacen("{}", a, 1);
    }
    s
}

// Action deferred until the user resolves the unsaved-changes prompt
#[derive(Debug, Clone, Copy, PartialEq)]
enum PendingAction {
    New,
    Open,
    Exit,
    Size,
}

// Which file dialog the filename input belongs to
#[derive(Debug, Clone, Copy, PartialEq)]
enum FileAction {
    Open,
    SaveAs,
}

// Group runtime UI variables into a single structure to simplify passing them around
#[derive(Debug)]
struct UiState {
    showing_help: bool,
    showing_about: bool,
    showing_options: bool,
    showing_win: bool,
    showing_loss: bool,
    // open/save failure text for the error modal
    error_msg: Option<String>,
    // short-lived message in the status row (off-grid step etc.)
    status_note: Option<(String, Instant)>,
    // unsaved-changes prompt and the action waiting behind it
    confirm_pending: Option<PendingAction>,
    // action re-armed after a forced save-as completes
    resume_after_save: Option<PendingAction>,
    file_input: Option<FileAction>,
    file_input_str: String,
    showing_size: bool,
    size_input_mode: u8, // 0=rows, 1=cols
    size_rows_str: String,
    size_cols_str: String,
    size_invalid_field: Option<(u8, Instant)>,
    options_focus: u8, // 0=ascii icons, 1=language
    // tally already updated for the current game
    result_recorded: bool,
}

impl UiState {
    fn new() -> Self {
        UiState {
            showing_help: false,
            showing_about: false,
            showing_options: false,
            showing_win: false,
            showing_loss: false,
            error_msg: None,
            status_note: None,
            confirm_pending: None,
            resume_after_save: None,
            file_input: None,
            file_input_str: String::new(),
            showing_size: false,
            size_input_mode: 0,
            size_rows_str: String::new(),
            size_cols_str: String::new(),
            size_invalid_field: None,
            options_focus: 0,
            result_recorded: false,
        }
    }

    fn reset_after_new_game(&mut self) {
        self.showing_help = false;
        self.showing_about = false;
        self.showing_options = false;
        self.showing_win = false;
        self.showing_loss = false;
        self.error_msg = None;
        self.status_note = None;
        self.confirm_pending = None;
        self.resume_after_save = None;
        self.file_input = None;
        self.file_input_str.clear();
        self.showing_size = false;
        self.size_invalid_field = None;
        self.result_recorded = false;
    }

    fn modal_open(&self) -> bool {
        self.showing_help
            || self.showing_about
            || self.showing_options
            || self.showing_win
            || self.showing_loss
            || self.showing_size
            || self.error_msg.is_some()
            || self.confirm_pending.is_some()
            || self.file_input.is_some()
    }
}

// Register the repaint hook on a model so views refresh whenever it changes
fn attach_repaint(model: &mut MineField, repaint: &Rc<Cell<bool>>) {
    let hook = Rc::clone(repaint);
    model.subscribe(Box::new(move || hook.set(true)));
}

// Apply one step to the model and surface the outcome in the UI
fn step(model: &mut MineField, heading: Heading, cfg: &mut Config, ui: &mut UiState, lang: &Lang) {
    match model.advance(heading) {
        Ok(MoveOutcome::Step) => {}
        Ok(MoveOutcome::MineHit) => {
            if !ui.result_recorded {
                cfg.record_loss();
                save_config(cfg);
                ui.result_recorded = true;
            }
            ui.showing_loss = true;
        }
        Ok(MoveOutcome::Victory) => {
            if !ui.result_recorded {
                cfg.record_win();
                save_config(cfg);
                ui.result_recorded = true;
            }
            ui.showing_win = true;
        }
        Err(GameError::OffGrid) => {
            ui.status_note = Some((lang.assets.status_off_grid.to_string(), Instant::now()));
        }
        Err(GameError::GameOver) => {
            ui.status_note = Some((lang.assets.status_game_over.to_string(), Instant::now()));
        }
        Err(_) => {}
    }
}

// Save to the current file, or fall into the save-as prompt when there is none.
// Returns true only when the model actually reached disk.
fn save_now(
    model: &mut MineField,
    current_file: &Option<PathBuf>,
    ui: &mut UiState,
    lang: &Lang,
) -> bool {
    match current_file {
        Some(path) => match model.save(path) {
            Ok(()) => true,
            Err(e) => {
                ui.error_msg = Some(tfmt(lang.assets.err_save_fmt, &[&e.to_string()]));
                false
            }
        },
        None => {
            ui.file_input = Some(FileAction::SaveAs);
            ui.file_input_str.clear();
            false
        }
    }
}

// Carry out an action once any unsaved-changes handling is behind us
fn proceed(
    action: PendingAction,
    model: &mut MineField,
    current_file: &mut Option<PathBuf>,
    cfg: &Config,
    ui: &mut UiState,
    repaint: &Rc<Cell<bool>>,
    exit_requested: &mut bool,
) {
    match action {
        PendingAction::New => {
            *model = MineField::new(cfg.rows, cfg.cols);
            attach_repaint(model, repaint);
            *current_file = None;
            ui.reset_after_new_game();
        }
        PendingAction::Open => {
            ui.file_input = Some(FileAction::Open);
            ui.file_input_str.clear();
        }
        PendingAction::Exit => {
            *exit_requested = true;
        }
        PendingAction::Size => {
            ui.showing_size = true;
            ui.size_input_mode = 0;
            ui.size_rows_str = format!("{}", cfg.rows);
            ui.size_cols_str = format!("{}", cfg.cols);
            ui.size_invalid_field = None;
        }
    }
}

// Route an action through the unsaved-changes prompt when the model is dirty
fn request(
    action: PendingAction,
    model: &mut MineField,
    current_file: &mut Option<PathBuf>,
    cfg: &Config,
    ui: &mut UiState,
    repaint: &Rc<Cell<bool>>,
    exit_requested: &mut bool,
) {
    if model.is_dirty() {
        ui.confirm_pending = Some(action);
    } else {
        proceed(action, model, current_file, cfg, ui, repaint, exit_requested);
    }
}

pub fn run(cfg: &mut Config, lang: &mut Lang) -> Result<(), Box<dyn Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut model = MineField::new(cfg.rows, cfg.cols);
    // the view redraws when the model reports a change, or when the UI itself changes
    let repaint = Rc::new(Cell::new(true));
    attach_repaint(&mut model, &repaint);

    let mut ui = UiState::new();
    let mut current_file: Option<PathBuf> = None;
    let mut exit_requested = false;

    // Glyph computation helper: compute glyphs based on ascii_icons setting.
    let make_glyphs = |ascii: bool| {
        (
            (if ascii { "▪" } else { "■" }, Color::Gray.wtmatch()), // unvisited
            (if ascii { "*" } else { "☼" }, Color::Black.wtmatch()), // mine
            (if ascii { "$" } else { "◎" }, Color::Green.wtmatch()), // goal
        )
    };
    let g_init = make_glyphs(cfg.ascii_icons);
    let mut glyph_unvisited = g_init.0;
    let mut glyph_mine = g_init.1;
    let mut glyph_goal = g_init.2;

    // Centralized color definitions
    let board_bg = Color::DarkGray.wtmatch();
    let player_bg = Color::White.wtmatch();
    let player_lost_bg = Color::Red.wtmatch();
    let visited_bg = Color::Gray.wtmatch();
    let count_fg = Color::Blue.wtmatch();
    let menu_key_fg = Color::Yellow.wtmatch();
    let note_fg = Color::LightRed.wtmatch();
    let input_bg = Color::DarkGray.wtmatch();
    let input_focus = Style::default()
        .bg(Color::Yellow.wtmatch())
        .fg(Color::Black.wtmatch());

    let tick_rate = Duration::from_millis(200);

    loop {
        let a = lang.assets.clone();
        // Centralized menu/key items (key, rest). Esc lives in the status row.
        let menu_items = [
            ("F1", a.menu_help),
            ("F2", a.menu_new),
            ("F3", a.menu_open),
            ("F4", a.menu_save),
            ("F5", a.menu_save_as),
            ("F6", a.menu_size),
            ("F7", a.menu_options),
            ("F9", a.menu_about),
        ];

        if repaint.get() {
            terminal.draw(|f| {
                let size = f.size();
                let min_twidth = 80u16;
                let min_theight = 24u16 + (model.rows().saturating_sub(16)) as u16;
                // If terminal too small, render a centered warning and skip normal UI
                if size.width < min_twidth || size.height < min_theight {
                    let warn_lines = vec![
                        Spans::from(Span::raw(a.tsmsg_line1)),
                        Spans::from(Span::raw(tfmt(
                            a.tsmsg_line2,
                            &[&min_twidth.to_string(), &min_theight.to_string()],
                        ))),
                    ];
                    let warn = Paragraph::new(Text::from(warn_lines))
                        .block(Block::default().borders(Borders::ALL).title(a.tsmsg_title))
                        .alignment(Alignment::Center);
                    f.render_widget(Clear, size);
                    let w = 40u16.min(size.width.saturating_sub(2));
                    let h = 5u16.min(size.height.saturating_sub(2));
                    f.render_widget(warn, center_rect(w, h, size));
                    return;
                }

                // layout: top menu row, center board, bottom status
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .margin(0)
                    .constraints(
                        [
                            Constraint::Length(3),
                            Constraint::Min(6),
                            Constraint::Length(3),
                        ]
                        .as_ref(),
                    )
                    .split(size);

                // menu row
                let mut spans_vec: Vec<Span> = vec![Span::raw(" ")];
                for (i, (label_key, label_rest)) in menu_items.iter().enumerate() {
                    if i > 0 {
                        spans_vec.push(Span::raw("  "));
                    }
                    spans_vec.push(Span::styled(
                        label_key.to_string(),
                        Style::default().fg(menu_key_fg).add_modifier(Modifier::BOLD),
                    ));
                    spans_vec.push(Span::raw(format!(":{}", label_rest)));
                }
                spans_vec.push(Span::raw(" "));
                let menu = Paragraph::new(Spans::from(spans_vec))
                    .block(Block::default().borders(Borders::ALL))
                    .alignment(Alignment::Left);
                f.render_widget(menu, chunks[0]);

                // status row (left info + right-aligned Esc: Exit)
                let (pr, pc) = model.player();
                let mut left_text = tfmt(
                    a.status_pos_fmt,
                    &[
                        &pr.to_string(),
                        &pc.to_string(),
                        &model.neighbor_mine_count(pr, pc).to_string(),
                    ],
                );
                if model.is_dirty() {
                    left_text.push_str(a.status_modified);
                    left_text.push(' ');
                }
                left_text.push_str(&tfmt(
                    a.status_tally_fmt,
                    &[&cfg.wins.to_string(), &cfg.losses.to_string()],
                ));
                left_text.push(' ');
                let note_text = if let Some((note, _)) = &ui.status_note {
                    note.clone()
                } else if model.is_game_over() {
                    if model.player() == model.goal() && !model.is_mined(pr, pc) {
                        a.status_won.to_string()
                    } else {
                        a.status_lost.to_string()
                    }
                } else {
                    String::new()
                };
                let right_key = "Esc";
                let right_rest = a.menu_exit;
                let inner_w = chunks[2].width.saturating_sub(2) as usize;
                let left_w = left_text.as_str().width() + note_text.as_str().width();
                // account for the ": " we add when rendering the right-hand key/rest
                let right_w = right_key.width() + 2 + right_rest.width();
                let mid_spaces = if inner_w > left_w + right_w + 1 {
                    inner_w - left_w - right_w - 1
                } else {
                    1
                };
                let mut status_spans: Vec<Span> = Vec::new();
                status_spans.push(Span::raw(left_text));
                status_spans.push(Span::styled(
                    note_text,
                    Style::default().fg(note_fg).add_modifier(Modifier::BOLD),
                ));
                status_spans.push(Span::raw(" ".repeat(mid_spaces)));
                status_spans.push(Span::styled(
                    right_key.to_string(),
                    Style::default().fg(menu_key_fg).add_modifier(Modifier::BOLD),
                ));
                status_spans.push(Span::raw(format!(": {}", right_rest)));
                status_spans.push(Span::raw(" "));
                let status = Paragraph::new(Text::from(Spans::from(status_spans)))
                    .block(Block::default().borders(Borders::ALL))
                    .alignment(Alignment::Left);
                f.render_widget(status, chunks[2]);

                // board area
                let board_area = centered_block(
                    ((model.cols() * 2) as u16) + 3,
                    (model.rows() as u16) + 2,
                    chunks[1],
                );
                let lost = model.is_game_over()
                    && model.is_mined(model.player().0, model.player().1);
                let mut lines = vec![];
                for r in 0..model.rows() {
                    let mut spans = vec![];
                    for c in 0..model.cols() {
                        let mut s = glyph_unvisited.0.to_string();
                        let mut style = Style::default().fg(glyph_unvisited.1).bg(board_bg);
                        if model.is_visited(r, c) {
                            // visited cells show their neighbor-mine count
                            s = format!("{}", model.neighbor_mine_count(r, c));
                            style = Style::default().fg(count_fg).bg(visited_bg);
                        } else if (r, c) == model.goal() {
                            s = glyph_goal.0.to_string();
                            style = Style::default()
                                .fg(glyph_goal.1)
                                .bg(board_bg)
                                .add_modifier(Modifier::BOLD);
                        } else if model.is_game_over() && model.is_mined(r, c) {
                            // reveal remaining mines once the game has ended
                            s = glyph_mine.0.to_string();
                            style = Style::default().fg(note_fg).bg(board_bg);
                        }
                        if (r, c) == model.player() {
                            if lost {
                                s = glyph_mine.0.to_string();
                                style = Style::default().fg(glyph_mine.1).bg(player_lost_bg);
                            } else {
                                style = style.bg(player_bg).fg(Color::Black.wtmatch());
                            }
                        }
                        spans.push(Span::styled(format!(" {}", s), style));
                    }
                    // right-side padding column in the board background
                    spans.push(Span::styled(" ", Style::default().bg(board_bg)));
                    lines.push(Spans::from(spans));
                }
                let board = Paragraph::new(Text::from(lines))
                    .block(
                        Block::default()
                            .borders(Borders::ALL)
                            .title(a.app_title)
                            .title_alignment(Alignment::Center),
                    )
                    .alignment(Alignment::Left);
                f.render_widget(board, board_area);

                // modals
                if ui.showing_help {
                    let mrect = centered_block(52, 12, size);
                    f.render_widget(Clear, mrect);
                    f.render_widget(
                        Block::default().borders(Borders::ALL).title(a.menu_help),
                        mrect,
                    );
                    let inner = inner_rect(mrect);
                    let help_lines = vec![
                        Spans::from(Span::raw("")),
                        Spans::from(Span::raw(a.help_goal)),
                        Spans::from(Span::raw(a.help_numbers)),
                        Spans::from(Span::raw("")),
                        Spans::from(Span::raw(a.help_controls)),
                        Spans::from(Span::raw(a.help_move_straight)),
                        Spans::from(Span::raw(a.help_move_diagonal)),
                        Spans::from(Span::raw(a.help_files)),
                    ];
                    let p = Paragraph::new(Text::from(help_lines)).alignment(Alignment::Left);
                    f.render_widget(p, inner);
                    render_button(f, inner, a.btn_close);
                }

                if ui.showing_about {
                    let mrect = centered_block(48, 9, size);
                    f.render_widget(Clear, mrect);
                    f.render_widget(
                        Block::default().borders(Borders::ALL).title(a.menu_about),
                        mrect,
                    );
                    let inner = inner_rect(mrect);
                    let lines = vec![
                        Spans::from(Span::raw("")),
                        Spans::from(Span::raw(a.about_description)),
                        Spans::from(Span::raw("")),
                        Spans::from(Span::raw(tfmt(
                            a.about_version_fmt,
                            &[env!("CARGO_PKG_VERSION"), env!("CARGO_PKG_AUTHORS")],
                        ))),
                    ];
                    let p = Paragraph::new(Text::from(lines)).alignment(Alignment::Center);
                    f.render_widget(p, inner);
                    render_button(f, inner, a.btn_close);
                }

                if ui.showing_options {
                    let mrect = centered_block(30, 7, size);
                    f.render_widget(Clear, mrect);
                    f.render_widget(
                        Block::default().borders(Borders::ALL).title(a.menu_options),
                        mrect,
                    );
                    let inner = inner_rect(mrect);
                    let cb = if cfg.ascii_icons { "[x]" } else { "[ ]" };
                    let lang_name = if lang.current_lang == "zh" {
                        a.lang_chinese
                    } else {
                        a.lang_english
                    };
                    let focus_style = Style::default()
                        .bg(Color::LightBlue.wtmatch())
                        .fg(Color::Black.wtmatch())
                        .add_modifier(Modifier::BOLD);
                    let row0 = format!("{} {}", cb, a.opt_ascii_icons);
                    let row1 = format!("{}: {}", a.opt_language, lang_name);
                    let lines = vec![
                        Spans::from(Span::raw("")),
                        Spans::from(vec![
                            Span::raw(" "),
                            if ui.options_focus == 0 {
                                Span::styled(row0, focus_style)
                            } else {
                                Span::raw(row0)
                            },
                        ]),
                        Spans::from(vec![
                            Span::raw(" "),
                            if ui.options_focus == 1 {
                                Span::styled(row1, focus_style)
                            } else {
                                Span::raw(row1)
                            },
                        ]),
                    ];
                    let p = Paragraph::new(Text::from(lines)).alignment(Alignment::Left);
                    f.render_widget(p, inner);
                    render_button(f, inner, a.btn_ok);
                }

                if ui.showing_size {
                    let mrect = centered_block(36, 8, size);
                    f.render_widget(Clear, mrect);
                    f.render_widget(
                        Block::default().borders(Borders::ALL).title(a.menu_size),
                        mrect,
                    );
                    let inner = inner_rect(mrect);
                    let label_width = 16usize;
                    let is_flashing = ui
                        .size_invalid_field
                        .map(|(_, t0)| t0.elapsed() < Duration::from_millis(600))
                        .unwrap_or(false);
                    let flash_style =
                        Style::default().fg(note_fg).add_modifier(Modifier::BOLD);

                    let mut lines = vec![Spans::from(Span::raw(""))];
                    for (i, (label, value)) in [
                        (a.size_rows_label, &ui.size_rows_str),
                        (a.size_cols_label, &ui.size_cols_str),
                    ]
                    .iter()
                    .enumerate()
                    {
                        let field_style = if ui.size_input_mode == i as u8 {
                            input_focus
                        } else {
                            Style::default().bg(input_bg)
                        };
                        let label_style = if is_flashing
                            && ui.size_invalid_field.map(|(fi, _)| fi) == Some(i as u8)
                        {
                            flash_style
                        } else {
                            Style::default()
                        };
                        lines.push(Spans::from(vec![
                            Span::raw(" "),
                            Span::styled(
                                format!("{:<width$}", label, width = label_width),
                                label_style,
                            ),
                            Span::styled(format!("{:<3}", value), field_style),
                        ]));
                        lines.push(Spans::from(Span::raw("")));
                    }
                    let p = Paragraph::new(Text::from(lines)).alignment(Alignment::Left);
                    f.render_widget(p, inner);
                    render_button(f, inner, a.btn_ok);
                }

                if let Some(action) = ui.file_input {
                    let title = match action {
                        FileAction::Open => a.file_open_title,
                        FileAction::SaveAs => a.file_save_title,
                    };
                    let mrect = centered_block(56, 7, size);
                    f.render_widget(Clear, mrect);
                    f.render_widget(Block::default().borders(Borders::ALL).title(title), mrect);
                    let inner = inner_rect(mrect);
                    let field_w = inner.width.saturating_sub(4) as usize;
                    let lines = vec![
                        Spans::from(Span::raw("")),
                        Spans::from(vec![Span::raw(" "), Span::raw(a.file_name_label)]),
                        Spans::from(vec![
                            Span::raw(" "),
                            Span::styled(
                                format!("{:<width$}", ui.file_input_str, width = field_w),
                                input_focus,
                            ),
                        ]),
                    ];
                    let p = Paragraph::new(Text::from(lines)).alignment(Alignment::Left);
                    f.render_widget(p, inner);
                }

                if ui.confirm_pending.is_some() {
                    let mrect = centered_block(40, 8, size);
                    f.render_widget(Clear, mrect);
                    f.render_widget(
                        Block::default()
                            .borders(Borders::ALL)
                            .title(a.confirm_unsaved_title),
                        mrect,
                    );
                    let inner = inner_rect(mrect);
                    let buttons = format!(
                        "{}   {}   {}",
                        a.btn_yes.trim(),
                        a.btn_no.trim(),
                        a.btn_cancel.trim()
                    );
                    let lines = vec![
                        Spans::from(Span::raw("")),
                        Spans::from(Span::raw(a.confirm_unsaved_line1)),
                        Spans::from(Span::raw(a.confirm_unsaved_line2)),
                        Spans::from(Span::raw("")),
                        Spans::from(Span::styled(
                            buttons,
                            Style::default().add_modifier(Modifier::BOLD),
                        )),
                    ];
                    let p = Paragraph::new(Text::from(lines)).alignment(Alignment::Center);
                    f.render_widget(p, inner);
                }

                if let Some(msg) = &ui.error_msg {
                    let mw = ((msg.as_str().width() as u16) + 6).clamp(30, 70);
                    let mrect = bottom_centered_block(mw, 7, size);
                    f.render_widget(Clear, mrect);
                    f.render_widget(
                        Block::default().borders(Borders::ALL).title(a.err_title),
                        mrect,
                    );
                    let inner = inner_rect(mrect);
                    let lines = vec![
                        Spans::from(Span::raw("")),
                        Spans::from(Span::styled(
                            msg.clone(),
                            Style::default().fg(note_fg),
                        )),
                    ];
                    let p = Paragraph::new(Text::from(lines)).alignment(Alignment::Center);
                    f.render_widget(p, inner);
                    render_button(f, inner, a.btn_close);
                }

                if ui.showing_win {
                    let wb = bottom_centered_block(40, 8, size);
                    f.render_widget(Clear, wb);
                    f.render_widget(
                        Block::default().borders(Borders::ALL).title(a.win_title),
                        wb,
                    );
                    let inner = inner_rect(wb);
                    let lines = vec![
                        Spans::from(Span::raw("")),
                        Spans::from(Span::raw(a.win_message)),
                        Spans::from(Span::raw(tfmt(
                            a.win_tally_fmt,
                            &[&cfg.wins.to_string(), &cfg.losses.to_string()],
                        ))),
                    ];
                    let p = Paragraph::new(Text::from(lines)).alignment(Alignment::Center);
                    f.render_widget(p, inner);
                    render_button(f, inner, a.btn_close);
                }

                if ui.showing_loss {
                    let lb = bottom_centered_block(44, 8, size);
                    f.render_widget(Clear, lb);
                    f.render_widget(
                        Block::default().borders(Borders::ALL).title(a.loss_title),
                        lb,
                    );
                    let inner = inner_rect(lb);
                    let lines = vec![
                        Spans::from(Span::raw("")),
                        Spans::from(Span::raw(a.loss_message)),
                        Spans::from(Span::raw(a.loss_better_luck)),
                    ];
                    let p = Paragraph::new(Text::from(lines)).alignment(Alignment::Center);
                    f.render_widget(p, inner);
                    render_button(f, inner, a.btn_close);
                }
            })?;
            repaint.set(false);
        }

        // expire the transient status note
        if let Some((_, t0)) = &ui.status_note {
            if t0.elapsed() > Duration::from_millis(2500) {
                ui.status_note = None;
                repaint.set(true);
            }
        }

        if event::poll(tick_rate)? {
            match event::read()? {
                Event::Resize(_, _) => repaint.set(true),
                Event::Key(KeyEvent { code, kind, .. }) => {
                    if kind != KeyEventKind::Press {
                        continue;
                    }
                    // any keypress may change what is on screen
                    repaint.set(true);

                    if let Some(action) = ui.file_input {
                        // filename entry
                        match code {
                            KeyCode::Char(c) if !c.is_control() => {
                                if ui.file_input_str.len() < 200 {
                                    ui.file_input_str.push(c);
                                }
                            }
                            KeyCode::Backspace => {
                                ui.file_input_str.pop();
                            }
                            KeyCode::Esc => {
                                ui.file_input = None;
                                ui.file_input_str.clear();
                                ui.resume_after_save = None;
                            }
                            KeyCode::Enter => {
                                let name = ui.file_input_str.trim().to_string();
                                if name.is_empty() {
                                    continue;
                                }
                                let path = PathBuf::from(name);
                                ui.file_input = None;
                                ui.file_input_str.clear();
                                match action {
                                    FileAction::Open => match MineField::load(&path) {
                                        Ok(loaded) => {
                                            model = loaded;
                                            attach_repaint(&mut model, &repaint);
                                            current_file = Some(path);
                                            ui.reset_after_new_game();
                                            // a finished game loads as finished, without re-opening dialogs
                                            ui.result_recorded = model.is_game_over();
                                        }
                                        Err(e) => {
                                            ui.error_msg = Some(tfmt(
                                                lang.assets.err_open_fmt,
                                                &[&e.to_string()],
                                            ));
                                        }
                                    },
                                    FileAction::SaveAs => match model.save(&path) {
                                        Ok(()) => {
                                            current_file = Some(path);
                                            if let Some(next) = ui.resume_after_save.take() {
                                                proceed(
                                                    next,
                                                    &mut model,
                                                    &mut current_file,
                                                    cfg,
                                                    &mut ui,
                                                    &repaint,
                                                    &mut exit_requested,
                                                );
                                            }
                                        }
                                        Err(e) => {
                                            ui.resume_after_save = None;
                                            ui.error_msg = Some(tfmt(
                                                lang.assets.err_save_fmt,
                                                &[&e.to_string()],
                                            ));
                                        }
                                    },
                                }
                            }
                            _ => {}
                        }
                    } else if let Some(action) = ui.confirm_pending {
                        // unsaved-changes prompt: Yes saves first, No discards, Esc cancels
                        match code {
                            KeyCode::Char('y') | KeyCode::Char('Y') => {
                                ui.confirm_pending = None;
                                if save_now(&mut model, &current_file, &mut ui, lang) {
                                    proceed(
                                        action,
                                        &mut model,
                                        &mut current_file,
                                        cfg,
                                        &mut ui,
                                        &repaint,
                                        &mut exit_requested,
                                    );
                                } else if ui.file_input.is_some() {
                                    // finish the forced save-as, then resume
                                    ui.resume_after_save = Some(action);
                                }
                            }
                            KeyCode::Char('n') | KeyCode::Char('N') => {
                                ui.confirm_pending = None;
                                proceed(
                                    action,
                                    &mut model,
                                    &mut current_file,
                                    cfg,
                                    &mut ui,
                                    &repaint,
                                    &mut exit_requested,
                                );
                            }
                            KeyCode::Esc | KeyCode::Char('c') | KeyCode::Char('C') => {
                                ui.confirm_pending = None;
                            }
                            _ => {}
                        }
                    } else if ui.showing_size {
                        match code {
                            KeyCode::Char(c) if c.is_ascii_digit() => {
                                let field = if ui.size_input_mode == 0 {
                                    &mut ui.size_rows_str
                                } else {
                                    &mut ui.size_cols_str
                                };
                                if field.len() < 2 {
                                    field.push(c);
                                }
                            }
                            KeyCode::Backspace => {
                                if ui.size_input_mode == 0 {
                                    ui.size_rows_str.pop();
                                } else {
                                    ui.size_cols_str.pop();
                                }
                            }
                            KeyCode::Tab | KeyCode::Down | KeyCode::Up | KeyCode::BackTab => {
                                ui.size_input_mode = 1 - ui.size_input_mode;
                            }
                            KeyCode::Enter => {
                                let rows = ui.size_rows_str.trim().parse::<usize>().unwrap_or(0);
                                let cols = ui.size_cols_str.trim().parse::<usize>().unwrap_or(0);
                                if !(2..=40).contains(&rows) {
                                    ui.size_invalid_field = Some((0, Instant::now()));
                                } else if !(2..=38).contains(&cols) {
                                    ui.size_invalid_field = Some((1, Instant::now()));
                                } else {
                                    cfg.rows = rows;
                                    cfg.cols = cols;
                                    save_config(cfg);
                                    model = MineField::new(rows, cols);
                                    attach_repaint(&mut model, &repaint);
                                    current_file = None;
                                    ui.reset_after_new_game();
                                }
                            }
                            KeyCode::Esc => {
                                ui.showing_size = false;
                                ui.size_invalid_field = None;
                            }
                            _ => {}
                        }
                    } else if ui.showing_options {
                        match code {
                            KeyCode::Up | KeyCode::Down | KeyCode::Tab => {
                                ui.options_focus = 1 - ui.options_focus;
                            }
                            KeyCode::Char(' ') | KeyCode::Enter => {
                                if ui.options_focus == 0 {
                                    cfg.ascii_icons = !cfg.ascii_icons;
                                    let g = make_glyphs(cfg.ascii_icons);
                                    glyph_unvisited = g.0;
                                    glyph_mine = g.1;
                                    glyph_goal = g.2;
                                } else {
                                    let next =
                                        if lang.current_lang == "zh" { "en" } else { "zh" };
                                    lang.switch_to(next);
                                    cfg.language = lang.current_lang.clone();
                                }
                                save_config(cfg);
                            }
                            KeyCode::Esc => {
                                ui.showing_options = false;
                            }
                            _ => {}
                        }
                    } else if ui.modal_open() {
                        // plain message modals close on Esc or Enter
                        match code {
                            KeyCode::Esc | KeyCode::Enter => {
                                ui.showing_help = false;
                                ui.showing_about = false;
                                ui.showing_win = false;
                                ui.showing_loss = false;
                                ui.error_msg = None;
                            }
                            _ => {}
                        }
                    } else {
                        match code {
                            // moves: arrows for the straight headings, QEZC for diagonals
                            KeyCode::Up => step(&mut model, Heading::N, cfg, &mut ui, lang),
                            KeyCode::Down => step(&mut model, Heading::S, cfg, &mut ui, lang),
                            KeyCode::Left => step(&mut model, Heading::W, cfg, &mut ui, lang),
                            KeyCode::Right => step(&mut model, Heading::E, cfg, &mut ui, lang),
                            KeyCode::Char('q') | KeyCode::Char('Q') => {
                                step(&mut model, Heading::NW, cfg, &mut ui, lang)
                            }
                            KeyCode::Char('e') | KeyCode::Char('E') => {
                                step(&mut model, Heading::NE, cfg, &mut ui, lang)
                            }
                            KeyCode::Char('z') | KeyCode::Char('Z') => {
                                step(&mut model, Heading::SW, cfg, &mut ui, lang)
                            }
                            KeyCode::Char('c') | KeyCode::Char('C') => {
                                step(&mut model, Heading::SE, cfg, &mut ui, lang)
                            }
                            KeyCode::F(1) => ui.showing_help = true,
                            KeyCode::F(2) => request(
                                PendingAction::New,
                                &mut model,
                                &mut current_file,
                                cfg,
                                &mut ui,
                                &repaint,
                                &mut exit_requested,
                            ),
                            KeyCode::F(3) => request(
                                PendingAction::Open,
                                &mut model,
                                &mut current_file,
                                cfg,
                                &mut ui,
                                &repaint,
                                &mut exit_requested,
                            ),
                            KeyCode::F(4) => {
                                save_now(&mut model, &current_file, &mut ui, lang);
                            }
                            KeyCode::F(5) => {
                                ui.file_input = Some(FileAction::SaveAs);
                                ui.file_input_str = current_file
                                    .as_ref()
                                    .map(|p| p.display().to_string())
                                    .unwrap_or_default();
                            }
                            KeyCode::F(6) => request(
                                PendingAction::Size,
                                &mut model,
                                &mut current_file,
                                cfg,
                                &mut ui,
                                &repaint,
                                &mut exit_requested,
                            ),
                            KeyCode::F(7) => {
                                ui.showing_options = true;
                                ui.options_focus = 0;
                            }
                            KeyCode::F(9) => ui.showing_about = true,
                            KeyCode::Esc => request(
                                PendingAction::Exit,
                                &mut model,
                                &mut current_file,
                                cfg,
                                &mut ui,
                                &repaint,
                                &mut exit_requested,
                            ),
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
            if exit_requested {
                break;
            }
        }
    }

    // Persist preferences before exiting
    save_config(cfg);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), terminal::LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

// Renders the decorative OK/CLOSE button on the last row of a modal.
// The UI is keyboard-driven; Esc or Enter activates it.
fn render_button(
    f: &mut ratatui::Frame<CrosstermBackend<io::Stdout>>,
    inner: Rect,
    label: &str,
) {
    let btn_w = (label.width() as u16) + 2;
    let bx = inner.x + (inner.width.saturating_sub(btn_w)) / 2;
    let by = inner.y + inner.height.saturating_sub(1);
    let btn_rect = Rect::new(bx, by, btn_w, 1);
    let btn_style = Style::default()
        .bg(Color::Gray.wtmatch())
        .fg(Color::Black.wtmatch())
        .add_modifier(Modifier::BOLD);
    let btn = Paragraph::new(Spans::from(Span::styled(label.to_string(), btn_style)))
        .alignment(Alignment::Center)
        .block(Block::default());
    f.render_widget(btn, btn_rect);
}

fn inner_rect(r: Rect) -> Rect {
    Rect::new(
        r.x + 1,
        r.y + 1,
        r.width.saturating_sub(2),
        r.height.saturating_sub(2),
    )
}

fn center_rect(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn centered_block(w: u16, h: u16, r: Rect) -> Rect {
    center_rect(w, h, r)
}

fn bottom_centered_block(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + r.height.saturating_sub(height);
    Rect::new(x, y, width, height)
}
