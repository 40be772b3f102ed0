// Multi-language support module
// Provides localized UI strings for English and Chinese with an extensible design

#[derive(Clone)]
pub struct Assets {
    // Window / board title
    pub app_title: &'static str,

    // Menu items
    pub menu_help: &'static str,
    pub menu_new: &'static str,
    pub menu_open: &'static str,
    pub menu_save: &'static str,
    pub menu_save_as: &'static str,
    pub menu_size: &'static str,
    pub menu_options: &'static str,
    pub menu_about: &'static str,
    pub menu_exit: &'static str,

    // Help modal
    pub help_goal: &'static str,
    pub help_controls: &'static str,
    pub help_move_straight: &'static str,
    pub help_move_diagonal: &'static str,
    pub help_files: &'static str,
    pub help_numbers: &'static str,

    // Size modal
    pub size_rows_label: &'static str, // "Rows (2-40):"
    pub size_cols_label: &'static str, // "Cols (2-38):"

    // Options modal
    pub opt_ascii_icons: &'static str,
    pub opt_language: &'static str,

    // File modals
    pub file_open_title: &'static str,
    pub file_save_title: &'static str,
    pub file_name_label: &'static str,

    // Win/Loss modals
    pub win_title: &'static str,
    pub win_message: &'static str,
    pub win_tally_fmt: &'static str, // "Wins: {}   Losses: {}"

    pub loss_title: &'static str,
    pub loss_message: &'static str,
    pub loss_better_luck: &'static str,

    // Error modal
    pub err_title: &'static str,
    pub err_open_fmt: &'static str, // "Open failed: {}"
    pub err_save_fmt: &'static str, // "Save failed: {}"

    // Status bar
    pub status_pos_fmt: &'static str,   // " Pos {},{}   Mines near: {} "
    pub status_tally_fmt: &'static str, // "W:{} L:{}"
    pub status_modified: &'static str,  // unsaved-changes marker
    pub status_won: &'static str,
    pub status_lost: &'static str,
    pub status_off_grid: &'static str,
    pub status_game_over: &'static str,

    // About modal
    pub about_description: &'static str,
    pub about_version_fmt: &'static str, // "v{} by {}"

    // Buttons
    pub btn_ok: &'static str,
    pub btn_close: &'static str,
    pub btn_yes: &'static str,
    pub btn_no: &'static str,
    pub btn_cancel: &'static str,

    // Unsaved-changes confirmation
    pub confirm_unsaved_title: &'static str,
    pub confirm_unsaved_line1: &'static str,
    pub confirm_unsaved_line2: &'static str,

    // Terminal size messages
    pub tsmsg_line1: &'static str,
    pub tsmsg_line2: &'static str,
    pub tsmsg_title: &'static str,

    // Language names for selection
    pub lang_english: &'static str,
    pub lang_chinese: &'static str,
}

/// Returns English language assets
pub fn english_assets() -> Assets {
    Assets {
        app_title: "Mine Field",

        // Menu items
        menu_help: "Help",
        menu_new: "New",
        menu_open: "Open",
        menu_save: "Save",
        menu_save_as: "Save As",
        menu_size: "Size",
        menu_options: "Options",
        menu_about: "About",
        menu_exit: "Exit",

        // Help modal
        help_goal: " Cross the field from top-left to bottom-right.",
        help_controls: " Controls:",
        help_move_straight: "  Arrows      - move N / S / W / E",
        help_move_diagonal: "  Q E Z C     - move NW / NE / SW / SE",
        help_files: "  F2-F5       - new / open / save / save as",
        help_numbers: " Numbers show how many mines touch a cell.",

        // Size modal
        size_rows_label: "Rows (2-40):",
        size_cols_label: "Cols (2-38):",

        // Options modal
        opt_ascii_icons: "ASCII icons",
        opt_language: "🌐 Language",

        // File modals
        file_open_title: "Open",
        file_save_title: "Save As",
        file_name_label: "File name:",

        // Win/Loss modals
        win_title: "Success",
        win_message: "Goal Reached — You Win!",
        win_tally_fmt: "Wins: {}   Losses: {}",

        loss_title: "Failure",
        loss_message: "You Stepped on a Mine — You Lose!",
        loss_better_luck: "Better luck next time.",

        // Error modal
        err_title: "Error",
        err_open_fmt: "Open failed: {}",
        err_save_fmt: "Save failed: {}",

        // Status bar
        status_pos_fmt: " Pos {},{}   Mines near: {} ",
        status_tally_fmt: "W:{} L:{}",
        status_modified: "[+]",
        status_won: "WON",
        status_lost: "LOST",
        status_off_grid: "Cannot move off the grid",
        status_game_over: "Game has ended — start a new one",

        // About modal
        about_description: "A terminal-based Mine Field crossing game",
        about_version_fmt: "v{} by {}",

        // Buttons
        btn_ok: " OK ",
        btn_close: " CLOSE ",
        btn_yes: " Yes ",
        btn_no: " No ",
        btn_cancel: " Cancel ",

        // Unsaved-changes confirmation
        confirm_unsaved_title: "Unsaved Changes",
        confirm_unsaved_line1: "You have unsaved changes.",
        confirm_unsaved_line2: "Save them first?",

        // terminal size messages
        tsmsg_line1: "Terminal layout too small",
        tsmsg_line2: "Minimum size required: {} x {}",
        tsmsg_title: "Resize needed",

        // Language names
        lang_english: "English",
        lang_chinese: "中文",
    }
}

/// Returns Chinese language assets
pub fn chinese_assets() -> Assets {
    Assets {
        app_title: "雷区穿越",

        // Menu items
        menu_help: "帮助",
        menu_new: "新游戏",
        menu_open: "打开",
        menu_save: "保存",
        menu_save_as: "另存为",
        menu_size: "尺寸",
        menu_options: "选项",
        menu_about: "关于",
        menu_exit: "退出",

        // Help modal
        help_goal: " 从左上角穿越雷区到达右下角。",
        help_controls: " 操作说明：",
        help_move_straight: "  方向键      - 向北/南/西/东移动",
        help_move_diagonal: "  Q E Z C     - 向西北/东北/西南/东南移动",
        help_files: "  F2-F5       - 新游戏/打开/保存/另存为",
        help_numbers: " 数字表示与该格相邻的地雷数。",

        // Size modal
        size_rows_label: "行数 (2-40):",
        size_cols_label: "列数 (2-38):",

        // Options modal
        opt_ascii_icons: "ASCII图标",
        opt_language: "🌐 语言",

        // File modals
        file_open_title: "打开",
        file_save_title: "另存为",
        file_name_label: "文件名：",

        // Win/Loss modals
        win_title: "成功",
        win_message: "到达终点 — 你赢了！",
        win_tally_fmt: "胜：{}   负：{}",

        loss_title: "失败",
        loss_message: "踩到地雷 — 你输了！",
        loss_better_luck: "祝下次好运。",

        // Error modal
        err_title: "错误",
        err_open_fmt: "打开失败：{}",
        err_save_fmt: "保存失败：{}",

        // Status bar
        status_pos_fmt: " 位置 {},{}   周边地雷：{} ",
        status_tally_fmt: "胜:{} 负:{}",
        status_modified: "[+]",
        status_won: "已获胜",
        status_lost: "已失败",
        status_off_grid: "不能移出雷区",
        status_game_over: "游戏已结束 — 请开始新游戏",

        // About modal
        about_description: "一款基于终端的雷区穿越游戏",
        about_version_fmt: "v{} 作者 {}",

        // Buttons
        btn_ok: " 确定 ",
        btn_close: " 关闭 ",
        btn_yes: " 是 ",
        btn_no: " 否 ",
        btn_cancel: " 取消 ",

        // Unsaved-changes confirmation
        confirm_unsaved_title: "未保存的更改",
        confirm_unsaved_line1: "当前进度尚未保存。",
        confirm_unsaved_line2: "要先保存吗？",

        // terminal size messages
        tsmsg_line1: "终端屏幕布局过小",
        tsmsg_line2: "最小需要尺寸：{} x {}",
        tsmsg_title: "需要调整大小",

        // Language names
        lang_english: "English",
        lang_chinese: "中文",
    }
}

/// Main language manager struct
/// Holds the current language code and active string assets
pub struct Lang {
    pub current_lang: String,
    pub assets: Assets,
}

impl Lang {
    /// Creates a new Lang instance from a language code
    /// Normalizes input (e.g., "zh-CN" → "zh") and defaults to English for unsupported languages
    pub fn new(lang_code: &str) -> Self {
        let normalized = lang_code.to_lowercase();
        let code = if normalized.starts_with("zh") {
            "zh"
        } else {
            "en"
        };

        Lang {
            current_lang: code.to_string(),
            assets: if code == "zh" {
                chinese_assets()
            } else {
                english_assets()
            },
        }
    }

    /// Switches the current language and reloads all string assets
    /// Used when the user changes language in the options menu
    pub fn switch_to(&mut self, lang_code: &str) {
        let normalized = lang_code.to_lowercase();
        let code = if normalized.starts_with("zh") {
            "zh"
        } else {
            "en"
        };

        self.current_lang = code.to_string();
        self.assets = if code == "zh" {
            chinese_assets()
        } else {
            english_assets()
        };
    }
}
