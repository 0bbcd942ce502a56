//! Layout metrics, in pixels.

// ── Staff ───────────────────────────────────────────────────────────
pub const LINE_WIDTH: i32 = 1;
pub const LEFT_MARGIN: i32 = 4;
/// Space between two staff lines.
pub const LINE_SPACE: i32 = 7;
/// Five lines and four spaces.
pub const STAFF_HEIGHT: i32 = LINE_SPACE * 4 + LINE_WIDTH * 5;
pub const PAGE_WIDTH: i32 = 800;

// ── Notes ───────────────────────────────────────────────────────────
pub const NOTE_HEIGHT: i32 = LINE_SPACE + LINE_WIDTH;
pub const NOTE_WIDTH: i32 = 3 * LINE_SPACE / 2;

// ── Symbols ─────────────────────────────────────────────────────────
pub const BAR_WIDTH: i32 = 2 * LINE_SPACE;
pub const REST_WIDTH: i32 = NOTE_HEIGHT * 2 + NOTE_HEIGHT / 2;
pub const CLEF_WIDTH: i32 = 30;
pub const SMALL_CLEF_WIDTH: i32 = 20;
pub const ACCID_WIDTH: i32 = 3 * NOTE_HEIGHT / 2;
pub const TIME_SIG_WIDTH: i32 = NOTE_HEIGHT * 2 * 5 / 8;
/// Extra chord width when note names are printed.
pub const NOTE_NAME_WIDTH: i32 = 8;
/// Average character width of lyric text.
pub const LYRIC_CHAR_WIDTH: f64 = 6.667;
