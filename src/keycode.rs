//! Output codes reserved below the printable ASCII range.
//!
//! These share the byte space with plain ASCII output, so they sit in the
//! control-character region the layout never produces as text (backspace,
//! tab, newline keep their usual values).

pub const KEY_JOY_UP: u8 = 0x01;
pub const KEY_JOY_DOWN: u8 = 0x02;
pub const KEY_JOY_LEFT: u8 = 0x03;
pub const KEY_JOY_RIGHT: u8 = 0x04;
pub const KEY_JOY_CENTER: u8 = 0x05;
pub const KEY_BTN_LEFT1: u8 = 0x06;
pub const KEY_BTN_RIGHT1: u8 = 0x07;
// 0x08 backspace, 0x09 tab, 0x0A newline, 0x0D carriage return
pub const KEY_BTN_LEFT2: u8 = 0x11;
pub const KEY_BTN_RIGHT2: u8 = 0x12;

/// Modifier codes, reported only when `cfg::REPORT_MODS` is enabled.
pub const KEY_MOD_ALT: u8 = 0x1A;
pub const KEY_MOD_SHL: u8 = 0x1B;
pub const KEY_MOD_SHR: u8 = 0x1C;
pub const KEY_MOD_SYM: u8 = 0x1D;

/// True for directional/button codes that must never be substituted by the
/// alternate character during modifier resolution.
pub const fn is_button_code(code: u8) -> bool {
    matches!(
        code,
        KEY_JOY_UP
            | KEY_JOY_DOWN
            | KEY_JOY_LEFT
            | KEY_JOY_RIGHT
            | KEY_JOY_CENTER
            | KEY_BTN_LEFT1
            | KEY_BTN_RIGHT1
            | KEY_BTN_LEFT2
            | KEY_BTN_RIGHT2
    )
}
