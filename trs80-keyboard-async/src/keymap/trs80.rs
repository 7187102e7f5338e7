//! Keymap of the TRS-80 Model 100 keyboard.
//!
//! GRPH and CODE are not mapped to their original character sets, which do not
//! render on a Linux tty. GRPH is a plain layer modifier instead and CODE is
//! COMPOSE, which still gives access to diacritics.

use super::{KeyDescriptor, KeymapDefinition, ModifierKeys, Overlay};
use crate::keycode::KeyCode as K;
use crate::KEYMAP_LEN;

const ROW: usize = 9;

/// Row-major base layer; one row of the table per strobed row.
#[rustfmt::skip]
const BASE: [K; KEYMAP_LEN] = [
    K::Z, K::A, K::Q, K::O,          K::KEY_1, K::KEY_9, K::SPACE,     K::F1, K::LEFTSHIFT,
    K::X, K::S, K::W, K::P,          K::KEY_2, K::KEY_0, K::BACKSPACE, K::F2, K::LEFTCTRL,
    K::C, K::D, K::E, K::LEFTBRACE,  K::KEY_3, K::MINUS, K::TAB,       K::F3, K::RESERVED, // GRPH
    K::V, K::F, K::R, K::SEMICOLON,  K::KEY_4, K::EQUAL, K::ESC,       K::F4, K::COMPOSE,  // CODE
    K::B, K::G, K::T, K::APOSTROPHE, K::KEY_5, K::LEFT,  K::PASTE,     K::F5, K::NUMLOCK,
    K::N, K::H, K::Y, K::COMMA,      K::KEY_6, K::RIGHT, K::F9,        K::F6, K::CAPSLOCK, // LABEL
    K::M, K::J, K::U, K::DOT,        K::KEY_7, K::UP,    K::SYSRQ,     K::F7, K::RESERVED, // PRINT
    K::L, K::K, K::I, K::SLASH,      K::KEY_8, K::DOWN,  K::ENTER,     K::F8, K::PAUSE,    // BREAK
    K::RESERVED, K::RESERVED, K::RESERVED, K::RESERVED, K::RESERVED,
    K::RESERVED, K::RESERVED, K::RESERVED, K::RESERVED,
];

const SHIFT: usize = 8;
const GRAPH: usize = ROW * 2 + 8;
const NUMLOCK: usize = ROW * 4 + 8;
const CAPS_LOCK: usize = ROW * 5 + 8;

const LEFT_BRACKET: usize = ROW * 2 + 3;
const ESC: usize = ROW * 3 + 6;
const COMMA: usize = ROW * 5 + 3;
const UP: usize = ROW * 6 + 5;
const DOWN: usize = ROW * 7 + 5;
const ENTER: usize = ROW * 7 + 6;

/// The keypad printed on the M J K L U I O keys.
const NUMLOCK_PATCHES: &[(usize, KeyDescriptor)] = &[
    (ROW * 6 + 2, KeyDescriptor::never(K::KEY_4)), // U
    (ROW * 7 + 2, KeyDescriptor::never(K::KEY_5)), // I
    (3, KeyDescriptor::never(K::KEY_6)),           // O
    (ROW * 6 + 1, KeyDescriptor::never(K::KEY_1)), // J
    (ROW * 7 + 1, KeyDescriptor::never(K::KEY_2)), // K
    (ROW * 7, KeyDescriptor::never(K::KEY_3)),     // L
    (ROW * 6, KeyDescriptor::never(K::KEY_0)),     // M
];

/// SHIFT + `[` is `]` on this keyboard, not `{`.
const SHIFT_FIX_PATCHES: &[(usize, KeyDescriptor)] =
    &[(LEFT_BRACKET, KeyDescriptor::never(K::RIGHTBRACE))];

const GRAPH_PATCHES: &[(usize, KeyDescriptor)] = &[
    (LEFT_BRACKET, KeyDescriptor::new(K::RIGHTBRACE)), // ] and with SHIFT }
    (ESC, KeyDescriptor::new(K::GRAVE)),               // ` and with SHIFT ~
    (ENTER, KeyDescriptor::new(K::BACKSLASH)),         // \ and with SHIFT |
    (COMMA, KeyDescriptor::always(K::LEFTBRACE)),      // {
    (UP, KeyDescriptor::new(K::BRIGHTNESSUP)),
    (DOWN, KeyDescriptor::new(K::BRIGHTNESSDOWN)),
];

const GRAPH_SHIFT_PATCHES: &[(usize, KeyDescriptor)] = &[(UP, KeyDescriptor::never(K::VOLUMEUP))];

/// The TRS-80 Model 100 keyboard as wired to the Raspberry Pi header.
pub const TRS80_MODEL_100: KeymapDefinition = KeymapDefinition {
    base: BASE,
    modifiers: ModifierKeys {
        shift: SHIFT,
        numlock: NUMLOCK,
        graph: GRAPH,
        caps_lock: CAPS_LOCK,
    },
    numlock: Overlay {
        name: "numlock",
        patches: NUMLOCK_PATCHES,
    },
    shift_fix: Overlay {
        name: "shift-fix",
        patches: SHIFT_FIX_PATCHES,
    },
    graph: Overlay {
        name: "graph",
        patches: GRAPH_PATCHES,
    },
    graph_shift: Overlay {
        name: "graph+shift",
        patches: GRAPH_SHIFT_PATCHES,
    },
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_positions_hold_their_keys() {
        assert_eq!(BASE[SHIFT], K::LEFTSHIFT);
        assert_eq!(BASE[NUMLOCK], K::NUMLOCK);
        assert_eq!(BASE[CAPS_LOCK], K::CAPSLOCK);
        assert!(BASE[GRAPH].is_reserved());
        assert_eq!(BASE[LEFT_BRACKET], K::LEFTBRACE);
        assert_eq!(BASE[ESC], K::ESC);
        assert_eq!(BASE[COMMA], K::COMMA);
        assert_eq!(BASE[ENTER], K::ENTER);
        assert_eq!((BASE[UP], BASE[DOWN]), (K::UP, K::DOWN));
    }

    #[test]
    fn numlock_patches_land_on_keypad_letters() {
        let letters = [K::U, K::I, K::O, K::J, K::K, K::L, K::M];
        for ((index, _), letter) in NUMLOCK_PATCHES.iter().zip(letters) {
            assert_eq!(BASE[*index], letter);
        }
    }

    #[test]
    fn unwired_row_is_unmapped() {
        assert!(BASE[ROW * 8..].iter().all(|key| key.is_reserved()));
    }
}
