//! Linux input event key codes used by the keymap.
//!
//! Values follow `include/uapi/linux/input-event-codes.h`, so a [`KeyCode`] can
//! be written to an evdev/uinput device as-is.

use core::fmt;

/// A key code as understood by the Linux input subsystem (`EV_KEY` codes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCode(pub u16);

impl KeyCode {
    /// Placeholder for matrix positions that produce nothing.
    pub const RESERVED: KeyCode = KeyCode(0);
    pub const ESC: KeyCode = KeyCode(1);
    pub const KEY_1: KeyCode = KeyCode(2);
    pub const KEY_2: KeyCode = KeyCode(3);
    pub const KEY_3: KeyCode = KeyCode(4);
    pub const KEY_4: KeyCode = KeyCode(5);
    pub const KEY_5: KeyCode = KeyCode(6);
    pub const KEY_6: KeyCode = KeyCode(7);
    pub const KEY_7: KeyCode = KeyCode(8);
    pub const KEY_8: KeyCode = KeyCode(9);
    pub const KEY_9: KeyCode = KeyCode(10);
    pub const KEY_0: KeyCode = KeyCode(11);
    pub const MINUS: KeyCode = KeyCode(12);
    pub const EQUAL: KeyCode = KeyCode(13);
    pub const BACKSPACE: KeyCode = KeyCode(14);
    pub const TAB: KeyCode = KeyCode(15);
    pub const Q: KeyCode = KeyCode(16);
    pub const W: KeyCode = KeyCode(17);
    pub const E: KeyCode = KeyCode(18);
    pub const R: KeyCode = KeyCode(19);
    pub const T: KeyCode = KeyCode(20);
    pub const Y: KeyCode = KeyCode(21);
    pub const U: KeyCode = KeyCode(22);
    pub const I: KeyCode = KeyCode(23);
    pub const O: KeyCode = KeyCode(24);
    pub const P: KeyCode = KeyCode(25);
    pub const LEFTBRACE: KeyCode = KeyCode(26);
    pub const RIGHTBRACE: KeyCode = KeyCode(27);
    pub const ENTER: KeyCode = KeyCode(28);
    pub const LEFTCTRL: KeyCode = KeyCode(29);
    pub const A: KeyCode = KeyCode(30);
    pub const S: KeyCode = KeyCode(31);
    pub const D: KeyCode = KeyCode(32);
    pub const F: KeyCode = KeyCode(33);
    pub const G: KeyCode = KeyCode(34);
    pub const H: KeyCode = KeyCode(35);
    pub const J: KeyCode = KeyCode(36);
    pub const K: KeyCode = KeyCode(37);
    pub const L: KeyCode = KeyCode(38);
    pub const SEMICOLON: KeyCode = KeyCode(39);
    pub const APOSTROPHE: KeyCode = KeyCode(40);
    pub const GRAVE: KeyCode = KeyCode(41);
    pub const LEFTSHIFT: KeyCode = KeyCode(42);
    pub const BACKSLASH: KeyCode = KeyCode(43);
    pub const Z: KeyCode = KeyCode(44);
    pub const X: KeyCode = KeyCode(45);
    pub const C: KeyCode = KeyCode(46);
    pub const V: KeyCode = KeyCode(47);
    pub const B: KeyCode = KeyCode(48);
    pub const N: KeyCode = KeyCode(49);
    pub const M: KeyCode = KeyCode(50);
    pub const COMMA: KeyCode = KeyCode(51);
    pub const DOT: KeyCode = KeyCode(52);
    pub const SLASH: KeyCode = KeyCode(53);
    pub const SPACE: KeyCode = KeyCode(57);
    pub const CAPSLOCK: KeyCode = KeyCode(58);
    pub const F1: KeyCode = KeyCode(59);
    pub const F2: KeyCode = KeyCode(60);
    pub const F3: KeyCode = KeyCode(61);
    pub const F4: KeyCode = KeyCode(62);
    pub const F5: KeyCode = KeyCode(63);
    pub const F6: KeyCode = KeyCode(64);
    pub const F7: KeyCode = KeyCode(65);
    pub const F8: KeyCode = KeyCode(66);
    pub const F9: KeyCode = KeyCode(67);
    pub const NUMLOCK: KeyCode = KeyCode(69);
    pub const SYSRQ: KeyCode = KeyCode(99);
    pub const UP: KeyCode = KeyCode(103);
    pub const LEFT: KeyCode = KeyCode(105);
    pub const RIGHT: KeyCode = KeyCode(106);
    pub const DOWN: KeyCode = KeyCode(108);
    pub const VOLUMEUP: KeyCode = KeyCode(115);
    pub const PAUSE: KeyCode = KeyCode(119);
    pub const COMPOSE: KeyCode = KeyCode(127);
    pub const PASTE: KeyCode = KeyCode(135);
    pub const BRIGHTNESSDOWN: KeyCode = KeyCode(224);
    pub const BRIGHTNESSUP: KeyCode = KeyCode(225);

    /// Returns the raw event code.
    pub const fn code(self) -> u16 {
        self.0
    }

    /// Returns `true` for [`KeyCode::RESERVED`], which is never emitted.
    pub const fn is_reserved(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyCode({})", self.0)
    }
}

impl From<KeyCode> for u16 {
    fn from(key: KeyCode) -> Self {
        key.0
    }
}
