//! Per-key state machine.
//!
//! Every key is `UP`, `DOWN` or `DOWN+REPEATING`. Once per scan tick the
//! tracker walks a [`Frame`] of switch samples in index order and turns the
//! edges into [`KeyEvent`]s:
//!
//! * closed and up: press, with any SHIFT synthesis its shift policy needs,
//! * closed and down: typematic repeat when due,
//! * open and down: release, undoing the SHIFT synthesis.
//!
//! The active layer is re-resolved for every press, so a modifier pressed
//! earlier in the same tick already applies to the keys after it.

use heapless::{FnvIndexMap, Vec};

use crate::keycode::KeyCode;
use crate::keymap::{Keymap, Layer, ShiftPolicy};
use crate::typematic::{RepeatTimer, Typematic};
use crate::{KeyIndex, KEYMAP_LEN};

/// Upper bound of events one tick can produce (three per key).
pub const MAX_EVENTS: usize = 256;

/// Capacity of the held-key table; a power of two above [`KEYMAP_LEN`].
const MAX_HELD: usize = 128;

/// Events collected during one tick.
pub type Events = Vec<KeyEvent, MAX_EVENTS>;

/// Kind of an emitted key event, valued as the Linux `EV_KEY` event value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Release = 0,
    Press = 1,
    Repeat = 2,
}

impl Transition {
    /// The `EV_KEY` value for this transition.
    pub const fn value(self) -> i32 {
        self as i32
    }
}

/// A key event for the output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: KeyCode,
    pub transition: Transition,
}

impl KeyEvent {
    pub const fn press(key: KeyCode) -> Self {
        Self {
            key,
            transition: Transition::Press,
        }
    }

    pub const fn release(key: KeyCode) -> Self {
        Self {
            key,
            transition: Transition::Release,
        }
    }

    pub const fn repeat(key: KeyCode) -> Self {
        Self {
            key,
            transition: Transition::Repeat,
        }
    }
}

/// Switch samples of one scan tick, indexed like the keymap.
///
/// `Some(true)` is a closed switch, `Some(false)` an open one and `None` a
/// cell that could not be read this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    cells: [Option<bool>; KEYMAP_LEN],
}

impl Frame {
    /// A frame with every switch open.
    pub const fn new() -> Self {
        Self {
            cells: [Some(false); KEYMAP_LEN],
        }
    }

    /// Records the sample of one cell. Indices past the keymap are ignored.
    pub fn set(&mut self, index: KeyIndex, sample: Option<bool>) {
        if let Some(cell) = self.cells.get_mut(index) {
            *cell = sample;
        }
    }

    pub fn get(&self, index: KeyIndex) -> Option<bool> {
        self.cells.get(index).copied().flatten()
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

/// SHIFT state synthesized when a key went down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShiftOverride {
    None,
    /// SHIFT was held and got released for a `Never` key.
    Released,
    /// SHIFT was not held and got pressed for an `Always` key.
    Pressed,
}

/// What the tracker remembers about a key that is down.
#[derive(Debug, Clone, Copy)]
struct HeldKey {
    /// Symbol sent on press; repeats and the release use the same one.
    symbol: KeyCode,
    shift: ShiftOverride,
    repeating: bool,
    timer: RepeatTimer,
}

/// Owns the pressed and repeating sets and produces key events from samples.
///
/// The repeating set is a flag on the pressed entry, so a key can only be
/// repeating while it is pressed.
pub struct KeyTracker {
    keymap: Keymap,
    typematic: Typematic,
    held: FnvIndexMap<KeyIndex, HeldKey, MAX_HELD>,
}

impl KeyTracker {
    pub fn new(keymap: Keymap, typematic: Typematic) -> Self {
        Self {
            keymap,
            typematic,
            held: FnvIndexMap::new(),
        }
    }

    /// Returns `true` if the key is believed down.
    pub fn is_pressed(&self, index: KeyIndex) -> bool {
        self.held.contains_key(&index)
    }

    /// Returns `true` if the key is down and auto-repeating.
    pub fn is_repeating(&self, index: KeyIndex) -> bool {
        self.held.get(&index).is_some_and(|key| key.repeating)
    }

    /// Indices of every key currently auto-repeating.
    pub fn repeating(&self) -> impl Iterator<Item = KeyIndex> + '_ {
        self.held
            .iter()
            .filter(|(_, key)| key.repeating)
            .map(|(index, _)| *index)
    }

    /// The layer selected by the modifiers currently held.
    pub fn active_layer(&self) -> &Layer {
        self.keymap.resolve(|index| self.held.contains_key(&index))
    }

    /// Runs the state machine over one frame, appending events.
    ///
    /// Returns `true` if any key was pressed, released or repeated.
    pub fn step(&mut self, frame: &Frame, events: &mut Events) -> bool {
        self.typematic.begin_tick();

        let mut changed = false;
        for index in 0..KEYMAP_LEN {
            let Some(closed) = frame.get(index) else {
                continue;
            };
            changed |= match (closed, self.is_pressed(index)) {
                (true, false) => self.press(index, events),
                (true, true) => self.hold(index, events),
                (false, true) => self.release(index, events),
                (false, false) => false,
            };
        }

        self.typematic.end_tick(changed);
        changed
    }

    fn press(&mut self, index: KeyIndex, events: &mut Events) -> bool {
        let modifiers = *self.keymap.modifiers();
        let shift_symbol = self.keymap.shift_symbol();
        let shift_held = self.is_pressed(modifiers.shift);
        let descriptor = self.active_layer().get(index);

        let shift = match descriptor.shift {
            ShiftPolicy::Never if shift_held => ShiftOverride::Released,
            ShiftPolicy::Always if !shift_held => ShiftOverride::Pressed,
            _ => ShiftOverride::None,
        };
        // Another held key may already have synthesized the same SHIFT state.
        if !self.overridden(shift) {
            match shift {
                ShiftOverride::Released => push(events, KeyEvent::release(shift_symbol)),
                ShiftOverride::Pressed => push(events, KeyEvent::press(shift_symbol)),
                ShiftOverride::None => {}
            }
        }

        if !descriptor.symbol.is_reserved() {
            push(events, KeyEvent::press(descriptor.symbol));
            // CAPS LOCK must not look latched: tap it on press.
            if index == modifiers.caps_lock {
                push(events, KeyEvent::release(descriptor.symbol));
            }
        }
        log::trace!("Key {index} down as {:?}.", descriptor.symbol);

        let key = HeldKey {
            symbol: descriptor.symbol,
            shift,
            repeating: false,
            timer: RepeatTimer::default(),
        };
        if self.held.insert(index, key).is_err() {
            log::error!("Held key table full, dropping key {index}.");
        }
        true
    }

    fn hold(&mut self, index: KeyIndex, events: &mut Events) -> bool {
        if self.keymap.modifiers().never_repeats(index) {
            return false;
        }
        let Some(key) = self.held.get_mut(&index) else {
            return false;
        };
        if key.symbol.is_reserved() || !self.typematic.hold(&mut key.timer, key.repeating) {
            return false;
        }

        self.typematic.fired(&mut key.timer);
        key.repeating = true;
        push(events, KeyEvent::repeat(key.symbol));
        true
    }

    fn release(&mut self, index: KeyIndex, events: &mut Events) -> bool {
        let Some(key) = self.held.remove(&index) else {
            return false;
        };
        let modifiers = *self.keymap.modifiers();
        let shift_symbol = self.keymap.shift_symbol();
        let shift_held = self.is_pressed(modifiers.shift);

        // Undo once the last key relying on the override is up, and only
        // where it still differs from the physical SHIFT key.
        if !self.overridden(key.shift) {
            match key.shift {
                ShiftOverride::Released if shift_held => {
                    push(events, KeyEvent::press(shift_symbol))
                }
                ShiftOverride::Pressed if !shift_held => {
                    push(events, KeyEvent::release(shift_symbol))
                }
                _ => {}
            }
        }

        if !key.symbol.is_reserved() {
            if index == modifiers.caps_lock {
                push(events, KeyEvent::press(key.symbol));
            }
            push(events, KeyEvent::release(key.symbol));
        }
        log::trace!("Key {index} up as {:?}.", key.symbol);
        true
    }

    /// Returns `true` if a held key already forces `shift`.
    fn overridden(&self, shift: ShiftOverride) -> bool {
        shift != ShiftOverride::None && self.held.values().any(|key| key.shift == shift)
    }
}

fn push(events: &mut Events, event: KeyEvent) {
    if events.push(event).is_err() {
        log::warn!("Event buffer full, dropping {event:?}.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::TRS80_MODEL_100;
    use crate::typematic::{RepeatClock, TypematicConfig};

    const Z: KeyIndex = 0;
    const A: KeyIndex = 1;
    const SHIFT: KeyIndex = 8;
    const BRACKET: KeyIndex = 21;
    const GRAPH: KeyIndex = 26;
    const NUMLOCK: KeyIndex = 44;
    const COMMA: KeyIndex = 48;
    const CAPS: KeyIndex = 53;
    const M: KeyIndex = 54;

    struct Harness {
        tracker: KeyTracker,
        frame: Frame,
    }

    impl Harness {
        fn new(clock: RepeatClock) -> Self {
            let keymap = Keymap::build(&TRS80_MODEL_100).unwrap();
            let typematic = Typematic::new(TypematicConfig::default(), clock);
            Self {
                tracker: KeyTracker::new(keymap, typematic),
                frame: Frame::new(),
            }
        }

        fn tick(&mut self) -> std::vec::Vec<KeyEvent> {
            let mut events = Events::new();
            self.tracker.step(&self.frame, &mut events);
            for index in self.tracker.repeating() {
                assert!(self.tracker.is_pressed(index));
            }
            events.into_iter().collect()
        }

        fn down(&mut self, index: KeyIndex) -> std::vec::Vec<KeyEvent> {
            self.frame.set(index, Some(true));
            self.tick()
        }

        fn up(&mut self, index: KeyIndex) -> std::vec::Vec<KeyEvent> {
            self.frame.set(index, Some(false));
            self.tick()
        }
    }

    #[test]
    fn press_and_release_plain_key() {
        let mut h = Harness::new(RepeatClock::PerKey);
        assert_eq!(h.down(Z), [KeyEvent::press(KeyCode::Z)]);
        assert!(h.tracker.is_pressed(Z));
        assert!(h.tick().is_empty());
        assert_eq!(h.up(Z), [KeyEvent::release(KeyCode::Z)]);
        assert!(!h.tracker.is_pressed(Z));
    }

    #[test]
    fn shift_bracket_emits_right_bracket_unshifted() {
        let mut h = Harness::new(RepeatClock::PerKey);
        assert_eq!(h.down(SHIFT), [KeyEvent::press(KeyCode::LEFTSHIFT)]);

        let down = h.down(BRACKET);
        assert_eq!(
            down,
            [
                KeyEvent::release(KeyCode::LEFTSHIFT),
                KeyEvent::press(KeyCode::RIGHTBRACE)
            ]
        );
        let up = h.up(BRACKET);
        assert_eq!(
            up,
            [
                KeyEvent::press(KeyCode::LEFTSHIFT),
                KeyEvent::release(KeyCode::RIGHTBRACE)
            ]
        );

        let symbols: std::vec::Vec<_> = down
            .iter()
            .chain(&up)
            .filter(|event| event.key != KeyCode::LEFTSHIFT)
            .copied()
            .collect();
        assert_eq!(
            symbols,
            [
                KeyEvent::press(KeyCode::RIGHTBRACE),
                KeyEvent::release(KeyCode::RIGHTBRACE)
            ]
        );
    }

    #[test]
    fn shift_released_first_is_not_pressed_again() {
        let mut h = Harness::new(RepeatClock::PerKey);
        h.down(SHIFT);
        h.down(BRACKET);
        assert_eq!(h.up(SHIFT), [KeyEvent::release(KeyCode::LEFTSHIFT)]);
        assert_eq!(h.up(BRACKET), [KeyEvent::release(KeyCode::RIGHTBRACE)]);
    }

    #[test]
    fn overlapping_never_keys_release_shift_once() {
        let mut h = Harness::new(RepeatClock::PerKey);
        h.down(SHIFT);
        h.down(NUMLOCK);
        assert_eq!(
            h.down(M),
            [
                KeyEvent::release(KeyCode::LEFTSHIFT),
                KeyEvent::press(KeyCode::KEY_0)
            ]
        );
        assert_eq!(h.down(BRACKET), [KeyEvent::press(KeyCode::RIGHTBRACE)]);
        assert_eq!(h.up(M), [KeyEvent::release(KeyCode::KEY_0)]);

        let held: std::vec::Vec<_> = (0..30).flat_map(|_| h.tick()).collect();
        assert_eq!(held, [KeyEvent::repeat(KeyCode::RIGHTBRACE)]);

        assert_eq!(
            h.up(BRACKET),
            [
                KeyEvent::press(KeyCode::LEFTSHIFT),
                KeyEvent::release(KeyCode::RIGHTBRACE)
            ]
        );
    }

    #[test]
    fn graph_alone_synthesizes_shift_for_always_key() {
        let mut h = Harness::new(RepeatClock::PerKey);
        assert!(h.down(GRAPH).is_empty());
        assert!(h.tracker.is_pressed(GRAPH));

        assert_eq!(
            h.down(COMMA),
            [
                KeyEvent::press(KeyCode::LEFTSHIFT),
                KeyEvent::press(KeyCode::LEFTBRACE)
            ]
        );
        assert_eq!(
            h.up(COMMA),
            [
                KeyEvent::release(KeyCode::LEFTSHIFT),
                KeyEvent::release(KeyCode::LEFTBRACE)
            ]
        );
    }

    #[test]
    fn always_key_with_shift_held_needs_no_synthesis() {
        let mut h = Harness::new(RepeatClock::PerKey);
        h.down(SHIFT);
        h.down(GRAPH);
        assert_eq!(h.down(COMMA), [KeyEvent::press(KeyCode::LEFTBRACE)]);
        assert_eq!(h.up(COMMA), [KeyEvent::release(KeyCode::LEFTBRACE)]);
    }

    #[test]
    fn modifier_pressed_in_same_tick_applies_to_later_keys() {
        let mut h = Harness::new(RepeatClock::PerKey);
        h.frame.set(NUMLOCK, Some(true));
        h.frame.set(M, Some(true));
        // M (54) is scanned after NUM (44).
        assert_eq!(
            h.tick(),
            [
                KeyEvent::press(KeyCode::NUMLOCK),
                KeyEvent::press(KeyCode::KEY_0)
            ]
        );
    }

    #[test]
    fn release_uses_symbol_sent_on_press() {
        let mut h = Harness::new(RepeatClock::PerKey);
        h.down(NUMLOCK);
        assert_eq!(h.down(M), [KeyEvent::press(KeyCode::KEY_0)]);
        h.up(NUMLOCK);
        assert_eq!(h.up(M), [KeyEvent::release(KeyCode::KEY_0)]);
    }

    #[test]
    fn caps_lock_taps_on_press_and_release() {
        let mut h = Harness::new(RepeatClock::PerKey);
        assert_eq!(
            h.down(CAPS),
            [
                KeyEvent::press(KeyCode::CAPSLOCK),
                KeyEvent::release(KeyCode::CAPSLOCK)
            ]
        );
        assert!(h.tracker.is_pressed(CAPS));
        assert_eq!(
            h.up(CAPS),
            [
                KeyEvent::press(KeyCode::CAPSLOCK),
                KeyEvent::release(KeyCode::CAPSLOCK)
            ]
        );
    }

    fn repeat_ticks(clock: RepeatClock, index: KeyIndex, hold: usize) -> std::vec::Vec<usize> {
        let mut h = Harness::new(clock);
        h.down(index);
        (1..=hold)
            .filter(|_| {
                let events = h.tick();
                events
                    .iter()
                    .any(|event| event.transition == Transition::Repeat)
            })
            .collect()
    }

    #[test]
    fn held_key_repeats_after_thirty_then_every_five() {
        for clock in [RepeatClock::PerKey, RepeatClock::Shared] {
            assert_eq!(repeat_ticks(clock, A, 45), [30, 35, 40, 45]);
        }
    }

    #[test]
    fn modifiers_never_repeat() {
        for index in [CAPS, SHIFT, NUMLOCK, GRAPH] {
            assert!(repeat_ticks(RepeatClock::PerKey, index, 200).is_empty());
            assert!(repeat_ticks(RepeatClock::Shared, index, 200).is_empty());
        }
    }

    #[test]
    fn repeat_events_use_held_symbol() {
        let mut h = Harness::new(RepeatClock::PerKey);
        h.down(A);
        for _ in 1..30 {
            assert!(h.tick().is_empty());
        }
        assert_eq!(h.tick(), [KeyEvent::repeat(KeyCode::A)]);
        assert!(h.tracker.is_repeating(A));

        assert_eq!(h.up(A), [KeyEvent::release(KeyCode::A)]);
        assert!(!h.tracker.is_repeating(A));
        assert_eq!(h.tracker.repeating().count(), 0);
    }

    #[test]
    fn shared_clock_lets_other_keys_delay_repeat() {
        let mut h = Harness::new(RepeatClock::Shared);
        h.down(A);
        for _ in 1..20 {
            h.tick();
        }
        h.down(Z);
        let first = (1..=40).find(|_| !h.tick().is_empty());
        // Both keys now count from Z's press.
        assert_eq!(first, Some(30));
    }

    #[test]
    fn per_key_clock_keeps_each_key_on_its_own_cadence() {
        let mut h = Harness::new(RepeatClock::PerKey);
        h.down(A);
        for _ in 1..20 {
            h.tick();
        }
        h.down(Z);
        // A pressed 20 ticks ago: repeats 10 ticks later, Z 30 ticks later.
        let repeats: std::vec::Vec<(usize, KeyCode)> = (1..=30)
            .flat_map(|tick| {
                h.tick()
                    .into_iter()
                    .map(move |event| (tick, event.key))
            })
            .collect();
        assert_eq!(
            repeats,
            [
                (10, KeyCode::A),
                (15, KeyCode::A),
                (20, KeyCode::A),
                (25, KeyCode::A),
                // Z sits at index 0 and is scanned first.
                (30, KeyCode::Z),
                (30, KeyCode::A)
            ]
        );
    }

    #[test]
    fn unreadable_cell_keeps_its_state() {
        let mut h = Harness::new(RepeatClock::PerKey);
        h.down(Z);
        h.frame.set(Z, None);
        assert!(h.tick().is_empty());
        assert!(h.tracker.is_pressed(Z));

        h.frame.set(A, None);
        assert!(h.tick().is_empty());
        assert!(!h.tracker.is_pressed(A));
    }

    #[test]
    fn step_reports_changes() {
        let mut h = Harness::new(RepeatClock::PerKey);
        let mut events = Events::new();
        assert!(!h.tracker.step(&h.frame, &mut events));
        h.frame.set(GRAPH, Some(true));
        // Silent keys still count as a transition.
        assert!(h.tracker.step(&h.frame, &mut events));
        assert!(events.is_empty());
    }
}
