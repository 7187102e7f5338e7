//! Layered keymap: descriptors, overlays and the layer resolver.
//!
//! A keymap is a table of eight precomputed [`Layer`]s. Each one starts as a
//! copy of the base layer and gets a fixed sequence of [`Overlay`]s applied
//! depending on which of the three layer modifiers (NUM, SHIFT, GRPH) it
//! stands for. Lookups at scan time are then a plain array index.

mod trs80;

pub use trs80::TRS80_MODEL_100;

use crate::err::ConfigError;
use crate::geometry::MatrixGeometry;
use crate::keycode::KeyCode;
use crate::{KeyIndex, KEYMAP_LEN};

/// Number of layers, one per combination of the three layer modifiers.
pub const LAYER_COUNT: usize = 8;

/// How a key treats the physical SHIFT modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftPolicy {
    /// Shifted only while SHIFT is held.
    Default,
    /// Always emitted shifted; SHIFT is synthesized if not held.
    Always,
    /// Never emitted shifted; a held SHIFT is released around the key.
    Never,
}

/// The symbol a matrix position produces in one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDescriptor {
    /// Key code to emit.
    pub symbol: KeyCode,
    /// Interaction with the SHIFT modifier.
    pub shift: ShiftPolicy,
}

impl KeyDescriptor {
    /// A descriptor following the SHIFT modifier.
    pub const fn new(symbol: KeyCode) -> Self {
        Self {
            symbol,
            shift: ShiftPolicy::Default,
        }
    }

    /// A descriptor always emitted shifted.
    pub const fn always(symbol: KeyCode) -> Self {
        Self {
            symbol,
            shift: ShiftPolicy::Always,
        }
    }

    /// A descriptor never emitted shifted.
    pub const fn never(symbol: KeyCode) -> Self {
        Self {
            symbol,
            shift: ShiftPolicy::Never,
        }
    }

    const UNMAPPED: KeyDescriptor = KeyDescriptor::new(KeyCode::RESERVED);
}

/// A named list of `(index, descriptor)` replacements.
#[derive(Debug, Clone, Copy)]
pub struct Overlay {
    /// Used in logs and configuration errors.
    pub name: &'static str,
    /// Replacements, applied in order.
    pub patches: &'static [(KeyIndex, KeyDescriptor)],
}

impl Overlay {
    fn check(&self) -> Result<(), ConfigError> {
        match self.patches.iter().find(|(index, _)| *index >= KEYMAP_LEN) {
            Some((index, _)) => Err(ConfigError::OverlayOutOfRange {
                overlay: self.name,
                index: *index,
            }),
            None => Ok(()),
        }
    }
}

/// One complete assignment of descriptors to every matrix index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    keys: [KeyDescriptor; KEYMAP_LEN],
}

impl Layer {
    /// Builds a layer from bare key codes, all with [`ShiftPolicy::Default`].
    pub fn from_symbols(symbols: &[KeyCode; KEYMAP_LEN]) -> Self {
        Self {
            keys: symbols.map(KeyDescriptor::new),
        }
    }

    /// Returns the descriptor at `index`.
    ///
    /// Indices past the table read as unmapped.
    pub fn get(&self, index: KeyIndex) -> KeyDescriptor {
        self.keys
            .get(index)
            .copied()
            .unwrap_or(KeyDescriptor::UNMAPPED)
    }

    /// Iterates all descriptors in index order.
    pub fn iter(&self) -> impl Iterator<Item = &KeyDescriptor> {
        self.keys.iter()
    }

    fn apply(&mut self, overlay: &Overlay) {
        for (index, descriptor) in overlay.patches {
            self.keys[*index] = *descriptor;
        }
    }
}

/// Matrix indices of the keys with special handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModifierKeys {
    /// SHIFT: selects the shift layers and is the key synthesized for shift policies.
    pub shift: KeyIndex,
    /// NUM: selects the numeric keypad layers.
    pub numlock: KeyIndex,
    /// GRPH: selects the graph layers.
    pub graph: KeyIndex,
    /// CAPS LOCK: emitted as a tap on both press and release.
    pub caps_lock: KeyIndex,
}

impl ModifierKeys {
    /// Returns `true` if holding this key must never auto-repeat.
    pub fn never_repeats(&self, index: KeyIndex) -> bool {
        index == self.caps_lock || index == self.shift || index == self.numlock || index == self.graph
    }

    fn iter(&self) -> [(&'static str, KeyIndex); 4] {
        [
            ("shift", self.shift),
            ("numlock", self.numlock),
            ("graph", self.graph),
            ("caps lock", self.caps_lock),
        ]
    }
}

/// Everything needed to build a [`Keymap`].
#[derive(Debug, Clone, Copy)]
pub struct KeymapDefinition {
    /// Base layer symbols, all following SHIFT.
    pub base: [KeyCode; KEYMAP_LEN],
    /// Positions of the special keys.
    pub modifiers: ModifierKeys,
    /// Applied for layers with NUM held.
    pub numlock: Overlay,
    /// Applied for layers with SHIFT held.
    pub shift_fix: Overlay,
    /// Applied for layers with GRPH held.
    pub graph: Overlay,
    /// Applied last, for layers with both GRPH and SHIFT held.
    pub graph_shift: Overlay,
}

/// Three-bit layer address: bit 0 NUM, bit 1 SHIFT, bit 2 GRPH.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerSelector(u8);

impl LayerSelector {
    const NUMLOCK: u8 = 1 << 0;
    const SHIFT: u8 = 1 << 1;
    const GRAPH: u8 = 1 << 2;

    /// Composes a selector from the three modifier states.
    pub const fn new(numlock: bool, shift: bool, graph: bool) -> Self {
        Self(
            (numlock as u8) * Self::NUMLOCK
                | (shift as u8) * Self::SHIFT
                | (graph as u8) * Self::GRAPH,
        )
    }

    /// All eight selectors in table order.
    pub fn all() -> impl Iterator<Item = LayerSelector> {
        (0..LAYER_COUNT as u8).map(LayerSelector)
    }

    /// Position in the layer table.
    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn numlock(self) -> bool {
        self.0 & Self::NUMLOCK != 0
    }

    pub const fn shift(self) -> bool {
        self.0 & Self::SHIFT != 0
    }

    pub const fn graph(self) -> bool {
        self.0 & Self::GRAPH != 0
    }
}

/// The eight precomputed layers of a keyboard.
#[derive(Debug, Clone)]
pub struct Keymap {
    layers: [Layer; LAYER_COUNT],
    modifiers: ModifierKeys,
    shift_symbol: KeyCode,
}

impl Keymap {
    /// Builds every layer from a definition.
    ///
    /// Overlays are applied to a fresh copy of the base in a fixed order:
    /// numlock, shift-fix, graph, graph+shift. A later overlay wins where two
    /// patch the same index.
    pub fn build(definition: &KeymapDefinition) -> Result<Self, ConfigError> {
        for overlay in [
            &definition.numlock,
            &definition.shift_fix,
            &definition.graph,
            &definition.graph_shift,
        ] {
            overlay.check()?;
        }
        for (name, index) in definition.modifiers.iter() {
            if index >= KEYMAP_LEN {
                return Err(ConfigError::ModifierUnreachable { name, index });
            }
        }

        let base = Layer::from_symbols(&definition.base);
        let layers = core::array::from_fn(|bits| {
            let selector = LayerSelector(bits as u8);
            let mut layer = base.clone();
            if selector.numlock() {
                layer.apply(&definition.numlock);
            }
            if selector.shift() {
                layer.apply(&definition.shift_fix);
            }
            if selector.graph() {
                layer.apply(&definition.graph);
            }
            if selector.graph() && selector.shift() {
                layer.apply(&definition.graph_shift);
            }
            layer
        });

        let modifiers = definition.modifiers;
        Ok(Self {
            shift_symbol: base.get(modifiers.shift).symbol,
            layers,
            modifiers,
        })
    }

    /// Returns the layer stored at `selector`.
    pub fn layer(&self, selector: LayerSelector) -> &Layer {
        &self.layers[selector.bits() as usize]
    }

    /// Positions of the special keys.
    pub fn modifiers(&self) -> &ModifierKeys {
        &self.modifiers
    }

    /// Key code of the SHIFT key, used when shift state has to be synthesized.
    pub fn shift_symbol(&self) -> KeyCode {
        self.shift_symbol
    }

    /// Computes the selector for the current set of held keys.
    pub fn selector(&self, is_pressed: impl Fn(KeyIndex) -> bool) -> LayerSelector {
        LayerSelector::new(
            is_pressed(self.modifiers.numlock),
            is_pressed(self.modifiers.shift),
            is_pressed(self.modifiers.graph),
        )
    }

    /// Resolves the active layer for the current set of held keys.
    ///
    /// Pure: the result only changes when one of the layer modifiers does, so
    /// callers re-resolve after every press or release.
    pub fn resolve(&self, is_pressed: impl Fn(KeyIndex) -> bool) -> &Layer {
        self.layer(self.selector(is_pressed))
    }

    /// Checks that every special key can actually be reached by `geometry`
    /// and that no cell indexes past the table.
    pub fn check_geometry(&self, geometry: &MatrixGeometry) -> Result<(), ConfigError> {
        geometry.check_fits(KEYMAP_LEN)?;
        for (name, index) in self.modifiers.iter() {
            if !geometry.contains(index) {
                return Err(ConfigError::ModifierUnreachable { name, index });
            }
        }
        Ok(())
    }

    /// Every key code any layer can emit, including SHIFT. May repeat codes.
    pub fn symbols(&self) -> impl Iterator<Item = KeyCode> + '_ {
        self.layers
            .iter()
            .flat_map(|layer| layer.iter().map(|descriptor| descriptor.symbol))
            .chain(core::iter::once(self.shift_symbol))
            .filter(|symbol| !symbol.is_reserved())
    }
}
