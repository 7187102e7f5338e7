//! Matrix dimensions, linear key indexing and the predefined pin layouts.

use core::str::FromStr;

use crate::err::ConfigError;
use crate::KeyIndex;

/// Maximum number of row lines, and of column lines, a matrix can have.
pub const MAX_LINES: usize = 16;

/// Rows and columns of a switch matrix and the index every cell maps to.
///
/// A cell at `(row, col)` has the linear index `row * (rows + 1) + col`. The
/// stride of `rows + 1` comes from the TRS-80 wiring; slots a row does not use
/// are never looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixGeometry {
    rows: usize,
    cols: usize,
}

impl MatrixGeometry {
    /// Creates a geometry, rejecting shapes whose indexing would collide.
    pub fn new(rows: usize, cols: usize) -> Result<Self, ConfigError> {
        if rows == 0 || cols == 0 {
            return Err(ConfigError::EmptyMatrix);
        }
        if rows > MAX_LINES || cols > MAX_LINES {
            return Err(ConfigError::TooManyLines { rows, cols });
        }
        if cols > rows + 1 {
            return Err(ConfigError::NotInjective { rows, cols });
        }
        Ok(Self { rows, cols })
    }

    /// Number of driven row lines.
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of sensed column lines.
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Distance between the first cells of two consecutive rows.
    pub const fn stride(&self) -> usize {
        self.rows + 1
    }

    /// Returns the linear index of a cell, or `None` outside the matrix.
    pub fn index(&self, row: usize, col: usize) -> Option<KeyIndex> {
        (row < self.rows && col < self.cols).then(|| row * self.stride() + col)
    }

    /// Returns `true` if some cell of the matrix maps to `index`.
    pub fn contains(&self, index: KeyIndex) -> bool {
        index / self.stride() < self.rows && index % self.stride() < self.cols
    }

    /// Largest index produced by any cell.
    pub fn max_index(&self) -> KeyIndex {
        (self.rows - 1) * self.stride() + self.cols - 1
    }

    /// Checks that every cell index lands inside a keymap of `len` entries.
    pub fn check_fits(&self, len: usize) -> Result<(), ConfigError> {
        let index = self.max_index();
        if index >= len {
            return Err(ConfigError::IndexOutOfRange { index, len });
        }
        Ok(())
    }

    /// Iterates `(row, col, index)` for every cell in scan order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, KeyIndex)> + '_ {
        (0..self.rows)
            .flat_map(move |row| (0..self.cols).map(move |col| (row, col, row * self.stride() + col)))
    }
}

/// Which physical header pins the keyboard ribbon is soldered to.
///
/// The keyboard needs 17 lines, so every layout leaves a different standard
/// interface of the 40-pin header unusable. Pin numbers are physical header
/// positions, not GPIO numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PinLayout {
    /// Leaves SPI0 free (header pins 19, 21, 23, 24, 26).
    #[default]
    Spi0,
    /// Leaves 1-Wire free (header pin 7).
    OneWire,
    /// Leaves PCM and 1-Wire free (header pins 7, 12, 35, 38, 40).
    PcmOneWire,
    /// Leaves the JTAG Alt5 function free (header pins 7, 29, 31, 32, 33).
    JtagAlt5,
}

impl PinLayout {
    /// All layouts, in their numbered order.
    pub const ALL: [PinLayout; 4] = [
        PinLayout::Spi0,
        PinLayout::OneWire,
        PinLayout::PcmOneWire,
        PinLayout::JtagAlt5,
    ];

    /// Looks a layout up by its number (1-4).
    pub fn from_number(number: u8) -> Result<Self, ConfigError> {
        match number {
            1 => Ok(Self::Spi0),
            2 => Ok(Self::OneWire),
            3 => Ok(Self::PcmOneWire),
            4 => Ok(Self::JtagAlt5),
            _ => Err(ConfigError::UnknownLayout),
        }
    }

    /// The layout number (1-4).
    pub const fn number(self) -> u8 {
        match self {
            Self::Spi0 => 1,
            Self::OneWire => 2,
            Self::PcmOneWire => 3,
            Self::JtagAlt5 => 4,
        }
    }

    /// A short human readable name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Spi0 => "spi0",
            Self::OneWire => "one-wire",
            Self::PcmOneWire => "pcm",
            Self::JtagAlt5 => "jtag",
        }
    }

    /// Header pins driving the matrix rows (keyboard pins 12-19).
    pub const fn rows(self) -> &'static [u8] {
        match self {
            Self::Spi0 => &[31, 32, 33, 35, 36, 37, 38, 40],
            Self::OneWire => &[23, 29, 31, 32, 33, 35, 36, 37],
            Self::PcmOneWire => &[24, 26, 29, 31, 32, 33, 36, 37],
            Self::JtagAlt5 => &[23, 24, 26, 35, 36, 37, 38, 40],
        }
    }

    /// Header pins sensing the matrix columns (keyboard pins 1-9).
    pub const fn cols(self) -> &'static [u8] {
        match self {
            Self::Spi0 => &[7, 11, 12, 13, 15, 16, 18, 22, 29],
            Self::OneWire => &[11, 12, 13, 15, 16, 18, 19, 21, 22],
            Self::PcmOneWire => &[11, 13, 15, 16, 18, 19, 21, 22, 23],
            Self::JtagAlt5 => &[11, 12, 13, 15, 16, 18, 19, 21, 22],
        }
    }

    /// Header pins this layout keeps available for other peripherals.
    pub const fn leaves_free(self) -> &'static [u8] {
        match self {
            Self::Spi0 => &[19, 21, 23, 24, 26],
            Self::OneWire => &[7],
            Self::PcmOneWire => &[7, 12, 35, 38, 40],
            Self::JtagAlt5 => &[7, 29, 31, 32, 33],
        }
    }

    /// The matrix geometry this layout wires up.
    pub fn geometry(self) -> Result<MatrixGeometry, ConfigError> {
        MatrixGeometry::new(self.rows().len(), self.cols().len())
    }
}

impl FromStr for PinLayout {
    type Err = ConfigError;

    /// Accepts a layout number or its name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(number) = s.parse::<u8>() {
            return Self::from_number(number);
        }
        Self::ALL
            .into_iter()
            .find(|layout| layout.name().eq_ignore_ascii_case(s))
            .ok_or(ConfigError::UnknownLayout)
    }
}
