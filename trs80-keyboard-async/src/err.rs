//! Error types for the keyboard core.

use core::fmt::{self, Debug, Display};

use crate::KeyIndex;

/// A configuration problem detected before scanning starts.
///
/// These are fatal: a scanner is never constructed from an invalid
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A matrix needs at least one row and one column.
    EmptyMatrix,
    /// More lines were supplied than the matrix can hold.
    TooManyLines { rows: usize, cols: usize },
    /// The column count exceeds the row stride, so two cells would share an index.
    NotInjective { rows: usize, cols: usize },
    /// The highest cell index falls outside the keymap.
    IndexOutOfRange { index: KeyIndex, len: usize },
    /// A modifier key sits at an index the matrix never scans.
    ModifierUnreachable { name: &'static str, index: KeyIndex },
    /// An overlay patches an index outside the keymap.
    OverlayOutOfRange { overlay: &'static str, index: KeyIndex },
    /// The layout number does not name one of the predefined layouts.
    UnknownLayout,
    /// The repeat clock name is neither `shared` nor `per-key`.
    UnknownRepeatClock,
    /// A typematic threshold of zero ticks would never fire.
    ZeroRepeatThreshold,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyMatrix => write!(f, "matrix has no rows or no columns"),
            Self::TooManyLines { rows, cols } => {
                write!(f, "{rows} rows x {cols} columns exceeds the line capacity")
            }
            Self::NotInjective { rows, cols } => write!(
                f,
                "{cols} columns do not fit the row stride of {} for {rows} rows",
                rows + 1
            ),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "matrix index {index} outside keymap of {len} entries")
            }
            Self::ModifierUnreachable { name, index } => {
                write!(f, "{name} modifier at index {index} is not scanned")
            }
            Self::OverlayOutOfRange { overlay, index } => {
                write!(f, "overlay {overlay} patches index {index} outside the keymap")
            }
            Self::UnknownLayout => write!(f, "unknown pin layout"),
            Self::UnknownRepeatClock => write!(f, "repeat clock must be shared or per-key"),
            Self::ZeroRepeatThreshold => write!(f, "typematic thresholds must be non-zero"),
        }
    }
}

impl core::error::Error for ConfigError {}

/// A digital line failure during a scan tick.
///
/// The matrix logs these and treats the affected cells as unchanged.
pub enum PinError<TOUTERR, TINERR> {
    /// Driving a row line failed.
    Output { row: usize, err: TOUTERR },
    /// Reading a column line failed.
    Input { row: usize, col: usize, err: TINERR },
}

impl<TOUTERR: Debug, TINERR: Debug> Debug for PinError<TOUTERR, TINERR> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Output { row, err } => write!(f, "Output(row {row}: {err:?})"),
            Self::Input { row, col, err } => write!(f, "Input(row {row}, col {col}: {err:?})"),
        }
    }
}
