//! An asynchronous, `no_std` driver core for the TRS-80 Model 100 keyboard
//! wired directly to general-purpose I/O lines.
//!
//! The keyboard is a passive 8 x 9 switch matrix. This crate strobes its rows,
//! samples its columns, tracks every key through press, hold and release, picks
//! the active symbol layer from the held modifiers (SHIFT, GRPH, NUM) and
//! produces key events with typematic repeat. The scan rate drops after a
//! period of inactivity and comes back on the next key change.
//!
//! Everything hardware specific stays behind two seams:
//!
//! * the row and column lines are `embedded-hal` digital pins,
//! * events are handed to a [`scanner::KeySink`], typically a uinput device.
//!
//! # Usage
//!
//! ```no_run
//! # use core::convert::Infallible;
//! # struct Row;
//! # impl embedded_hal::digital::ErrorType for Row { type Error = Infallible; }
//! # impl embedded_hal::digital::OutputPin for Row {
//! #     fn set_low(&mut self) -> Result<(), Infallible> { Ok(()) }
//! #     fn set_high(&mut self) -> Result<(), Infallible> { Ok(()) }
//! # }
//! # struct Col;
//! # impl embedded_hal::digital::ErrorType for Col { type Error = Infallible; }
//! # impl embedded_hal::digital::InputPin for Col {
//! #     fn is_high(&mut self) -> Result<bool, Infallible> { Ok(false) }
//! #     fn is_low(&mut self) -> Result<bool, Infallible> { Ok(true) }
//! # }
//! # struct Sink;
//! # impl trs80_keyboard_async::scanner::KeySink for Sink {
//! #     type Error = Infallible;
//! #     fn emit(&mut self, _: trs80_keyboard_async::tracker::KeyEvent) -> Result<(), Infallible> { Ok(()) }
//! #     fn flush(&mut self) -> Result<(), Infallible> { Ok(()) }
//! # }
//! # async fn scan(rows: heapless::Vec<Row, 16>, cols: heapless::Vec<Col, 16>, sink: Sink) {
//! use trs80_keyboard_async::config::KeyboardConfig;
//! use trs80_keyboard_async::keymap::{Keymap, TRS80_MODEL_100};
//! use trs80_keyboard_async::matrix::Matrix;
//! use trs80_keyboard_async::scanner::Scanner;
//!
//! let config = KeyboardConfig::default();
//! let keymap = Keymap::build(&TRS80_MODEL_100).unwrap();
//! let matrix = Matrix::new(rows, cols, config.polarity).unwrap();
//! let mut scanner = Scanner::new(matrix, keymap, sink, config).unwrap();
//!
//! // Runs until the future is dropped; dropping the scanner releases the rows.
//! scanner.run().await;
//! # }
//! ```

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod err;
pub mod geometry;
pub mod idle;
pub mod keycode;
pub mod keymap;
pub mod matrix;
pub mod scanner;
pub mod tracker;
pub mod typematic;

/// Linear position of a key switch in the keymap, see [`geometry::MatrixGeometry::index`].
pub type KeyIndex = usize;

/// Number of slots in every keymap layer.
///
/// Nine slots per row for nine row positions; the 8-row TRS-80 matrix uses the
/// first 72 and the last row is never wired.
pub const KEYMAP_LEN: usize = 81;
