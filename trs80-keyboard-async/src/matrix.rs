//! Row strobing and column sampling over `embedded-hal` digital pins.

use embedded_hal::digital::{InputPin, OutputPin};
use heapless::Vec;

use crate::config::StrobePolarity;
use crate::err::{ConfigError, PinError};
use crate::geometry::{MatrixGeometry, MAX_LINES};
use crate::tracker::Frame;

/// The row and column lines of a switch matrix.
///
/// Rows are outputs and idle at the inactive level. A scan drives one row
/// active at a time and reads every column while it is. Dropping the matrix
/// drives every row inactive again before the pins themselves are dropped.
pub struct Matrix<ROW, COL>
where
    ROW: OutputPin,
    COL: InputPin,
{
    rows: Vec<ROW, MAX_LINES>,
    cols: Vec<COL, MAX_LINES>,
    polarity: StrobePolarity,
    geometry: MatrixGeometry,
}

impl<ROW, COL> Matrix<ROW, COL>
where
    ROW: OutputPin,
    COL: InputPin,
{
    /// Creates a matrix and drives every row to its inactive level.
    ///
    /// # Arguments
    ///
    /// * `rows` - Output pins, in row order.
    /// * `cols` - Input pins, in column order, already configured with the
    ///   pull resistor matching `polarity`.
    /// * `polarity` - Which level strobes a row and marks a closed switch.
    pub fn new(
        rows: Vec<ROW, MAX_LINES>,
        cols: Vec<COL, MAX_LINES>,
        polarity: StrobePolarity,
    ) -> Result<Self, ConfigError> {
        let geometry = MatrixGeometry::new(rows.len(), cols.len())?;
        let mut matrix = Self {
            rows,
            cols,
            polarity,
            geometry,
        };
        matrix.release();
        Ok(matrix)
    }

    pub fn geometry(&self) -> &MatrixGeometry {
        &self.geometry
    }

    /// Samples every cell into `frame`.
    ///
    /// A row that cannot be strobed leaves its cells unread, and so does a
    /// column read failure for that one cell. Returns the number of failures.
    pub fn sample(&mut self, frame: &mut Frame) -> usize {
        let mut failures = 0;
        for row in 0..self.geometry.rows() {
            if let Err(err) = self.strobe(row, true) {
                log::warn!("Skipping row this tick: {err:?}");
                failures += 1;
                for col in 0..self.geometry.cols() {
                    if let Some(index) = self.geometry.index(row, col) {
                        frame.set(index, None);
                    }
                }
                if let Err(err) = self.strobe(row, false) {
                    log::warn!("Failed to idle row: {err:?}");
                }
                continue;
            }

            for col in 0..self.geometry.cols() {
                let Some(index) = self.geometry.index(row, col) else {
                    continue;
                };
                let sample = match self.read(row, col) {
                    Ok(closed) => Some(closed),
                    Err(err) => {
                        log::warn!("Skipping cell this tick: {err:?}");
                        failures += 1;
                        None
                    }
                };
                frame.set(index, sample);
            }

            if let Err(err) = self.strobe(row, false) {
                log::warn!("Failed to idle row: {err:?}");
                failures += 1;
            }
        }
        failures
    }

    /// Drives every row to its inactive level.
    pub fn release(&mut self) {
        for row in 0..self.rows.len() {
            if let Err(err) = self.strobe(row, false) {
                log::warn!("Failed to release row: {err:?}");
            }
        }
    }

    /// Releases every row and hands the lines back, rows then columns.
    pub fn into_lines(mut self) -> (Vec<ROW, MAX_LINES>, Vec<COL, MAX_LINES>) {
        self.release();
        let rows = core::mem::take(&mut self.rows);
        let cols = core::mem::take(&mut self.cols);
        (rows, cols)
    }

    fn strobe(&mut self, row: usize, active: bool) -> Result<(), PinError<ROW::Error, COL::Error>> {
        let high = active == (self.polarity == StrobePolarity::ActiveHigh);
        let pin = &mut self.rows[row];
        let result = if high { pin.set_high() } else { pin.set_low() };
        result.map_err(|err| PinError::Output { row, err })
    }

    fn read(&mut self, row: usize, col: usize) -> Result<bool, PinError<ROW::Error, COL::Error>> {
        let pin = &mut self.cols[col];
        let result = match self.polarity {
            StrobePolarity::ActiveHigh => pin.is_high(),
            StrobePolarity::ActiveLow => pin.is_low(),
        };
        result.map_err(|err| PinError::Input { row, col, err })
    }
}

impl<ROW, COL> Drop for Matrix<ROW, COL>
where
    ROW: OutputPin,
    COL: InputPin,
{
    fn drop(&mut self) {
        log::debug!("Releasing {} matrix rows.", self.rows.len());
        self.release();
    }
}
