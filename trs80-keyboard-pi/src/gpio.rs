//! Opens the matrix lines of a pin layout on the Raspberry Pi header.

use anyhow::{anyhow, Context};
use heapless::Vec;
use rppal::gpio::{Gpio, InputPin, IoPin, Mode};
use trs80_keyboard_async::config::StrobePolarity;
use trs80_keyboard_async::geometry::{PinLayout, MAX_LINES};
use trs80_keyboard_async::matrix::Matrix;

pub type PiRow = IoPin;
pub type PiCol = InputPin;
pub type PiMatrix = Matrix<PiRow, PiCol>;

/// BCM GPIO number wired to a physical pin of the 40-pin header.
///
/// Returns `None` for power, ground and ID EEPROM pins.
pub fn bcm(header_pin: u8) -> Option<u8> {
    let bcm = match header_pin {
        3 => 2,
        5 => 3,
        7 => 4,
        8 => 14,
        10 => 15,
        11 => 17,
        12 => 18,
        13 => 27,
        15 => 22,
        16 => 23,
        18 => 24,
        19 => 10,
        21 => 9,
        22 => 25,
        23 => 11,
        24 => 8,
        26 => 7,
        29 => 5,
        31 => 6,
        32 => 12,
        33 => 13,
        35 => 19,
        36 => 16,
        37 => 26,
        38 => 20,
        40 => 21,
        _ => return None,
    };
    Some(bcm)
}

fn open(gpio: &Gpio, header_pin: u8) -> anyhow::Result<rppal::gpio::Pin> {
    let bcm = bcm(header_pin).ok_or_else(|| anyhow!("header pin {header_pin} is not a GPIO"))?;
    gpio.get(bcm)
        .with_context(|| format!("header pin {header_pin} (GPIO{bcm})"))
}

/// Claims the row and column lines of `layout` and wraps them in a [`Matrix`].
///
/// Rows start at the inactive level. Columns get the pull resistor that
/// keeps them at the inactive level while their switch is open. Use
/// [`release_matrix`] to leave the rows as inputs afterwards.
pub fn open_matrix(
    gpio: &Gpio,
    layout: PinLayout,
    polarity: StrobePolarity,
) -> anyhow::Result<PiMatrix> {
    let mut rows: Vec<IoPin, MAX_LINES> = Vec::new();
    for &header_pin in layout.rows() {
        // Latch the inactive level before the line starts driving.
        let mut pin = open(gpio, header_pin)?.into_io(Mode::Input);
        match polarity {
            StrobePolarity::ActiveHigh => pin.set_low(),
            StrobePolarity::ActiveLow => pin.set_high(),
        }
        pin.set_mode(Mode::Output);
        rows.push(pin)
            .map_err(|_| anyhow!("more than {MAX_LINES} row lines"))?;
    }

    let mut cols: Vec<InputPin, MAX_LINES> = Vec::new();
    for &header_pin in layout.cols() {
        let pin = open(gpio, header_pin)?;
        let pin = match polarity {
            StrobePolarity::ActiveHigh => pin.into_input_pulldown(),
            StrobePolarity::ActiveLow => pin.into_input_pullup(),
        };
        cols.push(pin)
            .map_err(|_| anyhow!("more than {MAX_LINES} column lines"))?;
    }

    log::debug!(
        "Layout {} ({}): rows on header pins {:?}, columns on {:?}.",
        layout.number(),
        layout.name(),
        layout.rows(),
        layout.cols()
    );
    Ok(Matrix::new(rows, cols, polarity)?)
}

/// Drives every row inactive, then turns the rows into plain inputs that
/// stay inputs after the process exits.
pub fn release_matrix(matrix: PiMatrix) {
    let (rows, _cols) = matrix.into_lines();
    for mut row in rows {
        row.set_mode(Mode::Input);
        row.set_reset_on_drop(false);
    }
    log::debug!("Matrix rows left as inputs.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_layout_uses_gpio_pins_only() {
        for layout in PinLayout::ALL {
            for &pin in layout.rows().iter().chain(layout.cols()) {
                assert!(bcm(pin).is_some(), "{layout:?} uses header pin {pin}");
            }
        }
    }

    #[test]
    fn layouts_never_share_a_line() {
        for layout in PinLayout::ALL {
            let mut seen = [false; 28];
            for &pin in layout.rows().iter().chain(layout.cols()) {
                let gpio = bcm(pin).unwrap() as usize;
                assert!(!seen[gpio], "{layout:?} uses GPIO{gpio} twice");
                seen[gpio] = true;
            }
        }
    }

    #[test]
    fn layouts_leave_their_interface_free() {
        for layout in PinLayout::ALL {
            for pin in layout.leaves_free() {
                assert!(!layout.rows().contains(pin), "{layout:?} row on {pin}");
                assert!(!layout.cols().contains(pin), "{layout:?} column on {pin}");
            }
        }
    }

    #[test]
    fn power_and_ground_are_not_gpio() {
        for pin in [1, 2, 4, 6, 9, 14, 17, 20, 25, 27, 28, 30, 34, 39, 41] {
            assert_eq!(bcm(pin), None, "header pin {pin}");
        }
        assert_eq!(bcm(7), Some(4));
        assert_eq!(bcm(40), Some(21));
    }
}
