//! Scans a TRS-80 Model 100 keyboard wired to the Raspberry Pi header and
//! replays it on a virtual Linux input device.
//!
//! The pin layout and repeat clock are read from `TRS80_PIN_LAYOUT` and
//! `TRS80_REPEAT_CLOCK`; log output is controlled through `RUST_LOG`.
//! Interrupting the process stops scanning between two ticks and releases
//! every GPIO line before exiting.

use anyhow::Context;
use embassy_executor::Executor;
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use rppal::gpio::Gpio;
use static_cell::StaticCell;
use trs80_keyboard_async::keymap::{Keymap, TRS80_MODEL_100};
use trs80_keyboard_async::scanner::Scanner;

mod config;
mod gpio;
mod uinput;

use config::HostConfig;
use uinput::UinputSink;

type PiScanner = Scanner<gpio::PiRow, gpio::PiCol, UinputSink>;

static EXECUTOR: StaticCell<Executor> = StaticCell::new();
static SHUTDOWN: Signal<CriticalSectionRawMutex, ()> = Signal::new();

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let scanner = match setup() {
        Ok(scanner) => scanner,
        Err(err) => {
            log::error!("{err:#}");
            std::process::exit(1);
        }
    };

    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        spawner.must_spawn(scan(scanner));
    });
}

/// Validates the configuration and claims every resource scanning needs.
fn setup() -> anyhow::Result<PiScanner> {
    let config = HostConfig::from_env()?;
    let keymap = Keymap::build(&TRS80_MODEL_100).context("building keymap")?;
    keymap
        .check_geometry(&config.layout.geometry()?)
        .with_context(|| format!("layout {}", config.layout.name()))?;

    ctrlc::set_handler(|| SHUTDOWN.signal(())).context("installing interrupt handler")?;

    let gpio = Gpio::new().context("opening GPIO")?;
    let matrix = gpio::open_matrix(&gpio, config.layout, config.keyboard.polarity)?;
    let sink = UinputSink::new(&keymap).context("creating uinput device")?;

    log::info!(
        "Layout {} ({}), {:?} repeat clock.",
        config.layout.number(),
        config.layout.name(),
        config.keyboard.repeat_clock
    );
    Ok(Scanner::new(matrix, keymap, sink, config.keyboard)?)
}

/// Scans until interrupted, then releases the lines and exits.
#[embassy_executor::task]
async fn scan(mut scanner: PiScanner) {
    if let Either::Second(()) = select(scanner.run(), SHUTDOWN.wait()).await {
        log::info!("Interrupted, releasing GPIO lines.");
    }
    gpio::release_matrix(scanner.into_matrix());
    log::info!("Stopped.");
    std::process::exit(0);
}
