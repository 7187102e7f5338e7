//! The scan loop tying matrix, tracker, idle controller and output together.

use core::fmt::Debug;

use embassy_time::{Duration, Timer};
use embedded_hal::digital::{InputPin, OutputPin};

use crate::config::KeyboardConfig;
use crate::err::ConfigError;
use crate::idle::IdleRateController;
use crate::keymap::Keymap;
use crate::matrix::Matrix;
use crate::tracker::{Events, Frame, KeyEvent, KeyTracker};
use crate::typematic::Typematic;

/// Destination of the key events, typically a virtual input device.
pub trait KeySink {
    type Error: Debug;

    /// Queues one event.
    fn emit(&mut self, event: KeyEvent) -> Result<(), Self::Error>;

    /// Commits every event queued since the last flush as one batch.
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Drops events queued since the last flush after a failed tick.
    fn abandon(&mut self) {}
}

/// Scans a keyboard matrix and feeds the resulting events to a [`KeySink`].
///
/// All scan state (held keys, timers, idle counter) lives here and is only
/// touched from [`Scanner::scan_once`], which always runs to completion.
/// Cancelling [`Scanner::run`] is therefore only possible between ticks.
pub struct Scanner<ROW, COL, SINK>
where
    ROW: OutputPin,
    COL: InputPin,
    SINK: KeySink,
{
    matrix: Matrix<ROW, COL>,
    tracker: KeyTracker,
    idle: IdleRateController,
    sink: SINK,
    frame: Frame,
    events: Events,
}

impl<ROW, COL, SINK> Scanner<ROW, COL, SINK>
where
    ROW: OutputPin,
    COL: InputPin,
    SINK: KeySink,
{
    /// Creates a new `Scanner`.
    ///
    /// Fails if the configuration is invalid or if the matrix cannot reach
    /// every index the keymap relies on.
    ///
    /// # Arguments
    ///
    /// * `matrix` - The row and column lines.
    /// * `keymap` - Layers to resolve symbols from.
    /// * `sink` - Receiver of the key events.
    /// * `config` - Typematic, idle and polarity settings.
    pub fn new(
        matrix: Matrix<ROW, COL>,
        keymap: Keymap,
        sink: SINK,
        config: KeyboardConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        keymap.check_geometry(matrix.geometry())?;

        let typematic = Typematic::new(config.typematic, config.repeat_clock);
        Ok(Self {
            matrix,
            tracker: KeyTracker::new(keymap, typematic),
            idle: IdleRateController::new(config.idle),
            sink,
            frame: Frame::new(),
            events: Events::new(),
        })
    }

    pub fn tracker(&self) -> &KeyTracker {
        &self.tracker
    }

    pub fn idle(&self) -> &IdleRateController {
        &self.idle
    }

    pub fn sink(&self) -> &SINK {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut SINK {
        &mut self.sink
    }

    /// Runs one scan tick and returns the wait before the next one.
    ///
    /// Strobes every row, runs the key state machine over all cells, and
    /// hands the resulting events to the sink followed by a single flush.
    /// A sink failure abandons the rest of the tick.
    pub fn scan_once(&mut self) -> Duration {
        self.matrix.sample(&mut self.frame);

        self.events.clear();
        let changed = self.tracker.step(&self.frame, &mut self.events);
        let interval = self.idle.observe(changed);

        if !self.events.is_empty() {
            if let Err(err) = self.deliver() {
                log::warn!("Abandoning tick, output failed: {err:?}");
                self.sink.abandon();
            }
        }
        interval
    }

    fn deliver(&mut self) -> Result<(), SINK::Error> {
        for event in &self.events {
            log::trace!("{:?} {:?}", event.transition, event.key);
            self.sink.emit(*event)?;
        }
        self.sink.flush()
    }

    /// Scans forever, waiting the idle controller's interval before each tick.
    ///
    /// Never returns; stop it by dropping the future, e.g. by selecting it
    /// against a shutdown signal. The rows are released when the scanner or
    /// its matrix is dropped.
    pub async fn run(&mut self) {
        let geometry = self.matrix.geometry();
        log::info!(
            "Scanning {} x {} matrix every {} ms.",
            geometry.rows(),
            geometry.cols(),
            self.idle.interval().as_millis()
        );
        loop {
            Timer::after(self.idle.interval()).await;
            self.scan_once();
        }
    }

    /// Stops scanning and hands the matrix back, e.g. to reconfigure its lines.
    pub fn into_matrix(self) -> Matrix<ROW, COL> {
        self.matrix
    }
}
