//! Virtual keyboard registered through `/dev/uinput`.

use std::io;

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, BusType, EventType, InputEvent, InputId, Key};
use trs80_keyboard_async::keymap::Keymap;
use trs80_keyboard_async::scanner::KeySink;
use trs80_keyboard_async::tracker::KeyEvent;

pub const DEVICE_NAME: &str = "TRS-80 Model 100 Keyboard";
/// RadioShack Corp. (Tandy)
pub const VENDOR: u16 = 0x08b9;
/// Catalogue number 26-3802.
pub const PRODUCT: u16 = 0x3802;
/// Bumped whenever the pin layouts change.
pub const VERSION: u16 = 1;

/// Key codes the device has to advertise to emit everything `keymap` can.
pub fn advertised_keys(keymap: &Keymap) -> AttributeSet<Key> {
    let mut keys = AttributeSet::new();
    for symbol in keymap.symbols() {
        keys.insert(Key::new(symbol.code()));
    }
    keys
}

/// Buffers key events and writes each tick's batch followed by a sync report.
pub struct UinputSink {
    device: VirtualDevice,
    pending: Vec<InputEvent>,
}

impl UinputSink {
    /// Registers the virtual device.
    ///
    /// # Arguments
    ///
    /// * `keymap` - Every symbol it can produce is advertised.
    pub fn new(keymap: &Keymap) -> io::Result<Self> {
        let keys = advertised_keys(keymap);
        let device = VirtualDeviceBuilder::new()?
            .name(DEVICE_NAME)
            .input_id(InputId::new(BusType::BUS_USB, VENDOR, PRODUCT, VERSION))
            .with_keys(&keys)?
            .build()?;
        log::info!("Registered uinput device {DEVICE_NAME:?} with {} keys.", keys.iter().count());
        Ok(Self {
            device,
            pending: Vec::new(),
        })
    }
}

fn input_event(event: KeyEvent) -> InputEvent {
    InputEvent::new(EventType::KEY, event.key.code(), event.transition.value())
}

impl KeySink for UinputSink {
    type Error = io::Error;

    fn emit(&mut self, event: KeyEvent) -> io::Result<()> {
        self.pending.push(input_event(event));
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        // `emit` terminates the batch with SYN_REPORT.
        let result = self.device.emit(&self.pending);
        self.pending.clear();
        result
    }

    fn abandon(&mut self) {
        self.pending.clear();
    }
}
