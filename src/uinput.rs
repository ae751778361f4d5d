//! Key injection through a Linux uinput virtual keyboard.

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, EventType, InputEvent};

use crate::{Key, KeySink};

pub struct UinputKeys {
    device: VirtualDevice,
}

impl UinputKeys {
    pub fn new() -> std::io::Result<Self> {
        let mut keys = AttributeSet::<evdev::Key>::new();
        for key in Key::ALL {
            keys.insert(evdev::Key::new(key.event_code()));
        }

        let device = VirtualDeviceBuilder::new()?
            .name("padbridge virtual keyboard")
            .with_keys(&keys)?
            .build()?;

        Ok(Self { device })
    }

    fn emit(&mut self, key: Key, value: i32) -> std::io::Result<()> {
        let event = InputEvent::new(EventType::KEY, key.event_code(), value);
        self.device.emit(&[event])
    }
}

impl KeySink for UinputKeys {
    type Error = std::io::Error;

    fn key_down(&mut self, key: Key) -> std::io::Result<()> {
        self.emit(key, 1)
    }

    fn key_up(&mut self, key: Key) -> std::io::Result<()> {
        self.emit(key, 0)
    }
}
