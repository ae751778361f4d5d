#![cfg_attr(not(feature = "std"), no_std)]

pub mod bridge;
pub mod fake;
pub mod report;
#[cfg(feature = "std")]
pub mod uinput;

pub use bridge::Bridge;
pub use report::Report;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    ParseError,
    LineTooLong,
    SerialRead,
    SerialWrite,
    SerialClosed,
    Injection,
}

pub type Result<T> = core::result::Result<T, Error>;

/// Logical keys reported by the pad.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Key {
    A,
    W,
    D,
    S,
    F,
    Space,
    Q,
    E,
}

impl Key {
    pub const COUNT: usize = 8;

    pub const ALL: [Key; Key::COUNT] = [
        Key::A,
        Key::W,
        Key::D,
        Key::S,
        Key::F,
        Key::Space,
        Key::Q,
        Key::E,
    ];

    /// Key for a single-character wire token. The pad reports space as the
    /// literal word "space", which is matched by the report parser instead.
    pub const fn from_token(token: char) -> Option<Self> {
        match token {
            'a' => Some(Key::A),
            'w' => Some(Key::W),
            'd' => Some(Key::D),
            's' => Some(Key::S),
            'f' => Some(Key::F),
            'q' => Some(Key::Q),
            'e' => Some(Key::E),
            _ => None,
        }
    }

    /// Linux input event code (input-event-codes.h).
    pub const fn event_code(&self) -> u16 {
        match self {
            Key::A => 30,
            Key::W => 17,
            Key::D => 32,
            Key::S => 31,
            Key::F => 33,
            Key::Space => 57,
            Key::Q => 16,
            Key::E => 18,
        }
    }

    pub(crate) const fn index(&self) -> usize {
        *self as usize
    }
}

/// Synthetic keyboard output.
pub trait KeySink {
    type Error: core::fmt::Debug;

    fn key_down(&mut self, key: Key) -> core::result::Result<(), Self::Error>;
    fn key_up(&mut self, key: Key) -> core::result::Result<(), Self::Error>;
}
