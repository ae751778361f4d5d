//! Reconciles reported button state against currently-held keys.

use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Instant, Timer};
use embedded_io_async::Read;
use log::{debug, error, warn};

use crate::report::{LineReader, Report, Token};
use crate::{Error, Key, KeySink, Result};

/// A held key unconfirmed by any report for longer than this is released.
pub const RELEASE_INTERVAL: Duration = Duration::from_millis(400);

/// Wake margin past a release deadline; expiry is a strict comparison.
const EXPIRY_SLACK: Duration = Duration::from_millis(1);

const READ_CHUNK: usize = 64;

/// Per-key hold state. An occupied slot means a key-down has been emitted
/// with no matching key-up yet, and holds the time the key's presence was
/// last confirmed by a report.
struct HeldKeys {
    last_seen: [Option<Instant>; Key::COUNT],
}

impl HeldKeys {
    const fn new() -> Self {
        Self {
            last_seen: [None; Key::COUNT],
        }
    }

    fn last_seen(&self, key: Key) -> Option<Instant> {
        self.last_seen[key.index()]
    }

    /// Occupies or refreshes the key's slot. Returns true if the key was not
    /// held before.
    fn hold(&mut self, key: Key, now: Instant) -> bool {
        let slot = &mut self.last_seen[key.index()];
        let newly = slot.is_none();
        *slot = Some(now);
        newly
    }

    /// Vacates the key's slot. Returns true if the key was held.
    fn release(&mut self, key: Key) -> bool {
        self.last_seen[key.index()].take().is_some()
    }
}

pub struct Bridge<R, K> {
    rx: R,
    keys: K,
    line_reader: LineReader,
    held: HeldKeys,
}

impl<R: Read, K: KeySink> Bridge<R, K> {
    pub fn new(rx: R, keys: K) -> Self {
        Self {
            rx,
            keys,
            line_reader: LineReader::new(),
            held: HeldKeys::new(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        loop {
            self.step().await?;
        }
    }

    /// One iteration: wait for serial bytes or the earliest release deadline,
    /// whichever comes first, then release anything that has gone stale.
    pub async fn step(&mut self) -> Result<()> {
        let mut buf = [0u8; READ_CHUNK];
        let deadline = self.next_deadline(Instant::now());

        let read = select(self.rx.read(&mut buf), Timer::at(deadline + EXPIRY_SLACK)).await;
        let now = Instant::now();

        if let Either::First(read) = read {
            match read {
                Ok(0) => {
                    error!("serial source closed");
                    return Err(Error::SerialClosed);
                }
                Ok(len) => self.handle_read(&buf[..len], now)?,
                Err(e) => {
                    error!("serial read failed: {e:?}");
                    return Err(Error::SerialRead);
                }
            }
        }

        self.release_expired(now)
    }

    fn handle_read(&mut self, data: &[u8], now: Instant) -> Result<()> {
        for &byte in data {
            let line = match self.line_reader.handle_byte(byte) {
                Ok(Some(line)) => line,
                Ok(None) => continue,
                Err(e) => {
                    warn!("discarding malformed line: {e:?}");
                    continue;
                }
            };

            debug!("received {:?}", line.as_str());
            match line.parse::<Report>() {
                Ok(report) => self.apply_report(&report, now)?,
                Err(e) => warn!("ignoring unparseable line: {e:?}"),
            }
        }
        Ok(())
    }

    fn apply_report(&mut self, report: &Report, now: Instant) -> Result<()> {
        let tokens = match report {
            Report::ReleaseAll => return self.release_all(),
            Report::Buttons(tokens) => tokens,
        };

        if tokens.contains(&Token::Space) {
            // Momentary press; space is never tracked as held.
            debug!("momentary space press");
            self.key_down(Key::Space)?;
            self.key_up(Key::Space)?;
        }

        for token in tokens {
            let Token::Char(c) = token else { continue };
            let Some(key) = Key::from_token(*c) else {
                continue;
            };
            if self.held.hold(key, now) {
                self.key_down(key)?;
            }
        }

        Ok(())
    }

    fn release_all(&mut self) -> Result<()> {
        for key in Key::ALL {
            if self.held.release(key) {
                self.key_up(key)?;
            }
        }
        Ok(())
    }

    fn release_expired(&mut self, now: Instant) -> Result<()> {
        for key in Key::ALL {
            let Some(last_seen) = self.held.last_seen(key) else {
                continue;
            };
            if now > last_seen + RELEASE_INTERVAL {
                self.held.release(key);
                self.key_up(key)?;
            }
        }
        Ok(())
    }

    fn next_deadline(&self, now: Instant) -> Instant {
        let mut deadline = now + RELEASE_INTERVAL;
        for key in Key::ALL {
            if let Some(last_seen) = self.held.last_seen(key) {
                deadline = deadline.min(last_seen + RELEASE_INTERVAL);
            }
        }
        deadline
    }

    fn key_down(&mut self, key: Key) -> Result<()> {
        self.keys.key_down(key).map_err(|e| {
            error!("key down {key:?} failed: {e:?}");
            Error::Injection
        })
    }

    fn key_up(&mut self, key: Key) -> Result<()> {
        self.keys.key_up(key).map_err(|e| {
            error!("key up {key:?} failed: {e:?}");
            Error::Injection
        })
    }
}
