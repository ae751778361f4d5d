//! Scripted stand-in for the serial-connected pad, for development and
//! testing without the microcontroller attached.

use embassy_time::{Duration, Timer};
use embedded_io_async::Write;
use log::info;

use crate::{Error, Result};

/// One step of a pad script: wait, then send a line.
pub struct ScriptStep {
    pub delay: Duration,
    pub line: &'static str,
}

pub struct FakePad<W> {
    tx: W,
}

impl<W: Write> FakePad<W> {
    pub fn new(tx: W) -> Self {
        Self { tx }
    }

    /// Plays the script, terminating each line with a newline.
    pub async fn run(&mut self, script: &[ScriptStep]) -> Result<()> {
        for step in script {
            Timer::after(step.delay).await;
            info!("FAKE: {}", step.line);
            self.send_line(step.line).await?;
        }
        Ok(())
    }

    async fn send_line(&mut self, line: &str) -> Result<()> {
        self.tx
            .write_all(line.as_bytes())
            .await
            .map_err(|_| Error::SerialWrite)?;
        self.tx
            .write_all(b"\n")
            .await
            .map_err(|_| Error::SerialWrite)
    }
}
