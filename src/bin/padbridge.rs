use std::io::Read;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pipe::Pipe;
use log::{error, info};

use padbridge::bridge::Bridge;
use padbridge::uinput::UinputKeys;

const PORT_PATH: &str = "/dev/ttyUSB0";
const BAUD_RATE: u32 = 115_200;
const READ_TIMEOUT: Duration = Duration::from_millis(100);

static RX_PIPE: Pipe<CriticalSectionRawMutex, 256> = Pipe::new();

/// Reads the static byte pipe fed by the serial pump thread.
struct PipeSource;

impl embedded_io_async::ErrorType for PipeSource {
    type Error = core::convert::Infallible;
}

impl embedded_io_async::Read for PipeSource {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(RX_PIPE.read(buf).await)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let port = serialport::new(PORT_PATH, BAUD_RATE)
        .timeout(READ_TIMEOUT)
        .open()
        .with_context(|| format!("opening {PORT_PATH}"))?;
    let keys = UinputKeys::new().context("creating uinput keyboard")?;

    info!("bridging {PORT_PATH} at {BAUD_RATE} baud");
    thread::spawn(move || pump_serial(port));

    let mut bridge = Bridge::new(PipeSource, keys);
    futures::executor::block_on(bridge.run()).map_err(|e| anyhow!("bridge stopped: {e:?}"))
}

/// Moves bytes from the serial port into the bridge's pipe. A vanished port
/// is fatal for the whole process.
fn pump_serial(mut port: Box<dyn serialport::SerialPort>) {
    let mut buf = [0u8; 256];
    loop {
        match port.read(&mut buf) {
            Ok(0) => {
                error!("{PORT_PATH} closed");
                std::process::exit(1);
            }
            Ok(len) => {
                let mut data = &buf[..len];
                while !data.is_empty() {
                    match RX_PIPE.try_write(data) {
                        Ok(written) => data = &data[written..],
                        Err(_) => thread::sleep(Duration::from_millis(1)),
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
            Err(e) => {
                error!("reading {PORT_PATH} failed: {e}");
                std::process::exit(1);
            }
        }
    }
}
