//! Sensor and actuator collaborators
//!
//! The cart-pole talks over a serial line: it prints `<angle>,<position>`
//! per sample and accepts one command line per actuation. `--mock` runs
//! put the same line protocol on stdin/stdout.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;

use tracing::warn;

use crate::error::{ControlError, Result};

/// Source of plaintext measurements
pub trait Sensor {
    /// Next valid measurement, or `None` once the source is exhausted.
    fn read_measurement(&mut self) -> Result<Option<Vec<f64>>>;
}

/// Sink for plaintext control outputs
pub trait Actuator {
    fn actuate(&mut self, u: &[f64]) -> Result<()>;

    /// Return the device to its rest state
    fn reset(&mut self) -> Result<()>;
}

/// Parse `"<v0>,<v1>,..."` with exactly `fields` entries
pub fn parse_measurement(line: &str, fields: usize) -> Option<Vec<f64>> {
    let values: Vec<f64> = line
        .trim()
        .split(',')
        .map(|s| s.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    if values.len() != fields || values.iter().any(|v| !v.is_finite()) {
        return None;
    }
    Some(values)
}

/// Format `u` as six-decimal values joined by `,`
pub fn format_command(u: &[f64]) -> String {
    let mut line = u
        .iter()
        .map(|v| format!("{:.6}", v))
        .collect::<Vec<_>>()
        .join(",");
    line.push('\n');
    line
}

/// Line-oriented sensor over any buffered reader
pub struct LineSensor<R> {
    reader: R,
    fields: usize,
    skipped: u64,
}

impl<R: BufRead> LineSensor<R> {
    pub fn new(reader: R, fields: usize) -> Self {
        Self {
            reader,
            fields,
            skipped: 0,
        }
    }

    /// Lines dropped as empty or malformed so far
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

impl<R: BufRead> Sensor for LineSensor<R> {
    fn read_measurement(&mut self) -> Result<Option<Vec<f64>>> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            match parse_measurement(&line, self.fields) {
                Some(values) => return Ok(Some(values)),
                None => {
                    self.skipped += 1;
                    warn!(line = %line.trim_end(), "skipping malformed sensor line");
                }
            }
        }
    }
}

/// Line-oriented actuator over any writer
pub struct LineActuator<W> {
    writer: W,
}

impl<W: Write> LineActuator<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Actuator for LineActuator<W> {
    fn actuate(&mut self, u: &[f64]) -> Result<()> {
        self.writer.write_all(format_command(u).as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.writer.write_all(b"r\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

fn baud_constant(baud: u32) -> Result<libc::speed_t> {
    Ok(match baud {
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        230400 => libc::B230400,
        other => {
            return Err(ControlError::InvalidParams(format!(
                "unsupported baud rate {}",
                other
            )))
        }
    })
}

/// Open a serial device in raw 8N1 mode at `baud`
pub fn open_serial(path: &Path, baud: u32) -> Result<File> {
    let speed = baud_constant(baud)?;
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NOCTTY)
        .open(path)?;
    let fd = file.as_raw_fd();

    // SAFETY: fd is an open descriptor owned by `file`; tio is fully
    // initialised by tcgetattr before use.
    unsafe {
        let mut tio: libc::termios = std::mem::zeroed();
        if libc::tcgetattr(fd, &mut tio) != 0 {
            return Err(io::Error::last_os_error().into());
        }
        libc::cfmakeraw(&mut tio);
        tio.c_cflag |= libc::CLOCAL | libc::CREAD;
        tio.c_cc[libc::VMIN] = 1;
        tio.c_cc[libc::VTIME] = 0;
        if libc::cfsetispeed(&mut tio, speed) != 0 || libc::cfsetospeed(&mut tio, speed) != 0 {
            return Err(io::Error::last_os_error().into());
        }
        if libc::tcsetattr(fd, libc::TCSANOW, &tio) != 0 {
            return Err(io::Error::last_os_error().into());
        }
    }
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_measurement() {
        assert_eq!(parse_measurement("1.5,-2\n", 2), Some(vec![1.5, -2.0]));
        assert_eq!(parse_measurement(" 0.25 , 3 \r\n", 2), Some(vec![0.25, 3.0]));
        assert_eq!(parse_measurement("1.5\n", 2), None);
        assert_eq!(parse_measurement("1,2,3", 2), None);
        assert_eq!(parse_measurement("a,b", 2), None);
        assert_eq!(parse_measurement("", 2), None);
        assert_eq!(parse_measurement("NaN,1", 2), None);
    }

    #[test]
    fn test_sensor_skips_bad_lines() {
        let input = "\n1,2\ngarbage\n,\n3.5,-4\n";
        let mut sensor = LineSensor::new(Cursor::new(input), 2);
        assert_eq!(sensor.read_measurement().unwrap(), Some(vec![1.0, 2.0]));
        assert_eq!(sensor.read_measurement().unwrap(), Some(vec![3.5, -4.0]));
        assert_eq!(sensor.read_measurement().unwrap(), None);
        assert_eq!(sensor.skipped(), 3);
    }

    #[test]
    fn test_actuator_format() {
        let mut actuator = LineActuator::new(Vec::new());
        actuator.actuate(&[1.0]).unwrap();
        actuator.actuate(&[-0.1234567, 2.5]).unwrap();
        actuator.reset().unwrap();
        assert_eq!(
            String::from_utf8(actuator.into_inner()).unwrap(),
            "1.000000\n-0.123457,2.500000\nr\n"
        );
    }

    #[test]
    fn test_unsupported_baud() {
        assert!(open_serial(Path::new("/nonexistent/tty"), 12345).is_err());
    }
}
