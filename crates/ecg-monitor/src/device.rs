//! Input devices: serial port, standard input or the built-in simulator
//!
//! Every device is read by its own task that forwards decoded lines over a
//! bounded channel, so the run loop only ever awaits a channel receive.

use crate::config::{MonitorConfig, SourceKind};
use ecg_core::{decode_line, EcgError, EcgResult};
use ecg_simulation::{spawn_line_stream, EcgSimConfig, EcgSimulator, LineStreamConfig, LineStreamStats};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, ReadBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Substrings of `/dev/serial/by-id` names that identify likely boards
pub const PORT_KEYWORDS: [&str; 8] = [
    "mbed",
    "stlink",
    "usb serial",
    "usb-serial",
    "arduino",
    "cp210",
    "ch340",
    "cdc",
];

const LINE_CHANNEL_CAPACITY: usize = 1024;

/// A serial port candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Device node, e.g. `/dev/ttyACM0`
    pub path: PathBuf,
    /// Human-readable name (by-id link name or node name)
    pub description: String,
}

/// Enumerate serial ports: `/dev/serial/by-id` links first, then bare
/// `ttyACM*`/`ttyUSB*` nodes not already listed
pub fn list_ports() -> Vec<PortInfo> {
    let mut ports = Vec::new();

    if let Ok(entries) = std::fs::read_dir("/dev/serial/by-id") {
        let mut by_id: Vec<PortInfo> = entries
            .flatten()
            .filter_map(|entry| {
                let path = std::fs::canonicalize(entry.path()).ok()?;
                Some(PortInfo {
                    path,
                    description: entry.file_name().to_string_lossy().into_owned(),
                })
            })
            .collect();
        by_id.sort_by(|a, b| a.description.cmp(&b.description));
        ports.extend(by_id);
    }

    if let Ok(entries) = std::fs::read_dir("/dev") {
        let mut nodes: Vec<PortInfo> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                (name.starts_with("ttyACM") || name.starts_with("ttyUSB")).then(|| PortInfo {
                    path: entry.path(),
                    description: name,
                })
            })
            .filter(|node| !ports.iter().any(|port: &PortInfo| port.path == node.path))
            .collect();
        nodes.sort_by(|a, b| a.path.cmp(&b.path));
        ports.extend(nodes);
    }

    ports
}

/// Pick a port: the preferred one if present, else the first whose
/// description names a known board, else the first port
pub fn select_port(preferred: Option<&str>, ports: &[PortInfo]) -> Option<PathBuf> {
    if let Some(preferred) = preferred {
        if let Some(port) = ports.iter().find(|port| port.path == Path::new(preferred)) {
            return Some(port.path.clone());
        }
    }

    ports
        .iter()
        .find(|port| {
            let description = normalize_name(&port.description);
            PORT_KEYWORDS
                .iter()
                .any(|keyword| description.contains(&normalize_name(keyword)))
        })
        .or_else(|| ports.first())
        .map(|port| port.path.clone())
}

/// Lowercase with `_` and `-` read as spaces, so by-id names like
/// `usb-1a86_USB_Serial-if00` match `usb serial`
fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .replace(|c: char| c == '_' || c == '-', " ")
}

/// Configured input, not yet opened
#[derive(Debug, Clone)]
pub enum InputDevice {
    Serial { path: PathBuf, baud_rate: u32 },
    Stdin,
    Simulated { signal: EcgSimConfig, stream: LineStreamConfig },
}

impl InputDevice {
    /// Resolve the configured source; serial discovery happens here
    pub fn from_config(config: &MonitorConfig) -> EcgResult<Self> {
        match config.source {
            SourceKind::Serial => {
                let preferred = config.device.preferred_port.as_deref();
                let ports = list_ports();
                debug!(count = ports.len(), "serial ports found");

                let path = match select_port(preferred, &ports) {
                    Some(path) => path,
                    // An explicit port may exist without being enumerable
                    None => match preferred.map(PathBuf::from) {
                        Some(path) if path.exists() => path,
                        _ => {
                            return Err(EcgError::NoDeviceFound {
                                hint: "connect the board or pass --port <path>, \
                                       or use --source simulate"
                                    .to_string(),
                            })
                        }
                    },
                };

                if let Some(preferred) = preferred {
                    if path != Path::new(preferred) {
                        warn!(preferred, selected = %path.display(), "preferred port not available");
                    }
                }

                Ok(InputDevice::Serial {
                    path,
                    baud_rate: config.device.baud_rate,
                })
            }
            SourceKind::Stdin => Ok(InputDevice::Stdin),
            SourceKind::Simulate => Ok(InputDevice::Simulated {
                signal: config.simulator_config(),
                stream: config.simulation.stream.clone(),
            }),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            InputDevice::Serial { path, baud_rate } => {
                format!("{} @ {} baud", path.display(), baud_rate)
            }
            InputDevice::Stdin => "stdin".to_string(),
            InputDevice::Simulated { signal, .. } => {
                format!("simulator ({})", signal.rhythm.description())
            }
        }
    }

    /// Open the device and start its reader task
    pub fn open(self) -> EcgResult<DeviceHandle> {
        let name = self.describe();

        let source = match self {
            InputDevice::Serial { path, baud_rate } => {
                let reader = open_serial(&path, baud_rate)?;
                LineSource::spawn_reader(reader, name.clone())
            }
            InputDevice::Stdin => LineSource::spawn_reader(tokio::io::stdin(), name.clone()),
            InputDevice::Simulated { signal, stream } => {
                let simulator = EcgSimulator::new(signal)?;
                let (lines, task) = spawn_line_stream(simulator, stream);
                LineSource::Simulated { lines, task }
            }
        };

        info!(device = %name, "input device opened");
        Ok(DeviceHandle {
            name,
            source: Some(source),
        })
    }
}

enum LineSource {
    Reader {
        lines: mpsc::Receiver<EcgResult<String>>,
        task: JoinHandle<()>,
    },
    Simulated {
        lines: mpsc::Receiver<String>,
        task: JoinHandle<LineStreamStats>,
    },
}

impl LineSource {
    fn spawn_reader<R>(reader: R, name: String) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (sender, lines) = mpsc::channel(LINE_CHANNEL_CAPACITY);
        let task = tokio::spawn(forward_lines(reader, name, sender));
        LineSource::Reader { lines, task }
    }
}

/// Read `\n`-terminated lines, decode them lossily and forward them
async fn forward_lines<R>(reader: R, device: String, sender: mpsc::Sender<EcgResult<String>>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(64);

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                debug!(device = %device, "end of input");
                return;
            }
            Ok(_) => {
                if sender.send(Ok(decode_line(&buf))).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                let _ = sender.send(Err(EcgError::device(&device, e))).await;
                return;
            }
        }
    }
}

/// An open device; lines are read until the source ends or it is closed
pub struct DeviceHandle {
    name: String,
    source: Option<LineSource>,
}

impl DeviceHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Next line; `None` once the source is exhausted or closed
    pub async fn next_line(&mut self) -> Option<EcgResult<String>> {
        match self.source.as_mut()? {
            LineSource::Reader { lines, .. } => lines.recv().await,
            LineSource::Simulated { lines, .. } => lines.recv().await.map(Ok),
        }
    }

    pub fn is_open(&self) -> bool {
        self.source.is_some()
    }

    /// Stop the reader task and release the device; safe to call twice
    pub fn close(&mut self) {
        let Some(source) = self.source.take() else {
            return;
        };

        match source {
            LineSource::Reader { task, .. } => task.abort(),
            LineSource::Simulated { task, .. } => task.abort(),
        }
        info!(device = %self.name, "input device closed");
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Non-blocking descriptor polled through the runtime's reactor.
///
/// Reads never park a blocking thread, so dropping the reader (including
/// through an aborted task) closes the descriptor right away.
#[cfg(unix)]
struct FdReader<T: std::os::fd::AsRawFd> {
    inner: tokio::io::unix::AsyncFd<T>,
}

#[cfg(unix)]
impl<T: std::os::fd::AsRawFd> FdReader<T> {
    /// `inner` must already be in non-blocking mode
    fn new(inner: T) -> std::io::Result<Self> {
        use tokio::io::{unix::AsyncFd, Interest};

        Ok(Self {
            inner: AsyncFd::with_interest(inner, Interest::READABLE)?,
        })
    }
}

#[cfg(unix)]
impl<T> AsyncRead for FdReader<T>
where
    T: std::os::fd::AsRawFd + Unpin,
    for<'a> &'a T: std::io::Read,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        use std::io::Read;

        loop {
            let mut guard = ready!(self.inner.poll_read_ready(cx))?;
            let unfilled = buf.initialize_unfilled();
            match guard.try_io(|inner| inner.get_ref().read(unfilled)) {
                Ok(Ok(len)) => {
                    buf.advance(len);
                    return Poll::Ready(Ok(()));
                }
                Ok(Err(e)) => return Poll::Ready(Err(e)),
                // Readiness was stale; wait again
                Err(_would_block) => continue,
            }
        }
    }
}

#[cfg(unix)]
type SerialReader = FdReader<std::fs::File>;

#[cfg(not(unix))]
type SerialReader = tokio::fs::File;

#[cfg(unix)]
fn open_serial(path: &Path, baud_rate: u32) -> EcgResult<SerialReader> {
    use nix::fcntl::OFlag;
    use nix::sys::termios::{self, ControlFlags, SetArg};
    use std::os::unix::fs::OpenOptionsExt;

    let device = path.display().to_string();
    let file = std::fs::OpenOptions::new()
        .read(true)
        .custom_flags((OFlag::O_NOCTTY | OFlag::O_NONBLOCK).bits())
        .open(path)
        .map_err(|e| {
            let hint = if e.kind() == std::io::ErrorKind::PermissionDenied {
                " (add your user to the 'dialout' group or adjust the device permissions)"
            } else {
                ""
            };
            EcgError::device(&device, format!("cannot open: {}{}", e, hint))
        })?;

    let mut tio = termios::tcgetattr(&file)
        .map_err(|e| EcgError::device(&device, format!("not a serial port: {}", e)))?;
    termios::cfmakeraw(&mut tio);
    tio.control_flags |= ControlFlags::CREAD | ControlFlags::CLOCAL;
    termios::cfsetspeed(&mut tio, baud_rate_constant(baud_rate)?)
        .map_err(|e| EcgError::device(&device, format!("cannot set baud rate: {}", e)))?;
    termios::tcsetattr(&file, SetArg::TCSANOW, &tio)
        .map_err(|e| EcgError::device(&device, format!("cannot configure line: {}", e)))?;

    debug!(device = %device, baud_rate, "serial line configured");
    FdReader::new(file)
        .map_err(|e| EcgError::device(&device, format!("cannot register with the runtime: {}", e)))
}

#[cfg(not(unix))]
fn open_serial(path: &Path, _baud_rate: u32) -> EcgResult<SerialReader> {
    Err(EcgError::device(
        path.display().to_string(),
        "serial input is only supported on Unix hosts",
    ))
}

#[cfg(unix)]
fn baud_rate_constant(baud_rate: u32) -> EcgResult<nix::sys::termios::BaudRate> {
    use nix::sys::termios::BaudRate;

    Ok(match baud_rate {
        9_600 => BaudRate::B9600,
        19_200 => BaudRate::B19200,
        38_400 => BaudRate::B38400,
        57_600 => BaudRate::B57600,
        115_200 => BaudRate::B115200,
        230_400 => BaudRate::B230400,
        other => {
            return Err(EcgError::config(format!("Unsupported baud rate: {}", other)));
        }
    })
}
