use crate::data_provider::*;
use crate::error::{Error, Result};
use crate::settings::Settings;
use bytes::BytesMut;
use eframe::egui;
use futures::StreamExt;
use std::fmt;
use std::sync::mpsc::{Receiver, SyncSender, TrySendError};
use std::time::Duration;
use stream_cancel::StreamExt as _;
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialPortType, SerialStream};
use tokio_util::codec::{Decoder, Framed};

/// A discovered port and the description used to recognise the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortCandidate {
    pub name: String,
    pub description: String,
}

impl PortCandidate {
    fn from_info(info: &tokio_serial::SerialPortInfo) -> Self {
        let description = match &info.port_type {
            SerialPortType::UsbPort(usb) => {
                let mut parts: Vec<String> = [usb.manufacturer.as_deref(), usb.product.as_deref()]
                    .into_iter()
                    .flatten()
                    .map(str::to_string)
                    .collect();
                parts.push(format!("({:04x}:{:04x})", usb.vid, usb.pid));
                parts.join(" ")
            }
            SerialPortType::PciPort => "PCI".to_string(),
            SerialPortType::BluetoothPort => "Bluetooth".to_string(),
            SerialPortType::Unknown => "n/a".to_string(),
        };

        Self {
            name: info.port_name.clone(),
            description,
        }
    }
}

impl fmt::Display for PortCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.description)
    }
}

pub fn available_candidates() -> Result<Vec<PortCandidate>> {
    Ok(tokio_serial::available_ports()?
        .iter()
        // remove /dev/ttySx.
        .filter(|p| !p.port_name.contains("/dev/ttyS"))
        .map(PortCandidate::from_info)
        .collect())
}

/// First candidate whose description contains one of `signatures`.
pub fn find_device<'a>(
    candidates: &'a [PortCandidate],
    signatures: &[String],
) -> Option<&'a PortCandidate> {
    candidates.iter().find(|c| {
        signatures
            .iter()
            .any(|s| !s.is_empty() && c.description.contains(s.as_str()))
    })
}

pub fn detect_device(signatures: &[String]) -> Result<PortCandidate> {
    let available = available_candidates()?;
    match find_device(&available, signatures) {
        Some(port) => Ok(port.clone()),
        None => Err(Error::DeviceNotFound {
            signatures: signatures.to_vec(),
            available,
        }),
    }
}

/// Opens `port_name` 8-N-1 and frames it into lines.
pub fn open_lines(port_name: &str, baud_rate: u32) -> Result<Framed<SerialStream, LineCodec>> {
    let mut port = tokio_serial::new(port_name, baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .flow_control(tokio_serial::FlowControl::None)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .open_native_async()?;
    port.write_data_terminal_ready(true)?; // dtr: required for Arduinos to send data
    log::info!("opened serial port {port_name} at {baud_rate} baud");

    Ok(LineCodec.framed(port))
}

/// Serial link feeding decoded lines to the display thread.
///
/// A background task reads the port and queues lines in a bounded channel;
/// each `read_line` waits at most `read_timeout` for the next one.
pub struct SerialDataProvider {
    port_name: String,
    baud_rate: u32,
    line_buffer: usize,
    read_timeout: Duration,
    lines: Option<Receiver<String>>,
    trigger: Option<stream_cancel::Trigger>,
    lines_read: u64,
    empty_reads: u64,
}

impl SerialDataProvider {
    /// Must be called from within a tokio runtime context.
    pub fn open(port_name: &str, settings: &Settings) -> Result<Self> {
        let mut provider = Self {
            port_name: port_name.to_string(),
            baud_rate: settings.baud_rate,
            line_buffer: settings.line_buffer,
            read_timeout: settings.read_timeout(),
            lines: None,
            trigger: None,
            lines_read: 0,
            empty_reads: 0,
        };
        provider.connect()?;
        Ok(provider)
    }

    pub fn is_open(&self) -> bool {
        self.trigger.is_some()
    }

    pub fn connect(&mut self) -> Result<()> {
        if self.is_open() {
            return Ok(());
        }

        let reader = open_lines(&self.port_name, self.baud_rate)?;
        let (trigger, tripwire) = stream_cancel::Tripwire::new();
        let (line_tx, line_rx) = std::sync::mpsc::sync_channel(self.line_buffer);

        self.trigger = Some(trigger);
        self.lines = Some(line_rx);

        let port_name = self.port_name.clone();
        tokio::spawn(async move {
            let incoming = reader.take_until_if(tripwire);
            tokio::pin!(incoming);
            forward_lines(&mut incoming, &line_tx).await;
            log::info!("serial port {port_name} closed");
        });

        Ok(())
    }

    /// Ends the reader task, which drops and closes the port.
    pub fn disconnect(&mut self) {
        if let Some(trigger) = self.trigger.take() {
            trigger.cancel();
        }
    }
}

async fn forward_lines<S>(incoming: &mut S, line_tx: &SyncSender<String>)
where
    S: futures::Stream<Item = std::io::Result<String>> + Unpin,
{
    let mut dropped: u64 = 0;

    while let Some(line) = incoming.next().await {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::warn!("serial read failed: {e}");
                break;
            }
        };

        match line_tx.try_send(line) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                dropped += 1;
                if dropped.is_power_of_two() {
                    log::debug!("line queue full, {dropped} lines dropped so far");
                }
            }
            Err(TrySendError::Disconnected(_)) => break,
        }
    }
}

impl Drop for SerialDataProvider {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl LineSource for SerialDataProvider {
    fn read_line(&mut self) -> Option<String> {
        let line = self
            .lines
            .as_ref()
            .and_then(|lines| lines.recv_timeout(self.read_timeout).ok());

        match line {
            Some(_) => self.lines_read += 1,
            None => self.empty_reads += 1,
        }
        line
    }
}

impl DataProviderUi for SerialDataProvider {
    fn show(&mut self, ui: &mut egui::Ui) {
        ui.heading("Serial");
        ui.label(format!("'{}' 8-N-1", self.port_name));
        ui.label(format!("Baud rate: {}", self.baud_rate));

        egui::Grid::new("serial_stats")
            .num_columns(2)
            .striped(true)
            .show(ui, |ui| {
                ui.label("Lines");
                ui.label(format!("{}", self.lines_read));
                ui.end_row();
                ui.label("Empty reads");
                ui.label(format!("{}", self.empty_reads));
                ui.end_row();
            });

        if self.is_open() {
            if ui.button("Close").clicked() {
                self.disconnect();
            }
        } else if ui.button("Open").clicked() {
            if let Err(e) = self.connect() {
                log::error!("unable to open {}: {e}", self.port_name);
            }
        }
    }
}

/// Splits the byte stream on `\n`. Bytes that are not valid UTF-8 are
/// dropped rather than failing the stream.
pub struct LineCodec;

fn decode_line(bytes: &[u8]) -> String {
    let line = String::from_utf8_lossy(bytes).replace(char::REPLACEMENT_CHARACTER, "");
    line.trim_end_matches(['\r', '\n']).to_string()
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let newline = src.as_ref().iter().position(|b| *b == b'\n');
        if let Some(n) = newline {
            let line = src.split_to(n + 1);
            return Ok(Some(decode_line(line.as_ref())));
        }
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        if src.is_empty() {
            return Ok(None);
        }
        let rest = src.split();
        Ok(Some(decode_line(rest.as_ref())))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn candidate(name: &str, description: &str) -> PortCandidate {
        PortCandidate {
            name: name.to_string(),
            description: description.to_string(),
        }
    }

    fn signatures() -> Vec<String> {
        Settings::default().device_signatures
    }

    #[test]
    fn codec_splits_lines() {
        let mut codec = LineCodec;
        let mut buf = BytesMut::from(&b"1,2,3\r\n4,5"[..]);

        assert_eq!(codec.decode(&mut buf).unwrap(), Some("1,2,3".to_string()));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b",6\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("4,5,6".to_string()));
        assert!(buf.is_empty());
    }

    #[test]
    fn codec_drops_invalid_utf8() {
        let mut codec = LineCodec;
        let mut buf = BytesMut::from(&b"1\xff,2\xfe,3\n"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("1,2,3".to_string()));
    }

    #[test]
    fn codec_flushes_partial_line_at_eof() {
        let mut codec = LineCodec;
        let mut buf = BytesMut::from(&b"7,8"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), Some("7,8".to_string()));
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
    }

    #[test]
    fn finds_first_matching_device() {
        let ports = vec![
            candidate("/dev/ttyACM1", "FTDI FT232R (0403:6001)"),
            candidate("/dev/ttyUSB0", "USB-SERIAL CH340 (1a86:7523)"),
            candidate("/dev/ttyACM0", "Arduino (www.arduino.cc) Arduino Uno (2341:0043)"),
        ];

        let found = find_device(&ports, &signatures()).unwrap();
        assert_eq!(found.name, "/dev/ttyUSB0");
        assert_eq!(found.to_string(), "/dev/ttyUSB0 USB-SERIAL CH340 (1a86:7523)");
    }

    #[test]
    fn no_matching_device() {
        let ports = vec![candidate("COM1", "n/a"), candidate("COM4", "PCI")];
        assert_eq!(find_device(&ports, &signatures()), None);
        assert_eq!(find_device(&ports, &["".to_string()]), None);
        assert_eq!(find_device(&[], &signatures()), None);
    }

    fn provider_on(lines: Receiver<String>, read_timeout: Duration) -> SerialDataProvider {
        SerialDataProvider {
            port_name: "/dev/null".to_string(),
            baud_rate: 115200,
            line_buffer: 4,
            read_timeout,
            lines: Some(lines),
            trigger: None,
            lines_read: 0,
            empty_reads: 0,
        }
    }

    #[test]
    fn read_attempt_waits_at_most_timeout() {
        let (tx, rx) = std::sync::mpsc::sync_channel(4);
        let mut provider = provider_on(rx, Duration::from_millis(5));

        let start = std::time::Instant::now();
        assert_eq!(provider.read_line(), None);
        assert!(start.elapsed() < Duration::from_millis(500));
        assert_eq!((provider.lines_read, provider.empty_reads), (0, 1));

        tx.send("1,2,3".to_string()).unwrap();
        assert_eq!(provider.read_line(), Some("1,2,3".to_string()));
        assert_eq!((provider.lines_read, provider.empty_reads), (1, 1));

        // reader task gone
        drop(tx);
        provider.read_timeout = Duration::from_secs(60);
        let start = std::time::Instant::now();
        assert_eq!(provider.read_line(), None);
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(provider.empty_reads, 2);
    }

    #[tokio::test]
    async fn drops_lines_when_queue_full() {
        let (tx, rx) = std::sync::mpsc::sync_channel(2);
        let mut incoming = futures::stream::iter(vec![
            Ok("a".to_string()),
            Ok("b".to_string()),
            Ok("c".to_string()),
        ]);

        forward_lines(&mut incoming, &tx).await;

        // third line dropped, queue was full
        assert_eq!(rx.try_recv().unwrap(), "a");
        assert_eq!(rx.try_recv().unwrap(), "b");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn forward_stops_on_read_error() {
        let (tx, rx) = std::sync::mpsc::sync_channel(8);
        let mut incoming = futures::stream::iter(vec![
            Ok("a".to_string()),
            Err(std::io::Error::new(std::io::ErrorKind::Other, "unplugged")),
            Ok("b".to_string()),
        ]);

        forward_lines(&mut incoming, &tx).await;

        assert_eq!(rx.try_recv().unwrap(), "a");
        assert!(rx.try_recv().is_err());
    }
}
