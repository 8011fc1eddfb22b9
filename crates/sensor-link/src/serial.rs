use crate::{LinkConfig, LinkError, PortInfo, Result, SensorLink};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{Read, Write};
use std::time::Instant;

/// Serial backend over the `serialport` crate (8N1, no flow control).
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    pending: Vec<u8>,
}

impl SensorLink for SerialLink {
    fn open(path: &str, config: &LinkConfig) -> Result<Self> {
        let port = serialport::new(path, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.read_timeout)
            .open()
            .map_err(|e| LinkError::Io(format!("{path}: {e}")))?;
        tracing::info!(path, baud = config.baud_rate, "opened serial link");
        Ok(Self {
            port,
            pending: Vec::with_capacity(128),
        })
    }

    fn list() -> Result<Vec<PortInfo>> {
        let ports = serialport::available_ports().map_err(|e| LinkError::Io(e.to_string()))?;
        Ok(ports
            .into_iter()
            .map(|p| PortInfo {
                path: p.port_name,
                driver: match p.port_type {
                    serialport::SerialPortType::UsbPort(_) => "usb".to_string(),
                    serialport::SerialPortType::PciPort => "pci".to_string(),
                    serialport::SerialPortType::BluetoothPort => "bluetooth".to_string(),
                    serialport::SerialPortType::Unknown => "unknown".to_string(),
                },
            })
            .collect())
    }

    fn bytes_available(&mut self) -> Result<usize> {
        let n = self
            .port
            .bytes_to_read()
            .map_err(|e| LinkError::Io(e.to_string()))?;
        Ok(n as usize + self.pending.len())
    }

    fn read_line(&mut self) -> Result<Option<Vec<u8>>> {
        // The port's own timeout bounds each read; the deadline bounds the
        // whole call so a trickling stream cannot pin the caller.
        let deadline = Instant::now() + self.port.timeout();
        let mut byte = [0u8; 1];
        loop {
            match self.port.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    if byte[0] == b'\n' {
                        let line = std::mem::take(&mut self.pending);
                        return Ok(Some(line));
                    }
                    self.pending.push(byte[0]);
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => return Ok(None),
                Err(e) => return Err(LinkError::Io(e.to_string())),
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
        }
    }

    fn write_line(&mut self, text: &str) -> Result<()> {
        self.port
            .write_all(text.as_bytes())
            .and_then(|_| self.port.write_all(b"\n"))
            .and_then(|_| self.port.flush())
            .map_err(|e| LinkError::Io(e.to_string()))
    }
}
