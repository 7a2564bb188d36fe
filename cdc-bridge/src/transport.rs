// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Transports to the CDC-ACM device: raw USB bulk endpoints, or the tty the
//! kernel's cdc-acm driver exposes.

use std::io::{self, Read, Write};
use std::time::Duration;

use rusb::{Context, DeviceHandle, Direction, Recipient, RequestType, UsbContext};
use serialport::SerialPort;
use tracing::{debug, info, warn};

use cdc_bridge_common::protocol::{CDC_INTERFACES, MAX_FRAME, RECEIVE_TIMEOUT_MS};
use cdc_bridge_common::transceiver::{Frame, TransferOutcome, Transport};

use crate::error::TransportInitError;

/// Line speed for both backends (8N1).
pub const LINE_BAUD: u32 = 9600;

// CDC class requests
const SET_LINE_CODING: u8 = 0x20;
const SET_CONTROL_LINE_STATE: u8 = 0x22;
const ACM_CTRL_DTR: u16 = 0x01;
const ACM_CTRL_RTS: u16 = 0x02;

/// libusb treats a zero timeout as "wait forever".
const NO_TIMEOUT: Duration = Duration::ZERO;

/// Where to find the device on the bus.
#[derive(Debug, Clone, Copy)]
pub struct UsbConfig {
    pub vid: u16,
    pub pid: u16,
    pub ep_in: u8,
    pub ep_out: u8,
}

/// Bulk transport talking to the endpoints directly through libusb.
///
/// Claimed interfaces are released when the transport is dropped.
pub struct UsbTransport {
    handle: DeviceHandle<Context>,
    ep_in: u8,
    ep_out: u8,
    claimed: Vec<u8>,
}

impl UsbTransport {
    /// Open the device, take both CDC interfaces away from the kernel driver
    /// and configure the serial line.
    pub fn open(config: &UsbConfig) -> Result<Self, TransportInitError> {
        let context = Context::new().map_err(TransportInitError::Context)?;
        let devices = context.devices().map_err(TransportInitError::Context)?;

        let device = devices
            .iter()
            .find(|device| {
                device
                    .device_descriptor()
                    .map(|desc| desc.vendor_id() == config.vid && desc.product_id() == config.pid)
                    .unwrap_or(false)
            })
            .ok_or(TransportInitError::DeviceNotFound {
                vid: config.vid,
                pid: config.pid,
            })?;

        info!(
            "Opening USB device {:04x}:{:04x} (bus {}, address {})",
            config.vid,
            config.pid,
            device.bus_number(),
            device.address()
        );
        let handle = device.open().map_err(TransportInitError::Open)?;

        let mut transport = Self {
            handle,
            ep_in: config.ep_in,
            ep_out: config.ep_out,
            claimed: Vec::with_capacity(CDC_INTERFACES as usize),
        };

        for interface in 0..CDC_INTERFACES {
            if transport
                .handle
                .kernel_driver_active(interface)
                .unwrap_or(false)
            {
                debug!("Detaching kernel driver from interface {}", interface);
                if let Err(e) = transport.handle.detach_kernel_driver(interface) {
                    warn!("Failed to detach kernel driver from interface {}: {}", interface, e);
                }
            }
            transport
                .handle
                .claim_interface(interface)
                .map_err(|source| TransportInitError::Claim { interface, source })?;
            transport.claimed.push(interface);
        }

        transport.configure_line();
        Ok(transport)
    }

    /// Raise DTR/RTS and set the line coding. Failures are logged only; many
    /// devices ignore these requests.
    fn configure_line(&self) {
        let request_type =
            rusb::request_type(Direction::Out, RequestType::Class, Recipient::Interface);

        if let Err(e) = self.handle.write_control(
            request_type,
            SET_CONTROL_LINE_STATE,
            ACM_CTRL_DTR | ACM_CTRL_RTS,
            0,
            &[],
            NO_TIMEOUT,
        ) {
            warn!("Failed to set control line state: {}", e);
        }

        // dwDTERate (LE), bCharFormat = 1 stop bit, bParityType = none, bDataBits = 8
        let baud = LINE_BAUD.to_le_bytes();
        let coding = [baud[0], baud[1], baud[2], baud[3], 0x00, 0x00, 0x08];
        if let Err(e) =
            self.handle
                .write_control(request_type, SET_LINE_CODING, 0, 0, &coding, NO_TIMEOUT)
        {
            warn!("Failed to set line coding: {}", e);
        }
    }
}

impl Transport for UsbTransport {
    type Error = rusb::Error;

    fn send(&mut self, frame: &[u8; MAX_FRAME]) -> Result<(), rusb::Error> {
        let written = self.handle.write_bulk(self.ep_out, frame, NO_TIMEOUT)?;
        debug!("Wrote {} bytes to endpoint {:#04x}", written, self.ep_out);
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> TransferOutcome<rusb::Error> {
        let mut buf = [0u8; MAX_FRAME];
        match self.handle.read_bulk(self.ep_in, &mut buf, timeout) {
            Ok(len) => TransferOutcome::Data(Frame::from_slice(&buf[..len])),
            Err(rusb::Error::Timeout) => TransferOutcome::Timeout,
            Err(e) => TransferOutcome::Error(e),
        }
    }
}

impl Drop for UsbTransport {
    fn drop(&mut self) {
        for &interface in &self.claimed {
            if let Err(e) = self.handle.release_interface(interface) {
                debug!("Failed to release interface {}: {}", interface, e);
            }
        }
    }
}

/// Transport over the tty created by the kernel's cdc-acm driver.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    pub fn open(port_name: &str) -> Result<Self, TransportInitError> {
        let port = serialport::new(port_name, LINE_BAUD)
            .timeout(Duration::from_millis(RECEIVE_TIMEOUT_MS))
            .open()
            .map_err(|source| TransportInitError::SerialOpen {
                port: port_name.to_string(),
                source,
            })?;

        info!("Opened serial port {}", port_name);
        Ok(Self { port })
    }

    /// Get the port name.
    pub fn port_name(&self) -> String {
        self.port.name().unwrap_or_else(|| "?".to_string())
    }
}

impl Transport for SerialTransport {
    type Error = io::Error;

    fn send(&mut self, frame: &[u8; MAX_FRAME]) -> io::Result<()> {
        write_unbounded(&mut self.port, frame)?;
        self.port.flush()
    }

    fn receive(&mut self, timeout: Duration) -> TransferOutcome<io::Error> {
        if self.port.timeout() != timeout {
            if let Err(e) = self.port.set_timeout(timeout) {
                return TransferOutcome::Error(e.into());
            }
        }

        let mut buf = [0u8; MAX_FRAME];
        match self.port.read(&mut buf) {
            Ok(0) => TransferOutcome::Timeout,
            Ok(len) => TransferOutcome::Data(Frame::from_slice(&buf[..len])),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => TransferOutcome::Timeout,
            Err(e) => TransferOutcome::Error(e),
        }
    }
}

/// Write all of `buf`, retrying through port timeouts so the send has no
/// deadline of its own.
fn write_unbounded<W: Write + ?Sized>(writer: &mut W, mut buf: &[u8]) -> io::Result<()> {
    while !buf.is_empty() {
        match writer.write(buf) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(len) => buf = &buf[len..],
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                debug!("Serial write timed out, retrying");
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Writer that stalls a few times, then accepts at most `chunk` bytes per call.
    struct SlowWriter {
        stalls: usize,
        chunk: usize,
        written: Vec<u8>,
    }

    impl Write for SlowWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.stalls > 0 {
                self.stalls -= 1;
                return Err(io::ErrorKind::TimedOut.into());
            }
            let len = buf.len().min(self.chunk);
            self.written.extend_from_slice(&buf[..len]);
            Ok(len)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_survives_port_timeouts() {
        let mut writer = SlowWriter {
            stalls: 3,
            chunk: 16,
            written: Vec::new(),
        };
        let mut frame = [0u8; MAX_FRAME];
        frame[..2].copy_from_slice(&[0xFF, 0xC0]);

        write_unbounded(&mut writer, &frame).unwrap();

        assert_eq!(writer.written, frame.to_vec());
    }

    #[test]
    fn test_write_propagates_other_errors() {
        struct Broken;

        impl Write for Broken {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::ErrorKind::BrokenPipe.into())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let err = write_unbounded(&mut Broken, &[0xFF, 0xC0]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_write_zero_is_an_error() {
        let mut writer = SlowWriter {
            stalls: 0,
            chunk: 0,
            written: Vec::new(),
        };
        let err = write_unbounded(&mut writer, &[0xFF]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WriteZero);
    }
}
