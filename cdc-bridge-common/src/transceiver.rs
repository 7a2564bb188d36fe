// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Send/poll cycle driving one [`Command`] to completion over a [`Transport`].

use core::time::Duration;

use thiserror::Error;

use crate::protocol::{Command, MAX_FRAME, RECEIVE_TIMEOUT_MS};

/// Bytes received in one IN transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    bytes: heapless::Vec<u8, MAX_FRAME>,
}

impl Frame {
    /// Copy up to [`MAX_FRAME`] bytes; anything beyond is dropped.
    pub fn from_slice(data: &[u8]) -> Self {
        let len = data.len().min(MAX_FRAME);
        let mut bytes = heapless::Vec::new();
        let _ = bytes.extend_from_slice(&data[..len]);
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.bytes.starts_with(prefix)
    }
}

/// Result of one receive attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome<E> {
    Data(Frame),
    Timeout,
    Error(E),
}

/// Duplex byte channel to the device.
pub trait Transport {
    type Error;

    /// Write one full OUT transfer. Blocks until the device accepts it.
    fn send(&mut self, frame: &[u8; MAX_FRAME]) -> Result<(), Self::Error>;

    /// Wait up to `timeout` for one IN transfer of at most [`MAX_FRAME`] bytes.
    fn receive(&mut self, timeout: Duration) -> TransferOutcome<Self::Error>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    type Error = T::Error;

    fn send(&mut self, frame: &[u8; MAX_FRAME]) -> Result<(), Self::Error> {
        (**self).send(frame)
    }

    fn receive(&mut self, timeout: Duration) -> TransferOutcome<Self::Error> {
        (**self).receive(timeout)
    }
}

/// Tunables for [`exchange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeConfig {
    pub receive_timeout: Duration,
    /// Receive attempts allowed before giving up. `None` polls forever.
    pub max_polls: Option<u32>,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            receive_timeout: Duration::from_millis(RECEIVE_TIMEOUT_MS),
            max_polls: None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError<E> {
    #[error("send failed: {0}")]
    Send(E),
    #[error("receive failed: {0}")]
    Receive(E),
    #[error("no matching reply after {polls} polls")]
    PollLimit { polls: u32 },
}

/// Hooks for diagnostics emitted while polling. All default to no-ops.
pub trait ExchangeObserver {
    /// Called before the OUT transfer is issued, which may block.
    fn on_sending(&mut self, _command: &Command) {}
    fn on_timeout(&mut self) {}
    fn on_mismatch(&mut self, _frame: &Frame) {}
}

impl ExchangeObserver for () {}

/// Send `command` once and, if it expects a reply, poll until one arrives
/// whose leading bytes equal the command's echo prefix.
///
/// Timeouts and non-matching frames only re-issue the receive; the command
/// is never resent. Returns `Ok(None)` for fire-and-forget commands.
pub fn exchange<T, O>(
    transport: &mut T,
    command: &Command,
    config: &ExchangeConfig,
    observer: &mut O,
) -> Result<Option<Frame>, ExchangeError<T::Error>>
where
    T: Transport + ?Sized,
    O: ExchangeObserver + ?Sized,
{
    observer.on_sending(command);
    transport
        .send(&command.out_frame())
        .map_err(ExchangeError::Send)?;

    if !command.expects_reply() {
        return Ok(None);
    }

    let prefix = command.echo_prefix();
    let mut polls: u32 = 0;

    loop {
        if let Some(max) = config.max_polls {
            if polls >= max {
                return Err(ExchangeError::PollLimit { polls });
            }
        }
        polls = polls.saturating_add(1);

        match transport.receive(config.receive_timeout) {
            TransferOutcome::Error(e) => return Err(ExchangeError::Receive(e)),
            TransferOutcome::Timeout => observer.on_timeout(),
            // An empty frame can never carry the prefix, so it is skipped here too.
            TransferOutcome::Data(frame) if !frame.starts_with(&prefix) => {
                observer.on_mismatch(&frame)
            }
            TransferOutcome::Data(frame) => return Ok(Some(frame)),
        }
    }
}
