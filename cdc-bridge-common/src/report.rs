// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Human-readable rendering of bytes on the wire.

use core::fmt;

use crate::protocol::Command;
use crate::transceiver::Frame;

/// Bytes as space-separated `0xNN` values.
pub struct HexBytes<'a>(pub &'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "0x{:02X}", byte)?;
        }
        Ok(())
    }
}

/// `Received (N): 0x.. 0x..`
pub struct Received<'a>(pub &'a Frame);

impl fmt::Display for Received<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Received ({}): {}", self.0.len(), HexBytes(self.0.as_bytes()))
    }
}

/// `Sent: 0x.. 0x..`
pub struct Sent<'a>(pub &'a Command);

impl fmt::Display for Sent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sent: {}", HexBytes(self.0.payload()))
    }
}
