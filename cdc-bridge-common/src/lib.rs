// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command protocol shared by the CDC bridge host tool.
//!
//! This crate supports both `no_std` and `std` environments:
//! - Default: `no_std`, so device firmware can share the command table
//! - `std` feature: enables `std::error::Error` integration for host tools
//!
//! Nothing in here touches hardware. The host supplies a [`Transport`] and
//! drives a [`Command`] through [`exchange`].

#![cfg_attr(not(feature = "std"), no_std)]

pub mod protocol;
pub mod report;
pub mod transceiver;

// Re-export commonly used types
pub use protocol::{encode, parse_hex_byte, Command, CommandKind, ProtocolError};
pub use protocol::{DEFAULT_EP_IN, DEFAULT_EP_OUT, DEFAULT_PRODUCT_ID, DEFAULT_VENDOR_ID};
pub use protocol::{CDC_INTERFACES, ECHO_PREFIX_LEN, MAX_FRAME, MAX_PAYLOAD, OPCODE_PREFIX};
pub use protocol::RECEIVE_TIMEOUT_MS;
pub use report::{HexBytes, Received, Sent};
pub use transceiver::{
    exchange, ExchangeConfig, ExchangeError, ExchangeObserver, Frame, TransferOutcome, Transport,
};
