// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::io::{self, Write};
use std::time::Duration;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing::{debug, info};

use cdc_bridge_common::protocol::{encode, CommandKind, RECEIVE_TIMEOUT_MS};
use cdc_bridge_common::report::{HexBytes, Received, Sent};
use cdc_bridge_common::transceiver::{exchange, ExchangeConfig, ExchangeObserver, Frame, Transport};
use cdc_bridge_common::Command;

use crate::error::{ExchangeFailure, TransportErrorCode};
use crate::transport::{SerialTransport, UsbConfig, UsbTransport};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "cdc-bridge")]
#[command(about = "Send protocol commands to a USB CDC-ACM CAN bus adapter")]
pub struct Cli {
    /// USB vendor ID (hex)
    #[arg(long, value_parser = parse_hex_u16, default_value = "03eb")]
    pub vid: u16,

    /// USB product ID (hex)
    #[arg(long, value_parser = parse_hex_u16, default_value = "2404")]
    pub pid: u16,

    /// Bulk IN endpoint address (hex)
    #[arg(long, value_parser = parse_hex_u8, default_value = "81")]
    pub ep_in: u8,

    /// Bulk OUT endpoint address (hex)
    #[arg(long, value_parser = parse_hex_u8, default_value = "02")]
    pub ep_out: u8,

    /// Use the cdc-acm tty (e.g., /dev/ttyACM0) instead of raw USB
    #[arg(short, long)]
    pub port: Option<String>,

    /// Receive timeout per poll, in milliseconds
    #[arg(long, default_value_t = RECEIVE_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// Give up after this many receive attempts (default: poll forever)
    #[arg(long)]
    pub max_polls: Option<u32>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Command name
    #[arg(value_name = "COMMAND")]
    pub command: Option<String>,

    /// Hex byte arguments (prog only)
    #[arg(value_name = "ARGS", allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl Cli {
    fn exchange_config(&self) -> ExchangeConfig {
        ExchangeConfig {
            receive_timeout: Duration::from_millis(self.timeout_ms),
            max_polls: self.max_polls,
        }
    }

    fn usb_config(&self) -> UsbConfig {
        UsbConfig {
            vid: self.vid,
            pid: self.pid,
            ep_in: self.ep_in,
            ep_out: self.ep_out,
        }
    }
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    let Some(name) = cli.command.as_deref() else {
        print_usage();
        return Ok(());
    };

    let command = match encode(name, cli.args.as_slice()) {
        Ok(command) => command,
        Err(e) => {
            debug!("Rejected `{}`: {}", name, e);
            print_usage();
            return Ok(());
        }
    };
    if command.kind().arity() == 0 && !cli.args.is_empty() {
        debug!("Ignoring {} extra arguments to {}", cli.args.len(), name);
    }

    let config = cli.exchange_config();
    match cli.port.as_deref() {
        Some(port) => {
            let mut transport = SerialTransport::open(port)?;
            info!("Using serial backend on {}", transport.port_name());
            execute(&mut transport, &command, &config, &mut Console::stdout())
        }
        None => {
            let mut transport = UsbTransport::open(&cli.usb_config())?;
            execute(&mut transport, &command, &config, &mut Console::stdout())
        }
    }
}

/// Drive one command to completion and print the matched reply.
fn execute<T, W>(
    transport: &mut T,
    command: &Command,
    config: &ExchangeConfig,
    console: &mut Console<W>,
) -> Result<()>
where
    T: Transport,
    T::Error: TransportErrorCode + std::error::Error + Send + Sync + 'static,
    W: Write,
{
    let reply = exchange(transport, command, config, console)
        .map_err(|e| ExchangeFailure::new(command.kind().name(), e))?;

    match reply {
        Some(frame) => console.line(format_args!("{}", Received(&frame))),
        None => debug!("{} expects no reply", command.kind().name()),
    }

    Ok(())
}

/// Prints exchange progress, one line per event.
struct Console<W> {
    out: W,
}

impl Console<io::Stdout> {
    fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> Console<W> {
    fn line(&mut self, args: std::fmt::Arguments<'_>) {
        // Diagnostics only; a closed stdout must not abort the exchange.
        let _ = writeln!(self.out, "{}", args);
        let _ = self.out.flush();
    }
}

impl<W: Write> ExchangeObserver for Console<W> {
    fn on_sending(&mut self, command: &Command) {
        self.line(format_args!("{}", Sent(command)));
    }

    fn on_timeout(&mut self) {
        // A timed-out transfer hands back no data.
        self.line(format_args!("timeout (0)"));
    }

    fn on_mismatch(&mut self, frame: &Frame) {
        debug!("Discarding {} bytes: {}", frame.len(), HexBytes(frame.as_bytes()));
        self.line(format_args!("Polling"));
    }
}

/// Usage text: clap's option summary followed by every command.
fn usage() -> String {
    let mut text = Cli::command().render_help().to_string();
    text.push_str("\nCommands:\n");
    for kind in CommandKind::ALL {
        text.push_str("  ");
        text.push_str(kind.usage());
        text.push('\n');
    }
    text
}

fn print_usage() {
    print!("{}", usage());
}

fn hex_digits(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Parse a hex `u16`, with or without a `0x` prefix.
fn parse_hex_u16(s: &str) -> std::result::Result<u16, String> {
    u16::from_str_radix(hex_digits(s), 16).map_err(|e| format!("invalid hex value `{}`: {}", s, e))
}

/// Parse a hex `u8`, with or without a `0x` prefix.
fn parse_hex_u8(s: &str) -> std::result::Result<u8, String> {
    u8::from_str_radix(hex_digits(s), 16).map_err(|e| format!("invalid hex value `{}`: {}", s, e))
}
