// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::io::{self, Write};
use std::time::Duration;

use serialport::SerialPort;

use crate::client::Transport;
use crate::reply::read_reply;

/// Serial link to the device. Each request goes out as one burst, the reply is read
/// back before the next request is sent.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    pub fn open(path: &str, baudrate: u32, timeout: Duration) -> Result<Self, serialport::Error> {
        let port = serialport::new(path, baudrate).timeout(timeout).open()?;
        Ok(Self { port })
    }
}

impl Transport for SerialTransport {
    fn exchange(&mut self, request: &[u8], reply: &mut Vec<u8>) -> io::Result<()> {
        self.port.write_all(request)?;
        self.port.flush()?;
        read_reply(&mut self.port, reply)
    }
}

pub fn list_ports() -> Result<Vec<String>, serialport::Error> {
    Ok(serialport::available_ports()?
        .into_iter()
        .map(|port| port.port_name)
        .collect())
}
