// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

mod client;
mod error;
mod reply;
mod serial;


use client::OtaClient;
use error::ClientError;
use serial::SerialTransport;

#[derive(Debug, Parser)]
struct Args {
    #[arg(short, long)]
    list_ports: bool,
    #[arg(short, long, default_value_t = String::from("/dev/ttyUSB0"))]
    port: String,
    #[arg(short, long, default_value_t = 460800)]
    baudrate: u32,
    /// Reply timeout in milliseconds; a sector flush can take a while
    #[arg(short, long, default_value_t = 2000)]
    timeout: u64,
    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write an image to the inactive slot, or to a fixed address
    Upload {
        image: PathBuf,
        #[arg(short, long, value_parser = parse_address)]
        address: Option<u32>,
        #[arg(short, long, default_value_t = 1024)]
        chunk_size: usize,
        /// Switch boot slots once the image is verified
        #[arg(long)]
        commit: bool,
    },
    /// Read flash back and compare it with an image
    Verify {
        image: PathBuf,
        #[arg(short, long, value_parser = parse_address)]
        address: u32,
        #[arg(short, long, default_value_t = 1024)]
        chunk_size: usize,
    },
    /// Promote the image written by the last upload
    Commit,
}

fn parse_address(text: &str) -> Result<u32, String> {
    ota_protocol::command::parse_number(text.as_bytes()).map_err(|e| e.to_string())
}

fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init();

    let args = Args::parse();

    if args.list_ports {
        println!("List of available serial ports:");
        for port in serial::list_ports()? {
            println!("- {}", port);
        }
        return Ok(());
    }

    let Some(cmd) = args.cmd else {
        println!("Choose a command to be sent.");
        return Ok(());
    };

    let transport = SerialTransport::open(&args.port, args.baudrate, Duration::from_millis(args.timeout))
        .map_err(ClientError::OpenPort)?;
    let mut client = OtaClient::new(transport);

    match cmd {
        Command::Upload {
            image,
            address,
            chunk_size,
            commit,
        } => {
            let image = std::fs::read(image).map_err(ClientError::ReadImage)?;
            let report = client.upload(&image, address, chunk_size)?;
            println!(
                "Image {} verified: {} sectors written, {} unchanged",
                report.digest, report.sectors_written, report.sectors_skipped
            );
            match (report.slot, commit) {
                (Some(_), true) => {
                    let slot = client.commit()?;
                    println!("Slot {} boots next, reboot the device", slot);
                }
                (None, true) => println!("Explicit address written, nothing to commit"),
                (_, false) => {}
            }
        }
        Command::Verify {
            image,
            address,
            chunk_size,
        } => {
            let image = std::fs::read(image).map_err(ClientError::ReadImage)?;
            let read = client.read_back(address, image.len(), chunk_size)?;
            client::compare(&image, &read.data)?;
            println!("Flash at {:#x} matches image, digest {}", address, read.digest);
        }
        Command::Commit => {
            let slot = client.commit()?;
            println!("Slot {} boots next, reboot the device", slot);
        }
    }

    Ok(())
}
