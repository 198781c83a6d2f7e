#![deny(clippy::unwrap_used)]

use chrono::{DateTime, Local};
use clap::builder::BoolishValueParser;
use clap::{arg, command, value_parser};
use std::io::ErrorKind;
use std::process::exit;
use std::{path::PathBuf, time::Duration};

use k3446xctrl::{
    Device, DeviceOptions, ProtoError, Result, ScpiAdapter, DEFAULT_BAUDRATE, DEFAULT_SCPI_PORT,
    DEFAULT_TTY,
};

const DEFAULT_TIMEOUT_MS: u64 = 5000;

#[tokio::main]
async fn main() {
    let matches = command!() // requires `cargo` feature
        .arg(
            arg!(
                -p --device <PORT> "Serial port of the instrument"
            )
            .default_value(DEFAULT_TTY)
            .required(false)
            .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(
                -b --baudrate <BAUDRATE> "Baudrate"
            )
            .default_value(DEFAULT_BAUDRATE.to_string())
            .value_parser(value_parser!(u32)),
        )
        .arg(
            arg!(
                -H --host <HOST> "Connect over LAN instead of the serial port"
            )
            .required(false),
        )
        .arg(
            arg!(
                --port <PORT> "SCPI socket port"
            )
            .default_value(DEFAULT_SCPI_PORT.to_string())
            .value_parser(value_parser!(u16)),
        )
        .arg(
            arg!(
                -t --timeout <MS> "Response timeout in milliseconds"
            )
            .default_value(DEFAULT_TIMEOUT_MS.to_string())
            .value_parser(value_parser!(u64)),
        )
        .arg(arg!(
            -d --debug ... "Turn debugging information on"
        ))
        .subcommand(clap::Command::new("ident").about("Device identification"))
        .subcommand(
            clap::Command::new("measure")
                .about("Read a measurement")
                .arg(
                    arg!(<quantity> "Measured quantity")
                        .value_parser(["vdc", "vac", "idc", "iac"]),
                )
                .arg(
                    arg!(-c --count <N> "Number of readings")
                        .default_value("1")
                        .value_parser(value_parser!(u32)),
                )
                .arg(
                    arg!(-i --interval <MS> "Delay between readings in milliseconds")
                        .default_value("1000")
                        .value_parser(value_parser!(u64)),
                ),
        )
        .subcommand(
            clap::Command::new("output")
                .about("Output relay")
                .arg(arg!([enabled] "Switch output").value_parser(BoolishValueParser::new())),
        )
        .subcommand(clap::Command::new("errors").about("Drain the error queue"))
        .subcommand(clap::Command::new("reset").about("Reset to power-on state"))
        .subcommand_required(true)
        .get_matches();

    let level = match matches.get_count("debug") {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    if let Err(e) = handle_args(&matches).await {
        let target = target_name(&matches);
        match e {
            ProtoError::Serial(err) => {
                if err.kind() == tokio_serial::ErrorKind::NoDevice
                    || matches!(err.kind(), tokio_serial::ErrorKind::Io(ErrorKind::NotFound))
                {
                    eprintln!("{}: File not found", target);
                } else {
                    eprintln!("I/O Error: {} [device: {}]", err, target);
                }
            }
            ProtoError::Io(err) => {
                if err.kind() == ErrorKind::NotFound {
                    eprintln!("{}: File not found", target);
                } else {
                    eprintln!("I/O Error: {} [device: {}]", err, target);
                }
            }
            ProtoError::Abort => {
                eprintln!("Failed to communicate with device, aborting!");
            }
            ProtoError::Timeout(timeout) => {
                eprintln!("No response from device within {:?}, aborting!", timeout);
            }
            ProtoError::Parse(msg) => {
                eprintln!("Received a malformed response from device: {}", msg);
            }
            ProtoError::Unexpected(reply) => {
                eprintln!(
                    "Received an unexpected response from device, aborting!: {:?}",
                    reply
                );
            }
            ProtoError::ErrorQueueNotDrained { limit } => {
                eprintln!("Error queue not empty after {} reads, aborting!", limit);
            }
        }
        exit(-1);
    }
}

fn target_name(matches: &clap::ArgMatches) -> String {
    match matches.get_one::<String>("host") {
        Some(host) => format!(
            "{}:{}",
            host,
            matches
                .get_one::<u16>("port")
                .copied()
                .unwrap_or(DEFAULT_SCPI_PORT)
        ),
        None => matches
            .get_one::<PathBuf>("device")
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| DEFAULT_TTY.to_string()),
    }
}

async fn connect(matches: &clap::ArgMatches) -> Result<ScpiAdapter> {
    let timeout = Duration::from_millis(
        matches
            .get_one::<u64>("timeout")
            .copied()
            .unwrap_or(DEFAULT_TIMEOUT_MS),
    );

    let adapter = match matches.get_one::<String>("host") {
        Some(host) => {
            let port = matches
                .get_one::<u16>("port")
                .copied()
                .unwrap_or(DEFAULT_SCPI_PORT);
            ScpiAdapter::tcp(host, port).await?
        }
        None => {
            let baud_rate = matches
                .get_one::<u32>("baudrate")
                .copied()
                .unwrap_or(DEFAULT_BAUDRATE);
            let path = matches
                .get_one::<PathBuf>("device")
                .cloned()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TTY));
            ScpiAdapter::serial(path.to_string_lossy(), baud_rate)?
        }
    };
    Ok(adapter.with_timeout(timeout))
}

async fn handle_args(matches: &clap::ArgMatches) -> Result<()> {
    let mut device = Device::new(connect(matches).await?, DeviceOptions::default());

    eprintln!("Connected to: {}\n", target_name(matches));

    match matches.subcommand() {
        // Device ID
        Some(("ident", _args)) => {
            let ident = device.ident().await?;
            println!("Manufacturer: {}", ident.manufacturer);
            println!("Model: {}", ident.model);
            println!("Serial: {}", ident.serial);
            println!("Firmware: {}", ident.firmware);
        }
        Some(("measure", args)) => {
            let quantity = args
                .get_one::<String>("quantity")
                .map(String::as_str)
                .unwrap_or("vdc");
            let count = args.get_one::<u32>("count").copied().unwrap_or(1);
            let interval = Duration::from_millis(
                args.get_one::<u64>("interval").copied().unwrap_or(1000),
            );

            for i in 0..count {
                if i > 0 {
                    tokio::time::sleep(interval).await;
                }
                let (value, unit) = match quantity {
                    "vac" => (device.voltage_ac().await?, "V AC"),
                    "idc" => (device.current_dc().await?, "A DC"),
                    "iac" => (device.current_ac().await?, "A AC"),
                    _ => (device.voltage_dc().await?, "V DC"),
                };
                let ts: DateTime<Local> = Local::now();
                println!("{}  {} {}", ts.format("%Y-%m-%d %H:%M:%S%.3f"), value, unit);
            }
        }
        // Output relay
        Some(("output", args)) => {
            if let Some(enabled) = args.get_one::<bool>("enabled") {
                // Write value
                if *enabled {
                    device.enable().await?;
                } else {
                    device.disable().await?;
                }
                println!("OK");
            } else {
                // Read value
                let state = if device.is_enabled().await? { "ON" } else { "OFF" };
                println!("Output: {}", state);
            }
        }
        Some(("errors", _args)) => {
            let errors = device.check_errors().await?;
            if errors.is_empty() {
                println!("No error");
            }
            for e in errors {
                println!("{}", e);
            }
        }
        Some(("reset", _args)) => {
            device.reset().await?;
            println!("OK");
        }
        _ => unreachable!("Exhausted list of subcommands and subcommand_required prevents `None`"),
    }

    Ok(())
}
