use std::{env, fs, path::Path};

use anyhow::{bail, Context};
use log4rs::{
    append::console::{ConsoleAppender, Target},
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    Config,
};
use uart_xfer::{
    com::SerialCom,
    data::Options,
    protocol::{FileDescriptor, IntelHex, Protocol, SliceMemory, Uploader, Xmodem, Zmodem},
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

const USAGE: &str = "usage: uart_xfer <command>
  upload <file>            flash firmware through the target shell
  zsend <file>             send a file with ZMODEM
  zrecv <out>              receive a file with ZMODEM
  xsend <file>             send a file with XMODEM-1K
  xrecv <out>              receive a file with XMODEM-1K
  hexsend <file> <addr>    dump a binary as Intel HEX located at addr
  hexrecv <out> [base]     read Intel HEX into a binary starting at base
  config                   write the current options file";

fn init_logging(options: &Options) -> anyhow::Result<()> {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{d(%H:%M:%S%.3f)} {h({l:<5})} {m}{n}")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(options.log_level_filter()))?;
    log4rs::init_config(config)?;
    Ok(())
}

fn parse_addr(arg: &str) -> anyhow::Result<u32> {
    let addr = match arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => arg.parse(),
    };
    addr.with_context(|| format!("invalid address {arg}"))
}

fn open(options: &Options) -> anyhow::Result<SerialCom> {
    SerialCom::open(&options.device, options.baud_rate).with_context(|| format!("can't open {}", options.device))
}

/// Stores into `out`, or into the received name when `out` is a directory.
fn store_received(out: &str, file_name: &str, data: &[u8]) -> anyhow::Result<()> {
    let mut path = Path::new(out).to_path_buf();
    if path.is_dir() {
        if file_name.is_empty() {
            bail!("{out} is a directory and the sender gave no file name");
        }
        path = path.join(file_name);
    }
    fs::write(&path, data).with_context(|| format!("can't write {}", path.display()))?;
    log::info!("stored {} bytes to {}", data.len(), path.display());
    Ok(())
}

fn send_file<P: Protocol>(protocol: &mut P, options: &Options, file: &str) -> anyhow::Result<()> {
    let file = FileDescriptor::create(Path::new(file)).with_context(|| format!("can't read {file}"))?;
    let mut com = open(options)?;
    protocol.send_file(&mut com, &file)?;
    log::info!("{}: sent {} ({} bytes)", protocol.get_name(), file.file_name, file.size());
    Ok(())
}

fn receive_file<P: Protocol>(protocol: &mut P, options: &Options, out: &str) -> anyhow::Result<()> {
    let mut com = open(options)?;
    let mut buffer = vec![0; options.max_upload_size];
    let received = protocol.receive_file(&mut com, &mut buffer)?;
    log::info!("{}: received {} bytes, {} errors", protocol.get_name(), received.size, protocol.get_current_state().errors);
    store_received(out, &received.file_name, &buffer[..received.size])
}

fn run(options: &Options, args: &[String]) -> anyhow::Result<()> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match args.as_slice() {
        ["upload", file] => {
            let file = FileDescriptor::create(Path::new(file)).with_context(|| format!("can't read {file}"))?;
            let uploader = Uploader {
                shell_settle: options.shell_settle(),
                read_timeout: options.read_timeout(),
                max_size: options.max_upload_size,
            };
            let mut com = open(options)?;
            let crc = uploader.upload(&mut com, &file)?;
            println!("upload ok, crc 0x{crc:08X}");
        }
        ["zsend", file] => send_file(&mut Zmodem::new(), options, file)?,
        ["zrecv", out] => receive_file(&mut Zmodem::new(), options, out)?,
        ["xsend", file] => send_file(&mut Xmodem::new(), options, file)?,
        ["xrecv", out] => receive_file(&mut Xmodem::new(), options, out)?,
        ["hexsend", file, addr] => {
            let addr = parse_addr(addr)?;
            let mut data = fs::read(file).with_context(|| format!("can't read {file}"))?;
            let len = data.len();
            let mut com = open(options)?;
            IntelHex::new().send(&mut com, &mut SliceMemory::new(addr, &mut data), addr, len)?;
            log::info!("sent {len} bytes as Intel HEX at 0x{addr:08X}");
        }
        ["hexrecv", out, rest @ ..] if rest.len() <= 1 => {
            let base = rest.first().map(|a| parse_addr(a)).transpose()?.unwrap_or(0);
            let mut buffer = vec![0; options.max_upload_size];
            let mut com = open(options)?;
            let mut mem = SliceMemory::new(base, &mut buffer);
            let mut hex = IntelHex::new();
            hex.timeout = Some(options.read_timeout());
            let written = hex.receive(&mut com, &mut mem)?;
            let len = mem.high_water();
            log::info!("{written} data bytes, image spans {len} bytes");
            store_received(out, "", &buffer[..len])?;
        }
        ["config"] => {
            options.store_options()?;
            if let Some(path) = Options::options_file() {
                println!("{}", path.display());
            }
        }
        _ => bail!("{USAGE}"),
    }
    Ok(())
}

fn main() {
    let options = match Options::load_options() {
        Ok(options) => options,
        Err(err) => {
            eprintln!("error reading options, using defaults: {err:#}");
            Options::default()
        }
    };
    if let Err(err) = init_logging(&options) {
        eprintln!("can't init logging: {err:#}");
    }
    log::debug!("uart_xfer {VERSION} on {}", options.device);

    let args: Vec<String> = env::args().skip(1).collect();
    if let Err(err) = run(&options, &args) {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}
