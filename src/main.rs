#[macro_use]
extern crate log;

use std::env::consts::{ARCH, FAMILY, OS};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};

use anyhow::Error;
use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, TermLogger, TerminalMode, WriteLogger,
};

use crate::program::Program;

mod program;
mod wretch;

/// Name of the log file written next to the config.
const LOG_FILE_NAME: &str = "wretch_downloader.log";

/// Lines written between two flushes of the log file.
const FLUSH_EVERY_LINES: usize = 50;

/// Appends to the log file through a buffer, flushing every [FLUSH_EVERY_LINES] lines and on drop.
struct LogFileWriter {
    inner: BufWriter<File>,
    lines_since_flush: usize,
}

impl LogFileWriter {
    fn open() -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(LOG_FILE_NAME)?;

        Ok(Self {
            inner: BufWriter::with_capacity(64 * 1024, file),
            lines_since_flush: 0,
        })
    }
}

impl Write for LogFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let size = self.inner.write(buf)?;

        self.lines_since_flush += buf[..size].iter().filter(|&&b| b == b'\n').count();
        if self.lines_since_flush >= FLUSH_EVERY_LINES {
            self.inner.flush()?;
            self.lines_since_flush = 0;
        }

        Ok(size)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lines_since_flush = 0;
        self.inner.flush()
    }
}

impl Drop for LogFileWriter {
    fn drop(&mut self) {
        let _ = self.inner.flush();
    }
}

fn main() -> Result<(), Error> {
    initialize_logger();
    log_system_information();

    let program = Program::new();
    program.run()
}

/// Initializes the logger with preset filtering, writing everything from this crate to the log file.
fn initialize_logger() {
    let mut config = ConfigBuilder::new();
    config.add_filter_allow_str("wretch_downloader");

    let log_file = match LogFileWriter::open() {
        Ok(writer) => writer,
        Err(e) => {
            eprintln!("Failed to open {}: {}. Logging will only output to terminal.", LOG_FILE_NAME, e);
            let _ = TermLogger::init(
                LevelFilter::Info,
                Config::default(),
                TerminalMode::Mixed,
                ColorChoice::Auto,
            );
            return;
        }
    };

    if let Err(e) = CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::max(), config.build(), log_file),
    ]) {
        eprintln!("Failed to initialize combined logger: {}. Falling back to terminal-only logging.", e);
        let _ = TermLogger::init(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        );
    }
}

/// Logs important information about the system being used.
fn log_system_information() {
    trace!("Printing system information out into log for debug purposes...");
    trace!("ARCH:           \"{}\"", ARCH);
    trace!("FAMILY:         \"{}\"", FAMILY);
    trace!("OS:             \"{}\"", OS);
}
