use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use multitherm_lib::{mode::Mode, tokio_common::DEFAULT_BAUD_RATE};
use std::path::PathBuf;
use std::time::Duration;

fn default_device_name() -> String {
    if cfg!(target_os = "windows") {
        String::from("COM1")
    } else {
        String::from("/dev/ttyUSB0")
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliConnection {
    /// Serve the instrument protocol on a serial port (8N1, no flow control).
    Serial {
        /// Serial port device name.
        /// Examples: "/dev/ttyUSB0" (Linux), "COM3" (Windows).
        #[arg(short, long, default_value_t = default_device_name(), verbatim_doc_comment)]
        device: String,

        /// Baud rate for serial communication.
        #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE)]
        baud_rate: u32,
    },
    /// Serve the instrument protocol on a raw TCP socket.
    /// Hosts are served one at a time; instrument state carries over
    /// from one connection to the next.
    #[clap(verbatim_doc_comment)]
    Tcp {
        /// Address to listen on.
        /// Example: "0.0.0.0:5025".
        #[arg(short, long, default_value = "0.0.0.0:5025", verbatim_doc_comment)]
        address: String,
    },
    /// Serve the instrument protocol on standard input and output.
    Stdio,
}

const fn about_text() -> &'static str {
    "Multi-channel thermocouple and voltage instrument - serves the text command protocol over serial, TCP or stdio."
}

#[derive(Parser, Debug)]
#[command(name="thermd", author, version, about=about_text(), long_about = None, propagate_version = true)]
pub struct CliArgs {
    /// Configure verbosity of logging output.
    /// -v for info, -vv for debug, -vvv for trace. Default is warn.
    #[command(flatten)]
    pub verbose: Verbosity<WarnLevel>,

    /// Specifies the transport the instrument is served on.
    #[command(subcommand)]
    pub connection: CliConnection,

    /// YAML configuration file.
    /// Defaults to "thermd.yml" in the working directory when present.
    #[arg(global = true, short, long, verbatim_doc_comment)]
    pub config: Option<PathBuf>,

    /// Mode entered at start-up, overriding the configuration file.
    /// One of: instrument, streaming, diagnostic, calibration.
    #[arg(global = true, short, long, verbatim_doc_comment)]
    pub mode: Option<Mode>,

    /// Minimum spacing between consecutive thermocouple reads on the shared bus,
    /// overriding the configuration file.
    /// Examples: "100ms", "250ms".
    #[arg(global = true, long, value_parser = humantime::parse_duration, verbatim_doc_comment)]
    pub settle_delay: Option<Duration>,
}
