use std::path::PathBuf;

use clap::Parser;

pub const DEFAULT_PORT: u16 = 7777;

/// Share a directory with other devices on the local network.
///
/// The receiver must be on the same network as this machine.
#[derive(Parser, Debug)]
#[command(name = "beamdrop")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory to share files from
    #[arg(short, long, default_value = ".", value_name = "DIR")]
    pub dir: PathBuf,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Password required in the X-Password header for file operations
    #[arg(long)]
    pub password: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Do not print a QR code for the share URL
    #[arg(long)]
    pub no_qr: bool,

    /// Also write logs to this directory
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}
