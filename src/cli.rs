//! Command-line interface definitions.

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "parlor", version, about = "Chat-room service with purchasable sticker sets")]
pub struct Args {
    /// Override the configured HTTP port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Emit logs as JSON lines instead of the pretty format.
    #[arg(long)]
    pub json_logs: bool,
}
