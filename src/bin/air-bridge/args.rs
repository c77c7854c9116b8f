use std::{net::SocketAddr, path::PathBuf};

use air_quality_bridge::command::NumericPolicy;
use clap::Parser;

#[derive(Debug, Parser)]
pub struct Args {
    #[arg(long, env = "SERIAL_PORT")]
    pub serial_port: String,

    #[arg(long, env = "BAUD_RATE", default_value_t = 9600)]
    pub baud_rate: u32,

    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Directory holding `index.html` and `style.css`.
    #[arg(long, env = "ASSETS_DIR", default_value = "data")]
    pub assets_dir: PathBuf,

    #[arg(
        long,
        env = "STATUS_INTERVAL_SECS",
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub status_interval_secs: u64,

    /// Read values like the sensor firmware does: leading digits only, `0` if none.
    #[arg(long, env = "LENIENT_NUMBERS")]
    pub lenient_numbers: bool,
}

impl Args {
    pub fn numeric_policy(&self) -> NumericPolicy {
        if self.lenient_numbers {
            NumericPolicy::Lenient
        } else {
            NumericPolicy::Strict
        }
    }
}
