//! Entry point for the `hpms` command.
#![forbid(unsafe_code)]

use env_logger::Env;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    if let Err(err) = hpms_cli::run() {
        eprintln!("hpms: {err}");
        std::process::exit(1);
    }
}
