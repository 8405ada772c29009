use std::process;

use log::{info, warn, error};

#[macro_use] mod core;

mod backuping;
mod cli;
mod config;
mod exec;
mod restic;
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::exec::SystemRunner;
use crate::restic::Restic;

fn main() {
    let options = cli::parse_args().unwrap_or_else(|err| {
        eprintln!("{}.", err);
        process::exit(1);
    });

    if let Err(err) = easy_logging::init(module_path!(), options.log_level) {
        eprintln!("Failed to initialize the logging: {}.", err);
        process::exit(1);
    }

    info!("Using configuration file at {:?}.", options.config_path);
    let config = Config::load(&options.config_path).unwrap_or_else(|err| {
        error!("Error while reading {:?} configuration file: {}.", options.config_path, err);
        process::exit(1);
    });

    let runner = SystemRunner;
    let restic = Restic::new(&runner, config.credentials.as_ref());

    match backuping::backup(&config, &restic) {
        Ok(true) => {},
        Ok(false) => warn!("The backup has completed with errors."),
        Err(err) => {
            error!("{}.", err);
            process::exit(1);
        },
    }
}
