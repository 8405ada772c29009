use clap::{Arg, ArgAction, Command};
use indoc::indoc;

use crate::core::GenericResult;

pub struct GlobalOptions {
    pub log_level: log::Level,
    pub config_path: String,
}

pub fn parse_args() -> GenericResult<GlobalOptions> {
    let matches = new_command("rsb", "Very simple in configuring restic backup orchestrator")
        .version(env!("CARGO_PKG_VERSION"))
        .help_expected(true)

        .arg(Arg::new("cron")
            .long("cron")
            .action(ArgAction::SetTrue)
            .help("Show only warning and error messages (intended to be used from cron)"))

        .arg(Arg::new("verbose")
            .short('v').long("verbose")
            .conflicts_with("cron")
            .action(ArgAction::Count)
            .help("Set verbosity level"))

        .arg(Arg::new("CONFIG")
            .help("Configuration file path")
            .required(true))

        .get_matches();

    let log_level = match matches.get_count("verbose") {
        0 => if matches.get_flag("cron") {
            log::Level::Warn
        } else {
            log::Level::Info
        },
        1 => log::Level::Debug,
        2 => log::Level::Trace,
        _ => return Err!("Invalid verbosity level"),
    };

    let config_path = matches.get_one::<String>("CONFIG").unwrap().clone();

    Ok(GlobalOptions {log_level, config_path})
}

fn new_command(name: &'static str, about: &'static str) -> Command {
    Command::new(name)
        // Default template contains `{bin} {version}` for some reason
        .help_template(indoc!("
            {before-help}{about}

            {usage-heading}
                {usage}

            {all-args}{after-help}\
        "))
        .about(about)
}
