use std::process::{Command, Stdio};

use log::debug;

use crate::core::GenericResult;

pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn error_description(&self) -> String {
        let error = self.stderr.trim();
        if !error.is_empty() {
            return error.to_owned();
        }

        match self.code {
            Some(code) => format!("the process has terminated with {} exit code", code),
            None => "the process has been terminated by a signal".to_owned(),
        }
    }
}

/// The only boundary through which external processes are spawned. Credentials are passed as
/// explicit per-invocation environment variables and never through the process-wide environment.
pub trait CommandRunner {
    fn run(&self, binary: &str, args: &[String], env: &[(String, String)]) -> GenericResult<CommandOutput>;
}

pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, binary: &str, args: &[String], env: &[(String, String)]) -> GenericResult<CommandOutput> {
        debug!("Executing {} {}...", binary, args.join(" "));

        let output = Command::new(binary)
            .args(args)
            .envs(env.iter().map(|(name, value)| (name, value)))
            .stdin(Stdio::null())
            .output()
            .map_err(|e| format!("Unable to execute {:?}: {}", binary, e))?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
