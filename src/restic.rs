use crate::config::{BackupRepo, ProviderCredentials, RetentionPolicy};
use crate::core::{EmptyResult, GenericResult};
use crate::exec::{CommandOutput, CommandRunner};

// restic prints this to stderr when the repository hasn't been initialized yet
const NO_REPOSITORY_ERROR: &str = "no repository at this location";

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum RepositoryState {
    Exists,
    Missing,
    Unknown,
}

pub struct Restic<'a> {
    binary: String,
    runner: &'a dyn CommandRunner,
    credentials: Option<&'a ProviderCredentials>,
}

impl<'a> Restic<'a> {
    pub fn new(runner: &'a dyn CommandRunner, credentials: Option<&'a ProviderCredentials>) -> Restic<'a> {
        Restic::with_binary("restic", runner, credentials)
    }

    pub fn with_binary(binary: &str, runner: &'a dyn CommandRunner, credentials: Option<&'a ProviderCredentials>) -> Restic<'a> {
        Restic {binary: binary.to_owned(), runner, credentials}
    }

    /// Probes the repository with the snapshot listing command.
    ///
    /// A successful listing means that the repository exists. A failure mentioning the "no
    /// repository" error means that it hasn't been initialized yet. Any other failure (bad
    /// credentials, network errors) leaves the state unknown and mustn't be interpreted as a
    /// missing repository.
    pub fn check_repository(&self, repo: &BackupRepo) -> GenericResult<RepositoryState> {
        let output = self.run(repo, vec!["snapshots".to_owned()])?;

        Ok(if output.success() {
            RepositoryState::Exists
        } else if output.stderr.contains(NO_REPOSITORY_ERROR) {
            RepositoryState::Missing
        } else {
            RepositoryState::Unknown
        })
    }

    pub fn init_repository(&self, repo: &BackupRepo) -> EmptyResult {
        let output = self.run(repo, vec!["init".to_owned()])?;
        if !output.success() {
            return Err!("restic init has failed: {}", output.error_description());
        }
        Ok(())
    }

    pub fn backup(&self, repo: &BackupRepo) -> GenericResult<CommandOutput> {
        self.run(repo, vec!["backup".to_owned(), "--verbose".to_owned(), repo.backup_path.clone()])
    }

    pub fn prune(&self, repo: &BackupRepo, retention: &RetentionPolicy) -> EmptyResult {
        let mut args = vec!["forget".to_owned(), "--prune".to_owned()];
        args.extend(retention.flags());

        let output = self.run(repo, args)?;
        if !output.success() {
            return Err!("restic forget has failed: {}", output.error_description());
        }

        Ok(())
    }

    fn run(&self, repo: &BackupRepo, args: Vec<String>) -> GenericResult<CommandOutput> {
        let mut command = vec!["-r".to_owned(), repo.name.clone()];
        command.extend(args);

        let mut env = vec![("RESTIC_PASSWORD".to_owned(), repo.password.clone())];
        if let Some(credentials) = self.credentials {
            env.push(("B2_ACCOUNT_ID".to_owned(), credentials.account_id.clone()));
            env.push(("B2_ACCOUNT_KEY".to_owned(), credentials.account_key.clone()));
        }

        self.runner.run(&self.binary, &command, &env)
    }
}
