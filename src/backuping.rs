use std::fs::File;

use easy_logging::GlobalContext;
use log::{info, warn, error};
use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};

use crate::config::{BackupRepo, Config, RetentionPolicy};
use crate::core::GenericResult;
use crate::restic::{Restic, RepositoryState};

/// Processes all configured repositories in list order: each one is checked for existence,
/// created if missing, backed up and pruned according to the retention policy. A failure on any
/// step is logged and never aborts the run. Returns false if any step has failed.
pub fn backup(config: &Config, restic: &Restic) -> GenericResult<bool> {
    let _lock = acquire_lock(&config.path)?;

    if config.repos.is_empty() {
        warn!("The configuration file contains no valid repositories. There is nothing to do.");
        return Ok(true);
    }

    let mut ok = true;

    for repo in &config.repos {
        let _context = GlobalContext::new(&repo.name);
        ok &= process_repository(restic, repo, config.retention.as_ref());
    }

    Ok(ok)
}

fn acquire_lock(config_path: &str) -> GenericResult<Flock<File>> {
    let file = File::open(config_path).map_err(|e| format!(
        "Unable to open {:?}: {}", config_path, e))?;

    match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
        Ok(lock) => Ok(lock),
        Err((_, Errno::EAGAIN)) => Err!(concat!(
            "Unable to exclusively run the program for {:?} configuration file: ",
            "it's already locked by another process",
        ), config_path),
        Err((_, err)) => Err!("Unable to flock() {:?}: {}", config_path, err),
    }
}

fn process_repository(restic: &Restic, repo: &BackupRepo, retention: Option<&RetentionPolicy>) -> bool {
    let mut ok = true;

    match restic.check_repository(repo) {
        Ok(RepositoryState::Exists) => {},
        Ok(RepositoryState::Missing) => {
            info!("The repository doesn't exist yet. Creating it...");
            if let Err(err) = restic.init_repository(repo) {
                // The subsequent backup attempt will produce its own error
                error!("Failed to create the repository: {}.", err);
                ok = false;
            }
        },
        Ok(RepositoryState::Unknown) => {
            warn!(concat!(
                "Unable to determine the repository state: restic has returned an error. ",
                "Assuming that the repository exists.",
            ));
        },
        Err(err) => {
            error!("Failed to check the repository: {}.", err);
            ok = false;
        },
    }

    info!("Backing up {:?}...", repo.backup_path);
    match restic.backup(repo) {
        Ok(output) => {
            if !output.stdout.is_empty() {
                info!("{}", output.stdout.trim_end());
            }

            if output.success() {
                info!("The backup has finished successfully.");
            } else {
                error!("The backup has failed: {}.", output.error_description());
                ok = false;
            }
        },
        Err(err) => {
            error!("Failed to run the backup: {}.", err);
            ok = false;
        },
    }

    if let Some(retention) = retention {
        info!("Applying the retention policy...");
        if let Err(err) = restic.prune(repo, retention) {
            error!("Failed to prune old snapshots: {}.", err);
            ok = false;
        }
    }

    ok
}
