use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::sync::{Mutex, MutexGuard};

use assert_fs::fixture::TempDir;
use indoc::{formatdoc, indoc};

use crate::backuping;
use crate::config::Config;
use crate::core::EmptyResult;
use crate::exec::SystemRunner;
use crate::restic::Restic;

// The logging context is process-wide, so tests that drive the orchestration loop mustn't overlap
pub fn logging_context_lock() -> MutexGuard<'static, ()> {
    static LOCK: Mutex<()> = Mutex::new(());
    LOCK.lock().unwrap_or_else(|err| err.into_inner())
}

// Drives the whole orchestration against a stub restic executable which records its invocations.
// The first run initializes the repository, the second one sees it as existing.
#[test]
fn orchestration() -> EmptyResult {
    let _logging_lock = logging_context_lock();
    let temp_dir = TempDir::new()?;

    let log_path = temp_dir.join("restic.log");
    let marker_path = temp_dir.join("initialized");
    let restic_path = temp_dir.join("restic");

    fs::write(&restic_path, formatdoc!(r#"
        #!/bin/sh
        echo "$RESTIC_PASSWORD $B2_ACCOUNT_ID $*" >> "{log}"
        case "$*" in
            *" snapshots")
                if [ ! -e "{marker}" ]; then
                    echo "Is there a repository at the following location?" >&2
                    echo "no repository at this location" >&2
                    exit 1
                fi;;
            *" init")
                touch "{marker}";;
        esac
    "#, log = log_path.display(), marker = marker_path.display()))?;
    fs::set_permissions(&restic_path, fs::Permissions::from_mode(0o755))?;

    let config_path = temp_dir.join("rsb.yaml");
    fs::write(&config_path, indoc!("
        repos:
          - name: first
            backup_path: /data/first
            password: first-password
        config:
          keep-daily: 7
          keep-weekly: 4
          b2-account-id: account-id
          b2-account-key: account-key
    "))?;

    let config = Config::load(config_path.to_str().unwrap())?;
    let runner = SystemRunner;
    let restic = Restic::with_binary(restic_path.to_str().unwrap(), &runner, config.credentials.as_ref());

    for _ in 0..2 {
        assert!(backuping::backup(&config, &restic)?);
    }

    assert_eq!(fs::read_to_string(&log_path)?, indoc!("
        first-password account-id -r first snapshots
        first-password account-id -r first init
        first-password account-id -r first backup --verbose /data/first
        first-password account-id -r first forget --prune --keep-daily 7 --keep-weekly 4
        first-password account-id -r first snapshots
        first-password account-id -r first backup --verbose /data/first
        first-password account-id -r first forget --prune --keep-daily 7 --keep-weekly 4
    "));

    Ok(())
}
