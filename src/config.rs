use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use itertools::Itertools;
use log::warn;
use serde_derive::Deserialize;
use serde_yaml::Value;
use validator::Validate;

use crate::core::GenericResult;

#[derive(Debug)]
pub struct Config {
    pub path: String,
    pub repos: Vec<BackupRepo>,
    pub retention: Option<RetentionPolicy>,
    pub credentials: Option<ProviderCredentials>,
}

#[derive(Clone, Debug, Validate)]
pub struct BackupRepo {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub backup_path: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Clone, Default, PartialEq, Debug)]
pub struct RetentionPolicy {
    pub keep_last: Option<u64>,
    pub keep_daily: Option<u64>,
    pub keep_weekly: Option<u64>,
    pub keep_monthly: Option<u64>,
    pub keep_yearly: Option<u64>,
}

#[derive(Clone, PartialEq, Debug)]
pub struct ProviderCredentials {
    pub account_id: String,
    pub account_key: String,
}

impl RetentionPolicy {
    pub fn is_empty(&self) -> bool {
        self.keep_last.is_none() && self.keep_daily.is_none() && self.keep_weekly.is_none() &&
            self.keep_monthly.is_none() && self.keep_yearly.is_none()
    }

    pub fn flags(&self) -> Vec<String> {
        let mut flags = Vec::new();

        for (period, count) in [
            ("last", self.keep_last),
            ("daily", self.keep_daily),
            ("weekly", self.keep_weekly),
            ("monthly", self.keep_monthly),
            ("yearly", self.keep_yearly),
        ] {
            if let Some(count) = count {
                flags.push(format!("--keep-{}", period));
                flags.push(count.to_string());
            }
        }

        flags
    }
}

#[derive(Deserialize)]
struct ConfigDocument {
    repos: Option<Vec<RepoEntry>>,
    config: Option<BTreeMap<String, Value>>,
}

#[derive(Deserialize)]
struct RepoEntry {
    name: Option<String>,
    backup_path: Option<String>,
    password: Option<String>,
}

impl Config {
    pub fn load(path: &str) -> GenericResult<Config> {
        let mut data = Vec::new();
        File::open(path)?.read_to_end(&mut data)?;

        let document: ConfigDocument = if Path::new(path).extension().is_some_and(|extension| extension == "json") {
            serde_json::from_slice(&data)?
        } else {
            serde_yaml::from_slice(&data)?
        };

        validate_document(path, document)
    }
}

fn validate_document(path: &str, document: ConfigDocument) -> GenericResult<Config> {
    let entries = document.repos.ok_or(
        "The configuration file has no 'repos' section")?;

    let mut repo_names = HashSet::new();
    let mut repos = Vec::with_capacity(entries.len());

    for (index, entry) in entries.into_iter().enumerate() {
        let Some(repo) = validate_repo(index, entry) else {
            continue;
        };

        if !repo_names.insert(repo.name.clone()) {
            return Err!("Duplicated repository name: {:?}", repo.name);
        }

        repos.push(repo);
    }

    let (retention, credentials) = match document.config {
        Some(settings) => validate_settings(settings),
        None => (None, None),
    };

    Ok(Config {path: path.to_owned(), repos, retention, credentials})
}

fn validate_repo(index: usize, entry: RepoEntry) -> Option<BackupRepo> {
    let missing = [
        ("name", entry.name.is_none()),
        ("backup_path", entry.backup_path.is_none()),
        ("password", entry.password.is_none()),
    ].into_iter().filter(|(_, missing)| *missing).map(|(field, _)| field).collect_vec();

    if !missing.is_empty() {
        warn!("Skipping repository #{}: it has no {} configured.", index + 1, missing.join(", "));
        return None;
    }

    let repo = BackupRepo {
        name: entry.name.unwrap(),
        backup_path: shellexpand::tilde(&entry.backup_path.unwrap()).into_owned(),
        password: entry.password.unwrap(),
    };

    if let Err(err) = repo.validate() {
        warn!("Skipping repository #{} ({:?}): {}.", index + 1, repo.name, err);
        return None;
    }

    Some(repo)
}

fn validate_settings(settings: BTreeMap<String, Value>) -> (Option<RetentionPolicy>, Option<ProviderCredentials>) {
    let mut retention = RetentionPolicy::default();
    let mut account_id = None;
    let mut account_key = None;

    for (name, value) in settings {
        match name.as_str() {
            "b2-account-id" => account_id = validate_string_setting(&name, &value),
            "b2-account-key" => account_key = validate_string_setting(&name, &value),
            "keep-last" => retention.keep_last = validate_count_setting(&name, &value),
            "keep-daily" => retention.keep_daily = validate_count_setting(&name, &value),
            "keep-weekly" => retention.keep_weekly = validate_count_setting(&name, &value),
            "keep-monthly" => retention.keep_monthly = validate_count_setting(&name, &value),
            "keep-yearly" => retention.keep_yearly = validate_count_setting(&name, &value),
            _ => warn!("Skipping {:?} configuration option: it's not supported.", name),
        }
    }

    let credentials = match (account_id, account_key) {
        (Some(account_id), Some(account_key)) => Some(ProviderCredentials {account_id, account_key}),
        (None, None) => None,
        _ => {
            warn!(concat!(
                "Skipping incomplete provider credentials: ",
                "both b2-account-id and b2-account-key must be specified.",
            ));
            None
        },
    };

    (if retention.is_empty() {
        None
    } else {
        Some(retention)
    }, credentials)
}

fn validate_string_setting(name: &str, value: &Value) -> Option<String> {
    let value = value.as_str().map(ToOwned::to_owned);
    if value.is_none() {
        warn!("Skipping {:?} configuration option: a string value is expected.", name);
    }
    value
}

fn validate_count_setting(name: &str, value: &Value) -> Option<u64> {
    let value = value.as_u64();
    if value.is_none() {
        warn!("Skipping {:?} configuration option: a non-negative count is expected.", name);
    }
    value
}
