use crate::config::UserRecord;
use jailftp::CredentialStore;
use std::{collections::HashMap, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("user {0:?} is defined more than once")]
    Duplicate(String),
    #[error("user entry has an empty username")]
    EmptyUsername,
}

#[derive(Debug)]
struct Account {
    password: String,
    root: PathBuf,
}

/// Users loaded from the configuration file. Read-only once built, so one registry is
/// shared by every session.
#[derive(Debug, Default)]
pub struct UserRegistry {
    accounts: HashMap<String, Account>,
}

impl UserRegistry {
    pub fn from_records(records: Vec<UserRecord>) -> Result<Self, RegistryError> {
        let mut accounts = HashMap::with_capacity(records.len());

        for UserRecord {
            username,
            password,
            root,
        } in records
        {
            if username.is_empty() {
                return Err(RegistryError::EmptyUsername);
            }
            if accounts.contains_key(&username) {
                return Err(RegistryError::Duplicate(username));
            }
            accounts.insert(username, Account { password, root });
        }

        Ok(Self { accounts })
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl CredentialStore for UserRegistry {
    fn user_exists(&self, username: &str) -> bool {
        self.accounts.contains_key(username)
    }

    fn is_valid_login(&self, username: &str, password: &str) -> bool {
        self.accounts
            .get(username)
            .is_some_and(|account| account.password == password)
    }

    fn jail_root_for(&self, username: &str) -> Option<PathBuf> {
        self.accounts.get(username).map(|account| account.root.clone())
    }
}
