//! In-memory credential store

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Mutex;

use async_trait::async_trait;
use chatline_common::validators::username_key;

use super::{CredentialStore, StoreError};

/// Credentials held in a process-local map
///
/// Accounts are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Username key to password
    accounts: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with accounts
    pub fn with_accounts<I, U, P>(accounts: I) -> Self
    where
        I: IntoIterator<Item = (U, P)>,
        U: AsRef<str>,
        P: Into<String>,
    {
        let accounts = accounts
            .into_iter()
            .map(|(username, password)| (username_key(username.as_ref()), password.into()))
            .collect();
        Self {
            accounts: Mutex::new(accounts),
        }
    }

    /// Number of stored accounts
    pub fn len(&self) -> usize {
        self.accounts.lock().expect("credential store lock").len()
    }

    /// Whether the store has no accounts
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn exists(&self, username: &str) -> Result<bool, StoreError> {
        let accounts = self.accounts.lock().expect("credential store lock");
        Ok(accounts.contains_key(&username_key(username)))
    }

    async fn create(&self, username: &str, password: &str) -> Result<(), StoreError> {
        let mut accounts = self.accounts.lock().expect("credential store lock");
        match accounts.entry(username_key(username)) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(password.to_string());
                Ok(())
            }
        }
    }

    async fn verify(&self, username: &str, password: &str) -> Result<bool, StoreError> {
        let accounts = self.accounts.lock().expect("credential store lock");
        Ok(accounts
            .get(&username_key(username))
            .is_some_and(|stored| stored == password))
    }
}
