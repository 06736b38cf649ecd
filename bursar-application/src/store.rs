use bursar_domain::{Expense, Ledger};
use serde::{Serialize, de::DeserializeOwned};

use crate::{groups::GroupDirectory, ports::BlobStore};

pub const EXPENSES_KEY: &str = "EXPENSES_LIST";
pub const BALANCE_KEY: &str = "BALANCE_SUMMARY";
pub const GROUPS_KEY: &str = "GROUP_SET";

/// Typed facade over the host's blob store. Each of the three keys decodes
/// to its own collection; a blob that fails to decode is logged and treated
/// as empty rather than poisoning the session.
pub struct TreasuryStore<'a> {
    blobs: &'a dyn BlobStore,
}

impl<'a> TreasuryStore<'a> {
    pub fn new(blobs: &'a dyn BlobStore) -> Self {
        Self { blobs }
    }

    /// Writes an empty collection under every key the host has not seen yet.
    pub fn initialize(&self) {
        if self.blobs.retrieve(EXPENSES_KEY).is_none() {
            self.encode(EXPENSES_KEY, &Vec::<Expense>::new());
        }
        if self.blobs.retrieve(BALANCE_KEY).is_none() {
            self.encode(BALANCE_KEY, &Ledger::new());
        }
        if self.blobs.retrieve(GROUPS_KEY).is_none() {
            self.encode(GROUPS_KEY, &GroupDirectory::default());
        }
    }

    pub fn load_expenses(&self) -> Vec<Expense> {
        self.decode_or_default(EXPENSES_KEY)
    }

    pub fn save_expenses(&self, expenses: &[Expense]) {
        self.encode(EXPENSES_KEY, &expenses);
    }

    pub fn load_ledger(&self) -> Ledger {
        self.decode_or_default(BALANCE_KEY)
    }

    pub fn save_ledger(&self, ledger: &Ledger) {
        self.encode(BALANCE_KEY, ledger);
    }

    pub fn load_groups(&self) -> GroupDirectory {
        self.decode_or_default(GROUPS_KEY)
    }

    pub fn save_groups(&self, groups: &GroupDirectory) {
        self.encode(GROUPS_KEY, groups);
    }

    fn decode_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.blobs.retrieve(key) {
            Some(bytes) => match serde_json::from_slice(&bytes) {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!(key, %err, "stored blob failed to decode, starting empty");
                    T::default()
                }
            },
            None => T::default(),
        }
    }

    fn encode<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.blobs.store(key, bytes),
            Err(err) => tracing::error!(key, %err, "failed to encode blob"),
        }
    }
}
