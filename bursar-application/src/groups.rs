use std::collections::{BTreeMap, BTreeSet};

use bursar_domain::User;
use serde::{Deserialize, Serialize};

/// Named member sets: a group name maps to the users it contains. Names are
/// validated by the parser (3 to 12 uppercase letters) before they get here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDirectory {
    groups: BTreeMap<String, BTreeSet<User>>,
}

/// Group command failures. None of these reach the user: the engine logs
/// them and stays silent.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GroupError {
    #[error("group '{0}' already exists")]
    AlreadyExists(String),
    #[error("group '{0}' does not exist")]
    UnknownGroup(String),
    #[error("user '{user}' is already in group '{group}'")]
    AlreadyMember { group: String, user: User },
    #[error("user '{user}' is not in group '{group}'")]
    NotAMember { group: String, user: User },
}

impl GroupDirectory {
    pub fn create(&mut self, name: &str) -> Result<(), GroupError> {
        if self.groups.contains_key(name) {
            return Err(GroupError::AlreadyExists(name.to_owned()));
        }
        self.groups.insert(name.to_owned(), BTreeSet::new());
        Ok(())
    }

    pub fn add_member(&mut self, name: &str, user: User) -> Result<(), GroupError> {
        let members = self
            .groups
            .get_mut(name)
            .ok_or_else(|| GroupError::UnknownGroup(name.to_owned()))?;
        if !members.insert(user.clone()) {
            return Err(GroupError::AlreadyMember {
                group: name.to_owned(),
                user,
            });
        }
        Ok(())
    }

    pub fn remove_member(&mut self, name: &str, user: &User) -> Result<(), GroupError> {
        let members = self
            .groups
            .get_mut(name)
            .ok_or_else(|| GroupError::UnknownGroup(name.to_owned()))?;
        if !members.remove(user) {
            return Err(GroupError::NotAMember {
                group: name.to_owned(),
                user: user.clone(),
            });
        }
        Ok(())
    }

    /// Members of a group in name order; empty for an unknown group, which
    /// is how an unknown group handle inside an expense contributes nothing.
    pub fn members(&self, name: &str) -> impl Iterator<Item = &User> + '_ {
        self.groups.get(name).into_iter().flatten()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }
}
