//! Account directory.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::StoreError;
use crate::auth::User;

/// Storage for login accounts, keyed by username.
pub trait UserStore: Send + Sync {
    /// Store a copy of `user`. Fails if the username is taken.
    fn save(&self, user: &User) -> Result<(), StoreError>;

    /// Look up an account. A miss is `Ok(None)`, not an error.
    fn find(&self, username: &str) -> Result<Option<User>, StoreError>;
}

/// Process-lifetime account directory.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserStore {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for InMemoryUserStore {
    fn save(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write();
        if users.contains_key(&user.username) {
            return Err(StoreError::AlreadyExists(user.username.clone()));
        }
        users.insert(user.username.clone(), user.clone());
        Ok(())
    }

    fn find(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().get(username).cloned())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::auth::Role;

    fn user(name: &str, role: Role) -> User {
        User {
            username: name.to_string(),
            hashed_password: "$argon2id$placeholder".to_string(),
            role,
        }
    }

    #[test]
    fn test_save_and_find() {
        let store = InMemoryUserStore::new();
        let admin = user("admin1", Role::Admin);
        store.save(&admin).unwrap();

        assert_eq!(store.find("admin1").unwrap(), Some(admin));
        assert_eq!(store.find("nobody").unwrap(), None);
    }

    #[test]
    fn test_username_is_unique() {
        let store = InMemoryUserStore::new();
        store.save(&user("admin1", Role::Admin)).unwrap();

        let err = store.save(&user("admin1", Role::User)).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(name) if name == "admin1"));
        assert_eq!(store.find("admin1").unwrap().unwrap().role, Role::Admin);
    }

    #[test]
    fn test_found_user_is_a_copy() {
        let store = InMemoryUserStore::new();
        store.save(&user("user1", Role::User)).unwrap();

        let mut found = store.find("user1").unwrap().unwrap();
        found.role = Role::Admin;
        assert_eq!(store.find("user1").unwrap().unwrap().role, Role::User);
    }
}
