use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::path::Path;

#[derive(Debug, Error)]
pub enum UsersError {
    #[error("failed to read users file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse users file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("duplicate user {0}")]
    Duplicate(String),
    #[error("failed to hash password: {0}")]
    Hash(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: u64,
    pub name: String,
    pub password_hash: String,
    #[serde(default)]
    pub admin: bool,
}

#[derive(Debug, Default, Deserialize)]
struct UsersFile {
    #[serde(default)]
    users: Vec<UserRecord>,
}

/// Accounts allowed to sign in, loaded once at startup.
///
/// ```toml
/// [[users]]
/// id = 1
/// name = "marten"
/// password_hash = "$argon2id$..."
/// admin = true
/// ```
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: Vec<UserRecord>,
}

impl UserDirectory {
    pub fn load(path: &Path) -> Result<Self, UsersError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, UsersError> {
        let file: UsersFile = toml::from_str(contents)?;
        let mut users: Vec<UserRecord> = Vec::with_capacity(file.users.len());
        for user in file.users {
            if users
                .iter()
                .any(|known| known.id == user.id || known.name == user.name)
            {
                return Err(UsersError::Duplicate(user.name));
            }
            users.push(user);
        }
        Ok(Self { users })
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Looks the user up by name and checks the password against its hash.
    pub fn authenticate(&self, name: &str, password: &str) -> Option<&UserRecord> {
        let user = self.users.iter().find(|user| user.name == name)?;
        verify_password(password, &user.password_hash).then_some(user)
    }
}

fn verify_password(password: &str, password_hash: &str) -> bool {
    let hash = match PasswordHash::new(password_hash) {
        Ok(hash) => hash,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &hash)
        .is_ok()
}

pub fn hash_password(password: &str) -> Result<String, UsersError> {
    let mut salt = [0u8; 16];
    OsRng.fill_bytes(&mut salt);
    hash_password_with_salt(password, &salt)
}

pub(crate) fn hash_password_with_salt(password: &str, salt: &[u8]) -> Result<String, UsersError> {
    let salt = SaltString::encode_b64(salt).map_err(|err| UsersError::Hash(err.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| UsersError::Hash(err.to_string()))
}
