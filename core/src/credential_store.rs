/// Credential storage: persists the API token in sled DB
use crate::error::{ClientError, Result};
use std::path::Path;

const TOKEN_KEY: &[u8] = b"token";

pub struct CredentialStore {
    db: sled::Db,
}

impl CredentialStore {
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir).map_err(ClientError::Io)?;
        let db = sled::open(data_dir.join("session.db"))
            .map_err(|e| ClientError::Storage(format!("session DB: {}", e)))?;
        Ok(Self { db })
    }

    pub fn token(&self) -> Result<Option<String>> {
        match self
            .db
            .get(TOKEN_KEY)
            .map_err(|e| ClientError::Storage(format!("read token: {}", e)))?
        {
            Some(val) => Ok(Some(String::from_utf8_lossy(&val).into_owned())),
            None => Ok(None),
        }
    }

    pub fn save_token(&self, token: &str) -> Result<()> {
        self.db
            .insert(TOKEN_KEY, token.as_bytes())
            .map_err(|e| ClientError::Storage(format!("save token: {}", e)))?;
        self.db
            .flush()
            .map_err(|e| ClientError::Storage(format!("flush: {}", e)))?;
        Ok(())
    }

    /// Remove the stored token. Returns whether one was present.
    pub fn clear(&self) -> Result<bool> {
        let removed = self
            .db
            .remove(TOKEN_KEY)
            .map_err(|e| ClientError::Storage(format!("clear token: {}", e)))?;
        self.db
            .flush()
            .map_err(|e| ClientError::Storage(format!("flush: {}", e)))?;
        Ok(removed.is_some())
    }
}

impl Clone for CredentialStore {
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_token_roundtrip_and_clear() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::new(temp_dir.path()).unwrap();
        assert_eq!(store.token().unwrap(), None);

        store.save_token("abc123").unwrap();
        assert_eq!(store.token().unwrap(), Some("abc123".to_string()));

        assert!(store.clear().unwrap());
        assert_eq!(store.token().unwrap(), None);
        assert!(!store.clear().unwrap());
    }

    #[test]
    fn test_token_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = CredentialStore::new(temp_dir.path()).unwrap();
            store.save_token("persisted").unwrap();
        }

        let store = CredentialStore::new(temp_dir.path()).unwrap();
        assert_eq!(store.token().unwrap(), Some("persisted".to_string()));
    }
}
