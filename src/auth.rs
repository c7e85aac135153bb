//! Identity primitives: password hashing and bearer session tokens.
//!
//! Passwords are stored as PBKDF2 PHC strings. Session tokens are opaque
//! random strings handed to the client; the server keeps only their
//! SHA-256 hashes, mapped to the account and its role.

use std::collections::HashMap;

use pbkdf2::password_hash::rand_core::OsRng;
use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::Pbkdf2;
use uuid::Uuid;

use crate::models::enums::Role;

// ═══════════════════════════════════════════════════════════
// Password hashing
// ═══════════════════════════════════════════════════════════

/// Hash a password into a PHC string for storage.
pub fn hash_password(password: &str) -> Result<String, pbkdf2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Pbkdf2.hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Verify a password against a stored PHC string.
pub fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| Pbkdf2.verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

// ═══════════════════════════════════════════════════════════
// Bearer session tokens
// ═══════════════════════════════════════════════════════════

/// Hash a bearer token string using SHA-256.
pub fn hash_token(token: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Generate a random bearer token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    use base64::Engine;
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// The authenticated principal a token resolves to. The role is computed
/// once at login and carried with the session so handlers dispatch on it
/// without re-deriving it per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub account_id: Uuid,
    pub role: Role,
}

/// In-memory session registry keyed by token hash.
pub struct SessionStore {
    sessions: HashMap<[u8; 32], Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    /// Issue a fresh token for an account. Returns the plaintext token;
    /// only its hash is retained.
    pub fn issue(&mut self, account_id: Uuid, role: Role) -> String {
        let token = generate_token();
        self.sessions
            .insert(hash_token(&token), Session { account_id, role });
        token
    }

    /// Resolve a presented token to its session, if the token is live.
    pub fn resolve(&self, token: &str) -> Option<Session> {
        self.sessions.get(&hash_token(token)).copied()
    }

    /// Revoke a token (logout). Returns whether it was live.
    pub fn revoke(&mut self, token: &str) -> bool {
        self.sessions.remove(&hash_token(token)).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn password_hashes_are_salted() {
        let h1 = hash_password("same").unwrap();
        let h2 = hash_password("same").unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn verify_rejects_garbage_hash() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn generate_token_is_unique() {
        let t1 = generate_token();
        let t2 = generate_token();
        assert_ne!(t1, t2);
        assert!(!t1.is_empty());
    }

    #[test]
    fn hash_token_is_deterministic() {
        assert_eq!(hash_token("test"), hash_token("test"));
        assert_ne!(hash_token("token-a"), hash_token("token-b"));
    }

    #[test]
    fn session_issue_resolve_revoke() {
        let mut store = SessionStore::new();
        let account_id = Uuid::new_v4();
        let token = store.issue(account_id, Role::Doctor);

        let session = store.resolve(&token).unwrap();
        assert_eq!(session.account_id, account_id);
        assert_eq!(session.role, Role::Doctor);

        assert!(store.revoke(&token));
        assert!(store.resolve(&token).is_none());
        assert!(!store.revoke(&token));
    }

    #[test]
    fn unknown_token_does_not_resolve() {
        let store = SessionStore::new();
        assert!(store.resolve("made-up-token").is_none());
    }
}
