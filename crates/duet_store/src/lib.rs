//! duet_store - Credential persistence, key vault and sessions
//!
//! # Layout
//! - `store`   - async key-value collaborator trait + in-memory store
//! - `db`      - SQLite implementation (sqlx, WAL, migrations on open)
//! - `vault`   - register / login / change password / reset state machine
//! - `session` - decrypted key pairs and the peer channel while logged in
//! - `config`  - Argon2 cost configuration
//! - `error`   - caller-facing error taxonomy
//!
//! Private keys never reach the store unencrypted: each is wrapped under a
//! key-encryption key derived from the password and only unwrapped into a
//! `Session`, which zeroizes them on drop.

pub mod config;
pub mod db;
pub mod error;
pub mod session;
pub mod store;
pub mod vault;

pub use config::CoreConfig;
pub use db::SqliteStore;
pub use error::{CoreError, StoreError};
pub use session::Session;
pub use store::{CredentialKeys, CredentialStore, MemoryStore};
pub use vault::KeyVault;
