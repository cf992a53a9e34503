//! Key vault: long-term key pairs protected by the user password.
//!
//! State machine per alias:
//!   Unregistered ──register──▶ LoggedIn
//!   Registered   ──login────▶ LoggedIn | Authentication | Corruption
//!   LoggedIn     ──change_password──▶ LoggedIn (same keys, new wrapping)
//!   LoggedIn     ──reset / logout──▶ Registered (session zeroized)
//!
//! Persisted per alias (see `store::CredentialKeys`): the KDF record (salt +
//! Argon2id costs), the two wrapped key seeds and the login password hash.
//! Registration and password changes write all four in one atomic batch with
//! the password hash last, so a store that is only ordered, not atomic, still
//! reads as "unregistered" or "old credentials" after a crash.
//!
//! State-changing operations take `&mut self`: one vault allows at most one
//! in-flight mutation. Argon2 work runs on the tokio blocking pool.

use duet_crypto::{
    derive_kek, ExchangeKeyPair, KdfRecord, PasswordAuthenticator, PasswordHashRecord,
    PublicKeyBytes, SigningKeyPair,
};
use duet_proto::{KeyRole, PublicIdentity, WireRecord, WrappedKeyRecord};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::{
    config::CoreConfig,
    error::CoreError,
    session::Session,
    store::{CredentialKeys, CredentialStore},
};

const MAX_ALIAS_LEN: usize = 256;

type Seed = Zeroizing<[u8; 32]>;

pub struct KeyVault<S> {
    store: S,
    config: CoreConfig,
    session: Option<Session>,
}

impl<S: CredentialStore> KeyVault<S> {
    pub fn new(store: S, config: CoreConfig) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            session: None,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub async fn is_registered(&self, alias: &str) -> Result<bool, CoreError> {
        validate_alias(alias)?;
        let keys = CredentialKeys::for_alias(alias);
        Ok(self.store.contains(&keys.password_hash).await?)
    }

    /// Register `alias` if it has no password hash yet, otherwise log in.
    /// Returns the exchange public key to hand to the peer.
    ///
    /// On failure any existing session is left as it was.
    pub async fn register_or_login(
        &mut self,
        alias: &str,
        password: &str,
    ) -> Result<PublicKeyBytes, CoreError> {
        validate_alias(alias)?;
        let keys = CredentialKeys::for_alias(alias);
        let password = Zeroizing::new(password.as_bytes().to_vec());

        let session = match self.store.read(&keys.password_hash).await? {
            None => self.register(alias, &keys, password).await?,
            Some(hash) => self.login(alias, &keys, password, &hash).await?,
        };
        let public = *session.exchange_public_key();
        self.session = Some(session);
        Ok(public)
    }

    async fn register(
        &self,
        alias: &str,
        keys: &CredentialKeys,
        password: Zeroizing<Vec<u8>>,
    ) -> Result<Session, CoreError> {
        let exchange = ExchangeKeyPair::generate();
        let signing = SigningKeyPair::generate();

        let batch = self
            .seal_credentials(
                alias,
                keys,
                password,
                Zeroizing::new(*exchange.secret_bytes()),
                Zeroizing::new(*signing.secret_bytes()),
            )
            .await?;
        self.store.write_batch(&batch).await?;

        info!(alias, "identity registered");
        Ok(Session::new(alias.to_string(), exchange, signing))
    }

    async fn login(
        &self,
        alias: &str,
        keys: &CredentialKeys,
        password: Zeroizing<Vec<u8>>,
        hash: &[u8],
    ) -> Result<Session, CoreError> {
        // Parsing bounds the embedded Argon2 costs before any hashing runs.
        let record = PasswordHashRecord::from_bytes(hash)
            .map_err(|e| CoreError::Corruption(format!("password hash record: {e}")))?;

        let authenticator = PasswordAuthenticator::new(self.config.password_hash);
        let (password, verified) = blocking(move || {
            let verified = authenticator
                .verify(&password, &record)
                .map_err(|e| CoreError::Corruption(format!("password hash record: {e}")))?;
            Ok((password, verified))
        })
        .await?;
        if !verified {
            warn!(alias, "login rejected: password mismatch");
            return Err(CoreError::Authentication);
        }

        let kdf = KdfRecord::from_bytes(&self.read_required(&keys.salt).await?)?;
        let wrapped_exchange =
            WrappedKeyRecord::from_bytes(&self.read_required(&keys.wrapped_exchange_key).await?)?;
        let wrapped_signing =
            WrappedKeyRecord::from_bytes(&self.read_required(&keys.wrapped_signing_key).await?)?;

        let owner = alias.to_string();
        let unwrapped = blocking(move || {
            let kek = derive_kek(&password, &kdf)
                .map_err(|e| CoreError::Corruption(format!("kdf record: {e}")))?;
            let exchange_seed = wrapped_exchange
                .unwrap(&kek, &owner, KeyRole::Exchange)
                .map_err(|_| CoreError::Corruption("exchange key failed to unwrap".into()))?;
            let signing_seed = wrapped_signing
                .unwrap(&kek, &owner, KeyRole::Signing)
                .map_err(|_| CoreError::Corruption("signing key failed to unwrap".into()))?;
            Ok((
                ExchangeKeyPair::from_seed(&*exchange_seed)?,
                SigningKeyPair::from_seed(&*signing_seed)?,
            ))
        })
        .await;

        let (exchange, signing) = unwrapped.map_err(|e| {
            if e.is_corruption() {
                warn!(alias, "login failed: stored key material is corrupted");
            }
            e
        })?;

        info!(alias, "identity logged in");
        Ok(Session::new(alias.to_string(), exchange, signing))
    }

    /// Re-wrap both private keys under a KEK from a fresh salt. Key material
    /// (and therefore both public keys) is unchanged.
    pub async fn change_password(&mut self, new_password: &str) -> Result<(), CoreError> {
        let session = self
            .session
            .as_ref()
            .ok_or(CoreError::NotInitialized("change_password requires a logged-in identity"))?;
        let alias = session.alias().to_string();
        let exchange_seed = Zeroizing::new(*session.exchange_key_pair().secret_bytes());
        let signing_seed = Zeroizing::new(*session.signing_key_pair().secret_bytes());

        let keys = CredentialKeys::for_alias(&alias);
        let password = Zeroizing::new(new_password.as_bytes().to_vec());
        let batch = self
            .seal_credentials(&alias, &keys, password, exchange_seed, signing_seed)
            .await?;
        self.store.write_batch(&batch).await?;

        info!(alias = %alias, "password changed; keys re-wrapped");
        Ok(())
    }

    /// Drop the session and all decrypted key material. Persisted records are
    /// untouched. Idempotent.
    pub fn reset(&mut self) {
        if let Some(session) = self.session.take() {
            info!(alias = session.alias(), "session reset");
        }
    }

    pub fn logout(&mut self) {
        self.reset();
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Result<&Session, CoreError> {
        self.session
            .as_ref()
            .ok_or(CoreError::NotInitialized("no identity is logged in"))
    }

    pub fn session_mut(&mut self) -> Result<&mut Session, CoreError> {
        self.session
            .as_mut()
            .ok_or(CoreError::NotInitialized("no identity is logged in"))
    }

    pub fn exchange_public_key(&self) -> Result<PublicKeyBytes, CoreError> {
        Ok(*self.session()?.exchange_public_key())
    }

    pub fn signing_public_key(&self) -> Result<PublicKeyBytes, CoreError> {
        Ok(*self.session()?.signing_public_key())
    }

    pub fn public_identity(&self) -> Result<PublicIdentity, CoreError> {
        Ok(self.session()?.public_identity())
    }

    async fn read_required(&self, key: &str) -> Result<Vec<u8>, CoreError> {
        debug!(key, "reading credential record");
        self.store
            .read(key)
            .await?
            .ok_or_else(|| CoreError::Corruption(format!("missing record {key}")))
    }

    /// Derive a KEK from a fresh salt, wrap both seeds and hash the password.
    /// Returns the store batch, password hash last.
    async fn seal_credentials(
        &self,
        alias: &str,
        keys: &CredentialKeys,
        password: Zeroizing<Vec<u8>>,
        exchange_seed: Seed,
        signing_seed: Seed,
    ) -> Result<Vec<(String, Vec<u8>)>, CoreError> {
        let kdf = KdfRecord::generate(self.config.kdf);
        let authenticator = PasswordAuthenticator::new(self.config.password_hash);
        let owner = alias.to_string();

        let (kdf_bytes, exchange_bytes, signing_bytes, hash) = blocking(move || {
            let kek = derive_kek(&password, &kdf)?;
            let wrapped_exchange =
                WrappedKeyRecord::wrap(&kek, &exchange_seed, &owner, KeyRole::Exchange)?;
            let wrapped_signing =
                WrappedKeyRecord::wrap(&kek, &signing_seed, &owner, KeyRole::Signing)?;
            let hash = authenticator.hash(&password)?;
            Ok((
                kdf.to_bytes()?,
                wrapped_exchange.to_bytes()?,
                wrapped_signing.to_bytes()?,
                hash,
            ))
        })
        .await?;

        Ok(vec![
            (keys.salt.clone(), kdf_bytes),
            (keys.wrapped_exchange_key.clone(), exchange_bytes),
            (keys.wrapped_signing_key.clone(), signing_bytes),
            (keys.password_hash.clone(), hash.to_bytes()),
        ])
    }
}

fn validate_alias(alias: &str) -> Result<(), CoreError> {
    if alias.is_empty() {
        return Err(CoreError::InvalidAlias("alias must not be empty".into()));
    }
    if alias.len() > MAX_ALIAS_LEN {
        return Err(CoreError::InvalidAlias(format!(
            "alias longer than {MAX_ALIAS_LEN} bytes"
        )));
    }
    if alias.chars().any(char::is_control) {
        return Err(CoreError::InvalidAlias(
            "alias must not contain control characters".into(),
        ));
    }
    Ok(())
}

async fn blocking<T, F>(f: F) -> Result<T, CoreError>
where
    F: FnOnce() -> Result<T, CoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}
