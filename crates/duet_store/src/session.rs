//! In-memory logged-in state.
//!
//! A `Session` holds the decrypted exchange and signing key pairs and, once
//! connected, the peer's public identity plus the derived shared secret.
//! It is never persisted; dropping it zeroizes every secret it owns.

use duet_crypto::{establish, ExchangeKeyPair, PublicKeyBytes, SharedSecret, SigningKeyPair};
use duet_proto::{messenger, MessageEnvelope, PublicIdentity};
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::error::CoreError;

struct Peer {
    identity: PublicIdentity,
    shared_secret: SharedSecret,
}

pub struct Session {
    alias: String,
    exchange: ExchangeKeyPair,
    signing: SigningKeyPair,
    peer: Option<Peer>,
}

impl Session {
    pub(crate) fn new(alias: String, exchange: ExchangeKeyPair, signing: SigningKeyPair) -> Self {
        Self {
            alias,
            exchange,
            signing,
            peer: None,
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn exchange_key_pair(&self) -> &ExchangeKeyPair {
        &self.exchange
    }

    pub fn signing_key_pair(&self) -> &SigningKeyPair {
        &self.signing
    }

    pub fn exchange_public_key(&self) -> &PublicKeyBytes {
        self.exchange.public()
    }

    pub fn signing_public_key(&self) -> &PublicKeyBytes {
        self.signing.public()
    }

    pub fn public_identity(&self) -> PublicIdentity {
        PublicIdentity::new(&self.alias, *self.exchange.public(), *self.signing.public())
    }

    /// Establish the shared secret with `peer`, replacing any previous peer.
    pub fn connect(&mut self, peer: PublicIdentity) -> Result<(), CoreError> {
        let shared_secret = establish(&self.exchange, &peer.exchange_public)?;
        info!(alias = %self.alias, peer = %peer.alias, "channel established");
        self.peer = Some(Peer {
            identity: peer,
            shared_secret,
        });
        Ok(())
    }

    pub fn disconnect(&mut self) {
        self.peer = None;
    }

    pub fn peer(&self) -> Option<&PublicIdentity> {
        self.peer.as_ref().map(|p| &p.identity)
    }

    pub fn shared_secret(&self) -> Result<&SharedSecret, CoreError> {
        Ok(&self.connected()?.shared_secret)
    }

    fn connected(&self) -> Result<&Peer, CoreError> {
        self.peer
            .as_ref()
            .ok_or(CoreError::NotInitialized("no shared secret established with a peer"))
    }

    /// Encrypt and sign `plaintext` for the connected peer.
    pub fn seal(&self, plaintext: &[u8]) -> Result<MessageEnvelope, CoreError> {
        let peer = self.connected()?;
        Ok(messenger::seal(plaintext, &peer.shared_secret, &self.signing)?)
    }

    /// Verify and decrypt an envelope from the connected peer. An integrity
    /// failure rejects only this envelope.
    pub fn open(&self, envelope: &MessageEnvelope) -> Result<Zeroizing<Vec<u8>>, CoreError> {
        let peer = self.connected()?;
        messenger::open(envelope, &peer.shared_secret, &peer.identity.signing_public).map_err(|e| {
            warn!(alias = %self.alias, peer = %peer.identity.alias, "inbound message rejected");
            CoreError::from(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use duet_proto::IntegrityError;

    use super::*;

    fn session(alias: &str) -> Session {
        Session::new(
            alias.to_string(),
            ExchangeKeyPair::generate(),
            SigningKeyPair::generate(),
        )
    }

    fn connected_pair() -> (Session, Session) {
        let mut alice = session("alice");
        let mut bob = session("bob");
        alice.connect(bob.public_identity()).unwrap();
        bob.connect(alice.public_identity()).unwrap();
        (alice, bob)
    }

    #[test]
    fn seal_requires_a_peer() {
        let alice = session("alice");
        assert!(matches!(
            alice.seal(b"hi"),
            Err(CoreError::NotInitialized(_))
        ));
        assert!(alice.shared_secret().is_err());
    }

    #[test]
    fn both_sides_share_a_secret() {
        let (alice, bob) = connected_pair();
        assert_eq!(alice.shared_secret().unwrap(), bob.shared_secret().unwrap());
    }

    #[test]
    fn message_flows_both_ways() {
        let (alice, bob) = connected_pair();

        let env = alice.seal(b"hello bob").unwrap();
        assert_eq!(bob.open(&env).unwrap().as_slice(), b"hello bob");

        let reply = bob.seal(b"hello alice").unwrap();
        assert_eq!(alice.open(&reply).unwrap().as_slice(), b"hello alice");
    }

    #[test]
    fn rejected_message_does_not_poison_session() {
        let (alice, bob) = connected_pair();

        let mut bad = alice.seal(b"one").unwrap();
        bad.signature[0] ^= 0x80;
        let err = bob.open(&bad).unwrap_err();
        assert!(err.is_integrity());
        assert!(matches!(err, CoreError::Integrity(IntegrityError::Signature)));

        let good = alice.seal(b"two").unwrap();
        assert_eq!(bob.open(&good).unwrap().as_slice(), b"two");
    }

    #[test]
    fn own_messages_do_not_verify_as_peer_messages() {
        let (alice, _bob) = connected_pair();
        let env = alice.seal(b"echo").unwrap();
        // Alice expects Bob's signing key, not her own.
        assert!(alice.open(&env).unwrap_err().is_integrity());
    }

    #[test]
    fn reconnect_replaces_peer() {
        let (mut alice, bob) = connected_pair();
        let carol = session("carol");
        let before = *alice.shared_secret().unwrap().as_bytes();

        alice.connect(carol.public_identity()).unwrap();
        assert_eq!(alice.peer().unwrap().alias, "carol");
        assert_ne!(alice.shared_secret().unwrap().as_bytes(), &before);

        let env = bob.seal(b"stale").unwrap();
        assert!(alice.open(&env).is_err());
    }

    #[test]
    fn disconnect_drops_secret() {
        let (mut alice, _bob) = connected_pair();
        alice.disconnect();
        assert!(alice.peer().is_none());
        assert!(matches!(
            alice.shared_secret(),
            Err(CoreError::NotInitialized(_))
        ));
    }

    #[test]
    fn oversize_message_is_refused_not_corruption() {
        let (alice, bob) = connected_pair();
        let big = vec![0u8; messenger::MAX_PLAINTEXT_LEN + 1];
        let err = alice.seal(&big).unwrap_err();
        assert!(matches!(err, CoreError::TooLarge { .. }));
        assert!(!err.is_corruption());

        let env = alice.seal(b"small").unwrap();
        assert_eq!(bob.open(&env).unwrap().as_slice(), b"small");
    }
}
