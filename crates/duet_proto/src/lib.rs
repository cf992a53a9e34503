//! duet_proto - Wire records, envelopes and the secure messenger
//!
//! Every persisted or transmitted record has a fixed field layout behind a
//! magic + version header (see `codec`), with a base64 text form for
//! text-oriented stores.
//!
//! # Modules
//! - `codec`     - versioned framing, base64 helpers
//! - `record`    - wrapped private keys and KDF (salt) records
//! - `envelope`  - encrypted message envelope (what the transport sees)
//! - `identity`  - public identity bundle exchanged with the peer
//! - `messenger` - encrypt-then-sign / verify-then-decrypt

pub mod codec;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod messenger;
pub mod record;

pub use codec::WireRecord;
pub use envelope::MessageEnvelope;
pub use error::{IntegrityError, ProtoError};
pub use identity::PublicIdentity;
pub use record::{KeyRole, WrappedKeyRecord};
