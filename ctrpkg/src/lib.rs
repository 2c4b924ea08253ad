//! Decoding and re-encoding of 3DS title packages (CIA) and the structures of their trust chain:
//! certificates, tickets and title metadata.
//!
//! Content is kept exactly as stored; nothing is ever decrypted. Signature checks return plain
//! booleans and leave trust decisions to the caller.

pub mod cert;
pub mod crypto;
pub mod cursor;
pub mod error;
pub mod signature;
pub mod string;
pub mod ticket;
pub mod titleid;
pub mod tmd;

#[cfg(feature = "cia")]
pub mod cia;
#[cfg(feature = "cia")]
pub mod smdh;

#[cfg(test)]
pub(crate) mod test_utils;

use std::fmt;

pub use error::{CtrError, CtrResult};

pub mod prelude {
    pub use crate::cert::{Certificate, CertificatePair, KeyVariant, PublicKeyData};
    pub use crate::crypto::PublicKey;
    pub use crate::cursor::Cursor;
    pub use crate::signature::{Signature, SignatureVariant};
    pub use crate::ticket::Ticket;
    pub use crate::titleid::TitleId;
    pub use crate::tmd::{ContentChunkRecord, ContentType, Tmd, TmdVersion};
    pub use crate::{CtrError, CtrResult};

    #[cfg(feature = "cia")]
    pub use crate::cia::{Cia, ChainVerification, ContentIndexBitmap};
    #[cfg(feature = "cia")]
    pub use crate::smdh::Smdh;
}

pub(crate) fn fmt_hex<T: AsRef<[u8]>>(data: &T, f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str(&hex::encode(data))
}
