//! Public keys carried by certificates, and the signature checks done with them.

pub(crate) mod sect233r1;

use std::fmt;

use hex_literal::hex;
use rsa::pkcs1v15;
use rsa::pkcs8::EncodePublicKey;
use rsa::signature::Verifier;
use rsa::RsaPublicKey;
use sha2::{Digest, Sha256};

use crate::cert::KeyVariant;
use crate::{CtrError, CtrResult};
use sect233r1::{Point, ELEMENT_SIZE};

/// SubjectPublicKeyInfo prefix for an uncompressed sect233r1 point
/// (id-ecPublicKey, secp233r1 OID 1.3.132.0.27, 62-byte bit string)
const SECT233R1_SPKI_HEADER: [u8; 23] = hex!("3052301006072A8648CE3D020106052B8104001B033E00");

/// Computes sha256 hash of a given byte slice
pub fn sha256(data: &[u8]) -> [u8; 0x20] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// A certificate's key in a form usable outside the certificate format
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    Ecdsa233r1(EcPublicKey),
}

impl PublicKey {
    #[must_use]
    pub fn key_variant(&self) -> KeyVariant {
        match self {
            // size() is the modulus length in bytes
            Self::Rsa(key) if rsa::traits::PublicKeyParts::size(key) > 0x100 => KeyVariant::Rsa4096,
            Self::Rsa(_) => KeyVariant::Rsa2048,
            Self::Ecdsa233r1(_) => KeyVariant::Ecdsa233r1,
        }
    }
    /// DER encoded SubjectPublicKeyInfo
    pub fn to_public_key_der(&self) -> CtrResult<Vec<u8>> {
        match self {
            Self::Rsa(key) => key
                .to_public_key_der()
                .map(|doc| doc.as_bytes().to_vec())
                .map_err(|_| CtrError::UnsupportedCertificateExport(self.key_variant())),
            Self::Ecdsa233r1(key) => Ok(key.to_public_key_der()),
        }
    }
    /// Checks a SHA-256 signature over `signed`
    ///
    /// RSA keys expect PKCS#1 v1.5, EC keys expect raw `r || s`. Any malformed signature simply
    /// fails to verify.
    #[must_use]
    pub fn verify(&self, signature: &[u8], signed: &[u8]) -> bool {
        match self {
            Self::Rsa(key) => {
                let Ok(signature) = pkcs1v15::Signature::try_from(signature) else {
                    return false;
                };
                pkcs1v15::VerifyingKey::<Sha256>::new(key.clone())
                    .verify(signed, &signature)
                    .is_ok()
            }
            Self::Ecdsa233r1(key) => sect233r1::verify(&key.point, &sha256(signed), signature),
        }
    }
}

/// A point on sect233r1
#[derive(Clone, PartialEq, Eq)]
pub struct EcPublicKey {
    coordinates: [u8; ELEMENT_SIZE * 2],
    point: Point,
}

impl EcPublicKey {
    /// Builds a key from big-endian `x || y`, or None if the point isn't on the curve
    #[must_use]
    pub fn from_coordinates(coordinates: &[u8; ELEMENT_SIZE * 2]) -> Option<Self> {
        Point::from_coordinates(coordinates).map(|point| Self {
            coordinates: *coordinates,
            point,
        })
    }
    /// SEC1 uncompressed encoding, `04 || x || y`
    #[must_use]
    pub fn uncompressed_point(&self) -> [u8; ELEMENT_SIZE * 2 + 1] {
        let mut out = [0u8; ELEMENT_SIZE * 2 + 1];
        out[0] = 0x04;
        out[1..].copy_from_slice(&self.coordinates);
        out
    }
    #[must_use]
    pub fn to_public_key_der(&self) -> Vec<u8> {
        let mut out = SECT233R1_SPKI_HEADER.to_vec();
        out.extend_from_slice(&self.uncompressed_point());
        out
    }
}

impl fmt::Debug for EcPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("EcPublicKey")
            .field(&hex::encode(self.uncompressed_point()))
            .finish()
    }
}
