//! Certificates of the title trust chain.
//!
//! ```text
//! [signature header]      type, signature, padding
//! [0x40] issuer           "Root-CA00000003"
//! [0x04] key type         u32 BE
//! [0x40] name             "XS0000000c"
//! [0x04] expiration       u32 BE
//! [....] public key       size depends on the key type
//! ```

use std::fmt;
use std::io::{self, Write};

use byteorder::{BigEndian, WriteBytesExt};
use rsa::{BigUint, RsaPublicKey};
use tracing::trace;

use crate::crypto::{EcPublicKey, PublicKey};
use crate::cursor::Cursor;
use crate::signature::Signature;
use crate::string::SizedCString;
use crate::ticket::Ticket;
use crate::tmd::Tmd;
use crate::{CtrError, CtrResult};

const RSA_TRAILER_SIZE: usize = 0x34;
const ECC_COORDINATES_SIZE: usize = 0x3c;
/// issuer, key type, name and expiration
const FIXED_BODY_SIZE: usize = 0x40 + 4 + 0x40 + 4;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum KeyVariant {
    Rsa4096 = 0,
    Rsa2048 = 1,
    Ecdsa233r1 = 2,
}

impl KeyVariant {
    pub fn from_code(code: u32) -> CtrResult<Self> {
        match code {
            0 => Ok(Self::Rsa4096),
            1 => Ok(Self::Rsa2048),
            2 => Ok(Self::Ecdsa233r1),
            other => Err(CtrError::UnknownKeyVariant(other)),
        }
    }
    #[must_use]
    pub const fn code(self) -> u32 {
        self as u32
    }
    /// Size of the public key payload
    #[must_use]
    pub const fn key_size(self) -> usize {
        match self {
            Self::Rsa4096 => 0x200 + 4 + RSA_TRAILER_SIZE,
            Self::Rsa2048 => 0x100 + 4 + RSA_TRAILER_SIZE,
            Self::Ecdsa233r1 => ECC_COORDINATES_SIZE * 2,
        }
    }
}

/// RSA modulus of `N` bytes and its exponent
#[derive(Clone, PartialEq, Eq)]
pub struct RsaKeyData<const N: usize> {
    pub modulus: [u8; N],
    pub exponent: u32,
    /// Unused bytes after the exponent
    pub trailer: [u8; RSA_TRAILER_SIZE],
}

impl<const N: usize> RsaKeyData<N> {
    #[must_use]
    pub fn new(modulus: [u8; N], exponent: u32) -> Self {
        Self {
            modulus,
            exponent,
            trailer: [0u8; RSA_TRAILER_SIZE],
        }
    }
    fn read(cur: &mut Cursor) -> CtrResult<Self> {
        Ok(Self {
            modulus: cur.read_array()?,
            exponent: cur.read_u32::<BigEndian>()?,
            trailer: cur.read_array()?,
        })
    }
    fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.modulus)?;
        w.write_u32::<BigEndian>(self.exponent)?;
        w.write_all(&self.trailer)
    }
    fn export(&self) -> Option<RsaPublicKey> {
        RsaPublicKey::new(
            BigUint::from_bytes_be(&self.modulus),
            BigUint::from(self.exponent),
        )
        .ok()
    }
}

impl<const N: usize> fmt::Debug for RsaKeyData<N> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RsaKeyData")
            .field("modulus", &hex::encode(self.modulus))
            .field("exponent", &format_args!("{:#x}", self.exponent))
            .finish_non_exhaustive()
    }
}

/// sect233r1 point as big-endian `x || y`
#[derive(Clone, PartialEq, Eq)]
pub struct EccKeyData {
    pub coordinates: [u8; ECC_COORDINATES_SIZE],
    /// Unused bytes after the point
    pub trailer: [u8; ECC_COORDINATES_SIZE],
}

impl EccKeyData {
    #[must_use]
    pub fn new(coordinates: [u8; ECC_COORDINATES_SIZE]) -> Self {
        Self {
            coordinates,
            trailer: [0u8; ECC_COORDINATES_SIZE],
        }
    }
}

impl fmt::Debug for EccKeyData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("EccKeyData")
            .field("coordinates", &hex::encode(self.coordinates))
            .finish_non_exhaustive()
    }
}

/// Public key payload of a certificate; the variant fixes its size
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublicKeyData {
    Rsa4096(RsaKeyData<0x200>),
    Rsa2048(RsaKeyData<0x100>),
    Ecdsa233r1(EccKeyData),
}

impl PublicKeyData {
    #[must_use]
    pub fn variant(&self) -> KeyVariant {
        match self {
            Self::Rsa4096(_) => KeyVariant::Rsa4096,
            Self::Rsa2048(_) => KeyVariant::Rsa2048,
            Self::Ecdsa233r1(_) => KeyVariant::Ecdsa233r1,
        }
    }
    #[must_use]
    pub fn size(&self) -> usize {
        self.variant().key_size()
    }
    fn read(cur: &mut Cursor, variant: KeyVariant) -> CtrResult<Self> {
        Ok(match variant {
            KeyVariant::Rsa4096 => Self::Rsa4096(RsaKeyData::read(cur)?),
            KeyVariant::Rsa2048 => Self::Rsa2048(RsaKeyData::read(cur)?),
            KeyVariant::Ecdsa233r1 => Self::Ecdsa233r1(EccKeyData {
                coordinates: cur.read_array()?,
                trailer: cur.read_array()?,
            }),
        })
    }
    fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        match self {
            Self::Rsa4096(key) => key.write(w),
            Self::Rsa2048(key) => key.write(w),
            Self::Ecdsa233r1(key) => {
                w.write_all(&key.coordinates)?;
                w.write_all(&key.trailer)
            }
        }
    }
    /// Converts the payload into a key usable for verification
    pub fn export(&self) -> CtrResult<PublicKey> {
        let exported = match self {
            Self::Rsa4096(key) => key.export().map(PublicKey::Rsa),
            Self::Rsa2048(key) => key.export().map(PublicKey::Rsa),
            Self::Ecdsa233r1(key) => {
                EcPublicKey::from_coordinates(&key.coordinates).map(PublicKey::Ecdsa233r1)
            }
        };
        exported.ok_or(CtrError::UnsupportedCertificateExport(self.variant()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Certificate {
    pub signature: Signature,
    pub issuer: SizedCString<0x40>,
    pub name: SizedCString<0x40>,
    pub expiration: u32,
    pub public_key: PublicKeyData,
}

impl Certificate {
    /// Parses a certificate at the cursor, leaving it right after the public key
    pub fn parse(cur: &mut Cursor) -> CtrResult<Self> {
        let start = cur.position();
        let signature = Signature::read(cur)?;
        let issuer = SizedCString::read(cur)?;
        let key_variant = KeyVariant::from_code(cur.read_u32::<BigEndian>()?)?;
        let name = SizedCString::read(cur)?;
        let expiration = cur.read_u32::<BigEndian>()?;
        let public_key = PublicKeyData::read(cur, key_variant)?;

        trace!(
            offset = start,
            issuer = %issuer,
            name = %name,
            signature = ?signature.variant(),
            key = ?key_variant,
            "parsed certificate"
        );
        Ok(Self {
            signature,
            issuer,
            name,
            expiration,
            public_key,
        })
    }
    pub fn from_bytes(bytes: &[u8]) -> CtrResult<Self> {
        Self::parse(&mut Cursor::new(bytes))
    }

    #[must_use]
    pub fn key_variant(&self) -> KeyVariant {
        self.public_key.variant()
    }
    #[must_use]
    pub fn size(&self) -> usize {
        self.signature.header_size() + FIXED_BODY_SIZE + self.public_key.size()
    }
    /// Bytes covered by the signature: issuer through the public key
    pub fn signature_body(&self) -> CtrResult<Vec<u8>> {
        let mut out = Vec::with_capacity(FIXED_BODY_SIZE + self.public_key.size());
        self.write_body(&mut out)?;
        Ok(out)
    }
    fn write_body<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.issuer.write(w)?;
        w.write_u32::<BigEndian>(self.key_variant().code())?;
        self.name.write(w)?;
        w.write_u32::<BigEndian>(self.expiration)?;
        self.public_key.write(w)
    }
    pub(crate) fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.signature.write(w)?;
        self.write_body(w)
    }
    pub fn encode(&self) -> CtrResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.size());
        self.write(&mut out)?;
        Ok(out)
    }

    pub fn export_public_key(&self) -> CtrResult<PublicKey> {
        self.public_key.export()
    }
    /// Checks `signature` over `signed` with this certificate's key
    ///
    /// Returns false for any mismatch, including keys that can't be exported.
    #[must_use]
    pub fn verify(&self, signature: &[u8], signed: &[u8]) -> bool {
        match self.export_public_key() {
            Ok(key) => key.verify(signature, signed),
            Err(_) => false,
        }
    }
    fn verify_body(&self, signature: &Signature, body: CtrResult<Vec<u8>>) -> bool {
        match body {
            Ok(body) => self.verify(signature.data(), &body),
            Err(_) => false,
        }
    }
    #[must_use]
    pub fn verify_certificate(&self, child: &Certificate) -> bool {
        self.verify_body(&child.signature, child.signature_body())
    }
    #[must_use]
    pub fn verify_ticket(&self, ticket: &Ticket) -> bool {
        self.verify_body(&ticket.signature, ticket.signature_body())
    }
    /// Also false when the TMD can't be encoded
    #[must_use]
    pub fn verify_tmd(&self, tmd: &Tmd) -> bool {
        self.verify_body(&tmd.signature, tmd.signature_body())
    }

    /// `issuer-name`, which is what structures signed by this certificate name as their issuer
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}-{}", self.issuer, self.name)
    }
    #[must_use]
    pub fn is_issuer_of(&self, issuer: &SizedCString<0x40>) -> bool {
        issuer.to_string_lossy() == self.full_name()
    }
}

/// Certificates appended to tickets and TMDs downloaded from the CDN
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertificatePair {
    /// Certificate that signed the containing structure
    pub signer: Certificate,
    pub ca: Certificate,
}

impl CertificatePair {
    /// Parses the pair only if the cursor still has bytes left
    pub(crate) fn parse_trailing(cur: &mut Cursor) -> CtrResult<Option<Self>> {
        if !cur.has_remaining() {
            return Ok(None);
        }
        let signer = Certificate::parse(cur)?;
        let ca = Certificate::parse(cur)?;
        Ok(Some(Self { signer, ca }))
    }
    #[must_use]
    pub fn size(&self) -> usize {
        self.signer.size() + self.ca.size()
    }
    pub(crate) fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.signer.write(w)?;
        self.ca.write(w)
    }
}
