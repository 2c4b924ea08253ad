//! Signature header shared by certificates, tickets and TMDs.
//!
//! Every signed structure starts with `[type: u32 BE][signature][padding]`, where both lengths
//! depend only on the type.

use std::fmt;
use std::io::{self, Write};

use byteorder::{BigEndian, WriteBytesExt};

use crate::cursor::Cursor;
use crate::{CtrError, CtrResult};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum SignatureVariant {
    Rsa4096Sha1 = 0x0001_0000,
    Rsa2048Sha1 = 0x0001_0001,
    EllipticCurveSha1 = 0x0001_0002,
    Rsa4096Sha256 = 0x0001_0003,
    Rsa2048Sha256 = 0x0001_0004,
    EcdsaSha256 = 0x0001_0005,
}

/// Byte lengths of a signature and the padding after it
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SignatureSize {
    pub signature: usize,
    pub padding: usize,
}

impl SignatureSize {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.signature + self.padding
    }
}

/// Looks up the sizes for a raw signature type code
pub fn size_of(code: u32) -> CtrResult<SignatureSize> {
    Ok(SignatureVariant::from_code(code)?.size())
}

impl SignatureVariant {
    pub fn from_code(code: u32) -> CtrResult<Self> {
        Ok(match code {
            0x0001_0000 => Self::Rsa4096Sha1,
            0x0001_0001 => Self::Rsa2048Sha1,
            0x0001_0002 => Self::EllipticCurveSha1,
            0x0001_0003 => Self::Rsa4096Sha256,
            0x0001_0004 => Self::Rsa2048Sha256,
            0x0001_0005 => Self::EcdsaSha256,
            other => return Err(CtrError::UnknownSignatureVariant(other)),
        })
    }
    #[must_use]
    pub const fn code(self) -> u32 {
        self as u32
    }
    #[must_use]
    pub const fn size(self) -> SignatureSize {
        let (signature, padding) = match self {
            Self::Rsa4096Sha1 | Self::Rsa4096Sha256 => (0x200, 0x3c),
            Self::Rsa2048Sha1 | Self::Rsa2048Sha256 => (0x100, 0x3c),
            Self::EllipticCurveSha1 | Self::EcdsaSha256 => (0x3c, 0x40),
        };
        SignatureSize { signature, padding }
    }
    /// Size of the whole header, type code included
    #[must_use]
    pub const fn header_size(self) -> usize {
        4 + self.size().total()
    }
}

/// Signature bytes tagged with their type
///
/// The length of `data` always matches [`SignatureVariant::size`].
#[derive(Clone, PartialEq, Eq)]
pub struct Signature {
    variant: SignatureVariant,
    data: Vec<u8>,
}

impl Signature {
    pub fn new(variant: SignatureVariant, data: Vec<u8>) -> CtrResult<Self> {
        let expected = variant.size().signature;
        if data.len() != expected {
            return Err(CtrError::InvalidLength {
                what: "signature",
                actual: data.len(),
                expected,
            });
        }
        Ok(Self { variant, data })
    }
    /// An all-zero signature, for structures that are about to be signed
    #[must_use]
    pub fn zeroed(variant: SignatureVariant) -> Self {
        Self {
            variant,
            data: vec![0u8; variant.size().signature],
        }
    }
    #[must_use]
    pub fn variant(&self) -> SignatureVariant {
        self.variant
    }
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
    #[must_use]
    pub fn header_size(&self) -> usize {
        self.variant.header_size()
    }

    /// Reads the type code, the signature and skips the padding
    pub fn read(cur: &mut Cursor) -> CtrResult<Self> {
        let variant = SignatureVariant::from_code(cur.read_u32::<BigEndian>()?)?;
        let size = variant.size();
        let data = cur.read_bytes(size.signature)?.to_vec();
        cur.skip(size.padding)?;
        Ok(Self { variant, data })
    }
    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<BigEndian>(self.variant.code())?;
        w.write_all(&self.data)?;
        w.write_all(&vec![0u8; self.variant.size().padding])
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Signature")
            .field("variant", &self.variant)
            .field("data", &hex::encode(&self.data))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_known_sizes() {
        let table = [
            (0x0001_0000, 0x200, 0x3c),
            (0x0001_0001, 0x100, 0x3c),
            (0x0001_0002, 0x3c, 0x40),
            (0x0001_0003, 0x200, 0x3c),
            (0x0001_0004, 0x100, 0x3c),
            (0x0001_0005, 0x3c, 0x40),
        ];
        for (code, signature, padding) in table {
            let size = size_of(code).unwrap();
            assert_eq!(size, SignatureSize { signature, padding });
            assert_eq!(size.total(), signature + padding);
            assert_eq!(SignatureVariant::from_code(code).unwrap().code(), code);
        }
    }

    #[test]
    fn unknown_codes_are_rejected() {
        for code in [0, 0x0001_0006, 0x0300_0100, u32::MAX] {
            assert!(matches!(
                size_of(code),
                Err(CtrError::UnknownSignatureVariant(c)) if c == code
            ));
        }
    }

    #[test]
    fn padding_is_skipped_and_zeroed() {
        let mut raw = vec![0x00, 0x01, 0x00, 0x05];
        raw.extend_from_slice(&[0xaa; 0x3c]);
        raw.extend_from_slice(&[0xff; 0x40]);
        raw.push(0x42);

        let mut cur = Cursor::new(&raw);
        let sig = Signature::read(&mut cur).unwrap();
        assert_eq!(sig.variant(), SignatureVariant::EcdsaSha256);
        assert_eq!(sig.data(), &[0xaa; 0x3c]);
        assert_eq!(cur.read_u8().unwrap(), 0x42);

        let mut out: Vec<u8> = Vec::new();
        sig.write(&mut out).unwrap();
        assert_eq!(out[..4], [0x00u8, 0x01, 0x00, 0x05]);
        assert_eq!(out.len(), sig.header_size());
        assert_eq!(out[4 + 0x3c..], [0u8; 0x40]);
    }

    #[test]
    fn new_checks_length() {
        assert!(Signature::new(SignatureVariant::Rsa2048Sha256, vec![0; 0x100]).is_ok());
        assert!(matches!(
            Signature::new(SignatureVariant::Rsa2048Sha256, vec![0; 0x200]),
            Err(CtrError::InvalidLength { actual: 0x200, expected: 0x100, .. })
        ));
    }
}
