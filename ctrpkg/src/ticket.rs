use std::io::{self, Write};

use byteorder::{BigEndian, WriteBytesExt};
use derivative::Derivative;
use static_assertions::const_assert_eq;
use tracing::trace;

use crate::cert::CertificatePair;
use crate::cursor::Cursor;
use crate::signature::Signature;
use crate::string::SizedCString;
use crate::titleid::TitleId;
use crate::{CtrError, CtrResult};

/// Fixed part of the signed data, issuer through the limits
const FIXED_BODY_SIZE: usize = 0x40 + 0x3c + 3 + 0x10 + 1 + 8 + 4 + 8 + 2 + 2 + 8 + 1 + 1
    + 0x2a + 4 + 1 + 1 + 0x42 + 0x40;
const_assert_eq!(FIXED_BODY_SIZE, 0x164);

/// The content index starts with an unknown word and its own total length
const CONTENT_INDEX_PREFIX: usize = 8;

/// A license for one title
///
/// The title key is kept exactly as stored, encrypted with a common key.
#[derive(Derivative, Clone, PartialEq, Eq)]
#[derivative(Debug)]
pub struct Ticket {
    pub signature: Signature,
    pub issuer: SizedCString<0x40>,
    #[derivative(Debug(format_with = "crate::fmt_hex"))]
    pub ecc_public_key: [u8; 0x3c],
    pub version: u8,
    pub ca_crl_version: u8,
    pub signer_crl_version: u8,
    #[derivative(Debug(format_with = "crate::fmt_hex"))]
    pub title_key: [u8; 0x10],
    #[derivative(Debug = "ignore")]
    pub reserved0: u8,
    pub ticket_id: u64,
    pub console_id: u32,
    pub title_id: TitleId,
    #[derivative(Debug = "ignore")]
    pub reserved1: [u8; 2],
    pub title_version: u16,
    #[derivative(Debug = "ignore")]
    pub reserved2: [u8; 8],
    pub license_type: u8,
    pub common_key_index: u8,
    #[derivative(Debug = "ignore")]
    pub reserved3: [u8; 0x2a],
    pub eshop_account_id: u32,
    #[derivative(Debug = "ignore")]
    pub reserved4: u8,
    pub audit: u8,
    #[derivative(Debug = "ignore")]
    pub reserved5: [u8; 0x42],
    #[derivative(Debug = "ignore")]
    pub limits: [u8; 0x40],
    /// Raw content index, including its 8 byte prefix
    #[derivative(Debug(format_with = "crate::fmt_hex"))]
    pub content_index: Vec<u8>,
    /// Present in tickets downloaded from the CDN, absent inside CIAs
    pub certificates: Option<CertificatePair>,
}

impl Ticket {
    /// Parses a ticket, and the certificates after it if the cursor isn't exhausted
    ///
    /// The cursor should end where the ticket ends, see [`Cursor::take`].
    pub fn parse(cur: &mut Cursor) -> CtrResult<Self> {
        let signature = Signature::read(cur)?;
        let issuer = SizedCString::read(cur)?;
        let ecc_public_key = cur.read_array()?;
        let version = cur.read_u8()?;
        let ca_crl_version = cur.read_u8()?;
        let signer_crl_version = cur.read_u8()?;
        let title_key = cur.read_array()?;
        let reserved0 = cur.read_u8()?;
        let ticket_id = cur.read_u64::<BigEndian>()?;
        let console_id = cur.read_u32::<BigEndian>()?;
        let title_id = TitleId::from_u64(cur.read_u64::<BigEndian>()?);
        let reserved1 = cur.read_array()?;
        let title_version = cur.read_u16::<BigEndian>()?;
        let reserved2 = cur.read_array()?;
        let license_type = cur.read_u8()?;
        let common_key_index = cur.read_u8()?;
        let reserved3 = cur.read_array()?;
        let eshop_account_id = cur.read_u32::<BigEndian>()?;
        let reserved4 = cur.read_u8()?;
        let audit = cur.read_u8()?;
        let reserved5 = cur.read_array()?;
        let limits = cur.read_array()?;

        // the length sits after an unknown word and counts both of them
        let index_start = cur.position();
        cur.skip(4)?;
        let index_len = cur.read_u32::<BigEndian>()?;
        if (index_len as usize) < CONTENT_INDEX_PREFIX {
            return Err(CtrError::InvalidContentIndexLength(index_len));
        }
        cur.seek(index_start)?;
        let content_index = cur.read_bytes(index_len as usize)?.to_vec();

        let certificates = CertificatePair::parse_trailing(cur)?;
        trace!(
            %title_id,
            %issuer,
            content_index_len = index_len,
            with_certificates = certificates.is_some(),
            "parsed ticket"
        );

        Ok(Self {
            signature,
            issuer,
            ecc_public_key,
            version,
            ca_crl_version,
            signer_crl_version,
            title_key,
            reserved0,
            ticket_id,
            console_id,
            title_id,
            reserved1,
            title_version,
            reserved2,
            license_type,
            common_key_index,
            reserved3,
            eshop_account_id,
            reserved4,
            audit,
            reserved5,
            limits,
            content_index,
            certificates,
        })
    }
    pub fn from_bytes(bytes: &[u8]) -> CtrResult<Self> {
        Self::parse(&mut Cursor::new(bytes))
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.signature.header_size()
            + FIXED_BODY_SIZE
            + self.content_index.len()
            + self.certificates.as_ref().map_or(0, CertificatePair::size)
    }
    /// Bytes covered by the signature: issuer through the content index
    pub fn signature_body(&self) -> CtrResult<Vec<u8>> {
        let mut out = Vec::with_capacity(FIXED_BODY_SIZE + self.content_index.len());
        self.write_body(&mut out)?;
        Ok(out)
    }
    fn write_body<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.issuer.write(w)?;
        w.write_all(&self.ecc_public_key)?;
        w.write_u8(self.version)?;
        w.write_u8(self.ca_crl_version)?;
        w.write_u8(self.signer_crl_version)?;
        w.write_all(&self.title_key)?;
        w.write_u8(self.reserved0)?;
        w.write_u64::<BigEndian>(self.ticket_id)?;
        w.write_u32::<BigEndian>(self.console_id)?;
        w.write_u64::<BigEndian>(self.title_id.to_u64())?;
        w.write_all(&self.reserved1)?;
        w.write_u16::<BigEndian>(self.title_version)?;
        w.write_all(&self.reserved2)?;
        w.write_u8(self.license_type)?;
        w.write_u8(self.common_key_index)?;
        w.write_all(&self.reserved3)?;
        w.write_u32::<BigEndian>(self.eshop_account_id)?;
        w.write_u8(self.reserved4)?;
        w.write_u8(self.audit)?;
        w.write_all(&self.reserved5)?;
        w.write_all(&self.limits)?;
        w.write_all(&self.content_index)
    }
    pub(crate) fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.signature.write(w)?;
        self.write_body(w)?;
        if let Some(certs) = &self.certificates {
            certs.write(w)?;
        }
        Ok(())
    }
    pub fn encode(&self) -> CtrResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.size());
        self.write(&mut out)?;
        Ok(out)
    }
    /// Title key as stored, still encrypted
    #[must_use]
    pub fn title_key_raw(&self) -> &[u8; 0x10] {
        &self.title_key
    }
}
