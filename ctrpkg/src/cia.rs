//! CIA title packages.
//!
//! Sections follow each other in this order, each padded to 64 bytes:
//!
//! ```text
//! header          0x2020 bytes, little-endian, ends with the content index bitmap
//! certificates    CA, ticket signer, TMD signer
//! ticket
//! tmd
//! contents        raw, still encrypted, one per TMD record in TMD order
//! meta            optional, dependencies and the SMDH icon
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};
use derivative::Derivative;
use static_assertions::const_assert_eq;
use tracing::{debug, trace, warn};

use crate::cert::Certificate;
use crate::crypto::sha256;
use crate::cursor::{align, pad_to, Cursor};
use crate::smdh::{Smdh, SMDH_SIZE};
use crate::ticket::Ticket;
use crate::titleid::TitleId;
use crate::tmd::{ContentChunkRecord, ContentType, Tmd};
use crate::{CtrError, CtrResult};

pub const CIA_HEADER_SIZE: u32 = 0x2020;
pub const CONTENT_INDEX_SIZE: usize = 0x2000;
pub const META_SIZE: usize = 0x3ac0;
const ALIGNMENT: usize = 0x40;
const DEPENDENCY_COUNT: usize = 0x30;

const_assert_eq!(
    4 + 2 + 2 + 4 * 4 + 8 + CONTENT_INDEX_SIZE,
    CIA_HEADER_SIZE as usize
);
const_assert_eq!(
    DEPENDENCY_COUNT * 8 + 0x180 + 4 + 0xfc + SMDH_SIZE,
    META_SIZE
);

/// Which content indexes are present in the package
///
/// Within each byte the most significant bit is the lowest index, so byte 0 bit 7 is index 0
/// and byte 0 bit 0 is index 7.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentIndexBitmap(Box<[u8; CONTENT_INDEX_SIZE]>);

impl ContentIndexBitmap {
    #[must_use]
    pub fn from_raw(raw: [u8; CONTENT_INDEX_SIZE]) -> Self {
        Self(Box::new(raw))
    }
    pub fn from_indices(indices: impl IntoIterator<Item = u16>) -> Self {
        let mut bitmap = Self::default();
        for index in indices {
            bitmap.set(index, true);
        }
        bitmap
    }
    #[must_use]
    pub fn raw(&self) -> &[u8; CONTENT_INDEX_SIZE] {
        &self.0
    }

    fn locate(index: u16) -> (usize, u8) {
        let index = index as usize;
        (index / 8, 1 << (7 - index % 8))
    }
    #[must_use]
    pub fn is_active(&self, index: u16) -> bool {
        let (byte, mask) = Self::locate(index);
        self.0[byte] & mask != 0
    }
    pub fn set(&mut self, index: u16, active: bool) {
        let (byte, mask) = Self::locate(index);
        if active {
            self.0[byte] |= mask;
        } else {
            self.0[byte] &= !mask;
        }
    }
    #[must_use]
    pub fn active_indices(&self) -> BTreeSet<u16> {
        let mut out = BTreeSet::new();
        for (i, byte) in self.0.iter().enumerate() {
            for v in 0..8 {
                if byte >> v & 1 != 0 {
                    out.insert((i * 8 + (7 - v)) as u16);
                }
            }
        }
        out
    }
}

impl Default for ContentIndexBitmap {
    fn default() -> Self {
        Self(Box::new([0u8; CONTENT_INDEX_SIZE]))
    }
}

impl fmt::Debug for ContentIndexBitmap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_set().entries(self.active_indices()).finish()
    }
}

/// The header as declared in the file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiaHeader {
    pub cia_type: u16,
    pub version: u16,
    pub cert_size: u32,
    pub ticket_size: u32,
    pub tmd_size: u32,
    pub meta_size: u32,
    pub content_size: u64,
    pub content_index: ContentIndexBitmap,
}

impl CiaHeader {
    pub fn parse(cur: &mut Cursor) -> CtrResult<Self> {
        let hdr_size = cur.read_u32::<LittleEndian>()?;
        if hdr_size != CIA_HEADER_SIZE {
            return Err(CtrError::MalformedHeader {
                expected: CIA_HEADER_SIZE,
                actual: hdr_size,
            });
        }
        Ok(Self {
            cia_type: cur.read_u16::<LittleEndian>()?,
            version: cur.read_u16::<LittleEndian>()?,
            cert_size: cur.read_u32::<LittleEndian>()?,
            ticket_size: cur.read_u32::<LittleEndian>()?,
            tmd_size: cur.read_u32::<LittleEndian>()?,
            meta_size: cur.read_u32::<LittleEndian>()?,
            content_size: cur.read_u64::<LittleEndian>()?,
            content_index: ContentIndexBitmap::from_raw(cur.read_array()?),
        })
    }
    fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(CIA_HEADER_SIZE)?;
        w.write_u16::<LittleEndian>(self.cia_type)?;
        w.write_u16::<LittleEndian>(self.version)?;
        w.write_u32::<LittleEndian>(self.cert_size)?;
        w.write_u32::<LittleEndian>(self.ticket_size)?;
        w.write_u32::<LittleEndian>(self.tmd_size)?;
        w.write_u32::<LittleEndian>(self.meta_size)?;
        w.write_u64::<LittleEndian>(self.content_size)?;
        w.write_all(self.content_index.raw())
    }
}

/// Content as stored in the package, encrypted unless its type says otherwise
#[derive(Derivative, Clone, PartialEq, Eq)]
#[derivative(Debug)]
pub struct Content {
    pub id: u32,
    pub index: u16,
    pub content_type: ContentType,
    #[derivative(Debug(format_with = "fmt_len"))]
    pub data: Vec<u8>,
}

fn fmt_len<T: AsRef<[u8]>>(data: &T, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "<{:#x} bytes>", data.as_ref().len())
}

impl Content {
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.content_type.contains(ContentType::ENCRYPTED)
    }
    /// Compares the stored data against the record hash
    ///
    /// None for encrypted content, which can't be checked without decrypting it.
    #[must_use]
    pub fn hash_ok(&self, record: &ContentChunkRecord) -> Option<bool> {
        if self.is_encrypted() {
            return None;
        }
        Some(record.size == self.data.len() as u64 && sha256(&self.data) == record.hash)
    }
}

#[derive(Derivative, Clone, PartialEq)]
#[derivative(Debug)]
pub struct MetaRegion {
    pub dependencies: [TitleId; DEPENDENCY_COUNT],
    #[derivative(Debug = "ignore")]
    pub reserved0: [u8; 0x180],
    pub core_version: u32,
    #[derivative(Debug = "ignore")]
    pub reserved1: [u8; 0xfc],
    pub icon: Smdh,
}

impl MetaRegion {
    pub fn parse(cur: &mut Cursor) -> CtrResult<Self> {
        let mut dependencies = [TitleId::default(); DEPENDENCY_COUNT];
        for dependency in &mut dependencies {
            *dependency = TitleId::from_u64(cur.read_u64::<LittleEndian>()?);
        }
        Ok(Self {
            dependencies,
            reserved0: cur.read_array()?,
            core_version: cur.read_u32::<LittleEndian>()?,
            reserved1: cur.read_array()?,
            icon: Smdh::parse(cur)?,
        })
    }
    fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for dependency in &self.dependencies {
            w.write_u64::<LittleEndian>(dependency.to_u64())?;
        }
        w.write_all(&self.reserved0)?;
        w.write_u32::<LittleEndian>(self.core_version)?;
        w.write_all(&self.reserved1)?;
        self.icon.write(w)
    }
    /// Dependencies, skipping empty slots
    pub fn dependencies_iter(&self) -> impl Iterator<Item = TitleId> + '_ {
        self.dependencies.iter().copied().filter(|id| !id.is_null())
    }
}

impl Default for MetaRegion {
    fn default() -> Self {
        Self {
            dependencies: [TitleId::default(); DEPENDENCY_COUNT],
            reserved0: [0u8; 0x180],
            core_version: 0,
            reserved1: [0u8; 0xfc],
            icon: Smdh::default(),
        }
    }
}

/// Outcome of checking each link of the package's trust chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainVerification {
    /// CA signed the ticket signer
    pub ticket_certificate: bool,
    /// CA signed the TMD signer
    pub tmd_certificate: bool,
    pub ticket: bool,
    pub tmd: bool,
}

impl ChainVerification {
    #[must_use]
    pub fn all_ok(&self) -> bool {
        self.ticket_certificate && self.tmd_certificate && self.ticket && self.tmd
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cia {
    pub header: CiaHeader,
    pub ca_certificate: Certificate,
    pub ticket_certificate: Certificate,
    pub tmd_certificate: Certificate,
    pub ticket: Ticket,
    pub tmd: Tmd,
    pub contents: Vec<Content>,
    pub meta: Option<MetaRegion>,
}

fn to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

impl Cia {
    pub fn parse(cur: &mut Cursor) -> CtrResult<Self> {
        let header = CiaHeader::parse(cur)?;
        cur.align(ALIGNMENT)?;
        debug!(
            cia_type = header.cia_type,
            version = header.version,
            cert_size = header.cert_size,
            ticket_size = header.ticket_size,
            tmd_size = header.tmd_size,
            meta_size = header.meta_size,
            content_size = header.content_size,
            "cia header"
        );

        let certs_start = cur.position();
        let ca_certificate = Certificate::parse(cur)?;
        let ticket_certificate = Certificate::parse(cur)?;
        let tmd_certificate = Certificate::parse(cur)?;
        let chain_len = cur.position() - certs_start;
        if chain_len != header.cert_size as usize {
            warn!(
                declared = header.cert_size,
                parsed = chain_len,
                "certificate chain size doesn't match header"
            );
        }
        cur.align(ALIGNMENT)?;
        debug!(offset = certs_start, size = chain_len, "certificate chain");

        let ticket_start = cur.position();
        let ticket = Ticket::parse(&mut cur.take(header.ticket_size as usize)?)?;
        cur.align(ALIGNMENT)?;
        debug!(offset = ticket_start, title_id = %ticket.title_id, "ticket");

        let tmd_start = cur.position();
        let tmd = Tmd::parse(&mut cur.take(header.tmd_size as usize)?)?;
        cur.align(ALIGNMENT)?;
        debug!(
            offset = tmd_start,
            title_id = %tmd.title_id,
            content_count = tmd.content_chunks.len(),
            "tmd"
        );

        let active = header.content_index.active_indices();
        let listed: BTreeSet<u16> = tmd.content_chunks.iter().map(|chunk| chunk.index).collect();
        let missing = active.difference(&listed).count();
        if missing != 0 {
            return Err(CtrError::ContentIndexMismatch { missing });
        }

        let content_start = cur.position();
        let mut content_region = cur.take(to_usize(header.content_size))?;
        let mut contents = Vec::with_capacity(tmd.content_chunks.len());
        for record in &tmd.content_chunks {
            let data = content_region.read_bytes(to_usize(record.size))?.to_vec();
            trace!(id = record.id, index = record.index, size = data.len(), "content");
            contents.push(Content {
                id: record.id,
                index: record.index,
                content_type: record.content_type,
                data,
            });
        }
        if content_region.has_remaining() {
            warn!(
                unread = content_region.remaining(),
                "content region is larger than its records"
            );
        }
        debug!(offset = content_start, count = contents.len(), "contents");

        let meta = if header.meta_size != 0 {
            cur.align(ALIGNMENT)?;
            let meta_start = cur.position();
            let mut meta_region = cur.take(header.meta_size as usize)?;
            let meta = MetaRegion::parse(&mut meta_region)?;
            if meta_region.has_remaining() {
                warn!(
                    declared = header.meta_size,
                    expected = META_SIZE,
                    "meta region is larger than its layout"
                );
            }
            debug!(offset = meta_start, core_version = meta.core_version, "meta");
            Some(meta)
        } else {
            None
        };

        Ok(Self {
            header,
            ca_certificate,
            ticket_certificate,
            tmd_certificate,
            ticket,
            tmd,
            contents,
            meta,
        })
    }
    pub fn from_bytes(bytes: &[u8]) -> CtrResult<Self> {
        Self::parse(&mut Cursor::new(bytes))
    }

    fn cert_chain_size(&self) -> usize {
        self.ca_certificate.size() + self.ticket_certificate.size() + self.tmd_certificate.size()
    }
    fn content_size(&self) -> usize {
        self.contents.iter().map(|content| content.data.len()).sum()
    }
    /// Rewrites the declared section sizes to match the components
    ///
    /// [`Cia::encode`] always writes the recomputed sizes; this makes `header` agree with it.
    pub fn update_header(&mut self) {
        self.header = self.computed_header();
    }
    fn computed_header(&self) -> CiaHeader {
        CiaHeader {
            cert_size: self.cert_chain_size() as u32,
            ticket_size: self.ticket.size() as u32,
            tmd_size: self.tmd.size() as u32,
            meta_size: if self.meta.is_some() { META_SIZE as u32 } else { 0 },
            content_size: self.content_size() as u64,
            ..self.header.clone()
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        let meta = if self.meta.is_some() { META_SIZE } else { 0 };
        align(CIA_HEADER_SIZE as usize, ALIGNMENT)
            + align(self.cert_chain_size(), ALIGNMENT)
            + align(self.ticket.size(), ALIGNMENT)
            + align(self.tmd.size(), ALIGNMENT)
            + align(self.content_size(), ALIGNMENT)
            + align(meta, ALIGNMENT)
    }
    /// Fails only when the TMD can't be encoded
    pub fn encode(&self) -> CtrResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.size());
        self.computed_header().write(&mut out)?;
        pad_to(&mut out, ALIGNMENT);

        self.ca_certificate.write(&mut out)?;
        self.ticket_certificate.write(&mut out)?;
        self.tmd_certificate.write(&mut out)?;
        pad_to(&mut out, ALIGNMENT);

        self.ticket.write(&mut out)?;
        pad_to(&mut out, ALIGNMENT);
        self.tmd.write(&mut out)?;
        pad_to(&mut out, ALIGNMENT);

        for content in &self.contents {
            out.write_all(&content.data)?;
        }
        pad_to(&mut out, ALIGNMENT);

        if let Some(meta) = &self.meta {
            meta.write(&mut out)?;
            pad_to(&mut out, ALIGNMENT);
        }
        Ok(out)
    }

    /// Content with the given index, if it's in the package
    #[must_use]
    pub fn find_content(&self, index: u16) -> Option<&Content> {
        self.contents.iter().find(|content| content.index == index)
    }
    /// Checks every signature of the chain below the CA
    ///
    /// The CA itself is signed by the root key, which isn't part of the package.
    #[must_use]
    pub fn verify_chain(&self) -> ChainVerification {
        ChainVerification {
            ticket_certificate: self
                .ca_certificate
                .verify_certificate(&self.ticket_certificate),
            tmd_certificate: self.ca_certificate.verify_certificate(&self.tmd_certificate),
            ticket: self.ticket_certificate.verify_ticket(&self.ticket),
            tmd: self.tmd_certificate.verify_tmd(&self.tmd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;
    use crate::smdh::Smdh;
    use hex_literal::hex;
    use pretty_assertions::assert_eq;

    #[test]
    fn bitmap_bit_order_is_reversed() {
        let mut raw = [0u8; CONTENT_INDEX_SIZE];
        raw[0] = 0b1000_0001;
        let bitmap = ContentIndexBitmap::from_raw(raw);
        assert_eq!(bitmap.active_indices(), BTreeSet::from([0, 7]));

        let mut raw = [0u8; CONTENT_INDEX_SIZE];
        raw[1] = 0b0100_0000;
        raw[CONTENT_INDEX_SIZE - 1] = 0b0000_0001;
        let bitmap = ContentIndexBitmap::from_raw(raw);
        assert_eq!(bitmap.active_indices(), BTreeSet::from([9, 0xffff]));
        assert!(bitmap.is_active(9));
        assert!(!bitmap.is_active(14));
    }

    #[test]
    fn bitmap_from_indices() {
        let mut bitmap = ContentIndexBitmap::from_indices([0, 1, 2]);
        assert_eq!(&bitmap.raw()[..2], &hex!("e000"));
        bitmap.set(1, false);
        bitmap.set(8, true);
        assert_eq!(&bitmap.raw()[..2], &hex!("a080"));
        assert_eq!(bitmap.active_indices(), BTreeSet::from([0, 2, 8]));
    }

    #[test]
    fn round_trip_with_meta() {
        let cia = test_utils::cia(&[0, 1, 2], true);
        let bytes = cia.encode().unwrap();
        assert_eq!(bytes.len(), cia.size());
        assert_eq!(bytes.len() % ALIGNMENT, 0);
        let parsed = Cia::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, cia);
        assert_eq!(parsed.encode().unwrap(), bytes);

        let meta = parsed.meta.unwrap();
        assert_eq!(
            meta.dependencies_iter().collect::<Vec<_>>(),
            vec![TitleId::from_u64(0x0004_0130_0000_2002)]
        );
        assert_eq!(meta.core_version, 2);
    }

    #[test]
    fn round_trip_without_meta() {
        let cia = test_utils::cia(&[0], false);
        let bytes = cia.encode().unwrap();
        assert_eq!(bytes.len(), cia.size());
        let parsed = Cia::from_bytes(&bytes).unwrap();
        assert!(parsed.meta.is_none());
        assert_eq!(parsed.header.meta_size, 0);
        assert_eq!(parsed, cia);
    }

    #[test]
    fn header_layout() {
        let cia = test_utils::cia(&[0, 1], true);
        let bytes = cia.encode().unwrap();
        assert_eq!(&bytes[..4], &hex!("20200000"));
        assert_eq!(
            u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize,
            cia.ca_certificate.size() + cia.ticket_certificate.size() + cia.tmd_certificate.size()
        );
        assert_eq!(u32::from_le_bytes(bytes[0x14..0x18].try_into().unwrap()), 0x3ac0);
        assert_eq!(bytes[0x20], 0b1100_0000);
        // the certificate chain starts at the first boundary after the header
        assert_eq!(
            &bytes[0x2040..0x2044],
            &cia.ca_certificate.signature.variant().code().to_be_bytes()
        );
    }

    #[test]
    fn sections_are_aligned() {
        let cia = test_utils::cia(&[0, 1], false);
        let bytes = cia.encode().unwrap();
        let ticket_at = 0x2040 + align(cia.header.cert_size as usize, ALIGNMENT);
        assert_eq!(
            Ticket::from_bytes(&bytes[ticket_at..ticket_at + cia.header.ticket_size as usize])
                .unwrap(),
            cia.ticket
        );
        let tmd_at = ticket_at + align(cia.header.ticket_size as usize, ALIGNMENT);
        let content_at = tmd_at + align(cia.header.tmd_size as usize, ALIGNMENT);
        let first = &cia.contents[0].data;
        assert_eq!(&bytes[content_at..content_at + first.len()], &first[..]);
    }

    #[test]
    fn wrong_header_size_is_malformed() {
        let mut bytes = test_utils::cia(&[0], false).encode().unwrap();
        bytes[..4].copy_from_slice(&0x2000u32.to_le_bytes());
        assert!(matches!(
            Cia::from_bytes(&bytes),
            Err(CtrError::MalformedHeader {
                expected: 0x2020,
                actual: 0x2000
            })
        ));
    }

    #[test]
    fn active_index_without_record() {
        let mut cia = test_utils::cia(&[0, 1, 2], false);
        cia.header.content_index = ContentIndexBitmap::from_indices([0, 1, 2, 3]);
        assert!(matches!(
            Cia::from_bytes(&cia.encode().unwrap()),
            Err(CtrError::ContentIndexMismatch { missing: 1 })
        ));
    }

    #[test]
    fn contents_follow_record_order() {
        let mut cia = test_utils::cia(&[2, 0, 1], false);
        cia.update_header();
        let parsed = Cia::from_bytes(&cia.encode().unwrap()).unwrap();
        let order: Vec<u16> = parsed.contents.iter().map(|c| c.index).collect();
        assert_eq!(order, vec![2, 0, 1]);
        for (content, record) in parsed.contents.iter().zip(&parsed.tmd.content_chunks) {
            assert_eq!(content.id, record.id);
            assert_eq!(content.data.len() as u64, record.size);
        }
    }

    #[test]
    fn every_record_is_sliced_even_when_inactive() {
        let mut cia = test_utils::cia(&[0, 1, 2], false);
        cia.header.content_index = ContentIndexBitmap::from_indices([0, 1]);
        let bytes = cia.encode().unwrap();
        let parsed = Cia::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.header.content_index.active_indices(), BTreeSet::from([0, 1]));
        assert_eq!(parsed.contents.len(), 3);
        assert_eq!(
            parsed.find_content(2).unwrap().data,
            test_utils::content_data(2)
        );
        assert_eq!(parsed, cia);

        // the inactive record still needs its bytes
        cia.contents.pop();
        assert!(matches!(
            Cia::from_bytes(&cia.encode().unwrap()),
            Err(CtrError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn truncated_content() {
        let cia = test_utils::cia(&[0, 1], false);
        let bytes = cia.encode().unwrap();
        let content_end = cia.size() - align(cia.header.content_size as usize, ALIGNMENT)
            + cia.header.content_size as usize;
        assert!(matches!(
            Cia::from_bytes(&bytes[..content_end - 1]),
            Err(CtrError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn encode_recomputes_sizes() {
        let mut cia = test_utils::cia(&[0], true);
        cia.contents[0].data.extend_from_slice(&[0xaa; 0x10]);
        cia.tmd.content_chunks[0].size += 0x10;
        let parsed = Cia::from_bytes(&cia.encode().unwrap()).unwrap();
        assert_eq!(parsed.header.content_size, cia.content_size() as u64);
        assert_eq!(parsed.contents, cia.contents);
        assert_ne!(parsed.header, cia.header);
        cia.update_header();
        assert_eq!(parsed.header, cia.header);
    }

    #[test]
    fn platform_chain_verifies() {
        let cia = test_utils::cia(&[0, 1], true);
        let result = cia.verify_chain();
        assert_eq!(
            result,
            ChainVerification {
                ticket_certificate: true,
                tmd_certificate: true,
                ticket: true,
                tmd: true,
            }
        );
        assert!(result.all_ok());
    }

    #[test]
    fn self_signed_ticket_breaks_the_chain() {
        let mut cia = test_utils::cia(&[0], false);
        cia.ticket = test_utils::self_signed_ticket();
        cia.update_header();
        let parsed = Cia::from_bytes(&cia.encode().unwrap()).unwrap();
        let result = parsed.verify_chain();
        assert!(!result.ticket);
        assert!(result.tmd);
        assert!(result.ticket_certificate);
        assert!(!result.all_ok());
    }

    #[test]
    fn plaintext_content_hashes() {
        let cia = test_utils::cia(&[0, 1], false);
        let record = cia.tmd.find_record(0).unwrap();
        let content = cia.find_content(0).unwrap();
        assert_eq!(content.hash_ok(record), Some(true));

        let mut corrupted = content.clone();
        corrupted.data[0] ^= 1;
        assert_eq!(corrupted.hash_ok(record), Some(false));

        corrupted.content_type |= ContentType::ENCRYPTED;
        assert_eq!(corrupted.hash_ok(record), None);
    }

    #[test]
    fn meta_reserved_blocks_round_trip() {
        let mut cia = test_utils::cia(&[0], true);
        if let Some(meta) = &mut cia.meta {
            meta.reserved0 = [0x5a; 0x180];
            meta.reserved1[0] = 1;
        }
        let bytes = cia.encode().unwrap();
        let meta_at = bytes.len() - META_SIZE;
        assert_eq!(&bytes[meta_at + 0x180..meta_at + 0x300], &[0x5a; 0x180][..]);
        assert_eq!(
            u32::from_le_bytes(bytes[meta_at + 0x300..meta_at + 0x304].try_into().unwrap()),
            2
        );
        assert_eq!(&bytes[meta_at + 0x400..meta_at + 0x404], b"SMDH");
        assert_eq!(Cia::from_bytes(&bytes).unwrap(), cia);
    }

    #[test]
    fn meta_prefix_layout_from_literal() {
        // two dependencies, empty reserved block, core version 2
        let prefix = hex!(
            "0220000030010400 0217000030010400 0000000000000000 0000000000000000"
            "0000000000000000000000000000000000000000000000000000000000000000"
            "0000000000000000000000000000000000000000000000000000000000000000"
            "0000000000000000000000000000000000000000000000000000000000000000"
            "0000000000000000000000000000000000000000000000000000000000000000"
            "0000000000000000000000000000000000000000000000000000000000000000"
            "0000000000000000000000000000000000000000000000000000000000000000"
            "0000000000000000000000000000000000000000000000000000000000000000"
            "0000000000000000000000000000000000000000000000000000000000000000"
            "0000000000000000000000000000000000000000000000000000000000000000"
            "0000000000000000000000000000000000000000000000000000000000000000"
            "0000000000000000000000000000000000000000000000000000000000000000"
            "0000000000000000000000000000000000000000000000000000000000000000"
            "0000000000000000000000000000000000000000000000000000000000000000"
            "0000000000000000000000000000000000000000000000000000000000000000"
            "0000000000000000000000000000000000000000000000000000000000000000"
            "0000000000000000000000000000000000000000000000000000000000000000"
            "0000000000000000000000000000000000000000000000000000000000000000"
            "0000000000000000000000000000000000000000000000000000000000000000"
            "0000000000000000000000000000000000000000000000000000000000000000"
            "0000000000000000000000000000000000000000000000000000000000000000"
            "0000000000000000000000000000000000000000000000000000000000000000"
            "0000000000000000000000000000000000000000000000000000000000000000"
            "0000000000000000000000000000000000000000000000000000000000000000"
            "02000000"
        );
        assert_eq!(prefix.len(), 0x304);

        let mut raw = prefix.to_vec();
        raw.resize(0x400, 0);
        raw.extend_from_slice(&Smdh::default().encode().unwrap());
        assert_eq!(raw.len(), META_SIZE);

        let meta = MetaRegion::parse(&mut Cursor::new(&raw)).unwrap();
        assert_eq!(
            meta.dependencies_iter().collect::<Vec<_>>(),
            vec![
                TitleId::from_u64(0x0004_0130_0000_2002),
                TitleId::from_u64(0x0004_0130_0000_1702),
            ]
        );
        assert_eq!(meta.reserved0, [0u8; 0x180]);
        assert_eq!(meta.core_version, 2);

        let mut out: Vec<u8> = Vec::new();
        meta.write(&mut out).unwrap();
        assert_eq!(out, raw);
    }
}
