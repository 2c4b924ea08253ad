use std::io::{self, Write};
use std::{array, fmt};

use bitflags::bitflags;
use byteorder::{BigEndian, WriteBytesExt};
use derivative::Derivative;
use static_assertions::const_assert_eq;
use tracing::trace;

use crate::cert::CertificatePair;
use crate::crypto::sha256;
use crate::cursor::Cursor;
use crate::signature::Signature;
use crate::string::SizedCString;
use crate::titleid::TitleId;
use crate::{CtrError, CtrResult};

const HEADER_SIZE: usize = 0x40 + 4 + 8 + 8 + 4 + 2 + 4 + 4 + 4 + 1 + 0x31 + 4 + 2 + 2 + 2 + 2;
const_assert_eq!(HEADER_SIZE, 0xa4);

pub const CONTENT_INFO_COUNT: usize = 64;
const CONTENT_INFO_RECORD_SIZE: usize = 0x24;
const CONTENT_CHUNK_RECORD_SIZE: usize = 0x30;
const CONTENT_INFO_TABLE_SIZE: usize = 0x20 + CONTENT_INFO_COUNT * CONTENT_INFO_RECORD_SIZE;
const_assert_eq!(CONTENT_INFO_TABLE_SIZE, 0x920);

/// Only this version carries the content info table
const VERSION_WITH_CONTENT_INFO: u8 = 1;

/// Checks that `len` chunk records fit the 16-bit count fields
fn chunk_count(len: usize) -> CtrResult<u16> {
    u16::try_from(len).map_err(|_| CtrError::InvalidLength {
        what: "content chunk records",
        actual: len,
        expected: u16::MAX as usize,
    })
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ContentType: u16 {
        const ENCRYPTED = 0x1;
        const DISC = 0x2;
        const CFM = 0x4;
        const OPTIONAL = 0x4000;
        const SHARED = 0x8000;
        const _ = !0;
    }
}

/// One content of the title
#[derive(Derivative, Clone, Copy, PartialEq, Eq)]
#[derivative(Debug)]
pub struct ContentChunkRecord {
    pub id: u32,
    pub index: u16,
    pub content_type: ContentType,
    pub size: u64,
    #[derivative(Debug(format_with = "crate::fmt_hex"))]
    pub hash: [u8; 0x20],
}

impl ContentChunkRecord {
    fn read(cur: &mut Cursor) -> CtrResult<Self> {
        Ok(Self {
            id: cur.read_u32::<BigEndian>()?,
            index: cur.read_u16::<BigEndian>()?,
            content_type: ContentType::from_bits_retain(cur.read_u16::<BigEndian>()?),
            size: cur.read_u64::<BigEndian>()?,
            hash: cur.read_array()?,
        })
    }
    fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<BigEndian>(self.id)?;
        w.write_u16::<BigEndian>(self.index)?;
        w.write_u16::<BigEndian>(self.content_type.bits())?;
        w.write_u64::<BigEndian>(self.size)?;
        w.write_all(&self.hash)
    }
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.content_type.is_empty() && self.size == 0 && self.hash.iter().all(|v| *v == 0)
    }
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.content_type.contains(ContentType::ENCRYPTED)
    }
}

/// Hash over `count` chunk records starting at `offset`
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentInfoRecord {
    pub offset: u16,
    pub count: u16,
    pub hash: [u8; 0x20],
}

impl ContentInfoRecord {
    fn read(cur: &mut Cursor) -> CtrResult<Self> {
        Ok(Self {
            offset: cur.read_u16::<BigEndian>()?,
            count: cur.read_u16::<BigEndian>()?,
            hash: cur.read_array()?,
        })
    }
    fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u16::<BigEndian>(self.offset)?;
        w.write_u16::<BigEndian>(self.count)?;
        w.write_all(&self.hash)
    }
    #[must_use]
    pub fn is_unused(&self) -> bool {
        self.count == 0 && self.hash.iter().all(|v| *v == 0)
    }
}

impl fmt::Debug for ContentInfoRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_unused() {
            f.debug_tuple("ContentInfoRecord").field(&None::<()>).finish()
        } else {
            f.debug_struct("ContentInfoRecord")
                .field("offset", &self.offset)
                .field("count", &self.count)
                .field("hash", &hex::encode(self.hash))
                .finish()
        }
    }
}

/// Hash of the 64 info records, followed by the records
#[derive(Derivative, Clone, PartialEq, Eq)]
#[derivative(Debug)]
pub struct ContentInfoTable {
    #[derivative(Debug(format_with = "crate::fmt_hex"))]
    pub hash: [u8; 0x20],
    pub records: [ContentInfoRecord; CONTENT_INFO_COUNT],
}

impl Default for ContentInfoTable {
    fn default() -> Self {
        Self {
            hash: [0u8; 0x20],
            records: array::from_fn(|_| ContentInfoRecord::default()),
        }
    }
}

impl ContentInfoTable {
    fn read(cur: &mut Cursor) -> CtrResult<Self> {
        let hash = cur.read_array()?;
        let mut records = [ContentInfoRecord::default(); CONTENT_INFO_COUNT];
        for record in &mut records {
            *record = ContentInfoRecord::read(cur)?;
        }
        Ok(Self { hash, records })
    }
    fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.hash)?;
        self.write_records(w)
    }
    fn write_records<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for record in &self.records {
            record.write(w)?;
        }
        Ok(())
    }
    /// Table with a single record covering every chunk, hashes filled in
    pub fn covering(chunks: &[ContentChunkRecord]) -> CtrResult<Self> {
        let mut table = Self::default();
        table.records[0] = ContentInfoRecord {
            offset: 0,
            count: chunk_count(chunks.len())?,
            hash: sha256(&encode_chunks(chunks)?),
        };
        table.hash = table.records_hash()?;
        Ok(table)
    }
    fn records_hash(&self) -> io::Result<[u8; 0x20]> {
        let mut raw = Vec::with_capacity(CONTENT_INFO_COUNT * CONTENT_INFO_RECORD_SIZE);
        self.write_records(&mut raw)?;
        Ok(sha256(&raw))
    }
}

fn encode_chunks(chunks: &[ContentChunkRecord]) -> io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(chunks.len() * CONTENT_CHUNK_RECORD_SIZE);
    for chunk in chunks {
        chunk.write(&mut out)?;
    }
    Ok(out)
}

/// TMD format version, which decides whether the content info table is present
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TmdVersion {
    V1(ContentInfoTable),
    /// Any other version, stored without the table
    ///
    /// `Plain(1)` can't be encoded.
    Plain(u8),
}

impl TmdVersion {
    #[must_use]
    pub fn number(&self) -> u8 {
        match self {
            Self::V1(_) => VERSION_WITH_CONTENT_INFO,
            Self::Plain(version) => *version,
        }
    }
    #[must_use]
    pub fn content_info(&self) -> Option<&ContentInfoTable> {
        match self {
            Self::V1(table) => Some(table),
            Self::Plain(_) => None,
        }
    }
}

/// Title metadata
#[derive(Derivative, Clone, PartialEq, Eq)]
#[derivative(Debug)]
pub struct Tmd {
    pub signature: Signature,
    pub issuer: SizedCString<0x40>,
    /// Version byte, with the content info table for version 1
    pub version: TmdVersion,
    pub ca_crl_version: u8,
    pub signer_crl_version: u8,
    #[derivative(Debug = "ignore")]
    pub reserved0: u8,
    pub system_version: u64,
    pub title_id: TitleId,
    pub title_type: u32,
    pub group_id: u16,
    pub save_data_size: u32,
    pub srl_private_save_size: u32,
    #[derivative(Debug = "ignore")]
    pub reserved1: u32,
    pub srl_flag: u8,
    #[derivative(Debug = "ignore")]
    pub reserved2: [u8; 0x31],
    pub access_rights: u32,
    pub title_version: u16,
    pub boot_content: u16,
    #[derivative(Debug = "ignore")]
    pub padding: u16,
    pub content_chunks: Vec<ContentChunkRecord>,
    pub certificates: Option<CertificatePair>,
}

impl Tmd {
    /// Parses a TMD, and the certificates after it if the cursor isn't exhausted
    pub fn parse(cur: &mut Cursor) -> CtrResult<Self> {
        let signature = Signature::read(cur)?;
        let issuer = SizedCString::read(cur)?;
        let version = cur.read_u8()?;
        let ca_crl_version = cur.read_u8()?;
        let signer_crl_version = cur.read_u8()?;
        let reserved0 = cur.read_u8()?;
        let system_version = cur.read_u64::<BigEndian>()?;
        let title_id = TitleId::from_u64(cur.read_u64::<BigEndian>()?);
        let title_type = cur.read_u32::<BigEndian>()?;
        let group_id = cur.read_u16::<BigEndian>()?;
        let save_data_size = cur.read_u32::<BigEndian>()?;
        let srl_private_save_size = cur.read_u32::<BigEndian>()?;
        let reserved1 = cur.read_u32::<BigEndian>()?;
        let srl_flag = cur.read_u8()?;
        let reserved2 = cur.read_array()?;
        let access_rights = cur.read_u32::<BigEndian>()?;
        let title_version = cur.read_u16::<BigEndian>()?;
        let content_count = cur.read_u16::<BigEndian>()?;
        let boot_content = cur.read_u16::<BigEndian>()?;
        let padding = cur.read_u16::<BigEndian>()?;

        let version = if version == VERSION_WITH_CONTENT_INFO {
            TmdVersion::V1(ContentInfoTable::read(cur)?)
        } else {
            TmdVersion::Plain(version)
        };

        // checked up front so a bogus count can't make us allocate
        cur.peek_bytes(content_count as usize * CONTENT_CHUNK_RECORD_SIZE)?;
        let content_chunks = (0..content_count)
            .map(|_| ContentChunkRecord::read(cur))
            .collect::<CtrResult<Vec<_>>>()?;
        for chunk in &content_chunks {
            trace!(id = chunk.id, index = chunk.index, size = chunk.size, "content chunk");
        }

        let certificates = CertificatePair::parse_trailing(cur)?;
        trace!(%title_id, version = version.number(), content_count, "parsed tmd");

        Ok(Self {
            signature,
            issuer,
            version,
            ca_crl_version,
            signer_crl_version,
            reserved0,
            system_version,
            title_id,
            title_type,
            group_id,
            save_data_size,
            srl_private_save_size,
            reserved1,
            srl_flag,
            reserved2,
            access_rights,
            title_version,
            boot_content,
            padding,
            content_chunks,
            certificates,
        })
    }
    pub fn from_bytes(bytes: &[u8]) -> CtrResult<Self> {
        Self::parse(&mut Cursor::new(bytes))
    }

    /// Number of chunk records, as written to the header
    ///
    /// Fails when there are more records than the 16-bit count can hold.
    pub fn content_count(&self) -> CtrResult<u16> {
        chunk_count(self.content_chunks.len())
    }
    #[must_use]
    pub fn content_info(&self) -> Option<&ContentInfoTable> {
        self.version.content_info()
    }

    #[must_use]
    pub fn size(&self) -> usize {
        let info = if self.content_info().is_some() {
            CONTENT_INFO_TABLE_SIZE
        } else {
            0
        };
        self.signature.header_size()
            + HEADER_SIZE
            + info
            + self.content_chunks.len() * CONTENT_CHUNK_RECORD_SIZE
            + self.certificates.as_ref().map_or(0, CertificatePair::size)
    }

    /// Bytes covered by the signature
    ///
    /// That's the header, plus the info table hash for version 1. The records themselves are
    /// covered through that hash.
    pub fn signature_body(&self) -> CtrResult<Vec<u8>> {
        let mut out = Vec::with_capacity(HEADER_SIZE + 0x20);
        self.write_header(&mut out)?;
        if let Some(table) = self.content_info() {
            out.write_all(&table.hash)?;
        }
        Ok(out)
    }
    fn write_header<W: Write>(&self, w: &mut W) -> CtrResult<()> {
        if matches!(self.version, TmdVersion::Plain(VERSION_WITH_CONTENT_INFO)) {
            return Err(CtrError::MissingContentInfo);
        }
        let content_count = self.content_count()?;
        self.issuer.write(w)?;
        w.write_u8(self.version.number())?;
        w.write_u8(self.ca_crl_version)?;
        w.write_u8(self.signer_crl_version)?;
        w.write_u8(self.reserved0)?;
        w.write_u64::<BigEndian>(self.system_version)?;
        w.write_u64::<BigEndian>(self.title_id.to_u64())?;
        w.write_u32::<BigEndian>(self.title_type)?;
        w.write_u16::<BigEndian>(self.group_id)?;
        w.write_u32::<BigEndian>(self.save_data_size)?;
        w.write_u32::<BigEndian>(self.srl_private_save_size)?;
        w.write_u32::<BigEndian>(self.reserved1)?;
        w.write_u8(self.srl_flag)?;
        w.write_all(&self.reserved2)?;
        w.write_u32::<BigEndian>(self.access_rights)?;
        w.write_u16::<BigEndian>(self.title_version)?;
        w.write_u16::<BigEndian>(content_count)?;
        w.write_u16::<BigEndian>(self.boot_content)?;
        w.write_u16::<BigEndian>(self.padding)?;
        Ok(())
    }
    pub(crate) fn write<W: Write>(&self, w: &mut W) -> CtrResult<()> {
        self.signature.write(w)?;
        self.write_header(w)?;
        if let Some(table) = self.content_info() {
            table.write(w)?;
        }
        for chunk in &self.content_chunks {
            chunk.write(w)?;
        }
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

    /// Checks the info table hash and the hash of every info record against the chunk records
    ///
    /// Always false for TMDs without the table.
    #[must_use]
    pub fn content_info_hash_ok(&self) -> bool {
        let Some(table) = self.content_info() else {
            return false;
        };
        if !table.records_hash().is_ok_and(|hash| hash == table.hash) {
            return false;
        }
        table
            .records
            .iter()
            .filter(|record| record.count != 0)
            .all(|record| {
                let start = record.offset as usize;
                let end = start + record.count as usize;
                self.content_chunks
                    .get(start..end)
                    .and_then(|chunks| encode_chunks(chunks).ok())
                    .is_some_and(|raw| sha256(&raw) == record.hash)
            })
    }
    /// Recomputes the info table so that it covers the current chunk records
    ///
    /// Does nothing for versions without the table.
    pub fn update_content_info(&mut self) -> CtrResult<()> {
        if let TmdVersion::V1(table) = &mut self.version {
            *table = ContentInfoTable::covering(&self.content_chunks)?;
        }
        Ok(())
    }

    /// Record for the given content index
    #[must_use]
    pub fn find_record(&self, index: u16) -> Option<&ContentChunkRecord> {
        self.content_chunks.iter().find(|chunk| chunk.index == index)
    }
    /// Sum of all content sizes
    #[must_use]
    pub fn total_content_size(&self) -> u64 {
        self.content_chunks.iter().map(|chunk| chunk.size).sum()
    }
}
