//! Signed sample structures for unit tests.

use std::sync::OnceLock;

use rand::RngCore;
use rsa::pkcs1v15::SigningKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey};
use sha2::Sha256;

use crate::cert::{Certificate, EccKeyData, PublicKeyData, RsaKeyData};
use crate::crypto::sect233r1::signing;
use crate::crypto::sha256;
use crate::signature::{Signature, SignatureVariant};
use crate::string::SizedCString;
use crate::ticket::Ticket;
use crate::titleid::TitleId;
use crate::tmd::{ContentChunkRecord, ContentInfoTable, ContentType, Tmd, TmdVersion};

#[cfg(feature = "cia")]
use crate::cia::{Cia, CiaHeader, Content, ContentIndexBitmap, MetaRegion};
#[cfg(feature = "cia")]
use crate::smdh::Smdh;

pub const TITLE_ID: u64 = 0x0004_0000_0012_3400;
pub const TICKET_ISSUER: &str = "Root-CA00000003-XS0000000c";
pub const TMD_ISSUER: &str = "Root-CA00000003-CP0000000b";

fn generate_key() -> RsaPrivateKey {
    RsaPrivateKey::new(&mut rand::thread_rng(), 2048).unwrap()
}

/// Key of the sample CA
pub fn rsa_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(generate_key)
}

/// Key shared by the sample ticket and TMD signers
pub fn leaf_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(generate_key)
}

fn sign_with(key: &RsaPrivateKey, msg: &[u8]) -> Vec<u8> {
    SigningKey::<Sha256>::new(key.clone()).sign(msg).to_vec()
}

pub fn rsa_sign(msg: &[u8]) -> Vec<u8> {
    sign_with(rsa_key(), msg)
}

fn rsa_signature(key: &RsaPrivateKey, msg: &[u8]) -> Signature {
    Signature::new(SignatureVariant::Rsa2048Sha256, sign_with(key, msg)).unwrap()
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut out = [0u8; N];
    rand::thread_rng().fill_bytes(&mut out);
    out
}

fn name<const N: usize>(value: &str) -> SizedCString<N> {
    SizedCString::try_from(value).unwrap()
}

fn rsa2048_key_data(key: &RsaPrivateKey) -> PublicKeyData {
    let modulus = key.n().to_bytes_be().try_into().unwrap();
    PublicKeyData::Rsa2048(RsaKeyData::new(modulus, 0x10001))
}

/// Certificate with a random 4096-bit modulus, laid out like the retail CA00000003
pub fn rsa4096_certificate() -> Certificate {
    let signature = Signature::new(
        SignatureVariant::Rsa4096Sha256,
        random_bytes::<0x200>().to_vec(),
    )
    .unwrap();
    Certificate {
        signature,
        issuer: name("Root"),
        name: name("CA00000003"),
        expiration: 0,
        public_key: PublicKeyData::Rsa4096(RsaKeyData::new(random_bytes(), 0x10001)),
    }
}

/// Self-signed CA holding [`rsa_key`]
pub fn ca_certificate() -> Certificate {
    let mut cert = Certificate {
        signature: Signature::zeroed(SignatureVariant::Rsa2048Sha256),
        issuer: name("Root"),
        name: name("CA00000003"),
        expiration: 0x1234_5678,
        public_key: rsa2048_key_data(rsa_key()),
    };
    cert.signature = rsa_signature(rsa_key(), &cert.signature_body().unwrap());
    cert
}

fn leaf_certificate(name_: &str) -> Certificate {
    let mut cert = Certificate {
        signature: Signature::zeroed(SignatureVariant::Rsa2048Sha256),
        issuer: name("Root-CA00000003"),
        name: name(name_),
        expiration: 0x1234_5678,
        public_key: rsa2048_key_data(leaf_key()),
    };
    cert.signature = rsa_signature(rsa_key(), &cert.signature_body().unwrap());
    cert
}

pub fn ticket_certificate() -> Certificate {
    leaf_certificate("XS0000000c")
}

pub fn tmd_certificate() -> Certificate {
    leaf_certificate("CP0000000b")
}

pub fn ecc_keypair() -> (BigUint, [u8; 0x3c]) {
    let private = signing::scalar_from_bytes(&random_bytes::<30>());
    let public = signing::public_key(&private);
    (private, public)
}

pub fn ecc_sign(private: &BigUint, msg: &[u8]) -> [u8; 0x3c] {
    let nonce = signing::scalar_from_bytes(&random_bytes::<30>());
    signing::sign(private, &nonce, &sha256(msg))
}

/// Console-unique style certificate with a sect233r1 key, and that key's private scalar
pub fn ecc_certificate() -> (Certificate, BigUint) {
    let (private, public) = ecc_keypair();
    let cert = Certificate {
        signature: Signature::new(SignatureVariant::EcdsaSha256, random_bytes::<0x3c>().to_vec())
            .unwrap(),
        issuer: name("Root-CA00000003-MS00000008"),
        name: name("CT0123abcd-01"),
        expiration: 0x5eed,
        public_key: PublicKeyData::Ecdsa233r1(EccKeyData::new(public)),
    };
    (cert, private)
}

fn content_index() -> Vec<u8> {
    let mut index = vec![0u8; 0xac];
    index[..16].copy_from_slice(&[0, 1, 0, 0x14, 0, 0, 0, 0xac, 0, 0, 0, 0x14, 0, 1, 0, 0x14]);
    index[0x28..0x2c].copy_from_slice(&[0, 0, 0, 0x84]);
    index
}

fn unsigned_ticket() -> Ticket {
    Ticket {
        signature: Signature::zeroed(SignatureVariant::Rsa2048Sha256),
        issuer: name(TICKET_ISSUER),
        ecc_public_key: random_bytes(),
        version: 1,
        ca_crl_version: 0,
        signer_crl_version: 0,
        title_key: random_bytes(),
        reserved0: 0,
        ticket_id: 0x0004_2f6d_1e8a_0b93,
        console_id: 0,
        title_id: TitleId::from_u64(TITLE_ID),
        reserved1: [0; 2],
        title_version: 0x0410,
        reserved2: [0; 8],
        license_type: 0,
        common_key_index: 0,
        reserved3: [0; 0x2a],
        eshop_account_id: 0,
        reserved4: 0,
        audit: 1,
        reserved5: [0; 0x42],
        limits: [0; 0x40],
        content_index: content_index(),
        certificates: None,
    }
}

/// Ticket signed by [`ticket_certificate`]
pub fn ticket() -> Ticket {
    let mut ticket = unsigned_ticket();
    ticket.signature = rsa_signature(leaf_key(), &ticket.signature_body().unwrap());
    ticket
}

/// Ticket naming the platform signer but signed by some other key
pub fn self_signed_ticket() -> Ticket {
    let mut ticket = unsigned_ticket();
    ticket.signature = rsa_signature(rsa_key(), &ticket.signature_body().unwrap());
    ticket
}

/// Deterministic plaintext content for the given index
pub fn content_data(index: u16) -> Vec<u8> {
    let len = 0x200 + index as usize * 0x30;
    (0..len).map(|i| (i as u8) ^ (index as u8)).collect()
}

/// Version 1 TMD with one plaintext content per index, signed by [`tmd_certificate`]
pub fn tmd(indexes: &[u16]) -> Tmd {
    let content_chunks: Vec<ContentChunkRecord> = indexes
        .iter()
        .enumerate()
        .map(|(i, &index)| {
            let data = content_data(index);
            ContentChunkRecord {
                id: 0x100 + i as u32,
                index,
                content_type: ContentType::empty(),
                size: data.len() as u64,
                hash: sha256(&data),
            }
        })
        .collect();
    let mut tmd = Tmd {
        signature: Signature::zeroed(SignatureVariant::Rsa2048Sha256),
        issuer: name(TMD_ISSUER),
        version: TmdVersion::V1(ContentInfoTable::covering(&content_chunks).unwrap()),
        ca_crl_version: 0,
        signer_crl_version: 0,
        reserved0: 0,
        system_version: 0,
        title_id: TitleId::from_u64(TITLE_ID),
        title_type: 0x40,
        group_id: 0,
        save_data_size: 0x8_0000,
        srl_private_save_size: 0,
        reserved1: 0,
        srl_flag: 0,
        reserved2: [0; 0x31],
        access_rights: 0,
        title_version: 0x0410,
        boot_content: 0,
        padding: 0,
        content_chunks,
        certificates: None,
    };
    tmd.signature = rsa_signature(leaf_key(), &tmd.signature_body().unwrap());
    tmd
}

/// Complete package holding every given index
#[cfg(feature = "cia")]
pub fn cia(indexes: &[u16], with_meta: bool) -> Cia {
    let tmd = tmd(indexes);
    let contents = tmd
        .content_chunks
        .iter()
        .map(|record| Content {
            id: record.id,
            index: record.index,
            content_type: record.content_type,
            data: content_data(record.index),
        })
        .collect();
    let meta = with_meta.then(|| {
        let mut meta = MetaRegion {
            core_version: 2,
            icon: Smdh::default(),
            ..MetaRegion::default()
        };
        meta.dependencies[0] = TitleId::from_u64(0x0004_0130_0000_2002);
        meta
    });
    let mut cia = Cia {
        header: CiaHeader {
            cia_type: 0,
            version: 0,
            cert_size: 0,
            ticket_size: 0,
            tmd_size: 0,
            meta_size: 0,
            content_size: 0,
            content_index: ContentIndexBitmap::from_indices(indexes.iter().copied()),
        },
        ca_certificate: ca_certificate(),
        ticket_certificate: ticket_certificate(),
        tmd_certificate: tmd_certificate(),
        ticket: ticket(),
        tmd,
        contents,
        meta,
    };
    cia.update_header();
    cia
}
