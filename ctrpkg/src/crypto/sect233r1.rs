//! ECDSA verification over sect233r1 (SEC 2, also known as NIST B-233).
//!
//! The curve is `y^2 + xy = x^3 + x^2 + b` over GF(2^233) with the field built from
//! `x^233 + x^74 + 1`. Only what signature checks need is here: field arithmetic, affine point
//! arithmetic and scalar multiplication. Nothing in this module is constant-time, it only ever
//! handles public data.

use std::mem;

use byteorder::{BigEndian, ByteOrder};
use hex_literal::hex;
use rsa::BigUint;

const M: usize = 233;
/// Bytes used by a field element or a scalar on the wire
pub(crate) const ELEMENT_SIZE: usize = 30;

/// Order of the base point
const ORDER: [u8; ELEMENT_SIZE] = hex!("01000000000000000000000000000013E974E72F8A6922031D2603CFE0D7");

/// Element of GF(2^233), little-endian 64-bit limbs
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub(crate) struct Fe([u64; 4]);

impl Fe {
    const ZERO: Fe = Fe([0; 4]);
    const ONE: Fe = Fe([1, 0, 0, 0]);
    /// x^233 + x^74 + 1
    const POLY: Fe = Fe([1, 1 << 10, 0, 1 << 41]);
    // 0066647EDE6C332C7F8C0923BB58213B333B20E9CE4281FE115F7D8F90AD
    const B: Fe = Fe([0x81fe115f7d8f90ad, 0x213b333b20e9ce42, 0x332c7f8c0923bb58, 0x66647ede6c]);
    // 00FAC9DFCBAC8313BB2139F1BB755FEF65BC391F8B36F8F8EB7371FD558B
    const GX: Fe = Fe([0xf8f8eb7371fd558b, 0x5fef65bc391f8b36, 0x8313bb2139f1bb75, 0xfac9dfcbac]);
    // 01006A08A41903350678E58528BEBF8A0BEFF867A7CA36716F7E01F81052
    const GY: Fe = Fe([0x36716f7e01f81052, 0xbf8a0beff867a7ca, 0x03350678e58528be, 0x1006a08a419]);

    /// Parses a big-endian element, rejecting values with bits at or above 2^233
    pub(crate) fn from_be_bytes(bytes: &[u8; ELEMENT_SIZE]) -> Option<Self> {
        let mut wide = [0u8; 32];
        wide[32 - ELEMENT_SIZE..].copy_from_slice(bytes);
        let mut limbs = [0u64; 4];
        for (i, chunk) in wide.chunks_exact(8).enumerate() {
            limbs[3 - i] = BigEndian::read_u64(chunk);
        }
        if limbs[3] >> (M - 192) != 0 {
            return None;
        }
        Some(Fe(limbs))
    }
    pub(crate) fn to_be_bytes(self) -> [u8; ELEMENT_SIZE] {
        let mut wide = [0u8; 32];
        for (i, chunk) in wide.chunks_exact_mut(8).enumerate() {
            BigEndian::write_u64(chunk, self.0[3 - i]);
        }
        let mut out = [0u8; ELEMENT_SIZE];
        out.copy_from_slice(&wide[32 - ELEMENT_SIZE..]);
        out
    }

    fn is_zero(&self) -> bool {
        self.0 == [0; 4]
    }
    fn bit(&self, i: usize) -> bool {
        (self.0[i / 64] >> (i % 64)) & 1 == 1
    }
    fn degree(&self) -> Option<usize> {
        (0..4)
            .rev()
            .find(|&i| self.0[i] != 0)
            .map(|i| i * 64 + 63 - self.0[i].leading_zeros() as usize)
    }
    fn add(self, other: Fe) -> Fe {
        let mut out = self;
        for (a, b) in out.0.iter_mut().zip(other.0) {
            *a ^= b;
        }
        out
    }
    /// Plain polynomial shift, no reduction
    fn shl(self, amount: usize) -> Fe {
        let words = amount / 64;
        let bits = amount % 64;
        let mut out = [0u64; 4];
        for i in words..4 {
            out[i] = self.0[i - words] << bits;
            if bits != 0 && i > words {
                out[i] |= self.0[i - words - 1] >> (64 - bits);
            }
        }
        Fe(out)
    }
    /// Multiplies by x and reduces
    fn mul_x(self) -> Fe {
        let mut out = [0u64; 4];
        out[0] = self.0[0] << 1;
        for i in 1..4 {
            out[i] = (self.0[i] << 1) | (self.0[i - 1] >> 63);
        }
        let mut out = Fe(out);
        if out.bit(M) {
            out = out.add(Self::POLY);
        }
        out
    }
    fn mul(self, other: Fe) -> Fe {
        let mut acc = Self::ZERO;
        for i in (0..M).rev() {
            acc = acc.mul_x();
            if other.bit(i) {
                acc = acc.add(self);
            }
        }
        acc
    }
    fn square(self) -> Fe {
        self.mul(self)
    }
    /// Inverse through the extended Euclidean algorithm for binary polynomials
    fn invert(self) -> Option<Fe> {
        let (mut u, mut v) = (self, Self::POLY);
        let (mut g1, mut g2) = (Self::ONE, Self::ZERO);
        while u != Self::ONE {
            let mut du = u.degree()?;
            let mut dv = v.degree()?;
            if du < dv {
                mem::swap(&mut u, &mut v);
                mem::swap(&mut g1, &mut g2);
                mem::swap(&mut du, &mut dv);
            }
            let j = du - dv;
            u = u.add(v.shl(j));
            g1 = g1.add(g2.shl(j));
        }
        Some(g1)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Point {
    Infinity,
    Affine { x: Fe, y: Fe },
}

impl Point {
    pub(crate) fn generator() -> Self {
        Point::Affine { x: Fe::GX, y: Fe::GY }
    }
    /// Decodes `x || y` as two big-endian coordinates, checking that the point is on the curve
    pub(crate) fn from_coordinates(bytes: &[u8; ELEMENT_SIZE * 2]) -> Option<Self> {
        let (x, y) = bytes.split_at(ELEMENT_SIZE);
        let x = Fe::from_be_bytes(x.try_into().ok()?)?;
        let y = Fe::from_be_bytes(y.try_into().ok()?)?;
        let point = Point::Affine { x, y };
        point.is_on_curve().then_some(point)
    }
    pub(crate) fn to_coordinates(self) -> Option<[u8; ELEMENT_SIZE * 2]> {
        match self {
            Point::Infinity => None,
            Point::Affine { x, y } => {
                let mut out = [0u8; ELEMENT_SIZE * 2];
                out[..ELEMENT_SIZE].copy_from_slice(&x.to_be_bytes());
                out[ELEMENT_SIZE..].copy_from_slice(&y.to_be_bytes());
                Some(out)
            }
        }
    }
    fn is_on_curve(&self) -> bool {
        match *self {
            Point::Infinity => true,
            Point::Affine { x, y } => {
                let x2 = x.square();
                let lhs = y.square().add(x.mul(y));
                let rhs = x2.mul(x).add(x2).add(Fe::B);
                lhs == rhs
            }
        }
    }
    fn double(self) -> Point {
        match self {
            Point::Affine { x, y } if !x.is_zero() => {
                let Some(x_inv) = x.invert() else {
                    return Point::Infinity;
                };
                let lambda = x.add(y.mul(x_inv));
                let x3 = lambda.square().add(lambda).add(Fe::ONE);
                let y3 = x.square().add(lambda.add(Fe::ONE).mul(x3));
                Point::Affine { x: x3, y: y3 }
            }
            _ => Point::Infinity,
        }
    }
    fn add(self, other: Point) -> Point {
        let (x1, y1, x2, y2) = match (self, other) {
            (Point::Infinity, p) | (p, Point::Infinity) => return p,
            (Point::Affine { x: x1, y: y1 }, Point::Affine { x: x2, y: y2 }) => (x1, y1, x2, y2),
        };
        if x1 == x2 {
            // either the same point or its negation (x, x + y)
            return if y1 == y2 { self.double() } else { Point::Infinity };
        }
        let Some(dx_inv) = x1.add(x2).invert() else {
            return Point::Infinity;
        };
        let lambda = y1.add(y2).mul(dx_inv);
        let x3 = lambda.square().add(lambda).add(x1).add(x2).add(Fe::ONE);
        let y3 = lambda.mul(x1.add(x3)).add(x3).add(y1);
        Point::Affine { x: x3, y: y3 }
    }
    pub(crate) fn mul(self, scalar: &BigUint) -> Point {
        let mut acc = Point::Infinity;
        for byte in scalar.to_bytes_be() {
            for bit in (0..8).rev() {
                acc = acc.double();
                if (byte >> bit) & 1 == 1 {
                    acc = acc.add(self);
                }
            }
        }
        acc
    }
}

fn order() -> BigUint {
    BigUint::from_bytes_be(&ORDER)
}

/// Leftmost 233 bits of a SHA-256 digest, as SEC 1 prescribes for a 233-bit order
fn digest_scalar(digest: &[u8; 32]) -> BigUint {
    BigUint::from_bytes_be(digest) >> (256 - M)
}

/// Verifies a raw `r || s` signature over `digest` with the public point `q`
pub(crate) fn verify(q: &Point, digest: &[u8; 32], signature: &[u8]) -> bool {
    if signature.len() != ELEMENT_SIZE * 2 {
        return false;
    }
    let n = order();
    let zero = BigUint::from(0u32);
    let r = BigUint::from_bytes_be(&signature[..ELEMENT_SIZE]);
    let s = BigUint::from_bytes_be(&signature[ELEMENT_SIZE..]);
    if r == zero || s == zero || r >= n || s >= n {
        return false;
    }

    let e = digest_scalar(digest);
    let w = s.modpow(&(&n - &BigUint::from(2u32)), &n);
    let u1 = (&e * &w) % &n;
    let u2 = (&r * &w) % &n;

    match Point::generator().mul(&u1).add(q.mul(&u2)) {
        Point::Infinity => false,
        Point::Affine { x, .. } => BigUint::from_bytes_be(&x.to_be_bytes()) % &n == r,
    }
}
