use std::io::{self, Write};
use std::{borrow::Cow, fmt, str, string};

use byteorder::{LittleEndian, WriteBytesExt};
use thiserror::Error;

use crate::cursor::Cursor;
use crate::CtrResult;

/// An error for SizedCString construction
#[derive(Error, Debug)]
pub enum SizedCStringError {
    #[error("Input string too big to fit into storage")]
    TooBig,
}

/// A NUL-padded name stored in a fixed-size field
///
/// Everything after the first NUL byte is dropped when the field is read, and the field is
/// zero-padded back to `SIZE` when written.
#[derive(Clone, PartialEq, Eq)]
pub struct SizedCString<const SIZE: usize>([u8; SIZE]);

impl<const SIZE: usize> SizedCString<SIZE> {
    /// Returns the string up to the first NUL, or str::Utf8Error if it's not valid UTF-8 data
    /// <https://doc.rust-lang.org/std/str/fn.from_utf8.html>
    pub fn as_str(&self) -> Result<&str, str::Utf8Error> {
        str::from_utf8(self.trimmed())
    }
    /// Converts to a string, replacing invalid UTF-8 sequences with replacement character
    /// <https://doc.rust-lang.org/std/string/struct.String.html#method.from_utf8_lossy>
    #[must_use]
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.trimmed())
    }
    /// Checks if string inside this struct is all zeroes
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|v| *v == 0)
    }
    /// Returns a reference to the whole field, padding included
    #[must_use]
    pub fn data(&self) -> &[u8; SIZE] {
        &self.0
    }
    fn trimmed(&self) -> &[u8] {
        let end = self.0.iter().position(|v| *v == 0).unwrap_or(SIZE);
        &self.0[..end]
    }

    pub(crate) fn read(cur: &mut Cursor) -> CtrResult<Self> {
        Ok(Self::from(cur.read_array::<SIZE>()?))
    }
    pub(crate) fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.0)
    }
}

impl<const SIZE: usize> Default for SizedCString<SIZE> {
    fn default() -> Self {
        Self([0u8; SIZE])
    }
}

impl<const SIZE: usize> From<[u8; SIZE]> for SizedCString<SIZE> {
    fn from(mut other: [u8; SIZE]) -> SizedCString<SIZE> {
        if let Some(nul) = other.iter().position(|v| *v == 0) {
            other[nul..].fill(0);
        }
        SizedCString(other)
    }
}

impl<const SIZE: usize> TryFrom<&str> for SizedCString<SIZE> {
    type Error = SizedCStringError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if value.len() > SIZE {
            return Err(SizedCStringError::TooBig);
        }
        let mut data = [0u8; SIZE];
        data[..value.len()].copy_from_slice(value.as_bytes());
        Ok(Self::from(data))
    }
}

/// A UTF-16 version of SizedCString
#[derive(Clone, PartialEq, Eq)]
pub struct SizedCStringUtf16<const SIZE: usize> {
    data: [u16; SIZE],
}

impl<const SIZE: usize> SizedCStringUtf16<SIZE> {
    /// Converts a SizedCStringUtf16 to a Rust String, returing an error on any invalid data
    /// <https://doc.rust-lang.org/std/string/struct.String.html#method.from_utf16>
    pub fn to_string(&self) -> Result<String, string::FromUtf16Error> {
        String::from_utf16(self.trimmed())
    }
    /// Converts a SizedCStringUtf16 to a Rust String, replacing invalid data with the replacement
    /// character
    /// <https://doc.rust-lang.org/std/string/struct.String.html#method.from_utf16_lossy>
    #[must_use]
    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(self.trimmed())
    }
    /// Checks if string inside this struct is all zeroes
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|v| *v == 0)
    }
    /// Returns a reference to data stored inside
    #[must_use]
    pub fn data(&self) -> &[u16] {
        &self.data
    }
    fn trimmed(&self) -> &[u16] {
        let end = self.data.iter().position(|v| *v == 0).unwrap_or(SIZE);
        &self.data[..end]
    }

    pub(crate) fn read_le(cur: &mut Cursor) -> CtrResult<Self> {
        let mut data = [0u16; SIZE];
        for ch in &mut data {
            *ch = cur.read_u16::<LittleEndian>()?;
        }
        Ok(Self { data })
    }
    pub(crate) fn write_le<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for ch in &self.data {
            w.write_u16::<LittleEndian>(*ch)?;
        }
        Ok(())
    }
}

impl<const SIZE: usize> Default for SizedCStringUtf16<SIZE> {
    fn default() -> Self {
        Self { data: [0u16; SIZE] }
    }
}

impl<const SIZE: usize> TryFrom<&str> for SizedCStringUtf16<SIZE> {
    type Error = SizedCStringError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let mut data = [0u16; SIZE];
        for (i, ch) in value.encode_utf16().enumerate() {
            *data.get_mut(i).ok_or(SizedCStringError::TooBig)? = ch;
        }
        Ok(Self { data })
    }
}

impl<const SIZE: usize> fmt::Debug for SizedCString<SIZE> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_fmt(format_args!("\"{}\"", self.to_string_lossy()))
    }
}

impl<const SIZE: usize> fmt::Debug for SizedCStringUtf16<SIZE> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_fmt(format_args!("\"{}\"", self.to_string_lossy()))
    }
}

impl<const SIZE: usize> fmt::Display for SizedCString<SIZE> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(&self.to_string_lossy())
    }
}
