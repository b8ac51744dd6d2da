//! Self-describing wrapper around a legacy record.
//!
//! ```text
//! offset 0  [u8; 4]  magic   b"TBIN"
//! offset 4  u8       version 1
//! offset 5  u8       dtype tag
//! offset 6  [u8; 2]  reserved, zero
//! offset 8  legacy record
//! ```
//!
//! Read as a legacy `dim_num`, the magic is 1_313_423_956, so tagged and
//! legacy files cannot be confused for any plausible rank.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Write};
use std::path::Path;

use tensorbin_core::{DType, Shape, Tensor};
use tracing::debug;

use crate::codec::{decode_record, encode_record, write_file};
use crate::header::read_exact_or_malformed;
use crate::{FormatError, RecordHeader, Result};

pub const MAGIC: [u8; 4] = *b"TBIN";
pub const VERSION: u8 = 1;
pub const PREAMBLE_LEN: u64 = 8;

pub fn dtype_tag(dtype: DType) -> Result<u8> {
    match dtype {
        DType::BF16 => Ok(1),
        DType::F32 => Ok(2),
        DType::F64 => Ok(3),
        DType::I32 => Ok(4),
        DType::I64 => Ok(5),
        other => Err(FormatError::UnsupportedType(other)),
    }
}

pub fn dtype_from_tag(tag: u8) -> Result<DType> {
    match tag {
        1 => Ok(DType::BF16),
        2 => Ok(DType::F32),
        3 => Ok(DType::F64),
        4 => Ok(DType::I32),
        5 => Ok(DType::I64),
        _ => Err(FormatError::malformed(format!("unknown dtype tag {tag}"))),
    }
}

fn preamble(dtype: DType) -> Result<[u8; 8]> {
    let [m0, m1, m2, m3] = MAGIC;
    Ok([m0, m1, m2, m3, VERSION, dtype_tag(dtype)?, 0, 0])
}

pub fn encode_tagged_to<W: Write>(mut writer: W, tensor: &Tensor) -> Result<()> {
    let preamble = preamble(tensor.dtype())?;
    let record = encode_record(tensor)?;
    writer.write_all(&preamble)?;
    writer.write_all(&record)?;
    Ok(())
}

/// Write `tensor` to `path` inside the tagged envelope.
pub fn write_tagged(path: impl AsRef<Path>, tensor: &Tensor) -> Result<()> {
    let path = path.as_ref();
    let preamble = preamble(tensor.dtype())?;
    let record = encode_record(tensor)?;
    write_file(path, &[&preamble, &record])?;

    debug!(
        path = %path.display(),
        dtype = %tensor.dtype(),
        shape = %tensor.shape(),
        "wrote tagged tensor record"
    );
    Ok(())
}

/// Decode a tagged or legacy record from `reader`.
///
/// A tagged record decides its own type; `dtype`, if given, must agree. A
/// legacy record needs `dtype`.
pub fn decode_any_from<R: Read>(reader: R, dtype: Option<DType>) -> Result<Tensor> {
    decode_any(reader, dtype, None)
}

pub fn read_tagged(path: impl AsRef<Path>, dtype: Option<DType>) -> Result<Tensor> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let len = file.metadata()?.len();
    let tensor = decode_any(BufReader::new(file), dtype, Some(len))?;

    debug!(
        path = %path.display(),
        dtype = %tensor.dtype(),
        shape = %tensor.shape(),
        "read tensor record"
    );
    Ok(tensor)
}

fn decode_any<R: Read>(mut reader: R, dtype: Option<DType>, available: Option<u64>) -> Result<Tensor> {
    let mut magic = [0u8; 4];
    read_exact_or_malformed(&mut reader, &mut magic, "dimension count")?;

    if magic != MAGIC {
        let dtype = dtype.ok_or(FormatError::MissingType)?;
        return decode_record(Cursor::new(magic).chain(reader), dtype, available);
    }

    let stored = read_preamble_tail(&mut reader)?;
    if let Some(expected) = dtype {
        if expected != stored {
            return Err(FormatError::TypeMismatch { stored, expected });
        }
    }
    decode_record(reader, stored, available.map(|n| n.saturating_sub(PREAMBLE_LEN)))
}

fn read_preamble_tail<R: Read>(reader: &mut R) -> Result<DType> {
    let mut tail = [0u8; 4];
    read_exact_or_malformed(reader, &mut tail, "envelope preamble")?;
    let [version, tag, r0, r1] = tail;
    if version != VERSION {
        return Err(FormatError::malformed(format!(
            "unsupported envelope version {version}"
        )));
    }
    if r0 != 0 || r1 != 0 {
        return Err(FormatError::malformed("reserved envelope bytes are not zero"));
    }
    dtype_from_tag(tag)
}

/// Header-level description of a record file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordInfo {
    /// Stored element type, `None` for a legacy record.
    pub tagged: Option<DType>,
    pub shape: Shape,
    /// Envelope preamble plus record header.
    pub header_len: u64,
    /// Bytes after the header.
    pub data_len: u64,
}

impl RecordInfo {
    /// Whether the data region has exactly the size `dtype` calls for.
    pub fn fits(&self, dtype: DType) -> bool {
        RecordHeader::for_shape(&self.shape)
            .and_then(|h| h.data_len(dtype))
            .is_ok_and(|len| len == self.data_len)
    }

    /// Element types whose width matches the data region.
    pub fn candidate_dtypes(&self) -> Vec<DType> {
        crate::SUPPORTED_DTYPES
            .into_iter()
            .filter(|&d| self.fits(d))
            .collect()
    }
}

/// Read only the preamble and header of the record at `path`.
pub fn inspect(path: impl AsRef<Path>) -> Result<RecordInfo> {
    let file = File::open(path.as_ref())?;
    let len = file.metadata()?.len();
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 4];
    read_exact_or_malformed(&mut reader, &mut magic, "dimension count")?;

    let (tagged, header) = if magic == MAGIC {
        let stored = read_preamble_tail(&mut reader)?;
        let header = RecordHeader::read_from(&mut reader, Some(len - PREAMBLE_LEN))?;
        (Some(stored), header)
    } else {
        let header = RecordHeader::read_from(Cursor::new(magic).chain(&mut reader), Some(len))?;
        (None, header)
    };

    let header_len = header.encoded_len() + if tagged.is_some() { PREAMBLE_LEN } else { 0 };
    Ok(RecordInfo {
        tagged,
        header_len,
        data_len: len - header_len,
        shape: header.into_shape(),
    })
}
