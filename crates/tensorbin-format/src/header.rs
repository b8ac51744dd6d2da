use std::io::{self, Read, Write};

use tensorbin_core::{DType, Shape};

use crate::{FormatError, Result};

/// The `dim_num` and extent fields that open every record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordHeader {
    shape: Shape,
}

impl RecordHeader {
    /// Header for `shape`; rank and every extent must fit an `i32`.
    pub fn for_shape(shape: &Shape) -> Result<Self> {
        let fits = |n: usize| i32::try_from(n).is_ok();
        if !fits(shape.rank()) || !shape.dims().iter().all(|&d| fits(d)) {
            return Err(FormatError::ShapeOverflow(shape.dims().to_vec()));
        }
        Ok(Self {
            shape: shape.clone(),
        })
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn into_shape(self) -> Shape {
        self.shape
    }

    /// Bytes taken by `dim_num` and the extents.
    pub fn encoded_len(&self) -> u64 {
        4 + 4 * self.shape.rank() as u64
    }

    /// Bytes the data region must hold for `dtype`.
    pub fn data_len(&self, dtype: DType) -> Result<u64> {
        self.shape
            .dims()
            .iter()
            .try_fold(dtype.byte_size() as u64, |acc, &d| acc.checked_mul(d as u64))
            .filter(|&len| usize::try_from(len).is_ok())
            .ok_or_else(|| {
                FormatError::malformed(format!(
                    "shape {} of {dtype} is too large to address",
                    self.shape
                ))
            })
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let mut buf = Vec::with_capacity(self.encoded_len() as usize);
        buf.extend_from_slice(&(self.shape.rank() as i32).to_le_bytes());
        for &d in self.shape.dims() {
            buf.extend_from_slice(&(d as i32).to_le_bytes());
        }
        writer.write_all(&buf)
    }

    /// Parse a header. `available` is the total record length when known and
    /// lets an oversized `dim_num` fail before any extent is read.
    pub fn read_from<R: Read>(mut reader: R, available: Option<u64>) -> Result<Self> {
        let dim_num = read_i32(&mut reader, "dimension count")?;
        if dim_num < 0 {
            return Err(FormatError::malformed(format!(
                "negative dimension count {dim_num}"
            )));
        }

        let header_len = 4 + 4 * dim_num as u64;
        if let Some(available) = available {
            if header_len > available {
                return Err(FormatError::malformed(format!(
                    "header declares {dim_num} dimensions but the record is only {available} bytes"
                )));
            }
        }

        let mut dims = Vec::new();
        for axis in 0..dim_num {
            let extent = read_i32(&mut reader, "shape")?;
            if extent < 0 {
                return Err(FormatError::malformed(format!(
                    "negative extent {extent} for dimension {axis}"
                )));
            }
            dims.push(extent as usize);
        }

        Ok(Self {
            shape: Shape::from(dims),
        })
    }
}

fn read_i32<R: Read>(reader: &mut R, field: &str) -> Result<i32> {
    let mut raw = [0u8; 4];
    read_exact_or_malformed(reader, &mut raw, field)?;
    Ok(i32::from_le_bytes(raw))
}

/// `read_exact` that reports running out of input as a malformed record.
pub(crate) fn read_exact_or_malformed<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    field: &str,
) -> Result<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            FormatError::malformed(format!("truncated {field}"))
        } else {
            FormatError::Io(e)
        }
    })
}
