use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use half::bf16;
use tensorbin_core::{DType, Shape, Tensor, TensorError};
use tracing::debug;

use crate::wire::{self, ensure_supported};
use crate::{FormatError, RecordHeader, Result};

/// Serialize `tensor` as a legacy record into `writer`.
///
/// Strided tensors are materialized row-major first. Nothing is written if
/// the element type or shape cannot be represented.
pub fn encode_to<W: Write>(mut writer: W, tensor: &Tensor) -> Result<()> {
    let record = encode_record(tensor)?;
    writer.write_all(&record)?;
    Ok(())
}

/// Write `tensor` to `path`, creating or truncating the file.
pub fn write_tensor(path: impl AsRef<Path>, tensor: &Tensor) -> Result<()> {
    let path = path.as_ref();
    let record = encode_record(tensor)?;
    write_file(path, &[&record])?;

    debug!(
        path = %path.display(),
        dtype = %tensor.dtype(),
        shape = %tensor.shape(),
        bytes = record.len(),
        "wrote tensor record"
    );
    Ok(())
}

/// Write bf16 values as a record; the data region holds each value's bits.
pub fn write_bf16(path: impl AsRef<Path>, shape: &Shape, values: &[bf16]) -> Result<()> {
    let path = path.as_ref();
    let header = RecordHeader::for_shape(shape)?;
    let expected = header.data_len(DType::BF16)? as usize;
    if values.len() * 2 != expected {
        return Err(TensorError::LengthMismatch {
            dtype: DType::BF16,
            shape: shape.dims().to_vec(),
            expected,
            actual: values.len() * 2,
        }
        .into());
    }

    let bits: Vec<u16> = values.iter().map(|v| v.to_bits()).collect();
    let mut record = Vec::with_capacity(header.encoded_len() as usize + expected);
    header.write_to(&mut record)?;
    wire::encode_slice(&bits, &mut record);
    write_file(path, &[&record])?;

    debug!(path = %path.display(), shape = %shape, "wrote bf16 tensor record");
    Ok(())
}

/// Decode a legacy record of `dtype` from `reader`.
///
/// The reader must end where the data region ends; trailing bytes are
/// reported as malformed.
pub fn decode_from<R: Read>(reader: R, dtype: DType) -> Result<Tensor> {
    decode_record(reader, dtype, None)
}

/// Read a legacy record of `dtype` from `path`.
///
/// The file length is checked against the header before the data region is
/// read, so truncated files fail without allocating for the declared size.
pub fn read_tensor(path: impl AsRef<Path>, dtype: DType) -> Result<Tensor> {
    let path = path.as_ref();
    ensure_supported(dtype)?;

    let file = File::open(path)?;
    let len = file.metadata()?.len();
    let tensor = decode_record(BufReader::new(file), dtype, Some(len))?;

    debug!(
        path = %path.display(),
        dtype = %dtype,
        shape = %tensor.shape(),
        bytes = len,
        "read tensor record"
    );
    Ok(tensor)
}

/// Read a bf16 record; each stored `u16` becomes the bf16 with those bits.
pub fn read_bf16(path: impl AsRef<Path>) -> Result<Tensor> {
    read_tensor(path, DType::BF16)
}

pub(crate) fn encode_record(tensor: &Tensor) -> Result<Vec<u8>> {
    ensure_supported(tensor.dtype())?;
    let header = RecordHeader::for_shape(tensor.shape())?;

    let mut record = Vec::with_capacity(header.encoded_len() as usize + tensor.byte_len());
    header.write_to(&mut record)?;
    match tensor.dtype() {
        DType::BF16 => {
            let bits: Vec<u16> = tensor
                .to_vec::<bf16>()?
                .into_iter()
                .map(bf16::to_bits)
                .collect();
            wire::encode_slice(&bits, &mut record);
        }
        DType::F32 => wire::encode_slice(&tensor.to_vec::<f32>()?, &mut record),
        DType::F64 => wire::encode_slice(&tensor.to_vec::<f64>()?, &mut record),
        DType::I32 => wire::encode_slice(&tensor.to_vec::<i32>()?, &mut record),
        DType::I64 => wire::encode_slice(&tensor.to_vec::<i64>()?, &mut record),
        other => return Err(FormatError::UnsupportedType(other)),
    }
    Ok(record)
}

/// `available` is the number of bytes from the start of the record to the
/// end of input, when known.
pub(crate) fn decode_record<R: Read>(
    mut reader: R,
    dtype: DType,
    available: Option<u64>,
) -> Result<Tensor> {
    ensure_supported(dtype)?;

    let header = RecordHeader::read_from(&mut reader, available)?;
    let data_len = header.data_len(dtype)?;
    if let Some(available) = available {
        let remaining = available.saturating_sub(header.encoded_len());
        if remaining < data_len {
            return Err(FormatError::malformed(format!(
                "shape {} of {dtype} needs {data_len} data bytes, record holds {remaining}",
                header.shape()
            )));
        }
        if remaining > data_len {
            return Err(FormatError::malformed(format!(
                "{} bytes follow the data region",
                remaining - data_len
            )));
        }
    }

    let data = read_data(&mut reader, data_len)?;
    let shape = header.into_shape();
    let tensor = match dtype {
        DType::BF16 => {
            let bits: Vec<u16> = wire::decode_slice(&data);
            let values: Vec<bf16> = bits.into_iter().map(bf16::from_bits).collect();
            Tensor::from_vec(shape, values)?
        }
        DType::F32 => Tensor::from_vec(shape, wire::decode_slice::<f32>(&data))?,
        DType::F64 => Tensor::from_vec(shape, wire::decode_slice::<f64>(&data))?,
        DType::I32 => Tensor::from_vec(shape, wire::decode_slice::<i32>(&data))?,
        DType::I64 => Tensor::from_vec(shape, wire::decode_slice::<i64>(&data))?,
        other => return Err(FormatError::UnsupportedType(other)),
    };
    Ok(tensor)
}

fn read_data<R: Read>(reader: &mut R, len: u64) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    reader.by_ref().take(len).read_to_end(&mut data)?;
    if (data.len() as u64) < len {
        return Err(FormatError::malformed(format!(
            "data region is {} bytes, header declares {len}",
            data.len()
        )));
    }

    let mut probe = [0u8; 1];
    if reader.read(&mut probe)? != 0 {
        return Err(FormatError::malformed("bytes follow the data region"));
    }
    Ok(data)
}

pub(crate) fn write_file(path: &Path, parts: &[&[u8]]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for part in parts {
        writer.write_all(part)?;
    }
    writer.flush()?;
    Ok(())
}
