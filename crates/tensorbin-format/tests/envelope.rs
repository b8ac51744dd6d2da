use anyhow::Result;
use half::bf16;
use tensorbin_core::{DType, Shape, Tensor};
use tensorbin_format::{
    inspect, read_tagged, read_tensor, write_tagged, write_tensor, ErrorKind, FormatError,
    PREAMBLE_LEN,
};

fn fixture() -> Result<Tensor> {
    let values: Vec<bf16> = (0..12).map(|i| bf16::from_f32(i as f32 - 6.0)).collect();
    Ok(Tensor::from_vec(Shape::from([3, 4]), values)?)
}

#[test]
fn tagged_file_needs_no_type() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("t.bin");
    let tensor = fixture()?;
    write_tagged(&path, &tensor)?;

    assert_eq!(read_tagged(&path, None)?, tensor);
    assert_eq!(read_tagged(&path, Some(DType::BF16))?, tensor);
    Ok(())
}

#[test]
fn tagged_file_rejects_conflicting_type() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("t.bin");
    write_tagged(&path, &fixture()?)?;

    let err = read_tagged(&path, Some(DType::F32)).unwrap_err();
    assert!(matches!(
        err,
        FormatError::TypeMismatch {
            stored: DType::BF16,
            expected: DType::F32
        }
    ));
    Ok(())
}

#[test]
fn legacy_file_reads_through_envelope_reader() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("legacy.bin");
    let tensor = fixture()?;
    write_tensor(&path, &tensor)?;

    assert_eq!(read_tagged(&path, Some(DType::BF16))?, tensor);
    let err = read_tagged(&path, None).unwrap_err();
    assert!(matches!(err, FormatError::MissingType));
    Ok(())
}

#[test]
fn envelope_wraps_legacy_record_verbatim() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let legacy = dir.path().join("legacy.bin");
    let tagged = dir.path().join("tagged.bin");
    let tensor = fixture()?;
    write_tensor(&legacy, &tensor)?;
    write_tagged(&tagged, &tensor)?;

    let legacy = std::fs::read(&legacy)?;
    let tagged = std::fs::read(&tagged)?;
    assert_eq!(&tagged[..PREAMBLE_LEN as usize], b"TBIN\x01\x01\x00\x00");
    assert_eq!(&tagged[PREAMBLE_LEN as usize..], &legacy[..]);
    Ok(())
}

#[test]
fn legacy_reader_does_not_accept_tagged_files() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("t.bin");
    write_tagged(&path, &fixture()?)?;
    let err = read_tensor(&path, DType::BF16).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Malformed);
    Ok(())
}

#[test]
fn truncated_tagged_file_is_malformed() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("t.bin");
    write_tagged(&path, &fixture()?)?;
    let bytes = std::fs::read(&path)?;
    for cut in 1..=bytes.len() {
        std::fs::write(&path, &bytes[..bytes.len() - cut])?;
        let err = read_tagged(&path, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed, "cut {cut}: {err}");
    }
    Ok(())
}

#[test]
fn inspect_reports_headers() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let legacy = dir.path().join("legacy.bin");
    let tagged = dir.path().join("tagged.bin");
    let tensor = Tensor::from_vec(Shape::from([2, 3]), vec![0f32; 6])?;
    write_tensor(&legacy, &tensor)?;
    write_tagged(&tagged, &tensor)?;

    let info = inspect(&legacy)?;
    assert_eq!(info.tagged, None);
    assert_eq!(info.shape, Shape::from([2, 3]));
    assert_eq!(info.header_len, 12);
    assert_eq!(info.data_len, 24);
    assert!(info.fits(DType::F32));
    assert!(!info.fits(DType::F64));
    assert_eq!(info.candidate_dtypes(), vec![DType::F32, DType::I32]);

    let info = inspect(&tagged)?;
    assert_eq!(info.tagged, Some(DType::F32));
    assert_eq!(info.header_len, 20);
    assert_eq!(info.data_len, 24);
    Ok(())
}
