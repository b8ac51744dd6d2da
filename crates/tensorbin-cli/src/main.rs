mod cli;
mod random;

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use half::bf16;
use tensorbin_core::{DType, Shape, Tensor};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    std::env::set_var("RUST_LOG", &cli.log);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Inspect { path, dtype } => inspect(&path, dtype),
        Command::Dump { path, dtype, limit } => dump(&path, dtype, limit),
        Command::Random {
            path,
            dtype,
            shape,
            min,
            max,
            seed,
            tagged,
        } => {
            let tensor =
                random::uniform_tensor(dtype, Shape::from(shape), min, max, seed)?;
            write(&path, &tensor, tagged)
        }
        Command::Tag { src, dst, dtype } => {
            let tensor = tensorbin_format::read_tensor(&src, dtype)
                .with_context(|| format!("failed to read {}", src.display()))?;
            write(&dst, &tensor, true)
        }
    }
}

fn inspect(path: &Path, dtype: Option<DType>) -> Result<()> {
    let info = tensorbin_format::inspect(path)
        .with_context(|| format!("failed to inspect {}", path.display()))?;

    match info.tagged {
        Some(stored) => println!("format: tagged ({stored})"),
        None => println!("format: legacy"),
    }
    println!("rank: {}", info.shape.rank());
    println!("shape: {}", info.shape);
    match info.shape.checked_numel() {
        Some(n) => println!("elements: {n}"),
        None => println!("elements: overflow"),
    }
    println!("data bytes: {}", info.data_len);

    match dtype.or(info.tagged) {
        Some(dtype) if info.fits(dtype) => println!("data matches {dtype}"),
        Some(dtype) => bail!(
            "data region of {} bytes does not match shape {} of {dtype}",
            info.data_len,
            info.shape
        ),
        None => {
            let names: Vec<&str> = info.candidate_dtypes().iter().map(|d| d.name()).collect();
            if names.is_empty() {
                println!("no supported element type fits the data region");
            } else {
                println!("data fits: {}", names.join(", "));
            }
        }
    }
    Ok(())
}

fn dump(path: &Path, dtype: Option<DType>, limit: usize) -> Result<()> {
    let tensor = tensorbin_format::read_tagged(path, dtype)
        .with_context(|| format!("failed to read {}", path.display()))?;

    println!("dtype: {}", tensor.dtype());
    println!("shape: {}", tensor.shape());
    let values = format_values(&tensor, limit)?;
    let more = tensor.numel().saturating_sub(values.len());
    if more > 0 {
        println!("values: [{}, ... {more} more]", values.join(", "));
    } else {
        println!("values: [{}]", values.join(", "));
    }
    Ok(())
}

fn format_values(tensor: &Tensor, limit: usize) -> Result<Vec<String>> {
    fn take<T: ToString>(values: Vec<T>, limit: usize) -> Vec<String> {
        values.iter().take(limit).map(T::to_string).collect()
    }

    let values = match tensor.dtype() {
        DType::BF16 => take(tensor.to_vec::<bf16>()?, limit),
        DType::F32 => take(tensor.to_vec::<f32>()?, limit),
        DType::F64 => take(tensor.to_vec::<f64>()?, limit),
        DType::I32 => take(tensor.to_vec::<i32>()?, limit),
        DType::I64 => take(tensor.to_vec::<i64>()?, limit),
        other => bail!("cannot print {other} values"),
    };
    Ok(values)
}

fn write(path: &Path, tensor: &Tensor, tagged: bool) -> Result<()> {
    let written = if tagged {
        tensorbin_format::write_tagged(path, tensor)
    } else {
        tensorbin_format::write_tensor(path, tensor)
    };
    written.with_context(|| format!("failed to write {}", path.display()))?;

    tracing::info!(
        path = %path.display(),
        dtype = %tensor.dtype(),
        shape = %tensor.shape(),
        tagged,
        "record written"
    );
    Ok(())
}
