use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tensorbin_core::DType;

#[derive(Parser, Debug)]
#[command(name = "tensorbin", version, about = "Binary tensor record tool")]
pub struct Cli {
    /// Log level (RUST_LOG)
    #[arg(long, default_value = "warn", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the header of a record
    Inspect {
        path: PathBuf,

        /// Element type to check the data region against
        #[arg(long)]
        dtype: Option<DType>,
    },

    /// Print the shape and leading values of a record
    Dump {
        path: PathBuf,

        /// Element type; required for untagged records
        #[arg(long)]
        dtype: Option<DType>,

        /// Maximum number of values to print
        #[arg(long, default_value_t = 32)]
        limit: usize,
    },

    /// Write a record of uniformly distributed values in [min, max)
    Random {
        path: PathBuf,

        #[arg(long)]
        dtype: DType,

        /// Comma-separated extents; omit for a scalar
        #[arg(long, value_delimiter = ',')]
        shape: Vec<usize>,

        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        min: f64,

        #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
        max: f64,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Write the tagged envelope instead of a legacy record
        #[arg(long)]
        tagged: bool,
    },

    /// Rewrite an untagged record inside the tagged envelope
    Tag {
        src: PathBuf,
        dst: PathBuf,

        /// Element type of the untagged source
        #[arg(long)]
        dtype: DType,
    },
}
