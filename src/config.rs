//! Server configuration
//!
//! Each setting is resolved in order: command-line flag, `NOTAS_*`
//! environment variable, built-in default.

use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_BIND: &str = "127.0.0.1:5000";
pub const DEFAULT_DB: &str = "notas_fiscais.db";
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_OUTPUT_DIR: &str = "converted";
pub const DEFAULT_MAX_UPLOAD_MB: usize = 64;

#[derive(Debug, Default, Parser)]
#[command(name = "notas-server", version, about = "PDF table extraction and invoice records HTTP API")]
pub struct ServerArgs {
    /// Address to listen on [env: NOTAS_BIND] [default: 127.0.0.1:5000]
    #[arg(long)]
    pub bind: Option<String>,

    /// SQLite database path [env: NOTAS_DB] [default: notas_fiscais.db]
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Where uploaded PDFs are stored [env: NOTAS_UPLOAD_DIR] [default: uploads]
    #[arg(long)]
    pub upload_dir: Option<PathBuf>,

    /// Where generated spreadsheets are written [env: NOTAS_OUTPUT_DIR] [default: converted]
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Largest accepted request body in MiB [env: NOTAS_MAX_UPLOAD_MB] [default: 64]
    #[arg(long)]
    pub max_upload_mb: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind: String,
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            db_path: PathBuf::from(DEFAULT_DB),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Resolve against the process environment.
    pub fn from_args(args: ServerArgs) -> Self {
        Self::resolve(args, |key| std::env::var(key).ok())
    }

    /// Resolve with an explicit environment lookup. Empty values count as unset.
    pub fn resolve(args: ServerArgs, env: impl Fn(&str) -> Option<String>) -> Self {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let max_upload_bytes = args.max_upload_mb
            .or_else(|| {
                let raw = env("NOTAS_MAX_UPLOAD_MB")?;
                match raw.trim().parse() {
                    Ok(mb) => Some(mb),
                    Err(_) => {
                        tracing::warn!(value = %raw, "ignoring invalid NOTAS_MAX_UPLOAD_MB");
                        None
                    }
                }
            })
            .map(|mb: usize| mb.saturating_mul(1024 * 1024))
            .unwrap_or(defaults.max_upload_bytes);

        Self {
            bind: args.bind
                .or_else(|| env("NOTAS_BIND"))
                .unwrap_or(defaults.bind),
            db_path: args.db
                .or_else(|| env("NOTAS_DB").map(PathBuf::from))
                .unwrap_or(defaults.db_path),
            upload_dir: args.upload_dir
                .or_else(|| env("NOTAS_UPLOAD_DIR").map(PathBuf::from))
                .unwrap_or(defaults.upload_dir),
            output_dir: args.output_dir
                .or_else(|| env("NOTAS_OUTPUT_DIR").map(PathBuf::from))
                .unwrap_or(defaults.output_dir),
            max_upload_bytes,
        }
    }
}
