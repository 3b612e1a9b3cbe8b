// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/quakewatch

//! Error types

use thiserror::Error;

/// Waveform buffer failures. All are raised synchronously at the call that
/// violates the precondition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BufferError {
    /// Computed slot count was not positive
    #[error("invalid buffer configuration: {sample_rate} sps for {seconds} s gives no slots")]
    InvalidConfiguration { sample_rate: f64, seconds: f64 },

    /// Index query on a buffer that never received a sample
    #[error("buffer is empty")]
    EmptyBuffer,

    /// Extraction window with `end <= start`
    #[error("invalid range: end {end} is not after start {start}")]
    InvalidRange { start: i64, end: i64 },

    /// Raw or filtered channel requested from a server-mode buffer
    #[error("raw and filtered channels are not stored in server mode")]
    UnsupportedInServerMode,
}

/// Engine-level failures (configuration, worker pool, I/O)
#[derive(Debug, Error)]
pub enum QuakeError {
    #[error("config: {0}")]
    Config(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("toml parse: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("toml write: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Buffer(#[from] BufferError),
}

impl QuakeError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result alias for engine operations
pub type Result<T> = std::result::Result<T, QuakeError>;
