// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/quakewatch

//! Analysis module - waveform buffers and station triggers

mod buffer;
mod station;

pub use buffer::*;
pub use station::*;
