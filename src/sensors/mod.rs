// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/quakewatch

//! Sensor module - stations and the synthetic network

mod station;
mod simulator;

pub use station::*;
pub use simulator::{NetworkSimulator, SyntheticQuake};
