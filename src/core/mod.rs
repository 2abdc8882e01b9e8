//! Core library modules for butterfly-sumo
//!
//! This module contains the internal implementation details of the butterfly-sumo library.

pub mod config;
pub mod error;
pub mod graph;
pub mod record;
pub mod toolchain;
pub mod xml;
