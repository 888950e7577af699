//! Driving adapters: the CSV batch driver used by the binary.

pub mod batch;
pub mod csv;
