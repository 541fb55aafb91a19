#![deny(unsafe_op_in_unsafe_fn)]

pub mod blob;
pub mod matrix;
pub mod metrics;
pub mod writer;
