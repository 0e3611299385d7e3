//! Contract bindings for the ERC-4337 pipeline

pub mod account;
pub mod entry_point;

pub use account::*;
pub use entry_point::*;
