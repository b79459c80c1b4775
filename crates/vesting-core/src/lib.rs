//! Core primitives for the token-vesting client.
//!
//! This crate exposes the building blocks that the `vesting` command line
//! tool combines into ledger transactions:
//!
//! * [`codec`]: fixed-width little-endian encoding of unsigned integers,
//!   used for every numeric field of an instruction payload.
//! * [`pubkey`]: vesting, vault and associated vesting addresses.
//! * [`instruction`]: vesting program instructions and their account lists.
//! * [`metadata`]: vesting metadata program instructions.
//! * [`state`]: decoding of on-ledger vesting and metadata accounts.
//!
//! Addresses, instructions and program-derived address search come from
//! `solana-program`; transaction compilation and signing are left to the
//! caller's ledger SDK. Nothing in here performs I/O.

pub mod codec;
pub mod instruction;
pub mod metadata;
pub mod pubkey;
pub mod state;

mod error;

pub use error::{CodecError, VestingError};
