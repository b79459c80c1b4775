//! Addresses of vesting, vault and associated vesting accounts.
//!
//! Program-derived address search is delegated to `solana-program`; the
//! helpers here only fix the seed layout each program expects.

pub use solana_program::pubkey::{Pubkey, PUBKEY_BYTES};

use crate::error::VestingError;

/// Token account owned by `wallet` for `mint`.
pub fn associated_token_address(wallet: &Pubkey, mint: &Pubkey) -> Pubkey {
    spl_associated_token_account::get_associated_token_address(wallet, mint)
}

/// Vesting account for a 32-byte seed.
///
/// Only the first 31 bytes take part in the derivation; the returned bump is
/// what callers store in `seed[31]` before handing the seed to the program.
pub fn vesting_account_address(
    seed: &[u8; 32],
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), VestingError> {
    Pubkey::try_find_program_address(&[&seed[..31]], program_id).ok_or(VestingError::NoViableBump)
}

/// Associated vesting account of `wallet` for `mint`, owned by the metadata
/// program `program_id`.
pub fn associated_vesting_address(
    wallet: &Pubkey,
    mint: &Pubkey,
    vesting_program: &Pubkey,
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), VestingError> {
    Pubkey::try_find_program_address(
        &[wallet.as_ref(), vesting_program.as_ref(), mint.as_ref()],
        program_id,
    )
    .ok_or(VestingError::NoViableBump)
}
