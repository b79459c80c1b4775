pub use solana_program::instruction::{AccountMeta, Instruction};
use solana_program::{system_program, sysvar};

use crate::codec::{take_u32, U32};
use crate::error::VestingError;
use crate::pubkey::{Pubkey, PUBKEY_BYTES};
use crate::state::Release;

pub const SEED_LEN: usize = 32;

const IX_INIT: u8 = 0;
const IX_CREATE: u8 = 1;
const IX_UNLOCK: u8 = 2;
const IX_CHANGE_BENEFICIARY: u8 = 3;

/// Instructions understood by the vesting program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VestingInstruction {
    /// Allocates the vesting account.
    ///
    /// Accounts expected:
    /// `[s,w]` Payer
    /// `[w]` Vesting account
    /// `[]` System program
    Init {
        seeds: [u8; SEED_LEN],
        number_of_schedules: u32,
    },

    /// Moves tokens into the vault and records the release schedule.
    ///
    /// Accounts expected:
    /// `[]` Token program
    /// `[w]` Vesting account
    /// `[w]` Vesting vault
    /// `[s]` Source token owner
    /// `[w]` Source token account
    Create {
        seeds: [u8; SEED_LEN],
        mint: Pubkey,
        beneficiary: Pubkey,
        schedules: Vec<Release>,
    },

    /// Releases every schedule whose timestamp has passed.
    ///
    /// Accounts expected:
    /// `[]` Token program
    /// `[]` Clock sysvar
    /// `[w]` Vesting account
    /// `[w]` Vesting vault
    /// `[w]` Beneficiary token account
    Unlock { seeds: [u8; SEED_LEN] },

    /// Hands the remaining schedule to a new beneficiary.
    ///
    /// Accounts expected:
    /// `[w]` Vesting account
    /// `[s]` Current beneficiary
    /// `[]` New beneficiary token account
    ChangeBeneficiary { seeds: [u8; SEED_LEN] },
}

impl VestingInstruction {
    pub fn pack(&self) -> Result<Vec<u8>, VestingError> {
        let mut buf = Vec::new();
        match self {
            Self::Init {
                seeds,
                number_of_schedules,
            } => {
                buf.push(IX_INIT);
                buf.extend_from_slice(seeds);
                U32::from(*number_of_schedules).encode_into(&mut buf)?;
            }
            Self::Create {
                seeds,
                mint,
                beneficiary,
                schedules,
            } => {
                buf.reserve(1 + SEED_LEN + 2 * PUBKEY_BYTES + schedules.len() * Release::LEN);
                buf.push(IX_CREATE);
                buf.extend_from_slice(seeds);
                buf.extend_from_slice(mint.as_ref());
                buf.extend_from_slice(beneficiary.as_ref());
                for schedule in schedules {
                    schedule.pack_into(&mut buf)?;
                }
            }
            Self::Unlock { seeds } => {
                buf.push(IX_UNLOCK);
                buf.extend_from_slice(seeds);
            }
            Self::ChangeBeneficiary { seeds } => {
                buf.push(IX_CHANGE_BENEFICIARY);
                buf.extend_from_slice(seeds);
            }
        }
        Ok(buf)
    }

    pub fn unpack(data: &[u8]) -> Result<Self, VestingError> {
        let (tag, rest) = data
            .split_first()
            .ok_or(VestingError::InvalidInstruction("empty payload"))?;
        let (seeds, rest) = take_seeds(rest)?;
        Ok(match *tag {
            IX_INIT => {
                let (number_of_schedules, rest) = take_u32(rest)?;
                expect_end(rest)?;
                Self::Init {
                    seeds,
                    number_of_schedules,
                }
            }
            IX_CREATE => {
                let (mint, rest) = take_pubkey(rest)?;
                let (beneficiary, rest) = take_pubkey(rest)?;
                if rest.len() % Release::LEN != 0 {
                    return Err(VestingError::InvalidInstruction(
                        "schedule data is not a whole number of releases",
                    ));
                }
                let schedules = rest
                    .chunks_exact(Release::LEN)
                    .map(Release::unpack)
                    .collect::<Result<Vec<_>, _>>()?;
                Self::Create {
                    seeds,
                    mint,
                    beneficiary,
                    schedules,
                }
            }
            IX_UNLOCK => {
                expect_end(rest)?;
                Self::Unlock { seeds }
            }
            IX_CHANGE_BENEFICIARY => {
                expect_end(rest)?;
                Self::ChangeBeneficiary { seeds }
            }
            _ => return Err(VestingError::InvalidInstruction("unknown tag")),
        })
    }
}

fn take_seeds(data: &[u8]) -> Result<([u8; SEED_LEN], &[u8]), VestingError> {
    if data.len() < SEED_LEN {
        return Err(VestingError::InvalidInstruction("payload shorter than seeds"));
    }
    let (head, rest) = data.split_at(SEED_LEN);
    let mut seeds = [0u8; SEED_LEN];
    seeds.copy_from_slice(head);
    Ok((seeds, rest))
}

pub(crate) fn take_pubkey(data: &[u8]) -> Result<(Pubkey, &[u8]), VestingError> {
    if data.len() < PUBKEY_BYTES {
        return Err(VestingError::InvalidInstruction("payload shorter than pubkey"));
    }
    let (head, rest) = data.split_at(PUBKEY_BYTES);
    let mut bytes = [0u8; PUBKEY_BYTES];
    bytes.copy_from_slice(head);
    Ok((Pubkey::new_from_array(bytes), rest))
}

fn expect_end(rest: &[u8]) -> Result<(), VestingError> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(VestingError::InvalidInstruction("trailing bytes"))
    }
}

pub fn init(
    program_id: &Pubkey,
    payer: &Pubkey,
    vesting: &Pubkey,
    seeds: [u8; SEED_LEN],
    number_of_schedules: u32,
) -> Result<Instruction, VestingError> {
    let accounts = vec![
        AccountMeta::new(*payer, true),
        AccountMeta::new(*vesting, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    let data = VestingInstruction::Init {
        seeds,
        number_of_schedules,
    }
    .pack()?;
    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn create(
    program_id: &Pubkey,
    source_owner: &Pubkey,
    source_token: &Pubkey,
    vesting: &Pubkey,
    vault: &Pubkey,
    seeds: [u8; SEED_LEN],
    mint: Pubkey,
    beneficiary: Pubkey,
    schedules: Vec<Release>,
) -> Result<Instruction, VestingError> {
    if schedules.is_empty() {
        return Err(VestingError::InvalidInstruction("no release schedules"));
    }
    let accounts = vec![
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new(*vesting, false),
        AccountMeta::new(*vault, false),
        AccountMeta::new_readonly(*source_owner, true),
        AccountMeta::new(*source_token, false),
    ];
    let data = VestingInstruction::Create {
        seeds,
        mint,
        beneficiary,
        schedules,
    }
    .pack()?;
    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

pub fn unlock(
    program_id: &Pubkey,
    vesting: &Pubkey,
    vault: &Pubkey,
    beneficiary_token: &Pubkey,
    seeds: [u8; SEED_LEN],
) -> Result<Instruction, VestingError> {
    let accounts = vec![
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(sysvar::clock::id(), false),
        AccountMeta::new(*vesting, false),
        AccountMeta::new(*vault, false),
        AccountMeta::new(*beneficiary_token, false),
    ];
    let data = VestingInstruction::Unlock { seeds }.pack()?;
    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

pub fn change_beneficiary(
    program_id: &Pubkey,
    vesting: &Pubkey,
    current_beneficiary: &Pubkey,
    new_beneficiary_token: &Pubkey,
    seeds: [u8; SEED_LEN],
) -> Result<Instruction, VestingError> {
    let accounts = vec![
        AccountMeta::new(*vesting, false),
        AccountMeta::new_readonly(*current_beneficiary, true),
        AccountMeta::new_readonly(*new_beneficiary_token, false),
    ];
    let data = VestingInstruction::ChangeBeneficiary { seeds }.pack()?;
    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data,
    })
}

/// Create the associated token account of `wallet` for `mint`, paid by `payer`.
pub fn create_associated_token_account(
    payer: &Pubkey,
    wallet: &Pubkey,
    mint: &Pubkey,
) -> Instruction {
    spl_associated_token_account::instruction::create_associated_token_account(
        payer,
        wallet,
        mint,
        &spl_token::id(),
    )
}
