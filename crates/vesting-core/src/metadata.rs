use crate::codec::{take_u64, U64};
use crate::error::VestingError;
use crate::instruction::{take_pubkey, AccountMeta, Instruction};
use crate::pubkey::{Pubkey, PUBKEY_BYTES};

const IX_CREATE: u8 = 0;
const IX_UPDATE: u8 = 1;
const IX_DELETE: u8 = 2;

/// Terms recorded by the metadata program for a vesting vault.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetadataParams {
    pub authority: Pubkey,
    pub vault: Pubkey,
    /// Seconds until rewards are fully realised.
    pub duration: u64,
    /// Interest generated over twelve months.
    pub apr: u64,
    pub withdrawal_timelock: u64,
    pub early_withdrawal_fee: u64,
    pub lifetime: u64,
}

impl MetadataParams {
    pub const LEN: usize = 2 * PUBKEY_BYTES + 5 * U64::WIDTH;

    fn pack_into(&self, buf: &mut Vec<u8>) -> Result<(), VestingError> {
        buf.extend_from_slice(self.authority.as_ref());
        buf.extend_from_slice(self.vault.as_ref());
        for field in [
            self.duration,
            self.apr,
            self.withdrawal_timelock,
            self.early_withdrawal_fee,
            self.lifetime,
        ] {
            U64::from(field).encode_into(buf)?;
        }
        Ok(())
    }

    fn unpack(data: &[u8]) -> Result<Self, VestingError> {
        if data.len() != Self::LEN {
            return Err(VestingError::InvalidInstruction("metadata params length"));
        }
        let (authority, rest) = take_pubkey(data)?;
        let (vault, rest) = take_pubkey(rest)?;
        let (duration, rest) = take_u64(rest)?;
        let (apr, rest) = take_u64(rest)?;
        let (withdrawal_timelock, rest) = take_u64(rest)?;
        let (early_withdrawal_fee, rest) = take_u64(rest)?;
        let (lifetime, _) = take_u64(rest)?;
        Ok(Self {
            authority,
            vault,
            duration,
            apr,
            withdrawal_timelock,
            early_withdrawal_fee,
            lifetime,
        })
    }
}

/// Instructions of the metadata program. Every variant expects:
/// `[s,w]` Transaction authority
/// `[w]` Metadata account
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetadataInstruction {
    Create(MetadataParams),
    Update(MetadataParams),
    Delete(MetadataParams),
}

impl MetadataInstruction {
    pub fn pack(&self) -> Result<Vec<u8>, VestingError> {
        let (tag, params) = match self {
            Self::Create(params) => (IX_CREATE, params),
            Self::Update(params) => (IX_UPDATE, params),
            Self::Delete(params) => (IX_DELETE, params),
        };
        let mut buf = Vec::with_capacity(1 + MetadataParams::LEN);
        buf.push(tag);
        params.pack_into(&mut buf)?;
        Ok(buf)
    }

    pub fn unpack(data: &[u8]) -> Result<Self, VestingError> {
        let (tag, rest) = data
            .split_first()
            .ok_or(VestingError::InvalidInstruction("empty payload"))?;
        let params = MetadataParams::unpack(rest)?;
        match *tag {
            IX_CREATE => Ok(Self::Create(params)),
            IX_UPDATE => Ok(Self::Update(params)),
            IX_DELETE => Ok(Self::Delete(params)),
            _ => Err(VestingError::InvalidInstruction("unknown tag")),
        }
    }
}

fn build(
    program_id: &Pubkey,
    tx_authority: &Pubkey,
    metadata: &Pubkey,
    instruction: MetadataInstruction,
) -> Result<Instruction, VestingError> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*tx_authority, true),
            AccountMeta::new(*metadata, false),
        ],
        data: instruction.pack()?,
    })
}

pub fn create(
    program_id: &Pubkey,
    tx_authority: &Pubkey,
    metadata: &Pubkey,
    params: MetadataParams,
) -> Result<Instruction, VestingError> {
    build(program_id, tx_authority, metadata, MetadataInstruction::Create(params))
}

pub fn update(
    program_id: &Pubkey,
    tx_authority: &Pubkey,
    metadata: &Pubkey,
    params: MetadataParams,
) -> Result<Instruction, VestingError> {
    build(program_id, tx_authority, metadata, MetadataInstruction::Update(params))
}

pub fn delete(
    program_id: &Pubkey,
    tx_authority: &Pubkey,
    metadata: &Pubkey,
    params: MetadataParams,
) -> Result<Instruction, VestingError> {
    build(program_id, tx_authority, metadata, MetadataInstruction::Delete(params))
}
