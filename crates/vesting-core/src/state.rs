use crate::codec::{take_u32, take_u64, U32, U64};
use crate::error::VestingError;
use crate::instruction::take_pubkey;
use crate::pubkey::{Pubkey, PUBKEY_BYTES};

/// One scheduled release: `quantity` base units unlock at `timestamp`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Release {
    pub timestamp: u32,
    pub quantity: u64,
}

impl Release {
    pub const LEN: usize = U32::WIDTH + U64::WIDTH;

    pub fn pack_into(&self, buf: &mut Vec<u8>) -> Result<(), VestingError> {
        U32::from(self.timestamp).encode_into(buf)?;
        U64::from(self.quantity).encode_into(buf)?;
        Ok(())
    }

    pub fn unpack(data: &[u8]) -> Result<Self, VestingError> {
        let (timestamp, rest) = take_u32(data)?;
        let (quantity, rest) = take_u64(rest)?;
        if !rest.is_empty() {
            return Err(VestingError::AccountData("release record too long"));
        }
        Ok(Self {
            timestamp,
            quantity,
        })
    }
}

/// Fixed-size prefix of a vesting account.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VestingHeader {
    pub is_initialized: bool,
    pub beneficiary: Pubkey,
    pub mint: Pubkey,
}

impl VestingHeader {
    pub const LEN: usize = 1 + 2 * PUBKEY_BYTES;

    pub fn pack_into(&self, buf: &mut Vec<u8>) {
        buf.push(self.is_initialized as u8);
        buf.extend_from_slice(self.beneficiary.as_ref());
        buf.extend_from_slice(self.mint.as_ref());
    }

    pub fn unpack(data: &[u8]) -> Result<Self, VestingError> {
        if data.len() != Self::LEN {
            return Err(VestingError::AccountData("vesting header length"));
        }
        let is_initialized = unpack_flag(data[0])?;
        let (beneficiary, rest) = take_pubkey(&data[1..])?;
        let (mint, _) = take_pubkey(rest)?;
        Ok(Self {
            is_initialized,
            beneficiary,
            mint,
        })
    }
}

/// Decoded vesting account: header followed by release records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VestingAccount {
    pub header: VestingHeader,
    pub releases: Vec<Release>,
}

impl VestingAccount {
    pub fn unpack(data: &[u8]) -> Result<Self, VestingError> {
        if data.len() < VestingHeader::LEN {
            return Err(VestingError::AccountData("shorter than vesting header"));
        }
        let (head, tail) = data.split_at(VestingHeader::LEN);
        if tail.len() % Release::LEN != 0 {
            return Err(VestingError::AccountData(
                "release area is not a whole number of records",
            ));
        }
        let header = VestingHeader::unpack(head)?;
        let releases = tail
            .chunks_exact(Release::LEN)
            .map(Release::unpack)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { header, releases })
    }

    pub fn pack(&self) -> Result<Vec<u8>, VestingError> {
        let mut buf = Vec::with_capacity(VestingHeader::LEN + self.releases.len() * Release::LEN);
        self.header.pack_into(&mut buf);
        for release in &self.releases {
            release.pack_into(&mut buf)?;
        }
        Ok(buf)
    }

    /// Quantity whose release time is at or before `now`.
    pub fn unlocked_quantity(&self, now: u32) -> u64 {
        self.releases
            .iter()
            .filter(|release| release.timestamp <= now)
            .fold(0u64, |acc, release| acc.saturating_add(release.quantity))
    }

    /// Quantity still held by the account, released or not.
    pub fn remaining_quantity(&self) -> u64 {
        self.releases
            .iter()
            .fold(0u64, |acc, release| acc.saturating_add(release.quantity))
    }
}

/// Vesting metadata account kept by the metadata program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetadataState {
    pub is_initialized: bool,
    pub authority: Pubkey,
    pub vault: Pubkey,
    pub duration: u64,
    pub apr: u64,
    pub withdrawal_timelock: u64,
    pub early_withdrawal_fee: u64,
    pub lifetime: u64,
}

impl MetadataState {
    pub const LEN: usize = 1 + 2 * PUBKEY_BYTES + 5 * U64::WIDTH;

    pub fn unpack(data: &[u8]) -> Result<Self, VestingError> {
        if data.len() != Self::LEN {
            return Err(VestingError::AccountData("metadata account length"));
        }
        let is_initialized = unpack_flag(data[0])?;
        let (authority, rest) = take_pubkey(&data[1..])?;
        let (vault, rest) = take_pubkey(rest)?;
        let (duration, rest) = take_u64(rest)?;
        let (apr, rest) = take_u64(rest)?;
        let (withdrawal_timelock, rest) = take_u64(rest)?;
        let (early_withdrawal_fee, rest) = take_u64(rest)?;
        let (lifetime, _) = take_u64(rest)?;
        Ok(Self {
            is_initialized,
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

fn unpack_flag(byte: u8) -> Result<bool, VestingError> {
    match byte {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(VestingError::AccountData("initialized flag is not 0 or 1")),
    }
}
