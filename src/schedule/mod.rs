use chrono::{Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use vesting_core::state::Release;

pub const SECONDS_PER_DAY: i64 = 86_400;
/// Mean Gregorian year, used for the team cliff.
pub const SECONDS_PER_YEAR: i64 = 31_556_952;

const MONTHS_PER_YEAR: u32 = 12;

/// Most releases a single create transaction can carry within the packet
/// limit, next to the init and token-account instructions.
pub const MAX_RELEASES: u32 = 48;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ScheduleError {
    #[error("tier {tier} has no release periods")]
    NoPeriods { tier: String },
    #[error("allocation is zero base units")]
    ZeroAllocation,
    #[error("allocation {0} does not fit in a u64 of base units")]
    AllocationOverflow(f64),
    #[error("tier {tier} needs a positive price")]
    InvalidPrice { tier: String },
    #[error("release timestamp {0} is outside the 32-bit range")]
    TimestampOverflow(i64),
    #[error("{periods} releases exceed the limit of {MAX_RELEASES}")]
    TooManyPeriods { periods: u32 },
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Group {
    /// One-year cliff, then equal monthly releases.
    Team,
    /// Ten percent up front, the rest in equal monthly releases.
    Private,
}

/// Investor tier as configured.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Tier {
    pub id: u8,
    pub name: String,
    pub group: Group,
    /// Total vesting length, cliff included.
    pub vesting_months: u32,
    /// Price per token in the currency of the purchase amount; `None` means
    /// the amount is already a token count.
    #[serde(default)]
    pub price: Option<f64>,
}

/// Resolved release plan for one beneficiary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TierPlan {
    pub group: Group,
    pub periods: u32,
    /// Allocation in base units.
    pub allocation: u64,
}

impl Tier {
    /// Number of releases: monthly after the team cliff, monthly from the
    /// start for private tiers.
    pub fn periods(&self) -> u32 {
        match self.group {
            Group::Team => self.vesting_months.saturating_sub(MONTHS_PER_YEAR),
            Group::Private => self.vesting_months,
        }
    }

    /// Turn a purchase `amount` into a plan, scaling tokens by `decimals`.
    pub fn plan(&self, amount: f64, decimals: u8) -> Result<TierPlan, ScheduleError> {
        let periods = self.periods();
        if periods == 0 {
            return Err(ScheduleError::NoPeriods {
                tier: self.name.clone(),
            });
        }
        if periods > MAX_RELEASES {
            return Err(ScheduleError::TooManyPeriods { periods });
        }
        let tokens = match self.price {
            Some(price) if price > 0.0 && price.is_finite() => amount / price,
            Some(_) => {
                return Err(ScheduleError::InvalidPrice {
                    tier: self.name.clone(),
                })
            }
            None => amount,
        };
        let allocation = ui_amount_to_amount(tokens, decimals)?;
        if allocation == 0 {
            return Err(ScheduleError::ZeroAllocation);
        }
        Ok(TierPlan {
            group: self.group,
            periods,
            allocation,
        })
    }
}

pub fn ui_amount_to_amount(ui_amount: f64, decimals: u8) -> Result<u64, ScheduleError> {
    let scaled = (ui_amount * 10f64.powi(i32::from(decimals))).floor();
    if !scaled.is_finite() || scaled < 0.0 || scaled >= u64::MAX as f64 {
        return Err(ScheduleError::AllocationOverflow(ui_amount));
    }
    Ok(scaled as u64)
}

pub fn amount_to_ui_amount(amount: u64, decimals: u8) -> f64 {
    amount as f64 / 10f64.powi(i32::from(decimals))
}

fn is_leap(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Seconds until the same day of the next month, measured from `timestamp`.
fn month_increment(timestamp: i64) -> i64 {
    let date = match Utc.timestamp_opt(timestamp, 0).single() {
        Some(date) => date,
        None => return 30 * SECONDS_PER_DAY,
    };
    let days = match date.month() {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ if is_leap(date.year()) => 29,
        _ => 28,
    };
    SECONDS_PER_DAY * days
}

/// Release quantities: equal floor shares, remainder on the last release.
fn split_evenly(total: u64, parts: u32) -> Vec<u64> {
    let parts = u64::from(parts);
    let share = total / parts;
    let mut out = vec![share; parts as usize];
    if let Some(last) = out.last_mut() {
        *last += total - share * parts;
    }
    out
}

fn quantities(plan: &TierPlan) -> Vec<u64> {
    match plan.group {
        Group::Team => split_evenly(plan.allocation, plan.periods),
        Group::Private if plan.periods == 1 => vec![plan.allocation],
        Group::Private => {
            let upfront = plan.allocation / 10;
            let mut out = vec![upfront];
            out.extend(split_evenly(plan.allocation - upfront, plan.periods - 1));
            out
        }
    }
}

/// Build the release list for `plan`, starting from `start` (unix seconds).
pub fn plan_releases(start: i64, plan: &TierPlan) -> Result<Vec<Release>, ScheduleError> {
    if plan.periods > MAX_RELEASES {
        return Err(ScheduleError::TooManyPeriods {
            periods: plan.periods,
        });
    }
    let mut timestamp = start;
    let mut increment = match plan.group {
        Group::Team => SECONDS_PER_YEAR,
        Group::Private => 0,
    };

    let mut releases = Vec::with_capacity(plan.periods as usize);
    for quantity in quantities(plan) {
        timestamp += increment;
        increment = month_increment(timestamp);
        let stamp = u32::try_from(timestamp).map_err(|_| ScheduleError::TimestampOverflow(timestamp))?;
        releases.push(Release {
            timestamp: stamp,
            quantity,
        });
    }
    Ok(releases)
}
