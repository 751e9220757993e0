//! Records, storage keys, errors and event topics for the energy token contract.

use energy_pricing::PricingError;
use soroban_sdk::{contracterror, contracttype, symbol_short, Address, Symbol};

/// Outcome of one production claim, published as the `EnergyMinted` event body.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MintRecord {
    pub participant: Address,
    pub minted: i128,
    pub weather_factor_bps: u32,
    pub cloud_percent: u32,
    pub price_before: i128,
    pub price_after: i128,
    pub balance_after: i128,
    pub total_supply_after: i128,
}

/// Outcome of one consumption claim, published as the `EnergyUsed` event body.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BurnRecord {
    pub participant: Address,
    pub amount: i128,
    /// Share of the pre-burn supply that was burned, in basis points
    pub percent_burned_bps: u32,
    pub price_before: i128,
    pub price_after: i128,
    pub balance_after: i128,
    pub total_supply_after: i128,
}

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Balance(Address),
}

/// # Error Code Ranges
/// - 1-2: Caller input
/// - 3-4: Contract lifecycle
/// - 5-6: Arithmetic
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    /// Zero factor, cloud cover above 100, non-positive amount or configuration value,
    /// or a mint that would drive the price to zero
    InvalidArgument = 1,

    /// Burn or transfer larger than the participant's balance
    InsufficientBalance = 2,

    AlreadyInitialized = 3,

    NotInitialized = 4,

    /// Burn against an empty supply
    DivisionByZero = 5,

    ArithmeticOverflow = 6,
}

impl From<PricingError> for Error {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::NonPositive => Error::InvalidArgument,
            PricingError::Overflow => Error::ArithmeticOverflow,
            PricingError::DivisionByZero => Error::DivisionByZero,
        }
    }
}

/// Contains: MintRecord
pub const ENERGY_MINTED: Symbol = symbol_short!("nrg_mint");

/// Contains: BurnRecord
pub const ENERGY_USED: Symbol = symbol_short!("nrg_use");

/// Topics: (transfer, from, to). Contains: amount
pub const TRANSFER: Symbol = symbol_short!("transfer");

/// Contains: new base mint amount
pub const BASE_MINT_UPDATED: Symbol = symbol_short!("mint_upd");

/// Contains: new admin address
pub const ADMIN_UPDATED: Symbol = symbol_short!("adm_upd");
