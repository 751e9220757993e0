/*!
 * Type Definitions for the Energy Marketplace Smart Contract
 *
 * This module defines the offer record, the weather context a buyer submits with a
 * purchase, the immutable purchase record that forms the audit log, the error enum and
 * the event topics emitted by the contract.
 */

use soroban_sdk::{contracterror, contracttype, symbol_short, Address, String, Symbol};

// ================================================================================================
// CORE DATA STRUCTURES
// ================================================================================================

/// A seller's standing listing of energy.
///
/// # Lifecycle
/// - Created active by `create_offer` under a fresh sequential id
/// - `unit_price` and `available_quantity` overwritten by the owner through `update_offer`
/// - `active` toggled by the owner through `set_offer_status`
/// - `available_quantity` decremented by every successful `buy_energy`
/// - Never deleted; an inactive or sold-out offer stays readable for audit
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Offer {
    /// The participant who created the offer and receives every payment against it
    pub owner: Address,

    /// Price per kWh in the smallest unit of the payment token
    pub unit_price: i128,

    /// kWh still for sale. Never negative: purchases larger than this are rejected
    pub available_quantity: u64,

    /// Purchases fail while this is false
    pub active: bool,
}

/// Weather context a buyer submits with a purchase.
///
/// Nothing here is verified against an oracle. The factor is trusted input: the contract
/// checks only that it is usable (positive, under the configured ceiling) and records
/// the whole report permanently so a disputed price can be traced back to its inputs.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WeatherReport {
    /// Price multiplier in basis points (10_000 = 1.00×)
    pub weather_factor_bps: u32,

    /// Free-text conditions, e.g. "broken clouds"
    pub description: String,

    /// Latitude in microdegrees (-90_000_000 ..= 90_000_000)
    pub latitude_micro: i32,

    /// Longitude in microdegrees (-180_000_000 ..= 180_000_000)
    pub longitude_micro: i32,

    /// Cloud cover, 0 ..= 100
    pub cloud_percent: u32,
}

/// One settled purchase. Written once, never mutated.
///
/// Carries every input to the settlement arithmetic plus its outcome, so the price
/// paid and the inventory change can be recomputed from the record alone.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PurchaseRecord {
    pub purchase_id: u64,
    pub offer_id: u64,
    pub buyer: Address,
    pub seller: Address,
    pub quantity: u64,
    pub unit_price: i128,
    pub amount_paid: i128,
    pub weather: WeatherReport,
    /// Offer inventory left after this purchase
    pub remaining_quantity: u64,
    /// Ledger timestamp at settlement
    pub timestamp: u64,
}

/// Persistent storage keys for records that grow with usage.
#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    /// Offer record by offer id
    Offer(u64),
    /// Purchase audit record by purchase id
    Purchase(u64),
}

// ================================================================================================
// ERROR DEFINITIONS
// ================================================================================================

/// Every failure a marketplace entry point can report.
///
/// Any `Err` aborts the invocation: the host discards all storage writes and events
/// made during the call, so a failed operation never leaves partial state behind.
///
/// # Error Code Ranges
/// - 1-6: Offer and settlement failures
/// - 7-10: Contract lifecycle and arithmetic
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    // ========== Offer and Settlement (1-6) ==========

    /// No offer exists under the requested id
    NotFound = 1,

    /// Caller is not the owner of the offer (or not the admin)
    Unauthorized = 2,

    /// The offer has been deactivated by its owner
    InactiveOffer = 3,

    /// Malformed or out-of-range input: non-positive price, zero quantity, quantity above
    /// inventory, zero or excessive weather factor, bad coordinates, cloud cover above 100
    InvalidArgument = 4,

    /// Tendered amount differs from the computed cost. Exact equality is required
    PaymentMismatch = 5,

    /// The payment token rejected the transfer to the offer owner
    TransferFailed = 6,

    // ========== Lifecycle and Arithmetic (7-10) ==========

    /// `initialize` was already called
    AlreadyInitialized = 7,

    /// `initialize` has not been called yet
    NotInitialized = 8,

    /// Marketplace operations are halted by the admin
    ContractPaused = 9,

    /// The computed cost does not fit in an `i128`
    ArithmeticOverflow = 10,
}

// ================================================================================================
// EVENT CONSTANTS
// ================================================================================================

/// Event emitted when a new offer is created
/// Contains: (offer_id, unit_price, quantity)
pub const OFFER_CREATED: Symbol = symbol_short!("offr_crt");

/// Event emitted when an owner changes price, quantity or status of an offer
/// Contains: (offer_id, unit_price, quantity, active)
pub const OFFER_UPDATED: Symbol = symbol_short!("offr_upd");

/// Event emitted on every successful purchase
/// Contains: PurchaseRecord
pub const ENERGY_PURCHASED: Symbol = symbol_short!("nrg_buy");

/// Event emitted when the admin pauses the marketplace
pub const PAUSED: Symbol = symbol_short!("paused");

/// Event emitted when the admin resumes the marketplace
pub const UNPAUSED: Symbol = symbol_short!("unpaused");

/// Event emitted when the admin role changes hands
/// Contains: new admin address
pub const ADMIN_UPDATED: Symbol = symbol_short!("adm_upd");

impl From<energy_pricing::PricingError> for Error {
    fn from(err: energy_pricing::PricingError) -> Self {
        match err {
            energy_pricing::PricingError::Overflow => Error::ArithmeticOverflow,
            energy_pricing::PricingError::NonPositive
            | energy_pricing::PricingError::DivisionByZero => Error::InvalidArgument,
        }
    }
}
