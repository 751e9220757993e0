/*!
 * Fixed-Point Pricing for the Energy Marketplace and Energy Token Contracts
 *
 * Every authoritative number in the system (what a purchase costs, how many tokens a
 * production claim mints, where the token price moves after a mint or a burn) is
 * computed here, once, with integer arithmetic only.
 *
 * Conventions:
 * - Factors are basis points: `SCALE` (10_000) = 1.00×
 * - Every division truncates toward zero; all operands are non-negative so this is
 *   also floor division
 * - Intermediate products are held in 256-bit host integers (`U256`), so no product of
 *   an `i128` amount, a `u64` quantity and a `u32` factor can overflow
 * - A result that does not fit back into `i128` is reported, never wrapped or clamped
 */

#![no_std]


use soroban_sdk::{Env, U256};

/// Fixed-point denominator for every factor: 10_000 basis points = 1.00×.
pub const SCALE: u32 = 10_000;

/// Failures of the pricing arithmetic. Contracts map these onto their own error enums.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PricingError {
    /// An operand that must be strictly positive was zero or negative
    NonPositive,
    /// The result does not fit in an `i128`
    Overflow,
    /// The divisor was zero
    DivisionByZero,
}

/// A strictly positive multiplier expressed in basis points.
///
/// The raw value is caller-supplied (a weather factor, for instance) and nothing here
/// judges whether it is a *reasonable* multiplier, only that it is usable: zero is
/// rejected at construction because a zero factor would zero a cost or divide by zero
/// in the mint price update.
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub struct BasisPoints(u32);

impl BasisPoints {
    /// 1.00×
    pub const ONE: BasisPoints = BasisPoints(SCALE);

    pub fn new(raw: u32) -> Result<Self, PricingError> {
        if raw == 0 {
            return Err(PricingError::NonPositive);
        }
        Ok(BasisPoints(raw))
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

fn widen(env: &Env, value: i128) -> Result<U256, PricingError> {
    if value < 0 {
        return Err(PricingError::NonPositive);
    }
    Ok(U256::from_u128(env, value as u128))
}

fn narrow(value: U256) -> Result<i128, PricingError> {
    value
        .to_u128()
        .and_then(|v| i128::try_from(v).ok())
        .ok_or(PricingError::Overflow)
}

/// `floor(a × b / divisor)` over non-negative operands, with a 256-bit intermediate.
pub fn mul_div_floor(env: &Env, a: i128, b: i128, divisor: i128) -> Result<i128, PricingError> {
    if divisor == 0 {
        return Err(PricingError::DivisionByZero);
    }
    let product = widen(env, a)?.mul(&widen(env, b)?);
    narrow(product.div(&widen(env, divisor)?))
}

/// Exact amount owed for `quantity` units at `unit_price`, adjusted by `factor`:
/// `floor(unit_price × quantity × factor / SCALE)`.
///
/// The base cost `unit_price × quantity` is an exact integer, so flooring it first (as
/// the settlement rule is written) and flooring the full product are the same number.
pub fn purchase_cost(
    env: &Env,
    unit_price: i128,
    quantity: u64,
    factor: BasisPoints,
) -> Result<i128, PricingError> {
    if unit_price <= 0 || quantity == 0 {
        return Err(PricingError::NonPositive);
    }
    let base_cost = widen(env, unit_price)?.mul(&U256::from_u128(env, quantity as u128));
    let adjusted = base_cost
        .mul(&U256::from_u32(env, factor.raw()))
        .div(&U256::from_u32(env, SCALE));
    narrow(adjusted)
}

/// Tokens credited for one production claim: `floor(base_mint × factor / SCALE)`.
pub fn minted_amount(env: &Env, base_mint: i128, factor: BasisPoints) -> Result<i128, PricingError> {
    mul_div_floor(env, base_mint, factor.raw() as i128, SCALE as i128)
}

/// Price after a mint moves inversely with the factor: `floor(price × SCALE / factor)`.
pub fn price_after_mint(env: &Env, price: i128, factor: BasisPoints) -> Result<i128, PricingError> {
    mul_div_floor(env, price, SCALE as i128, factor.raw() as i128)
}

/// Share of the pre-burn supply removed by a burn, in basis points:
/// `floor(amount × SCALE / supply_before)`.
pub fn burn_share(env: &Env, amount: i128, supply_before: i128) -> Result<u32, PricingError> {
    if supply_before <= 0 {
        return Err(PricingError::DivisionByZero);
    }
    let share = mul_div_floor(env, amount, SCALE as i128, supply_before)?;
    u32::try_from(share).map_err(|_| PricingError::Overflow)
}

/// Price after a burn: `floor(price × (SCALE + share / 2) / SCALE)`.
///
/// The half-rate term is integer division of the share, truncated before it is added.
pub fn price_after_burn(env: &Env, price: i128, share_bps: u32) -> Result<i128, PricingError> {
    let multiplier = SCALE as i128 + (share_bps / 2) as i128;
    mul_div_floor(env, price, multiplier, SCALE as i128)
}
