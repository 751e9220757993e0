/*!
 * Energy Token Smart Contract
 *
 * A fungible token whose issuance follows claimed energy production and consumption.
 * Participants mint when they report production under given weather conditions and
 * burn when they report consumption; each claim also moves a single global price.
 *
 * Price rules (basis points, 10_000 = 1.00×, every division truncates):
 * - Mint: `minted = base_mint × factor / 10_000`, `price = price × 10_000 / factor`.
 *   A factor above 1.00× pushes the price down, below 1.00× pushes it up.
 * - Burn: `share = amount × 10_000 / supply_before`,
 *   `price = price × (10_000 + share / 2) / 10_000`. Burns only ever raise the price.
 *
 * Invariants:
 * - `total_supply` equals the sum of all balances after every operation
 * - No balance is ever negative
 * - The price stays strictly positive; a mint that would zero it is rejected
 *
 * The weather factor and cloud cover are reported by the participant and are not
 * checked against any oracle, only against their valid ranges.
 */

#![no_std]

mod types;


use energy_pricing::{burn_share, minted_amount, price_after_burn, price_after_mint, BasisPoints};
use soroban_sdk::{contract, contractimpl, log, symbol_short, Address, Env, Symbol};

pub use types::{BurnRecord, DataKey, Error, MintRecord};
use types::{ADMIN_UPDATED, BASE_MINT_UPDATED, ENERGY_MINTED, ENERGY_USED, TRANSFER};

#[contract]
pub struct EnergyTokenContract;

const ADMIN_KEY: Symbol = symbol_short!("ADMIN");
const BASE_MINT_KEY: Symbol = symbol_short!("BASE_MINT");
const PRICE_KEY: Symbol = symbol_short!("PRICE");
const SUPPLY_KEY: Symbol = symbol_short!("SUPPLY");
const LAST_CLOUD_KEY: Symbol = symbol_short!("LAST_CLD");

const DEFAULT_BASE_MINT_AMOUNT: i128 = 100;
const MAX_CLOUD_PERCENT: u32 = 100;

const INSTANCE_LIFETIME_THRESHOLD: u32 = 17_280;
const INSTANCE_BUMP_AMOUNT: u32 = 86_400;
const BALANCE_LIFETIME_THRESHOLD: u32 = 120_960;
const BALANCE_BUMP_AMOUNT: u32 = 1_051_200;

#[contractimpl]
impl EnergyTokenContract {
    /// Sets the admin, the starting price and the base mint amount. Once only.
    ///
    /// # Errors
    /// - AlreadyInitialized: If called a second time
    /// - InvalidArgument: If `initial_price` or `base_mint_amount` is not positive
    pub fn initialize(
        env: Env,
        admin: Address,
        initial_price: i128,
        base_mint_amount: i128,
    ) -> Result<(), Error> {
        if env.storage().instance().has(&ADMIN_KEY) {
            return Err(Error::AlreadyInitialized);
        }
        admin.require_auth();

        if initial_price <= 0 || base_mint_amount <= 0 {
            return Err(Error::InvalidArgument);
        }

        env.storage().instance().set(&ADMIN_KEY, &admin);
        env.storage().instance().set(&PRICE_KEY, &initial_price);
        env.storage().instance().set(&BASE_MINT_KEY, &base_mint_amount);
        env.storage().instance().set(&SUPPLY_KEY, &0i128);
        env.storage().instance().set(&LAST_CLOUD_KEY, &0u32);
        Self::_bump_instance(&env);

        Ok(())
    }

    fn _bump_instance(env: &Env) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
    }

    fn _require_admin(env: &Env) -> Result<Address, Error> {
        let admin: Address = env
            .storage()
            .instance()
            .get(&ADMIN_KEY)
            .ok_or(Error::NotInitialized)?;
        admin.require_auth();
        Self::_bump_instance(env);
        Ok(admin)
    }

    /// Current price; its presence doubles as the initialization check.
    fn _load_price(env: &Env) -> Result<i128, Error> {
        let price: i128 = env
            .storage()
            .instance()
            .get(&PRICE_KEY)
            .ok_or(Error::NotInitialized)?;
        Self::_bump_instance(env);
        Ok(price)
    }

    fn _load_supply(env: &Env) -> i128 {
        env.storage().instance().get(&SUPPLY_KEY).unwrap_or(0)
    }

    fn _read_balance(env: &Env, id: &Address) -> i128 {
        let key = DataKey::Balance(id.clone());
        let balance: Option<i128> = env.storage().persistent().get(&key);
        if balance.is_some() {
            env.storage()
                .persistent()
                .extend_ttl(&key, BALANCE_LIFETIME_THRESHOLD, BALANCE_BUMP_AMOUNT);
        }
        balance.unwrap_or(0)
    }

    fn _write_balance(env: &Env, id: &Address, amount: i128) {
        let key = DataKey::Balance(id.clone());
        env.storage().persistent().set(&key, &amount);
        env.storage()
            .persistent()
            .extend_ttl(&key, BALANCE_LIFETIME_THRESHOLD, BALANCE_BUMP_AMOUNT);
    }

    // ================================================================================================
    // ISSUANCE
    // ================================================================================================

    /// Mints tokens to `participant` for reported production.
    ///
    /// Credits `base_mint × weather_factor_bps / 10_000` to the participant's balance and
    /// to total supply, sets the price to `price × 10_000 / weather_factor_bps` and
    /// remembers `cloud_percent`. A mint that floors to zero tokens is accepted; one that
    /// floors the price to zero is not.
    ///
    /// # Returns
    /// The amount minted
    ///
    /// # Errors
    /// - NotInitialized: If the contract has not been initialized
    /// - InvalidArgument: Zero factor, cloud cover above 100, or a resulting price of zero
    /// - ArithmeticOverflow: If balance or supply would not fit in an `i128`
    pub fn mint_energy(
        env: Env,
        participant: Address,
        weather_factor_bps: u32,
        cloud_percent: u32,
    ) -> Result<i128, Error> {
        participant.require_auth();
        let price_before = Self::_load_price(&env)?;

        if cloud_percent > MAX_CLOUD_PERCENT {
            log!(&env, "Cloud cover out of range: {}", cloud_percent);
            return Err(Error::InvalidArgument);
        }
        let factor = BasisPoints::new(weather_factor_bps)?;

        let base_mint: i128 = env
            .storage()
            .instance()
            .get(&BASE_MINT_KEY)
            .unwrap_or(DEFAULT_BASE_MINT_AMOUNT);
        let minted = minted_amount(&env, base_mint, factor)?;
        let price_after = price_after_mint(&env, price_before, factor)?;
        if price_after <= 0 {
            log!(&env, "Mint would zero the price. Price: {}, Factor: {}", price_before, weather_factor_bps);
            return Err(Error::InvalidArgument);
        }

        let balance_after = Self::_read_balance(&env, &participant)
            .checked_add(minted)
            .ok_or(Error::ArithmeticOverflow)?;
        let total_supply_after = Self::_load_supply(&env)
            .checked_add(minted)
            .ok_or(Error::ArithmeticOverflow)?;

        Self::_write_balance(&env, &participant, balance_after);
        env.storage().instance().set(&SUPPLY_KEY, &total_supply_after);
        env.storage().instance().set(&PRICE_KEY, &price_after);
        env.storage().instance().set(&LAST_CLOUD_KEY, &cloud_percent);

        env.events().publish(
            (ENERGY_MINTED, participant.clone()),
            MintRecord {
                participant,
                minted,
                weather_factor_bps,
                cloud_percent,
                price_before,
                price_after,
                balance_after,
                total_supply_after,
            },
        );

        Ok(minted)
    }

    /// Burns `amount` of the participant's tokens for reported consumption and raises
    /// the price by half the burned share of supply.
    ///
    /// # Returns
    /// The new price
    ///
    /// # Errors
    /// - NotInitialized: If the contract has not been initialized
    /// - InvalidArgument: If `amount` is not positive
    /// - InsufficientBalance: If `amount` exceeds the participant's balance
    /// - DivisionByZero: If supply is zero (unreachable once the balance check passes)
    pub fn use_energy(env: Env, participant: Address, amount: i128) -> Result<i128, Error> {
        participant.require_auth();
        let price_before = Self::_load_price(&env)?;

        if amount <= 0 {
            return Err(Error::InvalidArgument);
        }
        let balance = Self::_read_balance(&env, &participant);
        if amount > balance {
            log!(&env, "Insufficient balance. Required: {}, Available: {}", amount, balance);
            return Err(Error::InsufficientBalance);
        }

        let supply_before = Self::_load_supply(&env);
        let percent_burned_bps = burn_share(&env, amount, supply_before)?;
        let price_after = price_after_burn(&env, price_before, percent_burned_bps)?;

        let balance_after = balance - amount;
        let total_supply_after = supply_before - amount;

        Self::_write_balance(&env, &participant, balance_after);
        env.storage().instance().set(&SUPPLY_KEY, &total_supply_after);
        env.storage().instance().set(&PRICE_KEY, &price_after);

        env.events().publish(
            (ENERGY_USED, participant.clone()),
            BurnRecord {
                participant,
                amount,
                percent_burned_bps,
                price_before,
                price_after,
                balance_after,
                total_supply_after,
            },
        );

        Ok(price_after)
    }

    /// Moves tokens between participants. Supply and price are untouched.
    ///
    /// # Errors
    /// - NotInitialized: If the contract has not been initialized
    /// - InvalidArgument: If `amount` is not positive
    /// - InsufficientBalance: If `amount` exceeds the sender's balance
    pub fn transfer(env: Env, from: Address, to: Address, amount: i128) -> Result<(), Error> {
        from.require_auth();
        Self::_load_price(&env)?;

        if amount <= 0 {
            return Err(Error::InvalidArgument);
        }
        let from_balance = Self::_read_balance(&env, &from);
        if amount > from_balance {
            return Err(Error::InsufficientBalance);
        }

        Self::_write_balance(&env, &from, from_balance - amount);
        // Read after the debit so a self-transfer nets to zero
        let to_balance = Self::_read_balance(&env, &to)
            .checked_add(amount)
            .ok_or(Error::ArithmeticOverflow)?;
        Self::_write_balance(&env, &to, to_balance);

        env.events().publish((TRANSFER, from, to), amount);
        Ok(())
    }

    // ================================================================================================
    // ADMINISTRATION
    // ================================================================================================

    /// Changes how many tokens a 1.00× mint produces.
    pub fn set_base_mint_amount(env: Env, amount: i128) -> Result<(), Error> {
        let admin = Self::_require_admin(&env)?;
        if amount <= 0 {
            return Err(Error::InvalidArgument);
        }
        env.storage().instance().set(&BASE_MINT_KEY, &amount);
        env.events().publish((BASE_MINT_UPDATED, admin), amount);
        Ok(())
    }

    pub fn update_admin(env: Env, new_admin: Address) -> Result<(), Error> {
        Self::_require_admin(&env)?;
        new_admin.require_auth();
        env.storage().instance().set(&ADMIN_KEY, &new_admin);
        env.events().publish(
            (ADMIN_UPDATED, env.current_contract_address()),
            new_admin,
        );
        Ok(())
    }

    // ================================================================================================
    // QUERY FUNCTIONS (GETTERS)
    // ================================================================================================

    pub fn price(env: Env) -> i128 {
        env.storage().instance().get(&PRICE_KEY).unwrap_or(0)
    }

    pub fn total_supply(env: Env) -> i128 {
        Self::_load_supply(&env)
    }

    pub fn balance(env: Env, id: Address) -> i128 {
        Self::_read_balance(&env, &id)
    }

    /// Cloud cover reported with the most recent mint. Kept for display only.
    pub fn last_cloud_percent(env: Env) -> u32 {
        env.storage().instance().get(&LAST_CLOUD_KEY).unwrap_or(0)
    }

    pub fn base_mint_amount(env: Env) -> i128 {
        env.storage()
            .instance()
            .get(&BASE_MINT_KEY)
            .unwrap_or(DEFAULT_BASE_MINT_AMOUNT)
    }

    pub fn get_admin(env: Env) -> Result<Address, Error> {
        env.storage().instance().get(&ADMIN_KEY).ok_or(Error::NotInitialized)
    }
}
