/*!
 * Energy Marketplace Smart Contract
 *
 * Peer-to-peer sale of kilowatt-hours. Sellers list offers (unit price and quantity),
 * buyers purchase part of an offer at a price adjusted by a weather factor they supply,
 * and payment moves from buyer to seller in the configured payment token inside the
 * same invocation that decrements the offer's inventory.
 *
 * Key features:
 * - Sequential, never-reused offer ids; offers are deactivated, never deleted
 * - Exact settlement: the tendered amount must equal the computed cost to the unit
 * - Inventory decrement and payment are one atomic unit
 * - Every purchase is stored as a permanent audit record and published as an event
 * - Admin pause switch and a configurable ceiling on the weather factor
 *
 * Trust boundary:
 * The weather factor and location come from the buyer's client, not from an oracle.
 * The contract only checks that they are in range; what it guarantees is deterministic
 * arithmetic for whatever factor was supplied, plus a permanent record of it.
 *
 * Business Logic:
 * 1. Admin initializes the contract with the payment token address
 * 2. Sellers create offers and maintain price, quantity and active status
 * 3. Buyers call `quote` for the exact cost, then `buy_energy` with that amount
 * 4. The contract routes the payment to the seller and records the purchase
 */

#![no_std]

mod types;


use energy_pricing::{purchase_cost, BasisPoints, SCALE};
use soroban_sdk::{contract, contractimpl, log, symbol_short, token, Address, Env, Map, Symbol};

pub use types::{DataKey, Error, Offer, PurchaseRecord, WeatherReport};
use types::{ADMIN_UPDATED, ENERGY_PURCHASED, OFFER_CREATED, OFFER_UPDATED, PAUSED, UNPAUSED};

#[contract]
pub struct EnergyMarketplaceContract;

// Storage keys - configuration and counters live in instance storage; offers and
// purchase records live in persistent storage under DataKey::Offer / DataKey::Purchase
const ADMIN_KEY: Symbol = symbol_short!("ADMIN");                    // Admin address
const PAYMENT_TOKEN_KEY: Symbol = symbol_short!("PAY_TKN");          // Token used to pay sellers
const MAX_FACTOR_KEY: Symbol = symbol_short!("MAX_FCTR");            // Ceiling on the weather factor (bps)
const PAUSED_KEY: Symbol = symbol_short!("PAUSED");                  // Pause state
const NEXT_OFFER_ID: Symbol = symbol_short!("NEXT_O_ID");            // Next offer id to assign
const PURCHASE_COUNT: Symbol = symbol_short!("PRCH_CNT");            // Next purchase id to assign

// Default configuration values
const DEFAULT_MAX_WEATHER_FACTOR: u32 = 100_000;                     // 10.00×

// Coordinate bounds in microdegrees
const MAX_LATITUDE_MICRO: i32 = 90_000_000;
const MAX_LONGITUDE_MICRO: i32 = 180_000_000;
const MAX_CLOUD_PERCENT: u32 = 100;

// Storage lifetimes in ledgers
const INSTANCE_LIFETIME_THRESHOLD: u32 = 17_280;
const INSTANCE_BUMP_AMOUNT: u32 = 86_400;
const PERSISTENT_LIFETIME_THRESHOLD: u32 = 120_960;
const PERSISTENT_BUMP_AMOUNT: u32 = 1_051_200;

#[contractimpl]
impl EnergyMarketplaceContract {
    /// Initializes the marketplace. Can only be called once.
    ///
    /// # Arguments
    /// * `admin` - Address allowed to pause the marketplace and change configuration
    /// * `payment_token` - Token contract used to move payments from buyers to sellers
    ///
    /// # Errors
    /// - AlreadyInitialized: If the contract has already been initialized
    pub fn initialize(env: Env, admin: Address, payment_token: Address) -> Result<(), Error> {
        if env.storage().instance().has(&ADMIN_KEY) {
            return Err(Error::AlreadyInitialized);
        }
        admin.require_auth();

        env.storage().instance().set(&ADMIN_KEY, &admin);
        env.storage().instance().set(&PAYMENT_TOKEN_KEY, &payment_token);
        env.storage().instance().set(&MAX_FACTOR_KEY, &DEFAULT_MAX_WEATHER_FACTOR);
        env.storage().instance().set(&PAUSED_KEY, &false);
        env.storage().instance().set(&NEXT_OFFER_ID, &0u64);
        env.storage().instance().set(&PURCHASE_COUNT, &0u64);
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

    /// Gate for every state-changing marketplace operation: the contract must be
    /// initialized and not paused.
    fn _require_open(env: &Env) -> Result<(), Error> {
        Self::_require_initialized(env)?;
        if env.storage().instance().get(&PAUSED_KEY).unwrap_or(false) {
            return Err(Error::ContractPaused);
        }
        Self::_bump_instance(env);
        Ok(())
    }

    fn _require_initialized(env: &Env) -> Result<(), Error> {
        if !env.storage().instance().has(&ADMIN_KEY) {
            return Err(Error::NotInitialized);
        }
        Ok(())
    }

    fn _read_offer(env: &Env, offer_id: u64) -> Option<Offer> {
        let key = DataKey::Offer(offer_id);
        let offer: Option<Offer> = env.storage().persistent().get(&key);
        if offer.is_some() {
            env.storage().persistent().extend_ttl(
                &key,
                PERSISTENT_LIFETIME_THRESHOLD,
                PERSISTENT_BUMP_AMOUNT,
            );
        }
        offer
    }

    fn _write_offer(env: &Env, offer_id: u64, offer: &Offer) {
        let key = DataKey::Offer(offer_id);
        env.storage().persistent().set(&key, offer);
        env.storage().persistent().extend_ttl(
            &key,
            PERSISTENT_LIFETIME_THRESHOLD,
            PERSISTENT_BUMP_AMOUNT,
        );
    }

    fn _load_owned_offer(env: &Env, offer_id: u64, caller: &Address) -> Result<Offer, Error> {
        let offer = Self::_read_offer(env, offer_id).ok_or(Error::NotFound)?;
        if offer.owner != *caller {
            return Err(Error::Unauthorized);
        }
        Ok(offer)
    }

    /// Turns a raw caller-supplied factor into a usable one: positive and no larger
    /// than the configured ceiling. Correctness of the factor is not checked.
    fn _checked_factor(env: &Env, weather_factor_bps: u32) -> Result<BasisPoints, Error> {
        let max_factor: u32 = env
            .storage()
            .instance()
            .get(&MAX_FACTOR_KEY)
            .unwrap_or(DEFAULT_MAX_WEATHER_FACTOR);
        if weather_factor_bps > max_factor {
            log!(env, "Weather factor out of range. Max: {}, Provided: {}", max_factor, weather_factor_bps);
            return Err(Error::InvalidArgument);
        }
        BasisPoints::new(weather_factor_bps).map_err(Error::from)
    }

    fn _validate_weather(env: &Env, weather: &WeatherReport) -> Result<BasisPoints, Error> {
        if weather.cloud_percent > MAX_CLOUD_PERCENT
            || !(-MAX_LATITUDE_MICRO..=MAX_LATITUDE_MICRO).contains(&weather.latitude_micro)
            || !(-MAX_LONGITUDE_MICRO..=MAX_LONGITUDE_MICRO).contains(&weather.longitude_micro)
        {
            log!(
                env,
                "Invalid weather report. Clouds: {}, Lat: {}, Lon: {}",
                weather.cloud_percent,
                weather.latitude_micro,
                weather.longitude_micro
            );
            return Err(Error::InvalidArgument);
        }
        Self::_checked_factor(env, weather.weather_factor_bps)
    }

    /// Exact amount owed for `quantity` units of `offer` under `factor`.
    ///
    /// Rejects a zero quantity and any quantity above the offer's inventory, which is
    /// what keeps `available_quantity` from ever going negative.
    fn _settlement_cost(
        env: &Env,
        offer: &Offer,
        quantity: u64,
        factor: BasisPoints,
    ) -> Result<i128, Error> {
        if quantity == 0 || quantity > offer.available_quantity {
            log!(env, "Invalid quantity. Available: {}, Requested: {}", offer.available_quantity, quantity);
            return Err(Error::InvalidArgument);
        }
        Ok(purchase_cost(env, offer.unit_price, quantity, factor)?)
    }

    fn _emit_offer_updated(env: &Env, offer_id: u64, offer: &Offer) {
        env.events().publish(
            (OFFER_UPDATED, offer.owner.clone()),
            (offer_id, offer.unit_price, offer.available_quantity, offer.active),
        );
    }

    // ================================================================================================
    // OFFER LEDGER
    // ================================================================================================

    /// Lists energy for sale.
    ///
    /// # Arguments
    /// * `seller` - The address creating the offer (must sign transaction)
    /// * `unit_price` - Price per kWh in the payment token's smallest unit
    /// * `total_quantity` - kWh available
    ///
    /// # Returns
    /// The id of the new offer. Ids are assigned sequentially and never reused.
    ///
    /// # Errors
    /// - ContractPaused: If the marketplace is paused
    /// - InvalidArgument: If price or quantity is not positive
    pub fn create_offer(
        env: Env,
        seller: Address,
        unit_price: i128,
        total_quantity: u64,
    ) -> Result<u64, Error> {
        Self::_require_open(&env)?;
        seller.require_auth();

        if unit_price <= 0 || total_quantity == 0 {
            return Err(Error::InvalidArgument);
        }

        let offer_id: u64 = env
            .storage()
            .instance()
            .get(&NEXT_OFFER_ID)
            .ok_or(Error::NotInitialized)?;

        let offer = Offer {
            owner: seller.clone(),
            unit_price,
            available_quantity: total_quantity,
            active: true,
        };
        Self::_write_offer(&env, offer_id, &offer);
        env.storage().instance().set(&NEXT_OFFER_ID, &(offer_id + 1));

        env.events().publish(
            (OFFER_CREATED, seller),
            (offer_id, unit_price, total_quantity),
        );

        Ok(offer_id)
    }

    /// Activates or deactivates an offer. Only the owner may do this.
    ///
    /// # Errors
    /// - ContractPaused: If the marketplace is paused
    /// - NotFound: If the offer does not exist
    /// - Unauthorized: If `caller` is not the offer owner
    pub fn set_offer_status(env: Env, caller: Address, offer_id: u64, active: bool) -> Result<(), Error> {
        Self::_require_open(&env)?;
        caller.require_auth();

        let mut offer = Self::_load_owned_offer(&env, offer_id, &caller)?;

        offer.active = active;
        Self::_write_offer(&env, offer_id, &offer);

        Self::_emit_offer_updated(&env, offer_id, &offer);
        Ok(())
    }

    /// Overwrites an offer's unit price and available quantity together. The active
    /// flag is left as it is.
    ///
    /// # Errors
    /// - ContractPaused: If the marketplace is paused
    /// - NotFound: If the offer does not exist
    /// - Unauthorized: If `caller` is not the offer owner
    /// - InvalidArgument: If the new price or quantity is not positive
    pub fn update_offer(
        env: Env,
        caller: Address,
        offer_id: u64,
        new_unit_price: i128,
        new_quantity: u64,
    ) -> Result<(), Error> {
        Self::_require_open(&env)?;
        caller.require_auth();

        let mut offer = Self::_load_owned_offer(&env, offer_id, &caller)?;

        if new_unit_price <= 0 || new_quantity == 0 {
            return Err(Error::InvalidArgument);
        }

        offer.unit_price = new_unit_price;
        offer.available_quantity = new_quantity;
        Self::_write_offer(&env, offer_id, &offer);

        Self::_emit_offer_updated(&env, offer_id, &offer);
        Ok(())
    }

    // ================================================================================================
    // SETTLEMENT
    // ================================================================================================

    /// Buys `quantity` kWh from an offer, paying the seller in the payment token.
    ///
    /// # Business Flow
    /// 1. Validates the offer exists and is active
    /// 2. Validates quantity against inventory and the weather report ranges
    /// 3. Computes `floor(unit_price × quantity × weather_factor_bps / 10_000)`
    /// 4. Requires `tendered_amount` to equal that cost exactly
    /// 5. Decrements inventory, then transfers `tendered_amount` from buyer to seller
    /// 6. Stores the purchase record and emits it as an event
    ///
    /// Steps 5 and 6 are all-or-nothing: if the token contract rejects the transfer the
    /// inventory decrement is undone and nothing is recorded.
    ///
    /// # Arguments
    /// * `buyer` - The purchasing address (must sign; funds are drawn from it)
    /// * `offer_id` - The offer to buy from
    /// * `quantity` - kWh to buy
    /// * `weather` - Caller-supplied weather factor and context, recorded verbatim
    /// * `tendered_amount` - Amount the buyer pays; must match the computed cost
    ///
    /// # Returns
    /// The id of the purchase record
    ///
    /// # Errors
    /// - ContractPaused: If the marketplace is paused
    /// - NotFound: If the offer does not exist
    /// - InactiveOffer: If the offer is deactivated
    /// - InvalidArgument: Bad quantity, factor, coordinates or cloud cover
    /// - PaymentMismatch: If `tendered_amount` differs from the cost
    /// - TransferFailed: If the payment token rejects the transfer
    /// - ArithmeticOverflow: If the cost does not fit in an `i128`
    pub fn buy_energy(
        env: Env,
        buyer: Address,
        offer_id: u64,
        quantity: u64,
        weather: WeatherReport,
        tendered_amount: i128,
    ) -> Result<u64, Error> {
        Self::_require_open(&env)?;
        buyer.require_auth();

        let offer = Self::_read_offer(&env, offer_id).ok_or(Error::NotFound)?;
        if !offer.active {
            return Err(Error::InactiveOffer);
        }

        let factor = Self::_validate_weather(&env, &weather)?;
        let cost = Self::_settlement_cost(&env, &offer, quantity, factor)?;
        if tendered_amount != cost {
            log!(&env, "Payment mismatch. Expected: {}, Tendered: {}", cost, tendered_amount);
            return Err(Error::PaymentMismatch);
        }

        // Effects first: the decrement is persisted before funds move and restored if
        // they cannot.
        let mut settled = offer.clone();
        settled.available_quantity -= quantity;
        Self::_write_offer(&env, offer_id, &settled);

        let payment_token: Address = env
            .storage()
            .instance()
            .get(&PAYMENT_TOKEN_KEY)
            .ok_or(Error::NotInitialized)?;
        let token_client = token::Client::new(&env, &payment_token);
        match token_client.try_transfer(&buyer, &offer.owner, &tendered_amount) {
            Ok(Ok(())) => {}
            _ => {
                log!(&env, "Failed to transfer {} to offer owner", tendered_amount);
                Self::_write_offer(&env, offer_id, &offer);
                return Err(Error::TransferFailed);
            }
        }

        let purchase_id: u64 = env.storage().instance().get(&PURCHASE_COUNT).unwrap_or(0);
        let record = PurchaseRecord {
            purchase_id,
            offer_id,
            buyer: buyer.clone(),
            seller: settled.owner.clone(),
            quantity,
            unit_price: settled.unit_price,
            amount_paid: tendered_amount,
            weather,
            remaining_quantity: settled.available_quantity,
            timestamp: env.ledger().timestamp(),
        };

        let record_key = DataKey::Purchase(purchase_id);
        env.storage().persistent().set(&record_key, &record);
        env.storage().persistent().extend_ttl(
            &record_key,
            PERSISTENT_LIFETIME_THRESHOLD,
            PERSISTENT_BUMP_AMOUNT,
        );
        env.storage().instance().set(&PURCHASE_COUNT, &(purchase_id + 1));

        env.events().publish((ENERGY_PURCHASED, buyer), record);

        Ok(purchase_id)
    }

    /// Returns the exact amount `buy_energy` would require right now for `quantity`
    /// units of `offer_id` at `weather_factor_bps`. No side effects.
    ///
    /// # Errors
    /// Same as the validation steps of `buy_energy`: NotFound, InactiveOffer,
    /// InvalidArgument, ArithmeticOverflow.
    pub fn quote(env: Env, offer_id: u64, quantity: u64, weather_factor_bps: u32) -> Result<i128, Error> {
        Self::_require_initialized(&env)?;
        let offer = Self::_read_offer(&env, offer_id).ok_or(Error::NotFound)?;
        if !offer.active {
            return Err(Error::InactiveOffer);
        }
        let factor = Self::_checked_factor(&env, weather_factor_bps)?;
        Self::_settlement_cost(&env, &offer, quantity, factor)
    }

    // ================================================================================================
    // ADMINISTRATION
    // ================================================================================================

    /// Halts offer management and purchases. Reads keep working.
    pub fn pause(env: Env) -> Result<(), Error> {
        let admin = Self::_require_admin(&env)?;
        env.storage().instance().set(&PAUSED_KEY, &true);
        env.events().publish((PAUSED, admin), ());
        Ok(())
    }

    /// Resumes marketplace operations after a pause.
    pub fn unpause(env: Env) -> Result<(), Error> {
        let admin = Self::_require_admin(&env)?;
        env.storage().instance().set(&PAUSED_KEY, &false);
        env.events().publish((UNPAUSED, admin), ());
        Ok(())
    }

    /// Hands the admin role to `new_admin`. Both current and new admin must sign.
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

    /// Sets the largest weather factor `buy_energy` accepts.
    ///
    /// # Errors
    /// - Unauthorized: If caller is not admin
    /// - InvalidArgument: If `max_factor_bps` is below 1.00× (10_000)
    pub fn update_max_weather_factor(env: Env, max_factor_bps: u32) -> Result<(), Error> {
        Self::_require_admin(&env)?;
        if max_factor_bps < SCALE {
            return Err(Error::InvalidArgument);
        }
        env.storage().instance().set(&MAX_FACTOR_KEY, &max_factor_bps);
        Ok(())
    }

    // ================================================================================================
    // QUERY FUNCTIONS (GETTERS)
    // ================================================================================================

    pub fn get_admin(env: Env) -> Result<Address, Error> {
        env.storage().instance().get(&ADMIN_KEY).ok_or(Error::NotInitialized)
    }

    pub fn get_payment_token(env: Env) -> Result<Address, Error> {
        env.storage()
            .instance()
            .get(&PAYMENT_TOKEN_KEY)
            .ok_or(Error::NotInitialized)
    }

    pub fn get_max_weather_factor(env: Env) -> u32 {
        env.storage()
            .instance()
            .get(&MAX_FACTOR_KEY)
            .unwrap_or(DEFAULT_MAX_WEATHER_FACTOR)
    }

    /// Returns the id the next `create_offer` will assign.
    pub fn get_next_offer_id(env: Env) -> u64 {
        env.storage().instance().get(&NEXT_OFFER_ID).unwrap_or(0)
    }

    /// Returns a specific offer by its id, whether active, inactive or sold out.
    pub fn get_offer(env: Env, offer_id: u64) -> Option<Offer> {
        Self::_read_offer(&env, offer_id)
    }

    /// Returns every offer ever created, keyed by id.
    /// Warning: reads one storage entry per offer; prefer `get_offer` for lookups.
    pub fn get_offers(env: Env) -> Map<u64, Offer> {
        let mut offers = Map::new(&env);
        for offer_id in 0..Self::get_next_offer_id(env.clone()) {
            if let Some(offer) = Self::_read_offer(&env, offer_id) {
                offers.set(offer_id, offer);
            }
        }
        offers
    }

    /// Returns the audit record of one purchase.
    pub fn get_purchase(env: Env, purchase_id: u64) -> Option<PurchaseRecord> {
        let key = DataKey::Purchase(purchase_id);
        let record: Option<PurchaseRecord> = env.storage().persistent().get(&key);
        if record.is_some() {
            env.storage().persistent().extend_ttl(
                &key,
                PERSISTENT_LIFETIME_THRESHOLD,
                PERSISTENT_BUMP_AMOUNT,
            );
        }
        record
    }

    /// Returns how many purchases have settled; purchase ids run from 0 to this - 1.
    pub fn get_purchase_count(env: Env) -> u64 {
        env.storage().instance().get(&PURCHASE_COUNT).unwrap_or(0)
    }

    pub fn is_paused(env: Env) -> bool {
        env.storage().instance().get(&PAUSED_KEY).unwrap_or(false)
    }
}
