/*!
 * Deal Escrow Smart Contract
 *
 * This contract implements a peer-to-peer escrow protocol for single-item
 * sales with bonded deposits and third-party dispute resolution:
 * - A seller lists an item by posting a security deposit
 * - A buyer purchases by escrowing the price plus a matching penalty bond
 * - The buyer confirms satisfaction, releasing all funds to the seller
 * - After a cooling-off period either party may complain, freezing the
 *   funds until a designated judge awards them to one side
 * - An unbought listing can be removed, refunding the deposit
 *
 * The factory side of the contract validates global parameters (dispute
 * deadline, penalty percentage, judge identity), deploys per-listing deals
 * with a snapshot of the current configuration, and tracks them per seller.
 * Deals come in two funding variants behind one state machine: a fungible
 * token variant funded through allowances, and a native-asset variant
 * funded by direct authorized transfers.
 *
 * Security properties:
 * - Authorization checks on every mutating function
 * - Time-gated complaints measured against the ledger clock
 * - Terminal transitions finalize all state flags before the single
 *   outbound transfer, and pay the entire held balance to one recipient
 */

#![no_std]

mod asset;
mod types;


use soroban_sdk::{contract, contractimpl, log, symbol_short, Address, Env, String, Vec};

use asset::EscrowAsset;
use types::{DataKey, Deal, DealState, Error};

#[contract]
pub struct DealFactory;

// Parameter bounds. Listings below MIN_PRICE are rejected so that the
// deposit formula always yields a non-zero bond at the minimum penalty.
const MIN_PRICE: i128 = 100;
const MIN_DEADLINE: u64 = 7 * 24 * 60 * 60; // one week
const MAX_DEADLINE: u64 = 4 * 7 * 24 * 60 * 60; // four weeks
const MIN_PENALTY: u32 = 1;
const MAX_PENALTY: u32 = 10;

#[contractimpl]
impl DealFactory {
    /// Initializes the factory with its global defaults.
    ///
    /// Can only be called once. The configured deadline, penalty and judge
    /// are snapshotted into every deal deployed afterwards; `native_token`
    /// is the asset contract backing the native-value variant.
    ///
    /// # Arguments
    /// * `owner` - The account allowed to mutate factory defaults (must sign)
    /// * `deadline` - Cooling-off duration in seconds, within [one week, four weeks]
    /// * `penalty` - Bond percentage of price, within [1, 10]
    /// * `judge` - The identity empowered to resolve disputes
    /// * `native_token` - Address of the native asset contract
    ///
    /// # Errors
    /// - `AlreadyInitialized`: on a second call
    /// - `OutOfRange`: deadline or penalty outside its accepted bound
    pub fn initialize(
        env: Env,
        owner: Address,
        deadline: u64,
        penalty: u32,
        judge: Address,
        native_token: Address,
    ) -> Result<(), Error> {
        owner.require_auth();

        if env.storage().persistent().has(&DataKey::Owner) {
            return Err(Error::AlreadyInitialized);
        }
        if !(MIN_DEADLINE..=MAX_DEADLINE).contains(&deadline) {
            return Err(Error::OutOfRange);
        }
        if !(MIN_PENALTY..=MAX_PENALTY).contains(&penalty) {
            return Err(Error::OutOfRange);
        }

        env.storage().persistent().set(&DataKey::Owner, &owner);
        env.storage().persistent().set(&DataKey::Deadline, &deadline);
        env.storage().persistent().set(&DataKey::Penalty, &penalty);
        env.storage().persistent().set(&DataKey::Judge, &judge);
        env.storage()
            .persistent()
            .set(&DataKey::NativeToken, &native_token);
        env.storage().instance().set(&DataKey::NextDealId, &0u64);

        Ok(())
    }

    // ================================================================================================
    // DEPLOYMENT
    // ================================================================================================

    /// Deploys a token-denominated deal for `seller`.
    ///
    /// Pulls the security deposit (`price * penalty / 100`) from the seller
    /// via the token's allowance mechanism, records the deal with a snapshot
    /// of the current factory defaults and appends it to the seller's token
    /// registry.
    ///
    /// # Arguments
    /// * `seller` - The listing account (must sign)
    /// * `token` - The fungible token contract denominating the deal
    /// * `price` - Listing price, at least `MIN_PRICE`
    /// * `description` - Opaque item label
    ///
    /// # Returns
    /// The id of the deployed deal
    ///
    /// # Errors
    /// - `NotInitialized`: factory not yet configured
    /// - `PriceTooLow`: price below the minimum listing threshold
    /// - `InsufficientFunds`: seller's balance below the deposit
    /// - `NotApproved`: seller's allowance to the contract below the deposit
    pub fn deploy_deal(
        env: Env,
        seller: Address,
        token: Address,
        price: i128,
        description: String,
    ) -> Result<u64, Error> {
        let registry = DataKey::SellerDeals(seller.clone());
        Self::_deploy(&env, seller, EscrowAsset::Token(token), price, description, registry)
    }

    /// Deploys a native-denominated deal for `seller`.
    ///
    /// Same behavior as `deploy_deal`, denominated in the native asset: the
    /// deposit moves by a direct authorized transfer, exactly matching the
    /// required amount, and the deal lands in the seller's separate native
    /// registry.
    ///
    /// # Errors
    /// - `NotInitialized`, `PriceTooLow` as for `deploy_deal`
    /// - `InsufficientFunds`: seller's native balance below the deposit
    pub fn deploy_deal_native(
        env: Env,
        seller: Address,
        price: i128,
        description: String,
    ) -> Result<u64, Error> {
        let registry = DataKey::SellerDealsNative(seller.clone());
        Self::_deploy(&env, seller, EscrowAsset::Native, price, description, registry)
    }

    // ================================================================================================
    // DEAL STATE MACHINE
    // ================================================================================================

    /// Purchases the listed item.
    ///
    /// The caller becomes the buyer and escrows `price + deposit`: the
    /// price plus a penalty bond mirroring the seller's. The purchase
    /// timestamp starts the cooling-off clock for complaints.
    ///
    /// # Arguments
    /// * `buyer` - The purchasing account (must sign)
    /// * `deal_id` - The deal to buy
    ///
    /// # Errors
    /// - `DealNotFound`: unknown deal id
    /// - `AlreadyBought`: a buyer is already recorded
    /// - `DealClosed`: the deal reached a terminal state
    /// - `Unauthorized`: the seller may not buy their own listing
    /// - `InsufficientFunds` / `NotApproved`: payment cannot be escrowed
    pub fn buy(env: Env, buyer: Address, deal_id: u64) -> Result<(), Error> {
        buyer.require_auth();

        let mut deal = Self::_load_deal(&env, deal_id)?;
        match deal.state {
            DealState::Listed => {}
            DealState::Bought | DealState::Complained => return Err(Error::AlreadyBought),
            _ => return Err(Error::DealClosed),
        }
        if buyer == deal.seller {
            return Err(Error::Unauthorized);
        }

        let payment = deal.price + deal.deposit;
        deal.buyer = Some(buyer.clone());
        deal.bought_at = env.ledger().timestamp();
        deal.state = DealState::Bought;
        Self::_store_deal(&env, deal_id, &deal);

        env.events()
            .publish((symbol_short!("bought"), buyer.clone()), (deal_id, payment));

        deal.asset.pull(&env, &buyer, payment)
    }

    /// Confirms satisfaction with the purchase.
    ///
    /// Only the recorded buyer may confirm, at any time after buying; there
    /// is no time gate. Releases the entire held balance
    /// (`price + 2 * deposit`) to the seller and closes the deal.
    ///
    /// # Errors
    /// - `DealNotFound`: unknown deal id
    /// - `Unauthorized`: caller is not the recorded buyer (covers unbought deals)
    /// - `AlreadyComplained`: a complaint already froze the funds
    /// - `DealClosed`: the deal reached a terminal state
    pub fn confirm(env: Env, buyer: Address, deal_id: u64) -> Result<(), Error> {
        buyer.require_auth();

        let mut deal = Self::_load_deal(&env, deal_id)?;
        if deal.buyer.as_ref() != Some(&buyer) {
            return Err(Error::Unauthorized);
        }
        match deal.state {
            DealState::Bought => {}
            DealState::Complained => return Err(Error::AlreadyComplained),
            _ => return Err(Error::DealClosed),
        }

        let pot = Self::_pot(&deal);
        deal.state = DealState::Confirmed;
        Self::_store_deal(&env, deal_id, &deal);

        env.events()
            .publish((symbol_short!("confirmed"), buyer), (deal_id, pot));

        deal.asset.payout(&env, &deal.seller, pot)
    }

    /// Raises a complaint, freezing the escrowed funds.
    ///
    /// Either party may complain once the cooling-off deadline has elapsed
    /// since the purchase (`now - bought_at >= deadline`; equality counts).
    /// A frozen deal can only be settled by the judge through `resolve`.
    ///
    /// # Errors
    /// - `DealNotFound`: unknown deal id
    /// - `Unauthorized`: caller is neither buyer nor seller
    /// - `NotBought`: the item was never bought
    /// - `TooEarly`: the deadline has not elapsed yet
    /// - `AlreadyComplained`: the deal is already frozen
    /// - `DealClosed`: the deal reached a terminal state
    pub fn complain(env: Env, caller: Address, deal_id: u64) -> Result<(), Error> {
        caller.require_auth();

        let mut deal = Self::_load_deal(&env, deal_id)?;
        let is_buyer = deal.buyer.as_ref() == Some(&caller);
        if !is_buyer && caller != deal.seller {
            return Err(Error::Unauthorized);
        }
        match deal.state {
            DealState::Bought => {}
            DealState::Listed => return Err(Error::NotBought),
            DealState::Complained => return Err(Error::AlreadyComplained),
            _ => return Err(Error::DealClosed),
        }
        if env.ledger().timestamp() - deal.bought_at < deal.deadline {
            return Err(Error::TooEarly);
        }

        deal.state = DealState::Complained;
        Self::_store_deal(&env, deal_id, &deal);

        env.events()
            .publish((symbol_short!("complaint"), caller), (deal_id,));

        Ok(())
    }

    /// Settles a frozen deal by awarding the full pot to one party.
    ///
    /// Only the deal's snapshotted judge may resolve, exactly once, and only
    /// after a complaint. The winner must be the recorded buyer or the
    /// seller; the losing side forfeits its bond.
    ///
    /// # Arguments
    /// * `caller` - The judge (must sign)
    /// * `deal_id` - The frozen deal
    /// * `winner` - The party receiving the entire held balance
    ///
    /// # Errors
    /// - `DealNotFound`: unknown deal id
    /// - `Unauthorized`: caller is not the judge
    /// - `NoComplaint`: no complaint was brought
    /// - `DealClosed`: the deal reached a terminal state
    /// - `InvalidWinner`: winner is neither buyer nor seller
    pub fn resolve(env: Env, caller: Address, deal_id: u64, winner: Address) -> Result<(), Error> {
        caller.require_auth();

        let mut deal = Self::_load_deal(&env, deal_id)?;
        if caller != deal.judge {
            return Err(Error::Unauthorized);
        }
        match deal.state {
            DealState::Complained => {}
            DealState::Listed | DealState::Bought => return Err(Error::NoComplaint),
            _ => return Err(Error::DealClosed),
        }
        let is_buyer = deal.buyer.as_ref() == Some(&winner);
        if !is_buyer && winner != deal.seller {
            return Err(Error::InvalidWinner);
        }

        let pot = Self::_pot(&deal);
        deal.state = DealState::Resolved;
        Self::_store_deal(&env, deal_id, &deal);

        env.events()
            .publish((symbol_short!("resolved"), winner.clone()), (deal_id, pot));

        deal.asset.payout(&env, &winner, pot)
    }

    /// Withdraws an unbought listing and refunds the deposit.
    ///
    /// Only the seller may remove, and only while no buyer is recorded. The
    /// refund equals the entire held balance, which is exactly the deposit.
    ///
    /// # Errors
    /// - `DealNotFound`: unknown deal id
    /// - `Unauthorized`: caller is not the seller
    /// - `AlreadySold`: the item was bought, the deal can no longer be removed
    /// - `DealClosed`: the deal reached a terminal state
    pub fn remove_deal(env: Env, caller: Address, deal_id: u64) -> Result<(), Error> {
        caller.require_auth();

        let mut deal = Self::_load_deal(&env, deal_id)?;
        if caller != deal.seller {
            return Err(Error::Unauthorized);
        }
        match deal.state {
            DealState::Listed => {}
            DealState::Bought | DealState::Complained => return Err(Error::AlreadySold),
            _ => return Err(Error::DealClosed),
        }

        let refund = deal.deposit;
        deal.state = DealState::Removed;
        Self::_store_deal(&env, deal_id, &deal);

        env.events()
            .publish((symbol_short!("removed"), caller), (deal_id, refund));

        deal.asset.payout(&env, &deal.seller, refund)
    }

    // ================================================================================================
    // ADMINISTRATIVE FUNCTIONS
    // ================================================================================================
    // Owner-gated mutation of the factory defaults. Changes affect only
    // deals deployed afterwards; existing deals keep their snapshot.

    /// Updates the cooling-off deadline for future deployments.
    ///
    /// # Errors
    /// - `Unauthorized`: caller is not the owner
    /// - `OutOfRange`: deadline outside [one week, four weeks]
    pub fn set_deadline(env: Env, caller: Address, deadline: u64) -> Result<(), Error> {
        Self::_require_owner(&env, &caller)?;

        if !(MIN_DEADLINE..=MAX_DEADLINE).contains(&deadline) {
            log!(&env, "deadline {} outside accepted bounds", deadline);
            return Err(Error::OutOfRange);
        }
        env.storage().persistent().set(&DataKey::Deadline, &deadline);

        Ok(())
    }

    /// Updates the penalty percentage for future deployments.
    ///
    /// # Errors
    /// - `Unauthorized`: caller is not the owner
    /// - `OutOfRange`: penalty outside [1, 10]
    pub fn set_penalty(env: Env, caller: Address, penalty: u32) -> Result<(), Error> {
        Self::_require_owner(&env, &caller)?;

        if !(MIN_PENALTY..=MAX_PENALTY).contains(&penalty) {
            log!(&env, "penalty {} outside accepted bounds", penalty);
            return Err(Error::OutOfRange);
        }
        env.storage().persistent().set(&DataKey::Penalty, &penalty);

        Ok(())
    }

    /// Updates the judge identity for future deployments.
    ///
    /// # Errors
    /// - `Unauthorized`: caller is not the owner
    pub fn set_judge(env: Env, caller: Address, judge: Address) -> Result<(), Error> {
        Self::_require_owner(&env, &caller)?;
        env.storage().persistent().set(&DataKey::Judge, &judge);
        Ok(())
    }

    /// Transfers factory ownership.
    ///
    /// The new owner must also sign the transaction, so control cannot be
    /// handed to an account that did not consent.
    ///
    /// # Errors
    /// - `Unauthorized`: caller is not the current owner
    pub fn set_owner(env: Env, caller: Address, new_owner: Address) -> Result<(), Error> {
        Self::_require_owner(&env, &caller)?;
        new_owner.require_auth();

        env.storage().persistent().set(&DataKey::Owner, &new_owner);

        env.events()
            .publish((symbol_short!("owner_upd"), env.current_contract_address()), new_owner);

        Ok(())
    }

    // ================================================================================================
    // READ SURFACE
    // ================================================================================================

    /// Current factory owner.
    pub fn owner(env: Env) -> Result<Address, Error> {
        env.storage()
            .persistent()
            .get(&DataKey::Owner)
            .ok_or(Error::NotInitialized)
    }

    /// Cooling-off deadline snapshotted into future deals, in seconds.
    pub fn deadline(env: Env) -> Result<u64, Error> {
        env.storage()
            .persistent()
            .get(&DataKey::Deadline)
            .ok_or(Error::NotInitialized)
    }

    /// Penalty percentage snapshotted into future deals.
    pub fn penalty(env: Env) -> Result<u32, Error> {
        env.storage()
            .persistent()
            .get(&DataKey::Penalty)
            .ok_or(Error::NotInitialized)
    }

    /// Judge identity snapshotted into future deals.
    pub fn judge(env: Env) -> Result<Address, Error> {
        env.storage()
            .persistent()
            .get(&DataKey::Judge)
            .ok_or(Error::NotInitialized)
    }

    /// Full record of a deal.
    pub fn get_deal(env: Env, deal_id: u64) -> Result<Deal, Error> {
        Self::_load_deal(&env, deal_id)
    }

    /// Id of the seller's `index`-th token-denominated deal.
    pub fn deals(env: Env, seller: Address, index: u32) -> Result<u64, Error> {
        Self::_registry(&env, &DataKey::SellerDeals(seller))
            .get(index)
            .ok_or(Error::DealNotFound)
    }

    /// Id of the seller's `index`-th native-denominated deal.
    pub fn deals_native(env: Env, seller: Address, index: u32) -> Result<u64, Error> {
        Self::_registry(&env, &DataKey::SellerDealsNative(seller))
            .get(index)
            .ok_or(Error::DealNotFound)
    }

    /// All token-denominated deal ids of a seller, in deployment order.
    pub fn seller_deals(env: Env, seller: Address) -> Vec<u64> {
        Self::_registry(&env, &DataKey::SellerDeals(seller))
    }

    /// All native-denominated deal ids of a seller, in deployment order.
    pub fn seller_deals_native(env: Env, seller: Address) -> Vec<u64> {
        Self::_registry(&env, &DataKey::SellerDealsNative(seller))
    }

    /// Whether a complaint was brought against the deal. Stays true once
    /// the dispute is resolved.
    pub fn complained(env: Env, deal_id: u64) -> Result<bool, Error> {
        let deal = Self::_load_deal(&env, deal_id)?;
        Ok(matches!(
            deal.state,
            DealState::Complained | DealState::Resolved
        ))
    }

    /// Whether the judge already redistributed the deal's funds.
    pub fn resolved(env: Env, deal_id: u64) -> Result<bool, Error> {
        let deal = Self::_load_deal(&env, deal_id)?;
        Ok(matches!(deal.state, DealState::Resolved))
    }

    // ================================================================================================
    // INTERNAL HELPERS
    // ================================================================================================

    /// Shared deployment path for both funding variants.
    ///
    /// Records the deal with a snapshot of the current configuration,
    /// appends it to the given registry and pulls the deposit as the final
    /// step.
    fn _deploy(
        env: &Env,
        seller: Address,
        asset: EscrowAsset,
        price: i128,
        description: String,
        registry: DataKey,
    ) -> Result<u64, Error> {
        seller.require_auth();

        let deadline: u64 = env
            .storage()
            .persistent()
            .get(&DataKey::Deadline)
            .ok_or(Error::NotInitialized)?;
        let penalty: u32 = env
            .storage()
            .persistent()
            .get(&DataKey::Penalty)
            .ok_or(Error::NotInitialized)?;
        let judge: Address = env
            .storage()
            .persistent()
            .get(&DataKey::Judge)
            .ok_or(Error::NotInitialized)?;

        if price < MIN_PRICE {
            log!(env, "listing rejected: price {} below minimum", price);
            return Err(Error::PriceTooLow);
        }
        let deposit = price.saturating_mul(penalty as i128) / 100;

        let deal_id: u64 = env
            .storage()
            .instance()
            .get(&DataKey::NextDealId)
            .unwrap_or(0);

        let deal = Deal {
            seller: seller.clone(),
            buyer: None,
            asset: asset.clone(),
            price,
            penalty,
            deposit,
            deadline,
            judge,
            description,
            bought_at: 0,
            state: DealState::Listed,
        };
        Self::_store_deal(env, deal_id, &deal);

        let mut ids = Self::_registry(env, &registry);
        ids.push_back(deal_id);
        env.storage().persistent().set(&registry, &ids);
        env.storage()
            .instance()
            .set(&DataKey::NextDealId, &(deal_id + 1));

        env.events()
            .publish((symbol_short!("listed"), seller.clone()), (deal_id, price, deposit));

        asset.pull(env, &seller, deposit)?;

        Ok(deal_id)
    }

    fn _load_deal(env: &Env, deal_id: u64) -> Result<Deal, Error> {
        env.storage()
            .persistent()
            .get(&DataKey::Deal(deal_id))
            .ok_or(Error::DealNotFound)
    }

    fn _store_deal(env: &Env, deal_id: u64, deal: &Deal) {
        env.storage().persistent().set(&DataKey::Deal(deal_id), deal);
    }

    fn _registry(env: &Env, key: &DataKey) -> Vec<u64> {
        env.storage()
            .persistent()
            .get(key)
            .unwrap_or(Vec::new(env))
    }

    /// The full held balance of a bought deal: the seller's bond, the price
    /// and the buyer's matching bond.
    fn _pot(deal: &Deal) -> i128 {
        deal.price + 2 * deal.deposit
    }

    /// Verifies that `caller` signed the transaction and is the factory
    /// owner.
    fn _require_owner(env: &Env, caller: &Address) -> Result<(), Error> {
        caller.require_auth();
        let owner: Address = env
            .storage()
            .persistent()
            .get(&DataKey::Owner)
            .ok_or(Error::NotInitialized)?;
        if *caller != owner {
            return Err(Error::Unauthorized);
        }
        Ok(())
    }
}
