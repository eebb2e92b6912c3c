/*!
 * Type Definitions for the Deal Escrow Contract
 *
 * This module defines the data structures and enums used throughout the
 * deal escrow contract: the per-listing `Deal` record, its lifecycle
 * states, the storage key layout and the error taxonomy shared by the
 * factory and the deal state machine.
 */

use soroban_sdk::{contracterror, contracttype, Address, String};

use crate::asset::EscrowAsset;

// ================================================================================================
// CORE DATA STRUCTURES
// ================================================================================================

/// One escrow instance governing a single seller/buyer transaction.
///
/// A deal is created when a seller lists an item through the factory and
/// posts a security deposit. The deposit stays escrowed until a terminal
/// transition (`confirm`, `resolve` or `remove_deal`) releases the entire
/// held balance to exactly one party.
///
/// # Lifecycle
/// 1. Listed: deposit escrowed, waiting for a buyer
/// 2. Bought: buyer paid `price + deposit`, cooling-off clock running
/// 3. Complained: funds frozen, only the judge can move them
/// 4. Confirmed / Resolved / Removed: terminal, the deal's held balance is
///    zero
///
/// # Invariants
/// - `buyer` is set exactly once, by `buy`
/// - `deposit = price * penalty / 100` (integer floor)
/// - `deadline`, `penalty` and `judge` are snapshots of the factory
///   configuration at deployment time and never change afterwards
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Deal {
    /// The address that listed the item and posted the deposit
    pub seller: Address,

    /// The buyer, unset until a successful `buy`
    pub buyer: Option<Address>,

    /// Funding source holding this deal's escrowed value
    pub asset: EscrowAsset,

    /// Listing price of the item
    pub price: i128,

    /// Penalty bond size as a percentage of price, in [1, 10]
    pub penalty: u32,

    /// The bond each party posts: `price * penalty / 100`
    pub deposit: i128,

    /// Seconds a buyer must wait after purchase before complaining
    pub deadline: u64,

    /// The address empowered to award disputed funds to one party
    pub judge: Address,

    /// Opaque item label, e.g. "PS5"
    pub description: String,

    /// Ledger timestamp of the purchase; zero while unbought
    pub bought_at: u64,

    /// Current lifecycle state
    pub state: DealState,
}

// ================================================================================================
// ENUMERATIONS
// ================================================================================================

/// Lifecycle state of a deal.
///
/// # State Transition Rules
/// - Listed → Bought (`buy`)
/// - Listed → Removed (`remove_deal`, seller only)
/// - Bought → Confirmed (`confirm`, buyer only)
/// - Bought → Complained (`complain`, after the deadline)
/// - Complained → Resolved (`resolve`, judge only)
///
/// Confirmed, Resolved and Removed are terminal: the transition into them
/// pays out the entire held balance and no further mutation is accepted.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DealState {
    /// Deposit escrowed, item available for purchase
    Listed,

    /// Buyer recorded, price and buyer bond escrowed on top of the deposit
    Bought,

    /// A complaint froze the funds; only `resolve` can move them
    Complained,

    /// Buyer confirmed satisfaction, full pot paid to the seller
    Confirmed,

    /// Judge awarded the full pot to one party
    Resolved,

    /// Seller withdrew the unbought listing and recovered the deposit
    Removed,
}

// ================================================================================================
// STORAGE KEYS
// ================================================================================================

/// Storage key layout.
///
/// Factory configuration and deal records live in persistent storage; the
/// deal-id counter lives in instance storage. Registry vectors are
/// append-only and keep separate sequences for the token and native
/// variants.
#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    /// Privileged account allowed to mutate factory defaults (persistent)
    Owner,
    /// Cooling-off duration snapshotted into future deals (persistent)
    Deadline,
    /// Penalty percentage snapshotted into future deals (persistent)
    Penalty,
    /// Judge identity snapshotted into future deals (persistent)
    Judge,
    /// Address of the native asset contract (persistent)
    NativeToken,
    /// Counter for the next deal id (instance)
    NextDealId,
    /// One deal record per id (persistent)
    Deal(u64),
    /// Ordered ids of a seller's token-denominated deals (persistent)
    SellerDeals(Address),
    /// Ordered ids of a seller's native-denominated deals (persistent)
    SellerDealsNative(Address),
}

// ================================================================================================
// ERROR DEFINITIONS
// ================================================================================================

/// Error taxonomy for the factory and the deal state machine.
///
/// Every error rejects the entire invocation with no state change; the host
/// rolls back all storage writes of a failed call. There are no retries and
/// no recovery path that resumes a failed transition.
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    /// `initialize` was already called
    AlreadyInitialized = 1,

    /// Configuration read or deployment attempted before `initialize`
    NotInitialized = 2,

    /// Caller lacks the role the operation requires (owner/seller/buyer/judge)
    Unauthorized = 3,

    /// Unknown deal id, or registry index out of bounds
    DealNotFound = 4,

    /// `buy` on a deal that already has a buyer
    AlreadyBought = 5,

    /// `remove_deal` after the item was bought
    AlreadySold = 6,

    /// Caller's balance is below the required amount
    InsufficientFunds = 7,

    /// Caller has not pre-authorized enough allowance (token variant only)
    NotApproved = 8,

    /// Operation requires a prior purchase and none occurred
    NotBought = 9,

    /// Complaint raised before the deadline elapsed
    TooEarly = 10,

    /// `resolve` without a prior complaint
    NoComplaint = 11,

    /// Second complaint, or `confirm` after a complaint froze the deal
    AlreadyComplained = 12,

    /// Mutating operation against a deal in a terminal state
    DealClosed = 13,

    /// `resolve` winner is neither the recorded buyer nor the seller
    InvalidWinner = 14,

    /// Listing price below the minimum threshold
    PriceTooLow = 15,

    /// Administrative parameter outside its accepted bound
    OutOfRange = 16,

    /// A token transfer sub-invocation failed
    TransferFailed = 17,
}
