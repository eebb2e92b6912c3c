/*!
 * Escrow Funding Abstraction
 *
 * A deal's value moves through one of two funding sources: an arbitrary
 * fungible token contract, or the native asset contract. Both expose the
 * standard token interface, but the pull side differs: token deals are
 * funded out of a pre-authorized allowance (`approve` + `transfer_from`),
 * native deals by a direct authorized transfer from the payer.
 *
 * The deal state machine is written once against this abstraction; the
 * factory instantiates it twice, once per funding kind.
 */

use soroban_sdk::{contracttype, log, token, Address, Env};

use crate::types::{DataKey, Error};

/// Funding source of a deal's escrowed value.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EscrowAsset {
    /// A fungible token contract, pulled via allowance
    Token(Address),
    /// The native asset contract configured at initialization
    Native,
}

impl EscrowAsset {
    /// Resolves the token contract this funding source moves value through.
    fn token_address(&self, env: &Env) -> Result<Address, Error> {
        match self {
            EscrowAsset::Token(id) => Ok(id.clone()),
            EscrowAsset::Native => env
                .storage()
                .persistent()
                .get(&DataKey::NativeToken)
                .ok_or(Error::NotInitialized),
        }
    }

    /// Pulls `amount` from `from` into the contract's escrow balance.
    ///
    /// Token variant: `from` must hold at least `amount`
    /// (`InsufficientFunds`) and must have pre-authorized at least `amount`
    /// to this contract (`NotApproved`); the value moves via `transfer_from`.
    ///
    /// Native variant: `from` must hold at least `amount`
    /// (`InsufficientFunds`); the value moves via a direct transfer
    /// authorized by `from`. Exactly `amount` is pulled, so over-payment
    /// cannot occur.
    pub fn pull(&self, env: &Env, from: &Address, amount: i128) -> Result<(), Error> {
        let client = token::Client::new(env, &self.token_address(env)?);
        let escrow = env.current_contract_address();

        if client.balance(from) < amount {
            log!(env, "escrow pull rejected: balance below {}", amount);
            return Err(Error::InsufficientFunds);
        }

        match self {
            EscrowAsset::Token(_) => {
                if client.allowance(from, &escrow) < amount {
                    log!(env, "escrow pull rejected: allowance below {}", amount);
                    return Err(Error::NotApproved);
                }
                match client.try_transfer_from(&escrow, from, &escrow, &amount) {
                    Ok(_) => Ok(()),
                    Err(_) => Err(Error::TransferFailed),
                }
            }
            EscrowAsset::Native => match client.try_transfer(from, &escrow, &amount) {
                Ok(_) => Ok(()),
                Err(_) => Err(Error::TransferFailed),
            },
        }
    }

    /// Pays `amount` out of escrow to `to`.
    ///
    /// Callers must have finalized every state flag before invoking this;
    /// the payout is the last state-mutating step of any terminal
    /// transition.
    pub fn payout(&self, env: &Env, to: &Address, amount: i128) -> Result<(), Error> {
        let client = token::Client::new(env, &self.token_address(env)?);
        match client.try_transfer(&env.current_contract_address(), to, &amount) {
            Ok(_) => Ok(()),
            Err(_) => {
                log!(env, "escrow payout of {} failed", amount);
                Err(Error::TransferFailed)
            }
        }
    }
}
