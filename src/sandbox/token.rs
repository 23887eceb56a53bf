use std::collections::HashMap;
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use crate::utils::{Result, RouterError, ScreenerError};

/// Revert reason the router reports when a token refuses to be pulled
pub const TRANSFER_FROM_FAILED: &str = "TransferHelper: TRANSFER_FROM_FAILED";

/// Scripted transfer rules; the owner is always exempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenBehavior {
    Standard,
    /// Skims `bps` basis points of every transfer to the owner
    TransferFee { bps: u16 },
    /// Any transfer into the pool is refused
    SellBlocked,
    /// Transfers into the pool are refused when the seller has code
    ContractSellersBlocked,
    /// Only the pool may send tokens
    TransfersBlocked,
}

impl TokenBehavior {
    pub const MAX_FEE_BPS: u16 = 10_000;

    pub fn validate(&self) -> Result<()> {
        match self {
            TokenBehavior::TransferFee { bps } if *bps > Self::MAX_FEE_BPS => Err(ScreenerError::SimulationError(
                format!("transfer fee of {} bps exceeds 100%", bps),
            )),
            _ => Ok(()),
        }
    }
}

/// Who is moving tokens, as far as the token can tell
#[derive(Debug, Clone, Copy)]
pub(crate) struct TransferScope {
    pub pair: Address,
    pub sender_has_code: bool,
}

#[derive(Debug, Clone)]
pub struct SandboxToken {
    pub owner: Address,
    pub behavior: TokenBehavior,
    pub total_supply: U256,
    balances: HashMap<Address, U256>,
}

impl SandboxToken {
    pub fn new(owner: Address, supply: U256, behavior: TokenBehavior) -> Self {
        let mut balances = HashMap::new();
        balances.insert(owner, supply);
        Self {
            owner,
            behavior,
            total_supply: supply,
            balances,
        }
    }

    pub fn balance_of(&self, holder: Address) -> U256 {
        self.balances.get(&holder).copied().unwrap_or_default()
    }

    /// Move `amount` from `from` to `to`, returning what `to` was credited.
    /// Nothing is mutated when the transfer is refused.
    pub(crate) fn transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: U256,
        scope: TransferScope,
    ) -> Result<U256> {
        let exempt = from == self.owner || to == self.owner;
        let into_pool = to == scope.pair;

        if !exempt && self.behavior == TokenBehavior::TransfersBlocked && from != scope.pair {
            return Err(RouterError::new("transfers are disabled").into());
        }

        if !exempt && into_pool {
            match self.behavior {
                TokenBehavior::SellBlocked => {
                    return Err(RouterError::new(TRANSFER_FROM_FAILED).into());
                }
                TokenBehavior::ContractSellersBlocked if scope.sender_has_code => {
                    return Err(RouterError::new(TRANSFER_FROM_FAILED).into());
                }
                _ => {}
            }
        }

        let balance = self.balance_of(from);
        if balance < amount {
            return Err(RouterError::new("ERC20: transfer amount exceeds balance").into());
        }

        let fee = match self.behavior {
            TokenBehavior::TransferFee { bps } if !exempt => amount
                .checked_mul(U256::from(bps))
                .ok_or(ScreenerError::Overflow("transfer fee"))?
                / U256::from(10_000u64),
            _ => U256::zero(),
        };
        let credited = amount
            .checked_sub(fee)
            .ok_or(ScreenerError::Overflow("transfer fee exceeds amount"))?;

        self.balances.insert(from, balance - amount);
        self.credit(to, credited)?;
        if !fee.is_zero() {
            let owner = self.owner;
            self.credit(owner, fee)?;
        }

        Ok(credited)
    }

    fn credit(&mut self, holder: Address, amount: U256) -> Result<()> {
        let entry = self.balances.entry(holder).or_default();
        *entry = entry
            .checked_add(amount)
            .ok_or(ScreenerError::Overflow("token balance"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn scope(sender_has_code: bool) -> TransferScope {
        TransferScope {
            pair: addr(0xee),
            sender_has_code,
        }
    }

    fn funded(behavior: TokenBehavior) -> SandboxToken {
        let mut token = SandboxToken::new(addr(1), U256::from(1_000_000), behavior);
        token.transfer(addr(1), addr(2), U256::from(10_000), scope(false)).unwrap();
        token
    }

    #[test]
    fn test_fee_is_skimmed_to_owner() {
        let mut token = funded(TokenBehavior::TransferFee { bps: 500 });

        let credited = token.transfer(addr(2), addr(3), U256::from(1_000), scope(false)).unwrap();

        assert_eq!(credited, U256::from(950));
        assert_eq!(token.balance_of(addr(3)), U256::from(950));
        assert_eq!(token.balance_of(addr(1)), U256::from(990_050));
    }

    #[test]
    fn test_owner_transfers_are_exempt() {
        let token = funded(TokenBehavior::TransferFee { bps: 500 });
        assert_eq!(token.balance_of(addr(2)), U256::from(10_000));

        let mut blocked = funded(TokenBehavior::SellBlocked);
        blocked.transfer(addr(1), addr(0xee), U256::from(5), scope(false)).unwrap();
    }

    #[test]
    fn test_sell_blocked_leaves_balances_untouched() {
        let mut token = funded(TokenBehavior::SellBlocked);

        let err = token.transfer(addr(2), addr(0xee), U256::from(1), scope(false)).unwrap_err();

        assert_eq!(err.as_router_error(), Some(&RouterError::new(TRANSFER_FROM_FAILED)));
        assert_eq!(token.balance_of(addr(2)), U256::from(10_000));
    }

    #[test]
    fn test_contract_sellers_blocked_only_with_code() {
        let mut token = funded(TokenBehavior::ContractSellersBlocked);

        assert!(token.transfer(addr(2), addr(0xee), U256::from(1), scope(true)).is_err());
        assert!(token.transfer(addr(2), addr(0xee), U256::from(1), scope(false)).is_ok());
    }

    #[test]
    fn test_fee_above_amount_is_an_error() {
        // bypasses deploy-time validation
        let mut token = funded(TokenBehavior::TransferFee { bps: 20_000 });

        let err = token.transfer(addr(2), addr(3), U256::from(1_000), scope(false)).unwrap_err();
        assert!(matches!(err, ScreenerError::Overflow(_)));
        assert_eq!(token.balance_of(addr(2)), U256::from(10_000));
    }

    #[test]
    fn test_fee_behavior_validation() {
        assert!(TokenBehavior::TransferFee { bps: 10_000 }.validate().is_ok());
        assert!(TokenBehavior::TransferFee { bps: 10_001 }.validate().is_err());
        assert!(TokenBehavior::SellBlocked.validate().is_ok());
    }

    #[test]
    fn test_transfers_blocked_except_from_pool() {
        let mut token = funded(TokenBehavior::TransfersBlocked);
        token.transfer(addr(1), addr(0xee), U256::from(100), scope(false)).unwrap();

        assert!(token.transfer(addr(0xee), addr(2), U256::from(10), scope(false)).is_ok());
        let err = token.transfer(addr(2), addr(3), U256::from(1), scope(false)).unwrap_err();
        assert!(err.as_router_error().is_some());
    }

    #[test]
    fn test_insufficient_balance() {
        let mut token = funded(TokenBehavior::Standard);
        let err = token.transfer(addr(2), addr(3), U256::from(10_001), scope(false)).unwrap_err();
        assert!(err.as_router_error().is_some());
    }
}
