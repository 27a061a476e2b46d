use super::request::{Fee, Requester};
use crate::error::EngineError;

/// Accumulates the fees paid for registered requests.
///
/// Only the configured owner may drain it.
#[derive(Debug, Clone, PartialEq)]
pub struct Treasury {
    owner: Requester,
    balance: Fee,
}

impl Treasury {
    pub fn new(owner: Requester) -> Self {
        Self {
            owner,
            balance: Fee::ZERO,
        }
    }

    pub fn owner(&self) -> &Requester {
        &self.owner
    }

    pub fn balance(&self) -> Fee {
        self.balance
    }

    /// Adds `fee` to the balance. On overflow the balance is left unchanged.
    pub fn credit(&mut self, fee: Fee) -> Result<(), EngineError> {
        self.balance = self.balance.checked_add(fee)?;
        Ok(())
    }

    /// Returns the whole balance and resets it to zero.
    pub fn withdraw(&mut self, caller: &Requester) -> Result<Fee, EngineError> {
        if caller != &self.owner {
            return Err(EngineError::Unauthorized(caller.to_string()));
        }
        Ok(std::mem::take(&mut self.balance))
    }
}
