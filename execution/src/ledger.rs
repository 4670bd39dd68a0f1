//! Token movements between external accounts and program custody.
//!
//! The pool and the market never hold balances in their own records; every value movement goes
//! through this trait so it is staged in the same overlay as the state change that caused it and
//! is rolled back with it.

use anyhow::Result;
use std::future::Future;
use wagerpool_types::house::{Amount, Holder};

pub trait Ledger {
    fn balance_of(&self, holder: &Holder) -> impl Future<Output = Result<Amount>>;

    /// Pull `amount` from `from` into `custodian`.
    ///
    /// External accounts must have approved `custodian` for at least `amount`; custody accounts
    /// move freely between each other.
    fn transfer_in(
        &mut self,
        custodian: &Holder,
        from: &Holder,
        amount: Amount,
    ) -> impl Future<Output = Result<()>>;

    /// Pay `amount` out of `custodian` to `to`.
    fn transfer_out(
        &mut self,
        custodian: &Holder,
        to: &Holder,
        amount: Amount,
    ) -> impl Future<Output = Result<()>>;
}
