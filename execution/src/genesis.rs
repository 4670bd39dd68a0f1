//! Initial state derived from a validated [`Genesis`].

use anyhow::{bail, Result};
use commonware_cryptography::ed25519::PublicKey;
use std::collections::BTreeMap;
use wagerpool_types::{
    execution::{Key, Value},
    house::{Amount, Borrower, Holder, TokenAccount},
    Genesis,
};

use crate::state::{State, Status};

/// State writes that bring an empty store to genesis.
///
/// Duplicate allocations to one account are summed.
pub fn genesis_changes(genesis: &Genesis) -> Vec<(Key, Status)> {
    let mut changes = vec![
        (Key::Pool, Status::Update(Value::Pool(genesis.pool.clone()))),
        (
            Key::Market,
            Status::Update(Value::Market(genesis.market.clone())),
        ),
    ];
    if genesis.market_can_borrow {
        changes.push((
            Key::Borrower(Holder::Market),
            Status::Update(Value::Borrower(Borrower {
                allowed: true,
                borrowed_amount: 0,
            })),
        ));
    }

    let mut balances: BTreeMap<PublicKey, Amount> = BTreeMap::new();
    for (public, amount) in &genesis.allocations {
        let balance = balances.entry(public.clone()).or_default();
        *balance = balance.saturating_add(*amount);
    }
    changes.extend(balances.into_iter().map(|(public, balance)| {
        (
            Key::Token(Holder::Account(public)),
            Status::Update(Value::Token(TokenAccount {
                balance,
                ..Default::default()
            })),
        )
    }));

    changes
}

/// Writes genesis into an empty store.
pub async fn initialize<S: State>(state: &mut S, genesis: &Genesis) -> Result<()> {
    if state.get(&Key::Pool).await?.is_some() {
        bail!("state already initialized");
    }
    state.apply(genesis_changes(genesis)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{create_account_keypair, create_genesis, tokens};
    use crate::state::Memory;
    use commonware_runtime::deterministic::Runner;
    use commonware_runtime::Runner as _;

    #[test]
    fn initialize_writes_pool_market_and_balances() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let (_, alice) = create_account_keypair(1);
            let genesis = create_genesis(
                vec![],
                vec![(alice.clone(), tokens(5)), (alice.clone(), tokens(7))],
            );
            let mut state = Memory::default();
            initialize(&mut state, &genesis).await.unwrap();

            assert!(matches!(
                state.get(&Key::Pool).await.unwrap(),
                Some(Value::Pool(pool)) if pool == genesis.pool
            ));
            assert!(matches!(
                state.get(&Key::Borrower(Holder::Market)).await.unwrap(),
                Some(Value::Borrower(Borrower { allowed: true, .. }))
            ));
            assert!(matches!(
                state.get(&Key::Token(Holder::Account(alice))).await.unwrap(),
                Some(Value::Token(account)) if account.balance == tokens(12)
            ));

            // Second initialization is refused.
            assert!(initialize(&mut state, &genesis).await.is_err());
        });
    }

    #[test]
    fn market_credit_line_is_optional() {
        let mut genesis = create_genesis(vec![], vec![]);
        genesis.market_can_borrow = false;
        assert!(genesis_changes(&genesis)
            .iter()
            .all(|(key, _)| !matches!(key, Key::Borrower(_))));
    }
}
