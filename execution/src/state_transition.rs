//! Apply a block's transactions to state.
//!
//! Blocks are applied strictly in height order. Re-submitting an already applied height is a
//! no-op, so a caller that crashed after committing can safely replay its last block.

use crate::{committed, Layer, State};
use anyhow::{anyhow, Context as _};
use commonware_cryptography::ed25519::PublicKey;
use std::collections::BTreeMap;
use tracing::info;
use wagerpool_types::{
    execution::{Key, Output, Transaction, Value},
    house::Roles,
};

/// What a block did to state.
pub struct StateTransitionResult {
    pub height: u64,
    pub timestamp: u64,
    /// Events and included transactions, closed by an [`Output::Commit`].
    pub outputs: Vec<Output>,
    /// Next expected nonce of every account that had a transaction included.
    pub processed_nonces: BTreeMap<PublicKey, u64>,
}

/// Applies `transactions` as block `height`.
///
/// Only processes the block if it is the next expected height and its timestamp does not move
/// backwards. Domain failures inside the block are reported as rejection events; only storage
/// errors fail the whole transition.
pub async fn execute_state_transition<S: State>(
    state: &mut S,
    roles: &Roles,
    height: u64,
    timestamp: u64,
    transactions: Vec<Transaction>,
) -> anyhow::Result<StateTransitionResult> {
    let (state_height, state_timestamp) = committed(state).await.context("read commit")?;

    // Already applied.
    if height <= state_height {
        return Ok(StateTransitionResult {
            height: state_height,
            timestamp: state_timestamp,
            outputs: Vec::new(),
            processed_nonces: BTreeMap::new(),
        });
    }

    let expected_next_height = state_height.saturating_add(1);
    if height != expected_next_height {
        return Err(anyhow!(
            "non-sequential height: state_height={state_height}, expected={expected_next_height}, requested={height}"
        ));
    }
    if timestamp < state_timestamp {
        return Err(anyhow!(
            "timestamp moved backwards: state_timestamp={state_timestamp}, requested={timestamp}"
        ));
    }

    let mut layer = Layer::new(&*state, roles, timestamp);
    let (mut outputs, processed_nonces) = layer
        .execute(transactions)
        .await
        .with_context(|| format!("execute layer (height={height})"))?;
    let changes = layer.commit();

    state
        .apply(changes)
        .await
        .with_context(|| format!("apply state changes (height={height})"))?;
    state
        .insert(Key::Commit, Value::Commit { height, timestamp })
        .await
        .with_context(|| format!("commit state (height={height})"))?;
    outputs.push(Output::Commit { height, timestamp });

    info!(
        height,
        timestamp,
        outputs = outputs.len(),
        accounts = processed_nonces.len(),
        "committed block"
    );
    Ok(StateTransitionResult {
        height,
        timestamp,
        outputs,
        processed_nonces,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{create_account_keypair, create_genesis, create_state, tokens};
    use commonware_runtime::deterministic::Runner;
    use commonware_runtime::Runner as _;
    use wagerpool_types::execution::Instruction;
    use wagerpool_types::house::Holder;

    #[test]
    fn heights_apply_in_order() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let (signer, public) = create_account_keypair(1);
            let genesis = create_genesis(vec![], vec![(public.clone(), tokens(10))]);
            let mut state = create_state(&genesis).await;

            let tx = Transaction::sign(
                &signer,
                0,
                Instruction::Approve {
                    spender: Holder::Market,
                    amount: 1,
                },
            );
            let result = execute_state_transition(&mut state, &genesis.roles, 1, 50, vec![tx])
                .await
                .unwrap();
            assert_eq!(result.height, 1);
            assert_eq!(result.processed_nonces.get(&public), Some(&1));
            assert!(matches!(
                result.outputs.last(),
                Some(Output::Commit {
                    height: 1,
                    timestamp: 50
                })
            ));
            assert_eq!(committed(&state).await.unwrap(), (1, 50));

            // Replaying an applied height changes nothing.
            let replay = execute_state_transition(&mut state, &genesis.roles, 1, 60, vec![])
                .await
                .unwrap();
            assert!(replay.outputs.is_empty());
            assert_eq!(committed(&state).await.unwrap(), (1, 50));

            // Gaps are refused.
            assert!(
                execute_state_transition(&mut state, &genesis.roles, 3, 60, vec![])
                    .await
                    .is_err()
            );
        });
    }

    #[test]
    fn timestamp_cannot_regress() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let genesis = create_genesis(vec![], vec![]);
            let mut state = create_state(&genesis).await;

            execute_state_transition(&mut state, &genesis.roles, 1, 100, vec![])
                .await
                .unwrap();
            assert!(
                execute_state_transition(&mut state, &genesis.roles, 2, 99, vec![])
                    .await
                    .is_err()
            );
            // Same second is fine.
            execute_state_transition(&mut state, &genesis.roles, 2, 100, vec![])
                .await
                .unwrap();
            assert_eq!(committed(&state).await.unwrap(), (2, 100));
        });
    }
}
