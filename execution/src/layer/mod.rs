use anyhow::{Context as _, Result};
use commonware_cryptography::ed25519::PublicKey;
use std::collections::BTreeMap;
use tracing::debug;
use wagerpool_types::{
    execution::{Event, Instruction, Key, Output, Transaction, Value},
    house::{
        Bet, Borrower, Holder, HouseError, Market, Role, Roles, Settlement, StakePool, Staker,
        TokenAccount,
    },
};

use crate::ledger::Ledger;
use crate::state::{load_account, validate_and_increment_nonce, PrepareError, State, Status};

mod handlers;

/// Staging overlay for one block.
///
/// Writes land in `pending` and only reach the underlying state through [`Layer::commit`].
/// A transaction that fails with a [`HouseError`] has its writes discarded (its nonce increment
/// is kept) and is reported as [`Event::TransactionRejected`].
pub struct Layer<'a, S: State> {
    state: &'a S,
    pending: BTreeMap<Key, Status>,

    roles: &'a Roles,
    now: u64,
}

impl<'a, S: State> Layer<'a, S> {
    pub fn new(state: &'a S, roles: &'a Roles, now: u64) -> Self {
        Self {
            state,
            pending: BTreeMap::new(),

            roles,
            now,
        }
    }

    fn insert(&mut self, key: Key, value: Value) {
        self.pending.insert(key, Status::Update(value));
    }

    fn remove(&mut self, key: Key) {
        self.pending.insert(key, Status::Delete);
    }

    /// Block timestamp (seconds) every handler in this layer observes.
    pub fn now(&self) -> u64 {
        self.now
    }

    fn authorize(&self, caller: &PublicKey, role: Role) -> Result<(), HouseError> {
        self.roles.authorize(caller, role)
    }

    async fn prepare(&mut self, transaction: &Transaction) -> Result<(), PrepareError> {
        let mut account = load_account(self, &transaction.public)
            .await
            .map_err(PrepareError::State)?;
        validate_and_increment_nonce(&mut account, transaction.nonce)?;
        self.insert(
            Key::Account(transaction.public.clone()),
            Value::Account(account),
        );

        Ok(())
    }

    async fn apply_ledger(
        &mut self,
        public: &PublicKey,
        instruction: &Instruction,
    ) -> Result<Vec<Event>> {
        match instruction {
            Instruction::Transfer { to, amount } => {
                self.handle_transfer(public, to, *amount).await
            }
            Instruction::Approve { spender, amount } => {
                self.handle_approve(public, spender, *amount).await
            }
            _ => anyhow::bail!("internal error: apply_ledger called with non-ledger instruction"),
        }
    }

    async fn apply_pool(
        &mut self,
        public: &PublicKey,
        instruction: &Instruction,
    ) -> Result<Vec<Event>> {
        match instruction {
            Instruction::Stake { amount } => self.handle_stake(public, *amount).await,
            Instruction::Withdraw { amount } => self.handle_withdraw(public, *amount).await,
            Instruction::GetReward => self.handle_get_reward(public).await,
            Instruction::Exit => self.handle_exit(public).await,
            Instruction::NotifyRewardAmount { amount } => {
                self.handle_notify_reward_amount(public, *amount).await
            }
            Instruction::SetBorrowingStatus { borrower, allowed } => {
                self.handle_set_borrowing_status(public, borrower, *allowed)
                    .await
            }
            Instruction::SetBorrowPercentage { bps } => {
                self.handle_set_borrow_percentage(public, *bps).await
            }
            Instruction::Borrow { amount } => self.handle_borrow(public, *amount).await,
            Instruction::Repay { amount } => self.handle_repay(public, *amount).await,
            _ => anyhow::bail!("internal error: apply_pool called with non-pool instruction"),
        }
    }

    async fn apply_market(
        &mut self,
        public: &PublicKey,
        instruction: &Instruction,
    ) -> Result<Vec<Event>> {
        match instruction {
            Instruction::StartMatch => self.handle_start_match(public).await,
            Instruction::PlaceBet { side, amount } => {
                self.handle_place_bet(public, *side, *amount).await
            }
            Instruction::WithdrawBet { side, amount } => {
                self.handle_withdraw_bet(public, *side, *amount).await
            }
            Instruction::EndMatch { result } => self.handle_end_match(public, *result).await,
            Instruction::WithdrawAfterMatch { match_id } => {
                self.handle_withdraw_after_match(public, *match_id).await
            }
            Instruction::SetMaxBetAmount { amount } => {
                self.handle_set_max_bet_amount(public, *amount).await
            }
            Instruction::SetMaxBetAmountPercentage { bps } => {
                self.handle_set_max_bet_amount_percentage(public, *bps)
                    .await
            }
            Instruction::SetImpliedProbability { value } => {
                self.handle_set_implied_probability(public, *value).await
            }
            Instruction::SetEarlyPercentage { percent } => {
                self.handle_set_early_percentage(public, *percent).await
            }
            Instruction::PauseWithdrawals => self.handle_set_withdrawals_paused(public, true).await,
            Instruction::UnpauseWithdrawals => {
                self.handle_set_withdrawals_paused(public, false).await
            }
            Instruction::RepayPool => self.handle_repay_pool(public).await,
            _ => anyhow::bail!("internal error: apply_market called with non-market instruction"),
        }
    }

    async fn apply(&mut self, transaction: &Transaction) -> Result<Vec<Event>> {
        let instruction = &transaction.instruction;
        let public = &transaction.public;

        match instruction {
            Instruction::Transfer { .. } | Instruction::Approve { .. } => {
                self.apply_ledger(public, instruction).await
            }

            Instruction::Stake { .. }
            | Instruction::Withdraw { .. }
            | Instruction::GetReward
            | Instruction::Exit
            | Instruction::NotifyRewardAmount { .. }
            | Instruction::SetBorrowingStatus { .. }
            | Instruction::SetBorrowPercentage { .. }
            | Instruction::Borrow { .. }
            | Instruction::Repay { .. } => self.apply_pool(public, instruction).await,

            Instruction::StartMatch
            | Instruction::PlaceBet { .. }
            | Instruction::WithdrawBet { .. }
            | Instruction::EndMatch { .. }
            | Instruction::WithdrawAfterMatch { .. }
            | Instruction::SetMaxBetAmount { .. }
            | Instruction::SetMaxBetAmountPercentage { .. }
            | Instruction::SetImpliedProbability { .. }
            | Instruction::SetEarlyPercentage { .. }
            | Instruction::PauseWithdrawals
            | Instruction::UnpauseWithdrawals
            | Instruction::RepayPool => self.apply_market(public, instruction).await,
        }
    }

    async fn load_pool(&self) -> Result<StakePool> {
        match self.get(&Key::Pool).await? {
            Some(Value::Pool(pool)) => Ok(pool),
            _ => anyhow::bail!("pool not initialized"),
        }
    }

    async fn load_market(&self) -> Result<Market> {
        match self.get(&Key::Market).await? {
            Some(Value::Market(market)) => Ok(market),
            _ => anyhow::bail!("market not initialized"),
        }
    }

    async fn get_or_init_staker(&self, public: &PublicKey) -> Result<Staker> {
        Ok(match self.get(&Key::Staker(public.clone())).await? {
            Some(Value::Staker(staker)) => staker,
            _ => Staker::default(),
        })
    }

    async fn get_or_init_borrower(&self, holder: &Holder) -> Result<Borrower> {
        Ok(match self.get(&Key::Borrower(holder.clone())).await? {
            Some(Value::Borrower(borrower)) => borrower,
            _ => Borrower::default(),
        })
    }

    async fn get_or_init_bet(&self, match_id: u64, public: &PublicKey) -> Result<Bet> {
        Ok(match self.get(&Key::Bet(match_id, public.clone())).await? {
            Some(Value::Bet(bet)) => bet,
            _ => Bet::default(),
        })
    }

    async fn get_settlement(&self, match_id: u64) -> Result<Option<Settlement>> {
        Ok(match self.get(&Key::Settlement(match_id)).await? {
            Some(Value::Settlement(settlement)) => Some(settlement),
            _ => None,
        })
    }

    async fn get_or_init_token(&self, holder: &Holder) -> Result<TokenAccount> {
        Ok(match self.get(&Key::Token(holder.clone())).await? {
            Some(Value::Token(account)) => account,
            _ => TokenAccount::default(),
        })
    }

    pub async fn execute(
        &mut self,
        transactions: Vec<Transaction>,
    ) -> Result<(Vec<Output>, BTreeMap<PublicKey, u64>)> {
        let mut processed_nonces = BTreeMap::new();
        let mut outputs = Vec::new();

        for tx in transactions {
            if !tx.verify() {
                debug!(
                    public = ?tx.public,
                    nonce = tx.nonce,
                    "invalid signature; dropping transaction"
                );
                continue;
            }
            match self.prepare(&tx).await {
                Ok(()) => {}
                Err(PrepareError::NonceMismatch { expected, got }) => {
                    debug!(
                        public = ?tx.public,
                        expected,
                        got,
                        "nonce mismatch; dropping transaction"
                    );
                    continue;
                }
                Err(PrepareError::State(err)) => {
                    return Err(err).context("state error during prepare");
                }
            }
            processed_nonces.insert(tx.public.clone(), tx.nonce.saturating_add(1));

            let checkpoint = self.pending.clone();
            match self.apply(&tx).await {
                Ok(events) => outputs.extend(events.into_iter().map(Output::Event)),
                Err(err) => {
                    let error = match err.downcast::<HouseError>() {
                        Ok(error) => error,
                        Err(err) => return Err(err).context("apply transaction"),
                    };
                    debug!(
                        public = ?tx.public,
                        nonce = tx.nonce,
                        %error,
                        "transaction rejected"
                    );
                    self.pending = checkpoint;
                    outputs.push(Output::Event(Event::TransactionRejected {
                        account: tx.public.clone(),
                        code: error.code(),
                    }));
                }
            }
            outputs.push(Output::Transaction(tx));
        }

        Ok((outputs, processed_nonces))
    }

    pub fn commit(self) -> Vec<(Key, Status)> {
        self.pending.into_iter().collect()
    }
}

impl<'a, S: State> State for Layer<'a, S> {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        Ok(match self.pending.get(key) {
            Some(Status::Update(value)) => Some(value.clone()),
            Some(Status::Delete) => None,
            None => self.state.get(key).await?,
        })
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.pending.insert(key, Status::Update(value));
        Ok(())
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        self.pending.insert(key.clone(), Status::Delete);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{create_account_keypair, create_genesis, create_state, tokens};
    use commonware_runtime::deterministic::Runner;
    use commonware_runtime::Runner as _;

    #[test]
    fn test_nonce_validation() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let (signer, public) = create_account_keypair(1);
            let genesis = create_genesis(vec![], vec![(public, tokens(10))]);
            let state = create_state(&genesis).await;
            let mut layer = Layer::new(&state, &genesis.roles, 100);

            // Wrong nonce should fail
            let tx = Transaction::sign(&signer, 1, Instruction::GetReward);
            assert!(layer.prepare(&tx).await.is_err());

            // Correct nonce should succeed
            let tx = Transaction::sign(&signer, 0, Instruction::GetReward);
            assert!(layer.prepare(&tx).await.is_ok());

            let _ = layer.commit();
        });
    }

    #[test]
    fn test_rejection_rolls_back_but_keeps_nonce() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let (signer, public) = create_account_keypair(1);
            let genesis = create_genesis(vec![], vec![(public.clone(), tokens(10))]);
            let state = create_state(&genesis).await;
            let mut layer = Layer::new(&state, &genesis.roles, 100);

            // Approval lands, then the stake fails on funds after mutating the pool in the overlay.
            let (outputs, nonces) = layer
                .execute(vec![
                    Transaction::sign(
                        &signer,
                        0,
                        Instruction::Approve {
                            spender: Holder::Pool,
                            amount: tokens(50),
                        },
                    ),
                    Transaction::sign(
                        &signer,
                        1,
                        Instruction::Stake {
                            amount: tokens(20),
                        },
                    ),
                ])
                .await
                .unwrap();

            assert!(outputs.iter().any(|output| matches!(
                output,
                Output::Event(Event::TransactionRejected { account, code })
                    if account == &public && *code == HouseError::InsufficientFunds.code()
            )));
            assert_eq!(nonces.get(&public), Some(&2));

            let pool = layer.load_pool().await.unwrap();
            assert_eq!(pool.total_staked, 0);
            assert_eq!(layer.get_or_init_staker(&public).await.unwrap().principal, 0);
            let token = layer
                .get_or_init_token(&Holder::Account(public.clone()))
                .await
                .unwrap();
            assert_eq!(token.balance, tokens(10));
            assert_eq!(token.allowance(&Holder::Pool), tokens(50));
            assert!(matches!(
                layer.get(&Key::Account(public)).await.unwrap(),
                Some(Value::Account(account)) if account.nonce == 2
            ));
        });
    }

    #[test]
    fn test_invalid_signature_is_dropped() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let (signer, public) = create_account_keypair(1);
            let genesis = create_genesis(vec![], vec![]);
            let state = create_state(&genesis).await;
            let mut layer = Layer::new(&state, &genesis.roles, 100);

            let mut tx = Transaction::sign(&signer, 0, Instruction::GetReward);
            tx.instruction = Instruction::Exit;
            let (outputs, nonces) = layer.execute(vec![tx]).await.unwrap();

            assert!(outputs.is_empty());
            assert!(nonces.is_empty());
            assert!(layer.get(&Key::Account(public)).await.unwrap().is_none());
        });
    }
}
