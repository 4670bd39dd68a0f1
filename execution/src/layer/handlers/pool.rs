use super::super::*;
use super::require;
use wagerpool_types::house::{Amount, BASIS_POINTS};

impl<'a, S: State> Layer<'a, S> {
    /// Pool with reward accrual folded in up to the block timestamp.
    async fn checkpointed_pool(&self) -> Result<StakePool> {
        let mut pool = self.load_pool().await?;
        pool.checkpoint(self.now)?;
        Ok(pool)
    }

    /// Staker with earnings settled against an already checkpointed pool.
    async fn checkpointed_staker(&self, pool: &StakePool, public: &PublicKey) -> Result<Staker> {
        let mut staker = self.get_or_init_staker(public).await?;
        staker.checkpoint(pool.reward_per_token_stored)?;
        Ok(staker)
    }

    fn store_staker(&mut self, public: &PublicKey, pool: StakePool, staker: Staker) {
        self.insert(Key::Pool, Value::Pool(pool));
        self.insert(Key::Staker(public.clone()), Value::Staker(staker));
    }

    pub(in crate::layer) async fn handle_stake(
        &mut self,
        public: &PublicKey,
        amount: Amount,
    ) -> Result<Vec<Event>> {
        require(amount > 0, HouseError::InvalidAmount)?;
        let mut pool = self.checkpointed_pool().await?;
        let mut staker = self.checkpointed_staker(&pool, public).await?;

        staker.principal = staker
            .principal
            .checked_add(amount)
            .ok_or(HouseError::Overflow)?;
        pool.total_staked = pool
            .total_staked
            .checked_add(amount)
            .ok_or(HouseError::Overflow)?;
        self.store_staker(public, pool, staker);
        self.transfer_in(&Holder::Pool, &Holder::Account(public.clone()), amount)
            .await?;

        Ok(vec![Event::Staked {
            staker: public.clone(),
            amount,
        }])
    }

    pub(in crate::layer) async fn handle_withdraw(
        &mut self,
        public: &PublicKey,
        amount: Amount,
    ) -> Result<Vec<Event>> {
        require(amount > 0, HouseError::InvalidAmount)?;
        let mut pool = self.checkpointed_pool().await?;
        let mut staker = self.checkpointed_staker(&pool, public).await?;
        require(amount <= staker.principal, HouseError::InsufficientStake)?;

        staker.principal -= amount;
        pool.total_staked = pool.total_staked.saturating_sub(amount);
        self.store_staker(public, pool, staker);
        self.transfer_out(&Holder::Pool, &Holder::Account(public.clone()), amount)
            .await?;

        Ok(vec![Event::Withdrawn {
            staker: public.clone(),
            amount,
        }])
    }

    pub(in crate::layer) async fn handle_get_reward(
        &mut self,
        public: &PublicKey,
    ) -> Result<Vec<Event>> {
        let pool = self.checkpointed_pool().await?;
        let mut staker = self.checkpointed_staker(&pool, public).await?;

        let reward = std::mem::take(&mut staker.accrued_rewards);
        self.store_staker(public, pool, staker);
        if reward == 0 {
            return Ok(vec![]);
        }
        self.transfer_out(&Holder::Pool, &Holder::Account(public.clone()), reward)
            .await?;

        Ok(vec![Event::RewardPaid {
            staker: public.clone(),
            amount: reward,
        }])
    }

    pub(in crate::layer) async fn handle_exit(&mut self, public: &PublicKey) -> Result<Vec<Event>> {
        let principal = self.get_or_init_staker(public).await?.principal;
        require(principal > 0, HouseError::InvalidAmount)?;

        let mut events = self.handle_withdraw(public, principal).await?;
        events.extend(self.handle_get_reward(public).await?);
        Ok(events)
    }

    pub(in crate::layer) async fn handle_notify_reward_amount(
        &mut self,
        public: &PublicKey,
        amount: Amount,
    ) -> Result<Vec<Event>> {
        self.authorize(public, Role::PoolAdmin)?;
        let mut pool = self.checkpointed_pool().await?;
        pool.notify_reward_amount(amount, self.now)?;

        let event = Event::RewardAdded {
            amount,
            reward_rate: pool.reward_rate,
            period_finish: pool.period_finish,
        };
        self.insert(Key::Pool, Value::Pool(pool));
        self.transfer_in(&Holder::Pool, &Holder::Account(public.clone()), amount)
            .await?;

        Ok(vec![event])
    }

    pub(in crate::layer) async fn handle_set_borrowing_status(
        &mut self,
        public: &PublicKey,
        borrower: &Holder,
        allowed: bool,
    ) -> Result<Vec<Event>> {
        self.authorize(public, Role::PoolAdmin)?;
        let mut record = self.get_or_init_borrower(borrower).await?;
        record.allowed = allowed;
        self.insert(Key::Borrower(borrower.clone()), Value::Borrower(record));

        Ok(vec![Event::BorrowingStatusSet {
            borrower: borrower.clone(),
            allowed,
        }])
    }

    pub(in crate::layer) async fn handle_set_borrow_percentage(
        &mut self,
        public: &PublicKey,
        bps: u16,
    ) -> Result<Vec<Event>> {
        self.authorize(public, Role::PoolAdmin)?;
        require(bps as u128 <= BASIS_POINTS, HouseError::InvalidPercentage)?;
        let mut pool = self.load_pool().await?;
        pool.borrow_percentage_bps = bps;
        self.insert(Key::Pool, Value::Pool(pool));

        Ok(vec![Event::BorrowPercentageSet { bps }])
    }

    pub(in crate::layer) async fn handle_borrow(
        &mut self,
        public: &PublicKey,
        amount: Amount,
    ) -> Result<Vec<Event>> {
        self.pool_borrow(&Holder::Account(public.clone()), amount)
            .await
    }

    pub(in crate::layer) async fn handle_repay(
        &mut self,
        public: &PublicKey,
        amount: Amount,
    ) -> Result<Vec<Event>> {
        self.pool_repay(&Holder::Account(public.clone()), amount)
            .await
    }

    /// Extends credit to `borrower`, bounded per borrower by the pool's borrow limit.
    pub(in crate::layer) async fn pool_borrow(
        &mut self,
        borrower: &Holder,
        amount: Amount,
    ) -> Result<Vec<Event>> {
        require(amount > 0, HouseError::InvalidAmount)?;
        let mut record = self.get_or_init_borrower(borrower).await?;
        require(record.allowed, HouseError::NotAllowedToBorrow)?;

        let mut pool = self.load_pool().await?;
        let debt = record
            .borrowed_amount
            .checked_add(amount)
            .ok_or(HouseError::Overflow)?;
        require(debt <= pool.borrow_limit()?, HouseError::ExceedsBorrowLimit)?;

        record.borrowed_amount = debt;
        pool.total_borrowed = pool
            .total_borrowed
            .checked_add(amount)
            .ok_or(HouseError::Overflow)?;
        self.insert(Key::Borrower(borrower.clone()), Value::Borrower(record));
        self.insert(Key::Pool, Value::Pool(pool));
        self.transfer_out(&Holder::Pool, borrower, amount).await?;

        Ok(vec![Event::Borrowed {
            borrower: borrower.clone(),
            amount,
        }])
    }

    pub(in crate::layer) async fn pool_repay(
        &mut self,
        borrower: &Holder,
        amount: Amount,
    ) -> Result<Vec<Event>> {
        require(amount > 0, HouseError::InvalidAmount)?;
        let mut record = self.get_or_init_borrower(borrower).await?;
        require(
            amount <= record.borrowed_amount,
            HouseError::RepaymentExceedsBorrowed,
        )?;

        let mut pool = self.load_pool().await?;
        record.borrowed_amount -= amount;
        pool.total_borrowed = pool.total_borrowed.saturating_sub(amount);
        self.insert(Key::Borrower(borrower.clone()), Value::Borrower(record));
        self.insert(Key::Pool, Value::Pool(pool));
        self.transfer_in(&Holder::Pool, borrower, amount).await?;

        Ok(vec![Event::Repaid {
            borrower: borrower.clone(),
            amount,
        }])
    }
}
