use super::super::*;
use super::require;
use tracing::warn;
use wagerpool_types::house::{
    blend_odds, cash_out_value, payout_at, Amount, MatchResult, MatchStatus, Side,
    MAX_BET_AMOUNT_PERCENTAGE_BPS, MAX_IMPLIED_PROBABILITY, MIN_IMPLIED_PROBABILITY,
};

impl<'a, S: State> Layer<'a, S> {
    /// Market that is currently accepting bets.
    async fn active_market(&self) -> Result<Market> {
        let market = self.load_market().await?;
        match market.status {
            MatchStatus::NotStarted => Err(HouseError::MatchNotStarted.into()),
            MatchStatus::Ended => Err(HouseError::MatchEnded.into()),
            MatchStatus::Active => Ok(market),
        }
    }

    /// Market custody not reserved for settled winners.
    async fn free_market_balance(&self, market: &Market) -> Result<Amount> {
        let balance = self.balance_of(&Holder::Market).await?;
        Ok(balance.saturating_sub(market.unclaimed_payouts))
    }

    /// Repays as much of the market's pool debt as its free balance covers.
    async fn repay_market_debt(&mut self, market: &mut Market) -> Result<Vec<Event>> {
        let free = self.free_market_balance(market).await?;
        let repay = market.borrowed_from_pool.min(free);
        if repay < market.borrowed_from_pool {
            warn!(
                match_id = market.match_id,
                borrowed = market.borrowed_from_pool,
                repay,
                "market cannot fully repay the pool"
            );
        }
        if repay == 0 {
            return Ok(vec![]);
        }
        market.borrowed_from_pool -= repay;
        self.pool_repay(&Holder::Market, repay).await
    }

    fn parameters_updated(market: &Market) -> Vec<Event> {
        vec![Event::MarketParametersUpdated {
            max_bet_amount: market.max_bet_amount,
            implied_probability: market.implied_probability,
            early_withdrawal_bps: market.early_withdrawal_bps,
        }]
    }

    pub(in crate::layer) async fn handle_start_match(
        &mut self,
        public: &PublicKey,
    ) -> Result<Vec<Event>> {
        self.authorize(public, Role::MarketOperator)?;
        let mut market = self.load_market().await?;
        require(
            market.status != MatchStatus::Active,
            HouseError::MatchOngoing,
        )?;

        let half = market.seed_per_side()?;
        let seed = half.checked_mul(2).ok_or(HouseError::Overflow)?;
        market.match_id += 1;
        market.status = MatchStatus::Active;
        market.result = MatchResult::Undecided;
        market.total_team_a = half;
        market.total_team_b = half;
        market.house_per_side = half;
        market.borrowed_from_pool = market
            .borrowed_from_pool
            .checked_add(seed)
            .ok_or(HouseError::Overflow)?;

        let match_id = market.match_id;
        self.insert(Key::Market, Value::Market(market));
        let mut events = self.pool_borrow(&Holder::Market, seed).await?;
        events.push(Event::MatchStarted { match_id, seed });
        Ok(events)
    }

    pub(in crate::layer) async fn handle_place_bet(
        &mut self,
        public: &PublicKey,
        side: Side,
        amount: Amount,
    ) -> Result<Vec<Event>> {
        let mut market = self.active_market().await?;
        require(!market.withdrawals_paused, HouseError::Paused)?;
        require(
            amount > 0 && amount <= market.max_bet_amount,
            HouseError::InvalidBetAmount,
        )?;

        let total = market.side_total_mut(side);
        *total = total.checked_add(amount).ok_or(HouseError::Overflow)?;
        let odds = market.odds(side)?;

        let mut bet = self.get_or_init_bet(market.match_id, public).await?;
        let (held, placement_odds) = bet.position_mut(side);
        *placement_odds = blend_odds(*held, *placement_odds, amount, odds)?;
        *held = held.checked_add(amount).ok_or(HouseError::Overflow)?;

        self.insert(Key::Bet(market.match_id, public.clone()), Value::Bet(bet));
        self.insert(Key::Market, Value::Market(market));
        self.transfer_in(&Holder::Market, &Holder::Account(public.clone()), amount)
            .await?;

        Ok(vec![Event::BetPlaced {
            bettor: public.clone(),
            amount,
            side,
        }])
    }

    pub(in crate::layer) async fn handle_withdraw_bet(
        &mut self,
        public: &PublicKey,
        side: Side,
        amount: Amount,
    ) -> Result<Vec<Event>> {
        let mut market = self.active_market().await?;
        require(!market.withdrawals_paused, HouseError::Paused)?;
        require(amount > 0, HouseError::InvalidBetAmount)?;

        let key = Key::Bet(market.match_id, public.clone());
        let mut bet = self.get_or_init_bet(market.match_id, public).await?;
        require(
            amount <= bet.amount(side),
            HouseError::InsufficientBetAmount,
        )?;

        // Priced against the book as it stands before the stake leaves it.
        let value = cash_out_value(
            amount,
            bet.placement_odds(side),
            market.odds(side)?,
            market.early_withdrawal_bps,
        )?;

        let (held, placement_odds) = bet.position_mut(side);
        *held -= amount;
        if *held == 0 {
            *placement_odds = 0;
        }
        let total = market.side_total_mut(side);
        *total = total.saturating_sub(amount);

        if bet.is_empty() {
            self.remove(key);
        } else {
            self.insert(key, Value::Bet(bet));
        }
        self.insert(Key::Market, Value::Market(market));
        self.transfer_out(&Holder::Market, &Holder::Account(public.clone()), value)
            .await?;

        Ok(vec![Event::BetWithdrawn {
            bettor: public.clone(),
            amount: value,
            side,
        }])
    }

    pub(in crate::layer) async fn handle_end_match(
        &mut self,
        public: &PublicKey,
        result: MatchResult,
    ) -> Result<Vec<Event>> {
        self.authorize(public, Role::MarketOperator)?;
        let mut market = self.active_market().await?;
        require(result != MatchResult::Undecided, HouseError::InvalidResult)?;

        let settlement = market.settle(result)?;
        let liability = market.winning_liability(&settlement)?;
        market.status = MatchStatus::Ended;
        market.result = result;
        market.unclaimed_payouts = market
            .unclaimed_payouts
            .checked_add(liability)
            .ok_or(HouseError::Overflow)?;

        let match_id = market.match_id;
        self.insert(Key::Settlement(match_id), Value::Settlement(settlement));
        let mut events = vec![Event::MatchEnded { match_id, result }];
        events.extend(self.repay_market_debt(&mut market).await?);
        self.insert(Key::Market, Value::Market(market));
        Ok(events)
    }

    pub(in crate::layer) async fn handle_withdraw_after_match(
        &mut self,
        public: &PublicKey,
        match_id: u64,
    ) -> Result<Vec<Event>> {
        let settlement = self
            .get_settlement(match_id)
            .await?
            .ok_or(HouseError::MatchNotEnded)?;
        let winner = settlement
            .result
            .winner()
            .ok_or(HouseError::NoPayoutAvailable)?;

        let key = Key::Bet(match_id, public.clone());
        let mut bet = self.get_or_init_bet(match_id, public).await?;
        let amount = bet.amount(winner);
        require(amount > 0, HouseError::NoWinningBet)?;
        let payout = payout_at(amount, settlement.odds(winner))?;

        // Only the winning position is settled; losing stakes are already forfeit.
        *bet.position_mut(winner).0 = 0;
        *bet.position_mut(winner).1 = 0;
        if bet.is_empty() {
            self.remove(key);
        } else {
            self.insert(key, Value::Bet(bet));
        }

        let mut market = self.load_market().await?;
        market.unclaimed_payouts = market.unclaimed_payouts.saturating_sub(payout);
        self.insert(Key::Market, Value::Market(market));
        self.transfer_out(&Holder::Market, &Holder::Account(public.clone()), payout)
            .await?;

        Ok(vec![Event::Payout {
            bettor: public.clone(),
            amount: payout,
        }])
    }

    pub(in crate::layer) async fn handle_set_max_bet_amount(
        &mut self,
        public: &PublicKey,
        amount: Amount,
    ) -> Result<Vec<Event>> {
        self.authorize(public, Role::MarketOwner)?;
        require(amount > 0, HouseError::InvalidBetAmount)?;
        let mut market = self.load_market().await?;
        market.max_bet_amount = amount;

        let events = Self::parameters_updated(&market);
        self.insert(Key::Market, Value::Market(market));
        Ok(events)
    }

    pub(in crate::layer) async fn handle_set_max_bet_amount_percentage(
        &mut self,
        public: &PublicKey,
        bps: u16,
    ) -> Result<Vec<Event>> {
        self.authorize(public, Role::MarketOwner)?;
        require(
            bps > 0 && bps <= MAX_BET_AMOUNT_PERCENTAGE_BPS,
            HouseError::InvalidPercentage,
        )?;
        let pool = self.load_pool().await?;
        let mut market = self.load_market().await?;
        market.max_bet_amount_percentage_bps = bps;
        market.max_bet_amount = Market::max_bet_from_stake(pool.total_staked, bps)?;

        let events = Self::parameters_updated(&market);
        self.insert(Key::Market, Value::Market(market));
        Ok(events)
    }

    pub(in crate::layer) async fn handle_set_implied_probability(
        &mut self,
        public: &PublicKey,
        value: u16,
    ) -> Result<Vec<Event>> {
        self.authorize(public, Role::MarketOwner)?;
        require(
            (MIN_IMPLIED_PROBABILITY..=MAX_IMPLIED_PROBABILITY).contains(&value),
            HouseError::InvalidImpliedProbability,
        )?;
        let mut market = self.load_market().await?;
        market.implied_probability = value;

        let events = Self::parameters_updated(&market);
        self.insert(Key::Market, Value::Market(market));
        Ok(events)
    }

    pub(in crate::layer) async fn handle_set_early_percentage(
        &mut self,
        public: &PublicKey,
        percent: u8,
    ) -> Result<Vec<Event>> {
        self.authorize(public, Role::MarketOwner)?;
        require(percent <= 100, HouseError::InvalidPercentage)?;
        let mut market = self.load_market().await?;
        market.early_withdrawal_bps = percent as u16 * 100;

        let events = Self::parameters_updated(&market);
        self.insert(Key::Market, Value::Market(market));
        Ok(events)
    }

    pub(in crate::layer) async fn handle_set_withdrawals_paused(
        &mut self,
        public: &PublicKey,
        paused: bool,
    ) -> Result<Vec<Event>> {
        self.authorize(public, Role::MarketOwner)?;
        let mut market = self.load_market().await?;
        market.withdrawals_paused = paused;
        self.insert(Key::Market, Value::Market(market));

        Ok(vec![if paused {
            Event::WithdrawalsPaused
        } else {
            Event::WithdrawalsUnpaused
        }])
    }

    pub(in crate::layer) async fn handle_repay_pool(
        &mut self,
        public: &PublicKey,
    ) -> Result<Vec<Event>> {
        self.authorize(public, Role::MarketOwner)?;
        let mut market = self.load_market().await?;
        require(
            market.status != MatchStatus::Active,
            HouseError::MatchOngoing,
        )?;

        let events = self.repay_market_debt(&mut market).await?;
        self.insert(Key::Market, Value::Market(market));
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use crate::mocks::{
        create_fixture, execute_block, rejections, tokens, Actor, Fixture, MARKET_STAKE,
    };
    use crate::query::{
        query_balance, query_bet, query_borrower, query_cash_out, query_market, query_odds,
        query_pool, query_settlement,
    };
    use commonware_runtime::deterministic::Runner;
    use commonware_runtime::Runner as _;
    use wagerpool_types::execution::{Event, Instruction, Transaction};
    use wagerpool_types::house::{
        payout_at, Amount, Holder, HouseError, MatchResult, MatchStatus, Side, ONE,
    };

    const START: u64 = 1_000;

    fn bet(actor: &mut Actor, side: Side, amount: Amount) -> Vec<Transaction> {
        vec![
            actor.sign(Instruction::Approve {
                spender: Holder::Market,
                amount,
            }),
            actor.sign(Instruction::PlaceBet { side, amount }),
        ]
    }

    /// Stakes enough pool capital to seed matches and opens match 1.
    async fn started(users: usize) -> Fixture {
        let mut fixture = create_fixture(users, tokens(20_000)).await;
        fixture.stake_for_market(START).await;
        let tx = fixture.operator.sign(Instruction::StartMatch);
        let events = execute_block(&mut fixture.state, &fixture.roles, START, vec![tx]).await;
        assert!(rejections(&events).is_empty(), "{events:?}");
        fixture
    }

    fn assert_close(actual: Amount, expected: Amount, tolerance: Amount) {
        let diff = actual.abs_diff(expected);
        assert!(
            diff <= tolerance,
            "expected {expected} within {tolerance}, got {actual}"
        );
    }

    #[test]
    fn start_match_borrows_symmetric_seed() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let fixture = started(1).await;

            let market = query_market(&fixture.state).await.unwrap();
            assert_eq!(market.match_id, 1);
            assert_eq!(market.status, MatchStatus::Active);
            assert_eq!(market.total_team_a, tokens(40));
            assert_eq!(market.total_team_b, tokens(40));
            assert_eq!(market.borrowed_from_pool, tokens(80));
            assert_eq!(
                query_borrower(&fixture.state, &Holder::Market)
                    .await
                    .unwrap()
                    .borrowed_amount,
                tokens(80)
            );
            assert_eq!(
                query_balance(&fixture.state, &Holder::Market).await.unwrap(),
                tokens(80)
            );

            let (odds_a, odds_b) = query_odds(&fixture.state).await.unwrap();
            assert_eq!(odds_a, odds_b);
            // 2 / 1.025
            assert_close(odds_a, 1_951_219_512_195_121_951, 1);
        });
    }

    #[test]
    fn start_match_is_gated() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut fixture = started(1).await;

            let txs = vec![
                fixture.users[0].sign(Instruction::StartMatch),
                fixture.operator.sign(Instruction::StartMatch),
            ];
            let events = execute_block(&mut fixture.state, &fixture.roles, START + 1, txs).await;
            assert_eq!(
                rejections(&events),
                vec![HouseError::Unauthorized, HouseError::MatchOngoing]
            );
        });
    }

    #[test]
    fn start_match_needs_borrow_capacity() {
        let executor = Runner::default();
        executor.start(|_| async move {
            // No stake in the pool, so the market has no credit.
            let mut fixture = create_fixture(0, tokens(1_000)).await;
            let tx = fixture.operator.sign(Instruction::StartMatch);
            let events = execute_block(&mut fixture.state, &fixture.roles, START, vec![tx]).await;
            assert_eq!(rejections(&events), vec![HouseError::ExceedsBorrowLimit]);

            let market = query_market(&fixture.state).await.unwrap();
            assert_eq!(market.match_id, 0);
            assert_eq!(market.status, MatchStatus::NotStarted);
        });
    }

    #[test]
    fn place_bet_moves_odds_and_validates() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut fixture = started(1).await;
            let alice = fixture.users[0].public.clone();

            let (before_a, before_b) = query_odds(&fixture.state).await.unwrap();
            let mut txs = bet(&mut fixture.users[0], Side::TeamA, tokens(10));
            txs.push(fixture.users[0].sign(Instruction::PlaceBet {
                side: Side::TeamA,
                amount: 0,
            }));
            txs.push(fixture.users[0].sign(Instruction::PlaceBet {
                side: Side::TeamA,
                amount: tokens(101),
            }));
            let events = execute_block(&mut fixture.state, &fixture.roles, START + 1, txs).await;
            assert_eq!(
                rejections(&events),
                vec![HouseError::InvalidBetAmount, HouseError::InvalidBetAmount]
            );

            let (after_a, after_b) = query_odds(&fixture.state).await.unwrap();
            assert!(after_a < before_a);
            assert!(after_b > before_b);

            let position = query_bet(&fixture.state, 1, &alice).await.unwrap();
            assert_eq!(position.amount_team_a, tokens(10));
            assert_eq!(position.odds_team_a, after_a);
            assert_eq!(
                query_market(&fixture.state).await.unwrap().total_team_a,
                tokens(50)
            );
        });
    }

    #[test]
    fn bets_require_an_active_match() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut fixture = create_fixture(1, tokens(1_000)).await;
            let txs = vec![
                fixture.users[0].sign(Instruction::PlaceBet {
                    side: Side::TeamA,
                    amount: tokens(1),
                }),
                fixture.users[0].sign(Instruction::WithdrawBet {
                    side: Side::TeamA,
                    amount: tokens(1),
                }),
                fixture.operator.sign(Instruction::EndMatch {
                    result: MatchResult::TeamAWin,
                }),
                fixture.users[0].sign(Instruction::WithdrawAfterMatch { match_id: 1 }),
            ];
            let events = execute_block(&mut fixture.state, &fixture.roles, START, txs).await;
            assert_eq!(
                rejections(&events),
                vec![
                    HouseError::MatchNotStarted,
                    HouseError::MatchNotStarted,
                    HouseError::MatchNotStarted,
                    HouseError::MatchNotEnded,
                ]
            );
        });
    }

    #[test]
    fn cash_out_after_opposite_bet_matches_reference() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut fixture = started(2).await;
            let alice = fixture.users[0].public.clone();

            let mut txs = bet(&mut fixture.users[0], Side::TeamA, tokens(10));
            txs.extend(bet(&mut fixture.users[1], Side::TeamB, tokens(20)));
            execute_block(&mut fixture.state, &fixture.roles, START + 1, txs).await;

            let quote = query_cash_out(&fixture.state, &alice, Side::TeamA, tokens(5))
                .await
                .unwrap();
            assert_close(quote, 3_720 * ONE / 1_000, ONE / 10);

            let before = query_balance(&fixture.state, &Holder::Account(alice.clone()))
                .await
                .unwrap();
            let tx = fixture.users[0].sign(Instruction::WithdrawBet {
                side: Side::TeamA,
                amount: tokens(5),
            });
            let events = execute_block(&mut fixture.state, &fixture.roles, START + 2, vec![tx]).await;
            assert!(matches!(
                events.as_slice(),
                [Event::BetWithdrawn { amount, side: Side::TeamA, .. }] if *amount == quote
            ));
            let after = query_balance(&fixture.state, &Holder::Account(alice.clone()))
                .await
                .unwrap();
            assert_eq!(after - before, quote);

            let position = query_bet(&fixture.state, 1, &alice).await.unwrap();
            assert_eq!(position.amount_team_a, tokens(5));
            assert_eq!(
                query_market(&fixture.state).await.unwrap().total_team_a,
                tokens(45)
            );
        });
    }

    #[test]
    fn cash_out_after_same_side_bet_matches_reference() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut fixture = started(2).await;
            let alice = fixture.users[0].public.clone();

            let mut txs = bet(&mut fixture.users[0], Side::TeamA, tokens(10));
            txs.extend(bet(&mut fixture.users[1], Side::TeamA, tokens(20)));
            execute_block(&mut fixture.state, &fixture.roles, START + 1, txs).await;

            let quote = query_cash_out(&fixture.state, &alice, Side::TeamA, tokens(5))
                .await
                .unwrap();
            assert_close(quote, 1_056 * ONE / 1_000, ONE / 100);
        });
    }

    #[test]
    fn withdraw_bet_guards() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut fixture = started(1).await;
            let alice = fixture.users[0].public.clone();

            let mut txs = bet(&mut fixture.users[0], Side::TeamB, tokens(10));
            txs.push(fixture.users[0].sign(Instruction::WithdrawBet {
                side: Side::TeamB,
                amount: tokens(11),
            }));
            txs.push(fixture.users[0].sign(Instruction::WithdrawBet {
                side: Side::TeamA,
                amount: tokens(1),
            }));
            txs.push(fixture.users[0].sign(Instruction::WithdrawBet {
                side: Side::TeamB,
                amount: 0,
            }));
            let events = execute_block(&mut fixture.state, &fixture.roles, START + 1, txs).await;
            assert_eq!(
                rejections(&events),
                vec![
                    HouseError::InsufficientBetAmount,
                    HouseError::InsufficientBetAmount,
                    HouseError::InvalidBetAmount,
                ]
            );

            // Withdrawing the full position clears the record.
            let tx = fixture.users[0].sign(Instruction::WithdrawBet {
                side: Side::TeamB,
                amount: tokens(10),
            });
            let events = execute_block(&mut fixture.state, &fixture.roles, START + 2, vec![tx]).await;
            assert!(rejections(&events).is_empty());
            assert!(query_bet(&fixture.state, 1, &alice).await.unwrap().is_empty());
        });
    }

    #[test]
    fn pause_blocks_bets_and_cash_outs() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut fixture = started(1).await;

            let mut txs = bet(&mut fixture.users[0], Side::TeamA, tokens(10));
            txs.push(fixture.users[0].sign(Instruction::PauseWithdrawals));
            txs.push(fixture.owner.sign(Instruction::PauseWithdrawals));
            txs.push(fixture.users[0].sign(Instruction::WithdrawBet {
                side: Side::TeamA,
                amount: tokens(1),
            }));
            txs.push(fixture.users[0].sign(Instruction::PlaceBet {
                side: Side::TeamA,
                amount: tokens(1),
            }));
            let events = execute_block(&mut fixture.state, &fixture.roles, START + 1, txs).await;
            assert_eq!(
                rejections(&events),
                vec![HouseError::Unauthorized, HouseError::Paused, HouseError::Paused]
            );
            assert!(events.contains(&Event::WithdrawalsPaused));

            let txs = vec![
                fixture.owner.sign(Instruction::UnpauseWithdrawals),
                fixture.users[0].sign(Instruction::WithdrawBet {
                    side: Side::TeamA,
                    amount: tokens(1),
                }),
            ];
            let events = execute_block(&mut fixture.state, &fixture.roles, START + 2, txs).await;
            assert!(rejections(&events).is_empty());
            assert!(events.contains(&Event::WithdrawalsUnpaused));
        });
    }

    #[test]
    fn settlement_pays_winners_and_repays_pool() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut fixture = started(3).await;
            let alice = fixture.users[0].public.clone();
            let bob = fixture.users[1].public.clone();

            let mut txs = bet(&mut fixture.users[0], Side::TeamA, tokens(10));
            txs.extend(bet(&mut fixture.users[1], Side::TeamB, tokens(8)));
            txs.extend(bet(&mut fixture.users[2], Side::TeamB, tokens(30)));
            execute_block(&mut fixture.state, &fixture.roles, START + 1, txs).await;
            let pool_before = query_balance(&fixture.state, &Holder::Pool).await.unwrap();

            let tx = fixture.operator.sign(Instruction::EndMatch {
                result: MatchResult::TeamAWin,
            });
            let events = execute_block(&mut fixture.state, &fixture.roles, START + 2, vec![tx]).await;
            assert!(matches!(
                events.first(),
                Some(Event::MatchEnded { match_id: 1, result: MatchResult::TeamAWin })
            ));
            assert!(events.iter().any(|event| matches!(
                event,
                Event::Repaid { borrower: Holder::Market, amount } if *amount == tokens(80)
            )));

            let settlement = query_settlement(&fixture.state, 1).await.unwrap();
            let market = query_market(&fixture.state).await.unwrap();
            assert_eq!(market.status, MatchStatus::Ended);
            assert_eq!(market.borrowed_from_pool, 0);
            let expected = payout_at(tokens(10), settlement.odds_team_a).unwrap();
            assert_eq!(market.unclaimed_payouts, expected);
            assert_eq!(
                query_balance(&fixture.state, &Holder::Pool).await.unwrap(),
                pool_before + tokens(80)
            );

            let txs = vec![
                fixture.users[0].sign(Instruction::WithdrawAfterMatch { match_id: 1 }),
                fixture.users[0].sign(Instruction::WithdrawAfterMatch { match_id: 1 }),
                fixture.users[1].sign(Instruction::WithdrawAfterMatch { match_id: 1 }),
            ];
            let events = execute_block(&mut fixture.state, &fixture.roles, START + 3, txs).await;
            assert!(events.contains(&Event::Payout {
                bettor: alice.clone(),
                amount: expected,
            }));
            assert_eq!(
                rejections(&events),
                vec![HouseError::NoWinningBet, HouseError::NoWinningBet]
            );
            assert_eq!(query_market(&fixture.state).await.unwrap().unclaimed_payouts, 0);
            assert!(query_bet(&fixture.state, 1, &alice).await.unwrap().is_empty());
            assert_eq!(
                query_bet(&fixture.state, 1, &bob).await.unwrap().amount_team_b,
                tokens(8)
            );

            // Ended matches reject further play.
            let txs = vec![
                fixture.users[1].sign(Instruction::PlaceBet {
                    side: Side::TeamA,
                    amount: tokens(1),
                }),
                fixture.operator.sign(Instruction::EndMatch {
                    result: MatchResult::TeamBWin,
                }),
            ];
            let events = execute_block(&mut fixture.state, &fixture.roles, START + 4, txs).await;
            assert_eq!(
                rejections(&events),
                vec![HouseError::MatchEnded, HouseError::MatchEnded]
            );
        });
    }

    #[test]
    fn tie_forfeits_every_stake() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut fixture = started(2).await;

            let mut txs = bet(&mut fixture.users[0], Side::TeamA, tokens(10));
            txs.extend(bet(&mut fixture.users[1], Side::TeamB, tokens(10)));
            txs.push(fixture.operator.sign(Instruction::EndMatch {
                result: MatchResult::Undecided,
            }));
            txs.push(fixture.operator.sign(Instruction::EndMatch {
                result: MatchResult::Tie,
            }));
            let events = execute_block(&mut fixture.state, &fixture.roles, START + 1, txs).await;
            assert_eq!(rejections(&events), vec![HouseError::InvalidResult]);

            let txs = vec![
                fixture.users[0].sign(Instruction::WithdrawAfterMatch { match_id: 1 }),
                fixture.users[1].sign(Instruction::WithdrawAfterMatch { match_id: 1 }),
            ];
            let events = execute_block(&mut fixture.state, &fixture.roles, START + 2, txs).await;
            assert_eq!(
                rejections(&events),
                vec![HouseError::NoPayoutAvailable, HouseError::NoPayoutAvailable]
            );

            let market = query_market(&fixture.state).await.unwrap();
            assert_eq!(market.unclaimed_payouts, 0);
            assert_eq!(market.borrowed_from_pool, 0);
            // Seed repaid; the forfeited stakes stay with the market.
            assert_eq!(
                query_balance(&fixture.state, &Holder::Market).await.unwrap(),
                tokens(20)
            );
        });
    }

    #[test]
    fn shortfall_stays_as_debt_until_repaid() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut fixture = started(2).await;
            let alice = fixture.users[0].public.clone();

            // A one-sided book leaves too little free balance to repay the whole seed.
            let txs = vec![
                fixture.owner.sign(Instruction::SetImpliedProbability { value: 1_001 }),
            ];
            execute_block(&mut fixture.state, &fixture.roles, START + 1, txs).await;
            let mut txs = bet(&mut fixture.users[0], Side::TeamB, tokens(100));
            txs.push(fixture.operator.sign(Instruction::EndMatch {
                result: MatchResult::TeamBWin,
            }));
            execute_block(&mut fixture.state, &fixture.roles, START + 2, txs).await;

            let market = query_market(&fixture.state).await.unwrap();
            let balance = query_balance(&fixture.state, &Holder::Market).await.unwrap();
            assert_eq!(balance, market.unclaimed_payouts);
            let debt = market.borrowed_from_pool;
            assert!(debt > 0 && debt < tokens(80));
            assert_eq!(
                query_borrower(&fixture.state, &Holder::Market)
                    .await
                    .unwrap()
                    .borrowed_amount,
                debt
            );

            // Winner still gets paid in full.
            let tx = fixture.users[0].sign(Instruction::WithdrawAfterMatch { match_id: 1 });
            let events = execute_block(&mut fixture.state, &fixture.roles, START + 3, vec![tx]).await;
            assert!(events.iter().any(|event| matches!(
                event,
                Event::Payout { bettor, .. } if bettor == &alice
            )));

            // Someone tops up the market float and the owner settles the rest.
            let txs = vec![
                fixture.users[1].sign(Instruction::Transfer {
                    to: Holder::Market,
                    amount: debt,
                }),
                fixture.users[1].sign(Instruction::RepayPool),
                fixture.owner.sign(Instruction::RepayPool),
            ];
            let events = execute_block(&mut fixture.state, &fixture.roles, START + 4, txs).await;
            assert_eq!(rejections(&events), vec![HouseError::Unauthorized]);
            assert_eq!(query_market(&fixture.state).await.unwrap().borrowed_from_pool, 0);
            assert_eq!(
                query_borrower(&fixture.state, &Holder::Market)
                    .await
                    .unwrap()
                    .borrowed_amount,
                0
            );
        });
    }

    #[test]
    fn winners_claim_after_next_match_starts() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut fixture = started(1).await;
            let alice = fixture.users[0].public.clone();

            let mut txs = bet(&mut fixture.users[0], Side::TeamA, tokens(10));
            txs.push(fixture.operator.sign(Instruction::EndMatch {
                result: MatchResult::TeamAWin,
            }));
            txs.push(fixture.owner.sign(Instruction::StartMatch));
            execute_block(&mut fixture.state, &fixture.roles, START + 1, txs).await;

            let market = query_market(&fixture.state).await.unwrap();
            assert_eq!(market.match_id, 2);
            assert!(market.unclaimed_payouts > 0);

            let txs = vec![
                fixture.owner.sign(Instruction::RepayPool),
                fixture.users[0].sign(Instruction::WithdrawAfterMatch { match_id: 1 }),
            ];
            let events = execute_block(&mut fixture.state, &fixture.roles, START + 2, txs).await;
            assert_eq!(rejections(&events), vec![HouseError::MatchOngoing]);
            assert!(events.iter().any(|event| matches!(
                event,
                Event::Payout { bettor, .. } if bettor == &alice
            )));
            assert_eq!(query_market(&fixture.state).await.unwrap().unclaimed_payouts, 0);
        });
    }

    #[test]
    fn owner_tunes_parameters() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut fixture = create_fixture(1, tokens(20_000)).await;
            fixture.stake_for_market(START).await;

            let txs = vec![
                fixture.users[0].sign(Instruction::SetMaxBetAmount { amount: 1 }),
                fixture.owner.sign(Instruction::SetMaxBetAmount { amount: 0 }),
                fixture.owner.sign(Instruction::SetImpliedProbability { value: 1_000 }),
                fixture.owner.sign(Instruction::SetImpliedProbability { value: 1_101 }),
                fixture.owner.sign(Instruction::SetEarlyPercentage { percent: 101 }),
                fixture.owner.sign(Instruction::SetMaxBetAmountPercentage { bps: 0 }),
                fixture.owner.sign(Instruction::SetMaxBetAmountPercentage { bps: 1_001 }),
                fixture.owner.sign(Instruction::SetImpliedProbability { value: 1_050 }),
                fixture.owner.sign(Instruction::SetEarlyPercentage { percent: 55 }),
                fixture.owner.sign(Instruction::SetMaxBetAmountPercentage { bps: 100 }),
            ];
            let events = execute_block(&mut fixture.state, &fixture.roles, START, txs).await;
            assert_eq!(
                rejections(&events),
                vec![
                    HouseError::Unauthorized,
                    HouseError::InvalidBetAmount,
                    HouseError::InvalidImpliedProbability,
                    HouseError::InvalidImpliedProbability,
                    HouseError::InvalidPercentage,
                    HouseError::InvalidPercentage,
                    HouseError::InvalidPercentage,
                ]
            );

            let market = query_market(&fixture.state).await.unwrap();
            assert_eq!(market.implied_probability, 1_050);
            assert_eq!(market.early_withdrawal_bps, 5_500);
            assert_eq!(market.max_bet_amount_percentage_bps, 100);
            let staked = query_pool(&fixture.state).await.unwrap().total_staked;
            assert_eq!(staked, MARKET_STAKE);
            assert_eq!(market.max_bet_amount, staked / 100);
        });
    }
}
