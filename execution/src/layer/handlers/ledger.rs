use super::super::*;
use super::require;
use wagerpool_types::house::Amount;

impl<'a, S: State> Layer<'a, S> {
    async fn debit(&mut self, holder: &Holder, amount: Amount) -> Result<()> {
        let mut account = self.get_or_init_token(holder).await?;
        account.balance = account
            .balance
            .checked_sub(amount)
            .ok_or(HouseError::InsufficientFunds)?;
        self.insert(Key::Token(holder.clone()), Value::Token(account));
        Ok(())
    }

    async fn credit(&mut self, holder: &Holder, amount: Amount) -> Result<()> {
        let mut account = self.get_or_init_token(holder).await?;
        account.balance = account
            .balance
            .checked_add(amount)
            .ok_or(HouseError::Overflow)?;
        self.insert(Key::Token(holder.clone()), Value::Token(account));
        Ok(())
    }

    async fn spend_allowance(
        &mut self,
        owner: &Holder,
        spender: &Holder,
        amount: Amount,
    ) -> Result<()> {
        let mut account = self.get_or_init_token(owner).await?;
        let allowance = account.allowance(spender);
        require(allowance >= amount, HouseError::InsufficientAllowance)?;
        account.set_allowance(spender.clone(), allowance - amount);
        self.insert(Key::Token(owner.clone()), Value::Token(account));
        Ok(())
    }

    pub(in crate::layer) async fn handle_transfer(
        &mut self,
        public: &PublicKey,
        to: &Holder,
        amount: Amount,
    ) -> Result<Vec<Event>> {
        require(amount > 0, HouseError::InvalidAmount)?;
        let from = Holder::Account(public.clone());
        self.debit(&from, amount).await?;
        self.credit(to, amount).await?;

        Ok(vec![Event::Transferred {
            from,
            to: to.clone(),
            amount,
        }])
    }

    pub(in crate::layer) async fn handle_approve(
        &mut self,
        public: &PublicKey,
        spender: &Holder,
        amount: Amount,
    ) -> Result<Vec<Event>> {
        let owner = Holder::Account(public.clone());
        let mut account = self.get_or_init_token(&owner).await?;
        account.set_allowance(spender.clone(), amount);
        self.insert(Key::Token(owner), Value::Token(account));

        Ok(vec![Event::Approved {
            owner: public.clone(),
            spender: spender.clone(),
            amount,
        }])
    }
}

impl<'a, S: State> Ledger for Layer<'a, S> {
    async fn balance_of(&self, holder: &Holder) -> Result<Amount> {
        Ok(self.get_or_init_token(holder).await?.balance)
    }

    async fn transfer_in(&mut self, custodian: &Holder, from: &Holder, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        if !from.is_custody() {
            self.spend_allowance(from, custodian, amount).await?;
        }
        self.debit(from, amount).await?;
        self.credit(custodian, amount).await
    }

    async fn transfer_out(&mut self, custodian: &Holder, to: &Holder, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        self.debit(custodian, amount).await?;
        self.credit(to, amount).await
    }
}
