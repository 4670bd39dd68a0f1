//! Fungible ledger types backing every value movement of the pool and the market.

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use commonware_cryptography::ed25519::PublicKey;
use commonware_utils::hex;
use std::{collections::BTreeMap, fmt};

use super::Amount;

/// Owner of a token balance.
///
/// `Pool` and `Market` are custody accounts controlled by the executor: only their own handlers
/// can move funds out of them.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Holder {
    Account(PublicKey),
    Pool,
    Market,
}

impl Holder {
    pub fn is_custody(&self) -> bool {
        !matches!(self, Self::Account(_))
    }
}

impl fmt::Display for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Account(public) => write!(f, "{}", hex(public.as_ref())),
            Self::Pool => write!(f, "pool"),
            Self::Market => write!(f, "market"),
        }
    }
}

impl Write for Holder {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Account(public) => {
                0u8.write(writer);
                public.write(writer);
            }
            Self::Pool => 1u8.write(writer),
            Self::Market => 2u8.write(writer),
        }
    }
}

impl Read for Holder {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let kind = u8::read(reader)?;
        match kind {
            0 => Ok(Self::Account(PublicKey::read(reader)?)),
            1 => Ok(Self::Pool),
            2 => Ok(Self::Market),
            _ => Err(Error::InvalidEnum(kind)),
        }
    }
}

impl EncodeSize for Holder {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Account(_) => PublicKey::SIZE,
                Self::Pool | Self::Market => 0,
            }
    }
}

/// Represents a token balance and the allowances its owner granted.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct TokenAccount {
    pub balance: Amount,
    pub allowances: BTreeMap<Holder, Amount>,
}

impl TokenAccount {
    pub fn allowance(&self, spender: &Holder) -> Amount {
        self.allowances.get(spender).copied().unwrap_or(0)
    }

    /// Sets (not adds to) the allowance of `spender`; a zero allowance is removed.
    pub fn set_allowance(&mut self, spender: Holder, amount: Amount) {
        if amount == 0 {
            self.allowances.remove(&spender);
        } else {
            self.allowances.insert(spender, amount);
        }
    }
}

impl Write for TokenAccount {
    fn write(&self, writer: &mut impl BufMut) {
        self.balance.write(writer);
        (self.allowances.len() as u32).write(writer);
        for (spender, amount) in &self.allowances {
            spender.write(writer);
            amount.write(writer);
        }
    }
}

impl Read for TokenAccount {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let balance = u128::read(reader)?;
        let allowance_count = u32::read(reader)?;
        let mut allowances = BTreeMap::new();
        for _ in 0..allowance_count {
            let spender = Holder::read(reader)?;
            let amount = u128::read(reader)?;
            allowances.insert(spender, amount);
        }
        Ok(Self {
            balance,
            allowances,
        })
    }
}

impl EncodeSize for TokenAccount {
    fn encode_size(&self) -> usize {
        u128::SIZE
            + u32::SIZE
            + self
                .allowances
                .keys()
                .map(|spender| spender.encode_size() + u128::SIZE)
                .sum::<usize>()
    }
}
