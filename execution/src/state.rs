use anyhow::Result;
use commonware_cryptography::ed25519::PublicKey;
use std::future::Future;
use wagerpool_types::execution::{Account, Key, Value};

#[cfg(any(test, feature = "mocks"))]
use std::collections::HashMap;

#[derive(Debug)]
pub enum PrepareError {
    NonceMismatch { expected: u64, got: u64 },
    State(anyhow::Error),
}

pub trait State {
    fn get(&self, key: &Key) -> impl Future<Output = Result<Option<Value>>>;
    fn insert(&mut self, key: Key, value: Value) -> impl Future<Output = Result<()>>;
    fn delete(&mut self, key: &Key) -> impl Future<Output = Result<()>>;

    fn apply(&mut self, changes: Vec<(Key, Status)>) -> impl Future<Output = Result<()>> {
        async {
            for (key, status) in changes {
                match status {
                    Status::Update(value) => self.insert(key, value).await?,
                    Status::Delete => self.delete(&key).await?,
                }
            }
            Ok(())
        }
    }
}

/// In-memory state backend.
#[cfg(any(test, feature = "mocks"))]
#[derive(Default)]
pub struct Memory {
    state: HashMap<Key, Value>,
}

#[cfg(any(test, feature = "mocks"))]
impl State for Memory {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        Ok(self.state.get(key).cloned())
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.state.insert(key, value);
        Ok(())
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        self.state.remove(key);
        Ok(())
    }
}

/// Pending write to a key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Update(Value),
    Delete,
}

pub async fn nonce<S: State>(state: &S, public: &PublicKey) -> Result<u64> {
    Ok(load_account(state, public).await?.nonce)
}

/// Height and timestamp of the last committed block, `(0, 0)` before the first block.
pub async fn committed<S: State>(state: &S) -> Result<(u64, u64)> {
    Ok(match state.get(&Key::Commit).await? {
        Some(Value::Commit { height, timestamp }) => (height, timestamp),
        _ => (0, 0),
    })
}

pub(crate) async fn load_account<S: State>(state: &S, public: &PublicKey) -> Result<Account> {
    Ok(match state.get(&Key::Account(public.clone())).await? {
        Some(Value::Account(account)) => account,
        _ => Account::default(),
    })
}

pub(crate) fn validate_and_increment_nonce(
    account: &mut Account,
    provided_nonce: u64,
) -> Result<(), PrepareError> {
    if account.nonce != provided_nonce {
        return Err(PrepareError::NonceMismatch {
            expected: account.nonce,
            got: provided_nonce,
        });
    }
    account.nonce += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_runtime::deterministic::Runner;
    use commonware_runtime::Runner as _;

    #[test]
    fn apply_updates_and_deletes() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut state = Memory::default();
            state
                .insert(Key::Commit, Value::Commit { height: 1, timestamp: 10 })
                .await
                .unwrap();
            state
                .apply(vec![
                    (Key::Commit, Status::Delete),
                    (
                        Key::Pool,
                        Status::Update(Value::Pool(Default::default())),
                    ),
                ])
                .await
                .unwrap();

            assert!(state.get(&Key::Commit).await.unwrap().is_none());
            assert!(matches!(
                state.get(&Key::Pool).await.unwrap(),
                Some(Value::Pool(_))
            ));
            assert_eq!(committed(&state).await.unwrap(), (0, 0));
        });
    }

    #[test]
    fn nonce_mismatch_reports_expected() {
        let mut account = Account { nonce: 2 };
        assert!(matches!(
            validate_and_increment_nonce(&mut account, 1),
            Err(PrepareError::NonceMismatch {
                expected: 2,
                got: 1
            })
        ));
        assert!(validate_and_increment_nonce(&mut account, 2).is_ok());
        assert_eq!(account.nonce, 3);
    }
}
