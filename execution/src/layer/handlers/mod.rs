use super::*;

/// Fails with `error` unless `condition` holds.
fn require(condition: bool, error: HouseError) -> Result<(), HouseError> {
    if condition {
        Ok(())
    } else {
        Err(error)
    }
}

mod ledger;
mod market;
mod pool;
