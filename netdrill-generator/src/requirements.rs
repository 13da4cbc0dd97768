//! Funding requirements of a round
//!
//! Each transaction type sends from a pool of freshly funded keys. A key may
//! only have one transaction in flight per `gap` seconds, so a pool needs at
//! least `tps * gap` keys, and each key needs enough balance for its share of
//! the round's transactions plus one spare.
//!
//! Both formulas are pure and never return zero keys.

use netdrill_core::params::{PaymentSubParams, ZkappSubParams};

/// Fee paid when a transaction creates a new account
pub const ACCOUNT_CREATION_FEE: u64 = 1_000_000_000;

/// Balance changes touched by a single zkapp transaction, at most
pub const MAX_ACCOUNT_UPDATES: u64 = 8;

/// Number of keys in a pool and the total amount to spread over them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeygenRequirement {
    pub keys: u64,
    pub amount: u64,
}

fn total_transactions(tps: f64, duration_min: u64) -> u64 {
    (tps.max(0.0) * duration_min as f64 * 60.0).ceil() as u64
}

fn pool_size(tps: f64, gap: u64) -> u64 {
    ((tps.max(0.0) * gap as f64).ceil() as u64).max(1)
}

fn transactions_per_key(total: u64, keys: u64) -> u64 {
    total.div_ceil(keys.max(1)) + 1
}

/// Keys and balance needed to sustain `tps` payments for the round
pub fn payment_keygen_requirements(tps: f64, gap: u64, params: &PaymentSubParams) -> KeygenRequirement {
    let keys = pool_size(tps, gap);
    let per_key = transactions_per_key(total_transactions(tps, params.duration_min), keys)
        .saturating_mul(params.max_fee.saturating_add(params.amount));
    KeygenRequirement {
        keys,
        amount: per_key.saturating_mul(keys),
    }
}

/// Initial balance each zkapp fee payer needs before its first transaction
pub fn zkapp_initial_balance(params: &ZkappSubParams, keys: u64) -> u64 {
    let deployments = u64::from(params.zkapps_to_deploy).div_ceil(keys.max(1)).max(1);
    deployments.saturating_mul(params.deployment_fee.saturating_add(ACCOUNT_CREATION_FEE))
}

/// Keys and balance needed to sustain `tps` zkapp transactions for the round
pub fn zkapp_keygen_requirements(tps: f64, params: &ZkappSubParams) -> KeygenRequirement {
    let keys = pool_size(tps, params.gap);
    let new_account_cost = (params.new_account_ratio.max(0.0) * ACCOUNT_CREATION_FEE as f64).ceil() as u64;
    let tx_cost = params
        .max_fee
        .saturating_add(params.max_balance_change.saturating_mul(MAX_ACCOUNT_UPDATES))
        .saturating_add(new_account_cost);
    let per_key = transactions_per_key(total_transactions(tps, params.duration_min), keys)
        .saturating_mul(tx_cost)
        .saturating_add(zkapp_initial_balance(params, keys));
    KeygenRequirement {
        keys,
        amount: per_key.saturating_mul(keys),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment_params() -> PaymentSubParams {
        PaymentSubParams {
            experiment_name: "exp-0-0".to_string(),
            tps: 0.5,
            min_tps: 0.01,
            duration_min: 30,
            min_fee: 100,
            max_fee: 200,
            amount: 1_000,
            receiver: "B62q".to_string(),
        }
    }

    fn zkapp_params() -> ZkappSubParams {
        ZkappSubParams {
            experiment_name: "exp-0-0".to_string(),
            tps: 0.5,
            min_tps: 0.01,
            duration_min: 30,
            gap: 180,
            min_balance_change: 0,
            max_balance_change: 1_000,
            min_fee: 1_000,
            max_fee: 2_000,
            deployment_fee: 10_000,
            max_cost: false,
            zkapps_to_deploy: 0,
            new_account_ratio: 0.0,
        }
    }

    #[test]
    fn test_payment_requirements() {
        // 0.5 tps over 30 min = 900 txs; 90 keys for a 180 s gap; 11 txs per key
        let req = payment_keygen_requirements(0.5, 180, &payment_params());
        assert_eq!(req.keys, 90);
        assert_eq!(req.amount, 90 * 11 * 1_200);
    }

    #[test]
    fn test_zkapp_requirements() {
        let req = zkapp_keygen_requirements(0.5, &zkapp_params());
        assert_eq!(req.keys, 90);
        let tx_cost = 2_000 + 1_000 * MAX_ACCOUNT_UPDATES;
        let init = 10_000 + ACCOUNT_CREATION_FEE;
        assert_eq!(req.amount, 90 * (11 * tx_cost + init));
    }

    #[test]
    fn test_never_zero_keys() {
        for tps in [1e-9, 0.001, 0.01] {
            assert!(payment_keygen_requirements(tps, 1, &payment_params()).keys >= 1);
            assert!(zkapp_keygen_requirements(tps, &zkapp_params()).keys >= 1);
        }
    }

    #[test]
    fn test_deterministic() {
        let a = zkapp_keygen_requirements(0.37, &zkapp_params());
        let b = zkapp_keygen_requirements(0.37, &zkapp_params());
        assert_eq!(a, b);
    }
}
