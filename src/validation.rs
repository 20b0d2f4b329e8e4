//! Request validation utilities.

use crate::types::{Error, KubernetesConfig, Result};

/// Validate that a string is not empty.
pub fn validate_non_empty(s: &str, field: &str) -> Result<()> {
    if s.is_empty() {
        return Err(Error::validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Validate a requested replica count against the configured bounds (I7).
/// Checked before any outbound call reaches the adapter (P5).
pub fn validate_replica_bounds(replicas: i64, config: &KubernetesConfig) -> Result<u32> {
    if replicas < config.replica_floor as i64 || replicas > config.replica_ceiling as i64 {
        return Err(Error::validation(format!(
            "targetReplicas must be between {} and {}, got {replicas}",
            config.replica_floor, config.replica_ceiling
        )));
    }
    Ok(replicas as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_string_is_rejected() {
        assert!(validate_non_empty("", "message").is_err());
        assert!(validate_non_empty("hi", "message").is_ok());
    }

    #[test]
    fn replica_bounds_reject_out_of_range() {
        let config = KubernetesConfig::default();
        assert!(validate_replica_bounds(0, &config).is_err());
        assert!(validate_replica_bounds(6, &config).is_err());
        assert!(validate_replica_bounds(-1, &config).is_err());
        assert!(validate_replica_bounds(1, &config).is_ok());
        assert!(validate_replica_bounds(5, &config).is_ok());
    }

    proptest! {
        /// P5: for every randomly sampled N outside [1, 5], `validate_replica_bounds`
        /// rejects it — this is the check the worker/adapter run before any
        /// outbound call, so rejecting here is rejecting "before any outbound
        /// API call" by construction.
        #[test]
        fn p5_out_of_bounds_replicas_are_always_rejected(n in prop_oneof![
            (i64::MIN..=0i64),
            (6i64..=i64::MAX),
        ]) {
            let config = KubernetesConfig::default();
            prop_assert!(validate_replica_bounds(n, &config).is_err());
        }

        /// The complement of P5: every in-bounds value is always accepted.
        #[test]
        fn in_bounds_replicas_are_always_accepted(n in 1i64..=5i64) {
            let config = KubernetesConfig::default();
            prop_assert!(validate_replica_bounds(n, &config).is_ok());
        }
    }
}
