//! Identity & quota policy (§4.4).
//!
//! Per-user quota tracking follows the teacher's `kernel::rate_limiter` /
//! `kernel::resources` shape: a `HashMap<String, _>` behind an async
//! `RwLock`, owned by this policy object rather than a separate actor.
//!
//! Role resolution follows §4.4's derivation exactly: the authentication
//! provider's verified role claim is consulted only to detect `ADMIN`
//! (priority 1, unmetered). Every other caller — no claim, or any claim
//! value other than `ADMIN` — falls through to the quota-tracked tier:
//! `FREE` (priority 2) while quota remains, `NORMAL` (priority 3,
//! unmetered but not preferential) once exhausted (scenario 4's 4th
//! submission). I8 holds — none of this is settable by the request body,
//! and no claim value grants `NORMAL`/`FREE` directly.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::types::UserId;

/// The three roles of the data model (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Free,
    Normal,
}

/// The outcome of resolving a request's identity against the quota policy.
#[derive(Debug, Clone)]
pub struct ResolvedIdentity {
    pub user_id: UserId,
    pub role: Role,
    pub priority: u8,
    /// `None` for the unmetered ADMIN/NORMAL-claimed tiers; `Some(remaining)`
    /// (computed pre-increment, per the spec's resolved Open Question) for
    /// the default quota-tracked tier.
    pub quota_remaining: Option<u32>,
    /// Whether this resolution permits an EXECUTE to proceed. False only
    /// for a default-tier caller whose quota is exhausted.
    pub execute_allowed: bool,
}

/// Process-local per-user quota tracker plus role derivation (§4.4). Quota
/// state is lost on restart — a documented, deliberate weakness (§9).
#[derive(Debug)]
pub struct IdentityPolicy {
    free_limit: u32,
    used: RwLock<HashMap<String, u32>>,
}

impl IdentityPolicy {
    pub fn new(free_limit: u32) -> Self {
        Self {
            free_limit,
            used: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a verified `user_id` plus the provider's verified role claim
    /// (if any) into a `ResolvedIdentity`. Never trusts anything from the
    /// request body for role (I8). Only the `ADMIN` claim value is
    /// consulted; any other claim (including an explicit `NORMAL`, or none
    /// at all) falls through to quota-derived FREE/NORMAL — §4.4 names no
    /// claim path for those two, only a quota threshold.
    pub async fn resolve(&self, user_id: UserId, provider_role_claim: Option<&str>) -> ResolvedIdentity {
        if claim_is(provider_role_claim, "ADMIN") {
            return ResolvedIdentity {
                user_id,
                role: Role::Admin,
                priority: 1,
                quota_remaining: None,
                execute_allowed: true,
            };
        }

        let remaining = self.quota_remaining(&user_id).await;
        if remaining > 0 {
            ResolvedIdentity {
                user_id,
                role: Role::Free,
                priority: 2,
                quota_remaining: Some(remaining),
                execute_allowed: true,
            }
        } else {
            ResolvedIdentity {
                user_id,
                role: Role::Normal,
                priority: 3,
                quota_remaining: Some(0),
                execute_allowed: false,
            }
        }
    }

    /// `max(0, LIMIT - used)`.
    pub async fn quota_remaining(&self, user_id: &UserId) -> u32 {
        let used = self.used.read().await;
        let count = used.get(user_id.as_str()).copied().unwrap_or(0);
        self.free_limit.saturating_sub(count)
    }

    /// Invoked exactly once per accepted EXECUTE from a FREE-role caller.
    pub async fn increment_quota(&self, user_id: &UserId) {
        let mut used = self.used.write().await;
        *used.entry(user_id.as_str().to_string()).or_insert(0) += 1;
    }
}

fn claim_is(claim: Option<&str>, expected: &str) -> bool {
    claim.is_some_and(|c| c.eq_ignore_ascii_case(expected))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(s: &str) -> UserId {
        UserId::from_string(s.to_string()).unwrap()
    }

    #[tokio::test]
    async fn admin_claim_is_unmetered_priority_one() {
        let policy = IdentityPolicy::new(3);
        let resolved = policy.resolve(uid("u1"), Some("ADMIN")).await;
        assert_eq!(resolved.role, Role::Admin);
        assert_eq!(resolved.priority, 1);
        assert!(resolved.execute_allowed);
        assert_eq!(resolved.quota_remaining, None);
    }

    #[tokio::test]
    async fn non_admin_claim_is_ignored_and_quota_derived() {
        // An explicit "NORMAL" claim from the provider carries no special
        // meaning beyond "not ADMIN" — role is still derived from quota,
        // same as if no claim were present at all.
        let policy = IdentityPolicy::new(3);
        let resolved = policy.resolve(uid("u1"), Some("NORMAL")).await;
        assert_eq!(resolved.role, Role::Free);
        assert_eq!(resolved.priority, 2);
        assert!(resolved.execute_allowed);
        assert_eq!(resolved.quota_remaining, Some(3));
    }

    #[tokio::test]
    async fn quota_monotonicity_and_exhaustion_matches_scenario_4() {
        let policy = IdentityPolicy::new(3);
        let user = uid("free-user");

        // 1st, 2nd, 3rd accepted EXECUTEs: priority 2, pre-increment remaining 3,2,1.
        for expected_pre in [3u32, 2, 1] {
            let resolved = policy.resolve(user.clone(), None).await;
            assert_eq!(resolved.role, Role::Free);
            assert_eq!(resolved.priority, 2);
            assert!(resolved.execute_allowed);
            assert_eq!(resolved.quota_remaining, Some(expected_pre));
            policy.increment_quota(&user).await;
            // Post-increment remaining, as shown in the acceptance payload.
            assert_eq!(policy.quota_remaining(&user).await, expected_pre - 1);
        }

        // 4th: quota exhausted -> rejected, not enqueued, not incremented.
        let fourth = policy.resolve(user.clone(), None).await;
        assert!(!fourth.execute_allowed);
        assert_eq!(fourth.quota_remaining, Some(0));
        assert_eq!(policy.quota_remaining(&user).await, 0);
    }

    #[tokio::test]
    async fn quota_is_tracked_independently_per_user() {
        let policy = IdentityPolicy::new(3);
        policy.increment_quota(&uid("a")).await;
        assert_eq!(policy.quota_remaining(&uid("a")).await, 2);
        assert_eq!(policy.quota_remaining(&uid("b")).await, 3);
    }
}
