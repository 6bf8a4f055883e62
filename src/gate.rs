use serde::Serialize;

use crate::data_models::Entitlement;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GateDecision {
    Allow,
    Deny,
}

/// Subscribers always pass; everyone else gets `limit` free searches.
pub fn can_search(entitlement: &Entitlement, limit: u32) -> GateDecision {
    if entitlement.subscribed || entitlement.free_searches_used < limit {
        GateDecision::Allow
    } else {
        GateDecision::Deny
    }
}

/// Free searches remaining before the gate starts denying. Never negative.
pub fn searches_left(entitlement: &Entitlement, limit: u32) -> u32 {
    limit.saturating_sub(entitlement.free_searches_used)
}

#[test]
fn test_subscribed_always_allowed() {
    for used in [0, 1, 4, 5, 6, 100, u32::MAX] {
        let entitlement = Entitlement {
            signed_in: true,
            subscribed: true,
            free_searches_used: used,
        };
        assert_eq!(can_search(&entitlement, 5), GateDecision::Allow);
        assert_eq!(can_search(&entitlement, 0), GateDecision::Allow);
    }
}

#[test]
fn test_unsubscribed_allowed_below_limit() {
    for signed_in in [false, true] {
        for used in 0..10u32 {
            let entitlement = Entitlement {
                signed_in,
                subscribed: false,
                free_searches_used: used,
            };
            let expected = if used < 5 {
                GateDecision::Allow
            } else {
                GateDecision::Deny
            };
            assert_eq!(can_search(&entitlement, 5), expected, "used = {used}");
        }
    }
}

#[test]
fn test_zero_limit_denies_unsubscribed() {
    let entitlement = Entitlement::default();
    assert_eq!(can_search(&entitlement, 0), GateDecision::Deny);
}

#[test]
fn test_searches_left() {
    let mut entitlement = Entitlement::default();
    assert_eq!(searches_left(&entitlement, 5), 5);
    entitlement.free_searches_used = 5;
    assert_eq!(searches_left(&entitlement, 5), 0);
    entitlement.free_searches_used = 9;
    assert_eq!(searches_left(&entitlement, 5), 0);
}
