//! Display names and emission order for the scaled network.
//!
//! Relays are numbered position by position (guard+exit, exit, guard,
//! middle) and fastest first inside a position, giving nicknames such as
//! `relay1exitguard` or `relay42middle`. Equal weights are ordered by
//! fingerprint so the same scaled set always yields the same names.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::position::{consensus_bandwidth, ByPosition, Position};
use super::selector::ScaledSet;
use crate::catalog::Relay;

/// A chosen relay with the labels the config emitter needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaledRelay {
    pub nickname: String,
    /// Weight relative to the smallest chosen relay, as written to the bandwidth file
    pub consensus_weight: u64,
    #[serde(flatten)]
    pub relay: Relay,
}

/// Nickname for the `counter`-th relay in the given position
pub fn nickname(counter: usize, position: Position) -> String {
    format!("relay{}{}", counter, position.nickname_suffix())
}

/// Descending weight, then ascending fingerprint
fn fastest_first(a: (&String, f64), b: (&String, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0))
}

/// Fingerprints of one position in emission order
pub fn ordered_fingerprints(relays: &BTreeMap<String, Relay>) -> Vec<&String> {
    let mut items: Vec<(&String, &Relay)> = relays.iter().collect();
    items.sort_by(|a, b| fastest_first((a.0, a.1.weight), (b.0, b.1.weight)));
    items.into_iter().map(|(fp, _)| fp).collect()
}

/// Assign nicknames and consensus weights to every chosen relay.
pub fn name_relays(scaled: &ScaledSet) -> ByPosition<BTreeMap<String, ScaledRelay>> {
    let min_weight = scaled.min_weight().unwrap_or(0.0);
    let mut named = ByPosition::<BTreeMap<String, ScaledRelay>>::default();
    let mut counter = 1;

    for position in Position::NAMING_ORDER {
        let relays = &scaled.buckets[position];
        for fingerprint in ordered_fingerprints(relays) {
            let relay = &relays[fingerprint];
            named[position].insert(
                fingerprint.clone(),
                ScaledRelay {
                    nickname: nickname(counter, position),
                    consensus_weight: consensus_bandwidth(relay.weight, min_weight),
                    relay: relay.clone(),
                },
            );
            counter += 1;
        }
    }

    named
}

/// Flatten named relays into emission order.
pub fn emission_order(
    named: &ByPosition<BTreeMap<String, ScaledRelay>>,
) -> Vec<(Position, &String, &ScaledRelay)> {
    let mut ordered = Vec::new();
    for position in Position::NAMING_ORDER {
        let mut items: Vec<(&String, &ScaledRelay)> = named[position].iter().collect();
        items.sort_by(|a, b| fastest_first((a.0, a.1.relay.weight), (b.0, b.1.relay.weight)));
        ordered.extend(items.into_iter().map(|(fp, relay)| (position, fp, relay)));
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relay(weight: f64) -> Relay {
        Relay {
            fingerprints: Vec::new(),
            address: "10.0.0.1".to_string(),
            country_code: None,
            running_frequency: 1.0,
            guard_frequency: 0.0,
            exit_frequency: 0.0,
            weight,
            bandwidth_capacity: 0,
            bandwidth_rate: 0,
            bandwidth_burst: 0,
        }
    }

    fn scaled_set() -> ScaledSet {
        let mut buckets = ByPosition::<BTreeMap<String, Relay>>::default();
        buckets.guard.insert("A".repeat(40), relay(0.2));
        buckets.guard.insert("B".repeat(40), relay(0.3));
        buckets.exit.insert("C".repeat(40), relay(0.1));
        buckets.guard_exit.insert("D".repeat(40), relay(0.25));
        buckets.middle.insert("E".repeat(40), relay(0.05));
        buckets.middle.insert("F".repeat(40), relay(0.05));
        buckets.middle.insert("0".repeat(40), relay(0.05));
        ScaledSet {
            buckets,
            target_ratios: ByPosition::default(),
            realized_ratios: ByPosition::default(),
            divergence: 0.0,
            total_weight_before: 1.0,
        }
    }

    #[test]
    fn test_nickname_format() {
        assert_eq!(nickname(1, Position::GuardExit), "relay1exitguard");
        assert_eq!(nickname(12, Position::Middle), "relay12middle");
    }

    #[test]
    fn test_naming_order() {
        let named = name_relays(&scaled_set());
        assert_eq!(named.guard_exit[&"D".repeat(40)].nickname, "relay1exitguard");
        assert_eq!(named.exit[&"C".repeat(40)].nickname, "relay2exit");
        assert_eq!(named.guard[&"B".repeat(40)].nickname, "relay3guard");
        assert_eq!(named.guard[&"A".repeat(40)].nickname, "relay4guard");
        // equal weights fall back to fingerprint order
        assert_eq!(named.middle[&"0".repeat(40)].nickname, "relay5middle");
        assert_eq!(named.middle[&"E".repeat(40)].nickname, "relay6middle");
        assert_eq!(named.middle[&"F".repeat(40)].nickname, "relay7middle");
    }

    #[test]
    fn test_consensus_weights() {
        let named = name_relays(&scaled_set());
        assert_eq!(named.middle[&"E".repeat(40)].consensus_weight, 1);
        assert_eq!(named.guard[&"B".repeat(40)].consensus_weight, 6);
        assert_eq!(named.guard_exit[&"D".repeat(40)].consensus_weight, 5);
    }

    #[test]
    fn test_fastest_first() {
        let (a, b) = ("A".repeat(40), "B".repeat(40));
        assert_eq!(fastest_first((&a, 0.1), (&b, 0.2)), Ordering::Greater);
        assert_eq!(fastest_first((&a, 0.2), (&b, 0.2)), Ordering::Less);
        assert_eq!(fastest_first((&a, 0.2), (&a, 0.2)), Ordering::Equal);
    }

    #[test]
    fn test_emission_follows_nickname_numbering() {
        let named = name_relays(&scaled_set());
        let numbers: Vec<usize> = emission_order(&named)
            .into_iter()
            .map(|(position, _, r)| {
                r.nickname
                    .trim_start_matches("relay")
                    .trim_end_matches(position.nickname_suffix())
                    .parse()
                    .unwrap()
            })
            .collect();
        assert_eq!(numbers, (1..=7).collect::<Vec<_>>());
    }

    #[test]
    fn test_emission_order_is_stable() {
        let named = name_relays(&scaled_set());
        let nicknames: Vec<&str> = emission_order(&named)
            .into_iter()
            .map(|(_, _, r)| r.nickname.as_str())
            .collect();
        assert_eq!(
            nicknames,
            vec![
                "relay1exitguard",
                "relay2exit",
                "relay3guard",
                "relay4guard",
                "relay5middle",
                "relay6middle",
                "relay7middle"
            ]
        );
        assert_eq!(name_relays(&scaled_set()), named);
    }
}
