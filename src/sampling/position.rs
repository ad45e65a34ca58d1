//! Relay positions and position classification.
//!
//! Every sampled relay is placed in exactly one of four mutually exclusive
//! positions. Flag frequencies observed in the measured network are turned
//! into flag probabilities: a relay that carried the Exit flag in 30% of the
//! consensuses it appeared in becomes an exit with probability 0.3.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

use crate::catalog::Relay;

/// Topological role of a relay in the generated network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    /// Guard flag only
    Guard,
    /// Exit flag only
    Exit,
    /// Both Guard and Exit flags
    GuardExit,
    /// Neither flag
    Middle,
}

impl Position {
    pub const ALL: [Position; 4] = [
        Position::Guard,
        Position::Exit,
        Position::GuardExit,
        Position::Middle,
    ];

    /// Order in which relays are labelled and emitted downstream
    pub const NAMING_ORDER: [Position; 4] = [
        Position::GuardExit,
        Position::Exit,
        Position::Guard,
        Position::Middle,
    ];

    /// Combine the two flag traits into a position
    pub fn from_traits(is_guard: bool, is_exit: bool) -> Self {
        match (is_guard, is_exit) {
            (true, true) => Position::GuardExit,
            (false, true) => Position::Exit,
            (true, false) => Position::Guard,
            (false, false) => Position::Middle,
        }
    }

    /// Short label used in log lines
    pub fn label(self) -> &'static str {
        match self {
            Position::Guard => "g",
            Position::Exit => "e",
            Position::GuardExit => "ge",
            Position::Middle => "m",
        }
    }

    /// Suffix appended to generated relay nicknames
    pub fn nickname_suffix(self) -> &'static str {
        match self {
            Position::Guard => "guard",
            Position::Exit => "exit",
            Position::GuardExit => "exitguard",
            Position::Middle => "middle",
        }
    }

    pub fn is_guard(self) -> bool {
        matches!(self, Position::Guard | Position::GuardExit)
    }

    pub fn is_exit(self) -> bool {
        matches!(self, Position::Exit | Position::GuardExit)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One value per position, indexable by [`Position`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ByPosition<T> {
    pub guard: T,
    pub exit: T,
    pub guard_exit: T,
    pub middle: T,
}

impl<T> ByPosition<T> {
    pub fn from_fn(mut f: impl FnMut(Position) -> T) -> Self {
        Self {
            guard: f(Position::Guard),
            exit: f(Position::Exit),
            guard_exit: f(Position::GuardExit),
            middle: f(Position::Middle),
        }
    }

    /// Iterate in [`Position::ALL`] order
    pub fn iter(&self) -> impl Iterator<Item = (Position, &T)> {
        Position::ALL.into_iter().map(move |position| (position, &self[position]))
    }

    pub fn map<U>(&self, mut f: impl FnMut(Position, &T) -> U) -> ByPosition<U> {
        ByPosition::from_fn(|position| f(position, &self[position]))
    }
}

impl<T> Index<Position> for ByPosition<T> {
    type Output = T;

    fn index(&self, position: Position) -> &T {
        match position {
            Position::Guard => &self.guard,
            Position::Exit => &self.exit,
            Position::GuardExit => &self.guard_exit,
            Position::Middle => &self.middle,
        }
    }
}

impl<T> IndexMut<Position> for ByPosition<T> {
    fn index_mut(&mut self, position: Position) -> &mut T {
        match position {
            Position::Guard => &mut self.guard,
            Position::Exit => &mut self.exit,
            Position::GuardExit => &mut self.guard_exit,
            Position::Middle => &mut self.middle,
        }
    }
}

/// Consensus bandwidth of a relay relative to the smallest sampled weight.
pub fn consensus_bandwidth(weight: f64, min_weight: f64) -> u64 {
    if min_weight <= 0.0 {
        return 0;
    }
    (weight / min_weight).round_ties_even() as u64
}

/// Whether a relay is allowed to receive the guard trait at all
pub fn is_guard_candidate(relay: &Relay, min_weight: f64, guard_min_consensus_bandwidth: u64) -> bool {
    relay.weight > 0.0
        && consensus_bandwidth(relay.weight, min_weight) >= guard_min_consensus_bandwidth
}

/// Assign a position to a relay.
///
/// `draw` yields uniform values in `[0, 1)`. It is called once for the guard
/// trait, only when the relay is a guard candidate, and then once for the
/// exit trait. Callers that need reproducible runs must classify relays in a
/// fixed order.
pub fn classify(
    relay: &Relay,
    min_weight: f64,
    guard_min_consensus_bandwidth: u64,
    mut draw: impl FnMut() -> f64,
) -> Position {
    let is_guard = is_guard_candidate(relay, min_weight, guard_min_consensus_bandwidth)
        && draw() <= relay.guard_frequency;
    let is_exit = draw() <= relay.exit_frequency;
    Position::from_traits(is_guard, is_exit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relay(weight: f64, guard_frequency: f64, exit_frequency: f64) -> Relay {
        Relay {
            fingerprints: Vec::new(),
            address: "10.0.0.1".to_string(),
            country_code: None,
            running_frequency: 1.0,
            guard_frequency,
            exit_frequency,
            weight,
            bandwidth_capacity: 0,
            bandwidth_rate: 0,
            bandwidth_burst: 0,
        }
    }

    /// Draw source replaying fixed values and counting calls
    fn fixed_draws(values: &[f64]) -> (impl FnMut() -> f64 + '_, std::rc::Rc<std::cell::Cell<usize>>) {
        let calls = std::rc::Rc::new(std::cell::Cell::new(0));
        let counter = calls.clone();
        let draw = move || {
            let value = values[counter.get()];
            counter.set(counter.get() + 1);
            value
        };
        (draw, calls)
    }

    #[test]
    fn test_from_traits() {
        assert_eq!(Position::from_traits(true, true), Position::GuardExit);
        assert_eq!(Position::from_traits(false, true), Position::Exit);
        assert_eq!(Position::from_traits(true, false), Position::Guard);
        assert_eq!(Position::from_traits(false, false), Position::Middle);
    }

    #[test]
    fn test_consensus_bandwidth_rounds_half_to_even() {
        assert_eq!(consensus_bandwidth(2.5, 1.0), 2);
        assert_eq!(consensus_bandwidth(3.5, 1.0), 4);
        assert_eq!(consensus_bandwidth(0.2, 0.0001), 2000);
        assert_eq!(consensus_bandwidth(1.0, 0.0), 0);
    }

    #[test]
    fn test_guard_and_exit_draws() {
        let r = relay(0.5, 0.6, 0.6);
        let (draw, calls) = fixed_draws(&[0.1, 0.2]);
        assert_eq!(classify(&r, 0.0001, 2000, draw), Position::GuardExit);
        assert_eq!(calls.get(), 2);

        let (draw, _) = fixed_draws(&[0.1, 0.9]);
        assert_eq!(classify(&r, 0.0001, 2000, draw), Position::Guard);

        let (draw, _) = fixed_draws(&[0.9, 0.2]);
        assert_eq!(classify(&r, 0.0001, 2000, draw), Position::Exit);

        let (draw, _) = fixed_draws(&[0.9, 0.9]);
        assert_eq!(classify(&r, 0.0001, 2000, draw), Position::Middle);
    }

    #[test]
    fn test_draw_equal_to_frequency_assigns_trait() {
        let r = relay(0.5, 0.25, 0.75);
        let (draw, _) = fixed_draws(&[0.25, 0.75]);
        assert_eq!(classify(&r, 0.0001, 2000, draw), Position::GuardExit);
    }

    #[test]
    fn test_low_consensus_bandwidth_skips_guard_draw() {
        // 0.1 / 0.0001 = 1000, below the 2000 threshold
        let r = relay(0.1, 1.0, 1.0);
        let (draw, calls) = fixed_draws(&[0.0]);
        assert_eq!(classify(&r, 0.0001, 2000, draw), Position::Exit);
        assert_eq!(calls.get(), 1, "only the exit trait is drawn");
    }

    #[test]
    fn test_zero_weight_never_guard() {
        let r = relay(0.0, 1.0, 0.0);
        let (draw, _) = fixed_draws(&[0.5]);
        assert_eq!(classify(&r, 0.0001, 0, draw), Position::Middle);
    }

    #[test]
    fn test_by_position_indexing() {
        let mut counts = ByPosition::<usize>::default();
        counts[Position::Exit] += 2;
        counts[Position::Middle] += 1;
        assert_eq!(counts.exit, 2);
        assert_eq!(counts.middle, 1);

        let order: Vec<Position> = counts.iter().map(|(p, _)| p).collect();
        assert_eq!(order, Position::ALL.to_vec());

        let doubled = counts.map(|_, c| c * 2);
        assert_eq!(doubled[Position::Exit], 4);
    }

    #[test]
    fn test_position_flags() {
        assert!(Position::GuardExit.is_guard() && Position::GuardExit.is_exit());
        assert!(Position::Guard.is_guard() && !Position::Guard.is_exit());
        assert!(!Position::Middle.is_guard() && !Position::Middle.is_exit());
        assert_eq!(Position::GuardExit.nickname_suffix(), "exitguard");
    }
}
