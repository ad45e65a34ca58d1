//! Bandwidth weight case analysis.
//!
//! Determines the load regime of a network from its aggregate position
//! weights and runs that regime's chain of case formulas. Each formula's
//! output is validated; the first one passing all checks wins. If none
//! passes, the last attempt is kept when it only misses the balance
//! identities and rejected otherwise.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::cases::{
    case_1, case_2a, case_2b1, case_2b2, case_3a, case_3b, CaseFormula, Coefficients, WeightCase,
};
use super::checks::{check_weights, WeightCheck};
use crate::sampling::{ByPosition, Position};

/// Default fixed-point scale of the weights
pub const DEFAULT_WEIGHTSCALE: u32 = 10000;

/// Allowed deviation for the sum identities; scaled by `T / 3` for balance
pub const CHECK_MARGIN: f64 = 10.0;

/// Aggregate consensus weights of a network per position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkLoad {
    /// Guard-only weight
    pub g: f64,
    /// Middle weight
    pub m: f64,
    /// Exit-only weight
    pub e: f64,
    /// Guard+exit weight
    pub d: f64,
    /// Total weight
    pub t: f64,
}

/// Which of guard and exit capacity is scarce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadRegime {
    NeitherScarce,
    BothScarce,
    OneScarce,
}

impl NetworkLoad {
    pub fn new(g: f64, m: f64, e: f64, d: f64) -> Self {
        Self { g, m, e, d, t: g + m + e + d }
    }

    /// Build a load from per-position weight sums divided by `unit`
    pub fn from_position_weights(weights: &ByPosition<f64>, unit: f64) -> Self {
        Self::new(
            weights[Position::Guard] / unit,
            weights[Position::Middle] / unit,
            weights[Position::Exit] / unit,
            weights[Position::GuardExit] / unit,
        )
    }

    pub fn regime(&self) -> LoadRegime {
        let exit_rich = 3.0 * self.e >= self.t;
        let guard_rich = 3.0 * self.g >= self.t;
        match (guard_rich, exit_rich) {
            (true, true) => LoadRegime::NeitherScarce,
            (false, false) => LoadRegime::BothScarce,
            _ => LoadRegime::OneScarce,
        }
    }

    fn is_consistent(&self) -> bool {
        let parts = [self.g, self.m, self.e, self.d];
        parts.iter().all(|v| v.is_finite() && *v >= 0.0)
            && self.t.is_finite()
            && self.t > 0.0
            && (parts.iter().sum::<f64>() - self.t).abs() <= 1e-9 * self.t
    }
}

/// One step of a fallback chain.
#[derive(Clone, Copy)]
pub struct CaseAttempt {
    pub formula: CaseFormula,
    /// Whether the balance identities apply to this case
    pub check_balance: bool,
}

impl CaseAttempt {
    const fn balanced(formula: CaseFormula) -> Self {
        Self { formula, check_balance: true }
    }

    const fn saturated(formula: CaseFormula) -> Self {
        Self { formula, check_balance: false }
    }
}

/// Ordered case formulas to try for a load.
///
/// Case 2a and 3a hand all of D to the scarce side; they are checked for the
/// sum and range identities only. A both-scarce load with `D == 0` also goes
/// to case 2a, which covers networks without any guard or exit capacity.
pub fn fallback_chain(load: &NetworkLoad) -> Vec<CaseAttempt> {
    match load.regime() {
        LoadRegime::NeitherScarce => vec![CaseAttempt::balanced(case_1)],
        LoadRegime::BothScarce => {
            let r = load.e.min(load.g);
            let s = load.e.max(load.g);
            // case 2b divides D; without guard+exit capacity there is nothing to split
            if r + load.d < s || load.d <= 0.0 {
                vec![CaseAttempt::saturated(case_2a)]
            } else {
                vec![CaseAttempt::balanced(case_2b1), CaseAttempt::balanced(case_2b2)]
            }
        }
        LoadRegime::OneScarce => {
            let s = load.e.min(load.g);
            if 3.0 * (s + load.d) < load.t {
                vec![CaseAttempt::saturated(case_3a)]
            } else {
                vec![CaseAttempt::balanced(case_3b)]
            }
        }
    }
}

/// Computed weights and the case they came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandwidthWeights {
    pub case: WeightCase,
    #[serde(flatten)]
    pub coefficients: Coefficients,
    /// Balance identity the chosen case misses, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_violation: Option<WeightCheck>,
}

/// Errors from the bandwidth weight computation.
#[derive(Debug, thiserror::Error)]
pub enum BwWeightError {
    #[error("Bandwidths have inconsistent values G={}, M={}, E={}, D={}, T={}", .0.g, .0.m, .0.e, .0.d, .0.t)]
    InconsistentInput(NetworkLoad),
    #[error("{case} failed with {check}: {coefficients}")]
    InvariantViolation {
        case: WeightCase,
        check: WeightCheck,
        coefficients: Coefficients,
    },
}

/// Computes consensus bandwidth weights for a network load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandwidthWeightSolver {
    pub weightscale: f64,
    pub margin: f64,
}

impl Default for BandwidthWeightSolver {
    fn default() -> Self {
        Self::new(DEFAULT_WEIGHTSCALE)
    }
}

impl BandwidthWeightSolver {
    pub fn new(weightscale: u32) -> Self {
        Self {
            weightscale: f64::from(weightscale),
            margin: CHECK_MARGIN,
        }
    }

    /// Run a single attempt and its checks
    pub fn attempt(
        &self,
        load: &NetworkLoad,
        attempt: CaseAttempt,
    ) -> (WeightCase, Coefficients, Result<(), WeightCheck>) {
        let (case, coefficients) = (attempt.formula)(load, self.weightscale);
        let check = check_weights(
            &coefficients,
            load,
            self.weightscale,
            self.margin,
            attempt.check_balance,
        );
        (case, coefficients, check)
    }

    pub fn solve(&self, load: &NetworkLoad) -> Result<BandwidthWeights, BwWeightError> {
        if !load.is_consistent() {
            return Err(BwWeightError::InconsistentInput(*load));
        }

        let mut last_failure = None;
        for attempt in fallback_chain(load) {
            let (case, coefficients, check) = self.attempt(load, attempt);
            match check {
                Ok(()) => {
                    return Ok(BandwidthWeights {
                        case,
                        coefficients,
                        balance_violation: None,
                    })
                }
                Err(check) => {
                    debug!("{} rejected by {}: {}", case, check, coefficients);
                    last_failure = Some((case, coefficients, check));
                }
            }
        }

        let Some((case, coefficients, check)) = last_failure else {
            return Err(BwWeightError::InconsistentInput(*load));
        };
        if check.is_balance() {
            warn!("{} misses a balance identity ({}), keeping it: {}", case, check, coefficients);
            Ok(BandwidthWeights {
                case,
                coefficients,
                balance_violation: Some(check),
            })
        } else {
            Err(BwWeightError::InvariantViolation {
                case,
                check,
                coefficients,
            })
        }
    }
}

/// Solve and log the weights of a network under the given label.
pub fn log_bandwidth_weights(
    solver: &BandwidthWeightSolver,
    label: &str,
    load: &NetworkLoad,
) -> Result<BandwidthWeights, BwWeightError> {
    let weights = solver.solve(load)?;
    info!("Bandwidth-weights (relevant ones) of {}:", label);
    info!("Casename: {}, with: {}", weights.case, weights.coefficients);
    Ok(weights)
}
