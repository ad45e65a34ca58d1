//! Consistency checks for computed bandwidth weights.

use serde::{Deserialize, Serialize};

use super::cases::Coefficients;
use super::solver::NetworkLoad;

/// A failed weight check, in the order the checks are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum WeightCheck {
    #[error("SUMD_ERROR (Wed + Wmd + Wgd != weightscale)")]
    SumD,
    #[error("SUMG_ERROR (Wmg + Wgg != weightscale)")]
    SumG,
    #[error("SUME_ERROR (Wme + Wee != weightscale)")]
    SumE,
    #[error("RANGE_ERROR (weight outside [0, weightscale])")]
    Range,
    #[error("BALANCE_EG_ERROR (guard and exit capacity differ)")]
    BalanceExitGuard,
    #[error("BALANCE_MID_ERROR (guard and middle capacity differ)")]
    BalanceMiddle,
}

impl WeightCheck {
    /// Balance failures are tolerated, the others are not
    pub fn is_balance(self) -> bool {
        matches!(self, WeightCheck::BalanceExitGuard | WeightCheck::BalanceMiddle)
    }
}

fn check_eq(a: f64, b: f64, margin: f64) -> bool {
    (a - b).abs() <= margin
}

fn in_range(value: f64, max: f64) -> bool {
    (0.0..=max).contains(&value)
}

/// Verify the sum identities, the range bound and optionally the balance
/// identities of a set of coefficients.
///
/// NaN or infinite coefficients fail the first check they appear in.
pub fn check_weights(
    w: &Coefficients,
    load: &NetworkLoad,
    weightscale: f64,
    margin: f64,
    check_balance: bool,
) -> Result<(), WeightCheck> {
    if !check_eq(w.wed + w.wmd + w.wgd, weightscale, margin) {
        return Err(WeightCheck::SumD);
    }
    if !check_eq(w.wmg + w.wgg, weightscale, margin) {
        return Err(WeightCheck::SumG);
    }
    if !check_eq(w.wme + w.wee, weightscale, margin) {
        return Err(WeightCheck::SumE);
    }
    if !w.values().iter().all(|&v| in_range(v, weightscale)) {
        return Err(WeightCheck::Range);
    }

    if check_balance {
        let NetworkLoad { g, m, e, d, t } = *load;
        let balance_margin = margin * t / 3.0;
        let guard_side = w.wgg * g + w.wgd * d;

        // Wgg*G + Wgd*D == Wee*E + Wed*D
        if !check_eq(guard_side, w.wee * e + w.wed * d, balance_margin) {
            return Err(WeightCheck::BalanceExitGuard);
        }
        // Wgg*G + Wgd*D == M*weightscale + Wmd*D + Wme*E + Wmg*G
        if !check_eq(
            guard_side,
            m * weightscale + w.wmd * d + w.wme * e + w.wmg * g,
            balance_margin,
        ) {
            return Err(WeightCheck::BalanceMiddle);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const WS: f64 = 10000.0;

    fn balanced() -> (Coefficients, NetworkLoad) {
        let third = WS / 3.0;
        let w = Coefficients {
            wgg: WS,
            wgd: third,
            wee: WS,
            wed: third,
            wmg: 0.0,
            wme: 0.0,
            wmd: third,
        };
        (w, NetworkLoad::new(2500.0, 2500.0, 2500.0, 2500.0))
    }

    #[test]
    fn test_balanced_weights_pass() {
        let (w, load) = balanced();
        assert_eq!(check_weights(&w, &load, WS, 10.0, true), Ok(()));
    }

    #[test]
    fn test_sum_checks_in_order() {
        let (mut w, load) = balanced();
        w.wmd += 50.0;
        w.wgg -= 50.0;
        assert_eq!(check_weights(&w, &load, WS, 10.0, false), Err(WeightCheck::SumD));

        let (mut w, _) = balanced();
        w.wmg = 100.0;
        assert_eq!(check_weights(&w, &load, WS, 10.0, false), Err(WeightCheck::SumG));

        let (mut w, _) = balanced();
        w.wme = 100.0;
        assert_eq!(check_weights(&w, &load, WS, 10.0, false), Err(WeightCheck::SumE));
    }

    #[test]
    fn test_sum_margin() {
        let (mut w, load) = balanced();
        w.wmd += 9.5;
        assert_eq!(check_weights(&w, &load, WS, 10.0, false), Ok(()));
        w.wmd += 1.0;
        assert_eq!(check_weights(&w, &load, WS, 10.0, false), Err(WeightCheck::SumD));
    }

    #[test]
    fn test_range_check() {
        let (mut w, load) = balanced();
        w.wmg = -100.0;
        w.wgg = WS + 100.0;
        assert_eq!(check_weights(&w, &load, WS, 10.0, false), Err(WeightCheck::Range));
    }

    #[test]
    fn test_nan_fails() {
        let (mut w, load) = balanced();
        w.wed = f64::NAN;
        assert_eq!(check_weights(&w, &load, WS, 10.0, false), Err(WeightCheck::SumD));
    }

    #[test]
    fn test_balance_only_when_requested() {
        let (w, _) = balanced();
        let skewed = NetworkLoad::new(5000.0, 1000.0, 2000.0, 2000.0);
        assert_eq!(check_weights(&w, &skewed, WS, 10.0, false), Ok(()));
        let err = check_weights(&w, &skewed, WS, 10.0, true).unwrap_err();
        assert!(err.is_balance());
        assert!(!WeightCheck::Range.is_balance());
    }
}
