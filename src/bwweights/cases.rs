//! Per-case bandwidth weight formulas.
//!
//! Each function here is a pure formula for one load case of the directory
//! bandwidth-weight computation. The solver decides which formulas apply and
//! in which order they are tried.
//!
//! Notation: `G` guard-only, `M` middle, `E` exit-only and `D` guard+exit
//! consensus weight sums, `T = G + M + E + D`.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::solver::NetworkLoad;

/// The seven position weights of a consensus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coefficients {
    pub wgg: f64,
    pub wgd: f64,
    pub wee: f64,
    pub wed: f64,
    pub wmg: f64,
    pub wme: f64,
    pub wmd: f64,
}

impl Coefficients {
    pub fn values(&self) -> [f64; 7] {
        [self.wgg, self.wgd, self.wee, self.wed, self.wmg, self.wme, self.wmd]
    }
}

impl fmt::Display for Coefficients {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Wgg={}, Wgd={}, Wee={}, Wed={}, Wmg={}, Wme={}, Wmd={}",
            self.wgg, self.wgd, self.wee, self.wed, self.wmg, self.wme, self.wmd
        )
    }
}

/// Load case a set of weights was computed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightCase {
    /// Neither guards nor exits are scarce
    Case1,
    /// Both scarce, exits cannot be compensated by D
    Case2aExitScarce,
    /// Both scarce, guards cannot be compensated by D
    Case2aGuardScarce,
    Case2b1,
    Case2b2,
    Case2b3,
    Case3aGuardScarce,
    Case3aExitScarce,
    Case3bGuardScarce,
    Case3bExitScarce,
}

impl fmt::Display for WeightCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WeightCase::Case1 => "Case 1 (Wgd=Wmd=Wed)",
            WeightCase::Case2aExitScarce => "Case 2a (E scarce)",
            WeightCase::Case2aGuardScarce => "Case 2a (G scarce)",
            WeightCase::Case2b1 => "Case 2b1 (Wgg=weightscale, Wmd=Wgd)",
            WeightCase::Case2b2 => "Case 2b2 (Wgg=weightscale, Wee=weightscale)",
            WeightCase::Case2b3 => "Case 2b3 (Wmd=0)",
            WeightCase::Case3aGuardScarce => "Case 3a (G scarce)",
            WeightCase::Case3aExitScarce => "Case 3a (E scarce)",
            WeightCase::Case3bGuardScarce => "Case 3bg (G scarce, Wgg=weightscale, Wmd=Wed)",
            WeightCase::Case3bExitScarce => "Case 3be (E scarce, Wee=weightscale, Wmd=Wgd)",
        };
        f.write_str(name)
    }
}

/// A case formula: load and weightscale in, labelled coefficients out
pub type CaseFormula = fn(&NetworkLoad, f64) -> (WeightCase, Coefficients);

/// Case 1: split D evenly, give middle what guards and exits can spare.
pub fn case_1(load: &NetworkLoad, ws: f64) -> (WeightCase, Coefficients) {
    let NetworkLoad { g, m, e, .. } = *load;
    let third = ws / 3.0;
    let wee = (ws * (e + g + m)) / (3.0 * e);
    let wmg = (ws * (2.0 * g - e - m)) / (3.0 * g);
    (
        WeightCase::Case1,
        Coefficients {
            wgg: ws - wmg,
            wgd: third,
            wee,
            wed: third,
            wmg,
            wme: ws - wee,
            wmd: third,
        },
    )
}

/// Case 2a: the scarcer of guard/exit gets all of D, nothing goes to middle.
pub fn case_2a(load: &NetworkLoad, ws: f64) -> (WeightCase, Coefficients) {
    let exit_scarce = load.e < load.g;
    let (case, wed, wgd) = if exit_scarce {
        (WeightCase::Case2aExitScarce, ws, 0.0)
    } else {
        (WeightCase::Case2aGuardScarce, 0.0, ws)
    };
    (
        case,
        Coefficients {
            wgg: ws,
            wgd,
            wee: ws,
            wed,
            wmg: 0.0,
            wme: 0.0,
            wmd: 0.0,
        },
    )
}

/// Case 2b1: guards fully internal, D balanced against relative scarcity.
pub fn case_2b1(load: &NetworkLoad, ws: f64) -> (WeightCase, Coefficients) {
    let NetworkLoad { g, m, e, d, .. } = *load;
    let wed = (ws * (d - 2.0 * e + 4.0 * g - 2.0 * m)) / (3.0 * d);
    let shared = (ws - wed) / 2.0;
    (
        WeightCase::Case2b1,
        Coefficients {
            wgg: ws,
            wgd: shared,
            wee: (ws * (e - g + m)) / e,
            wed,
            wmg: 0.0,
            wme: (ws * (g - m)) / e,
            wmd: shared,
        },
    )
}

/// Case 2b2: guards and exits fully internal, D split by capacity deltas.
/// Falls through to case 2b3 when the middle share of D goes negative.
pub fn case_2b2(load: &NetworkLoad, ws: f64) -> (WeightCase, Coefficients) {
    let NetworkLoad { g, m, e, d, .. } = *load;
    let wed = (ws * (d - 2.0 * e + g + m)) / (3.0 * d);
    let mut wmd = (ws * (d - 2.0 * m + g + e)) / (3.0 * d);
    let mut case = WeightCase::Case2b2;
    if wmd < 0.0 {
        // too much bandwidth at the middle position
        case = WeightCase::Case2b3;
        wmd = 0.0;
    }
    (
        case,
        Coefficients {
            wgg: ws,
            wgd: ws - wed - wmd,
            wee: ws,
            wed,
            wmg: 0.0,
            wme: 0.0,
            wmd,
        },
    )
}

/// Case 3a: the scarce side takes all of D, the rich side shares with middle.
pub fn case_3a(load: &NetworkLoad, ws: f64) -> (WeightCase, Coefficients) {
    let NetworkLoad { g, m, e, .. } = *load;
    if g < e {
        let wme = if e < m { 0.0 } else { (ws * (e - m)) / (2.0 * e) };
        (
            WeightCase::Case3aGuardScarce,
            Coefficients {
                wgg: ws,
                wgd: ws,
                wee: ws - wme,
                wed: 0.0,
                wmg: 0.0,
                wme,
                wmd: 0.0,
            },
        )
    } else {
        let wmg = if g < m { 0.0 } else { (ws * (g - m)) / (2.0 * g) };
        (
            WeightCase::Case3aExitScarce,
            Coefficients {
                wgg: ws - wmg,
                wgd: 0.0,
                wee: ws,
                wed: ws,
                wmg,
                wme: 0.0,
                wmd: 0.0,
            },
        )
    }
}

/// Case 3b: the scarce side is fully internal and gets its share of D from
/// the capacity deltas; the remainder of D is split with middle.
pub fn case_3b(load: &NetworkLoad, ws: f64) -> (WeightCase, Coefficients) {
    let NetworkLoad { g, m, e, d, .. } = *load;
    if g < e {
        let wgd = (ws * (d - 2.0 * g + e + m)) / (3.0 * d);
        let wee = (ws * (e + m)) / (2.0 * e);
        let shared = (ws - wgd) / 2.0;
        (
            WeightCase::Case3bGuardScarce,
            Coefficients {
                wgg: ws,
                wgd,
                wee,
                wed: shared,
                wmg: 0.0,
                wme: ws - wee,
                wmd: shared,
            },
        )
    } else {
        let wed = (ws * (d - 2.0 * e + g + m)) / (3.0 * d);
        let wgg = (ws * (g + m)) / (2.0 * g);
        let shared = (ws - wed) / 2.0;
        (
            WeightCase::Case3bExitScarce,
            Coefficients {
                wgg,
                wgd: shared,
                wee: ws,
                wed,
                wmg: ws - wgg,
                wme: 0.0,
                wmd: shared,
            },
        )
    }
}
