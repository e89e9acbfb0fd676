// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Dot clock planning.
//!
//! A DU channel takes its dot clock either from the functional clock
//! through a divider, from the external DCLKIN pin through the same
//! divider, or from a display PLL fed by DCLKIN.

use vsp_abi::du;

/// Largest divider the ESCR register can express.
pub const MAX_DIVIDER: u64 = 64;

/// Lowest acceptable DPLL VCO frequency.
const DPLL_FOUT_MIN: u64 = 1000;
/// Highest acceptable DPLL VCO frequency.
const DPLL_FOUT_MAX: u64 = 2_048_000_000;
/// The DPLL output must stay below this frequency.
const DPLL_OUTPUT_LIMIT: u64 = 400_000_000;

/// Display PLL settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DpllConfig {
    /// Feedback divider (multiplier minus one).
    pub n: u32,
    /// Input divider (divisor minus one).
    pub m: u32,
    /// Output divider (divisor minus one).
    pub fdpll: u32,
    /// Resulting output frequency in Hz.
    pub output: u64,
}

impl DpllConfig {
    /// Find the PLL settings closest to `target` for an `input` reference.
    ///
    /// Returns `None` when no setting keeps the VCO in range.
    #[must_use]
    pub fn search(input: u64, target: u64) -> Option<Self> {
        let mut best: Option<(u64, Self)> = None;

        for m in 0..4_u32 {
            for n in (39..=119_u32).rev() {
                let fout = input * u64::from(n + 1) / u64::from(m + 1);
                if !(DPLL_FOUT_MIN..=DPLL_FOUT_MAX).contains(&fout) {
                    continue;
                }

                for fdpll in 1..32_u32 {
                    let output = fout / u64::from(fdpll + 1);
                    if output >= DPLL_OUTPUT_LIMIT {
                        continue;
                    }

                    let diff = output.abs_diff(target);
                    if best.is_none_or(|(best_diff, _)| diff < best_diff) {
                        best = Some((diff, Self { n, m, fdpll, output }));
                        if diff == 0 {
                            return best.map(|(_, config)| config);
                        }
                    }
                }
            }
        }

        best.map(|(_, config)| config)
    }

    /// DPLLCR value enabling this configuration.
    #[must_use]
    pub const fn dpllcr(&self) -> u32 {
        du::DPLLCR_CODE
            | du::DPLLCR_CLKE
            | du::dpllcr_fdpll(self.fdpll)
            | du::dpllcr_n(self.n)
            | du::dpllcr_m(self.m)
            | du::DPLLCR_STBY
    }
}

/// Where the dot clock comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockSource {
    /// Functional clock through the ESCR divider.
    Internal {
        /// Divider minus one.
        divider: u32,
    },
    /// DCLKIN through the ESCR divider.
    External {
        /// Divider minus one.
        divider: u32,
    },
    /// DCLKIN through the display PLL.
    Dpll(DpllConfig),
}

/// A chosen dot clock configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockPlan {
    /// Clock source and its settings.
    pub source: ClockSource,
    /// Frequency the configuration produces, in Hz.
    pub rate: u64,
}

/// Divider minus one giving the rate closest to `target` from `clk`.
///
/// The two dividers around `clk / target` are compared by rate error; on
/// a tie the faster rate wins.
fn divider_for(clk: u64, target: u64) -> u32 {
    let below = (clk / target).clamp(1, MAX_DIVIDER);
    let above = (below + 1).min(MAX_DIVIDER);
    let div = if (clk / above).abs_diff(target) < (clk / below).abs_diff(target) {
        above
    } else {
        below
    };
    (div - 1) as u32
}

impl ClockPlan {
    /// Plan a divided clock from the functional clock `clk`, switching to
    /// the external clock `ext` when it is strictly closer to `target`.
    ///
    /// Returns `None` for a zero target or a zero functional clock.
    #[must_use]
    pub fn divided(clk: u64, ext: Option<u64>, target: u64) -> Option<Self> {
        if target == 0 || clk == 0 {
            return None;
        }

        let divider = divider_for(clk, target);
        let mut plan = Self {
            source: ClockSource::Internal { divider },
            rate: clk / u64::from(divider + 1),
        };

        if let Some(ext) = ext.filter(|&rate| rate > 0) {
            let ext_divider = divider_for(ext, target);
            let ext_rate = ext / u64::from(ext_divider + 1);
            if ext_rate.abs_diff(target) < plan.error(target) {
                plan = Self {
                    source: ClockSource::External {
                        divider: ext_divider,
                    },
                    rate: ext_rate,
                };
            }
        }
        Some(plan)
    }

    /// Plan a PLL clock from the external reference `input`.
    #[must_use]
    pub fn dpll(input: u64, target: u64) -> Option<Self> {
        if target == 0 {
            return None;
        }
        DpllConfig::search(input, target).map(|config| Self {
            source: ClockSource::Dpll(config),
            rate: config.output,
        })
    }

    /// Distance between the planned rate and `target`.
    #[must_use]
    pub const fn error(&self, target: u64) -> u64 {
        self.rate.abs_diff(target)
    }

    /// ESCR value selecting this clock.
    #[must_use]
    pub const fn escr(&self) -> u32 {
        match self.source {
            ClockSource::Internal { divider } => {
                du::ESCR_DCLKSEL_CLKS | (divider & du::ESCR_FRQSEL_MASK)
            }
            ClockSource::External { divider } => {
                du::ESCR_DCLKSEL_DCLKIN | (divider & du::ESCR_FRQSEL_MASK)
            }
            ClockSource::Dpll(_) => du::ESCR_DCLKSEL_DCLKIN,
        }
    }

    /// DPLLCR value, if this plan uses the PLL.
    #[must_use]
    pub const fn dpllcr(&self) -> Option<u32> {
        match self.source {
            ClockSource::Dpll(config) => Some(config.dpllcr()),
            _ => None,
        }
    }
}
