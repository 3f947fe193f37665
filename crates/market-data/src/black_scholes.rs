//! Black-Scholes numeric kernel
//!
//! One convention for every consumer: volatility as a decimal fraction,
//! time in years, explicit risk-free rate.

use std::f64::consts::PI;

/// Days per year used to convert days-to-expiry into years.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Volatilities above this are taken to be quoted in percent.
pub const PERCENT_IV_THRESHOLD: f64 = 5.0;

/// Inputs to the gamma kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BSInputs {
    /// Spot price (index price of underlying)
    pub spot: f64,
    /// Strike price
    pub strike: f64,
    /// Time to expiry (in years)
    pub time: f64,
    /// Implied volatility (as decimal, e.g., 0.5 = 50%)
    pub vol: f64,
    /// Risk-free rate
    pub rate: f64,
}

impl BSInputs {
    /// True when every formula below is defined for these inputs.
    pub fn is_valid(&self) -> bool {
        self.time > 0.0
            && self.vol > 0.0
            && self.spot > 0.0
            && self.strike > 0.0
            && self.time.is_finite()
            && self.vol.is_finite()
            && self.spot.is_finite()
            && self.strike.is_finite()
            && self.rate.is_finite()
    }
}

pub fn norm_pdf(x: f64) -> f64 {
    (1.0 / (2.0 * PI).sqrt()) * (-0.5 * x * x).exp()
}

/// `d1 = (ln(S/K) + (r + σ²/2)T) / (σ√T)`, or `None` if undefined.
pub fn d1(input: &BSInputs) -> Option<f64> {
    if !input.is_valid() {
        return None;
    }
    let BSInputs {
        spot: s,
        strike: k,
        time: t,
        vol: v,
        rate: r,
    } = *input;

    Some(((s / k).ln() + (r + 0.5 * v * v) * t) / (v * t.sqrt()))
}

/// Black-Scholes gamma, identical for calls and puts.
///
/// Returns 0 when `T <= 0`, `σ <= 0` or any input is not a positive finite
/// number; the formula is never evaluated in that case.
pub fn gamma(input: &BSInputs) -> f64 {
    match d1(input) {
        Some(d1) => norm_pdf(d1) / (input.spot * input.vol * input.time.sqrt()),
        None => 0.0,
    }
}

/// Normalize an implied volatility to a decimal fraction.
pub fn iv_to_decimal(iv: f64) -> f64 {
    if iv > PERCENT_IV_THRESHOLD {
        iv / 100.0
    } else {
        iv
    }
}

/// Convert days to expiry into years.
pub fn years_from_days(days: f64) -> f64 {
    days / DAYS_PER_YEAR
}
