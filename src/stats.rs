//! Descriptive statistics and tie-breaking primitives.
//!
//! Small numeric helpers shared by the concept tree and the clustering views.
//!
//! # Overview
//!
//! | Function | Purpose |
//! |----------|---------|
//! | [`mean`] / [`std`] | Population mean and standard deviation |
//! | [`c4`] | Small-sample bias correction for standard deviation estimates |
//! | [`weighted_choice`] | Sample a value proportionally to its weight |
//! | [`most_likely_choice`] | Highest weight wins, ties broken at random |
//! | [`random_tiebreaker`] | Pick uniformly among the leading ties of a sorted list |
//! | [`tiebreak_top_2`] | Pick the best two of a sorted list, ties broken at random |
//!
//! Every randomized helper takes its random source explicitly, so a seeded
//! [`rand::rngs::StdRng`] makes a whole run reproducible.
//!
//! # Example
//!
//! ```rust
//! use cobweb_cuts::stats::{c4, mean, std};
//!
//! let values = [600.0, 470.0, 170.0, 430.0, 300.0];
//! assert_eq!(mean(&values).unwrap(), 394.0);
//! assert!((std(&values).unwrap() - 147.32277488562318).abs() < 1e-9);
//! assert_eq!(c4(3).unwrap(), 0.886226925452758);
//! ```

use crate::error::{Error, Result};
use rand::Rng;

/// `c4(n)` for n in `2..30`; index 0 holds n = 2.
const C4_TABLE: [f64; 28] = [
    0.7978845608028654,
    0.886226925452758,
    0.9213177319235613,
    0.9399856029866254,
    0.9515328619481445,
    0.9593687886998328,
    0.9650304561473722,
    0.9693106997139539,
    0.9726592741215884,
    0.9753500771452293,
    0.9775593518547722,
    0.9794056043142177,
    0.9809714367555161,
    0.9823161771626504,
    0.9834835316158412,
    0.9845064054718315,
    0.985410043808079,
    0.9862141368601935,
    0.9869342675246552,
    0.9875829288261562,
    0.9881702533158311,
    0.988704545233999,
    0.9891926749585048,
    0.9896403755857028,
    0.9900524688409107,
    0.990433039209448,
    0.9907855696217323,
    0.9911130482419843,
];

/// Attributes starting with `_` are bookkeeping and never modeled.
pub fn is_hidden(attr: &str) -> bool {
    attr.starts_with('_')
}

/// Mean of a non-empty slice.
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(Error::EmptyInput);
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation of a non-empty slice.
pub fn std(values: &[f64]) -> Result<f64> {
    let mu = mean(values)?;
    let variance = values.iter().map(|v| (v - mu) * (v - mu)).sum::<f64>() / values.len() as f64;
    Ok(variance.sqrt())
}

/// Correction factor that unbiases a standard deviation estimated from `n` samples.
///
/// Looked up for `n < 30`; the correction is negligible beyond that and 1.0
/// is returned. Fails for `n <= 1`.
pub fn c4(n: usize) -> Result<f64> {
    match n {
        0 | 1 => Err(Error::InvalidSampleSize { n }),
        2..=29 => Ok(C4_TABLE[n - 2]),
        _ => Ok(1.0),
    }
}

/// Weights must be present, finite and non-negative.
fn check_weights<T>(choices: &[(T, f64)]) -> Result<()> {
    if choices.is_empty() {
        return Err(Error::EmptyInput);
    }
    if choices.iter().any(|(_, w)| !w.is_finite()) {
        return Err(Error::InvalidParameter {
            name: "choices",
            message: "weights must be finite",
        });
    }
    if choices.iter().any(|(_, w)| *w < 0.0) {
        return Err(Error::NegativeWeight);
    }
    Ok(())
}

/// Sample a value with probability proportional to its weight.
///
/// Weights must be non-negative and at least one must be positive.
pub fn weighted_choice<'a, T, R: Rng + ?Sized>(choices: &'a [(T, f64)], rng: &mut R) -> Result<&'a T> {
    check_weights(choices)?;

    let total: f64 = choices.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        return Err(Error::InvalidParameter {
            name: "choices",
            message: "weights must not all be zero",
        });
    }
    if !total.is_finite() {
        return Err(Error::InvalidParameter {
            name: "choices",
            message: "weights must sum to a finite total",
        });
    }

    let r = rng.random_range(0.0..total);
    let mut upto = 0.0;
    for (value, w) in choices {
        if upto + w > r {
            return Ok(value);
        }
        upto += w;
    }

    // Rounding can leave r just past the accumulated sum.
    choices
        .iter()
        .rev()
        .find(|(_, w)| *w > 0.0)
        .map(|(value, _)| value)
        .ok_or(Error::EmptyInput)
}

/// Return the value with the highest weight; ties are broken at random.
pub fn most_likely_choice<'a, T, R: Rng + ?Sized>(choices: &'a [(T, f64)], rng: &mut R) -> Result<&'a T> {
    check_weights(choices)?;

    let mut sorted: Vec<&(T, f64)> = choices.iter().collect();
    sorted.sort_by(|a, b| b.1.total_cmp(&a.1));

    let best: &'a (T, f64) = *random_tiebreaker(&sorted, |c| c.1, rng)?;
    Ok(&best.0)
}

/// Given a non-empty, monotonically non-increasing list, choose uniformly
/// among the elements whose key equals the first element's key.
///
/// The key must strip everything irrelevant to the comparison.
pub fn random_tiebreaker<'a, T, K, F, R>(desc_sorted: &'a [T], key: F, rng: &mut R) -> Result<&'a T>
where
    K: PartialEq,
    F: Fn(&T) -> K,
    R: Rng + ?Sized,
{
    let first = desc_sorted.first().ok_or(Error::EmptyInput)?;
    let maximum = key(first);
    let ties = desc_sorted.iter().take_while(|x| key(x) == maximum).count();

    // A NaN key ties with nothing, not even itself.
    if ties <= 1 {
        return Ok(first);
    }
    Ok(&desc_sorted[rng.random_range(0..ties)])
}

/// Given a monotonically non-increasing list of at least two elements, pick
/// the best two.
///
/// If the first element is strictly best it is kept and the runner-up is
/// drawn among the ties for second place; otherwise two distinct elements are
/// drawn among the ties for first place.
pub fn tiebreak_top_2<'a, T, K, F, R>(desc_sorted: &'a [T], key: F, rng: &mut R) -> Result<(&'a T, &'a T)>
where
    K: PartialEq,
    F: Fn(&T) -> K,
    R: Rng + ?Sized,
{
    if desc_sorted.len() < 2 {
        return Err(Error::InvalidParameter {
            name: "desc_sorted",
            message: "need at least two elements",
        });
    }

    let second = key(&desc_sorted[1]);
    if key(&desc_sorted[0]) != second {
        let runner_up = random_tiebreaker(&desc_sorted[1..], &key, rng)?;
        return Ok((&desc_sorted[0], runner_up));
    }

    let ties = 2 + desc_sorted[2..].iter().take_while(|x| key(x) == second).count();
    if ties == 2 {
        return Ok((&desc_sorted[0], &desc_sorted[1]));
    }

    let picked = rand::seq::index::sample(rng, ties, 2);
    Ok((&desc_sorted[picked.index(0)], &desc_sorted[picked.index(1)]))
}
