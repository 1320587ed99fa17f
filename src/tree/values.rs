//! Attribute-value statistics kept by every concept.
//!
//! A concept summarizes the instances beneath it:
//!
//! ```text
//! attribute │ kind       │ summary
//! ──────────┼────────────┼──────────────────────────────
//! color     │ nominal    │ {"red": 3, "blue": 1}
//! x         │ continuous │ n = 4, mean = 1.2, SSD = 0.8
//! ```
//!
//! Continuous attributes are modeled as Gaussians. Because small samples
//! underestimate spread, standard deviations go through [`c4`] and are
//! floored at an *acuity* before they are used in utility or likelihood.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use super::record::{Instance, Value};
use crate::stats::{c4, is_hidden};

/// Per-attribute statistics of a concept, keyed by attribute name.
pub type AvCounts = BTreeMap<String, AttrValues>;

/// Running mean and squared-deviation statistics of a numeric attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContinuousValue {
    num: f64,
    mean: f64,
    /// Sum of squared deviations from the mean.
    mean_sq: f64,
}

impl ContinuousValue {
    /// Empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics of the given values.
    pub fn from_values(values: &[f64]) -> Self {
        let mut cv = Self::new();
        for &x in values {
            cv.update(x);
        }
        cv
    }

    /// Add one observation (Welford update).
    pub fn update(&mut self, x: f64) {
        self.num += 1.0;
        let delta = x - self.mean;
        self.mean += delta / self.num;
        self.mean_sq += delta * (x - self.mean);
    }

    /// Pool another set of statistics into this one.
    pub fn combine(&mut self, other: &ContinuousValue) {
        if other.num == 0.0 {
            return;
        }
        let total = self.num + other.num;
        let delta = other.mean - self.mean;
        self.mean_sq += other.mean_sq + delta * delta * self.num * other.num / total;
        self.mean = (self.num * self.mean + other.num * other.mean) / total;
        self.num = total;
    }

    /// Number of observations.
    pub fn num(&self) -> f64 {
        self.num
    }

    /// Sample mean.
    pub fn unbiased_mean(&self) -> f64 {
        self.mean
    }

    /// Sum of squared deviations from the mean.
    pub fn sum_sq_dev(&self) -> f64 {
        self.mean_sq
    }

    /// Maximum-likelihood standard deviation.
    pub fn biased_std(&self) -> f64 {
        if self.num == 0.0 {
            return 0.0;
        }
        (self.mean_sq / self.num).sqrt()
    }

    /// Standard deviation corrected for small-sample bias; 0 with fewer than two observations.
    pub fn unbiased_std(&self) -> f64 {
        if self.num < 2.0 {
            return 0.0;
        }
        let correction = c4(self.num as usize).unwrap_or(1.0);
        self.biased_std() / correction
    }
}

/// Statistics of a single attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValues {
    /// Counts of each observed symbol.
    Nominal(BTreeMap<String, f64>),
    /// Gaussian summary of numeric observations.
    Continuous(ContinuousValue),
}

impl AttrValues {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Numeric(_) => value.as_number().map(|x| {
                let mut cv = ContinuousValue::new();
                cv.update(x);
                AttrValues::Continuous(cv)
            }),
            Value::Nominal(s) => Some(AttrValues::Nominal(BTreeMap::from([(s.clone(), 1.0)]))),
        }
    }

    fn add(&mut self, value: &Value) {
        match (self, value) {
            (AttrValues::Continuous(cv), Value::Numeric(_)) => {
                if let Some(x) = value.as_number() {
                    cv.update(x);
                }
            }
            (AttrValues::Nominal(counts), Value::Nominal(s)) => {
                *counts.entry(s.clone()).or_insert(0.0) += 1.0;
            }
            (AttrValues::Nominal(counts), Value::Numeric(x)) => {
                *counts.entry(x.to_string()).or_insert(0.0) += 1.0;
            }
            (AttrValues::Continuous(_), Value::Nominal(s)) => {
                log::debug!("ignoring nominal value {s:?} for a continuous attribute");
            }
        }
    }

    fn absorb(&mut self, other: &AttrValues) {
        match (self, other) {
            (AttrValues::Continuous(a), AttrValues::Continuous(b)) => a.combine(b),
            (AttrValues::Nominal(a), AttrValues::Nominal(b)) => {
                for (value, count) in b {
                    *a.entry(value.clone()).or_insert(0.0) += count;
                }
            }
            _ => log::debug!("ignoring statistics of a different attribute kind"),
        }
    }

    /// Is this a continuous attribute?
    pub fn is_continuous(&self) -> bool {
        matches!(self, AttrValues::Continuous(_))
    }

    /// Free parameters needed to model this attribute in one cluster.
    ///
    /// Continuous attributes cost 3; nominal ones cost one per observed value plus one.
    pub fn parameter_count(&self) -> usize {
        match self {
            AttrValues::Continuous(_) => 3,
            AttrValues::Nominal(counts) => counts.len() + 1,
        }
    }
}

/// Count plus attribute statistics: everything a concept knows about its instances.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub(crate) count: f64,
    pub(crate) av_counts: AvCounts,
}

impl Summary {
    /// Summary of a single instance.
    pub fn of(instance: &Instance) -> Self {
        let mut summary = Self::default();
        summary.increment(instance);
        summary
    }

    /// Number of instances summarized.
    pub fn count(&self) -> f64 {
        self.count
    }

    /// Attribute statistics.
    pub fn av_counts(&self) -> &AvCounts {
        &self.av_counts
    }

    /// Add an instance.
    pub fn increment(&mut self, instance: &Instance) {
        self.count += 1.0;
        for (attr, value) in instance {
            match self.av_counts.get_mut(attr) {
                Some(values) => values.add(value),
                None => {
                    if let Some(values) = AttrValues::from_value(value) {
                        let _ = self.av_counts.insert(attr.clone(), values);
                    }
                }
            }
        }
    }

    /// Add every instance summarized by `other`.
    pub fn absorb(&mut self, other: &Summary) {
        self.count += other.count;
        for (attr, values) in &other.av_counts {
            match self.av_counts.get_mut(attr) {
                Some(mine) => mine.absorb(values),
                None => {
                    let _ = self.av_counts.insert(attr.clone(), values.clone());
                }
            }
        }
    }

    /// Does this summary describe exactly one distinct instance equal to `instance`?
    ///
    /// Hidden attributes are not compared.
    pub fn is_exact_match(&self, instance: &Instance) -> bool {
        if instance
            .keys()
            .filter(|a| !is_hidden(a))
            .any(|a| !self.av_counts.contains_key(a))
        {
            return false;
        }

        for (attr, values) in self.av_counts.iter().filter(|(a, _)| !is_hidden(a)) {
            let Some(value) = instance.get(attr) else {
                return false;
            };
            match values {
                AttrValues::Continuous(cv) => {
                    if cv.unbiased_std() != 0.0 || value.as_number() != Some(cv.unbiased_mean()) {
                        return false;
                    }
                }
                AttrValues::Nominal(counts) => {
                    let key = match value {
                        Value::Nominal(s) => s.clone(),
                        Value::Numeric(x) => x.to_string(),
                    };
                    if counts.get(&key) != Some(&self.count) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Expected number of attribute values guessed correctly by probability matching.
    ///
    /// Nominal attributes contribute `Σ p(v)²`; continuous attributes contribute
    /// `p(attr)² / (2√π σ)` with σ floored at `acuity`.
    pub fn expected_correct_guesses(&self, acuity: f64) -> f64 {
        if self.count == 0.0 {
            return 0.0;
        }

        self.av_counts
            .iter()
            .filter(|(attr, _)| !is_hidden(attr))
            .map(|(_, values)| match values {
                AttrValues::Continuous(cv) => {
                    let std = cv.unbiased_std().max(acuity);
                    let prob_attr = cv.num() / self.count;
                    prob_attr * prob_attr / (2.0 * PI.sqrt() * std)
                }
                AttrValues::Nominal(counts) => counts
                    .values()
                    .map(|c| {
                        let p = c / self.count;
                        p * p
                    })
                    .sum(),
            })
            .sum()
    }

    /// Log-likelihood of the summarized instances under this concept's own model.
    pub fn log_likelihood(&self, acuity: f64) -> f64 {
        if self.count == 0.0 {
            return 0.0;
        }

        self.av_counts
            .iter()
            .filter(|(attr, _)| !is_hidden(attr))
            .map(|(_, values)| match values {
                AttrValues::Continuous(cv) => {
                    let var = cv.unbiased_std().max(acuity).powi(2);
                    -0.5 * cv.num() * (2.0 * PI * var).ln() - cv.sum_sq_dev() / (2.0 * var)
                }
                AttrValues::Nominal(counts) => counts
                    .values()
                    .filter(|c| **c > 0.0)
                    .map(|c| c * (c / self.count).ln())
                    .sum(),
            })
            .sum()
    }
}

/// Category utility of partitioning `parent` into `children`.
///
/// ```text
/// CU = (Σ_k P(C_k)·ECG(C_k) − ECG(parent)) / K
/// ```
pub fn category_utility(parent: &Summary, children: &[&Summary], acuity: f64) -> f64 {
    if children.is_empty() || parent.count == 0.0 {
        return 0.0;
    }

    let child_guesses: f64 = children
        .iter()
        .map(|child| child.count / parent.count * child.expected_correct_guesses(acuity))
        .sum();

    (child_guesses - parent.expected_correct_guesses(acuity)) / children.len() as f64
}
