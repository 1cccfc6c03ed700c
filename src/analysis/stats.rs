use crate::data::types::{GroupSummary, StatsSummary};
use crate::error::ComputationError;

/// Single-pass moments (Welford's update) plus sum and extrema.
#[derive(Debug, Clone)]
pub struct Accumulator {
    n_vals: usize,
    sum: f64,
    mean: f64,
    diff_2_sum: f64,
    min: f64,
    max: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            n_vals: 0,
            sum: 0.0,
            mean: 0.0,
            diff_2_sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;
        self.sum += val;
        self.min = self.min.min(val);
        self.max = self.max.max(val);

        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;

        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;
    }

    pub fn count(&self) -> usize {
        self.n_vals
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// `sum / count`, kept inside `[min, max]`: rounding in the sum can push
    /// it one ulp past the extrema when all values are equal.
    pub fn mean(&self) -> f64 {
        if self.n_vals == 0 {
            return f64::NAN;
        }
        (self.sum / self.n_vals as f64).clamp(self.min, self.max)
    }

    /// Sample standard deviation (divisor `n - 1`); zero for a single value.
    pub fn std_dev(&self) -> f64 {
        if self.n_vals > 1 {
            (self.diff_2_sum / (self.n_vals as f64 - 1.0)).max(0.0).sqrt()
        } else {
            0.0
        }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<f64> for Accumulator {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = Accumulator::new();
        for val in iter {
            acc.add(val);
        }
        acc
    }
}

/// Middle value of a sorted copy; mean of the two middle values for even lengths.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some(sorted[mid - 1] / 2.0 + sorted[mid] / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Descriptive statistics over a non-empty list of finite values.
pub fn describe(values: &[f64]) -> Result<StatsSummary, ComputationError> {
    let summary = summarize(values)?;
    Ok(StatsSummary {
        count: summary.count,
        mean: summary.mean,
        median: summary.median,
        std_dev: summary.std_dev,
        min: summary.min,
        max: summary.max,
    })
}

pub(crate) fn summarize(values: &[f64]) -> Result<GroupSummary, ComputationError> {
    let median = median(values).ok_or(ComputationError::EmptyInput)?;
    let acc: Accumulator = values.iter().copied().collect();

    let summary = GroupSummary {
        count: acc.count(),
        sum: acc.sum(),
        mean: acc.mean(),
        min: acc.min(),
        max: acc.max(),
        median,
        std_dev: acc.std_dev(),
    };

    for (name, val) in [
        ("sum", summary.sum),
        ("mean", summary.mean),
        ("median", summary.median),
        ("std_dev", summary.std_dev),
        ("min", summary.min),
        ("max", summary.max),
    ] {
        if !val.is_finite() {
            return Err(ComputationError::NonFinite(name));
        }
    }

    Ok(summary)
}
