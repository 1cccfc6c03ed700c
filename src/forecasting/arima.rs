//! ARIMA(p, d, q) fitting by exact maximum likelihood.

use crate::config::ForecastConfig;
use crate::data::types::ArimaOrder;
use crate::error::ComputationError;
use crate::forecasting::optimizer::NelderMead;
use crate::forecasting::params::{
    constrain_invertible, constrain_stationary, partial_autocorrelations, unconstrain_pacf,
};
use crate::forecasting::state_space::{ArmaStateSpace, FilterOutput};

/// Relative spread below which a differenced series counts as constant.
const DEGENERATE_SPREAD: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct FittedArima {
    order: ArimaOrder,
    ar: Vec<f64>,
    ma: Vec<f64>,
    mean: f64,
    sigma2: f64,
    log_likelihood: f64,
    iterations: usize,
    /// Last observation of each differencing level, outermost first.
    tails: Vec<f64>,
    /// Scale of the working series used during fitting.
    scale: f64,
    next_state: Vec<f64>,
}

/// Differences `series` `d` times. Returns the working series and the last
/// value of every intermediate level.
fn difference(series: &[f64], d: usize) -> (Vec<f64>, Vec<f64>) {
    let mut current = series.to_vec();
    let mut tails = Vec::with_capacity(d);
    for _ in 0..d {
        match current.last() {
            Some(&last) => tails.push(last),
            None => break,
        }
        current = current.windows(2).map(|w| w[1] - w[0]).collect();
    }
    (current, tails)
}

/// Inverse of [`difference`] applied to a forecast of the working series.
fn integrate(mut forecast: Vec<f64>, tails: &[f64]) -> Vec<f64> {
    for &tail in tails.iter().rev() {
        let mut level = tail;
        for value in forecast.iter_mut() {
            level += *value;
            *value = level;
        }
    }
    forecast
}

struct Candidate {
    ar: Vec<f64>,
    ma: Vec<f64>,
    mean: f64,
}

fn unpack(params: &[f64], p: usize, q: usize, with_mean: bool) -> Candidate {
    Candidate {
        ar: constrain_stationary(&params[..p]),
        ma: constrain_invertible(&params[p..p + q]),
        mean: if with_mean { params[p + q] } else { 0.0 },
    }
}

fn evaluate(candidate: &Candidate, working: &[f64]) -> Result<FilterOutput, ComputationError> {
    let centered: Vec<f64> = working.iter().map(|x| x - candidate.mean).collect();
    ArmaStateSpace::new(&candidate.ar, &candidate.ma).filter(&centered)
}

/// Fits an ARIMA model of the given order to `series`.
///
/// A constant term is estimated only for undifferenced models (d == 0).
pub fn fit(
    series: &[f64],
    order: ArimaOrder,
    config: &ForecastConfig,
) -> Result<FittedArima, ComputationError> {
    if series.is_empty() {
        return Err(ComputationError::EmptyInput);
    }
    let (p, d, q) = (order.p(), order.d(), order.q());
    if p.max(d).max(q) > config.max_order {
        return Err(ComputationError::OrderTooLarge { order, max: config.max_order });
    }

    let with_mean = d == 0;
    let (working, tails) = difference(series, d);
    let required = p + q + usize::from(with_mean) + 1;
    if working.len() < required {
        return Err(ComputationError::SeriesTooShort {
            order,
            remaining: working.len(),
            required,
        });
    }
    if working.iter().any(|x| !x.is_finite()) {
        return Err(ComputationError::NonFinite("differenced series"));
    }

    let n = working.len() as f64;
    let sample_mean = working.iter().sum::<f64>() / n;
    let spread = (working.iter().map(|x| (x - sample_mean).powi(2)).sum::<f64>() / n).sqrt();
    let magnitude = working.iter().fold(1.0_f64, |acc, x| acc.max(x.abs()));
    if !(spread > DEGENERATE_SPREAD * magnitude) {
        return Err(ComputationError::DegenerateSeries);
    }

    // The likelihood is fitted on a standardised copy; forecasts are mapped back.
    let center = if with_mean { sample_mean } else { 0.0 };
    let scale = spread;
    let scaled: Vec<f64> = working.iter().map(|x| (x - center) / scale).collect();

    let mut start: Vec<f64> = partial_autocorrelations(&scaled, p)
        .into_iter()
        .map(unconstrain_pacf)
        .collect();
    start.extend(std::iter::repeat(0.0).take(q + usize::from(with_mean)));

    let objective = |params: &[f64]| match evaluate(&unpack(params, p, q, with_mean), &scaled) {
        Ok(output) => -output.log_likelihood / n,
        Err(_) => f64::INFINITY,
    };

    let minimum = NelderMead::new(config.max_iterations, config.tolerance).minimize(objective, &start);
    if !minimum.value.is_finite() {
        return Err(ComputationError::Numerical(
            "likelihood is not finite for any candidate parameters".to_string(),
        ));
    }
    if !minimum.converged {
        return Err(ComputationError::NotConverged(minimum.iterations));
    }

    let candidate = unpack(&minimum.point, p, q, with_mean);
    let output = evaluate(&candidate, &scaled)?;

    Ok(FittedArima {
        order,
        mean: center + scale * candidate.mean,
        sigma2: output.sigma2 * scale * scale,
        log_likelihood: output.log_likelihood - n * scale.ln(),
        iterations: minimum.iterations,
        ar: candidate.ar,
        ma: candidate.ma,
        tails,
        scale,
        next_state: output.next_state,
    })
}

impl FittedArima {
    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn ar(&self) -> &[f64] {
        &self.ar
    }

    pub fn ma(&self) -> &[f64] {
        &self.ma
    }

    /// Mean of the (differenced) series; zero when d > 0.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Point forecasts for the next `steps` periods.
    pub fn forecast(&self, steps: usize) -> Result<Vec<f64>, ComputationError> {
        let model = ArmaStateSpace::new(&self.ar, &self.ma);
        let working: Vec<f64> = model
            .forecast(&self.next_state, steps)
            .into_iter()
            .map(|x| self.mean + self.scale * x)
            .collect();

        let forecast = integrate(working, &self.tails);
        if forecast.iter().any(|x| !x.is_finite()) {
            return Err(ComputationError::NonFinite("forecast"));
        }
        Ok(forecast)
    }
}
