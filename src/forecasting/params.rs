//! Parameter transforms that keep ARMA candidates stationary and invertible.
//!
//! The optimiser works on unconstrained reals. Each one is squashed into a
//! partial autocorrelation in (-1, 1) and the Durbin-Levinson recursion turns
//! those into polynomial coefficients, which are then stationary by
//! construction (Barndorff-Nielsen & Schou, 1973; Jones, 1980).

/// Largest partial autocorrelation used for starting values.
const MAX_START_PACF: f64 = 0.9;

/// Unconstrained reals → coefficients `φ` of a stationary AR polynomial
/// `1 - φ₁B - … - φₚBᵖ`.
pub fn constrain_stationary(unconstrained: &[f64]) -> Vec<f64> {
    let mut coeffs: Vec<f64> = Vec::with_capacity(unconstrained.len());

    for (k, &x) in unconstrained.iter().enumerate() {
        let r = x / (1.0 + x * x).sqrt();
        let prev = coeffs.clone();
        for j in 0..k {
            coeffs[j] = prev[j] - r * prev[k - 1 - j];
        }
        coeffs.push(r);
    }

    coeffs
}

/// Unconstrained reals → coefficients `θ` of an invertible MA polynomial
/// `1 + θ₁B + … + θ_qB^q`.
pub fn constrain_invertible(unconstrained: &[f64]) -> Vec<f64> {
    constrain_stationary(unconstrained).into_iter().map(|c| -c).collect()
}

/// Inverse of the squashing step for a single partial autocorrelation.
pub fn unconstrain_pacf(r: f64) -> f64 {
    let r = r.clamp(-MAX_START_PACF, MAX_START_PACF);
    r / (1.0 - r * r).sqrt()
}

/// Sample partial autocorrelations up to `max_lag` (Yule-Walker via
/// Levinson-Durbin on the biased autocovariances).
pub fn partial_autocorrelations(data: &[f64], max_lag: usize) -> Vec<f64> {
    let n = data.len();
    let mut pacf = vec![0.0; max_lag];
    if n == 0 || max_lag == 0 {
        return pacf;
    }

    let mean = data.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = data.iter().map(|x| x - mean).collect();
    let autocov: Vec<f64> = (0..=max_lag)
        .map(|k| {
            if k >= n {
                return 0.0;
            }
            (k..n).map(|i| centered[i] * centered[i - k]).sum::<f64>() / n as f64
        })
        .collect();

    if autocov[0] <= f64::EPSILON {
        return pacf;
    }

    let mut phi: Vec<f64> = Vec::with_capacity(max_lag);
    let mut innovation_var = autocov[0];
    for k in 1..=max_lag {
        let mut num = autocov[k];
        for j in 1..k {
            num -= phi[j - 1] * autocov[k - j];
        }
        if innovation_var <= f64::EPSILON {
            break;
        }
        let r = (num / innovation_var).clamp(-1.0, 1.0);

        let prev = phi.clone();
        for j in 0..k - 1 {
            phi[j] = prev[j] - r * prev[k - 2 - j];
        }
        phi.push(r);

        innovation_var *= 1.0 - r * r;
        pacf[k - 1] = r;
    }

    pacf
}
