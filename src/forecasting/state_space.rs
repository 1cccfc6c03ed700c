//! Exact Gaussian likelihood of a zero-mean ARMA(p, q) process.
//!
//! Harvey's state-space form with state dimension `r = max(p, q + 1)`:
//!
//! ```text
//! y_t     = Z α_t                      Z = [1, 0, …, 0]
//! α_{t+1} = T α_t + R ε_{t+1}          T = [φ | I_{r-1} ; 0],  R = [1, θ₁, …, θ_{r-1}]'
//! ```
//!
//! The filter starts from the stationary covariance (`P = T P T' + R R'`) and
//! concentrates the innovation variance out of the likelihood.

use crate::error::ComputationError;

type Matrix = Vec<Vec<f64>>;

const MAX_DOUBLINGS: usize = 64;

#[derive(Debug, Clone)]
pub struct ArmaStateSpace {
    dim: usize,
    transition: Matrix,
    selection: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct FilterOutput {
    pub log_likelihood: f64,
    /// Maximum-likelihood estimate of the innovation variance.
    pub sigma2: f64,
    /// Predicted state for the first period after the sample.
    pub next_state: Vec<f64>,
}

impl ArmaStateSpace {
    pub fn new(ar: &[f64], ma: &[f64]) -> Self {
        let dim = ar.len().max(ma.len() + 1);

        let mut transition = vec![vec![0.0; dim]; dim];
        for (i, &phi) in ar.iter().enumerate() {
            transition[i][0] = phi;
        }
        for i in 0..dim - 1 {
            transition[i][i + 1] = 1.0;
        }

        let mut selection = vec![0.0; dim];
        selection[0] = 1.0;
        for (j, &theta) in ma.iter().enumerate() {
            selection[j + 1] = theta;
        }

        Self { dim, transition, selection }
    }

    /// Solves `P = T P T' + R R'` by doubling: `P ← P + A P A'`, `A ← A²`.
    pub fn stationary_covariance(&self) -> Result<Matrix, ComputationError> {
        let mut cov = outer(&self.selection, &self.selection);
        let mut power = self.transition.clone();

        for _ in 0..MAX_DOUBLINGS {
            let increment = mul_transpose(&matmul(&power, &cov), &power);
            let mut delta = 0.0_f64;
            let mut scale = 0.0_f64;
            for i in 0..self.dim {
                for j in 0..self.dim {
                    cov[i][j] += increment[i][j];
                    delta = delta.max(increment[i][j].abs());
                    scale = scale.max(cov[i][j].abs());
                }
            }
            if !scale.is_finite() {
                break;
            }
            if delta <= 1e-13 * (1.0 + scale) {
                return Ok(cov);
            }
            power = matmul(&power, &power);
        }

        Err(ComputationError::Numerical(
            "stationary state covariance did not converge".to_string(),
        ))
    }

    pub fn filter(&self, observations: &[f64]) -> Result<FilterOutput, ComputationError> {
        if observations.is_empty() {
            return Err(ComputationError::EmptyInput);
        }

        let noise = outer(&self.selection, &self.selection);
        let mut state = vec![0.0; self.dim];
        let mut cov = self.stationary_covariance()?;

        let mut sum_sq = 0.0;
        let mut sum_log_var = 0.0;
        for &obs in observations {
            let innovation = obs - state[0];
            let innovation_var = cov[0][0];
            if !(innovation_var > 0.0 && innovation_var.is_finite()) {
                return Err(ComputationError::Numerical(
                    "singular innovation variance".to_string(),
                ));
            }

            let t_cov = matmul(&self.transition, &cov);
            let gain: Vec<f64> = t_cov.iter().map(|row| row[0] / innovation_var).collect();

            state = matvec(&self.transition, &state)
                .into_iter()
                .zip(&gain)
                .map(|(s, k)| s + k * innovation)
                .collect();

            let predicted = mul_transpose(&t_cov, &self.transition);
            for i in 0..self.dim {
                for j in 0..=i {
                    let sym = 0.5 * (predicted[i][j] + predicted[j][i]);
                    let val = sym - gain[i] * gain[j] * innovation_var + noise[i][j];
                    cov[i][j] = val;
                    cov[j][i] = val;
                }
            }

            sum_sq += innovation * innovation / innovation_var;
            sum_log_var += innovation_var.ln();
        }

        let n = observations.len() as f64;
        let sigma2 = sum_sq / n;
        if !(sigma2 > 0.0 && sigma2.is_finite()) {
            return Err(ComputationError::Numerical(format!(
                "innovation variance estimate is {sigma2}"
            )));
        }

        let log_likelihood =
            -0.5 * n * ((2.0 * std::f64::consts::PI).ln() + sigma2.ln() + 1.0) - 0.5 * sum_log_var;
        if !log_likelihood.is_finite() {
            return Err(ComputationError::Numerical("non-finite likelihood".to_string()));
        }

        Ok(FilterOutput { log_likelihood, sigma2, next_state: state })
    }

    /// Expected values of the next `steps` observations, future shocks set to zero.
    pub fn forecast(&self, next_state: &[f64], steps: usize) -> Vec<f64> {
        let mut state = next_state.to_vec();
        let mut out = Vec::with_capacity(steps);
        for _ in 0..steps {
            out.push(state[0]);
            state = matvec(&self.transition, &state);
        }
        out
    }
}

fn outer(a: &[f64], b: &[f64]) -> Matrix {
    a.iter().map(|x| b.iter().map(|y| x * y).collect()).collect()
}

fn matvec(m: &Matrix, v: &[f64]) -> Vec<f64> {
    m.iter().map(|row| row.iter().zip(v).map(|(a, b)| a * b).sum()).collect()
}

fn matmul(a: &Matrix, b: &Matrix) -> Matrix {
    let n = b.first().map_or(0, Vec::len);
    a.iter()
        .map(|row| {
            (0..n)
                .map(|j| row.iter().zip(b).map(|(x, b_row)| x * b_row[j]).sum())
                .collect()
        })
        .collect()
}

/// `a * b'`
fn mul_transpose(a: &Matrix, b: &Matrix) -> Matrix {
    a.iter()
        .map(|row| {
            b.iter()
                .map(|b_row| row.iter().zip(b_row).map(|(x, y)| x * y).sum())
                .collect()
        })
        .collect()
}
