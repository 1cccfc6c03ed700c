//! Derivative-free minimisation with the Nelder-Mead simplex method.
//!
//! ```text
//! repeat until the simplex values agree or max_iterations is reached:
//!     order vertices f(x_0) <= ... <= f(x_n)
//!     c  = centroid of x_0 .. x_{n-1}
//!     xr = c + α (c - x_n)                       reflect
//!     xe = c + γ (xr - c)   if xr is a new best   expand
//!     xc = c + ρ (xr - c) or c + ρ (x_n - c)      contract
//!     x_i = x_0 + σ (x_i - x_0)                   shrink, when all else fails
//! ```
//!
//! Convergence uses the relative spread of function values across the simplex,
//! confirmed by restarting from the best vertex until a restart no longer
//! improves (Press et al., "Numerical Recipes", §10.5).

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;
const TINY: f64 = 1e-10;
/// Offset of each starting-simplex vertex from the start point.
const INITIAL_STEP: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct NelderMead {
    max_iterations: usize,
    tolerance: f64,
}

#[derive(Debug, Clone)]
pub struct Minimum {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl NelderMead {
    pub fn new(max_iterations: usize, tolerance: f64) -> Self {
        Self { max_iterations, tolerance }
    }

    /// Minimises `f` starting from `start`. NaN objective values are treated
    /// as +∞ so the search steps away from them.
    pub fn minimize<F>(&self, f: F, start: &[f64]) -> Minimum
    where
        F: Fn(&[f64]) -> f64,
    {
        let eval = |x: &[f64]| {
            let val = f(x);
            if val.is_nan() { f64::INFINITY } else { val }
        };

        if start.is_empty() {
            return Minimum { point: Vec::new(), value: eval(start), iterations: 0, converged: true };
        }

        // A collapsed simplex can straddle the minimum with equal values at
        // both ends. Restart from the best vertex until a fresh simplex no
        // longer improves on it.
        let mut result = self.descend(&eval, start, self.max_iterations);
        while result.converged {
            let budget = self.max_iterations.saturating_sub(result.iterations);
            let restart = self.descend(&eval, &result.point, budget);
            let settled = self.has_converged(restart.value, result.value);
            result = Minimum { iterations: result.iterations + restart.iterations, ..restart };
            if settled {
                break;
            }
        }
        result
    }

    /// One simplex run from `start` using at most `budget` iterations.
    fn descend<E>(&self, eval: &E, start: &[f64], budget: usize) -> Minimum
    where
        E: Fn(&[f64]) -> f64,
    {
        let n = start.len();
        let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
        simplex.push((start.to_vec(), eval(start)));
        for i in 0..n {
            let mut vertex = start.to_vec();
            vertex[i] += INITIAL_STEP;
            let val = eval(&vertex);
            simplex.push((vertex, val));
        }

        let mut iterations = 0;
        loop {
            simplex.sort_by(|a, b| a.1.total_cmp(&b.1));

            let best = simplex[0].1;
            let worst = simplex[n].1;
            if self.has_converged(best, worst) || iterations >= budget {
                let converged = self.has_converged(best, worst);
                let (point, value) = simplex.swap_remove(0);
                return Minimum { point, value, iterations, converged };
            }
            iterations += 1;

            let centroid = centroid(&simplex[..n]);
            let reflected = towards(&centroid, &simplex[n].0, -REFLECTION);
            let f_reflected = eval(&reflected);

            if f_reflected < best {
                let expanded = towards(&centroid, &reflected, EXPANSION);
                let f_expanded = eval(&expanded);
                simplex[n] = if f_expanded < f_reflected {
                    (expanded, f_expanded)
                } else {
                    (reflected, f_reflected)
                };
                continue;
            }

            if f_reflected < simplex[n - 1].1 {
                simplex[n] = (reflected, f_reflected);
                continue;
            }

            let (contracted, threshold) = if f_reflected < worst {
                (towards(&centroid, &reflected, CONTRACTION), f_reflected)
            } else {
                (towards(&centroid, &simplex[n].0, CONTRACTION), worst)
            };
            let f_contracted = eval(&contracted);
            if f_contracted < threshold {
                simplex[n] = (contracted, f_contracted);
                continue;
            }

            let anchor = simplex[0].0.clone();
            for vertex in simplex.iter_mut().skip(1) {
                let shrunk = towards(&anchor, &vertex.0, SHRINK);
                let val = eval(&shrunk);
                *vertex = (shrunk, val);
            }
        }
    }

    fn has_converged(&self, best: f64, worst: f64) -> bool {
        if !(best.is_finite() && worst.is_finite()) {
            return false;
        }
        2.0 * (worst - best).abs() <= self.tolerance * (worst.abs() + best.abs() + TINY)
    }
}

fn centroid(vertices: &[(Vec<f64>, f64)]) -> Vec<f64> {
    let dim = vertices[0].0.len();
    let mut c = vec![0.0; dim];
    for (x, _) in vertices {
        for (ci, xi) in c.iter_mut().zip(x) {
            *ci += xi;
        }
    }
    let count = vertices.len() as f64;
    c.iter_mut().for_each(|ci| *ci /= count);
    c
}

/// `origin + coef * (target - origin)`
fn towards(origin: &[f64], target: &[f64], coef: f64) -> Vec<f64> {
    origin
        .iter()
        .zip(target)
        .map(|(o, t)| o + coef * (t - o))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadratic_bowl() {
        let f = |x: &[f64]| (x[0] - 3.0).powi(2) + 10.0 * (x[1] + 1.0).powi(2) + 5.0;
        let result = NelderMead::new(2000, 1e-12).minimize(f, &[0.0, 0.0]);

        assert!(result.converged);
        assert!((result.point[0] - 3.0).abs() < 1e-3);
        assert!((result.point[1] + 1.0).abs() < 1e-3);
        assert!((result.value - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_rosenbrock_valley() {
        let f = |x: &[f64]| {
            1.0 + (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2)
        };
        let result = NelderMead::new(5000, 1e-12).minimize(f, &[-1.2, 1.0]);

        assert!(result.converged);
        assert!((result.point[0] - 1.0).abs() < 1e-2);
        assert!((result.point[1] - 1.0).abs() < 2e-2);
    }

    #[test]
    fn test_stops_at_iteration_limit() {
        let f = |x: &[f64]| x.iter().map(|v| v * v).sum::<f64>() + 1.0;
        let result = NelderMead::new(3, 1e-12).minimize(f, &[10.0, -10.0, 4.0]);

        assert!(!result.converged);
        assert_eq!(result.iterations, 3);
    }

    #[test]
    fn test_simplex_straddling_the_minimum_is_restarted() {
        // From 0.05 the first run collapses onto 0.45 / 0.55, which tie.
        let f = |x: &[f64]| (x[0] - 0.5).powi(2) + 1.0;
        let result = NelderMead::new(1000, 1e-12).minimize(f, &[0.05]);

        assert!(result.converged);
        assert!((result.point[0] - 0.5).abs() < 1e-3, "stopped at {:?}", result.point);
        assert!((result.value - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_nan_region_is_avoided() {
        let f = |x: &[f64]| if x[0] < 0.0 { f64::NAN } else { (x[0] - 0.5).powi(2) + 1.0 };
        let result = NelderMead::new(1000, 1e-12).minimize(f, &[0.05]);

        assert!(result.value.is_finite());
        assert!((result.point[0] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_zero_dimensional_problem() {
        let result = NelderMead::new(10, 1e-8).minimize(|_| 2.0, &[]);

        assert!(result.converged);
        assert_eq!(result.value, 2.0);
        assert_eq!(result.iterations, 0);
    }
}
