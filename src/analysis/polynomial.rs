use nalgebra::{DMatrix, DVector};

use crate::error::{DendriteError, DendriteResult};

const ROOT_GRID: usize = 1000;
const BISECTIONS: usize = 80;

/// `c[0] + c[1]·x + c[2]·x² + …`
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    pub coefficients: Vec<f64>,
}

impl Polynomial {
    pub fn new(coefficients: Vec<f64>) -> Self {
        Polynomial { coefficients }
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Horner evaluation.
    pub fn eval(&self, x: f64) -> f64 {
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * x + c)
    }

    pub fn derivative(&self) -> Polynomial {
        Polynomial::new(
            self.coefficients
                .iter()
                .enumerate()
                .skip(1)
                .map(|(k, &c)| k as f64 * c)
                .collect(),
        )
    }

    /// Least-squares fit through a Vandermonde system solved by SVD.
    ///
    /// Abscissae are divided by the largest `|x|` before fitting and the
    /// coefficients scaled back afterwards.
    pub fn fit(xs: &[f64], ys: &[f64], degree: usize) -> DendriteResult<Polynomial> {
        if xs.len() != ys.len() {
            return Err(DendriteError::MismatchedInputs {
                from: xs.len(),
                to: ys.len(),
            });
        }
        if xs.is_empty() {
            return Err(DendriteError::InvalidInput(
                "polynomial fit needs at least one sample".into(),
            ));
        }
        if xs.iter().chain(ys).any(|v| !v.is_finite()) {
            return Err(DendriteError::InvalidInput(
                "polynomial fit needs finite samples".into(),
            ));
        }

        let scale = xs.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));
        let scale = if scale > 0.0 { scale } else { 1.0 };
        let vandermonde = DMatrix::from_fn(xs.len(), degree + 1, |i, k| {
            (xs[i] / scale).powi(k as i32)
        });
        let rhs = DVector::from_column_slice(ys);
        let solution = vandermonde
            .svd(true, true)
            .solve(&rhs, 1e-12)
            .map_err(|e| DendriteError::InvalidInput(format!("polynomial fit failed: {}", e)))?;

        let coefficients = solution
            .iter()
            .enumerate()
            .map(|(k, &c)| c / scale.powi(k as i32))
            .collect();
        Ok(Polynomial::new(coefficients))
    }

    /// Real roots inside `[lo, hi]`, found by sign changes on a uniform grid
    /// refined with bisection.
    pub fn roots_in(&self, lo: f64, hi: f64) -> Vec<f64> {
        if self.degree() == 0 || !(hi > lo) {
            return Vec::new();
        }
        let step = (hi - lo) / ROOT_GRID as f64;
        let mut roots = Vec::new();
        let mut x0 = lo;
        let mut y0 = self.eval(x0);
        for i in 1..=ROOT_GRID {
            let x1 = if i == ROOT_GRID { hi } else { lo + step * i as f64 };
            let y1 = self.eval(x1);
            if y0 == 0.0 {
                roots.push(x0);
            } else if y0 * y1 < 0.0 {
                roots.push(self.bisect(x0, x1, y0));
            }
            x0 = x1;
            y0 = y1;
        }
        if y0 == 0.0 {
            roots.push(x0);
        }
        roots
    }

    fn bisect(&self, mut a: f64, mut b: f64, mut ya: f64) -> f64 {
        for _ in 0..BISECTIONS {
            let mid = 0.5 * (a + b);
            let ym = self.eval(mid);
            if ym == 0.0 {
                return mid;
            }
            if ya * ym < 0.0 {
                b = mid;
            } else {
                a = mid;
                ya = ym;
            }
        }
        0.5 * (a + b)
    }

    /// Maximum over `[lo, hi]`: candidates are the domain start, the domain
    /// end and the critical points in between, and a later candidate only
    /// wins if it beats the best so far by more than 1e-9 relative.
    pub fn argmax(&self, lo: f64, hi: f64) -> (f64, f64) {
        let mut candidates = vec![lo, hi];
        candidates.extend(self.derivative().roots_in(lo, hi));

        let mut best = (lo, self.eval(lo));
        for x in candidates.into_iter().skip(1) {
            let y = self.eval(x);
            if y > best.1 + 1e-9 * best.1.abs().max(1.0) {
                best = (x, y);
            }
        }
        best
    }
}
