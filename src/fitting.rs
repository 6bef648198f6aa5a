//! Trend models over the measured `(n, WC(n))` series.
//!
//! Each model is fitted by ordinary least squares over a transformed basis:
//! polynomials directly, the power and exponential models through a log
//! transform of `y`, the logarithmic and `n·log n` models through transformed
//! regressors. The fit reports R² in the original `y` space so models remain
//! comparable.
//!
//! Models whose domain excludes part of the series (logarithms of
//! non-positive sizes, exponentials of non-positive costs) are fitted on the
//! usable points and skipped entirely when too few remain.

use std::fmt;

/// The shape of a fitted trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// `c0 + c1·n + … + ck·n^k`
    Poly(usize),
    /// `c0 + c1·ln n`
    Log,
    /// `a·n^b`
    Power,
    /// `a·e^(b·n)`
    Exp,
    /// `c0 + c1·n·ln n`
    NLogN,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Poly(degree) => write!(f, "poly({})", degree),
            ModelKind::Log => write!(f, "log"),
            ModelKind::Power => write!(f, "power"),
            ModelKind::Exp => write!(f, "exp"),
            ModelKind::NLogN => write!(f, "nlogn"),
        }
    }
}

/// A fitted trend model.
#[derive(Debug, Clone)]
pub struct TrendFit {
    pub kind: ModelKind,
    /// Coefficients in the transformed (linear) space.
    coeffs: Vec<f64>,
    pub r_squared: f64,
}

impl TrendFit {
    /// Evaluates the model at `x`. Returns `NaN` outside the model's domain
    /// (e.g. `log` at `x <= 0`); callers sampling curves skip those points.
    pub fn predict(&self, x: f64) -> f64 {
        match self.kind {
            ModelKind::Poly(_) => horner(&self.coeffs, x),
            ModelKind::Log => {
                if x <= 0.0 {
                    f64::NAN
                } else {
                    self.coeffs[0] + self.coeffs[1] * x.ln()
                }
            }
            ModelKind::Power => {
                if x <= 0.0 {
                    f64::NAN
                } else {
                    (self.coeffs[0] + self.coeffs[1] * x.ln()).exp()
                }
            }
            ModelKind::Exp => (self.coeffs[0] + self.coeffs[1] * x).exp(),
            ModelKind::NLogN => self.coeffs[0] + self.coeffs[1] * n_log_n(x),
        }
    }
}

fn horner(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

/// `x·ln x`, extended with 0 at the origin so size-0 points stay usable.
fn n_log_n(x: f64) -> f64 {
    if x <= 0.0 {
        0.0
    } else {
        x * x.ln()
    }
}

/// Solves `a · x = b` by Gaussian elimination with partial pivoting.
/// Returns `None` for (near-)singular systems.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut sum = b[row];
        for col in (row + 1)..n {
            sum -= a[row][col] * x[col];
        }
        x[row] = sum / a[row][row];
    }
    Some(x)
}

/// Least squares of `t(y)` against `basis(x)`, with R² computed back in the
/// original `y` space. `None` when too few usable points remain or the
/// normal equations are singular.
fn ols(
    points: &[(f64, f64)],
    basis: impl Fn(f64) -> Option<Vec<f64>>,
    log_y: bool,
    untransform: impl Fn(f64) -> f64,
) -> Option<(Vec<f64>, f64)> {
    let mut rows: Vec<(Vec<f64>, f64, f64)> = Vec::new();
    for &(x, y) in points {
        let Some(row) = basis(x) else { continue };
        let target = if log_y {
            if y <= 0.0 {
                continue;
            }
            y.ln()
        } else {
            y
        };
        rows.push((row, target, y));
    }

    let dim = rows.first().map(|(row, _, _)| row.len())?;
    if rows.len() < dim {
        return None;
    }

    let mut ata = vec![vec![0.0; dim]; dim];
    let mut atb = vec![0.0; dim];
    for (row, target, _) in &rows {
        for i in 0..dim {
            for j in 0..dim {
                ata[i][j] += row[i] * row[j];
            }
            atb[i] += row[i] * target;
        }
    }
    let coeffs = solve(ata, atb)?;

    let mean = rows.iter().map(|(_, _, y)| y).sum::<f64>() / rows.len() as f64;
    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (row, _, y) in &rows {
        let linear: f64 = row.iter().zip(&coeffs).map(|(b, c)| b * c).sum();
        let predicted = untransform(linear);
        ss_res += (y - predicted).powi(2);
        ss_tot += (y - mean).powi(2);
    }
    let r_squared = if ss_tot == 0.0 {
        if ss_res.abs() < 1e-9 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    };
    Some((coeffs, r_squared))
}

fn fit_one(points: &[(f64, f64)], kind: ModelKind) -> Option<TrendFit> {
    let identity = |t: f64| t;
    let expo = |t: f64| t.exp();
    let result = match kind {
        ModelKind::Poly(degree) => ols(
            points,
            |x| Some((0..=degree).map(|k| x.powi(k as i32)).collect()),
            false,
            identity,
        ),
        ModelKind::Log => ols(
            points,
            |x| if x > 0.0 { Some(vec![1.0, x.ln()]) } else { None },
            false,
            identity,
        ),
        ModelKind::Power => ols(
            points,
            |x| if x > 0.0 { Some(vec![1.0, x.ln()]) } else { None },
            true,
            expo,
        ),
        ModelKind::Exp => ols(points, |x| Some(vec![1.0, x]), true, expo),
        ModelKind::NLogN => ols(points, |x| Some(vec![1.0, n_log_n(x)]), false, identity),
    };
    result.map(|(coeffs, r_squared)| TrendFit { kind, coeffs, r_squared })
}

/// Fits every trend model to the series, skipping the ones that cannot be
/// fitted (domain too small, singular system).
pub fn fit_all(points: &[(f64, f64)], poly_degree: usize) -> Vec<TrendFit> {
    let kinds = [
        ModelKind::Poly(poly_degree),
        ModelKind::Log,
        ModelKind::Power,
        ModelKind::Exp,
        ModelKind::NLogN,
    ];
    kinds.iter().filter_map(|&kind| fit_one(points, kind)).collect()
}

/// The fitted model with the highest R².
pub fn best_fit(fits: &[TrendFit]) -> Option<&TrendFit> {
    fits.iter().max_by(|a, b| a.r_squared.total_cmp(&b.r_squared))
}
