//! Probability estimates from pairwise decision values

/// Floor and ceiling applied to pairwise probabilities
pub(crate) const MIN_PROB: f64 = 1e-7;

/// Platt sigmoid 1 / (1 + exp(A*f + B)), evaluated without overflow
pub fn sigmoid_predict(decision_value: f64, a: f64, b: f64) -> f64 {
    let f_apb = decision_value * a + b;
    if f_apb >= 0.0 {
        (-f_apb).exp() / (1.0 + (-f_apb).exp())
    } else {
        1.0 / (1.0 + f_apb.exp())
    }
}

/// Couple pairwise probabilities `r[i][j] = P(i | i or j)` into per-class
/// probabilities `p` (Wu, Lin and Weng, method 2)
pub fn multiclass_probability(k: usize, r: &[Vec<f64>], p: &mut [f64]) {
    let max_iter = 100.max(k);
    let eps = 0.005 / k as f64;
    let mut q = vec![vec![0.0; k]; k];
    let mut qp = vec![0.0; k];

    for t in 0..k {
        p[t] = 1.0 / k as f64;
        q[t][t] = 0.0;
        for j in 0..t {
            q[t][t] += r[j][t] * r[j][t];
            q[t][j] = q[j][t];
        }
        for j in (t + 1)..k {
            q[t][t] += r[j][t] * r[j][t];
            q[t][j] = -r[j][t] * r[t][j];
        }
    }

    let mut iter = 0;
    while iter < max_iter {
        let mut pqp = 0.0;
        for t in 0..k {
            qp[t] = 0.0;
            for j in 0..k {
                qp[t] += q[t][j] * p[j];
            }
            pqp += p[t] * qp[t];
        }

        let mut max_error: f64 = 0.0;
        for t in 0..k {
            max_error = max_error.max((qp[t] - pqp).abs());
        }
        if max_error < eps {
            break;
        }

        for t in 0..k {
            let diff = (-qp[t] + pqp) / q[t][t];
            p[t] += diff;
            pqp = (pqp + diff * (diff * q[t][t] + 2.0 * qp[t])) / (1.0 + diff) / (1.0 + diff);
            for j in 0..k {
                qp[j] = (qp[j] + diff * q[t][j]) / (1.0 + diff);
                p[j] /= 1.0 + diff;
            }
        }
        iter += 1;
    }

    if iter >= max_iter {
        log::debug!("multiclass probability coupling stopped after {max_iter} iterations");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sigmoid_predict_symmetry() {
        assert_relative_eq!(sigmoid_predict(0.0, -1.0, 0.0), 0.5);
        let up = sigmoid_predict(2.0, -1.0, 0.0);
        let down = sigmoid_predict(-2.0, -1.0, 0.0);
        assert_relative_eq!(up + down, 1.0, epsilon = 1e-12);
        assert!(up > 0.5);
    }

    #[test]
    fn test_sigmoid_predict_extremes_do_not_overflow() {
        let high = sigmoid_predict(1e6, -1.0, 0.0);
        let low = sigmoid_predict(-1e6, -1.0, 0.0);
        assert!(high.is_finite() && low.is_finite());
        assert_relative_eq!(high, 1.0);
        assert_relative_eq!(low, 0.0);
    }

    #[test]
    fn test_multiclass_probability_uniform() {
        let r = vec![vec![0.5; 3]; 3];
        let mut p = vec![0.0; 3];
        multiclass_probability(3, &r, &mut p);
        for value in &p {
            assert_relative_eq!(*value, 1.0 / 3.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_multiclass_probability_sums_to_one() {
        let mut r = vec![vec![0.0; 3]; 3];
        let pairs = [(0, 1, 0.8), (0, 2, 0.9), (1, 2, 0.6)];
        for (i, j, value) in pairs {
            r[i][j] = value;
            r[j][i] = 1.0 - value;
        }
        let mut p = vec![0.0; 3];
        multiclass_probability(3, &r, &mut p);

        assert_relative_eq!(p.iter().sum::<f64>(), 1.0, epsilon = 1e-6);
        assert!(p[0] > p[1] && p[1] > p[2]);
    }
}
