//! Dense input to sparse node list conversion

use crate::core::SvmNode;
use ndarray::ArrayView1;

/// Fill `cache` with the normalized, sparse form of `input`
///
/// Each of the first `dims` features becomes `(input[k] - sub[k]) / div[k]`;
/// exact zeros are left out, the rest are stored with their 1-based index and
/// the list is closed with the sentinel node. `cache` must hold at least
/// `dims + 1` nodes and `input`, `sub`, `div` at least `dims` values.
///
/// Returns the number of nodes written before the sentinel.
pub fn normalize(
    input: ArrayView1<f64>,
    dims: usize,
    sub: &[f64],
    div: &[f64],
    cache: &mut [SvmNode],
) -> usize {
    let mut cur = 0;
    for k in 0..dims {
        let value = (input[k] - sub[k]) / div[k];
        if value == 0.0 {
            continue;
        }
        cache[cur] = SvmNode::new(k as i32 + 1, value);
        cur += 1;
    }
    cache[cur] = SvmNode::SENTINEL;
    cur
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_identity_normalization_drops_zeros() {
        let input = array![0.0, 2.5, 0.0, -1.0];
        let mut cache = vec![SvmNode::SENTINEL; 5];
        let n = normalize(input.view(), 4, &[0.0; 4], &[1.0; 4], &mut cache);

        assert_eq!(n, 2);
        assert_eq!(cache[0], SvmNode::new(2, 2.5));
        assert_eq!(cache[1], SvmNode::new(4, -1.0));
        assert!(cache[2].is_sentinel());
    }

    #[test]
    fn test_subtract_and_divide() {
        let input = array![3.0, 4.0, 10.0];
        let mut cache = vec![SvmNode::SENTINEL; 4];
        let n = normalize(
            input.view(),
            3,
            &[1.0, 4.0, 0.0],
            &[2.0, 1.0, 4.0],
            &mut cache,
        );

        assert_eq!(n, 2);
        assert_eq!(cache[0], SvmNode::new(1, 1.0));
        assert_eq!(cache[1], SvmNode::new(3, 2.5));
        assert!(cache[2].is_sentinel());
    }

    #[test]
    fn test_length_bound_and_sentinel() {
        let input = array![1.0, 2.0, 3.0];
        let mut cache = vec![SvmNode::new(99, 99.0); 4];
        let n = normalize(input.view(), 3, &[0.0; 3], &[1.0; 3], &mut cache);
        assert_eq!(n, 3);
        assert!(cache[3].is_sentinel());

        let zeros = array![0.0, 0.0, 0.0];
        let n = normalize(zeros.view(), 3, &[0.0; 3], &[1.0; 3], &mut cache);
        assert_eq!(n, 0);
        assert!(cache[0].is_sentinel());
    }

    #[test]
    fn test_extra_input_is_ignored() {
        let input = array![1.0, 1.0, 7.0, 8.0];
        let mut cache = vec![SvmNode::SENTINEL; 3];
        let n = normalize(input.view(), 2, &[0.0; 4], &[1.0; 4], &mut cache);
        assert_eq!(n, 2);
        assert!(cache[2].is_sentinel());
    }

    #[test]
    fn test_zero_divisor_propagates() {
        let input = array![1.0, 0.0];
        let mut cache = vec![SvmNode::SENTINEL; 3];
        let n = normalize(input.view(), 2, &[0.0; 2], &[0.0; 2], &mut cache);

        // 1/0 is kept as +inf, 0/0 is NaN and also kept
        assert_eq!(n, 2);
        assert!(cache[0].value.is_infinite());
        assert!(cache[1].value.is_nan());
    }
}
