use ndarray::Array1;

/// Numerically stable softmax. Non-finite logits yield `None`.
pub(crate) fn softmax(logits: &Array1<f32>) -> Option<Array1<f32>> {
    if logits.is_empty() || logits.iter().any(|x| !x.is_finite()) {
        return None;
    }
    let max = logits.fold(f32::NEG_INFINITY, |acc, &x| acc.max(x));
    let exp = logits.mapv(|x| (x - max).exp());
    let sum = exp.sum();
    Some(exp / sum)
}

/// Index and value of the largest element; the first one wins ties.
pub(crate) fn argmax(values: &Array1<f32>) -> Option<(usize, f32)> {
    values.iter().copied().enumerate().fold(None, |best, (i, v)| match best {
        Some((_, b)) if b >= v => best,
        _ => Some((i, v)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&array![1.0, 2.0, 3.0]).unwrap();
        assert!((probs.sum() - 1.0).abs() < 1e-6);
        assert!(probs.iter().all(|&p| (0.0..=1.0).contains(&p)));
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_softmax_large_logits() {
        let probs = softmax(&array![1000.0, 1000.0]).unwrap();
        assert!((probs[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_softmax_rejects_nan() {
        assert!(softmax(&array![f32::NAN, 1.0]).is_none());
        assert!(softmax(&Array1::zeros(0)).is_none());
    }

    #[test]
    fn test_argmax_first_wins_ties() {
        assert_eq!(argmax(&array![0.2, 0.4, 0.4]), Some((1, 0.4)));
        assert_eq!(argmax(&Array1::zeros(0)), None);
    }
}
