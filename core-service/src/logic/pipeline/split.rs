//! Stratified train / validation split

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Split row indices so each class keeps its proportion in both halves.
///
/// Per class, `round(fraction * n)` shuffled indices go to validation, but
/// at least one example of every present class stays in training.
/// Both index lists are returned sorted.
pub fn stratified_split(labels: &[bool], validation_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let fraction = if validation_fraction.is_finite() {
        validation_fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };

    let mut train = Vec::with_capacity(labels.len());
    let mut val = Vec::new();

    for class in [false, true] {
        let mut idx: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, &y)| y == class)
            .map(|(i, _)| i)
            .collect();
        if idx.is_empty() {
            continue;
        }
        idx.shuffle(&mut rng);

        let n_val = ((fraction * idx.len() as f64).round() as usize).min(idx.len() - 1);
        val.extend_from_slice(&idx[..n_val]);
        train.extend_from_slice(&idx[n_val..]);
    }

    train.sort_unstable();
    val.sort_unstable();
    (train, val)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pos: usize, neg: usize) -> Vec<bool> {
        let mut y = vec![true; pos];
        y.extend(vec![false; neg]);
        y
    }

    #[test]
    fn test_proportions_per_class() {
        let y = labels(20, 80);
        let (train, val) = stratified_split(&y, 0.2, 42);

        assert_eq!(train.len() + val.len(), 100);
        assert_eq!(val.iter().filter(|&&i| y[i]).count(), 4);
        assert_eq!(val.iter().filter(|&&i| !y[i]).count(), 16);
    }

    #[test]
    fn test_disjoint_and_sorted() {
        let y = labels(7, 13);
        let (train, val) = stratified_split(&y, 0.3, 1);
        assert!(train.windows(2).all(|w| w[0] < w[1]));
        assert!(val.windows(2).all(|w| w[0] < w[1]));
        assert!(train.iter().all(|i| !val.contains(i)));
    }

    #[test]
    fn test_rare_class_keeps_a_training_example() {
        let y = labels(1, 9);
        let (train, val) = stratified_split(&y, 0.9, 3);
        assert!(train.iter().any(|&i| y[i]));
        assert!(val.iter().all(|&i| !y[i]));
    }

    #[test]
    fn test_zero_fraction_and_determinism() {
        let y = labels(5, 5);
        let (train, val) = stratified_split(&y, 0.0, 9);
        assert_eq!(train.len(), 10);
        assert!(val.is_empty());

        assert_eq!(stratified_split(&y, 0.4, 9), stratified_split(&y, 0.4, 9));
    }
}
