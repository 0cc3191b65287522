//! Stratified Partitioning
//!
//! Train/test split and k-fold assignment that preserve class balance.
//! Both are driven by a caller-seeded RNG so runs are reproducible.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Indices per class, shuffled.
fn shuffled_by_class(labels: &[u8], rng: &mut StdRng) -> (Vec<usize>, Vec<usize>) {
    let mut negatives: Vec<usize> = Vec::new();
    let mut positives: Vec<usize> = Vec::new();
    for (index, &label) in labels.iter().enumerate() {
        if label == 1 {
            positives.push(index);
        } else {
            negatives.push(index);
        }
    }
    negatives.shuffle(rng);
    positives.shuffle(rng);
    (negatives, positives)
}

/// Stratified train/test split. Each class contributes `test_size` of its
/// members to the test partition (at least one of each when the class has
/// two or more members).
pub fn stratified_split(
    labels: &[u8],
    test_size: f32,
    rng: &mut StdRng,
) -> (Vec<usize>, Vec<usize>) {
    let (negatives, positives) = shuffled_by_class(labels, rng);

    let mut train = Vec::new();
    let mut test = Vec::new();
    for class in [negatives, positives] {
        let count = class.len();
        if count == 0 {
            continue;
        }
        let mut n_test = (count as f32 * test_size).round() as usize;
        if count >= 2 {
            n_test = n_test.clamp(1, count - 1);
        } else {
            n_test = 0;
        }
        test.extend_from_slice(&class[..n_test]);
        train.extend_from_slice(&class[n_test..]);
    }
    (train, test)
}

/// Stratified k-fold assignment: each class is dealt round-robin across
/// folds. Returns `(train_indices, validation_indices)` per fold.
pub fn stratified_kfold(
    labels: &[u8],
    k: usize,
    rng: &mut StdRng,
) -> Vec<(Vec<usize>, Vec<usize>)> {
    let (negatives, positives) = shuffled_by_class(labels, rng);

    let mut fold_of = vec![0usize; labels.len()];
    for class in [&negatives, &positives] {
        for (position, &index) in class.iter().enumerate() {
            fold_of[index] = position % k;
        }
    }

    (0..k)
        .map(|fold| {
            let mut train = Vec::new();
            let mut validation = Vec::new();
            for index in 0..labels.len() {
                if fold_of[index] == fold {
                    validation.push(index);
                } else {
                    train.push(index);
                }
            }
            (train, validation)
        })
        .collect()
}
