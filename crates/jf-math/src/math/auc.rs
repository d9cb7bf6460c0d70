//! Rank-based ROC-AUC (Mann-Whitney U) with averaged ranks for ties.

/// Area under the ROC curve of `scores` against binary `labels`.
///
/// Returns `None` when lengths differ, the input is empty, a score is NaN,
/// or only one class is present.
pub fn roc_auc(labels: &[bool], scores: &[f64]) -> Option<f64> {
    if labels.len() != scores.len() || labels.is_empty() || scores.iter().any(|s| s.is_nan()) {
        return None;
    }
    let n_pos = labels.iter().filter(|&&l| l).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // 1-based ranks, ties share the mean of their positions
    let mut rank_sum_pos = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i + 1;
        while j < order.len() && scores[order[j]] == scores[order[i]] {
            j += 1;
        }
        let avg_rank = (i + 1 + j) as f64 / 2.0;
        for &idx in &order[i..j] {
            if labels[idx] {
                rank_sum_pos += avg_rank;
            }
        }
        i = j;
    }

    let n_pos_f = n_pos as f64;
    let u = rank_sum_pos - n_pos_f * (n_pos_f + 1.0) / 2.0;
    Some(u / (n_pos_f * n_neg as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_separation() {
        let labels = [false, false, true, true];
        let scores = [0.1, 0.2, 0.8, 0.9];
        assert_eq!(roc_auc(&labels, &scores), Some(1.0));
    }

    #[test]
    fn inverted_separation() {
        let labels = [true, true, false, false];
        let scores = [0.1, 0.2, 0.8, 0.9];
        assert_eq!(roc_auc(&labels, &scores), Some(0.0));
    }

    #[test]
    fn ties_count_half() {
        let labels = [true, false];
        let scores = [0.5, 0.5];
        assert_eq!(roc_auc(&labels, &scores), Some(0.5));
    }

    #[test]
    fn textbook_example() {
        // sklearn: roc_auc_score([0, 0, 1, 1], [0.1, 0.4, 0.35, 0.8]) == 0.75
        let labels = [false, false, true, true];
        let scores = [0.1, 0.4, 0.35, 0.8];
        let auc = roc_auc(&labels, &scores).unwrap();
        assert!((auc - 0.75).abs() < 1e-12);
    }

    #[test]
    fn single_class_is_undefined() {
        assert_eq!(roc_auc(&[false, false], &[0.1, 0.2]), None);
        assert_eq!(roc_auc(&[], &[]), None);
        assert_eq!(roc_auc(&[true], &[0.1, 0.2]), None);
    }
}
