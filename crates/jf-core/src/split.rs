//! Train/validation split of the Training Pool.
//!
//! The pool is split in admission order. Small pools rarely have a positive
//! on both sides of a plain split, so the split is nudged to keep at least
//! one positive where the learner needs it.

use crate::verify::LabeledChange;
use jf_config::SplitConfig;

/// Result of splitting a pool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainValidSplit {
    pub train: Vec<LabeledChange>,
    pub valid: Vec<LabeledChange>,
    /// Which rule produced the split.
    pub rule: SplitRule,
}

/// Rule that decided the split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SplitRule {
    /// `floor(train_fraction * n)` records for training.
    #[default]
    Plain,
    /// Validation moved to start at the last positive.
    ValidationAtLastPositive,
    /// Training extended to include the only positive.
    TrainExtended,
    /// Single positive, no validation positive: both sides are the whole pool.
    WholePool,
}

fn positives(slice: &[LabeledChange]) -> usize {
    slice.iter().filter(|c| c.label).count()
}

/// Split `pool` into train and validation sets.
pub fn split_training_pool(pool: &[LabeledChange], config: &SplitConfig) -> TrainValidSplit {
    let n = pool.len();
    let mut train_size = ((config.train_fraction * n as f64).floor() as usize).min(n);
    let val_size = n - train_size;

    let total_pos = positives(pool);
    let train_pos = positives(&pool[..train_size]);
    let valid_pos = total_pos - train_pos;

    if total_pos >= 2 && valid_pos == 0 {
        let Some(last) = pool.iter().rposition(|c| c.label) else {
            return plain(pool, train_size);
        };
        let val_end = (last + val_size).min(n);
        let mut train = pool[..last].to_vec();
        train.extend_from_slice(&pool[val_end..]);
        return TrainValidSplit {
            train,
            valid: pool[last..val_end].to_vec(),
            rule: SplitRule::ValidationAtLastPositive,
        };
    }

    if total_pos == 1 && train_pos == 0 {
        if let Some(idx) = pool.iter().position(|c| c.label) {
            if idx >= train_size {
                train_size = idx + 1;
            }
        }
        let mut split = plain(pool, train_size);
        split.rule = SplitRule::TrainExtended;
        return split;
    }

    if total_pos == 1 && valid_pos == 0 && !config.eval_with_all_negative {
        return TrainValidSplit {
            train: pool.to_vec(),
            valid: pool.to_vec(),
            rule: SplitRule::WholePool,
        };
    }

    plain(pool, train_size)
}

fn plain(pool: &[LabeledChange], train_size: usize) -> TrainValidSplit {
    TrainValidSplit {
        train: pool[..train_size].to_vec(),
        valid: pool[train_size..].to_vec(),
        rule: SplitRule::Plain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jf_common::ChangeRecord;

    fn pool(labels: &[u8]) -> Vec<LabeledChange> {
        labels
            .iter()
            .enumerate()
            .map(|(i, l)| LabeledChange::new(ChangeRecord::new(format!("c{i}"), i as i64, None), *l == 1))
            .collect()
    }

    fn ids(changes: &[LabeledChange]) -> Vec<String> {
        changes.iter().map(|c| c.record.commit_id.to_string()).collect()
    }

    #[test]
    fn plain_split_uses_fraction() {
        let p = pool(&[1, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
        let split = split_training_pool(&p, &SplitConfig::default());
        assert_eq!(split.rule, SplitRule::Plain);
        assert_eq!(split.train.len(), 9);
        assert_eq!(ids(&split.valid), vec!["c9"]);
    }

    #[test]
    fn validation_moves_to_last_positive() {
        let p = pool(&[0, 1, 0, 0, 1, 0, 0, 0, 0, 0]);
        let split = split_training_pool(&p, &SplitConfig::default());
        assert_eq!(split.rule, SplitRule::ValidationAtLastPositive);
        assert_eq!(ids(&split.valid), vec!["c4"]);
        assert_eq!(split.train.len(), 9);
        assert!(!ids(&split.train).contains(&"c4".to_string()));
    }

    #[test]
    fn single_positive_in_validation_extends_train() {
        let p = pool(&[0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
        let split = split_training_pool(&p, &SplitConfig::default());
        assert_eq!(split.rule, SplitRule::TrainExtended);
        assert_eq!(split.train.len(), 10);
        assert!(split.valid.is_empty());
    }

    #[test]
    fn single_positive_in_train_uses_whole_pool() {
        let p = pool(&[1, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let split = split_training_pool(&p, &SplitConfig::default());
        assert_eq!(split.rule, SplitRule::WholePool);
        assert_eq!(split.train.len(), 10);
        assert_eq!(split.valid.len(), 10);
    }

    #[test]
    fn all_negative_validation_allowed_when_configured() {
        let p = pool(&[1, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let config = SplitConfig {
            eval_with_all_negative: true,
            ..Default::default()
        };
        let split = split_training_pool(&p, &config);
        assert_eq!(split.rule, SplitRule::Plain);
        assert_eq!(split.valid.len(), 1);
    }
}
