use chrono::NaiveDate;

use crate::features::{FeatureRow, N_FEATURES};

/// The dataset partitioned at a cutoff date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Split {
    /// Rows dated strictly before the cutoff.
    pub training: Vec<FeatureRow>,
    /// Rows dated on or after the cutoff.
    pub testing: Vec<FeatureRow>,
}

impl Split {
    /// Feature matrix and label vector of the training rows.
    pub fn training_xy(&self) -> (Vec<[f64; N_FEATURES]>, Vec<f64>) {
        self.training.iter().map(|r| (r.features(), r.label)).unzip()
    }
}

/// Partitions `rows` at `cutoff`, keeping the original row order in each half.
pub fn split_by_date(rows: Vec<FeatureRow>, cutoff: NaiveDate) -> Split {
    let (training, testing) = rows.into_iter().partition(|row| row.date < cutoff);
    Split { training, testing }
}

#[cfg(test)]
mod tests {
    use chrono::Days;
    use proptest::prelude::*;

    use super::*;

    fn row(symbol: &str, date: NaiveDate) -> FeatureRow {
        FeatureRow {
            symbol: symbol.to_string(),
            date,
            adj_close: 1.0,
            ma_10: 1.0,
            ma_20: 1.0,
            ma_50: 1.0,
            label: 1.0,
        }
    }

    fn base() -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 12, 1).unwrap()
    }

    #[test]
    fn cutoff_day_belongs_to_testing() {
        let cutoff = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let rows = vec![
            row("AAPL", cutoff - Days::new(1)),
            row("AAPL", cutoff),
            row("AAPL", cutoff + Days::new(1)),
        ];
        let split = split_by_date(rows, cutoff);
        assert_eq!(split.training.len(), 1);
        assert_eq!(split.testing.len(), 2);
        assert_eq!(split.testing[0].date, cutoff);
    }

    #[test]
    fn training_xy_lines_up_features_and_labels() {
        let mut r = row("AAPL", base());
        r.adj_close = 2.0;
        r.label = 3.0;
        let split = split_by_date(vec![r], base() + Days::new(1));
        let (x, y) = split.training_xy();
        assert_eq!(x, vec![[2.0, 1.0, 1.0, 1.0]]);
        assert_eq!(y, vec![3.0]);
    }

    proptest! {
        #[test]
        fn split_partitions_dataset(
            offsets in prop::collection::vec(0u64..120, 0..80),
            cutoff_offset in 0u64..120,
        ) {
            let rows: Vec<FeatureRow> = offsets
                .iter()
                .enumerate()
                .map(|(i, &o)| row(if i % 2 == 0 { "AAPL" } else { "GOOG" }, base() + Days::new(o)))
                .collect();
            let cutoff = base() + Days::new(cutoff_offset);

            let split = split_by_date(rows.clone(), cutoff);

            prop_assert!(split.training.iter().all(|r| r.date < cutoff));
            prop_assert!(split.testing.iter().all(|r| r.date >= cutoff));
            prop_assert_eq!(split.training.len() + split.testing.len(), rows.len());

            let expected_training: Vec<FeatureRow> =
                rows.iter().filter(|r| r.date < cutoff).cloned().collect();
            prop_assert_eq!(&split.training, &expected_training);
        }
    }
}
