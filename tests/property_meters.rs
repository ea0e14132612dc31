use approx::assert_abs_diff_eq;
use medidor::meters::{
    percentage, Average, BatchMeter, BatchMetric, BatchResult, CategoricalAccuracy,
    ConfusionMatrix, Meter, NrClasses,
};
use medidor::{Error, Result, Tensor};
use ndarray::{array, Array2};
use proptest::collection::vec;
use proptest::prelude::*;

/// Mean of the float predictions, ignoring targets
struct MeanValue;

impl BatchMetric for MeanValue {
    fn get_result(&self, predictions: &Tensor, _targets: &Tensor) -> Result<BatchResult> {
        Ok(BatchResult::from_values(&predictions.to_f64_vec()))
    }

    fn name(&self) -> &str {
        "mean"
    }
}

fn measure_values<A>(meter: &mut BatchMeter<MeanValue, A>, values: &[f64], batch_size: usize)
where
    BatchMeter<MeanValue, A>: Meter<Value = f64>,
    A: medidor::meters::Aggregator,
{
    meter.reset();
    for chunk in values.chunks(batch_size) {
        let preds = Tensor::from_vec(chunk.iter().map(|&v| v as f32).collect());
        let targets = Tensor::from_indices(vec![0; chunk.len()]);
        meter.measure(&preds, &targets).unwrap();
    }
}

fn indices(labels: &[i64]) -> Tensor {
    Tensor::from_indices(labels.to_vec())
}

// =============================================================================
// Aggregation
// =============================================================================

#[test]
fn average_of_one_batch_equals_singletons() {
    let values = [1.0, 2.0, 3.0, 4.0];

    let mut whole = BatchMeter::new(MeanValue);
    measure_values(&mut whole, &values, 4);
    let mut singles = BatchMeter::new(MeanValue);
    measure_values(&mut singles, &values, 1);

    assert_eq!(whole.value().unwrap(), 2.5);
    assert_eq!(singles.value().unwrap(), 2.5);
}

#[test]
fn fresh_meters_have_no_value() {
    let mut acc = BatchMeter::new(CategoricalAccuracy);
    acc.reset();
    assert!(matches!(acc.value(), Err(Error::ZeroMeasurements)));

    let mut pct = BatchMeter::with_aggregator(CategoricalAccuracy, percentage(Average));
    pct.reset();
    assert!(matches!(pct.value(), Err(Error::ZeroMeasurements)));
}

#[test]
fn reset_discards_previous_batches() {
    let mut acc = BatchMeter::new(CategoricalAccuracy);
    acc.measure(&indices(&[0, 0]), &indices(&[1, 1])).unwrap();
    acc.reset();
    acc.measure(&indices(&[1]), &indices(&[1])).unwrap();
    assert_eq!(acc.value().unwrap(), 1.0);
}

// =============================================================================
// Confusion matrix
// =============================================================================

#[test]
fn resizable_matrix_keeps_counts_in_place() {
    let mut cm = ConfusionMatrix::auto();
    cm.measure(&indices(&[0, 1]), &indices(&[1, 1])).unwrap();
    let before = cm.value().unwrap();

    cm.measure(&indices(&[3, 4]), &indices(&[4, 3])).unwrap();
    let after = cm.value().unwrap();

    assert_eq!(after.dim(), (5, 5));
    assert_eq!(after.slice(ndarray::s![..2, ..2]), before);
    assert_eq!(after[[4, 3]], 1.0);
    assert_eq!(after[[3, 4]], 1.0);
    assert_eq!(after.sum(), 4.0);
}

#[test]
fn fixed_matrix_rejects_out_of_range_without_mutation() {
    let mut cm = ConfusionMatrix::new(NrClasses::Fixed(3), false).unwrap();
    cm.measure(&indices(&[0, 1, 2]), &indices(&[0, 1, 2])).unwrap();
    assert_eq!(cm.value().unwrap(), Array2::<f64>::eye(3));

    let err = cm.measure(&indices(&[0, 4]), &indices(&[0, 1])).unwrap_err();
    assert!(matches!(err, Error::InvalidLabels { label: 4, nr_classes: 3 }));
    assert_eq!(cm.value().unwrap(), Array2::<f64>::eye(3));
}

#[test]
fn scores_reduce_to_the_same_matrix_as_indices() {
    let scores = array![[0.7f32, 0.2, 0.1], [0.1, 0.1, 0.8], [0.3, 0.6, 0.1], [0.5, 0.4, 0.1]];
    let targets = indices(&[0, 2, 2, 1]);

    let mut from_scores = ConfusionMatrix::new(NrClasses::Fixed(3), false).unwrap();
    from_scores
        .measure(&Tensor::from_scores(scores), &targets)
        .unwrap();
    let mut from_indices = ConfusionMatrix::new(NrClasses::Fixed(3), false).unwrap();
    from_indices
        .measure(&indices(&[0, 2, 1, 0]), &targets)
        .unwrap();

    assert_eq!(from_scores.value().unwrap(), from_indices.value().unwrap());
}

#[test]
fn normalized_columns_sum_to_one() {
    let mut cm = ConfusionMatrix::new(NrClasses::Fixed(2), true).unwrap();
    // counts [[2, 0], [1, 1]]
    cm.measure(&indices(&[0, 0, 0, 1]), &indices(&[0, 0, 1, 1]))
        .unwrap();

    let m = cm.value().unwrap();
    assert_abs_diff_eq!(m[[0, 0]], 2.0 / 3.0, epsilon = 1e-12);
    assert_abs_diff_eq!(m[[1, 0]], 1.0 / 3.0, epsilon = 1e-12);
    assert_abs_diff_eq!(m[[0, 1]], 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(m[[1, 1]], 1.0, epsilon = 1e-12);
}

#[test]
fn nr_classes_from_yaml() {
    let auto: NrClasses = serde_yaml::from_str("auto").unwrap();
    let fixed: NrClasses = serde_yaml::from_str("7").unwrap();
    assert_eq!(auto, NrClasses::Auto);
    assert_eq!(fixed, NrClasses::Fixed(7));
    assert!(serde_yaml::from_str::<NrClasses>("0").is_err());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_average_ignores_grouping(
        values in vec(-1000.0f64..1000.0, 1..64),
        batch_size in 1usize..16,
    ) {
        // f32 tensors carry the values, so compare against their f32 rounding
        let rounded: Vec<f64> = values.iter().map(|&v| v as f32 as f64).collect();
        let expected = rounded.iter().sum::<f64>() / rounded.len() as f64;

        let mut meter = BatchMeter::new(MeanValue);
        measure_values(&mut meter, &values, batch_size);
        prop_assert!((meter.value().unwrap() - expected).abs() < 1e-6);
    }

    #[test]
    fn prop_percentage_is_hundredfold(
        pairs in vec((0i64..4, 0i64..4), 1..64),
        batch_size in 1usize..16,
    ) {
        let mut plain = BatchMeter::new(CategoricalAccuracy);
        let mut pct = BatchMeter::with_aggregator(CategoricalAccuracy, percentage(Average));
        for chunk in pairs.chunks(batch_size) {
            let (p, t): (Vec<i64>, Vec<i64>) = chunk.iter().copied().unzip();
            plain.measure(&indices(&p), &indices(&t)).unwrap();
            pct.measure(&indices(&p), &indices(&t)).unwrap();
        }
        prop_assert!((pct.value().unwrap() - 100.0 * plain.value().unwrap()).abs() < 1e-9);
    }

    #[test]
    fn prop_length_mismatch_never_mutates(
        preds in vec(0i64..5, 0..10),
        targets in vec(0i64..5, 0..10),
    ) {
        prop_assume!(preds.len() != targets.len());

        let mut cm = ConfusionMatrix::new(NrClasses::Fixed(5), false).unwrap();
        let err = cm.measure(&indices(&preds), &indices(&targets)).unwrap_err();
        let is_lengths = matches!(err, Error::InvalidLengths { .. });
        prop_assert!(is_lengths);
        prop_assert_eq!(cm.value().unwrap().sum(), 0.0);

        let mut auto = ConfusionMatrix::auto();
        prop_assert!(auto.measure(&indices(&preds), &indices(&targets)).is_err());
        prop_assert_eq!(auto.nr_classes(), 1);
    }

    #[test]
    fn prop_matrix_total_counts_samples(
        pairs in vec((0i64..6, 0i64..6), 0..100),
        batch_size in 1usize..20,
    ) {
        let mut cm = ConfusionMatrix::auto();
        for chunk in pairs.chunks(batch_size) {
            let (p, t): (Vec<i64>, Vec<i64>) = chunk.iter().copied().unzip();
            cm.measure(&indices(&p), &indices(&t)).unwrap();
        }
        let m = cm.value().unwrap();
        prop_assert_eq!(m.sum() as usize, pairs.len());
        for &(p, t) in &pairs {
            prop_assert!(m[[t as usize, p as usize]] >= 1.0);
        }
    }
}
