use ndarray::ArrayView2;
use precinct::forest::{ForestConfig, RandomForest};
use precinct::types::labels;
use precinct::{
    Classifier, Column, EnsembleCoordinator, EnsembleError, Execution, FeatureFrame, KeyColumn,
    Label, NoopPartitionProgress, PartitionKey, PartitionPredictions, SchemaMismatch, partition,
    reassemble, run_partitioned,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::convert::Infallible;
use std::sync::Mutex;

/// Labels every row with the integer value of its first feature.
struct EchoFirstFeature;

impl Classifier for EchoFirstFeature {
    type Error = Infallible;

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[Label]) -> Result<(), Infallible> {
        let _ = (x, y);
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<Label>, Infallible> {
        Ok(x.rows()
            .into_iter()
            .map(|row| Label::new(format!("{}", row[0] as i64)))
            .collect())
    }
}

/// Records the shape of every matrix it sees, then predicts its first training label.
struct ShapeRecorder<'a> {
    shapes: &'a Mutex<Vec<(usize, usize)>>,
    label: Option<Label>,
}

impl Classifier for ShapeRecorder<'_> {
    type Error = Infallible;

    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[Label]) -> Result<(), Infallible> {
        self.shapes.lock().unwrap().push(x.dim());
        self.label = y.first().cloned();
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<Label>, Infallible> {
        self.shapes.lock().unwrap().push(x.dim());
        let label = self.label.clone().unwrap_or_else(|| Label::from("none"));
        Ok(vec![label; x.nrows()])
    }
}

fn district_frame(districts: &[&str], features: Vec<Vec<f64>>) -> FeatureFrame {
    let mut columns = vec![("district".to_string(), Column::categorical(districts.to_vec()))];
    for (index, values) in features.into_iter().enumerate() {
        columns.push((format!("f{index}"), Column::numeric(values)));
    }
    FeatureFrame::new(columns).unwrap()
}

/// Synthetic incidents: `n` rows over `n_districts`, two features and four categories.
fn synthetic(n: usize, n_districts: usize, seed: u64) -> (FeatureFrame, Vec<Label>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let names: Vec<String> = (0..n_districts).map(|d| format!("D{d}")).collect();
    let mut districts = Vec::with_capacity(n);
    let mut a = Vec::with_capacity(n);
    let mut b = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    for i in 0..n {
        districts.push(names[i % n_districts].clone());
        let fa: f64 = rng.gen_range(0.0..10.0);
        let fb: f64 = rng.gen_range(0.0..10.0);
        a.push(fa);
        b.push(fb);
        let category = match (fa > 5.0, fb > 5.0) {
            (true, true) => "ASSAULT",
            (true, false) => "BURGLARY",
            (false, true) => "FRAUD",
            (false, false) => "VANDALISM",
        };
        y.push(Label::from(category));
    }
    let frame = FeatureFrame::new([
        ("district", Column::Categorical(districts)),
        ("a", Column::numeric(a)),
        ("b", Column::numeric(b)),
    ])
    .unwrap();
    (frame, y)
}

#[test]
fn predictions_follow_test_row_order_across_interleaved_partitions() {
    let x_train = district_frame(&["N", "S", "N", "E"], vec![vec![0.0, 0.0, 0.0, 0.0]]);
    let y_train = labels(["a", "b", "c", "d"]);
    let test_districts = ["S", "E", "N", "S", "N", "E", "E", "N"];
    let row_ids: Vec<f64> = (0..test_districts.len()).map(|i| i as f64).collect();
    let x_test = district_frame(&test_districts, vec![row_ids]);

    let predicted = run_partitioned(
        &x_train,
        &y_train,
        &x_test,
        &KeyColumn::name("district"),
        &|| EchoFirstFeature,
        &NoopPartitionProgress,
    )
    .unwrap();

    let expected: Vec<Label> = (0..test_districts.len())
        .map(|i| Label::new(i.to_string()))
        .collect();
    assert_eq!(predicted, expected);
}

#[test]
fn partitions_are_disjoint_and_cover_every_row() {
    let (x_train, y_train) = synthetic(90, 4, 3);
    let (x_test, _) = synthetic(41, 4, 4);
    let partitions = partition(&x_train, &y_train, &x_test, &KeyColumn::Index(0)).unwrap();

    assert_eq!(partitions.len(), 4);
    let train_total: usize = partitions.iter().map(|data| data.train_rows()).sum();
    assert_eq!(train_total, 90);

    let positions: Vec<usize> = partitions
        .iter()
        .flat_map(|data| data.test_row_positions.iter().copied())
        .collect();
    let distinct: BTreeSet<usize> = positions.iter().copied().collect();
    assert_eq!(positions.len(), 41);
    assert_eq!(distinct, (0..41).collect());
}

#[test]
fn models_never_see_the_key_column() {
    let x_train = district_frame(
        &["N", "N", "S"],
        vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
    );
    let x_test = district_frame(&["S", "N"], vec![vec![7.0, 8.0], vec![9.0, 1.0]]);
    let shapes = Mutex::new(Vec::new());

    let predicted = run_partitioned(
        &x_train,
        &labels(["x", "x", "y"]),
        &x_test,
        &KeyColumn::name("district"),
        &|| ShapeRecorder {
            shapes: &shapes,
            label: None,
        },
        &NoopPartitionProgress,
    )
    .unwrap();

    assert_eq!(predicted, labels(["y", "x"]));
    let mut seen = shapes.into_inner().unwrap();
    seen.sort();
    assert_eq!(seen, vec![(1, 2), (1, 2), (1, 2), (2, 2)]);
    assert_eq!(x_train.n_columns(), 3);
}

#[test]
fn forest_predictions_do_not_depend_on_scheduling() {
    let (x_train, y_train) = synthetic(400, 5, 21);
    let (x_test, _) = synthetic(120, 5, 22);
    let partitions = partition(&x_train, &y_train, &x_test, &KeyColumn::name("district")).unwrap();
    let factory = || RandomForest::new(ForestConfig::default().with_trees(12));

    let observer = NoopPartitionProgress;
    let parallel = EnsembleCoordinator::new(&observer)
        .predict(&partitions, &factory)
        .unwrap();
    let sequential = EnsembleCoordinator::new(&observer)
        .with_execution(Execution::Sequential)
        .predict(&partitions, &factory)
        .unwrap();
    let again = EnsembleCoordinator::new(&observer)
        .predict(&partitions, &factory)
        .unwrap();

    assert_eq!(parallel.len(), 120);
    assert_eq!(parallel, sequential);
    assert_eq!(parallel, again);
}

#[test]
fn one_call_pipeline_matches_explicit_partition_then_predict() {
    let (x_train, y_train) = synthetic(200, 3, 31);
    let (x_test, _) = synthetic(60, 3, 32);
    let key = KeyColumn::name("district");
    let factory = || RandomForest::new(ForestConfig::default().with_trees(6));

    let combined =
        run_partitioned(&x_train, &y_train, &x_test, &key, &factory, &NoopPartitionProgress)
            .unwrap();

    let partitions = partition(&x_train, &y_train, &x_test, &key).unwrap();
    let explicit = EnsembleCoordinator::new(&NoopPartitionProgress)
        .predict(&partitions, &factory)
        .unwrap();
    assert_eq!(combined, explicit);
}

#[test]
fn reassembly_is_reachable_from_the_crate_root() {
    let pieces = vec![
        PartitionPredictions {
            key: PartitionKey::from("S"),
            placements: vec![(2, Label::from("c")), (0, Label::from("a"))],
        },
        PartitionPredictions {
            key: PartitionKey::from("N"),
            placements: vec![(1, Label::from("b"))],
        },
    ];
    assert_eq!(reassemble(3, pieces).unwrap(), labels(["a", "b", "c"]));
}

#[test]
fn forest_recovers_a_learnable_rule_per_partition() {
    let (x_train, y_train) = synthetic(600, 3, 8);
    let (x_test, y_test) = synthetic(150, 3, 9);

    let predicted = run_partitioned(
        &x_train,
        &y_train,
        &x_test,
        &KeyColumn::name("district"),
        &|| RandomForest::new(ForestConfig::default().with_trees(20)),
        &NoopPartitionProgress,
    )
    .unwrap();

    let correct = predicted
        .iter()
        .zip(&y_test)
        .filter(|(predicted, actual)| predicted == actual)
        .count();
    assert!(correct >= 135, "only {correct} of 150 predictions were correct");
}

#[test]
fn unseen_test_key_fails_before_any_model_is_built() {
    let x_train = district_frame(&["N", "S"], vec![vec![1.0, 2.0]]);
    let x_test = district_frame(&["N", "W", "Q"], vec![vec![1.0, 2.0, 3.0]]);
    let shapes = Mutex::new(Vec::new());

    let err = run_partitioned(
        &x_train,
        &labels(["a", "b"]),
        &x_test,
        &KeyColumn::name("district"),
        &|| ShapeRecorder {
            shapes: &shapes,
            label: None,
        },
        &NoopPartitionProgress,
    )
    .unwrap_err();

    assert!(matches!(
        &err,
        EnsembleError::UnseenPartitionKey { key } if *key == PartitionKey::from("W")
    ));
    assert!(shapes.into_inner().unwrap().is_empty());
}

#[test]
fn schema_problems_are_reported_as_mismatches() {
    let x_train = district_frame(&["N"], vec![vec![1.0]]);
    let x_test = district_frame(&["N"], vec![vec![1.0]]);

    let err = partition(&x_train, &labels(["a"]), &x_test, &KeyColumn::name("precinct"))
        .unwrap_err();
    assert!(matches!(
        err,
        EnsembleError::SchemaMismatch(SchemaMismatch::KeyColumnMissing { .. })
    ));

    let err = partition(&x_train, &labels(["a", "b"]), &x_test, &KeyColumn::Index(0))
        .unwrap_err();
    assert!(matches!(
        err,
        EnsembleError::SchemaMismatch(SchemaMismatch::RowCountMismatch {
            features: 1,
            labels: 2
        })
    ));
}
