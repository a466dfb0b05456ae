//! Integration test: behavioural guarantees of the search engines

use ndarray::{Array1, Array2};
use regsearch::data::Split;
use regsearch::metrics::{adjusted_r_squared, r_squared};
use regsearch::prelude::*;
use regsearch::training::KNNRegressor;

fn line(n: usize) -> Dataset {
    let x = Array2::from_shape_fn((n, 1), |(i, _)| i as f64);
    let y = Array1::from_shape_fn(n, |i| 2.0 * i as f64);
    Dataset::new(vec!["x".into()], x, y).unwrap()
}

/// `y = 2a + 0.5e` where `z` is orthogonal to the intercept, `a` and `e`,
/// so adding `z` leaves R² unchanged and must lower adjusted R²
fn orthogonal_extra() -> Split {
    let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
    let e = [1.0, -1.0, -1.0, 1.0, 1.0, -1.0, -1.0, 1.0];
    let z = [1.0, -1.0, 1.0, -1.0, -1.0, 1.0, -1.0, 1.0];

    let x = Array2::from_shape_fn((8, 2), |(i, j)| if j == 0 { a[i] } else { z[i] });
    let y = Array1::from_shape_fn(8, |i| 2.0 * a[i] + 0.5 * e[i]);
    let ds = Dataset::new(vec!["a".into(), "z".into()], x, y).unwrap();

    Split {
        train: ds.clone(),
        test: ds,
        train_indices: (0..8).collect(),
        test_indices: (0..8).collect(),
    }
}

#[test]
fn test_partition_covers_every_row_once() {
    for (n, fraction, seed) in [(10, 0.3, 1), (37, 0.25, 42), (100, 0.3, 7), (5, 0.5, 0)] {
        let s = split(&line(n), fraction, seed).unwrap();
        let mut all: Vec<usize> = s
            .train_indices
            .iter()
            .chain(s.test_indices.iter())
            .copied()
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..n).collect::<Vec<_>>(), "n={} fraction={}", n, fraction);
        assert_eq!(s.train.n_samples() + s.test.n_samples(), n);
    }
}

#[test]
fn test_split_depends_only_on_seed() {
    let ds = line(60);
    let a = split(&ds, 0.3, 99).unwrap();
    let b = split(&ds, 0.3, 99).unwrap();
    assert_eq!(a.train_indices, b.train_indices);
    assert_eq!(a.test_indices, b.test_indices);
    assert_eq!(a.test, b.test);
}

#[test]
fn test_score_matches_hand_computation() {
    let mse = score(&Array1::from(vec![1.0, 2.0, 3.0]), &Array1::from(vec![1.0, 2.0, 5.0])).unwrap();
    assert!((mse - 4.0 / 3.0).abs() < 1e-12);
}

#[test]
fn test_r2_never_decreases_along_trajectory() {
    let ds = LinearSpec::housing().generate(120, 3).unwrap();
    let s = split(&ds, 0.3, 3).unwrap();
    let fitter = NormalEquationFitter::new();
    let outcome = ForwardSelection::new(&fitter).run(&s, &CancelToken::new()).unwrap();

    let steps = outcome.trajectory.steps();
    assert_eq!(steps.len(), ds.n_predictors());
    for pair in steps.windows(2) {
        assert!(pair[1].fit.r2 >= pair[0].fit.r2 - 1e-12);
        assert_eq!(pair[1].formula.len(), pair[0].formula.len() + 1);
    }
}

#[test]
fn test_adjusted_r2_picks_interior_round() {
    let s = orthogonal_extra();
    let fitter = NormalEquationFitter::new();
    let outcome = ForwardSelection::new(&fitter).run(&s, &CancelToken::new()).unwrap();

    let steps = outcome.trajectory.steps();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].added, "a");
    assert_eq!(steps[1].added, "z");
    assert!((steps[1].fit.r2 - steps[0].fit.r2).abs() < 1e-9);
    assert!(steps[1].fit.adjusted_r2 < steps[0].fit.adjusted_r2);

    let best = outcome.best.unwrap();
    assert_eq!(best.round, 1);
    assert_eq!(best.formula, Formula::from_names(["a"]).unwrap());
}

#[test]
fn test_adjusted_r2_formula() {
    let r2 = r_squared(&Array1::from(vec![1.0, 2.0, 3.0, 4.0]), &Array1::from(vec![1.0, 2.0, 3.0, 5.0])).unwrap();
    let adj = adjusted_r_squared(r2, 4, 1).unwrap();
    assert!((adj - (1.0 - (1.0 - r2) * 3.0 / 2.0)).abs() < 1e-12);
    assert!(adjusted_r_squared(0.9, 3, 2).is_err());
}

#[test]
fn test_single_neighbor_error_is_gap_to_nearest_target() {
    let ds = line(20);
    let s = split(&ds, 0.25, 5).unwrap();
    let formula = Formula::from_names(["x"]).unwrap();

    let outcome = NeighborSweep::new(Grid::new(vec![1]))
        .run(&s, &formula, &CancelToken::new())
        .unwrap();

    let train_x = s.train.features().column(0).to_owned();
    let train_y = s.train.target();
    let expected: f64 = s
        .test
        .features()
        .column(0)
        .iter()
        .zip(s.test.target().iter())
        .map(|(&xt, &yt)| {
            let nearest = (0..train_x.len())
                .min_by(|&i, &j| {
                    (train_x[i] - xt)
                        .abs()
                        .partial_cmp(&(train_x[j] - xt).abs())
                        .unwrap()
                })
                .unwrap();
            (yt - train_y[nearest]).powi(2)
        })
        .sum::<f64>()
        / s.test.n_samples() as f64;

    let best = outcome.best.unwrap();
    assert_eq!(best.value, 1);
    assert!((best.mse - expected).abs() < 1e-12);
}

#[test]
fn test_knn_with_all_neighbors_predicts_training_mean() {
    let ds = line(10);
    let mut knn = KNNRegressor::with_k(10);
    knn.fit(ds.features(), ds.target()).unwrap();
    let predictions = knn.predict(&Array2::from_elem((2, 1), 100.0)).unwrap();
    assert!(predictions.iter().all(|p| (p - 9.0).abs() < 1e-12));
}

#[test]
fn test_ridge_refinement_stays_inside_bracket() {
    let ds = LinearSpec::housing().generate(150, 8).unwrap();
    let (scaled, _) = split(&ds, 0.3, 8)
        .unwrap()
        .standardize(ScalingPolicy::TrainStatistics)
        .unwrap();
    let formula = LinearSpec::housing().formula().unwrap();
    let fitter = NormalEquationFitter::new();

    let outcome = RidgeSweep::new(&fitter)
        .with_refine_step(0.05)
        .run(&scaled, &formula, &CancelToken::new())
        .unwrap();

    let coarse: Vec<f64> = outcome.coarse.rows().iter().map(|r| r.value).collect();
    let (low, high) = outcome.bracket.unwrap();
    assert!(coarse.contains(&low) && coarse.contains(&high));

    let ranked = outcome.coarse.ranked();
    let top_two = [ranked[0].value, ranked[1].value];
    assert!(top_two.contains(&low) && top_two.contains(&high));

    assert!(!outcome.refined.is_empty());
    for row in outcome.refined.rows() {
        assert!(row.value >= low && row.value <= high, "{} outside [{}, {}]", row.value, low, high);
    }
    let best = outcome.best.unwrap();
    assert!(best.value >= low && best.value <= high);
    assert!(outcome.model.unwrap().test_mse.is_finite());
}

#[test]
fn test_comparator_orders_by_error() {
    let ranking = compare([("knn", 12.5), ("ridge", 3.0), ("forward_selection", 3.0)]).unwrap();
    let names: Vec<&str> = ranking.entries().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["forward_selection", "ridge", "knn"]);
    assert_eq!(ranking.recommended().unwrap().name, "forward_selection");
    assert!(compare(Vec::<(&str, f64)>::new()).is_err());
}
