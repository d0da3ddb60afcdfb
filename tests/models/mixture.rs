use stochastic_models::prelude::*;

use crate::draw_from;

#[test]
fn two_separated_groups_give_two_components() {
    let mut values = draw_from("norm", &[("loc", 0.0)], 200, 1);
    values.extend(draw_from("norm", &[("loc", 10.0)], 200, 2));

    let mut model = GaussianMixtureDistribution::builder().seed(3).build().unwrap();
    model.fit(&samples::from_column(&values)).unwrap();
    assert_eq!(model.n_components(), Some(2));

    let search = model.component_search().unwrap();
    assert_eq!(search.best, 2);
    assert!(search.best_score > 0.7);

    let drawn = model.draw_samples(2000).unwrap();
    let upper = drawn.iter().filter(|v| **v > 5.0).count();
    assert!((600..1400).contains(&upper), "upper group drew {upper}");
}

#[test]
fn three_blobs_in_two_dimensions() {
    let centers = [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)];
    let mut rows = Vec::new();
    for (i, &(cx, cy)) in centers.iter().enumerate() {
        let seed = 10 + 2 * i as u64;
        let xs = draw_from("norm", &[("loc", cx)], 150, seed);
        let ys = draw_from("norm", &[("loc", cy)], 150, seed + 1);
        rows.extend(xs.into_iter().zip(ys).map(|(x, y)| vec![x, y]));
    }
    let data = samples::from_rows(&rows).unwrap();

    let mut model = GaussianMixtureDistribution::builder().seed(4).build().unwrap();
    model.fit(&data).unwrap();
    assert_eq!(model.n_components(), Some(3));

    let mixture = model.mixture().unwrap();
    assert_eq!(mixture.n_features(), 2);
    assert!((mixture.weights().iter().sum::<f64>() - 1.0).abs() < 1e-9);
    assert_eq!(model.draw_samples(25).unwrap().shape(), (25, 2));
}

#[test]
fn binary_data_stops_on_structural_failure() {
    let values: Vec<f64> = (0..100).map(|i| f64::from(i % 2)).collect();
    let mut model = GaussianMixtureDistribution::builder().seed(5).build().unwrap();
    model.fit(&samples::from_column(&values)).unwrap();

    let search = model.component_search().unwrap();
    assert_eq!(search.stop, SearchStop::StructuralFailure);
    assert_eq!(model.n_components(), Some(2));
}

#[test]
fn clone_keeps_settings_and_drops_the_fit() {
    let mut model = GaussianMixtureDistribution::builder()
        .plateau_patience(5)
        .max_iter(200)
        .build()
        .unwrap();
    model.fit(&samples::from_column(&[1.0, 2.0, 3.0])).unwrap();

    let copy = model.clone_model();
    assert!(matches!(copy.draw_samples(1), Err(Error::NotFitted { .. })));
    assert_eq!(model.config().plateau_patience, 5);
    assert_eq!(model.to_string(), "Approximated data distribution");
}

#[test]
fn empty_input_is_rejected() {
    let mut model = GaussianMixtureDistribution::new();
    assert!(matches!(
        model.fit(&samples::from_column(&[])),
        Err(Error::EmptySamples)
    ));
}
