use stochastic_models::prelude::*;

#[test]
fn draws_only_observed_values() {
    let observed = [1.5, -2.0, 7.25, 0.0];
    let mut model = EmpiricalDistribution::with_seed(1);
    model.fit(&samples::from_column(&observed)).unwrap();

    let drawn = model.draw_samples(500).unwrap();
    assert_eq!(drawn.shape(), (500, 1));
    assert!(drawn.iter().all(|v| observed.contains(v)));
    for value in observed {
        assert!(drawn.iter().any(|v| *v == value));
    }
}

#[test]
fn refit_replaces_stored_samples() {
    let mut model = EmpiricalDistribution::new();
    model.fit(&samples::from_column(&[1.0, 2.0])).unwrap();
    model.fit(&samples::from_column(&[9.0])).unwrap();
    assert!(model.draw_samples(20).unwrap().iter().all(|v| *v == 9.0));
    assert_eq!(model.data().unwrap().nrows(), 1);
}

#[test]
fn same_seed_same_draws() {
    let data = samples::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
    let mut a = EmpiricalDistribution::with_seed(42);
    let mut b = EmpiricalDistribution::with_seed(42);
    a.fit(&data).unwrap();
    b.fit(&data).unwrap();
    assert_eq!(a.draw_samples(30).unwrap(), b.draw_samples(30).unwrap());
}

#[test]
fn clone_is_unfitted() {
    let mut model = EmpiricalDistribution::new();
    model.fit(&samples::from_column(&[1.0])).unwrap();
    let copy = model.clone_model();
    assert!(matches!(
        copy.draw_samples(1),
        Err(Error::NotFitted {
            model: "EmpiricalDistribution"
        })
    ));
}
