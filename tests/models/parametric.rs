use stochastic_models::prelude::*;

use crate::{draw_from, mean, std_dev};

#[test]
fn fixed_normal_draws_match_parameters() {
    let values = draw_from("norm", &[("loc", 5.0), ("scale", 2.0)], 5000, 1);
    assert!((mean(&values) - 5.0).abs() < 0.15);
    assert!((std_dev(&values) - 2.0).abs() < 0.15);
}

#[test]
fn normal_data_is_accepted_at_the_first_candidate() {
    let data = draw_from("norm", &[("loc", 3.0), ("scale", 2.0)], 1000, 2);
    let mut model = ParametricDistribution::builder()
        .divergence_threshold(0.5)
        .seed(3)
        .build()
        .unwrap();
    model.fit(&samples::from_column(&data)).unwrap();

    let selection = model.selection().unwrap();
    assert_eq!(selection.family.name(), "norm");
    assert_eq!(selection.evaluated, 1);
    assert!(selection.accepted_early);

    let params = model.parameters().unwrap();
    assert!((params.get("loc").unwrap() - 3.0).abs() < 0.2);
    assert!((params.get("scale").unwrap() - 2.0).abs() < 0.2);
}

#[test]
fn uniform_data_selects_uniform() {
    let data = draw_from("uniform", &[], 2000, 4);
    let mut model = ParametricDistribution::builder()
        .divergence_estimator(KnnKlDivergence::new(10))
        .seed(5)
        .build()
        .unwrap();
    model.fit(&samples::from_column(&data)).unwrap();

    assert_eq!(model.family().unwrap().name(), "uniform");
    let params = model.parameters().unwrap();
    assert!(params.get("loc").unwrap().abs() < 0.01);
    assert!((params.get("scale").unwrap() - 1.0).abs() < 0.01);
}

#[test]
fn uniform_data_selects_uniform_at_default_settings() {
    for seed in [2, 5, 7, 15, 16] {
        let data = draw_from("uniform", &[], 500, seed);
        let mut model = ParametricDistribution::builder()
            .seed(seed + 100)
            .build()
            .unwrap();
        model.fit(&samples::from_column(&data)).unwrap();

        let selection = model.selection().unwrap();
        assert_eq!(selection.family.name(), "uniform", "seed {seed}: {selection:?}");
        let params = model.parameters().unwrap();
        assert!(params.get("loc").unwrap().abs() < 0.03, "seed {seed}: {params}");
        assert!((params.get("scale").unwrap() - 1.0).abs() < 0.03, "seed {seed}: {params}");
    }
}

#[test]
fn pinned_family_is_refitted() {
    let data = draw_from("expon", &[("scale", 2.0)], 2000, 6);
    let mut model = ParametricDistribution::with_family(catalog::lookup("expon").unwrap());
    model.fit(&samples::from_column(&data)).unwrap();

    assert!(model.selection().is_none());
    let params = model.parameters().unwrap();
    assert_eq!(params.names(), vec!["loc", "scale"]);
    assert!(params.get("loc").unwrap() >= 0.0);
    assert!((params.get("scale").unwrap() - 2.0).abs() < 0.2);
}

#[test]
fn pinned_discrete_family_draws_integers() {
    let data = draw_from("poisson", &[("mu", 4.0)], 1000, 7);
    let mut model = ParametricDistribution::builder()
        .family(catalog::lookup("poisson").unwrap())
        .seed(8)
        .build()
        .unwrap();
    model.fit(&samples::from_column(&data)).unwrap();

    let params = model.parameters().unwrap();
    assert_eq!(params.names(), vec!["mu", "loc"]);
    assert!((params.get("mu").unwrap() - mean(&data)).abs() < 1e-9);

    let drawn = model.draw_samples(200).unwrap();
    assert!(drawn.iter().all(|v| v.fract() == 0.0 && *v >= 0.0));
}

#[test]
fn multi_column_input_is_flattened() {
    let data = samples::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
    let mut model = ParametricDistribution::with_family(catalog::lookup("norm").unwrap());
    model.fit(&data).unwrap();

    assert!((model.parameters().unwrap().get("loc").unwrap() - 3.5).abs() < 1e-12);
    assert_eq!(model.draw_samples(4).unwrap().shape(), (4, 1));
}

#[test]
fn unfitted_model_cannot_draw() {
    let model = ParametricDistribution::new();
    assert!(matches!(
        model.draw_samples(1),
        Err(Error::NotFitted {
            model: "ParametricDistribution"
        })
    ));
    let pinned = ParametricDistribution::with_family(catalog::lookup("norm").unwrap());
    assert!(pinned.draw_samples(1).is_err());
}

#[test]
fn clone_keeps_configuration_only() {
    let data = draw_from("norm", &[], 300, 9);

    let mut auto = ParametricDistribution::builder()
        .divergence_threshold(0.5)
        .build()
        .unwrap();
    auto.fit(&samples::from_column(&data)).unwrap();
    let fresh = auto.clone_model();
    assert!(matches!(fresh.draw_samples(1), Err(Error::NotFitted { .. })));

    let fixed = ParametricDistribution::with_parameters(
        catalog::lookup("laplace").unwrap(),
        &[("loc", 1.0), ("scale", 0.5)],
    )
    .unwrap();
    let copy = fixed.clone_model();
    assert_eq!(copy.draw_samples(10).unwrap().nrows(), 10);
}

#[test]
fn seeded_models_are_reproducible() {
    let a = draw_from("gamma", &[("a", 2.0)], 50, 10);
    let b = draw_from("gamma", &[("a", 2.0)], 50, 10);
    assert_eq!(a, b);
}

#[test]
fn models_are_usable_as_trait_objects() {
    let data = samples::from_column(&draw_from("norm", &[], 400, 11));
    let mut models: Vec<Box<dyn StochasticModel>> = vec![
        Box::new(ParametricDistribution::with_family(catalog::lookup("norm").unwrap())),
        Box::new(EmpiricalDistribution::new()),
        Box::new(GaussianMixtureDistribution::new()),
    ];
    for model in &mut models {
        model.fit(&data).unwrap();
        assert_eq!(model.draw_samples(7).unwrap().shape(), (7, 1));
    }
}

/// A shape setting inside each catalog family's parameter space.
fn shape_values(family: &str) -> Vec<(&'static str, f64)> {
    match family {
        "t" | "chi2" => vec![("df", 5.0)],
        "gamma" | "skewnorm" => vec![("a", 2.0)],
        "lognorm" => vec![("s", 0.5)],
        "triang" => vec![("c", 0.3)],
        "weibull_min" => vec![("c", 1.5)],
        "bernoulli" | "geom" => vec![("p", 0.3)],
        "binom" => vec![("n", 10.0), ("p", 0.4)],
        "nbinom" => vec![("n", 3.0), ("p", 0.4)],
        "poisson" => vec![("mu", 3.0)],
        "randint" => vec![("low", 0.0), ("high", 6.0)],
        _ => vec![],
    }
}

#[test]
fn fitted_parameters_follow_family_order() {
    let families = catalog::continuous_families()
        .iter()
        .chain(catalog::discrete_families());
    for (i, &family) in families.enumerate() {
        let data = draw_from(family.name(), &shape_values(family.name()), 500, 40 + i as u64);
        let mut model = ParametricDistribution::with_family(family);
        model
            .fit(&samples::from_column(&data))
            .unwrap_or_else(|e| panic!("{family}: {e}"));

        let params = model.parameters().unwrap();
        assert_eq!(params.names(), family.parameter_names(), "{family}");
        assert!(family.valid_parameters(&params.values()), "{family}: {params}");
    }
}
