//! Integration test: reconstruction from noise-free tilt series.

use holomag_core::config::PipelineConfig;
use holomag_core::dataset::DataSet;
use holomag_core::forward_model::ForwardModel;
use holomag_core::projection::{ProjectionAxis, Projector};
use holomag_core::reconstruction::{optimize_linear, Costfunction};
use holomag_core::types::{PhaseMap, VectorField};
use holomag_shapes::create_mag_dist_vortex;
use holomag_shapes::shapes::{Disc, Shape, ShapeAxis};
use ndarray::{Array2, Array3};

const DIM: [usize; 3] = [4, 8, 8];
const A: f64 = 10.0;

const CONFIG: &str = r#"
b_0 = 1.0

[spectral]
backend = "pow2"

[reconstruction]
lambda = 1e-6
max_iter = 300
tolerance = 1e-10
"#;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn projectors() -> Vec<Projector> {
    vec![
        Projector::simple(DIM, ProjectionAxis::Z).unwrap(),
        Projector::x_tilt(DIM, 0.5).unwrap(),
        Projector::y_tilt(DIM, -0.5).unwrap(),
        Projector::simple(DIM, ProjectionAxis::X).unwrap(),
        Projector::simple(DIM, ProjectionAxis::Y).unwrap(),
    ]
}

/// Dataset with one phase map per projector; zero phase unless given.
fn dataset(
    config: &PipelineConfig,
    mask: &Array3<bool>,
    phase_maps: Option<Vec<PhaseMap>>,
) -> DataSet {
    let mut data = DataSet::from_config(A, DIM, Some(mask.clone()), config).unwrap();
    let phase_maps = phase_maps.unwrap_or_else(|| {
        projectors()
            .iter()
            .map(|p| PhaseMap::new(A, Array2::zeros(p.dim_uv())).unwrap())
            .collect()
    });
    for (phase_map, projector) in phase_maps.into_iter().zip(projectors()) {
        data.append(phase_map, projector).unwrap();
    }
    data
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

#[test]
fn test_noise_free_vortex_is_reproduced() {
    init_logging();
    let config = PipelineConfig::from_toml_str(CONFIG).unwrap();
    let mask = Shape::Disc(Disc {
        center: [2.0, 4.0, 4.0],
        radius: 3.0,
        height: 2.0,
        axis: ShapeAxis::Z,
    })
    .mask(DIM);
    let mag = VectorField::new(A, create_mag_dist_vortex(&mask, None, ShapeAxis::Z, 1.0)).unwrap();

    let phase_maps = dataset(&config, &mask, None).create_phase_maps(&mag).unwrap();
    let model = ForwardModel::new(dataset(&config, &mask, Some(phase_maps))).unwrap();
    assert_eq!(model.n(), 3 * 64);

    let result = optimize_linear(&model, &config.reconstruction).unwrap();
    assert!(result.iterations > 0);
    assert_eq!(result.mag_data.dim(), DIM);

    let y = model.data_set().phase_vec();
    let x = model.from_vector_field(&result.mag_data).unwrap();
    let simulated = model.evaluate(&x).unwrap();
    let misfit: Vec<f64> = simulated.iter().zip(&y).map(|(s, t)| s - t).collect();
    assert!(norm(&misfit) < 0.05 * norm(&y), "misfit {} of {}", norm(&misfit), norm(&y));

    let cost = Costfunction::new(&model, config.reconstruction.lambda).unwrap();
    let initial = cost.call(&vec![0.0; model.n()]).unwrap();
    assert!(result.cost < 1e-2 * initial, "cost {} from {initial}", result.cost);

    // Nothing is reconstructed outside the mask.
    for ((k, j, i), &inside) in mask.indexed_iter() {
        if !inside {
            assert!((0..3).all(|c| result.mag_data.field()[[c, k, j, i]] == 0.0));
        }
    }
}

#[test]
fn test_invalid_reconstruction_settings() {
    init_logging();
    let mut config = PipelineConfig::default();
    let mask = Array3::from_elem(DIM, true);
    let model = ForwardModel::new(dataset(&config, &mask, None)).unwrap();

    config.reconstruction.max_iter = 0;
    assert!(optimize_linear(&model, &config.reconstruction).is_err());
    config.reconstruction.max_iter = 10;
    config.reconstruction.lambda = -1.0;
    assert!(optimize_linear(&model, &config.reconstruction).is_err());
}

#[test]
fn test_zero_data_gives_zero_magnetization() {
    init_logging();
    let config = PipelineConfig::default();
    let mask = Array3::from_elem(DIM, true);
    let model = ForwardModel::new(dataset(&config, &mask, None)).unwrap();
    let result = optimize_linear(&model, &config.reconstruction).unwrap();
    assert!(result.mag_data.field().iter().all(|&v| v == 0.0));
    assert_eq!(result.cost, 0.0);
}
