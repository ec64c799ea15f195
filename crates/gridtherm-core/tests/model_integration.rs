//! Integration tests for building, persisting and coarsening grid models.

use gridtherm_core::{
    BcType, BlockPowerModel, BoundaryCondition, Face, GridData, GridDataTable, GridThermalLayer,
    GridThermalModel, MaterialLibrary, PowerModel, ReduceMethod, make_reduction_model,
    reduce_grid,
};

fn package(nx: usize, ny: usize) -> GridThermalModel {
    let lib = MaterialLibrary::with_defaults();
    let cu = lib.id("Cu").unwrap();
    let diel = lib.id("Dielectric").unwrap();

    let mut model = GridThermalModel::new((nx, ny), (0.0, 0.0), 0.0);
    model.set_resolution(1e-3, 1e-3).unwrap();

    let mf = GridData::from_fn(nx, ny, |x, y| ((x + y) % 3) as f64 / 2.0);
    let mut die = GridThermalLayer::new("die", 2e-4, cu, diel, mf.clone()).with_metal(true);
    let mut power = GridDataTable::new(nx, ny);
    power
        .add_sample(25.0, GridData::from_fn(nx, ny, |x, _| 0.01 * (x + 1) as f64))
        .unwrap();
    power
        .add_sample(125.0, GridData::from_fn(nx, ny, |x, _| 0.02 * (x + 1) as f64))
        .unwrap();
    die.add_power_model(power).unwrap();
    model.append_layer(die).unwrap();
    model
        .append_layer(GridThermalLayer::new("sub", 1e-3, cu, diel, mf))
        .unwrap();
    model
        .set_bc_model(Face::Bottom, BcType::Htc, GridDataTable::from_uniform(nx, ny, 2000.0))
        .unwrap();
    model.set_uniform_bc(Face::Top, BoundaryCondition::htc(10.0));
    model
        .add_power_model(1, BlockPowerModel::new((0, 0), (1, 1), 0.4))
        .unwrap();
    model.append_jump_connection((0, 0, 0), (0, 0, 1), 3.0).unwrap();
    model
}

#[test]
fn test_json_round_trip() {
    let model = package(4, 3);
    let json = serde_json::to_string(&model).unwrap();
    let restored: GridThermalModel = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, model);
    assert!(restored.need_iteration());
    assert_eq!(restored.layers()[1].top(), Some("die"));
}

#[test]
fn test_coarsening_conserves_power_on_odd_grid() {
    let model = package(5, 5);
    let reduced = make_reduction_model(&model, 1).unwrap();
    assert_eq!(reduced.grid_size(), (3, 3));
    assert_eq!(reduced.resolution(false), (2e-3, 2e-3));

    let total = |m: &GridThermalModel, key: f64| -> f64 {
        let (nx, ny) = m.grid_size();
        let mut sum = 0.0;
        for layer in m.layers() {
            for p in layer.power_models() {
                if let PowerModel::Grid(_) = p {
                    for x in 0..nx {
                        for y in 0..ny {
                            sum += p.query(key, x, y).unwrap_or(0.0);
                        }
                    }
                }
            }
        }
        sum
    };
    for key in [25.0, 75.0, 125.0] {
        let before = total(&model, key);
        let after = total(&reduced, key);
        assert!(
            (before - after).abs() < 1e-9,
            "power at {}: {} vs {}",
            key,
            before,
            after
        );
    }
}

#[test]
fn test_average_reduction_keeps_fraction_bounds() {
    let model = package(7, 3);
    let reduced = make_reduction_model(&model, 1).unwrap();
    for layer in reduced.layers() {
        let mf = layer.metal_fraction();
        assert!(mf.min().unwrap() >= 0.0 && mf.max().unwrap() <= 1.0);
    }
    let direct = reduce_grid(model.layers()[0].metal_fraction(), ReduceMethod::Average);
    assert_eq!(reduced.layers()[0].metal_fraction(), &direct);
}
