//! Gridtherm command-line interface.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use gridtherm::prelude::*;
use gridtherm::{BuildConfig, BuildSummary};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "gridtherm")]
#[command(about = "Extract compact thermal models from gridded package layouts", long_about = None)]
#[command(version)]
struct Cli {
    /// Package file (JSON) with `materials` and `model`; a synthetic
    /// package is generated when omitted
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Synthetic package grid size in x
    #[arg(long, default_value_t = 16)]
    nx: usize,

    /// Synthetic package grid size in y
    #[arg(long, default_value_t = 16)]
    ny: usize,

    /// Number of synthetic layers
    #[arg(long, default_value_t = 4)]
    layers: usize,

    /// Total power of the synthetic heat source (W)
    #[arg(long, default_value_t = 1.0)]
    power: f64,

    /// Bottom-face heat transfer coefficient (W/(m^2*K))
    #[arg(long, default_value_t = 5000.0)]
    htc: f64,

    /// Ambient reference temperature (C)
    #[arg(long = "ref-temp", default_value_t = 25.0)]
    ref_temp: f64,

    /// Number of 2x2 grid coarsening passes
    #[arg(short, long, default_value_t = 0)]
    reduce: usize,

    /// PRIMA block moments to match (0 skips projection)
    #[arg(short = 'q', long, default_value_t = 2)]
    order: usize,

    /// Treat convection nodes as input ports
    #[arg(long)]
    bonds: bool,

    /// Rebuild until temperature dependent tables converge
    #[arg(long)]
    iterate: bool,

    /// Write the package that was analysed to this file
    #[arg(long, value_name = "FILE")]
    save: Option<PathBuf>,

    /// Build and project on a single thread
    #[arg(long)]
    serial: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// A model together with the materials it refers to.
#[derive(Debug, Serialize, Deserialize)]
struct Package {
    materials: MaterialLibrary,
    model: GridThermalModel,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let package = match &cli.input {
        Some(path) => load_package(path)?,
        None => synthetic_package(&cli)?,
    };
    if let Some(path) = &cli.save {
        let json = serde_json::to_string_pretty(&package)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Package written to {}", path.display());
    }

    run(&cli, &package)
}

fn load_package(path: &Path) -> Result<Package> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read package: {}", path.display()))?;
    parse_package(&content).with_context(|| format!("Failed to parse package: {}", path.display()))
}

fn parse_package(content: &str) -> Result<Package> {
    Ok(serde_json::from_str(content)?)
}

/// A die on a substrate: a centered block heat source on the top layer
/// and convection on the bottom face.
fn synthetic_package(cli: &Cli) -> Result<Package> {
    if cli.nx == 0 || cli.ny == 0 || cli.layers == 0 {
        bail!("synthetic package needs a non-empty grid and at least one layer");
    }
    let materials = MaterialLibrary::with_defaults();
    let cu = materials.id("Cu").context("missing Cu")?;
    let diel = materials.id("Dielectric").context("missing dielectric")?;

    let (nx, ny) = (cli.nx, cli.ny);
    let mut model = GridThermalModel::new((nx, ny), (0.0, 0.0), 0.0);
    model.set_resolution(1e-4, 1e-4)?;
    for i in 0..cli.layers {
        let thickness = if i % 2 == 0 { 3.5e-5 } else { 2e-4 };
        let mf = GridData::from_fn(nx, ny, |x, y| if (x + y + i) % 3 == 0 { 0.9 } else { 0.2 });
        model.append_layer(GridThermalLayer::new(format!("L{i}"), thickness, cu, diel, mf))?;
    }
    let ll = (nx / 4, ny / 4);
    let ur = ((3 * nx / 4).max(ll.0 + 1) - 1, (3 * ny / 4).max(ll.1 + 1) - 1);
    model.add_power_model(0, BlockPowerModel::new(ll, ur, cli.power))?;
    model.set_bc_model(Face::Bottom, BcType::Htc, GridDataTable::from_uniform(nx, ny, cli.htc))?;

    Ok(Package { materials, model })
}

fn run(cli: &Cli, package: &Package) -> Result<()> {
    let model = make_reduction_model(&package.model, cli.reduce)?;
    let (nx, ny, nz) = model.model_size();
    println!("Grid: {} x {} x {} ({} nodes)", nx, ny, nz, model.total_grids());
    if cli.verbose {
        let (rx, ry) = model.resolution(true);
        println!("Resolution: {:.3e} x {:.3e} m", rx, ry);
        for layer in model.layers() {
            println!("  {:<12} {:.3e} m", layer.name(), layer.thickness());
        }
    }

    let build_config = if cli.serial {
        BuildConfig::serial()
    } else {
        BuildConfig::default()
    };
    let builder =
        GridThermalNetworkBuilder::new(&model, &package.materials).with_config(build_config);
    let initial = vec![cli.ref_temp; model.total_grids()];
    let ref_t = cli.ref_temp;

    let (temperatures, network, summary) = if cli.iterate && builder.needs_iteration() {
        let result = solve_fixed_point(
            &builder,
            &initial,
            &ConvergenceCriteria::default(),
            |net| solve_steady_state(net, ref_t),
        )?;
        println!(
            "Fixed point: {} passes, converged: {}",
            result.iterations, result.converged
        );
        let (network, summary) = builder.build(&result.temperatures)?;
        (result.temperatures, network, summary)
    } else {
        let (network, summary) = builder.build(&initial)?;
        let temperatures = solve_steady_state(&network, ref_t)?;
        (temperatures, network, summary)
    };
    print_summary(&summary);

    let (hottest, t_max) = temperatures
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |acc, (i, t)| if t > acc.1 { (i, t) } else { acc });
    if let Some((x, y, z)) = model.grid_index(hottest) {
        println!("Max temperature: {:.4} C at ({}, {}, {})", t_max, x, y, z);
    }

    let mna = make_mna(&network, cli.bonds, None)?;
    println!(
        "MNA: {} states, {} ports, {} outputs, {} conductance entries",
        mna.size(),
        mna.port_count(),
        mna.output_count(),
        mna.g.nnz()
    );

    if cli.order > 0 {
        if mna.port_count() == 0 {
            println!("No input ports; skipping PRIMA");
            return Ok(());
        }
        let prima_config = PrimaConfig::default().with_parallel(!cli.serial);
        let rom = ReducedModel::reduce(&mna, cli.order, &prima_config)?;
        println!(
            "PRIMA: order {} -> basis {} x {}",
            cli.order,
            rom.x.nrows(),
            rom.x.ncols()
        );
        if cli.verbose {
            let trace: f64 = rom.g.diagonal().sum();
            println!("Reduced G trace: {:.6e}", trace);
        }
    }

    Ok(())
}

fn print_summary(summary: &BuildSummary) {
    println!("Network: {}", summary);
    println!("Net heat flow: {:.6} W", summary.net_heat_flow());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("gridtherm").chain(args.iter().copied()))
    }

    #[test]
    fn test_synthetic_package_round_trips() {
        let package = synthetic_package(&cli(&["--nx", "4", "--ny", "3", "--layers", "2"])).unwrap();
        let json = serde_json::to_string(&package).unwrap();
        let restored = parse_package(&json).unwrap();
        assert_eq!(restored.model, package.model);
        assert_eq!(restored.materials, package.materials);
    }

    #[test]
    fn test_malformed_package_is_an_error() {
        let package = synthetic_package(&cli(&["--nx", "4", "--ny", "3", "--layers", "2"])).unwrap();
        let mut value = serde_json::to_value(&package).unwrap();
        value["model"]["layers"][1]["metal_fraction"]["data"] = serde_json::json!([0.5]);
        let err = parse_package(&value.to_string()).unwrap_err();
        assert!(err.to_string().contains("size mismatch"), "{}", err);

        assert!(parse_package("{}").is_err());
    }

    #[test]
    fn test_empty_synthetic_grid_is_rejected() {
        assert!(synthetic_package(&cli(&["--nx", "0"])).is_err());
    }
}
