use anyhow::Result;
use burn::tensor::{Shape, Tensor, TensorData};
use burn_ndarray::NdArray;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

type FixtureBackend = NdArray<f32>;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation for the voxseg project")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate synthetic paired NIfTI volumes for smoke testing
    GenFixtures {
        /// Output directory; images/ and masks/ are created inside
        #[arg(short, long, default_value = "test_data")]
        output: PathBuf,

        /// Number of volume pairs to generate
        #[arg(short, long, default_value_t = 4)]
        cases: usize,

        /// Spatial extent (D H W) of each volume
        #[arg(long, num_args = 3, default_values_t = [32usize, 32, 16])]
        size: Vec<usize>,
    },

    /// Remove generated fixtures
    Clean {
        /// Directory holding generated fixtures
        #[arg(short, long, default_value = "test_data")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::GenFixtures { output, cases, size } => {
            gen_fixtures(&output, cases, [size[0], size[1], size[2]])
        }
        Commands::Clean { output } => clean(&output),
    }
}

fn gen_fixtures(output: &Path, cases: usize, size: [usize; 3]) -> Result<()> {
    let image_dir = output.join("images");
    let mask_dir = output.join("masks");
    std::fs::create_dir_all(&image_dir)?;
    std::fs::create_dir_all(&mask_dir)?;

    let device = Default::default();
    for case in 0..cases {
        let (image, mask) = sphere_phantom(size, case);

        let image_tensor =
            Tensor::<FixtureBackend, 3>::from_data(TensorData::new(image, Shape::new(size)), &device);
        let mask_tensor =
            Tensor::<FixtureBackend, 3>::from_data(TensorData::new(mask, Shape::new(size)), &device);

        let name = format!("case_{case:03}.nii");
        voxseg_io::write_volume(image_dir.join(&name), &image_tensor)?;
        voxseg_io::write_volume(mask_dir.join(&name), &mask_tensor)?;
        info!(%name, "wrote fixture pair");
    }

    info!(cases, output = %output.display(), "fixture generation complete");
    Ok(())
}

fn clean(output: &Path) -> Result<()> {
    if !output.exists() {
        warn!(output = %output.display(), "nothing to clean");
        return Ok(());
    }
    std::fs::remove_dir_all(output)?;
    info!(output = %output.display(), "removed fixtures");
    Ok(())
}

/// Sphere phantom: smooth radial image intensity plus a two-class label
/// ball. The center shifts with the case index so pairs differ.
fn sphere_phantom(size: [usize; 3], case: usize) -> (Vec<f32>, Vec<f32>) {
    let [d, h, w] = size;
    let shift = (case % 3) as f64;
    let center = [
        d as f64 / 2.0 + shift,
        h as f64 / 2.0 - shift,
        w as f64 / 2.0,
    ];
    let radius = w.min(h).min(d) as f64 / 3.0;

    let mut image = Vec::with_capacity(d * h * w);
    let mut mask = Vec::with_capacity(d * h * w);
    for z in 0..d {
        for y in 0..h {
            for x in 0..w {
                let dist = ((z as f64 - center[0]).powi(2)
                    + (y as f64 - center[1]).powi(2)
                    + (x as f64 - center[2]).powi(2))
                .sqrt();
                image.push((1.0 / (1.0 + dist / radius)) as f32);
                let label = if dist < radius / 2.0 {
                    2.0
                } else if dist < radius {
                    1.0
                } else {
                    0.0
                };
                mask.push(label);
            }
        }
    }
    (image, mask)
}
