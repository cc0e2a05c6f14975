//! Scene Exporter
//!
//! Builds a scene from a set of images taken with a single camera and writes it as an
//! OpenMVG or AliceVision project. All views share one intrinsic and get an identity pose,
//! which is the usual starting point for an incremental reconstruction.
//!
//! The sensor width is taken from `--sensor-width` or looked up in the camera database by
//! camera make and model.
//!
//! Usage:
//! ```bash
//! cargo run --example export_scene -- \
//!   --format openmvg \
//!   --output sfm_data.json \
//!   --root-dir images \
//!   --width 4000 --height 3000 \
//!   --focal-length 24 \
//!   --make Canon --model "Canon EOS 5D" \
//!   --camera-db samples/sensor_width_camera_database.txt \
//!   images/IMG_0001.JPG images/IMG_0002.JPG
//! ```

use clap::Parser;
use log::{info, warn};
use sfm_utils::camera_db::CameraDb;
use sfm_utils::export::{export_scene_named, ExportOptions};
use sfm_utils::scene::{Intrinsic, IntrinsicModel, Pose, Scene, View};
use std::path::PathBuf;

/// Scene project exporter
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project format (openmvg, alicevision)
    #[arg(short = 'f', long, default_value = "openmvg")]
    format: String,

    /// Path of the project file to write
    #[arg(short = 'o', long)]
    output: PathBuf,

    /// Root directory of the images
    #[arg(short = 'r', long, default_value = ".")]
    root_dir: PathBuf,

    /// Image width in pixels
    #[arg(long)]
    width: u32,

    /// Image height in pixels
    #[arg(long)]
    height: u32,

    /// Focal length in millimeters
    #[arg(long)]
    focal_length: f64,

    /// Sensor width in millimeters, overrides the camera database
    #[arg(long)]
    sensor_width: Option<f64>,

    /// Camera make, as found in the image metadata
    #[arg(long, default_value = "")]
    make: String,

    /// Camera model, as found in the image metadata
    #[arg(long, default_value = "")]
    model: String,

    /// Sensor width database, defaults to the OpenMVG install location
    #[arg(long)]
    camera_db: Option<PathBuf>,

    /// Export options YAML file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Intrinsic model (pinhole, radial_k3, brown_t2)
    #[arg(short = 'i', long, default_value = "pinhole")]
    intrinsic: String,

    /// Distortion parameters of the intrinsic model
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    dist: Vec<f64>,

    /// Image files
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

fn intrinsic_model(name: &str) -> Result<IntrinsicModel, Box<dyn std::error::Error>> {
    let model = match name.to_lowercase().as_str() {
        "pinhole" => IntrinsicModel::Pinhole,
        "radial_k3" | "radial3" => IntrinsicModel::radial_k3(),
        "brown_t2" | "brownt2" => IntrinsicModel::brown_t2(),
        _ => {
            return Err(format!(
                "Unsupported intrinsic model: {}. Supported models: pinhole, radial_k3, brown_t2",
                name
            )
            .into());
        }
    };
    Ok(model)
}

fn sensor_width(cli: &Cli) -> Result<f64, Box<dyn std::error::Error>> {
    if let Some(width) = cli.sensor_width {
        return Ok(width);
    }

    let db = match &cli.camera_db {
        Some(path) => CameraDb::load(path)?,
        None => CameraDb::load_default()?,
    };
    info!("Loaded camera database with {} entries", db.len());

    db.lookup(&cli.make, &cli.model).ok_or_else(|| {
        format!(
            "No sensor width for camera '{} {}', pass --sensor-width",
            cli.make, cli.model
        )
        .into()
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let cli = Cli::parse();

    let options = match &cli.config {
        Some(path) => ExportOptions::load_from_yaml(path)?,
        None => ExportOptions::default(),
    };

    let mut intrinsic = Intrinsic::new(intrinsic_model(&cli.intrinsic)?, cli.width, cli.height)
        .with_focal_length(cli.focal_length)
        .with_sensor_width(sensor_width(&cli)?);
    if !cli.dist.is_empty() {
        if let Err(err) = intrinsic.set_dist_params(&cli.dist) {
            warn!("Ignoring distortion parameters: {}", err);
        }
    }

    let mut scene = Scene::new(&cli.root_dir);
    for image in &cli.images {
        let view = View::new(image, cli.width, cli.height).with_camera(&cli.make, &cli.model);
        let view_id = scene.add_view(view);
        let intrinsic_id = scene.add_intrinsic(intrinsic.clone());
        let pose_id = scene.add_pose(Pose::default());

        if let Some(view) = scene.view_mut(view_id) {
            view.intrinsic = Some(intrinsic_id);
            view.pose = Some(pose_id);
        }
    }

    info!(
        "Scene has {} views and {} intrinsics",
        scene.views().len(),
        scene.intrinsics().len()
    );

    export_scene_named(&cli.output, &scene, &cli.format, &options)?;
    println!("Wrote {} project to {:?}", cli.format, cli.output);
    Ok(())
}
