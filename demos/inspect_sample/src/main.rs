use argh::FromArgs;
use std::path::PathBuf;

use shapecomp::k3d::{self, pointcloud::PointCloud};
use shapecomp::{DatasetConfig, ShapeCompletionDataset};

#[derive(FromArgs)]
/// Load one shape-completion sample and report what it contains
struct Args {
    /// path to the dataset root
    #[argh(option)]
    data_source: Option<PathBuf>,

    /// name of the split directory
    #[argh(option, default = "String::from(\"train\")")]
    split: String,

    /// position of the sample in the split
    #[argh(option, default = "0")]
    index: usize,

    /// maximum number of sampled points
    #[argh(option, default = "3500")]
    num_points: usize,

    /// fixed seed for the point sampling
    #[argh(option)]
    seed: Option<u64>,

    /// optional path to a JSON configuration, overriding the other options
    #[argh(option)]
    config: Option<PathBuf>,

    /// optional path to write the full fused point cloud as PLY
    #[argh(option)]
    output: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let config = match (args.config, args.data_source) {
        (Some(path), _) => DatasetConfig::from_json_file(path)?,
        (None, Some(data_source)) => {
            let mut config = DatasetConfig::new(data_source);
            config.split = args.split;
            config.num_points = args.num_points;
            config.seed = args.seed;
            config
        }
        (None, None) => return Err("either --config or --data-source is required".into()),
    };
    let params = config.rgbd_params();

    let dataset = ShapeCompletionDataset::new(config)?;
    println!("Dataset: #{} samples", dataset.len());

    let Some(sample_id) = dataset.sample_ids().nth(args.index) else {
        return Err(format!("no sample at index {}", args.index).into());
    };
    println!("Sample: {sample_id}");

    let item = dataset.get(args.index)?;
    println!("Ground truth points: {:?}", item.groundtruth_points.shape);
    if let Some(points) = &item.rgbd_points {
        println!("Fused RGB-D points: {:?}", points.shape);
    }
    if let Some(k) = &item.intrinsics {
        println!("Intrinsics: {:?}", k);
    }

    let Some(frames) = item.frames else {
        return Ok(());
    };
    println!("Frames: {:?}", frames.keys().collect::<Vec<_>>());

    let Some(output) = args.output else {
        return Ok(());
    };
    let Some(k) = item.intrinsics else {
        return Ok(());
    };

    // fuse again at full resolution, keeping the colors
    let mut fused = PointCloud::default();
    for (frame_id, frame) in frames.iter() {
        let frame_pcd = k3d::rgbd::rgbd_to_pointcloud(
            &frame.color,
            &frame.depth,
            &frame.mask,
            &frame.pose,
            &k,
            &params,
        )?;
        log::info!("frame {frame_id}: #{} points", frame_pcd.len());
        fused.extend(frame_pcd);
    }

    println!(
        "Fused cloud: #{} points, bounds {:?} .. {:?}",
        fused.len(),
        fused.get_min_bound(),
        fused.get_max_bound()
    );

    k3d::io::ply::write_ply_binary(&output, &fused)?;
    println!("Wrote {}", output.display());

    Ok(())
}
