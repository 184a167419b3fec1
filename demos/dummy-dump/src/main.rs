//! Dummy dump: random LF votes, probabilities and similarities for a
//! directory of placeholder images (`dummy_imgs/image_XX.jpg`), written as
//! dump `dummy` for the visualizer.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::Rng;
use weakdb::{DatapointType, DumpBuilder, DumpShape};

#[derive(Parser)]
struct Args {
    /// Where the dump's JSON files are written
    #[arg(long, default_value = "lfviz_assets")]
    target_dir: PathBuf,

    #[arg(long, default_value_t = 15)]
    num_lf: usize,

    #[arg(long, default_value_t = 40)]
    num_train: usize,

    #[arg(long, default_value_t = 20)]
    num_val: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let shape = DumpShape::new(args.num_train, args.num_val, args.num_lf);
    let total = shape.num_datapoints();
    let mut rng = rand::thread_rng();

    let lf_names = (0..shape.num_lf).map(|i| format!("Labeling Func {i}")).collect();
    let lf_matrix: Vec<i32> = (0..shape.lf_matrix_len()).map(|_| rng.gen_range(-1..=1)).collect();
    // the extension only fills in abstentions
    let extended_lf_matrix = lf_matrix
        .iter()
        .map(|&v| if v == 0 { rng.gen_range(-1..=1) } else { v })
        .collect();
    let prob_labels = (0..total).map(|_| rng.gen::<f64>()).collect();
    let extended_prob_labels = (0..total).map(|_| rng.gen::<f64>()).collect();
    let ground_truth = (0..total).map(|_| rng.gen_range(-1..=1)).collect();

    // self-similarity is 1.0, as a real embedding would give
    let mut similarity = Vec::with_capacity(shape.similarity_len());
    for i in 0..total {
        for j in 0..shape.num_train {
            similarity.push(if i == j { 1.0 } else { rng.gen::<f64>() });
        }
    }

    let datapoints = (0..total)
        .map(|_| format!("dummy_imgs/image_{:02}.jpg", rng.gen_range(0..=7)))
        .collect();

    let mut db = DumpBuilder::new(shape);
    db.set_name("dummy")?;
    db.set_description("This is a demo of creating a weakdb debug dump for the visualizer.");
    db.set_lf_names(lf_names)?;
    db.set_lf_matrix(lf_matrix)?;
    db.set_prob_labels(prob_labels)?;
    db.set_extended_lf_matrix(extended_lf_matrix)?;
    db.set_extended_prob_labels(extended_prob_labels)?;
    db.set_ground_truth(ground_truth)?;
    db.set_datapoints(DatapointType::ImageUrl, datapoints)?;
    db.set_similarity_matrix(&similarity)?;

    let manifest = db
        .build()?
        .save_json(&args.target_dir)
        .with_context(|| format!("Failed to write dump to {}", args.target_dir.display()))?;

    println!(
        "Wrote dump {} ({} artifacts) to {}",
        manifest.name,
        manifest.artifacts.len(),
        args.target_dir.display()
    );
    Ok(())
}
