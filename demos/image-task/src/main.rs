//! Creates a labeling task from a directory of `.jpg` images.
//!
//! With no `--category` flags the task uses the beer-bottle mapping: the two
//! real classes on the left of the number row, and the "not sure"/"flagged"
//! exception cases pushed to the right with a shared yellow.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use labeling::{CategoryStyle, FileTaskStorage, LabelingTask, LabelingTaskStore};
use tracing::info;
use walkdir::WalkDir;

#[derive(Parser)]
struct Args {
    /// Directory globbed (recursively) for .jpg files
    #[arg(long, default_value = "lfviz_assets/lvis_val2017")]
    image_dir: PathBuf,

    /// Where the task record is written as <task_id>.json
    #[arg(long, default_value = "labeling_results")]
    results_dir: PathBuf,

    #[arg(long, default_value = "Label the BEER BOTTLE category in LVIS val set")]
    description: String,

    /// Category names, keyed 1..9 then 0 in order
    #[arg(long = "category")]
    categories: Vec<String>,
}

fn beer_bottle_mapping() -> Vec<(String, CategoryStyle)> {
    let style = |key_binding: u8, color: &str| CategoryStyle { key_binding, color: color.to_string() };
    vec![
        ("beer bottle".to_string(), style(1, "rgba(103, 191, 92, .75)")),
        ("background".to_string(), style(2, "rgba(237, 102, 93, .75)")),
        ("hard negative".to_string(), style(8, "rgba(114, 158, 206, .75)")),
        ("not sure".to_string(), style(9, "rgba(255, 193, 86, .75)")),
        ("flagged".to_string(), style(0, "rgba(255, 193, 86, .75)")),
    ]
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut images = Vec::new();
    for entry in WalkDir::new(&args.image_dir) {
        let entry = entry.with_context(|| format!("Failed to scan {}", args.image_dir.display()))?;
        let is_jpg = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("jpg"));
        if entry.file_type().is_file() && is_jpg {
            images.push(entry.path().to_string_lossy().into_owned());
        }
    }
    images.sort();
    if images.is_empty() {
        bail!("No .jpg files found under {}", args.image_dir.display());
    }
    info!(count = images.len(), dir = %args.image_dir.display(), "collected images");

    let mut task = LabelingTask::new();
    task.set_description(args.description);
    task.set_datapoints(images)?;
    if args.categories.is_empty() {
        task.assign_category_mapping(beer_bottle_mapping())?;
    } else {
        task.assign_categories(&args.categories)?;
    }

    let storage = FileTaskStorage::new(&args.results_dir)?;
    let path = storage.path_for(task.task_id());
    let store = LabelingTaskStore::new(storage);
    store.create(&task)?;

    println!("Created labeling task: {} ({})", task.task_id(), path.display());
    Ok(())
}
