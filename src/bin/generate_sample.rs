use std::path::PathBuf;

use anyhow::Result;
use fmf_data::data::sample::write_sample_set;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./sample_data/"));

    let set = write_sample_set(&dir)?;

    println!("data:       {}", set.data.display());
    println!("template:   {}", set.template.display());
    println!("cc_sum:     {}", set.cc_sum.display());
    println!("detections: {} + {}", set.detections_meta.display(), set.detections_wav.display());
    Ok(())
}
