use log::{error, info};
use prescriber_risk::{PipelineConfig, run_pipeline};

fn main() {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = PipelineConfig::builder().show_progress(true).build();
    info!(
        "Scoring prescribers from {} input sources",
        config.input_paths.len()
    );

    match run_pipeline(&config) {
        Ok(summary) => info!(
            "Wrote {} prescribers to {}",
            summary.providers_scored,
            summary.output_path.display()
        ),
        Err(e) => {
            error!("Risk segmentation failed: {e:#}");
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}
