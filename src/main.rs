use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use rustyflow::model::ChartDoc;

#[derive(Parser, Debug)]
#[command(author, version, about = "Load, validate and normalize flowchart JSON documents", long_about = None)]
struct Cli {
    /// Flowchart JSON document
    #[arg(value_name = "CHART_FILE")]
    chart_file: String,

    /// Write the normalized document back instead of printing it
    #[arg(short, long, value_name = "OUT_FILE")]
    output: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = Utf8PathBuf::from(&cli.chart_file);

    let mut doc =
        ChartDoc::load_json(&path).with_context(|| format!("Failed to load {}", path))?;

    // Paths are derived data; recompute them rather than trusting the file.
    let stored_paths = doc.chart.paths.clone();
    doc.chart.rebuild_paths();
    if doc.chart.paths != stored_paths {
        eprintln!("[rustyflow] stale paths in {}, recomputed from links", path);
    }

    doc.chart
        .validate()
        .with_context(|| format!("Invalid chart in {}", path))?;

    match cli.output {
        Some(out) => {
            let out = Utf8PathBuf::from(out);
            doc.save_json(&out)
                .with_context(|| format!("Failed to write {}", out))?;
        }
        None => {
            let json = serde_json::to_string_pretty(&doc)?;
            println!("{}", json);
        }
    }
    Ok(())
}
