use std::fs;
use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "Write the OpenAPI document to a file", long_about = None)]
struct Args {
    /// Output path
    #[arg(default_value = "openapi.json")]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let doc = rbac_tracker::docs::build_openapi();
    let json = serde_json::to_string_pretty(&doc)?;
    fs::write(&args.out, json)?;
    println!("wrote {}", args.out.display());
    Ok(())
}
