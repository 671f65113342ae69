use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use bsx_script::{decompile, ScriptFile};

/// Decompile a BSXScript container (bsxx.dat) into a JSON instruction list.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The game's compiled script file
    #[arg(short, long, required = true)]
    input: PathBuf,

    /// Destination for the decompiled JSON
    #[arg(short, long, required = true)]
    output: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let bytes = fs::read(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let file = ScriptFile::parse(bytes)?;
    let script = decompile(&file)?;

    log::info!(
        "version {}: {} functions, {} characters, {} messages, {} instructions",
        script.version,
        script.functions.len(),
        script.characters.len(),
        script.messages.len(),
        script.instructions.len()
    );

    let writer = fs::File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    serde_json::to_writer_pretty(writer, &script.instructions)?;

    Ok(())
}
