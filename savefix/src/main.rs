use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use bsx_script::{ChecksumStatus, SaveFile, ScriptFile};

/// Refresh the opcode-region checksum a save file keeps over its companion
/// script. The game deletes saves whose digest no longer matches bsxx.dat.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Save file (common.dat or a quick save)
    #[arg(long, required = true)]
    save: PathBuf,

    /// The game's compiled script file (bsxx.dat)
    #[arg(long, required = true)]
    script: PathBuf,

    /// Where to write the patched save
    #[arg(short, long, required = true)]
    output: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let script_bytes = fs::read(&args.script)
        .with_context(|| format!("reading {}", args.script.display()))?;
    let script = ScriptFile::parse(script_bytes)?;
    let opcodes = script.opcode_bytes()?;

    let save_bytes = fs::read(&args.save)
        .with_context(|| format!("reading {}", args.save.display()))?;
    let mut save = SaveFile::new(save_bytes);

    match save.set_updated_checksum(&opcodes)? {
        ChecksumStatus::Updated => log::info!("checksum updated"),
        ChecksumStatus::Unchanged => log::info!("checksum already up to date"),
    }

    fs::write(&args.output, save.into_bytes())
        .with_context(|| format!("writing {}", args.output.display()))?;

    Ok(())
}
