// Generate man pages for kship and its subcommands.
//
// Usage: generate-man [OUT_DIR]
// Without OUT_DIR the top-level page is written to stdout.

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_mangen::Man;
use std::path::PathBuf;

fn main() -> Result<()> {
    let cmd = kship::cli::Cli::command();

    let Some(out_dir) = std::env::args().nth(1).map(PathBuf::from) else {
        Man::new(cmd).render(&mut std::io::stdout())?;
        return Ok(());
    };

    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create directory: {}", out_dir.display()))?;
    let mut written = 0;
    for sub in cmd.get_subcommands() {
        let path = out_dir.join(format!("kship-{}.1", sub.get_name()));
        let mut file = std::fs::File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        Man::new(sub.clone()).render(&mut file)?;
        written += 1;
    }
    let path = out_dir.join("kship.1");
    let mut file = std::fs::File::create(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    Man::new(cmd).render(&mut file)?;
    eprintln!("Wrote {} man pages to {}", written + 1, out_dir.display());
    Ok(())
}
