//! `wikirank verify` - re-hash outputs against manifest.json

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use wikirank_core::RunManifest;

use super::print_summary;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Output directory of a previous run
    pub dir: PathBuf,
}

pub fn run(args: VerifyArgs) -> Result<()> {
    let manifest = RunManifest::read_from(&args.dir)?;
    let report = manifest.verify(&args.dir);

    let mut rows: Vec<(&str, String)> = Vec::new();
    rows.extend(report.ok.iter().map(|f| ("OK", f.clone())));
    rows.extend(report.mismatched.iter().map(|f| ("CHANGED", f.clone())));
    rows.extend(report.missing.iter().map(|f| ("MISSING", f.clone())));
    rows.push(("Created", manifest.created_at.to_rfc3339()));
    rows.push(("Content hash", manifest.content_hash.clone()));
    print_summary("Verify", &rows);

    if !report.is_clean() {
        anyhow::bail!(
            "{} changed, {} missing in {}",
            report.mismatched.len(),
            report.missing.len(),
            args.dir.display()
        );
    }
    log::info!("All {} outputs match manifest", report.ok.len());
    Ok(())
}
