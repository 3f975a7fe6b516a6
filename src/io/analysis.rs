//! Per-residue RMSD between two aligned objects.
//!
//! Stateless helper over [`VizSession`], like the presets: it issues plain
//! PyMOL commands and holds no state of its own.

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::io::session::VizSession;

/// RMSD of one residue's CA atom between mobile and target.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidueRmsd {
    pub chain: String,
    /// Residue identifier as PyMOL reports it (may carry an insertion code).
    pub resi: String,
    pub rmsd: f64,
}

/// Compute per-residue CA RMSD between two aligned objects and color
/// `mobile` by the result.
///
/// Both objects must already be aligned (run `align`/`super` first). Each
/// residue's RMSD is stored in the B-factor column of `mobile` and a
/// blue-white-red spectrum from 0 to the maximum value is applied. Residues
/// whose selection is empty in either object are skipped; a residue whose
/// comparison fails outright is recorded as 0.0.
pub fn per_residue_rmsd(
    session: &mut dyn VizSession,
    mobile: &str,
    target: &str,
) -> Result<Vec<ResidueRmsd>> {
    let listing = session
        .execute(&format!(
            "iterate {mobile} and name CA, print(\"CA\\t%s\\t%s\" % (chain, resi))"
        ))
        .context("enumerate CA residues")?;

    let mut residues: Vec<(String, String)> = Vec::new();
    for line in listing.lines() {
        let fields: Vec<&str> = line.split('\t').collect();
        if let ["CA", chain, resi] = fields.as_slice() {
            let key = ((*chain).to_string(), (*resi).to_string());
            // Alternate locations repeat a residue; keep the first.
            if !residues.contains(&key) {
                residues.push(key);
            }
        }
    }
    debug!(count = residues.len(), "CA residues enumerated");

    let mut results = Vec::new();
    for (chain, resi) in &residues {
        let mobile_sel = format!("{mobile} and chain {chain} and resi {resi} and name CA");
        let target_sel = format!("{target} and chain {chain} and resi {resi} and name CA");
        let rmsd = match session.execute(&format!(
            "print(cmd.rms_cur(\"{mobile_sel}\", \"{target_sel}\", matchmaker=4))"
        )) {
            Ok(output) => {
                let value = output
                    .lines()
                    .last()
                    .and_then(|line| line.trim().parse::<f64>().ok());
                match value {
                    // rms_cur reports an empty selection as a negative value.
                    Some(value) if value >= 0.0 => value,
                    _ => continue,
                }
            }
            Err(err) => {
                warn!(chain = %chain, resi = %resi, err = %err, "rms_cur failed");
                0.0
            }
        };
        results.push(ResidueRmsd {
            chain: chain.clone(),
            resi: resi.clone(),
            rmsd,
        });
    }

    if results.is_empty() {
        return Ok(results);
    }

    for residue in &results {
        session
            .execute(&format!(
                "alter {mobile} and chain {} and resi {}, b={}",
                residue.chain, residue.resi, residue.rmsd
            ))
            .with_context(|| format!("store rmsd for residue {}", residue.resi))?;
    }
    let max_rmsd = results.iter().map(|r| r.rmsd).fold(0.0_f64, f64::max);
    session
        .execute(&format!(
            "spectrum b, blue_white_red, {mobile}, minimum=0, maximum={max_rmsd}"
        ))
        .context("color by rmsd")?;
    info!(
        residues = results.len(),
        max_rmsd, "mobile colored by per-residue rmsd"
    );

    Ok(results)
}
