//! Publication figure presets and image rendering.
//!
//! Stateless convenience helpers over [`VizSession`]: each call issues plain
//! PyMOL commands and holds no state of its own, so they coexist with the
//! turn loop on the same session without coordination.

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use tracing::info;

use crate::io::session::VizSession;

/// Wong colorblind-safe palette, cycled across chains.
const WONG_PALETTE: [&str; 7] = [
    "0x0072B2", // blue
    "0xD55E00", // vermillion
    "0x009E73", // bluish-green
    "0xF0E442", // yellow
    "0x56B4E9", // sky-blue
    "0xE69F00", // orange
    "0xCC79A7", // reddish-purple
];

/// Named presentation preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// White background, ray tracing, antialias; suitable for most journals.
    JournalStandard,
    /// Black background, ambient lighting, wider lines for slides.
    Presentation,
    /// Wong palette cycled over every object's chains.
    ColorblindSafe,
}

impl Preset {
    pub const ALL: [Preset; 3] = [
        Preset::JournalStandard,
        Preset::Presentation,
        Preset::ColorblindSafe,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Preset::JournalStandard => "journal-standard",
            Preset::Presentation => "presentation",
            Preset::ColorblindSafe => "colorblind-safe",
        }
    }
}

impl FromStr for Preset {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "journal-standard" => Ok(Preset::JournalStandard),
            "presentation" => Ok(Preset::Presentation),
            "colorblind-safe" => Ok(Preset::ColorblindSafe),
            other => Err(anyhow!(
                "unknown preset '{other}' (available: {})",
                Preset::ALL.map(Preset::as_str).join(", ")
            )),
        }
    }
}

/// Apply a presentation preset to the session.
pub fn apply_preset(session: &mut dyn VizSession, preset: Preset) -> Result<()> {
    info!(preset = preset.as_str(), "applying preset");
    match preset {
        Preset::JournalStandard => run_all(
            session,
            &[
                "bg_color white",
                "set ray_opaque_background, 1",
                "set antialias, 2",
                "set ray_shadows, 1",
                "set depth_cue, 0",
                "set ray_trace_fog, 0",
            ],
        ),
        Preset::Presentation => run_all(
            session,
            &[
                "bg_color black",
                "set ray_opaque_background, 1",
                "set antialias, 2",
                "set ray_shadows, 0",
                "set depth_cue, 1",
                "set line_width, 3",
                "set stick_radius, 0.25",
            ],
        ),
        Preset::ColorblindSafe => {
            let snapshot = session.snapshot().context("enumerate chains")?;
            for obj in &snapshot.objects {
                for (i, chain) in obj.chains.iter().enumerate() {
                    let color = WONG_PALETTE[i % WONG_PALETTE.len()];
                    session
                        .execute(&format!("color {color}, {} and chain {chain}", obj.name))
                        .with_context(|| format!("color chain {chain} of {}", obj.name))?;
                }
            }
            Ok(())
        }
    }
}

/// Render the current view to a PNG file, returning the path unchanged.
pub fn render_image<'a>(
    session: &mut dyn VizSession,
    path: &'a Path,
    width: u32,
    height: u32,
    ray: bool,
    dpi: u32,
) -> Result<&'a Path> {
    let command = format!(
        "png {}, width={width}, height={height}, ray={}, dpi={dpi}",
        path.display(),
        u8::from(ray),
    );
    session.execute(&command).context("render image")?;
    info!(path = %path.display(), "image rendered");
    Ok(path)
}

fn run_all(session: &mut dyn VizSession, commands: &[&str]) -> Result<()> {
    for command in commands {
        session
            .execute(command)
            .with_context(|| format!("apply '{command}'"))?;
    }
    Ok(())
}
