//! System prompt rendering.
//!
//! The system prompt is fixed for the lifetime of a conversation; mode and
//! session state travel in the per-turn user context instead.

use anyhow::{Context, Result};
use minijinja::{Environment, context};

use crate::core::commands::COMMAND_TAG;
use crate::io::presets::Preset;

const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.md");

/// Render the system prompt sent with every model call.
pub fn system_prompt() -> Result<String> {
    let mut env = Environment::new();
    env.add_template("system", SYSTEM_TEMPLATE)
        .expect("system template should be valid");
    let template = env.get_template("system").expect("system template exists");
    let rendered = template
        .render(context! {
            command_tag => COMMAND_TAG,
            presets => Preset::ALL.iter().map(|p| p.as_str()).collect::<Vec<_>>(),
        })
        .context("render system prompt")?;
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_the_command_tag() {
        let prompt = system_prompt().expect("render");
        assert!(prompt.contains("<pymol>fetch 1ubq</pymol>"));
    }

    #[test]
    fn prompt_lists_every_preset() {
        let prompt = system_prompt().expect("render");
        for preset in Preset::ALL {
            assert!(prompt.contains(preset.as_str()), "missing {preset:?}");
        }
    }
}
