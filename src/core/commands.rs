//! Extraction of command blocks embedded in model replies.
//!
//! The wire contract between the model and the agent is a delimited
//! micro-format: every `<pymol>...</pymol>` block in a reply is a command to
//! run against the session. Matching is non-greedy (each open tag pairs with
//! the nearest following close tag), spans newlines, and is non-nested.
//! Unclosed tags yield no match for that span; this is not an error.

use std::sync::LazyLock;

use regex::Regex;

/// Tag name delimiting command blocks in model replies.
pub const COMMAND_TAG: &str = "pymol";

static COMMAND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("(?s)<{COMMAND_TAG}>(.*?)</{COMMAND_TAG}>"))
        .expect("command block regex should be valid")
});

/// Pull every command block out of a model reply, in document order.
///
/// Bodies are trimmed of surrounding whitespace; blocks that are empty after
/// trimming are dropped. Pure and idempotent: calling this twice on the same
/// text yields identical results.
pub fn extract_commands(text: &str) -> Vec<String> {
    COMMAND_RE
        .captures_iter(text)
        .map(|caps| caps[1].trim().to_string())
        .filter(|body| !body.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_blocks_in_document_order() {
        let text = "<pymol>a</pymol>text<pymol>  b  </pymol>";
        assert_eq!(extract_commands(text), vec!["a", "b"]);
    }

    #[test]
    fn multiline_body_is_preserved() {
        let text = "<pymol>\nfetch 1ubq\nshow cartoon\n</pymol>";
        assert_eq!(extract_commands(text), vec!["fetch 1ubq\nshow cartoon"]);
    }

    #[test]
    fn unclosed_block_yields_nothing() {
        assert_eq!(extract_commands("<pymol>a"), Vec::<String>::new());
    }

    #[test]
    fn empty_block_is_dropped() {
        assert_eq!(extract_commands("<pymol></pymol>"), Vec::<String>::new());
        assert_eq!(extract_commands("<pymol>   \n </pymol>"), Vec::<String>::new());
    }

    #[test]
    fn plain_text_yields_nothing() {
        assert_eq!(
            extract_commands("no commands here"),
            Vec::<String>::new()
        );
    }

    #[test]
    fn open_tag_pairs_with_nearest_close() {
        // Non-greedy: the first close tag ends the first block.
        let text = "<pymol>a</pymol><pymol>b</pymol>";
        assert_eq!(extract_commands(text), vec!["a", "b"]);
    }

    #[test]
    fn extraction_is_idempotent() {
        let text = "before <pymol>zoom chain A</pymol> after";
        let first = extract_commands(text);
        let second = extract_commands(text);
        assert_eq!(first, second);
        assert_eq!(first, vec!["zoom chain A"]);
    }
}
