/// Prefixes the trailing list of suggested replies.
pub const CHIPS_MARKER: &str = "__CHIPS__:";
/// Separates individual suggestions inside the chip section.
pub const CHIP_DELIMITER: char = '|';
/// Marks the concluding turn of the advice phase.
pub const FINAL_MARKER: &str = "[Final Analysis]";

/// A model reply with its in-band markers stripped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedReply {
    pub body: String,
    pub chips: Vec<String>,
    pub is_final: bool,
}

/// Splits a raw reply into its displayable body and suggestion chips.
///
/// Never fails: a reply without markers is returned as a trimmed body with
/// no chips. A final reply never carries chips.
pub fn parse(raw: &str) -> ParsedReply {
    let (candidate, mut chips) = match raw.split_once(CHIPS_MARKER) {
        Some((before, after)) => (before.trim(), split_chips(after)),
        None => (raw.trim(), Vec::new()),
    };

    if candidate.contains(FINAL_MARKER) {
        chips.clear();
        return ParsedReply {
            body: candidate.replacen(FINAL_MARKER, "", 1).trim().to_string(),
            chips,
            is_final: true,
        };
    }

    ParsedReply { body: candidate.to_string(), chips, is_final: false }
}

fn split_chips(section: &str) -> Vec<String> {
    section
        .split(CHIP_DELIMITER)
        .map(str::trim)
        .filter(|chip| !chip.is_empty())
        .map(String::from)
        .collect()
}
