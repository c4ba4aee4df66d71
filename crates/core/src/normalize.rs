/// Normalized view of raw recognition output: the cleaned line sequence plus
/// a single flattened string for whole-text pattern search.
///
/// Line order is significant — the amount extractor's keyword-context
/// strategy looks at the immediately preceding line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    /// Trimmed, non-empty lines in recognition order.
    pub lines: Vec<String>,
    /// `lines` joined by single spaces.
    pub flat: String,
}

impl NormalizedText {
    /// Strip junk characters and split into trimmed non-empty lines.
    ///
    /// Keeps printable ASCII, tab/CR/LF, and the rupee glyph (the engine may
    /// legitimately emit it); each maximal run of anything else collapses to
    /// one space. Total function — never fails, empty input gives no lines.
    pub fn from_raw(raw: &str) -> Self {
        let mut clean = String::with_capacity(raw.len());
        let mut in_junk = false;
        for c in raw.chars() {
            let keep = matches!(c, '\t' | '\r' | '\n' | '\u{20B9}') || (' '..='~').contains(&c);
            if keep {
                if in_junk {
                    clean.push(' ');
                    in_junk = false;
                }
                clean.push(c);
            } else {
                in_junk = true;
            }
        }

        let lines: Vec<String> = clean
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        let flat = lines.join(" ");
        Self { lines, flat }
    }
}
