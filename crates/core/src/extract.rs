use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::normalize::NormalizedText;
use crate::types::{ExtractedPayment, PaymentStatus};

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// Currency marker (textual or a glyph the engine confuses with ₹) directly
// before a numeral run. Zeros frequently come back as O/Q/o.
re!(re_amount_symbol,
    r"(?i)(?:Rs\.?|INR|[₹!ez(\{\[\]])\s?([0-9][OQo0-9]*(?:\.[0-9]{2})?)");
// Numeral run at end of line, preceded by a separator that may itself be a
// detached misread of the currency glyph (including a literal 7).
re!(re_amount_line_end,
    r"(?i)[\sze₹7]([0-9][OQo0-9]*(?:\.[0-9]{2})?)\s*[\])}]?$");
re!(re_amount_standalone,
    r"^([0-9][OQo0-9]*(?:\.[0-9]+)?)$");

re!(re_txn_primary,
    r"(?i)(?:txn|transaction|ref|utr|google\s+transaction)\s*(?:id|no\.?|number)?\s*[:\-]?\s*([A-Z0-9]{10,40})");
re!(re_digit_run, r"[0-9]+");

re!(re_upi_handle, r"[A-Za-z0-9._\-]+@[A-Za-z0-9]+");

re!(re_date_numeric, r"[0-9]{1,2}[/-][0-9]{1,2}[/-][0-9]{2,4}");
re!(re_date_textual,
    r"(?i)\b[0-9]{1,2}\s+(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\s+[0-9]{2,4}\b");

re!(re_receiver,
    r"(?i)(?:paid\s+to|to|payee|receiver)\s*[:\-]?\s*([A-Za-z0-9][A-Za-z0-9\s.]{2,60})");
re!(re_sender,
    r"(?i)(?:from|sender|debited\s+from|by)\s*[:\-]?\s*([A-Za-z0-9][A-Za-z0-9\s.]{2,60})");
// One stray 1–2 char token the engine tends to prepend before names.
re!(re_name_leading_junk, r"(?i)^[a-z0-9][\s.]+");
// Trailing token that looks like an amount, an identifier, a handle, or a
// status word.
re!(re_name_trailing_junk,
    r"(?i)[\s.\-(),]+([a-z0-9]*[0-9]+[a-z0-9()]*|[a-z0-9]|@[a-z0-9.]+|success\w*|failed\w*)$");

// ── Public extraction API ─────────────────────────────────────────────────────

pub struct Extractor;

impl Extractor {
    /// Run every field extractor over the shared normalized text. The
    /// extractors are independent and read-only; a field that nothing
    /// matched stays `None`. Pure function of its input.
    pub fn extract(text: &NormalizedText) -> ExtractedPayment {
        ExtractedPayment {
            amount: extract_amount(&text.lines),
            transaction_id: extract_transaction_id(&text.flat),
            upi_id: extract_upi_id(&text.flat),
            date: extract_date(&text.flat),
            sender_name: extract_sender_name(&text.flat),
            receiver_name: extract_receiver_name(&text.flat),
            status: extract_status(&text.flat),
        }
    }
}

// ── Amount ────────────────────────────────────────────────────────────────────

const AMOUNT_CONTEXT_KEYWORDS: [&str; 7] =
    ["paid", "payee", "to", "receiver", "amount", "total", "xxxx"];
// Standalone numbers that are almost certainly a year from the timestamp.
const YEAR_BLACKLIST: [f64; 5] = [2024.0, 2025.0, 2026.0, 2027.0, 2028.0];
const MAX_PLAUSIBLE_AMOUNT: f64 = 100_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AmountStrategy {
    SymbolAnchored,
    KeywordLineEnd,
    StandaloneLine,
}

/// A provisional value plus the strategy that produced it. Candidates are
/// pooled across strategies and reduced to at most one amount.
#[derive(Debug, Clone, Copy)]
struct AmountCandidate {
    value: f64,
    strategy: AmountStrategy,
}

impl AmountCandidate {
    /// Whether a leading 7 on the captured run should also be read as a fused
    /// misread of the currency glyph (true "50" rendered as "750"). The
    /// line-end strategy's separator class already consumes a detached
    /// misread glyph, so its captures are taken whole.
    fn wants_artifact_expansion(&self) -> bool {
        self.strategy != AmountStrategy::KeywordLineEnd
    }
}

fn extract_amount(lines: &[String]) -> Option<f64> {
    let mut pool = Vec::new();
    pool.extend(symbol_anchored_candidates(lines));
    pool.extend(keyword_line_end_candidates(lines));
    pool.extend(standalone_line_candidates(lines));
    select_amount(&pool)
}

/// Strategy 1: currency marker immediately followed by a numeral run.
fn symbol_anchored_candidates(lines: &[String]) -> Vec<AmountCandidate> {
    let mut out = Vec::new();
    for line in lines {
        let Some(caps) = re_amount_symbol().captures(line) else { continue };
        let Some(g) = caps.get(1) else { continue };
        let mut raw = g.as_str();
        // A digit right after the match means the two-decimal suffix grabbed
        // part of a longer run; fall back to the integer part.
        if next_char_is_digit(line, g.end()) {
            match raw.find('.') {
                Some(dot) => raw = &raw[..dot],
                None => continue,
            }
        }
        push_candidates(raw, AmountStrategy::SymbolAnchored, &mut out);
    }
    out
}

/// Strategy 2: numeral run anchored at line end, accepted only when the line
/// or the one just above it mentions a payment keyword.
fn keyword_line_end_candidates(lines: &[String]) -> Vec<AmountCandidate> {
    let mut out = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let Some(caps) = re_amount_line_end().captures(line) else { continue };
        let Some(g) = caps.get(1) else { continue };
        let current = line.to_lowercase();
        let previous = if i > 0 { lines[i - 1].to_lowercase() } else { String::new() };
        let in_context = AMOUNT_CONTEXT_KEYWORDS
            .iter()
            .any(|kw| current.contains(kw) || previous.contains(kw));
        if in_context {
            push_candidates(g.as_str(), AmountStrategy::KeywordLineEnd, &mut out);
        }
    }
    out
}

/// Strategy 3: a line that is nothing but a numeral run.
fn standalone_line_candidates(lines: &[String]) -> Vec<AmountCandidate> {
    let mut out = Vec::new();
    for line in lines {
        let Some(caps) = re_amount_standalone().captures(line) else { continue };
        let Some(g) = caps.get(1) else { continue };
        push_candidates(g.as_str(), AmountStrategy::StandaloneLine, &mut out);
    }
    out
}

/// Normalize a captured numeral run (zero-confusables substituted, thousands
/// separators removed) and add it to the pool, together with the leading-7
/// artifact reading where the strategy allows it.
fn push_candidates(raw: &str, strategy: AmountStrategy, pool: &mut Vec<AmountCandidate>) {
    let normalized: String = raw
        .chars()
        .filter(|c| *c != ',')
        .map(|c| if matches!(c, 'O' | 'Q' | 'o') { '0' } else { c })
        .collect();
    if let Some(value) = parse_numeral(&normalized) {
        let candidate = AmountCandidate { value, strategy };
        pool.push(candidate);
        if candidate.wants_artifact_expansion()
            && normalized.len() > 1
            && normalized.starts_with('7')
        {
            if let Some(rest) = parse_numeral(&normalized[1..]) {
                if rest > 0.0 {
                    pool.push(AmountCandidate { value: rest, strategy });
                }
            }
        }
    }
}

fn parse_numeral(s: &str) -> Option<f64> {
    Decimal::from_str(s).ok()?.to_f64()
}

/// Reduce the pool: keep plausible values, prefer the largest whose integer
/// part does not begin with 7, else the largest overall. Kept exactly as
/// tuned — see DESIGN.md.
fn select_amount(pool: &[AmountCandidate]) -> Option<f64> {
    let plausible: Vec<f64> = pool
        .iter()
        .map(|c| c.value)
        .filter(|v| *v > 0.0 && *v < MAX_PLAUSIBLE_AMOUNT && !YEAR_BLACKLIST.contains(v))
        .collect();
    let non_seven: Vec<f64> = plausible
        .iter()
        .copied()
        .filter(|v| !(*v as i64).to_string().starts_with('7'))
        .collect();
    let max_of = |vs: &[f64]| vs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !non_seven.is_empty() {
        Some(max_of(&non_seven))
    } else if !plausible.is_empty() {
        Some(max_of(&plausible))
    } else {
        None
    }
}

fn next_char_is_digit(s: &str, idx: usize) -> bool {
    s.as_bytes().get(idx).is_some_and(|b| b.is_ascii_digit())
}

// ── Transaction identifier ────────────────────────────────────────────────────

const ID_STOPWORDS: [&str; 6] =
    ["successful", "completed", "failed", "success", "pending", "details"];

fn extract_transaction_id(flat: &str) -> Option<String> {
    if let Some(caps) = re_txn_primary().captures(flat) {
        if let Some(g) = caps.get(1) {
            let id = g.as_str();
            // Keyword followed by a status word is a false positive, e.g.
            // "Transaction Successful".
            if !ID_STOPWORDS.contains(&id.to_lowercase().as_str()) {
                return Some(id.to_string());
            }
        }
    }
    fallback_transaction_id(flat)
}

/// Positional fallback: a T-prefixed run of 15–40 digits, or an exactly
/// 12-digit run, neither embedded in a longer digit run. Leftmost wins.
/// Can collide with phone numbers or one-time codes; no disambiguation is
/// attempted.
fn fallback_transaction_id(flat: &str) -> Option<String> {
    let bytes = flat.as_bytes();
    for m in re_digit_run().find_iter(flat) {
        let len = m.end() - m.start();
        if m.start() > 0 && bytes[m.start() - 1] == b'T' && (15..=40).contains(&len) {
            let t_start = m.start() - 1;
            if t_start == 0 || !bytes[t_start - 1].is_ascii_digit() {
                return Some(flat[t_start..m.end()].to_string());
            }
        }
        // Digit runs are maximal, so an exact-12 run has non-digit bounds.
        if len == 12 {
            return Some(m.as_str().to_string());
        }
    }
    None
}

// ── UPI handle ────────────────────────────────────────────────────────────────

fn extract_upi_id(flat: &str) -> Option<String> {
    // local-part@provider; handles are not domain names, so no dot required
    // after the @.
    re_upi_handle().find(flat).map(|m| m.as_str().to_string())
}

// ── Date ──────────────────────────────────────────────────────────────────────

/// The matched substring is kept verbatim — no reformatting.
fn extract_date(flat: &str) -> Option<String> {
    let bytes = flat.as_bytes();
    for m in re_date_numeric().find_iter(flat) {
        let clean_before = m.start() == 0 || !bytes[m.start() - 1].is_ascii_digit();
        let clean_after = !next_char_is_digit(flat, m.end());
        if clean_before && clean_after {
            return Some(m.as_str().to_string());
        }
    }
    re_date_textual().find(flat).map(|m| m.as_str().to_string())
}

// ── Names ─────────────────────────────────────────────────────────────────────

const NAME_STOPWORDS: [&str; 8] =
    ["successful", "success", "completed", "details", "paid", "to", "payee", "by"];
const NAME_TRIM_PASSES: usize = 5;

fn extract_receiver_name(flat: &str) -> Option<String> {
    let caps = re_receiver().captures(flat)?;
    clean_name(caps.get(1)?.as_str())
}

fn extract_sender_name(flat: &str) -> Option<String> {
    let caps = re_sender().captures(flat)?;
    clean_name(caps.get(1)?.as_str())
}

/// Scrub a raw name capture: drop one leading stray glyph, peel trailing
/// amount/identifier/handle/status tokens (bounded passes, stopping early at
/// a fixed point), then remove standalone status words. `None` when nothing
/// survives.
fn clean_name(raw: &str) -> Option<String> {
    let mut name = re_name_leading_junk().replace(raw, "").into_owned();
    for _ in 0..NAME_TRIM_PASSES {
        let trimmed = re_name_trailing_junk().replace(&name, "").into_owned();
        if trimmed == name {
            break;
        }
        name = trimmed;
    }
    let kept: Vec<&str> = name
        .split_whitespace()
        .filter(|w| !NAME_STOPWORDS.contains(&w.to_lowercase().as_str()))
        .collect();
    let cleaned = kept.join(" ");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

// ── Status ────────────────────────────────────────────────────────────────────

const SUCCESS_KEYWORDS: [&str; 4] = ["success", "completed", "successful", "sent"];

fn extract_status(flat: &str) -> Option<PaymentStatus> {
    let lower = flat.to_lowercase();
    if SUCCESS_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        Some(PaymentStatus::Success)
    } else if lower.contains("failed") {
        Some(PaymentStatus::Failed)
    } else {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(raw: &str) -> NormalizedText {
        NormalizedText::from_raw(raw)
    }

    fn lines(ls: &[&str]) -> Vec<String> {
        ls.iter().map(|s| s.to_string()).collect()
    }

    // ── Amount ────────────────────────────────────────────────────────────────

    #[test]
    fn amount_currency_marker_is_taken_verbatim() {
        assert_eq!(extract_amount(&lines(&["Amount: Rs 499.99"])), Some(499.99));
        assert_eq!(extract_amount(&lines(&["Rs. 4999.50"])), Some(4999.5));
        assert_eq!(extract_amount(&lines(&["Total INR 1200"])), Some(1200.0));
        assert_eq!(extract_amount(&lines(&["₹ 150"])), Some(150.0));
    }

    #[test]
    fn amount_glyph_misreads_anchor_a_candidate() {
        assert_eq!(extract_amount(&lines(&["{500"])), Some(500.0));
        assert_eq!(extract_amount(&lines(&["z500 paid"])), Some(500.0));
    }

    #[test]
    fn amount_zero_confusable_letters_are_substituted() {
        assert_eq!(extract_amount(&lines(&["Rs 5OO"])), Some(500.0));
        assert_eq!(extract_amount(&lines(&["Rs 1O0.50"])), Some(100.5));
    }

    #[test]
    fn amount_leading_seven_artifact_prefers_corrected_value() {
        // ₹50 fused into "750" by the misread glyph: both readings enter the
        // pool and the non-7-prefixed one wins.
        assert_eq!(extract_amount(&lines(&["Rs 750"])), Some(50.0));
        assert_eq!(extract_amount(&lines(&["750"])), Some(50.0));
    }

    #[test]
    fn amount_keyword_context_gates_line_end_numerals() {
        assert_eq!(extract_amount(&lines(&["Amount", "account 450"])), Some(450.0));
        assert_eq!(extract_amount(&lines(&["random thing", "account 450"])), None);
    }

    #[test]
    fn amount_prefers_maximum_plausible_value() {
        assert_eq!(extract_amount(&lines(&["Rs 120", "Rs 4500"])), Some(4500.0));
    }

    #[test]
    fn amount_rejects_calendar_years_and_out_of_range_values() {
        assert_eq!(extract_amount(&lines(&["2024"])), None);
        assert_eq!(extract_amount(&lines(&["2026"])), None);
        assert_eq!(extract_amount(&lines(&["2028"])), None);
        assert_eq!(extract_amount(&lines(&["Rs 123456"])), None);
        assert_eq!(extract_amount(&lines(&["Rs 2026"])), None);
    }

    #[test]
    fn amount_absent_when_no_numerals() {
        assert_eq!(extract_amount(&lines(&["hello world"])), None);
        assert_eq!(extract_amount(&[]), None);
    }

    #[test]
    fn line_end_captures_are_not_artifact_expanded() {
        let ls = lines(&["Paid to", "shop 750"]);
        let pool = keyword_line_end_candidates(&ls);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].value, 750.0);
        assert_eq!(pool[0].strategy, AmountStrategy::KeywordLineEnd);
    }

    #[test]
    fn symbol_captures_are_artifact_expanded() {
        let pool = symbol_anchored_candidates(&lines(&["Rs 750"]));
        let values: Vec<f64> = pool.iter().map(|c| c.value).collect();
        assert_eq!(values, vec![750.0, 50.0]);
        assert!(pool.iter().all(|c| c.strategy == AmountStrategy::SymbolAnchored));
    }

    // ── Transaction identifier ────────────────────────────────────────────────

    #[test]
    fn transaction_id_keyword_anchored() {
        assert_eq!(
            extract_transaction_id("Transaction ID: T123456789012"),
            Some("T123456789012".to_string())
        );
        assert_eq!(
            extract_transaction_id("UTR: 403993577348"),
            Some("403993577348".to_string())
        );
    }

    #[test]
    fn transaction_id_status_word_is_rejected_then_fallback_applies() {
        assert_eq!(
            extract_transaction_id("Transaction Successful ref 123456789012 thanks"),
            Some("123456789012".to_string())
        );
        assert_eq!(extract_transaction_id("Transaction Successful"), None);
    }

    #[test]
    fn transaction_id_fallback_t_prefixed_run() {
        assert_eq!(
            extract_transaction_id("screenshot shows T123456789012345 only"),
            Some("T123456789012345".to_string())
        );
    }

    #[test]
    fn transaction_id_fallback_requires_exact_twelve_digits() {
        assert_eq!(extract_transaction_id("code 1234567890123 end"), None);
        assert_eq!(
            extract_transaction_id("code 123456789012 end"),
            Some("123456789012".to_string())
        );
    }

    #[test]
    fn transaction_id_too_short_capture_is_ignored() {
        assert_eq!(extract_transaction_id("txn id: ABC123"), None);
    }

    // ── UPI handle ────────────────────────────────────────────────────────────

    #[test]
    fn upi_handle_first_match_wins() {
        assert_eq!(extract_upi_id("upi id: johndoe@upi"), Some("johndoe@upi".to_string()));
        assert_eq!(
            extract_upi_id("a.b-c_1@okaxis then other@ybl"),
            Some("a.b-c_1@okaxis".to_string())
        );
        assert_eq!(extract_upi_id("no handle here"), None);
    }

    // ── Date ──────────────────────────────────────────────────────────────────

    #[test]
    fn date_numeric_kept_verbatim() {
        assert_eq!(extract_date("Date: 23/02/2026"), Some("23/02/2026".to_string()));
        assert_eq!(extract_date("sent on 5/3/26 ok"), Some("5/3/26".to_string()));
        assert_eq!(extract_date("paid 21-02-2026"), Some("21-02-2026".to_string()));
    }

    #[test]
    fn date_numeric_must_not_extend_a_digit_run() {
        // "23/02/20261" is a longer run, not a date.
        assert_eq!(extract_date("ref 23/02/20261 x"), None);
    }

    #[test]
    fn date_textual_fallback() {
        assert_eq!(extract_date("on 21 Feb 2026 at 4pm"), Some("21 Feb 2026".to_string()));
        assert_eq!(
            extract_date("on 3 September 2025"),
            Some("3 September 2025".to_string())
        );
        assert_eq!(extract_date("no date at all"), None);
    }

    // ── Names ─────────────────────────────────────────────────────────────────

    #[test]
    fn receiver_name_basic() {
        assert_eq!(
            extract_receiver_name("Paid to John Doe"),
            Some("John Doe".to_string())
        );
    }

    #[test]
    fn sender_name_debited_from() {
        assert_eq!(
            extract_sender_name("Debited from HDFC Bank 1234"),
            Some("HDFC Bank".to_string())
        );
    }

    #[test]
    fn name_leading_stray_glyph_is_stripped() {
        assert_eq!(
            extract_receiver_name("Paid to q. Ramesh"),
            Some("Ramesh".to_string())
        );
    }

    #[test]
    fn name_trailing_ids_and_amounts_are_peeled() {
        assert_eq!(
            extract_receiver_name("Paid to Ramesh 750 UPI12345"),
            Some("Ramesh".to_string())
        );
    }

    #[test]
    fn name_status_words_are_dropped() {
        assert_eq!(
            extract_receiver_name("Payee Successful Ramesh Kumar"),
            Some("Ramesh Kumar".to_string())
        );
    }

    #[test]
    fn name_trailing_trim_is_capped_at_five_passes() {
        assert_eq!(
            extract_receiver_name("Paid to Anil 1 2 3 4 5 6"),
            Some("Anil 1".to_string())
        );
    }

    #[test]
    fn name_empty_after_cleaning_is_absent() {
        assert_eq!(extract_receiver_name("Paid to successful"), None);
    }

    // ── Status ────────────────────────────────────────────────────────────────

    #[test]
    fn status_keywords() {
        assert_eq!(extract_status("Payment Successful"), Some(PaymentStatus::Success));
        assert_eq!(extract_status("amount sent to Ramesh"), Some(PaymentStatus::Success));
        assert_eq!(extract_status("Payment Failed"), Some(PaymentStatus::Failed));
        assert_eq!(extract_status("hello world"), None);
    }

    // ── Whole-text extraction ─────────────────────────────────────────────────

    #[test]
    fn full_screenshot_text_extracts_every_field() {
        let text = norm(
            "Payment Successful\nTransaction ID: T123456789012\nAmount: Rs 500.00\n\
             Date: 23/02/2026\nupi id: johndoe@upi\nPaid to John Doe",
        );
        let p = Extractor::extract(&text);
        assert_eq!(p.amount, Some(500.0));
        assert_eq!(p.transaction_id.as_deref(), Some("T123456789012"));
        assert_eq!(p.upi_id.as_deref(), Some("johndoe@upi"));
        assert_eq!(p.date.as_deref(), Some("23/02/2026"));
        assert_eq!(p.receiver_name.as_deref(), Some("John Doe"));
        assert_eq!(p.sender_name, None);
        assert_eq!(p.status, Some(PaymentStatus::Success));
    }

    #[test]
    fn phonepe_screenshot_with_fused_glyph_artifact() {
        let text = norm(
            "Transaction Successful\n04:42 pm on 21 Feb 2026\nPaid to\n\
             e Ganga pan shop 750\nQ122785393@ybl",
        );
        let p = Extractor::extract(&text);
        // The line-end capture stands alone in the pool, so the maximum of
        // the full plausible pool applies.
        assert_eq!(p.amount, Some(750.0));
        assert_eq!(p.receiver_name.as_deref(), Some("Ganga pan shop"));
        assert_eq!(p.upi_id.as_deref(), Some("Q122785393@ybl"));
        assert_eq!(p.date.as_deref(), Some("21 Feb 2026"));
        assert_eq!(p.transaction_id, None);
        assert_eq!(p.sender_name, None);
        assert_eq!(p.status, Some(PaymentStatus::Success));
    }

    #[test]
    fn extraction_is_idempotent() {
        let text = norm("Paid to Asha Stores\nRs 240\nfailed");
        assert_eq!(Extractor::extract(&text), Extractor::extract(&text));
    }

    #[test]
    fn garbage_input_extracts_nothing() {
        let p = Extractor::extract(&norm("!@#$%^&*\u{0}\u{1}\n\n"));
        assert!(p.is_empty());
    }
}
