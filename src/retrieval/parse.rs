//! Best-effort parsing of free-form model output

use regex::Regex;
use std::sync::LazyLock;

static RESULT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<result>(.*?)</result>").expect("valid sentinel pattern"));

/// Extract the payload between `<result>` sentinels.
///
/// Falls back to the whole response when the sentinels are missing. The
/// returned text is always trimmed.
pub fn extract_result(raw: &str) -> String {
    match RESULT_TAG.captures(raw).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim().to_string(),
        None => raw.trim().to_string(),
    }
}

/// Parse query-fusion output into at most `limit` variant queries.
///
/// Bullet markers and surrounding whitespace are stripped, blank lines dropped
/// and lines equal to `base_question` (ignoring case) discarded. Duplicates
/// among the remaining lines are kept.
pub fn parse_variants(raw: &str, base_question: &str, limit: usize) -> Vec<String> {
    let base = base_question.trim().to_lowercase();

    raw.lines()
        .map(strip_bullet)
        .filter(|line| !line.is_empty())
        .filter(|line| line.to_lowercase() != base)
        .take(limit)
        .map(str::to_string)
        .collect()
}

fn strip_bullet(line: &str) -> &str {
    line.trim_matches(|c: char| c == '-' || c == '*' || c == '•' || c.is_whitespace())
}
