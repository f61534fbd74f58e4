use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::{Regex, RegexBuilder};

use super::DigestError;
use crate::model::issue_update::MissingFields;

/// Text after this marker on the date line is commentary, e.g. `(Wednesday)`.
const DATE_MARKER: char = '(';
/// Issue templates leave `<!-- hint -->` comments after role labels.
const HINT_MARKER: &str = "<!--";
const PLACEHOLDERS: &[&str] = &["tbd", "tba", "?", "_none_", "n/a", "none"];

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%B %d, %Y %H:%M",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%B %d, %Y"];

// `### Timing`, `**Timing**`, `Timing:` as a heading line
const TIMING_HEADING: &str =
    r"^[ \t]*(?:#{1,6}[ \t]*|\*\*)?timing[ \t]*:?[ \t]*(?:\*\*)?[ \t]*:?[ \t]*\r?$";
const ROLE_LINE: &str =
    r"^[ \t]*(?:[-*][ \t]+)?(?:\*\*)?(leader|notetaker)(?:\*\*)?[ \t]*:(?:\*\*)?(.*)$";

fn timing_heading() -> Regex {
    RegexBuilder::new(TIMING_HEADING)
        .multi_line(true)
        .case_insensitive(true)
        .build()
        .expect("timing heading pattern is valid")
}

fn role_line() -> Regex {
    RegexBuilder::new(ROLE_LINE)
        .multi_line(true)
        .case_insensitive(true)
        .build()
        .expect("role line pattern is valid")
}

/// Find the session date in the body's Timing section.
pub fn extract_due_date(issue: u64, body: &str) -> Result<DateTime<Utc>, DigestError> {
    let heading = timing_heading()
        .find(body)
        .ok_or(DigestError::MissingDueDate { issue })?;

    let line = body[heading.end()..]
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .filter(|line| !line.starts_with('#'))
        .ok_or(DigestError::MissingDueDate { issue })?;

    let text = date_text(line);
    if text.is_empty() {
        return Err(DigestError::MissingDueDate { issue });
    }

    parse_due_date(text).ok_or_else(|| DigestError::UnparseableDueDate {
        issue,
        text: text.to_string(),
    })
}

fn date_text(line: &str) -> &str {
    let line = line.trim_start_matches(['-', '*']).trim_start();
    let line = strip_prefix_ignore_case(line, "date:").unwrap_or(line);
    let line = match line.find(DATE_MARKER) {
        Some(idx) => &line[..idx],
        None => line,
    };
    line.trim().trim_matches('*').trim()
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| s[prefix.len()..].trim_start())
}

fn parse_due_date(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    let text = text
        .strip_suffix("UTC")
        .or_else(|| text.strip_suffix('Z'))
        .map(str::trim_end)
        .unwrap_or(text);

    for fmt in DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(naive.and_utc());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    None
}

/// Which of the `Leader:` / `Notetaker:` lines are blank or absent.
pub fn extract_missing_fields(body: &str) -> MissingFields {
    let mut leader = None;
    let mut notetaker = None;

    for caps in role_line().captures_iter(body) {
        let filled = is_filled(&caps[2]);
        let slot = if caps[1].eq_ignore_ascii_case("leader") {
            &mut leader
        } else {
            &mut notetaker
        };
        // first labeled line wins
        slot.get_or_insert(filled);
    }

    MissingFields {
        leader: !leader.unwrap_or(false),
        notetaker: !notetaker.unwrap_or(false),
    }
}

fn is_filled(raw: &str) -> bool {
    let value = match raw.find(HINT_MARKER) {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    let value = value.trim().trim_matches('*').trim();
    !value.is_empty() && !PLACEHOLDERS.iter().any(|p| value.eq_ignore_ascii_case(p))
}
