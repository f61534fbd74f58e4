use crate::model::issue_update::IssueUpdate;
use crate::util::html::escape;

const WARNING: &str = "⚠️";

/// Why an issue shows up in the digest, most urgent first.
pub fn reason(update: &IssueUpdate) -> Option<&'static str> {
    let fields = &update.missing_fields;
    let updates = &update.missing_updates;

    if update.high_priority && fields.leader {
        if fields.notetaker {
            Some("Needs a leader and a notetaker to volunteer")
        } else {
            Some("Needs a leader to volunteer")
        }
    } else if update.high_priority && fields.notetaker {
        Some("Needs a notetaker to volunteer")
    } else if updates.needs_notes() {
        Some("Needs notes")
    } else if updates.needs_recording() {
        Some("Needs a recording")
    } else {
        None
    }
}

pub fn format_update(update: &IssueUpdate) -> String {
    let prefix = if update.high_priority {
        format!("{WARNING} Tomorrow's ")
    } else {
        String::new()
    };
    let link = format!(
        "<a href=\"{}\">{}</a>",
        escape(&update.url),
        escape(&update.title)
    );

    match reason(update) {
        Some(reason) => format!("{prefix}{link}: {reason}"),
        None => format!("{prefix}{link}"),
    }
}

/// One `<li>` per update, newline separated. No updates, no output.
pub fn render_digest(updates: &[IssueUpdate]) -> String {
    updates
        .iter()
        .map(|u| format!("<li>{}</li>", format_update(u)))
        .collect::<Vec<_>>()
        .join("\n")
}
