//! Plain-text rendering of a week for chat style clients.

use crate::schedule::WeekSchedule;

/// Longest message most chat clients accept, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4000;

const SEPARATOR_WIDTH: usize = 29;
const EMPTY_WEEK: &str = "No classes this week";
const NO_CLASSROOM: &str = "Classroom not specified";

/// Renders lessons grouped under their date.
pub fn render_week(week: &WeekSchedule) -> String {
    let separator = "─".repeat(SEPARATOR_WIDTH);
    let mut lines: Vec<String> = Vec::new();
    let mut current_date: Option<String> = None;

    for lesson in week.iter() {
        let date = lesson.date.as_ref().map(|d| d.replace('\n', " "));
        if date != current_date {
            if let Some(date) = &date {
                lines.push(format!("◻ {date}"));
                lines.push(separator.clone());
            }
            current_date = date;
        }

        lines.push(lesson.time_range.clone());
        lines.push(lesson.discipline.clone());
        if let Some(url) = &lesson.webinar_url {
            lines.push(format!("Webinar: {url}"));
        }
        lines.push(
            lesson
                .classroom
                .clone()
                .unwrap_or_else(|| NO_CLASSROOM.to_string()),
        );
        lines.extend(lesson.teacher.clone());
        lines.extend(lesson.lesson_kind.clone());
        lines.push(separator.clone());
    }

    if lines.is_empty() {
        return EMPTY_WEEK.to_string();
    }
    lines.join("\n")
}

/// Splits `text` into chunks of at most `max_chars` characters.
///
/// Chunks end at the last newline inside the limit, or exactly at the limit
/// when the window has none. Continuation chunks drop their leading newlines.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut parts = Vec::new();
    let mut rest = text;

    loop {
        let Some((limit, _)) = rest.char_indices().nth(max_chars) else {
            parts.push(rest.to_string());
            break;
        };

        let split = rest[..limit]
            .rfind('\n')
            .filter(|&i| i > 0)
            .unwrap_or(limit);
        parts.push(rest[..split].to_string());

        rest = rest[split..].trim_start_matches('\n');
        if rest.is_empty() {
            break;
        }
    }

    parts
}
