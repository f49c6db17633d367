//! Row normalization: raw table cells to lesson records.

use super::{LessonRecord, WeekSchedule};

/// Text and link of the discipline cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisciplineCell {
    /// Cell text, one line per rendered text block
    pub text: String,
    /// Target of the first hyperlink inside the cell
    pub link: Option<String>,
}

/// Cell contents of one table row, by logical column.
///
/// `None` means the row has no such cell at all (e.g. the date cell of a row
/// covered by a previous row's `rowspan`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub date: Option<String>,
    pub time: Option<String>,
    pub discipline: Option<DisciplineCell>,
    pub classroom: Option<String>,
    pub teacher: Option<String>,
    pub kind: Option<String>,
}

/// Result of normalizing a single row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    Lesson(LessonRecord),
    /// Spacer or separator row. Still carries the date forward.
    Skip { carried_date: Option<String> },
}

impl Normalized {
    /// Date to hand to the next row of the same table.
    pub fn carried_date(&self) -> Option<&str> {
        match self {
            Normalized::Lesson(lesson) => lesson.date.as_deref(),
            Normalized::Skip { carried_date } => carried_date.as_deref(),
        }
    }
}

/// Converts one row into a lesson, given the date carried from earlier rows.
pub fn normalize_row(row: &RawRow, previous_date: Option<&str>) -> Normalized {
    let date = non_empty(row.date.as_deref()).or_else(|| previous_date.map(str::to_string));

    let Some(time_range) = non_empty(row.time.as_deref()) else {
        return Normalized::Skip { carried_date: date };
    };

    let (discipline, webinar_url) = match &row.discipline {
        Some(cell) => (
            first_line(&cell.text),
            cell.link
                .as_deref()
                .map(str::trim)
                .filter(|link| !link.is_empty())
                .map(str::to_string),
        ),
        None => (String::new(), None),
    };

    Normalized::Lesson(LessonRecord {
        date,
        time_range,
        discipline,
        webinar_url,
        classroom: non_empty(row.classroom.as_deref()),
        teacher: non_empty(row.teacher.as_deref()),
        lesson_kind: non_empty(row.kind.as_deref()),
    })
}

impl WeekSchedule {
    /// Normalizes rows top to bottom, threading the carried date between them.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = RawRow>,
    {
        let mut carried: Option<String> = None;
        let mut lessons = Vec::new();

        for row in rows {
            match normalize_row(&row, carried.as_deref()) {
                Normalized::Lesson(lesson) => {
                    carried = lesson.date.clone();
                    lessons.push(lesson);
                }
                Normalized::Skip { carried_date } => carried = carried_date,
            }
        }

        WeekSchedule::new(lessons)
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Multi-line discipline cells append metadata after the first line.
fn first_line(text: &str) -> String {
    text.trim().lines().next().unwrap_or_default().trim().to_string()
}
