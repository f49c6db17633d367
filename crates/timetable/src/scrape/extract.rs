//! Week extraction: reads the active week table into lesson records.

use super::selectors::{
    ACTIVE_WEEK_TABLE, CELL_SELECTOR, CLASSROOM_CELL, DATE_CELL, DISCIPLINE_CELL, KIND_CELL,
    LINK_SELECTOR, ROW_SELECTOR, TEACHER_CELL, TIME_CELL,
};
use crate::browser::{wait_for_element, BrowserError, PageDriver};
use crate::schedule::{DisciplineCell, RawRow, WeekSchedule};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Elements that start a new rendered line, besides `<br>`.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "blockquote", "dd", "div", "dl", "dt", "footer", "h1", "h2", "h3",
    "h4", "h5", "h6", "header", "hr", "li", "ol", "p", "pre", "section", "table", "tr", "ul",
];

/// Reads the currently displayed week.
///
/// A table that never renders within `wait` yields an empty week: holiday
/// weeks and the end of term look exactly like that. Relative links are
/// resolved against `page_url`.
pub async fn extract_active_week(
    driver: &mut dyn PageDriver,
    wait: Duration,
    page_url: &Url,
) -> Result<WeekSchedule, BrowserError> {
    let table = match wait_for_element(driver, ACTIVE_WEEK_TABLE, wait).await {
        Ok(table) => table,
        Err(BrowserError::Timeout { waited_ms, .. }) => {
            warn!(waited_ms, "Active week table not found, treating week as empty");
            return Ok(WeekSchedule::default());
        }
        Err(e) => return Err(e),
    };

    let html = match driver.outer_html(&table).await {
        Ok(html) => html,
        // Carousel swapped the table out between lookup and read
        Err(BrowserError::NoSuchElement(message)) => {
            warn!(message = %message, "Active week table went stale, treating week as empty");
            return Ok(WeekSchedule::default());
        }
        Err(e) => return Err(e),
    };

    Ok(parse_week_table(&html, page_url))
}

/// Parses a table snapshot into a week.
pub fn parse_week_table(html: &str, page_url: &Url) -> WeekSchedule {
    let fragment = Html::parse_fragment(html);
    let rows = fragment.select(&ROW_SELECTOR).filter_map(|row| {
        let raw = read_row(&row, page_url);
        if raw.is_none() {
            debug!("Skipping table row without cells");
        }
        raw
    });

    WeekSchedule::from_rows(rows)
}

/// Reads the labelled cells of one row. Rows without any cell are layout
/// artefacts and yield `None`.
fn read_row(row: &ElementRef, page_url: &Url) -> Option<RawRow> {
    row.select(&CELL_SELECTOR).next()?;

    let discipline = row.select(&DISCIPLINE_CELL).next().map(|cell| DisciplineCell {
        text: cell_text(&cell),
        link: cell
            .select(&LINK_SELECTOR)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|href| resolve_link(page_url, href)),
    });

    Some(RawRow {
        date: cell_by(row, &DATE_CELL),
        time: cell_by(row, &TIME_CELL),
        discipline,
        classroom: cell_by(row, &CLASSROOM_CELL),
        teacher: cell_by(row, &TEACHER_CELL),
        kind: cell_by(row, &KIND_CELL),
    })
}

/// Absolute form of `href`, the way the browser reports a link target.
/// Unresolvable values are kept verbatim.
fn resolve_link(page_url: &Url, href: &str) -> String {
    let href = href.trim();
    match page_url.join(href) {
        Ok(url) => url.into(),
        Err(_) => href.to_string(),
    }
}

fn cell_by(row: &ElementRef, selector: &Selector) -> Option<String> {
    row.select(selector).next().map(|cell| cell_text(&cell))
}

/// Rendered text of a cell, one entry per visual line.
///
/// Lines break at `<br>` and around block elements only; inline markup is
/// joined into its line with whitespace collapsed.
fn cell_text(cell: &ElementRef) -> String {
    let mut lines = LineBuffer::default();
    collect_lines(cell, &mut lines);
    lines.finish()
}

fn collect_lines(element: &ElementRef, lines: &mut LineBuffer) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            lines.push_text(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            let name = child.value().name();
            if name == "br" {
                lines.break_line();
            } else if BLOCK_ELEMENTS.contains(&name) {
                lines.break_line();
                collect_lines(&child, lines);
                lines.break_line();
            } else {
                collect_lines(&child, lines);
            }
        }
    }
}

#[derive(Default)]
struct LineBuffer {
    lines: Vec<String>,
    current: String,
}

impl LineBuffer {
    fn push_text(&mut self, text: &str) {
        self.current.push_str(text);
    }

    fn break_line(&mut self) {
        let line = self.current.split_whitespace().collect::<Vec<_>>().join(" ");
        if !line.is_empty() {
            self.lines.push(line);
        }
        self.current.clear();
    }

    fn finish(mut self) -> String {
        self.break_line();
        self.lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::{week_table, FakePage, FakeSite};
    use crate::scrape::TIMETABLE_URL;

    fn page_url() -> Url {
        Url::parse(TIMETABLE_URL).unwrap()
    }

    const TABLE: &str = r#"
        <table class="table table-no-transform">
          <thead><tr><th>Дата</th><th>Время</th><th>Дисциплина</th></tr></thead>
          <tbody>
            <tr>
              <td data-th="Дата" rowspan="3">Понедельник<br>01.09.2025</td>
              <td data-th="Время">09:00 - 10:30</td>
              <td data-th="Дисциплина">Математика<br><span>Лекция, поток 1</span>
                <a href="https://webinar.vvsu.ru/room/77">вебинар</a></td>
              <td data-th="Аудитория">1412</td>
              <td data-th="Преподаватель">Иванов И.И.</td>
              <td data-th="Занятие">Лекция</td>
            </tr>
            <tr>
              <td data-th="Время">10:40 - 12:10</td>
              <td data-th="Дисциплина">Программирование</td>
              <td data-th="Аудитория"></td>
              <td data-th="Преподаватель">Петров П.П.</td>
              <td data-th="Занятие">Практика</td>
            </tr>
            <tr class="spacer"><td colspan="5"></td></tr>
            <tr></tr>
            <tr>
              <td data-th="Дата" rowspan="1">Вторник<br>02.09.2025</td>
              <td data-th="Время">13:00 - 14:30</td>
              <td data-th="Дисциплина">История</td>
            </tr>
          </tbody>
        </table>"#;

    #[test]
    fn test_parse_week_table() {
        let week = parse_week_table(TABLE, &page_url());
        assert_eq!(week.len(), 3);

        let first = &week.lessons[0];
        assert_eq!(first.date.as_deref(), Some("Понедельник\n01.09.2025"));
        assert_eq!(first.time_range, "09:00 - 10:30");
        assert_eq!(first.discipline, "Математика");
        assert_eq!(first.webinar_url.as_deref(), Some("https://webinar.vvsu.ru/room/77"));
        assert_eq!(first.classroom.as_deref(), Some("1412"));
        assert_eq!(first.lesson_kind.as_deref(), Some("Лекция"));

        let second = &week.lessons[1];
        assert_eq!(second.date, first.date);
        assert_eq!(second.classroom, None);
        assert_eq!(second.webinar_url, None);
        assert_eq!(second.teacher.as_deref(), Some("Петров П.П."));

        let third = &week.lessons[2];
        assert_eq!(third.date.as_deref(), Some("Вторник\n02.09.2025"));
        assert_eq!(third.teacher, None);
    }

    #[test]
    fn test_inline_markup_stays_on_its_line() {
        let html = r#"
            <table><tbody><tr>
              <td data-th="Время">09:00 - 10:30</td>
              <td data-th="Дисциплина">Основы <b>ИИ</b><br><i>Лекция</i>,
                <span>поток</span> 2<div>Онлайн</div></td>
              <td data-th="Преподаватель">Иванов <b>И.И.</b></td>
            </tr></tbody></table>"#;

        let week = parse_week_table(html, &page_url());
        let lesson = &week.lessons[0];
        assert_eq!(lesson.discipline, "Основы ИИ");
        assert_eq!(lesson.teacher.as_deref(), Some("Иванов И.И."));

        let fragment = Html::parse_fragment(html);
        let cell = fragment.select(&DISCIPLINE_CELL).next().unwrap();
        assert_eq!(cell_text(&cell), "Основы ИИ\nЛекция, поток 2\nОнлайн");
    }

    #[test]
    fn test_relative_webinar_link_is_resolved() {
        let html = r#"
            <table><tbody>
              <tr><td data-th="Время">09:00</td>
                <td data-th="Дисциплина">Физика <a href="/webinar/5">вебинар</a></td></tr>
              <tr><td data-th="Время">11:00</td>
                <td data-th="Дисциплина">Химия <a href="room?id=7">вебинар</a></td></tr>
              <tr><td data-th="Время">13:00</td>
                <td data-th="Дисциплина">Право <a href="https://meet.example.org/x">вебинар</a></td></tr>
            </tbody></table>"#;

        let week = parse_week_table(html, &page_url());
        let links: Vec<_> = week.iter().map(|l| l.webinar_url.as_deref()).collect();
        assert_eq!(
            links,
            vec![
                Some("https://www.vvsu.ru/webinar/5"),
                Some("https://www.vvsu.ru/timetable/room?id=7"),
                Some("https://meet.example.org/x"),
            ]
        );
    }

    #[test]
    fn test_header_only_table_is_empty_week() {
        let week = parse_week_table(
            "<table><thead><tr><th>Дата</th></tr></thead><tbody></tbody></table>",
            &page_url(),
        );
        assert!(week.is_empty());
    }

    #[tokio::test]
    async fn test_extract_reads_active_table() {
        let site = FakeSite {
            weeks: vec![Some(week_table(&[("Пн", &[("09:00", "Math"), ("11:00", "CS")])]))],
            ..Default::default()
        };
        let mut page = FakePage::new(site).with_group_selected();

        let week = extract_active_week(&mut page, Duration::from_millis(50), &page_url())
            .await
            .unwrap();
        assert_eq!(week.len(), 2);
        assert!(week.iter().all(|l| l.date.as_deref() == Some("Пн")));
    }

    #[tokio::test]
    async fn test_missing_table_is_empty_week() {
        let site = FakeSite {
            weeks: vec![None],
            ..Default::default()
        };
        let mut page = FakePage::new(site).with_group_selected();

        let week = extract_active_week(&mut page, Duration::from_millis(30), &page_url())
            .await
            .unwrap();
        assert!(week.is_empty());
    }
}
