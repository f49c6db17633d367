//! Selectors for the timetable page.

use scraper::Selector;
use std::sync::LazyLock;

/// Free-text group search box.
pub const GROUP_INPUT: &str = "input#gr";

/// Suggestions rendered under the search box are plain buttons.
pub const SUGGESTION: &str = "button";

/// Table of the week currently shown by the carousel.
pub const ACTIVE_WEEK_TABLE: &str = "div.carousel-item.active table.table-no-transform";

pub const NEXT_WEEK: &str = "button.arrow-button.right[data-bs-slide='next']";
pub const PREVIOUS_WEEK: &str = "button.arrow-button.left[data-bs-slide='prev']";

// Static selectors for parsing a table snapshot - compiled once
pub(crate) static ROW_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tbody tr").unwrap());
pub(crate) static CELL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").unwrap());
pub(crate) static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").unwrap());

// Cells are labelled through `data-th` for the responsive layout
pub(crate) static DATE_CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td[data-th='Дата']").unwrap());
pub(crate) static TIME_CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td[data-th='Время']").unwrap());
pub(crate) static DISCIPLINE_CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td[data-th='Дисциплина']").unwrap());
pub(crate) static CLASSROOM_CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td[data-th='Аудитория']").unwrap());
pub(crate) static TEACHER_CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td[data-th='Преподаватель']").unwrap());
pub(crate) static KIND_CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td[data-th='Занятие']").unwrap());
