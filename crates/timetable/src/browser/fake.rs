//! Scripted in-memory page used by the scraper tests.

use super::{BrowserError, BrowserLauncher, Element, PageDriver};
use crate::scrape::selectors::{
    ACTIVE_WEEK_TABLE, GROUP_INPUT, NEXT_WEEK, PREVIOUS_WEEK, SUGGESTION,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const INPUT_ID: &str = "group-input";
const TABLE_ID: &str = "week-table";
const NEXT_ID: &str = "next-week";
const PREV_ID: &str = "prev-week";
const MENU_ID: &str = "menu-button";
const SUGGESTION_PREFIX: &str = "suggestion-";

/// Whether the "next week" arrow exists on the page at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextControl {
    Present,
    Absent,
}

/// What the fake timetable site looks like.
#[derive(Debug, Clone)]
pub struct FakeSite {
    pub has_group_input: bool,
    /// Suggestion labels shown once something has been typed
    pub groups: Vec<String>,
    /// Active table markup per week; `None` means the table never renders
    pub weeks: Vec<Option<String>>,
    pub next_control: NextControl,
    pub fail_goto: bool,
    /// Looking up the next arrow kills the session
    pub crash_on_next: bool,
    /// The next arrow is re-rendered right after every lookup
    pub stale_next: bool,
    /// Artificial latency of a page load
    pub load_delay: Duration,
}

impl Default for FakeSite {
    fn default() -> Self {
        Self {
            has_group_input: true,
            groups: vec!["БПИ-24-2".to_string()],
            weeks: Vec::new(),
            next_control: NextControl::Present,
            fail_goto: false,
            crash_on_next: false,
            stale_next: false,
            load_delay: Duration::ZERO,
        }
    }
}

/// Counters shared by every page a launcher hands out.
#[derive(Debug, Default)]
pub struct FakeLog {
    pub closes: usize,
    pub next_clicks: usize,
    pub typed: Vec<String>,
}

pub struct FakePage {
    site: FakeSite,
    typed: Option<String>,
    selected: bool,
    current_week: usize,
    closed: bool,
    log: Arc<Mutex<FakeLog>>,
}

impl FakePage {
    pub fn new(site: FakeSite) -> Self {
        Self::with_log(site, Arc::new(Mutex::new(FakeLog::default())))
    }

    fn with_log(site: FakeSite, log: Arc<Mutex<FakeLog>>) -> Self {
        Self {
            site,
            typed: None,
            selected: false,
            current_week: 0,
            closed: false,
            log,
        }
    }

    /// Selects the first group and skips the search step.
    pub fn with_group_selected(mut self) -> Self {
        self.selected = true;
        self
    }

    pub fn current_week(&self) -> usize {
        self.current_week
    }

    fn ensure_open(&self) -> Result<(), BrowserError> {
        if self.closed {
            return Err(BrowserError::protocol("invalid session id", "session closed"));
        }
        Ok(())
    }

    fn next_enabled(&self) -> bool {
        self.current_week + 1 < self.site.weeks.len()
    }

    fn active_table(&self) -> Option<&String> {
        if !self.selected {
            return None;
        }
        self.site
            .weeks
            .get(self.current_week)
            .and_then(Option::as_ref)
    }

    fn suggestion_index(element: &Element) -> Option<usize> {
        element
            .id()
            .strip_prefix(SUGGESTION_PREFIX)
            .and_then(|i| i.parse().ok())
    }
}

fn element(id: &str) -> Element {
    Element(id.to_string())
}

#[async_trait]
impl PageDriver for FakePage {
    async fn goto(&mut self, _url: &str) -> Result<(), BrowserError> {
        self.ensure_open()?;
        if !self.site.load_delay.is_zero() {
            tokio::time::sleep(self.site.load_delay).await;
        }
        if self.site.fail_goto {
            return Err(BrowserError::protocol(
                "unknown error",
                "Reached error page: about:neterror?e=dnsNotFound",
            ));
        }
        Ok(())
    }

    async fn find(&mut self, css: &str) -> Result<Option<Element>, BrowserError> {
        self.ensure_open()?;
        let found = match css {
            GROUP_INPUT => self.site.has_group_input.then(|| element(INPUT_ID)),
            ACTIVE_WEEK_TABLE => self.active_table().map(|_| element(TABLE_ID)),
            NEXT_WEEK => {
                if self.site.crash_on_next {
                    return Err(BrowserError::protocol(
                        "invalid session id",
                        "Tried to run command without establishing a connection",
                    ));
                }
                (self.selected && self.site.next_control == NextControl::Present)
                    .then(|| element(NEXT_ID))
            }
            PREVIOUS_WEEK => self.selected.then(|| element(PREV_ID)),
            _ => None,
        };
        Ok(found)
    }

    async fn find_all(&mut self, css: &str) -> Result<Vec<Element>, BrowserError> {
        self.ensure_open()?;
        if css != SUGGESTION {
            return Ok(Vec::new());
        }
        let mut buttons = vec![element(MENU_ID)];
        if self.typed.is_some() {
            buttons.extend(
                (0..self.site.groups.len()).map(|i| element(&format!("{SUGGESTION_PREFIX}{i}"))),
            );
        }
        Ok(buttons)
    }

    async fn text(&mut self, el: &Element) -> Result<String, BrowserError> {
        self.ensure_open()?;
        if el.id() == MENU_ID {
            return Ok("Меню".to_string());
        }
        Ok(Self::suggestion_index(el)
            .and_then(|i| self.site.groups.get(i).cloned())
            .unwrap_or_default())
    }

    async fn is_enabled(&mut self, el: &Element) -> Result<bool, BrowserError> {
        self.ensure_open()?;
        if el.id() == NEXT_ID && self.site.stale_next {
            return Err(BrowserError::NoSuchElement(NEXT_ID.to_string()));
        }
        Ok(match el.id() {
            NEXT_ID => self.next_enabled(),
            PREV_ID => self.current_week > 0,
            _ => true,
        })
    }

    async fn click(&mut self, el: &Element) -> Result<(), BrowserError> {
        self.ensure_open()?;
        match el.id() {
            NEXT_ID if self.next_enabled() => {
                self.current_week += 1;
                self.log.lock().unwrap().next_clicks += 1;
            }
            PREV_ID if self.current_week > 0 => self.current_week -= 1,
            _ if Self::suggestion_index(el).is_some() => {
                self.selected = true;
                self.current_week = 0;
            }
            _ => {}
        }
        Ok(())
    }

    async fn type_text(&mut self, el: &Element, text: &str) -> Result<(), BrowserError> {
        self.ensure_open()?;
        if el.id() != INPUT_ID {
            return Err(BrowserError::protocol("element not interactable", el.id()));
        }
        self.typed = Some(text.to_string());
        self.log.lock().unwrap().typed.push(text.to_string());
        Ok(())
    }

    async fn outer_html(&mut self, el: &Element) -> Result<String, BrowserError> {
        self.ensure_open()?;
        match el.id() {
            TABLE_ID => self
                .active_table()
                .cloned()
                .ok_or_else(|| BrowserError::NoSuchElement(TABLE_ID.to_string())),
            other => Err(BrowserError::NoSuchElement(other.to_string())),
        }
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        if !self.closed {
            self.closed = true;
            self.log.lock().unwrap().closes += 1;
        }
        Ok(())
    }
}

/// Hands out fresh [`FakePage`]s of the same site.
pub struct FakeLauncher {
    site: FakeSite,
    fail_launch: bool,
    launches: AtomicUsize,
    log: Arc<Mutex<FakeLog>>,
}

impl FakeLauncher {
    pub fn new(site: FakeSite) -> Self {
        Self {
            site,
            fail_launch: false,
            launches: AtomicUsize::new(0),
            log: Arc::new(Mutex::new(FakeLog::default())),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_launch: true,
            ..Self::new(FakeSite::default())
        }
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.log.lock().unwrap().closes
    }

    pub fn next_clicks(&self) -> usize {
        self.log.lock().unwrap().next_clicks
    }

    pub fn typed(&self) -> Vec<String> {
        self.log.lock().unwrap().typed.clone()
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn PageDriver>, BrowserError> {
        if self.fail_launch {
            return Err(BrowserError::Launch {
                message: "geckodriver not reachable".to_string(),
            });
        }
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage::with_log(self.site.clone(), self.log.clone())))
    }
}

/// Renders a week table the way the site does: the date cell spans the
/// rows of its day, so follow-up rows have no date cell.
pub fn week_table(days: &[(&str, &[(&str, &str)])]) -> String {
    let mut html = String::from(
        "<table class=\"table table-no-transform\"><thead><tr><th>Дата</th><th>Время</th>\
         <th>Дисциплина</th></tr></thead><tbody>",
    );
    for (day, lessons) in days {
        for (i, (time, discipline)) in lessons.iter().enumerate() {
            html.push_str("<tr>");
            if i == 0 {
                html.push_str(&format!(
                    "<td data-th=\"Дата\" rowspan=\"{}\">{day}</td>",
                    lessons.len()
                ));
            }
            html.push_str(&format!(
                "<td data-th=\"Время\">{time}</td>\
                 <td data-th=\"Дисциплина\">{discipline}<br>Лекция</td>\
                 <td data-th=\"Аудитория\">1412</td>\
                 <td data-th=\"Преподаватель\">Иванов И.И.</td>\
                 <td data-th=\"Занятие\">Лекция</td>"
            ));
            html.push_str("</tr>");
        }
    }
    html.push_str("</tbody></table>");
    html
}
