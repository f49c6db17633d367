//! Weekly class schedule scraper for university study groups.
//!
//! A scrape drives a headless browser through the public timetable page,
//! reads a bounded number of weeks and normalizes every table row into a
//! [`schedule::LessonRecord`]. Results are kept in a freshness-windowed cache
//! and served over a small HTTP API.

pub mod browser;
pub mod cache;
pub mod config;
pub mod positions;
pub mod render;
pub mod schedule;
pub mod scrape;
pub mod server;
pub mod service;
pub mod types;
pub mod users;
