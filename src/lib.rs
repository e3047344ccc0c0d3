//! Client-side filtering of a waste-tracking history.
//!
//! A history is a list of per-category groups, optionally carrying the
//! individual disposal records behind each total. [`filter::filter_waste_data`]
//! narrows a history to a [`filter::FilterSelection`] and recomputes totals;
//! [`state::FilterState`] holds the selection for one screen visit.

pub mod config;
pub mod fetch;
pub mod filter;
pub mod models;
pub mod range;
pub mod report;
pub mod source;
pub mod state;
