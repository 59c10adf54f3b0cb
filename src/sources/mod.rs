//! HTTP clients for the activity sources.
//!
//! Each source module exposes a thin client over its vendor API plus a
//! `fetch_*` helper used by the report pipeline. The helpers never fail:
//! any transport or parse error is logged and degrades to empty data so a
//! broken integration costs one section of the report, not the whole run.

pub mod clockify;
pub mod github;
pub mod gitlab;
pub mod jira;

use chrono::{NaiveTime, SecondsFormat, Utc};
use thiserror::Error;

/// Default timeout applied to every source API call.
pub(crate) const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    Response(String),
}

/// Build a reqwest client with the standard source timeout.
pub(crate) fn http_client() -> Result<reqwest::Client, SourceError> {
    Ok(reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}

/// Today's UTC range as RFC 3339 strings: midnight through 23:59:59.
pub(crate) fn today_utc_range() -> (String, String) {
    let date = Utc::now().date_naive();
    let start = date.and_time(NaiveTime::MIN).and_utc();
    let end_time = NaiveTime::from_hms_opt(23, 59, 59).expect("23:59:59 is a valid time");
    let end = date.and_time(end_time).and_utc();
    (
        start.to_rfc3339_opts(SecondsFormat::Secs, true),
        end.to_rfc3339_opts(SecondsFormat::Secs, true),
    )
}
