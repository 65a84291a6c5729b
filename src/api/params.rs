use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::api::error::ApiError;
use crate::logic::{FilterError, Page};
use crate::model::{DetailLevel, Timestamp};

/// Query string as an ordered multimap, so list parameters may be repeated
/// (`?species=a&species=b`).
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

#[async_trait]
impl<S> FromRequestParts<S> for QueryParams
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .map_err(|e| ApiError::validation(format!("Invalid query string: {}", e)))?;
        Ok(Self::new(pairs))
    }
}

impl QueryParams {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// Every non-empty value supplied for `key`, in order.
    pub fn all(&self, key: &str) -> Vec<String> {
        self.pairs
            .iter()
            .filter(|(k, v)| k == key && !v.trim().is_empty())
            .map(|(_, v)| v.trim().to_string())
            .collect()
    }

    /// The last non-empty value supplied for `key`.
    pub fn single(&self, key: &str) -> Option<String> {
        self.all(key).pop()
    }

    fn number(&self, key: &str) -> Result<Option<usize>, FilterError> {
        self.single(key)
            .map(|value| {
                value.parse::<usize>().map_err(|_| FilterError::InvalidValue {
                    parameter: key.to_string(),
                    value,
                })
            })
            .transpose()
    }

    pub fn page(&self) -> Result<Page, FilterError> {
        Page::new(
            self.number("from_index")?.unwrap_or(0),
            self.number("size")?.unwrap_or(Page::DEFAULT_SIZE),
        )
    }

    pub fn detail(&self) -> Result<DetailLevel, FilterError> {
        match self.single("detail").as_deref() {
            None | Some("standard") => Ok(DetailLevel::Standard),
            Some("full") => Ok(DetailLevel::Full),
            Some(other) => Err(FilterError::InvalidValue {
                parameter: "detail".to_string(),
                value: other.to_string(),
            }),
        }
    }

    /// `date_from` / `date_to` as an inclusive range. A bare date covers the whole day.
    pub fn date_range(&self) -> Result<(Option<Timestamp>, Option<Timestamp>), FilterError> {
        let from = self
            .single("date_from")
            .map(|v| parse_timestamp("date_from", &v, NaiveTime::MIN))
            .transpose()?;
        let end_of_day =
            NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN);
        let to = self
            .single("date_to")
            .map(|v| parse_timestamp("date_to", &v, end_of_day))
            .transpose()?;
        Ok((from, to))
    }
}

fn parse_timestamp(
    parameter: &str,
    value: &str,
    time_of_day: NaiveTime,
) -> Result<Timestamp, FilterError> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| date.and_time(time_of_day).and_utc())
        .map_err(|_| FilterError::InvalidValue {
            parameter: parameter.to_string(),
            value: value.to_string(),
        })
}
