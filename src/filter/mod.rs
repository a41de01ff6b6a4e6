//! List filtering for `GET /:container/:table`.
//!
//! Every query parameter except `page` and `limit` is an exact-match equality
//! filter; all filters must hold (AND). Pagination is applied after filtering.

use serde_json::{json, Value};

use crate::config::ApiConfig;
use crate::database::record::{scalar_to_string, Record};

pub mod error;

pub use error::FilterError;

const PAGE_PARAM: &str = "page";
const LIMIT_PARAM: &str = "limit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub filters: Vec<(String, String)>,
    pub pagination: Option<Pagination>,
}

/// Bare array unless pagination was requested
#[derive(Debug, Clone, PartialEq)]
pub enum ListOutput {
    All(Vec<Record>),
    Page {
        page: usize,
        limit: usize,
        total: usize,
        data: Vec<Record>,
    },
}

impl ListOutput {
    pub fn into_json(self) -> Value {
        match self {
            ListOutput::All(records) => Value::Array(records.into_iter().map(Value::Object).collect()),
            ListOutput::Page { page, limit, total, data } => json!({
                "page": page,
                "limit": limit,
                "total": total,
                "data": data,
            }),
        }
    }
}

impl ListQuery {
    pub fn parse(params: Vec<(String, String)>, api: &ApiConfig) -> Result<Self, FilterError> {
        let mut filters = Vec::new();
        let mut page = None;
        let mut limit = None;

        for (key, value) in params {
            match key.as_str() {
                PAGE_PARAM => page = Some(parse_positive(&value).ok_or(FilterError::InvalidPage(value))?),
                LIMIT_PARAM => limit = Some(parse_positive(&value).ok_or(FilterError::InvalidLimit(value))?),
                _ => filters.push((key, value)),
            }
        }

        let pagination = match (page, limit) {
            (None, None) => None,
            (page, limit) => Some(Pagination {
                page: page.unwrap_or(1),
                limit: limit.unwrap_or(api.default_page_limit).min(api.max_page_limit.max(1)),
            }),
        };

        Ok(Self { filters, pagination })
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.filters.iter().all(|(field, expected)| {
            record
                .get(field)
                .and_then(scalar_to_string)
                .map(|actual| actual == *expected)
                .unwrap_or(false)
        })
    }

    pub fn apply(&self, records: &[Record]) -> ListOutput {
        let matched: Vec<Record> = records.iter().filter(|r| self.matches(r)).cloned().collect();

        match self.pagination {
            None => ListOutput::All(matched),
            Some(Pagination { page, limit }) => {
                let total = matched.len();
                let data = matched
                    .into_iter()
                    .skip((page - 1).saturating_mul(limit))
                    .take(limit)
                    .collect();
                ListOutput::Page { page, limit, total, data }
            }
        }
    }
}

fn parse_positive(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok().filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn records() -> Vec<Record> {
        (1..=5)
            .map(|i| {
                serde_json::from_value(json!({
                    "id": i.to_string(),
                    "n": i,
                    "even": i % 2 == 0,
                    "tag": if i <= 3 { "low" } else { "high" },
                    "nested": {"x": 1},
                }))
                .unwrap()
            })
            .collect()
    }

    fn api() -> ApiConfig {
        AppConfig::development().api
    }

    #[test]
    fn no_params_returns_everything_as_a_bare_list() {
        let q = ListQuery::parse(vec![], &api()).unwrap();
        assert!(matches!(q.apply(&records()), ListOutput::All(r) if r.len() == 5));
    }

    #[test]
    fn filters_are_and_combined_and_compare_as_text() {
        let q = ListQuery::parse(params(&[("even", "true"), ("tag", "high")]), &api()).unwrap();
        let ListOutput::All(found) = q.apply(&records()) else { panic!("expected bare list") };
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["n"], json!(4));

        let q = ListQuery::parse(params(&[("n", "2")]), &api()).unwrap();
        assert!(matches!(q.apply(&records()), ListOutput::All(r) if r.len() == 1));
    }

    #[test]
    fn missing_and_structured_fields_never_match() {
        let q = ListQuery::parse(params(&[("absent", "x")]), &api()).unwrap();
        assert!(matches!(q.apply(&records()), ListOutput::All(r) if r.is_empty()));

        let q = ListQuery::parse(params(&[("nested", "{\"x\":1}")]), &api()).unwrap();
        assert!(matches!(q.apply(&records()), ListOutput::All(r) if r.is_empty()));
    }

    #[test]
    fn pagination_slices_after_filtering() {
        let q = ListQuery::parse(params(&[("page", "2"), ("limit", "2")]), &api()).unwrap();
        let out = q.apply(&records()).into_json();
        assert_eq!(out["page"], 2);
        assert_eq!(out["limit"], 2);
        assert_eq!(out["total"], 5);
        assert_eq!(out["data"][0]["id"], "3");
        assert_eq!(out["data"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn limit_alone_defaults_page_and_is_capped() {
        let mut cfg = api();
        cfg.max_page_limit = 3;
        let q = ListQuery::parse(params(&[("limit", "50")]), &cfg).unwrap();
        assert_eq!(q.pagination, Some(Pagination { page: 1, limit: 3 }));
    }

    #[test]
    fn rejects_bad_pagination_values() {
        assert!(matches!(
            ListQuery::parse(params(&[("page", "0")]), &api()),
            Err(FilterError::InvalidPage(_))
        ));
        assert!(matches!(
            ListQuery::parse(params(&[("limit", "ten")]), &api()),
            Err(FilterError::InvalidLimit(_))
        ));
    }
}
