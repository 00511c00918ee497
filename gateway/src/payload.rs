//! Gateway responses come in two shapes: paginated `results` listings and
//! everything else. [`Payload`] keeps that distinction explicit so callers
//! never have to probe JSON fields themselves.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Paginated(PaginatedResults),
    Generic(Value),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PaginatedResults {
    /// Total number of matches reported by the gateway, which may exceed `results.len()`.
    pub total: Option<u64>,
    pub has_more: bool,
    pub results: Vec<Value>,
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return Self::Generic(value);
        };

        match map.remove("results") {
            Some(Value::Array(results)) => {
                let total = map.get("total").and_then(Value::as_u64).or_else(|| {
                    map.get("header")
                        .and_then(|header| header.get("numFound"))
                        .and_then(Value::as_u64)
                });
                let has_more = map.get("hasMore").and_then(Value::as_bool).unwrap_or(false);
                Self::Paginated(PaginatedResults {
                    total,
                    has_more,
                    results,
                })
            }
            Some(other) => {
                map.insert("results".to_string(), other);
                Self::Generic(Value::Object(map))
            }
            None => Self::Generic(Value::Object(map)),
        }
    }
}

impl Payload {
    /// The listed items; generic payloads have none.
    pub fn results(&self) -> &[Value] {
        match self {
            Self::Paginated(page) => &page.results,
            Self::Generic(_) => &[],
        }
    }

    /// Reported total, falling back to the number of returned items.
    pub fn total(&self) -> u64 {
        match self {
            Self::Paginated(page) => page.total.unwrap_or(page.results.len() as u64),
            Self::Generic(_) => 0,
        }
    }

    pub fn is_paginated(&self) -> bool {
        matches!(self, Self::Paginated(_))
    }
}
