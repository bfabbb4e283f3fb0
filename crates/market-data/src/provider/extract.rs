//! Declarative field extraction from HTML pages.
//!
//! Providers that scrape markup describe *what* to read as a static list of
//! [`FieldRule`]s. Repairing a provider after a page redesign means editing its
//! rule table, not its control flow.
//!
//! ```ignore
//! const RULES: &[FieldRule] = &[
//!     FieldRule::text("name", ".gmfund_title .lt h1")
//!         .with(&[Transform::RemoveAll(r"[()\d]"), Transform::Trim]),
//!     FieldRule::text("gsz", "span").nth(0),
//! ];
//! let fields = extract("HOWBUY", &html, RULES)?;
//! ```

use std::collections::HashMap;

use regex::Regex;
use scraper::{Html, Selector};
use thiserror::Error;

use crate::errors::MarketDataError;

/// Where a rule reads its raw value from.
#[derive(Clone, Copy, Debug)]
pub enum Source {
    /// Concatenated text content of the element
    Text,
    /// Value of the named attribute
    Attr(&'static str),
}

/// Post-processing step applied to a raw value, in order.
#[derive(Clone, Copy, Debug)]
pub enum Transform {
    Trim,
    /// Remove every match of the pattern
    RemoveAll(&'static str),
    /// Keep the text before the first occurrence of the separator
    FirstItem(char),
    /// Drop the first `n` characters
    SkipChars(usize),
    /// Keep the first match of the pattern; no match leaves the field empty
    FirstMatch(&'static str),
}

/// "Extract field F from location L with transforms T".
#[derive(Clone, Copy, Debug)]
pub struct FieldRule {
    pub field: &'static str,
    pub selector: &'static str,
    /// Pick the n-th match; `None` joins the values of every match
    pub nth: Option<usize>,
    pub source: Source,
    pub transforms: &'static [Transform],
    /// Used when the value is missing or empty after transforms
    pub fallback: Option<&'static str>,
    /// Optional fields are simply left out when missing
    pub optional: bool,
}

impl FieldRule {
    pub const fn text(field: &'static str, selector: &'static str) -> Self {
        Self {
            field,
            selector,
            nth: None,
            source: Source::Text,
            transforms: &[Transform::Trim],
            fallback: None,
            optional: false,
        }
    }

    pub const fn attr(field: &'static str, selector: &'static str, name: &'static str) -> Self {
        Self {
            source: Source::Attr(name),
            ..Self::text(field, selector)
        }
    }

    pub const fn nth(self, n: usize) -> Self {
        Self {
            nth: Some(n),
            ..self
        }
    }

    pub const fn with(self, transforms: &'static [Transform]) -> Self {
        Self { transforms, ..self }
    }

    pub const fn or(self, fallback: &'static str) -> Self {
        Self {
            fallback: Some(fallback),
            ..self
        }
    }

    pub const fn optional(self) -> Self {
        Self {
            optional: true,
            ..self
        }
    }
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("invalid selector '{0}'")]
    Selector(&'static str),

    #[error("invalid pattern '{0}'")]
    Pattern(&'static str),

    #[error("field '{0}' not found")]
    Missing(&'static str),
}

/// Values produced by a rule set, keyed by field name.
#[derive(Debug, Default)]
pub struct Extracted {
    values: HashMap<&'static str, String>,
}

impl Extracted {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Take a field out, failing if it was not extracted.
    pub fn take(&mut self, provider: &str, field: &str) -> Result<String, MarketDataError> {
        self.values
            .remove(field)
            .ok_or_else(|| MarketDataError::missing(provider, field))
    }
}

/// Evaluate `rules` against an HTML document or fragment.
pub fn extract(
    provider: &str,
    html: &str,
    rules: &[FieldRule],
) -> Result<Extracted, MarketDataError> {
    evaluate(html, rules).map_err(|e| match e {
        ExtractError::Missing(field) => MarketDataError::missing(provider, field),
        other => MarketDataError::decode(provider, other.to_string()),
    })
}

fn evaluate(html: &str, rules: &[FieldRule]) -> Result<Extracted, ExtractError> {
    let document = Html::parse_document(html);
    let mut extracted = Extracted::default();

    for rule in rules {
        let selector =
            Selector::parse(rule.selector).map_err(|_| ExtractError::Selector(rule.selector))?;

        let raw: Vec<String> = document
            .select(&selector)
            .filter_map(|element| match rule.source {
                Source::Text => Some(element.text().collect::<String>()),
                Source::Attr(name) => element.value().attr(name).map(str::to_string),
            })
            .collect();

        let picked = match rule.nth {
            Some(n) => raw.into_iter().nth(n),
            None if raw.is_empty() => None,
            None => Some(raw.concat()),
        };

        let value = match picked {
            Some(value) => Some(apply(value, rule.transforms)?),
            None => None,
        };

        match value.filter(|v| !v.is_empty()) {
            Some(value) => {
                extracted.values.insert(rule.field, value);
            }
            None => match rule.fallback {
                Some(fallback) => {
                    extracted.values.insert(rule.field, fallback.to_string());
                }
                None if rule.optional => {}
                None => return Err(ExtractError::Missing(rule.field)),
            },
        }
    }

    Ok(extracted)
}

fn apply(mut value: String, transforms: &[Transform]) -> Result<String, ExtractError> {
    for transform in transforms {
        value = match *transform {
            Transform::Trim => value.trim().to_string(),
            Transform::RemoveAll(pattern) => {
                compile(pattern)?.replace_all(&value, "").into_owned()
            }
            Transform::FirstItem(separator) => value
                .split(separator)
                .next()
                .unwrap_or_default()
                .to_string(),
            Transform::SkipChars(n) => value.chars().skip(n).collect(),
            Transform::FirstMatch(pattern) => compile(pattern)?
                .find(&value)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
        };
    }
    Ok(value)
}

fn compile(pattern: &'static str) -> Result<Regex, ExtractError> {
    Regex::new(pattern).map_err(|_| ExtractError::Pattern(pattern))
}
