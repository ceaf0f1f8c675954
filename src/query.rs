// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Sentence construction
//!
//! A [`Query`] is the command path followed by attribute, filter,
//! operation and tag words. [`Where`] carries filter conditions in the
//! `[key]`, `[key, value]` or `[key, operator, value]` form.

use crate::error::{Error, Result};

/// Operators accepted between `?` and the key of a filter word
pub const OPERATORS: [&str; 4] = ["-", "=", ">", "<"];

/// Endpoint plus attribute words, sent as one sentence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    endpoint: String,
    attributes: Vec<String>,
}

impl Query {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attributes<I, S>(endpoint: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            endpoint: endpoint.into(),
            attributes: attributes.into_iter().map(Into::into).collect(),
        }
    }

    /// Appends a word as is.
    #[must_use]
    pub fn add(mut self, word: impl Into<String>) -> Self {
        self.attributes.push(word.into());
        self
    }

    /// `=key=value`
    #[must_use]
    pub fn equal(self, key: &str, value: &str) -> Self {
        self.add(format!("={key}={value}"))
    }

    /// Appends a filter word: `?key`, `?key=value` or `?<operator>key=value`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Query`] for an operator outside [`OPERATORS`].
    pub fn filter(self, key: &str, operator: Option<&str>, value: Option<&str>) -> Result<Self> {
        let word = match (operator, value) {
            (None, None) => format!("?{key}"),
            (None, Some(value)) => format!("?{key}={value}"),
            // two-part form: the operator slot holds the value
            (Some(value), None) => format!("?{key}={value}"),
            (Some(operator), Some(value)) => {
                if !OPERATORS.contains(&operator) {
                    return Err(Error::Query(format!(
                        "Operator \"{operator}\" in not in allowed list [{}]",
                        OPERATORS.join(",")
                    )));
                }
                format!("?{operator}{key}={value}")
            }
        };
        Ok(self.add(word))
    }

    /// `?#operations`, e.g. `|` or `&!`
    #[must_use]
    pub fn operations(self, operations: &str) -> Self {
        self.add(format!("?#{operations}"))
    }

    /// `.tag=name`
    #[must_use]
    pub fn tag(self, name: &str) -> Self {
        self.add(format!(".tag={name}"))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// All words of the sentence, endpoint first
    pub fn words(&self) -> Vec<String> {
        std::iter::once(self.endpoint.clone())
            .chain(self.attributes.iter().cloned())
            .collect()
    }
}

/// Filter conditions, each of one to three elements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Where(Vec<Vec<String>>);

impl Where {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one more condition.
    #[must_use]
    pub fn and<I, S>(mut self, condition: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.push(condition.into_iter().map(Into::into).collect());
        self
    }

    pub fn conditions(&self) -> &[Vec<String>] {
        &self.0
    }

    /// Appends every condition to `query` as a filter word.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Query`] for a condition with zero or more than three elements.
    pub fn apply(&self, query: Query) -> Result<Query> {
        self.0.iter().try_fold(query, |query, condition| {
            match condition.as_slice() {
                [key] => query.filter(key, None, None),
                [key, value] => query.filter(key, None, Some(value.as_str())),
                [key, operator, value] => {
                    query.filter(key, Some(operator.as_str()), Some(value.as_str()))
                }
                _ => Err(Error::Query(
                    "From 1 to 3 parameters of \"where\" condition is allowed".to_string(),
                )),
            }
        })
    }
}

impl<const N: usize> From<[&str; N]> for Where {
    fn from(condition: [&str; N]) -> Self {
        Where::new().and(condition)
    }
}

impl<const N: usize, const M: usize> From<[[&str; N]; M]> for Where {
    fn from(conditions: [[&str; N]; M]) -> Self {
        conditions.into_iter().fold(Where::new(), Where::and)
    }
}

impl From<Vec<&str>> for Where {
    fn from(condition: Vec<&str>) -> Self {
        Where::new().and(condition)
    }
}

impl From<Vec<String>> for Where {
    fn from(condition: Vec<String>) -> Self {
        Where::new().and(condition)
    }
}

impl From<Vec<Vec<&str>>> for Where {
    fn from(conditions: Vec<Vec<&str>>) -> Self {
        conditions.into_iter().fold(Where::new(), Where::and)
    }
}

impl From<Vec<Vec<String>>> for Where {
    fn from(conditions: Vec<Vec<String>>) -> Self {
        Where(conditions)
    }
}

/// Shapes accepted where a sentence is expected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentenceInput {
    /// Command path such as `/ip/address/print`
    Endpoint(String),
    /// Ready-made query
    PreBuilt(Query),
    /// Endpoint followed by attribute words
    RawWords(Vec<String>),
}

impl SentenceInput {
    /// Normalizes the input into a [`Query`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Query`] when there is no endpoint.
    pub fn into_query(self) -> Result<Query> {
        let query = match self {
            SentenceInput::Endpoint(endpoint) => Query::new(endpoint),
            SentenceInput::PreBuilt(query) => query,
            SentenceInput::RawWords(words) => {
                let mut words = words.into_iter();
                let endpoint = words.next().unwrap_or_default();
                Query::with_attributes(endpoint, words)
            }
        };
        if query.endpoint().trim().is_empty() {
            return Err(Error::Query("Endpoint of query is not set".to_string()));
        }
        Ok(query)
    }
}

impl From<&str> for SentenceInput {
    fn from(endpoint: &str) -> Self {
        SentenceInput::Endpoint(endpoint.to_string())
    }
}

impl From<String> for SentenceInput {
    fn from(endpoint: String) -> Self {
        SentenceInput::Endpoint(endpoint)
    }
}

impl From<Query> for SentenceInput {
    fn from(query: Query) -> Self {
        SentenceInput::PreBuilt(query)
    }
}

impl From<Vec<String>> for SentenceInput {
    fn from(words: Vec<String>) -> Self {
        SentenceInput::RawWords(words)
    }
}

impl From<Vec<&str>> for SentenceInput {
    fn from(words: Vec<&str>) -> Self {
        SentenceInput::RawWords(words.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for SentenceInput {
    fn from(words: [&str; N]) -> Self {
        SentenceInput::RawWords(words.into_iter().map(str::to_string).collect())
    }
}

/// Builds the sentence for a `query` call.
pub(crate) fn build_sentence(
    input: SentenceInput,
    filter: Option<&Where>,
    operations: Option<&str>,
    tag: Option<&str>,
) -> Result<Query> {
    let mut query = input.into_query()?;
    if let Some(filter) = filter {
        query = filter.apply(query)?;
    }
    if let Some(operations) = operations.filter(|o| !o.is_empty()) {
        query = query.operations(operations);
    }
    if let Some(tag) = tag.filter(|t| !t.is_empty()) {
        query = query.tag(tag);
    }
    Ok(query)
}
