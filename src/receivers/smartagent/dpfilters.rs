// SPDX-License-Identifier: Apache-2.0

//! Datapoint exclusion filters.
//!
//! A [`FilterSet`] is an ordered chain of exclusion predicates; a datapoint
//! is emitted iff no member matches. The chain is a logical OR, so member
//! order never changes the outcome.

use std::collections::HashMap;

use regex::Regex;

use super::config::MetricFilterConfig;
use super::datapoint::Datapoint;
use super::error::ConfigError;
use super::filtering::ExtraMetricsFilter;

/// Matches strings against a list of items, each of which may be:
/// - a literal,
/// - a glob using `*` (any run) and `?` (any single character),
/// - a `/regex/` (delimited by slashes),
/// - any of the above prefixed with `!` to negate that item.
///
/// The first matching item decides the result (negated items decide
/// "no match"); a string matching nothing yields false.
#[derive(Debug, Default)]
pub struct StringFilter {
    /// literal -> negated
    literals: HashMap<String, bool>,
    patterns: Vec<PatternItem>,
}

#[derive(Debug)]
struct PatternItem {
    re: Regex,
    negated: bool,
}

impl StringFilter {
    pub fn new<S: AsRef<str>>(items: &[S]) -> Result<Self, ConfigError> {
        let mut filter = StringFilter::default();
        for raw in items {
            let raw = raw.as_ref();
            let (negated, item) = match raw.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, raw),
            };

            if let Some(inner) = item
                .strip_prefix('/')
                .and_then(|rest| rest.strip_suffix('/'))
            {
                let re = Regex::new(inner).map_err(|source| ConfigError::InvalidFilterItem {
                    item: raw.to_string(),
                    source,
                })?;
                filter.patterns.push(PatternItem { re, negated });
            } else if item.contains('*') || item.contains('?') {
                let re = Regex::new(&glob_to_regex(item)).map_err(|source| {
                    ConfigError::InvalidFilterItem {
                        item: raw.to_string(),
                        source,
                    }
                })?;
                filter.patterns.push(PatternItem { re, negated });
            } else {
                filter.literals.insert(item.to_string(), negated);
            }
        }
        Ok(filter)
    }

    pub fn matches(&self, s: &str) -> bool {
        if let Some(negated) = self.literals.get(s) {
            return !negated;
        }
        for item in &self.patterns {
            if item.re.is_match(s) {
                return !item.negated;
            }
        }
        false
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty() && self.patterns.is_empty()
    }
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() + 8);
    out.push('^');
    for c in glob.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            _ => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out.push('$');
    out
}

/// One `datapointsToExclude` entry compiled for matching: the metric-name
/// patterns and every dimension pattern must all match for the entry to
/// match.
#[derive(Debug)]
pub struct ExcludeFilter {
    metric_names: Option<StringFilter>,
    dimensions: Vec<(String, StringFilter)>,
}

impl ExcludeFilter {
    pub fn from_config(config: &MetricFilterConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let names = config.normalized_metric_names();
        let metric_names = if names.is_empty() {
            None
        } else {
            Some(StringFilter::new(&names)?)
        };

        let mut dimensions = Vec::with_capacity(config.dimensions.len());
        for (key, values) in &config.dimensions {
            dimensions.push((key.clone(), StringFilter::new(&values.as_slice())?));
        }
        // deterministic match order for diagnostics
        dimensions.sort_by(|a, b| a.0.cmp(&b.0));

        if metric_names.is_none() && dimensions.is_empty() {
            return Err(ConfigError::EmptyFilterEntry);
        }

        Ok(Self {
            metric_names,
            dimensions,
        })
    }

    pub fn matches(&self, dp: &Datapoint) -> bool {
        if let Some(names) = &self.metric_names {
            if !names.matches(&dp.metric) {
                return false;
            }
        }
        for (key, filter) in &self.dimensions {
            match dp.dimensions.get(key) {
                Some(value) if filter.matches(value) => {}
                _ => return false,
            }
        }
        true
    }
}

/// The closed set of exclusion predicates a filter chain can hold. A match
/// means "drop this datapoint".
#[derive(Debug)]
pub enum DatapointFilter {
    /// A user-authored subtractive filter.
    ExplicitExclude(ExcludeFilter),
    /// The inclusion filter folded into the exclusion chain: drops whatever
    /// is not in the included set.
    NegatedInclude(ExtraMetricsFilter),
}

impl DatapointFilter {
    pub fn matches(&self, dp: &Datapoint) -> bool {
        match self {
            DatapointFilter::ExplicitExclude(f) => f.matches(dp),
            DatapointFilter::NegatedInclude(f) => !f.matches(dp),
        }
    }
}

/// Ordered chain of exclusion filters for one monitor instance.
#[derive(Debug, Default)]
pub struct FilterSet {
    exclude_filters: Vec<DatapointFilter>,
}

impl FilterSet {
    pub fn new(exclude_filters: Vec<DatapointFilter>) -> Self {
        Self { exclude_filters }
    }

    /// True means the datapoint is excluded.
    pub fn matches(&self, dp: &Datapoint) -> bool {
        self.exclude_filters.iter().any(|f| f.matches(dp))
    }

    pub fn push(&mut self, filter: DatapointFilter) {
        self.exclude_filters.push(filter);
    }
}
