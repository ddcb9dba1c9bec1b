//! Regular-expression process filters.
//!
//! A filter is either a bare pattern, matched against the process name or
//! its command line, or `field:pattern` for a single field. Patterns must
//! match the whole value.

use regex::Regex;

use crate::error::{HostwatchError, Result};

use super::record::ProcessRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    /// Name or command line
    Any,
    Name,
    Cmdline,
    Username,
    Status,
    Pid,
}

impl FilterField {
    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "name" => Some(FilterField::Name),
            "cmdline" => Some(FilterField::Cmdline),
            "username" | "user" => Some(FilterField::Username),
            "status" => Some(FilterField::Status),
            "pid" => Some(FilterField::Pid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessFilter {
    input: String,
    field: FilterField,
    regex: Regex,
}

impl ProcessFilter {
    /// Compile a filter expression.
    pub fn parse(input: &str) -> Result<Self> {
        let (field, pattern) = match input.split_once(':') {
            Some((prefix, rest)) => match FilterField::from_prefix(prefix) {
                Some(field) => (field, rest),
                None => (FilterField::Any, input),
            },
            None => (FilterField::Any, input),
        };

        let regex = Regex::new(&format!("^(?:{})$", pattern))
            .map_err(|e| HostwatchError::invalid_pattern(format!("{}: {}", input, e)))?;

        Ok(Self {
            input: input.to_string(),
            field,
            regex,
        })
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn field(&self) -> FilterField {
        self.field
    }

    pub fn is_match(&self, process: &ProcessRecord) -> bool {
        match self.field {
            FilterField::Any => {
                self.regex.is_match(&process.name) || self.regex.is_match(&process.command())
            }
            FilterField::Name => self.regex.is_match(&process.name),
            FilterField::Cmdline => self.regex.is_match(&process.command()),
            FilterField::Username => process
                .username
                .as_deref()
                .is_some_and(|user| self.regex.is_match(user)),
            FilterField::Status => self.regex.is_match(&process.status),
            FilterField::Pid => self.regex.is_match(&process.pid.to_string()),
        }
    }
}

/// Comma-separated filters; a process matches when any of them does.
///
/// Invalid entries are dropped with a warning. An empty list matches
/// everything.
#[derive(Debug, Clone, Default)]
pub struct FilterList {
    filters: Vec<ProcessFilter>,
}

impl FilterList {
    pub fn new(input: Option<&str>) -> Self {
        let filters = input
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| match ProcessFilter::parse(s) {
                Ok(filter) => {
                    log::debug!("Process filter set to {} on {:?}", s, filter.field());
                    Some(filter)
                }
                Err(e) => {
                    log::warn!("Ignoring process filter: {}", e);
                    None
                }
            })
            .collect();
        Self { filters }
    }

    pub fn is_active(&self) -> bool {
        !self.filters.is_empty()
    }

    pub fn is_match(&self, process: &ProcessRecord) -> bool {
        !self.is_active() || self.filters.iter().any(|f| f.is_match(process))
    }

    /// Matching processes, in their original order
    pub fn apply(&self, processes: &[ProcessRecord]) -> Vec<ProcessRecord> {
        processes
            .iter()
            .filter(|p| self.is_match(p))
            .cloned()
            .collect()
    }

    pub fn inputs(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.input()).collect()
    }
}
