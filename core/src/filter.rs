/*
 * filter.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Raccolta, a batch mail attachment downloader.
 *
 * Raccolta is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Raccolta is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Raccolta.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Message filtering: an ordered chain of predicates ANDed together with
//! short-circuit evaluation. The date check goes first — it is the cheap
//! test that also drives early termination of the scan.

use chrono::{DateTime, Utc};

use crate::config::FilterConfig;
use crate::error::DownloadError;
use crate::message::MessageInfo;

/// Layout of a user-supplied boundary plus zone, e.g. "2020-1-1 00:00+0800".
const BOUNDARY_LAYOUT: &str = "%Y-%m-%d %H:%M%z";

/// Parse a range boundary in the configured zone, once, to an absolute instant.
pub fn parse_boundary(value: &str, zone: &str) -> Result<DateTime<Utc>, DownloadError> {
    let composed = format!("{}{}", value.trim(), zone.trim());
    DateTime::parse_from_str(&composed, BOUNDARY_LAYOUT)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            DownloadError::Config(format!(
                "invalid date boundary {:?} with zone {:?}: {}",
                value, zone, e
            ))
        })
}

/// One predicate over a MessageInfo field. Stateless once constructed.
#[derive(Debug, Clone)]
pub enum FilterRule {
    /// Instant strictly between begin and end (exclusive on both ends).
    DateBetween {
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Case-sensitive substring checks. Empty patterns are never
    /// constructed; an absent config value simply adds no rule.
    SubjectContains(String),
    FromAddressContains(String),
    FromNameContains(String),
    /// Any recipient address matches.
    ToAddressContains(String),
    /// Any recipient display name matches.
    ToNameContains(String),
}

impl FilterRule {
    pub fn matches(&self, info: &MessageInfo) -> bool {
        match self {
            FilterRule::DateBetween { begin, end } => info.date > *begin && info.date < *end,
            FilterRule::SubjectContains(p) => info.subject.contains(p),
            FilterRule::FromAddressContains(p) => info.from_address.contains(p),
            FilterRule::FromNameContains(p) => info.from_name.contains(p),
            FilterRule::ToAddressContains(p) => info.to_addresses.iter().any(|a| a.contains(p)),
            FilterRule::ToNameContains(p) => info.to_names.iter().any(|n| n.contains(p)),
        }
    }
}

/// Ordered predicate chain plus the lower date bound used for early
/// termination of the reverse-chronological scan.
#[derive(Debug, Clone)]
pub struct FilterChain {
    begin: DateTime<Utc>,
    rules: Vec<FilterRule>,
}

impl FilterChain {
    /// Build the chain from configuration. Boundaries are interpreted in the
    /// configured zone and converted to absolute instants once.
    ///
    /// Recipient precedence: when both to_address and to_name are non-empty
    /// the address filter wins and the name filter is not evaluated (the two
    /// are mutually exclusive by configuration intent).
    pub fn from_config(cfg: &FilterConfig) -> Result<FilterChain, DownloadError> {
        let begin = parse_boundary(&cfg.date_begin, &cfg.time_zone)?;
        let end = parse_boundary(&cfg.date_end, &cfg.time_zone)?;

        let mut rules = vec![FilterRule::DateBetween { begin, end }];
        if !cfg.subject.is_empty() {
            rules.push(FilterRule::SubjectContains(cfg.subject.clone()));
        }
        if !cfg.from_address.is_empty() {
            rules.push(FilterRule::FromAddressContains(cfg.from_address.clone()));
        }
        if !cfg.from_name.is_empty() {
            rules.push(FilterRule::FromNameContains(cfg.from_name.clone()));
        }
        if !cfg.to_address.is_empty() {
            rules.push(FilterRule::ToAddressContains(cfg.to_address.clone()));
        } else if !cfg.to_name.is_empty() {
            rules.push(FilterRule::ToNameContains(cfg.to_name.clone()));
        }
        Ok(FilterChain { begin, rules })
    }

    /// AND of all active predicates, short-circuiting on the first failure.
    pub fn matches(&self, info: &MessageInfo) -> bool {
        self.rules.iter().all(|r| r.matches(info))
    }

    /// Lower bound of the date range; the scan stops entirely once a
    /// message older than this is seen.
    pub fn lower_bound(&self) -> DateTime<Utc> {
        self.begin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn info_at(epoch: i64) -> MessageInfo {
        MessageInfo {
            id: "1".to_string(),
            date: Utc.timestamp_opt(epoch, 0).unwrap(),
            subject: "Weekly report".to_string(),
            from_address: "wei@corp.example.com".to_string(),
            from_name: "Wei Zhang".to_string(),
            to_addresses: vec!["team@corp.example.com".to_string()],
            to_names: vec!["Team".to_string()],
            size: None,
            attachment_names: Vec::new(),
        }
    }

    fn config(zone: &str) -> FilterConfig {
        FilterConfig {
            date_begin: "2020-1-1 00:00".to_string(),
            date_end: "2020-1-5 18:00".to_string(),
            time_zone: zone.to_string(),
            ..FilterConfig::default()
        }
    }

    #[test]
    fn boundary_parsed_in_configured_zone() {
        let utc = parse_boundary("2020-1-1 08:00", "+0000").unwrap();
        let cst = parse_boundary("2020-1-1 16:00", "+0800").unwrap();
        assert_eq!(utc, cst);
    }

    #[test]
    fn date_range_is_exclusive_on_both_ends() {
        let chain = FilterChain::from_config(&config("+0000")).unwrap();
        let begin = parse_boundary("2020-1-1 00:00", "+0000").unwrap();
        let end = parse_boundary("2020-1-5 18:00", "+0000").unwrap();
        assert!(!chain.matches(&info_at(begin.timestamp())));
        assert!(!chain.matches(&info_at(end.timestamp())));
        assert!(chain.matches(&info_at(begin.timestamp() + 1)));
        assert!(chain.matches(&info_at(end.timestamp() - 1)));
    }

    #[test]
    fn substring_rules_are_case_sensitive() {
        let mut cfg = config("+0000");
        cfg.subject = "report".to_string();
        let chain = FilterChain::from_config(&cfg).unwrap();
        let begin = chain.lower_bound().timestamp();
        assert!(chain.matches(&info_at(begin + 60)));

        cfg.subject = "Report".to_string();
        let chain = FilterChain::from_config(&cfg).unwrap();
        assert!(!chain.matches(&info_at(begin + 60)));
    }

    #[test]
    fn empty_values_add_no_rules() {
        let chain = FilterChain::from_config(&config("+0000")).unwrap();
        // Only the date rule is present; everything in range matches.
        assert!(chain.matches(&info_at(chain.lower_bound().timestamp() + 60)));
    }

    #[test]
    fn recipient_address_takes_precedence_over_name() {
        let mut cfg = config("+0000");
        cfg.to_address = "team@".to_string();
        cfg.to_name = "Nobody Named This".to_string();
        let chain = FilterChain::from_config(&cfg).unwrap();
        // Address matches, so the (non-matching) name filter must be ignored.
        assert!(chain.matches(&info_at(chain.lower_bound().timestamp() + 60)));
    }

    #[test]
    fn recipient_name_rule_used_when_address_empty() {
        let mut cfg = config("+0000");
        cfg.to_name = "Team".to_string();
        let chain = FilterChain::from_config(&cfg).unwrap();
        let t = chain.lower_bound().timestamp() + 60;
        assert!(chain.matches(&info_at(t)));

        cfg.to_name = "Someone Else".to_string();
        let chain = FilterChain::from_config(&cfg).unwrap();
        assert!(!chain.matches(&info_at(t)));
    }

    #[test]
    fn from_filters() {
        let mut cfg = config("+0000");
        cfg.from_address = "corp.example".to_string();
        cfg.from_name = "Zhang".to_string();
        let chain = FilterChain::from_config(&cfg).unwrap();
        assert!(chain.matches(&info_at(chain.lower_bound().timestamp() + 60)));

        cfg.from_address = "other.example".to_string();
        let chain = FilterChain::from_config(&cfg).unwrap();
        assert!(!chain.matches(&info_at(chain.lower_bound().timestamp() + 60)));
    }
}
