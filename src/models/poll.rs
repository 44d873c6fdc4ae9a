//! Poll model and tallying

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashSet;

use crate::utils::errors::{CommunityError, Result};
use crate::utils::helpers::round_percentage;

pub const MIN_POLL_OPTIONS: usize = 2;
pub const MAX_POLL_OPTIONS: usize = 20;
pub const MAX_OPTION_LABEL_LEN: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Poll {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub allow_multiple: bool,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_closed: bool,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Poll {
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        !self.is_closed && self.ends_at.map_or(true, |ends_at| ends_at > now)
    }

    /// Validate a ballot against this poll's options and choice mode.
    /// Returns the option ids to record.
    pub fn validate_selection(
        &self,
        options: &[PollOption],
        selected: &[i64],
        now: DateTime<Utc>,
    ) -> Result<Vec<i64>> {
        if !self.is_open(now) {
            return Err(CommunityError::InvalidStateTransition {
                from: "closed".to_string(),
                to: "vote".to_string(),
            });
        }
        if selected.is_empty() {
            return Err(CommunityError::InvalidInput(
                "Select at least one option".to_string(),
            ));
        }
        if !self.allow_multiple && selected.len() != 1 {
            return Err(CommunityError::InvalidInput(
                "This poll accepts exactly one option".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(selected.len());
        for option_id in selected {
            if !seen.insert(*option_id) {
                return Err(CommunityError::InvalidInput(format!(
                    "Option {} selected more than once",
                    option_id
                )));
            }
            if !options.iter().any(|o| o.id == *option_id && o.poll_id == self.id) {
                return Err(CommunityError::InvalidInput(format!(
                    "Option {} does not belong to poll {}",
                    option_id, self.id
                )));
            }
        }

        Ok(selected.to_vec())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PollOption {
    pub id: i64,
    pub poll_id: i64,
    pub label: String,
    pub position: i32,
    pub vote_count: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OptionResult {
    pub id: i64,
    pub label: String,
    pub position: i32,
    pub vote_count: i64,
    pub percentage: f64,
}

/// Poll with tallied options, as returned by `GET /api/polls/{id}`
#[derive(Debug, Clone, Serialize)]
pub struct PollDetail {
    #[serde(flatten)]
    pub poll: Poll,
    pub is_open: bool,
    pub options: Vec<OptionResult>,
    pub total_votes: i64,
    pub total_voters: i64,
    pub has_voted: bool,
    pub my_votes: Vec<i64>,
}

/// Each option's share of all selections, rounded to one decimal
pub fn compute_results(options: &[PollOption]) -> (Vec<OptionResult>, i64) {
    let total: i64 = options.iter().map(|o| o.vote_count).sum();
    let mut results: Vec<OptionResult> = options
        .iter()
        .map(|option| {
            let percentage = if total > 0 {
                round_percentage(option.vote_count as f64 * 100.0 / total as f64)
            } else {
                0.0
            };
            OptionResult {
                id: option.id,
                label: option.label.clone(),
                position: option.position,
                vote_count: option.vote_count,
                percentage,
            }
        })
        .collect();
    results.sort_by_key(|r| r.position);
    (results, total)
}

/// Trim labels and check count, length and uniqueness
pub fn validate_options(labels: &[String]) -> Result<Vec<String>> {
    let cleaned: Vec<String> = labels.iter().map(|l| l.trim().to_string()).collect();

    if cleaned.len() < MIN_POLL_OPTIONS || cleaned.len() > MAX_POLL_OPTIONS {
        return Err(CommunityError::InvalidInput(format!(
            "A poll needs between {} and {} options",
            MIN_POLL_OPTIONS, MAX_POLL_OPTIONS
        )));
    }

    let mut seen = HashSet::with_capacity(cleaned.len());
    for label in &cleaned {
        if label.is_empty() {
            return Err(CommunityError::InvalidInput(
                "Poll options cannot be empty".to_string(),
            ));
        }
        if label.chars().count() > MAX_OPTION_LABEL_LEN {
            return Err(CommunityError::InvalidInput(format!(
                "Poll options are limited to {} characters",
                MAX_OPTION_LABEL_LEN
            )));
        }
        if !seen.insert(label.to_lowercase()) {
            return Err(CommunityError::InvalidInput(format!(
                "Duplicate poll option: {}",
                label
            )));
        }
    }

    Ok(cleaned)
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePollRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub allow_multiple: bool,
    pub ends_at: Option<DateTime<Utc>>,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePollRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoteRequest {
    pub option_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PollFilter {
    /// Only polls still accepting votes
    pub open_only: Option<bool>,
    pub q: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Duration;
    use proptest::prelude::*;

    fn poll(allow_multiple: bool) -> Poll {
        Poll {
            id: 3,
            title: "Venue for annual meet".to_string(),
            description: None,
            allow_multiple,
            ends_at: None,
            is_closed: false,
            created_by: Some(1),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn options(counts: &[i64]) -> Vec<PollOption> {
        counts
            .iter()
            .enumerate()
            .map(|(i, count)| PollOption {
                id: 100 + i as i64,
                poll_id: 3,
                label: format!("Option {}", i + 1),
                position: i as i32,
                vote_count: *count,
            })
            .collect()
    }

    #[test]
    fn test_is_open() {
        let now = Utc::now();
        let mut p = poll(false);
        assert!(p.is_open(now));
        p.ends_at = Some(now - Duration::minutes(1));
        assert!(!p.is_open(now));
        p.ends_at = Some(now + Duration::minutes(1));
        assert!(p.is_open(now));
        p.is_closed = true;
        assert!(!p.is_open(now));
    }

    #[test]
    fn test_single_choice_selection() {
        let now = Utc::now();
        let p = poll(false);
        let opts = options(&[0, 0, 0]);

        assert_eq!(p.validate_selection(&opts, &[101], now).ok(), Some(vec![101]));
        assert_matches!(
            p.validate_selection(&opts, &[100, 101], now),
            Err(CommunityError::InvalidInput(_))
        );
        assert_matches!(
            p.validate_selection(&opts, &[], now),
            Err(CommunityError::InvalidInput(_))
        );
        assert_matches!(
            p.validate_selection(&opts, &[999], now),
            Err(CommunityError::InvalidInput(_))
        );
    }

    #[test]
    fn test_multiple_choice_selection() {
        let now = Utc::now();
        let p = poll(true);
        let opts = options(&[0, 0, 0]);

        assert!(p.validate_selection(&opts, &[100, 102], now).is_ok());
        assert_matches!(
            p.validate_selection(&opts, &[100, 100], now),
            Err(CommunityError::InvalidInput(_))
        );
    }

    #[test]
    fn test_closed_poll_rejects_votes() {
        let mut p = poll(false);
        p.is_closed = true;
        assert_matches!(
            p.validate_selection(&options(&[0, 0]), &[100], Utc::now()),
            Err(CommunityError::InvalidStateTransition { .. })
        );
    }

    #[test]
    fn test_results_percentages() {
        let (results, total) = compute_results(&options(&[1, 1, 1]));
        assert_eq!(total, 3);
        assert!(results.iter().all(|r| (r.percentage - 33.3).abs() < f64::EPSILON));

        let (results, total) = compute_results(&options(&[0, 0]));
        assert_eq!(total, 0);
        assert!(results.iter().all(|r| r.percentage == 0.0));
    }

    #[test]
    fn test_validate_options() {
        let ok = validate_options(&[" Hall ".to_string(), "Garden".to_string()]);
        assert_eq!(ok.ok(), Some(vec!["Hall".to_string(), "Garden".to_string()]));

        assert!(validate_options(&["Only one".to_string()]).is_err());
        assert!(validate_options(&["Hall".to_string(), "hall".to_string()]).is_err());
        assert!(validate_options(&["Hall".to_string(), "  ".to_string()]).is_err());

        let too_many: Vec<String> = (0..21).map(|i| format!("Option {}", i)).collect();
        assert!(validate_options(&too_many).is_err());
    }

    proptest! {
        #[test]
        fn prop_percentages_bounded(counts in proptest::collection::vec(0i64..10_000, 2..20)) {
            let (results, total) = compute_results(&options(&counts));
            let sum: f64 = results.iter().map(|r| r.percentage).sum();
            for r in &results {
                prop_assert!((0.0..=100.0).contains(&r.percentage));
            }
            if total > 0 {
                prop_assert!((sum - 100.0).abs() <= 0.05 * results.len() as f64);
            } else {
                prop_assert_eq!(sum, 0.0);
            }
        }
    }
}
