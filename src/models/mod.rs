use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub type UserId = String;
pub type ItemId = String;

/// A single explicit score given by a user to an item.
///
/// Scores are expected in `1..=10`; nothing here enforces that.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rating {
    pub user: UserId,
    pub item: ItemId,
    pub score: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedbackStatus {
    Watching,
    Completed,
    #[serde(rename = "On-Hold")]
    OnHold,
    Dropped,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImplicitFeedback {
    pub user: UserId,
    pub item: ItemId,
    pub status: FeedbackStatus,
}

/// One row of the top-K ranking test: a user's top rated held-out item
/// together with the randomly drawn items it is ranked against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopKCase {
    pub user: UserId,
    pub top_item: ItemId,
    pub distractors: Vec<ItemId>,
}

impl Rating {
    pub fn new(user: impl Into<UserId>, item: impl Into<ItemId>, score: i32) -> Self {
        Self {
            user: user.into(),
            item: item.into(),
            score,
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "User: {} Item: {} Score: {}", self.user, self.item, self.score)
    }
}

impl FeedbackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackStatus::Watching => "Watching",
            FeedbackStatus::Completed => "Completed",
            FeedbackStatus::OnHold => "On-Hold",
            FeedbackStatus::Dropped => "Dropped",
        }
    }
}

impl fmt::Display for FeedbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Watching" => Ok(FeedbackStatus::Watching),
            "Completed" => Ok(FeedbackStatus::Completed),
            "On-Hold" | "OnHold" => Ok(FeedbackStatus::OnHold),
            "Dropped" => Ok(FeedbackStatus::Dropped),
            other => Err(format!("Unknown feedback status: {}", other)),
        }
    }
}

impl ImplicitFeedback {
    pub fn new(user: impl Into<UserId>, item: impl Into<ItemId>, status: FeedbackStatus) -> Self {
        Self {
            user: user.into(),
            item: item.into(),
            status,
        }
    }

    /// Everything except a dropped item counts as a positive signal.
    pub fn is_positive(&self) -> bool {
        self.status != FeedbackStatus::Dropped
    }
}

impl fmt::Display for ImplicitFeedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "User: {} Item: {} Status: {}", self.user, self.item, self.status)
    }
}

impl TopKCase {
    pub fn new(user: impl Into<UserId>, top_item: impl Into<ItemId>, distractors: Vec<ItemId>) -> Self {
        Self {
            user: user.into(),
            top_item: top_item.into(),
            distractors,
        }
    }

    /// Groups flat `(user, top item, distractor)` rows into cases, keeping
    /// the order in which each `(user, top item)` pair first appears.
    pub fn group_rows<I, U, T, D>(rows: I) -> Vec<TopKCase>
    where
        I: IntoIterator<Item = (U, T, D)>,
        U: Into<UserId>,
        T: Into<ItemId>,
        D: Into<ItemId>,
    {
        let mut cases: Vec<TopKCase> = Vec::new();
        let mut positions: HashMap<(UserId, ItemId), usize> = HashMap::new();

        for (user, top_item, distractor) in rows {
            let key = (user.into(), top_item.into());
            let index = match positions.get(&key) {
                Some(&index) => index,
                None => {
                    cases.push(TopKCase::new(key.0.clone(), key.1.clone(), Vec::new()));
                    positions.insert(key, cases.len() - 1);
                    cases.len() - 1
                }
            };
            cases[index].distractors.push(distractor.into());
        }

        cases
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polarity_is_derived_from_status() {
        assert!(ImplicitFeedback::new("u", "i", FeedbackStatus::Watching).is_positive());
        assert!(ImplicitFeedback::new("u", "i", FeedbackStatus::Completed).is_positive());
        assert!(ImplicitFeedback::new("u", "i", FeedbackStatus::OnHold).is_positive());
        assert!(!ImplicitFeedback::new("u", "i", FeedbackStatus::Dropped).is_positive());
    }

    #[test]
    fn test_status_serde_names() {
        let json = serde_json::to_string(&FeedbackStatus::OnHold).unwrap();
        assert_eq!(json, "\"On-Hold\"");
        let parsed: FeedbackStatus = serde_json::from_str("\"Dropped\"").unwrap();
        assert_eq!(parsed, FeedbackStatus::Dropped);
        assert_eq!("On-Hold".parse::<FeedbackStatus>().unwrap(), FeedbackStatus::OnHold);
        assert!("Plan to Watch".parse::<FeedbackStatus>().is_err());
    }

    #[test]
    fn test_group_rows_preserves_first_seen_order() {
        let rows = vec![
            ("u2", "a", "x"),
            ("u1", "b", "y"),
            ("u2", "a", "z"),
        ];
        let cases = TopKCase::group_rows(rows);

        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].user, "u2");
        assert_eq!(cases[0].distractors, vec!["x".to_string(), "z".to_string()]);
        assert_eq!(cases[1].top_item, "b");
    }
}
