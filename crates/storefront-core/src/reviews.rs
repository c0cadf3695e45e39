//! Review ratings and the derived per-product rating summary.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::CoreError;

const MAX_TITLE_LEN: usize = 100;

/// A star rating, always within `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i16")]
pub struct Rating(i16);

impl Rating {
    pub const MIN: i16 = 1;
    pub const MAX: i16 = 5;

    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRating`] when `value` is outside `1..=5`.
    pub fn new(value: i64) -> Result<Self, CoreError> {
        match i16::try_from(value) {
            Ok(v) if (Self::MIN..=Self::MAX).contains(&v) => Ok(Self(v)),
            _ => Err(CoreError::InvalidRating(value)),
        }
    }

    #[must_use]
    pub fn get(self) -> i16 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = CoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for i16 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Count and mean of the ratings attached to one product.
///
/// `average` is rounded to one decimal place, half away from zero, and is
/// zero when there are no ratings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RatingSummary {
    pub count: i32,
    pub average: Decimal,
}

impl RatingSummary {
    pub const EMPTY: Self = Self {
        count: 0,
        average: Decimal::ZERO,
    };

    #[must_use]
    pub fn from_ratings(ratings: &[i16]) -> Self {
        if ratings.is_empty() {
            return Self::EMPTY;
        }
        let sum: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
        let count = ratings.len();
        let average = (Decimal::from(sum) / Decimal::from(count))
            .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);

        Self {
            count: i32::try_from(count).unwrap_or(i32::MAX),
            average,
        }
    }
}

/// Trim and validate a review title (1–100 characters).
///
/// # Errors
///
/// Returns [`CoreError::InvalidField`] when the title is blank or too long.
pub fn validate_title(title: &str) -> Result<String, CoreError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidField {
            field: "title",
            reason: "must not be empty".to_string(),
        });
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(CoreError::InvalidField {
            field: "title",
            reason: format!("must be at most {MAX_TITLE_LEN} characters"),
        });
    }
    Ok(trimmed.to_owned())
}

/// Trim and validate a review comment.
///
/// # Errors
///
/// Returns [`CoreError::InvalidField`] when the comment is blank.
pub fn validate_comment(comment: &str) -> Result<String, CoreError> {
    let trimmed = comment.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidField {
            field: "comment",
            reason: "must not be empty".to_string(),
        });
    }
    Ok(trimmed.to_owned())
}
