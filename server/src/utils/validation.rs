//! Request validation helpers

use super::error::{AppError, AppResult};

/// Reject empty or whitespace-only titles, returning the trimmed value
pub fn require_title(title: &str) -> AppResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Title must not be empty".into()));
    }
    Ok(trimmed.to_string())
}

/// Credit amounts must sit inside the configured per-session window
pub fn require_credit_amount(amount: i64, max: i64) -> AppResult<()> {
    if amount < 1 || amount > max {
        return Err(AppError::Validation(format!(
            "Credit amount must be between 1 and {max}, got {amount}"
        )));
    }
    Ok(())
}

/// The two sides of an exchange must be different users
pub fn require_distinct_parties(learner_id: i64, teacher_id: i64) -> AppResult<()> {
    if learner_id == teacher_id {
        return Err(AppError::Validation(
            "Learner and teacher must be different users".into(),
        ));
    }
    Ok(())
}
