use crate::api::{ApiError, HrApi};
use crate::expiry::format_wire_date;
use crate::model::{LeaveBalance, LeaveRequest};
use thiserror::Error;
use time::{Date, Duration, Weekday};
use tracing::info;

#[derive(Debug, Error)]
pub enum LeaveError {
    #[error("Please select a leave type")]
    MissingLeaveType,
    #[error("Please provide a reason for your leave")]
    MissingReason,
    #[error("Insufficient leave balance. You have only {remaining} days remaining.")]
    InsufficientBalance { remaining: f64 },
    #[error("{message}")]
    Api {
        message: String,
        #[source]
        source: ApiError,
    },
}

/// Inclusive leave range. An end before the start collapses to a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveRange {
    pub start: Date,
    pub end: Date,
    collapsed: bool,
}

impl LeaveRange {
    pub fn new(start: Date, end: Date) -> Self {
        Self {
            start,
            end: end.max(start),
            collapsed: end < start,
        }
    }

    /// Days in the range that fall Monday through Friday. A collapsed range is one day
    /// whatever its weekday.
    pub fn working_days(&self) -> u32 {
        if self.collapsed {
            return 1;
        }
        let mut days = 0;
        let mut current = self.start;
        while current <= self.end {
            if !matches!(current.weekday(), Weekday::Saturday | Weekday::Sunday) {
                days += 1;
            }
            current += Duration::days(1);
        }
        days
    }

    /// Build the request body; the leave type and reason must not be blank.
    pub fn to_request(&self, leave_type: &str, reason: &str) -> Result<LeaveRequest, LeaveError> {
        let leave_type = leave_type.trim();
        if leave_type.is_empty() {
            return Err(LeaveError::MissingLeaveType);
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LeaveError::MissingReason);
        }
        Ok(LeaveRequest {
            start_date: format_wire_date(self.start),
            end_date: format_wire_date(self.end),
            number_of_days: self.working_days(),
            leave_type: leave_type.to_string(),
            reason: reason.to_string(),
        })
    }
}

pub fn check_balance(days: u32, balance: &LeaveBalance) -> Result<(), LeaveError> {
    if f64::from(days) > balance.remaining_leaves {
        return Err(LeaveError::InsufficientBalance {
            remaining: balance.remaining_leaves,
        });
    }
    Ok(())
}

fn api_error(fallback: &str) -> impl FnOnce(ApiError) -> LeaveError + '_ {
    move |source| LeaveError::Api {
        message: source.user_message(fallback),
        source,
    }
}

/// Check the balance and file the request. Returns the balance seen before applying.
pub async fn apply_for_leave<A: HrApi>(
    api: &A,
    request: &LeaveRequest,
) -> Result<LeaveBalance, LeaveError> {
    let balance = api
        .leave_balance()
        .await
        .map_err(api_error("Failed to fetch your leave balance"))?;
    check_balance(request.number_of_days, &balance)?;
    api.apply_leave(request)
        .await
        .map_err(api_error("Failed to apply for leave"))?;
    info!(
        days = request.number_of_days,
        leave_type = %request.leave_type,
        "leave application submitted"
    );
    Ok(balance)
}
