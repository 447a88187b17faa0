use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use tracing::{error, info, instrument};

use super::{
    error::AttendanceError,
    history::HistoryQuery,
    policy::AttendancePolicy,
};
use crate::{
    clock::Clock,
    model::attendance::{AttendanceEntry, AttendanceStatus, NewAttendance},
    store::{AttendanceStore, HistoryFilter, StoreError, UserStore},
    utils::pagination::Page,
};

/// Decides whether a member may check in and records at most one entry per
/// member per local calendar day.
pub struct AttendanceEngine {
    entries: Arc<dyn AttendanceStore>,
    members: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
    policy: AttendancePolicy,
}

impl AttendanceEngine {
    pub fn new(
        entries: Arc<dyn AttendanceStore>,
        members: Arc<dyn UserStore>,
        clock: Arc<dyn Clock>,
        policy: AttendancePolicy,
    ) -> Self {
        Self {
            entries,
            members,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &AttendancePolicy {
        &self.policy
    }

    /// Clock reading truncated to what the store keeps (milliseconds).
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now().trunc_subsecs(3)
    }

    /// Runs the eligibility sequence and writes the entry. The clock is read
    /// once; weekday, window and calendar day all come from that reading.
    #[instrument(name = "attendance_check_in", skip(self))]
    pub async fn check_in(&self, member_id: u64) -> Result<AttendanceEntry, AttendanceError> {
        let now = self.now();

        let member = self
            .members
            .find(member_id)
            .await
            .map_err(|e| store_failure(e, member_id, "member lookup"))?;
        if !member.is_some_and(|m| m.is_member) {
            info!("Rejected: not an active member");
            return Err(AttendanceError::NotEligible);
        }

        if let Err(violation) = self.policy.check_window(now) {
            info!(%violation, "Rejected: outside attendance window");
            return Err(violation.into());
        }

        let day = self.policy.calendar_day_of(now);

        let existing = self
            .entries
            .find_on_day(member_id, day)
            .await
            .map_err(|e| store_failure(e, member_id, "duplicate check"))?;
        if existing.is_some() {
            info!(%day, "Rejected: already checked in");
            return Err(AttendanceError::AlreadyRecorded);
        }

        // The unique key on (member, day) settles any race the pre-check missed.
        let entry = self
            .entries
            .insert(NewAttendance {
                member_id,
                recorded_at: now,
                day,
                status: AttendanceStatus::Present,
            })
            .await
            .map_err(|e| match e {
                StoreError::Duplicate => {
                    info!(%day, "Rejected: concurrent check-in already stored");
                    AttendanceError::AlreadyRecorded
                }
                other => store_failure(other, member_id, "insert"),
            })?;

        info!(entry_id = entry.id, %day, "Check-in recorded");
        Ok(entry)
    }

    /// Whether the member already has an entry for today's calendar day.
    pub async fn has_checked_in_today(&self, member_id: u64) -> Result<bool, AttendanceError> {
        let day = self.policy.calendar_day_of(self.now());
        let existing = self
            .entries
            .find_on_day(member_id, day)
            .await
            .map_err(|e| store_failure(e, member_id, "status check"))?;
        Ok(existing.is_some())
    }

    pub async fn history(&self, query: HistoryQuery) -> Result<Page<AttendanceEntry>, AttendanceError> {
        let filter = HistoryFilter {
            member_id: query.member_id,
            from: query.range.from,
            to: query.range.to,
            offset: query.page.offset(),
            limit: query.page.limit,
        };

        let (entries, total) = self.entries.page(&filter).await.map_err(|e| {
            error!(error = %e, member_id = ?query.member_id, "Attendance history query failed");
            AttendanceError::StoreFailure(e)
        })?;

        Ok(Page::new(entries, query.page, total))
    }
}

fn store_failure(e: StoreError, member_id: u64, step: &str) -> AttendanceError {
    error!(error = %e, member_id, step, "Attendance store failure");
    AttendanceError::StoreFailure(e)
}
