//! Telehealth session aggregate

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{ClientId, Patch, SessionId, TenantId};

use crate::error::SessionError;

pub const MIN_DURATION_MINUTES: i32 = 5;
pub const MAX_DURATION_MINUTES: i32 = 480;

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Booked, not yet started
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    /// The client never joined
    NoShow,
}

impl SessionStatus {
    pub const ALL: [SessionStatus; 5] = [
        SessionStatus::Scheduled,
        SessionStatus::InProgress,
        SessionStatus::Completed,
        SessionStatus::Cancelled,
        SessionStatus::NoShow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "SCHEDULED",
            SessionStatus::InProgress => "IN_PROGRESS",
            SessionStatus::Completed => "COMPLETED",
            SessionStatus::Cancelled => "CANCELLED",
            SessionStatus::NoShow => "NO_SHOW",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SessionStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SessionError::Validation(format!("unknown session status '{}'", s)))
    }
}

/// Lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionEvent {
    Start,
    Complete,
    Cancel,
    MarkNoShow,
}

impl SessionEvent {
    pub const ALL: [SessionEvent; 4] = [
        SessionEvent::Start,
        SessionEvent::Complete,
        SessionEvent::Cancel,
        SessionEvent::MarkNoShow,
    ];
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// `(from, event, to)` for every allowed move
pub const LIFECYCLE: [(SessionStatus, SessionEvent, SessionStatus); 5] = [
    (SessionStatus::Scheduled, SessionEvent::Start, SessionStatus::InProgress),
    (SessionStatus::Scheduled, SessionEvent::Cancel, SessionStatus::Cancelled),
    (SessionStatus::Scheduled, SessionEvent::MarkNoShow, SessionStatus::NoShow),
    (SessionStatus::InProgress, SessionEvent::Complete, SessionStatus::Completed),
    (SessionStatus::InProgress, SessionEvent::Cancel, SessionStatus::Cancelled),
];

pub fn next_status(from: SessionStatus, event: SessionEvent) -> Result<SessionStatus, SessionError> {
    LIFECYCLE
        .iter()
        .find(|(f, e, _)| *f == from && *e == event)
        .map(|(_, _, to)| *to)
        .ok_or(SessionError::InvalidTransition { from, event })
}

fn check_duration(minutes: i32) -> Result<(), SessionError> {
    if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&minutes) {
        return Err(SessionError::Validation(format!(
            "duration must be between {} and {} minutes, got {}",
            MIN_DURATION_MINUTES, MAX_DURATION_MINUTES, minutes
        )));
    }
    Ok(())
}

fn clean_clinician(name: &str) -> Result<String, SessionError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SessionError::Validation("clinician name is required".into()));
    }
    Ok(name.to_string())
}

/// A scheduled video visit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelehealthSession {
    pub id: SessionId,
    pub tenant_id: TenantId,
    pub client_id: ClientId,
    pub clinician_name: String,
    pub scheduled_start: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: SessionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub notes: Option<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TelehealthSession {
    pub fn scheduled_end(&self) -> DateTime<Utc> {
        self.scheduled_start + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Moves the session along the lifecycle, stamping times as it goes
    ///
    /// `reason` is only kept for `Cancel`.
    pub fn apply(
        &mut self,
        event: SessionEvent,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<SessionStatus, SessionError> {
        let from = self.status;
        let to = next_status(from, event)?;

        match event {
            SessionEvent::Start => self.started_at = Some(now),
            SessionEvent::Complete => self.ended_at = Some(now),
            SessionEvent::Cancel => {
                self.cancellation_reason = reason.filter(|r| !r.trim().is_empty());
                if from == SessionStatus::InProgress {
                    self.ended_at = Some(now);
                }
            }
            SessionEvent::MarkNoShow => {}
        }

        self.status = to;
        self.updated_at = now;
        Ok(to)
    }

    pub fn reschedule(&mut self, cmd: Reschedule, now: DateTime<Utc>) -> Result<(), SessionError> {
        if self.status != SessionStatus::Scheduled {
            return Err(SessionError::InvalidState(format!(
                "session {} is {} and only SCHEDULED sessions can be rescheduled",
                self.id, self.status
            )));
        }
        if let Some(minutes) = cmd.duration_minutes {
            check_duration(minutes)?;
            self.duration_minutes = minutes;
        }
        if let Some(name) = cmd.clinician_name {
            self.clinician_name = clean_clinician(&name)?;
        }
        if let Some(start) = cmd.scheduled_start {
            self.scheduled_start = start;
        }
        cmd.notes.apply_to(&mut self.notes);
        self.updated_at = now;
        Ok(())
    }
}

/// Command to book a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSession {
    pub client_id: ClientId,
    pub clinician_name: String,
    pub scheduled_start: DateTime<Utc>,
    pub duration_minutes: i32,
    pub notes: Option<String>,
}

impl NewSession {
    /// Checks the command and returns the trimmed clinician name
    pub fn validate(&self) -> Result<String, SessionError> {
        check_duration(self.duration_minutes)?;
        clean_clinician(&self.clinician_name)
    }
}

/// Changes allowed while a session is still SCHEDULED
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reschedule {
    pub scheduled_start: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub clinician_name: Option<String>,
    #[serde(default)]
    pub notes: Patch<String>,
}
