//! Attendance tracking for the teacher view.
//!
//! One record per participant identity. A record is created on the first
//! connect and only ever mutated by connect/disconnect transitions; stay time
//! accumulates when a session closes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::metadata::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Offline,
}

/// One continuous connected interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceSession {
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRecord {
    pub identity: String,
    pub role: Role,
    pub first_joined: DateTime<Utc>,
    pub last_joined: DateTime<Utc>,
    pub last_left: Option<DateTime<Utc>>,
    /// Sum of closed sessions, in milliseconds.
    #[serde(rename = "totalStayTime")]
    pub total_stay_ms: u64,
    pub join_count: u32,
    pub status: PresenceStatus,
    pub sessions: Vec<PresenceSession>,
}

impl ParticipantRecord {
    fn new(identity: &str, role: Role, now: DateTime<Utc>) -> Self {
        Self {
            identity: identity.to_string(),
            role,
            first_joined: now,
            last_joined: now,
            last_left: None,
            total_stay_ms: 0,
            join_count: 0,
            status: PresenceStatus::Offline,
            sessions: Vec::new(),
        }
    }

    pub fn is_online(&self) -> bool {
        self.status == PresenceStatus::Online
    }

    fn has_open_session(&self) -> bool {
        self.sessions.iter().any(|s| s.left_at.is_none())
    }

    /// Stay time including the currently open session, if any.
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        if self.is_online() {
            self.total_stay_ms + millis_between(self.last_joined, now)
        } else {
            self.total_stay_ms
        }
    }
}

fn millis_between(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    (to - from).num_milliseconds().max(0) as u64
}

#[derive(Debug, Clone, Default)]
pub struct AttendanceTracker {
    records: Vec<ParticipantRecord>,
}

impl AttendanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_connect(&mut self, identity: &str, role: Role) -> bool {
        self.on_connect_at(identity, role, Utc::now())
    }

    pub fn on_disconnect(&mut self, identity: &str) -> bool {
        self.on_disconnect_at(identity, Utc::now())
    }

    /// Opens a session for `identity`. Returns false when one is already open.
    pub fn on_connect_at(&mut self, identity: &str, role: Role, now: DateTime<Utc>) -> bool {
        let index = match self.records.iter().position(|r| r.identity == identity) {
            Some(index) => index,
            None => {
                self.records.push(ParticipantRecord::new(identity, role, now));
                self.records.len() - 1
            }
        };
        let record = &mut self.records[index];

        if record.is_online() && record.has_open_session() {
            debug!("Duplicate connect for {} ignored", identity);
            return false;
        }

        record.sessions.push(PresenceSession {
            joined_at: now,
            left_at: None,
        });
        record.join_count += 1;
        record.status = PresenceStatus::Online;
        record.last_joined = now;
        record.role = role;

        info!(
            "Participant {} connected as {} (join #{})",
            identity, role, record.join_count
        );
        true
    }

    /// Closes the open session for `identity`. Returns false when already offline.
    pub fn on_disconnect_at(&mut self, identity: &str, now: DateTime<Utc>) -> bool {
        let Some(record) = self.records.iter_mut().find(|r| r.identity == identity) else {
            debug!("Disconnect for unknown participant {} ignored", identity);
            return false;
        };

        if !record.is_online() {
            return false;
        }

        if let Some(open) = record.sessions.iter_mut().rev().find(|s| s.left_at.is_none()) {
            open.left_at = Some(now);
        }
        let stay = millis_between(record.last_joined, now);
        record.total_stay_ms += stay;
        record.status = PresenceStatus::Offline;
        record.last_left = Some(now);

        info!(
            "Participant {} disconnected after {} ms (total {} ms)",
            identity, stay, record.total_stay_ms
        );
        true
    }

    pub fn get(&self, identity: &str) -> Option<&ParticipantRecord> {
        self.records.iter().find(|r| r.identity == identity)
    }

    /// All records in first-join order.
    pub fn records(&self) -> &[ParticipantRecord] {
        &self.records
    }

    pub fn students(&self) -> impl Iterator<Item = &ParticipantRecord> {
        self.records.iter().filter(|r| r.role == Role::Student)
    }

    pub fn online_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_online()).count()
    }
}
