use crate::ledger::Ledger;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of session slots tracked per day.
pub const SLOT_COUNT: usize = 4;

/// Attendance state of one member in one session slot.
///
/// Stored as `0`, `1` or `2` so snapshots stay compact and match the
/// shape the sync layer pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Status {
    #[default]
    Unset,
    Attended,
    NoShow,
}

impl Status {
    /// Unset -> Attended -> NoShow -> Unset.
    pub fn next(self) -> Self {
        match self {
            Status::Unset => Status::Attended,
            Status::Attended => Status::NoShow,
            Status::NoShow => Status::Unset,
        }
    }
}

impl From<Status> for u8 {
    fn from(status: Status) -> Self {
        match status {
            Status::Unset => 0,
            Status::Attended => 1,
            Status::NoShow => 2,
        }
    }
}

impl TryFrom<u8> for Status {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Status::Unset),
            1 => Ok(Status::Attended),
            2 => Ok(Status::NoShow),
            other => Err(format!("invalid attendance status {other}")),
        }
    }
}

pub type SessionVector = [Status; SLOT_COUNT];

/// member id -> session vector
pub type DailyAttendance = BTreeMap<String, SessionVector>;

/// `YYYY-MM-DD` -> daily attendance
pub type AttendanceRecord = BTreeMap<String, DailyAttendance>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DailyMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_hosts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_count: Option<u8>,
}

/// `YYYY-MM-DD` -> daily metadata
pub type MetadataRecord = BTreeMap<String, DailyMetadata>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    #[default]
    InPerson,
    Online,
}

impl Track {
    pub const ALL: [Track; 2] = [Track::InPerson, Track::Online];

    pub fn as_str(self) -> &'static str {
        match self {
            Track::InPerson => "in_person",
            Track::Online => "online",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub name: String,
    pub joined_at: String,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_leader: bool,
    /// Most recent first, at most three entries.
    #[serde(default)]
    pub previous_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannedMember {
    pub id: String,
    pub name: String,
    pub reason: String,
    pub banned_at: String,
}

/// Everything the service persists, as one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClubData {
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub banned_members: Vec<BannedMember>,
    #[serde(flatten)]
    pub ledger: Ledger,
    #[serde(default)]
    pub club_link: String,
    #[serde(default)]
    pub club_notice: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SlotCounts {
    pub attended: u32,
    pub no_show: u32,
}

impl SlotCounts {
    pub fn from_sessions(sessions: &[Status]) -> Self {
        let mut counts = SlotCounts::default();
        for status in sessions {
            match status {
                Status::Attended => counts.attended += 1,
                Status::NoShow => counts.no_show += 1,
                Status::Unset => {}
            }
        }
        counts
    }

    pub fn is_empty(&self) -> bool {
        self.attended == 0 && self.no_show == 0
    }
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub name: String,
    pub joined_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberPatch {
    pub name: Option<String>,
    pub joined_at: Option<String>,
    pub is_staff: Option<bool>,
    pub is_leader: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct AddBannedRequest {
    pub name: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SettingsRequest {
    pub global_session_names: Option<Vec<String>>,
    pub club_link: Option<String>,
    pub club_notice: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Settings {
    pub global_session_names: Vec<String>,
    pub club_link: String,
    pub club_notice: String,
}

impl From<&ClubData> for Settings {
    fn from(data: &ClubData) -> Self {
        Self {
            global_session_names: data.ledger.global_session_names.clone(),
            club_link: data.club_link.clone(),
            club_notice: data.club_notice.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MonthQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MutationResponse {
    pub op: String,
    pub applied: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MemberDay {
    pub member_id: String,
    pub name: String,
    pub previous_names: Vec<String>,
    /// Active slots only.
    pub sessions: Vec<Status>,
    pub attended: u32,
    pub no_show: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrackDay {
    pub session_names: Vec<String>,
    pub session_hosts: Vec<String>,
    pub active_count: usize,
    pub slot_totals: Vec<u32>,
    pub members: Vec<MemberDay>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DayView {
    pub date: String,
    pub in_person: TrackDay,
    pub online: TrackDay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberStats {
    pub member_id: String,
    pub name: String,
    pub in_person_monthly: u32,
    pub in_person_no_show_monthly: u32,
    pub online_monthly: u32,
    pub online_no_show_monthly: u32,
    pub in_person_previous_month: u32,
    pub in_person_yearly: u32,
    pub cumulative: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub member_id: String,
    pub name: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostCount {
    pub name: String,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Totals {
    pub monthly_attended: u32,
    pub cumulative_attended: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Dashboard {
    pub year: i32,
    pub month: u32,
    pub member_stats: Vec<MemberStats>,
    pub monthly_ranking: Vec<RankingEntry>,
    pub yearly_ranking: Vec<RankingEntry>,
    pub previous_month_ranking: Vec<RankingEntry>,
    pub top_hosts: Vec<HostCount>,
    pub totals: Totals,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MemberMonthCounts {
    pub member_id: String,
    pub name: String,
    pub in_person: u32,
    pub online: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MonthSummary {
    pub year: i32,
    pub month: u32,
    pub in_person_held: u32,
    pub online_held: u32,
    pub total_attended: u32,
    pub members: Vec<MemberMonthCounts>,
}

/// One export row: a member's per-day counts on one track for a month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberMonthRow {
    pub member_id: String,
    pub name: String,
    pub track: Track,
    pub days: Vec<SlotCounts>,
    pub totals: SlotCounts,
}
