use crate::dates;
use crate::errors::LedgerError;
use crate::models::{
    AttendanceRecord, DailyAttendance, DailyMetadata, MetadataRecord, SLOT_COUNT, SessionVector,
    Status, Track,
};
use serde::{Deserialize, Serialize};

/// The two attendance records, the two metadata records and the
/// in-person default session names.
///
/// Mutations never patch a shared ledger in place: they build a new
/// `Ledger` value that the caller persists and swaps in as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ledger {
    #[serde(default)]
    pub attendance: AttendanceRecord,
    #[serde(default)]
    pub metadata: MetadataRecord,
    #[serde(default)]
    pub online_attendance: AttendanceRecord,
    #[serde(default)]
    pub online_metadata: MetadataRecord,
    #[serde(default = "default_session_names")]
    pub global_session_names: Vec<String>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            attendance: AttendanceRecord::new(),
            metadata: MetadataRecord::new(),
            online_attendance: AttendanceRecord::new(),
            online_metadata: MetadataRecord::new(),
            global_session_names: default_session_names(),
        }
    }
}

pub fn default_session_names() -> Vec<String> {
    (0..SLOT_COUNT).map(|slot| slot_label(Track::InPerson, slot)).collect()
}

/// Label a slot falls back to when it has no name, e.g. after its
/// session was moved away. The two tracks keep distinct patterns.
pub fn slot_label(track: Track, slot: usize) -> String {
    match track {
        Track::InPerson => format!("Session {}", slot + 1),
        Track::Online => format!("Online {}", slot + 1),
    }
}

pub fn validate_slot(slot: u8) -> Result<usize, LedgerError> {
    let index = usize::from(slot);
    if index < SLOT_COUNT {
        Ok(index)
    } else {
        Err(LedgerError::InvalidSlot(slot))
    }
}

/// Active session count recorded in metadata, or 1 when absent.
/// Out-of-range values from imported snapshots are pinned into 1..=4.
pub fn active_count_of(meta: Option<&DailyMetadata>) -> usize {
    meta.and_then(|meta| meta.session_count)
        .map(usize::from)
        .filter(|count| *count > 0)
        .unwrap_or(1)
        .min(SLOT_COUNT)
}

/// Metadata for one date and track with every default filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPlan {
    pub names: Vec<String>,
    pub hosts: Vec<String>,
    pub active_count: usize,
}

impl SessionPlan {
    pub fn into_metadata(self) -> DailyMetadata {
        DailyMetadata {
            session_names: Some(self.names),
            session_hosts: Some(self.hosts),
            session_count: Some(self.active_count as u8),
        }
    }
}

impl Ledger {
    pub fn attendance(&self, track: Track) -> &AttendanceRecord {
        match track {
            Track::InPerson => &self.attendance,
            Track::Online => &self.online_attendance,
        }
    }

    pub fn attendance_mut(&mut self, track: Track) -> &mut AttendanceRecord {
        match track {
            Track::InPerson => &mut self.attendance,
            Track::Online => &mut self.online_attendance,
        }
    }

    pub fn metadata(&self, track: Track) -> &MetadataRecord {
        match track {
            Track::InPerson => &self.metadata,
            Track::Online => &self.online_metadata,
        }
    }

    pub fn metadata_mut(&mut self, track: Track) -> &mut MetadataRecord {
        match track {
            Track::InPerson => &mut self.metadata,
            Track::Online => &mut self.online_metadata,
        }
    }

    /// Session vector for a member on a date; all `Unset` when nothing
    /// has been recorded.
    pub fn vector(&self, track: Track, date: &str, member_id: &str) -> SessionVector {
        self.attendance(track)
            .get(date)
            .and_then(|day| day.get(member_id))
            .copied()
            .unwrap_or_default()
    }

    pub fn status(
        &self,
        track: Track,
        date: &str,
        member_id: &str,
        slot: u8,
    ) -> Result<Status, LedgerError> {
        let index = validate_slot(slot)?;
        Ok(self.vector(track, date, member_id)[index])
    }

    pub fn active_count(&self, track: Track, date: &str) -> usize {
        active_count_of(self.metadata(track).get(date))
    }

    /// Track defaults: the global list for in-person, generic online
    /// labels for online. No hosts, one active session.
    pub fn default_plan(&self, track: Track) -> SessionPlan {
        let names = match track {
            Track::InPerson => self.global_session_names.clone(),
            Track::Online => Vec::new(),
        };
        SessionPlan {
            names: pad_names(track, names),
            hosts: pad_hosts(Vec::new()),
            active_count: 1,
        }
    }

    /// The single place read paths resolve a day's metadata. Missing
    /// metadata yields the track default; missing or blank names fall
    /// back to the slot label.
    pub fn resolve_metadata(&self, track: Track, date: &str) -> SessionPlan {
        let Some(meta) = self.metadata(track).get(date) else {
            return self.default_plan(track);
        };
        let names = match &meta.session_names {
            Some(names) => names.clone(),
            None => self.default_plan(track).names,
        };
        SessionPlan {
            names: pad_names(track, names),
            hosts: pad_hosts(meta.session_hosts.clone().unwrap_or_default()),
            active_count: active_count_of(Some(meta)),
        }
    }

    /// Attendance entries for the given track whose date lies in the month.
    pub fn month_entries<'a>(
        &'a self,
        track: Track,
        year: i32,
        month: u32,
    ) -> impl Iterator<Item = (&'a String, &'a DailyAttendance)> + 'a {
        let prefix = dates::month_prefix(year, month);
        self.attendance(track)
            .iter()
            .filter(move |(date, _)| date.starts_with(&prefix))
    }
}

fn pad_names(track: Track, mut names: Vec<String>) -> Vec<String> {
    names.truncate(SLOT_COUNT);
    for (slot, name) in names.iter_mut().enumerate() {
        if name.trim().is_empty() {
            *name = slot_label(track, slot);
        }
    }
    while names.len() < SLOT_COUNT {
        names.push(slot_label(track, names.len()));
    }
    names
}

fn pad_hosts(mut hosts: Vec<String>) -> Vec<String> {
    hosts.resize(SLOT_COUNT, String::new());
    hosts
}
