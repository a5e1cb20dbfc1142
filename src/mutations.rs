use crate::dates;
use crate::errors::LedgerError;
use crate::ledger::{Ledger, slot_label, validate_slot};
use crate::models::{DailyMetadata, SLOT_COUNT, Status, Track};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A ledger change request, validated before it is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    Toggle {
        date: String,
        member_id: String,
        slot: u8,
        #[serde(default)]
        track: Track,
    },
    ResetDay {
        date: String,
        track: Track,
    },
    /// Without a track, both tracks are cleared in the same snapshot.
    ClearMonth {
        year: i32,
        month: u32,
        #[serde(default)]
        track: Option<Track>,
    },
    SetMetadata {
        date: String,
        track: Track,
        names: Vec<String>,
        hosts: Vec<String>,
        active_count: u8,
    },
    MoveSession {
        source_date: String,
        source_slot: u8,
        target_date: String,
        target_slot: u8,
        track: Track,
    },
    DeleteMember {
        member_id: String,
    },
}

/// Result of an authorised-or-not mutation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The replacement snapshot.
    Applied(Ledger),
    /// Caller was not privileged; nothing changed.
    Rejected,
}

impl Mutation {
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::Toggle { .. } => "toggle",
            Mutation::ResetDay { .. } => "reset_day",
            Mutation::ClearMonth { .. } => "clear_month",
            Mutation::SetMetadata { .. } => "set_metadata",
            Mutation::MoveSession { .. } => "move_session",
            Mutation::DeleteMember { .. } => "delete_member",
        }
    }

    /// Checks everything that does not depend on ledger contents.
    pub fn validate(&self) -> Result<(), LedgerError> {
        match self {
            Mutation::Toggle { date, slot, .. } => {
                dates::parse_date_key(date)?;
                validate_slot(*slot)?;
            }
            Mutation::ResetDay { date, .. } => {
                dates::parse_date_key(date)?;
            }
            Mutation::ClearMonth { month, .. } => dates::validate_month(*month)?,
            Mutation::SetMetadata {
                date,
                names,
                hosts,
                active_count,
                ..
            } => {
                dates::parse_date_key(date)?;
                if names.len() > SLOT_COUNT {
                    return Err(LedgerError::TooManyLabels {
                        field: "session names",
                        len: names.len(),
                    });
                }
                if hosts.len() > SLOT_COUNT {
                    return Err(LedgerError::TooManyLabels {
                        field: "session hosts",
                        len: hosts.len(),
                    });
                }
                if !(1..=SLOT_COUNT as u8).contains(active_count) {
                    return Err(LedgerError::InvalidActiveCount(*active_count));
                }
            }
            Mutation::MoveSession {
                source_date,
                source_slot,
                target_date,
                target_slot,
                ..
            } => {
                dates::parse_date_key(source_date)?;
                dates::parse_date_key(target_date)?;
                validate_slot(*source_slot)?;
                validate_slot(*target_slot)?;
            }
            Mutation::DeleteMember { .. } => {}
        }
        Ok(())
    }
}

/// Applies `mutation` to a copy of `ledger`.
///
/// The input is never touched. Unprivileged callers get
/// [`Outcome::Rejected`]; invalid input returns an error before any
/// change is made.
pub fn apply(ledger: &Ledger, mutation: &Mutation, privileged: bool) -> Result<Outcome, LedgerError> {
    if !privileged {
        warn!(op = mutation.kind(), "rejected unprivileged mutation");
        return Ok(Outcome::Rejected);
    }
    mutation.validate()?;

    let mut next = ledger.clone();
    match mutation {
        Mutation::Toggle {
            date,
            member_id,
            slot,
            track,
        } => toggle(&mut next, *track, date, member_id, *slot)?,
        Mutation::ResetDay { date, track } => reset_day(&mut next, *track, date),
        Mutation::ClearMonth { year, month, track } => match track {
            Some(track) => clear_month(&mut next, *track, *year, *month),
            None => {
                for track in Track::ALL {
                    clear_month(&mut next, track, *year, *month);
                }
            }
        },
        Mutation::SetMetadata {
            date,
            track,
            names,
            hosts,
            active_count,
        } => set_metadata(&mut next, *track, date, names, hosts, *active_count),
        Mutation::MoveSession {
            source_date,
            source_slot,
            target_date,
            target_slot,
            track,
        } => move_session(
            &mut next,
            *track,
            source_date,
            *source_slot,
            target_date,
            *target_slot,
        )?,
        Mutation::DeleteMember { member_id } => delete_member(&mut next, member_id),
    }
    debug!(op = mutation.kind(), "mutation applied");
    Ok(Outcome::Applied(next))
}

/// Advances one cell to the next status. The slot must be active on
/// that date.
pub fn toggle(
    ledger: &mut Ledger,
    track: Track,
    date: &str,
    member_id: &str,
    slot: u8,
) -> Result<(), LedgerError> {
    let index = validate_slot(slot)?;
    let active_count = ledger.active_count(track, date);
    if index >= active_count {
        return Err(LedgerError::InactiveSlot { slot, active_count });
    }
    let vector = ledger
        .attendance_mut(track)
        .entry(date.to_string())
        .or_default()
        .entry(member_id.to_string())
        .or_default();
    vector[index] = vector[index].next();
    Ok(())
}

pub fn reset_day(ledger: &mut Ledger, track: Track, date: &str) {
    ledger.attendance_mut(track).remove(date);
}

pub fn clear_month(ledger: &mut Ledger, track: Track, year: i32, month: u32) {
    let prefix = dates::month_prefix(year, month);
    ledger
        .attendance_mut(track)
        .retain(|date, _| !date.starts_with(&prefix));
}

pub fn set_metadata(
    ledger: &mut Ledger,
    track: Track,
    date: &str,
    names: &[String],
    hosts: &[String],
    active_count: u8,
) {
    ledger.metadata_mut(track).insert(
        date.to_string(),
        DailyMetadata {
            session_names: Some(names.to_vec()),
            session_hosts: Some(hosts.to_vec()),
            session_count: Some(active_count),
        },
    );
}

/// Relocates one session, attendance and identity, from
/// `(source_date, source_slot)` to `(target_date, target_slot)`.
///
/// Works on the caller's copy, so a failure leaves nothing half moved.
pub fn move_session(
    ledger: &mut Ledger,
    track: Track,
    source_date: &str,
    source_slot: u8,
    target_date: &str,
    target_slot: u8,
) -> Result<(), LedgerError> {
    let source = validate_slot(source_slot)?;
    let target = validate_slot(target_slot)?;
    let active_count = ledger.active_count(track, source_date);
    if source >= active_count {
        return Err(LedgerError::InactiveSlot {
            slot: source_slot,
            active_count,
        });
    }
    if source_date == target_date && source == target {
        return Ok(());
    }

    let record = ledger.attendance_mut(track);
    let moved: Vec<(String, Status)> = record
        .get(source_date)
        .map(|day| {
            day.iter()
                .filter(|(_, vector)| vector[source] != Status::Unset)
                .map(|(member_id, vector)| (member_id.clone(), vector[source]))
                .collect()
        })
        .unwrap_or_default();

    if !moved.is_empty() {
        if let Some(day) = record.get_mut(source_date) {
            for (member_id, _) in &moved {
                if let Some(vector) = day.get_mut(member_id) {
                    vector[source] = Status::Unset;
                }
            }
        }
        let day = record.entry(target_date.to_string()).or_default();
        for (member_id, status) in moved {
            day.entry(member_id).or_default()[target] = status;
        }
    }

    let source_plan = ledger.resolve_metadata(track, source_date);
    let name = source_plan.names[source].clone();
    let host = source_plan.hosts[source].clone();

    let mut vacated = source_plan;
    vacated.names[source] = slot_label(track, source);
    vacated.hosts[source] = String::new();
    ledger
        .metadata_mut(track)
        .insert(source_date.to_string(), vacated.into_metadata());

    // Resolved after the source write so a same-day move sees the vacated slot.
    let mut filled = ledger.resolve_metadata(track, target_date);
    filled.names[target] = name;
    filled.hosts[target] = host;
    if target >= filled.active_count {
        filled.active_count = target + 1;
    }
    ledger
        .metadata_mut(track)
        .insert(target_date.to_string(), filled.into_metadata());

    Ok(())
}

/// Drops the member's vectors from every date in both tracks.
pub fn delete_member(ledger: &mut Ledger, member_id: &str) {
    for track in Track::ALL {
        for day in ledger.attendance_mut(track).values_mut() {
            day.remove(member_id);
        }
    }
}
