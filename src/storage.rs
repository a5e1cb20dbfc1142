use crate::errors::{AppError, LedgerError};
use crate::models::ClubData;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs;
use tracing::{error, info, warn};

/// Loads the snapshot at `path`, starting empty when there is none.
///
/// An unreadable snapshot is moved to a `.corrupt` sibling first, so the
/// next write cannot destroy it.
pub async fn load_data(path: &Path) -> ClubData {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(data) => data,
            Err(err) => {
                error!("failed to parse data file: {err}");
                let aside = sibling_path(path, "corrupt");
                match fs::rename(path, &aside).await {
                    Ok(()) => warn!("moved unreadable data file to {}", aside.display()),
                    Err(err) => error!("failed to move {} aside: {err}", path.display()),
                }
                ClubData::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            info!("no data file at {}, starting empty", path.display());
            ClubData::default()
        }
        Err(err) => {
            error!("failed to read data file: {err}");
            ClubData::default()
        }
    }
}

/// Writes the snapshot next to `path` and renames it into place, so a
/// failed write never leaves a truncated file behind.
pub async fn persist_data(path: &Path, data: &ClubData) -> Result<(), AppError> {
    let payload = serde_json::to_vec_pretty(data).map_err(AppError::internal)?;
    let tmp = sibling_path(path, "tmp");
    if let Err(err) = fs::write(&tmp, payload).await {
        error!("failed to write {}: {err}", tmp.display());
        return Err(AppError::internal(err));
    }
    if let Err(err) = fs::rename(&tmp, path).await {
        error!("failed to replace {}: {err}", path.display());
        let _ = fs::remove_file(&tmp).await;
        return Err(AppError::internal(err));
    }
    Ok(())
}

/// `club.json` -> `club.json.<suffix>`
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "club.json".into());
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// The independently replaceable parts of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordName {
    Members,
    BannedMembers,
    Attendance,
    Metadata,
    OnlineAttendance,
    OnlineMetadata,
    GlobalSessionNames,
    ClubLink,
    ClubNotice,
}

impl FromStr for RecordName {
    type Err = LedgerError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Ok(match name {
            "members" => RecordName::Members,
            "bannedMembers" => RecordName::BannedMembers,
            "attendance" => RecordName::Attendance,
            "metadata" => RecordName::Metadata,
            "onlineAttendance" => RecordName::OnlineAttendance,
            "onlineMetadata" => RecordName::OnlineMetadata,
            // Older backups used the short name.
            "globalSessionNames" | "globalSessions" => RecordName::GlobalSessionNames,
            "clubLink" => RecordName::ClubLink,
            "clubNotice" => RecordName::ClubNotice,
            other => return Err(LedgerError::UnknownRecord(other.to_string())),
        })
    }
}

/// Replaces one record of `data` with `value` as a whole. Nothing is
/// changed when `value` does not have the record's shape.
pub fn replace_record(data: &mut ClubData, record: RecordName, value: Value) -> Result<(), serde_json::Error> {
    match record {
        RecordName::Members => data.members = serde_json::from_value(value)?,
        RecordName::BannedMembers => data.banned_members = serde_json::from_value(value)?,
        RecordName::Attendance => data.ledger.attendance = serde_json::from_value(value)?,
        RecordName::Metadata => data.ledger.metadata = serde_json::from_value(value)?,
        RecordName::OnlineAttendance => {
            data.ledger.online_attendance = serde_json::from_value(value)?
        }
        RecordName::OnlineMetadata => data.ledger.online_metadata = serde_json::from_value(value)?,
        RecordName::GlobalSessionNames => {
            data.ledger.global_session_names = serde_json::from_value(value)?
        }
        RecordName::ClubLink => data.club_link = serde_json::from_value(value)?,
        RecordName::ClubNotice => data.club_notice = serde_json::from_value(value)?,
    }
    Ok(())
}

/// Builds the snapshot that results from importing a backup: every known
/// record present in `backup` replaces the current one, everything else
/// is kept. Unknown keys such as export timestamps are ignored.
pub fn import_backup(current: &ClubData, backup: Value) -> Result<ClubData, AppError> {
    let Value::Object(records) = backup else {
        return Err(AppError::bad_request("backup must be a JSON object"));
    };
    let mut next = current.clone();
    for (key, value) in records {
        let Ok(record) = key.parse::<RecordName>() else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        replace_record(&mut next, record, value)
            .map_err(|err| AppError::bad_request(format!("invalid {key}: {err}")))?;
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Member, Status};
    use serde_json::json;

    #[tokio::test]
    async fn persist_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("club.json");

        let mut data = ClubData::default();
        data.club_notice = "Bring snacks".to_string();
        data.ledger
            .attendance
            .entry("2026-03-05".to_string())
            .or_default()
            .insert("a".to_string(), [Status::Attended, Status::Unset, Status::Unset, Status::NoShow]);

        persist_data(&path, &data).await.unwrap();
        assert!(!sibling_path(&path, "tmp").exists());
        assert_eq!(load_data(&path).await, data);
    }

    #[tokio::test]
    async fn missing_or_corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("club.json");
        assert_eq!(load_data(&path).await, ClubData::default());

        tokio::fs::write(&path, b"{ not json").await.unwrap();
        assert_eq!(load_data(&path).await, ClubData::default());
    }

    #[tokio::test]
    async fn corrupt_file_is_kept_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("club.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        assert_eq!(load_data(&path).await, ClubData::default());
        assert!(!path.exists());
        let aside = dir.path().join("club.json.corrupt");
        assert_eq!(tokio::fs::read(&aside).await.unwrap(), b"{ not json");

        persist_data(&path, &ClubData::default()).await.unwrap();
        assert_eq!(tokio::fs::read(&aside).await.unwrap(), b"{ not json");
    }

    #[tokio::test]
    async fn failed_write_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("club.json");
        assert!(persist_data(&path, &ClubData::default()).await.is_err());
    }

    #[test]
    fn statuses_are_stored_as_numbers() {
        let value = json!({
            "attendance": { "2026-03-05": { "a": [1, 2, 0, 0] } },
            "metadata": { "2026-03-05": { "sessionCount": 2, "sessionHosts": ["Sam", ""] } }
        });
        let data: ClubData = serde_json::from_value(value).unwrap();
        assert_eq!(
            data.ledger.vector(crate::models::Track::InPerson, "2026-03-05", "a"),
            [Status::Attended, Status::NoShow, Status::Unset, Status::Unset]
        );
        assert_eq!(data.ledger.global_session_names.len(), 4);

        let bad = json!({ "attendance": { "2026-03-05": { "a": [3, 0, 0, 0] } } });
        assert!(serde_json::from_value::<ClubData>(bad).is_err());
    }

    #[test]
    fn replace_record_swaps_one_record_only() {
        let mut data = ClubData::default();
        data.club_link = "https://example.org".to_string();
        replace_record(
            &mut data,
            RecordName::OnlineAttendance,
            json!({ "2026-03-05": { "a": [1, 0, 0, 0] } }),
        )
        .unwrap();
        assert_eq!(data.ledger.online_attendance.len(), 1);
        assert_eq!(data.club_link, "https://example.org");

        let before = data.clone();
        assert!(replace_record(&mut data, RecordName::Members, json!("oops")).is_err());
        assert_eq!(data, before);
    }

    #[test]
    fn import_keeps_absent_records() {
        let mut current = ClubData::default();
        current.club_notice = "keep me".to_string();

        let backup = json!({
            "members": [{ "id": "a", "name": "Alice", "joinedAt": "2026-01-01" }],
            "globalSessions": ["Quiz", "Hike"],
            "exportDate": "2026-03-05T10:00:00Z"
        });
        let next = import_backup(&current, backup).unwrap();
        assert_eq!(
            next.members,
            vec![Member {
                id: "a".to_string(),
                name: "Alice".to_string(),
                joined_at: "2026-01-01".to_string(),
                is_staff: false,
                is_leader: false,
                previous_names: Vec::new(),
            }]
        );
        assert_eq!(next.ledger.global_session_names, vec!["Quiz", "Hike"]);
        assert_eq!(next.club_notice, "keep me");

        assert!(import_backup(&current, json!([1, 2])).is_err());
        assert_eq!("nope".parse::<RecordName>(), Err(LedgerError::UnknownRecord("nope".to_string())));
    }
}
