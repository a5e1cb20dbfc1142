use crate::dates::{parse_date_key, today, today_key};
use crate::errors::{AppError, LedgerError};
use crate::export::{export_file_name, render_month_csv};
use crate::models::{
    AddBannedRequest, AddMemberRequest, BannedMember, ClubData, Dashboard, DayView, Member,
    MemberPatch, MonthQuery, MonthSummary, MutationResponse, SLOT_COUNT, Settings,
    SettingsRequest,
};
use crate::mutations::{self, Mutation, Outcome};
use crate::roster;
use crate::state::AppState;
use crate::stats::{build_dashboard, build_dashboard_at, build_day_view, build_month_summary};
use crate::storage::{self, RecordName};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use chrono::Datelike;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

pub async fn get_today(State(state): State<AppState>) -> Result<Json<DayView>, AppError> {
    let date = today_key();
    let data = state.data.lock().await;
    Ok(Json(build_day_view(&data, &date)?))
}

pub async fn get_day(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<DayView>, AppError> {
    let data = state.data.lock().await;
    Ok(Json(build_day_view(&data, &date)?))
}

pub async fn mutate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mutation): Json<Mutation>,
) -> Result<Json<MutationResponse>, AppError> {
    let privileged = state.is_privileged(&headers);
    let mut data = state.data.lock().await;
    apply_mutation(&state, &mut data, &mutation, privileged).await?;
    Ok(Json(MutationResponse {
        op: mutation.kind().to_string(),
        applied: true,
    }))
}

/// Runs one ledger mutation and commits the result. A member delete also
/// drops the roster entry, in the same snapshot.
async fn apply_mutation(
    state: &AppState,
    data: &mut ClubData,
    mutation: &Mutation,
    privileged: bool,
) -> Result<(), AppError> {
    let ledger = match mutations::apply(&data.ledger, mutation, privileged)? {
        Outcome::Applied(ledger) => ledger,
        Outcome::Rejected => return Err(AppError::forbidden("privileged access required")),
    };

    let mut next = data.clone();
    next.ledger = ledger;
    if let Mutation::DeleteMember { member_id } = mutation {
        next.members.retain(|member| &member.id != member_id);
    }
    state.commit(data, next).await?;
    info!(op = mutation.kind(), "ledger updated");
    Ok(())
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<Dashboard>, AppError> {
    let data = state.data.lock().await;
    let dashboard = match (query.year, query.month) {
        (None, None) => build_dashboard(&data)?,
        (year, month) => {
            let now = today();
            build_dashboard_at(
                &data,
                year.unwrap_or_else(|| now.year()),
                month.unwrap_or_else(|| now.month()),
            )?
        }
    };
    Ok(Json(dashboard))
}

pub async fn get_month_summary(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
) -> Result<Json<MonthSummary>, AppError> {
    let data = state.data.lock().await;
    Ok(Json(build_month_summary(&data, year, month)?))
}

pub async fn export_month_csv(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
) -> Result<impl IntoResponse, AppError> {
    let data = state.data.lock().await;
    let body = render_month_csv(&data.members, &data.ledger, year, month)?;
    let disposition = format!("attachment; filename=\"{}\"", export_file_name(year, month));
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

pub async fn list_members(State(state): State<AppState>) -> Json<Vec<Member>> {
    let data = state.data.lock().await;
    Json(roster::display_order(&data.members))
}

pub async fn add_member(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AddMemberRequest>,
) -> Result<(StatusCode, Json<Member>), AppError> {
    require_privilege(&state, &headers)?;
    let joined_at = match payload.joined_at {
        Some(date) => {
            parse_date_key(&date)?;
            date
        }
        None => today_key(),
    };
    let member = Member {
        id: Uuid::new_v4().to_string(),
        name: payload.name.trim().to_string(),
        joined_at,
        is_staff: false,
        is_leader: false,
        previous_names: Vec::new(),
    };

    let mut data = state.data.lock().await;
    let members = roster::add_member(&data.members, &data.banned_members, member.clone())?;
    let mut next = data.clone();
    next.members = members;
    state.commit(&mut data, next).await?;
    info!(member_id = %member.id, "member added");
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn update_member(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<MemberPatch>,
) -> Result<Json<Member>, AppError> {
    require_privilege(&state, &headers)?;
    if let Some(joined_at) = &patch.joined_at {
        parse_date_key(joined_at)?;
    }
    let mut data = state.data.lock().await;
    let members = roster::update_member(&data.members, &id, &patch)?;
    let updated = members
        .iter()
        .find(|member| member.id == id)
        .cloned()
        .ok_or_else(|| AppError::from(LedgerError::UnknownMember(id.clone())))?;
    let mut next = data.clone();
    next.members = members;
    state.commit(&mut data, next).await?;
    Ok(Json(updated))
}

pub async fn bulk_update_members(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(updated): Json<Vec<Member>>,
) -> Result<Json<Vec<Member>>, AppError> {
    require_privilege(&state, &headers)?;
    let mut data = state.data.lock().await;
    let mut next = data.clone();
    next.members = roster::bulk_update(&data.members, updated);
    let members = roster::display_order(&next.members);
    state.commit(&mut data, next).await?;
    Ok(Json(members))
}

pub async fn delete_member(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let privileged = state.is_privileged(&headers);
    let mut data = state.data.lock().await;
    if privileged && !data.members.iter().any(|member| member.id == id) {
        return Err(LedgerError::UnknownMember(id).into());
    }
    let mutation = Mutation::DeleteMember { member_id: id };
    apply_mutation(&state, &mut data, &mutation, privileged).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_banned(State(state): State<AppState>) -> Json<Vec<BannedMember>> {
    let data = state.data.lock().await;
    Json(data.banned_members.clone())
}

pub async fn add_banned(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AddBannedRequest>,
) -> Result<(StatusCode, Json<BannedMember>), AppError> {
    require_privilege(&state, &headers)?;
    let entry = BannedMember {
        id: Uuid::new_v4().to_string(),
        name: payload.name.trim().to_string(),
        reason: payload.reason,
        banned_at: today_key(),
    };
    let mut data = state.data.lock().await;
    let mut next = data.clone();
    next.banned_members = roster::ban(&data.banned_members, entry.clone())?;
    state.commit(&mut data, next).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn remove_banned(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    require_privilege(&state, &headers)?;
    let mut data = state.data.lock().await;
    let mut next = data.clone();
    next.banned_members = roster::unban(&data.banned_members, &id)?;
    state.commit(&mut data, next).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_settings(State(state): State<AppState>) -> Json<Settings> {
    let data = state.data.lock().await;
    Json(Settings::from(&*data))
}

pub async fn update_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SettingsRequest>,
) -> Result<Json<Settings>, AppError> {
    require_privilege(&state, &headers)?;
    if let Some(names) = &payload.global_session_names {
        if names.len() > SLOT_COUNT {
            return Err(LedgerError::TooManyLabels {
                field: "session names",
                len: names.len(),
            }
            .into());
        }
    }
    let mut data = state.data.lock().await;
    let mut next = data.clone();
    if let Some(names) = payload.global_session_names {
        next.ledger.global_session_names = names;
    }
    if let Some(link) = payload.club_link {
        next.club_link = link;
    }
    if let Some(notice) = payload.club_notice {
        next.club_notice = notice;
    }
    let settings = Settings::from(&next);
    state.commit(&mut data, next).await?;
    Ok(Json(settings))
}

pub async fn export_backup(State(state): State<AppState>) -> Json<ClubData> {
    let data = state.data.lock().await;
    Json(data.clone())
}

pub async fn import_data(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(backup): Json<Value>,
) -> Result<StatusCode, AppError> {
    require_privilege(&state, &headers)?;
    let mut data = state.data.lock().await;
    let next = storage::import_backup(&data, backup)?;
    state.commit(&mut data, next).await?;
    info!("backup imported");
    Ok(StatusCode::NO_CONTENT)
}

/// Sync push: replaces one record wholesale. Last write wins.
pub async fn push_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(record): Path<String>,
    Json(value): Json<Value>,
) -> Result<StatusCode, AppError> {
    require_privilege(&state, &headers)?;
    let name: RecordName = record.parse()?;
    let mut data = state.data.lock().await;
    let mut next = data.clone();
    storage::replace_record(&mut next, name, value)
        .map_err(|err| AppError::bad_request(format!("invalid {record}: {err}")))?;
    state.commit(&mut data, next).await?;
    info!(record = %record, "record replaced by sync push");
    Ok(StatusCode::NO_CONTENT)
}

fn require_privilege(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    if state.is_privileged(headers) {
        Ok(())
    } else {
        warn!("rejected unprivileged request");
        Err(AppError::forbidden("privileged access required"))
    }
}
