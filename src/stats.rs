use crate::dates;
use crate::errors::LedgerError;
use crate::ledger::Ledger;
use crate::models::{
    ClubData, Dashboard, DayView, HostCount, Member, MemberDay, MemberMonthCounts, MemberMonthRow,
    MemberStats, MonthSummary, RankingEntry, SlotCounts, Status, Totals, Track, TrackDay,
};
use chrono::Datelike;
use std::collections::{BTreeMap, HashMap};

const MONTHLY_TOP: usize = 5;
const YEARLY_TOP: usize = 5;
const PREVIOUS_MONTH_TOP: usize = 3;
const HOSTS_TOP: usize = 5;

/// Dashboard for the current local month.
pub fn build_dashboard(data: &ClubData) -> Result<Dashboard, LedgerError> {
    let today = dates::today();
    build_dashboard_at(data, today.year(), today.month())
}

pub fn build_dashboard_at(data: &ClubData, year: i32, month: u32) -> Result<Dashboard, LedgerError> {
    let member_stats = member_stats(&data.members, &data.ledger, year, month)?;

    let mut monthly_ranking = monthly_ranking(&member_stats);
    monthly_ranking.truncate(MONTHLY_TOP);
    let mut yearly_ranking = yearly_ranking(&member_stats);
    yearly_ranking.truncate(YEARLY_TOP);
    let mut previous_month_ranking = previous_month_ranking(&member_stats);
    previous_month_ranking.truncate(PREVIOUS_MONTH_TOP);
    let mut top_hosts = host_leaderboard(&data.ledger, year, month)?;
    top_hosts.truncate(HOSTS_TOP);

    Ok(Dashboard {
        year,
        month,
        totals: totals(&member_stats),
        member_stats,
        monthly_ranking,
        yearly_ranking,
        previous_month_ranking,
        top_hosts,
    })
}

/// Attended/no-show counts over the active slots of one vector.
pub fn active_counts(ledger: &Ledger, track: Track, date: &str, sessions: &[Status]) -> SlotCounts {
    let active = ledger.active_count(track, date).min(sessions.len());
    SlotCounts::from_sessions(&sessions[..active])
}

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    in_person_monthly: u32,
    in_person_no_show_monthly: u32,
    online_monthly: u32,
    online_no_show_monthly: u32,
    in_person_previous_month: u32,
    in_person_yearly: u32,
    cumulative: u32,
}

/// Per-member counts for the reference month, its previous month and the
/// reference year. One entry per roster member, in roster order.
pub fn member_stats(
    members: &[Member],
    ledger: &Ledger,
    year: i32,
    month: u32,
) -> Result<Vec<MemberStats>, LedgerError> {
    dates::validate_month(month)?;
    let month_prefix = dates::month_prefix(year, month);
    let (previous_year, previous_month) = dates::previous_month(year, month);
    let previous_prefix = dates::month_prefix(previous_year, previous_month);
    let year_prefix = dates::year_prefix(year);

    let mut tallies: HashMap<&str, Tally> = HashMap::new();
    for track in Track::ALL {
        for (date, day) in ledger.attendance(track) {
            let in_month = date.starts_with(&month_prefix);
            let in_previous = date.starts_with(&previous_prefix);
            let in_year = date.starts_with(&year_prefix);

            for (member_id, sessions) in day {
                let counts = active_counts(ledger, track, date, sessions);
                if counts.is_empty() {
                    continue;
                }
                let tally = tallies.entry(member_id.as_str()).or_default();
                tally.cumulative += counts.attended;
                match track {
                    Track::InPerson => {
                        if in_month {
                            tally.in_person_monthly += counts.attended;
                            tally.in_person_no_show_monthly += counts.no_show;
                        }
                        if in_previous {
                            tally.in_person_previous_month += counts.attended;
                        }
                        if in_year {
                            tally.in_person_yearly += counts.attended;
                        }
                    }
                    Track::Online => {
                        if in_month {
                            tally.online_monthly += counts.attended;
                            tally.online_no_show_monthly += counts.no_show;
                        }
                    }
                }
            }
        }
    }

    Ok(members
        .iter()
        .map(|member| {
            let tally = tallies.get(member.id.as_str()).copied().unwrap_or_default();
            MemberStats {
                member_id: member.id.clone(),
                name: member.name.clone(),
                in_person_monthly: tally.in_person_monthly,
                in_person_no_show_monthly: tally.in_person_no_show_monthly,
                online_monthly: tally.online_monthly,
                online_no_show_monthly: tally.online_no_show_monthly,
                in_person_previous_month: tally.in_person_previous_month,
                in_person_yearly: tally.in_person_yearly,
                cumulative: tally.cumulative,
            }
        })
        .collect())
}

/// Members with a non-zero `key`, highest first. The sort is stable, so
/// ties keep roster order.
pub fn rank_by(stats: &[MemberStats], key: impl Fn(&MemberStats) -> u32) -> Vec<RankingEntry> {
    let mut ranking: Vec<RankingEntry> = stats
        .iter()
        .filter_map(|entry| {
            let count = key(entry);
            (count > 0).then(|| RankingEntry {
                member_id: entry.member_id.clone(),
                name: entry.name.clone(),
                count,
            })
        })
        .collect();
    ranking.sort_by(|a, b| b.count.cmp(&a.count));
    ranking
}

pub fn monthly_ranking(stats: &[MemberStats]) -> Vec<RankingEntry> {
    rank_by(stats, |entry| entry.in_person_monthly)
}

pub fn yearly_ranking(stats: &[MemberStats]) -> Vec<RankingEntry> {
    rank_by(stats, |entry| entry.in_person_yearly)
}

pub fn previous_month_ranking(stats: &[MemberStats]) -> Vec<RankingEntry> {
    rank_by(stats, |entry| entry.in_person_previous_month)
}

/// Host appearances over active slots in the month, both tracks. Blank
/// hosts are skipped; other names are counted exactly as entered. Ties
/// are ordered by name.
pub fn host_leaderboard(ledger: &Ledger, year: i32, month: u32) -> Result<Vec<HostCount>, LedgerError> {
    dates::validate_month(month)?;
    let prefix = dates::month_prefix(year, month);
    let mut counts: BTreeMap<&str, u32> = BTreeMap::new();

    for track in Track::ALL {
        for (date, meta) in ledger.metadata(track) {
            if !date.starts_with(&prefix) {
                continue;
            }
            let Some(hosts) = &meta.session_hosts else {
                continue;
            };
            let active = ledger.active_count(track, date);
            for host in hosts.iter().take(active) {
                if !host.trim().is_empty() {
                    *counts.entry(host.as_str()).or_default() += 1;
                }
            }
        }
    }

    let mut leaderboard: Vec<HostCount> = counts
        .into_iter()
        .map(|(name, count)| HostCount {
            name: name.to_string(),
            count,
        })
        .collect();
    leaderboard.sort_by(|a, b| b.count.cmp(&a.count));
    Ok(leaderboard)
}

pub fn totals(stats: &[MemberStats]) -> Totals {
    stats.iter().fold(Totals::default(), |acc, entry| Totals {
        monthly_attended: acc.monthly_attended + entry.in_person_monthly + entry.online_monthly,
        cumulative_attended: acc.cumulative_attended + entry.cumulative,
    })
}

pub fn build_month_summary(data: &ClubData, year: i32, month: u32) -> Result<MonthSummary, LedgerError> {
    dates::validate_month(month)?;
    let ledger = &data.ledger;

    let held = |track: Track| -> u32 {
        let prefix = dates::month_prefix(year, month);
        ledger
            .metadata(track)
            .keys()
            .filter(|date| date.starts_with(&prefix))
            .map(|date| ledger.active_count(track, date) as u32)
            .sum()
    };

    let mut total_attended = 0;
    let mut per_member: HashMap<&str, [u32; 2]> = HashMap::new();
    for (index, track) in Track::ALL.into_iter().enumerate() {
        for (date, day) in ledger.month_entries(track, year, month) {
            for (member_id, sessions) in day {
                let attended = active_counts(ledger, track, date, sessions).attended;
                total_attended += attended;
                per_member.entry(member_id.as_str()).or_default()[index] += attended;
            }
        }
    }

    let mut members: Vec<MemberMonthCounts> = data
        .members
        .iter()
        .filter_map(|member| {
            let [in_person, online] = per_member.get(member.id.as_str()).copied()?;
            (in_person > 0 || online > 0).then(|| MemberMonthCounts {
                member_id: member.id.clone(),
                name: member.name.clone(),
                in_person,
                online,
            })
        })
        .collect();
    // Online attendance never affects the order.
    members.sort_by(|a, b| b.in_person.cmp(&a.in_person));

    Ok(MonthSummary {
        year,
        month,
        in_person_held: held(Track::InPerson),
        online_held: held(Track::Online),
        total_attended,
        members,
    })
}

/// Per-day counts for every member on both tracks: the rows behind the
/// monthly export. Members are in roster order, in-person row first.
pub fn month_grid(
    members: &[Member],
    ledger: &Ledger,
    year: i32,
    month: u32,
) -> Result<Vec<MemberMonthRow>, LedgerError> {
    let days = dates::month_days(year, month)?;
    let mut rows = Vec::with_capacity(members.len() * Track::ALL.len());
    for member in members {
        for track in Track::ALL {
            let record = ledger.attendance(track);
            let mut totals = SlotCounts::default();
            let per_day: Vec<SlotCounts> = days
                .iter()
                .map(|date| {
                    let counts = record
                        .get(date)
                        .and_then(|day| day.get(&member.id))
                        .map(|sessions| active_counts(ledger, track, date, sessions))
                        .unwrap_or_default();
                    totals.attended += counts.attended;
                    totals.no_show += counts.no_show;
                    counts
                })
                .collect();
            rows.push(MemberMonthRow {
                member_id: member.id.clone(),
                name: member.name.clone(),
                track,
                days: per_day,
                totals,
            });
        }
    }
    Ok(rows)
}

pub fn build_day_view(data: &ClubData, date: &str) -> Result<DayView, LedgerError> {
    dates::parse_date_key(date)?;
    Ok(DayView {
        date: date.to_string(),
        in_person: track_day(data, Track::InPerson, date),
        online: track_day(data, Track::Online, date),
    })
}

fn track_day(data: &ClubData, track: Track, date: &str) -> TrackDay {
    let plan = data.ledger.resolve_metadata(track, date);
    let active = plan.active_count;
    let mut slot_totals = vec![0u32; active];

    let members = data
        .members
        .iter()
        .map(|member| {
            let vector = data.ledger.vector(track, date, &member.id);
            let sessions = &vector[..active];
            for (slot, status) in sessions.iter().enumerate() {
                if *status == Status::Attended {
                    slot_totals[slot] += 1;
                }
            }
            let counts = SlotCounts::from_sessions(sessions);
            MemberDay {
                member_id: member.id.clone(),
                name: member.name.clone(),
                previous_names: member.previous_names.clone(),
                sessions: sessions.to_vec(),
                attended: counts.attended,
                no_show: counts.no_show,
            }
        })
        .collect();

    TrackDay {
        session_names: plan.names[..active].to_vec(),
        session_hosts: plan.hosts[..active].to_vec(),
        active_count: active,
        slot_totals,
        members,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DailyMetadata, SessionVector};
    use crate::mutations;

    const A: Status = Status::Attended;
    const N: Status = Status::NoShow;
    const U: Status = Status::Unset;

    fn member(id: &str, name: &str) -> Member {
        Member {
            id: id.to_string(),
            name: name.to_string(),
            joined_at: "2026-01-01".to_string(),
            is_staff: false,
            is_leader: false,
            previous_names: Vec::new(),
        }
    }

    fn record(data: &mut ClubData, track: Track, date: &str, member_id: &str, sessions: SessionVector) {
        data.ledger
            .attendance_mut(track)
            .entry(date.to_string())
            .or_default()
            .insert(member_id.to_string(), sessions);
    }

    fn count(data: &mut ClubData, track: Track, date: &str, active: u8) {
        data.ledger
            .metadata_mut(track)
            .entry(date.to_string())
            .or_default()
            .session_count = Some(active);
    }

    fn hosts(data: &mut ClubData, track: Track, date: &str, names: &[&str], active: u8) {
        data.ledger.metadata_mut(track).insert(
            date.to_string(),
            DailyMetadata {
                session_names: None,
                session_hosts: Some(names.iter().map(|name| name.to_string()).collect()),
                session_count: Some(active),
            },
        );
    }

    fn alice_and_bob() -> ClubData {
        let mut data = ClubData {
            members: vec![member("alice", "Alice"), member("bob", "Bob")],
            ..ClubData::default()
        };
        record(&mut data, Track::InPerson, "2026-03-05", "alice", [A, A, U, U]);
        record(&mut data, Track::InPerson, "2026-03-05", "bob", [N, U, U, U]);
        count(&mut data, Track::InPerson, "2026-03-05", 2);
        data
    }

    #[test]
    fn monthly_ranking_example() {
        let data = alice_and_bob();
        let stats = member_stats(&data.members, &data.ledger, 2026, 3).unwrap();

        let ranking = monthly_ranking(&stats);
        assert_eq!(ranking.len(), 1);
        assert_eq!(ranking[0].name, "Alice");
        assert_eq!(ranking[0].count, 2);

        let bob = stats.iter().find(|entry| entry.member_id == "bob").unwrap();
        assert_eq!(bob.in_person_monthly, 0);
        assert_eq!(bob.in_person_no_show_monthly, 1);
    }

    #[test]
    fn inactive_slots_are_invisible_until_restored() {
        let mut data = ClubData {
            members: vec![member("alice", "Alice")],
            ..ClubData::default()
        };
        count(&mut data, Track::InPerson, "2026-03-05", 4);
        mutations::toggle(&mut data.ledger, Track::InPerson, "2026-03-05", "alice", 3).unwrap();

        let ranked = |data: &ClubData| {
            let stats = member_stats(&data.members, &data.ledger, 2026, 3).unwrap();
            monthly_ranking(&stats)
        };
        assert_eq!(ranked(&data).len(), 1);

        count(&mut data, Track::InPerson, "2026-03-05", 2);
        assert!(ranked(&data).is_empty());

        count(&mut data, Track::InPerson, "2026-03-05", 4);
        let restored = ranked(&data);
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].count, 1);
    }

    #[test]
    fn online_only_members_are_not_ranked_monthly() {
        let mut data = alice_and_bob();
        record(&mut data, Track::Online, "2026-03-07", "bob", [A, U, U, U]);

        let stats = member_stats(&data.members, &data.ledger, 2026, 3).unwrap();
        let ranking = monthly_ranking(&stats);
        assert!(ranking.iter().all(|entry| entry.member_id != "bob"));

        let bob = stats.iter().find(|entry| entry.member_id == "bob").unwrap();
        assert_eq!(bob.online_monthly, 1);
        assert_eq!(bob.cumulative, 1);
    }

    #[test]
    fn ties_keep_roster_order() {
        let mut data = ClubData {
            members: vec![
                member("carol", "Carol"),
                member("alice", "Alice"),
                member("bob", "Bob"),
            ],
            ..ClubData::default()
        };
        for id in ["alice", "bob", "carol"] {
            record(&mut data, Track::InPerson, "2026-03-05", id, [A, U, U, U]);
        }
        record(&mut data, Track::InPerson, "2026-03-06", "bob", [A, U, U, U]);

        let stats = member_stats(&data.members, &data.ledger, 2026, 3).unwrap();
        let names: Vec<String> = monthly_ranking(&stats).into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Bob", "Carol", "Alice"]);
    }

    #[test]
    fn yearly_and_previous_month_rankings() {
        let mut data = alice_and_bob();
        record(&mut data, Track::InPerson, "2025-12-20", "bob", [A, U, U, U]);
        record(&mut data, Track::InPerson, "2026-01-10", "bob", [A, U, U, U]);
        record(&mut data, Track::Online, "2026-01-11", "alice", [A, U, U, U]);

        let january = member_stats(&data.members, &data.ledger, 2026, 1).unwrap();
        let previous = previous_month_ranking(&january);
        assert_eq!(previous.len(), 1);
        assert_eq!(previous[0].member_id, "bob");
        assert_eq!(previous[0].count, 1);

        let yearly = yearly_ranking(&january);
        let pairs: Vec<(String, u32)> = yearly.into_iter().map(|e| (e.member_id, e.count)).collect();
        assert_eq!(pairs, vec![("alice".to_string(), 2), ("bob".to_string(), 1)]);

        let alice = january.iter().find(|entry| entry.member_id == "alice").unwrap();
        assert_eq!(alice.cumulative, 3);
    }

    #[test]
    fn host_leaderboard_example() {
        let mut data = ClubData::default();
        hosts(&mut data, Track::InPerson, "2026-03-05", &["Sam", "", ""], 3);
        hosts(&mut data, Track::Online, "2026-03-12", &["Sam", "Dana", ""], 3);
        hosts(&mut data, Track::InPerson, "2026-04-01", &["Dana"], 1);

        let leaderboard = host_leaderboard(&data.ledger, 2026, 3).unwrap();
        assert_eq!(
            leaderboard,
            vec![
                HostCount {
                    name: "Sam".to_string(),
                    count: 2
                },
                HostCount {
                    name: "Dana".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn host_leaderboard_ignores_inactive_and_blank_hosts() {
        let mut data = ClubData::default();
        hosts(&mut data, Track::InPerson, "2026-03-05", &["Sam", "Dana", "  "], 1);
        let leaderboard = host_leaderboard(&data.ledger, 2026, 3).unwrap();
        assert_eq!(leaderboard.len(), 1);
        assert_eq!(leaderboard[0].name, "Sam");
    }

    #[test]
    fn host_leaderboard_keeps_names_as_entered() {
        let mut data = ClubData::default();
        hosts(&mut data, Track::InPerson, "2026-03-05", &["Sam", "Sam "], 2);
        hosts(&mut data, Track::Online, "2026-03-06", &["Sam"], 1);
        let leaderboard = host_leaderboard(&data.ledger, 2026, 3).unwrap();
        assert_eq!(
            leaderboard,
            vec![
                HostCount {
                    name: "Sam".to_string(),
                    count: 2
                },
                HostCount {
                    name: "Sam ".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn totals_combine_tracks() {
        let mut data = alice_and_bob();
        record(&mut data, Track::Online, "2026-03-07", "bob", [A, U, U, U]);
        record(&mut data, Track::InPerson, "2026-02-07", "bob", [A, U, U, U]);

        let stats = member_stats(&data.members, &data.ledger, 2026, 3).unwrap();
        assert_eq!(
            totals(&stats),
            Totals {
                monthly_attended: 3,
                cumulative_attended: 4
            }
        );
    }

    #[test]
    fn dashboard_applies_limits_and_rejects_bad_month() {
        let mut data = ClubData::default();
        for index in 0..8 {
            let id = format!("m{index}");
            data.members.push(member(&id, &id));
            record(&mut data, Track::InPerson, "2026-03-05", &id, [A, U, U, U]);
        }
        let dashboard = build_dashboard_at(&data, 2026, 3).unwrap();
        assert_eq!(dashboard.member_stats.len(), 8);
        assert_eq!(dashboard.monthly_ranking.len(), MONTHLY_TOP);
        assert_eq!(dashboard.totals.monthly_attended, 8);

        assert!(build_dashboard_at(&data, 2026, 0).is_err());
    }

    #[test]
    fn month_summary_counts_held_sessions() {
        let mut data = alice_and_bob();
        count(&mut data, Track::Online, "2026-03-07", 3);
        count(&mut data, Track::Online, "2026-04-07", 2);
        record(&mut data, Track::Online, "2026-03-07", "bob", [A, A, A, A]);

        let summary = build_month_summary(&data, 2026, 3).unwrap();
        assert_eq!(summary.in_person_held, 2);
        assert_eq!(summary.online_held, 3);
        assert_eq!(summary.total_attended, 5);
        let order: Vec<(&str, u32, u32)> = summary
            .members
            .iter()
            .map(|m| (m.member_id.as_str(), m.in_person, m.online))
            .collect();
        assert_eq!(order, vec![("alice", 2, 0), ("bob", 0, 3)]);
    }

    #[test]
    fn month_grid_has_a_row_per_member_and_track() {
        let data = alice_and_bob();
        let rows = month_grid(&data.members, &data.ledger, 2026, 3).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].track, Track::InPerson);
        assert_eq!(rows[0].days.len(), 31);
        assert_eq!(rows[0].days[4].attended, 2);
        assert_eq!(rows[0].totals.attended, 2);
        assert_eq!(rows[2].member_id, "bob");
        assert_eq!(rows[2].totals.no_show, 1);
        assert!(rows[3].totals.is_empty());
    }

    #[test]
    fn day_view_shows_only_active_slots() {
        let data = alice_and_bob();
        let view = build_day_view(&data, "2026-03-05").unwrap();
        assert_eq!(view.in_person.active_count, 2);
        assert_eq!(view.in_person.session_names, vec!["Session 1", "Session 2"]);
        assert_eq!(view.in_person.slot_totals, vec![1, 1]);
        assert_eq!(view.in_person.members[1].sessions, vec![N, U]);
        assert_eq!(view.online.active_count, 1);
        assert_eq!(view.online.session_names, vec!["Online 1"]);

        assert!(build_day_view(&data, "2026-3-5").is_err());
    }
}
