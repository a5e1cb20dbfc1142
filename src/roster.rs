//! Member roster and banned list.
//!
//! Like the ledger, every operation returns a replacement list instead of
//! editing the caller's copy. Ids are always assigned by the caller.

use crate::errors::LedgerError;
use crate::models::{BannedMember, Member, MemberPatch};

pub const MAX_PREVIOUS_NAMES: usize = 3;

/// Records a display-name change: the old name goes to the front of the
/// history, which keeps at most three entries.
pub fn rename(member: &mut Member, new_name: &str) {
    if member.name == new_name {
        return;
    }
    let old = std::mem::replace(&mut member.name, new_name.to_string());
    member.previous_names.insert(0, old);
    member.previous_names.truncate(MAX_PREVIOUS_NAMES);
}

pub fn is_banned(banned: &[BannedMember], name: &str) -> bool {
    banned.iter().any(|entry| entry.name == name)
}

pub fn add_member(
    members: &[Member],
    banned: &[BannedMember],
    mut member: Member,
) -> Result<Vec<Member>, LedgerError> {
    member.name = member.name.trim().to_string();
    if member.name.is_empty() {
        return Err(LedgerError::EmptyName);
    }
    if is_banned(banned, &member.name) {
        return Err(LedgerError::BannedName(member.name));
    }
    if members.iter().any(|existing| existing.id == member.id) {
        return Err(LedgerError::DuplicateMember(member.id));
    }
    let mut next = members.to_vec();
    next.push(member);
    Ok(next)
}

pub fn update_member(
    members: &[Member],
    id: &str,
    patch: &MemberPatch,
) -> Result<Vec<Member>, LedgerError> {
    let mut next = members.to_vec();
    let member = next
        .iter_mut()
        .find(|member| member.id == id)
        .ok_or_else(|| LedgerError::UnknownMember(id.to_string()))?;

    if let Some(name) = &patch.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::EmptyName);
        }
        rename(member, name);
    }
    if let Some(joined_at) = &patch.joined_at {
        member.joined_at = joined_at.clone();
    }
    if let Some(is_staff) = patch.is_staff {
        member.is_staff = is_staff;
    }
    if let Some(is_leader) = patch.is_leader {
        member.is_leader = is_leader;
    }
    Ok(next)
}

/// Replaces the roster with `updated`. Renamed members keep their history
/// from the current roster; history sent by the caller is ignored for them.
pub fn bulk_update(current: &[Member], updated: Vec<Member>) -> Vec<Member> {
    updated
        .into_iter()
        .map(|mut member| {
            if let Some(original) = current.iter().find(|original| original.id == member.id) {
                if original.name != member.name {
                    let new_name = std::mem::take(&mut member.name);
                    member.name = original.name.clone();
                    member.previous_names = original.previous_names.clone();
                    rename(&mut member, &new_name);
                }
            }
            member
        })
        .collect()
}

pub fn remove_member(members: &[Member], id: &str) -> Result<Vec<Member>, LedgerError> {
    if !members.iter().any(|member| member.id == id) {
        return Err(LedgerError::UnknownMember(id.to_string()));
    }
    Ok(members
        .iter()
        .filter(|member| member.id != id)
        .cloned()
        .collect())
}

/// Leaders first, then staff, then everyone else; roster order otherwise.
pub fn display_order(members: &[Member]) -> Vec<Member> {
    let mut ordered = members.to_vec();
    ordered.sort_by_key(|member| match (member.is_leader, member.is_staff) {
        (true, _) => 0,
        (false, true) => 1,
        (false, false) => 2,
    });
    ordered
}

pub fn ban(banned: &[BannedMember], entry: BannedMember) -> Result<Vec<BannedMember>, LedgerError> {
    let name = entry.name.trim();
    if name.is_empty() {
        return Err(LedgerError::EmptyName);
    }
    let entry = BannedMember {
        name: name.to_string(),
        ..entry
    };
    let mut next = banned.to_vec();
    next.push(entry);
    Ok(next)
}

pub fn unban(banned: &[BannedMember], id: &str) -> Result<Vec<BannedMember>, LedgerError> {
    if !banned.iter().any(|entry| entry.id == id) {
        return Err(LedgerError::UnknownBanned(id.to_string()));
    }
    Ok(banned.iter().filter(|entry| entry.id != id).cloned().collect())
}
