//! Tenant and room scoping.
//!
//! Every read or write of attendance data runs under a [`RequestContext`]
//! and is checked against the caller's [`AuthorizedRooms`]: the rooms the
//! user holds a grant for, intersected with the company's active rooms.
//! A failed check is a [`CoreError::Forbidden`], never an empty result.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

/// Immutable identity of the caller, threaded explicitly through every
/// engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub company_id: DbId,
    pub user_id: DbId,
}

impl RequestContext {
    pub fn new(company_id: DbId, user_id: DbId) -> Self {
        Self {
            company_id,
            user_id,
        }
    }
}

/// Room dimension of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "room_id")]
pub enum RoomFilter {
    /// One explicitly requested room; must be authorized.
    Single(DbId),
    /// Every room the caller is authorized for, never every room in the company.
    AllAuthorized,
}

impl RoomFilter {
    pub fn from_optional(room_id: Option<DbId>) -> Self {
        match room_id {
            Some(id) => Self::Single(id),
            None => Self::AllAuthorized,
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog rows consumed from the surrounding application
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: DbId,
    pub company_id: DbId,
    pub name: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: DbId,
    pub company_id: DbId,
    pub name: String,
    pub is_active: bool,
}

/// A student enrolled in a room. A student may belong to several rooms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMember {
    pub room_id: DbId,
    pub student_id: DbId,
    pub student_name: String,
    pub is_active: bool,
}

// ---------------------------------------------------------------------------
// AuthorizedRooms
// ---------------------------------------------------------------------------

/// The resolved set of rooms a caller may read and write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizedRooms {
    room_ids: BTreeSet<DbId>,
}

impl AuthorizedRooms {
    /// Intersect the user's grants with the company's active rooms.
    ///
    /// Rooms from another company and inactive rooms are dropped even when
    /// a grant names them.
    pub fn resolve(company_id: DbId, granted_room_ids: &[DbId], rooms: &[Room]) -> Self {
        let granted: BTreeSet<DbId> = granted_room_ids.iter().copied().collect();
        let room_ids = rooms
            .iter()
            .filter(|r| r.company_id == company_id && r.is_active && granted.contains(&r.id))
            .map(|r| r.id)
            .collect();
        Self { room_ids }
    }

    pub fn contains(&self, room_id: DbId) -> bool {
        self.room_ids.contains(&room_id)
    }

    pub fn is_empty(&self) -> bool {
        self.room_ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.room_ids.len()
    }

    /// Authorized room ids in ascending order.
    pub fn ids(&self) -> Vec<DbId> {
        self.room_ids.iter().copied().collect()
    }

    /// Fail with `Forbidden` unless `room_id` is authorized.
    pub fn require(&self, room_id: DbId) -> Result<(), CoreError> {
        if self.contains(room_id) {
            Ok(())
        } else {
            Err(CoreError::room_forbidden(room_id))
        }
    }

    /// Expand a [`RoomFilter`] into the concrete room ids to query.
    pub fn rooms_for(&self, filter: RoomFilter) -> Result<Vec<DbId>, CoreError> {
        match filter {
            RoomFilter::Single(room_id) => {
                self.require(room_id)?;
                Ok(vec![room_id])
            }
            RoomFilter::AllAuthorized => Ok(self.ids()),
        }
    }
}

impl FromIterator<DbId> for AuthorizedRooms {
    fn from_iter<I: IntoIterator<Item = DbId>>(iter: I) -> Self {
        Self {
            room_ids: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn room(id: DbId, company_id: DbId, is_active: bool) -> Room {
        Room {
            id,
            company_id,
            name: format!("Room {id}"),
            is_active,
        }
    }

    #[test]
    fn resolve_intersects_grants_with_active_rooms() {
        let rooms = vec![room(1, 10, true), room(2, 10, false), room(3, 10, true)];
        let authorized = AuthorizedRooms::resolve(10, &[1, 2], &rooms);

        assert!(authorized.contains(1));
        assert!(!authorized.contains(2), "inactive room must be excluded");
        assert!(!authorized.contains(3), "ungranted room must be excluded");
        assert_eq!(authorized.len(), 1);
    }

    #[test]
    fn resolve_ignores_rooms_of_other_companies() {
        let rooms = vec![room(1, 10, true), room(2, 20, true)];
        let authorized = AuthorizedRooms::resolve(10, &[1, 2], &rooms);

        assert_eq!(authorized.ids(), vec![1]);
    }

    #[test]
    fn require_denies_unauthorized_room() {
        let authorized: AuthorizedRooms = [1, 2].into_iter().collect();

        assert!(authorized.require(2).is_ok());
        assert_matches!(authorized.require(3), Err(CoreError::Forbidden(_)));
    }

    #[test]
    fn all_authorized_filter_never_widens() {
        let authorized: AuthorizedRooms = [4, 2].into_iter().collect();

        assert_eq!(authorized.rooms_for(RoomFilter::AllAuthorized).unwrap(), vec![2, 4]);
        assert_eq!(authorized.rooms_for(RoomFilter::Single(4)).unwrap(), vec![4]);
        assert_matches!(
            authorized.rooms_for(RoomFilter::Single(9)),
            Err(CoreError::Forbidden(_))
        );
    }

    #[test]
    fn empty_grants_yield_empty_scope() {
        let authorized = AuthorizedRooms::resolve(10, &[], &[room(1, 10, true)]);
        assert!(authorized.is_empty());
        assert!(authorized.rooms_for(RoomFilter::AllAuthorized).unwrap().is_empty());
    }
}
