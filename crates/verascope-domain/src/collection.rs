//! Collections and ordered membership

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::card::CardId;
use crate::error::OrderError;

/// Unique collection identifier.
pub type CollectionId = Uuid;

/// The explicit order list and the membership presence index, kept consistent
/// by construction.
///
/// Invariants: the order contains no duplicate ids, and the presence index is
/// exactly the set of ids in the order. Both are maintained by this one type
/// rather than by two parallel structures kept in sync by convention.
#[derive(Debug, Clone, Default)]
pub struct OrderedMembers {
    order: Vec<CardId>,
    present: HashSet<CardId>,
}

impl OrderedMembers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a stored order list, silently dropping duplicate ids.
    pub fn from_order(order: Vec<CardId>) -> Self {
        let mut members = Self::new();
        for id in order {
            members.insert(id);
        }
        members
    }

    /// Append an id unless already present. Returns whether it was added.
    pub fn insert(&mut self, id: CardId) -> bool {
        if !self.present.insert(id) {
            return false;
        }
        self.order.push(id);
        true
    }

    /// Remove an id from the order and the presence index. Returns whether
    /// it was present.
    pub fn remove(&mut self, id: CardId) -> bool {
        if !self.present.remove(&id) {
            return false;
        }
        self.order.retain(|c| *c != id);
        true
    }

    /// Membership test backed by the presence index.
    pub fn contains(&self, id: CardId) -> bool {
        self.present.contains(&id)
    }

    /// Replace the whole order atomically. The new order must be a
    /// permutation of the current id set; it can never introduce or drop ids.
    pub fn reorder(&mut self, new_order: Vec<CardId>) -> Result<(), OrderError> {
        let new_set: HashSet<CardId> = new_order.iter().copied().collect();
        if new_set.len() != new_order.len() || new_set != self.present {
            return Err(OrderError::NotAPermutation);
        }
        self.order = new_order;
        Ok(())
    }

    /// Member ids in their explicit order.
    pub fn ids(&self) -> &[CardId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// A named, orderable grouping of cards.
#[derive(Debug, Clone)]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub members: OrderedMembers,
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: CollectionId::new_v4(),
            name: name.into(),
            created_at: now,
            updated_at: now,
            members: OrderedMembers::new(),
        }
    }

    /// Add a card to the collection. No-op on duplicate adds; never errors.
    pub fn add_card(&mut self, id: CardId) -> bool {
        let added = self.members.insert(id);
        if added {
            self.touch();
        }
        added
    }

    /// Remove a card from the collection. No-op if absent.
    pub fn remove_card(&mut self, id: CardId) -> bool {
        let removed = self.members.remove(id);
        if removed {
            self.touch();
        }
        removed
    }

    pub fn has_card(&self, id: CardId) -> bool {
        self.members.contains(id)
    }

    /// Atomically replace the card order with a permutation of itself.
    pub fn reorder(&mut self, new_order: Vec<CardId>) -> Result<(), OrderError> {
        self.members.reorder(new_order)?;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
