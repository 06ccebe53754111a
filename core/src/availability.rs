//! Availability management: slot creation, editing, deletion, listing.
//!
//! The overlap rule lives here as a pure function so it can be tested
//! exhaustively without storage; store adapters call it inside their
//! serialized critical section to enforce it under concurrency.

use crate::error::{CoreError, Result};
use crate::store::SlotStore;
use crate::types::{Actor, DateRange, Role, Slot, SlotId, TimeRange, UserId};
use chrono::{NaiveDate, NaiveTime};
use std::sync::Arc;

/// Finds the first slot in `existing` that overlaps `candidate` for the
/// same tutor and date. The candidate itself (matched by id) is skipped, so
/// the same function serves both insert and update validation.
pub fn find_overlap<'a, I>(candidate: &Slot, existing: I) -> Option<&'a Slot>
where
    I: IntoIterator<Item = &'a Slot>,
{
    existing.into_iter().find(|other| {
        other.id != candidate.id
            && other.tutor_id == candidate.tutor_id
            && other.date == candidate.date
            && other.time.overlaps(&candidate.time)
    })
}

/// Ensures `candidate` overlaps nothing in `existing`.
///
/// # Errors
///
/// Returns [`CoreError::Conflict`] naming the conflicting window.
pub fn ensure_no_overlap<'a, I>(candidate: &Slot, existing: I) -> Result<()>
where
    I: IntoIterator<Item = &'a Slot>,
{
    match find_overlap(candidate, existing) {
        Some(conflicting) => Err(CoreError::conflict(format!(
            "slot overlaps existing availability {} on {}",
            conflicting.time, conflicting.date
        ))),
        None => Ok(()),
    }
}

/// Partial update to a slot's calendar values.
#[derive(Clone, Copy, Debug, Default)]
pub struct SlotChanges {
    /// New date, if changing.
    pub date: Option<NaiveDate>,
    /// New start time, if changing.
    pub start: Option<NaiveTime>,
    /// New end time, if changing.
    pub end: Option<NaiveTime>,
}

/// Orchestrates slot CRUD with ownership and overlap enforcement.
#[derive(Clone)]
pub struct AvailabilityService {
    slots: Arc<dyn SlotStore>,
}

impl AvailabilityService {
    /// Creates a new `AvailabilityService`.
    #[must_use]
    pub fn new(slots: Arc<dyn SlotStore>) -> Self {
        Self { slots }
    }

    /// Publish a new availability window owned by the acting tutor.
    ///
    /// # Errors
    ///
    /// [`CoreError::Forbidden`] unless the actor is a tutor;
    /// [`CoreError::Validation`] on an inverted time range;
    /// [`CoreError::Conflict`] if the window overlaps existing availability.
    #[tracing::instrument(skip(self), fields(tutor_id = %actor.id))]
    pub async fn create_slot(
        &self,
        actor: &Actor,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<Slot> {
        if actor.role != Role::Tutor {
            return Err(CoreError::forbidden("only tutors can publish availability"));
        }
        let time = TimeRange::new(start, end)?;
        let slot = Slot::new(SlotId::new(), actor.id, date, time);
        let created = self.slots.insert(slot).await?;
        tracing::info!(slot_id = %created.id, date = %created.date, "availability slot created");
        Ok(created)
    }

    /// Edit an unbooked slot's calendar values.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] if the slot does not exist;
    /// [`CoreError::Forbidden`] if the actor does not own it;
    /// [`CoreError::InvalidState`] if it is booked;
    /// [`CoreError::Validation`] / [`CoreError::Conflict`] per the same
    /// rules as creation.
    #[tracing::instrument(skip(self), fields(actor_id = %actor.id, slot_id = %slot_id))]
    pub async fn update_slot(
        &self,
        actor: &Actor,
        slot_id: SlotId,
        changes: SlotChanges,
    ) -> Result<Slot> {
        let slot = self.fetch_owned(actor, slot_id).await?;
        if slot.is_booked {
            return Err(CoreError::invalid_state(
                "booked slots cannot be edited until released",
            ));
        }

        let time = TimeRange::new(
            changes.start.unwrap_or_else(|| slot.time.start()),
            changes.end.unwrap_or_else(|| slot.time.end()),
        )?;
        let updated = Slot {
            date: changes.date.unwrap_or(slot.date),
            time,
            ..slot
        };
        self.slots.update(updated).await
    }

    /// Permanently remove an unbooked slot.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] if the slot does not exist;
    /// [`CoreError::Forbidden`] if the actor does not own it;
    /// [`CoreError::InvalidState`] if it is booked.
    #[tracing::instrument(skip(self), fields(actor_id = %actor.id, slot_id = %slot_id))]
    pub async fn delete_slot(&self, actor: &Actor, slot_id: SlotId) -> Result<()> {
        let slot = self.fetch_owned(actor, slot_id).await?;
        if slot.is_booked {
            return Err(CoreError::invalid_state(
                "booked slots cannot be deleted until released",
            ));
        }
        self.slots.delete(slot_id).await?;
        tracing::info!("availability slot deleted");
        Ok(())
    }

    /// Unbooked slots for a tutor sorted by (date, start time) ascending.
    ///
    /// Read-only; tolerates a slightly stale snapshot.
    ///
    /// # Errors
    ///
    /// [`CoreError::Storage`] on adapter failure.
    pub async fn list_availability(&self, tutor_id: UserId, range: DateRange) -> Result<Vec<Slot>> {
        self.slots.list_open(tutor_id, range).await
    }

    async fn fetch_owned(&self, actor: &Actor, slot_id: SlotId) -> Result<Slot> {
        let slot = self
            .slots
            .get(slot_id)
            .await?
            .ok_or_else(|| CoreError::not_found("slot", slot_id))?;
        if slot.tutor_id != actor.id {
            return Err(CoreError::forbidden(
                "slot belongs to a different tutor",
            ));
        }
        Ok(slot)
    }
}
