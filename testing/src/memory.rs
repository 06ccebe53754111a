//! In-memory store adapter.
//!
//! Implements [`SlotStore`], [`BookingStore`], and [`TutorStore`] over
//! plain maps behind one async mutex. Holding a single lock across every
//! write gives the store-contract serialization for free: the overlap
//! check-and-insert, the slot claim, and the cancel-and-release are each a
//! critical section, exactly as the `PostgreSQL` adapter achieves with
//! advisory locks and transactions.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tutorlink_core::availability::ensure_no_overlap;
use tutorlink_core::error::{CoreError, Result};
use tutorlink_core::store::{BookingStore, CancelOutcome, SlotStore, TutorStore};
use tutorlink_core::types::{
    Booking, BookingId, BookingStatus, DateRange, Money, PaymentStatus, RatingAggregate,
    RatingScore, Role, Slot, SlotId, TutorProfile, UserId,
};

#[derive(Default)]
struct State {
    slots: HashMap<SlotId, Slot>,
    bookings: HashMap<BookingId, Booking>,
    tutors: HashMap<UserId, TutorProfile>,
}

/// In-memory implementation of every store port.
///
/// Cheaply cloneable; clones share the same state.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct read of a slot, bypassing the service layer (assertions).
    pub async fn slot(&self, id: SlotId) -> Option<Slot> {
        self.state.lock().await.slots.get(&id).copied()
    }

    /// Direct read of a booking, bypassing the service layer (assertions).
    pub async fn booking(&self, id: BookingId) -> Option<Booking> {
        self.state.lock().await.bookings.get(&id).cloned()
    }
}

#[async_trait]
impl SlotStore for InMemoryStore {
    async fn insert(&self, slot: Slot) -> Result<Slot> {
        let mut state = self.state.lock().await;
        ensure_no_overlap(&slot, state.slots.values())?;
        state.slots.insert(slot.id, slot);
        Ok(slot)
    }

    async fn update(&self, slot: Slot) -> Result<Slot> {
        let mut state = self.state.lock().await;
        let existing = state
            .slots
            .get(&slot.id)
            .ok_or_else(|| CoreError::not_found("slot", slot.id))?;
        if existing.is_booked {
            return Err(CoreError::invalid_state(
                "booked slots cannot be edited until released",
            ));
        }
        ensure_no_overlap(&slot, state.slots.values())?;
        state.slots.insert(slot.id, slot);
        Ok(slot)
    }

    async fn delete(&self, id: SlotId) -> Result<()> {
        let mut state = self.state.lock().await;
        match state.slots.get(&id) {
            None => Err(CoreError::not_found("slot", id)),
            Some(slot) if slot.is_booked => Err(CoreError::invalid_state(
                "booked slots cannot be deleted until released",
            )),
            Some(_) => {
                state.slots.remove(&id);
                Ok(())
            }
        }
    }

    async fn get(&self, id: SlotId) -> Result<Option<Slot>> {
        Ok(self.state.lock().await.slots.get(&id).copied())
    }

    async fn list_open(&self, tutor_id: UserId, range: DateRange) -> Result<Vec<Slot>> {
        let state = self.state.lock().await;
        let mut open: Vec<Slot> = state
            .slots
            .values()
            .filter(|slot| {
                !slot.is_booked && slot.tutor_id == tutor_id && range.contains(slot.date)
            })
            .copied()
            .collect();
        open.sort_by_key(|slot| (slot.date, slot.time.start()));
        Ok(open)
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn create(&self, booking: Booking) -> Result<Booking> {
        let mut state = self.state.lock().await;
        let slot = state
            .slots
            .get_mut(&booking.slot_id)
            .ok_or_else(|| CoreError::not_found("slot", booking.slot_id))?;
        if slot.is_booked {
            return Err(CoreError::conflict("slot is already booked"));
        }
        slot.is_booked = true;
        state.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn get(&self, id: BookingId) -> Result<Option<Booking>> {
        Ok(self.state.lock().await.bookings.get(&id).cloned())
    }

    async fn list_for_user(
        &self,
        user: UserId,
        role: Role,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>> {
        let state = self.state.lock().await;
        let mut scoped: Vec<Booking> = state
            .bookings
            .values()
            .filter(|booking| match role {
                Role::Student => booking.student_id == user,
                Role::Tutor => booking.tutor_id == user,
            })
            .filter(|booking| status.is_none_or(|wanted| booking.status == wanted))
            .cloned()
            .collect();
        scoped.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(scoped)
    }

    async fn complete(&self, id: BookingId, meeting_link: Option<String>) -> Result<Booking> {
        let mut state = self.state.lock().await;
        let booking = state
            .bookings
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found("booking", id))?;
        if booking.status != BookingStatus::Confirmed {
            return Err(CoreError::invalid_state(format!(
                "cannot complete a {} booking",
                booking.status
            )));
        }
        booking.status = BookingStatus::Completed;
        if meeting_link.is_some() {
            booking.meeting_link = meeting_link;
        }
        Ok(booking.clone())
    }

    async fn cancel(&self, id: BookingId) -> Result<CancelOutcome> {
        let mut state = self.state.lock().await;
        let booking = state
            .bookings
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("booking", id))?;

        match booking.status {
            BookingStatus::Completed => Err(CoreError::invalid_state(
                "completed bookings cannot be cancelled",
            )),
            BookingStatus::Cancelled => {
                // Idempotent retry: re-apply the release as self-healing.
                if let Some(slot) = state.slots.get_mut(&booking.slot_id) {
                    slot.is_booked = false;
                }
                Ok(CancelOutcome::AlreadyCancelled(booking))
            }
            BookingStatus::Confirmed => {
                // Status flip and slot release under one lock: the partial
                // state is unrepresentable, matching the transactional
                // contract.
                if let Some(slot) = state.slots.get_mut(&booking.slot_id) {
                    slot.is_booked = false;
                }
                let cancelled = state
                    .bookings
                    .get_mut(&id)
                    .ok_or_else(|| CoreError::not_found("booking", id))?;
                cancelled.status = BookingStatus::Cancelled;
                Ok(CancelOutcome::Cancelled(cancelled.clone()))
            }
        }
    }

    async fn set_meeting_link(&self, id: BookingId, link: String) -> Result<Booking> {
        let mut state = self.state.lock().await;
        let booking = state
            .bookings
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found("booking", id))?;
        if booking.status != BookingStatus::Confirmed {
            return Err(CoreError::invalid_state(
                "meeting links can only be set on confirmed bookings",
            ));
        }
        booking.meeting_link = Some(link);
        Ok(booking.clone())
    }

    async fn record_rating(
        &self,
        id: BookingId,
        score: RatingScore,
        comment: Option<String>,
    ) -> Result<Booking> {
        let mut state = self.state.lock().await;
        let booking = state
            .bookings
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found("booking", id))?;
        if booking.status != BookingStatus::Completed {
            return Err(CoreError::invalid_state(
                "only completed bookings can be rated",
            ));
        }
        if booking.rating.is_some() {
            return Err(CoreError::invalid_state("booking is already rated"));
        }
        booking.rating = Some(score);
        booking.rating_comment = comment;
        Ok(booking.clone())
    }

    async fn mark_paid(&self, id: BookingId) -> Result<Booking> {
        let mut state = self.state.lock().await;
        let booking = state
            .bookings
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found("booking", id))?;
        booking.payment_status = PaymentStatus::Paid;
        Ok(booking.clone())
    }
}

#[async_trait]
impl TutorStore for InMemoryStore {
    async fn get(&self, id: UserId) -> Result<Option<TutorProfile>> {
        Ok(self.state.lock().await.tutors.get(&id).copied())
    }

    async fn upsert(&self, profile: TutorProfile) -> Result<()> {
        self.state.lock().await.tutors.insert(profile.id, profile);
        Ok(())
    }

    async fn set_hourly_rate(&self, id: UserId, rate: Money) -> Result<TutorProfile> {
        let mut state = self.state.lock().await;
        let profile = state
            .tutors
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found("tutor", id))?;
        profile.hourly_rate = rate;
        Ok(*profile)
    }

    async fn update_rating(
        &self,
        id: UserId,
        expected_count: u32,
        rating: RatingAggregate,
    ) -> Result<bool> {
        let mut state = self.state.lock().await;
        let profile = state
            .tutors
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found("tutor", id))?;
        if profile.rating.count != expected_count {
            return Ok(false);
        }
        profile.rating = rating;
        Ok(true)
    }
}
