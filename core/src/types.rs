//! Domain types for the TutorLink scheduling core.
//!
//! Value objects (identifiers, money, time ranges, rating math) and the
//! three persisted entities: [`Slot`], [`TutorProfile`], and [`Booking`].

use crate::error::{CoreError, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a user (student or tutor).
///
/// Tutors and students share one user namespace: the auth collaborator
/// owns a single user directory and a [`Role`] discriminates the two.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an availability slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotId(Uuid);

impl SlotId {
    /// Creates a new random `SlotId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `SlotId` from a `Uuid`.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SlotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a booking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(Uuid);

impl BookingId {
    /// Creates a new random `BookingId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `BookingId` from a `Uuid`.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Actor
// ============================================================================

/// Marketplace role of a user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Books sessions and submits ratings.
    Student,
    /// Publishes availability and delivers sessions.
    Tutor,
}

impl Role {
    /// String representation used on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Tutor => "tutor",
        }
    }

    /// Parse a role from its wire representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "student" => Some(Self::Student),
            "tutor" => Some(Self::Tutor),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated caller of a core operation.
///
/// Identity is resolved by the auth collaborator before any core operation
/// runs; the core trusts it and never reads ambient request state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actor {
    /// The caller's user id.
    pub id: UserId,
    /// The caller's marketplace role.
    pub role: Role,
}

impl Actor {
    /// Creates a new `Actor`.
    #[must_use]
    pub const fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }
}

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Represents money in cents to avoid floating-point arithmetic errors.
///
/// Hourly rates and booking amounts are both `Money` values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from cents.
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from whole dollars with overflow checking.
    #[must_use]
    pub const fn checked_from_dollars(dollars: u64) -> Option<Self> {
        match dollars.checked_mul(100) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Creates a `Money` value from whole dollars.
    ///
    /// # Panics
    ///
    /// Panics if the conversion would overflow (dollars * 100 > `u64::MAX`).
    /// Use [`Money::checked_from_dollars`] for non-panicking conversion.
    #[must_use]
    #[allow(clippy::panic)]
    pub const fn from_dollars(dollars: u64) -> Self {
        match Self::checked_from_dollars(dollars) {
            Some(money) => money,
            None => panic!("Money::from_dollars overflow"),
        }
    }

    /// Returns the amount in cents.
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Checks if the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Price of `minutes` at this hourly rate, rounded to the nearest cent.
    ///
    /// Fractional hours are permitted; a 90-minute slot at $40.00/h prices
    /// at $60.00 exactly.
    #[must_use]
    pub const fn prorate(self, minutes: u32) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let cents = ((self.0 as u128 * minutes as u128 + 30) / 60) as u64;
        Self(cents)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Time Value Objects
// ============================================================================

/// A same-day time window, half-open (`start` inclusive, `end` exclusive).
///
/// The constructor guarantees `start < end`, so a range never has zero or
/// negative duration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    start: NaiveTime,
    end: NaiveTime,
}

impl TimeRange {
    /// Creates a new `TimeRange`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if `start >= end`.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self> {
        if start >= end {
            return Err(CoreError::validation(format!(
                "start time {start} must be before end time {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Start of the window (inclusive).
    #[must_use]
    pub const fn start(&self) -> NaiveTime {
        self.start
    }

    /// End of the window (exclusive).
    #[must_use]
    pub const fn end(&self) -> NaiveTime {
        self.end
    }

    /// Half-open interval overlap test: true iff the two ranges share any
    /// instant. Ranges that merely touch (`a.end == b.start`) do not overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Duration of the window in whole minutes.
    #[must_use]
    pub fn minutes(&self) -> u32 {
        u32::try_from((self.end - self.start).num_minutes()).unwrap_or(0)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

/// Optional inclusive date bounds for availability queries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DateRange {
    /// Earliest date to include, if any.
    pub from: Option<NaiveDate>,
    /// Latest date to include, if any.
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Creates a new `DateRange`.
    #[must_use]
    pub const fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    /// Whether `date` falls within the bounds.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }
}

// ============================================================================
// Ratings
// ============================================================================

/// A session rating, integer 1–5.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RatingScore(u8);

impl RatingScore {
    /// Creates a `RatingScore`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] unless `1 <= score <= 5`.
    pub fn try_new(score: u8) -> Result<Self> {
        if (1..=5).contains(&score) {
            Ok(Self(score))
        } else {
            Err(CoreError::validation(format!(
                "rating must be between 1 and 5, got {score}"
            )))
        }
    }

    /// The score value.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for RatingScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A tutor's running rating average.
///
/// Updated incrementally, never by re-scanning rating history: the weighted
/// mean `(average * count + score) / (count + 1)` is exact given exact prior
/// state and matches the observed upstream behavior. See DESIGN.md for the
/// float-drift discussion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingAggregate {
    /// Weighted mean of all submitted scores, 0.0 when unrated.
    pub average: f64,
    /// Number of scores submitted.
    pub count: u32,
}

impl RatingAggregate {
    /// Creates an empty aggregate (no ratings yet).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            average: 0.0,
            count: 0,
        }
    }

    /// Restores an aggregate from persisted values.
    #[must_use]
    pub const fn from_parts(average: f64, count: u32) -> Self {
        Self { average, count }
    }

    /// Folds one score into the aggregate, returning the updated value.
    #[must_use]
    pub fn record(self, score: RatingScore) -> Self {
        let total = self
            .average
            .mul_add(f64::from(self.count), f64::from(score.value()));
        Self {
            average: total / f64::from(self.count + 1),
            count: self.count + 1,
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A tutor-declared open time window eligible for booking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Unique slot identifier.
    pub id: SlotId,
    /// Owning tutor.
    pub tutor_id: UserId,
    /// Calendar date of the window.
    pub date: NaiveDate,
    /// Time window within the date.
    pub time: TimeRange,
    /// Whether an active booking currently holds this slot.
    pub is_booked: bool,
}

impl Slot {
    /// Creates a new unbooked `Slot`.
    #[must_use]
    pub const fn new(id: SlotId, tutor_id: UserId, date: NaiveDate, time: TimeRange) -> Self {
        Self {
            id,
            tutor_id,
            date,
            time,
            is_booked: false,
        }
    }
}

/// Pricing and rating aggregate state for a tutor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TutorProfile {
    /// The tutor's user id.
    pub id: UserId,
    /// Current hourly rate; changing it never touches existing bookings.
    pub hourly_rate: Money,
    /// Running rating aggregate.
    pub rating: RatingAggregate,
}

impl TutorProfile {
    /// Creates a profile with no ratings.
    #[must_use]
    pub const fn new(id: UserId, hourly_rate: Money) -> Self {
        Self {
            id,
            hourly_rate,
            rating: RatingAggregate::new(),
        }
    }
}

/// Booking lifecycle status.
///
/// `Completed` and `Cancelled` are terminal: no transition leaves them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Active reservation, the initial state.
    Confirmed,
    /// Session took place; ratings become possible.
    Completed,
    /// Reservation withdrawn; the slot was released.
    Cancelled,
}

impl BookingStatus {
    /// String representation used in storage and on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse a status from its storage representation.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Storage`] if the string is not a known status.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "confirmed" => Ok(Self::Confirmed),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(CoreError::storage(format!("invalid booking status: {s}"))),
        }
    }

    /// Whether this status permits no further transitions.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment progress flag maintained by the payment collaborator.
///
/// Deliberately not part of the lifecycle state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Payment intent created, funds not yet confirmed.
    Pending,
    /// The payment collaborator reported success.
    Paid,
}

impl PaymentStatus {
    /// String representation used in storage and on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }

    /// Parse a payment status from its storage representation.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Storage`] if the string is not a known status.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            _ => Err(CoreError::storage(format!("invalid payment status: {s}"))),
        }
    }
}

/// A confirmed reservation of exactly one slot by one student.
///
/// `date`, `time`, and `amount` are copied from the slot and the tutor's
/// rate at creation time and never change afterwards, even if the slot is
/// edited after release or the tutor's rate moves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// Unique booking identifier.
    pub id: BookingId,
    /// Student who made the reservation.
    pub student_id: UserId,
    /// Tutor delivering the session.
    pub tutor_id: UserId,
    /// The slot this booking holds (1:1 while active).
    pub slot_id: SlotId,
    /// Session date, frozen at creation.
    pub date: NaiveDate,
    /// Session time window, frozen at creation.
    pub time: TimeRange,
    /// Subject the student wants help with.
    pub subject: String,
    /// Optional free-form note from the student.
    pub description: Option<String>,
    /// Price, frozen at creation: the tutor's rate prorated to the window.
    pub amount: Money,
    /// Lifecycle status.
    pub status: BookingStatus,
    /// Payment collaborator flag.
    pub payment_status: PaymentStatus,
    /// Video-call link attached by the tutor.
    pub meeting_link: Option<String>,
    /// Rating submitted by the student, at most once, after completion.
    pub rating: Option<RatingScore>,
    /// Optional review text accompanying the rating.
    pub rating_comment: Option<String>,
    /// When the booking was created.
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Creates a confirmed booking holding `slot`, copying its calendar
    /// values.
    #[must_use]
    pub fn create(
        id: BookingId,
        student_id: UserId,
        slot: &Slot,
        subject: String,
        description: Option<String>,
        amount: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            student_id,
            tutor_id: slot.tutor_id,
            slot_id: slot.id,
            date: slot.date,
            time: slot.time,
            subject,
            description,
            amount,
            status: BookingStatus::Confirmed,
            payment_status: PaymentStatus::Pending,
            meeting_link: None,
            rating: None,
            rating_comment: None,
            created_at,
        }
    }

    /// Whether `user` participates in this booking as student or tutor.
    #[must_use]
    pub fn involves(&self, user: UserId) -> bool {
        self.student_id == user || self.tutor_id == user
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_time_range_rejects_inverted() {
        assert!(TimeRange::new(t(10, 0), t(9, 0)).is_err());
        assert!(TimeRange::new(t(10, 0), t(10, 0)).is_err());
    }

    #[test]
    fn test_time_range_overlap_half_open() {
        let morning = TimeRange::new(t(9, 0), t(10, 0)).unwrap();
        let touching = TimeRange::new(t(10, 0), t(11, 0)).unwrap();
        let straddling = TimeRange::new(t(9, 30), t(10, 30)).unwrap();

        assert!(!morning.overlaps(&touching));
        assert!(!touching.overlaps(&morning));
        assert!(morning.overlaps(&straddling));
        assert!(straddling.overlaps(&morning));
    }

    #[test]
    fn test_time_range_minutes() {
        let range = TimeRange::new(t(9, 0), t(10, 30)).unwrap();
        assert_eq!(range.minutes(), 90);
    }

    #[test]
    fn test_money_prorate_exact_hour() {
        let rate = Money::from_dollars(40);
        assert_eq!(rate.prorate(60), Money::from_dollars(40));
        assert_eq!(rate.prorate(90), Money::from_dollars(60));
        assert_eq!(rate.prorate(30), Money::from_dollars(20));
    }

    #[test]
    fn test_money_prorate_rounds_to_nearest_cent() {
        // $10.00/h for 50 minutes = 833.33... cents, rounds down to 833.
        let rate = Money::from_dollars(10);
        assert_eq!(rate.prorate(50), Money::from_cents(833));
        // $10.01/h for 59 minutes = 984.31... cents.
        assert_eq!(Money::from_cents(1001).prorate(59), Money::from_cents(984));
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(4005).to_string(), "$40.05");
    }

    #[test]
    fn test_rating_score_bounds() {
        assert!(RatingScore::try_new(0).is_err());
        assert!(RatingScore::try_new(6).is_err());
        assert_eq!(RatingScore::try_new(5).unwrap().value(), 5);
    }

    #[test]
    fn test_rating_aggregate_weighted_mean() {
        // (4.8 * 10 + 5) / 11 ≈ 4.818
        let aggregate = RatingAggregate::from_parts(4.8, 10);
        let updated = aggregate.record(RatingScore::try_new(5).unwrap());
        assert_eq!(updated.count, 11);
        assert!((updated.average - 53.0 / 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_rating_aggregate_first_score() {
        let updated = RatingAggregate::new().record(RatingScore::try_new(3).unwrap());
        assert_eq!(updated.count, 1);
        assert!((updated.average - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_date_range_contains() {
        let d = |s: &str| s.parse::<NaiveDate>().unwrap();
        let range = DateRange::new(Some(d("2024-06-01")), Some(d("2024-06-30")));
        assert!(range.contains(d("2024-06-15")));
        assert!(!range.contains(d("2024-07-01")));
        assert!(DateRange::default().contains(d("1999-01-01")));
    }

    #[test]
    fn test_status_codecs_round_trip() {
        for status in [
            BookingStatus::Confirmed,
            BookingStatus::Completed,
            BookingStatus::Cancelled,
        ] {
            assert_eq!(BookingStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(BookingStatus::parse("pending").is_err());
        assert!(BookingStatus::Completed.is_terminal());
        assert!(!BookingStatus::Confirmed.is_terminal());
    }
}
