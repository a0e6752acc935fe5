//! Domain types for the booking lifecycle.
//!
//! This module contains the value objects and the [`Booking`] record that the
//! state machine, the gates and the conflict resolver operate on.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BookingId(Uuid);

impl BookingId {
    /// Generate a new booking ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
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

impl std::fmt::Display for BookingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque customer identifier supplied by the surrounding application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CustomerId(String);

impl CustomerId {
    /// Wrap an external customer id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque artist identifier supplied by the surrounding application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtistId(String);

impl ArtistId {
    /// Wrap an external artist id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArtistId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One side of a booking.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Participant {
    /// The customer who requested the booking
    Customer(CustomerId),
    /// The artist who performs the treatment
    Artist(ArtistId),
}

impl std::fmt::Display for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer(id) => write!(f, "customer:{id}"),
            Self::Artist(id) => write!(f, "artist:{id}"),
        }
    }
}

/// Who caused a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Actor {
    /// The customer
    Customer(CustomerId),
    /// The artist
    Artist(ArtistId),
    /// The engine itself (scheduled follow-ups)
    System,
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer(id) => write!(f, "customer:{id}"),
            Self::Artist(id) => write!(f, "artist:{id}"),
            Self::System => f.write_str("system"),
        }
    }
}

// ============================================================================
// Value Objects
// ============================================================================

/// Price in minor currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Create from minor units.
    #[must_use]
    pub const fn new(amount: u64) -> Self {
        Self(amount)
    }

    /// Amount in minor units.
    #[must_use]
    pub const fn amount(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A span of artist time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the session
    pub start: DateTime<Utc>,
    /// Length of the session in minutes
    pub duration_minutes: u32,
}

impl TimeWindow {
    /// Create a window starting at `start`.
    #[must_use]
    pub const fn new(start: DateTime<Utc>, duration_minutes: u32) -> Self {
        Self {
            start,
            duration_minutes,
        }
    }

    /// End of the session (exclusive).
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.start + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Half-open interval overlap: back-to-back sessions do not overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}

/// What the customer asks for when requesting a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDetails {
    /// Date and time the customer would like
    pub preferred_date: DateTime<Utc>,
    /// Expected session length, if the customer knows it
    pub duration_minutes: Option<u32>,
    /// Free-form description of the piece
    pub description: String,
}

impl BookingDetails {
    /// Details with only a preferred date.
    #[must_use]
    pub const fn at(preferred_date: DateTime<Utc>) -> Self {
        Self {
            preferred_date,
            duration_minutes: None,
            description: String::new(),
        }
    }

    /// Set the expected session length.
    #[must_use]
    pub const fn with_duration(mut self, minutes: u32) -> Self {
        self.duration_minutes = Some(minutes);
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A customer's acceptance of the legal terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRecord {
    /// Terms version that was accepted
    pub version: String,
    /// Terms text as shown to the customer
    pub text: String,
    /// When the customer accepted
    pub agreed_at: DateTime<Utc>,
}

/// Review content submitted by the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewPayload {
    /// Star rating, 1 to 5
    pub rating: u8,
    /// Free-form review text
    pub comment: String,
}

// ============================================================================
// State Enums
// ============================================================================

/// Lifecycle state of a booking.
///
/// ```text
/// Idle ──▶ Requested ──▶ Pending ──▶ Confirmed ──▶ Completed
///              │  │          │         ▲    │
///              │  └──────────┼─────────┘    │
///              ▼             ▼              ▼
///          Cancelled ◀── Cancelled ◀─── Cancelled
/// ```
///
/// `Idle` exists only before creation and is never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingState {
    /// Not yet created
    Idle,
    /// Request sent, artist not yet notified as pending
    Requested,
    /// Awaiting artist response
    Pending,
    /// Date, price and duration agreed
    Confirmed,
    /// Treatment done
    Completed,
    /// Called off by either party
    Cancelled,
}

impl BookingState {
    /// Every state, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Idle,
        Self::Requested,
        Self::Pending,
        Self::Confirmed,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Whether `self → next` is an edge of the lifecycle graph.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Requested)
                | (Self::Requested, Self::Pending | Self::Confirmed | Self::Cancelled)
                | (Self::Pending, Self::Confirmed | Self::Cancelled)
                | (Self::Confirmed, Self::Completed | Self::Cancelled)
        )
    }

    /// No further booking transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Stable lowercase name, used in logs and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Requested => "requested",
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for BookingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the customer may review the booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReviewState {
    /// Review not yet allowed
    #[default]
    Locked,
    /// Review may be written
    Unlocked,
    /// Review has been written
    Submitted,
}

impl std::fmt::Display for ReviewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Locked => "locked",
            Self::Unlocked => "unlocked",
            Self::Submitted => "submitted",
        })
    }
}

/// Whether the customer accepted the current legal terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LegalConsentState {
    /// Terms not accepted (or an outdated version accepted)
    #[default]
    NotAgreed,
    /// Current terms accepted
    Agreed,
}

/// The operation a caller attempted; named in state violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transition {
    /// Create a booking request
    Create,
    /// Scheduled move from requested to pending
    AdvanceToPending,
    /// Artist accepts a pending request
    Accept,
    /// Artist confirms date, price and duration
    Confirm,
    /// Either party cancels
    Cancel,
    /// Treatment finished
    Complete,
    /// Open the review gate
    UnlockReview,
    /// Submit the review
    SubmitReview,
}

impl Transition {
    /// Stable lowercase name, used in logs and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::AdvanceToPending => "advance_to_pending",
            Self::Accept => "accept",
            Self::Confirm => "confirm",
            Self::Cancel => "cancel",
            Self::Complete => "complete",
            Self::UnlockReview => "unlock_review",
            Self::SubmitReview => "submit_review",
        }
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Booking
// ============================================================================

/// One customer-artist appointment negotiation and its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Booking ID
    pub id: BookingId,
    /// Requesting customer
    pub customer_id: CustomerId,
    /// Requested artist
    pub artist_id: ArtistId,
    /// Date the customer asked for
    pub preferred_date: DateTime<Utc>,
    /// Session length the customer asked for
    pub requested_duration: Option<u32>,
    /// Description of the piece
    pub description: String,
    /// Agreed date
    pub confirmed_date: Option<DateTime<Utc>>,
    /// Agreed session length in minutes
    pub confirmed_duration: Option<u32>,
    /// Agreed price
    pub confirmed_price: Option<Money>,
    /// Lifecycle state
    pub state: BookingState,
    /// Review gate state
    pub review_state: ReviewState,
    /// Whether the customer attended the studio
    pub visited_studio: bool,
    /// Consent state at creation
    pub legal_consent: LegalConsentState,
    /// Terms version accepted at creation
    pub consent_version: Option<String>,
    /// When those terms were accepted
    pub consent_agreed_at: Option<DateTime<Utc>>,
    /// When the request was created
    pub created_at: DateTime<Utc>,
    /// Last mutation
    pub updated_at: DateTime<Utc>,
    /// When the booking entered `Confirmed`
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Why the booking was cancelled
    pub cancellation_reason: Option<String>,
}

impl Booking {
    /// The slot this booking occupies (or asks for).
    ///
    /// Confirmed values win over requested ones; `default_duration` fills in
    /// when no duration is known at all.
    #[must_use]
    pub fn window(&self, default_duration: u32) -> TimeWindow {
        TimeWindow::new(
            self.confirmed_date.unwrap_or(self.preferred_date),
            self.confirmed_duration
                .or(self.requested_duration)
                .unwrap_or(default_duration),
        )
    }

    /// Whether `participant` is a party to this booking.
    #[must_use]
    pub fn involves(&self, participant: &Participant) -> bool {
        match participant {
            Participant::Customer(id) => &self.customer_id == id,
            Participant::Artist(id) => &self.artist_id == id,
        }
    }

    /// The customer as a notification recipient.
    #[must_use]
    pub fn customer(&self) -> Participant {
        Participant::Customer(self.customer_id.clone())
    }

    /// The artist as a notification recipient.
    #[must_use]
    pub fn artist(&self) -> Participant {
        Participant::Artist(self.artist_id.clone())
    }
}
