//! Booking Lifecycle Demo
//!
//! Walks a tattoo booking through its whole life against in-memory
//! collaborators:
//! - Consent, request and the automatic move to pending
//! - Confirmation with date, price and duration
//! - Completion and the review flow
//! - Two customers racing for the same slot
//!
//! # Usage
//!
//! ```bash
//! BOOKING_AUTO_PENDING_DELAY_MS=500 cargo run --bin booking-demo
//! ```

use booking_engine_core::environment::SystemClock;
use booking_lifecycle::{
    Actor, ArtistId, BookingDetails, BookingOrchestrator, Collaborators, ConfirmOutcome,
    CustomerId, EngineConfig, Money, ReviewPayload,
    metrics::register_booking_metrics,
    mocks::{InMemoryBookingRepository, InMemoryReviewStore, MockAvailability, RecordingNotifier},
};
use chrono::{Duration, TimeZone, Utc};
use futures::future::join_all;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,booking_lifecycle=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("\n🖋  ============================================");
    println!("   Tattoo Booking Lifecycle - Live Demo");
    println!("============================================\n");

    let config = EngineConfig::from_env();
    register_booking_metrics();

    let repository = Arc::new(InMemoryBookingRepository::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let reviews = Arc::new(InMemoryReviewStore::new());
    let orchestrator = BookingOrchestrator::new(
        config.clone(),
        Collaborators {
            repository: repository.clone(),
            availability: Arc::new(MockAvailability::default()),
            notifier: notifier.clone(),
            reviews: reviews.clone(),
            clock: Arc::new(SystemClock),
        },
    );

    let customer = CustomerId::new("C1");
    let artist = ArtistId::new("A1");
    let appointment = Utc
        .with_ymd_and_hms(2025, 3, 1, 14, 0, 0)
        .single()
        .ok_or_else(|| anyhow::anyhow!("invalid appointment date"))?;

    // ========== Scenario 1: request ==========

    println!("1️⃣  Customer agrees to the studio terms and requests a booking...");
    orchestrator.agree_legal_terms(&customer, &config.terms_version, "I accept the studio terms")?;

    let booking = orchestrator
        .create_booking_request(
            customer.clone(),
            artist.clone(),
            BookingDetails::at(appointment)
                .with_duration(90)
                .with_description("Fine-line botanical sleeve, first session"),
        )
        .await?;
    println!("   ✓ Booking {} is {}", booking.id, booking.state);

    tokio::time::sleep(config.auto_pending_delay() + std::time::Duration::from_millis(200)).await;
    let pending = orchestrator
        .get_booking(booking.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("booking disappeared"))?;
    println!("   ✓ After the review delay it is {}\n", pending.state);

    // ========== Scenario 2: confirm ==========

    println!("2️⃣  Artist confirms date, price and duration...");
    match orchestrator
        .confirm_booking(booking.id, appointment, Money::new(30_000), 90)
        .await?
    {
        ConfirmOutcome::Confirmed(confirmed) => println!(
            "   ✓ Confirmed for {} at {:?}\n",
            appointment,
            confirmed.confirmed_price
        ),
        ConfirmOutcome::Conflict(conflict) => {
            println!("   ✗ Unexpected conflict with {}\n", conflict.winner);
        },
    }

    // ========== Scenario 3: complete and review ==========

    println!("3️⃣  Session done, customer leaves a review...");
    let completed = orchestrator.complete_booking(booking.id).await?;
    println!(
        "   ✓ Booking is {} (visited studio: {})",
        completed.state, completed.visited_studio
    );

    orchestrator.unlock_review(booking.id).await?;
    println!(
        "   ✓ Review unlocked, can write: {}",
        orchestrator.can_write_review(booking.id).await?
    );

    orchestrator
        .submit_review(
            booking.id,
            ReviewPayload {
                rating: 5,
                comment: "Clean lines, great aftercare advice".to_string(),
            },
        )
        .await?;
    println!("   ✓ Review stored ({} in store)", reviews.reviews().len());

    let second = orchestrator
        .submit_review(
            booking.id,
            ReviewPayload {
                rating: 1,
                comment: "double post".to_string(),
            },
        )
        .await;
    if let Err(error) = second {
        println!("   ✓ Second review rejected: {error}\n");
    }

    // ========== Scenario 4: two customers, one slot ==========

    println!("4️⃣  Two customers want the same afternoon...");
    let rival = CustomerId::new("C2");
    orchestrator.agree_legal_terms(&rival, &config.terms_version, "I accept the studio terms")?;

    let slot = appointment + Duration::days(7);
    let first = orchestrator
        .create_booking_request(
            customer.clone(),
            artist.clone(),
            BookingDetails::at(slot).with_duration(120),
        )
        .await?;
    let second = orchestrator
        .create_booking_request(
            rival.clone(),
            artist.clone(),
            BookingDetails::at(slot + Duration::minutes(30)).with_duration(120),
        )
        .await?;

    let outcomes = join_all([
        orchestrator.confirm_booking(first.id, slot, Money::new(40_000), 120),
        orchestrator.confirm_booking(second.id, slot + Duration::minutes(30), Money::new(40_000), 120),
    ])
    .await;

    for outcome in outcomes {
        match outcome? {
            ConfirmOutcome::Confirmed(booking) => {
                println!("   ✓ {} keeps the slot", booking.customer_id);
            },
            ConfirmOutcome::Conflict(conflict) => {
                println!(
                    "   ✗ Booking {} lost to {}; {} alternative slots offered",
                    conflict.loser,
                    conflict.winner,
                    conflict.alternatives.len()
                );
                for alternative in &conflict.alternatives {
                    println!("      • {alternative}");
                }
                orchestrator
                    .cancel_booking(conflict.loser, "slot taken", Actor::System)
                    .await?;
            },
        }
    }

    // ========== Ledger ==========

    println!("\n📜 Transition ledger:");
    println!("{}", serde_json::to_string_pretty(&orchestrator.full_history())?);

    println!(
        "\n📨 {} notifications sent, {} saves, {} ledger entries mirrored",
        notifier.sent().len(),
        repository.save_count(),
        repository.ledger_entries().len()
    );

    let cancelled = orchestrator.shutdown();
    println!("✓ Shut down ({cancelled} scheduled follow-ups cancelled)\n");

    Ok(())
}
