//! Parking demo
//!
//! Books a few parking slots against the in-memory store, follows them in a
//! live view, then fast-forwards the clock to show bookings moving from
//! active to history.
//!
//! ```text
//! RUST_LOG=parkslot_runtime=debug cargo run -p parking-demo
//! ```

use anyhow::Context;
use chrono::Duration;
use parkslot_core::catalog::Catalog;
use parkslot_core::environment::{Clock, SystemClock};
use parkslot_core::history::{HistoryQuery, SortBy};
use parkslot_core::lifecycle::{format_duration, time_remaining};
use parkslot_core::store::Session;
use parkslot_core::types::{LotId, OwnerId};
use parkslot_runtime::metrics::MetricsServer;
use parkslot_runtime::{BookingRequest, BookingService, Config, LiveView, ReadModel};
use parkslot_testing::{InMemoryReservationStore, ManualClock};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("loading configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.observability.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting parking demo");

    let metrics = match config.observability.metrics_addr {
        Some(addr) => {
            let mut server = MetricsServer::new(addr);
            server.start()?;
            Some(server)
        }
        None => None,
    };

    let catalog = Arc::new(Catalog::default_lots());
    for lot in catalog.lots() {
        info!(
            lot = %lot.id,
            name = %lot.name,
            rate = %lot.price_per_hour,
            available = lot.available_slots,
            availability = ?lot.availability(),
            "Lot"
        );
    }

    // Manual clock so the demo can skip ahead in time
    let clock = Arc::new(ManualClock::new(SystemClock.now()));
    let store = Arc::new(InMemoryReservationStore::with_clock(clock.clone()));
    let booking = BookingService::new(
        store.clone(),
        catalog.clone(),
        clock.clone(),
        config.booking.clone(),
    );
    let mut view = LiveView::new(store, clock.clone());

    let driver = OwnerId::new("demo-driver");
    let session = Session::authenticated(driver.clone());
    view.bind(driver).await;

    let start = clock.now() + Duration::hours(1);
    let plan = [("1", 0, 2), ("3", 1, 1), ("6", 6, 4)];
    for (lot, offset_hours, duration_hours) in plan {
        let request = BookingRequest {
            lot: LotId::new(lot),
            start_time: start + Duration::hours(offset_hours),
            duration_hours,
            slot_number: 1,
        };
        let id = booking.create(&session, request).await?;
        info!(reservation_id = %id, lot, "Booked");
    }

    let mut updates = view.updates();
    let model = updates
        .wait_for(|m| m.is_ready() && m.snapshot.len() == plan.len())
        .await
        .context("live view closed")?
        .clone();
    report(&model, clock.now(), config.dashboard.recent_limit);

    clock.advance(Duration::hours(5));
    info!(now = %clock.now(), "Skipped ahead five hours");
    report(&view.read(), clock.now(), config.dashboard.recent_limit);

    let by_amount = HistoryQuery::new()
        .with_sort(SortBy::Amount)
        .apply(&view.read().snapshot, clock.now());
    for reservation in &by_amount {
        info!(
            lot = %reservation.resource_name,
            amount = %reservation.amount,
            length = %format_duration(reservation.start_time, reservation.end_time),
            "By amount"
        );
    }

    view.teardown().await;

    if let Some(text) = metrics.as_ref().and_then(MetricsServer::render) {
        println!("{text}");
    }

    info!("Parking demo finished");
    Ok(())
}

fn report(model: &ReadModel, now: chrono::DateTime<chrono::Utc>, recent_limit: usize) {
    let summary = model.summary(recent_limit);
    info!(
        active = summary.active_count,
        history = summary.history_count,
        total_spent = %summary.total_spent,
        average_history = %summary.average_history_amount,
        "Dashboard"
    );
    for reservation in &model.active {
        info!(
            lot = %reservation.resource_name,
            slot = reservation.slot_number,
            remaining = %time_remaining(reservation, now),
            "Active"
        );
    }
    for reservation in &summary.recent {
        info!(
            lot = %reservation.resource_name,
            amount = %reservation.amount,
            "Recent"
        );
    }
}
