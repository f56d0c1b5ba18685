//! # Parkslot Runtime
//!
//! The parts of Parkslot that run on tokio.
//!
//! ## Core Components
//!
//! - **Live view** ([`live_view`]): follows one principal's snapshot feed and
//!   publishes classified read models
//! - **Booking** ([`booking`]): validates booking requests, prices them and
//!   creates reservations
//! - **Configuration** ([`config`]): environment-driven settings
//! - **Metrics** ([`metrics`]): Prometheus recorders for both components
//!
//! ## Example
//!
//! ```ignore
//! use parkslot_runtime::{BookingService, BookingRequest, Config, LiveView};
//!
//! let config = Config::from_env()?;
//! let booking = BookingService::new(store.clone(), catalog, clock.clone(), config.booking);
//! let mut view = LiveView::new(store, clock);
//!
//! view.bind(owner.clone()).await;
//! booking.create(&Session::authenticated(owner), request).await?;
//!
//! let model = view.changed().await;
//! ```

/// Booking requests and the create command path
pub mod booking;

/// Configuration loaded from the environment
pub mod config;

/// Live, classified view over a principal's reservations
pub mod live_view;

/// Prometheus metrics for observability
pub mod metrics;

pub use booking::{BookingError, BookingRequest, BookingService};
pub use config::{Config, ConfigError};
pub use live_view::{LiveView, ReadModel, ViewPhase};
