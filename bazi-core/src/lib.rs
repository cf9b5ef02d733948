//! Bazi relationship detection and matching engine.
//!
//! This crate provides:
//! - Four Pillars derivation from a birth date (plus luck and annual pillars)
//! - The rule catalog of stem and branch interactions, with scoring
//! - Exhaustive relationship enumeration for a chart
//! - Stateless verification of a player's selection against the catalog
//! - A request/response layer for hosting the game behind any transport
//!
//! # Quick Start
//!
//! ```ignore
//! use bazi_core::{BirthDate, Calendar, ChartMode, RelationshipEngine, RuleSettings};
//! use bazi_core::verify::{verify, Selection};
//!
//! let calendar = Calendar::new();
//! let mut rng = rand::thread_rng();
//! let chart = calendar.derive_chart(&BirthDate::new(1990, 5, 17, 14), ChartMode::Basic, &mut rng)?;
//!
//! let catalog = RelationshipEngine::new(RuleSettings::default()).enumerate(&chart);
//! let outcome = verify(&Selection::on_chart(&[0, 1], &chart)?, &catalog, &[]);
//! println!("{chart}: {}", outcome.found);
//! ```

pub mod api;
pub mod calendar;
pub mod chart;
pub mod config;
pub mod ganzhi;
pub mod relations;
pub mod rules;
pub mod testing;
pub mod verify;

// Primary public API
pub use api::{ApiError, Handler, Method, Operation, Response};
pub use calendar::{Calendar, CalendarError, Clock, FixedClock, SystemClock};
pub use chart::{BirthDate, Chart, ChartError, ChartMode, Provenance};
pub use config::{ConfigError, EngineConfig};
pub use ganzhi::{Branch, Element, Pillar, Stem, Symbol};
pub use relations::{Relationship, RelationshipEngine};
pub use rules::{RelationKind, RuleError, RuleKind, RuleSettings};
pub use verify::{Selection, SelectionError, VerifyOutcome};
