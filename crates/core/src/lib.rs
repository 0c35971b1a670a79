//! Update lifecycle domain logic.
//!
//! Pure engines (requirements, request transitions, create/edit planning,
//! obsoletion, query filtering) plus the [`store::UpdateStore`] seam and the
//! [`service::UpdateService`] that drives them. Nothing here touches a
//! database directly.

pub mod enums;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod model;
pub mod obsoletion;
pub mod query;
pub mod requirements;
pub mod service;
pub mod store;
pub mod submission;
pub mod transition;
pub mod types;
