//! Predictive hovering
//!
//! The tell that separates engines from people is what the cursor does
//! between clicks. This module keeps it parked near plausible future
//! targets, imperfectly and with second thoughts.

pub mod engine;
pub mod state;

pub use engine::{HoverContext, HoverMetricsSnapshot, PredictiveHoverEngine};
pub use state::{ClickBehavior, HoverPrecision, HoverState, HoverTarget};
