mod filter;
#[allow(clippy::module_inception)]
mod session;
mod state;
mod subscriber;

pub use {
    filter::StabilityFilter,
    session::TuningSession,
    state::{SessionState, TuningState},
    subscriber::{SubscriptionId, TuningSubscriber},
};
