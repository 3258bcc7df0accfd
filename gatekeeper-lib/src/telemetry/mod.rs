pub mod health;
pub mod metrics;
pub mod metrics_handler;
pub mod tracing;

pub use health::{health_response, live_response, ready_response};
pub use metrics::{init_metrics, Metrics};
pub use metrics_handler::handle_metrics;
pub use tracing::init_tracing;
