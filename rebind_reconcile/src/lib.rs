mod bake_driver;
mod config;
mod engine;
mod index;
mod matcher;

pub use bake_driver::maybe_start_bake;
pub use config::{ConfigError, ReconcileConfig};
pub use engine::{PassSummary, Phase, Reconciler};
pub use index::{GraphIndex, IndexBuilder};
pub use matcher::{MatchMethod, match_record};
