//! Postgres persistence: the cursor store, tag rotation queue, and message
//! queue collaborators, plus harvest run bookkeeping.

pub mod cursors;
mod error;
pub mod harvest_runs;
mod pool;
pub mod queue;
pub mod seed;
pub mod tags;

pub use cursors::PgCursorStore;
pub use error::DbError;
pub(crate) use error::store_error;
pub use harvest_runs::{
    complete_harvest_run, create_harvest_run, fail_harvest_run, get_harvest_run,
    list_harvest_runs, start_harvest_run, HarvestRunRow, HarvestRunSummary,
};
pub use pool::{connect_pool, ping, run_migrations, PoolConfig};
pub use queue::{queue_depth, PgMessageQueue};
pub use seed::seed_tags;
pub use tags::PgTagQueue;
