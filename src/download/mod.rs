pub mod analysis;
pub mod cancel;
pub mod executor;
pub mod pool;

pub use analysis::{analyze_run_dir, RunAnalysis};
pub use cancel::CancelToken;
pub use executor::DownloadExecutor;
pub use pool::{PoolReport, TaskOutcome, TaskPool};
