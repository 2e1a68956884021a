pub mod fs_atomic;
pub mod logging;
pub mod time;

pub use fs_atomic::{atomic_write_file, write_json_atomic};
pub use logging::{append_pipeline_log, pipeline_log_path, PipelineLog};
pub use time::now_secs;
