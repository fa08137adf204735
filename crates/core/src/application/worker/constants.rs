// Worker constants (no magic values)
use std::time::Duration;

/// Default number of workers draining the in-process engine
pub const DEFAULT_WORKER_COUNT: usize = 2;

/// Grace period for in-flight exports after shutdown is signalled
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(30);
