pub mod builders;
pub mod fake_executor;

use std::sync::{Arc, Once};

use heteroflow::device::EmulatedRuntime;
use heteroflow::logging::LOG_ENV_VAR;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// Output goes through the test writer, so it only shows for failing tests
/// unless run with `-- --nocapture`. The filter is read from
/// `HETEROFLOW_LOG` (e.g. `HETEROFLOW_LOG=heteroflow=debug cargo test`) and
/// falls back to `warn`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Emulated runtime with `devices` devices, shared the way executors hold it.
pub fn emulated(devices: u32) -> Arc<EmulatedRuntime> {
    Arc::new(EmulatedRuntime::new(devices))
}
