#![allow(dead_code)]

pub use heteroflow_test_utils::builders;
pub use heteroflow_test_utils::fake_executor;
pub use heteroflow_test_utils::{emulated, init_tracing};
