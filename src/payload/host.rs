// src/payload/host.rs

use std::fmt;

/// A zero-argument callable executed on a CPU thread.
pub struct Host<'h> {
    work: Box<dyn Fn() + Send + Sync + 'h>,
}

impl<'h> Host<'h> {
    pub fn new<F>(work: F) -> Self
    where
        F: Fn() + Send + Sync + 'h,
    {
        Self {
            work: Box::new(work),
        }
    }

    /// Run the callable on the calling thread.
    pub fn run(&self) {
        (self.work)()
    }
}

impl fmt::Debug for Host<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn run_invokes_callable_each_time() {
        let calls = AtomicUsize::new(0);
        let host = Host::new(|| {
            calls.fetch_add(1, Ordering::Relaxed);
        });

        host.run();
        host.run();
        assert_eq!(calls.load(Ordering::Relaxed), 2);
    }
}
