//! Reference-counted shared incoming logger

use std::sync::Arc;

use tell_sinks::Consumer;

/// One token's incoming logger and the number of batch destinations using it
///
/// Only touched under the service's write lock, so the count is a plain
/// integer.
pub(crate) struct LoggerUsage {
    logger: Arc<dyn Consumer>,
    usage: usize,
}

impl LoggerUsage {
    pub(crate) fn new(logger: Arc<dyn Consumer>) -> Self {
        Self { logger, usage: 0 }
    }

    pub(crate) fn logger(&self) -> &Arc<dyn Consumer> {
        &self.logger
    }

    pub(crate) fn usage(&self) -> usize {
        self.usage
    }

    /// Attach one more destination
    pub(crate) fn acquire(&mut self) {
        self.usage += 1;
    }

    /// Detach one destination, returning the remaining count
    pub(crate) fn release(&mut self) -> usize {
        self.usage = self.usage.saturating_sub(1);
        self.usage
    }

    pub(crate) fn into_logger(self) -> Arc<dyn Consumer> {
        self.logger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tell_sinks::{Event, SinkError};

    struct Quiet;

    impl Consumer for Quiet {
        fn name(&self) -> &str {
            "incoming.tok=web"
        }

        fn consume(&self, _event: Arc<Event>) {}

        fn close(&self) -> Result<(), SinkError> {
            Ok(())
        }
    }

    #[test]
    fn test_counting() {
        let mut usage = LoggerUsage::new(Arc::new(Quiet));
        assert_eq!(usage.usage(), 0);

        usage.acquire();
        usage.acquire();
        assert_eq!(usage.usage(), 2);
        assert_eq!(usage.release(), 1);
        assert_eq!(usage.release(), 0);
        assert_eq!(usage.release(), 0);
        assert_eq!(usage.logger().name(), "incoming.tok=web");
    }
}
