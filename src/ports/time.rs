use std::time::Duration;

use time::OffsetDateTime;

/// Wall clock and timer used by the dispatcher for payload timestamps and
/// delivery timeouts.
pub trait TimeProvider: Clone + Send + Sync + 'static {
    type Sleep<'a>: Future<Output = ()> + Send + 'a
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime;
    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a>;
}
