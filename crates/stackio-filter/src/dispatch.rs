//! Request submission walk and cooperative chaining
//!
//! A request enters at some altitude and walks downward until a filter
//! declaring [`Capabilities::SUBMIT`] takes it over. From that point the
//! filter owns the request: it completes it, or forwards it to the filters
//! below through [`SubmitChain::next`]. Nothing continues the walk
//! implicitly. A request that falls through the whole range goes to the
//! default device queue.

use crate::filter::{Capabilities, FilterDescriptor};
use crate::registry::FilterRegistry;
use crate::request::{IoRequest, Outcome};
use crate::{ALTITUDE_MAX, ALTITUDE_MIN};
use std::sync::Arc;

/// A filter's position in the chain while it holds a request
///
/// Handed to [`BlockFilter::on_submit`](crate::BlockFilter::on_submit);
/// forwarding through [`next`](Self::next) resumes the walk immediately
/// below the filter's own altitude.
pub struct SubmitChain<'a> {
    registry: &'a FilterRegistry,
    altitude: u8,
}

impl SubmitChain<'_> {
    /// Altitude of the filter currently holding the request
    pub fn altitude(&self) -> u8 {
        self.altitude
    }

    /// Forward a request to the filters below this one
    pub fn next(&self, request: IoRequest) -> Outcome {
        self.registry.submit_at(self.altitude - 1, request)
    }
}

impl FilterRegistry {
    /// Submit a request at the top of the filter chain
    pub fn submit(&self, request: IoRequest) -> Outcome {
        self.submit_at(ALTITUDE_MAX, request)
    }

    /// Walk the chain downward from `start_altitude`
    ///
    /// The first present filter with [`Capabilities::SUBMIT`] at or below
    /// `start_altitude` receives the request; with no interceptor in range
    /// the request goes straight to the device queue. A start below the
    /// minimum altitude makes the walk empty; one above the maximum walks
    /// the full table. The dispatcher adds no retries and no errors of its
    /// own: whatever the filter or the queue returns is the outcome.
    pub fn submit_at(&self, start_altitude: u8, request: IoRequest) -> Outcome {
        if let Some((altitude, descriptor)) = self.interceptor_at_or_below(start_altitude) {
            let chain = SubmitChain {
                registry: self,
                altitude,
            };
            return descriptor.filter().on_submit(request, &chain);
        }
        self.queue().submit(request)
    }

    /// Highest submit-capable registration at or below `start_altitude`
    ///
    /// The descriptor Arc is cloned out of the slot so the table lock is
    /// released before the callback runs; a filter re-entering the
    /// dispatcher to forward cannot deadlock against its own walk.
    fn interceptor_at_or_below(&self, start_altitude: u8) -> Option<(u8, Arc<FilterDescriptor>)> {
        let table = self.table().read();
        let mut altitude = start_altitude.min(ALTITUDE_MAX);
        while altitude >= ALTITUDE_MIN {
            if let Some(registration) = table.get(altitude) {
                if registration
                    .descriptor
                    .capabilities()
                    .contains(Capabilities::SUBMIT)
                {
                    return Some((altitude, Arc::clone(&registration.descriptor)));
                }
            }
            altitude -= 1;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceId, DeviceQueue};
    use crate::filter::BlockFilter;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::thread;

    /// Counts how many requests fall through to the default path.
    #[derive(Default)]
    struct CountingQueue {
        submissions: AtomicU64,
    }

    impl DeviceQueue for CountingQueue {
        fn submit(&self, _request: IoRequest) -> Outcome {
            let cookie = self.submissions.fetch_add(1, Ordering::Relaxed);
            Outcome::Queued(cookie)
        }
    }

    /// Counts interceptions; forwards or terminates depending on `forward`.
    struct Tap {
        seen: AtomicU64,
        forward: bool,
    }

    impl Tap {
        fn new(forward: bool) -> Arc<Self> {
            Arc::new(Self {
                seen: AtomicU64::new(0),
                forward,
            })
        }
    }

    impl BlockFilter for Tap {
        fn on_submit(&self, request: IoRequest, chain: &SubmitChain<'_>) -> Outcome {
            self.seen.fetch_add(1, Ordering::Relaxed);
            if self.forward {
                chain.next(request)
            } else {
                Outcome::Completed
            }
        }
    }

    fn install(registry: &FilterRegistry, name: &str, altitude: u8, tap: &Arc<Tap>) {
        registry
            .register(Arc::new(FilterDescriptor::new(
                name,
                altitude,
                Capabilities::SUBMIT,
                Arc::clone(tap) as Arc<dyn BlockFilter>,
            )))
            .unwrap();
    }

    fn request() -> IoRequest {
        IoRequest::read(DeviceId::new(), 0, 512)
    }

    #[test]
    fn test_empty_chain_hits_default_path_once() {
        let queue = Arc::new(CountingQueue::default());
        let registry = FilterRegistry::new(Arc::clone(&queue) as Arc<dyn DeviceQueue>);

        let outcome = registry.submit(request());
        assert_eq!(outcome, Outcome::Queued(0));
        assert_eq!(queue.submissions.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_highest_interceptor_wins() {
        let queue = Arc::new(CountingQueue::default());
        let registry = FilterRegistry::new(Arc::clone(&queue) as Arc<dyn DeviceQueue>);

        let low = Tap::new(false);
        let high = Tap::new(false);
        install(&registry, "low", 2, &low);
        install(&registry, "high", 4, &high);

        let outcome = registry.submit(request());
        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(high.seen.load(Ordering::Relaxed), 1);
        // Terminated at altitude 4: nothing below runs, queue untouched.
        assert_eq!(low.seen.load(Ordering::Relaxed), 0);
        assert_eq!(queue.submissions.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_forwarding_resumes_below_own_altitude() {
        let queue = Arc::new(CountingQueue::default());
        let registry = FilterRegistry::new(Arc::clone(&queue) as Arc<dyn DeviceQueue>);

        let low = Tap::new(true);
        let high = Tap::new(true);
        install(&registry, "low", 2, &low);
        install(&registry, "high", 4, &high);

        let outcome = registry.submit(request());
        // Both forwarded, so the request reached the queue.
        assert_eq!(outcome, Outcome::Queued(0));
        assert_eq!(high.seen.load(Ordering::Relaxed), 1);
        assert_eq!(low.seen.load(Ordering::Relaxed), 1);
        assert_eq!(queue.submissions.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_submit_at_skips_higher_filters() {
        let queue = Arc::new(CountingQueue::default());
        let registry = FilterRegistry::new(Arc::clone(&queue) as Arc<dyn DeviceQueue>);

        let low = Tap::new(false);
        let high = Tap::new(false);
        install(&registry, "low", 2, &low);
        install(&registry, "high", 4, &high);

        registry.submit_at(3, request());
        assert_eq!(high.seen.load(Ordering::Relaxed), 0);
        assert_eq!(low.seen.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_start_below_min_is_an_empty_walk() {
        let queue = Arc::new(CountingQueue::default());
        let registry = FilterRegistry::new(Arc::clone(&queue) as Arc<dyn DeviceQueue>);

        let tap = Tap::new(false);
        install(&registry, "bottom", ALTITUDE_MIN, &tap);

        let outcome = registry.submit_at(ALTITUDE_MIN - 1, request());
        assert_eq!(outcome, Outcome::Queued(0));
        assert_eq!(tap.seen.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_filter_without_submit_capability_is_transparent() {
        let queue = Arc::new(CountingQueue::default());
        let registry = FilterRegistry::new(Arc::clone(&queue) as Arc<dyn DeviceQueue>);

        struct Lifecycle;
        impl BlockFilter for Lifecycle {}
        registry
            .register(Arc::new(FilterDescriptor::new(
                "lifecycle-only",
                4,
                Capabilities::lifecycle(),
                Arc::new(Lifecycle),
            )))
            .unwrap();

        let outcome = registry.submit(request());
        assert_eq!(outcome, Outcome::Queued(0));
    }

    #[test]
    fn test_default_on_submit_passes_through() {
        let queue = Arc::new(CountingQueue::default());
        let registry = FilterRegistry::new(Arc::clone(&queue) as Arc<dyn DeviceQueue>);

        // Declares SUBMIT but keeps the trait's default body.
        struct PassThrough;
        impl BlockFilter for PassThrough {}
        registry
            .register(Arc::new(FilterDescriptor::new(
                "pass",
                3,
                Capabilities::SUBMIT,
                Arc::new(PassThrough),
            )))
            .unwrap();

        assert_eq!(registry.submit(request()), Outcome::Queued(0));
        assert_eq!(queue.submissions.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_concurrent_submit_during_registration_churn() {
        let queue = Arc::new(CountingQueue::default());
        let registry = Arc::new(FilterRegistry::new(
            Arc::clone(&queue) as Arc<dyn DeviceQueue>
        ));

        let churn = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for _ in 0..500 {
                    let tap = Tap::new(true);
                    let handle = registry
                        .register(Arc::new(FilterDescriptor::new(
                            "churn",
                            3,
                            Capabilities::SUBMIT,
                            tap as Arc<dyn BlockFilter>,
                        )))
                        .unwrap();
                    registry.unregister(handle).unwrap();
                }
            })
        };

        let submitters: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for _ in 0..500 {
                        // Every submission either threads through the churn
                        // filter or falls straight through; both end queued.
                        let outcome = registry.submit(request());
                        assert!(matches!(outcome, Outcome::Queued(_)));
                    }
                })
            })
            .collect();

        churn.join().unwrap();
        for submitter in submitters {
            submitter.join().unwrap();
        }
        assert_eq!(queue.submissions.load(Ordering::Relaxed), 2000);
    }
}
