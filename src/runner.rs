//! Background synthesis runs tagged by generation
//!
//! Every [`SynthesisRunner::request`] starts a new generation. Only the
//! result of the latest generation is ever handed back; results of
//! superseded runs are discarded when they arrive.

use crate::{
    api::LensApi,
    catalog::Catalog,
    lens::{Aperture, LensId, Region},
    series::{fetch_all, DisplayWindow, Palette, Synthesis},
};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

/// Parameters of a synthesis, captured when the run is requested
#[derive(Debug, Clone, Default)]
pub struct SynthesisParams {
    pub selection: Vec<LensId>,
    pub region: Region,
    pub aperture: Aperture,
    pub window: DisplayWindow,
}

type Message = (u64, Option<Synthesis>);

pub struct SynthesisRunner<A> {
    api: Arc<A>,
    palette: Palette,
    generation: Arc<AtomicU64>,
    /// the latest generation already handed back
    delivered: AtomicU64,
    tx: Sender<Message>,
    rx: Receiver<Message>,
}
impl<A: LensApi + 'static> SynthesisRunner<A> {
    pub fn new(api: Arc<A>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            api,
            palette: Palette::default(),
            generation: Arc::new(AtomicU64::new(0)),
            delivered: AtomicU64::new(0),
            tx,
            rx,
        }
    }
    pub fn palette(self, palette: Palette) -> Self {
        Self { palette, ..self }
    }
    /// The latest requested generation, 0 before any request
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
    /// Starts a synthesis in the background, superseding any run in flight
    pub fn request(&self, catalog: Arc<Catalog>, params: SynthesisParams) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        log::debug!("synthesis #{} requested: {:?}", generation, params);
        let api = Arc::clone(&self.api);
        let latest = Arc::clone(&self.generation);
        let palette = self.palette;
        let tx = self.tx.clone();
        thread::spawn(move || {
            let SynthesisParams {
                selection,
                region,
                aperture,
                window,
            } = params;
            let fetched = fetch_all(&selection, |lens_id| {
                api.samples(lens_id, region, aperture)
            });
            let synthesis = if latest.load(Ordering::SeqCst) == generation {
                Some(fetched.into_synthesis(&selection, &catalog, &window, &palette))
            } else {
                log::debug!("synthesis #{} superseded before completion", generation);
                None
            };
            // the receiver lives as long as the runner
            let _ = tx.send((generation, synthesis));
        });
        generation
    }
    /// Returns the result of the latest generation if it has arrived
    pub fn poll(&self) -> Option<Synthesis> {
        let mut latest = None;
        for (generation, synthesis) in self.rx.try_iter() {
            if let Some(synthesis) = self.accept(generation, synthesis) {
                latest = Some(synthesis);
            }
        }
        latest
    }
    /// Blocks until the result of the latest generation arrives
    ///
    /// Returns `None` right away if nothing was requested or if the latest
    /// result was already handed back by [`poll`](Self::poll).
    pub fn wait(&self) -> Option<Synthesis> {
        if self.settled() {
            return None;
        }
        while let Ok((generation, synthesis)) = self.rx.recv() {
            if let Some(synthesis) = self.accept(generation, synthesis) {
                return Some(synthesis);
            }
        }
        None
    }
    /// Same as [`wait`](Self::wait) but gives up after `timeout`
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Synthesis> {
        if self.settled() {
            return None;
        }
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok((generation, synthesis)) => {
                    if let Some(synthesis) = self.accept(generation, synthesis) {
                        return Some(synthesis);
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return None
                }
            }
        }
    }
    fn settled(&self) -> bool {
        self.delivered.load(Ordering::SeqCst) == self.generation()
    }
    fn accept(&self, generation: u64, synthesis: Option<Synthesis>) -> Option<Synthesis> {
        if generation == self.generation() {
            if synthesis.is_some() {
                self.delivered.store(generation, Ordering::SeqCst);
            }
            synthesis
        } else {
            log::debug!(
                "discarding stale synthesis #{} (latest: #{})",
                generation,
                self.generation()
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::{ApiError, PreCheck, Submission},
        lens::{Lens, Sample},
    };
    use std::sync::atomic::AtomicUsize;

    /// Lens 1 answers slowly the first time it is asked for
    struct SlowFirst {
        calls: AtomicUsize,
    }
    impl LensApi for SlowFirst {
        fn lenses(&self) -> Result<Vec<Lens>, ApiError> {
            Ok(vec![])
        }
        fn samples(
            &self,
            lens_id: LensId,
            _region: Region,
            _aperture: Aperture,
        ) -> Result<Vec<Sample>, ApiError> {
            if lens_id == 1 && self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                thread::sleep(Duration::from_millis(300));
            }
            Ok(vec![Sample::new(12. * lens_id as f64, 2000.)])
        }
        fn pre_check(&self, _: LensId) -> Result<PreCheck, ApiError> {
            Ok(PreCheck::NotFound)
        }
        fn submit(&self, _: LensId, _: &Submission) -> Result<(), ApiError> {
            Ok(())
        }
    }
    fn params(selection: Vec<LensId>) -> SynthesisParams {
        SynthesisParams {
            selection,
            ..Default::default()
        }
    }

    #[test]
    fn nothing_requested() {
        let runner = SynthesisRunner::new(Arc::new(SlowFirst {
            calls: AtomicUsize::new(0),
        }));
        assert_eq!(runner.generation(), 0);
        assert!(runner.poll().is_none());
        assert!(runner.wait().is_none());
    }

    #[test]
    fn stale_result_is_discarded() {
        let runner = SynthesisRunner::new(Arc::new(SlowFirst {
            calls: AtomicUsize::new(0),
        }));
        let catalog = Arc::new(Catalog::default());
        let first = runner.request(Arc::clone(&catalog), params(vec![1]));
        let second = runner.request(Arc::clone(&catalog), params(vec![1, 2]));
        assert!(second > first);
        let synthesis = runner.wait_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(synthesis.measured().count(), 2);
        // the slow first run settles later and must not surface
        thread::sleep(Duration::from_millis(500));
        assert!(runner.poll().is_none());
    }

    #[test]
    fn latest_result_is_polled() {
        let runner = SynthesisRunner::new(Arc::new(SlowFirst {
            calls: AtomicUsize::new(1),
        }));
        runner.request(Arc::new(Catalog::default()), params(vec![2]));
        let synthesis = runner.wait_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(synthesis.series.len(), 1);
        assert_eq!(synthesis.series[0].label, "#2");
    }

    #[test]
    fn wait_after_poll_returns() {
        let runner = SynthesisRunner::new(Arc::new(SlowFirst {
            calls: AtomicUsize::new(1),
        }));
        runner.request(Arc::new(Catalog::default()), params(vec![2]));
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut polled = None;
        while polled.is_none() && Instant::now() < deadline {
            polled = runner.poll();
            thread::sleep(Duration::from_millis(10));
        }
        assert!(polled.is_some());
        assert!(runner.wait_timeout(Duration::from_secs(1)).is_none());
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(runner.wait().is_none());
        });
        assert_eq!(rx.recv_timeout(Duration::from_secs(3)), Ok(true));
    }

    #[test]
    fn each_settled_request_is_polled() {
        let runner = SynthesisRunner::new(Arc::new(SlowFirst {
            calls: AtomicUsize::new(1),
        }));
        let catalog = Arc::new(Catalog::default());
        let poll_until = |runner: &SynthesisRunner<SlowFirst>| {
            let deadline = Instant::now() + Duration::from_secs(5);
            loop {
                if let Some(synthesis) = runner.poll() {
                    return Some(synthesis);
                }
                if Instant::now() > deadline {
                    return None;
                }
                thread::sleep(Duration::from_millis(10));
            }
        };
        runner.request(Arc::clone(&catalog), params(vec![2]));
        let first = poll_until(&runner).unwrap();
        assert_eq!(first.measured().count(), 1);
        runner.request(Arc::clone(&catalog), params(vec![2, 3]));
        let second = poll_until(&runner).unwrap();
        assert_eq!(second.measured().count(), 2);
        assert!(runner.poll().is_none());
    }
}
