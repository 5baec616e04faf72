//! Tracking source that replays a recorded session on its own thread.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info};

use crate::error::ArError;
use crate::io::pose_log::PoseLog;

use super::pose::FieldOfView;
use super::source::{TrackingSink, TrackingSource};

pub struct ReplayTrackingSource {
    log: Arc<PoseLog>,
    fov: FieldOfView,
    /// Playback speed multiplier; `0.0` replays as fast as possible.
    rate: f64,
    /// Dropping the sender wakes the worker out of its pacing wait.
    stop_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl ReplayTrackingSource {
    pub fn new(log: PoseLog, fov: FieldOfView, rate: f64) -> Self {
        Self {
            log: Arc::new(log),
            fov,
            rate: rate.max(0.0),
            stop_tx: None,
            worker: None,
        }
    }

    /// True once the worker has delivered the whole log.
    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().is_none_or(|w| w.is_finished())
    }

    fn run(log: Arc<PoseLog>, fov: FieldOfView, rate: f64, stop: Receiver<()>, sink: TrackingSink) {
        let session = sink.session();
        info!(%session, poses = log.len(), "replay started");

        if sink.field_of_view(fov).is_err() {
            return;
        }

        let mut prev_ts: Option<u64> = None;
        for entry in &log.entries {
            let wait = match prev_ts {
                Some(prev) if rate > 0.0 => {
                    Duration::from_secs_f64((entry.timestamp_ns - prev) as f64 / 1e9 / rate)
                }
                _ => Duration::ZERO,
            };
            match stop.recv_timeout(wait) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    debug!(%session, "replay stopped");
                    break;
                }
            }
            prev_ts = Some(entry.timestamp_ns);

            match sink.pose(entry.pose) {
                Err(ArError::StaleSessionUpdate(_)) => {
                    debug!(%session, "replay session superseded");
                    break;
                }
                // Invalid poses are dropped by the core, keep going
                _ => {}
            }
        }

        info!(%session, "replay finished");
    }
}

impl TrackingSource for ReplayTrackingSource {
    fn name(&self) -> &str {
        "replay"
    }

    fn start(&mut self, sink: TrackingSink) -> Result<(), ArError> {
        if self.log.is_empty() {
            return Err(ArError::PlatformUnsupported("empty pose log".to_string()));
        }
        self.stop();

        let (stop_tx, stop) = crossbeam_channel::bounded(1);
        self.stop_tx = Some(stop_tx);
        let log = Arc::clone(&self.log);
        let (fov, rate) = (self.fov, self.rate);
        self.worker = Some(thread::spawn(move || Self::run(log, fov, rate, stop, sink)));
        Ok(())
    }

    fn stop(&mut self) {
        self.stop_tx = None;
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ReplayTrackingSource {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    use parking_lot::Mutex;

    use crate::tracking::{
        DetectedPlane, InterruptionReason, PointCloud, SessionId, TrackingHandler, TrackingPose,
    };

    #[derive(Default)]
    struct Recorder {
        poses: Mutex<Vec<TrackingPose>>,
        fovs: Mutex<usize>,
    }

    impl TrackingHandler for Recorder {
        fn pose_updated(&self, _: SessionId, pose: TrackingPose) -> Result<(), ArError> {
            self.poses.lock().push(pose);
            Ok(())
        }

        fn field_of_view_updated(&self, _: SessionId, _: FieldOfView) -> Result<(), ArError> {
            *self.fovs.lock() += 1;
            Ok(())
        }

        fn planes_updated(&self, _: SessionId, _: Vec<DetectedPlane>) -> Result<(), ArError> {
            Ok(())
        }

        fn points_updated(&self, _: SessionId, _: PointCloud) -> Result<(), ArError> {
            Ok(())
        }

        fn tracking_interrupted(&self, _: SessionId, _: InterruptionReason) {}

        fn tracking_resumed(&self, _: SessionId) {}
    }

    const LOG: &str = "0,0,0,0,1,0,0,0\n1000,0,0,0,1,0.1,0,0\n2000,0,0,0,1,0.2,0,0\n";

    #[test]
    fn test_replays_whole_log() {
        let log = PoseLog::from_reader(LOG.as_bytes()).unwrap();
        let mut source = ReplayTrackingSource::new(log, FieldOfView::default(), 0.0);
        let recorder = Arc::new(Recorder::default());

        source
            .start(TrackingSink::new(SessionId::new(1), recorder.clone()))
            .unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while !source.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        source.stop();

        assert_eq!(*recorder.fovs.lock(), 1);
        let poses = recorder.poses.lock();
        assert_eq!(poses.len(), 3);
        assert_eq!(poses[2].translation.x, 0.2);
    }

    #[test]
    fn test_stop_interrupts_long_gap() {
        // Ten recorded seconds between the two poses
        let log = PoseLog::from_reader("0,0,0,0,1,0,0,0\n10000000000,0,0,0,1,1,0,0\n".as_bytes())
            .unwrap();
        let mut source = ReplayTrackingSource::new(log, FieldOfView::default(), 1.0);
        let recorder = Arc::new(Recorder::default());

        source
            .start(TrackingSink::new(SessionId::new(1), recorder.clone()))
            .unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while recorder.poses.lock().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }

        let stopping = Instant::now();
        source.stop();
        assert!(stopping.elapsed() < Duration::from_secs(1));
        assert!(source.is_finished());
        assert_eq!(recorder.poses.lock().len(), 1);
    }

    #[test]
    fn test_empty_log_refuses_to_start() {
        let mut source = ReplayTrackingSource::new(PoseLog::default(), FieldOfView::default(), 1.0);
        let recorder = Arc::new(Recorder::default());
        let err = source
            .start(TrackingSink::new(SessionId::new(1), recorder))
            .unwrap_err();
        assert!(err.is_lifecycle_failure());
    }
}
