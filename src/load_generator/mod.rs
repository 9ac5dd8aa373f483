use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use rand::Rng;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::common::label::{deserialize_label_pairs, Labels};
use crate::Result;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// A metric written with a uniformly random value in `[min, max)` on every tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulatedMetric {
    pub name: String,
    pub min: f64,
    pub max: f64,
    #[serde(default, serialize_with = "serialize_labels", deserialize_with = "deserialize_label_pairs")]
    pub labels: Vec<(String, String)>,
}

impl SimulatedMetric {
    pub fn new(name: &str, min: f64, max: f64, labels: &[(&str, &str)]) -> SimulatedMetric {
        SimulatedMetric {
            name: name.to_string(),
            min,
            max,
            labels: labels.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    pub fn labels(&self) -> Labels {
        let pairs: Vec<(&str, &str)> = self.labels.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        Labels::from_pairs(&pairs)
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        if self.max > self.min {
            rng.gen_range(self.min, self.max)
        } else {
            self.min
        }
    }
}

pub fn default_metrics() -> Vec<SimulatedMetric> {
    vec![
        SimulatedMetric::new("cpu_usage", 10.0, 90.0, &[("host", "server-1"), ("region", "us-east-1")]),
        SimulatedMetric::new("memory_usage", 1000.0, 8000.0, &[("host", "server-1"), ("region", "us-east-1")]),
        SimulatedMetric::new("http_requests_total", 0.0, 500.0, &[("app", "web-service"), ("env", "prod")]),
        SimulatedMetric::new("disk_io", 50.0, 500.0, &[("disk", "sda"), ("host", "server-1")]),
        SimulatedMetric::new("network_latency", 1.0, 100.0, &[("host", "server-1"), ("region", "us-east-1")]),
    ]
}

/// Anything a single metric sample can be written to.
pub trait MetricSink {
    fn write_metric(&self, name: &str, value: f64, labels: &Labels) -> Result<()>;
}

/// Shared stop flag; `cancel` wakes a sleeping generator immediately.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        let (lock, cvar) = &*self.inner;
        if let Ok(mut cancelled) = lock.lock() {
            *cancelled = true;
        }
        cvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        let (lock, _) = &*self.inner;
        lock.lock().map(|c| *c).unwrap_or(true)
    }

    /// Sleep up to `timeout`. Returns true when cancelled.
    /// A timeout past what `Instant` can represent waits for cancellation only.
    pub fn wait(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let deadline = Instant::now().checked_add(timeout);
        let mut cancelled = match lock.lock() {
            Ok(guard) => guard,
            Err(_) => return true,
        };
        while !*cancelled {
            let woken = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    cvar.wait_timeout(cancelled, deadline - now).map(|(guard, _)| guard).map_err(|_| ())
                }
                None => cvar.wait(cancelled).map_err(|_| ()),
            };
            cancelled = match woken {
                Ok(guard) => guard,
                Err(_) => return true,
            };
        }
        true
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoadReport {
    pub ticks: u64,
    pub written: u64,
    pub failed: u64,
}

pub struct LoadGenerator {
    metrics: Vec<SimulatedMetric>,
    interval: Duration,
    max_ticks: Option<u64>,
}

impl LoadGenerator {
    pub fn new(metrics: Vec<SimulatedMetric>, interval: Duration) -> LoadGenerator {
        LoadGenerator { metrics, interval, max_ticks: None }
    }

    pub fn max_ticks(mut self, ticks: u64) -> LoadGenerator {
        self.max_ticks = Some(ticks);
        self
    }

    /// Write every metric once per tick until cancelled, past `deadline`, or out of ticks.
    /// A failed write is logged and counted; it does not stop the loop.
    pub fn run(&self, sink: &dyn MetricSink, cancel: &CancelToken, deadline: Option<Instant>) -> LoadReport {
        let mut rng = rand::thread_rng();
        let mut report = LoadReport::default();
        loop {
            if cancel.is_cancelled() || deadline.map_or(false, |d| Instant::now() >= d) {
                break;
            }
            for metric in self.metrics.iter() {
                let value = metric.sample(&mut rng);
                match sink.write_metric(&metric.name, value, &metric.labels()) {
                    Ok(()) => {
                        debug!("wrote {}={}", metric.name, value);
                        report.written += 1;
                    }
                    Err(e) => {
                        warn!("failed to write {}: {}", metric.name, e);
                        report.failed += 1;
                    }
                }
            }
            report.ticks += 1;
            info!("wrote {} metrics, sleeping for {:?}", self.metrics.len(), self.interval);

            if self.max_ticks.map_or(false, |max| report.ticks >= max) {
                break;
            }
            let sleep = match deadline {
                Some(d) => self.interval.min(d.saturating_duration_since(Instant::now())),
                None => self.interval,
            };
            if cancel.wait(sleep) {
                break;
            }
        }
        report
    }
}

fn serialize_labels<S: Serializer>(labels: &Vec<(String, String)>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(labels.len()))?;
    for (k, v) in labels {
        map.serialize_entry(k, v)?;
    }
    map.end()
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;
    use std::thread;
    use std::time::{Duration, Instant};

    use crate::common::label::Labels;
    use crate::load_generator::*;
    use crate::{AmpErr, Result};

    #[derive(Default)]
    struct RecordingSink {
        writes: Mutex<Vec<(String, f64, Labels)>>,
        fail_on: Option<&'static str>,
    }

    impl MetricSink for RecordingSink {
        fn write_metric(&self, name: &str, value: f64, labels: &Labels) -> Result<()> {
            if self.fail_on == Some(name) {
                return Err(AmpErr::WriteErr { status: 503, body: "unavailable".to_string() });
            }
            self.writes.lock().unwrap().push((name.to_string(), value, labels.clone()));
            Ok(())
        }
    }

    #[test]
    fn values_stay_in_range() {
        let mut rng = rand::thread_rng();
        for metric in default_metrics() {
            for _ in 0..100 {
                let v = metric.sample(&mut rng);
                assert!(v >= metric.min && v < metric.max, "{} out of range: {}", metric.name, v);
            }
        }
    }

    #[test]
    fn bounded_by_ticks() {
        let sink = RecordingSink::default();
        let generator = LoadGenerator::new(default_metrics(), Duration::from_millis(1)).max_ticks(2);
        let report = generator.run(&sink, &CancelToken::new(), None);
        assert_eq!(report, LoadReport { ticks: 2, written: 10, failed: 0 });

        let writes = sink.writes.lock().unwrap();
        assert_eq!(writes[0].0, "cpu_usage");
        assert_eq!(writes[0].2, Labels::from_pairs(&[("host", "server-1"), ("region", "us-east-1")]));
    }

    #[test]
    fn failures_do_not_stop_the_loop() {
        let sink = RecordingSink { fail_on: Some("disk_io"), ..Default::default() };
        let generator = LoadGenerator::new(default_metrics(), Duration::from_millis(1)).max_ticks(3);
        let report = generator.run(&sink, &CancelToken::new(), None);
        assert_eq!(report, LoadReport { ticks: 3, written: 12, failed: 3 });
    }

    #[test]
    fn cancel_wakes_sleeping_generator() {
        let cancel = CancelToken::new();
        let remote = cancel.clone();
        let handle = thread::spawn(move || {
            let sink = RecordingSink::default();
            LoadGenerator::new(default_metrics(), Duration::from_secs(3600)).run(&sink, &remote, None)
        });
        thread::sleep(Duration::from_millis(50));
        let started = Instant::now();
        cancel.cancel();
        let report = handle.join().unwrap();
        assert_eq!(report.ticks, 1);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn stops_at_deadline() {
        let sink = RecordingSink::default();
        let deadline = Instant::now() + Duration::from_millis(30);
        let report = LoadGenerator::new(default_metrics(), Duration::from_secs(3600))
            .run(&sink, &CancelToken::new(), Some(deadline));
        assert_eq!(report.ticks, 1);
    }

    #[test]
    fn wait_beyond_instant_range() {
        let cancel = CancelToken::new();
        let remote = cancel.clone();
        let handle = thread::spawn(move || remote.wait(Duration::from_secs(u64::MAX)));
        thread::sleep(Duration::from_millis(50));
        cancel.cancel();
        assert!(handle.join().unwrap());
    }

    #[test]
    fn cancelled_before_start() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let report = LoadGenerator::new(default_metrics(), DEFAULT_INTERVAL).run(&RecordingSink::default(), &cancel, None);
        assert_eq!(report.ticks, 0);
    }
}
