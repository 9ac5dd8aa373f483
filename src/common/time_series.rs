use crate::common::label::{Label, Labels};
use crate::common::time_point::{TimePoint, Timestamp, Value};
use crate::proto::Sample;
use crate::{AmpErr, Result};

/// Series submitted together in one remote write message.
/// Built per write call and dropped once sent.
pub type WriteBatch = Vec<TimeSeries>;

#[derive(Clone, Debug, PartialEq)]
pub struct TimeSeries {
    time_points: Vec<TimePoint>,
    meta_data: Labels,
}

impl TimeSeries {
    pub fn new(meta_data: Labels) -> Self {
        TimeSeries { time_points: Vec::new(), meta_data }
    }

    /// One series holding a single sample of `name`, as written by a metric write call.
    pub fn single(name: &str, labels: &Labels, timestamp: Timestamp, value: Value) -> Self {
        TimeSeries {
            time_points: vec![TimePoint::new(timestamp, value)],
            meta_data: Labels::with_metric_name(name, labels),
        }
    }

    pub fn meta_data(&self) -> &Labels {
        &self.meta_data
    }

    pub fn add(&mut self, timestamp: Timestamp, value: Value) {
        self.time_points.push(TimePoint::new(timestamp, value))
    }

    pub fn time_points(&self) -> &Vec<TimePoint> {
        &self.time_points
    }

    /// A series must carry a non-empty `__name__` first, unique label names and at least one sample.
    pub fn validate(&self) -> Result<()> {
        match self.meta_data.vec().first() {
            Some(first) if first.key() == crate::METRIC_NAME_LABEL => {
                if first.value().is_empty() {
                    return Err(AmpErr::EncodingErr("empty metric name".to_string()));
                }
            }
            _ => {
                return Err(AmpErr::EncodingErr(format!(
                    "first label must be {}",
                    crate::METRIC_NAME_LABEL
                )))
            }
        }
        self.meta_data.validate()?;
        if self.time_points.is_empty() {
            return Err(AmpErr::EncodingErr("series without samples".to_string()));
        }
        Ok(())
    }
}

impl From<&TimeSeries> for crate::proto::TimeSeries {
    fn from(t: &TimeSeries) -> Self {
        crate::proto::TimeSeries {
            labels: t.meta_data.vec().iter().map(crate::proto::Label::from).collect(),
            samples: t.time_points.iter().map(Sample::from).collect(),
        }
    }
}

impl From<&crate::proto::TimeSeries> for TimeSeries {
    fn from(t: &crate::proto::TimeSeries) -> Self {
        TimeSeries {
            time_points: t.samples.iter().map(TimePoint::from).collect(),
            meta_data: Labels::from_vec(t.labels.iter().map(<Label as From<&crate::proto::Label>>::from).collect()),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::common::label::{Label, Labels};
    use crate::common::time_series::TimeSeries;

    #[test]
    fn create_single_series() {
        let labels = Labels::from_pairs(&[("host", "server-1")]);
        let series = TimeSeries::single("cpu_usage", &labels, 1_700_000_000_000, 42.5);
        assert_eq!(series.meta_data().len(), 2);
        assert_eq!(series.time_points().len(), 1);
        assert_eq!(series.time_points()[0].timestamp, 1_700_000_000_000);
        assert!(series.validate().is_ok());
    }

    #[test]
    fn series_without_name_is_invalid() {
        let mut labels = Labels::new();
        labels.add(Label::from("host", "server-1"));
        let mut series = TimeSeries::new(labels);
        series.add(1, 1.0);
        assert!(series.validate().is_err());
    }

    #[test]
    fn series_without_samples_is_invalid() {
        let series = TimeSeries::new(Labels::with_metric_name("cpu", &Labels::new()));
        assert!(series.validate().is_err());
    }

    #[test]
    fn empty_metric_name_is_invalid() {
        let series = TimeSeries::single("", &Labels::new(), 1, 1.0);
        assert!(series.validate().is_err());
    }

    #[test]
    fn from_proto_series() {
        let proto = crate::proto::TimeSeries {
            labels: vec![
                crate::proto::Label { name: "__name__".to_string(), value: "up".to_string() },
                crate::proto::Label { name: "job".to_string(), value: "node".to_string() },
            ],
            samples: vec![crate::proto::Sample { value: 1.5, timestamp: 42 }],
        };
        let series = TimeSeries::from(&proto);
        assert_eq!(series.meta_data(), &Labels::from_pairs(&[("__name__", "up"), ("job", "node")]));
        assert_eq!(series.time_points()[0].timestamp, 42);
        assert_eq!(series.time_points()[0].value, 1.5);
        assert_eq!(crate::proto::TimeSeries::from(&series), proto);
    }
}
