pub mod label;
pub mod option;
pub mod time_point;
pub mod time_series;
pub mod utils;

pub use label::{Label, Labels, METRIC_NAME_LABEL};
pub use time_point::{TimePoint, Timestamp, Value};
pub use time_series::{TimeSeries, WriteBatch};
