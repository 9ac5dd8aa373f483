use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::common::label::{deserialize_label_pairs, Label, Labels};
use crate::{AmpErr, Result};

pub const STATUS_SUCCESS: &str = "success";

/// Unix seconds as returned by the query api, possibly fractional.
pub type EvalTime = f64;

#[derive(Clone, Debug, PartialEq)]
pub struct VectorSample {
    pub labels: Labels,
    pub timestamp: EvalTime,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatrixSeries {
    pub labels: Labels,
    /// In the order the backend returned them.
    pub values: Vec<(EvalTime, f64)>,
}

/// Decoded result of a successful query. Failures travel as `AmpErr`.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryResult {
    Vector(Vec<VectorSample>),
    Matrix(Vec<MatrixSeries>),
}

impl QueryResult {
    pub fn len(&self) -> usize {
        match self {
            QueryResult::Vector(v) => v.len(),
            QueryResult::Matrix(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: String,
    data: Option<T>,
    #[serde(rename = "errorType")]
    error_type: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(rename = "resultType")]
    result_type: Option<String>,
    result: Option<JsonValue>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawVectorSample {
    #[serde(default, deserialize_with = "deserialize_label_pairs")]
    metric: Vec<(String, String)>,
    value: (EvalTime, String),
}

#[derive(Debug, Deserialize)]
struct RawMatrixSeries {
    #[serde(default, deserialize_with = "deserialize_label_pairs")]
    metric: Vec<(String, String)>,
    values: Vec<(EvalTime, String)>,
}

/// Decode a `/api/v1/query` or `/api/v1/query_range` body.
pub fn decode_query_response(body: &str) -> Result<QueryResult> {
    let envelope: Envelope<QueryData> = serde_json::from_str(body)?;
    if envelope.status != STATUS_SUCCESS {
        let data_error = envelope.data.and_then(|d| d.error);
        return Err(rejection(envelope.error_type, envelope.error.or(data_error)));
    }
    let data = envelope
        .data
        .ok_or_else(|| AmpErr::DecodeErr("success response without data".to_string()))?;
    let result_type = data
        .result_type
        .ok_or_else(|| AmpErr::DecodeErr("missing resultType".to_string()))?;
    let result = data.result.unwrap_or(JsonValue::Array(vec![]));

    match result_type.as_str() {
        "vector" => {
            let raw: Vec<RawVectorSample> = serde_json::from_value(result)?;
            let mut samples = Vec::with_capacity(raw.len());
            for s in raw {
                samples.push(VectorSample {
                    labels: to_labels(s.metric),
                    timestamp: s.value.0,
                    value: parse_sample_value(&s.value.1)?,
                });
            }
            Ok(QueryResult::Vector(samples))
        }
        "matrix" => {
            let raw: Vec<RawMatrixSeries> = serde_json::from_value(result)?;
            let mut series = Vec::with_capacity(raw.len());
            for s in raw {
                let mut values = Vec::with_capacity(s.values.len());
                for (t, v) in s.values.iter() {
                    values.push((*t, parse_sample_value(v)?));
                }
                series.push(MatrixSeries { labels: to_labels(s.metric), values });
            }
            Ok(QueryResult::Matrix(series))
        }
        other => Err(AmpErr::DecodeErr(format!("unsupported result type {}", other))),
    }
}

/// Decode a `/api/v1/label/<name>/values` body.
pub fn decode_label_values(body: &str) -> Result<Vec<String>> {
    let envelope: Envelope<Vec<String>> = serde_json::from_str(body)?;
    if envelope.status != STATUS_SUCCESS {
        return Err(rejection(envelope.error_type, envelope.error));
    }
    Ok(envelope.data.unwrap_or_default())
}

fn rejection(error_type: Option<String>, error: Option<String>) -> AmpErr {
    AmpErr::QueryRejected {
        error_type: error_type.unwrap_or_else(|| "unknown".to_string()),
        message: error.unwrap_or_else(|| "no error message".to_string()),
    }
}

fn to_labels(metric: Vec<(String, String)>) -> Labels {
    Labels::from_vec(metric.into_iter().map(|(k, v)| Label::new(k, v)).collect())
}

// Go's strconv formatting: "NaN", "+Inf", "-Inf" or a plain float.
fn parse_sample_value(raw: &str) -> Result<f64> {
    raw.parse::<f64>()
        .map_err(|e| AmpErr::DecodeErr(format!("invalid sample value {:?}: {}", raw, e)))
}

#[cfg(test)]
mod test {
    use crate::common::label::Labels;
    use crate::query::response::*;
    use crate::AmpErr;

    #[test]
    fn decode_vector() {
        let body = r#"{"status":"success","data":{"resultType":"vector","result":[{"metric":{"app":"x"},"value":[1700000000,"42"]}]}}"#;
        match decode_query_response(body).unwrap() {
            QueryResult::Vector(samples) => {
                assert_eq!(samples.len(), 1);
                assert_eq!(samples[0].labels, Labels::from_pairs(&[("app", "x")]));
                assert_eq!(samples[0].value, 42.0);
                assert_eq!(samples[0].timestamp, 1700000000.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn labels_keep_response_order() {
        let body = r#"{"status":"success","data":{"resultType":"vector","result":[{"metric":{"__name__":"up","Zone":"a","app":"x"},"value":[1,"1"]}]}}"#;
        match decode_query_response(body).unwrap() {
            QueryResult::Vector(samples) => assert_eq!(
                samples[0].labels,
                Labels::from_pairs(&[("__name__", "up"), ("Zone", "a"), ("app", "x")])
            ),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn decode_matrix_keeps_order() {
        let body = r#"{"status":"success","data":{"resultType":"matrix","result":[{"metric":{"app":"x"},"values":[[1,"1"],[2,"2"]]}]}}"#;
        match decode_query_response(body).unwrap() {
            QueryResult::Matrix(series) => {
                assert_eq!(series.len(), 1);
                assert_eq!(series[0].labels.get("app").unwrap(), "x");
                assert_eq!(series[0].values, vec![(1.0, 1.0), (2.0, 2.0)]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn matrix_is_not_resorted() {
        let body = r#"{"status":"success","data":{"resultType":"matrix","result":[{"metric":{},"values":[[5,"1"],[2,"2"]]}]}}"#;
        match decode_query_response(body).unwrap() {
            QueryResult::Matrix(series) => assert_eq!(series[0].values, vec![(5.0, 1.0), (2.0, 2.0)]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn decode_error_envelope() {
        let body = r#"{"status":"error","errorType":"bad_data","error":"invalid query"}"#;
        match decode_query_response(body) {
            Err(AmpErr::QueryRejected { error_type, message }) => {
                assert_eq!(error_type, "bad_data");
                assert_eq!(message, "invalid query");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn special_float_values() {
        let body = r#"{"status":"success","data":{"resultType":"vector","result":[
            {"metric":{"a":"1"},"value":[1.5,"NaN"]},
            {"metric":{"a":"2"},"value":[1.5,"+Inf"]},
            {"metric":{"a":"3"},"value":[1.5,"-Inf"]}]}}"#;
        match decode_query_response(body).unwrap() {
            QueryResult::Vector(samples) => {
                assert!(samples[0].value.is_nan());
                assert_eq!(samples[1].value, f64::INFINITY);
                assert_eq!(samples[2].value, f64::NEG_INFINITY);
                assert_eq!(samples[0].timestamp, 1.5);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn empty_result() {
        let body = r#"{"status":"success","data":{"resultType":"vector","result":[]}}"#;
        assert!(decode_query_response(body).unwrap().is_empty());
    }

    #[test]
    fn unsupported_result_type() {
        let body = r#"{"status":"success","data":{"resultType":"scalar","result":[1,"1"]}}"#;
        assert!(decode_query_response(body).is_err());
    }

    #[test]
    fn malformed_body() {
        match decode_query_response("<html>gateway timeout</html>") {
            Err(AmpErr::DecodeErr(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn label_values() {
        let body = r#"{"status":"success","data":["cpu_usage","up"]}"#;
        assert_eq!(decode_label_values(body).unwrap(), vec!["cpu_usage", "up"]);
    }

    #[test]
    fn label_values_error() {
        let body = r#"{"status":"error","errorType":"internal","error":"boom"}"#;
        assert!(decode_label_values(body).unwrap_err().is_rejection());
    }
}
