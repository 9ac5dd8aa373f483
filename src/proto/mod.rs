//! Prometheus remote write proto (`prompb/remote.proto`, `prompb/types.proto`).
//! Only the fields this client produces are modelled; anything else met while decoding is skipped.
//!
//! Encoding follows protoc output: fields in tag order, proto3 default values left out,
//! so the same message always serializes to the same bytes.

use protobuf::wire_format::WireType;
use protobuf::{CodedInputStream, CodedOutputStream, UnknownFields};

use crate::{AmpErr, Result};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteRequest {
    pub timeseries: Vec<TimeSeries>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimeSeries {
    pub labels: Vec<Label>,
    pub samples: Vec<Sample>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Label {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sample {
    pub value: f64,
    pub timestamp: i64,
}

impl WriteRequest {
    pub fn write_to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        {
            let mut os = CodedOutputStream::vec(&mut buf);
            for ts in self.timeseries.iter() {
                os.write_bytes(1, &ts.write_to_bytes()?)?;
            }
            os.flush()?;
        }
        Ok(buf)
    }

    pub fn parse_from_bytes(bytes: &[u8]) -> Result<WriteRequest> {
        let mut req = WriteRequest::default();
        let mut is = CodedInputStream::from_bytes(bytes);
        while !is.eof()? {
            let (field, wire_type) = is.read_tag_unpack()?;
            match (field, wire_type) {
                (1, WireType::WireTypeLengthDelimited) => {
                    req.timeseries.push(TimeSeries::parse_from_bytes(&is.read_bytes()?)?)
                }
                _ => skip_field(field, wire_type, &mut is)?,
            }
        }
        Ok(req)
    }
}

impl TimeSeries {
    pub fn write_to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        {
            let mut os = CodedOutputStream::vec(&mut buf);
            for label in self.labels.iter() {
                os.write_bytes(1, &label.write_to_bytes()?)?;
            }
            for sample in self.samples.iter() {
                os.write_bytes(2, &sample.write_to_bytes()?)?;
            }
            os.flush()?;
        }
        Ok(buf)
    }

    pub fn parse_from_bytes(bytes: &[u8]) -> Result<TimeSeries> {
        let mut ts = TimeSeries::default();
        let mut is = CodedInputStream::from_bytes(bytes);
        while !is.eof()? {
            let (field, wire_type) = is.read_tag_unpack()?;
            match (field, wire_type) {
                (1, WireType::WireTypeLengthDelimited) => {
                    ts.labels.push(Label::parse_from_bytes(&is.read_bytes()?)?)
                }
                (2, WireType::WireTypeLengthDelimited) => {
                    ts.samples.push(Sample::parse_from_bytes(&is.read_bytes()?)?)
                }
                _ => skip_field(field, wire_type, &mut is)?,
            }
        }
        Ok(ts)
    }
}

impl Label {
    pub fn write_to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        {
            let mut os = CodedOutputStream::vec(&mut buf);
            if !self.name.is_empty() {
                os.write_string(1, &self.name)?;
            }
            if !self.value.is_empty() {
                os.write_string(2, &self.value)?;
            }
            os.flush()?;
        }
        Ok(buf)
    }

    pub fn parse_from_bytes(bytes: &[u8]) -> Result<Label> {
        let mut label = Label::default();
        let mut is = CodedInputStream::from_bytes(bytes);
        while !is.eof()? {
            let (field, wire_type) = is.read_tag_unpack()?;
            match (field, wire_type) {
                (1, WireType::WireTypeLengthDelimited) => label.name = is.read_string()?,
                (2, WireType::WireTypeLengthDelimited) => label.value = is.read_string()?,
                _ => skip_field(field, wire_type, &mut is)?,
            }
        }
        Ok(label)
    }
}

impl Sample {
    pub fn write_to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        {
            let mut os = CodedOutputStream::vec(&mut buf);
            // -0.0 is not the default value, compare bits
            if self.value.to_bits() != 0 {
                os.write_double(1, self.value)?;
            }
            if self.timestamp != 0 {
                os.write_int64(2, self.timestamp)?;
            }
            os.flush()?;
        }
        Ok(buf)
    }

    pub fn parse_from_bytes(bytes: &[u8]) -> Result<Sample> {
        let mut sample = Sample::default();
        let mut is = CodedInputStream::from_bytes(bytes);
        while !is.eof()? {
            let (field, wire_type) = is.read_tag_unpack()?;
            match (field, wire_type) {
                (1, WireType::WireTypeFixed64) => sample.value = is.read_double()?,
                (2, WireType::WireTypeVarint) => sample.timestamp = is.read_int64()?,
                _ => skip_field(field, wire_type, &mut is)?,
            }
        }
        Ok(sample)
    }
}

fn skip_field(field: u32, wire_type: WireType, is: &mut CodedInputStream) -> Result<()> {
    if field == 0 {
        return Err(AmpErr::DecodeErr("invalid field number 0".to_string()));
    }
    let mut unknown = UnknownFields::new();
    protobuf::rt::read_unknown_or_skip_group(field, wire_type, is, &mut unknown)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use crate::proto::{Label, Sample, TimeSeries, WriteRequest};

    fn request() -> WriteRequest {
        WriteRequest {
            timeseries: vec![TimeSeries {
                labels: vec![
                    Label { name: "__name__".to_string(), value: "up".to_string() },
                    Label { name: "job".to_string(), value: "node".to_string() },
                ],
                samples: vec![Sample { value: 1.0, timestamp: 1_700_000_000_000 }],
            }],
        }
    }

    #[test]
    fn label_wire_bytes() {
        let label = Label { name: "a".to_string(), value: "b".to_string() };
        assert_eq!(label.write_to_bytes().unwrap(), vec![0x0a, 0x01, b'a', 0x12, 0x01, b'b']);
    }

    #[test]
    fn sample_wire_bytes() {
        let sample = Sample { value: 1.0, timestamp: 1 };
        let mut expected = vec![0x09];
        expected.extend_from_slice(&1.0f64.to_le_bytes());
        expected.extend_from_slice(&[0x10, 0x01]);
        assert_eq!(sample.write_to_bytes().unwrap(), expected);
    }

    #[test]
    fn default_values_are_omitted() {
        assert!(Sample::default().write_to_bytes().unwrap().is_empty());
        assert!(Label::default().write_to_bytes().unwrap().is_empty());
    }

    #[test]
    fn decode_encoded_request() {
        let req = request();
        let bytes = req.write_to_bytes().unwrap();
        assert_eq!(WriteRequest::parse_from_bytes(&bytes).unwrap(), req);
    }

    #[test]
    fn unknown_fields_are_skipped() {
        let mut bytes = request().write_to_bytes().unwrap();
        // metadata (field 3) carrying a single varint field
        bytes.extend_from_slice(&[0x1a, 0x02, 0x08, 0x01]);
        let decoded = WriteRequest::parse_from_bytes(&bytes).unwrap();
        assert_eq!(decoded, request());
    }

    #[test]
    fn truncated_input_fails() {
        let bytes = request().write_to_bytes().unwrap();
        assert!(WriteRequest::parse_from_bytes(&bytes[..bytes.len() - 3]).is_err());
    }
}
