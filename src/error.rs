use failure::Fail;

#[derive(Debug, Fail)]
pub enum AmpErr {
    #[fail(display = "no usable credentials: {}", _0)]
    CredentialUnavailable(String),

    #[fail(display = "cannot sign request: {}", _0)]
    SigningErr(String),

    #[fail(display = "invalid time series: {}", _0)]
    EncodingErr(String),

    #[fail(display = "cannot reach backend: {}", _0)]
    TransportErr(String),

    #[fail(display = "remote write failed with status {}: {}", status, body)]
    WriteErr { status: u16, body: String },

    #[fail(display = "query failed with status {}: {}", status, body)]
    QueryErr { status: u16, body: String },

    #[fail(display = "query rejected ({}): {}", error_type, message)]
    QueryRejected { error_type: String, message: String },

    #[fail(display = "cannot decode response: {}", _0)]
    DecodeErr(String),

    #[fail(display = "invalid config: {}", _0)]
    ConfigErr(String),

    #[fail(display = "invalid argument: {}", _0)]
    OptionErr(String),

    #[fail(display = "{}", _0)]
    IoErr(std::io::Error),
}

pub type Result<T> = std::result::Result<T, AmpErr>;

impl AmpErr {
    /// The backend could not be reached, or the round trip broke half way.
    pub fn is_transport(&self) -> bool {
        match self {
            AmpErr::TransportErr(_) => true,
            _ => false,
        }
    }

    /// The backend answered, but refused the request.
    pub fn is_rejection(&self) -> bool {
        match self {
            AmpErr::WriteErr { .. } | AmpErr::QueryErr { .. } | AmpErr::QueryRejected { .. } => true,
            _ => false,
        }
    }

    /// The request never left the process because local input was bad.
    pub fn is_local_input(&self) -> bool {
        match self {
            AmpErr::EncodingErr(_)
            | AmpErr::SigningErr(_)
            | AmpErr::CredentialUnavailable(_)
            | AmpErr::ConfigErr(_)
            | AmpErr::OptionErr(_) => true,
            _ => false,
        }
    }
}

impl From<std::io::Error> for AmpErr {
    fn from(e: std::io::Error) -> Self {
        AmpErr::IoErr(e)
    }
}

impl From<serde_json::Error> for AmpErr {
    fn from(e: serde_json::Error) -> Self {
        AmpErr::DecodeErr(e.to_string())
    }
}

impl From<serde_yaml::Error> for AmpErr {
    fn from(e: serde_yaml::Error) -> Self {
        AmpErr::ConfigErr(e.to_string())
    }
}

impl From<protobuf::ProtobufError> for AmpErr {
    fn from(e: protobuf::ProtobufError) -> Self {
        AmpErr::DecodeErr(e.to_string())
    }
}

impl From<snap::Error> for AmpErr {
    fn from(e: snap::Error) -> Self {
        AmpErr::DecodeErr(e.to_string())
    }
}

impl From<reqwest::Error> for AmpErr {
    fn from(e: reqwest::Error) -> Self {
        AmpErr::TransportErr(e.to_string())
    }
}

impl From<chrono::ParseError> for AmpErr {
    fn from(e: chrono::ParseError) -> Self {
        AmpErr::OptionErr(e.to_string())
    }
}

impl From<std::num::ParseFloatError> for AmpErr {
    fn from(e: std::num::ParseFloatError) -> Self {
        AmpErr::OptionErr(e.to_string())
    }
}

impl From<std::num::ParseIntError> for AmpErr {
    fn from(e: std::num::ParseIntError) -> Self {
        AmpErr::OptionErr(e.to_string())
    }
}

#[cfg(test)]
mod test {
    use crate::AmpErr;

    #[test]
    fn classify_errors() {
        let write = AmpErr::WriteErr { status: 403, body: "denied".to_string() };
        assert!(write.is_rejection());
        assert!(!write.is_transport());
        assert!(!write.is_local_input());

        let transport = AmpErr::TransportErr("connection refused".to_string());
        assert!(transport.is_transport());
        assert!(!transport.is_rejection());

        let encoding = AmpErr::EncodingErr("duplicate label".to_string());
        assert!(encoding.is_local_input());
        assert!(!encoding.is_rejection());
    }

    #[test]
    fn display_write_err() {
        let err = AmpErr::WriteErr { status: 500, body: "boom".to_string() };
        assert_eq!(format!("{}", err), "remote write failed with status 500: boom");
    }
}
