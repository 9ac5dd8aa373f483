use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::{Method, Url};

use crate::credential::CredentialSource;
use crate::signer::{SigV4Signer, SignableRequest};
use crate::{AmpErr, Result};

/// Status and body of one finished round trip.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

///
/// SignedTransport performs exactly one signed HTTP round trip per call.
/// A fresh credential snapshot is requested for every call; it lives only as long as the call.
pub struct SignedTransport {
    http: Client,
    credentials: Arc<dyn CredentialSource>,
    signer: SigV4Signer,
}

impl SignedTransport {
    pub fn new(
        credentials: Arc<dyn CredentialSource>,
        signer: SigV4Signer,
        timeout: Option<Duration>,
    ) -> Result<SignedTransport> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(SignedTransport { http: builder.build()?, credentials, signer })
    }

    /// Sign `body` as given and send it unmodified.
    pub fn execute(
        &self,
        method: Method,
        url: Url,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> Result<HttpResponse> {
        let credential = self.credentials.get()?;
        let auth_headers = self.signer.sign(
            &SignableRequest { method: method.as_str(), url: &url, headers: &headers, body: &body },
            &credential,
        )?;
        drop(credential);

        debug!("{} {} ({} bytes)", method, url, body.len());
        let mut request = self.http.request(method, url);
        for (name, value) in headers.iter().chain(auth_headers.iter()) {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request.body(body).send()?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| AmpErr::TransportErr(format!("cannot read response body: {}", e)))?;
        debug!("response status {}", status);
        Ok(HttpResponse { status, body })
    }
}

/// Append `path` to `base`, and `params` as a query string encoded the way the signer
/// canonicalizes it, so the signed and the sent query are byte-identical.
pub fn build_url(base: &str, path: &str, params: &[(&str, String)]) -> Result<Url> {
    let mut raw = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    if !params.is_empty() {
        let query: Vec<String> = params
            .iter()
            .map(|(k, v)| {
                format!("{}={}", crate::signer::uri_encode(k, true), crate::signer::uri_encode(v, true))
            })
            .collect();
        raw.push('?');
        raw.push_str(&query.join("&"));
    }
    Url::parse(&raw).map_err(|e| AmpErr::ConfigErr(format!("invalid url {}: {}", raw, e)))
}

#[cfg(test)]
mod test {
    use crate::transport::{build_url, HttpResponse};

    #[test]
    fn url_with_params() {
        let url = build_url(
            "https://example.com/workspaces/ws-1/",
            "/api/v1/query",
            &[("query", "sum by (app) (up)".to_string())],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.com/workspaces/ws-1/api/v1/query?query=sum%20by%20%28app%29%20%28up%29"
        );
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![("query".to_string(), "sum by (app) (up)".to_string())]);
    }

    #[test]
    fn url_without_params() {
        let url = build_url("http://127.0.0.1:9090", "api/v1/remote_write", &[]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9090/api/v1/remote_write");
    }

    #[test]
    fn invalid_base() {
        assert!(build_url("not a url", "api", &[]).is_err());
    }

    #[test]
    fn success_range() {
        assert!(HttpResponse { status: 204, body: String::new() }.is_success());
        assert!(!HttpResponse { status: 404, body: String::new() }.is_success());
    }
}
