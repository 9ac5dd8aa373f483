//! AWS Signature Version 4 request signing.
//!
//! The signature covers the method, the canonical path and query, the signed headers and
//! the SHA-256 of the body exactly as it goes on the wire, so sign after compression.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Url;
use sha2::{Digest, Sha256};

use crate::credential::Credential;
use crate::{AmpErr, Result};

pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";
pub const DEFAULT_SERVICE: &str = "aps";

const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const SCOPE_DATE_FORMAT: &str = "%Y%m%d";

type HmacSha256 = Hmac<Sha256>;

/// Everything the signature is computed over.
pub struct SignableRequest<'a> {
    pub method: &'a str,
    pub url: &'a Url,
    pub headers: &'a [(String, String)],
    pub body: &'a [u8],
}

#[derive(Clone, Debug)]
pub struct SigV4Signer {
    region: String,
    service: String,
    sign_content_sha256: bool,
}

impl SigV4Signer {
    pub fn new(region: &str, service: &str) -> SigV4Signer {
        SigV4Signer {
            region: region.to_string(),
            service: service.to_string(),
            sign_content_sha256: true,
        }
    }

    /// Whether to send and sign `x-amz-content-sha256`. On by default.
    pub fn sign_content_sha256(mut self, enabled: bool) -> SigV4Signer {
        self.sign_content_sha256 = enabled;
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn sign(&self, request: &SignableRequest, credential: &Credential) -> Result<Vec<(String, String)>> {
        self.sign_at(request, credential, Utc::now())
    }

    /// Headers to attach to `request`, with `now` as the signing time.
    pub fn sign_at(
        &self,
        request: &SignableRequest,
        credential: &Credential,
        now: DateTime<Utc>,
    ) -> Result<Vec<(String, String)>> {
        self.check(credential, now)?;

        let amz_date = now.format(AMZ_DATE_FORMAT).to_string();
        let scope = format!(
            "{}/{}/{}/aws4_request",
            now.format(SCOPE_DATE_FORMAT),
            self.region,
            self.service
        );
        let payload_hash = hex::encode(Sha256::digest(request.body));

        let mut extra = vec![("X-Amz-Date".to_string(), amz_date.clone())];
        if self.sign_content_sha256 {
            extra.push(("X-Amz-Content-Sha256".to_string(), payload_hash.clone()));
        }
        if let Some(token) = credential.session_token() {
            extra.push(("X-Amz-Security-Token".to_string(), token.to_string()));
        }

        let host = host_header(request.url)?;
        let mut signed: Vec<(String, String)> = request
            .headers
            .iter()
            .chain(extra.iter())
            .map(|(k, v)| (k.to_lowercase(), normalize_header_value(v)))
            .filter(|(k, _)| k != "host" && k != "authorization")
            .collect();
        signed.push(("host".to_string(), host));
        signed.sort();
        signed.dedup_by(|a, b| a.0 == b.0);

        let signed_headers = signed.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>().join(";");
        let canonical_headers: String =
            signed.iter().map(|(k, v)| format!("{}:{}\n", k, v)).collect();

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            request.method.to_uppercase(),
            canonical_uri(request.url),
            canonical_query(request.url),
            canonical_headers,
            signed_headers,
            payload_hash
        );
        trace!("canonical request:\n{}", canonical_request);

        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            amz_date,
            scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let signing_key = self.signing_key(credential.secret_key(), now)?;
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes())?);

        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM,
            credential.access_key(),
            scope,
            signed_headers,
            signature
        );

        let mut headers = vec![("Authorization".to_string(), authorization)];
        headers.extend(extra);
        Ok(headers)
    }

    fn check(&self, credential: &Credential, now: DateTime<Utc>) -> Result<()> {
        if credential.access_key().is_empty() || credential.secret_key().is_empty() {
            return Err(AmpErr::SigningErr("empty access key or secret key".to_string()));
        }
        if credential.is_expired_at(now) {
            return Err(AmpErr::SigningErr("credential expired".to_string()));
        }
        if self.region.is_empty() || self.service.is_empty() {
            return Err(AmpErr::SigningErr("region and service are required".to_string()));
        }
        Ok(())
    }

    fn signing_key(&self, secret_key: &str, now: DateTime<Utc>) -> Result<Vec<u8>> {
        let k_date = hmac_sha256(
            format!("AWS4{}", secret_key).as_bytes(),
            now.format(SCOPE_DATE_FORMAT).to_string().as_bytes(),
        )?;
        let k_region = hmac_sha256(&k_date, self.region.as_bytes())?;
        let k_service = hmac_sha256(&k_region, self.service.as_bytes())?;
        hmac_sha256(&k_service, b"aws4_request")
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| AmpErr::SigningErr(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn host_header(url: &Url) -> Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| AmpErr::SigningErr(format!("url {} has no host", url)))?;
    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

fn normalize_header_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn canonical_uri(url: &Url) -> String {
    let path = url.path();
    if path.is_empty() {
        "/".to_string()
    } else {
        uri_encode(path, false)
    }
}

fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (uri_encode(&k, true), uri_encode(&v, true)))
        .collect();
    pairs.sort();
    pairs.iter().map(|(k, v)| format!("{}={}", k, v)).collect::<Vec<_>>().join("&")
}

/// Percent-encode every byte outside `A-Z a-z 0-9 - _ . ~`; `/` is kept unless `encode_slash`.
pub fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut res = String::with_capacity(input.len());
    for b in input.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => res.push(b as char),
            b'/' if !encode_slash => res.push('/'),
            _ => res.push_str(&format!("%{:02X}", b)),
        }
    }
    res
}
