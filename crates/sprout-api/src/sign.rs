//! Request signature computation.
//!
//! Implements AWS Signature Version 4 over the request method, path,
//! sorted query string and the `host` and `x-amz-date` headers. The
//! payload is always empty because operation inputs travel in the query
//! string.

use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};

use crate::credentials::Credentials;
use crate::params::{percent_encode, Params};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SIGNED_HEADERS: &str = "host;x-amz-date";

/// Computes the `Authorization` header value for a request.
///
/// `amz_date` is the ISO 8601 basic timestamp also sent in the
/// `X-Amz-Date` header; the credential scope date is its first eight
/// characters. Returns `None` only if signature material could not be
/// assembled, which does not happen for well-formed inputs.
pub(crate) fn sign_request(
    method: &str,
    path: &str,
    params: &Params,
    host: &str,
    amz_date: &str,
    credentials: &Credentials,
    region: &str,
    service: &str,
) -> Option<String> {
    let date = amz_date.get(..8)?;
    let scope = format!("{date}/{region}/{service}/aws4_request");

    let canonical = canonical_request(method, path, params, host, amz_date);
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        hex_sha256(canonical.as_bytes())
    );

    let secret = credentials.secret_access_key().expose_secret();
    let key = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes())?;
    let key = hmac_sha256(&key, region.as_bytes())?;
    let key = hmac_sha256(&key, service.as_bytes())?;
    let key = hmac_sha256(&key, b"aws4_request")?;
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

    Some(format!(
        "{ALGORITHM} Credential={}/{scope}, SignedHeaders={SIGNED_HEADERS}, Signature={signature}",
        credentials.access_key_id()
    ))
}

/// Assembles the canonical request string.
///
/// Query pairs are percent-encoded first and then sorted bytewise, so
/// the signature is stable regardless of the order the caller pushed
/// them in.
pub(crate) fn canonical_request(
    method: &str,
    path: &str,
    params: &Params,
    host: &str,
    amz_date: &str,
) -> String {
    let canonical_uri = if path.is_empty() { "/" } else { path };

    let mut encoded: Vec<(String, String)> = params
        .pairs()
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();
    let canonical_query = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{method}\n{canonical_uri}\n{canonical_query}\nhost:{host}\nx-amz-date:{amz_date}\n\n{SIGNED_HEADERS}\n{}",
        hex_sha256(b"")
    )
}

fn hex_sha256(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Option<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key).ok()?;
    mac.update(data);
    Some(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    fn test_credentials() -> Credentials {
        Credentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY")
    }

    #[test]
    fn empty_payload_hash_is_well_known() {
        assert_eq!(hex_sha256(b""), EMPTY_SHA256);
    }

    #[test]
    fn canonical_request_sorts_encoded_pairs() {
        let mut params = Params::new();
        params.push("Operation", "DescribeEnvironments");
        params.push("EnvironmentNames.member.1", "app-env");
        let got = canonical_request(
            "GET",
            "/",
            &params,
            "elasticbeanstalk.us-east-1.amazonaws.com",
            "20141105T192736Z",
        );
        let want = format!(
            "GET\n/\nEnvironmentNames.member.1=app-env&Operation=DescribeEnvironments\n\
             host:elasticbeanstalk.us-east-1.amazonaws.com\nx-amz-date:20141105T192736Z\n\n\
             host;x-amz-date\n{EMPTY_SHA256}"
        );
        assert_eq!(got, want);
    }

    #[test]
    fn empty_path_canonicalises_to_root() {
        let params = Params::new();
        let got = canonical_request("POST", "", &params, "example.com", "20141105T192736Z");
        assert!(got.starts_with("POST\n/\n\nhost:example.com\n"));
    }

    #[test]
    fn authorization_header_shape() {
        let auth = sign_request(
            "POST",
            "/",
            &Params::new(),
            "elasticbeanstalk.us-east-1.amazonaws.com",
            "20141105T192736Z",
            &test_credentials(),
            "us-east-1",
            "elasticbeanstalk",
        )
        .unwrap();

        let prefix = "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20141105/us-east-1/elasticbeanstalk/aws4_request, \
                      SignedHeaders=host;x-amz-date, Signature=";
        assert!(auth.starts_with(prefix), "unexpected header: {auth}");

        let signature = &auth[prefix.len()..];
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn signature_is_deterministic_and_keyed() {
        let mut params = Params::new();
        params.push("Operation", "UpdateEnvironment");

        let sign = |creds: &Credentials| {
            sign_request(
                "POST",
                "/",
                &params,
                "example.com",
                "20141105T192736Z",
                creds,
                "us-east-1",
                "elasticbeanstalk",
            )
            .unwrap()
        };

        let first = sign(&test_credentials());
        let second = sign(&test_credentials());
        assert_eq!(first, second);

        let other = sign(&Credentials::new("AKIDEXAMPLE", "different-secret"));
        assert_ne!(first, other);
    }
}
