// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::Result;
use crate::errors::Error;
use crate::signer::Signer;
use base64::prelude::{BASE64_URL_SAFE_NO_PAD, Engine as _};
use serde::Serialize;
use serde_json::{Map, Value};

/// The header that describes how the assertion was signed.
#[derive(Serialize, Debug)]
pub(crate) struct JwsHeader<'a> {
    pub alg: &'a str,
    pub typ: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<&'a str>,
}

impl JwsHeader<'_> {
    pub fn encode(&self) -> Result<String> {
        let json = serde_json::to_string(&self).map_err(Error::signing)?;
        Ok(BASE64_URL_SAFE_NO_PAD.encode(json.as_bytes()))
    }
}

/// The caller's claims, with `exp` set to the requested expiration.
///
/// Any `exp` in the caller's claims is replaced.
#[derive(Debug)]
pub(crate) struct JwsClaims<'a> {
    pub payload: &'a Map<String, Value>,
    pub exp: i64,
}

impl JwsClaims<'_> {
    pub fn encode(&self) -> Result<String> {
        let mut claims = self.payload.clone();
        claims.insert("exp".to_string(), Value::from(self.exp));
        let json = serde_json::to_string(&claims).map_err(Error::signing)?;
        Ok(BASE64_URL_SAFE_NO_PAD.encode(json.as_bytes()))
    }
}

/// Encodes and signs a compact JWS: `header.claims.signature`.
pub(crate) async fn assertion(
    header: &JwsHeader<'_>,
    claims: &JwsClaims<'_>,
    signer: &dyn Signer,
) -> Result<String> {
    let encoded_header_claims = format!("{}.{}", header.encode()?, claims.encode()?);
    let sig = signer
        .sign(encoded_header_claims.as_bytes())
        .await
        .map_err(Error::signing)?;
    Ok(format!(
        "{}.{}",
        encoded_header_claims,
        BASE64_URL_SAFE_NO_PAD.encode(sig)
    ))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::signer::tests::{pkcs8_pem, verify};
    use crate::signer::{KeySigner, SigningError};
    use base64::Engine as _;
    use serde_json::json;

    pub(crate) fn b64_decode_to_json(s: &str) -> Value {
        let decoded = BASE64_URL_SAFE_NO_PAD
            .decode(s)
            .expect("valid url-safe base64");
        serde_json::from_slice(&decoded).expect("valid JSON")
    }

    #[test]
    fn header_encode() {
        let header = JwsHeader {
            alg: "RS256",
            typ: "JWT",
            kid: Some("some_key_id"),
        };
        let v = b64_decode_to_json(&header.encode().unwrap());
        assert_eq!(v, json!({"alg": "RS256", "typ": "JWT", "kid": "some_key_id"}));
    }

    #[test]
    fn header_encode_no_kid() {
        let header = JwsHeader {
            alg: "RS256",
            typ: "JWT",
            kid: None,
        };
        let v = b64_decode_to_json(&header.encode().unwrap());
        assert_eq!(v["alg"], "RS256");
        assert_eq!(v.get("kid"), None);
    }

    #[test]
    fn claims_merge_exp() {
        let payload = json!({"iss": "0123456789", "aud": "https://login.example.com", "sub": "user"});
        let claims = JwsClaims {
            payload: payload.as_object().unwrap(),
            exp: 1_700_000_300,
        };
        let v = b64_decode_to_json(&claims.encode().unwrap());
        assert_eq!(
            v,
            json!({
                "iss": "0123456789",
                "aud": "https://login.example.com",
                "sub": "user",
                "exp": 1_700_000_300,
            })
        );
    }

    #[test]
    fn claims_exp_overrides_payload() {
        let payload = json!({"iss": "test-iss", "exp": 42});
        let claims = JwsClaims {
            payload: payload.as_object().unwrap(),
            exp: 1_700_000_300,
        };
        let v = b64_decode_to_json(&claims.encode().unwrap());
        assert_eq!(v["exp"], 1_700_000_300);
        // The caller's payload is not modified.
        assert_eq!(payload["exp"], 42);
    }

    #[tokio::test]
    async fn assertion_is_verifiable() -> anyhow::Result<()> {
        let signer = KeySigner::from_pem(pkcs8_pem())?;
        let payload = json!({"iss": "test-iss"});
        let header = JwsHeader {
            alg: "RS256",
            typ: "JWT",
            kid: None,
        };
        let claims = JwsClaims {
            payload: payload.as_object().unwrap(),
            exp: 123,
        };
        let jws = assertion(&header, &claims, &signer).await?;
        let parts = jws.split('.').collect::<Vec<_>>();
        assert_eq!(parts.len(), 3, "{jws}");
        assert_eq!(b64_decode_to_json(parts[1]), json!({"iss": "test-iss", "exp": 123}));

        let signature = BASE64_URL_SAFE_NO_PAD.decode(parts[2])?;
        let content = format!("{}.{}", parts[0], parts[1]);
        assert!(verify(content.as_bytes(), &signature));
        Ok(())
    }

    #[derive(Debug)]
    struct FailingSigner;

    #[async_trait::async_trait]
    impl Signer for FailingSigner {
        async fn sign(&self, _content: &[u8]) -> crate::signer::Result<Vec<u8>> {
            Err(SigningError::sign("test-only-hsm-down"))
        }
    }

    #[tokio::test]
    async fn assertion_signing_error() {
        let payload = Map::new();
        let header = JwsHeader {
            alg: "RS256",
            typ: "JWT",
            kid: None,
        };
        let claims = JwsClaims {
            payload: &payload,
            exp: 123,
        };
        let err = assertion(&header, &claims, &FailingSigner)
            .await
            .unwrap_err();
        assert!(err.is_signing(), "{err:?}");
        assert!(err.to_string().contains("test-only-hsm-down"), "{err}");
    }
}
