use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::error::Error;

/// Claims read from a Supabase access token without verifying its signature.
///
/// The signature is the auth server's business; the client only needs to know
/// who the token names and when it stops being worth sending.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct AccessClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: i64,
}

impl AccessClaims {
    /// Expiry instant, if `exp` is a representable timestamp.
    #[must_use]
    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp(self.exp).ok()
    }
}

/// Decodes the payload segment of a JWT.
///
/// # Errors
///
/// Returns `Error::Token` if the token is not three dot-separated segments or
/// the payload is not base64url JSON with `sub` and `exp`.
pub fn decode_unverified(token: &str) -> Result<AccessClaims, Error> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(Error::Token("invalid token format".into()));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| Error::Token("invalid payload encoding".into()))?;

    serde_json::from_slice(&bytes).map_err(|e| Error::Token(format!("invalid payload: {e}")))
}

#[cfg(test)]
pub(crate) fn encode_for_test(payload: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.c2lnbmF0dXJl")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decode_claims() {
        let token = encode_for_test(&json!({
            "sub": "0b6a3c",
            "email": "ana@school.edu",
            "exp": 1_900_000_000,
            "role": "authenticated",
        }));
        let claims = decode_unverified(&token).unwrap();
        assert_eq!(claims.sub, "0b6a3c");
        assert_eq!(claims.email.as_deref(), Some("ana@school.edu"));
        assert_eq!(claims.exp, 1_900_000_000);
    }

    #[test]
    fn test_expires_at() {
        let token = encode_for_test(&json!({ "sub": "x", "exp": 1_000 }));
        let claims = decode_unverified(&token).unwrap();
        assert_eq!(
            claims.expires_at(),
            Some(OffsetDateTime::from_unix_timestamp(1_000).unwrap())
        );
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(decode_unverified("").is_err());
        assert!(decode_unverified("a.b").is_err());
        assert!(decode_unverified("a.b.c.d").is_err());
        assert!(decode_unverified("a.!!!.c").is_err());
        let no_exp = encode_for_test(&json!({ "sub": "x" }));
        assert!(decode_unverified(&no_exp).is_err());
    }
}
