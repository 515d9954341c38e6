use base64::{
    Engine,
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use serde::Deserialize;
use serde_json::Value;

use crate::models::UserType;

/// URL-safe alphabet that accepts payload segments with or without `=` padding.
const LENIENT_URL_SAFE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// TokenClaims
///
/// The subset of the credential token payload the edge gate inspects.
///
/// The token is only *decoded*, never verified: the signature segment is ignored and
/// a forged token with a plausible payload will decode successfully. Anything that
/// depends on the claims being authentic must ask the Identity Service instead.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TokenClaims {
    /// Subject (sub): the account email.
    #[serde(default)]
    pub sub: Option<String>,
    /// Expiry (exp), epoch seconds. Fractional values are legal NumericDates.
    /// A token without it is treated as expired.
    #[serde(default)]
    pub exp: Option<f64>,
    /// Kept raw so an unknown account kind still decodes (it simply never counts as admin).
    #[serde(default, rename = "userType")]
    pub user_type: Option<String>,
    /// Kept as raw JSON; entries are not required to be strings.
    #[serde(default)]
    pub authorities: Value,
}

impl TokenClaims {
    /// True when `exp` is absent or strictly before `now_secs`.
    pub fn is_expired(&self, now_secs: i64) -> bool {
        match self.exp {
            Some(exp) => exp < now_secs as f64,
            None => true,
        }
    }

    pub fn user_type(&self) -> Option<UserType> {
        self.user_type.as_deref().and_then(|raw| raw.parse().ok())
    }

    pub fn is_admin(&self) -> bool {
        self.user_type().is_some_and(UserType::is_admin)
    }

    /// The `authorities` claim re-serialized as JSON. A missing, null or otherwise
    /// falsy claim becomes `[]`.
    pub fn authorities_json(&self) -> String {
        let falsy = match &self.authorities {
            Value::Null | Value::Bool(false) => true,
            Value::Number(n) => n.as_f64() == Some(0.0),
            Value::String(s) => s.is_empty(),
            _ => false,
        };
        if falsy {
            "[]".to_string()
        } else {
            self.authorities.to_string()
        }
    }
}

/// decode_claims
///
/// Extracts the payload segment of a compact `header.payload.signature` token and
/// parses it as JSON. Returns `None` for any malformed input; callers treat that the
/// same as having no token at all.
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let mut segments = token.split('.');
    let _header = segments.next()?;
    let payload = segments.next()?;

    let bytes = match LENIENT_URL_SAFE.decode(payload.as_bytes()) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, "token payload is not valid base64url");
            return None;
        }
    };

    match serde_json::from_slice::<TokenClaims>(&bytes) {
        Ok(claims) => Some(claims),
        Err(e) => {
            tracing::debug!(error = %e, "token payload is not a JSON claims object");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};

    fn token_with_payload(payload: &str) -> String {
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn decodes_all_inspected_claims() {
        let token = token_with_payload(
            r#"{"sub":"a@b.com","exp":4102444800,"userType":"ADMIN","authorities":["X","Y"]}"#,
        );
        let claims = decode_claims(&token).unwrap();

        assert_eq!(claims.sub.as_deref(), Some("a@b.com"));
        assert_eq!(claims.exp, Some(4_102_444_800.0));
        assert_eq!(claims.user_type(), Some(UserType::Admin));
        assert_eq!(claims.authorities_json(), r#"["X","Y"]"#);
    }

    #[test]
    fn accepts_padded_payload() {
        let token = format!("h.{}.s", URL_SAFE.encode(r#"{"exp":1}"#));
        assert_eq!(decode_claims(&token).unwrap().exp, Some(1.0));
    }

    #[test]
    fn malformed_tokens_decode_to_none() {
        assert!(decode_claims("").is_none());
        assert!(decode_claims("no-dots-at-all").is_none());
        assert!(decode_claims("a.!!!not-base64!!!.c").is_none());
        assert!(decode_claims(&token_with_payload("not json")).is_none());
        assert!(decode_claims(&token_with_payload("[1,2,3]")).is_none());
    }

    #[test]
    fn expiry_is_strictly_before_now() {
        let claims = TokenClaims {
            exp: Some(100.0),
            ..Default::default()
        };
        assert!(!claims.is_expired(99));
        assert!(!claims.is_expired(100));
        assert!(claims.is_expired(101));
        assert!(TokenClaims::default().is_expired(0));
    }

    #[test]
    fn fractional_expiry_is_accepted() {
        let token = token_with_payload(r#"{"exp":4102444800.5,"userType":"ADMIN"}"#);
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.exp, Some(4_102_444_800.5));
        assert!(!claims.is_expired(4_102_444_800));
        assert!(claims.is_expired(4_102_444_801));
        assert!(claims.is_admin());
    }

    #[test]
    fn non_string_authorities_are_kept_verbatim() {
        let token = token_with_payload(r#"{"exp":1,"authorities":[1,"X",{"a":true}]}"#);
        assert_eq!(
            decode_claims(&token).unwrap().authorities_json(),
            r#"[1,"X",{"a":true}]"#
        );
    }

    #[test]
    fn null_or_missing_authorities_become_empty() {
        for payload in [r#"{"exp":1,"authorities":null}"#, r#"{"exp":1}"#] {
            let token = token_with_payload(payload);
            assert_eq!(decode_claims(&token).unwrap().authorities_json(), "[]");
        }
    }

    #[test]
    fn unknown_user_type_is_not_admin() {
        let token = token_with_payload(r#"{"exp":1,"userType":"ROOT"}"#);
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.user_type(), None);
        assert!(!claims.is_admin());
    }
}
