use anyhow::{anyhow, Error};
use headers::authorization::{Bearer, Credentials};
use http::{header, Request, Response, StatusCode};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use std::{collections::HashSet, marker::PhantomData};
use tower_http::validate_request::ValidateRequest;

use crate::claims::{Claims, Role};

pub mod access;
pub mod claims;

pub const ANY_ID: &str = "*";

pub struct Keys {
    encoding: EncodingKey,
}

impl Keys {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
        }
    }

    pub fn token(&self, claims: Claims) -> Result<String, Error> {
        encode(&Header::default(), &claims, &self.encoding).map_err(|e| anyhow!(e))
    }
}

/// Resolves the caller of a request into [`Claims`].
///
/// Static tokens map to a platform admin. Anything else must be a JWT signed
/// with the configured secret. With neither configured the service is open
/// and every caller is a platform admin.
pub struct ManyValidate<ResBody> {
    tokens: HashSet<String>,
    decoding: Option<DecodingKey>,
    _ty: PhantomData<fn() -> ResBody>,
}

impl<ResBody> ManyValidate<ResBody> {
    pub fn new(secret: String, tokens: Vec<String>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
            decoding: if secret.is_empty() {
                None
            } else {
                Some(DecodingKey::from_secret(secret.as_bytes()))
            },
            _ty: PhantomData,
        }
    }

    fn is_open(&self) -> bool {
        self.tokens.is_empty() && self.decoding.is_none()
    }

    fn resolve(&self, bearer: &Bearer) -> Option<Claims> {
        if self.tokens.contains(bearer.token()) {
            return Some(any_claims());
        }
        let decoding = self.decoding.as_ref()?;
        decode::<Claims>(bearer.token(), decoding, &Validation::default())
            .ok()
            .map(|data| data.claims)
    }
}

impl<ResBody> Clone for ManyValidate<ResBody> {
    fn clone(&self) -> Self {
        Self {
            tokens: self.tokens.clone(),
            decoding: self.decoding.clone(),
            _ty: PhantomData,
        }
    }
}

fn any_claims() -> Claims {
    Claims {
        id: ANY_ID.to_string(),
        exp: 0,
        role: Role::SuperAdmin,
    }
}

impl<B: Default> ValidateRequest<B> for ManyValidate<B> {
    type ResponseBody = B;

    fn validate(&mut self, request: &mut Request<B>) -> Result<(), Response<Self::ResponseBody>> {
        if self.is_open() {
            request.extensions_mut().insert(any_claims());
            return Ok(());
        }

        let claims = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(Bearer::decode)
            .and_then(|bearer| self.resolve(&bearer));

        match claims {
            Some(claims) => {
                request.extensions_mut().insert(claims);
                Ok(())
            }
            None => {
                let mut response = Response::new(B::default());
                *response.status_mut() = StatusCode::UNAUTHORIZED;
                Err(response)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(token: Option<&str>) -> Request<String> {
        let mut builder = Request::builder().uri("/api/podcasts");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(String::new()).unwrap()
    }

    #[test]
    fn test_validator_shared_across_threads() {
        fn shared<T: Send + Sync + Clone + 'static>(_: &T) {}
        shared(&ManyValidate::<axum::body::Body>::new(String::new(), vec![]));
    }

    #[test]
    fn test_open_service() {
        let mut validate = ManyValidate::<String>::new(String::new(), vec![]);
        let mut req = request(None);
        assert!(validate.validate(&mut req).is_ok());
        assert_eq!(req.extensions().get::<Claims>(), Some(&any_claims()));
    }

    #[test]
    fn test_static_token() {
        let mut validate = ManyValidate::<String>::new(String::new(), vec!["live".to_string()]);
        assert!(validate.validate(&mut request(Some("live"))).is_ok());
        let res = validate.validate(&mut request(Some("nope"))).unwrap_err();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert!(validate.validate(&mut request(None)).is_err());
    }

    #[test]
    fn test_jwt() {
        let secret = "podcast-secret";
        let claims = Claims {
            id: "alice".to_string(),
            exp: 32503680000,
            role: Role::Admin,
        };
        let token = Keys::new(secret.as_bytes()).token(claims.clone()).unwrap();

        let mut validate = ManyValidate::<String>::new(secret.to_string(), vec![]);
        let mut req = request(Some(&token));
        assert!(validate.validate(&mut req).is_ok());
        assert_eq!(req.extensions().get::<Claims>(), Some(&claims));

        let forged = Keys::new(b"other").token(claims).unwrap();
        assert!(validate.validate(&mut request(Some(&forged))).is_err());
    }
}
