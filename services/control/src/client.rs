//! Blocking REST client shared by the service wrappers.
//!
//! Every configuration resource is read with GET and replaced with PUT as a
//! JSON document. Documents are checked against their [`Schema`] on the way
//! in and on the way out, so an invalid configuration is never sent.

use crate::endpoint::ServiceEndpoint;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use sensor_interchange::schema::{self, CodecError, Schema};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Per-call timeout; calls are never retried
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(100);

const JSON: &str = "application/json";

/// Errors that can occur when talking to a configuration service
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure or timeout
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Anything other than 200 OK
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    /// Document failed to decode or validate
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// GET/PUT access to the JSON resources of one service
#[derive(Debug, Clone)]
pub struct ResourceClient {
    http: Client,
    endpoint: ServiceEndpoint,
}

impl ResourceClient {
    pub fn new(endpoint: ServiceEndpoint) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    /// GET `resource` and decode it as `T`
    #[instrument(skip(self), fields(schema = T::NAME))]
    pub fn fetch<T: Schema>(&self, resource: &str) -> Result<T, ClientError> {
        let url = self.endpoint.url(resource);
        debug!(url = %url, "Fetching resource");

        let response = self.http.get(&url).header(ACCEPT, JSON).send()?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(ClientError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text()?;
        Ok(schema::decode(&body)?)
    }

    /// Validate `value` and PUT it to `resource`
    #[instrument(skip(self, value), fields(schema = T::NAME))]
    pub fn store<T: Schema>(&self, resource: &str, value: &T) -> Result<(), ClientError> {
        let body = schema::encode(value)?;
        let url = self.endpoint.url(resource);
        debug!(url = %url, size = body.len(), "Storing resource");

        let response = self
            .http
            .put(&url)
            .header(ACCEPT, JSON)
            .header(CONTENT_TYPE, JSON)
            .body(body)
            .send()?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ClientError::Status {
                url,
                status: status.as_u16(),
            });
        }

        Ok(())
    }

    /// [`fetch`](Self::fetch), logging the error and returning `None`
    pub fn get<T: Schema>(&self, resource: &str) -> Option<T> {
        match self.fetch(resource) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(resource, error = %e, "Failed to get {}", T::NAME);
                None
            }
        }
    }

    /// [`store`](Self::store), logging the error and returning `false`
    pub fn put<T: Schema>(&self, resource: &str, value: &T) -> bool {
        match self.store(resource, value) {
            Ok(()) => true,
            Err(e) => {
                warn!(resource, error = %e, "Failed to set {}", T::NAME);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{closed_endpoint, idle_endpoint, serve_once};
    use sensor_interchange::ValidationError;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Level {
        level: i32,
    }

    impl Schema for Level {
        const NAME: &'static str = "Level";

        fn validate(&self) -> Result<(), ValidationError> {
            if self.level < 0 {
                return Err(ValidationError::new("level", "must not be negative"));
            }
            Ok(())
        }
    }

    #[test]
    fn test_get_decodes_ok_response() {
        let (endpoint, server) = serve_once(200, r#"{"level": 3}"#);
        let client = ResourceClient::new(endpoint).unwrap();

        assert_eq!(client.get::<Level>("level"), Some(Level { level: 3 }));

        let request = server.join().unwrap();
        assert_eq!(request.method, "GET");
        assert_eq!(request.path, "/level");
        assert!(request.has_header("accept: application/json"));
    }

    #[test]
    fn test_get_non_200_is_none() {
        let (endpoint, server) = serve_once(404, "");
        let client = ResourceClient::new(endpoint).unwrap();

        let err = client.fetch::<Level>("level").unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 404, .. }));
        server.join().unwrap();

        let (endpoint, server) = serve_once(201, r#"{"level": 3}"#);
        let client = ResourceClient::new(endpoint).unwrap();
        assert_eq!(client.get::<Level>("level"), None);
        server.join().unwrap();
    }

    #[test]
    fn test_get_unparseable_or_invalid_is_none() {
        for body in ["not json", r#"{"other": 1}"#, r#"{"level": -1}"#] {
            let (endpoint, server) = serve_once(200, body);
            let client = ResourceClient::new(endpoint).unwrap();
            assert!(matches!(
                client.fetch::<Level>("level"),
                Err(ClientError::Codec(_))
            ));
            server.join().unwrap();
        }
    }

    #[test]
    fn test_transport_error_is_none_and_false() {
        let client = ResourceClient::new(closed_endpoint()).unwrap();
        assert_eq!(client.get::<Level>("level"), None);
        assert!(!client.put("level", &Level { level: 1 }));
    }

    #[test]
    fn test_put_sends_json_and_requires_200() {
        let (endpoint, server) = serve_once(200, "");
        let client = ResourceClient::new(endpoint).unwrap();
        assert!(client.put("level", &Level { level: 7 }));

        let request = server.join().unwrap();
        assert_eq!(request.method, "PUT");
        assert_eq!(request.path, "/level");
        assert!(request.has_header("content-type: application/json"));
        assert_eq!(request.body, r#"{"level":7}"#);

        let (endpoint, server) = serve_once(500, "");
        let client = ResourceClient::new(endpoint).unwrap();
        assert!(!client.put("level", &Level { level: 7 }));
        server.join().unwrap();
    }

    #[test]
    fn test_invalid_put_never_sends() {
        let (endpoint, listener) = idle_endpoint();
        let client = ResourceClient::new(endpoint).unwrap();

        let err = client.store("level", &Level { level: -5 }).unwrap_err();
        assert!(matches!(err, ClientError::Codec(CodecError::Invalid { .. })));
        assert!(listener.accept().is_err());
    }

    #[test]
    fn test_base_path_prefixes_resource() {
        let (endpoint, server) = serve_once(200, r#"{"level": 0}"#);
        let client = ResourceClient::new(endpoint.with_base_path("/analytics/")).unwrap();

        assert!(client.get::<Level>("configuration").is_some());
        assert_eq!(server.join().unwrap().path, "/analytics/configuration");
    }
}
