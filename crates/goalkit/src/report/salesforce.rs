//! Salesforce analytics reports.
//!
//! Access tokens come from an [`Authenticator`]. The production one,
//! [`JwtBearer`], exchanges a signed assertion for an instance URL and
//! access token on every fetch; [`StaticCredential`] uses a fixed pair.

use super::jwt::{Claims, SigningKey, signed_assertion};
use super::{Report, ReportSource};
use crate::error::{ReportError, ResolveError};
use callkit::{ApiClient, Body, CallError, Method, RetryingExecutor};
use chrono::Utc;
use log::debug;
use serde::Deserialize;
use std::path::Path;

/// Default login service.
pub const DEFAULT_LOGIN_URL: &str = "https://login.salesforce.com";

/// Default REST API version.
pub const DEFAULT_API_VERSION: &str = "v52.0";

const TOKEN_PATH: &str = "services/oauth2/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Where to send report calls and how to authenticate them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Credential {
    pub instance_url: String,
    pub access_token: String,
}

/// Produces a credential for the report service.
pub trait Authenticator: Send + Sync {
    fn credential(&self) -> Result<Credential, ReportError>;
}

/// A fixed instance URL and access token.
#[derive(Debug, Clone)]
pub struct StaticCredential(pub Credential);

impl StaticCredential {
    pub fn new(instance_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self(Credential {
            instance_url: instance_url.into(),
            access_token: access_token.into(),
        })
    }
}

impl Authenticator for StaticCredential {
    fn credential(&self) -> Result<Credential, ReportError> {
        Ok(self.0.clone())
    }
}

/// OAuth 2.0 JWT bearer flow.
pub struct JwtBearer {
    client_id: String,
    username: String,
    key: SigningKey,
    login: ApiClient,
}

impl JwtBearer {
    pub fn new(
        client_id: impl Into<String>,
        username: impl Into<String>,
        key: SigningKey,
        login_url: impl Into<String>,
        executor: RetryingExecutor,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            username: username.into(),
            key,
            login: ApiClient::anonymous(login_url, executor),
        }
    }

    /// Load the signing key from a PEM file.
    pub fn from_key_file(
        client_id: impl Into<String>,
        username: impl Into<String>,
        key_file: &Path,
        login_url: impl Into<String>,
        executor: RetryingExecutor,
    ) -> Result<Self, ResolveError> {
        let key = SigningKey::load(key_file)?;
        Ok(Self::new(client_id, username, key, login_url, executor))
    }
}

impl Authenticator for JwtBearer {
    fn credential(&self) -> Result<Credential, ReportError> {
        let claims = Claims::new(&self.client_id, &self.username, self.login.base_url(), Utc::now());
        let assertion = signed_assertion(&self.key, &claims)?;
        exchange_assertion(&self.login, &assertion)
    }
}

/// Trade a signed assertion for a credential at the login service.
pub fn exchange_assertion(login: &ApiClient, assertion: &str) -> Result<Credential, ReportError> {
    let form = vec![
        ("grant_type".to_string(), JWT_BEARER_GRANT.to_string()),
        ("assertion".to_string(), assertion.to_string()),
    ];
    let response = login.execute(Method::Post, TOKEN_PATH, &[], Body::Form(form))?;
    let credential: Credential = serde_json::from_value(response)
        .map_err(|e| CallError::decode(format!("token response: {e}")))?;
    debug!("Authenticated against {}", credential.instance_url);
    Ok(credential)
}

/// Report source backed by the Salesforce analytics REST API.
pub struct SalesforceReports {
    auth: Box<dyn Authenticator>,
    executor: RetryingExecutor,
    api_version: String,
}

impl SalesforceReports {
    pub fn new(auth: Box<dyn Authenticator>, executor: RetryingExecutor) -> Self {
        Self {
            auth,
            executor,
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    /// Use a different REST API version, e.g. `v58.0`.
    #[must_use]
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    fn report_path(&self, report_id: &str) -> String {
        format!("services/data/{}/analytics/reports/{report_id}", self.api_version)
    }
}

impl ReportSource for SalesforceReports {
    fn fetch_report(&self, report_id: &str) -> Result<Report, ReportError> {
        let credential = self.auth.credential()?;
        let client = ApiClient::new(credential.instance_url, credential.access_token, self.executor.clone());
        let json = client.get(&self.report_path(report_id))?;
        Ok(Report::from_json(report_id, &json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::won_opportunities;
    use callkit::transport::MockTransport;
    use callkit::{NoCallback, RecordingSleeper};
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use std::sync::Arc;

    const REPORT_ID: &str = "111111111111111111";

    fn executor(mock: &MockTransport) -> RetryingExecutor {
        RetryingExecutor::with_transport(Arc::new(mock.clone()))
            .sleeper(Arc::new(RecordingSleeper::new()))
            .callback(Arc::new(NoCallback))
    }

    #[test]
    fn test_get_report_metric() {
        let mock = MockTransport::new();
        mock.respond(
            Method::Get,
            format!("https://instance.salesforce.com/services/data/v52.0/analytics/reports/{REPORT_ID}"),
            200,
            won_opportunities().to_string(),
        );
        let reports = SalesforceReports::new(
            Box::new(StaticCredential::new("https://instance.salesforce.com", "token")),
            executor(&mock),
        );

        let report = reports.fetch_report(REPORT_ID).unwrap();

        assert_eq!(report.metric("s!AMOUNT").unwrap(), 3745000.0);
        assert_eq!(mock.requests()[0].authorization().as_deref(), Some("Bearer token"));
    }

    #[test]
    fn test_api_version_override() {
        let reports = SalesforceReports::new(
            Box::new(StaticCredential::new("https://i", "t")),
            executor(&MockTransport::new()),
        )
        .api_version("v58.0");
        assert_eq!(reports.report_path("r"), "services/data/v58.0/analytics/reports/r");
    }

    #[test]
    fn test_exchange_assertion() {
        let mock = MockTransport::new();
        mock.respond(
            Method::Post,
            "https://login.salesforce.com/services/oauth2/token",
            200,
            r#"{"instance_url":"https://instance.salesforce.com","access_token":"token"}"#,
        );
        let login = ApiClient::anonymous(DEFAULT_LOGIN_URL, executor(&mock));

        let credential = exchange_assertion(&login, "a.b.c").unwrap();

        assert_eq!(credential, Credential {
            instance_url: "https://instance.salesforce.com".into(),
            access_token: "token".into(),
        });
        let sent = &mock.requests()[0];
        assert_eq!(sent.authorization(), None);
        assert_eq!(
            sent.body,
            Body::Form(vec![
                ("grant_type".into(), JWT_BEARER_GRANT.into()),
                ("assertion".into(), "a.b.c".into()),
            ])
        );
    }

    #[test]
    fn test_jwt_bearer_signs_and_exchanges() {
        let mock = MockTransport::new();
        mock.respond(
            Method::Post,
            "https://login.salesforce.com/services/oauth2/token",
            200,
            r#"{"instance_url":"https://instance.salesforce.com","access_token":"token"}"#,
        );
        let key = SigningKey::from_pem(include_str!("testdata/rsa_pkcs1.pem").as_bytes()).unwrap();
        let bearer = JwtBearer::new("client", "user@example.com", key, DEFAULT_LOGIN_URL, executor(&mock));

        let credential = bearer.credential().unwrap();
        assert_eq!(credential.access_token, "token");

        let requests = mock.requests();
        let Body::Form(form) = &requests[0].body else {
            panic!("token request must be a form");
        };
        assert_eq!(form[0], ("grant_type".to_string(), JWT_BEARER_GRANT.to_string()));
        let (field, assertion) = &form[1];
        assert_eq!(field, "assertion");

        let segments: Vec<&str> = assertion.split('.').collect();
        assert_eq!(segments.len(), 3);
        let claims: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segments[1]).unwrap()).unwrap();
        assert_eq!(claims["iss"], "client");
        assert_eq!(claims["sub"], "user@example.com");
        assert_eq!(claims["aud"], DEFAULT_LOGIN_URL);
        assert_eq!(URL_SAFE_NO_PAD.decode(segments[2]).unwrap().len(), 256);
    }

    #[test]
    fn test_auth_failure_raises() {
        let mock = MockTransport::new();
        mock.respond(
            Method::Post,
            "https://login.salesforce.com/services/oauth2/token",
            401,
            r#"{"error":"invalid_grant"}"#,
        );
        let login = ApiClient::anonymous(DEFAULT_LOGIN_URL, executor(&mock));

        let err = exchange_assertion(&login, "a.b.c").unwrap_err();
        assert!(matches!(err, ReportError::Call(CallError::Http { status: 401, .. })));
    }

    #[test]
    fn test_token_response_missing_fields() {
        let mock = MockTransport::new();
        mock.respond(Method::Post, "https://login.salesforce.com/services/oauth2/token", 200, "{}");
        let login = ApiClient::anonymous(DEFAULT_LOGIN_URL, executor(&mock));

        let err = exchange_assertion(&login, "a.b.c").unwrap_err();
        assert!(matches!(err, ReportError::Call(CallError::Decode(_))));
    }
}
