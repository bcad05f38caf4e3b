#[cfg(test)]
mod tests {
    use crate::auth::CredentialGate;
    use crate::config::{Config, SecurityConfig};
    use crate::connection::ConnectionResolver;
    use crate::gateway::{Gateway, RequestHeaders};
    use crate::server::{router, AppState};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{HeaderMap, Request, StatusCode};
    use axum::Router;
    use procgate_core::error::GatewayError;
    use procgate_core::types::RawRow;
    use procgate_sql::executor::{ProcedureCall, ProcedureExecutor, ResolvedConnection};
    use procgate_sql::normalizer::NormalizeOptions;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    const SECRET: &str = "12C1F7EF9AC8E288FBC2177B7F54D";

    const CONFIG: &str = r#"
        [server]
        listen_addr = "127.0.0.1:0"

        [metrics]
        enabled = false
        listen_addr = "127.0.0.1:0"

        [security]
        shared_secret = "12C1F7EF9AC8E288FBC2177B7F54D"

        [connection_strings]
        DefaultConnection = "host=db user=app dbname=main"
        ReportingConnection = "host=db user=app dbname=reporting"
    "#;

    #[derive(Default)]
    struct RecordingExecutor {
        rows: Vec<RawRow>,
        failure: Option<String>,
        calls: Mutex<Vec<(ResolvedConnection, ProcedureCall)>>,
    }

    impl RecordingExecutor {
        fn returning(rows: Vec<Value>) -> Self {
            Self {
                rows: rows
                    .into_iter()
                    .map(|row| match row {
                        Value::Object(map) => map,
                        _ => panic!("row must be an object"),
                    })
                    .collect(),
                ..Self::default()
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                failure: Some(message.to_string()),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<(ResolvedConnection, ProcedureCall)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProcedureExecutor for RecordingExecutor {
        async fn execute(
            &self,
            connection: &ResolvedConnection,
            call: &ProcedureCall,
        ) -> Result<Vec<RawRow>, GatewayError> {
            self.calls
                .lock()
                .unwrap()
                .push((connection.clone(), call.clone()));
            match &self.failure {
                Some(message) => Err(GatewayError::Execution(message.clone())),
                None => Ok(self.rows.clone()),
            }
        }
    }

    fn app(executor: Arc<RecordingExecutor>) -> Router {
        let config = Config::parse(CONFIG).expect("config");
        let state = AppState::new(&config, executor).expect("state");
        router(state)
    }

    fn post(auth: Option<&str>, application: Option<&str>, body: Value) -> Request<Body> {
        post_raw("/api/v1/dynamic", auth, application, body.to_string())
    }

    fn post_raw(uri: &str, auth: Option<&str>, application: Option<&str>, body: String) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(auth) = auth {
            builder = builder.header("Authorization", auth);
        }
        if let Some(application) = application {
            builder = builder.header("ApplicationName", application);
        }
        builder.body(Body::from(body)).expect("request")
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = app.oneshot(request).await.expect("response");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body = serde_json::from_slice(&bytes).expect("json body");
        (status, headers, body)
    }

    fn bearer() -> String {
        format!("Bearer {SECRET}")
    }

    #[test]
    fn credential_gate_cases() {
        let gate = CredentialGate::new(&SecurityConfig {
            shared_secret: SECRET.into(),
        });
        assert!(gate.check(Some(bearer().as_str())).is_ok());
        let lowered = format!("Bearer {}", SECRET.to_lowercase());
        assert!(gate.check(Some(lowered.as_str())).is_ok());
        assert!(gate.check(Some(format!("Token {SECRET} extra").as_str())).is_ok());
        assert!(matches!(gate.check(None), Err(GatewayError::Unauthenticated)));
        assert!(gate.check(Some("Bearer")).is_err());
        assert!(gate.check(Some("Bearer ")).is_err());
        assert!(gate.check(Some(format!("Bearer  {SECRET}").as_str())).is_err());
        assert!(gate.check(Some("Bearer wrong")).is_err());
        assert!(gate.check(Some(SECRET)).is_err());
    }

    #[test]
    fn resolver_selects_named_connections() {
        let mut strings = HashMap::new();
        strings.insert("DefaultConnection".to_string(), "host=main".to_string());
        strings.insert("ReportingConnection".to_string(), "host=reports".to_string());
        let resolver = ConnectionResolver::new(&strings);

        let default = resolver.resolve(None).expect("default");
        assert_eq!(default.name(), "DefaultConnection");
        assert_eq!(default.connection_string(), "host=main");
        assert_eq!(resolver.resolve(Some("")).expect("empty").name(), "DefaultConnection");

        let reporting = resolver.resolve(Some("Reporting")).expect("reporting");
        assert_eq!(reporting.connection_string(), "host=reports");
        assert_eq!(
            resolver.resolve(Some("reporting")).expect("case").name(),
            "ReportingConnection"
        );

        assert!(matches!(
            resolver.resolve(Some("Billing")),
            Err(GatewayError::Configuration(_))
        ));
    }

    #[test]
    fn resolved_connection_debug_hides_connection_string() {
        let connection = ResolvedConnection::new("DefaultConnection", "host=db password=hunter2");
        let rendered = format!("{connection:?}");
        assert!(rendered.contains("DefaultConnection"));
        assert!(!rendered.contains("hunter2"));
    }

    #[tokio::test]
    async fn gateway_pipeline_runs_without_http() {
        let executor = Arc::new(RecordingExecutor::returning(vec![json!({"Total": 3})]));
        let mut strings = HashMap::new();
        strings.insert("DefaultConnection".to_string(), "host=main".to_string());
        let gateway = Gateway::new(
            CredentialGate::new(&SecurityConfig {
                shared_secret: SECRET.into(),
            }),
            ConnectionResolver::new(&strings),
            executor.clone(),
            NormalizeOptions::default(),
        );
        let auth = bearer();
        let headers = RequestHeaders {
            authorization: Some(auth.as_str()),
            application_name: None,
        };
        let results = gateway
            .invoke(&headers, &json!({"sqlCommand": "sp_Count", "parameters": {}}))
            .await
            .expect("invoke");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["total"], json!(3));
        assert_eq!(executor.calls().len(), 1);
    }

    #[tokio::test]
    async fn probe_is_anonymous_and_idempotent() {
        let executor = Arc::new(RecordingExecutor::default());
        let request = || {
            Request::builder()
                .method("GET")
                .uri("/api/v1/dynamic")
                .body(Body::empty())
                .expect("request")
        };
        let (status, headers, first) = send(app(executor.clone()), request()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first, json!({"ok": true, "version": "1.0"}));
        assert_eq!(
            headers.get("api-supported-versions").and_then(|v| v.to_str().ok()),
            Some("1.0")
        );
        let (_, _, second) = send(app(executor.clone()), request()).await;
        assert_eq!(first, second);
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn unsupported_version_is_rejected() {
        let executor = Arc::new(RecordingExecutor::default());
        let request = Request::builder()
            .method("GET")
            .uri("/api/v2/dynamic")
            .body(Body::empty())
            .expect("request");
        let (status, _, body) = send(app(executor.clone()), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], json!(false));

        let request = post_raw(
            "/api/v2.0/dynamic",
            Some(bearer().as_str()),
            None,
            json!({"sqlCommand": "sp_Get"}).to_string(),
        );
        let (status, _, _) = send(app(executor.clone()), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_or_malformed_authorization_never_executes() {
        let executor = Arc::new(RecordingExecutor::default());
        let body = json!({"sqlCommand": "sp_GetUsers", "parameters": {}});
        for auth in [None, Some("Bearer"), Some("Bearer "), Some("Bearer nope")] {
            let (status, _, response) = send(app(executor.clone()), post(auth, None, body.clone())).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(response["ok"], json!(false));
            assert_eq!(response["error"], json!("unauthenticated"));
            assert_eq!(response["data"], body);
        }
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn denylisted_procedure_is_rejected_before_execution() {
        let executor = Arc::new(RecordingExecutor::default());
        let body = json!({"sqlCommand": "sp_Get; DROP TABLE x", "parameters": {}});
        let (status, _, response) = send(app(executor.clone()), post(Some(bearer().as_str()), None, body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["ok"], json!(false));
        assert!(response["error"]
            .as_str()
            .expect("error text")
            .starts_with("procedure rejected"));
        assert_eq!(response["data"], body);

        let (status, _, _) = send(
            app(executor.clone()),
            post(Some(bearer().as_str()), None, json!({"parameters": {}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn success_expands_embedded_json_and_camel_cases_columns() {
        let executor = Arc::new(RecordingExecutor::returning(vec![
            json!({"Id": 1, "Payload": "{\"a\":1}"}),
            json!({"Id": 2, "Payload": "[{\"x\":true}]"}),
        ]));
        let body = json!({"sqlCommand": "sp_GetDocs", "parameters": {}});
        let (status, _, response) = send(app(executor.clone()), post(Some(bearer().as_str()), None, body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            response,
            json!({
                "ok": true,
                "version": "1.0",
                "results": [
                    {"id": 1, "payload": {"a": 1}},
                    {"id": 2, "payload": [{"x": true}]}
                ]
            })
        );
    }

    #[tokio::test]
    async fn parameters_are_bound_as_strings() {
        let executor = Arc::new(RecordingExecutor::returning(vec![]));
        let body = json!({"sqlCommand": "sp_Find", "parameters": {"p1": 42, "p2": true, "p3": "x"}});
        let (status, _, response) = send(app(executor.clone()), post(Some(bearer().as_str()), None, body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["results"], json!([]));

        let calls = executor.calls();
        assert_eq!(calls.len(), 1);
        let (_, call) = &calls[0];
        assert_eq!(call.procedure, "sp_Find");
        assert_eq!(call.parameters["p1"], "42");
        assert_eq!(call.parameters["p2"], "true");
        assert_eq!(call.parameters["p3"], "x");
    }

    #[tokio::test]
    async fn application_name_selects_connection() {
        let executor = Arc::new(RecordingExecutor::returning(vec![]));
        let body = json!({"sqlCommand": "sp_Report", "parameters": {}});

        let (status, _, _) = send(app(executor.clone()), post(Some(bearer().as_str()), None, body.clone())).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _, _) = send(
            app(executor.clone()),
            post(Some(bearer().as_str()), Some("Reporting"), body.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let names: Vec<String> = executor
            .calls()
            .iter()
            .map(|(connection, _)| connection.name().to_string())
            .collect();
        assert_eq!(names, vec!["DefaultConnection", "ReportingConnection"]);

        let (status, _, response) = send(
            app(executor.clone()),
            post(Some(bearer().as_str()), Some("Billing"), body.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(response["error"]
            .as_str()
            .expect("error text")
            .contains("BillingConnection"));
        assert_eq!(response["data"], body);
        assert_eq!(executor.calls().len(), 2);
    }

    #[tokio::test]
    async fn execution_failures_echo_the_request() {
        let executor = Arc::new(RecordingExecutor::failing("relation does not exist"));
        let body = json!({"sqlCommand": "sp_Missing", "parameters": {"id": 1}});
        let (status, _, response) = send(app(executor.clone()), post(Some(bearer().as_str()), None, body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            response,
            json!({
                "ok": false,
                "error": "execution error: relation does not exist",
                "data": body
            })
        );
    }

    #[tokio::test]
    async fn broken_embedded_json_fails_the_request() {
        let executor = Arc::new(RecordingExecutor::returning(vec![json!({"Payload": "{oops"})]));
        let body = json!({"sqlCommand": "sp_GetDocs"});
        let (status, _, response) = send(app(executor), post(Some(bearer().as_str()), None, body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["ok"], json!(false));
        assert!(response.get("results").is_none());
    }

    #[tokio::test]
    async fn invalid_json_body_is_reported() {
        let executor = Arc::new(RecordingExecutor::default());
        let request = post_raw("/api/v1/dynamic", Some(bearer().as_str()), None, "{not json".into());
        let (status, _, response) = send(app(executor.clone()), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["data"], Value::Null);
        assert!(response["error"]
            .as_str()
            .expect("error text")
            .starts_with("malformed request"));
        assert!(executor.calls().is_empty());
    }
}
