//! The JSON API over a real socket.

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use reqwest::StatusCode;
    use serde_json::{Value, json};

    use crate::{Harness, spawn_http};

    struct Api {
        client: reqwest::Client,
        base: String,
    }

    impl Api {
        fn new(addr: SocketAddr) -> Self {
            Self {
                client: reqwest::Client::new(),
                base: format!("http://{addr}"),
            }
        }

        fn url(&self, path: &str) -> String {
            format!("{}{path}", self.base)
        }

        async fn send(&self, request: reqwest::RequestBuilder) -> (StatusCode, Value) {
            let response = request
                .send()
                .await
                .unwrap_or_else(|e| panic!("request failed: {e}"));
            let status = response.status();
            let body = response
                .json::<Value>()
                .await
                .unwrap_or_else(|e| panic!("response is not JSON: {e}"));
            (status, body)
        }

        async fn register(&self, first: &str, last: &str, email: &str) -> (StatusCode, Value) {
            self.send(
                self.client
                    .post(self.url("/api/identities"))
                    .json(&json!({ "firstName": first, "lastName": last, "email": email })),
            )
            .await
        }

        async fn upload(&self, email_query: &str, filename: &str, body: &'static [u8]) -> (StatusCode, Value) {
            self.send(
                self.client
                    .post(self.url(&format!("/api/files?email={email_query}&filename={filename}")))
                    .header("content-type", "image/png")
                    .body(body),
            )
            .await
        }

        async fn delete(&self, path: &str, email: &str) -> (StatusCode, Value) {
            self.send(
                self.client
                    .delete(self.url("/api/files"))
                    .json(&json!({ "path": path, "email": email })),
            )
            .await
        }
    }

    #[tokio::test]
    async fn test_should_serve_folder_scoped_workflow() {
        let h = Harness::new();
        let api = Api::new(spawn_http(h.service.clone()).await);

        let (status, body) = api.register("Ann", "Lee", "a@x.com").await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["success"], true);
        assert_eq!(body["identity"]["email"], "a@x.com");
        assert_eq!(body["identity"]["fullName"], "Ann Lee");
        api.register("Bo", "Kim", "b@x.com").await;

        let (status, body) = api.upload("a%40x.com", "cat.png", b"\x89PNG").await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["file"]["path"], "a_at_x_com_folder/cat.png");
        assert_eq!(body["file"]["uploadedBy"], "Ann Lee");
        assert_eq!(body["file"]["private"], false);
        api.upload("b%40x.com", "dog.png", b"\x89PNG").await;

        let (status, body) = api
            .send(api.client.get(api.url("/api/identities/a%40x.com/files")))
            .await;
        assert_eq!(status, StatusCode::OK);
        let files = body["files"]
            .as_array()
            .unwrap_or_else(|| panic!("files should be an array: {body}"));
        assert_eq!(files.len(), 1);
        assert_eq!(files[0]["path"], "a_at_x_com_folder/cat.png");
        assert_eq!(files[0]["contentType"], "image/png");
        assert_eq!(files[0]["size"], 4);

        let (status, body) = api.delete("a_at_x_com_folder/cat.png", "b@x.com").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "PermissionDenied");
        assert!(h.blobs.get("a_at_x_com_folder/cat.png").is_some());

        let (status, body) = api.delete("a_at_x_com_folder/cat.png", "a@x.com").await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["deletedPath"], "a_at_x_com_folder/cat.png");

        let (_, body) = api.send(api.client.get(api.url("/api/files"))).await;
        assert_eq!(body["files"], json!([{
            "path": "b_at_x_com_folder/dog.png",
            "size": 4,
            "contentType": "image/png",
        }]));
    }

    #[tokio::test]
    async fn test_should_map_errors_to_status_codes() {
        let h = Harness::new();
        let api = Api::new(spawn_http(h.service.clone()).await);

        api.register("Ann", "Lee", "a@x.com").await;
        let (status, body) = api.register("Ann", "Lee", "a@x.com").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "AlreadyExists");

        let (status, body) = api.register("", "Lee", "c@x.com").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "InvalidArgument");

        let (status, _) = api.upload("a%40x.com", "", b"x").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = api.upload("ghost%40x.com", "cat.png", b"x").await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{body}");

        let (status, body) = api.delete("a_at_x_com_folder/none.png", "a@x.com").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NotFound");

        let (status, body) = api.send(api.client.get(api.url("/api/nowhere"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);

        let (status, _) = api.send(api.client.put(api.url("/api/files"))).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_should_report_health_with_request_id() {
        let h = Harness::enforcing();
        let api = Api::new(spawn_http(h.service.clone()).await);

        let response = api
            .client
            .get(api.url("/health"))
            .send()
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(response.status(), StatusCode::OK);
        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .unwrap_or_else(|| panic!("missing x-request-id"));
        assert!(!request_id.is_empty());

        let body: Value = response.json().await.unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(body["status"], "ok");
        assert_eq!(body["policyEnforcement"], true);
    }

    #[tokio::test]
    async fn test_should_reject_oversized_upload() {
        let mut config = crate::test_config(false);
        config.max_upload_size = 4;
        let h = Harness::with_config(config);
        h.register("a@x.com").await;
        let api = Api::new(spawn_http(h.service.clone()).await);

        let (status, body) = api.upload("a%40x.com", "big.bin", b"0123456789").await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["code"], "PayloadTooLarge");
        assert_eq!(h.blobs.write_count(), 0);
    }
}
