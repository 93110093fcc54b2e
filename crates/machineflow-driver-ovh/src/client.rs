//! OVH API client
//!
//! Direct implementation of the OVH signed-request scheme over reqwest.
//! Each request carries the application key, the consumer key, a timestamp
//! aligned on the API server clock and a SHA1 signature of the request.

use crate::api::{
    CloudApi, Flavor, Image, Instance, InstanceRequest, Network, Project, RebootRequest, SshKey,
    SshKeyRequest,
};
use crate::credentials::Credentials;
use crate::error::{OvhError, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha1::{Digest, Sha1};
use tokio::sync::OnceCell;

/// Compute the `X-Ovh-Signature` header value
pub fn sign_request(
    application_secret: &str,
    consumer_key: &str,
    method: &str,
    url: &str,
    body: &str,
    timestamp: i64,
) -> String {
    let payload = format!(
        "{}+{}+{}+{}+{}+{}",
        application_secret, consumer_key, method, url, body, timestamp
    );
    let mut hasher = Sha1::new();
    hasher.update(payload.as_bytes());
    format!("$1${}", hex::encode(hasher.finalize()))
}

/// Treat a "404 Not Found" answer as success
pub fn ignore_not_found(result: Result<()>) -> Result<()> {
    match result {
        Err(e) if e.is_not_found() => {
            tracing::debug!("Resource already absent: {}", e);
            Ok(())
        }
        other => other,
    }
}

/// OVH API client
pub struct OvhClient {
    http: reqwest::Client,
    credentials: Credentials,
    /// Server time minus local time, fetched on first signed call
    time_delta: OnceCell<i64>,
}

impl OvhClient {
    /// Create a new client
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::build(credentials, reqwest::Client::builder())
    }

    fn build(credentials: Credentials, builder: reqwest::ClientBuilder) -> Result<Self> {
        let http = builder
            .user_agent(concat!("machineflow/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            credentials,
            time_delta: OnceCell::new(),
        })
    }

    /// Get the API base URL
    pub fn endpoint(&self) -> &str {
        &self.credentials.endpoint
    }

    async fn time_delta(&self) -> Result<i64> {
        let delta = self
            .time_delta
            .get_or_try_init(|| async {
                let url = format!("{}/auth/time", self.credentials.endpoint);
                let response = self.http.get(&url).send().await?;
                let server_time: i64 = parse_response(response).await?;
                let delta = server_time - chrono::Utc::now().timestamp();
                tracing::debug!("OVH API clock delta: {}s", delta);
                Ok::<i64, OvhError>(delta)
            })
            .await?;
        Ok(*delta)
    }

    async fn call<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.credentials.endpoint, path);
        let body = match body {
            Some(b) => serde_json::to_string(b)?,
            None => String::new(),
        };

        let timestamp = chrono::Utc::now().timestamp() + self.time_delta().await?;

        let signature = sign_request(
            &self.credentials.application_secret,
            &self.credentials.consumer_key,
            method.as_str(),
            &url,
            &body,
            timestamp,
        );

        let mut request = self
            .http
            .request(method.clone(), &url)
            .header("Accept", "application/json")
            .header("X-Ovh-Application", &self.credentials.application_key)
            .header("X-Ovh-Consumer", &self.credentials.consumer_key)
            .header("X-Ovh-Timestamp", timestamp.to_string())
            .header("X-Ovh-Signature", signature);

        if !body.is_empty() {
            request = request.header("Content-Type", "application/json").body(body);
        }

        tracing::debug!("{} {}", method, url);
        let response = request.send().await?;
        parse_response(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.call::<(), T>(Method::GET, path, None).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        self.call(Method::POST, path, Some(body)).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.call::<(), serde_json::Value>(Method::DELETE, path, None)
            .await
            .map(|_| ())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ApiErrorBody>(&text)
            .map(|e| e.message)
            .unwrap_or_else(|_| text.trim().to_string());
        return Err(OvhError::Api {
            status: status.as_u16(),
            message,
        });
    }

    decode_body(&text)
}

/// Decode a successful body, treating an empty body as JSON `null`
fn decode_body<T: DeserializeOwned>(text: &str) -> Result<T> {
    let text = if text.trim().is_empty() { "null" } else { text };
    Ok(serde_json::from_str(text)?)
}

#[async_trait]
impl CloudApi for OvhClient {
    async fn list_projects(&self) -> Result<Vec<String>> {
        self.get("/cloud/project").await
    }

    async fn get_project(&self, project_id: &str) -> Result<Project> {
        self.get(&format!("/cloud/project/{}", project_id)).await
    }

    async fn list_regions(&self, project_id: &str) -> Result<Vec<String>> {
        self.get(&format!("/cloud/project/{}/region", project_id)).await
    }

    async fn list_flavors(&self, project_id: &str, region: &str) -> Result<Vec<Flavor>> {
        self.get(&format!(
            "/cloud/project/{}/flavor?region={}",
            project_id, region
        ))
        .await
    }

    async fn list_images(&self, project_id: &str, region: &str) -> Result<Vec<Image>> {
        self.get(&format!(
            "/cloud/project/{}/image?osType=linux&region={}",
            project_id, region
        ))
        .await
    }

    async fn list_ssh_keys(&self, project_id: &str, region: &str) -> Result<Vec<SshKey>> {
        self.get(&format!(
            "/cloud/project/{}/sshkey?region={}",
            project_id, region
        ))
        .await
    }

    async fn list_networks(&self, project_id: &str, private: bool) -> Result<Vec<Network>> {
        let kind = if private { "private" } else { "public" };
        self.get(&format!("/cloud/project/{}/network/{}", project_id, kind))
            .await
    }

    async fn create_ssh_key(&self, project_id: &str, name: &str, public_key: &str) -> Result<SshKey> {
        let request = SshKeyRequest { name, public_key };
        self.post(&format!("/cloud/project/{}/sshkey", project_id), &request)
            .await
    }

    async fn delete_ssh_key(&self, project_id: &str, key_id: &str) -> Result<()> {
        ignore_not_found(
            self.delete(&format!("/cloud/project/{}/sshkey/{}", project_id, key_id))
                .await,
        )
    }

    async fn create_instance(&self, project_id: &str, request: &InstanceRequest) -> Result<Instance> {
        self.post(&format!("/cloud/project/{}/instance", project_id), request)
            .await
    }

    async fn get_instance(&self, project_id: &str, instance_id: &str) -> Result<Instance> {
        self.get(&format!(
            "/cloud/project/{}/instance/{}",
            project_id, instance_id
        ))
        .await
    }

    async fn reboot_instance(&self, project_id: &str, instance_id: &str, hard: bool) -> Result<()> {
        let _: serde_json::Value = self
            .post(
                &format!(
                    "/cloud/project/{}/instance/{}/reboot",
                    project_id, instance_id
                ),
                &RebootRequest::new(hard),
            )
            .await?;
        Ok(())
    }

    async fn delete_instance(&self, project_id: &str, instance_id: &str) -> Result<()> {
        ignore_not_found(
            self.delete(&format!(
                "/cloud/project/{}/instance/{}",
                project_id, instance_id
            ))
            .await,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_request() {
        let signature = sign_request(
            "secret",
            "consumer",
            "GET",
            "https://eu.api.ovh.com/1.0/cloud/project",
            "",
            1_700_000_000,
        );

        let mut hasher = Sha1::new();
        hasher.update(
            b"secret+consumer+GET+https://eu.api.ovh.com/1.0/cloud/project++1700000000".as_slice(),
        );
        let expected = format!("$1${}", hex::encode(hasher.finalize()));

        assert_eq!(signature, expected);
        assert!(signature.starts_with("$1$"));
        assert_eq!(signature.len(), 3 + 40);
    }

    #[test]
    fn test_signature_covers_body() {
        let a = sign_request("s", "c", "POST", "https://x/1.0/a", "{}", 1);
        let b = sign_request("s", "c", "POST", "https://x/1.0/a", r#"{"a":1}"#, 1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_ignore_not_found() {
        let gone = Err(OvhError::Api {
            status: 404,
            message: "This object does not exist".to_string(),
        });
        assert!(ignore_not_found(gone).is_ok());
        assert!(ignore_not_found(Ok(())).is_ok());

        let forbidden = Err(OvhError::Api {
            status: 403,
            message: "This call has not been granted".to_string(),
        });
        assert!(matches!(
            ignore_not_found(forbidden),
            Err(OvhError::Api { status: 403, .. })
        ));
    }

    #[test]
    fn test_decode_empty_body() {
        let value: serde_json::Value = decode_body("").unwrap();
        assert!(value.is_null());
        decode_body::<()>("null").unwrap();

        let ids: Vec<String> = decode_body(r#"["pr-1","pr-2"]"#).unwrap();
        assert_eq!(ids, vec!["pr-1", "pr-2"]);
    }

    #[test]
    fn test_client_endpoint() {
        let client = OvhClient::new(Credentials {
            endpoint: "https://eu.api.ovh.com/1.0".to_string(),
            application_key: "ak".to_string(),
            application_secret: "as".to_string(),
            consumer_key: "ck".to_string(),
        })
        .unwrap();
        assert_eq!(client.endpoint(), "https://eu.api.ovh.com/1.0");
    }

    mod http {
        use super::*;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::{TcpListener, TcpStream};
        use tokio::task::JoinHandle;

        /// Answer one connection per canned response, in order, and return
        /// the raw requests received
        async fn serve(responses: Vec<(u16, String)>) -> (String, JoinHandle<Vec<String>>) {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();

            let handle = tokio::spawn(async move {
                let mut requests = Vec::new();
                for (status, body) in responses {
                    let (mut stream, _) = listener.accept().await.unwrap();
                    requests.push(read_request(&mut stream).await);

                    let response = format!(
                        "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    stream.write_all(response.as_bytes()).await.unwrap();
                    stream.shutdown().await.unwrap();
                }
                requests
            });

            (format!("http://{}", addr), handle)
        }

        async fn read_request(stream: &mut TcpStream) -> String {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);

                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = header(&text, "content-length")
                        .map(|v| v.parse::<usize>().unwrap())
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + length {
                        break;
                    }
                }
            }
            String::from_utf8_lossy(&buf).to_string()
        }

        fn header(request: &str, name: &str) -> Option<String> {
            request
                .split("\r\n\r\n")
                .next()?
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(key, _)| key.trim().eq_ignore_ascii_case(name))
                .map(|(_, value)| value.trim().to_string())
        }

        fn body(request: &str) -> &str {
            request.split_once("\r\n\r\n").map(|(_, b)| b).unwrap_or("")
        }

        fn client(endpoint: &str) -> OvhClient {
            OvhClient::build(
                Credentials {
                    endpoint: endpoint.to_string(),
                    application_key: "ak".to_string(),
                    application_secret: "as".to_string(),
                    consumer_key: "ck".to_string(),
                },
                reqwest::Client::builder().no_proxy(),
            )
            .unwrap()
        }

        fn server_time(offset: i64) -> (u16, String) {
            (200, (chrono::Utc::now().timestamp() + offset).to_string())
        }

        #[tokio::test]
        async fn test_requests_are_signed_with_server_time() {
            let (endpoint, server) = serve(vec![
                server_time(100),
                (200, r#"["pr-1"]"#.to_string()),
                (
                    200,
                    r#"{"id":"k-7","name":"web-01-key","publicKey":"ssh-ed25519 AAAA"}"#
                        .to_string(),
                ),
            ])
            .await;
            let client = client(&endpoint);

            assert_eq!(client.list_projects().await.unwrap(), vec!["pr-1"]);
            let key = client
                .create_ssh_key("pr-1", "web-01-key", "ssh-ed25519 AAAA")
                .await
                .unwrap();
            assert_eq!(key.id, "k-7");

            let requests = server.await.unwrap();
            assert_eq!(requests.len(), 3);
            assert!(requests[0].starts_with("GET /auth/time "));
            assert!(header(&requests[0], "x-ovh-signature").is_none());

            let get = &requests[1];
            assert!(get.starts_with("GET /cloud/project "));
            assert_eq!(header(get, "x-ovh-application").as_deref(), Some("ak"));
            assert_eq!(header(get, "x-ovh-consumer").as_deref(), Some("ck"));
            let timestamp: i64 = header(get, "x-ovh-timestamp").unwrap().parse().unwrap();
            assert!((timestamp - chrono::Utc::now().timestamp() - 100).abs() <= 5);
            assert_eq!(
                header(get, "x-ovh-signature").unwrap(),
                sign_request(
                    "as",
                    "ck",
                    "GET",
                    &format!("{}/cloud/project", endpoint),
                    "",
                    timestamp
                )
            );

            let post = &requests[2];
            assert!(post.starts_with("POST /cloud/project/pr-1/sshkey "));
            assert_eq!(
                header(post, "content-type").as_deref(),
                Some("application/json")
            );
            let sent: serde_json::Value = serde_json::from_str(body(post)).unwrap();
            assert_eq!(sent["name"], "web-01-key");
            assert_eq!(sent["publicKey"], "ssh-ed25519 AAAA");
            let timestamp: i64 = header(post, "x-ovh-timestamp").unwrap().parse().unwrap();
            assert_eq!(
                header(post, "x-ovh-signature").unwrap(),
                sign_request(
                    "as",
                    "ck",
                    "POST",
                    &format!("{}/cloud/project/pr-1/sshkey", endpoint),
                    body(post),
                    timestamp
                )
            );
        }

        #[tokio::test]
        async fn test_error_responses_map_to_api_errors() {
            let (endpoint, server) = serve(vec![
                server_time(0),
                (403, r#"{"message":"This call has not been granted"}"#.to_string()),
                (500, "upstream exploded".to_string()),
            ])
            .await;
            let client = client(&endpoint);

            let err = client.list_regions("pr-1").await.unwrap_err();
            assert!(matches!(
                err,
                OvhError::Api { status: 403, ref message } if message == "This call has not been granted"
            ));

            let err = client.list_projects().await.unwrap_err();
            assert!(matches!(
                err,
                OvhError::Api { status: 500, ref message } if message == "upstream exploded"
            ));

            // The clock delta is fetched once
            assert_eq!(server.await.unwrap().len(), 3);
        }

        #[tokio::test]
        async fn test_deletes_are_idempotent() {
            let (endpoint, server) = serve(vec![
                server_time(0),
                (200, String::new()),
                (404, r#"{"message":"This object does not exist"}"#.to_string()),
                (200, "null".to_string()),
                (404, r#"{"message":"This object does not exist"}"#.to_string()),
                (200, String::new()),
            ])
            .await;
            let client = client(&endpoint);

            client.delete_instance("pr-1", "i-1").await.unwrap();
            client.delete_instance("pr-1", "i-1").await.unwrap();
            client.delete_ssh_key("pr-1", "k-7").await.unwrap();
            client.delete_ssh_key("pr-1", "k-7").await.unwrap();
            client.reboot_instance("pr-1", "i-1", false).await.unwrap();

            let requests = server.await.unwrap();
            assert!(requests[1].starts_with("DELETE /cloud/project/pr-1/instance/i-1 "));
            assert!(requests[3].starts_with("DELETE /cloud/project/pr-1/sshkey/k-7 "));
            assert!(requests[5].starts_with("POST /cloud/project/pr-1/instance/i-1/reboot "));
            assert_eq!(body(&requests[5]), r#"{"type":"soft"}"#);
        }

        #[tokio::test]
        async fn test_project_scan_tolerates_unnamed_project() {
            let (endpoint, _server) = serve(vec![
                server_time(0),
                (200, r#"["pr-0","pr-1"]"#.to_string()),
                (200, r#"{"project_id":"pr-0","description":null,"status":"ok"}"#.to_string()),
                (200, r#"{"project_id":"pr-1","description":"acme","status":"ok"}"#.to_string()),
            ])
            .await;
            let client = client(&endpoint);

            let project = client.get_project_by_name("acme").await.unwrap();
            assert_eq!(project.id, "pr-1");
        }
    }
}
