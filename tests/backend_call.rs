use sql_tutor::config::GenOptions;
use sql_tutor::error::TutorError;
use sql_tutor::generator::QueryGenerator;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve exactly one HTTP response on a local port and return the host URL.
async fn spawn_backend(status_line: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {status_line}\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
    });
    format!("http://{addr}")
}

/// Drain the full request (headers plus Content-Length body) before replying.
async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut data = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            return;
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&data[..pos]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            while data.len() < pos + 4 + content_length {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    return;
                }
                data.extend_from_slice(&buf[..n]);
            }
            return;
        }
    }
}

fn sql_generator(host: &str) -> QueryGenerator {
    QueryGenerator::new(host, "test-model", GenOptions::sql_defaults(64), "MySQL", true)
}

#[tokio::test]
async fn test_error_status_propagates_instead_of_formatting_the_body() {
    let host = spawn_backend("404 Not Found", r#"{"error":"model 'test-model' not found"}"#).await;

    let result = sql_generator(&host).generate("dame los estudiantes").await;
    let err = result.expect_err("a service error must not become SQL");
    assert!(matches!(err, TutorError::Backend(_)));
    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn test_successful_response_is_extracted_and_postprocessed() {
    let body = r#"{"model":"test-model","message":{"role":"assistant","content":"```sql\nselect nombre from estudiantes;\n```"}}"#;
    let host = spawn_backend("200 OK", body).await;

    let sql = sql_generator(&host)
        .generate("dame los nombres")
        .await
        .unwrap();
    assert_eq!(sql, "SELECT nombre\nFROM estudiantes;");
}
