//! In-process stand-in for the external classifier.

use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::{web, App, HttpResponse, HttpServer};
use futures::StreamExt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone)]
pub enum StubReply {
    Json { status: u16, body: String },
    Delayed(Duration),
}

impl StubReply {
    pub fn json(status: u16, body: &str) -> Self {
        StubReply::Json {
            status,
            body: body.to_string(),
        }
    }

    pub fn delayed(delay: Duration) -> Self {
        StubReply::Delayed(delay)
    }
}

#[derive(Debug, Clone)]
pub struct SeenPart {
    pub field_name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

struct StubState {
    reply: StubReply,
    seen: Arc<Mutex<Vec<SeenPart>>>,
}

pub struct StubClassifier {
    pub base_url: String,
    seen: Arc<Mutex<Vec<SeenPart>>>,
}

impl StubClassifier {
    /// Binds an ephemeral port and serves `POST /predict`. Must be called
    /// from inside an actix system.
    pub fn start(reply: StubReply) -> Self {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let state = web::Data::new(StubState {
            reply,
            seen: seen.clone(),
        });
        let server = HttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .route("/predict", web::post().to(classify))
        })
        .workers(1)
        .disable_signals()
        .bind(("127.0.0.1", 0))
        .expect("bind stub classifier");
        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());
        Self {
            base_url: format!("http://{}", addr),
            seen,
        }
    }

    pub fn requests(&self) -> Vec<SeenPart> {
        self.seen.lock().unwrap().clone()
    }
}

async fn classify(mut payload: Multipart, state: web::Data<StubState>) -> HttpResponse {
    let mut parts = Vec::new();
    while let Some(Ok(mut field)) = payload.next().await {
        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);
        let content_type = field.content_type().map(|mime| mime.to_string());
        let mut bytes = Vec::new();
        while let Some(Ok(chunk)) = field.next().await {
            bytes.extend_from_slice(&chunk);
        }
        parts.push(SeenPart {
            field_name,
            file_name,
            content_type,
            bytes,
        });
    }
    state.seen.lock().unwrap().extend(parts);

    match &state.reply {
        StubReply::Json { status, body } => {
            HttpResponse::build(StatusCode::from_u16(*status).unwrap())
                .content_type("application/json")
                .body(body.clone())
        }
        StubReply::Delayed(delay) => {
            actix_web::rt::time::sleep(*delay).await;
            HttpResponse::Ok()
                .content_type("application/json")
                .body(r#"{"predictions":[]}"#)
        }
    }
}

/// Builds a `multipart/form-data` body. Each part is
/// `(field name, optional file name, optional content type, content)`.
pub fn multipart_body(
    boundary: &str,
    parts: &[(&str, Option<&str>, Option<&str>, &str)],
) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, file_name, content_type, content) in parts {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        match file_name {
            Some(file_name) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    name, file_name
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n", name).as_bytes(),
            ),
        }
        if let Some(content_type) = content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(content.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    body
}
