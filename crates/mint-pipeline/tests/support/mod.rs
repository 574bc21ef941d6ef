//! Stub inference, storage and JSON-RPC services bound to 127.0.0.1:0

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Minimal JPEG header, served as the "generated" image
pub const JPEG_BYTES: &[u8] = &[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn read_header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// A request received by the inference stub
#[derive(Debug, Clone)]
pub struct InferenceCall {
    pub model: String,
    pub authorization: Option<String>,
    pub accept: Option<String>,
    pub content_type: Option<String>,
    pub body: Value,
}

/// A file received by the storage stub
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub cid: String,
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub api_key: Option<String>,
    pub bytes: Vec<u8>,
}

struct StubInner {
    inference_status: Mutex<u16>,
    inference_calls: Mutex<Vec<InferenceCall>>,
    upload_status: Mutex<u16>,
    omit_cid: Mutex<bool>,
    next_cids: Mutex<VecDeque<String>>,
    uploads: Mutex<Vec<StoredFile>>,
}

/// Inference + storage + gateway stub
#[derive(Clone)]
pub struct StubServices {
    inner: Arc<StubInner>,
    pub base_url: String,
}

impl StubServices {
    pub async fn start() -> Self {
        let inner = Arc::new(StubInner {
            inference_status: Mutex::new(200),
            inference_calls: Mutex::new(Vec::new()),
            upload_status: Mutex::new(200),
            omit_cid: Mutex::new(false),
            next_cids: Mutex::new(VecDeque::new()),
            uploads: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/models/{model}", post(inference_handler))
            .route("/v1/ipfs/upload", post(upload_handler))
            .route("/ipfs/{cid}", get(gateway_handler))
            .with_state(inner.clone());

        let base_url = serve(app).await;
        Self { inner, base_url }
    }

    pub fn model_url(&self, model: &str) -> String {
        format!("{}/models/{}", self.base_url, model)
    }

    pub fn upload_endpoint(&self) -> String {
        format!("{}/v1/ipfs", self.base_url)
    }

    pub fn fail_inference(&self, status: u16) {
        *self.inner.inference_status.lock().unwrap() = status;
    }

    pub fn fail_uploads(&self, status: u16) {
        *self.inner.upload_status.lock().unwrap() = status;
    }

    pub fn omit_cid(&self) {
        *self.inner.omit_cid.lock().unwrap() = true;
    }

    /// Content identifier assigned to the next upload
    pub fn queue_cid(&self, cid: &str) {
        self.inner
            .next_cids
            .lock()
            .unwrap()
            .push_back(cid.to_string());
    }

    pub fn inference_calls(&self) -> Vec<InferenceCall> {
        self.inner.inference_calls.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<StoredFile> {
        self.inner.uploads.lock().unwrap().clone()
    }
}

async fn inference_handler(
    State(inner): State<Arc<StubInner>>,
    Path(model): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    inner.inference_calls.lock().unwrap().push(InferenceCall {
        model,
        authorization: read_header(&headers, "authorization"),
        accept: read_header(&headers, "accept"),
        content_type: read_header(&headers, "content-type"),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    let status = *inner.inference_status.lock().unwrap();
    if status != 200 {
        let code = StatusCode::from_u16(status).unwrap();
        return (code, Json(json!({"error": "Model is currently loading"}))).into_response();
    }

    ([(header::CONTENT_TYPE, "image/jpeg")], JPEG_BYTES.to_vec()).into_response()
}

async fn upload_handler(
    State(inner): State<Arc<StubInner>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let status = *inner.upload_status.lock().unwrap();
    if status != 200 {
        let code = StatusCode::from_u16(status).unwrap();
        return (code, "upload rejected").into_response();
    }

    let mut received = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.unwrap().to_vec();
        received = Some((name, file_name, content_type, bytes));
    }

    let Some((field, file_name, content_type, bytes)) = received else {
        return (StatusCode::BAD_REQUEST, "missing file").into_response();
    };

    let queued = inner.next_cids.lock().unwrap().pop_front();
    let cid = queued.unwrap_or_else(|| {
        let count = inner.uploads.lock().unwrap().len();
        format!("QmStub{}", count + 1)
    });

    inner.uploads.lock().unwrap().push(StoredFile {
        cid: cid.clone(),
        field,
        file_name,
        content_type,
        api_key: read_header(&headers, "x-api-key"),
        bytes,
    });

    if *inner.omit_cid.lock().unwrap() {
        return Json(json!({"name": "image.jpeg"})).into_response();
    }

    Json(json!({"cid": cid, "name": "image.jpeg"})).into_response()
}

async fn gateway_handler(State(inner): State<Arc<StubInner>>, Path(cid): Path<String>) -> Response {
    let uploads = inner.uploads.lock().unwrap();
    match uploads.iter().find(|file| file.cid == cid) {
        Some(file) => {
            let content_type = file
                .content_type
                .clone()
                .unwrap_or_else(|| "application/octet-stream".to_string());
            ([(header::CONTENT_TYPE, content_type)], file.bytes.clone()).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// A transaction received by the JSON-RPC stub
#[derive(Debug, Clone)]
pub struct SentTransaction {
    pub from: String,
    pub to: String,
    pub value: String,
    pub data: String,
}

struct RpcInner {
    accounts: Vec<String>,
    rejection: Option<(i64, String)>,
    pending_polls: Mutex<u32>,
    never_confirm: bool,
    revert: bool,
    stalled_method: Option<&'static str>,
    sent: Mutex<Vec<SentTransaction>>,
    methods: Mutex<Vec<String>>,
}

/// Ethereum JSON-RPC node stub
#[derive(Clone)]
pub struct RpcStub {
    inner: Arc<RpcInner>,
    pub url: String,
}

pub const RPC_TX_HASH: &str = "0x6e0a1f3d9c1b2a4e5f60718293a4b5c6d7e8f90112233445566778899aabbccd";

#[derive(Default)]
pub struct RpcStubOptions {
    pub accounts: Vec<String>,
    pub rejection: Option<(i64, String)>,
    pub pending_polls: u32,
    pub never_confirm: bool,
    pub revert: bool,
    /// Requests for this method never get an answer
    pub stalled_method: Option<&'static str>,
}

impl RpcStub {
    pub async fn start(options: RpcStubOptions) -> Self {
        let inner = Arc::new(RpcInner {
            accounts: options.accounts,
            rejection: options.rejection,
            pending_polls: Mutex::new(options.pending_polls),
            never_confirm: options.never_confirm,
            revert: options.revert,
            stalled_method: options.stalled_method,
            sent: Mutex::new(Vec::new()),
            methods: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/", post(rpc_handler))
            .with_state(inner.clone());

        let url = serve(app).await;
        Self { inner, url }
    }

    pub fn sent(&self) -> Vec<SentTransaction> {
        self.inner.sent.lock().unwrap().clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.inner.methods.lock().unwrap().clone()
    }
}

async fn rpc_handler(State(inner): State<Arc<RpcInner>>, Json(request): Json<Value>) -> Json<Value> {
    let id = request["id"].clone();
    let method = request["method"].as_str().unwrap_or_default().to_string();
    inner.methods.lock().unwrap().push(method.clone());

    if inner.stalled_method == Some(method.as_str()) {
        std::future::pending::<()>().await;
    }

    let result = match method.as_str() {
        "eth_chainId" => json!("0x7a69"),
        "eth_accounts" => json!(inner.accounts),
        "eth_sendTransaction" => {
            if let Some((code, message)) = &inner.rejection {
                return Json(json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {"code": code, "message": message},
                }));
            }
            let tx = &request["params"][0];
            let field = |name: &str| tx[name].as_str().unwrap_or_default().to_string();
            inner.sent.lock().unwrap().push(SentTransaction {
                from: field("from"),
                to: field("to"),
                value: field("value"),
                data: field("data"),
            });
            json!(RPC_TX_HASH)
        }
        "eth_getTransactionReceipt" => {
            let mut pending = inner.pending_polls.lock().unwrap();
            if inner.never_confirm || *pending > 0 {
                *pending = pending.saturating_sub(1);
                Value::Null
            } else {
                let status = if inner.revert { "0x0" } else { "0x1" };
                json!({
                    "transactionHash": RPC_TX_HASH,
                    "blockNumber": "0x10",
                    "status": status,
                })
            }
        }
        _ => {
            return Json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": -32601, "message": "Method not found"},
            }))
        }
    };

    Json(json!({"jsonrpc": "2.0", "id": id, "result": result}))
}
