//! 测试公共模块
//!
//! 按顺序回放预先写好的响应, 并记录收到的每个请求, 不访问真实的教务系统。

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use rsa::{RsaPrivateKey, traits::PublicKeyParts};
use tokio::sync::Mutex;
use zfn_scraper::{Client, ClientConfig, PortalError, PortalRequest, PortalResponse, Transport};

pub const BASE_URL: &str = "http://jw.example.edu.cn/jwglxt/";

/// 已发出的请求记录
pub type RequestLog = Arc<Mutex<Vec<PortalRequest>>>;

/// 脚本化的传输层
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<PortalResponse, PortalError>>>,
    requests: RequestLog,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self { responses: Mutex::new(VecDeque::new()), requests: Arc::new(Mutex::new(Vec::new())) }
    }

    /// 追加一个响应
    pub fn then(self, response: PortalResponse) -> Self {
        self.responses.try_lock().expect("构造期间无竞争").push_back(Ok(response));
        self
    }

    /// 追加一个 200 响应
    pub fn ok(self, body: impl Into<Vec<u8>>) -> Self {
        self.then(PortalResponse::new(200, body))
    }

    /// 追加一个传输层错误
    pub fn fail(self, err: PortalError) -> Self {
        self.responses.try_lock().expect("构造期间无竞争").push_back(Err(err));
        self
    }

    pub fn log(&self) -> RequestLog {
        Arc::clone(&self.requests)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: PortalRequest) -> Result<PortalResponse, PortalError> {
        let path = request.url.path().to_string();
        self.requests.lock().await.push(request);
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(PortalError::Transport(format!("没有为 {} 准备响应", path))))
    }
}

/// 用脚本化传输层创建客户端, 同时返回请求记录
pub fn client(transport: ScriptedTransport) -> (Client, RequestLog) {
    client_with(ClientConfig::new(BASE_URL), transport)
}

/// 用指定配置创建客户端
pub fn client_with(config: ClientConfig, transport: ScriptedTransport) -> (Client, RequestLog) {
    let log = transport.log();
    let client = Client::with_transport(config, transport).unwrap();
    (client, log)
}

/// 测试用 RSA 密钥, 以及 base64 编码的模数和指数
pub fn rsa_key() -> (RsaPrivateKey, String, String) {
    let key = RsaPrivateKey::new(&mut rand::thread_rng(), 512).unwrap();
    let modulus = STANDARD.encode(key.n().to_bytes_be());
    let exponent = STANDARD.encode(key.e().to_bytes_be());
    (key, modulus, exponent)
}

pub fn public_key_json(modulus: &str, exponent: &str) -> String {
    format!(r#"{{"modulus":"{}","exponent":"{}"}}"#, modulus, exponent)
}

pub fn login_page(with_kaptcha: bool) -> String {
    let kaptcha = if with_kaptcha { r#"<input type="text" id="yzm" name="yzm">"# } else { "" };
    format!(
        r#"<html><body><form id="loginForm"><input type="hidden" id="csrftoken" name="csrftoken" value="csrf-123"><input id="yhm" name="yhm"><input id="mm" name="mm">{}</form></body></html>"#,
        kaptcha
    )
}

pub fn tips_page(tips: &str) -> String {
    format!(r#"<html><body><div><p id="tips" class="bg_danger sl_danger">{}</p></div></body></html>"#, tips)
}

/// 会话失效时教务系统返回的登录页
pub const LOGIN_PROMPT: &str = r#"<html><body><div class="col-sm-12"><h5>用户登录</h5></div></body></html>"#;
