//! HTTP 传输层: 教务系统请求与响应的最小抽象, 以及基于 reqwest 的实现。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Client,
    header::{COOKIE, HeaderMap, HeaderValue, LOCATION},
    redirect::Policy,
};
use serde::de::DeserializeOwned;
use url::Url;

use crate::models::{Cookies, PortalError};

// 教务系统登录会经过几次 302, 这里自己跟随以便收集每一跳的 Set-Cookie
const MAX_REDIRECTS: usize = 10;

/// 表单或查询参数
pub type Params = Vec<(String, String)>;

/// 把 `[("k", v)]` 形式的字面量转换成 `Params`
pub fn params<K, V, I>(pairs: I) -> Params
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct PortalRequest {
    pub method: Method,
    pub url: Url,
    pub query: Params,
    pub form: Params,
    pub headers: HeaderMap,
    pub cookies: Cookies,
    pub timeout: Duration,
}

impl PortalRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            query: Params::new(),
            form: Params::new(),
            headers: HeaderMap::new(),
            cookies: Cookies::new(),
            timeout: Duration::from_secs(3),
        }
    }

    pub fn query(mut self, query: Params) -> Self {
        self.query = query;
        self
    }

    pub fn form(mut self, form: Params) -> Self {
        self.form = form;
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn cookies(mut self, cookies: Cookies) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 表单里某个字段的值, 测试与日志用
    pub fn form_value(&self, key: &str) -> Option<&str> {
        self.form.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct PortalResponse {
    pub status: u16,
    pub body: Vec<u8>,
    /// 本次请求(含重定向)中服务器下发的 cookie
    pub cookies: Cookies,
}

impl PortalResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, body: body.into(), cookies: Cookies::new() }
    }

    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.insert(name.to_string(), value.to_string());
        self
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, PortalError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn ensure_ok(&self) -> Result<(), PortalError> {
        if self.status == 200 { Ok(()) } else { Err(PortalError::Unavailable(self.status)) }
    }
}

/// 发送请求的能力。默认实现是 `ReqwestTransport`, 测试时可以替换成脚本化的假实现
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: PortalRequest) -> Result<PortalResponse, PortalError>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str) -> Result<Self, PortalError> {
        // cookie 由会话自己管理, 重定向也自己跟随
        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(Policy::none())
            .build()?;
        Ok(Self { client })
    }
}

fn cookie_header(cookies: &Cookies) -> Result<HeaderValue, PortalError> {
    let joined = cookies
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("; ");
    HeaderValue::from_str(&joined).map_err(|e| PortalError::Transport(e.to_string()))
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: PortalRequest) -> Result<PortalResponse, PortalError> {
        let PortalRequest { method, url, query, form, headers, cookies, timeout } = request;
        let mut chain = RedirectChain::new(method, url, cookies);

        loop {
            log::debug!("{:?} {}", chain.method, chain.url);

            let mut builder = match chain.method {
                Method::Get => self.client.get(chain.url.clone()),
                Method::Post => self.client.post(chain.url.clone()).form(&form),
            };
            builder = builder.headers(headers.clone()).timeout(timeout);
            // 查询参数只属于第一跳, Location 里已经带上了后续参数
            if chain.hops == 0 && !query.is_empty() {
                builder = builder.query(&query);
            }
            if !chain.cookies.is_empty() {
                builder = builder.header(COOKIE, cookie_header(&chain.cookies)?);
            }

            let response = builder.send().await?;
            chain.record_cookies(response.cookies().map(|c| (c.name().to_string(), c.value().to_string())));

            let status = response.status().as_u16();
            let location = response.headers().get(LOCATION).and_then(|v| v.to_str().ok());
            if chain.follow(status, location)? {
                continue;
            }

            let body = response.bytes().await?.to_vec();
            return Ok(PortalResponse { status, body, cookies: chain.received });
        }
    }
}

/// 手动跟随重定向时的状态: 当前方法与地址, 以及沿途收到的 cookie
#[derive(Debug)]
pub(crate) struct RedirectChain {
    pub method: Method,
    pub url: Url,
    /// 下一跳要带上的 cookie
    pub cookies: Cookies,
    /// 各跳响应里下发的 cookie
    pub received: Cookies,
    pub hops: usize,
}

impl RedirectChain {
    pub fn new(method: Method, url: Url, cookies: Cookies) -> Self {
        Self { method, url, cookies, received: Cookies::new(), hops: 0 }
    }

    pub fn record_cookies(&mut self, set: impl IntoIterator<Item = (String, String)>) {
        for (name, value) in set {
            self.cookies.insert(name.clone(), value.clone());
            self.received.insert(name, value);
        }
    }

    /// 根据状态码和 Location 决定是否继续; 继续时更新下一跳的地址与方法
    pub fn follow(&mut self, status: u16, location: Option<&str>) -> Result<bool, PortalError> {
        let Some(location) = location.filter(|_| (300..400).contains(&status)) else {
            return Ok(false);
        };
        if self.hops >= MAX_REDIRECTS {
            return Err(PortalError::Transport(format!("重定向次数过多: {}", self.url)));
        }

        self.url = self.url.join(location)?;
        // 301/302/303 之后浏览器改用 GET
        if matches!(status, 301 | 302 | 303) {
            self.method = Method::Get;
        }
        self.hops += 1;
        Ok(true)
    }
}
