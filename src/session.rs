// 会话上下文: 根地址、cookie、请求头与超时, 实际请求交给 Transport
use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, REFERER};
use url::Url;

use crate::config::{ClientConfig, TimeSlotTable};
use crate::http::{Method, Params, PortalRequest, PortalResponse, Transport};
use crate::models::{Cookies, PortalError};
use crate::page;

pub(crate) const LOGIN_PATH: &str = "xtgl/login_slogin.html";

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3";

pub struct Session {
    transport: Box<dyn Transport>,
    base_url: Url,
    cookies: Cookies,
    headers: HeaderMap,
    timeout: Duration,
    config: ClientConfig,
}

impl Session {
    pub fn new(config: ClientConfig, transport: Box<dyn Transport>) -> Result<Self, PortalError> {
        // 根地址必须以 / 结尾, 否则 join 会丢掉最后一段路径
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;

        // 初始化请求头, Referer 固定为登录页
        let mut headers = HeaderMap::new();
        let login_url = base_url.join(LOGIN_PATH)?;
        headers.insert(
            REFERER,
            HeaderValue::from_str(login_url.as_str()).map_err(|e| PortalError::parse(e.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));

        Ok(Self {
            transport,
            base_url,
            cookies: config.cookies.clone(),
            headers,
            timeout: config.timeout(),
            config,
        })
    }

    pub fn cookies(&self) -> &Cookies {
        &self.cookies
    }

    /// 登录成功后整体替换 cookie
    pub(crate) fn replace_cookies(&mut self, cookies: Cookies) {
        self.cookies = cookies;
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn time_slots(&self) -> &TimeSlotTable {
        &self.config.time_slots
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 拼接接口地址, path 为相对根地址的路径, 可带查询串
    pub fn url(&self, path: &str) -> Result<Url, PortalError> {
        Ok(self.base_url.join(path)?)
    }

    /// 以当前会话的 cookie、请求头和超时构造请求
    pub fn request(&self, method: Method, path: &str) -> Result<PortalRequest, PortalError> {
        Ok(PortalRequest::new(method, self.url(path)?)
            .headers(self.headers.clone())
            .cookies(self.cookies.clone())
            .timeout(self.timeout))
    }

    pub async fn send(&self, request: PortalRequest) -> Result<PortalResponse, PortalError> {
        self.transport.send(request).await
    }

    pub async fn get(&self, path: &str) -> Result<PortalResponse, PortalError> {
        self.send(self.request(Method::Get, path)?).await
    }

    pub async fn post(&self, path: &str, form: Params) -> Result<PortalResponse, PortalError> {
        self.send(self.request(Method::Post, path)?.form(form)).await
    }

    /// 通用检查: 非 200 视为系统故障, 出现登录页视为会话过期
    pub async fn fetch(&self, request: PortalRequest) -> Result<PortalResponse, PortalError> {
        let response = self.send(request).await?;
        response.ensure_ok()?;
        page::ensure_logged_in(&response.text())?;
        Ok(response)
    }

    pub async fn fetch_get(&self, path: &str) -> Result<PortalResponse, PortalError> {
        self.fetch(self.request(Method::Get, path)?).await
    }

    pub async fn fetch_post(&self, path: &str, form: Params) -> Result<PortalResponse, PortalError> {
        self.fetch(self.request(Method::Post, path)?.form(form)).await
    }
}
