//! 登录状态机。
//!
//! `Start → CsrfFetched → {PasswordOnly, KaptchaRequired} → {LoggedIn, WrongCredentials, WrongKaptcha, Error}`
//!
//! 没有验证码时一次完成登录; 有验证码时第一步只返回 `KaptchaChallenge`,
//! 由调用方识别验证码后调用 [`login_with_kaptcha`] 完成第二步。

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::Local;
use scraper::Html;
use serde::Deserialize;

use crate::crypto::encrypt_password;
use crate::envelope::{Envelope, Operation};
use crate::http::{Method, PortalResponse, params};
use crate::models::{Cookies, KaptchaChallenge, LoginData, LoginPayload, PortalError};
use crate::page;
use crate::session::{LOGIN_PATH, Session};

const PUBLIC_KEY_PATH: &str = "xtgl/login_getPublicKey.html";
const KAPTCHA_PATH: &str = "kaptcha";

const SESSION_COOKIE: &str = "JSESSIONID";
const ROUTE_COOKIE: &str = "route";

const LOGIN: Operation = Operation::new("登录", "登录成功");
const FETCH_KAPTCHA: Operation = Operation::new("获取验证码", "获取验证码成功");
const KAPTCHA_LOGIN: Operation = Operation::new("验证码登录", "登录成功").with_timeout("登录");

/// 登录页提供的 RSA 公钥
#[derive(Debug, Clone, Deserialize)]
pub struct PublicKey {
    pub modulus: String,
    pub exponent: String,
}

/// 已取得 csrftoken 与公钥的中间状态
#[derive(Debug, Clone)]
pub(crate) struct Handshake {
    csrf_token: String,
    snapshot: Cookies,  // 取公钥之前的 cookie
    jar: Cookies,       // 截至目前累计的 cookie
    public_key: PublicKey,
}

#[derive(Debug, Clone)]
pub(crate) enum Prelogin {
    PasswordOnly(Handshake),
    KaptchaRequired(Handshake),
}

// 把响应里的 cookie 合并进当前累计的 cookie
fn absorb(jar: &mut Cookies, response: &PortalResponse) {
    jar.extend(response.cookies.iter().map(|(k, v)| (k.clone(), v.clone())));
}

/// 从登录页读取 csrftoken, 并判断是否有验证码输入框
pub(crate) fn inspect_login_page(body: &str) -> Result<(String, bool), PortalError> {
    let document = Html::parse_document(body);
    let token = page::attr(&document, "#csrftoken", "value")?
        .ok_or_else(|| PortalError::parse("登录页缺少 csrftoken"))?;
    let needs_kaptcha = page::exists(&document, "input#yzm")?;
    Ok((token, needs_kaptcha))
}

/// 根据登录后的提示判断结果, 没有提示即为成功
pub(crate) fn classify_tips(body: &str, with_kaptcha: bool) -> Result<(), PortalError> {
    let document = Html::parse_document(body);
    let tips = page::select_text(&document, "p#tips")?.unwrap_or_default();
    if tips.is_empty() {
        return Ok(());
    }
    if with_kaptcha && tips.contains("验证码") {
        return Err(PortalError::WrongKaptcha);
    }
    if tips.contains("用户名或密码") {
        return Err(PortalError::WrongCredentials);
    }
    Err(PortalError::Upstream(tips))
}

/// 负载均衡会把会话绑定到 route cookie; 验证码登录后如果没有下发新的 route,
/// 就沿用验证码之前的 route 和新的 JSESSIONID
pub fn reconcile_route_cookie(fresh: Cookies, previous: &Cookies) -> Cookies {
    match (fresh.contains_key(ROUTE_COOKIE), previous.get(ROUTE_COOKIE)) {
        (false, Some(route)) => {
            let mut cookies = Cookies::new();
            if let Some(sid) = fresh.get(SESSION_COOKIE).or_else(|| previous.get(SESSION_COOKIE)) {
                cookies.insert(SESSION_COOKIE.to_string(), sid.clone());
            }
            cookies.insert(ROUTE_COOKIE.to_string(), route.clone());
            cookies
        }
        _ if fresh.is_empty() => previous.clone(),
        _ => fresh,
    }
}

pub(crate) async fn prepare(session: &Session) -> Result<Prelogin, PortalError> {
    let mut jar = Cookies::new();

    let login_page = session.send(session.request(Method::Get, LOGIN_PATH)?.cookies(jar.clone())).await?;
    login_page.ensure_ok()?;
    absorb(&mut jar, &login_page);
    let (csrf_token, needs_kaptcha) = inspect_login_page(&login_page.text())?;
    let snapshot = jar.clone();

    let key_response = session.send(session.request(Method::Get, PUBLIC_KEY_PATH)?.cookies(jar.clone())).await?;
    absorb(&mut jar, &key_response);
    let public_key: PublicKey = key_response.json()?;

    let handshake = Handshake { csrf_token, snapshot, jar, public_key };
    log::debug!("登录页已解析, 需要验证码: {}", needs_kaptcha);
    Ok(if needs_kaptcha { Prelogin::KaptchaRequired(handshake) } else { Prelogin::PasswordOnly(handshake) })
}

pub(crate) async fn submit_password(
    session: &Session,
    handshake: Handshake,
    sid: &str,
    password: &str,
) -> Result<Cookies, PortalError> {
    let Handshake { csrf_token, mut jar, public_key, .. } = handshake;
    let encrypted = encrypt_password(password, &public_key.modulus, &public_key.exponent)?;
    let form = params([("csrftoken", csrf_token), ("yhm", sid.to_string()), ("mm", encrypted)]);

    let response = session.send(session.request(Method::Post, LOGIN_PATH)?.cookies(jar.clone()).form(form)).await?;
    response.ensure_ok()?;
    classify_tips(&response.text(), false)?;

    absorb(&mut jar, &response);
    Ok(jar)
}

pub(crate) async fn fetch_kaptcha(
    session: &Session,
    handshake: Handshake,
    sid: &str,
    password: &str,
) -> Result<KaptchaChallenge, PortalError> {
    let response = session
        .send(session.request(Method::Get, KAPTCHA_PATH)?.cookies(handshake.jar.clone()))
        .await?;
    response.ensure_ok()?;
    if response.body.is_empty() {
        return Err(PortalError::parse("验证码图片为空"));
    }

    Ok(KaptchaChallenge {
        sid: sid.to_string(),
        csrf_token: handshake.csrf_token,
        cookies: handshake.snapshot,
        password: password.to_string(),
        modulus: handshake.public_key.modulus,
        exponent: handshake.public_key.exponent,
        kaptcha_pic: STANDARD.encode(&response.body),
        timestamp: Local::now(),
    })
}

pub(crate) async fn submit_kaptcha(
    session: &Session,
    challenge: KaptchaChallenge,
    kaptcha: &str,
) -> Result<Cookies, PortalError> {
    // 使用验证码页面给出的公钥, 而不是重新获取
    let encrypted = encrypt_password(&challenge.password, &challenge.modulus, &challenge.exponent)?;
    let form = params([
        ("csrftoken", challenge.csrf_token.clone()),
        ("yhm", challenge.sid.clone()),
        ("mm", encrypted),
        ("yzm", kaptcha.to_string()),
    ]);

    let request = session.request(Method::Post, LOGIN_PATH)?.cookies(challenge.cookies.clone()).form(form);
    let response = session.send(request).await?;
    response.ensure_ok()?;
    classify_tips(&response.text(), true)?;

    Ok(reconcile_route_cookie(response.cookies, &challenge.cookies))
}

/// 第一步登录: 成功时替换会话 cookie; 需要验证码时返回 1001 且不改变会话
pub async fn login(session: &mut Session, sid: &str, password: &str) -> Envelope<LoginPayload> {
    let prelogin = match prepare(session).await {
        Ok(prelogin) => prelogin,
        Err(err) => return LOGIN.fail(err),
    };

    match prelogin {
        Prelogin::PasswordOnly(handshake) => match submit_password(session, handshake, sid, password).await {
            Ok(cookies) => {
                session.replace_cookies(cookies.clone());
                LOGIN.finish(Ok(LoginPayload::Session(LoginData { cookies })))
            }
            Err(err) => LOGIN.fail(err),
        },
        Prelogin::KaptchaRequired(handshake) => match fetch_kaptcha(session, handshake, sid, password).await {
            Ok(challenge) => Envelope::kaptcha("获取验证码成功", LoginPayload::Kaptcha(challenge)),
            Err(err) => FETCH_KAPTCHA.fail(err),
        },
    }
}

/// 第二步登录: 消费第一步返回的凭据包
pub async fn login_with_kaptcha(session: &mut Session, challenge: KaptchaChallenge, kaptcha: &str) -> Envelope<LoginPayload> {
    match submit_kaptcha(session, challenge, kaptcha).await {
        Ok(cookies) => {
            session.replace_cookies(cookies.clone());
            KAPTCHA_LOGIN.finish(Ok(LoginPayload::Session(LoginData { cookies })))
        }
        Err(err) => KAPTCHA_LOGIN.fail(err),
    }
}
