// 通知消息
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::grades::Paged;
use crate::http::params;
use crate::models::{Notification, PortalError};
use crate::page;
use crate::session::Session;
use crate::utils::{lenient_string, timestamp_millis};

const NOTIFICATION_PATH: &str = "xtgl/index_cxDbsy.html?doType=query";

lazy_static! {
    // 消息内容形如 "调课提醒:您的课程……"
    static ref KIND_AND_CONTENT: Regex = Regex::new(r"(.*):(.*)").expect("消息正则");
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawNotification {
    #[serde(deserialize_with = "lenient_string")]
    pub xxnr: Option<String>,   // 消息内容
    #[serde(deserialize_with = "lenient_string")]
    pub cjsj: Option<String>,   // 创建时间
}

/// 拆分消息类型与内容, 没有冒号时整条作为内容
pub fn split_notification(text: Option<&str>) -> (Option<String>, Option<String>) {
    let Some(text) = text.filter(|t| !t.is_empty()) else {
        return (None, None);
    };
    match KIND_AND_CONTENT.captures(text) {
        Some(c) => (
            c.get(1).map(|m| m.as_str().to_string()),
            c.get(2).map(|m| m.as_str().to_string()),
        ),
        None => (None, Some(text.to_string())),
    }
}

pub fn map_notification(item: &RawNotification) -> Notification {
    let (kind, content) = split_notification(item.xxnr.as_deref());
    Notification { kind, content, create_time: item.cjsj.clone() }
}

pub async fn get_notifications(session: &Session) -> Result<Vec<Notification>, PortalError> {
    let form = params([
        ("sfyy", "0".to_string()),
        ("flag", "1".to_string()),
        ("_search", "false".to_string()),
        ("nd", timestamp_millis()),
        ("queryModel.showCount", "1000".to_string()),
        ("queryModel.currentPage", "1".to_string()),
        ("queryModel.sortName", "cjsj".to_string()),
        ("queryModel.sortOrder", "desc".to_string()),
        ("time", "0".to_string()),
    ]);
    let response = session.fetch_post(NOTIFICATION_PATH, form).await?;
    // 这个接口在会话失效时会跳到错误页
    if page::error_title(&response.text())?.is_some() {
        return Err(PortalError::SessionExpired);
    }

    let notifications: Paged<RawNotification> = response.json()?;
    let items = notifications.items.ok_or_else(PortalError::empty)?;
    Ok(items.iter().map(map_notification).collect())
}
