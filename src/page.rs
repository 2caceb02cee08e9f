//! 页面选择器小工具。`Html` 不是 `Send`, 只在同步函数里解析, 不跨越 await。

use scraper::{ElementRef, Html, Selector};

use crate::models::PortalError;

/// 创建选择器, 类似隔壁 Beautiful Soup
pub fn selector(css: &str) -> Result<Selector, PortalError> {
    Selector::parse(css).map_err(|e| PortalError::parse(format!("选择器 {}: {}", css, e)))
}

/// 元素的文本, 去掉首尾空白
pub fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// 所有匹配元素的文本
pub fn texts(document: &Html, css: &str) -> Result<Vec<String>, PortalError> {
    let sel = selector(css)?;
    Ok(document.select(&sel).map(|e| element_text(&e)).collect())
}

/// 匹配元素的文本以空格连接; 没有匹配元素时返回 None
pub fn select_text(document: &Html, css: &str) -> Result<Option<String>, PortalError> {
    let found = texts(document, css)?;
    if found.is_empty() {
        return Ok(None);
    }
    Ok(Some(found.join(" ").trim().to_string()))
}

pub fn exists(document: &Html, css: &str) -> Result<bool, PortalError> {
    let sel = selector(css)?;
    Ok(document.select(&sel).next().is_some())
}

/// 第一个匹配元素的属性值
pub fn attr(document: &Html, css: &str, name: &str) -> Result<Option<String>, PortalError> {
    let sel = selector(css)?;
    Ok(document
        .select(&sel)
        .next()
        .and_then(|e| e.value().attr(name))
        .map(str::to_string))
}

/// 页面中所有隐藏表单域 `name=value`
pub fn hidden_inputs(document: &Html) -> Result<Vec<(String, String)>, PortalError> {
    let sel = selector("input[type='hidden']")?;
    Ok(document
        .select(&sel)
        .filter_map(|e| {
            let name = e.value().attr("name")?;
            Some((name.to_string(), e.value().attr("value").unwrap_or_default().to_string()))
        })
        .collect())
}

/// 会话失效时教务系统会返回登录页, 其中 h5 标题为 "用户登录"
pub fn is_login_prompt(body: &str) -> bool {
    let document = Html::parse_document(body);
    matches!(select_text(&document, "h5"), Ok(Some(title)) if title == "用户登录")
}

pub fn ensure_logged_in(body: &str) -> Result<(), PortalError> {
    if is_login_prompt(body) { Err(PortalError::SessionExpired) } else { Ok(()) }
}

/// 错误页的提示: 标题含 "错误" 时读取 `p.error_title`
pub fn error_title(body: &str) -> Result<Option<String>, PortalError> {
    let document = Html::parse_document(body);
    let title = select_text(&document, "title")?.unwrap_or_default();
    if !title.contains("错误") {
        return Ok(None);
    }
    Ok(Some(select_text(&document, "p.error_title")?.unwrap_or_default()))
}

/// 页面带错误提示时转换成 998
pub fn ensure_no_error_page(body: &str) -> Result<(), PortalError> {
    match error_title(body)? {
        Some(message) => Err(PortalError::Upstream(message)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_login_prompt() {
        let body = r#"<html><body><div><h5>用户登录</h5><input id="yhm"></div></body></html>"#;
        assert!(is_login_prompt(body));
        assert!(matches!(ensure_logged_in(body), Err(PortalError::SessionExpired)));
        assert!(!is_login_prompt(r#"{"items": []}"#));
        assert!(!is_login_prompt("<h5>我的课表</h5>"));
    }

    #[test]
    fn error_page_yields_message() {
        let body = "<html><head><title>错误提示</title></head><body><p class=\"error_title\">无功能权限，</p></body></html>";
        assert_eq!(error_title(body).unwrap().as_deref(), Some("无功能权限，"));
        assert!(matches!(ensure_no_error_page(body), Err(PortalError::Upstream(m)) if m == "无功能权限，"));
        assert_eq!(error_title("<title>课表</title>").unwrap(), None);
    }

    #[test]
    fn hidden_inputs_and_attributes() {
        let document = Html::parse_document(
            r#"<form><input type="hidden" name="xqh_id" value="1"><input type="hidden" name="bh_id"><input id="csrftoken" value="tok"></form>"#,
        );
        assert_eq!(
            hidden_inputs(&document).unwrap(),
            vec![("xqh_id".to_string(), "1".to_string()), ("bh_id".to_string(), String::new())]
        );
        assert_eq!(attr(&document, "#csrftoken", "value").unwrap().as_deref(), Some("tok"));
        assert!(exists(&document, "input#csrftoken").unwrap());
        assert!(!exists(&document, "input#yzm").unwrap());
    }
}
