// 个人信息: 优先走 JSON 接口, 接口返回 null 时解析个人信息页面
use std::collections::HashMap;

use scraper::{ElementRef, Html};
use serde::Deserialize;

use crate::http::params;
use crate::models::{PortalError, StudentInfo};
use crate::page;
use crate::session::Session;
use crate::utils::{lenient_string, present_string};

const INFO_PATH: &str = "xsxxxggl/xsxxwh_cxCkDgxsxx.html?gnmkdm=N100801";
const INFO_PAGE_PATH: &str = "xsxxxggl/xsgrxxwh_cxXsgrxx.html?gnmkdm=N100801";
const STATUS_CHANGE_PATH: &str = "xszbbgl/xszbbgl_cxXszbbsqIndex.html?doType=details&gnmkdm=N106005";

// 没有学籍异动权限时的提示
const NO_PERMISSION: &str = "无功能权限，";
const MISSING: &str = "无";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawInfo {
    #[serde(deserialize_with = "lenient_string")]
    pub xh: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub xm: Option<String>,
    #[serde(deserialize_with = "present_string")]
    pub zsjg_id: Option<Option<String>>,    // 学院
    #[serde(deserialize_with = "lenient_string")]
    pub jg_id: Option<String>,
    #[serde(deserialize_with = "present_string")]
    pub zszyh_id: Option<Option<String>>,   // 专业
    #[serde(deserialize_with = "lenient_string")]
    pub zyh_id: Option<String>,
    #[serde(deserialize_with = "present_string")]
    pub bh_id: Option<Option<String>>,      // 班级
    #[serde(deserialize_with = "lenient_string")]
    pub xjztdm: Option<String>,     // 学籍状态
    #[serde(deserialize_with = "lenient_string")]
    pub rxrq: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub ksh: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub byzx: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub jg: Option<String>,         // 籍贯
    #[serde(deserialize_with = "lenient_string")]
    pub yzbm: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub zzmmm: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub mzm: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub pyccdm: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub sjhm: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub gddh: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub dzyx: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub csrq: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub zjhm: Option<String>,
}

pub fn map_info(raw: RawInfo) -> StudentInfo {
    StudentInfo {
        sid: raw.xh,
        name: raw.xm,
        // 主字段只要出现就用它, 哪怕是 null; 缺失时才取备用字段
        college_name: raw.zsjg_id.unwrap_or(raw.jg_id),
        major_name: raw.zszyh_id.unwrap_or(raw.zyh_id),
        class_name: raw.bh_id.unwrap_or_else(|| raw.xjztdm.clone()),
        status: raw.xjztdm,
        enrollment_date: raw.rxrq,
        candidate_number: raw.ksh,
        graduation_school: raw.byzx,
        domicile: raw.jg,
        postal_code: raw.yzbm,
        politics_status: raw.zzmmm,
        nationality: raw.mzm,
        education: raw.pyccdm,
        phone_number: raw.sjhm,
        parents_number: raw.gddh,
        email: raw.dzyx,
        birthday: raw.csrq,
        id_number: raw.zjhm,
    }
}

fn joined_text(scope: &ElementRef, css: &str) -> Result<String, PortalError> {
    let sel = page::selector(css)?;
    let parts: Vec<String> = scope.select(&sel).map(|e| page::element_text(&e)).collect();
    Ok(parts.join(" ").trim().to_string())
}

/// 读取页面上 "标签: 值" 形式的表单项, 同名标签后者覆盖前者
pub(crate) fn labeled_fields(
    body: &str,
    columns: &[&str],
    value_css: &str,
    label_suffix: &str,
) -> Result<HashMap<String, String>, PortalError> {
    let document = Html::parse_document(body);
    let mut fields = HashMap::new();
    for column in columns {
        let sel = page::selector(column)?;
        for item in document.select(&sel) {
            let label = joined_text(&item, "div.form-group label.col-sm-4.control-label")?;
            let value = joined_text(&item, &format!("div.form-group {}", value_css))?;
            let key = format!("{}{}", label, label_suffix);
            if !key.is_empty() {
                fields.insert(key, value);
            }
        }
    }
    Ok(fields)
}

fn or_missing(fields: &HashMap<String, String>, key: &str) -> Option<String> {
    let value = fields.get(key).filter(|v| !v.is_empty()).cloned();
    Some(value.unwrap_or_else(|| MISSING.to_string()))
}

/// 从个人信息页面整理出基础字段; 学号为空说明当前学期没有学籍数据
pub(crate) fn map_info_page(fields: &HashMap<String, String>) -> Result<StudentInfo, PortalError> {
    if fields.get("学号：").is_some_and(|sid| sid.is_empty()) {
        return Err(PortalError::NoStudentRecord);
    }

    let mut info = StudentInfo {
        sid: or_missing(fields, "学号："),
        name: or_missing(fields, "姓名："),
        domicile: or_missing(fields, "籍贯："),
        phone_number: or_missing(fields, "手机号码："),
        parents_number: Some(MISSING.to_string()),
        email: or_missing(fields, "电子邮箱："),
        politics_status: or_missing(fields, "政治面貌："),
        nationality: or_missing(fields, "民族："),
        ..Default::default()
    };
    if fields.contains_key("学院名称：") {
        info.college_name = or_missing(fields, "学院名称：");
        info.major_name = or_missing(fields, "专业名称：");
        info.class_name = or_missing(fields, "班级名称：");
    }
    Ok(info)
}

/// 学籍异动页面里的学院、专业与班级; 没有权限时返回 None
pub(crate) fn parse_status_change(body: &str) -> Result<Option<HashMap<String, String>>, PortalError> {
    let document = Html::parse_document(body);
    if page::select_text(&document, "p.error_title")?.as_deref() == Some(NO_PERMISSION) {
        return Ok(None);
    }
    labeled_fields(body, &["div.col-sm-6"], "div.col-sm-8 label.control-label", "：").map(Some)
}

async fn get_info_page(session: &Session) -> Result<StudentInfo, PortalError> {
    let response = session.fetch_get(INFO_PAGE_PATH).await?;
    let fields = labeled_fields(
        &response.text(),
        &["div.col-sm-6", "div.col-sm-4"],
        "div.col-sm-8 p.form-control-static",
        "",
    )?;
    let mut info = map_info_page(&fields)?;
    if info.college_name.is_some() {
        return Ok(info);
    }

    let form = params([("offDetails", "1"), ("gnmkdm", "N106005"), ("czdmKey", "00")]);
    let response = session.post(STATUS_CHANGE_PATH, form).await?;
    if let Some(details) = parse_status_change(&response.text())? {
        info.college_name = or_missing(&details, "学院：");
        info.major_name = or_missing(&details, "专业：");
        info.class_name = or_missing(&details, "班级：");
    }
    Ok(info)
}

pub async fn get_info(session: &Session) -> Result<StudentInfo, PortalError> {
    let response = session.fetch_get(INFO_PATH).await?;
    let raw: Option<RawInfo> = response.json()?;
    match raw {
        Some(raw) => Ok(map_info(raw)),
        None => {
            log::debug!("个人信息接口返回 null, 改为解析个人信息页面");
            get_info_page(session).await
        }
    }
}
