// 成绩与 GPA
use rust_decimal::Decimal;
use scraper::Html;
use serde::Deserialize;

use crate::http::{Params, params};
use crate::models::{GradeCourse, GradeReport, PortalError};
use crate::page;
use crate::session::Session;
use crate::utils::{align_floats, lenient_string, parse_int, term_param, timestamp_millis};

const GRADE_PATH: &str = "cjcx/cjcx_cxXsgrcj.html?doType=query&gnmkdm=N305005";
// 部分学校只开放"个人成绩查询"入口
const PERSONAL_GRADE_PATH: &str = "cjcx/cjcx_cxDgXscj.html?doType=query&gnmkdm=N305005";
pub(crate) const ACADEMIA_INDEX_PATH: &str = "xsxy/xsxyqk_cxXsxyqkIndex.html?gnmkdm=N105515&layout=default";

/// 成绩接口的单条记录
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawGradeItem {
    #[serde(deserialize_with = "lenient_string")]
    pub xh: Option<String>,         // 学号
    #[serde(deserialize_with = "lenient_string")]
    pub xm: Option<String>,         // 姓名
    #[serde(deserialize_with = "lenient_string")]
    pub kch_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub kcmc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub jsxm: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub jxbmc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub xf: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub kclbmc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub kcxzmc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub cj: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub jd: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub ksxz: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub kkbmmc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub kcbj: Option<String>,
}

/// 教务系统分页查询的通用外层结构
#[derive(Debug, Clone, Deserialize)]
pub struct Paged<T> {
    #[serde(default)]
    pub items: Option<Vec<T>>,
}

/// 成绩、考试等分页查询的表单
pub(crate) fn paged_query(year: i32, term: u32, show_count: u32) -> Params {
    params([
        ("xnm", year.to_string()),
        ("xqm", term_param(term)),
        ("_search", "false".to_string()),
        ("nd", timestamp_millis()),
        ("queryModel.showCount", show_count.to_string()),
        ("queryModel.currentPage", "1".to_string()),
        ("queryModel.sortName", String::new()),
        ("queryModel.sortOrder", "asc".to_string()),
        ("time", "0".to_string()),
    ])
}

pub fn map_grade_item(item: &RawGradeItem) -> GradeCourse {
    GradeCourse {
        course_id: item.kch_id.clone(),
        title: item.kcmc.clone(),
        teacher: item.jsxm.clone(),
        class_name: item.jxbmc.clone(),
        credit: align_floats(item.xf.as_deref()),
        category: item.kclbmc.clone(),
        nature: item.kcxzmc.clone(),
        grade: parse_int(item.cj.as_deref()),
        grade_point: align_floats(item.jd.as_deref()),
        grade_nature: item.ksxz.clone(),
        start_college: item.kkbmmc.clone(),
        mark: item.kcbj.clone(),
    }
}

pub fn map_grades(items: Vec<RawGradeItem>, year: i32, term: u32) -> Result<GradeReport, PortalError> {
    let first = items.first().ok_or_else(PortalError::empty)?;
    Ok(GradeReport {
        sid: first.xh.clone(),
        name: first.xm.clone(),
        year,
        term,
        count: items.len(),
        courses: items.iter().map(map_grade_item).collect(),
    })
}

pub async fn get_grade(session: &Session, year: i32, term: u32, use_personal_info: bool) -> Result<GradeReport, PortalError> {
    let path = if use_personal_info { PERSONAL_GRADE_PATH } else { GRADE_PATH };
    let response = session.fetch_post(path, paged_query(year, term, 100)).await?;
    let grades: Paged<RawGradeItem> = response.json()?;
    map_grades(grades.items.unwrap_or_default(), year, term)
}

/// 学业情况页中第三个 `font[size='2px']` 为 GPA, 未生成时不是数字
pub fn extract_gpa(body: &str) -> Result<Decimal, PortalError> {
    let document = Html::parse_document(body);
    let figures = page::texts(&document, "font[size='2px']")?;
    figures
        .get(2)
        .and_then(|text| text.parse::<Decimal>().ok())
        .ok_or_else(|| PortalError::Empty("GPA 尚未生成".to_string()))
}

pub async fn get_gpa(session: &Session) -> Result<Decimal, PortalError> {
    let response = session.fetch_get(ACADEMIA_INDEX_PATH).await?;
    extract_gpa(&response.text())
}
