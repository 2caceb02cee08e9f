//! 学业情况: 学业统计、各类学分要求与课程明细, 以及学生成绩总表 PDF。
//!
//! 学业情况页没有结构化接口, 统计数字和学分要求都嵌在页面文本和脚本里,
//! 只能用固定格式的正则提取。

use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use scraper::Html;
use serde::Deserialize;

use crate::grades::ACADEMIA_INDEX_PATH;
use crate::http::{Method, Params, params};
use crate::models::{
    AcademiaCategory, AcademiaCourse, AcademiaReport, AcademiaStatistics, CategoryCredits, PlannedCourses,
    PortalError, UnplannedCourses,
};
use crate::page;
use crate::session::Session;
use crate::timetable::get_display_term;
use crate::utils::{align_floats, is_number, lenient_string, parse_int};

const COURSES_PATH: &str = "xsxy/xsxyqk_cxJxzxjhxfyqKcxx.html?gnmkdm=N105515";
const COURSE_DETAIL_PATH: &str = "jxjhgl/common_cxKcJbxx.html";

// 成绩总表导出的各个步骤
const REPORT_VIEW_PATH: &str = "bysxxcx/xscjzbdy_dyXscjzbView.html";
const REPORT_WINDOW_PATH: &str = "bysxxcx/xscjzbdy_dyCjdyszxView.html";
const REPORT_POLICY_PATH: &str = "xtgl/bysxxcx/xscjzbdy_cxXsCount.html";
const REPORT_FILETYPE_PATH: &str = "bysxxcx/xscjzbdy_cxGswjlx.html";
const REPORT_COMMON_PATH: &str = "common/common_cxJwxtxx.html";
const REPORT_FILE_PATH: &str = "bysxxcx/xscjzbdy_dyList.html";
const REPORT_PROGRESS_PATH: &str = "xtgl/progress_cxProgressStatus.html";
const REPORT_GNMKDM: &str = "N558020";

// 类别名超过这个长度多半是页面脚本混进来的
const MAX_LABEL_CHARS: usize = 20;

lazy_static! {
    static ref GPA: Regex = Regex::new(r"([0-9]{1,}[.][0-9]*)").expect("GPA 正则");
    static ref PLAN: Regex = Regex::new(
        r"计划总课程(\d+)门通过(\d+)门?.*未通过(\d+)门?.*未修(\d+)?.*在读(\d+)门?.*计划外?.*通过(\d+)门?.*未通过(\d+)门"
    )
    .expect("课程统计正则");
    static ref CATEGORY: Regex = Regex::new(
        r#""(.*)&nbsp.*要求学分.*:([0-9]{1,}[.][0-9]*|0|&nbsp;).*获得学分.*:([0-9]{1,}[.][0-9]*|0|&nbsp;).*未获得学分.*:([0-9]{1,}[.][0-9]*|0|&nbsp;)[\s\S]*?<span id='showKc(.*)'></span>"#
    )
    .expect("学分要求正则");
}

/// 一个学分要求类别, id 用来查询该类别下的课程
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryBucket {
    pub label: String,
    pub id: String,
    pub credits: CategoryCredits,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawAcademiaItem {
    #[serde(rename = "KCH", deserialize_with = "lenient_string")]
    pub kch: Option<String>,
    #[serde(rename = "KCMC", deserialize_with = "lenient_string")]
    pub kcmc: Option<String>,
    #[serde(rename = "XDZT", deserialize_with = "lenient_string")]
    pub xdzt: Option<String>,       // 修读状态
    #[serde(rename = "JYXDXNM", deserialize_with = "lenient_string")]
    pub jyxdxnm: Option<String>,    // 建议修读学年
    #[serde(rename = "JYXDXQMC", deserialize_with = "lenient_string")]
    pub jyxdxqmc: Option<String>,   // 建议修读学期
    #[serde(rename = "XF", deserialize_with = "lenient_string")]
    pub xf: Option<String>,
    #[serde(rename = "KCXZMC", deserialize_with = "lenient_string")]
    pub kcxzmc: Option<String>,
    #[serde(rename = "MAXCJ", deserialize_with = "lenient_string")]
    pub maxcj: Option<String>,
    #[serde(rename = "JD", deserialize_with = "lenient_string")]
    pub jd: Option<String>,
    #[serde(rename = "KCLBMC", deserialize_with = "lenient_string")]
    pub kclbmc: Option<String>,
}

/// 从学业情况提示框的文本中提取 GPA 与课程统计, 文本已去掉所有空白
pub fn parse_statistics(display: &str) -> AcademiaStatistics {
    let display: String = display.split_whitespace().collect();

    let gpa = GPA
        .captures(&display)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|figure| is_number(figure))
        .and_then(|figure| Decimal::from_str(figure).ok());

    let Some(plan) = PLAN.captures(&display) else {
        return AcademiaStatistics { gpa, ..Default::default() };
    };
    // 未修为空时记为 0
    let number = |i: usize| plan.get(i).and_then(|m| m.as_str().parse::<u32>().ok()).unwrap_or(0);

    AcademiaStatistics {
        gpa,
        planned_courses: Some(PlannedCourses {
            total: number(1),
            passed: number(2),
            failed: number(3),
            missed: number(4),
            in_progress: number(5),
        }),
        unplanned_courses: Some(UnplannedCourses { passed: number(6), failed: number(7) }),
    }
}

fn credit_value(credit: &str) -> Option<String> {
    (is_number(credit) && credit != "0").then(|| credit.to_string())
}

/// 从学业情况页源码中提取各类学分要求, 同名类别只保留一个
pub fn parse_category_buckets(content: &str, ignore_types: &[String]) -> Vec<CategoryBucket> {
    let mut seen: Vec<[String; 5]> = Vec::new();
    for captures in CATEGORY.captures_iter(content) {
        let group = |i: usize| captures.get(i).map(|m| m.as_str().to_string()).unwrap_or_default();
        let row = [group(1), group(2), group(3), group(4), group(5)];
        if !seen.contains(&row) {
            seen.push(row);
        }
    }

    let mut buckets: Vec<CategoryBucket> = Vec::new();
    for [label, required, earned, missed, id] in seen {
        if label.is_empty()
            || label.chars().count() > MAX_LABEL_CHARS
            || id.contains("span")
            || ignore_types.contains(&label)
        {
            continue;
        }
        let bucket = CategoryBucket {
            label,
            id,
            credits: CategoryCredits {
                required: credit_value(&required),
                earned: credit_value(&earned),
                missed: credit_value(&missed),
            },
        };
        // 后出现的同名类别覆盖前一个, 位置不变
        match buckets.iter_mut().find(|b| b.label == bucket.label) {
            Some(existing) => *existing = bucket,
            None => buckets.push(bucket),
        }
    }
    buckets
}

/// 学业情况页的学号与提示框文本; 页面给出错误提示时返回 998
pub(crate) fn parse_academia_index(body: &str) -> Result<(String, String), PortalError> {
    let document = Html::parse_document(body);
    if page::exists(&document, "div.alert-danger")? {
        let message = page::select_text(&document, "div.alert-danger")?.unwrap_or_default();
        return Err(PortalError::Upstream(message));
    }

    let sid = page::attr(&document, "input#xh_id", "value")?.unwrap_or_default();
    let display = page::texts(&document, "div#alertBox")?.concat();
    Ok((sid, display))
}

// 课程基本信息页的第 7 个表头即课程类别
fn category_from_detail(body: &str) -> Option<String> {
    let document = Html::parse_document(body);
    page::texts(&document, "th").ok()?.into_iter().nth(6)
}

/// 课程类别: 默认取接口里的类别, 配置为需要细分的类别再查课程基本信息
pub(crate) async fn get_course_category(
    session: &Session,
    category: &str,
    item: &RawAcademiaItem,
) -> Result<Option<String>, PortalError> {
    if !session.config().detail_category_types.iter().any(|t| t == category) {
        return Ok(item.kclbmc.clone());
    }
    let Some(kch) = item.kch.as_deref().filter(|k| !k.is_empty()) else {
        return Ok(None);
    };

    let request = session.request(Method::Get, COURSE_DETAIL_PATH)?.query(params([("id", kch)]));
    let response = session.fetch(request).await?;
    Ok(category_from_detail(&response.text()))
}

async fn map_academia_course(
    session: &Session,
    sid: &str,
    category: &str,
    item: &RawAcademiaItem,
) -> Result<AcademiaCourse, PortalError> {
    Ok(AcademiaCourse {
        course_id: item.kch.clone(),
        title: item.kcmc.clone(),
        situation: parse_int(item.xdzt.as_deref()),
        display_term: get_display_term(sid, item.jyxdxnm.as_deref(), item.jyxdxqmc.as_deref()),
        credit: align_floats(item.xf.as_deref()),
        category: get_course_category(session, category, item).await?,
        nature: item.kcxzmc.clone(),
        max_grade: parse_int(item.maxcj.as_deref()),
        grade_point: align_floats(item.jd.as_deref()),
    })
}

pub async fn get_academia(session: &Session) -> Result<AcademiaReport, PortalError> {
    let index = session.fetch_get(ACADEMIA_INDEX_PATH).await?;
    let body = index.text();
    let (sid, display) = parse_academia_index(&body)?;
    let statistics = parse_statistics(&display);
    let buckets = parse_category_buckets(&body, &session.config().ignore_types);
    log::debug!("学业情况共 {} 个学分类别", buckets.len());

    let mut details = Vec::new();
    for bucket in buckets {
        let form = params([("xfyqjd_id", bucket.id.as_str())]);
        let items: Vec<RawAcademiaItem> = session.fetch_post(COURSES_PATH, form).await?.json()?;
        if items.is_empty() {
            continue;
        }

        let mut courses = Vec::with_capacity(items.len());
        for item in &items {
            courses.push(map_academia_course(session, &sid, &bucket.label, item).await?);
        }
        details.push(AcademiaCategory { category: bucket.label, credits: bucket.credits, courses });
    }

    Ok(AcademiaReport { sid, statistics, details })
}

/// 导出接口返回的文件路径带有转义与 "#成功" 后缀
pub fn decode_report_path(body: &str) -> String {
    body.replace("#成功", "")
        .replace('"', "")
        .replace('/', "\\")
        .replace("\\\\", "/")
}

// 成绩总表的打印选项, 版式由配置决定
fn transcript_form(template: &str) -> Params {
    params([
        ("gsdygx", template),
        ("ids", ""),
        ("bdykcxzDms", ""),
        ("cytjkcxzDms", ""),
        ("cytjkclbDms", ""),
        ("cytjkcgsDms", ""),
        ("bjgbdykcxzDms", ""),
        ("bjgbdyxxkcxzDms", ""),
        ("djksxmDms", ""),
        ("cjbzmcDms", ""),
        ("cjdySzxs", ""),
    ])
}

/// 导出学生成绩总表 PDF
pub async fn get_academia_pdf(session: &Session) -> Result<Vec<u8>, PortalError> {
    let module = params([("gnmkdm", REPORT_GNMKDM)]);
    let transcript = transcript_form(&session.config().transcript_template);
    let post = |path: &str, form: Params| -> Result<_, PortalError> {
        Ok(session.request(Method::Post, path)?.query(module.clone()).form(form))
    };

    session.fetch(post(REPORT_VIEW_PATH, module.clone())?).await?;
    session.send(post(REPORT_WINDOW_PATH, params([("xh", "")]))?).await?;
    session.send(post(REPORT_POLICY_PATH, transcript.clone())?).await?;
    session.send(post(REPORT_FILETYPE_PATH, transcript.clone())?).await?;
    session.send(post(REPORT_COMMON_PATH, module.clone())?).await?;

    let file = session.send(post(REPORT_FILE_PATH, transcript)?).await?;
    let file_body = file.text();
    page::ensure_no_error_page(&file_body)?;

    let progress = params([("key", "score_print_processed"), ("gnmkdm", REPORT_GNMKDM)]);
    let request = session
        .request(Method::Post, REPORT_PROGRESS_PATH)?
        .query(progress.clone())
        .form(progress);
    session.send(request).await?;

    let path = decode_report_path(&file_body);
    log::debug!("成绩总表文件: {}", path);
    let request = session
        .request(Method::Get, &path)?
        .timeout(session.timeout() + std::time::Duration::from_secs(2));
    let pdf = session.send(request).await?;
    pdf.ensure_ok()?;
    Ok(pdf.body)
}
