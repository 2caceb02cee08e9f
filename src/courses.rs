// 选课: 已选课程、板块课、选课与退课
use std::collections::HashMap;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use scraper::Html;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::grades::Paged;
use crate::http::params;
use crate::models::{
    BlockCourse, BlockCourses, CancelResult, CourseSelection, PortalError, SelectedCourse, SelectedCourseBrief,
    SelectedCourses, SelectedCoursesBrief,
};
use crate::page;
use crate::session::Session;
use crate::utils::{get_course_time, get_place, lenient_string, term_code, value_text};

const SELECTED_PATH: &str = "xsxk/zzxkyzb_cxZzxkYzbChoosedDisplay.html?gnmkdm=N253512";
const SELECTED_ALL_PATH: &str = "xsxxxggl/xsxxwh_cxXsxkxx.html?gnmkdm=N100801";
const BLOCK_INDEX_PATH: &str = "xsxk/zzxkyzb_cxZzxkYzbIndex.html?gnmkdm=N253512&layout=default";
const BLOCK_DISPLAY_PATH: &str = "xsxk/zzxkyzb_cxZzxkYzbDisplay.html?gnmkdm=N253512";
const BLOCK_PART_PATH: &str = "xsxk/zzxkyzb_cxZzxkYzbPartDisplay.html?gnmkdm=N253512";
const BLOCK_CLASSES_PATH: &str = "xsxk/zzxkyzb_cxJxbWithKchZzxkYzb.html?gnmkdm=N253512";
const SELECT_PATH: &str = "xsxk/zzxkyzb_xkBcZyZzxkYzb.html?gnmkdm=N253512";
const CANCEL_PATH: &str = "xsxk/zzxkyzb_tuikBcZzxkYzb.html?gnmkdm=N253512";

lazy_static! {
    // 教师信息形如 "10086/张三/讲师"
    static ref TEACHER_ID: Regex = Regex::new(r"(.*?\d+)/").expect("教师工号正则");
    static ref TEACHER_NAME: Regex = Regex::new(r"/(.*?)/").expect("教师姓名正则");
    static ref QUOTED: Regex = Regex::new(r"'(.*?)'").expect("引号参数正则");
    static ref DIGITS: Regex = Regex::new(r"(\d+)").expect("数字正则");
}

/// 板块课后续请求需要的隐藏表单域
const BLOCK_FIELDS: [&str; 12] = [
    "bklx_id", "xqh_id", "zyfx_id", "njdm_id", "bh_id", "xbm", "xslbdm", "ccdm", "xsbj", "kkbk", "rwlx", "zyh_id",
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSelectedItem {
    #[serde(deserialize_with = "lenient_string")]
    pub kch: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub jxb_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub do_jxb_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub kcmc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub jsxx: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub xf: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub kklxmc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub jxbrs: Option<String>,      // 教学班容量
    #[serde(deserialize_with = "lenient_string")]
    pub yxzrs: Option<String>,      // 已选人数
    #[serde(deserialize_with = "lenient_string")]
    pub jxdd: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub sksj: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub zixf: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub sxbj: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSelectedBrief {
    #[serde(deserialize_with = "lenient_string")]
    pub kch: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub jxb_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub kcmc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub xf: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub jsxm: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub kclbmc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub jxdd: Option<String>,
}

/// 板块课: 课程列表与教学班列表按位置合并后的记录
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawBlockItem {
    #[serde(deserialize_with = "lenient_string")]
    pub kch_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub jxb_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub do_jxb_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub kcmc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub jsxx: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub xf: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub jxbrl: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub yxzrs: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub jxdd: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub sksj: Option<String>,
}

/// 拆分教师信息, 返回 (工号, 姓名)
pub fn split_teacher(jsxx: Option<&str>) -> Result<(String, String), PortalError> {
    let jsxx = jsxx.ok_or_else(|| PortalError::unexpected("缺少教师信息"))?;
    let capture = |re: &Regex| re.captures(jsxx).and_then(|c| c.get(1)).map(|m| m.as_str().to_string());
    match (capture(&TEACHER_ID), capture(&TEACHER_NAME)) {
        (Some(id), Some(name)) => Ok((id, name)),
        _ => Err(PortalError::unexpected(format!("无法识别的教师信息: {}", jsxx))),
    }
}

/// 学分, 缺失记为 0
fn credit_or_zero(credit: Option<&str>) -> Result<Decimal, PortalError> {
    match credit.map(str::trim).filter(|c| !c.is_empty()) {
        None => Ok(Decimal::ZERO),
        Some(c) => Decimal::from_str(c).map_err(|_| PortalError::unexpected(format!("无法识别的学分: {}", c))),
    }
}

/// 人数等计数, 缺失记为 0
fn count_or_zero(count: Option<&str>) -> Result<i64, PortalError> {
    match count.map(str::trim).filter(|c| !c.is_empty()) {
        None => Ok(0),
        Some(c) => c.parse().map_err(|_| PortalError::unexpected(format!("无法识别的数字: {}", c))),
    }
}

pub fn map_selected_item(item: &RawSelectedItem) -> Result<SelectedCourse, PortalError> {
    let (teacher_id, teacher) = split_teacher(item.jsxx.as_deref())?;
    Ok(SelectedCourse {
        course_id: item.kch.clone(),
        class_id: item.jxb_id.clone(),
        do_id: item.do_jxb_id.clone(),
        title: item.kcmc.clone(),
        teacher_id,
        teacher,
        credit: credit_or_zero(item.xf.as_deref())?,
        category: item.kklxmc.clone(),
        capacity: count_or_zero(item.jxbrs.as_deref())?,
        selected_number: count_or_zero(item.yxzrs.as_deref())?,
        place: item.jxdd.as_deref().map(get_place),
        time: item.sksj.as_deref().map(get_course_time),
        optional: count_or_zero(item.zixf.as_deref())?,
        waiting: item.sxbj.clone(),
    })
}

pub async fn get_selected_courses(session: &Session, year: i32, term: u32) -> Result<SelectedCourses, PortalError> {
    let form = params([("xkxnm", year.to_string()), ("xkxqm", term_code(term).to_string())]);
    let response = session.fetch_post(SELECTED_PATH, form).await?;
    let items: Vec<RawSelectedItem> = response.json()?;
    let courses = items.iter().map(map_selected_item).collect::<Result<Vec<_>, _>>()?;

    Ok(SelectedCourses { year, term, count: courses.len(), courses })
}

pub fn map_selected_brief(item: &RawSelectedBrief) -> Result<SelectedCourseBrief, PortalError> {
    Ok(SelectedCourseBrief {
        course_id: item.kch.clone(),
        class_id: item.jxb_id.clone(),
        title: item.kcmc.clone(),
        credit: credit_or_zero(item.xf.as_deref())?,
        teacher: item.jsxm.clone(),
        category: item.kclbmc.clone(),
        place: item.jxdd.clone(),
    })
}

/// 学籍信息里的选课记录, 学年或学期为 0 时查询全部
pub async fn get_selected_courses_all(session: &Session, year: i32, term: u32) -> Result<SelectedCoursesBrief, PortalError> {
    let (year_param, term_param, term) = if year == 0 || term == 0 {
        (String::new(), String::new(), 0)
    } else {
        (year.to_string(), term_code(term).to_string(), term)
    };
    let form = params([
        ("xnm", year_param),
        ("xqm", term_param),
        ("_search", "false".to_string()),
        ("queryModel.showCount", "5000".to_string()),
        ("queryModel.currentPage", "1".to_string()),
        ("queryModel.sortName", String::new()),
        ("queryModel.sortOrder", "asc".to_string()),
        ("time", "1".to_string()),
    ]);

    let response = session.fetch_post(SELECTED_ALL_PATH, form).await?;
    let selected: Paged<RawSelectedBrief> = response.json()?;
    let items = selected.items.ok_or_else(|| PortalError::unexpected("已选课程缺少 items"))?;
    let courses = items.iter().map(map_selected_brief).collect::<Result<Vec<_>, _>>()?;

    Ok(SelectedCoursesBrief { year, term, count: courses.len(), courses })
}

/// 选课首页中与板块课有关的内容
#[derive(Debug, Clone)]
pub(crate) struct BlockIndex {
    pub got_credit: String,
    pub tabs: Vec<(String, String)>,        // (kklxdm, xkkz_id)
    pub fields: HashMap<String, String>,
}

pub(crate) fn parse_block_index(body: &str) -> Result<BlockIndex, PortalError> {
    let document = Html::parse_document(body);
    if page::exists(&document, "div.nodata")? {
        let message = page::select_text(&document, "div.nodata")?.unwrap_or_default();
        return Err(PortalError::Upstream(message));
    }

    let credits = page::texts(&document, "font[color='red']")?;
    if credits.is_empty() {
        return Err(PortalError::Empty("板块课内容为空".to_string()));
    }
    let got_credit = credits
        .get(2)
        .cloned()
        .ok_or_else(|| PortalError::unexpected("板块课学分信息不完整"))?;

    // 每个标签页的 onclick 里依次是 kklxdm 与 xkkz_id
    let tab = page::selector("a[role='tab']")?;
    let mut tabs = Vec::new();
    for element in document.select(&tab) {
        let onclick = element.value().attr("onclick").unwrap_or_default();
        let args: Vec<&str> = QUOTED
            .captures_iter(onclick)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().trim())
            .collect();
        match args.as_slice() {
            [kklxdm, xkkz_id, ..] => tabs.push((kklxdm.to_string(), xkkz_id.to_string())),
            _ => return Err(PortalError::unexpected(format!("无法识别的板块标签: {}", onclick))),
        }
    }

    let fields = page::hidden_inputs(&document)?.into_iter().collect();
    Ok(BlockIndex { got_credit, tabs, fields })
}

fn hidden_fields(body: &str) -> Result<Vec<(String, String)>, PortalError> {
    page::hidden_inputs(&Html::parse_document(body))
}

fn field(fields: &HashMap<String, String>, name: &str) -> Result<String, PortalError> {
    fields
        .get(name)
        .cloned()
        .ok_or_else(|| PortalError::unexpected(format!("选课页面缺少字段 {}", name)))
}

/// 课程列表与教学班列表按位置合并, 后者覆盖同名字段
pub(crate) fn merge_block_lists(courses: Vec<Map<String, Value>>, classes: Vec<Map<String, Value>>) -> Result<Vec<RawBlockItem>, PortalError> {
    courses
        .into_iter()
        .zip(classes)
        .map(|(mut course, class)| -> Result<RawBlockItem, PortalError> {
            course.extend(class);
            Ok(serde_json::from_value(Value::Object(course))?)
        })
        .collect()
}

pub fn map_block_item(item: &RawBlockItem, kklxdm: &str) -> Result<BlockCourse, PortalError> {
    let (teacher_id, teacher) = split_teacher(item.jsxx.as_deref())?;
    Ok(BlockCourse {
        course_id: item.kch_id.clone(),
        class_id: item.jxb_id.clone(),
        do_id: item.do_jxb_id.clone(),
        title: item.kcmc.clone(),
        teacher_id,
        teacher,
        credit: credit_or_zero(item.xf.as_deref())?,
        kklxdm: kklxdm.to_string(),
        capacity: count_or_zero(item.jxbrl.as_deref())?,
        selected_number: count_or_zero(item.yxzrs.as_deref())?,
        place: item.jxdd.as_deref().map(get_place),
        time: item.sksj.as_deref().map(get_course_time),
    })
}

#[derive(Debug, Deserialize)]
struct PartDisplay {
    #[serde(rename = "tmpList", default)]
    tmp_list: Vec<Map<String, Value>>,
}

/// 板块课列表, block 为 1 到 3 的板块序号
pub async fn get_block_courses(session: &Session, year: i32, term: u32, block: usize) -> Result<BlockCourses, PortalError> {
    let index = session.fetch_get(BLOCK_INDEX_PATH).await?;
    let BlockIndex { got_credit, tabs, mut fields } = parse_block_index(&index.text())?;
    log::debug!("板块课已获得学分: {}", got_credit);

    let (kklxdm, xkkz_id) = block
        .checked_sub(1)
        .and_then(|i| tabs.get(i))
        .cloned()
        .ok_or_else(|| PortalError::unexpected(format!("没有第 {} 个板块", block)))?;

    let display_form = params([("xkkz_id", xkkz_id.as_str()), ("xszxzt", "1"), ("kspage", "0")]);
    let display = session.fetch_post(BLOCK_DISPLAY_PATH, display_form).await?;
    fields.extend(hidden_fields(&display.text())?);

    let mut values = HashMap::new();
    for name in BLOCK_FIELDS {
        values.insert(name, field(&fields, name)?);
    }
    let value = |name: &str| values.get(name).cloned().unwrap_or_default();
    let xkxnm = year.to_string();
    let xkxqm = term_code(term).to_string();

    let part_form = params([
        ("bklx_id", value("bklx_id")),
        ("xqh_id", value("xqh_id")),
        ("zyfx_id", value("zyfx_id")),
        ("njdm_id", value("njdm_id")),
        ("bh_id", value("bh_id")),
        ("xbm", value("xbm")),
        ("xslbdm", value("xslbdm")),
        ("ccdm", value("ccdm")),
        ("xsbj", value("xsbj")),
        ("xkxnm", xkxnm.clone()),
        ("xkxqm", xkxqm.clone()),
        ("kklxdm", kklxdm.clone()),
        ("kkbk", value("kkbk")),
        ("rwlx", value("rwlx")),
        ("kspage", "1".to_string()),
        ("jspage", "10".to_string()),
    ]);
    let part: PartDisplay = session.fetch_post(BLOCK_PART_PATH, part_form).await?.json()?;
    let kch_id = part
        .tmp_list
        .first()
        .and_then(|first| first.get("kch_id"))
        .cloned()
        .and_then(value_text)
        .ok_or_else(|| PortalError::unexpected("板块课列表缺少课程号"))?;

    let classes_form = params([
        ("bklx_id", value("bklx_id")),
        ("xkxnm", xkxnm),
        ("xkxqm", xkxqm),
        ("xkkz_id", xkkz_id),
        ("xqh_id", value("xqh_id")),
        ("zyfx_id", value("zyfx_id")),
        ("njdm_id", value("njdm_id")),
        ("bh_id", value("bh_id")),
        ("xbm", value("xbm")),
        ("xslbdm", value("xslbdm")),
        ("ccdm", value("ccdm")),
        ("xsbj", value("xsbj")),
        ("kklxdm", kklxdm.clone()),
        ("kch_id", kch_id),
        ("kkbk", value("kkbk")),
        ("rwlx", value("rwlx")),
        ("zyh_id", value("zyh_id")),
    ]);
    let classes: Vec<Map<String, Value>> = session.fetch_post(BLOCK_CLASSES_PATH, classes_form).await?.json()?;

    // 第三板块的教学班数量可以和课程数量不同
    if block != 3 && part.tmp_list.len() != classes.len() {
        return Err(PortalError::unexpected("板块课编号及长度错误"));
    }

    let courses = merge_block_lists(part.tmp_list, classes)?
        .iter()
        .map(|item| map_block_item(item, &kklxdm))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(BlockCourses { count: courses.len(), courses })
}

/// 选课, 原样返回教务系统的 JSON 结果
pub async fn select_course(session: &Session, selection: &CourseSelection) -> Result<Value, PortalError> {
    let grade: String = selection.sid.chars().take(2).collect();
    let major: String = selection.sid.chars().skip(2).take(4).collect();
    let form = params([
        ("jxb_ids", selection.do_id.clone()),
        ("kch_id", selection.course_id.clone()),
        ("qz", "0".to_string()),
        ("xkxnm", selection.year.to_string()),
        ("xkxqm", term_code(selection.term).to_string()),
        ("njdm_id", grade),
        ("zyh_id", major),
        ("kklxdm", selection.kklxdm.clone()),
    ]);
    session.fetch_post(SELECT_PATH, form).await?.json()
}

/// 解析退课结果, 取返回内容中的第一个数字
pub fn parse_cancel_status(body: &str) -> Result<CancelResult, PortalError> {
    DIGITS
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| CancelResult { status: m.as_str().to_string() })
        .ok_or_else(|| PortalError::unexpected(format!("无法识别的退课结果: {}", body)))
}

pub async fn cancel_course(session: &Session, do_id: &str, course_id: &str, year: i32, term: u32) -> Result<CancelResult, PortalError> {
    let form = params([
        ("jxb_ids", do_id.to_string()),
        ("kch_id", course_id.to_string()),
        ("xkxnm", year.to_string()),
        ("xkxqm", term_code(term).to_string()),
    ]);
    let response = session.fetch_post(CANCEL_PATH, form).await?;
    parse_cancel_status(&response.text())
}
