// 课表、考试安排与课表 PDF
use serde::Deserialize;

use crate::config::TimeSlotTable;
use crate::grades::{Paged, paged_query};
use crate::http::{Method, params};
use crate::models::{ExamCourse, ExamSchedule, PortalError, Schedule, ScheduleCourse};
use crate::page;
use crate::session::Session;
use crate::timetable::{display_course_time, list_sessions, list_weeks, split_merge_display};
use crate::utils::{align_floats, lenient_string, parse_int, term_code};

const SCHEDULE_PATH: &str = "kbcx/xskbcx_cxXsKb.html?gnmkdm=N2151";
const EXAM_PATH: &str = "kwgl/kscx_cxXsksxxIndex.html?doType=query&gnmkdm=N358105";
const SCHEDULE_POLICY_PATH: &str = "kbdy/bjkbdy_cxXnxqsfkz.html";
const SCHEDULE_PDF_PATH: &str = "kbcx/xskbcx_cxXsShcPdf.html";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawScheduleItem {
    #[serde(deserialize_with = "lenient_string")]
    pub kch_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub kcmc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub xm: Option<String>,         // 教师
    #[serde(deserialize_with = "lenient_string")]
    pub jxbmc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub xf: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub xqj: Option<String>,        // 星期几
    #[serde(deserialize_with = "lenient_string")]
    pub jc: Option<String>,         // 节次
    #[serde(deserialize_with = "lenient_string")]
    pub zcd: Option<String>,        // 周次
    #[serde(deserialize_with = "lenient_string")]
    pub khfsmc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub xqmc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub cdmc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub kcxszc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub zhxs: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub zxs: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawStudent {
    #[serde(rename = "XH", deserialize_with = "lenient_string")]
    pub sid: Option<String>,
    #[serde(rename = "XM", deserialize_with = "lenient_string")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawExtraCourse {
    #[serde(deserialize_with = "lenient_string")]
    pub qtkcgs: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSchedule {
    pub xsxx: RawStudent,
    #[serde(rename = "kbList")]
    pub kb_list: Option<Vec<RawScheduleItem>>,
    #[serde(rename = "sjkList")]
    pub sjk_list: Option<Vec<RawExtraCourse>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawExamItem {
    #[serde(deserialize_with = "lenient_string")]
    pub xh: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub xm: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub kch: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub kcmc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub kssj: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub cdmc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub cdxqmc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub zwh: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub cxbj: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub ksmc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub jsxx: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub jxbmc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub kkxy: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub xf: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub ksfs: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub sjbh: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub bz1: Option<String>,
}

pub fn map_schedule_item(item: &RawScheduleItem, slots: &TimeSlotTable) -> ScheduleCourse {
    let sessions = item.jc.as_deref();
    ScheduleCourse {
        course_id: item.kch_id.clone(),
        title: item.kcmc.clone(),
        teacher: item.xm.clone(),
        class_name: item.jxbmc.clone(),
        credit: align_floats(item.xf.as_deref()),
        weekday: parse_int(item.xqj.as_deref()),
        time: display_course_time(sessions, slots),
        sessions: item.jc.clone(),
        list_sessions: list_sessions(sessions),
        weeks: item.zcd.clone(),
        list_weeks: list_weeks(item.zcd.as_deref()),
        evaluation_mode: item.khfsmc.clone(),
        campus: item.xqmc.clone(),
        place: item.cdmc.clone(),
        hours_composition: item.kcxszc.clone(),
        weekly_hours: parse_int(item.zhxs.as_deref()),
        total_hours: parse_int(item.zxs.as_deref()),
    }
}

pub fn map_schedule(raw: RawSchedule, year: i32, term: u32, slots: &TimeSlotTable) -> Result<Schedule, PortalError> {
    let items = raw.kb_list.filter(|list| !list.is_empty()).ok_or_else(PortalError::empty)?;
    let courses = items.iter().map(|item| map_schedule_item(item, slots)).collect();

    Ok(Schedule {
        sid: raw.xsxx.sid,
        name: raw.xsxx.name,
        year,
        term,
        count: items.len(),
        courses: split_merge_display(courses, slots),
        extra_courses: raw.sjk_list.unwrap_or_default().into_iter().map(|c| c.qtkcgs).collect(),
    })
}

pub async fn get_schedule(session: &Session, year: i32, term: u32) -> Result<Schedule, PortalError> {
    let form = params([("xnm", year.to_string()), ("xqm", term_code(term).to_string())]);
    let response = session.fetch_post(SCHEDULE_PATH, form).await?;
    let raw: RawSchedule = response.json()?;
    map_schedule(raw, year, term, session.time_slots())
}

pub fn map_exam_item(item: &RawExamItem) -> ExamCourse {
    ExamCourse {
        course_id: item.kch.clone(),
        title: item.kcmc.clone(),
        time: item.kssj.clone(),
        location: item.cdmc.clone(),
        campus: item.cdxqmc.clone(),
        seat_number: item.zwh.clone(),
        retake_mark: item.cxbj.clone().unwrap_or_default(),
        exam_name: item.ksmc.clone(),
        teacher: item.jsxx.clone(),
        class_name: item.jxbmc.clone(),
        college: item.kkxy.clone(),
        credit: align_floats(item.xf.as_deref()),
        exam_method: item.ksfs.clone(),
        paper_number: item.sjbh.clone(),
        remark: item.bz1.clone().unwrap_or_default(),
    }
}

pub async fn get_exam_schedule(session: &Session, year: i32, term: u32) -> Result<ExamSchedule, PortalError> {
    let response = session.fetch_post(EXAM_PATH, paged_query(year, term, 100)).await?;
    let exams: Paged<RawExamItem> = response.json()?;
    let items = exams.items.filter(|list| !list.is_empty()).ok_or_else(PortalError::empty)?;

    Ok(ExamSchedule {
        sid: items[0].xh.clone(),
        name: items[0].xm.clone(),
        year,
        term,
        count: items.len(),
        courses: items.iter().map(map_exam_item).collect(),
    })
}

/// 导出课表 PDF: 先请求打印策略, 再取文件
pub async fn get_schedule_pdf(session: &Session, year: i32, term: u32, name: &str) -> Result<Vec<u8>, PortalError> {
    let on = || "true".to_string();
    let off = || "false".to_string();
    let form = params([
        ("xm", name.to_string()),
        ("xnm", year.to_string()),
        ("xqm", term_code(term).to_string()),
        ("xnmc", format!("{}-{}", year, year + 1)),
        ("xqmmc", term.to_string()),
        ("jgmc", "undefined".to_string()),
        ("xxdm", String::new()),
        ("xszd.sj", on()),
        ("xszd.cd", on()),
        ("xszd.js", on()),
        ("xszd.jszc", off()),
        ("xszd.jxb", on()),
        ("xszd.xkbz", on()),
        ("xszd.kcxszc", on()),
        ("xszd.zhxs", on()),
        ("xszd.zxs", on()),
        ("xszd.khfs", on()),
        ("xszd.xf", on()),
        ("xszd.skfsmc", off()),
        ("kzlx", "dy".to_string()),
    ]);

    let policy = session
        .request(Method::Post, SCHEDULE_POLICY_PATH)?
        .query(params([("gnmkdm", "N2151")]))
        .form(form.clone());
    session.fetch(policy).await?;

    let file = session
        .request(Method::Post, SCHEDULE_PDF_PATH)?
        .query(params([("doType", "table")]))
        .form(form);
    let response = session.send(file).await?;
    response.ensure_ok()?;
    page::ensure_no_error_page(&response.text())?;
    Ok(response.body)
}
