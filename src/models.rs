// 结构体与自定义异常
use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cookie 名到值的映射, 登录成功后整体替换
pub type Cookies = BTreeMap<String, String>;

/// 整数或原样文本, 例如成绩既可能是 `95` 也可能是 `优秀`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntOrText {
    Int(i64),
    Text(String),
}

// ---------- 登录 ----------

/// 登录成功后的会话数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginData {
    pub cookies: Cookies,
}

/// 需要验证码时第一步登录返回的凭据包, 由第二步登录消费一次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KaptchaChallenge {
    pub sid: String,
    pub csrf_token: String,
    pub cookies: Cookies,       // 获取验证码前的 cookie 快照
    pub password: String,
    pub modulus: String,
    pub exponent: String,
    pub kaptcha_pic: String,    // base64 编码的验证码图片
    pub timestamp: DateTime<Local>,    // 仅供调用方判断是否过期
}

/// 登录接口的载荷: 成功的会话, 或者待识别的验证码
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LoginPayload {
    Session(LoginData),
    Kaptcha(KaptchaChallenge),
}

// ---------- 个人信息 ----------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentInfo {
    pub sid: Option<String>,
    pub name: Option<String>,
    pub college_name: Option<String>,
    pub major_name: Option<String>,
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graduation_school: Option<String>,
    pub domicile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    pub politics_status: Option<String>,
    pub nationality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub education: Option<String>,
    pub phone_number: Option<String>,
    pub parents_number: Option<String>,
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_number: Option<String>,
}

// ---------- 成绩 ----------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeCourse {
    pub course_id: Option<String>,
    pub title: Option<String>,
    pub teacher: Option<String>,
    pub class_name: Option<String>,
    pub credit: Option<String>,         // 一位小数
    pub category: Option<String>,
    pub nature: Option<String>,
    pub grade: Option<IntOrText>,
    pub grade_point: Option<String>,    // 一位小数
    pub grade_nature: Option<String>,
    pub start_college: Option<String>,
    pub mark: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeReport {
    pub sid: Option<String>,
    pub name: Option<String>,
    pub year: i32,
    pub term: u32,
    pub count: usize,
    pub courses: Vec<GradeCourse>,
}

// ---------- 课表 ----------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleCourse {
    pub course_id: Option<String>,
    pub title: Option<String>,
    pub teacher: Option<String>,
    pub class_name: Option<String>,
    pub credit: Option<String>,
    pub weekday: Option<IntOrText>,
    pub time: Option<String>,           // 例如 08:00~09:40
    pub sessions: Option<String>,       // 原始节次, 例如 1-2节
    pub list_sessions: Option<Vec<u32>>,
    pub weeks: Option<String>,          // 原始周次, 例如 1-16周(双)
    pub list_weeks: Option<Vec<u32>>,
    pub evaluation_mode: Option<String>,
    pub campus: Option<String>,
    pub place: Option<String>,
    pub hours_composition: Option<String>,
    pub weekly_hours: Option<IntOrText>,
    pub total_hours: Option<IntOrText>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub sid: Option<String>,
    pub name: Option<String>,
    pub year: i32,
    pub term: u32,
    pub count: usize,
    pub courses: Vec<ScheduleCourse>,
    pub extra_courses: Vec<Option<String>>,    // 实践课等无固定时间的课程
}

// ---------- 考试 ----------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamCourse {
    pub course_id: Option<String>,
    pub title: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub campus: Option<String>,
    pub seat_number: Option<String>,
    pub retake_mark: String,
    pub exam_name: Option<String>,
    pub teacher: Option<String>,
    pub class_name: Option<String>,
    pub college: Option<String>,
    pub credit: Option<String>,
    pub exam_method: Option<String>,
    pub paper_number: Option<String>,
    pub remark: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamSchedule {
    pub sid: Option<String>,
    pub name: Option<String>,
    pub year: i32,
    pub term: u32,
    pub count: usize,
    pub courses: Vec<ExamCourse>,
}

// ---------- 选课 ----------

/// 已选课程(选课页面口径)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedCourse {
    pub course_id: Option<String>,
    pub class_id: Option<String>,
    pub do_id: Option<String>,
    pub title: Option<String>,
    pub teacher_id: String,
    pub teacher: String,
    pub credit: Decimal,
    pub category: Option<String>,
    pub capacity: i64,
    pub selected_number: i64,
    pub place: Option<String>,
    pub time: Option<String>,
    pub optional: i64,
    pub waiting: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedCourses {
    pub year: i32,
    pub term: u32,
    pub count: usize,
    pub courses: Vec<SelectedCourse>,
}

/// 已选课程(学籍信息口径), 字段较少但可跨学期查询
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedCourseBrief {
    pub course_id: Option<String>,
    pub class_id: Option<String>,
    pub title: Option<String>,
    pub credit: Decimal,
    pub teacher: Option<String>,
    pub category: Option<String>,
    pub place: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedCoursesBrief {
    pub year: i32,
    pub term: u32,
    pub count: usize,
    pub courses: Vec<SelectedCourseBrief>,
}

/// 板块课的教学班
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockCourse {
    pub course_id: Option<String>,
    pub class_id: Option<String>,
    pub do_id: Option<String>,
    pub title: Option<String>,
    pub teacher_id: String,
    pub teacher: String,
    pub credit: Decimal,
    pub kklxdm: String,     // 开课类型代码, 选课时原样回传
    pub capacity: i64,
    pub selected_number: i64,
    pub place: Option<String>,
    pub time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockCourses {
    pub count: usize,
    pub courses: Vec<BlockCourse>,
}

/// 选课请求所需的参数, 多数来自板块课列表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSelection {
    pub sid: String,
    pub course_id: String,
    pub do_id: String,
    pub kklxdm: String,
    pub year: i32,
    pub term: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelResult {
    pub status: String,
}

// ---------- 学业情况 ----------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedCourses {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub missed: u32,
    #[serde(rename = "in")]
    pub in_progress: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnplannedCourses {
    pub passed: u32,
    pub failed: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcademiaStatistics {
    pub gpa: Option<Decimal>,
    #[serde(rename = "planed_courses", skip_serializing_if = "Option::is_none")]
    pub planned_courses: Option<PlannedCourses>,
    #[serde(rename = "unplaned_courses", skip_serializing_if = "Option::is_none")]
    pub unplanned_courses: Option<UnplannedCourses>,
}

/// 某一类学分要求, 无效值或 0 记为 None
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCredits {
    pub required: Option<String>,
    pub earned: Option<String>,
    pub missed: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademiaCourse {
    pub course_id: Option<String>,
    pub title: Option<String>,
    pub situation: Option<IntOrText>,
    pub display_term: Option<String>,
    pub credit: Option<String>,
    pub category: Option<String>,
    pub nature: Option<String>,
    pub max_grade: Option<IntOrText>,
    pub grade_point: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademiaCategory {
    #[serde(rename = "type")]
    pub category: String,
    pub credits: CategoryCredits,
    pub courses: Vec<AcademiaCourse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademiaReport {
    pub sid: String,
    pub statistics: AcademiaStatistics,
    pub details: Vec<AcademiaCategory>,
}

// ---------- 通知 ----------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub content: Option<String>,
    pub create_time: Option<String>,
}

// ---------- 异常 ----------

// 教务系统访问异常, 在接口边界统一转换成返回码
#[derive(Debug, Error)]
pub enum PortalError {
    #[error("请求超时")]
    Timeout,

    #[error("教务系统响应异常: HTTP {0}")]
    Unavailable(u16),

    #[error("HTTP 请求失败: {0}")]
    Transport(String),

    #[error("解析异常: {0}")]
    Parse(String),

    #[error("接口地址无效: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("未登录或已过期，请重新登录")]
    SessionExpired,

    // 教务系统页面上给出的错误提示, 原样透传
    #[error("{0}")]
    Upstream(String),

    #[error("用户名或密码不正确")]
    WrongCredentials,

    #[error("验证码输入错误")]
    WrongKaptcha,

    #[error("{0}")]
    Empty(String),

    #[error("当前学年学期无学生时盒数据，您可能已经毕业了。\n\n如果是专升本同学，请使用专升本后的新学号登录～")]
    NoStudentRecord,

    #[error("{0}")]
    Unexpected(String),
}

impl PortalError {
    /// 内容为空的默认提示
    pub fn empty() -> Self {
        Self::Empty("获取内容为空".to_string())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

impl From<reqwest::Error> for PortalError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for PortalError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(format!("JSON: {}", err))
    }
}
