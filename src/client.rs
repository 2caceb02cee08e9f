// 对外接口层: 每个方法都返回统一的 `Envelope`, 错误不会向外传播
use rust_decimal::Decimal;
use serde_json::Value;

use crate::academia;
use crate::auth;
use crate::config::ClientConfig;
use crate::courses;
use crate::envelope::{Envelope, Operation};
use crate::grades;
use crate::http::{ReqwestTransport, Transport};
use crate::info;
use crate::models::{
    AcademiaReport, BlockCourses, CancelResult, Cookies, CourseSelection, ExamSchedule, GradeReport, KaptchaChallenge,
    LoginPayload, Notification, PortalError, Schedule, SelectedCourses, SelectedCoursesBrief, StudentInfo,
};
use crate::notifications;
use crate::schedule;
use crate::session::Session;

const GET_INFO: Operation = Operation::new("获取个人信息", "获取个人信息成功");
const GET_GRADE: Operation = Operation::new("获取成绩", "获取成绩成功");
const GET_GPA: Operation = Operation::new("获取GPA", "获取GPA成功");
const GET_SCHEDULE: Operation = Operation::new("获取课表", "获取课表成功");
const GET_SCHEDULE_PDF: Operation = Operation::new("获取课程表pdf", "获取课程表pdf成功");
const GET_EXAM_SCHEDULE: Operation = Operation::new("获取考试信息", "获取考试信息成功");
const GET_SELECTED: Operation = Operation::new("获取已选课程", "获取已选课程成功");
const GET_SELECTED_ALL: Operation = Operation::new("获取已选课程2", "获取已选课程2成功");
const GET_BLOCK: Operation = Operation::new("获取板块课信息", "获取板块课信息成功");
const SELECT_COURSE: Operation = Operation::new("选课", "选课成功");
const CANCEL_COURSE: Operation = Operation::new("退课", "退课成功");
const GET_ACADEMIA: Operation = Operation::new("获取学业情况", "获取学业情况成功");
const GET_ACADEMIA_PDF: Operation = Operation::new("获取成绩总表pdf", "获取学生成绩总表pdf成功");
const GET_NOTIFICATIONS: Operation = Operation::new("获取消息", "获取消息成功");

/// 教务系统客户端, 一个实例对应一个登录会话
pub struct Client {
    session: Session,
}

impl Client {
    /// 使用 reqwest 发送请求
    pub fn new(config: ClientConfig) -> Result<Self, PortalError> {
        let transport = ReqwestTransport::new(&config.user_agent)?;
        Self::with_transport(config, transport)
    }

    /// 使用自定义的 Transport, 测试时传入假实现
    pub fn with_transport(config: ClientConfig, transport: impl Transport + 'static) -> Result<Self, PortalError> {
        let session = Session::new(config, Box::new(transport))?;
        Ok(Self { session })
    }

    pub fn cookies(&self) -> &Cookies {
        self.session.cookies()
    }

    pub fn config(&self) -> &ClientConfig {
        self.session.config()
    }

    // ---------- 登录 ----------

    /// 登录; 需要验证码时返回 1001 和待识别的验证码
    pub async fn login(&mut self, sid: &str, password: &str) -> Envelope<LoginPayload> {
        auth::login(&mut self.session, sid, password).await
    }

    /// 用识别出的验证码完成登录, 凭据包只能使用一次
    pub async fn login_with_kaptcha(&mut self, challenge: KaptchaChallenge, kaptcha: &str) -> Envelope<LoginPayload> {
        auth::login_with_kaptcha(&mut self.session, challenge, kaptcha).await
    }

    // ---------- 查询 ----------

    pub async fn get_info(&self) -> Envelope<StudentInfo> {
        GET_INFO.finish(info::get_info(&self.session).await)
    }

    /// 成绩; term 为 0 时查询全学年
    pub async fn get_grade(&self, year: i32, term: u32, use_personal_info: bool) -> Envelope<GradeReport> {
        GET_GRADE.finish(grades::get_grade(&self.session, year, term, use_personal_info).await)
    }

    pub async fn get_gpa(&self) -> Envelope<Decimal> {
        GET_GPA.finish(grades::get_gpa(&self.session).await)
    }

    pub async fn get_schedule(&self, year: i32, term: u32) -> Envelope<Schedule> {
        GET_SCHEDULE.finish(schedule::get_schedule(&self.session, year, term).await)
    }

    pub async fn get_schedule_pdf(&self, year: i32, term: u32, name: &str) -> Envelope<Vec<u8>> {
        GET_SCHEDULE_PDF.finish(schedule::get_schedule_pdf(&self.session, year, term, name).await)
    }

    pub async fn get_exam_schedule(&self, year: i32, term: u32) -> Envelope<ExamSchedule> {
        GET_EXAM_SCHEDULE.finish(schedule::get_exam_schedule(&self.session, year, term).await)
    }

    pub async fn get_academia(&self) -> Envelope<AcademiaReport> {
        GET_ACADEMIA.finish(academia::get_academia(&self.session).await)
    }

    pub async fn get_academia_pdf(&self) -> Envelope<Vec<u8>> {
        GET_ACADEMIA_PDF.finish(academia::get_academia_pdf(&self.session).await)
    }

    pub async fn get_notifications(&self) -> Envelope<Vec<Notification>> {
        GET_NOTIFICATIONS.finish(notifications::get_notifications(&self.session).await)
    }

    // ---------- 选课 ----------

    pub async fn get_selected_courses(&self, year: i32, term: u32) -> Envelope<SelectedCourses> {
        GET_SELECTED.finish(courses::get_selected_courses(&self.session, year, term).await)
    }

    /// 学年或学期为 0 时查询全部已选课程
    pub async fn get_selected_courses_all(&self, year: i32, term: u32) -> Envelope<SelectedCoursesBrief> {
        GET_SELECTED_ALL.finish(courses::get_selected_courses_all(&self.session, year, term).await)
    }

    pub async fn get_block_courses(&self, year: i32, term: u32, block: usize) -> Envelope<BlockCourses> {
        GET_BLOCK.finish(courses::get_block_courses(&self.session, year, term, block).await)
    }

    pub async fn select_course(&self, selection: &CourseSelection) -> Envelope<Value> {
        SELECT_COURSE.finish(courses::select_course(&self.session, selection).await)
    }

    pub async fn cancel_course(&self, do_id: &str, course_id: &str, year: i32, term: u32) -> Envelope<CancelResult> {
        CANCEL_COURSE.finish(courses::cancel_course(&self.session, do_id, course_id, year, term).await)
    }
}
