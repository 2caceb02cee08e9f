mod common;

use common::*;
use rust_decimal_macros::dec;
use zfn_scraper::{ClientConfig, CourseSelection, IntOrText, PortalError, PortalResponse, ResultCode};

#[tokio::test]
async fn grades_are_fetched_with_term_code() {
    let body = r#"{"items": [
        {"xh": "2101010101", "xm": "张三", "kch_id": "A01", "kcmc": "高等数学", "xf": "4", "cj": "95", "jd": "4.5"},
        {"xh": "2101010101", "xm": "张三", "kch_id": "B02", "kcmc": "体育", "xf": "1", "cj": "优秀", "jd": "无"}
    ]}"#;
    let (client, log) = common::client(ScriptedTransport::new().ok(body));

    let envelope = client.get_grade(2023, 2, false).await;
    assert_eq!(envelope.code, ResultCode::Success);
    let report = envelope.data.unwrap();
    assert_eq!(report.count, 2);
    assert_eq!(report.sid.as_deref(), Some("2101010101"));
    assert_eq!(report.courses[0].grade, Some(IntOrText::Int(95)));
    assert_eq!(report.courses[1].grade, Some(IntOrText::Text("优秀".to_string())));
    assert_eq!(report.courses[1].grade_point.as_deref(), Some("0.0"));

    let requests = log.lock().await;
    assert!(requests[0].url.path().ends_with("cjcx/cjcx_cxXsgrcj.html"));
    assert_eq!(requests[0].form_value("xqm"), Some("12"));
    assert_eq!(requests[0].form_value("xnm"), Some("2023"));
}

#[tokio::test]
async fn whole_year_grades_send_blank_term() {
    let (client, log) = common::client(ScriptedTransport::new().ok(r#"{"items": []}"#));
    let envelope = client.get_grade(2023, 0, true).await;
    assert_eq!(envelope.code, ResultCode::Empty);
    assert_eq!(envelope.msg, "获取内容为空");

    let requests = log.lock().await;
    assert!(requests[0].url.path().ends_with("cjcx/cjcx_cxDgXscj.html"));
    assert_eq!(requests[0].form_value("xqm"), Some(""));
}

#[tokio::test]
async fn non_200_is_reported_without_payload() {
    let outage = || ScriptedTransport::new().then(PortalResponse::new(502, "Bad Gateway"));

    let (client, _) = common::client(outage());
    let envelope = client.get_grade(2023, 1, false).await;
    assert_eq!(envelope.code, ResultCode::Unavailable);
    assert_eq!(envelope.data, None);

    let (client, _) = common::client(outage());
    assert_eq!(client.get_schedule(2023, 1).await.code.as_i32(), 2333);

    let (client, _) = common::client(outage());
    assert_eq!(client.get_info().await.code.as_i32(), 2333);

    let (client, _) = common::client(outage());
    assert_eq!(client.get_notifications().await.code.as_i32(), 2333);

    let (client, _) = common::client(outage());
    assert_eq!(client.get_academia().await.code.as_i32(), 2333);
}

#[tokio::test]
async fn login_prompt_means_session_expired() {
    let (client, _) = common::client(ScriptedTransport::new().ok(LOGIN_PROMPT));
    let envelope = client.get_exam_schedule(2023, 1).await;
    assert_eq!(envelope.code, ResultCode::SessionExpired);
    assert_eq!(envelope.msg, "未登录或已过期，请重新登录");
}

#[tokio::test]
async fn timeout_is_named_after_operation() {
    let (client, _) = common::client(ScriptedTransport::new().fail(PortalError::Timeout));
    let envelope = client.get_schedule(2023, 1).await;
    assert_eq!(envelope.code, ResultCode::Timeout);
    assert_eq!(envelope.msg, "获取课表超时");
}

#[tokio::test]
async fn malformed_json_hides_detail() {
    let (client, _) = common::client(ScriptedTransport::new().ok("<html>维护中</html>"));
    let envelope = client.get_grade(2023, 1, false).await;
    assert_eq!(envelope.code, ResultCode::Unavailable);
    assert_eq!(envelope.msg, "请重试，若多次失败可能是系统错误维护或需更新接口");
}

#[tokio::test]
async fn schedule_splits_combined_periods() {
    let body = r#"{
        "xsxx": {"XH": "2101010101", "XM": "张三"},
        "kbList": [
            {"kch_id": "A01", "kcmc": "高等数学", "xqj": "1", "jc": "1-2节,5-6节", "zcd": "1-16周"},
            {"kch_id": "A01", "kcmc": "高等数学", "xqj": "1", "jc": "1-2节,5-6节", "zcd": "1-16周"}
        ],
        "sjkList": []
    }"#;
    let (client, log) = common::client(ScriptedTransport::new().ok(body));

    let schedule = client.get_schedule(2023, 1).await.into_data().unwrap();
    assert_eq!(schedule.count, 2);
    assert_eq!(schedule.courses[1].list_sessions, Some(vec![1, 2]));
    assert_eq!(schedule.courses[1].time.as_deref(), Some("08:00~09:40"));
    assert_eq!(schedule.courses[0].list_sessions, Some(vec![5, 6]));
    assert_eq!(schedule.courses[0].time.as_deref(), Some("14:00~15:40"));

    let requests = log.lock().await;
    assert_eq!(requests[0].form_value("xqm"), Some("3"));
}

#[tokio::test]
async fn exams_are_mapped() {
    let body = r#"{"items": [{"xh": "2101010101", "xm": "张三", "kch": "A01", "kcmc": "高等数学", "kssj": "2024-01-08(09:00-11:00)", "cdmc": "教一101", "zwh": "12", "xf": "4"}]}"#;
    let (client, _) = common::client(ScriptedTransport::new().ok(body));

    let exams = client.get_exam_schedule(2023, 1).await.into_data().unwrap();
    assert_eq!(exams.count, 1);
    assert_eq!(exams.courses[0].location.as_deref(), Some("教一101"));
    assert_eq!(exams.courses[0].seat_number.as_deref(), Some("12"));
    assert_eq!(exams.courses[0].credit.as_deref(), Some("4.0"));
}

#[tokio::test]
async fn info_falls_back_to_profile_page() {
    let profile = r#"<html><body>
        <div class="col-sm-6"><div class="form-group"><label class="col-sm-4 control-label">学号：</label><div class="col-sm-8"><p class="form-control-static">2101010101</p></div></div></div>
        <div class="col-sm-4"><div class="form-group"><label class="col-sm-4 control-label">姓名：</label><div class="col-sm-8"><p class="form-control-static">张三</p></div></div></div>
    </body></html>"#;
    let details = r#"<html><body>
        <div class="col-sm-6"><div class="form-group"><label class="col-sm-4 control-label">学院</label><div class="col-sm-8"><label class="control-label">计算机学院</label></div></div></div>
    </body></html>"#;
    let (client, log) = common::client(ScriptedTransport::new().ok("null").ok(profile).ok(details));

    let info = client.get_info().await.into_data().unwrap();
    assert_eq!(info.sid.as_deref(), Some("2101010101"));
    assert_eq!(info.name.as_deref(), Some("张三"));
    assert_eq!(info.college_name.as_deref(), Some("计算机学院"));
    assert_eq!(info.major_name.as_deref(), Some("无"));
    assert_eq!(log.lock().await.len(), 3);
}

#[tokio::test]
async fn graduated_student_has_no_record() {
    let profile = r#"<div class="col-sm-6"><div class="form-group"><label class="col-sm-4 control-label">学号：</label><div class="col-sm-8"><p class="form-control-static"></p></div></div></div>"#;
    let (client, _) = common::client(ScriptedTransport::new().ok("null").ok(profile));

    let envelope = client.get_info().await;
    assert_eq!(envelope.code.as_i32(), 1014);
    assert!(envelope.msg.contains("专升本"));
}

#[tokio::test]
async fn notifications_are_split() {
    let body = r#"{"items": [{"xxnr": "调课提醒:高等数学调至周三", "cjsj": "2024-03-01 08:00:00"}, {"xxnr": "系统维护"}]}"#;
    let (client, _) = common::client(ScriptedTransport::new().ok(body));

    let notifications = client.get_notifications().await.into_data().unwrap();
    assert_eq!(notifications.len(), 2);
    assert_eq!(notifications[0].kind.as_deref(), Some("调课提醒"));
    assert_eq!(notifications[1].kind, None);
    assert_eq!(notifications[1].content.as_deref(), Some("系统维护"));
}

#[tokio::test]
async fn notification_error_page_means_expired() {
    let body = r#"<html><head><title>错误提示</title></head><body><p class="error_title">会话已失效</p></body></html>"#;
    let (client, _) = common::client(ScriptedTransport::new().ok(body));
    assert_eq!(client.get_notifications().await.code, ResultCode::SessionExpired);
}

#[tokio::test]
async fn selected_courses_parse_teacher() {
    let body = r#"[{"kch": "C03", "jxb_id": "J1", "do_jxb_id": "D1", "kcmc": "数据结构", "jsxx": "1001/赵六/讲师", "xf": "3.5", "jxbrs": "60", "yxzrs": "58"}]"#;
    let (client, log) = common::client(ScriptedTransport::new().ok(body));

    let selected = client.get_selected_courses(2023, 1).await.into_data().unwrap();
    assert_eq!(selected.count, 1);
    assert_eq!(selected.courses[0].teacher_id, "1001");
    assert_eq!(selected.courses[0].credit, dec!(3.5));
    assert_eq!(selected.courses[0].capacity, 60);
    assert_eq!(log.lock().await[0].form_value("xkxqm"), Some("3"));
}

#[tokio::test]
async fn malformed_teacher_is_unexpected() {
    let (client, _) = common::client(ScriptedTransport::new().ok(r#"[{"kch": "C03", "jsxx": "赵六"}]"#));
    let envelope = client.get_selected_courses(2023, 1).await;
    assert_eq!(envelope.code, ResultCode::Unknown);
    assert!(envelope.msg.starts_with("获取已选课程时未记录的错误："));
}

#[tokio::test]
async fn all_selected_courses_without_term() {
    let body = r#"{"items": [{"kch": "C03", "kcmc": "数据结构", "xf": 3, "jsxm": "赵六"}]}"#;
    let (client, log) = common::client(ScriptedTransport::new().ok(body));

    let selected = client.get_selected_courses_all(0, 0).await.into_data().unwrap();
    assert_eq!(selected.term, 0);
    assert_eq!(selected.courses[0].credit, dec!(3));

    let requests = log.lock().await;
    assert!(requests[0].url.path().ends_with("jwglxt/xsxxxggl/xsxxwh_cxXsxkxx.html"));
    assert_eq!(requests[0].form_value("xnm"), Some(""));
    assert_eq!(requests[0].form_value("queryModel.showCount"), Some("5000"));
}

const BLOCK_INDEX: &str = r#"<html><body>
    <font color="red">10</font><font color="red">2</font><font color="red">8</font>
    <a role="tab" onclick="tab('10','X1')">一</a><a role="tab" onclick="tab('11','X2')">二</a><a role="tab" onclick="tab('12','X3')">三</a>
    <input type="hidden" name="bklx_id" value="0"><input type="hidden" name="xqh_id" value="1">
    <input type="hidden" name="zyfx_id" value="wfx"><input type="hidden" name="njdm_id" value="2021">
    <input type="hidden" name="bh_id" value="210101"><input type="hidden" name="xbm" value="1">
    <input type="hidden" name="xslbdm" value="wlb"><input type="hidden" name="ccdm" value="3">
    <input type="hidden" name="xsbj" value="0"><input type="hidden" name="zyh_id" value="0101">
</body></html>"#;

const BLOCK_DISPLAY: &str = r#"<input type="hidden" name="kkbk" value="0"><input type="hidden" name="rwlx" value="2">"#;

fn block_transport(part: &str, classes: &str) -> ScriptedTransport {
    ScriptedTransport::new().ok(BLOCK_INDEX).ok(BLOCK_DISPLAY).ok(part.to_string()).ok(classes.to_string())
}

#[tokio::test]
async fn block_courses_walk_all_pages() {
    let part = r#"{"tmpList": [{"kch_id": "K1", "kcmc": "音乐鉴赏", "xf": "2"}]}"#;
    let classes = r#"[{"jxb_id": "J1", "do_jxb_id": "D1", "jsxx": "3001/孙七/讲师", "jxbrl": "120", "yxzrs": "100", "jxdd": "艺术楼201", "sksj": "星期二第9-10节"}]"#;
    let (client, log) = common::client(block_transport(part, classes));

    let envelope = client.get_block_courses(2023, 1, 2).await;
    assert_eq!(envelope.code, ResultCode::Success, "{}", envelope.msg);
    let block = envelope.into_data().unwrap();
    assert_eq!(block.count, 1);
    assert_eq!(block.courses[0].kklxdm, "11");
    assert_eq!(block.courses[0].do_id.as_deref(), Some("D1"));
    assert_eq!(block.courses[0].capacity, 120);

    let requests = log.lock().await;
    assert_eq!(requests[1].form_value("xkkz_id"), Some("X2"));
    assert_eq!(requests[2].form_value("rwlx"), Some("2"));
    assert_eq!(requests[3].form_value("kch_id"), Some("K1"));
}

#[tokio::test]
async fn block_count_mismatch_is_unexpected() {
    let part = r#"{"tmpList": [{"kch_id": "K1", "kcmc": "音乐鉴赏", "xf": "2"}, {"kch_id": "K2", "kcmc": "书法", "xf": "1"}]}"#;
    let classes = r#"[{"jxb_id": "J1", "do_jxb_id": "D1", "jsxx": "3001/孙七/讲师", "jxbrl": "120", "yxzrs": "100"}]"#;
    let (client, _) = common::client(block_transport(part, classes));

    let envelope = client.get_block_courses(2023, 1, 1).await;
    assert_eq!(envelope.code, ResultCode::Unknown);
    assert_eq!(envelope.code.as_i32(), 999);
    assert!(envelope.msg.contains("板块课编号及长度错误"), "{}", envelope.msg);
    assert_eq!(envelope.data, None);
}

#[tokio::test]
async fn third_block_tolerates_count_mismatch() {
    let part = r#"{"tmpList": [{"kch_id": "K1", "kcmc": "音乐鉴赏", "xf": "2"}, {"kch_id": "K2", "kcmc": "书法", "xf": "1"}]}"#;
    let classes = r#"[{"jxb_id": "J1", "do_jxb_id": "D1", "jsxx": "3001/孙七/讲师", "jxbrl": "120", "yxzrs": "100"}]"#;
    let (client, log) = common::client(block_transport(part, classes));

    let envelope = client.get_block_courses(2023, 1, 3).await;
    assert_eq!(envelope.code, ResultCode::Success, "{}", envelope.msg);
    let block = envelope.into_data().unwrap();
    assert_eq!(block.count, 1);
    assert_eq!(block.courses[0].kklxdm, "12");

    let requests = log.lock().await;
    assert_eq!(requests[1].form_value("xkkz_id"), Some("X3"));
}

#[tokio::test]
async fn numeric_block_course_id_is_forwarded() {
    let part = r#"{"tmpList": [{"kch_id": 10086, "kcmc": "音乐鉴赏", "xf": 2}]}"#;
    let classes = r#"[{"jxb_id": "J1", "do_jxb_id": "D1", "jsxx": "3001/孙七/讲师", "jxbrl": 120, "yxzrs": 100}]"#;
    let (client, log) = common::client(block_transport(part, classes));

    let envelope = client.get_block_courses(2023, 1, 2).await;
    assert_eq!(envelope.code, ResultCode::Success, "{}", envelope.msg);
    assert_eq!(envelope.into_data().unwrap().courses[0].course_id.as_deref(), Some("10086"));

    let requests = log.lock().await;
    assert_eq!(requests[3].form_value("kch_id"), Some("10086"));
}

#[tokio::test]
async fn select_and_cancel_course() {
    let (client, log) = common::client(ScriptedTransport::new().ok(r#"{"flag": "1"}"#).ok("\"1\""));
    let selection = CourseSelection {
        sid: "2101010101".to_string(),
        course_id: "K1".to_string(),
        do_id: "D1".to_string(),
        kklxdm: "11".to_string(),
        year: 2023,
        term: 2,
    };

    let selected = client.select_course(&selection).await;
    assert_eq!(selected.code, ResultCode::Success);
    assert_eq!(selected.data.unwrap()["flag"], "1");

    let cancelled = client.cancel_course("D1", "K1", 2023, 2).await;
    assert_eq!(cancelled.msg, "退课成功");
    assert_eq!(cancelled.data.unwrap().status, "1");

    let requests = log.lock().await;
    assert_eq!(requests[0].form_value("njdm_id"), Some("21"));
    assert_eq!(requests[0].form_value("zyh_id"), Some("0101"));
    assert_eq!(requests[0].form_value("xkxqm"), Some("12"));
    assert_eq!(requests[1].form_value("jxb_ids"), Some("D1"));
}

fn academia_index() -> &'static str {
    concat!(
        r#"<html><body><input id="xh_id" value="2101010101">"#,
        r#"<div id="alertBox">平均学分绩点：3.10 计划总课程 50门 通过 40门, 未通过 1门; 未修 6门 在读 3门 计划外：通过 1门, 未通过 0门</div>"#,
        "\n<script>var title = \"通识必修课&nbsp;要求学分:20.0&nbsp;获得学分:18.0&nbsp;未获得学分:2.0&nbsp;\";</script>\n",
        "<div><span id='showKcA1'></span></div>\n",
        "<script>var title = \"专业选修课&nbsp;要求学分:10.0&nbsp;获得学分:0&nbsp;未获得学分:10.0&nbsp;\";</script>\n",
        "<div><span id='showKcB2'></span></div>\n",
        "</body></html>"
    )
}

#[tokio::test]
async fn academia_collects_category_courses() {
    let index = academia_index();
    let courses = r#"[{"KCH": "A01", "KCMC": "高等数学", "XDZT": "4", "JYXDXNM": "2021", "JYXDXQMC": "1", "XF": "4", "KCLBMC": "通识课", "MAXCJ": "95", "JD": "4.5"}]"#;
    let (client, log) = common::client(ScriptedTransport::new().ok(index).ok(courses).ok("[]"));

    let envelope = client.get_academia().await;
    assert_eq!(envelope.code, ResultCode::Success, "{}", envelope.msg);
    let report = envelope.into_data().unwrap();
    assert_eq!(report.sid, "2101010101");
    assert_eq!(report.statistics.gpa, Some(dec!(3.10)));
    assert_eq!(report.statistics.planned_courses.as_ref().map(|p| p.missed), Some(6));
    assert_eq!(report.details.len(), 1);

    let category = &report.details[0];
    assert_eq!(category.category, "通识必修课");
    assert_eq!(category.credits.earned.as_deref(), Some("18.0"));
    assert_eq!(category.courses[0].display_term.as_deref(), Some("大一上"));
    assert_eq!(category.courses[0].category.as_deref(), Some("通识课"));
    assert_eq!(category.courses[0].max_grade, Some(IntOrText::Int(95)));

    let requests = log.lock().await;
    assert_eq!(requests[1].form_value("xfyqjd_id"), Some("A1"));
    assert_eq!(requests[2].form_value("xfyqjd_id"), Some("B2"));
}

#[tokio::test]
async fn academia_detail_category_is_looked_up() {
    let courses = r#"[
        {"KCH": "A01", "KCMC": "高等数学", "XF": "4", "KCLBMC": "通识课"},
        {"KCH": "", "KCMC": "待定课程", "XF": "2", "KCLBMC": "通识课"}
    ]"#;
    let detail = r#"<html><body><table><tr>
        <th>课程号</th><th>A01</th><th>课程名称</th><th>高等数学</th><th>学分</th><th>4</th><th>数学与自然科学</th>
    </tr></table></body></html>"#;
    let mut config = ClientConfig::new(BASE_URL);
    config.detail_category_types = vec!["通识必修课".to_string()];
    let transport = ScriptedTransport::new().ok(academia_index()).ok(courses).ok(detail).ok("[]");
    let (client, log) = client_with(config, transport);

    let envelope = client.get_academia().await;
    assert_eq!(envelope.code, ResultCode::Success, "{}", envelope.msg);
    let report = envelope.into_data().unwrap();
    let courses = &report.details[0].courses;
    assert_eq!(courses[0].category.as_deref(), Some("数学与自然科学"));
    // 没有课程号时不查询详情
    assert_eq!(courses[1].category, None);

    let requests = log.lock().await;
    assert_eq!(requests.len(), 4);
    assert!(requests[2].url.path().ends_with("jxjhgl/common_cxKcJbxx.html"));
    assert!(requests[2].url.query_pairs().any(|(k, v)| k == "id" && v == "A01"));
    assert_eq!(requests[3].form_value("xfyqjd_id"), Some("B2"));
}

#[tokio::test]
async fn academia_detail_outage_is_reported() {
    let courses = r#"[{"KCH": "A01", "KCMC": "高等数学", "XF": "4", "KCLBMC": "通识课"}]"#;
    let mut config = ClientConfig::new(BASE_URL);
    config.detail_category_types = vec!["通识必修课".to_string()];
    let transport = ScriptedTransport::new()
        .ok(academia_index())
        .ok(courses)
        .then(PortalResponse::new(502, "Bad Gateway"));
    let (client, _) = client_with(config, transport);
    let envelope = client.get_academia().await;
    assert_eq!(envelope.code, ResultCode::Unavailable);
    assert_eq!(envelope.data, None);

    let mut config = ClientConfig::new(BASE_URL);
    config.detail_category_types = vec!["通识必修课".to_string()];
    let transport = ScriptedTransport::new().ok(academia_index()).ok(courses).ok(LOGIN_PROMPT);
    let (client, _) = client_with(config, transport);
    assert_eq!(client.get_academia().await.code, ResultCode::SessionExpired);
}

#[tokio::test]
async fn schedule_pdf_reports_error_page() {
    let error = r#"<html><head><title>错误提示</title></head><body><p class="error_title">当前学期课表未发布</p></body></html>"#;
    let (client, log) = common::client(ScriptedTransport::new().ok("1").ok(error));

    let envelope = client.get_schedule_pdf(2023, 1, "张三").await;
    assert_eq!(envelope.code, ResultCode::UpstreamError);
    assert_eq!(envelope.msg, "当前学期课表未发布");

    let requests = log.lock().await;
    assert_eq!(requests[1].query, vec![("doType".to_string(), "table".to_string())]);
    assert_eq!(requests[1].form_value("xnmc"), Some("2023-2024"));
}

#[tokio::test]
async fn academia_pdf_follows_report_path() {
    let pdf = b"%PDF-1.4".to_vec();
    let transport = ScriptedTransport::new()
        .ok("<html></html>")
        .ok("")
        .ok("")
        .ok("")
        .ok("")
        .ok(r#""\/jwglxt\/templates\/temp\/report.pdf#成功""#)
        .ok("")
        .ok(pdf.clone());
    let (client, log) = common::client(transport);

    let envelope = client.get_academia_pdf().await;
    assert_eq!(envelope.msg, "获取学生成绩总表pdf成功");
    assert_eq!(envelope.data, Some(pdf));

    let requests = log.lock().await;
    assert_eq!(requests.len(), 8);
    assert_eq!(requests[5].form_value("gsdygx"), Some("10628-zw-mrgs"));
    assert_eq!(requests[7].url.as_str(), "http://jw.example.edu.cn/jwglxt/templates/temp/report.pdf");
    assert_eq!(requests[7].timeout, std::time::Duration::from_secs(5));
}
