// 课表编码转换: 节次、周次、上课时间与被拆开的连堂课
use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::TimeSlotTable;
use crate::models::{IntOrText, ScheduleCourse};

lazy_static! {
    static ref NUMBER: Regex = Regex::new(r"(\d+)").expect("数字正则");
}

// 提取字符串中所有的数字
fn numbers(text: &str) -> Vec<u32> {
    NUMBER
        .find_iter(text)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// "3-4节" -> [3, 4]; 只有一个数字时返回该节
pub fn list_sessions(sessions: Option<&str>) -> Option<Vec<u32>> {
    let sessions = sessions.filter(|s| !s.is_empty())?;
    match numbers(sessions).as_slice() {
        [] => None,
        [single] => Some(vec![*single]),
        [start, end, ..] => Some((*start..=*end).collect()),
    }
}

/// 展开周次: "1,3,5-7" -> [1,3,5,6,7], "1-5单" -> [1,3,5], "1-5双" -> [2,4]
pub fn list_weeks(weeks: Option<&str>) -> Option<Vec<u32>> {
    let weeks = weeks.filter(|w| !w.is_empty())?;
    let mut week_list = Vec::new();

    for item in weeks.split(',').filter(|i| !i.is_empty()) {
        let nums = numbers(item);
        if item.contains('-') {
            // 区间必须恰好两个端点, 否则跳过
            let [start, end] = nums.as_slice() else { continue };
            let range = *start..=*end;
            if item.contains('单') {
                week_list.extend(range.filter(|w| w % 2 == 1));
            } else if item.contains('双') {
                week_list.extend(range.filter(|w| w % 2 == 0));
            } else {
                week_list.extend(range);
            }
        } else if let [week] = nums.as_slice() {
            week_list.push(*week);
        }
    }

    Some(week_list)
}

/// 根据作息表生成上课时间, 从首节的开始到末节的结束
pub fn display_course_time(sessions: Option<&str>, slots: &TimeSlotTable) -> Option<String> {
    let list = list_sessions(sessions)?;
    let (start, _) = slots.slot(*list.first()?)?;
    let (_, end) = slots.slot(*list.last()?)?;
    Some(format!("{}~{}", start, end))
}

/// 学号前两位为入学年级, 换算 "大一上" ~ "大四下"
pub fn get_display_term(sid: &str, year: Option<&str>, term: Option<&str>) -> Option<String> {
    let grade: u32 = sid.get(0..2)?.parse().ok()?;
    let year: u32 = year?.get(2..4)?.parse().ok()?;
    let term: u32 = term?.trim().parse().ok()?;

    let stage = match year.checked_sub(grade)? {
        0 => "大一",
        1 => "大二",
        2 => "大三",
        3 => "大四",
        _ => return None,
    };
    let half = if term == 1 { "上" } else { "下" };
    Some(format!("{}{}", stage, half))
}

// 同一门课同一天同一周次的两条记录
type MergeKey = (Option<String>, Option<IntOrText>, Option<String>);

/// 教务系统偶尔把两段连堂课写进同一个节次字段, 如 "1-2节,5-6节",
/// 并且返回两条相同的记录。这里把它们拆回两条各自两节的记录。
pub fn split_merge_display(courses: Vec<ScheduleCourse>, slots: &TimeSlotTable) -> Vec<ScheduleCourse> {
    let mut groups: HashMap<MergeKey, Vec<usize>> = HashMap::new();
    for (index, course) in courses.iter().enumerate() {
        let key = (course.course_id.clone(), course.weekday.clone(), course.weeks.clone());
        groups.entry(key).or_default().push(index);
    }

    let mut courses = courses;
    for indexes in groups.values() {
        // 只处理恰好成对的记录
        let &[earlier, later] = indexes.as_slice() else { continue };

        // 优先使用后一条记录的节次, 与教务系统的返回顺序一致
        let combined = [later, earlier]
            .into_iter()
            .map(|i| numbers(courses[i].sessions.as_deref().unwrap_or_default()))
            .find(|nums| nums.len() == 4);
        let Some(nums) = combined else { continue };

        set_sessions(&mut courses[later], nums[0], nums[1], slots);
        set_sessions(&mut courses[earlier], nums[2], nums[3], slots);
    }
    courses
}

fn set_sessions(course: &mut ScheduleCourse, start: u32, end: u32, slots: &TimeSlotTable) {
    let sessions = format!("{}-{}节", start, end);
    course.list_sessions = list_sessions(Some(&sessions));
    course.time = display_course_time(Some(&sessions), slots);
    course.sessions = Some(sessions);
}
