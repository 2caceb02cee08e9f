// 小工具库: 字段规范化与学期编码
use chrono::Utc;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::models::IntOrText;

// 教务系统用 <br/> 拼接多个地点或时间
const LINE_BREAK: &str = "<br/>";

// 中文数字, char::is_numeric 不认这些字符
const CJK_NUMERALS: &str = "〇零一二三四五六七八九十百千万亿两壹贰叁肆伍陆柒捌玖拾佰仟";

/// 数字或原样返回: 空值返回 None, 非纯数字原样返回, 否则转成整数
pub fn parse_int(digits: Option<&str>) -> Option<IntOrText> {
    let digits = digits.filter(|d| !d.is_empty())?;
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Some(IntOrText::Text(digits.to_string()));
    }

    // 超出 i64 的数字串也按文本处理
    match digits.parse::<i64>() {
        Ok(n) => Some(IntOrText::Int(n)),
        Err(_) => Some(IntOrText::Text(digits.to_string())),
    }
}

/// 保留一位小数, "无" 记为 "0.0"
pub fn align_floats(floats: Option<&str>) -> Option<String> {
    let floats = floats.filter(|f| !f.is_empty())?;
    if floats == "无" {
        return Some("0.0".to_string());
    }

    match floats.trim().parse::<f64>() {
        Ok(value) => Some(format!("{:.1}", value)),
        Err(_) => {
            log::warn!("无法识别的小数: {}", floats);
            Some(floats.to_string())
        }
    }
}

/// 多个上课地点只取第一个
pub fn get_place(place: &str) -> String {
    match place.split_once(LINE_BREAK) {
        Some((first, _)) => first.to_string(),
        None => place.to_string(),
    }
}

/// 多段上课时间用顿号连接
pub fn get_course_time(time: &str) -> String {
    time.split(LINE_BREAK).collect::<Vec<_>>().join("、")
}

/// 判断是否为数字, 兼容全角、罗马数字与中文数字等写法
pub fn is_number(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    if s.trim().parse::<f64>().is_ok() {
        return true;
    }
    s.chars().all(|c| c.is_numeric() || CJK_NUMERALS.contains(c))
}

/// 学期号转换成教务系统的学期代码: 1 -> 3, 2 -> 12
pub fn term_code(term: u32) -> u32 {
    term * term * 3
}

/// 查询参数里的学期, 0 表示全部学期, 发送空串
pub fn term_param(term: u32) -> String {
    match term_code(term) {
        0 => String::new(),
        code => code.to_string(),
    }
}

/// 当前毫秒时间戳, 对应接口里的 nd 参数
pub fn timestamp_millis() -> String {
    Utc::now().timestamp_millis().to_string()
}

/// 反序列化时同时接受字符串、数字和布尔值, null 视为缺失
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(value_text))
}

/// JSON 值转文本: 字符串原样, 数字和布尔值转字符串, null 为 None
pub fn value_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// 区分 "字段缺失" 与 "字段为 null": 缺失时靠 #[serde(default)] 得到 None, 出现即为 Some
pub fn present_string<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_string(deserializer).map(Some)
}
