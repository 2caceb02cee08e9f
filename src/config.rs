//! 客户端配置, 构造时传入并随会话保存。

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::Cookies;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/56.0.2924.87 Safari/537.36";

/// 作息时间表, 第 n 节课对应第 n 项 `(开始, 结束)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeSlotTable(Vec<(String, String)>);

impl TimeSlotTable {
    pub fn new(slots: Vec<(String, String)>) -> Self {
        Self(slots)
    }

    /// 第 `session` 节的起止时间, 节次从 1 开始
    pub fn slot(&self, session: u32) -> Option<(&str, &str)> {
        let index = usize::try_from(session).ok()?.checked_sub(1)?;
        self.0.get(index).map(|(start, end)| (start.as_str(), end.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for TimeSlotTable {
    // 常见的 12 节作息
    fn default() -> Self {
        let slots = [
            ("08:00", "08:45"), ("08:55", "09:40"), ("10:00", "10:45"), ("10:55", "11:40"),
            ("14:00", "14:45"), ("14:55", "15:40"), ("16:00", "16:45"), ("16:55", "17:40"),
            ("19:00", "19:45"), ("19:55", "20:40"), ("20:50", "21:35"), ("21:45", "22:30"),
        ];
        Self(slots.iter().map(|(s, e)| (s.to_string(), e.to_string())).collect())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// 教务系统根地址, 例如 `http://jwxt.example.edu.cn/jwglxt/`
    pub base_url: String,
    pub cookies: Cookies,
    pub time_slots: TimeSlotTable,
    /// 学业情况中不统计的课程类别
    pub ignore_types: Vec<String>,
    /// 需要逐门查询课程详情才能得到类别的课程类别
    pub detail_category_types: Vec<String>,
    pub timeout_secs: u64,
    /// 成绩总表的打印模板编号, 各校不同
    pub transcript_template: String,
    pub user_agent: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Self::default() }
    }

    pub fn with_cookies(mut self, cookies: Cookies) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            cookies: Cookies::new(),
            time_slots: TimeSlotTable::default(),
            ignore_types: Vec::new(),
            detail_category_types: Vec::new(),
            timeout_secs: 3,
            transcript_template: "10628-zw-mrgs".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}
