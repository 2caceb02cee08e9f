//! 统一返回结构 `{code, msg, data}` 与各接口的边界转换。

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::models::PortalError;

const RETRY_HINT: &str = "请重试，若多次失败可能是系统错误维护或需更新接口";

/// 返回码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    Success,            // 1000
    KaptchaIssued,      // 1001
    WrongCredentials,   // 1002
    Timeout,            // 1003
    WrongKaptcha,       // 1004
    Empty,              // 1005
    SessionExpired,     // 1006
    NoStudentRecord,    // 1014
    UpstreamError,      // 998
    Unknown,            // 999
    Unavailable,        // 2333
}

impl ResultCode {
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Success => 1000,
            Self::KaptchaIssued => 1001,
            Self::WrongCredentials => 1002,
            Self::Timeout => 1003,
            Self::WrongKaptcha => 1004,
            Self::Empty => 1005,
            Self::SessionExpired => 1006,
            Self::NoStudentRecord => 1014,
            Self::UpstreamError => 998,
            Self::Unknown => 999,
            Self::Unavailable => 2333,
        }
    }
}

impl TryFrom<i32> for ResultCode {
    type Error = String;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        let parsed = match code {
            1000 => Self::Success,
            1001 => Self::KaptchaIssued,
            1002 => Self::WrongCredentials,
            1003 => Self::Timeout,
            1004 => Self::WrongKaptcha,
            1005 => Self::Empty,
            1006 => Self::SessionExpired,
            1014 => Self::NoStudentRecord,
            998 => Self::UpstreamError,
            999 => Self::Unknown,
            2333 => Self::Unavailable,
            other => return Err(format!("未知的返回码: {}", other)),
        };
        Ok(parsed)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i32())
    }
}

// 序列化成数字, 与调用方约定的格式一致
impl Serialize for ResultCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.as_i32())
    }
}

impl<'de> Deserialize<'de> for ResultCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = i32::deserialize(deserializer)?;
        ResultCode::try_from(code).map_err(serde::de::Error::custom)
    }
}

impl PortalError {
    /// 异常对应的返回码
    pub fn code(&self) -> ResultCode {
        match self {
            PortalError::Timeout => ResultCode::Timeout,
            PortalError::Unavailable(_)
            | PortalError::Transport(_)
            | PortalError::Parse(_)
            | PortalError::InvalidUrl(_) => ResultCode::Unavailable,
            PortalError::SessionExpired => ResultCode::SessionExpired,
            PortalError::Upstream(_) => ResultCode::UpstreamError,
            PortalError::WrongCredentials => ResultCode::WrongCredentials,
            PortalError::WrongKaptcha => ResultCode::WrongKaptcha,
            PortalError::Empty(_) => ResultCode::Empty,
            PortalError::NoStudentRecord => ResultCode::NoStudentRecord,
            PortalError::Unexpected(_) => ResultCode::Unknown,
        }
    }
}

/// 每个公开接口的返回值。除 1001 携带验证码外, 只有 1000 带 data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: ResultCode,
    pub msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn success(msg: impl Into<String>, data: T) -> Self {
        Self { code: ResultCode::Success, msg: msg.into(), data: Some(data) }
    }

    pub(crate) fn kaptcha(msg: impl Into<String>, data: T) -> Self {
        Self { code: ResultCode::KaptchaIssued, msg: msg.into(), data: Some(data) }
    }

    pub fn failure(code: ResultCode, msg: impl Into<String>) -> Self {
        Self { code, msg: msg.into(), data: None }
    }

    pub fn is_success(&self) -> bool {
        self.code == ResultCode::Success
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }
}

/// 接口名称与提示语, 用于在边界处把 `PortalError` 转换成返回结构
#[derive(Debug, Clone, Copy)]
pub(crate) struct Operation {
    name: &'static str,         // 未记录错误的前缀, 例如 "获取成绩"
    timeout: &'static str,      // 超时提示的前缀
    success: &'static str,
}

impl Operation {
    pub const fn new(name: &'static str, success: &'static str) -> Self {
        Self { name, timeout: name, success }
    }

    pub const fn with_timeout(mut self, timeout: &'static str) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn finish<T>(&self, result: Result<T, PortalError>) -> Envelope<T> {
        match result {
            Ok(data) => Envelope::success(self.success, data),
            Err(err) => self.fail(err),
        }
    }

    pub fn fail<T>(&self, err: PortalError) -> Envelope<T> {
        let code = err.code();
        let msg = match &err {
            PortalError::Timeout => format!("{}超时", self.timeout),
            PortalError::Unavailable(status) => {
                log::warn!("{}: 教务系统返回 HTTP {}", self.name, status);
                "教务系统挂了".to_string()
            }
            PortalError::Transport(_) | PortalError::Parse(_) | PortalError::InvalidUrl(_) => {
                // 诊断信息只写日志, 不返回给调用方
                log::error!("{}失败: {}", self.name, err);
                RETRY_HINT.to_string()
            }
            PortalError::Unexpected(detail) => {
                log::error!("{}时未记录的错误: {}", self.name, detail);
                format!("{}时未记录的错误：{}", self.name, detail)
            }
            _ => err.to_string(),
        };
        Envelope::failure(code, msg)
    }
}
