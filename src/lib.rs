//! 正方教务系统客户端。
//!
//! 登录(含 RSA 加密与验证码两步登录)后抓取成绩、课表、考试、选课、学业情况、
//! 个人信息与通知, 并整理成统一的 `{code, msg, data}` 返回结构。
//!
//! ```no_run
//! use zfn_scraper::{Client, ClientConfig, LoginPayload};
//!
//! # async fn demo() -> Result<(), zfn_scraper::PortalError> {
//! let mut client = Client::new(ClientConfig::new("http://jwxt.example.edu.cn/jwglxt/"))?;
//! let login = client.login("2101010101", "password").await;
//! if let Some(LoginPayload::Kaptcha(challenge)) = login.data {
//!     // 识别 challenge.kaptcha_pic 后提交
//!     client.login_with_kaptcha(challenge, "ab12").await;
//! }
//! let grades = client.get_grade(2023, 1, false).await;
//! println!("{}: {}", grades.code, grades.msg);
//! # Ok(())
//! # }
//! ```

pub mod academia;
pub mod auth;
pub mod client;
pub mod config;
pub mod courses;
pub mod crypto;
pub mod envelope;
pub mod grades;
pub mod http;
pub mod info;
pub mod models;
pub mod notifications;
pub mod page;
pub mod schedule;
pub mod session;
pub mod timetable;
pub mod utils;

pub use client::Client;
pub use config::{ClientConfig, TimeSlotTable};
pub use envelope::{Envelope, ResultCode};
pub use http::{Method, PortalRequest, PortalResponse, ReqwestTransport, Transport};
pub use models::*;
