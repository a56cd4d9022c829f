//! 接口探测模块
//!
//! 包含请求构建、响应分类、单接口探测和项目级编排

pub mod classifier;
pub mod orchestrator;
pub mod prober;
pub mod request;
pub mod result;

// 重新导出主要类型
pub use classifier::{classify, Transport};
pub use orchestrator::{ProjectTester, TestOrchestrator};
pub use prober::{EndpointProber, HttpProber};
pub use request::{build_request, build_url, ProbeRequest, RuntimeOverrides};
pub use result::{ProjectTestOutcome, TestResult, TestStats, TestStatus, TriggerType};
