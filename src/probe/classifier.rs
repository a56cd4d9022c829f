//! 响应分类器
//!
//! 纯函数：根据传输结果和期望状态码给出结果分类，没有任何副作用。

use crate::probe::result::TestStatus;

/// 一次HTTP调用在传输层的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// 收到了响应
    Completed { status_code: u16 },
    /// 传输层失败（连接、DNS、TLS等）
    Failed,
    /// 超过了超时上限
    TimedOut,
}

impl Transport {
    /// 实际状态码，没有响应时为0
    pub fn status_code(&self) -> u16 {
        match self {
            Transport::Completed { status_code } => *status_code,
            Transport::Failed | Transport::TimedOut => 0,
        }
    }
}

/// 对探测结果分类
///
/// 实际与期望状态码都在 2xx 区间时视为成功，即使两者不相等。
pub fn classify(transport: Transport, expected_status: u16) -> TestStatus {
    match transport {
        Transport::TimedOut => TestStatus::Timeout,
        Transport::Failed | Transport::Completed { status_code: 0 } => TestStatus::Error,
        Transport::Completed { status_code } if status_code == expected_status => {
            TestStatus::Success
        }
        Transport::Completed { status_code }
            if is_2xx(status_code) && is_2xx(expected_status) =>
        {
            TestStatus::Success
        }
        Transport::Completed { .. } => TestStatus::Failed,
    }
}

fn is_2xx(code: u16) -> bool {
    (200..=299).contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(status_code: u16) -> Transport {
        Transport::Completed { status_code }
    }

    #[test]
    fn test_exact_match_is_success() {
        assert_eq!(classify(completed(200), 200), TestStatus::Success);
        assert_eq!(classify(completed(404), 404), TestStatus::Success);
    }

    #[test]
    fn test_any_2xx_satisfies_any_2xx() {
        for actual in 200..=299 {
            for expected in [200, 201, 204, 299] {
                assert_eq!(
                    classify(completed(actual), expected),
                    TestStatus::Success,
                    "actual={actual} expected={expected}"
                );
            }
        }
    }

    #[test]
    fn test_mismatch_is_failed() {
        assert_eq!(classify(completed(500), 200), TestStatus::Failed);
        assert_eq!(classify(completed(200), 404), TestStatus::Failed);
        assert_eq!(classify(completed(301), 200), TestStatus::Failed);
    }

    #[test]
    fn test_timeout_wins() {
        assert_eq!(classify(Transport::TimedOut, 200), TestStatus::Timeout);
        assert_eq!(classify(Transport::TimedOut, 0), TestStatus::Timeout);
    }

    #[test]
    fn test_transport_failure_and_zero_status_are_errors() {
        assert_eq!(classify(Transport::Failed, 200), TestStatus::Error);
        assert_eq!(classify(completed(0), 0), TestStatus::Error);
        assert_eq!(Transport::Failed.status_code(), 0);
    }
}
