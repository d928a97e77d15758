//! 도메인 타입 -- 크레이트 전역에서 사용되는 공통 타입

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 출력 요약 시 잘라낼 최대 문자 수
const SUMMARY_MAX_CHARS: usize = 200;

/// 원격(또는 로컬) 명령 실행 결과
///
/// 명령이 실행되어 종료 코드를 얻은 경우를 나타냅니다.
/// 실행 자체가 불가능했던 경우는 [`ExecutorError`](crate::error::ExecutorError)입니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    /// 종료 코드 (시그널로 종료되면 -1)
    pub exit_code: i32,
    /// 표준 출력
    pub stdout: String,
    /// 표준 에러
    pub stderr: String,
    /// 실행 소요 시간
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl CommandOutput {
    /// 종료 코드와 출력으로 결과를 생성합니다.
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
            duration: Duration::ZERO,
        }
    }

    /// 종료 코드가 0인지 확인합니다.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// 앞뒤 공백을 제거한 표준 출력
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    /// 리포트용 한 줄 요약 (`exit=1 stdout='...' stderr='...'`)
    pub fn summary(&self) -> String {
        let mut out = format!("exit={}", self.exit_code);
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            out.push_str(&format!(" stdout='{}'", truncate(stdout, SUMMARY_MAX_CHARS)));
        }
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            out.push_str(&format!(" stderr='{}'", truncate(stderr, SUMMARY_MAX_CHARS)));
        }
        out
    }
}

impl fmt::Display for CommandOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// 문자 경계를 지키며 문자열을 자르고 줄바꿈을 공백으로 바꿉니다.
pub fn truncate(s: &str, max_chars: usize) -> String {
    let flat: String = s
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut cut: String = flat.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(d.as_millis()).unwrap_or(u64::MAX);
        s.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}
