//! 스위트 파일 로더 -- YAML 스위트 파일을 디스크에서 로드합니다.
//!
//! 스위트 디렉토리 내의 `.yml`/`.yaml` 파일을 스캔하고 파싱합니다.
//! 개별 파일 파싱 실패는 경고 로그를 남기고 건너뜁니다.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::SuiteRunnerError;
use crate::types::Suite;

/// 스위트 파일 로더 설정
const MAX_SUITE_FILE_SIZE: u64 = 1024 * 1024; // 1MB
const MAX_SUITES_COUNT: usize = 1_000;

/// 파일 하나의 로딩 결과
pub type FileResult = (PathBuf, Result<Suite, SuiteRunnerError>);

/// 스위트 파일 로더
pub struct SuiteLoader;

impl SuiteLoader {
    /// 디렉토리에서 모든 YAML 스위트 파일을 로드합니다.
    ///
    /// 개별 파일 로딩 실패와 중복 이름은 경고 로그를 남기고 건너뜁니다.
    /// 결과는 스위트 이름 순으로 정렬됩니다.
    ///
    /// # Errors
    /// - 디렉토리를 읽을 수 없는 경우
    /// - 스위트 수가 `MAX_SUITES_COUNT`를 초과하는 경우
    pub async fn load_directory(dir: impl AsRef<Path>) -> Result<Vec<Suite>, SuiteRunnerError> {
        let dir = dir.as_ref();
        let mut suites: Vec<Suite> = Vec::new();
        let mut seen_names = HashSet::new();

        for (path, result) in Self::check_directory(dir).await? {
            match result {
                Ok(suite) => {
                    if !seen_names.insert(suite.name.clone()) {
                        tracing::warn!(
                            suite = %suite.name,
                            path = %path.display(),
                            "duplicate suite name, skipping"
                        );
                        continue;
                    }
                    suites.push(suite);
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to load suite file, skipping"
                    );
                }
            }
        }

        suites.sort_by(|a, b| a.name.cmp(&b.name));
        tracing::info!(dir = %dir.display(), count = suites.len(), "loaded suites");
        Ok(suites)
    }

    /// 디렉토리의 모든 YAML 파일을 로드하되 파일별 결과를 그대로 돌려줍니다.
    ///
    /// `appcert suites validate`처럼 실패 목록이 필요한 경우에 사용합니다.
    /// 결과는 경로 순으로 정렬됩니다.
    pub async fn check_directory(dir: impl AsRef<Path>) -> Result<Vec<FileResult>, SuiteRunnerError> {
        let dir = dir.as_ref();
        let dir_error = |reason: String| SuiteRunnerError::Load {
            path: dir.display().to_string(),
            reason,
        };

        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| dir_error(format!("failed to read directory: {e}")))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| dir_error(format!("failed to read directory entry: {e}")))?
        {
            let path = entry.path();
            let is_yaml = path
                .extension()
                .is_some_and(|ext| ext == "yml" || ext == "yaml");
            if !is_yaml {
                continue;
            }
            paths.push(path);
            if paths.len() > MAX_SUITES_COUNT {
                return Err(dir_error(format!(
                    "too many suite files: max {MAX_SUITES_COUNT}"
                )));
            }
        }
        paths.sort();

        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            let result = Self::load_file(&path).await;
            results.push((path, result));
        }
        Ok(results)
    }

    /// 디렉토리에서 이름으로 스위트를 찾습니다.
    pub async fn find(dir: impl AsRef<Path>, name: &str) -> Result<Suite, SuiteRunnerError> {
        let dir = dir.as_ref();
        Self::load_directory(dir)
            .await?
            .into_iter()
            .find(|suite| suite.name == name)
            .ok_or_else(|| SuiteRunnerError::Load {
                path: dir.display().to_string(),
                reason: format!("no suite named '{name}'"),
            })
    }

    /// 단일 YAML 파일에서 스위트를 로드합니다.
    pub async fn load_file(path: impl AsRef<Path>) -> Result<Suite, SuiteRunnerError> {
        let path = path.as_ref();
        let file_error = |reason: String| SuiteRunnerError::Load {
            path: path.display().to_string(),
            reason,
        };

        // 파일 크기 검증
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| file_error(format!("failed to read file metadata: {e}")))?;

        if metadata.len() > MAX_SUITE_FILE_SIZE {
            return Err(file_error(format!(
                "file too large: {} bytes (max: {MAX_SUITE_FILE_SIZE})",
                metadata.len()
            )));
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| file_error(format!("failed to read file: {e}")))?;

        Self::parse_yaml(&content, &path.display().to_string())
    }

    /// YAML 문자열을 파싱하고 검증합니다.
    pub fn parse_yaml(yaml_str: &str, source: &str) -> Result<Suite, SuiteRunnerError> {
        let suite: Suite = serde_yaml::from_str(yaml_str).map_err(|e| SuiteRunnerError::Load {
            path: source.to_owned(),
            reason: format!("YAML parse error: {e}"),
        })?;

        suite.validate()?;
        Ok(suite)
    }
}
