//! `${NAME}` 플레이스홀더 치환
//!
//! - `${NAME}` → 바인딩 값 (`NAME`은 `[A-Za-z_][A-Za-z0-9_]*`)
//! - `$$` → `$`
//! - 그 밖의 `$`는 그대로 둡니다 (`$HOME`, `$(hostname)` 같은 셸 문법 보존)
//!
//! 셸의 `${VAR}`를 그대로 쓰려면 `$${VAR}`로 이스케이프합니다.

use appcert_core::config::is_valid_param_name;

/// 템플릿 치환 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// `${` 뒤에 닫는 `}`가 없음
    #[error("unclosed '${{' at offset {offset}")]
    Unclosed {
        /// 템플릿 내 바이트 오프셋
        offset: usize,
    },

    /// 이름 형식이 잘못됨
    #[error("invalid placeholder name '{name}'")]
    InvalidName {
        /// 문제가 된 이름
        name: String,
    },

    /// 바인딩되지 않은 이름
    #[error("unknown placeholder '${{{name}}}'")]
    Unknown {
        /// 문제가 된 이름
        name: String,
    },
}

/// 템플릿의 플레이스홀더를 `lookup` 결과로 치환합니다.
pub fn expand<'a, F>(template: &str, lookup: F) -> Result<String, TemplateError>
where
    F: Fn(&str) -> Option<&'a str>,
{
    let mut out = String::with_capacity(template.len());
    walk(template, |segment| {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Placeholder(name) => {
                let value = lookup(name).ok_or_else(|| TemplateError::Unknown {
                    name: name.to_owned(),
                })?;
                out.push_str(value);
            }
        }
        Ok(())
    })?;
    Ok(out)
}

/// 템플릿에 등장하는 플레이스홀더 이름을 순서대로 돌려줍니다 (문법 검증 겸용).
pub fn placeholders(template: &str) -> Result<Vec<&str>, TemplateError> {
    let mut names = Vec::new();
    walk(template, |segment| {
        if let Segment::Placeholder(name) = segment {
            names.push(name);
        }
        Ok(())
    })?;
    Ok(names)
}

enum Segment<'t> {
    Text(&'t str),
    Placeholder(&'t str),
}

fn walk<'t, F>(template: &'t str, mut visit: F) -> Result<(), TemplateError>
where
    F: FnMut(Segment<'t>) -> Result<(), TemplateError>,
{
    let mut rest = template;
    while let Some(pos) = rest.find('$') {
        visit(Segment::Text(&rest[..pos]))?;
        let after = &rest[pos + 1..];

        if let Some(stripped) = after.strip_prefix('$') {
            visit(Segment::Text("$"))?;
            rest = stripped;
        } else if let Some(body) = after.strip_prefix('{') {
            let offset = template.len() - rest.len() + pos;
            let end = body.find('}').ok_or(TemplateError::Unclosed { offset })?;
            let name = &body[..end];
            if !is_valid_param_name(name) {
                return Err(TemplateError::InvalidName {
                    name: name.to_owned(),
                });
            }
            visit(Segment::Placeholder(name))?;
            rest = &body[end + 1..];
        } else {
            visit(Segment::Text("$"))?;
            rest = after;
        }
    }
    visit(Segment::Text(rest))
}
