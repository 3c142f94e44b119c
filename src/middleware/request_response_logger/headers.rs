use std::fmt::{Display, Write};

use hyper::HeaderMap;

/// 헤더 맵을 `{name: v1, v2}, {name2: v3}` 형태로 렌더링합니다.
///
/// 이름마다 그룹 하나, 순서는 맵의 순회 순서를 따릅니다.
pub fn format_headers(headers: &HeaderMap) -> String {
    format_header_groups(headers.keys().map(|name| {
        let values = headers
            .get_all(name)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());
        (name.as_str(), values)
    }))
}

pub fn format_header_groups<I, N, V, S>(groups: I) -> String
where
    I: IntoIterator<Item = (N, V)>,
    N: Display,
    V: IntoIterator<Item = S>,
    S: Display,
{
    let mut out = String::new();
    for (index, (name, values)) in groups.into_iter().enumerate() {
        if index > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{{{}: ", name);
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{}", value);
        }
        out.push('}');
    }
    out
}
