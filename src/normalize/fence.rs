//! ```json 代码块定位

use std::sync::OnceLock;

use regex::Regex;

fn fenced_json_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        // 非贪婪匹配第一个 ```json ... ``` 块；允许 \r\n 换行
        Regex::new(r"```json\r?\n([\s\S]*?)\r?\n```").ok()
    })
    .as_ref()
}

/// 返回第一个 ```json 块的内容（不含围栏）
pub fn extract_fenced_json(text: &str) -> Option<&str> {
    fenced_json_regex()?
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}
