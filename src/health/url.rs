//! 探测URL规范化
//!
//! 将操作员登记的基础地址和子路径拼接为一个可请求的URL

/// 缺省补全的协议前缀
const DEFAULT_SCHEME: &str = "https://";

/// 规范化探测URL
///
/// - 基础地址为空（或只有空白）时返回 `None`，表示配置不可用
/// - 没有 `http://`/`https://` 前缀时补全为 `https://`
/// - 去掉基础地址末尾的一个 `/` 和子路径开头的一个 `/`
/// - 子路径为空时只返回基础地址
///
/// # 参数
/// * `base` - 基础地址，可以省略协议
/// * `sub_path` - 可选的子路径
///
/// # 返回
/// * `Option<String>` - 规范化后的URL
pub fn normalize(base: &str, sub_path: Option<&str>) -> Option<String> {
    let base = base.trim();
    if base.is_empty() {
        return None;
    }

    let mut url = if has_http_scheme(base) {
        base.to_string()
    } else {
        format!("{DEFAULT_SCHEME}{base}")
    };

    if url.ends_with('/') {
        url.pop();
    }

    let sub_path = sub_path.map(str::trim).unwrap_or_default();
    let sub_path = sub_path.strip_prefix('/').unwrap_or(sub_path);

    if sub_path.is_empty() {
        Some(url)
    } else {
        Some(format!("{url}/{sub_path}"))
    }
}

/// 判断地址是否已带有HTTP协议前缀（不区分大小写）
fn has_http_scheme(address: &str) -> bool {
    let lower = address
        .get(..8)
        .unwrap_or(address)
        .to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
