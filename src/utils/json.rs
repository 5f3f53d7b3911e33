use serde_json::{Map, Value};

/// 从 JSON 对象按 key 取字符串，类型不符或缺失时返回默认值
///
/// vmess 链接的 JSON 载荷字段类型很不规范（port 可能是数字也可能是字符串），
/// 读取时统一走这组宽容的访问器。
pub fn get_string(map: &Map<String, Value>, key: &str, default: &str) -> String {
    match map.get(key) {
        Some(Value::String(s)) => s.clone(),
        _ => default.to_string(),
    }
}

/// 从 JSON 对象按 key 取整数，接受数字、浮点和数字字符串
pub fn get_int(map: &Map<String, Value>, key: &str, default: i64) -> i64 {
    match map.get(key) {
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                i
            } else if let Some(f) = n.as_f64() {
                f as i64
            } else {
                default
            }
        }
        Some(Value::String(s)) => s.parse().unwrap_or(default),
        _ => default,
    }
}
