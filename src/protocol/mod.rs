use std::collections::HashMap;

use percent_encoding::percent_decode_str;
use url::Url;

use crate::node::ProxyNode;
use crate::utils::ConvertError;

pub mod hysteria;
pub mod hysteria2;
pub mod shadowsocks;
pub mod shadowsocksr;
pub mod trojan;
pub mod tuic;
pub mod vless;
pub mod vmess;

/// 按 scheme 分发到对应协议的解析器
///
/// scheme 大小写不敏感；`hy2` 是 hysteria2 的惯用缩写，
/// 改写 scheme 后走同一个解析器。
pub fn decode(uri: &str) -> Result<ProxyNode, ConvertError> {
    let sep = match uri.find("://") {
        Some(idx) => idx,
        None => return Err(ConvertError::InvalidFormat("缺少 :// 分隔符".to_string())),
    };
    let scheme = uri[..sep].to_ascii_lowercase();

    if scheme == "hy2" {
        let rewritten = format!("hysteria2{}", &uri[sep..]);
        return hysteria2::decode(&rewritten);
    }

    match scheme.as_str() {
        "ss" => shadowsocks::decode(uri),
        "ssr" => shadowsocksr::decode(uri),
        "vmess" => vmess::decode(uri),
        "vless" => vless::decode(uri),
        "trojan" => trojan::decode(uri),
        "hysteria" => hysteria::decode(uri),
        "hysteria2" => hysteria2::decode(uri),
        "tuic" => tuic::decode(uri),
        _ => Err(ConvertError::UnsupportedProtocol(scheme)),
    }
}

/// 按节点的协议标签分发到对应的链接生成器，标签大小写不敏感
pub fn encode(node: &ProxyNode) -> Result<String, ConvertError> {
    match node.node_type.to_ascii_lowercase().as_str() {
        "ss" => shadowsocks::encode(node),
        "ssr" => shadowsocksr::encode(node),
        "vmess" => vmess::encode(node),
        "vless" => vless::encode(node),
        "trojan" => trojan::encode(node),
        "hysteria" => hysteria::encode(node),
        "hysteria2" => hysteria2::encode(node),
        "tuic" => tuic::encode(node),
        _ => Err(ConvertError::UnsupportedProtocol(node.node_type.clone())),
    }
}

pub(crate) fn parse_url(uri: &str) -> Result<Url, ConvertError> {
    Url::parse(uri).map_err(|e| ConvertError::InvalidFormat(format!("URL 解析失败: {}", e)))
}

/// 查询参数转成映射，重复的 key 保留第一个值
pub(crate) fn query_map(url: &Url) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for (k, v) in url.query_pairs() {
        map.entry(k.into_owned()).or_insert_with(|| v.into_owned());
    }
    map
}

/// 主机名，IPv6 字面量去掉方括号，与配置里 server 字段的写法一致。
/// 非 ASCII 主机名经过 URL 解析会带上百分号转义，这里还原成原始写法。
pub(crate) fn host_of(url: &Url) -> String {
    let host = url.host_str().unwrap_or("");
    let host = if host.starts_with('[') && host.ends_with(']') {
        &host[1..host.len() - 1]
    } else {
        host
    };
    percent_decode_str(host).decode_utf8_lossy().into_owned()
}

pub(crate) fn port_of(url: &Url) -> u16 {
    url.port().unwrap_or(0)
}

pub(crate) fn username_of(url: &Url) -> String {
    percent_decode_str(url.username())
        .decode_utf8_lossy()
        .into_owned()
}

pub(crate) fn password_of(url: &Url) -> Option<String> {
    url.password()
        .map(|p| percent_decode_str(p).decode_utf8_lossy().into_owned())
}

/// fragment 作为节点显示名，缺失时退回协议名
pub(crate) fn fragment_name(url: &Url, default: &str) -> String {
    match url.fragment() {
        Some(f) if !f.is_empty() => percent_decode_str(f).decode_utf8_lossy().into_owned(),
        _ => default.to_string(),
    }
}

/// 显示名写回 fragment 时的转义
pub(crate) fn escape_name(name: &str) -> String {
    form_urlencoded::byte_serialize(name.as_bytes()).collect()
}

pub(crate) fn split_alpn(value: &str) -> Vec<String> {
    value.split(',').map(|s| s.to_string()).collect()
}

/// 可选参数只在非空时落到节点上，不写零值占位
pub(crate) fn opt_query(query: &HashMap<String, String>, key: &str) -> Option<String> {
    query.get(key).filter(|v| !v.is_empty()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_missing_separator() {
        let result = decode("vless:no-separator-here");
        assert!(matches!(result, Err(ConvertError::InvalidFormat(_))));
    }

    #[test]
    fn test_decode_unsupported_scheme() {
        let result = decode("socks5://127.0.0.1:1080");
        match result {
            Err(ConvertError::UnsupportedProtocol(scheme)) => assert_eq!(scheme, "socks5"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_decode_scheme_case_insensitive() {
        let node = decode("TROJAN://pw@example.com:443?security=tls#n").unwrap();
        assert_eq!(node.node_type, "trojan");
    }

    #[test]
    fn test_hy2_alias_equivalent() {
        let via_alias = decode("hy2://pass@example.com:443?sni=example.com#节点").unwrap();
        let via_full = decode("hysteria2://pass@example.com:443?sni=example.com#节点").unwrap();
        assert_eq!(via_alias.node_type, "hysteria2");
        assert_eq!(via_alias, via_full);
    }

    #[test]
    fn test_encode_unknown_type() {
        let node = ProxyNode {
            name: "x".to_string(),
            node_type: "WireGuard".to_string(),
            server: "1.2.3.4".to_string(),
            port: 51820,
            ..Default::default()
        };
        match encode(&node) {
            // 错误里保留标签原样，不做小写化
            Err(ConvertError::UnsupportedProtocol(tag)) => assert_eq!(tag, "WireGuard"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_encode_tag_case_insensitive() {
        let node = ProxyNode {
            name: "n".to_string(),
            node_type: "TROJAN".to_string(),
            server: "example.com".to_string(),
            port: 443,
            password: Some("pw".to_string()),
            tls: true,
            ..Default::default()
        };
        let uri = encode(&node).unwrap();
        assert!(uri.starts_with("trojan://pw@example.com:443"));
    }

    #[test]
    fn test_query_map_first_value_wins() {
        let url = Url::parse("vless://u@h:1?sni=first&sni=second").unwrap();
        let q = query_map(&url);
        assert_eq!(q.get("sni").map(String::as_str), Some("first"));
    }

    #[test]
    fn test_host_strips_ipv6_brackets() {
        let url = Url::parse("trojan://pw@[2001:db8::1]:443").unwrap();
        assert_eq!(host_of(&url), "2001:db8::1");
    }

    #[test]
    fn test_roundtrip_unicode_host() {
        let node = ProxyNode {
            name: "idn".to_string(),
            node_type: "trojan".to_string(),
            server: "例え.jp".to_string(),
            port: 443,
            password: Some("pw".to_string()),
            network: Some("tcp".to_string()),
            tls: true,
            ..Default::default()
        };
        let back = decode(&encode(&node).unwrap()).unwrap();
        assert_eq!(back.server, "例え.jp");
        assert_eq!(back, node);
    }
}
