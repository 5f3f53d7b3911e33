use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::node::ProxyNode;
use crate::utils::{b64_decode, b64_encode, ConvertError};

use super::{escape_name, fragment_name, host_of, parse_url, port_of, query_map, username_of};

// example (SIP002 with obfs plugin)
// ss://
// YWVzLTI1Ni1nY206cGFzczEyMw            <- base64("aes-256-gcm:pass123")
// @192.168.100.1:8888
// ?plugin=obfs;obfs=tls;obfs-host=example.com
// #%E8%8A%82%E7%82%B9A
//
// legacy form carries the whole base64 blob in the path instead:
// ss:///YWVzLTEyOC1jZmI6c2VjcmV0QDEwLjAuMC4xOjgwODA#name

/// legacy 主体的固定模式：cipher:password@host:port
///
/// password 分组贪婪匹配，可以包含冒号；host 分组不允许冒号，
/// IPv6 字面量会直接匹配失败。
static LEGACY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^:@]+):([^@]+)@([^:]+):([0-9]+)$").expect("invalid legacy pattern"));

pub fn decode(uri: &str) -> Result<ProxyNode, ConvertError> {
    let url = parse_url(uri)?;
    let name = fragment_name(&url, "ss");

    // 有 authority 就按 SIP002 形式解；legacy 形式的主体整个在 path 里
    if matches!(url.host_str(), Some(h) if !h.is_empty()) {
        let decoded = b64_decode(&username_of(&url))?;
        let (cipher, password) = decoded
            .split_once(':')
            .ok_or_else(|| ConvertError::InvalidFormat("ss 用户信息缺少 cipher:password".to_string()))?;

        let mut node = ProxyNode {
            name,
            node_type: "ss".to_string(),
            server: host_of(&url),
            port: port_of(&url),
            cipher: (!cipher.is_empty()).then(|| cipher.to_string()),
            password: (!password.is_empty()).then(|| password.to_string()),
            ..Default::default()
        };

        let query = query_map(&url);
        if let Some(plugin) = query.get("plugin").filter(|p| !p.is_empty()) {
            let (plugin_name, plugin_rest) = match plugin.split_once(';') {
                Some((head, rest)) => (head, Some(rest)),
                None => (plugin.as_str(), None),
            };
            node.plugin = Some(plugin_name.to_string());

            if let Some(rest) = plugin_rest {
                let mut opts = serde_json::Map::new();
                for kv in rest.split(';') {
                    if kv.is_empty() {
                        continue;
                    }
                    if let Some((k, v)) = kv.split_once('=') {
                        opts.insert(k.to_string(), Value::String(v.to_string()));
                    }
                }
                if !opts.is_empty() {
                    node.plugin_opts = Some(opts);
                }
            }
        }

        return Ok(node);
    }

    let path = url.path();
    let content = b64_decode(path.strip_prefix('/').unwrap_or(path))?;

    let caps = LEGACY_RE.captures(&content).ok_or_else(|| {
        ConvertError::InvalidFormat("legacy ss 主体不符合 cipher:password@host:port".to_string())
    })?;

    Ok(ProxyNode {
        name,
        node_type: "ss".to_string(),
        server: caps[3].to_string(),
        port: caps[4].parse().unwrap_or(0),
        cipher: Some(caps[1].to_string()),
        password: Some(caps[2].to_string()),
        ..Default::default()
    })
}

pub fn encode(node: &ProxyNode) -> Result<String, ConvertError> {
    let cipher = node.cipher.as_deref().unwrap_or("");
    let password = node.password.as_deref().unwrap_or("");
    let userinfo = b64_encode(&format!("{}:{}", cipher, password));

    let mut query = form_urlencoded::Serializer::new(String::new());
    let mut has_query = false;

    if let Some(plugin) = node.plugin.as_deref().filter(|p| !p.is_empty()) {
        let mut parts = vec![plugin.to_string()];
        if let Some(opts) = &node.plugin_opts {
            if plugin == "obfs" {
                // obfs 插件的配置键和链接参数名不同（mode/host -> obfs/obfs-host）
                if let Some(mode) = opts.get("mode").and_then(Value::as_str) {
                    parts.push(format!("obfs={}", mode));
                }
                if let Some(host) = opts.get("host").and_then(Value::as_str) {
                    parts.push(format!("obfs-host={}", host));
                } else if let Some(host) = opts.get("obfs-host").and_then(Value::as_str) {
                    parts.push(format!("obfs-host={}", host));
                }
            } else {
                for (k, v) in opts {
                    let value = match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    parts.push(format!("{}={}", k, value));
                }
            }
        }
        query.append_pair("plugin", &parts.join(";"));
        has_query = true;
    }

    let query_str = if has_query {
        format!("?{}", query.finish())
    } else {
        String::new()
    };

    let name = if node.name.is_empty() { "ss" } else { &node.name };

    Ok(format!(
        "ss://{}@{}:{}{}#{}",
        userinfo,
        node.server,
        node.port,
        query_str,
        escape_name(name)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_authority_form() {
        let uri = format!(
            "ss://{}@192.168.100.1:8888#%E8%8A%82%E7%82%B9A",
            b64_encode("aes-256-gcm:pass123")
        );
        let node = decode(&uri).unwrap();
        assert_eq!(node.node_type, "ss");
        assert_eq!(node.name, "节点A");
        assert_eq!(node.server, "192.168.100.1");
        assert_eq!(node.port, 8888);
        assert_eq!(node.cipher.as_deref(), Some("aes-256-gcm"));
        assert_eq!(node.password.as_deref(), Some("pass123"));
        assert!(node.plugin.is_none());
    }

    #[test]
    fn test_decode_plugin_obfs() {
        let uri = format!(
            "ss://{}@10.0.0.1:443?plugin=obfs;obfs=tls;obfs-host=example.com#n",
            b64_encode("chacha20-ietf-poly1305:pw")
        );
        let node = decode(&uri).unwrap();
        assert_eq!(node.plugin.as_deref(), Some("obfs"));
        let opts = node.plugin_opts.unwrap();
        assert_eq!(opts.get("obfs").and_then(Value::as_str), Some("tls"));
        assert_eq!(
            opts.get("obfs-host").and_then(Value::as_str),
            Some("example.com")
        );
    }

    #[test]
    fn test_decode_plugin_name_only() {
        let uri = format!(
            "ss://{}@10.0.0.1:443?plugin=v2ray-plugin#n",
            b64_encode("aes-256-gcm:pw")
        );
        let node = decode(&uri).unwrap();
        assert_eq!(node.plugin.as_deref(), Some("v2ray-plugin"));
        assert!(node.plugin_opts.is_none());
    }

    #[test]
    fn test_decode_legacy_form() {
        let uri = format!("ss:///{}", b64_encode("aes-128-cfb:secret@10.0.0.1:8080"));
        let node = decode(&uri).unwrap();
        assert_eq!(node.name, "ss");
        assert_eq!(node.server, "10.0.0.1");
        assert_eq!(node.port, 8080);
        assert_eq!(node.cipher.as_deref(), Some("aes-128-cfb"));
        assert_eq!(node.password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_decode_legacy_colon_in_password() {
        // password 里的冒号被贪婪分组吸收，解析仍然成功
        let uri = format!("ss:///{}", b64_encode("aes-256-cfb:pa:ss@host.com:443"));
        let node = decode(&uri).unwrap();
        assert_eq!(node.password.as_deref(), Some("pa:ss"));
        assert_eq!(node.server, "host.com");
    }

    #[test]
    fn test_decode_legacy_ipv6_rejected() {
        // host 分组不接受冒号，IPv6 字面量整体匹配失败
        let uri = format!("ss:///{}", b64_encode("aes-256-gcm:pw@::1:8080"));
        assert!(matches!(decode(&uri), Err(ConvertError::InvalidFormat(_))));
    }

    #[test]
    fn test_decode_legacy_non_ascii_digits_rejected() {
        // 端口分组只认 ASCII 数字
        let uri = format!("ss:///{}", b64_encode("aes-256-gcm:pw@host:١٢٣"));
        assert!(matches!(decode(&uri), Err(ConvertError::InvalidFormat(_))));
    }

    #[test]
    fn test_decode_empty_password_omitted() {
        let uri = format!("ss://{}@10.0.0.1:8388#n", b64_encode("aes-256-gcm:"));
        let node = decode(&uri).unwrap();
        assert_eq!(node.cipher.as_deref(), Some("aes-256-gcm"));
        assert!(node.password.is_none());
    }

    #[test]
    fn test_decode_bare_blob_rejected() {
        // 主体被当成 host，没有用户信息可解
        let uri = format!("ss://{}", b64_encode("aes-256-gcm:pw@1.2.3.4:443"));
        assert!(decode(&uri).is_err());
    }

    #[test]
    fn test_encode_plugin_from_config_keys() {
        let mut opts = serde_json::Map::new();
        opts.insert("mode".to_string(), Value::String("http".to_string()));
        opts.insert("host".to_string(), Value::String("cdn.example.com".to_string()));
        let node = ProxyNode {
            name: "obfs-node".to_string(),
            node_type: "ss".to_string(),
            server: "1.2.3.4".to_string(),
            port: 8388,
            cipher: Some("aes-256-gcm".to_string()),
            password: Some("pw".to_string()),
            plugin: Some("obfs".to_string()),
            plugin_opts: Some(opts),
            ..Default::default()
        };

        let uri = encode(&node).unwrap();
        assert!(uri.starts_with("ss://"));
        // 插件串整体作为一个查询参数转义
        assert!(uri.contains("plugin=obfs%3Bobfs%3Dhttp%3Bobfs-host%3Dcdn.example.com"));

        let back = decode(&uri).unwrap();
        assert_eq!(back.server, "1.2.3.4");
        assert_eq!(back.port, 8388);
        assert_eq!(back.plugin.as_deref(), Some("obfs"));
        let back_opts = back.plugin_opts.unwrap();
        assert_eq!(back_opts.get("obfs").and_then(Value::as_str), Some("http"));
        assert_eq!(
            back_opts.get("obfs-host").and_then(Value::as_str),
            Some("cdn.example.com")
        );
    }

    #[test]
    fn test_encode_without_plugin_has_no_query() {
        let node = ProxyNode {
            name: String::new(),
            node_type: "ss".to_string(),
            server: "example.com".to_string(),
            port: 443,
            cipher: Some("aes-256-gcm".to_string()),
            password: Some("pw".to_string()),
            ..Default::default()
        };
        let uri = encode(&node).unwrap();
        assert!(!uri.contains('?'));
        // 名字为空时退回协议名
        assert!(uri.ends_with("#ss"));

        let back = decode(&uri).unwrap();
        assert_eq!(back.cipher.as_deref(), Some("aes-256-gcm"));
        assert_eq!(back.password.as_deref(), Some("pw"));
        assert_eq!(back.server, "example.com");
        assert_eq!(back.port, 443);
    }
}
