use crate::node::{ProxyNode, RealityOpts};
use crate::utils::ConvertError;

use super::{
    escape_name, fragment_name, host_of, opt_query, parse_url, port_of, query_map, split_alpn,
    username_of,
};

/// trojan 链接没有 security 参数时按 TLS 处理，这是客户端的普遍约定。
/// sni 缺失时退回旧式的 peer 参数。
pub fn decode(uri: &str) -> Result<ProxyNode, ConvertError> {
    let url = parse_url(uri)?;
    let query = query_map(&url);
    let password = username_of(&url);

    let mut node = ProxyNode {
        name: fragment_name(&url, "trojan"),
        node_type: "trojan".to_string(),
        server: host_of(&url),
        port: port_of(&url),
        password: (!password.is_empty()).then_some(password),
        network: Some(
            query
                .get("type")
                .filter(|t| !t.is_empty())
                .cloned()
                .unwrap_or_else(|| "tcp".to_string()),
        ),
        ..Default::default()
    };

    let security = query.get("security").map(String::as_str).unwrap_or("");
    if security == "reality" {
        node.tls = true;
        node.reality_opts = Some(RealityOpts {
            public_key: query.get("pbk").cloned().unwrap_or_default(),
            short_id: query.get("sid").cloned().unwrap_or_default(),
        });
        node.sni = opt_query(&query, "sni").or_else(|| opt_query(&query, "peer"));
        node.client_fingerprint = opt_query(&query, "fp");
    } else {
        if security.is_empty() || security == "tls" {
            node.tls = true;
        }
        node.sni = opt_query(&query, "sni").or_else(|| opt_query(&query, "peer"));
        node.alpn = opt_query(&query, "alpn").map(|a| split_alpn(&a));
        node.client_fingerprint = opt_query(&query, "fp");
    }

    Ok(node)
}

pub fn encode(node: &ProxyNode) -> Result<String, ConvertError> {
    let network = node
        .network
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or("tcp");

    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("type", network);

    if node.tls || node.reality_opts.is_some() {
        if let Some(reality) = &node.reality_opts {
            query.append_pair("security", "reality");
            query.append_pair("pbk", &reality.public_key);
            query.append_pair("sid", &reality.short_id);
        } else {
            query.append_pair("security", "tls");
        }
    }

    if let Some(sni) = node.sni.as_deref().filter(|s| !s.is_empty()) {
        query.append_pair("sni", sni);
    } else if let Some(sn) = node.servername.as_deref().filter(|s| !s.is_empty()) {
        query.append_pair("sni", sn);
    }

    if let Some(alpn) = node.alpn.as_ref().filter(|a| !a.is_empty()) {
        query.append_pair("alpn", &alpn.join(","));
    }
    if let Some(fp) = node.client_fingerprint.as_deref().filter(|s| !s.is_empty()) {
        query.append_pair("fp", fp);
    }

    let name = if node.name.is_empty() {
        "trojan"
    } else {
        &node.name
    };

    Ok(format!(
        "trojan://{}@{}:{}?{}#{}",
        node.password.as_deref().unwrap_or(""),
        node.server,
        node.port,
        query.finish(),
        escape_name(name)
    ))
}
