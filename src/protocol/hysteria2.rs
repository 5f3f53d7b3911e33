use crate::node::ProxyNode;
use crate::utils::ConvertError;

use super::{
    escape_name, fragment_name, host_of, opt_query, parse_url, port_of, query_map, split_alpn,
    username_of,
};

/// 带宽参数兼容两套写法，up/down 优先，upmbps/downmbps 兜底。
pub fn decode(uri: &str) -> Result<ProxyNode, ConvertError> {
    let url = parse_url(uri)?;
    let query = query_map(&url);
    let password = username_of(&url);

    let node = ProxyNode {
        name: fragment_name(&url, "hysteria2"),
        node_type: "hysteria2".to_string(),
        server: host_of(&url),
        port: port_of(&url),
        password: (!password.is_empty()).then_some(password),
        up: opt_query(&query, "up").or_else(|| opt_query(&query, "upmbps")),
        down: opt_query(&query, "down").or_else(|| opt_query(&query, "downmbps")),
        sni: opt_query(&query, "sni"),
        skip_cert_verify: query.get("insecure").map(String::as_str) == Some("1"),
        obfs: opt_query(&query, "obfs"),
        obfs_password: opt_query(&query, "obfs-password"),
        alpn: opt_query(&query, "alpn").map(|a| split_alpn(&a)),
        ports: opt_query(&query, "ports"),
        ..Default::default()
    };

    Ok(node)
}

pub fn encode(node: &ProxyNode) -> Result<String, ConvertError> {
    let mut query = form_urlencoded::Serializer::new(String::new());

    if let Some(up) = node.up.as_deref().filter(|s| !s.is_empty()) {
        query.append_pair("up", up);
    }
    if let Some(down) = node.down.as_deref().filter(|s| !s.is_empty()) {
        query.append_pair("down", down);
    }
    if let Some(sni) = node.sni.as_deref().filter(|s| !s.is_empty()) {
        query.append_pair("sni", sni);
    }
    if let Some(obfs) = node.obfs.as_deref().filter(|s| !s.is_empty()) {
        query.append_pair("obfs", obfs);
    }
    if let Some(op) = node.obfs_password.as_deref().filter(|s| !s.is_empty()) {
        query.append_pair("obfs-password", op);
    }
    if let Some(alpn) = node.alpn.as_ref().filter(|a| !a.is_empty()) {
        query.append_pair("alpn", &alpn.join(","));
    }
    if let Some(ports) = node.ports.as_deref().filter(|s| !s.is_empty()) {
        query.append_pair("ports", ports);
    }
    if node.skip_cert_verify {
        query.append_pair("insecure", "1");
    }

    let name = if node.name.is_empty() {
        "hysteria2"
    } else {
        &node.name
    };

    let auth = match node.password.as_deref().filter(|s| !s.is_empty()) {
        Some(p) => format!("{}@", p),
        None => String::new(),
    };

    Ok(format!(
        "hysteria2://{}{}:{}?{}#{}",
        auth,
        node.server,
        node.port,
        query.finish(),
        escape_name(name)
    ))
}
