use crate::node::ProxyNode;
use crate::utils::ConvertError;

use super::{
    escape_name, fragment_name, host_of, opt_query, parse_url, port_of, query_map, split_alpn,
    username_of,
};

pub fn decode(uri: &str) -> Result<ProxyNode, ConvertError> {
    let url = parse_url(uri)?;
    let query = query_map(&url);
    let auth = username_of(&url);

    let node = ProxyNode {
        name: fragment_name(&url, "hysteria"),
        node_type: "hysteria".to_string(),
        server: host_of(&url),
        port: port_of(&url),
        auth_str: (!auth.is_empty()).then_some(auth),
        protocol: Some(
            query
                .get("protocol")
                .filter(|p| !p.is_empty())
                .cloned()
                .unwrap_or_else(|| "udp".to_string()),
        ),
        up: opt_query(&query, "up"),
        down: opt_query(&query, "down"),
        sni: opt_query(&query, "sni"),
        skip_cert_verify: query.get("insecure").map(String::as_str) == Some("1"),
        obfs: opt_query(&query, "obfs"),
        alpn: opt_query(&query, "alpn").map(|a| split_alpn(&a)),
        ..Default::default()
    };

    Ok(node)
}

pub fn encode(node: &ProxyNode) -> Result<String, ConvertError> {
    let mut query = form_urlencoded::Serializer::new(String::new());

    let protocol = node
        .protocol
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or("udp");
    query.append_pair("protocol", protocol);

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
    if let Some(alpn) = node.alpn.as_ref().filter(|a| !a.is_empty()) {
        query.append_pair("alpn", &alpn.join(","));
    }
    if node.skip_cert_verify {
        query.append_pair("insecure", "1");
    }

    let name = if node.name.is_empty() {
        "hysteria"
    } else {
        &node.name
    };

    let auth = match node.auth_str.as_deref().filter(|s| !s.is_empty()) {
        Some(a) => format!("{}@", a),
        None => String::new(),
    };

    Ok(format!(
        "hysteria://{}{}:{}?{}#{}",
        auth,
        node.server,
        node.port,
        query.finish(),
        escape_name(name)
    ))
}
