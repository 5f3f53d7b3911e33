use once_cell::sync::Lazy;
use regex::Regex;

use crate::node::ProxyNode;
use crate::utils::ConvertError;

use super::{
    escape_name, fragment_name, host_of, opt_query, parse_url, port_of, password_of, query_map,
    split_alpn, username_of,
};

/// v5 链接 userinfo 是 uuid:password，v4 链接 userinfo 是裸 token，
/// 按 uuid 形状区分两代格式
static UUID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[0-9a-fA-F-]{36}$").expect("invalid uuid pattern"));

pub fn decode(uri: &str) -> Result<ProxyNode, ConvertError> {
    let url = parse_url(uri)?;
    let query = query_map(&url);
    let user = username_of(&url);
    let pass = password_of(&url).unwrap_or_default();

    let mut node = ProxyNode {
        name: fragment_name(&url, "tuic"),
        node_type: "tuic".to_string(),
        server: host_of(&url),
        port: port_of(&url),
        ..Default::default()
    };

    if UUID_RE.is_match(&user) {
        node.uuid = Some(user);
        if !pass.is_empty() {
            node.password = Some(pass);
        }
    } else {
        if !user.is_empty() {
            node.token = Some(user);
        }
        if !pass.is_empty() {
            node.password = Some(pass);
        }
    }

    // 查询参数里的 token 比 userinfo 优先
    if let Some(token) = opt_query(&query, "token") {
        node.token = Some(token);
    }
    node.sni = opt_query(&query, "sni");
    node.skip_cert_verify = query.get("skip-cert-verify").map(String::as_str) == Some("1");
    node.alpn = opt_query(&query, "alpn").map(|a| split_alpn(&a));
    node.disable_sni = query.get("disable-sni").map(String::as_str) == Some("1");
    node.reduce_rtt = query.get("reduce-rtt").map(String::as_str) == Some("1");
    node.udp_relay_mode = opt_query(&query, "udp-relay-mode");
    node.congestion_controller = opt_query(&query, "congestion-controller");

    Ok(node)
}

pub fn encode(node: &ProxyNode) -> Result<String, ConvertError> {
    let mut query = form_urlencoded::Serializer::new(String::new());

    if let Some(token) = node.token.as_deref().filter(|s| !s.is_empty()) {
        query.append_pair("token", token);
    }
    if let Some(sni) = node.sni.as_deref().filter(|s| !s.is_empty()) {
        query.append_pair("sni", sni);
    }
    if node.skip_cert_verify {
        query.append_pair("skip-cert-verify", "1");
    }
    if let Some(alpn) = node.alpn.as_ref().filter(|a| !a.is_empty()) {
        query.append_pair("alpn", &alpn.join(","));
    }
    if node.disable_sni {
        query.append_pair("disable-sni", "1");
    }
    if node.reduce_rtt {
        query.append_pair("reduce-rtt", "1");
    }
    if let Some(mode) = node.udp_relay_mode.as_deref().filter(|s| !s.is_empty()) {
        query.append_pair("udp-relay-mode", mode);
    }
    if let Some(cc) = node
        .congestion_controller
        .as_deref()
        .filter(|s| !s.is_empty())
    {
        query.append_pair("congestion-controller", cc);
    }

    let name = if node.name.is_empty() { "tuic" } else { &node.name };

    let uuid = node.uuid.as_deref().unwrap_or("");
    let password = node.password.as_deref().unwrap_or("");
    let auth = if !uuid.is_empty() || !password.is_empty() {
        if !password.is_empty() {
            format!("{}:{}@", uuid, password)
        } else {
            format!("{}@", uuid)
        }
    } else {
        String::new()
    };

    Ok(format!(
        "tuic://{}{}:{}?{}#{}",
        auth,
        node.server,
        node.port,
        query.finish(),
        escape_name(name)
    ))
}
