use crate::node::ProxyNode;
use crate::utils::{b64_decode, b64_encode, ConvertError};

/// ssr:// 的主体整个是一段 base64：
/// `host:port:protocol:cipher:obfs:base64(password)[/?obfsparam=..&protoparam=..]`
///
/// 字段按冒号位置切分，host 里出现冒号（IPv6）会让后续字段整体错位，
/// 这里不做任何修正，测试里固定了错位后的结果。
pub fn decode(uri: &str) -> Result<ProxyNode, ConvertError> {
    let body = match uri.split_once("://") {
        Some((_, rest)) => rest,
        None => uri,
    };
    let content = b64_decode(body)?;

    let (main_part, query_part) = match content.find("/?") {
        Some(idx) => (&content[..idx], &content[idx + 2..]),
        None => (content.as_str(), ""),
    };

    let parts: Vec<&str> = main_part.split(':').collect();
    if parts.len() < 6 {
        return Err(ConvertError::InvalidFormat(format!(
            "ssr 主体字段不足 6 个: {}",
            parts.len()
        )));
    }
    if parts[0].is_empty() {
        return Err(ConvertError::InvalidFormat("ssr 缺少 host 字段".to_string()));
    }

    let password = b64_decode(parts[5]).unwrap_or_default();

    let mut node = ProxyNode {
        name: "ssr".to_string(),
        node_type: "ssr".to_string(),
        server: parts[0].to_string(),
        port: parts[1].parse().unwrap_or(0),
        protocol: (!parts[2].is_empty()).then(|| parts[2].to_string()),
        cipher: (!parts[3].is_empty()).then(|| parts[3].to_string()),
        obfs: (!parts[4].is_empty()).then(|| parts[4].to_string()),
        password: (!password.is_empty()).then_some(password),
        ..Default::default()
    };

    if !query_part.is_empty() {
        for (key, value) in form_urlencoded::parse(query_part.as_bytes()) {
            match key.as_ref() {
                "obfsparam" if node.obfs_param.is_none() => {
                    node.obfs_param = b64_decode(&value).ok().filter(|s| !s.is_empty());
                }
                "protoparam" if node.protocol_param.is_none() => {
                    node.protocol_param = b64_decode(&value).ok().filter(|s| !s.is_empty());
                }
                _ => {}
            }
        }
    }

    Ok(node)
}

pub fn encode(node: &ProxyNode) -> Result<String, ConvertError> {
    let protocol = node
        .protocol
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or("origin");
    let cipher = node
        .cipher
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or("aes-128-ctr");
    let obfs = node
        .obfs
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or("plain");
    let password = node.password.as_deref().unwrap_or("");

    let main = format!(
        "{}:{}:{}:{}:{}:{}",
        node.server,
        node.port,
        protocol,
        cipher,
        obfs,
        b64_encode(password)
    );

    let mut query = form_urlencoded::Serializer::new(String::new());
    let mut has_query = false;
    if let Some(p) = node.obfs_param.as_deref().filter(|s| !s.is_empty()) {
        query.append_pair("obfsparam", &b64_encode(p));
        has_query = true;
    }
    if let Some(p) = node.protocol_param.as_deref().filter(|s| !s.is_empty()) {
        query.append_pair("protoparam", &b64_encode(p));
        has_query = true;
    }

    let tail = if has_query {
        format!("/?{}", query.finish())
    } else {
        String::new()
    };

    Ok(format!("ssr://{}", b64_encode(&format!("{}{}", main, tail))))
}
