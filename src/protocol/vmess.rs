use serde_json::{json, Map, Value};

use crate::node::{GrpcOpts, ProxyNode, WsOpts};
use crate::utils::{b64_decode, b64_encode, get_int, get_string, ConvertError};

/// vmess:// 的主体是 base64 包裹的一个 JSON 对象
///
/// 野生链接里字段类型很乱（port 可能是数字、浮点或字符串），
/// 全部走宽容访问器读取。
pub fn decode(uri: &str) -> Result<ProxyNode, ConvertError> {
    let body = match uri.split_once("://") {
        Some((_, rest)) => rest,
        None => uri,
    };
    let payload = b64_decode(body)?;

    let data: Map<String, Value> = serde_json::from_str(&payload)
        .map_err(|e| ConvertError::InvalidFormat(format!("vmess JSON 解析失败: {}", e)))?;

    let server = get_string(&data, "add", "");
    if server.is_empty() {
        return Err(ConvertError::InvalidFormat("vmess 缺少 add 字段".to_string()));
    }

    let cipher = get_string(&data, "scy", "auto");
    let network = get_string(&data, "net", "tcp");

    let mut node = ProxyNode {
        name: get_string(&data, "ps", "vmess"),
        node_type: "vmess".to_string(),
        server,
        port: u16::try_from(get_int(&data, "port", 0)).unwrap_or(0),
        uuid: {
            let id = get_string(&data, "id", "");
            (!id.is_empty()).then_some(id)
        },
        alter_id: u32::try_from(get_int(&data, "aid", 0)).unwrap_or(0),
        cipher: (!cipher.is_empty()).then_some(cipher),
        network: (!network.is_empty()).then(|| network.clone()),
        ..Default::default()
    };

    if get_string(&data, "tls", "") == "tls" {
        node.tls = true;
        let sni = get_string(&data, "sni", "");
        if !sni.is_empty() {
            node.servername = Some(sni);
        }
    }

    if network == "ws" {
        let mut ws = WsOpts {
            path: get_string(&data, "path", "/"),
            headers: None,
        };
        let host = get_string(&data, "host", "");
        if !host.is_empty() {
            ws.headers = Some([("Host".to_string(), host)].into_iter().collect());
        }
        node.ws_opts = Some(ws);
    } else if network == "grpc" {
        node.grpc_opts = Some(GrpcOpts {
            grpc_service_name: get_string(&data, "path", ""),
        });
    }

    Ok(node)
}

pub fn encode(node: &ProxyNode) -> Result<String, ConvertError> {
    let cipher = node.cipher.as_deref().filter(|s| !s.is_empty()).unwrap_or("auto");
    let network = node.network.as_deref().filter(|s| !s.is_empty()).unwrap_or("tcp");

    // 固定输出 13 个键，未用到的留空串，和常见客户端的导出格式一致
    let mut data = json!({
        "v": "2",
        "ps": node.name.as_str(),
        "add": node.server.as_str(),
        "port": node.port,
        "id": node.uuid.as_deref().unwrap_or(""),
        "aid": node.alter_id,
        "scy": cipher,
        "net": network,
        "type": "none",
        "host": "",
        "path": "",
        "tls": "",
        "sni": "",
    });

    if node.tls {
        data["tls"] = json!("tls");
        if let Some(sn) = node.servername.as_deref().filter(|s| !s.is_empty()) {
            data["sni"] = json!(sn);
        } else if let Some(sn) = node.sni.as_deref().filter(|s| !s.is_empty()) {
            data["sni"] = json!(sn);
        }
    }

    let raw_network = node.network.as_deref().unwrap_or("");
    if raw_network == "ws" {
        if let Some(ws) = &node.ws_opts {
            data["path"] = json!(ws.path.as_str());
            if let Some(host) = ws.headers.as_ref().and_then(|h| h.get("Host")) {
                data["host"] = json!(host.as_str());
            }
        }
    } else if raw_network == "grpc" {
        if let Some(grpc) = &node.grpc_opts {
            data["path"] = json!(grpc.grpc_service_name.as_str());
        }
    }

    Ok(format!("vmess://{}", b64_encode(&data.to_string())))
}
