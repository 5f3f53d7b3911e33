use crate::node::{GrpcOpts, ProxyNode, RealityOpts, WsOpts};
use crate::utils::ConvertError;

use super::{
    escape_name, fragment_name, host_of, opt_query, parse_url, port_of, query_map, split_alpn,
    username_of,
};

// example (reality vless)
// vless://
// d8737518-5251-4e25-a653-8c625ef18b8f
// @24.120.32.42:2040
// ?security=reality
// &type=tcp
// &sni=unpkg.com
// &sid=e0969a6f81b52865
// &pbk=FPIcpZmVrQcqkF1vR_aBnLw_Uu4CNhuuKkrRtKpzRHg
// &fp=chrome
// &flow=xtls-rprx-vision
// #%F0%9F%9A%80%20US%20Reality

pub fn decode(uri: &str) -> Result<ProxyNode, ConvertError> {
    let url = parse_url(uri)?;
    let query = query_map(&url);
    let uuid = username_of(&url);

    let mut node = ProxyNode {
        name: fragment_name(&url, "vless"),
        node_type: "vless".to_string(),
        server: host_of(&url),
        port: port_of(&url),
        uuid: (!uuid.is_empty()).then_some(uuid),
        network: Some(
            query
                .get("type")
                .filter(|t| !t.is_empty())
                .cloned()
                .unwrap_or_else(|| "tcp".to_string()),
        ),
        encryption: opt_query(&query, "encryption"),
        flow: opt_query(&query, "flow"),
        ..Default::default()
    };

    match query.get("security").map(String::as_str) {
        Some("reality") => {
            node.tls = true;
            node.reality_opts = Some(RealityOpts {
                public_key: query.get("pbk").cloned().unwrap_or_default(),
                short_id: query.get("sid").cloned().unwrap_or_default(),
            });
            node.servername = opt_query(&query, "sni");
            node.client_fingerprint = opt_query(&query, "fp");
        }
        Some("tls") => {
            node.tls = true;
            node.servername = opt_query(&query, "sni");
            node.alpn = opt_query(&query, "alpn").map(|a| split_alpn(&a));
            node.client_fingerprint = opt_query(&query, "fp");
        }
        _ => {}
    }

    match node.network.as_deref() {
        Some("ws") => {
            let mut ws = WsOpts {
                path: query
                    .get("path")
                    .filter(|p| !p.is_empty())
                    .cloned()
                    .unwrap_or_else(|| "/".to_string()),
                headers: None,
            };
            if let Some(host) = opt_query(&query, "host") {
                ws.headers = Some([("Host".to_string(), host)].into_iter().collect());
            }
            node.ws_opts = Some(ws);
        }
        Some("grpc") => {
            node.grpc_opts = Some(GrpcOpts {
                grpc_service_name: query.get("serviceName").cloned().unwrap_or_default(),
            });
        }
        _ => {}
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

    if let Some(enc) = node.encryption.as_deref().filter(|s| !s.is_empty()) {
        query.append_pair("encryption", enc);
    }
    if let Some(flow) = node.flow.as_deref().filter(|s| !s.is_empty()) {
        query.append_pair("flow", flow);
    }

    if node.tls {
        if let Some(reality) = &node.reality_opts {
            query.append_pair("security", "reality");
            query.append_pair("pbk", &reality.public_key);
            query.append_pair("sid", &reality.short_id);
            if let Some(sn) = node.servername.as_deref().filter(|s| !s.is_empty()) {
                query.append_pair("sni", sn);
            } else if let Some(sn) = node.sni.as_deref().filter(|s| !s.is_empty()) {
                query.append_pair("sni", sn);
            }
            if let Some(fp) = node.client_fingerprint.as_deref().filter(|s| !s.is_empty()) {
                query.append_pair("fp", fp);
            }
        } else {
            query.append_pair("security", "tls");
            if let Some(sn) = node.servername.as_deref().filter(|s| !s.is_empty()) {
                query.append_pair("sni", sn);
            } else if let Some(sn) = node.sni.as_deref().filter(|s| !s.is_empty()) {
                query.append_pair("sni", sn);
            }
            if let Some(alpn) = node.alpn.as_ref().filter(|a| !a.is_empty()) {
                query.append_pair("alpn", &alpn.join(","));
            }
            if let Some(fp) = node.client_fingerprint.as_deref().filter(|s| !s.is_empty()) {
                query.append_pair("fp", fp);
            }
        }
    }

    if network == "ws" {
        if let Some(ws) = &node.ws_opts {
            let path = if ws.path.is_empty() { "/" } else { &ws.path };
            query.append_pair("path", path);
            if let Some(host) = ws.headers.as_ref().and_then(|h| h.get("Host")) {
                query.append_pair("host", host);
            }
        }
    } else if network == "grpc" {
        if let Some(grpc) = &node.grpc_opts {
            query.append_pair("serviceName", &grpc.grpc_service_name);
        }
    }

    let name = if node.name.is_empty() { "vless" } else { &node.name };

    Ok(format!(
        "vless://{}@{}:{}?{}#{}",
        node.uuid.as_deref().unwrap_or(""),
        node.server,
        node.port,
        query.finish(),
        escape_name(name)
    ))
}
