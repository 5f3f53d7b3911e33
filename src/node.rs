use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 统一的代理节点记录
///
/// 所有协议解析后都落到这一张扁平结构上，字段名与 mihomo/clash
/// 配置里 `proxies:` 条目的写法一一对应（连字符键通过 rename 保证）。
/// 未使用的字段序列化时一律省略，避免输出里混入零值。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProxyNode {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub server: String,
    /// 端口缺失或无法解析时保留 0，不作为解析失败处理
    pub port: u16,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cipher: Option<String>,
    #[serde(rename = "alterId", skip_serializing_if = "is_zero")]
    pub alter_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub tls: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servername: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption: Option<String>,
    #[serde(rename = "client-fingerprint", skip_serializing_if = "Option::is_none")]
    pub client_fingerprint: Option<String>,

    /// shadowsocks 插件（如 obfs、v2ray-plugin）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
    /// 插件参数没有固定模式，保持松散的键值映射
    #[serde(rename = "plugin-opts", skip_serializing_if = "Option::is_none")]
    pub plugin_opts: Option<serde_json::Map<String, serde_json::Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obfs: Option<String>,
    #[serde(rename = "obfs-param", skip_serializing_if = "Option::is_none")]
    pub obfs_param: Option<String>,
    #[serde(rename = "protocol-param", skip_serializing_if = "Option::is_none")]
    pub protocol_param: Option<String>,

    #[serde(rename = "auth-str", skip_serializing_if = "Option::is_none")]
    pub auth_str: Option<String>,
    /// hysteria 的带宽都是带单位的原始字符串（如 "100 Mbps"），不做数值化
    #[serde(skip_serializing_if = "Option::is_none")]
    pub up: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub down: Option<String>,
    #[serde(rename = "obfs-password", skip_serializing_if = "Option::is_none")]
    pub obfs_password: Option<String>,

    #[serde(rename = "skip-cert-verify", skip_serializing_if = "is_false")]
    pub skip_cert_verify: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpn: Option<Vec<String>>,

    #[serde(rename = "ws-opts", skip_serializing_if = "Option::is_none")]
    pub ws_opts: Option<WsOpts>,
    #[serde(rename = "grpc-opts", skip_serializing_if = "Option::is_none")]
    pub grpc_opts: Option<GrpcOpts>,
    #[serde(rename = "reality-opts", skip_serializing_if = "Option::is_none")]
    pub reality_opts: Option<RealityOpts>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(rename = "disable-sni", skip_serializing_if = "is_false")]
    pub disable_sni: bool,
    #[serde(rename = "reduce-rtt", skip_serializing_if = "is_false")]
    pub reduce_rtt: bool,
    #[serde(rename = "udp-relay-mode", skip_serializing_if = "Option::is_none")]
    pub udp_relay_mode: Option<String>,
    #[serde(rename = "congestion-controller", skip_serializing_if = "Option::is_none")]
    pub congestion_controller: Option<String>,
    /// hysteria2 的端口跳跃范围（如 "30000-40000"）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ports: Option<String>,
}

/// WebSocket 传输参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WsOpts {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
}

/// gRPC 传输参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GrpcOpts {
    #[serde(rename = "grpc-service-name")]
    pub grpc_service_name: String,
}

/// Reality 握手参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RealityOpts {
    #[serde(rename = "public-key")]
    pub public_key: String,
    #[serde(rename = "short-id")]
    pub short_id: String,
}

fn is_false(v: &bool) -> bool {
    !*v
}

fn is_zero(v: &u32) -> bool {
    *v == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_field_names() {
        let node = ProxyNode {
            name: "测试节点".to_string(),
            node_type: "vless".to_string(),
            server: "example.com".to_string(),
            port: 443,
            uuid: Some("b831381d-6324-4d53-ad4f-8cda48b30811".to_string()),
            tls: true,
            servername: Some("www.apple.com".to_string()),
            client_fingerprint: Some("chrome".to_string()),
            reality_opts: Some(RealityOpts {
                public_key: "pbk-value".to_string(),
                short_id: "0123456789abcdef".to_string(),
            }),
            ..Default::default()
        };

        let yaml = serde_yaml::to_string(&node).unwrap();
        assert!(yaml.contains("type: vless"));
        assert!(yaml.contains("client-fingerprint: chrome"));
        assert!(yaml.contains("reality-opts:"));
        assert!(yaml.contains("public-key: pbk-value"));
        assert!(yaml.contains("short-id:"));
    }

    #[test]
    fn test_yaml_omits_unset_fields() {
        let node = ProxyNode {
            name: "ss-node".to_string(),
            node_type: "ss".to_string(),
            server: "1.2.3.4".to_string(),
            port: 8388,
            cipher: Some("aes-256-gcm".to_string()),
            password: Some("secret".to_string()),
            ..Default::default()
        };

        let yaml = serde_yaml::to_string(&node).unwrap();
        // 未使用的协议字段不应出现在输出里
        assert!(!yaml.contains("uuid"));
        assert!(!yaml.contains("tls"));
        assert!(!yaml.contains("alterId"));
        assert!(!yaml.contains("skip-cert-verify"));
        // port 为必选字段，即使是 0 也要输出
        assert!(yaml.contains("port: 8388"));
    }

    #[test]
    fn test_deserialize_ignores_unknown_keys() {
        let yaml = r#"
name: "relay"
type: trojan
server: trojan.example.com
port: 443
password: pw123
udp: true
smux:
  enabled: false
"#;
        let node: ProxyNode = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(node.node_type, "trojan");
        assert_eq!(node.password.as_deref(), Some("pw123"));
        assert_eq!(node.port, 443);
    }

    #[test]
    fn test_deserialize_missing_optionals() {
        let yaml = "name: n\ntype: ss\nserver: s\nport: 80\n";
        let node: ProxyNode = serde_yaml::from_str(yaml).unwrap();
        assert!(node.uuid.is_none());
        assert!(!node.tls);
        assert_eq!(node.alter_id, 0);
    }
}
