use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE},
    Engine as _,
};
use serde::Deserialize;
use tracing::debug;

use crate::node::ProxyNode;
use crate::protocol;
use crate::utils::ConvertError;

/// mihomo 配置文档，只关心 proxies 列表
#[derive(Debug, Deserialize)]
struct MihomoConfig {
    #[serde(default)]
    proxies: Option<Vec<ProxyNode>>,
}

/// 从订阅原文提取节点列表。
///
/// 内容先按结构化配置探测（proxies / proxy-groups 标记），
/// 否则整体按 base64 订阅块处理，逐行解析分享链接。
pub fn extract(content: &str) -> Result<Vec<ProxyNode>, ConvertError> {
    let trimmed = content.trim();

    if is_structured(trimmed) {
        debug!("检测到结构化配置，按 YAML 解析");
        return extract_structured(trimmed);
    }

    debug!("按 base64 订阅块处理");
    extract_blob(trimmed)
}

/// 对已经拆分好的链接列表做批量解析，坏行跳过不中断
pub fn extract_from_uris<S: AsRef<str>>(uris: &[S]) -> Result<Vec<ProxyNode>, ConvertError> {
    let mut nodes = Vec::new();
    for uri in uris {
        match protocol::decode(uri.as_ref()) {
            Ok(node) => nodes.push(node),
            Err(err) => debug!("链接解析失败: {}", err),
        }
    }

    if nodes.is_empty() {
        return Err(ConvertError::NoProxiesFound);
    }
    Ok(nodes)
}

fn is_structured(content: &str) -> bool {
    content.starts_with("proxies:")
        || content.starts_with("proxy-groups:")
        || content.contains("\nproxies:")
        || content.contains("\nproxy-groups:")
}

fn extract_structured(content: &str) -> Result<Vec<ProxyNode>, ConvertError> {
    let config: MihomoConfig = serde_yaml::from_str(content)
        .map_err(|e| ConvertError::InvalidFormat(format!("YAML 解析失败: {}", e)))?;

    let proxies = config.proxies.unwrap_or_default();
    if proxies.is_empty() {
        return Err(ConvertError::NoProxiesFound);
    }

    debug!("YAML 订阅解析出 {} 个节点", proxies.len());
    Ok(proxies)
}

fn extract_blob(content: &str) -> Result<Vec<ProxyNode>, ConvertError> {
    // 订阅方常把 base64 块按行折叠，解码前先去掉换行
    let cleaned: String = content
        .chars()
        .filter(|c| !matches!(c, '\r' | '\n'))
        .collect();

    let decoded = STANDARD
        .decode(cleaned.as_bytes())
        .or_else(|_| URL_SAFE.decode(cleaned.as_bytes()))
        .map_err(|e| {
            debug!("订阅内容 base64 解码失败: {}", e);
            ConvertError::NoProxiesFound
        })?;
    let text = String::from_utf8_lossy(&decoded);

    let mut nodes = Vec::new();
    for (index, raw) in text.split('\n').enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match protocol::decode(line) {
            Ok(node) => nodes.push(node),
            Err(err) => debug!("第 {} 行解析失败: {}", index + 1, err),
        }
    }

    if nodes.is_empty() {
        return Err(ConvertError::NoProxiesFound);
    }

    debug!("base64 订阅解析出 {} 个有效节点", nodes.len());
    Ok(nodes)
}
