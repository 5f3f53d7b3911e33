use base64::{
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
    Engine as _,
};

use super::error::ConvertError;

/// URL-safe 无填充 base64 编码
///
/// 链接里的用户信息、SSR 主体、vmess JSON 等部件统一用这种形式。
pub fn b64_encode(input: &str) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

/// URL-safe base64 解码，自动补齐缺失的 `=` 填充
///
/// 分享链接普遍省略填充，这里先补齐再严格解码；
/// 标准字母表（含 `+` `/`）的输入会被拒绝。
pub fn b64_decode(input: &str) -> Result<String, ConvertError> {
    let mut padded = input.to_string();
    while padded.len() % 4 != 0 {
        padded.push('=');
    }

    let data = URL_SAFE
        .decode(padded.as_bytes())
        .map_err(|e| ConvertError::InvalidFormat(format!("base64 解码失败: {}", e)))?;

    // 解码结果按文本处理，个别非 UTF-8 字节不应让整条链接失败
    Ok(String::from_utf8_lossy(&data).into_owned())
}
