use thiserror::Error;

/// 转换错误类型
///
/// 所有解析/生成失败最终都归类为这三种错误，
/// 调用方可以据此决定是拒绝单条链接还是整份订阅。
#[derive(Error, Debug)]
pub enum ConvertError {
    /// 链接本身格式损坏（缺少 scheme、base64 解码失败、字段数不足等）
    #[error("无效的链接格式: {0}")]
    InvalidFormat(String),

    /// scheme 可识别为代理链接但不在支持列表内
    #[error("不支持的协议: {0}")]
    UnsupportedProtocol(String),

    /// 订阅内容里没有解析出任何节点
    #[error("未找到有效的代理节点")]
    NoProxiesFound,
}
