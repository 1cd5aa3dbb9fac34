//! 定长 Shift-JIS 名称字段

use encoding_rs::SHIFT_JIS;

use crate::{MotionError, Result};

/// 解码定长字段，截到第一个 NUL 为止
///
/// MMD 按字节截断长名称，末尾可能残留半个字符，无法解码的字节替换为 U+FFFD。
pub(crate) fn decode_fixed(bytes: &[u8], section: &str) -> Result<String> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    decode_lossy(&bytes[..end], section)
}

/// 带替换的解码；整段都无法解码时报错
fn decode_lossy(bytes: &[u8], section: &str) -> Result<String> {
    let (decoded, had_errors) = SHIFT_JIS.decode_without_bom_handling(bytes);
    if had_errors {
        if decoded.chars().all(|c| c == char::REPLACEMENT_CHARACTER) {
            return Err(MotionError::NameDecodeFailed(section.to_string()));
        }
        log::warn!("{} 含有无法解码的 Shift-JIS 字节: {:?}", section, decoded);
    }
    Ok(decoded.into_owned())
}

/// 编码为 len 字节，超长时在字符边界截断，不足补 NUL
pub(crate) fn encode_fixed(text: &str, len: usize, section: &str) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(len);
    let mut buf = [0u8; 4];
    for ch in text.chars() {
        let (encoded, _, had_errors) = SHIFT_JIS.encode(ch.encode_utf8(&mut buf));
        if had_errors {
            return Err(MotionError::NameEncodeFailed(format!("{}: {:?}", section, text)));
        }
        if out.len() + encoded.len() > len {
            break;
        }
        out.extend_from_slice(&encoded);
    }
    out.resize(len, 0);
    Ok(out)
}

/// 解码整段文本（VPD）
pub(crate) fn decode_text(bytes: &[u8], section: &str) -> Result<String> {
    decode_lossy(bytes, section)
}
