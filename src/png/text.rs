//! Payload builders for textual and profile chunks.
//!
//! A [`TextData`] record becomes tEXt when it is short Latin-1 text, zTXt
//! when it is long Latin-1 text, and iTXt when it needs Unicode or carries a
//! language tag or translated keyword.

use crate::compress::zlib_compress;
use crate::error::{Error, Result};
use crate::metadata::TextData;
use crate::png::chunk::ChunkType;

/// iTXt keyword under which XMP packets are stored.
pub const XMP_KEYWORD: &str = "XML:com.adobe.xmp";

/// Profile name written in iCCP.
pub const ICC_PROFILE_NAME: &str = "ICC Profile";

/// Encode `s` as Latin-1, or `None` if any character is outside it.
fn latin1(s: &str) -> Option<Vec<u8>> {
    s.chars().map(|c| u8::try_from(u32::from(c)).ok()).collect()
}

/// Validate a keyword: 1-79 Latin-1 characters.
fn keyword_bytes(keyword: &str) -> Result<Vec<u8>> {
    match latin1(keyword) {
        Some(bytes) if (1..=79).contains(&bytes.len()) => Ok(bytes),
        _ => Err(Error::InvalidTextKeyword(keyword.to_string())),
    }
}

/// Build the chunk for one text record.
///
/// Values longer than `threshold` characters are zlib-compressed at `level`.
pub fn text_chunk(text: &TextData, threshold: usize, level: u8) -> Result<(ChunkType, Vec<u8>)> {
    let keyword = keyword_bytes(&text.keyword)?;
    let compress = text.value.chars().count() > threshold;
    let latin1_value = latin1(&text.value);
    let international = latin1_value.is_none()
        || !text.language_tag.trim().is_empty()
        || !text.translated_keyword.trim().is_empty();

    if international {
        let value = if compress {
            zlib_compress(text.value.as_bytes(), level)?
        } else {
            text.value.as_bytes().to_vec()
        };
        let mut payload = Vec::with_capacity(
            keyword.len() + text.language_tag.len() + text.translated_keyword.len() + value.len() + 5,
        );
        payload.extend_from_slice(&keyword);
        payload.push(0);
        payload.push(u8::from(compress));
        payload.push(0); // compression method
        payload.extend_from_slice(text.language_tag.as_bytes());
        payload.push(0);
        payload.extend_from_slice(text.translated_keyword.as_bytes());
        payload.push(0);
        payload.extend_from_slice(&value);
        return Ok((ChunkType::ITXT, payload));
    }

    let value = latin1_value.unwrap_or_default();
    let mut payload = keyword;
    payload.push(0);
    if compress {
        payload.push(0); // compression method
        payload.extend_from_slice(&zlib_compress(&value, level)?);
        Ok((ChunkType::ZTXT, payload))
    } else {
        payload.extend_from_slice(&value);
        Ok((ChunkType::TEXT, payload))
    }
}

/// iTXt payload carrying an uncompressed XMP packet.
pub fn xmp_payload(xmp: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(XMP_KEYWORD.len() + 5 + xmp.len());
    payload.extend_from_slice(XMP_KEYWORD.as_bytes());
    // separator, compression flag, method, empty language, empty translation
    payload.extend_from_slice(&[0; 5]);
    payload.extend_from_slice(xmp);
    payload
}

/// iCCP payload: profile name, method 0 and the zlib-compressed profile.
pub fn icc_payload(profile: &[u8], level: u8) -> Result<Vec<u8>> {
    let compressed = zlib_compress(profile, level)?;
    let mut payload = Vec::with_capacity(ICC_PROFILE_NAME.len() + 2 + compressed.len());
    payload.extend_from_slice(ICC_PROFILE_NAME.as_bytes());
    payload.push(0);
    payload.push(0);
    payload.extend_from_slice(&compressed);
    Ok(payload)
}
