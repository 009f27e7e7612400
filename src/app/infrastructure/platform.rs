//! Seams to the collaborators outside the state core: image decoding,
//! rendering and machine translation.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::app::domain::asset::ImageHandle;
use crate::app::domain::screenshot::Screenshot;
use crate::app::infrastructure::error::{AppError, Result};

/// Turns uploaded or persisted bytes into a decoded image handle.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<ImageHandle>;
}

/// Decoder backed by the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultImageDecoder;

impl ImageDecoder for DefaultImageDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<ImageHandle> {
        let image = image::load_from_memory(bytes)?;
        Ok(ImageHandle::new(image))
    }
}

/// Compositing subsystem. Called after every state change with the screenshot
/// to redraw and the language to draw it in.
pub trait Renderer {
    fn render(&mut self, screenshot: &Screenshot, language: &str);
}

/// Machine translation provider.
pub trait Translator {
    /// Translate `texts` from `source_lang` into each of `target_langs`.
    /// The result maps every target language to one string per input text.
    fn translate_batch(
        &self,
        source_lang: &str,
        target_langs: &[String],
        texts: &[String],
    ) -> Result<HashMap<String, Vec<String>>>;
}

/// Encode raw image bytes as a `data:` URI for persistence.
pub fn encode_data_uri(bytes: &[u8]) -> String {
    let mime = image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream");
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Decode the payload of a base64 `data:` URI.
pub fn decode_data_uri(src: &str) -> Result<Vec<u8>> {
    let rest = src
        .strip_prefix("data:")
        .ok_or_else(|| AppError::Decode("not a data URI".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| AppError::Decode("data URI has no payload".to_string()))?;
    if !header.ends_with(";base64") {
        return Err(AppError::Decode(format!("unsupported data URI encoding: {}", header)));
    }
    STANDARD
        .decode(payload.trim())
        .map_err(|e| AppError::Decode(format!("invalid base64 payload: {}", e)))
}
