use std::fmt;
use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{DynamicImage, ImageFormat, Luma};
use qrcode::QrCode;
use serde::{Deserialize, Serialize};

const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

#[derive(Debug, thiserror::Error)]
pub enum QrError {
    #[error("unable to encode payment link as QR: {0}")]
    Encode(#[from] qrcode::types::QrError),
    #[error("unable to render QR image: {0}")]
    Image(#[from] image::ImageError),
    #[error("QR payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
}

/// Builds deterministic payment links and their QR images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLinker {
    base_url: String,
}

impl PaymentLinker {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Student id wins; otherwise the lowercased, whitespace-free name is used.
    pub fn link_for(&self, student_id: Option<&str>, name: &str) -> String {
        match student_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => format!("{}{}", self.base_url, id),
            None => format!("{}{}", self.base_url, name_key(name)),
        }
    }

    pub fn qr_for(&self, link: &str) -> Result<PaymentQr, QrError> {
        let code = QrCode::new(link.as_bytes())?;
        let rendered = code.render::<Luma<u8>>().build();

        let mut png = Vec::new();
        DynamicImage::ImageLuma8(rendered).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(PaymentQr::from_png(&png))
    }
}

pub(crate) fn name_key(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// PNG QR image carried as a `data:` URI, the form the dashboard displays and exports.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentQr {
    data_uri: String,
}

impl PaymentQr {
    pub fn from_png(png: &[u8]) -> Self {
        Self {
            data_uri: format!("{PNG_DATA_URI_PREFIX}{}", STANDARD.encode(png)),
        }
    }

    pub fn from_data_uri(data_uri: impl Into<String>) -> Self {
        Self {
            data_uri: data_uri.into(),
        }
    }

    pub fn data_uri(&self) -> &str {
        &self.data_uri
    }

    /// Raw PNG bytes for mail attachments. Bare base64 payloads are accepted too.
    pub fn png_bytes(&self) -> Result<Vec<u8>, QrError> {
        let payload = if self.data_uri.starts_with("data:image") {
            self.data_uri
                .split_once(',')
                .map(|(_, encoded)| encoded)
                .unwrap_or_default()
        } else {
            self.data_uri.as_str()
        };
        Ok(STANDARD.decode(payload.trim())?)
    }
}

impl fmt::Debug for PaymentQr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentQr")
            .field("data_uri_len", &self.data_uri.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://pay.ambitionschool.com/pay?student_id=";

    #[test]
    fn link_prefers_student_id() {
        let linker = PaymentLinker::new(BASE);
        assert_eq!(
            linker.link_for(Some(" S-101 "), "Asha Verma"),
            format!("{BASE}S-101")
        );
    }

    #[test]
    fn link_falls_back_to_normalized_name() {
        let linker = PaymentLinker::new(BASE);
        assert_eq!(
            linker.link_for(None, "Asha  Verma"),
            format!("{BASE}ashaverma")
        );
        assert_eq!(
            linker.link_for(Some("  "), "Ravi Kumar"),
            format!("{BASE}ravikumar")
        );
    }

    #[test]
    fn qr_round_trips_through_data_uri() {
        let linker = PaymentLinker::new(BASE);
        let qr = linker.qr_for(&format!("{BASE}S-101")).expect("qr renders");

        assert!(qr.data_uri().starts_with(PNG_DATA_URI_PREFIX));
        let png = qr.png_bytes().expect("decodes");
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn malformed_payload_is_a_decode_error() {
        let qr = PaymentQr::from_data_uri("data:image/png;base64,@@not-base64@@");
        assert!(matches!(qr.png_bytes(), Err(QrError::Decode(_))));
    }
}
