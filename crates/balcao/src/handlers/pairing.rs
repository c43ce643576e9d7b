use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use qrcode::QrCode;
use qrcode::render::svg;
use tracing::warn;

use crate::gateway::AuthMethod;
use crate::server::AppState;

/// Smallest rendered side, in pixels; comfortable to scan from a laptop screen.
const QR_MIN_SIZE: u32 = 280;

/// GET /qr
///
/// Pending pairing challenge for the operator to scan, or 404 when there is
/// nothing to pair.
pub async fn qr(State(state): State<AppState>) -> Response {
    match state.pairing.prompt() {
        Some(prompt) => Json(prompt).into_response(),
        None => (StatusCode::NOT_FOUND, "No pairing in progress").into_response(),
    }
}

/// GET /qr.svg
///
/// The pending QR challenge as a scannable image. 404 when paired or when the
/// gateway asked for a pairing code instead.
pub async fn qr_svg(State(state): State<AppState>) -> Response {
    let Some(AuthMethod::QrCode { qr_data, .. }) = state.pairing.prompt().map(|p| p.method) else {
        return (StatusCode::NOT_FOUND, "No QR code to scan").into_response();
    };

    match render_svg(&qr_data) {
        Ok(image) => ([(header::CONTENT_TYPE, "image/svg+xml")], image).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to render pairing QR code");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render QR code").into_response()
        }
    }
}

fn render_svg(data: &str) -> Result<String, qrcode::types::QrError> {
    let code = QrCode::new(data.as_bytes())?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(QR_MIN_SIZE, QR_MIN_SIZE)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_whatsapp_sized_payload() {
        let data = format!("2@{},{},{}", "A".repeat(160), "b".repeat(44), "c".repeat(44));
        let image = render_svg(&data).unwrap();
        assert!(image.contains("<svg"));
    }
}
