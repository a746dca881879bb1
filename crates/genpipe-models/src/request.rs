//! Primary-stage generation request.

use crate::image::EncodedAsset;
use crate::params::{GenerationParams, PrimaryModel};

/// Encoded inputs plus generation options for one primary submission.
///
/// Built fresh per submission and consumed by value when submitted.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Encoded images, ordered as `params.model().asset_parts()`
    pub assets: Vec<EncodedAsset>,
    pub params: GenerationParams,
}

impl GenerationRequest {
    pub fn new(assets: Vec<EncodedAsset>, params: GenerationParams) -> Self {
        Self { assets, params }
    }

    pub fn model(&self) -> PrimaryModel {
        self.params.model()
    }

    /// Total payload size across all assets.
    pub fn payload_bytes(&self) -> usize {
        self.assets.iter().map(EncodedAsset::len).sum()
    }

    /// Validate the request.
    pub fn validate(&self) -> Result<(), String> {
        let parts = self.model().asset_parts();

        if self.assets.len() != parts.len() {
            return Err(format!(
                "{} generation requires {} image(s) ({}), got {}",
                self.model(),
                parts.len(),
                parts.join(", "),
                self.assets.len()
            ));
        }

        if let Some(index) = self.assets.iter().position(EncodedAsset::is_empty) {
            return Err(format!("Image '{}' is empty", parts[index]));
        }

        self.params.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{PortraitParams, TryOnParams};

    fn asset() -> EncodedAsset {
        EncodedAsset::jpeg(vec![0xFF, 0xD8, 0xFF, 0xD9], 2, 2, 0.8, 1)
    }

    #[test]
    fn test_valid_portrait_request() {
        let req = GenerationRequest::new(
            vec![asset()],
            GenerationParams::Portrait(PortraitParams::new("a knight")),
        );
        assert!(req.validate().is_ok());
        assert_eq!(req.payload_bytes(), 4);
    }

    #[test]
    fn test_try_on_requires_two_images() {
        let req = GenerationRequest::new(
            vec![asset()],
            GenerationParams::TryOn(TryOnParams::default()),
        );
        let err = req.validate().unwrap_err();
        assert!(err.contains("requires 2 image(s)"), "{}", err);
    }

    #[test]
    fn test_empty_asset_rejected() {
        let empty = EncodedAsset::jpeg(Vec::new(), 0, 0, 0.8, 1);
        let req = GenerationRequest::new(
            vec![asset(), empty],
            GenerationParams::TryOn(TryOnParams::default()),
        );
        assert_eq!(req.validate().unwrap_err(), "Image 'garment_image' is empty");
    }

    #[test]
    fn test_missing_prompt_rejected() {
        let req = GenerationRequest::new(
            vec![asset()],
            GenerationParams::Portrait(PortraitParams::new("")),
        );
        assert!(req.validate().is_err());
    }
}
