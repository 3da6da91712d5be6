/// PDF text extraction. No OCR — an image-only PDF is reported as a
/// failure rather than silently returning empty text.
use crate::errors::PipelineError;

const MIN_CHARS: usize = 50;

pub struct ExtractedText {
    pub text: String,
    pub characters: usize,
}

pub fn extract_pdf_text(path: &std::path::Path) -> Result<ExtractedText, PipelineError> {
    let bytes = std::fs::read(path).map_err(|e| PipelineError::StageSkippable(format!("cannot read {path:?}: {e}")))?;

    let text = pdf_extract::extract_text_from_mem(&bytes)
        .map_err(|e| PipelineError::StageSkippable(format!("pdf extraction failed: {e}")))?;

    let characters = text.chars().count();
    if characters < MIN_CHARS {
        return Err(PipelineError::StageSkippable(
            "PDF appears to be image-based; OCR is not supported".to_string(),
        ));
    }

    Ok(ExtractedText { text, characters })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_stage_skippable() {
        let result = extract_pdf_text(std::path::Path::new("/nonexistent/path.pdf"));
        assert!(matches!(result, Err(PipelineError::StageSkippable(_))));
    }
}
