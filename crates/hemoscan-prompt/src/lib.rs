#![warn(missing_docs)]
//! # hemoscan-prompt
//!
//! ## Purpose
//! Builds the diagnostic instruction text sent alongside each image.
//!
//! ## Responsibilities
//! - Select fixed biomarker guidance per [`ScanTarget`].
//! - Wrap it in the shared four-step frame: validity gate, biomarker
//!   analysis, diagnosis formulation, JSON-only output.
//!
//! ## Data flow
//! Session confirm -> [`build_prompt`] -> prompt text in
//! [`hemoscan_core::AnalysisRequest`].
//!
//! ## Error model
//! None. Every target has guidance, so the builder is infallible.
//!
//! ## Example
//! ```rust
//! use hemoscan_core::ScanTarget;
//! use hemoscan_prompt::build_prompt;
//!
//! let prompt = build_prompt(ScanTarget::Palm);
//! assert!(prompt.contains("Palmar Creases"));
//! assert!(prompt.contains("Return ONLY a valid JSON object"));
//! ```

use hemoscan_core::ScanTarget;

const ROLE: &str = "Role: Act as a board-certified Hematologist and expert Computer Vision \
Medical Diagnostic System.";

const NAIL_BED_GUIDANCE: &str = "\
- Analyze Nail Bed Color: Healthy nail beds are distinctively pink due to hemoglobin. \
Anemic nail beds appear pale, white, or bluish.
- Check for Koilonychia: Look for spoon-shaped indentations (if visible).
- Assess Lunula Contrast: If the distinction between the white lunula and the rest of the \
nail is lost due to overall pallor, this indicates anemia.";

const CONJUNCTIVA_GUIDANCE: &str = "\
- Analyze the Palpebral Conjunctiva: Focus on the inner lining of the pulled-down lower eyelid.
- Color Assessment: A healthy conjunctiva is bright pink or red with visible capillaries.
- Anemia Signs: Look for a pale, porcelain-white, or very faint pink color.";

const PALM_GUIDANCE: &str = "\
- Analyze Palmar Creases: Look at the major lines on the palm.
- Healthy: Creases are darker/redder than the surrounding skin.
- Anemic: Creases are as pale as the skin (\"washed out\"), indicating severe anemia.
- General Perfusion: Compare overall skin tone to expected healthy vascularization.";

const DIAGNOSIS_STEP: &str = "\
Step 3: Diagnosis Formulation
- Combine observations to determine a Pallor Level (None, Mild, Moderate, Severe).
- Assign a Prediction: \"Normal\" (Healthy perfusion) vs \"Anemic\" (Significant pallor) vs \"Uncertain\".
- Assign Confidence (0-100) based on the clarity of the visual evidence.";

const OUTPUT_STEP: &str = "\
Step 4: Output Generation
Return ONLY a valid JSON object with this structure and no surrounding prose:
{
  \"prediction\": \"Anemic\" | \"Normal\" | \"Uncertain\",
  \"confidence\": number,
  \"pallorLevel\": \"None\" | \"Mild\" | \"Moderate\" | \"Severe\",
  \"reasoning\": \"Concise, professional medical explanation referencing specific visual cues found.\",
  \"recommendations\": [\"Dietary tip\", \"Lifestyle tip\", \"Next step (e.g. See a doctor)\"]
}";

/// Returns the fixed biomarker guidance for `target`.
pub fn biomarker_guidance(target: ScanTarget) -> &'static str {
    match target {
        ScanTarget::NailBed => NAIL_BED_GUIDANCE,
        ScanTarget::Conjunctiva => CONJUNCTIVA_GUIDANCE,
        ScanTarget::Palm => PALM_GUIDANCE,
    }
}

/// Builds the full instruction text for `target`.
///
/// Output is a pure function of the target.
pub fn build_prompt(target: ScanTarget) -> String {
    let area = target.anatomical_name();
    let id = target.as_str();

    format!(
        "{ROLE}
Task: Screen the provided image for signs of Anemia (Iron Deficiency) by rigorously analyzing the {area}.

Step 1: Image Quality & Validity Check
- Is the image in focus and well-lit?
- Is the target area ({id}) clearly visible?
- If the image is too dark, blurry, black & white, or does not contain the correct body part, \
YOU MUST return \"prediction\": \"Uncertain\" and explain why.

Step 2: Biomarker Analysis (Chain of Thought)
{guidance}

{DIAGNOSIS_STEP}

{OUTPUT_STEP}
",
        guidance = biomarker_guidance(target),
    )
}
