//! Prompt template substitution.

/// Marker the analysis model puts where the subject description belongs.
pub const PLACEHOLDER: &str = "[TARGET_CAR]";

/// Subject text shown to the user while configuring.
pub const DISPLAY_SUBJECT: &str = "Your New Car";

/// Subject text sent to the generation model alongside the reference image.
pub const REFERENCE_SUBJECT: &str = "the provided vehicle reference";

/// Replace every placeholder in `template` with `subject`.
///
/// The result never contains the placeholder unless `subject` itself does.
pub fn finalize_prompt(template: &str, subject: &str) -> String {
    template.replace(PLACEHOLDER, subject)
}

/// Prompt as displayed during configuration.
pub fn display_prompt(template: &str) -> String {
    finalize_prompt(template, DISPLAY_SUBJECT)
}

pub fn contains_placeholder(text: &str) -> bool {
    text.contains(PLACEHOLDER)
}
