//! Role instructions and user-turn payloads for the three prompt stages.
//!
//! Every prompt lives here so tests can inspect them without a model and so
//! the stage code never carries prompt text. Each instruction fixes the
//! Markdown section structure the stage must return.

/// Instruction for the analysis stage (analyzer role).
pub const ANALYZER_SYSTEM_PROMPT: &str = r#"You are a medical document analyzer. Extract key information and format it in markdown with the following sections:

### Date of Incident
- Specify the date when the medical incident occurred

### Medical Facility
- Name of the medical center/hospital
- Location details

### Healthcare Providers
- Primary physician
- Other medical staff involved

### Patient Information
- Chief complaints
- Vital signs
- Relevant medical history

### Medications
- Current medications
- New prescriptions
- Dosage information

Please ensure the response is well-formatted in markdown with appropriate headers and bullet points."#;

/// Instruction for the summary stage (summary role).
pub const SUMMARIZER_SYSTEM_PROMPT: &str = r#"You are a medical report summarizer. Create a detailed summary in markdown format with the following sections:

### Key Findings
- Main medical issues identified
- Critical observations

### Diagnosis
- Primary diagnosis
- Secondary conditions (if any)

### Treatment Plan
- Recommended procedures
- Medications prescribed
- Follow-up instructions

### Additional Notes
- Important considerations
- Special instructions

Please ensure proper markdown formatting with headers, bullet points, and emphasis where appropriate."#;

/// Instruction for the validation stage (analyzer role).
pub const VALIDATOR_SYSTEM_PROMPT: &str = r#"You are a medical diagnosis validator. Provide your assessment in markdown format with these sections:

### Alignment Analysis
- Evaluate if diagnosis matches symptoms
- Assess treatment appropriateness
- Review medication selections

### Recommendations
- Alternative treatments to consider
- Suggested medication adjustments
- Additional tests if needed

### Risk Assessment
- Potential complications
- Drug interaction concerns
- Follow-up recommendations

Please format your response in clear markdown with appropriate headers and bullet points."#;

/// The analysis stage sends the extracted document text as-is.
pub fn analysis_request(extracted_text: &str) -> String {
    extracted_text.to_string()
}

pub fn summary_request(analysis: &str) -> String {
    format!("Generate a detailed medical summary report based on this analysis: {analysis}")
}

/// Validation sees both earlier outputs and is asked to judge alignment
/// with the complaint, proposing alternatives when they disagree.
pub fn validation_request(analysis: &str, summary: &str) -> String {
    format!(
        "Analysis: {analysis}\nSummary: {summary}\n\
         Based on the Analysis and Summary provided please provide whether diagnosis, \
         treatment and medication provided is in alignment with medical complaint.\n\
         If not in alignment then specify what best treatment and medication could have been provided."
    )
}
