
use log::{debug, trace};
use serde_json::json;
use std::time::Duration;

use crate::explanation::{join_sections, Explanation, ExplanationFacts, ExplanationSource};
use crate::explanation::errors::ExplanationError;

/// Default chat-completions endpoint
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
/// Default model, also reported as `generated_by`
pub const DEFAULT_MODEL: &str = "gpt-4";
/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

const MAX_TOKENS: u64 = 500;
const TEMPERATURE: f64 = 0.3;
/// How many lines after a section keyword we collect
const SECTION_LOOKAHEAD: usize = 3;

const SYSTEM_PROMPT: &str = "You are a clinical pharmacogenomics expert providing actionable medical guidance.";

/// Connection settings for the backend
#[derive(Clone, Debug)]
pub struct OpenAiSettings {
    /// Bearer credential
    pub api_key: String,
    /// Full chat-completions URL
    pub api_url: String,
    /// Model name
    pub model: String,
    /// Request timeout
    pub timeout_secs: u64
}

impl OpenAiSettings {
    /// Settings with the default endpoint, model, and timeout
    pub fn new(api_key: &str) -> OpenAiSettings {
        OpenAiSettings {
            api_key: api_key.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS
        }
    }
}

/// An explanation backend that calls an OpenAI-compatible chat-completions endpoint.
/// Requests are blocking, bounded by the timeout, and never retried.
pub struct OpenAiExplainer {
    settings: OpenAiSettings,
    client: reqwest::blocking::Client
}

impl OpenAiExplainer {
    /// Creates the backend and its HTTP client.
    /// # Arguments
    /// * `settings` - endpoint, model, credential, and timeout
    /// # Errors
    /// * if the credential is empty
    /// * if the HTTP client cannot be built
    pub fn new(settings: OpenAiSettings) -> Result<OpenAiExplainer, ExplanationError> {
        if settings.api_key.trim().is_empty() {
            return Err(ExplanationError::MissingCredential);
        }

        let client = reqwest::blocking::Client::builder()
            .user_agent(env!("CARGO_PKG_NAME"))
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(OpenAiExplainer {
            settings,
            client
        })
    }

    /// Sends the prompt and returns the raw reply text
    fn request_completion(&self, prompt: &str) -> Result<String, ExplanationError> {
        let body = json!({
            "model": self.settings.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt }
            ],
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE
        });

        debug!("Requesting explanation from {}", self.settings.api_url);
        let response = self.client.post(&self.settings.api_url)
            .bearer_auth(&self.settings.api_key)
            .json(&body)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| self.map_error(e))?;

        let parsed: serde_json::Value = response.json()
            .map_err(|e| self.map_error(e))?;
        trace!("Response: {parsed}");
        extract_reply(&parsed)
    }

    fn map_error(&self, error: reqwest::Error) -> ExplanationError {
        if error.is_timeout() {
            ExplanationError::Timeout { seconds: self.settings.timeout_secs }
        } else {
            ExplanationError::Http(error)
        }
    }
}

impl ExplanationSource for OpenAiExplainer {
    fn identifier(&self) -> &str {
        &self.settings.model
    }

    fn explain(&self, facts: &ExplanationFacts) -> Result<Explanation, ExplanationError> {
        let prompt = build_prompt(facts);
        let reply = self.request_completion(&prompt)?;
        Ok(split_reply(&reply, self.identifier()))
    }
}

/// Builds the user prompt from the structured facts only
pub fn build_prompt(facts: &ExplanationFacts) -> String {
    let variant_str = if facts.rsids.is_empty() {
        "none detected".to_string()
    } else {
        facts.rsids.join(", ")
    };

    format!(
"You are a clinical pharmacogenomics expert. Generate a concise clinical explanation for the following:

Patient Pharmacogenomic Data:
- Drug: {}
- Primary Gene: {}
- Diplotype: {}
- Phenotype: {}
- Risk Assessment: {} (Severity: {})
- Detected Variants: {}
- Clinical Recommendation: {}

Please provide:
1. A brief summary (2-3 sentences) explaining why this patient has this risk
2. The biological mechanism (how this gene variant affects drug metabolism)
3. Clinical implications for this specific patient
4. Any monitoring parameters the clinician should watch

Be specific, cite the variants and diplotype in your explanation. Use clear, professional medical language.",
        facts.drug, facts.gene, facts.diplotype, facts.phenotype,
        facts.risk_label, facts.severity, variant_str, facts.recommendation
    )
}

/// Pulls the message content out of a chat-completions response
/// # Errors
/// * if there is no message content, or it is blank
fn extract_reply(response: &serde_json::Value) -> Result<String, ExplanationError> {
    let content = response.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str());

    match content {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        Some(_) => Err(ExplanationError::InvalidResponse("empty message content".to_string())),
        None => Err(ExplanationError::InvalidResponse("missing choices[0].message.content".to_string()))
    }
}

/// Splits a free-text reply into the four sections
/// # Arguments
/// * `reply` - the full reply text
/// * `generated_by` - the identifier to report
pub fn split_reply(reply: &str, generated_by: &str) -> Explanation {
    let trimmed = reply.trim();
    let summary = trimmed.lines().next().unwrap_or_default().to_string();
    let mechanism = extract_section(trimmed, &["mechanism", "biological"]);
    let clinical_implications = extract_section(trimmed, &["clinical implications", "implications"]);
    let monitoring = extract_section(trimmed, &["monitoring", "watch"]);
    let full_explanation = if mechanism.is_empty() && clinical_implications.is_empty() && monitoring.is_empty() {
        trimmed.to_string()
    } else {
        join_sections(&summary, &mechanism, &clinical_implications, &monitoring)
    };

    Explanation {
        summary,
        mechanism,
        clinical_implications,
        monitoring,
        full_explanation,
        generated_by: generated_by.to_string(),
        generated_at: None,
        backend_error: None
    }
}

/// Finds the first line containing any keyword (case-insensitive) and joins the non-empty lines after it.
/// Returns an empty string if no keyword line has content after it.
pub fn extract_section(text: &str, keywords: &[&str]) -> String {
    let lines: Vec<&str> = text.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        let lower = line.to_lowercase();
        if keywords.iter().any(|kw| lower.contains(&kw.to_lowercase())) {
            let section: Vec<&str> = lines.iter()
                .skip(i + 1)
                .take(SECTION_LOOKAHEAD)
                .map(|l| l.trim())
                .filter(|l| !l.is_empty())
                .collect();
            if !section.is_empty() {
                return section.join(" ");
            }
        }
    }
    String::new()
}
