// src/extractors/section.rs

// --- Imports ---
use crate::utils::error::ExtractError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

// --- Constants ---
/// Section labels recognised out of the box, in tie-break order.
/// "techinal skills" is a misspelling seen in real CVs and is matched on its own.
pub const DEFAULT_LABELS: &[&str] = &[
    "summary",
    "projects",
    "techinal skills",
    "technical skills",
    "experience",
    "soft skills",
    "education",
    "achievements",
    "participation",
    "references",
];

/// Marker carried by every failed extraction.
pub const EXTRACTION_FAILURE_MESSAGE: &str = "Error extracting CV data";

// Keys owned by the record itself; a section may not shadow them.
const RESERVED_KEYS: &[&str] = &["name", "personal_info", "email", "phone", "error", "details"];

// ASCII word boundaries: an address glued to a non-ASCII letter is still found.
pub const EMAIL_PATTERN: &str = r"(?-u:\b)[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}(?-u:\b)";
// Deliberately loose: a year or zip code earlier in the text wins over the real number.
pub const PHONE_PATTERN: &str = r"\+?[0-9][0-9\s\-]+";

// Whitespace plus the byte-order mark, which PDF/DOCX text often starts with.
fn is_blank(c: char) -> bool {
    c.is_whitespace() || c == '\u{FEFF}'
}

fn trim_blank(s: &str) -> &str {
    s.trim_matches(is_blank)
}

// --- Regex Patterns (Lazy Static) ---
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(EMAIL_PATTERN).expect("Failed to compile EMAIL_RE"));

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(PHONE_PATTERN).expect("Failed to compile PHONE_RE"));

// --- Label Catalog ---

/// Ordered list of lowercase section labels.
///
/// A line belongs to a label when its lowercased form starts with that label.
/// The first label in catalog order wins, even if a later one is longer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelCatalog {
    labels: Vec<String>,
}

impl Default for LabelCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_LABELS.iter().copied())
    }
}

impl LabelCatalog {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut catalog = Self { labels: Vec::new() };
        catalog.push_all(labels);
        catalog
    }

    /// Appends labels after the existing ones, so they lose every tie-break.
    pub fn with_extra<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.push_all(labels);
        self
    }

    fn push_all<I, S>(&mut self, labels: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for label in labels {
            let label = label.as_ref().trim().to_lowercase();
            if label.is_empty() || self.labels.contains(&label) {
                continue;
            }
            if RESERVED_KEYS.contains(&label.as_str()) {
                tracing::warn!("Ignoring section label '{}': it clashes with a record field", label);
                continue;
            }
            self.labels.push(label);
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    /// Returns the first matching label and the rest of the line after it.
    pub fn match_line<'c, 'l>(&'c self, line: &'l str) -> Option<(&'c str, &'l str)> {
        self.labels
            .iter()
            .find_map(|label| strip_label(line, label).map(|rest| (label.as_str(), rest)))
    }
}

/// Case-insensitive prefix strip: lowercases `line` char by char and
/// compares against `label`, returning the untouched remainder of `line`.
fn strip_label<'l>(line: &'l str, label: &str) -> Option<&'l str> {
    let mut wanted = label.chars().peekable();
    for (idx, ch) in line.char_indices() {
        if wanted.peek().is_none() {
            return Some(&line[idx..]);
        }
        for lower in ch.to_lowercase() {
            if wanted.next() != Some(lower) {
                return None;
            }
        }
    }
    wanted.peek().is_none().then_some("")
}

// --- Data Structures ---

/// Label → accumulated text, kept in the order labels were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
    entries: Vec<(String, String)>,
}

impl Sections {
    /// Assigns `content` to `label` (a repeated label restarts its block)
    /// and returns the slot that later lines append to.
    fn start(&mut self, label: &str, content: &str) -> usize {
        match self.entries.iter().position(|(name, _)| name == label) {
            Some(slot) => {
                self.entries[slot].1 = content.to_string();
                slot
            }
            None => {
                self.entries.push((label.to_string(), content.to_string()));
                self.entries.len() - 1
            }
        }
    }

    fn append_line(&mut self, slot: usize, line: &str) {
        let text = &mut self.entries[slot].1;
        text.push('\n');
        text.push_str(line);
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, text)| text.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(name, text)| (name.as_str(), text.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Sections {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, text) in &self.entries {
            map.serialize_entry(label, text)?;
        }
        map.end()
    }
}

/// Structured fields pulled out of one résumé.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personal_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(flatten)]
    pub sections: Sections,
}

impl ExtractedRecord {
    /// Looks a value up by the key it serializes under.
    pub fn field(&self, key: &str) -> Option<&str> {
        match key {
            "name" => self.name.as_deref(),
            "personal_info" => self.personal_info.as_deref(),
            "email" => self.email.as_deref(),
            "phone" => self.phone.as_deref(),
            label => self.sections.get(label),
        }
    }

    fn trim_all(&mut self) {
        for field in [
            &mut self.name,
            &mut self.personal_info,
            &mut self.email,
            &mut self.phone,
        ] {
            *field = field
                .take()
                .map(|value| trim_blank(&value).to_string())
                .filter(|value| !value.is_empty());
        }
        for (_, text) in self.sections.entries.iter_mut() {
            *text = trim_blank(text).to_string();
        }
    }
}

/// Error-shaped result handed to collaborators in place of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionFailure {
    pub error: String,
    pub details: String,
}

impl From<&ExtractError> for ExtractionFailure {
    fn from(err: &ExtractError) -> Self {
        Self {
            error: EXTRACTION_FAILURE_MESSAGE.to_string(),
            details: err.to_string(),
        }
    }
}

/// Either a full record or a failure, never a mix of both.
/// Serializes untagged: consumers tell them apart by the `error` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ExtractionOutcome {
    Record(ExtractedRecord),
    Failure(ExtractionFailure),
}

impl ExtractionOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, ExtractionOutcome::Failure(_))
    }

    pub fn record(&self) -> Option<&ExtractedRecord> {
        match self {
            ExtractionOutcome::Record(record) => Some(record),
            ExtractionOutcome::Failure(_) => None,
        }
    }
}

// --- Main Extractor Structure ---
#[derive(Debug, Clone)]
pub struct SectionExtractor {
    catalog: LabelCatalog,
    email_re: Regex,
    phone_re: Regex,
}

impl Default for SectionExtractor {
    fn default() -> Self {
        Self::with_catalog(LabelCatalog::default())
    }
}

impl SectionExtractor {
    pub fn with_catalog(catalog: LabelCatalog) -> Self {
        Self {
            catalog,
            email_re: EMAIL_RE.clone(),
            phone_re: PHONE_RE.clone(),
        }
    }

    /// Builds an extractor with custom contact patterns.
    pub fn with_patterns(
        catalog: LabelCatalog,
        email_pattern: &str,
        phone_pattern: &str,
    ) -> Result<Self, ExtractError> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| ExtractError::RegexError(format!("'{}': {}", pattern, e)))
        };
        Ok(Self {
            catalog,
            email_re: compile(email_pattern)?,
            phone_re: compile(phone_pattern)?,
        })
    }

    pub fn catalog(&self) -> &LabelCatalog {
        &self.catalog
    }

    /// Partitions résumé text into personal info, contact details and labelled sections.
    pub fn extract(&self, text: &str) -> ExtractedRecord {
        let lines: Vec<&str> = text
            .split('\n')
            .map(trim_blank)
            .filter(|line| !line.is_empty())
            .collect();

        let first_label = lines
            .iter()
            .position(|line| self.catalog.match_line(line).is_some());
        match first_label {
            Some(idx) => tracing::debug!("First section label found on line {} of {}", idx, lines.len()),
            None => tracing::debug!("No section label found in {} lines", lines.len()),
        }

        let mut record = ExtractedRecord::default();
        // Without any label nothing is attributed: no name, no personal info, no sections.
        let (personal, labelled) = lines.split_at(first_label.unwrap_or(0));

        if let Some((name, rest)) = personal.split_first() {
            record.name = Some(name.to_string());
            if !rest.is_empty() {
                record.personal_info = Some(rest.join("\n"));
            }
        }

        let mut current: Option<usize> = None;
        for line in labelled {
            match self.catalog.match_line(line) {
                Some((label, rest)) => {
                    let content = rest
                        .trim_start_matches(|c: char| c == ':' || c == '-' || is_blank(c));
                    if record.sections.get(label).is_some() {
                        tracing::debug!("Label '{}' seen again, restarting its section", label);
                    }
                    current = Some(record.sections.start(label, content));
                }
                None => match current {
                    Some(slot) => record.sections.append_line(slot, line),
                    None => tracing::trace!("Dropping line outside any section: '{}'", line),
                },
            }
        }

        record.email = self.email_re.find(text).map(|m| m.as_str().to_string());
        record.phone = self.phone_re.find(text).map(|m| m.as_str().to_string());

        record.trim_all();
        if record.sections.is_empty() {
            tracing::warn!("No labelled sections found; only contact details were extracted");
        }
        tracing::info!(
            "Extracted record: name={}, email={}, phone={}, {} section(s)",
            record.name.is_some(),
            record.email.is_some(),
            record.phone.is_some(),
            record.sections.len()
        );
        record
    }

    /// Extracts from raw bytes, rejecting anything that is not UTF-8.
    pub fn try_extract(&self, input: &[u8]) -> Result<ExtractedRecord, ExtractError> {
        let text = std::str::from_utf8(input)
            .map_err(|e| ExtractError::InvalidInput(e.to_string()))?;
        Ok(self.extract(text))
    }

    /// Boundary form of `try_extract`: failures come back as an error-shaped value.
    pub fn extract_outcome(&self, input: &[u8]) -> ExtractionOutcome {
        match self.try_extract(input) {
            Ok(record) => ExtractionOutcome::Record(record),
            Err(e) => {
                tracing::error!("{}: {}", EXTRACTION_FAILURE_MESSAGE, e);
                ExtractionOutcome::Failure(ExtractionFailure::from(&e))
            }
        }
    }
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> ExtractedRecord {
        SectionExtractor::default().extract(text)
    }

    #[test]
    fn test_basic_cv_layout() {
        let record = extract("Jane Doe\njane@example.com\nSummary: Loves systems.\nProjects\nBuilt a cache.");

        assert_eq!(record.name.as_deref(), Some("Jane Doe"));
        assert_eq!(record.personal_info.as_deref(), Some("jane@example.com"));
        assert_eq!(record.email.as_deref(), Some("jane@example.com"));
        assert_eq!(record.phone, None);
        assert_eq!(record.sections.get("summary"), Some("Loves systems."));
        assert_eq!(record.sections.get("projects"), Some("Built a cache."));
        assert_eq!(record.sections.len(), 2);
    }

    #[test]
    fn test_repeated_label_restarts_section() {
        let record = extract("Experience\nJob A\nExperience\nJob B");
        assert_eq!(record.sections.get("experience"), Some("Job B"));
        assert_eq!(record.sections.len(), 1);
        // Label on the very first line: nothing precedes it.
        assert_eq!(record.name, None);
        assert_eq!(record.personal_info, None);
    }

    #[test]
    fn test_text_without_labels_yields_no_fields() {
        let record = extract("Just some random text\nwith no sections");
        assert_eq!(record.name, None);
        assert_eq!(record.personal_info, None);
        assert!(record.sections.is_empty());

        // Contact details are still searched over the whole text.
        let record = extract("Jane Doe\njane@example.com\n+1 555 0100");
        assert_eq!(record.name, None);
        assert_eq!(record.personal_info, None);
        assert_eq!(record.email.as_deref(), Some("jane@example.com"));
        assert_eq!(record.phone.as_deref(), Some("+1 555 0100"));
        assert!(record.sections.is_empty());
    }

    #[test]
    fn test_empty_and_blank_input() {
        for text in ["", "\n\n", "   \n\t\n  "] {
            let record = extract(text);
            assert_eq!(record, ExtractedRecord::default(), "input {:?}", text);
        }
    }

    #[test]
    fn test_single_line_before_label_has_no_personal_info() {
        let record = extract("John Smith\nEducation - BSc Computer Science");
        assert_eq!(record.name.as_deref(), Some("John Smith"));
        assert_eq!(record.personal_info, None);
        assert_eq!(record.sections.get("education"), Some("BSc Computer Science"));
    }

    #[test]
    fn test_label_prefix_and_punctuation_are_stripped() {
        let record = extract("Name\nEDUCATION :- BSc\n  MSc  \nReferences:\t Available on request");
        assert_eq!(record.sections.get("education"), Some("BSc\nMSc"));
        assert_eq!(record.sections.get("references"), Some("Available on request"));
    }

    #[test]
    fn test_label_only_line_starts_empty_section() {
        let record = extract("Name\nAchievements\nParticipation");
        assert_eq!(record.sections.get("achievements"), Some(""));
        assert_eq!(record.sections.get("participation"), Some(""));
    }

    #[test]
    fn test_prefix_matching_ignores_word_boundaries() {
        let record = extract("Name\nTechnical skillset: Rust, Go");
        // "technical skills" is a prefix of "technical skillset"
        assert_eq!(record.sections.get("technical skills"), Some("et: Rust, Go"));

        let record = extract("Name\nExperiments with robotics");
        assert!(record.sections.is_empty());
        assert_eq!(record.name, None);
    }

    #[test]
    fn test_misspelled_label_is_its_own_section() {
        let record = extract("Name\nTechinal Skills: Rust\nTechnical Skills: Go");
        assert_eq!(record.sections.get("techinal skills"), Some("Rust"));
        assert_eq!(record.sections.get("technical skills"), Some("Go"));
    }

    #[test]
    fn test_first_catalog_entry_wins_over_longer_label() {
        let catalog = LabelCatalog::new(["skills", "skills summary"]);
        let record = SectionExtractor::with_catalog(catalog).extract("Name\nSkills Summary: lots");
        assert_eq!(record.sections.get("skills"), Some("Summary: lots"));
        assert_eq!(record.sections.get("skills summary"), None);
    }

    #[test]
    fn test_lines_follow_most_recent_label() {
        let text = "Jane\nSummary\nline one\nline two\nEducation\nline three\nSummary again\nline four";
        let record = extract(text);
        // "Summary again" restarts summary with "again"
        assert_eq!(record.sections.get("summary"), Some("again\nline four"));
        assert_eq!(record.sections.get("education"), Some("line three"));
        let order: Vec<&str> = record.sections.iter().map(|(label, _)| label).collect();
        assert_eq!(order, vec!["summary", "education"]);
    }

    #[test]
    fn test_every_line_is_kept_somewhere() {
        let text = "Ada Lovelace\nLondon\n+44 20 1234 5678\n\nSummary\nAnalyst\nProjects: Engine\nNotes\nEducation\nSelf-taught";
        let record = extract(text);
        let mut rebuilt = vec![record.name.clone().unwrap_or_default()];
        rebuilt.extend(record.personal_info.iter().cloned());
        rebuilt.extend(record.sections.iter().map(|(_, text)| text.to_string()));
        let rebuilt = rebuilt.join("\n");
        for line in ["Ada Lovelace", "London", "+44 20 1234 5678", "Analyst", "Engine", "Notes", "Self-taught"] {
            assert!(rebuilt.contains(line), "line {:?} lost in {:?}", line, rebuilt);
        }
    }

    #[test]
    fn test_contact_patterns_search_whole_text() {
        let text = "Sam\nReferences\nboss@corp.com\nSummary\nsam@mail.org\nPhone: +1 555-123-4567";
        let record = extract(text);
        // First email in text order wins, even inside references.
        assert_eq!(record.email.as_deref(), Some("boss@corp.com"));
        assert_eq!(record.phone.as_deref(), Some("+1 555-123-4567"));
    }

    #[test]
    fn test_phone_pattern_is_loose() {
        let record = extract("Sam\nClass of 2019\nSummary\nCall +44 7700 900123");
        assert_eq!(record.phone.as_deref(), Some("2019"));
    }

    #[test]
    fn test_crlf_lines_are_trimmed() {
        let record = extract("Jane Doe\r\nSummary: Hi\r\nmore\r\n");
        assert_eq!(record.name.as_deref(), Some("Jane Doe"));
        assert_eq!(record.sections.get("summary"), Some("Hi\nmore"));
    }

    #[test]
    fn test_extract_is_idempotent() {
        let text = "Jane\nj@x.io\nSummary: a\nb\nExperience\nc";
        let extractor = SectionExtractor::default();
        assert_eq!(extractor.extract(text), extractor.extract(text));
    }

    #[test]
    fn test_extra_labels_come_last_and_skip_reserved() {
        let catalog = LabelCatalog::default().with_extra(["Qualifications", "email", "  ", "summary"]);
        assert_eq!(catalog.labels().count(), DEFAULT_LABELS.len() + 1);
        assert_eq!(catalog.labels().last(), Some("qualifications"));

        let record = SectionExtractor::with_catalog(catalog).extract("Jo\nQualifications: CPA");
        assert_eq!(record.field("qualifications"), Some("CPA"));
    }

    #[test]
    fn test_non_ascii_lines() {
        let record = extract("Zoë Ångström\nÉducation\nSummary – résumé");
        assert_eq!(record.name.as_deref(), Some("Zoë Ångström"));
        assert_eq!(record.personal_info.as_deref(), Some("Éducation"));
        assert_eq!(record.sections.get("summary"), Some("– résumé"));
    }

    #[test]
    fn test_email_next_to_non_ascii_letter() {
        let record = extract("Zoë\nContact: Zoëjane@example.com\nSummary: x");
        assert_eq!(record.email.as_deref(), Some("jane@example.com"));
    }

    #[test]
    fn test_byte_order_mark_counts_as_whitespace() {
        let record = extract("\u{FEFF}Summary: x\nmore");
        assert_eq!(record.name, None);
        assert_eq!(record.sections.get("summary"), Some("x\nmore"));

        let record = extract("Jane\u{FEFF}\nEducation:\u{FEFF} BSc\u{FEFF}");
        assert_eq!(record.name.as_deref(), Some("Jane"));
        assert_eq!(record.sections.get("education"), Some("BSc"));
    }

    #[test]
    fn test_invalid_utf8_becomes_failure() {
        let outcome = SectionExtractor::default().extract_outcome(&[b'J', 0xff, 0xfe, b'\n']);
        assert!(outcome.is_error());
        assert!(outcome.record().is_none());

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["error"], EXTRACTION_FAILURE_MESSAGE);
        assert!(json["details"].as_str().unwrap().contains("UTF-8"));
        assert_eq!(json.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_bad_custom_pattern_is_rejected() {
        let result = SectionExtractor::with_patterns(LabelCatalog::default(), "([", PHONE_PATTERN);
        assert!(matches!(result, Err(ExtractError::RegexError(_))));
    }

    #[test]
    fn test_custom_phone_pattern_replaces_default() {
        let extractor =
            SectionExtractor::with_patterns(LabelCatalog::default(), EMAIL_PATTERN, r"\+[0-9][0-9 ]+[0-9]").unwrap();
        let record = extractor.extract("Sam\nClass of 2019\nSummary\nCall +44 7700 900123");
        assert_eq!(record.phone.as_deref(), Some("+44 7700 900123"));
        assert_eq!(extractor.catalog(), &LabelCatalog::default());
    }

    #[test]
    fn test_record_serializes_flat() {
        let outcome = SectionExtractor::default()
            .extract_outcome(b"Jane Doe\nSummary: Loves systems.\nTechnical Skills: Rust");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["name"], "Jane Doe");
        assert_eq!(json["summary"], "Loves systems.");
        assert_eq!(json["technical skills"], "Rust");
        assert!(json.get("personal_info").is_none());
        assert!(json.get("email").is_none());
        assert!(json.get("error").is_none());
    }
}
