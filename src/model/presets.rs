//! Ready-made analysis components, analyzer sets and multi-field sets.
//!
//! Analyzer names follow `<language>-<mode>-<kind>`, e.g.
//! `general-index-autocomplete` or `en_us-search-standard`.

use super::analysis::Analyzer;
use super::field::{Field, FieldType, IndexMode};

pub const EDGE_NGRAM_MIN_GRAM: u32 = 1;
pub const EDGE_NGRAM_MAX_GRAM: u32 = 20;

pub mod tokenizers {
    use crate::model::analysis::{Component, Tokenizer};

    pub fn standard() -> Tokenizer {
        Component::builtin("standard")
    }

    pub fn icu() -> Tokenizer {
        Component::builtin("icu_tokenizer")
    }

    pub fn whitespace() -> Tokenizer {
        Component::builtin("whitespace")
    }

    pub fn keyword() -> Tokenizer {
        Component::builtin("keyword")
    }

    pub fn lowercase() -> Tokenizer {
        Component::builtin("lowercase")
    }

    pub fn uax_url_email() -> Tokenizer {
        Component::builtin("uax_url_email")
    }

    pub fn edge_ngram(name: &str, min_gram: u32, max_gram: u32) -> Tokenizer {
        Component::new(name, "edge_ngram")
            .setting("min_gram", min_gram)
            .setting("max_gram", max_gram)
    }
}

pub mod token_filters {
    use crate::model::analysis::{Component, TokenFilter};

    pub fn lowercase() -> TokenFilter {
        Component::builtin("lowercase")
    }

    pub fn asciifolding() -> TokenFilter {
        Component::builtin("asciifolding")
    }

    pub fn icu_folding() -> TokenFilter {
        Component::builtin("icu_folding")
    }

    pub fn standard() -> TokenFilter {
        Component::builtin("standard")
    }

    pub fn stop() -> TokenFilter {
        Component::builtin("stop")
    }

    /// `trigrams`: nGram filter emitting 3-character grams.
    pub fn trigrams() -> TokenFilter {
        Component::new("trigrams", "nGram")
            .setting("min_gram", 3)
            .setting("max_gram", 3)
    }

    pub fn edge_ngram(name: &str, min_gram: u32, max_gram: u32) -> TokenFilter {
        Component::new(name, "edgeNGram")
            .setting("min_gram", min_gram)
            .setting("max_gram", max_gram)
    }
}

pub mod char_filters {
    use crate::model::analysis::{CharFilter, Component};

    pub fn html_strip() -> CharFilter {
        Component::builtin("html_strip")
    }

    /// A `mapping` char filter with inline `key => value` rules.
    pub fn mapping(name: &str, rules: &[&str]) -> CharFilter {
        Component::new(name, "mapping").setting("mappings", rules.to_vec())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzerMode {
    Index,
    Search,
}

impl AnalyzerMode {
    fn as_str(self) -> &'static str {
        match self {
            AnalyzerMode::Index => "index",
            AnalyzerMode::Search => "search",
        }
    }
}

pub struct AnalyzerSet;

impl AnalyzerSet {
    pub const GENERAL_LANGUAGE: &'static str = "general";
    pub const STANDARD: &'static str = "standard";
    pub const AUTOCOMPLETE: &'static str = "autocomplete";

    pub fn analyzer_name(language: &str, mode: AnalyzerMode, kind: &str) -> String {
        format!(
            "{}-{}-{}",
            language.to_lowercase(),
            mode.as_str(),
            kind.to_lowercase()
        )
    }

    pub fn autocomplete_name(mode: AnalyzerMode) -> String {
        Self::analyzer_name(Self::GENERAL_LANGUAGE, mode, Self::AUTOCOMPLETE)
    }

    pub fn standard_name(language: &str, mode: AnalyzerMode) -> String {
        Self::analyzer_name(language, mode, Self::STANDARD)
    }

    /// Edge-ngram indexing paired with plain ICU search analysis.
    pub fn autocomplete() -> Vec<Analyzer> {
        let index_name = Self::autocomplete_name(AnalyzerMode::Index);
        vec![
            Analyzer::renamed(Self::autocomplete_name(AnalyzerMode::Search), &Analyzer::icu()),
            Analyzer::new(index_name.clone())
                .analyzer_type(Analyzer::CUSTOM)
                .tokenizer(tokenizers::icu())
                .filters(vec![
                    token_filters::lowercase(),
                    token_filters::edge_ngram(&index_name, EDGE_NGRAM_MIN_GRAM, EDGE_NGRAM_MAX_GRAM),
                ]),
        ]
    }

    /// Index and search analyzers for one language. Every language is
    /// currently analyzed with the ICU pipeline.
    pub fn language(language: &str) -> Vec<Analyzer> {
        let icu = Analyzer::icu();
        vec![
            Analyzer::renamed(Self::standard_name(language, AnalyzerMode::Index), &icu),
            Analyzer::renamed(Self::standard_name(language, AnalyzerMode::Search), &icu),
        ]
    }

    pub fn languages(languages: &[&str]) -> Vec<Analyzer> {
        languages
            .iter()
            .filter(|l| !l.is_empty())
            .flat_map(|l| Self::language(l))
            .collect()
    }
}

pub struct FieldSet;

impl FieldSet {
    pub const AUTOCOMPLETE_FIELD: &'static str = "autocomplete";
    pub const KEYWORD_FIELD: &'static str = "keyword";
    pub const LANGUAGE_PREFIX: &'static str = "lang";

    /// Unanalyzed copy of a text field.
    pub fn keyword() -> Field {
        Field::new(Self::KEYWORD_FIELD, FieldType::Keyword).multifield(true)
    }

    /// Copy analyzed with the autocomplete analyzers from
    /// [`AnalyzerSet::autocomplete`].
    pub fn autocomplete() -> Field {
        Field::new(Self::AUTOCOMPLETE_FIELD, FieldType::Text)
            .analyzer(AnalyzerSet::autocomplete_name(AnalyzerMode::Index))
            .search_analyzer(AnalyzerSet::autocomplete_name(AnalyzerMode::Search))
            .index_mode(IndexMode::Analyzed)
            .multifield(true)
    }

    /// One `lang_<code>` copy per language, analyzed with
    /// [`AnalyzerSet::language`].
    pub fn languages(languages: &[&str]) -> Vec<Field> {
        languages
            .iter()
            .filter(|l| !l.is_empty())
            .map(|lang| {
                let lang = lang.to_lowercase();
                Field::new(format!("{}_{}", Self::LANGUAGE_PREFIX, lang), FieldType::Text)
                    .analyzer(AnalyzerSet::standard_name(&lang, AnalyzerMode::Index))
                    .search_analyzer(AnalyzerSet::standard_name(&lang, AnalyzerMode::Search))
                    .index_mode(IndexMode::Analyzed)
                    .multifield(true)
            })
            .collect()
    }

    /// Full paths of the language copies of `name`: `<name>_lang_<code>`.
    pub fn language_field_names(name: &str, languages: &[&str]) -> Vec<String> {
        languages
            .iter()
            .map(|lang| format!("{}_{}_{}", name, Self::LANGUAGE_PREFIX, lang.to_lowercase()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::EngineVersion;
    use serde_json::json;

    #[test]
    fn test_autocomplete_analyzers() {
        let set = AnalyzerSet::autocomplete();
        assert_eq!(set[0].name, "general-search-autocomplete");
        assert_eq!(set[1].name, "general-index-autocomplete");
        assert_eq!(set[1].analyzer_type, "custom");
        assert_eq!(set[1].filters[1].settings["max_gram"], json!(20));
        assert!(set.iter().all(|a| a.requires_separate_registry()));
    }

    #[test]
    fn test_language_analyzers() {
        let names: Vec<_> = AnalyzerSet::languages(&["EN_US", "", "vi_vn"])
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "en_us-index-standard",
                "en_us-search-standard",
                "vi_vn-index-standard",
                "vi_vn-search-standard"
            ]
        );
    }

    #[test]
    fn test_field_sets_as_multifields() {
        let title = Field::new("title", FieldType::Text)
            .sub_field(FieldSet::keyword())
            .sub_field(FieldSet::autocomplete())
            .sub_fields(FieldSet::languages(&["en_us"]));
        let json = title.definition(EngineVersion::V5);
        let fields = json["fields"].as_object().unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(
            fields["autocomplete"]["analyzer"],
            "general-index-autocomplete"
        );
        assert_eq!(
            fields["lang_en_us"]["search_analyzer"],
            "en_us-search-standard"
        );
    }

    #[test]
    fn test_language_field_names() {
        assert_eq!(
            FieldSet::language_field_names("title", &["en_US", "vi_vn"]),
            vec!["title_lang_en_us", "title_lang_vi_vn"]
        );
    }
}
