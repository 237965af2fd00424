use esgen::model::analysis::{Analyzer, Component};
use esgen::model::presets::{char_filters, token_filters, tokenizers, AnalyzerSet, FieldSet};
use esgen::model::{DocumentType, Field, FieldType, IndexDescriptor, IndexMode, Mapping};
use esgen::settings::compile;
use esgen::EngineVersion;
use serde_json::{json, Value};

fn mapping() -> Mapping {
    Mapping::new(vec![DocumentType::new("post")
        .field(
            Field::new("title", FieldType::Text)
                .index_mode(IndexMode::Analyzed)
                .analyzer(AnalyzerSet::autocomplete_name(esgen::model::AnalyzerMode::Index))
                .sub_fields(FieldSet::languages(&["en", "fr"])),
        )
        .field(FieldSet::keyword())])
}

fn analysis(descriptor: &IndexDescriptor) -> Value {
    compile(descriptor, EngineVersion::V5).unwrap().body["settings"]
        .get("analysis")
        .cloned()
        .unwrap_or(Value::Null)
}

fn shared_components() -> Vec<Analyzer> {
    let grams = tokenizers::edge_ngram("grams", 2, 8);
    let html = char_filters::html_strip();
    let mapping_filter = char_filters::mapping("quotes", &["\u{2019} => '"]);
    (0..4)
        .map(|i| {
            Analyzer::new(format!("custom-{}", i))
                .analyzer_type(Analyzer::CUSTOM)
                .tokenizer(grams.clone())
                .filters(vec![
                    token_filters::trigrams(),
                    token_filters::edge_ngram("prefixes", 1, 5),
                    token_filters::lowercase(),
                ])
                .char_filters(vec![html.clone(), mapping_filter.clone()])
        })
        .collect()
}

#[test]
fn test_builtin_analyzers_never_in_analysis_block() {
    let builtins = [
        Analyzer::standard(),
        Analyzer::simple(),
        Analyzer::builtin("whitespace"),
        Analyzer::builtin("english"),
    ];
    let mut analyzers = builtins.to_vec();
    analyzers.extend(shared_components());
    analyzers.extend(AnalyzerSet::autocomplete());

    let descriptor = IndexDescriptor::new("v1").mapping(mapping()).analyzers(analyzers);
    let analysis_block = analysis(&descriptor);
    let registered = analysis_block["analyzer"].as_object().unwrap();

    for builtin in &builtins {
        assert!(
            registered.get(&builtin.name).is_none(),
            "{} was registered",
            builtin.name
        );
    }
    assert!(registered.contains_key("custom-0"));

    let only_builtins = IndexDescriptor::new("v1")
        .mapping(mapping())
        .analyzers(builtins.to_vec());
    assert_eq!(analysis(&only_builtins), Value::Null);
}

#[test]
fn test_shared_components_registered_once_by_name() {
    let descriptor = IndexDescriptor::new("v1")
        .mapping(mapping())
        .analyzers(shared_components());
    let analysis = analysis(&descriptor);

    assert_eq!(analysis["analyzer"].as_object().unwrap().len(), 4);
    assert_eq!(
        analysis["tokenizer"],
        json!({"grams": {"type": "edge_ngram", "min_gram": 2, "max_gram": 8}})
    );

    let filters = analysis["filter"].as_object().unwrap();
    let mut names: Vec<&str> = filters.keys().map(String::as_str).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["prefixes", "trigrams"]);

    let char_filters = analysis["char_filter"].as_object().unwrap();
    assert_eq!(char_filters.len(), 1);
    assert!(char_filters.contains_key("quotes"));

    for analyzer in analysis["analyzer"].as_object().unwrap().values() {
        assert_eq!(analyzer["tokenizer"], "grams");
        assert_eq!(
            analyzer["filter"],
            json!(["trigrams", "prefixes", "lowercase"])
        );
        assert_eq!(analyzer["char_filter"], json!(["html_strip", "quotes"]));
    }
}

#[test]
fn test_component_without_type_not_registered() {
    let analyzers = vec![Analyzer::new("a")
        .analyzer_type(Analyzer::CUSTOM)
        .tokenizer(tokenizers::standard())
        .filters(vec![Component::new("untyped", "")])];
    let descriptor = IndexDescriptor::new("v1").mapping(mapping()).analyzers(analyzers);
    let analysis = analysis(&descriptor);
    assert!(analysis.get("filter").is_none());
    assert!(analysis.get("tokenizer").is_none());
}

#[test]
fn test_protocol_generations_disagree_on_values() {
    let descriptor = IndexDescriptor::new("v1").mapping(mapping());

    let current = compile(&descriptor, EngineVersion::V5).unwrap().body;
    let title = &current["mappings"]["post"]["properties"]["title"];
    assert_eq!(title["type"], "text");
    assert_eq!(title["index"], true);
    assert_eq!(
        current["mappings"]["post"]["properties"]["keyword"]["type"],
        "keyword"
    );

    let legacy = compile(&descriptor, EngineVersion::detect("2.4.6")).unwrap().body;
    let title = &legacy["mappings"]["post"]["properties"]["title"];
    assert_eq!(title["type"], "string");
    assert_eq!(title["index"], "analyzed");
    assert_eq!(
        legacy["mappings"]["post"]["properties"]["keyword"]["index"],
        "not_analyzed"
    );
}
