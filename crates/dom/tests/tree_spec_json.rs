use dom::{Document, TreeSpec};

#[test]
fn tree_spec_reads_scenario_json() {
    let json = r#"{
        "tag": "div",
        "attrs": { "data-drop-target-key": "[&quot;x&quot;]" },
        "children": [
            { "tag": "button", "attrs": { "role": "link" }, "children": ["Q3 Plan.pptx"] }
        ]
    }"#;
    let spec: TreeSpec = serde_json::from_str(json).unwrap();

    let mut doc = Document::with_title("Docs");
    let body = doc.body().unwrap();
    let (div, records) = doc.append_tree(body, &spec).unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(doc.attribute(div, "data-drop-target-key"), Some("[&quot;x&quot;]"));
    let button = doc.children(div)[0];
    assert_eq!(doc.attribute(button, "role"), Some("link"));
    assert_eq!(doc.text_content(button), "Q3 Plan.pptx");
}

#[test]
fn bare_strings_are_text_nodes() {
    let spec: TreeSpec = serde_json::from_str(r#""hello""#).unwrap();
    assert_eq!(spec, TreeSpec::text("hello"));
}
