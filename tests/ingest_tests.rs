use estimate_tool::ingest::{IngestRejection, ingest, parse_descriptors};
use estimate_tool::{CostCategory, EstimateWorkspace, RawItemDescriptor};
use std::collections::HashSet;

#[test]
fn generated_json_batch_is_merged_at_root() {
    let json = r#"[
        {"description": "Foundation", "category": "Material", "subItems": [
            {"description": "Excavation", "quantity": 120, "unit": "cy", "unitPrice": 18.5, "category": "Equipment"},
            {"description": "Rebar", "quantity": 4, "unit": "ton", "unitPrice": 1450, "category": "Material", "notes": "Grade 60"}
        ]},
        {"description": "Cleanup", "category": "Labor", "unitPrice": 800},
        {"quantity": 3}
    ]"#;
    let mut ws = EstimateWorkspace::default();
    ws.add_root().unwrap();
    let summary = ws.ingest(parse_descriptors(json).unwrap()).unwrap();

    assert_eq!(summary.added.len(), 2);
    assert_eq!(summary.rejected.len(), 1);
    assert!(summary.rejected[0].contains("item 3"));

    let items = ws.items();
    assert_eq!(items.len(), 3);
    assert_eq!(items[1].description, "Foundation");
    assert_eq!(items[1].wbs_code, "2");
    assert_eq!(items[1].total, 120.0 * 18.5 + 4.0 * 1450.0);
    let rebar = &items[1].children().unwrap()[1];
    assert_eq!(rebar.wbs_code, "2.2");
    assert_eq!(rebar.notes.as_deref(), Some("Grade 60"));
    assert_eq!(items[2].quantity, 1.0);
    assert_eq!(items[2].unit, "ls");
    assert_eq!(items[2].total, 800.0);
    assert_eq!(ws.grand_total(), 2220.0 + 5800.0 + 800.0);
}

#[test]
fn ingested_ids_are_fresh_and_unique() {
    let batch = vec![
        RawItemDescriptor::new("A", "Labor").with_children(vec![
            RawItemDescriptor::new("A1", "Labor"),
            RawItemDescriptor::new("A2", "Labor"),
        ]),
        RawItemDescriptor::new("B", "Labor"),
    ];
    let first = ingest(batch.clone());
    let second = ingest(batch);
    let mut seen = HashSet::new();
    for outcome in [&first, &second] {
        for node in &outcome.nodes {
            assert!(seen.insert(node.id.clone()));
            for child in node.children().unwrap_or(&[]) {
                assert!(seen.insert(child.id.clone()));
            }
        }
    }
    assert_eq!(seen.len(), 8);
}

#[test]
fn nested_rejections_keep_siblings() {
    let batch = vec![RawItemDescriptor::new("Shell", "Subcontractor").with_children(vec![
        RawItemDescriptor::default(),
        RawItemDescriptor::new("Roofing", "subcontractor").with_price(1.0, "ls", 4000.0),
    ])];
    let outcome = ingest(batch);
    let shell = &outcome.nodes[0];
    assert_eq!(shell.children().unwrap().len(), 1);
    assert_eq!(shell.children().unwrap()[0].category, CostCategory::Subcontractor);
    assert_eq!(shell.total, 4000.0);
    assert_eq!(
        outcome.rejected,
        vec![IngestRejection::MissingDescriptionAndCategory {
            position: "1.1".into()
        }]
    );
}

#[test]
fn empty_children_list_makes_a_terminal() {
    let outcome = ingest(vec![
        RawItemDescriptor::new("Allowance", "Indirect")
            .with_price(1.0, "ls", 250.0)
            .with_children(Vec::new()),
    ]);
    assert!(outcome.nodes[0].is_terminal());
    assert_eq!(outcome.nodes[0].total, 250.0);
}
