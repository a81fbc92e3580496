use estimate_tool::persistence::{
    EstimateStore, JsonFileStore, PersistenceError, load_estimate_from_json,
    save_estimate_to_json, save_line_items_to_csv, write_line_items_csv,
};
use estimate_tool::{
    ContractType, CostCategory, CostNode, EstimateMetadata, EstimateSettings, EstimateStatus,
    EstimateWorkspace, NodeId, ResourceLine, RiskLevel, ViewMode,
};
use tempfile::{NamedTempFile, tempdir};

fn build_sample_workspace() -> EstimateWorkspace {
    let mut metadata = EstimateMetadata::new("Export Project");
    metadata.client = "Acme Logistics".into();
    metadata.location = "Reno, NV".into();
    metadata.status = EstimateStatus::Active;

    let items = vec![
        CostNode::group("General Conditions", CostCategory::Indirect)
            .with_id("101")
            .with_children(vec![
                CostNode::terminal("Supervision", 1.0, "ls", 5000.0, CostCategory::Labor)
                    .with_id("102")
                    .with_risk_level(RiskLevel::Medium),
            ]),
        CostNode::group("Concrete", CostCategory::Indirect)
            .with_id("301")
            .with_children(vec![
                CostNode::terminal("Slab on grade", 40.0, "cy", 0.0, CostCategory::Material)
                    .with_id("302")
                    .with_contract_type(ContractType::UnitPrice)
                    .with_schedule(2.0, 10.0)
                    .with_resources(vec![
                        ResourceLine::new(CostCategory::Labor, "Finisher", 20.0, "hr", 60.0)
                            .with_id("r1"),
                        ResourceLine::new(CostCategory::Material, "Ready mix", 40.0, "cy", 150.0)
                            .with_id("r2"),
                    ]),
            ]),
    ];
    EstimateWorkspace::with_items(metadata, items, EstimateSettings::default()).unwrap()
}

#[test]
fn json_round_trip_preserves_estimate() {
    let original = build_sample_workspace();
    let tmp = NamedTempFile::new().expect("create temp file");
    save_estimate_to_json(&original, tmp.path()).expect("save json");

    let mut loaded = EstimateWorkspace::default();
    load_estimate_from_json(&mut loaded, tmp.path()).expect("load json");

    assert_eq!(loaded.metadata(), original.metadata());
    assert_eq!(loaded.items(), original.items());
    assert_eq!(loaded.grand_total(), 5000.0 + 1200.0 + 6000.0);
}

#[test]
fn loading_recomputes_derived_fields() {
    let original = build_sample_workspace();
    let tmp = NamedTempFile::new().expect("create temp file");
    save_estimate_to_json(&original, tmp.path()).unwrap();

    let raw = std::fs::read_to_string(tmp.path()).unwrap();
    let mut json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    json["items"][0]["total"] = serde_json::json!(1.0);
    json["items"][0]["wbs_code"] = serde_json::json!("9");
    std::fs::write(tmp.path(), serde_json::to_string(&json).unwrap()).unwrap();

    let mut loaded = EstimateWorkspace::default();
    load_estimate_from_json(&mut loaded, tmp.path()).unwrap();
    assert_eq!(loaded.items()[0].total, 5000.0);
    assert_eq!(loaded.items()[0].wbs_code, "1");
}

#[test]
fn loading_rejects_negative_quantities() {
    let original = build_sample_workspace();
    let tmp = NamedTempFile::new().unwrap();
    save_estimate_to_json(&original, tmp.path()).unwrap();

    let raw = std::fs::read_to_string(tmp.path()).unwrap();
    let mut json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    json["items"][0]["children"][0]["quantity"] = serde_json::json!(-3.0);
    std::fs::write(tmp.path(), serde_json::to_string(&json).unwrap()).unwrap();

    let mut loaded = build_sample_workspace();
    let err = load_estimate_from_json(&mut loaded, tmp.path()).unwrap_err();
    assert!(matches!(err, PersistenceError::Validation(_)), "{err}");
    // the workspace keeps what it had
    assert_eq!(loaded.items(), build_sample_workspace().items());
}

#[test]
fn loading_rejects_unknown_snapshot_version() {
    let tmp = NamedTempFile::new().unwrap();
    std::fs::write(
        tmp.path(),
        r#"{"version": 99, "metadata": {"project_name": "X", "last_modified": "2025-01-01T00:00:00Z"}, "items": []}"#,
    )
    .unwrap();
    let mut ws = EstimateWorkspace::default();
    assert!(matches!(
        load_estimate_from_json(&mut ws, tmp.path()),
        Err(PersistenceError::InvalidData(_))
    ));
}

#[test]
fn load_keeps_view_mode_and_clears_selection() {
    let original = build_sample_workspace();
    let tmp = NamedTempFile::new().unwrap();
    save_estimate_to_json(&original, tmp.path()).unwrap();

    let mut ws = build_sample_workspace();
    ws.set_mode(ViewMode::Risk);
    ws.open_detail(&NodeId::from("302")).unwrap();
    load_estimate_from_json(&mut ws, tmp.path()).unwrap();
    assert_eq!(ws.mode(), ViewMode::Risk);
    assert!(ws.selection().is_none());
}

#[test]
fn file_store_reports_missing_snapshot() {
    let dir = tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("estimate.json"));
    let mut ws = EstimateWorkspace::default();
    assert!(!store.load_estimate(&mut ws).unwrap());

    store.save_estimate(&build_sample_workspace()).unwrap();
    assert!(store.load_estimate(&mut ws).unwrap());
    assert_eq!(ws.metadata().project_name, "Export Project");
}

#[test]
fn csv_export_lists_terminal_items() {
    let ws = build_sample_workspace();
    let mut buffer = Vec::new();
    write_line_items_csv(ws.items(), &mut buffer).unwrap();

    let mut reader = csv::Reader::from_reader(buffer.as_slice());
    let headers = reader.headers().unwrap().clone();
    assert_eq!(&headers[0], "wbs_code");
    assert_eq!(&headers[12], "total");

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "1.1");
    assert_eq!(&rows[0][1], "102");
    assert_eq!(&rows[0][4], "");
    assert_eq!(&rows[0][5], "Medium");
    assert_eq!(&rows[1][2], "Slab on grade");
    assert_eq!(&rows[1][4], "Unit Price");
    assert_eq!(&rows[1][9], "2");
    assert_eq!(&rows[1][10], "2");
    assert_eq!(&rows[1][11], "10");
    assert_eq!(rows[1][12].parse::<f64>().unwrap(), 7200.0);
}

#[test]
fn csv_export_writes_file() {
    let ws = build_sample_workspace();
    let tmp = NamedTempFile::new().unwrap();
    save_line_items_to_csv(&ws, tmp.path()).unwrap();
    let mut reader = csv::Reader::from_path(tmp.path()).unwrap();
    let totals: Vec<f64> = reader
        .records()
        .map(|r| r.unwrap()[12].parse().unwrap())
        .collect();
    assert_eq!(totals, vec![5000.0, 7200.0]);
}
