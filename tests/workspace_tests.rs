use estimate_tool::{
    AssistantError, ContractType, CostCategory, CostNode, DetailUpdate, EstimateAssistant,
    EstimateMetadata, EstimateSettings, EstimateWorkspace, NodeEdit, NodeId, RawItemDescriptor,
    ResourceEdit, ResourceLine, RiskLevel, ViewMode, WorkspaceError,
};
use std::sync::Mutex;

fn workspace() -> EstimateWorkspace {
    let items = vec![
        CostNode::group("General Conditions", CostCategory::Indirect)
            .with_id("101")
            .with_children(vec![
                CostNode::terminal("Supervision", 1.0, "ls", 5000.0, CostCategory::Labor)
                    .with_id("102"),
                CostNode::terminal("Trailer", 1.0, "ls", 10000.0, CostCategory::Equipment)
                    .with_id("103"),
            ]),
        CostNode::group("Site Work", CostCategory::Indirect)
            .with_id("201")
            .with_children(vec![
                CostNode::terminal("Excavation", 500.0, "cy", 25.0, CostCategory::Equipment)
                    .with_id("202"),
            ]),
    ];
    EstimateWorkspace::with_items(
        EstimateMetadata::new("Warehouse"),
        items,
        EstimateSettings::default(),
    )
    .unwrap()
}

#[test]
fn new_items_use_settings_defaults() {
    let settings = EstimateSettings {
        root_item_unit: "lot".into(),
        child_item_unit: "pc".into(),
        ..EstimateSettings::default()
    };
    let mut ws = EstimateWorkspace::new(EstimateMetadata::default(), settings);
    let root = ws.add_root().unwrap();
    let child = ws.add_child(&root).unwrap().unwrap();

    let root_node = ws.find(&root).unwrap();
    assert!(root_node.is_group());
    assert_eq!(root_node.unit, "lot");
    let child_node = ws.find(&child).unwrap();
    assert!(child_node.is_terminal());
    assert_eq!(child_node.unit, "pc");
    assert_eq!(child_node.description, "New Sub-Item");
    assert_eq!(child_node.wbs_code, "1.1");
}

#[test]
fn every_commit_stamps_last_modified() {
    let mut ws = workspace();
    let before = ws.metadata().last_modified;
    ws.update_field(&NodeId::from("202"), NodeEdit::SetQuantity(600.0))
        .unwrap();
    assert!(ws.metadata().last_modified >= before);
    assert_eq!(ws.grand_total(), 30000.0);
}

#[test]
fn derived_view_rejects_structure_but_accepts_detail_saves() {
    let mut ws = workspace();
    ws.set_mode(ViewMode::Contract);

    assert!(matches!(
        ws.delete(&NodeId::from("201")),
        Err(WorkspaceError::StructuralEditRejected {
            mode: ViewMode::Contract
        })
    ));
    assert!(matches!(
        ws.ingest(vec![RawItemDescriptor::new("Permits", "Indirect")]),
        Err(WorkspaceError::StructuralEditRejected { .. })
    ));
    assert!(!ws.toggle_expand(&NodeId::from("201")));

    let mut draft = ws.open_detail(&NodeId::from("202")).unwrap();
    draft.set_contract_type(ContractType::UnitPrice);
    assert!(ws.save_draft(&mut draft).unwrap());

    let view = ws.display_items();
    assert_eq!(view[0].description, "Unit Price");
    assert_eq!(view[0].children().unwrap()[0].id.as_str(), "202");
}

#[test]
fn detail_save_replaces_plug_price_with_resources() {
    let mut ws = workspace();
    let id = NodeId::from("202");
    let mut draft = ws.open_detail(&id).unwrap();
    let operator = draft.add_resource(CostCategory::Labor, ws.catalog());
    assert!(draft.select_from_catalog(&operator, ws.catalog(), "L-009"));
    let loader = draft.add_resource(CostCategory::Equipment, ws.catalog());
    assert!(draft.select_from_catalog(&loader, ws.catalog(), "E-001"));
    draft.set_duration(4.0).unwrap();
    draft
        .update_resource(&operator, ResourceEdit::Description("Excavator operator".into()))
        .unwrap();
    assert!(ws.save_draft(&mut draft).unwrap());

    let node = ws.find(&id).unwrap();
    assert_eq!(node.total, 32.0 * 78.0 + 32.0 * 185.0);
    assert_eq!(node.contract_type, Some(ContractType::LumpSum));
    assert_eq!(node.risk_level, Some(RiskLevel::Low));
    assert_eq!(ws.find(&NodeId::from("201")).unwrap().total, node.total);
    assert_eq!(ws.selection(), Some(&id));
}

#[test]
fn invalid_detail_update_is_rejected() {
    let mut ws = workspace();
    let update = DetailUpdate {
        resources: vec![ResourceLine::new(CostCategory::Material, "Bad", -1.0, "ea", 2.0)],
        duration: 1.0,
        hours_per_day: 8.0,
        quantity: 1.0,
        contract_type: None,
        risk_level: None,
    };
    assert!(matches!(
        ws.save_detail(&NodeId::from("202"), update),
        Err(WorkspaceError::Edit(_))
    ));
    assert_eq!(ws.grand_total(), 27500.0);
}

#[test]
fn detail_save_on_group_is_a_lookup_miss() {
    let mut ws = workspace();
    assert!(ws.open_detail(&NodeId::from("101")).is_none());
    let update = DetailUpdate {
        resources: Vec::new(),
        duration: 1.0,
        hours_per_day: 8.0,
        quantity: 1.0,
        contract_type: None,
        risk_level: None,
    };
    assert!(!ws.save_detail(&NodeId::from("101"), update).unwrap());
}

struct RecordingAssistant {
    payloads: Mutex<Vec<String>>,
}

impl EstimateAssistant for RecordingAssistant {
    fn generate(&self, _prompt: &str) -> Result<Vec<RawItemDescriptor>, AssistantError> {
        Err(AssistantError::Failed("quota exceeded".into()))
    }

    fn summarize(&self, payload: &str) -> Result<String, AssistantError> {
        self.payloads
            .lock()
            .unwrap()
            .push(payload.to_string());
        Ok("Missing scope: demolition.".into())
    }
}

#[test]
fn assistant_receives_flattened_summary() {
    let ws = workspace().with_assistant(Box::new(RecordingAssistant {
        payloads: Mutex::new(Vec::new()),
    }));
    assert_eq!(ws.request_analysis().unwrap(), "Missing scope: demolition.");
    assert!(ws.analysis_payload().starts_with("1 General Conditions - 15000\n1.1 Supervision - 5000"));
}

#[test]
fn assistant_failures_leave_tree_untouched() {
    let mut ws = workspace().with_assistant(Box::new(RecordingAssistant {
        payloads: Mutex::new(Vec::new()),
    }));
    let err = ws.generate_items("warehouse").unwrap_err();
    assert_eq!(err.to_string(), "assistant request failed: quota exceeded");
    assert_eq!(ws.items().len(), 2);
}

#[test]
fn breakdown_uses_configured_top_count() {
    let settings = EstimateSettings {
        top_cost_items: 1,
        ..EstimateSettings::default()
    };
    let ws = EstimateWorkspace::with_items(
        EstimateMetadata::default(),
        workspace().items().to_vec(),
        settings,
    )
    .unwrap();
    let top = ws.top_cost_items().unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].id.as_str(), "202");
    assert_eq!(ws.category_breakdown().unwrap().len(), 2);
}

#[test]
fn loading_a_tree_with_duplicate_ids_fails() {
    let dup = vec![
        CostNode::terminal("A", 1.0, "ea", 1.0, CostCategory::Material).with_id("x"),
        CostNode::terminal("B", 1.0, "ea", 1.0, CostCategory::Material).with_id("x"),
    ];
    assert!(
        EstimateWorkspace::with_items(EstimateMetadata::default(), dup, EstimateSettings::default())
            .is_err()
    );
}

#[test]
fn settings_currency_seeds_new_estimate() {
    let settings = EstimateSettings {
        currency: "CAD".to_string(),
        ..EstimateSettings::default()
    };
    let ws = EstimateWorkspace::from_settings(settings);
    assert_eq!(ws.metadata().currency, "CAD");
    assert!(ws.items().is_empty());
}

fn crewed_workspace() -> EstimateWorkspace {
    let items = vec![
        CostNode::terminal("Formwork", 1.0, "ls", 0.0, CostCategory::Labor)
            .with_id("f1")
            .with_schedule(4.0, 8.0)
            .with_resources(vec![
                ResourceLine::new(CostCategory::Labor, "Carpenter", 32.0, "hr", 50.0).with_id("lab"),
            ]),
    ];
    EstimateWorkspace::with_items(EstimateMetadata::default(), items, EstimateSettings::default())
        .unwrap()
}

#[test]
fn detail_save_keeps_hand_set_crew_quantity() {
    let mut ws = crewed_workspace();
    let mut draft = ws.open_detail(&NodeId::from("f1")).unwrap();
    let line = draft.resources()[0].id.clone();
    assert!(draft.update_resource(&line, ResourceEdit::Quantity(10.0)).unwrap());
    assert_eq!(draft.total(), 500.0);

    assert!(ws.save_draft(&mut draft).unwrap());
    let node = ws.find(&NodeId::from("f1")).unwrap();
    assert_eq!(node.resources()[0].quantity, 10.0);
    assert_eq!(node.total, 500.0);
}

#[test]
fn detail_save_resyncs_when_schedule_changes() {
    let mut ws = crewed_workspace();
    let mut draft = ws.open_detail(&NodeId::from("f1")).unwrap();
    draft.set_duration(5.0).unwrap();
    assert_eq!(draft.resources()[0].quantity, 40.0);

    assert!(ws.save_draft(&mut draft).unwrap());
    let node = ws.find(&NodeId::from("f1")).unwrap();
    assert_eq!(node.resources()[0].quantity, 40.0);
    assert_eq!(node.total, 2000.0);
}

#[test]
fn terminal_only_edit_on_group_is_not_applied() {
    let mut ws = workspace();
    let before = ws.metadata().last_modified;
    let items = ws.items().to_vec();

    assert!(!ws
        .update_field(&NodeId::from("101"), NodeEdit::SetDuration(3.0))
        .unwrap());
    assert!(!ws
        .update_field(&NodeId::from("101"), NodeEdit::SetResources(Vec::new()))
        .unwrap());
    assert_eq!(ws.metadata().last_modified, before);
    assert_eq!(ws.items(), items.as_slice());

    assert!(ws
        .update_field(&NodeId::from("101"), NodeEdit::SetDescription("Overheads".into()))
        .unwrap());
}
