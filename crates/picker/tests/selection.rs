#![forbid(unsafe_code)]

use std::sync::{Arc, Mutex};

use lakescope_api::MockApi;
use lakescope_core::{ConnectionId, ScopeId, ScopeItem, ScopeNode};
use lakescope_picker::{render_text, ClickOutcome, MillerColumns, PickerConfig};

fn board(id: u64, name: &str) -> ScopeNode {
    let mut n = ScopeNode::leaf(id, name);
    n.self_url = format!("https://jira.example.com/rest/agile/1.0/board/{}", id);
    n.kind = "scrum".into();
    n
}

fn jira_api() -> Arc<MockApi> {
    Arc::new(MockApi::new().with_connection(
        "conn-1",
        vec![board(1, "Board A"), board(2, "Board B"), board(3, "Board C"), board(99, "Board Z")],
    ))
}

fn item(id: u64, name: &str) -> ScopeItem {
    ScopeItem::from_node(&ConnectionId::new("conn-1"), &board(id, name))
}

type Emitted = Arc<Mutex<Vec<Vec<ScopeItem>>>>;

fn picker(api: &Arc<MockApi>, page_size: usize) -> (MillerColumns<MockApi>, Emitted) {
    let emitted: Emitted = Arc::new(Mutex::new(Vec::new()));
    let sink = emitted.clone();
    let p = MillerColumns::new(api.clone(), PickerConfig::default().with_page_size(page_size))
        .on_change_items(move |items| sink.lock().unwrap().push(items.to_vec()));
    (p, emitted)
}

fn keys(items: &[ScopeItem]) -> Vec<ScopeId> { items.iter().map(|i| i.board_id.clone()).collect() }

fn nums(v: &[u64]) -> Vec<ScopeId> { v.iter().map(|i| ScopeId::Num(*i)).collect() }

#[tokio::test]
async fn selecting_board_a_emits_domain_item() {
    let api = jira_api();
    let (mut p, emitted) = picker(&api, 50);
    p.set_connection(ConnectionId::new("conn-1"));
    p.settle().await;
    assert_eq!(p.click(0, &ScopeId::Num(1)), Ok(ClickOutcome::Selected(ScopeId::Num(1))));
    let got = emitted.lock().unwrap().clone();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0], vec![ScopeItem {
        connection_id: ConnectionId::new("conn-1"),
        board_id: ScopeId::Num(1),
        name: "Board A".into(),
        self_url: "https://jira.example.com/rest/agile/1.0/board/1".into(),
        kind: "scrum".into(),
        project_id: None,
    }]);
}

#[tokio::test]
async fn disabled_ids_are_never_emitted() {
    let api = jira_api();
    let (mut p, emitted) = picker(&api, 50);
    p.set_connection(ConnectionId::new("conn-1"));
    p.settle().await;
    assert!(p.set_disabled_items(Some(&[item(2, "Board B")])));
    // pre-seeded selection that includes a disabled board
    assert!(p.set_selected_items(Some(&[item(2, "Board B")])));
    assert_eq!(p.click(0, &ScopeId::Num(2)), Ok(ClickOutcome::Ignored));
    assert!(emitted.lock().unwrap().is_empty());
    p.click(0, &ScopeId::Num(1)).unwrap();
    p.click(0, &ScopeId::Num(3)).unwrap();
    for list in emitted.lock().unwrap().iter() {
        assert!(!keys(list).contains(&ScopeId::Num(2)));
    }
    assert_eq!(keys(p.selected_items()), nums(&[1, 3]));
    let text = render_text(&p.view());
    assert!(text.contains(" [-] Board B"), "{}", text);
    assert!(text.contains(" [x] Board C"), "{}", text);
}

#[tokio::test]
async fn deselect_matches_clean_select() {
    let api = jira_api();
    let (mut a, _) = picker(&api, 50);
    a.set_connection(ConnectionId::new("conn-1"));
    a.settle().await;
    a.click(0, &ScopeId::Num(1)).unwrap();
    a.click(0, &ScopeId::Num(2)).unwrap();
    assert_eq!(a.click(0, &ScopeId::Num(2)), Ok(ClickOutcome::Deselected(ScopeId::Num(2))));

    let (mut b, _) = picker(&api, 50);
    b.set_connection(ConnectionId::new("conn-1"));
    b.settle().await;
    b.click(0, &ScopeId::Num(1)).unwrap();

    assert_eq!(a.selected_items(), b.selected_items());
    assert_eq!(a.selection().selected_ids(), b.selection().selected_ids());
}

#[tokio::test]
async fn preseeded_id_waits_for_its_node() {
    let api = jira_api();
    let (mut p, emitted) = picker(&api, 2);
    p.set_selected_items(Some(&[item(99, "Board Z")]));
    p.set_connection(ConnectionId::new("conn-1"));
    p.settle().await;
    assert_eq!(p.selection().selected_ids(), nums(&[99]).as_slice());

    p.click(0, &ScopeId::Num(1)).unwrap();
    assert_eq!(keys(&emitted.lock().unwrap()[0]), nums(&[1]));
    assert_eq!(p.selection().selected_ids(), nums(&[99, 1]).as_slice());

    assert!(p.load_more(0));
    p.settle().await;
    p.click(0, &ScopeId::Num(3)).unwrap();
    assert_eq!(keys(&emitted.lock().unwrap()[1]), nums(&[1, 3, 99]));
}

#[tokio::test]
async fn unchanged_parent_lists_are_ignored() {
    let api = jira_api();
    let (mut p, _) = picker(&api, 50);
    let selected = vec![item(1, "Board A")];
    assert!(p.set_selected_items(Some(selected.as_slice())));
    assert!(!p.set_selected_items(Some(selected.clone().as_slice())));
    assert!(!p.set_disabled_items(None));
    assert!(p.set_selected_items(None));
    assert!(p.selection().selected_ids().is_empty());
}

#[tokio::test]
async fn raw_id_lists_cannot_move_disabled_ids() {
    let api = jira_api();
    let (mut p, emitted) = picker(&api, 50);
    p.set_connection(ConnectionId::new("conn-1"));
    p.settle().await;
    p.set_disabled_items(Some(&[item(2, "Board B")]));

    // a disabled id in the incoming list is not added
    let out = p.handle_change_items(nums(&[1, 2]));
    assert_eq!(keys(&out), nums(&[1]));
    assert_eq!(p.selection().selected_ids(), nums(&[1]).as_slice());
    let row2 = p.view().columns[0].rows.iter().find(|r| r.id == ScopeId::Num(2)).cloned().unwrap();
    assert!(row2.disabled && !row2.selected);

    // a disabled id already selected survives a list that leaves it out
    p.set_selected_items(Some(&[item(2, "Board B"), item(3, "Board C")]));
    p.handle_change_items(nums(&[1]));
    assert_eq!(p.selection().selected_ids(), nums(&[1, 2]).as_slice());
    assert_eq!(keys(&emitted.lock().unwrap()[1]), nums(&[1]));
}
