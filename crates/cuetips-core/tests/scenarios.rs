//! End-to-end behaviour over the in-memory document.

mod common;

use std::cell::Cell;
use std::rc::Rc;

use common::{RecordingTips, TipEvent, hide_target_tip, target_tip, tip};
use cuetips_core::dom::DomError;
use cuetips_core::dom::memory::MemoryDocument;
use cuetips_core::{
    CueConfig, CueTips, CueTipsError, CueTipsOptions, DEFAULT_CUE_CLASS, create,
    cue_configs_from_json, registry,
};
use pretty_assertions::assert_eq;

#[test]
fn initial_scan_matches_preexisting_elements() {
    let doc = MemoryDocument::new();
    let button = doc.append_element(doc.body_element(), "button", &[("data-cue-1", "")]);
    let tips = RecordingTips::new();

    let cue = CueConfig::new("data-cue-1").into_ref();
    let cues = create(doc.clone(), [cue], tips.clone()).unwrap();

    assert_eq!(tips.events(), vec![target_tip("data-cue-1", button)]);
    assert!(doc.has_class(button, DEFAULT_CUE_CLASS));
    // The scan retired the only config, so nothing was subscribed.
    assert!(cues.active_configs().is_empty());
    assert!(!cues.is_watching());
    assert_eq!(doc.observer_count(), 0);
    assert_eq!(registry::live_count(), 0);
}

#[test]
fn cue_then_tip_in_two_steps() {
    let doc = MemoryDocument::new();
    let tips = RecordingTips::new();
    let cue = CueConfig::new("data-cue-1")
        .with_tip_attr("data-cue-tip-1")
        .into_ref();
    let cues = create(doc.clone(), [cue.clone()], tips.clone()).unwrap();
    assert!(cues.is_watching());
    assert_eq!(cues.selector(), "[data-cue-1],[data-cue-tip-1]");

    let button = doc.append_element(doc.body_element(), "button", &[("data-cue-1", "")]);
    doc.flush();
    assert_eq!(tips.events(), vec![target_tip("data-cue-1", button)]);
    assert_eq!(cues.active_configs(), vec![cue]);
    assert!(doc.has_class(button, DEFAULT_CUE_CLASS));

    doc.set_attribute(button, "data-cue-tip-1", "");
    doc.flush();
    assert_eq!(
        tips.events(),
        vec![
            target_tip("data-cue-1", button),
            hide_target_tip("data-cue-1"),
            tip("data-cue-1", button),
        ]
    );
    assert!(cues.active_configs().is_empty());
    assert!(!cues.is_watching());
    assert!(!doc.has_class(button, DEFAULT_CUE_CLASS));
    assert_eq!(doc.observer_count(), 0);
}

#[test]
fn veto_keeps_config_until_hook_allows_removal() {
    let doc = MemoryDocument::new();
    let tips = RecordingTips::new();
    let allow = Rc::new(Cell::new(false));
    let asked = Rc::new(Cell::new(0));
    let cue = CueConfig::new("data-cue-1").into_ref();

    let cues = {
        let allow = Rc::clone(&allow);
        let asked = Rc::clone(&asked);
        CueTips::builder(doc.clone())
            .tip_interface(tips.clone())
            .on_remove(move |_| {
                asked.set(asked.get() + 1);
                allow.get()
            })
            .build([cue.clone()])
            .unwrap()
    };

    let button = doc.append_element(doc.body_element(), "button", &[("data-cue-1", "")]);
    doc.flush();
    assert_eq!(tips.events(), vec![target_tip("data-cue-1", button)]);
    assert_eq!(asked.get(), 1);
    assert_eq!(cues.active_configs(), vec![cue.clone()]);
    assert!(cues.is_watching());

    allow.set(true);
    cues.remove(&cue);
    assert_eq!(asked.get(), 2);
    assert!(cues.active_configs().is_empty());
    assert!(!cues.is_watching());
}

#[test]
fn unwatched_after_last_removal_and_rearmed_by_add() {
    let doc = MemoryDocument::new();
    let tips = RecordingTips::new();
    let cue = CueConfig::new("data-cue-1")
        .with_tip_attr("data-cue-tip-1")
        .into_ref();
    let cues = create(doc.clone(), [cue.clone()], tips.clone()).unwrap();

    cues.remove(&cue);
    assert!(!cues.is_watching());
    assert_eq!(doc.observer_count(), 0);

    let early = doc.append_element(doc.body_element(), "button", &[("data-cue-1", "")]);
    doc.flush();
    assert!(tips.events().is_empty());

    cues.add(cue.clone()).unwrap();
    assert!(cues.is_watching());
    // Re-arming rescans, so the element inserted while unwatched is found.
    assert_eq!(tips.events(), vec![target_tip("data-cue-1", early)]);

    let fresh = doc.append_element(doc.body_element(), "button", &[("data-cue-1", "")]);
    doc.flush();
    assert_eq!(
        tips.events(),
        vec![target_tip("data-cue-1", early), target_tip("data-cue-1", fresh)]
    );
}

#[test]
fn empty_instance_never_subscribes_until_add() {
    let doc = MemoryDocument::new();
    let tips = RecordingTips::new();
    let cues = create(doc.clone(), [], tips.clone()).unwrap();
    assert!(!cues.is_watching());
    assert_eq!(doc.observer_count(), 0);
    assert_eq!(registry::live_count(), 0);
    assert_eq!(cues.selector(), "");

    let stray = CueConfig::new("data-stray").into_ref();
    cues.remove(&stray);
    assert!(cues.active_configs().is_empty());
    assert!(!cues.is_watching());

    let cue = CueConfig::new("data-cue-1")
        .with_tip_attr("data-cue-tip-1")
        .into_ref();
    cues.add(cue.clone()).unwrap();
    assert_eq!(cues.active_configs(), vec![cue]);
    assert!(cues.is_watching());
    assert_eq!(doc.observer_count(), 1);
    assert_eq!(registry::live_count(), 1);
    assert!(cues.subscription_id().is_some());
}

#[test]
fn adding_an_active_config_twice_is_ignored() {
    let doc = MemoryDocument::new();
    let cue = CueConfig::new("data-cue-1")
        .with_tip_attr("data-cue-tip-1")
        .into_ref();
    let cues = create(doc.clone(), [cue.clone(), cue.clone()], RecordingTips::new()).unwrap();
    assert_eq!(cues.active_configs().len(), 1);

    cues.add(cue.clone()).unwrap();
    assert_eq!(cues.active_configs(), vec![cue]);
    assert_eq!(cues.attributes(), vec!["data-cue-1", "data-cue-tip-1"]);
    assert_eq!(doc.observer_count(), 1);
}

#[test]
fn cue_only_config_retires_after_first_match() {
    let doc = MemoryDocument::new();
    let tips = RecordingTips::new();
    let a = CueConfig::new("data-cue-a").into_ref();
    let b = CueConfig::new("data-cue-b").with_tip_attr("data-tip-b").into_ref();
    let cues = create(doc.clone(), [a, b.clone()], tips.clone()).unwrap();
    assert_eq!(cues.selector(), "[data-cue-a],[data-cue-b],[data-tip-b]");

    let el = doc.append_element(doc.body_element(), "span", &[("data-cue-a", "")]);
    doc.flush();
    assert_eq!(tips.events(), vec![target_tip("data-cue-a", el)]);
    assert_eq!(cues.active_configs(), vec![b]);
    assert_eq!(cues.selector(), "[data-cue-b],[data-tip-b]");
    assert!(cues.is_watching());

    // No longer tracked.
    doc.append_element(doc.body_element(), "span", &[("data-cue-a", "")]);
    doc.flush();
    assert_eq!(tips.events().len(), 1);
}

#[test]
fn first_declared_config_wins_for_shared_attribute() {
    let doc = MemoryDocument::new();
    let tips = RecordingTips::new();
    let panel_only = CueConfig::new("data-cue")
        .with_parent_selector("section.panel")
        .into_ref();
    let anywhere = CueConfig::new("data-cue").into_ref();
    let cues = create(
        doc.clone(),
        [panel_only.clone(), anywhere.clone()],
        tips.clone(),
    )
    .unwrap();

    // Outside the panel the first config refuses and the second is unreachable.
    let outside = doc.append_element(doc.body_element(), "button", &[("data-cue", "")]);
    doc.flush();
    assert!(tips.events().is_empty());
    assert!(!doc.has_class(outside, DEFAULT_CUE_CLASS));

    // Moving it under the panel reports an insertion there.
    let panel = doc.append_element(doc.body_element(), "section", &[("class", "panel")]);
    doc.append_child(panel, outside);
    doc.flush();
    assert_eq!(tips.events(), vec![target_tip("data-cue", outside)]);
    assert_eq!(cues.active_configs(), vec![anywhere]);

    let later = doc.append_element(doc.body_element(), "button", &[("data-cue", "")]);
    doc.flush();
    assert_eq!(
        tips.events(),
        vec![target_tip("data-cue", outside), target_tip("data-cue", later)]
    );
    assert!(!cues.is_watching());
}

#[test]
fn unscoped_config_fires_while_scoped_one_waits_for_its_ancestor() {
    let doc = MemoryDocument::new();
    let tips = RecordingTips::new();
    let a = CueConfig::new("data-a").into_ref();
    let b = CueConfig::new("data-b").with_parent_selector(".scope").into_ref();
    let cues = create(doc.clone(), [a, b.clone()], tips.clone()).unwrap();

    let el = doc.append_element(doc.body_element(), "button", &[("data-a", ""), ("data-b", "")]);
    doc.flush();
    assert_eq!(tips.events(), vec![target_tip("data-a", el)]);
    assert_eq!(cues.active_configs(), vec![b]);

    let scope = doc.append_element(doc.body_element(), "div", &[("class", "scope")]);
    doc.append_child(scope, el);
    doc.flush();
    assert_eq!(
        tips.events(),
        vec![target_tip("data-a", el), target_tip("data-b", el)]
    );
    assert!(cues.active_configs().is_empty());
    assert!(!cues.is_watching());
}

#[test]
fn parent_selectors_use_full_css_syntax() {
    let doc = MemoryDocument::new();
    let tips = RecordingTips::new();
    let cue = CueConfig::new("data-cue")
        .with_parent_selector("nav:not(.closed) > ul li:first-child")
        .into_ref();
    let cues = create(doc.clone(), [cue], tips.clone()).unwrap();

    let nav = doc.append_element(doc.body_element(), "nav", &[("class", "closed")]);
    let list = doc.append_element(nav, "ul", &[]);
    let item = doc.append_element(list, "li", &[]);
    let button = doc.append_element(item, "button", &[("data-cue", "")]);
    doc.flush();
    assert!(tips.events().is_empty());

    doc.set_attribute(nav, "class", "open");
    doc.set_attribute(button, "data-cue", "1");
    doc.flush();
    assert_eq!(tips.events(), vec![target_tip("data-cue", button)]);
    assert!(!cues.is_watching());
}

#[test]
fn tip_parent_selector_gates_the_tip() {
    let doc = MemoryDocument::new();
    let tips = RecordingTips::new();
    let cue = CueConfig::new("data-cue")
        .with_tip_attr("data-tip")
        .with_tip_parent_selector("#help")
        .into_ref();
    let cues = create(doc.clone(), [cue], tips.clone()).unwrap();

    let stray = doc.append_element(doc.body_element(), "div", &[("data-tip", "")]);
    doc.flush();
    assert!(tips.events().is_empty());

    let help = doc.append_element(doc.body_element(), "aside", &[("id", "help")]);
    doc.append_child(help, stray);
    doc.flush();
    assert_eq!(
        tips.events(),
        vec![hide_target_tip("data-cue"), tip("data-cue", stray)]
    );
    assert!(cues.active_configs().is_empty());
}

#[test]
fn cue_class_can_be_disabled_per_config() {
    let doc = MemoryDocument::new();
    let tips = RecordingTips::new();
    let cue = CueConfig::new("data-cue")
        .with_tip_attr("data-tip")
        .without_cue_class()
        .into_ref();
    let _cues = create(doc.clone(), [cue], tips.clone()).unwrap();

    let button = doc.append_element(doc.body_element(), "button", &[("data-cue", "")]);
    doc.flush();
    assert_eq!(tips.events(), vec![target_tip("data-cue", button)]);
    assert_eq!(doc.attribute(button, "class"), None);
}

#[test]
fn custom_cue_class_is_added_and_stripped() {
    let doc = MemoryDocument::new();
    let tips = RecordingTips::new();
    let cue = CueConfig::new("data-cue").with_tip_attr("data-tip").into_ref();
    let options = CueTipsOptions {
        cue_class: "onboarding-cue".to_string(),
        ..CueTipsOptions::default()
    };
    let cues = CueTips::builder(doc.clone())
        .options(options)
        .tip_interface(tips.clone())
        .build([cue])
        .unwrap();
    assert_eq!(cues.options().cue_class, "onboarding-cue");

    let button = doc.append_element(
        doc.body_element(),
        "button",
        &[("data-cue", ""), ("class", "primary")],
    );
    doc.flush();
    assert_eq!(
        doc.attribute(button, "class").as_deref(),
        Some("primary onboarding-cue")
    );

    doc.append_element(doc.body_element(), "div", &[("data-tip", "")]);
    doc.flush();
    assert_eq!(doc.attribute(button, "class").as_deref(), Some("primary"));
}

#[test]
fn root_selector_limits_scan_and_observation() {
    let doc = MemoryDocument::new();
    let app = doc.append_element(doc.body_element(), "main", &[("id", "app")]);
    let before_outside = doc.append_element(doc.body_element(), "button", &[("data-cue", "")]);
    let tips = RecordingTips::new();
    let cue = CueConfig::new("data-cue").with_tip_attr("data-tip").into_ref();
    let options = CueTipsOptions {
        root_selector: Some("#app".to_string()),
        ..CueTipsOptions::default()
    };
    let cues = CueTips::builder(doc.clone())
        .options(options)
        .tip_interface(tips.clone())
        .build([cue])
        .unwrap();
    assert!(cues.is_watching());
    assert!(tips.events().is_empty());
    assert!(!doc.has_class(before_outside, DEFAULT_CUE_CLASS));

    doc.append_element(doc.body_element(), "button", &[("data-cue", "")]);
    doc.flush();
    assert!(tips.events().is_empty());

    let inside = doc.append_element(app, "button", &[("data-cue", "")]);
    doc.flush();
    assert_eq!(tips.events(), vec![target_tip("data-cue", inside)]);
}

#[test]
fn missing_root_fails_creation() {
    let doc = MemoryDocument::new();
    let cue = CueConfig::new("data-cue").into_ref();
    let options = CueTipsOptions {
        root_selector: Some("#nowhere".to_string()),
        ..CueTipsOptions::default()
    };
    let err = CueTips::builder(doc.clone())
        .options(options)
        .tip_interface(RecordingTips::new())
        .build([cue])
        .unwrap_err();
    assert!(matches!(err, CueTipsError::Dom(DomError::MissingRoot)));
    assert_eq!(doc.observer_count(), 0);
    assert_eq!(registry::live_count(), 0);
}

#[test]
fn invalid_options_fail_creation() {
    let doc = MemoryDocument::new();
    let options = CueTipsOptions {
        cue_class: "two words".to_string(),
        ..CueTipsOptions::default()
    };
    let err = CueTips::builder(doc)
        .options(options)
        .tip_interface(RecordingTips::new())
        .build([])
        .unwrap_err();
    assert!(matches!(err, CueTipsError::Options(_)));
}

#[test]
fn invalid_configs_are_rejected() {
    let doc = MemoryDocument::new();
    let err = create(
        doc.clone(),
        [
            CueConfig::new("data-ok").into_ref(),
            CueConfig::new("").into_ref(),
        ],
        RecordingTips::new(),
    )
    .unwrap_err();
    assert!(matches!(err, CueTipsError::InvalidConfigEntry { index: 1 }));
    assert_eq!(doc.observer_count(), 0);

    let cues = create(doc.clone(), [], RecordingTips::new()).unwrap();
    let err = cues.add(CueConfig::new("").into_ref()).unwrap_err();
    assert!(matches!(err, CueTipsError::InvalidConfigEntry { index: 0 }));
    assert!(cues.active_configs().is_empty());
    assert!(!cues.is_watching());

    assert!(matches!(
        cue_configs_from_json(r#"{"cueAttr": "data-cue"}"#),
        Err(CueTipsError::InvalidConfigList)
    ));
    assert!(matches!(
        cue_configs_from_json(r#"[{"cueAttr": "data-a"}, {"cueAttr": 7}]"#),
        Err(CueTipsError::InvalidConfigEntry { index: 1 })
    ));
}

#[test]
fn configs_parsed_from_json_drive_matching() {
    let doc = MemoryDocument::new();
    let tips = RecordingTips::new();
    let configs = cue_configs_from_json(
        r#"[{"cueAttr": "data-cue", "cueTipAttr": "data-tip", "label": "Save"}]"#,
    )
    .unwrap();
    assert_eq!(configs[0].payload["label"], "Save");
    let cues = create(doc.clone(), configs.clone(), tips.clone()).unwrap();

    let button = doc.append_element(doc.body_element(), "button", &[("data-cue", "")]);
    doc.flush();
    assert_eq!(tips.events(), vec![target_tip("data-cue", button)]);
    assert_eq!(cues.active_configs(), configs);
}

#[test]
fn missing_tip_interface_is_rejected() {
    let doc = MemoryDocument::new();
    let cue = CueConfig::new("data-cue").into_ref();
    let err = CueTips::builder(doc).build([cue]).unwrap_err();
    assert!(matches!(err, CueTipsError::InvalidTipInterface));
}

#[test]
fn nested_descendants_of_inserted_subtree_are_matched() {
    let doc = MemoryDocument::new();
    let tips = RecordingTips::new();
    let cue = CueConfig::new("data-cue").with_tip_attr("data-tip").into_ref();
    let _cues = create(doc.clone(), [cue], tips.clone()).unwrap();

    let card = doc.create_element("div", &[("class", "card")]);
    let body = doc.create_element("div", &[]);
    let text = doc.create_text();
    let button = doc.create_element("button", &[("data-cue", "")]);
    doc.append_child(card, body);
    doc.append_child(body, text);
    doc.append_child(body, button);
    doc.append_child(doc.body_element(), card);
    doc.flush();

    assert_eq!(tips.events(), vec![target_tip("data-cue", button)]);
}

#[test]
fn only_tracked_attribute_changes_are_dispatched() {
    let doc = MemoryDocument::new();
    let tips = RecordingTips::new();
    let cue = CueConfig::new("data-cue").with_tip_attr("data-tip").into_ref();
    let _cues = create(doc.clone(), [cue], tips.clone()).unwrap();

    let el = doc.append_element(doc.body_element(), "div", &[]);
    doc.flush();
    doc.set_attribute(el, "data-other", "1");
    doc.set_attribute(el, "title", "hello");
    doc.flush();
    assert!(tips.events().is_empty());

    doc.set_attribute(el, "data-cue", "");
    doc.flush();
    assert_eq!(tips.events(), vec![target_tip("data-cue", el)]);
}

#[test]
fn unit_returning_hook_lets_removal_proceed() {
    let doc = MemoryDocument::new();
    let tips = RecordingTips::new();
    let seen = Rc::new(Cell::new(0));
    let cue = CueConfig::new("data-cue").into_ref();
    let cues = {
        let seen = Rc::clone(&seen);
        CueTips::builder(doc.clone())
            .tip_interface(tips.clone())
            .on_remove(move |_| seen.set(seen.get() + 1))
            .build([cue])
            .unwrap()
    };

    doc.append_element(doc.body_element(), "button", &[("data-cue", "")]);
    doc.flush();
    assert_eq!(seen.get(), 1);
    assert!(cues.active_configs().is_empty());
    assert!(matches!(tips.events().as_slice(), [TipEvent::TargetTip(..)]));
}
