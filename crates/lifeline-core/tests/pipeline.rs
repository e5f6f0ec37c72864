use lifeline_core::diagrams::sequence::{BlockMarker, Event, LineType, MessageKind};
use lifeline_core::{DiagramState, Engine, Error, LiveConfig};
use serde_json::json;

const CHECKOUT: &str = r#"%%{init: {'sequence': {'mirrorActors': false}}}%%
sequenceDiagram
    title: Checkout
    autonumber
    actor Customer
    participant Shop as Web Shop
    Customer->>+Shop: place order
    Note over Customer,Shop: card details attached
    alt card accepted
        Shop-->>Customer: receipt
    else card declined
        Shop--xCustomer: declined
    end
    Shop-->>-Customer: done
"#;

#[test]
fn full_pipeline_produces_ordered_events() {
    let parsed = Engine::new().parse_diagram_sync(CHECKOUT).unwrap();

    assert_eq!(parsed.meta.title.as_deref(), Some("Checkout"));
    assert!(!parsed.meta.config.sequence.mirror_actors);
    assert!(parsed.state.show_sequence_numbers());
    assert_eq!(parsed.state.actor("Shop").unwrap().description, "Web Shop");

    let types: Vec<LineType> = parsed.state.events().iter().map(Event::line_type).collect();
    assert_eq!(
        types,
        vec![
            LineType::SolidOpen,
            LineType::ActiveStart,
            LineType::Note,
            LineType::AltStart,
            LineType::DottedOpen,
            LineType::AltElse,
            LineType::DottedCross,
            LineType::AltEnd,
            LineType::DottedOpen,
            LineType::ActiveEnd,
        ]
    );

    let numbers: Vec<Option<u32>> = parsed.state.messages().map(|m| m.sequence_number).collect();
    assert_eq!(numbers, vec![Some(1), Some(2), Some(3), Some(4)]);

    assert_eq!(
        serde_json::to_value(&parsed.state.events()[5]).unwrap(),
        json!({"type": "block", "marker": "altElse", "label": "card declined"})
    );
}

#[test]
fn one_engine_many_threads() {
    let engine = Engine::new().with_site_config(LiveConfig::default());
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let engine = &engine;
                scope.spawn(move || {
                    let text = format!("sequenceDiagram\nA{i}->B{i}: hi {i}");
                    engine.parse_diagram_sync(&text).unwrap()
                })
            })
            .collect();
        for (i, handle) in handles.into_iter().enumerate() {
            let parsed = handle.join().unwrap();
            assert_eq!(parsed.state.events()[0].text(), Some(format!("hi {i}").as_str()));
            assert_eq!(parsed.state.actors().len(), 2);
        }
    });
}

#[test]
fn state_can_be_driven_directly() {
    let mut state = DiagramState::new();
    state.add_message("A", "B", MessageKind::Dotted, "call");
    state.add_block_marker(BlockMarker::OptStart, Some("maybe"));
    state.add_block_marker(BlockMarker::OptEnd, None);
    state.enable_autonumber();

    assert_eq!(state.messages().next().unwrap().sequence_number, Some(1));
    assert_eq!(state.events().len(), 3);
}

#[test]
fn errors_carry_positions_for_reporting() {
    let err = Engine::new()
        .parse_diagram_sync("sequenceDiagram\n  loop forever\n    A->B: x\n")
        .unwrap_err();
    assert!(matches!(err, Error::Syntax { .. }));
    assert_eq!(err.position(), Some((2, 3)));
    assert!(err.to_string().starts_with("Syntax error at line 2, column 3"));
}
