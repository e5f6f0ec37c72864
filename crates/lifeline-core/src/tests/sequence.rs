use crate::diagrams::sequence::*;
use crate::*;
use futures::executor::block_on;
use serde_json::json;

fn parse(text: &str) -> ParsedDiagram {
    Engine::new().parse_diagram_sync(text).unwrap()
}

fn parse_err(text: &str) -> (Error, DiagramState) {
    let mut state = DiagramState::new();
    let err = Engine::new().parse_into(&mut state, text).unwrap_err();
    (err, state)
}

fn markers(state: &DiagramState) -> Vec<LineType> {
    state.events().iter().map(Event::line_type).collect()
}

#[test]
fn parse_diagram_sequence_basic_messages_and_notes() {
    let engine = Engine::new();
    let text = r#"sequenceDiagram
Alice->Bob:Hello Bob, how are you?
Note right of Bob: Bob thinks
Bob-->Alice: I am good thanks!"#;

    let res = block_on(engine.parse_diagram(text)).unwrap();
    assert_eq!(res.meta.diagram_type, "sequence");

    let keys: Vec<&str> = res.state.actors().keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["Alice", "Bob"]);

    let events = res.state.events();
    assert_eq!(events.len(), 3);
    assert_eq!(
        serde_json::to_value(&events[0]).unwrap(),
        json!({
            "type": "message",
            "kind": "solid",
            "from": "Alice",
            "to": "Bob",
            "text": "Hello Bob, how are you?",
            "wrap": false
        })
    );
    assert_eq!(
        serde_json::to_value(&events[1]).unwrap(),
        json!({
            "type": "note",
            "placement": "rightOf",
            "from": "Bob",
            "to": "Bob",
            "text": "Bob thinks",
            "wrap": false
        })
    );
    assert_eq!(events[2].from(), Some("Bob"));
    assert_eq!(events[2].to(), Some("Alice"));
    assert_eq!(events[2].line_type(), LineType::Dotted);
}

#[test]
fn parse_diagram_sequence_is_stateless_across_multiple_parses() {
    let engine = Engine::new();
    let a = engine
        .parse_diagram_sync("sequenceDiagram\nAlice->Bob:Hello Bob\nBob-->Alice:Fine")
        .unwrap();
    let b = engine
        .parse_diagram_sync("sequenceDiagram\nAlice->John:Hello John\nJohn-->Alice:Fine")
        .unwrap();

    assert_eq!(a.state.messages().count(), 2);
    assert_eq!(b.state.messages().count(), 2);
    assert!(b.state.actor("Bob").is_none());
    assert_eq!(b.state.events()[0].to(), Some("John"));
}

#[test]
fn parse_into_resets_reused_state() {
    let engine = Engine::new();
    let mut state = DiagramState::new();
    engine
        .parse_into(&mut state, "sequenceDiagram\nautonumber\ntitle: One\nA->B: x")
        .unwrap();
    engine
        .parse_into(&mut state, "sequenceDiagram\nC->D: y")
        .unwrap();

    assert!(!state.show_sequence_numbers());
    assert_eq!(state.title(), None);
    assert_eq!(state.actors().len(), 2);
    assert_eq!(state.events().len(), 1);
}

#[test]
fn semicolons_separate_statements() {
    let res = parse(
        "sequenceDiagram;Alice->Bob:Hello Bob, how are you?;Note right of Bob: Bob thinks;Bob-->Alice: I am good thanks!;",
    );
    assert_eq!(res.state.actors().len(), 2);
    assert_eq!(res.state.events().len(), 3);
    assert_eq!(res.state.events()[2].text(), Some("I am good thanks!"));
}

#[test]
fn comments_are_skipped_and_truncate_text() {
    let res = parse(
        r#"sequenceDiagram
Alice->Bob: Hello Bob, how are you?

%% Comment
Note right of Bob: Bob thinks
# another comment
Bob-->Alice: I am good thanks! %% trailing
Alice->Bob:-:<>,;# comment"#,
    );
    let events = res.state.events();
    assert_eq!(events.len(), 4);
    assert_eq!(events[2].text(), Some("I am good thanks!"));
    assert_eq!(events[3].text(), Some("-:<>,"));
}

#[test]
fn line_break_markup_is_preserved_verbatim() {
    let res = parse("sequenceDiagram\nAlice->Bob:Hello<br \t/>Bob, <br/>how<br>are you?");
    assert_eq!(
        res.state.events()[0].text(),
        Some("Hello<br \t/>Bob, <br/>how<br>are you?")
    );
}

#[test]
fn actor_names_may_contain_spaces() {
    let res = parse("sequenceDiagram\nAlice Smith -> Bob Jones: hi\nNote over Bob Jones: ok");
    let keys: Vec<&str> = res.state.actors().keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["Alice Smith", "Bob Jones"]);
}

#[test]
fn arrow_tokens_map_to_message_kinds() {
    let cases = [
        ("->", MessageKind::Solid),
        ("-->", MessageKind::Dotted),
        ("->>", MessageKind::SolidOpen),
        ("-->>", MessageKind::DottedOpen),
        ("-x", MessageKind::SolidCross),
        ("--x", MessageKind::DottedCross),
    ];
    for (arrow, kind) in cases {
        let res = parse(&format!("sequenceDiagram\nAlice{arrow}Bob: msg"));
        let Event::Message(m) = &res.state.events()[0] else {
            panic!("expected a message for {arrow}");
        };
        assert_eq!(m.kind, kind, "arrow {arrow}");
        assert_eq!(m.from, "Alice");
        assert_eq!(m.to, "Bob");
        assert_eq!(MessageKind::from_arrow(arrow), Some(kind));
        assert_eq!(kind.arrow(), arrow);
        assert_eq!(kind.is_dotted(), arrow.starts_with("--"), "arrow {arrow}");
    }
}

#[test]
fn message_text_is_optional() {
    let res = parse("sequenceDiagram\nAlice->>Bob");
    assert_eq!(res.state.events()[0].text(), Some(""));
}

#[test]
fn participant_redeclaration_is_idempotent() {
    let res = parse("sequenceDiagram\nparticipant Alice\nparticipant Alice\nparticipant Alice");
    assert_eq!(res.state.actors().len(), 1);
    assert_eq!(res.state.actor("Alice").unwrap().description, "Alice");
}

#[test]
fn participant_alias_sets_description() {
    let res = parse(
        r#"sequenceDiagram
participant A as Alice
participant B as Bob
A->B:Hello Bob, are you alright?
B->A:I am good thanks!
participant A"#,
    );
    let keys: Vec<&str> = res.state.actors().keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["A", "B"]);
    assert_eq!(res.state.actor("A").unwrap().description, "Alice");
    assert_eq!(res.state.actor("B").unwrap().description, "Bob");

    let res = parse("sequenceDiagram\nparticipant A as Alice\nparticipant A as Alicia");
    assert_eq!(res.state.actor("A").unwrap().description, "Alicia");
}

#[test]
fn actor_keyword_declares_stick_figure_actors() {
    let res = parse("sequenceDiagram\nactor Alice\nparticipant Bob\nAlice->Bob: hi");
    assert_eq!(res.state.actor("Alice").unwrap().actor_type, ActorType::Actor);
    assert_eq!(
        res.state.actor("Bob").unwrap().actor_type,
        ActorType::Participant
    );
}

#[test]
fn autonumber_flag() {
    let res = parse("sequenceDiagram\nautonumber\nAlice->Bob:Hi");
    assert!(res.state.show_sequence_numbers());
    assert_eq!(res.state.messages().next().unwrap().sequence_number, Some(1));

    let res = parse("sequenceDiagram\nAlice->Bob:Hi");
    assert!(!res.state.show_sequence_numbers());
    assert_eq!(res.state.messages().next().unwrap().sequence_number, None);
}

#[test]
fn autonumber_numbers_earlier_messages_too() {
    let res = parse("sequenceDiagram\nA->B: one\nNote over A: skip\nautonumber\nB->A: two");
    let numbers: Vec<Option<u32>> = res.state.messages().map(|m| m.sequence_number).collect();
    assert_eq!(numbers, vec![Some(1), Some(2)]);
}

#[test]
fn title_forms() {
    let res = parse("sequenceDiagram\ntitle: Diagram Title\nAlice->Bob: hi");
    assert_eq!(res.state.title(), Some("Diagram Title"));
    assert_eq!(res.meta.title.as_deref(), Some("Diagram Title"));

    let res = parse("sequenceDiagram\ntitle Bare Title\nAlice->Bob: hi");
    assert_eq!(res.state.title(), Some("Bare Title"));
}

#[test]
fn accessibility_title_and_description() {
    let res = parse(
        r#"sequenceDiagram
accTitle: Accessible Title
accDescr {
    first line
    second line
}
Alice->Bob: hi"#,
    );
    assert_eq!(res.state.acc_title(), Some("Accessible Title"));
    assert_eq!(res.state.acc_descr(), Some("first line\nsecond line"));

    let res = parse("sequenceDiagram\naccDescr: short one\nAlice->Bob: hi");
    assert_eq!(res.state.acc_descr(), Some("short one"));
}

#[test]
fn explicit_activation_stacks() {
    let res = parse(
        r#"sequenceDiagram
Alice-->>Bob:Hello Bob, how are you?
activate Bob
activate Bob
Bob-->>Alice:Hello Alice, I'm fine and you?
deactivate Bob
Alice-->>Bob:Good.
deactivate Bob"#,
    );
    assert_eq!(
        markers(&res.state),
        vec![
            LineType::DottedOpen,
            LineType::ActiveStart,
            LineType::ActiveStart,
            LineType::DottedOpen,
            LineType::ActiveEnd,
            LineType::DottedOpen,
            LineType::ActiveEnd,
        ]
    );
    assert_eq!(res.state.activation_depth("Bob"), 0);
}

#[test]
fn activation_shorthand_follows_the_message() {
    let res = parse(
        r#"sequenceDiagram
Alice->>+John: Hello John, how are you?
Alice->>+John: John, can you hear me?
John-->>-Alice: Hi Alice, I can hear you!
John-->>- Alice: I feel great!"#,
    );
    let events = res.state.events();
    assert_eq!(events.len(), 8);
    assert_eq!(
        markers(&res.state),
        vec![
            LineType::SolidOpen,
            LineType::ActiveStart,
            LineType::SolidOpen,
            LineType::ActiveStart,
            LineType::DottedOpen,
            LineType::ActiveEnd,
            LineType::DottedOpen,
            LineType::ActiveEnd,
        ]
    );
    assert_eq!(events[1].activation_actor(), Some("John"));
    assert_eq!(events[7].activation_actor(), Some("John"));
    assert_eq!(events[6].to(), Some("Alice"));
    assert_eq!(res.state.activation_depth("John"), 0);
}

#[test]
fn activation_marker_may_precede_the_target_after_whitespace() {
    let res = parse("sequenceDiagram\nAlice->> +Bob: go\nBob-->> -Alice: back");
    assert_eq!(
        markers(&res.state),
        vec![
            LineType::SolidOpen,
            LineType::ActiveStart,
            LineType::DottedOpen,
            LineType::ActiveEnd,
        ]
    );
}

#[test]
fn deactivating_an_inactive_participant_fails() {
    let (err, state) = parse_err(
        r#"sequenceDiagram
participant user as External User
participant Server
user->>+Server: Test
user->>+Server: Test2
Server->>-user: Test
Server->>-user: Test2
Server->>-user: Test3
Server->>user: never parsed"#,
    );
    assert_eq!(
        err,
        Error::ActivationMismatch {
            source: InactiveParticipant {
                actor: "Server".to_string()
            },
            line: 8,
            column: 1,
        }
    );
    assert_eq!(
        err.to_string(),
        "Trying to inactivate an inactive participant (Server) at line 8, column 1"
    );

    // Statements before the failure stay applied, nothing after it is.
    assert_eq!(state.events().len(), 9);
    assert_eq!(state.events()[8].text(), Some("Test3"));
    assert_eq!(state.activation_depth("Server"), 0);
}

#[test]
fn deactivate_at_zero_fails_even_with_other_actors_active() {
    let (err, _) = parse_err("sequenceDiagram\nactivate Alice\nactivate Carol\ndeactivate Bob");
    let Error::ActivationMismatch { source, .. } = err else {
        panic!("expected an activation mismatch, got {err:?}");
    };
    assert_eq!(source.actor, "Bob");
}

#[test]
fn alt_with_multiple_else_sections() {
    let res = parse(
        r#"sequenceDiagram
Alice->Bob: Hello Bob, how are you?

%% Comment
Note right of Bob: Bob thinks
alt isWell

Bob-->Alice: I am good thanks!
else isSick
Bob-->Alice: Feel sick...
else default
Bob-->Alice: :-)
end"#,
    );
    let events = res.state.events();
    assert_eq!(events.len(), 9);
    assert_eq!(
        markers(&res.state),
        vec![
            LineType::Solid,
            LineType::Note,
            LineType::AltStart,
            LineType::Dotted,
            LineType::AltElse,
            LineType::Dotted,
            LineType::AltElse,
            LineType::Dotted,
            LineType::AltEnd,
        ]
    );
    assert_eq!(events[2].text(), Some("isWell"));
    assert_eq!(events[4].text(), Some("isSick"));
    assert_eq!(events[6].text(), Some("default"));
    assert_eq!(events[7].text(), Some(":-)"));
    assert_eq!(events[8].text(), None);
}

#[test]
fn blocks_without_labels_get_empty_labels() {
    let res = parse("sequenceDiagram\nalt;Bob-->Alice: ok;else;Bob-->Alice: no;end\nloop\nA->B: x\nend");
    let labels: Vec<Option<&str>> = res
        .state
        .events()
        .iter()
        .filter(|e| matches!(e, Event::Block { .. }))
        .map(Event::text)
        .collect();
    assert_eq!(
        labels,
        vec![Some(""), Some(""), None, Some(""), None]
    );
}

#[test]
fn par_and_opt_and_loop_markers() {
    let res = parse(
        r#"sequenceDiagram
par Parallel one
Alice->>Bob: Hello Guys!
and Parallel two
Alice->>John: Hello Guys!
end
opt Extra response
Bob->>Alice: Thanks
end
loop Every minute
John->>Alice: ping
end"#,
    );
    assert_eq!(
        markers(&res.state),
        vec![
            LineType::ParStart,
            LineType::SolidOpen,
            LineType::ParAnd,
            LineType::SolidOpen,
            LineType::ParEnd,
            LineType::OptStart,
            LineType::SolidOpen,
            LineType::OptEnd,
            LineType::LoopStart,
            LineType::SolidOpen,
            LineType::LoopEnd,
        ]
    );
    assert_eq!(res.state.events()[0].text(), Some("Parallel one"));
}

#[test]
fn nested_rects_close_inner_first() {
    let res = parse(
        r#"sequenceDiagram
rect rgb(0, 0, 0)
rect rgb(255, 255, 255)
Note over Alice: Note
end
Alice->Bob: Hi
end"#,
    );
    assert_eq!(
        markers(&res.state),
        vec![
            LineType::RectStart,
            LineType::RectStart,
            LineType::Note,
            LineType::RectEnd,
            LineType::Solid,
            LineType::RectEnd,
        ]
    );
    assert_eq!(res.state.events()[0].text(), Some("rgb(0, 0, 0)"));
    assert_eq!(res.state.events()[1].text(), Some("rgb(255, 255, 255)"));
}

#[test]
fn end_closes_whatever_block_is_innermost() {
    let res = parse("sequenceDiagram\nloop outer\nopt inner\nA->B: x\nend\nend");
    assert_eq!(
        markers(&res.state),
        vec![
            LineType::LoopStart,
            LineType::OptStart,
            LineType::Solid,
            LineType::OptEnd,
            LineType::LoopEnd,
        ]
    );
}

#[test]
fn notes_keep_actor_order() {
    let res = parse(
        r#"sequenceDiagram
Note over Alice,Bob: one
Note over Bob, Alice: two
Note left of Alice: three"#,
    );
    let events = res.state.events();
    assert_eq!((events[0].from(), events[0].to()), (Some("Alice"), Some("Bob")));
    assert_eq!((events[1].from(), events[1].to()), (Some("Bob"), Some("Alice")));
    let Event::Note(note) = &events[2] else {
        panic!("expected a note");
    };
    assert_eq!(note.placement, NotePlacement::LeftOf);
    assert_eq!(note.to, "Alice");
}

#[test]
fn wrap_prefixes_on_text() {
    let res = parse(
        r#"sequenceDiagram
participant A as wrap:Long Alice
A->B: wrap:a long message
A->B:nowrap: another
Note over A: :wrap: noted"#,
    );
    let events = res.state.events();
    let Event::Message(first) = &events[0] else {
        panic!("expected a message");
    };
    assert_eq!(first.text, "a long message");
    assert!(first.wrap);
    let Event::Message(second) = &events[1] else {
        panic!("expected a message");
    };
    assert_eq!(second.text, "another");
    assert!(!second.wrap);
    assert_eq!(events[2].text(), Some("noted"));

    let alice = res.state.actor("A").unwrap();
    assert_eq!(alice.description, "Long Alice");
    assert!(alice.wrap);
}

#[test]
fn missing_header_is_a_syntax_error() {
    let (err, _) = parse_err("\n\nAlice->Bob: hi");
    assert_eq!(err.position(), Some((3, 1)));
    assert!(matches!(err, Error::Syntax { .. }));
}

#[test]
fn unrecognized_statement_reports_position() {
    let (err, state) = parse_err("sequenceDiagram\nAlice->Bob: hi\n  what is this");
    let Error::Syntax { line, column, message } = err else {
        panic!("expected a syntax error");
    };
    assert_eq!((line, column), (3, 3));
    assert!(message.contains("what is this"), "{message}");
    assert_eq!(state.events().len(), 1);
}

#[test]
fn block_structure_errors() {
    let (err, _) = parse_err("sequenceDiagram\nA->B: x\nend");
    assert_eq!(err.position(), Some((3, 1)));

    let (err, _) = parse_err("sequenceDiagram\nloop forever\nelse nope\nend");
    assert_eq!(err.position(), Some((3, 1)));

    let (err, _) = parse_err("sequenceDiagram\nalt a\nand b\nend");
    assert_eq!(err.position(), Some((3, 1)));

    let (err, _) = parse_err("sequenceDiagram\nloop one\nopt two\nA->B: x\nend");
    let Error::Syntax { line, message, .. } = err else {
        panic!("expected a syntax error");
    };
    assert_eq!(line, 2);
    assert!(message.contains("loop"), "{message}");
}

#[test]
fn note_requires_colon() {
    let (err, _) = parse_err("sequenceDiagram\nNote right of Bob Bob thinks");
    assert!(matches!(err, Error::Syntax { line: 2, .. }), "{err:?}");
}

#[test]
fn model_operations_without_parser() {
    let mut state = DiagramState::new();
    state.add_actor("Alice", None);
    state.add_message("Alice", "Bob", MessageKind::Solid, "hi");
    state.activate("Bob");
    assert_eq!(state.activation_depth("Bob"), 1);
    assert!(state.deactivate("Alice").is_err());
    assert_eq!(state.events().len(), 2);
    state.deactivate("Bob").unwrap();
    state.add_note(NotePlacement::Over, "Alice", Some("Bob"), "span");
    state.add_block_marker(BlockMarker::LoopStart, None);
    state.add_block_marker(BlockMarker::LoopEnd, Some("ignored"));

    assert_eq!(state.events()[4].text(), Some(""));
    assert_eq!(state.events()[5].text(), None);
    assert_eq!(state.actors().len(), 2);

    state.clear();
    assert!(state.events().is_empty());
    assert!(state.actors().is_empty());
}
