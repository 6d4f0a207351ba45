/// Script loading and interpreter integration tests.

use dialogue_engine::core::script::{Script, ScriptLoader, ScriptRunner};
use dialogue_engine::schema::story::{NarrativeInterpreter, StoryDocument, StoryLoader};

#[test]
fn fixtures_load() {
    for name in ["greeting", "stalker"] {
        let path = format!("tests/fixtures/{}.ron", name);
        let script = Script::load_from_ron(std::path::Path::new(&path)).unwrap();
        assert!(
            script.knot(&script.start).is_some(),
            "{} has no start knot",
            name
        );
    }
}

#[test]
fn stalker_knots_and_tags() {
    let script = Script::load_from_ron(std::path::Path::new("tests/fixtures/stalker.ron")).unwrap();
    assert_eq!(script.start, "corridor");
    assert_eq!(script.knots.len(), 7);

    let corridor = script.knot("corridor").unwrap();
    assert!(corridor.lines[0].tags.contains("auto"));
    assert!(corridor.lines[0].tags.contains("speaker:narrator"));
    assert_eq!(corridor.next.as_deref(), Some("demand"));

    let demand = script.knot("demand").unwrap();
    assert_eq!(demand.choices.len(), 5);
    assert_eq!(demand.choices[4].divert, None);
}

#[test]
fn stalker_diary_path() {
    let script = Script::load_from_ron(std::path::Path::new("tests/fixtures/stalker.ron")).unwrap();
    let mut runner = ScriptRunner::new(script);

    let mut lines = Vec::new();
    while runner.can_continue() {
        lines.push(runner.continue_story());
    }
    assert_eq!(
        lines,
        vec![
            "Something breathes behind the door.",
            "You are not wearing your mask.",
            "Give me a reason to let you pass.",
        ]
    );

    runner.choose_choice_index(3);
    assert_eq!(runner.continue_story(), "It reads in silence.");
    assert!(runner.current_tags().contains("auto"));
    assert_eq!(runner.continue_story(), "Go.");
    assert!(runner.current_tags().is_empty());
    assert!(!runner.can_continue());
    assert!(runner.current_choices().is_empty());
}

#[test]
fn loader_produces_working_interpreter() {
    let source = std::fs::read_to_string("tests/fixtures/greeting.ron").unwrap();
    let mut story = ScriptLoader
        .load(&StoryDocument::new("greeting", source))
        .unwrap();
    assert_eq!(story.continue_story(), "Hello");
    assert_eq!(story.continue_story(), "Pick one");
    assert_eq!(story.current_choices().len(), 2);
    story.choose_choice_index(0);
    assert!(!story.can_continue());
}
