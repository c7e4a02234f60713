// Unit tests for the transcript model and session summary

use loqa_dialogue::{Scenario, SessionContext, SessionSummary, Speaker, Transcript};
use uuid::Uuid;

#[test]
fn test_entries_are_strictly_time_ordered() {
    let mut transcript = Transcript::new(Uuid::new_v4());

    for i in 0..50 {
        if i % 2 == 0 {
            transcript.append_system(format!("system {}", i));
        } else {
            transcript.append_user(format!("user {}", i), 0.9, None);
        }
    }

    assert_eq!(transcript.len(), 50);
    assert!(transcript.entries()[0].created_at() > transcript.started_at());
    assert!(transcript
        .entries()
        .windows(2)
        .all(|pair| pair[0].created_at() < pair[1].created_at()));
}

#[test]
fn test_records_keep_speaker_confidence_and_audio() {
    let audio = Uuid::new_v4();
    let mut transcript = Transcript::new(Uuid::new_v4());

    transcript.append_system("Welcome!");
    transcript.append_user("hi there", 1.7, Some(audio));

    let system = &transcript.entries()[0];
    assert_eq!(system.speaker(), Speaker::System);
    assert_eq!(system.confidence(), None);
    assert_eq!(system.audio_reference(), None);

    let user = &transcript.entries()[1];
    assert_eq!(user.speaker(), Speaker::User);
    assert_eq!(user.text(), "hi there");
    assert_eq!(user.confidence(), Some(1.0), "confidence is clamped to [0, 1]");
    assert_eq!(user.audio_reference(), Some(audio));

    assert_eq!(transcript.user_turns().count(), 1);
}

#[test]
fn test_finish_sets_end_once() {
    let mut transcript = Transcript::new(Uuid::new_v4());
    transcript.append_system("Welcome!");

    assert!(transcript.ended_at().is_none());
    assert!(transcript.finish());
    let ended = transcript.ended_at().expect("end set");
    assert!(ended > transcript.entries()[0].created_at());

    assert!(!transcript.finish());
    assert_eq!(transcript.ended_at(), Some(ended));
}

#[test]
fn test_summary_metrics() {
    let mut context = SessionContext::new(Scenario::new("cafe", "Ordering at a cafe", 3));
    let mut transcript = Transcript::new(context.session_id);

    transcript.append_system("What can I get you?");
    transcript.append_user("a flat white please", 0.8, None);
    context.advance_turn();
    transcript.append_system("Anything else?");
    transcript.append_user("no thanks", 0.6, None);
    context.advance_turn();
    transcript.finish();

    let summary = SessionSummary::from_transcript(&context, &transcript);

    assert_eq!(summary.scenario_id, "cafe");
    assert_eq!(summary.turns, 2);
    assert_eq!(summary.user_word_count, 6);
    let confidence = summary.average_confidence.expect("confidence present");
    assert!((confidence - 0.7).abs() < 1e-6);
    assert!(summary.duration_secs >= 0.0);

    let text = summary.summary_text();
    assert!(text.contains("2 turns"));
    assert!(text.contains("6 words"));
    assert!(text.contains("70 percent"));
}

#[test]
fn test_summary_without_user_turns() {
    let context = SessionContext::new(Scenario::new("cafe", "Ordering at a cafe", 3));
    let transcript = Transcript::new(context.session_id);

    let summary = SessionSummary::from_transcript(&context, &transcript);

    assert_eq!(summary.turns, 0);
    assert_eq!(summary.average_confidence, None);
    assert!(!summary.summary_text().contains("percent"));
}

#[test]
fn test_turn_counting() {
    let mut context = SessionContext::new(Scenario::new("cafe", "Ordering at a cafe", 2));

    assert_eq!(context.turn_number, 0);
    assert!(!context.turn_limit_reached());
    assert_eq!(context.advance_turn(), 1);
    assert!(!context.turn_limit_reached());
    assert_eq!(context.advance_turn(), 2);
    assert!(context.turn_limit_reached());
}
