use tagver::boundary::BoundaryWarning;
use tagver::ui;

// ============================================================================
// BoundaryWarning Display Tests
// ============================================================================

#[test]
fn test_ambiguous_tag_display() {
    let warning = BoundaryWarning::AmbiguousTag {
        commit: "abc1234def5678".to_string(),
        chosen: "v1.0.1".to_string(),
        candidates: vec!["v1.0.0".to_string(), "v1.0.1".to_string()],
    };

    let display_msg = warning.to_string();
    assert!(
        display_msg.contains("abc1234") && !display_msg.contains("abc1234d"),
        "Message should contain shortened commit hash 'abc1234', got: {}",
        display_msg
    );
    assert!(
        display_msg.contains("v1.0.0, v1.0.1"),
        "Message should list candidates, got: {}",
        display_msg
    );
    assert!(
        display_msg.contains("using 'v1.0.1'"),
        "Message should name the chosen tag, got: {}",
        display_msg
    );
}

#[test]
fn test_ambiguous_tag_short_commit_kept() {
    let warning = BoundaryWarning::AmbiguousTag {
        commit: "42".to_string(),
        chosen: "v1".to_string(),
        candidates: vec![],
    };
    assert!(warning.to_string().contains("Commit 42 "));
}

#[test]
fn test_ambiguous_tag_multibyte_commit() {
    let warning = BoundaryWarning::AmbiguousTag {
        commit: "ré⁄vision-ünïcode".to_string(),
        chosen: "v2".to_string(),
        candidates: vec!["v2".to_string(), "v2.0".to_string()],
    };
    assert!(warning.to_string().contains("Commit ré⁄visi "));
}

#[test]
fn test_unmatched_tags_display() {
    let warning = BoundaryWarning::UnmatchedTags {
        pattern: "default".to_string(),
        seen: 3,
    };

    let display_msg = warning.to_string();
    assert!(display_msg.contains("3 tag(s)"), "got: {}", display_msg);
    assert!(display_msg.contains("'default'"), "got: {}", display_msg);
    assert!(display_msg.contains("0.0.0"), "got: {}", display_msg);
}

#[test]
fn test_unsubstituted_archival_display() {
    let warning = BoundaryWarning::UnsubstitutedArchival {
        path: "/src/.git_archival.json".to_string(),
    };
    assert!(warning
        .to_string()
        .contains("'/src/.git_archival.json'"));
}

// ============================================================================
// UI output
// ============================================================================

#[test]
fn test_display_boundary_warning_does_not_panic() {
    // Visual verification test - output is printed to stderr
    ui::display_boundary_warning(&BoundaryWarning::UnmatchedTags {
        pattern: "default".to_string(),
        seen: 1,
    });
}

#[test]
fn test_warning_equality() {
    let a = BoundaryWarning::UnsubstitutedArchival {
        path: "x".to_string(),
    };
    assert_eq!(a.clone(), a);
    assert_ne!(
        a,
        BoundaryWarning::UnsubstitutedArchival {
            path: "y".to_string()
        }
    );
}
