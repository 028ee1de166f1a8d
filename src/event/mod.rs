//! Records decoded from the `go test -json` event stream.

pub mod codec;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Identity of a single test.
///
/// Both components are opaque: subtests keep their full slash-separated name
/// and are never folded into their parent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TestName {
    pub package: String,
    pub test: String,
}

impl TestName {
    pub fn new(package: impl Into<String>, test: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            test: test.into(),
        }
    }

    /// Last `/`-separated segment of the package joined to the test name,
    /// e.g. `github.com/acme/store` + `TestGet` gives `store.TestGet`.
    pub fn short_label(&self) -> String {
        let package = self.package.rsplit('/').next().unwrap_or_default();
        format!("{}.{}", package, self.test)
    }
}

impl fmt::Display for TestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.package, self.test)
    }
}

/// The `Action` verb of an event.
///
/// Only the first six variants drive the timeline; the rest are decoded so
/// they can be told apart from garbage, and fall through the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Run,
    Pause,
    Cont,
    Pass,
    Fail,
    Skip,
    Start,
    Output,
    Bench,
    #[serde(other)]
    Other,
}

/// One line of `go test -json` output. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestEvent {
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub action: Option<Action>,
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub test: String,
}

impl TestEvent {
    /// True when every field holds its zero value, e.g. for `{}` or a JSON
    /// object that only carries fields we don't read.
    pub fn is_empty(&self) -> bool {
        *self == TestEvent::default()
    }

    pub fn name(&self) -> TestName {
        TestName::new(self.package.as_str(), self.test.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_full_event() {
        let line = r#"{"Time":"2024-01-01T00:00:01.5+02:00","Action":"pass","Package":"a/b","Test":"TestX","Elapsed":1.5}"#;
        let event: TestEvent = serde_json::from_str(line).unwrap();

        assert_eq!(event.action, Some(Action::Pass));
        assert_eq!(event.package, "a/b");
        assert_eq!(event.test, "TestX");
        assert_eq!(
            event.time.unwrap().to_rfc3339(),
            "2023-12-31T22:00:01.500+00:00"
        );
    }

    #[test]
    fn test_unknown_action_falls_back() {
        let event: TestEvent = serde_json::from_str(r#"{"Action":"teleport"}"#).unwrap();
        assert_eq!(event.action, Some(Action::Other));
        assert!(!event.is_empty());
    }

    #[test]
    fn test_empty_event() {
        let event: TestEvent = serde_json::from_str(r#"{"Output":"ok\n"}"#).unwrap();
        assert!(event.is_empty());
    }

    #[test]
    fn test_short_label() {
        assert_eq!(TestName::new("a/b", "T").short_label(), "b.T");
        assert_eq!(TestName::new("solo", "T/sub").short_label(), "solo.T/sub");
        assert_eq!(TestName::new("", "T").short_label(), ".T");
        assert_eq!(TestName::new("a/b", "T").to_string(), "a/b/T");
    }
}
