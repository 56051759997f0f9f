// Topic layout under the configured prefix.

/// Builds and parses `<prefix>/<serial>[/...]` topics.
#[derive(Debug, Clone)]
pub struct Topics {
    prefix: String,
}

const PARAMETERS: &str = "parameters";
const SET: &str = "set";

impl Topics {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn status(&self, serial: &str) -> String {
        format!("{}/{serial}", self.prefix)
    }

    pub fn battery(&self, serial: &str, index: usize) -> String {
        format!("{}/{serial}/BAT{index}", self.prefix)
    }

    pub fn parameters(&self, serial: &str) -> String {
        format!("{}/{serial}/{PARAMETERS}", self.prefix)
    }

    pub fn parameters_set(&self, serial: &str) -> String {
        format!("{}/{serial}/{PARAMETERS}/{SET}", self.prefix)
    }

    /// The serial of a `<prefix>/<serial>/parameters/set` topic.
    pub fn parse_parameters_set<'a>(&self, topic: &'a str) -> Option<&'a str> {
        let rest = topic.strip_prefix(self.prefix.as_str())?.strip_prefix('/')?;
        let serial = rest.strip_suffix("/parameters/set")?;
        (!serial.is_empty() && !serial.contains('/')).then_some(serial)
    }
}
