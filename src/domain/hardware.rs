use serde::{Deserialize, Serialize};
use std::fmt;

/// Request to exercise one actuator. Component and action are passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentTest {
    pub component: String,
    pub action: String,
}

impl ComponentTest {
    pub fn new(component: impl Into<String>, action: impl Into<String>) -> Self {
        ComponentTest {
            component: component.into(),
            action: action.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HardwareResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub simulated: bool,
}

impl HardwareResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    /// Text shown to the user, suffixed when the backend only simulated the hardware.
    pub fn describe(&self, component: &str) -> String {
        let message = self.message.clone().unwrap_or_else(|| format!("{component} tested successfully"));
        if self.simulated { format!("{message} (simulated)") } else { message }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HardwareStatus {
    pub hardware_available: bool,
    #[serde(default)]
    pub components: Vec<String>,
}

/// HTTP endpoints that accept a component test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardwareTestEndpoint {
    TestHardware,
    TestHardwareFixed,
    SimpleTest,
    SimpleHardwareTest,
}

impl HardwareTestEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            HardwareTestEndpoint::TestHardware => "/test_hardware",
            HardwareTestEndpoint::TestHardwareFixed => "/test_hardware_fixed",
            HardwareTestEndpoint::SimpleTest => "/simple_test",
            HardwareTestEndpoint::SimpleHardwareTest => "/simple_hardware_test",
        }
    }
}

impl fmt::Display for HardwareTestEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Progress of the most recent component test.
///
/// ```text
/// Idle ──► Testing ──► Success
///             │
///             └──────► Failed
/// ```
///
/// Both outcomes are terminal until the next test resets to `Testing`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TestState {
    #[default]
    Idle,
    Testing {
        component: String,
    },
    Success {
        component: String,
        message: String,
    },
    Failed {
        component: String,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn describes_a_simulated_response() {
        let response = serde_json::from_value::<HardwareResponse>(json!({
            "status": "success",
            "message": "LED turned on",
            "simulated": true
        }))
        .unwrap();

        assert!(response.is_success());
        assert_eq!(response.describe("led"), "LED turned on (simulated)");
    }

    #[test]
    fn describes_a_response_without_a_message() {
        let response = serde_json::from_value::<HardwareResponse>(json!({ "status": "success" })).unwrap();
        assert_eq!(response.describe("servo"), "servo tested successfully");
    }

    #[test]
    fn deserializes_an_endpoint_name() {
        let endpoint = serde_json::from_value::<HardwareTestEndpoint>(json!("simple_hardware_test")).unwrap();
        assert_eq!(endpoint.path(), "/simple_hardware_test");
    }
}
