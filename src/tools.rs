use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::error::ToolError;
use crate::proxy::{FunctionDefinition, ToolDefinition};

/// A function the model may call, executed locally.
pub trait Tool: Send + Sync {
    /// Name exposed to the model.
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON schema of the argument object.
    fn parameters(&self) -> Value;
    fn call(&self, args: &Value) -> Result<Value, ToolError>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            kind: "function".into(),
            function: FunctionDefinition {
                name: self.name().into(),
                description: self.description().into(),
                parameters: self.parameters(),
            },
        }
    }
}

/// Tools by name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the weather lookup.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CurrentWeather));
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Run a tool with the model's JSON-encoded arguments.
    pub fn call(&self, name: &str, raw_args: &str) -> Result<Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        let args: Value = if raw_args.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(raw_args).map_err(|e| ToolError::InvalidArgs(e.to_string()))?
        };
        tool.call(&args)
    }
}

/// `get_current_weather`: canned conditions for a few known cities.
pub struct CurrentWeather;

impl Tool for CurrentWeather {
    fn name(&self) -> &'static str {
        "get_current_weather"
    }

    fn description(&self) -> &'static str {
        "Get the current weather in a given location"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "The city and state, e.g. San Francisco, CA"
                },
                "unit": {"type": "string", "enum": ["celsius", "fahrenheit"]}
            },
            "required": ["location"]
        })
    }

    fn call(&self, args: &Value) -> Result<Value, ToolError> {
        let location = args
            .get("location")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArgs("missing string field `location`".into()))?;
        let unit = args
            .get("unit")
            .and_then(Value::as_str)
            .unwrap_or("fahrenheit");
        log::info!("Weather lookup: location={location}, unit={unit}");

        let lower = location.to_lowercase();
        let report = if lower.contains("tokyo") {
            json!({"location": "Tokyo", "temperature": "10", "unit": "celsius"})
        } else if lower.contains("san francisco") {
            json!({"location": "San Francisco", "temperature": "72", "unit": "fahrenheit"})
        } else if lower.contains("paris") {
            json!({"location": "Paris", "temperature": "22", "unit": "celsius"})
        } else {
            json!({"location": location, "temperature": "unknown"})
        };
        Ok(report)
    }
}
