//! Function tools and the registry types the agent loop dispatches through.

pub mod agent_tool;
pub mod flights;
pub mod hotels;
pub mod stocks;
pub mod weather;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::error::{SchemaError, ToolError};
use crate::llm::ToolDeclaration;

pub use agent_tool::agent_tool;

/// What a tool hands back to the agent loop.
#[derive(Clone, Debug, PartialEq)]
pub enum ToolOutcome {
    Text(String),
    Json(Value),
}

impl ToolOutcome {
    /// The text the model sees. JSON is sent compact.
    pub fn into_text(self) -> String {
        match self {
            ToolOutcome::Text(text) => text,
            ToolOutcome::Json(value) => value.to_string(),
        }
    }
}

/// Values made available to tool handlers, keyed by type.
///
/// Tools that read a lookup table check here first, which is how tests swap
/// in their own tables.
#[derive(Clone, Default)]
pub struct Dependencies {
    values: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value`, replacing any earlier value of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.values.insert(TypeId::of::<T>(), Arc::new(value));
    }

    pub fn with<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.insert(value);
        self
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.values.get(&TypeId::of::<T>())?.downcast_ref()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependencies")
            .field("len", &self.values.len())
            .finish()
    }
}

type Handler =
    dyn Fn(Value, &Dependencies) -> BoxFuture<'static, Result<ToolOutcome, ToolError>> + Send + Sync;

/// A named, schema-described async function the model can call.
#[derive(Clone)]
pub struct ToolSpec {
    name: String,
    description: String,
    parameters: Value,
    handler: Arc<Handler>,
}

impl ToolSpec {
    /// A tool that takes no parameters and has no handler yet.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let name = name.into();
        let unhandled = name.clone();
        Self {
            name,
            description: description.into(),
            parameters: json!({"type": "object", "properties": {}}),
            handler: Arc::new(move |_, _| {
                let message = format!("{unhandled} has no handler");
                Box::pin(async move { Err(ToolError::Failed(message)) })
            }),
        }
    }

    pub fn with_schema(mut self, parameters: Value) -> Result<Self, SchemaError> {
        check_schema(&parameters)?;
        self.parameters = parameters;
        Ok(self)
    }

    /// Installs the handler. It runs after arguments pass the schema check.
    pub fn with_handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Value, &Dependencies) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolOutcome, ToolError>> + Send + 'static,
    {
        self.handler = Arc::new(move |args, deps| Box::pin(handler(args, deps)));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &Value {
        &self.parameters
    }

    pub fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
        }
    }

    pub async fn call(&self, args: Value, deps: &Dependencies) -> Result<ToolOutcome, ToolError> {
        check_arguments(&self.name, &self.parameters, &args)?;
        (self.handler)(args, deps).await
    }
}

impl fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// Decodes checked arguments into the tool's parameter record.
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|err| ToolError::BadArguments {
        tool: tool.to_string(),
        reason: err.to_string(),
    })
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<ToolOutcome, ToolError> {
    serde_json::to_value(value)
        .map(ToolOutcome::Json)
        .map_err(|err| ToolError::Failed(err.to_string()))
}

fn check_schema(schema: &Value) -> Result<(), SchemaError> {
    let Value::Object(root) = schema else {
        return Err(SchemaError::NotAnObject);
    };
    if root.get("type") != Some(&json!("object")) {
        return Err(SchemaError::RootNotObjectType);
    }
    match root.get("required") {
        None => Ok(()),
        Some(Value::Array(names)) if names.iter().all(Value::is_string) => Ok(()),
        Some(_) => Err(SchemaError::RequiredNotStrings),
    }
}

/// Checks required fields, closed objects and top-level scalar types. Nested
/// schemas are left to the handler's own decoding.
fn check_arguments(tool: &str, schema: &Value, args: &Value) -> Result<(), ToolError> {
    let reject = |reason: String| ToolError::BadArguments {
        tool: tool.to_string(),
        reason,
    };

    let Value::Object(args) = args else {
        return Err(reject("arguments must be a JSON object".to_string()));
    };

    let missing = schema
        .get("required")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .filter(|field| !args.contains_key(*field))
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(reject(format!("missing {}", missing.join(", "))));
    }

    let properties = schema.get("properties").and_then(Value::as_object);
    let closed = schema.get("additionalProperties") == Some(&Value::Bool(false));

    for (field, value) in args {
        match properties.and_then(|properties| properties.get(field)) {
            None if closed => return Err(reject(format!("unexpected field '{field}'"))),
            None => {}
            Some(property) => {
                let expected = property.get("type").and_then(Value::as_str);
                if let Some(expected) = expected.filter(|expected| !has_json_type(value, expected)) {
                    return Err(reject(format!("'{field}' should be a {expected}")));
                }
            }
        }
    }

    Ok(())
}

fn has_json_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}
