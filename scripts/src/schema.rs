//! Typed parameter declarations for tasks, and their resolution against raw
//! operator input

use std::{
    collections::{BTreeMap, HashMap},
    fmt::{self, Display},
};

use crate::errors::TaskError;

/// Raw, uncoerced task inputs keyed by parameter name
pub type RawInputs = HashMap<String, String>;

/// The type of a task parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Passed through verbatim
    String,
    /// A signed integer, decimal or `0x`-prefixed hex
    Int,
    /// A finite floating point number
    Float,
}

impl ParamType {
    /// Coerce a raw input into a value of this type
    pub fn coerce(self, key: &str, raw: &str) -> Result<ParamValue, TaskError> {
        let coercion_error = || TaskError::TypeCoercion {
            key: key.to_string(),
            expected: self,
            value: raw.to_string(),
        };

        match self {
            ParamType::String => Ok(ParamValue::String(raw.to_string())),
            ParamType::Int => parse_int(raw).map(ParamValue::Int).ok_or_else(coercion_error),
            ParamType::Float => parse_float(raw)
                .map(ParamValue::Float)
                .ok_or_else(coercion_error),
        }
    }
}

impl Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::String => write!(f, "string"),
            ParamType::Int => write!(f, "int"),
            ParamType::Float => write!(f, "float"),
        }
    }
}

/// A typed parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// A string value
    String(String),
    /// An integer value
    Int(i64),
    /// A float value
    Float(f64),
}

impl ParamValue {
    /// The type tag of this value
    pub fn param_type(&self) -> ParamType {
        match self {
            ParamValue::String(_) => ParamType::String,
            ParamValue::Int(_) => ParamType::Int,
            ParamValue::Float(_) => ParamType::Float,
        }
    }
}

impl Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::String(s) => write!(f, "{:?}", s),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Float(x) => write!(f, "{}", x),
        }
    }
}

/// The declaration of a single named task parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    /// The parameter's key, unique within its task
    pub key: String,
    /// Human-readable description shown in the task listing
    pub description: String,
    /// The value used when the operator does not supply one
    pub default: ParamValue,
    /// The declared type
    pub param_type: ParamType,
}

/// A named operation and its ordered parameter declarations
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDefinition {
    /// The task's name
    name: String,
    /// Human-readable description shown in the task listing
    description: String,
    /// The parameter declarations, in declaration order
    params: Vec<ParameterSpec>,
}

impl TaskDefinition {
    /// Create a task with no parameters
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            params: Vec::new(),
        }
    }

    /// Declare a parameter on this task
    pub fn declare(
        mut self,
        key: &str,
        description: &str,
        default: ParamValue,
        param_type: ParamType,
    ) -> Result<Self, TaskError> {
        if self.param(key).is_some() {
            return Err(TaskError::DuplicateParameter(key.to_string()));
        }

        let found = default.param_type();
        if found != param_type {
            return Err(TaskError::DefaultTypeMismatch {
                key: key.to_string(),
                expected: param_type,
                found,
            });
        }

        self.params.push(ParameterSpec {
            key: key.to_string(),
            description: description.to_string(),
            default,
            param_type,
        });

        Ok(self)
    }

    /// The task's name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The task's description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The task's parameters, in declaration order
    pub fn params(&self) -> &[ParameterSpec] {
        &self.params
    }

    /// Look up a parameter declaration by key
    pub fn param(&self, key: &str) -> Option<&ParameterSpec> {
        self.params.iter().find(|spec| spec.key == key)
    }

    /// Ensure every supplied key is declared by this task
    pub fn reject_unknown(&self, raw_inputs: &RawInputs) -> Result<(), TaskError> {
        let mut unknown: Vec<&String> = raw_inputs
            .keys()
            .filter(|key| self.param(key).is_none())
            .collect();
        unknown.sort();

        match unknown.first() {
            Some(key) => Err(TaskError::UnknownParameter(key.to_string())),
            None => Ok(()),
        }
    }

    /// Merge the raw inputs onto the declared defaults, coercing each value
    /// to its declared type
    pub fn resolve(&self, raw_inputs: &RawInputs) -> Result<ResolvedParameters, TaskError> {
        let values = self
            .params
            .iter()
            .map(|spec| {
                let value = match raw_inputs.get(&spec.key) {
                    Some(raw) => spec.param_type.coerce(&spec.key, raw)?,
                    None => spec.default.clone(),
                };
                Ok((spec.key.clone(), value))
            })
            .collect::<Result<BTreeMap<_, _>, TaskError>>()?;

        Ok(ResolvedParameters { values })
    }
}

/// The parameters of one task invocation, with every declared key present
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParameters {
    /// The coerced values, keyed by parameter
    values: BTreeMap<String, ParamValue>,
}

impl ResolvedParameters {
    /// The resolved keys, in lexicographic order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// The resolved value for a key
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    /// The resolved value for a string parameter
    pub fn string(&self, key: &str) -> Result<&str, TaskError> {
        match self.get(key) {
            Some(ParamValue::String(s)) => Ok(s),
            other => Err(unexpected_value(key, ParamType::String, other)),
        }
    }

    /// The resolved value for an int parameter
    pub fn int(&self, key: &str) -> Result<i64, TaskError> {
        match self.get(key) {
            Some(ParamValue::Int(i)) => Ok(*i),
            other => Err(unexpected_value(key, ParamType::Int, other)),
        }
    }

    /// The resolved value for a float parameter
    pub fn float(&self, key: &str) -> Result<f64, TaskError> {
        match self.get(key) {
            Some(ParamValue::Float(x)) => Ok(*x),
            other => Err(unexpected_value(key, ParamType::Float, other)),
        }
    }
}

/// The error for a parameter that was not resolved with the expected type
fn unexpected_value(key: &str, expected: ParamType, found: Option<&ParamValue>) -> TaskError {
    let reason = match found {
        Some(value) => format!("resolved as {}, expected {}", value.param_type(), expected),
        None => "not declared by this task".to_string(),
    };
    TaskError::InvalidParameter {
        key: key.to_string(),
        reason,
    }
}

/// The set of tasks available to the dispatcher, keyed by name
#[derive(Debug, Default)]
pub struct TaskRegistry {
    /// The registered tasks, keyed by name
    tasks: BTreeMap<String, TaskDefinition>,
}

impl TaskRegistry {
    /// Register a task definition
    pub fn register(&mut self, task: TaskDefinition) -> Result<(), TaskError> {
        if self.tasks.contains_key(task.name()) {
            return Err(TaskError::Config(format!(
                "task `{}` is already registered",
                task.name()
            )));
        }
        self.tasks.insert(task.name().to_string(), task);
        Ok(())
    }

    /// Look up a task definition by name
    pub fn get(&self, task_name: &str) -> Result<&TaskDefinition, TaskError> {
        self.tasks
            .get(task_name)
            .ok_or_else(|| TaskError::UnknownTask(task_name.to_string()))
    }

    /// All registered tasks, ordered by name
    pub fn tasks(&self) -> impl Iterator<Item = &TaskDefinition> {
        self.tasks.values()
    }

    /// Resolve raw inputs against the named task's parameter declarations
    pub fn resolve(
        &self,
        task_name: &str,
        raw_inputs: &RawInputs,
    ) -> Result<ResolvedParameters, TaskError> {
        self.get(task_name)?.resolve(raw_inputs)
    }
}

/// Parse a decimal or `0x`-prefixed hex integer
fn parse_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        // `from_str_radix` would accept a sign after the prefix
        Some(hex) if hex.starts_with(['+', '-']) => None,
        Some(hex) => i64::from_str_radix(hex, 16).ok(),
        None => trimmed.parse().ok(),
    }
}

/// Parse a finite float, accepting hex integers like [`parse_int`]
fn parse_float(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        return parse_int(trimmed).map(|i| i as f64);
    }
    trimmed.parse::<f64>().ok().filter(|x| x.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> TaskDefinition {
        TaskDefinition::new("sample", "a sample task")
            .declare("label", "a label", ParamValue::String(String::new()), ParamType::String)
            .unwrap()
            .declare("count", "a count", ParamValue::Int(1), ParamType::Int)
            .unwrap()
            .declare("ratio", "a ratio", ParamValue::Float(1.), ParamType::Float)
            .unwrap()
    }

    fn raw(pairs: &[(&str, &str)]) -> RawInputs {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_duplicate_declaration_rejected() {
        let res = sample_task().declare("count", "again", ParamValue::Int(2), ParamType::Int);
        assert_eq!(res, Err(TaskError::DuplicateParameter("count".to_string())));
    }

    #[test]
    fn test_default_type_must_match() {
        let res = TaskDefinition::new("t", "").declare(
            "count",
            "",
            ParamValue::String("1".to_string()),
            ParamType::Int,
        );
        assert!(matches!(res, Err(TaskError::DefaultTypeMismatch { .. })));
    }

    #[test]
    fn test_resolve_fills_defaults() {
        let resolved = sample_task().resolve(&RawInputs::new()).unwrap();

        assert_eq!(resolved.keys().collect::<Vec<_>>(), ["count", "label", "ratio"]);
        assert_eq!(resolved.string("label").unwrap(), "");
        assert_eq!(resolved.int("count").unwrap(), 1);
        assert_eq!(resolved.float("ratio").unwrap(), 1.);
    }

    #[test]
    fn test_resolve_coerces_overrides() {
        let resolved = sample_task()
            .resolve(&raw(&[("label", "42"), ("count", "0x10"), ("ratio", "0.5")]))
            .unwrap();

        assert_eq!(resolved.string("label").unwrap(), "42");
        assert_eq!(resolved.int("count").unwrap(), 16);
        assert_eq!(resolved.float("ratio").unwrap(), 0.5);
    }

    #[test]
    fn test_resolve_rejects_uncoercible_values() {
        for (key, value) in [("count", "ten"), ("count", "1.5"), ("ratio", "NaN"), ("ratio", "")] {
            let err = sample_task().resolve(&raw(&[(key, value)])).unwrap_err();
            assert_eq!(err.kind(), "TypeCoercionError", "{key}={value:?}");
        }
    }

    #[test]
    fn test_signed_hex_rejected() {
        for value in ["0x-1", "0x+1", "0X-ff"] {
            let err = sample_task().resolve(&raw(&[("count", value)])).unwrap_err();
            assert_eq!(err.kind(), "TypeCoercionError", "{value:?}");
        }
        let err = sample_task().resolve(&raw(&[("ratio", "0x-1")])).unwrap_err();
        assert_eq!(err.kind(), "TypeCoercionError");

        let err = sample_task().resolve(&raw(&[("count", "-0x1")])).unwrap_err();
        assert_eq!(err.kind(), "TypeCoercionError");
        assert_eq!(parse_int("-1"), Some(-1));
    }

    #[test]
    fn test_resolved_keys_match_declared_keys() {
        let task = sample_task();
        let inputs = [
            raw(&[]),
            raw(&[("count", "7")]),
            raw(&[("label", "x"), ("ratio", "2.25")]),
        ];

        for input in inputs {
            let resolved = task.resolve(&input).unwrap();
            let mut declared: Vec<_> = task.params().iter().map(|p| p.key.as_str()).collect();
            declared.sort();
            assert_eq!(resolved.keys().collect::<Vec<_>>(), declared);
        }
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = sample_task()
            .reject_unknown(&raw(&[("count", "1"), ("mystery", "x")]))
            .unwrap_err();
        assert_eq!(err, TaskError::UnknownParameter("mystery".to_string()));
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = TaskRegistry::default();
        registry.register(sample_task()).unwrap();

        assert!(registry.register(sample_task()).is_err());
        assert!(registry.resolve("sample", &RawInputs::new()).is_ok());
        assert_eq!(
            registry.resolve("other", &RawInputs::new()),
            Err(TaskError::UnknownTask("other".to_string()))
        );
    }
}
